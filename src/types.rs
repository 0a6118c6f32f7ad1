//! CIP type descriptors and elementary type classification.
//!
//! A tag's type is reported by the device as a 16-bit descriptor: bit 15
//! flags structured types, bits 13-14 carry the array rank, bit 12 is
//! reserved (must be zero) and the low 12 bits identify the elementary or
//! structure type. [`TypeDescriptor`] wraps that value and derives everything
//! else from it.

use std::fmt;

use bytes::Buf;

use crate::error::{CipError, Result};

/// Elementary CIP data type codes (low 12 bits of a descriptor).
pub const TYPE_BOOL: u16 = 0x0C1;
/// SINT: 8-bit signed integer.
pub const TYPE_SINT: u16 = 0x0C2;
/// INT: 16-bit signed integer.
pub const TYPE_INT: u16 = 0x0C3;
/// DINT: 32-bit signed integer.
pub const TYPE_DINT: u16 = 0x0C4;
/// LINT: 64-bit signed integer.
pub const TYPE_LINT: u16 = 0x0C5;
/// USINT: 8-bit unsigned integer.
pub const TYPE_USINT: u16 = 0x0C6;
/// UINT: 16-bit unsigned integer.
pub const TYPE_UINT: u16 = 0x0C7;
/// UDINT: 32-bit unsigned integer.
pub const TYPE_UDINT: u16 = 0x0C8;
/// ULINT: 64-bit unsigned integer.
pub const TYPE_ULINT: u16 = 0x0C9;
/// REAL: 32-bit IEEE 754 float.
pub const TYPE_REAL: u16 = 0x0CA;
/// LREAL: 64-bit IEEE 754 float.
pub const TYPE_LREAL: u16 = 0x0CB;
/// Logix STRING structure type id.
pub const TYPE_STRING: u16 = 0xFCE;

/// Fixed character buffer size of a STRING array element (82 characters plus
/// two bytes of alignment).
pub const STRING_SLOT_BYTES: usize = 84;

/// Closed classification of a descriptor's elementary kind.
///
/// Replaces a runtime type map with a compile-time-checked table: the value
/// codec matches exhaustively on this enum, so adding a kind without handling
/// it is a compile error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ElementaryKind {
    /// BOOL (one byte on the wire, non-zero = true).
    Bool,
    /// SINT.
    Sint,
    /// INT.
    Int,
    /// DINT.
    Dint,
    /// LINT.
    Lint,
    /// USINT.
    Usint,
    /// UINT.
    Uint,
    /// UDINT.
    Udint,
    /// ULINT.
    Ulint,
    /// REAL.
    Real,
    /// LREAL.
    Lreal,
    /// Logix STRING.
    String,
    /// Anything the codec does not understand.
    Unknown,
}

impl ElementaryKind {
    /// Wire width in bytes of one fixed-width value of this kind. Strings
    /// are variable-width and report zero.
    pub const fn size(self) -> usize {
        match self {
            ElementaryKind::Bool | ElementaryKind::Sint | ElementaryKind::Usint => 1,
            ElementaryKind::Int | ElementaryKind::Uint => 2,
            ElementaryKind::Dint | ElementaryKind::Udint | ElementaryKind::Real => 4,
            ElementaryKind::Lint | ElementaryKind::Ulint | ElementaryKind::Lreal => 8,
            ElementaryKind::String | ElementaryKind::Unknown => 0,
        }
    }

    const fn name(self) -> &'static str {
        match self {
            ElementaryKind::Bool => "BOOL",
            ElementaryKind::Sint => "SINT",
            ElementaryKind::Int => "INT",
            ElementaryKind::Dint => "DINT",
            ElementaryKind::Lint => "LINT",
            ElementaryKind::Usint => "USINT",
            ElementaryKind::Uint => "UINT",
            ElementaryKind::Udint => "UDINT",
            ElementaryKind::Ulint => "ULINT",
            ElementaryKind::Real => "REAL",
            ElementaryKind::Lreal => "LREAL",
            ElementaryKind::String => "STRING",
            ElementaryKind::Unknown => "UNKNOWN",
        }
    }
}

/// A 16-bit CIP type descriptor.
///
/// Layout: bit 15 = structured flag, bits 13-14 = array rank, bit 12 =
/// reserved (must be zero), bits 0-11 = type id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct TypeDescriptor(u16);

impl TypeDescriptor {
    /// Wraps a raw 16-bit descriptor value.
    pub const fn new(raw: u16) -> Self {
        TypeDescriptor(raw)
    }

    /// The raw 16-bit value.
    pub const fn raw(self) -> u16 {
        self.0
    }

    /// The low 12-bit type id.
    pub const fn type_id(self) -> u16 {
        self.0 & 0x0FFF
    }

    /// Whether bit 15 (structured flag) is set.
    pub const fn is_structured(self) -> bool {
        self.0 & 0x8000 != 0
    }

    /// Array rank encoded in bits 13-14: 0 for scalars, up to 3 dimensions.
    /// Rank 3 is valid metadata but not decodable by the value codec.
    pub const fn array_rank(self) -> u8 {
        ((self.0 & 0x6000) >> 13) as u8
    }

    /// Checks descriptor validity.
    ///
    /// Bit 12 must be clear. Structured descriptors need a type id in
    /// `0x100..=0xEFF` or the STRING id `0xFCE`; elementary descriptors need
    /// a type id in `0x001..=0x0FF`. Invalid descriptors are excluded from
    /// directory listings rather than treated as errors.
    pub const fn is_valid(self) -> bool {
        if self.0 & 0x1000 != 0 {
            return false;
        }

        let id = self.type_id();
        if self.is_structured() {
            (id >= 0x100 && id <= 0xEFF) || id == TYPE_STRING
        } else {
            id >= 0x001 && id <= 0x0FF
        }
    }

    /// Classifies the elementary kind of this descriptor's type id.
    pub const fn elementary_kind(self) -> ElementaryKind {
        match self.type_id() {
            TYPE_BOOL => ElementaryKind::Bool,
            TYPE_SINT => ElementaryKind::Sint,
            TYPE_INT => ElementaryKind::Int,
            TYPE_DINT => ElementaryKind::Dint,
            TYPE_LINT => ElementaryKind::Lint,
            TYPE_USINT => ElementaryKind::Usint,
            TYPE_UINT => ElementaryKind::Uint,
            TYPE_UDINT => ElementaryKind::Udint,
            TYPE_ULINT => ElementaryKind::Ulint,
            TYPE_REAL => ElementaryKind::Real,
            TYPE_LREAL => ElementaryKind::Lreal,
            TYPE_STRING => ElementaryKind::String,
            _ => ElementaryKind::Unknown,
        }
    }
}

impl fmt::Display for TypeDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:#06x}({:>6}) | {} | {} dims",
            self.0,
            self.elementary_kind().name(),
            if self.is_structured() { "struct" } else { "atomic" },
            self.array_rank()
        )
    }
}

/// Common class-level attributes returned by a Get_Attribute_All against a
/// class instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CommonAttributes {
    /// Object class revision.
    pub revision: u16,
    /// Highest instantiated instance id.
    pub max_instance: u16,
    /// Number of instances currently present.
    pub number_of_instances: u16,
    /// Number of attributes supported by the class.
    pub number_of_attributes: u16,
}

impl CommonAttributes {
    /// Decodes the fixed four-word layout from a response payload.
    pub fn decode(data: &[u8]) -> Result<Self> {
        let mut buf = data;
        if buf.remaining() < 8 {
            return Err(CipError::Decode(format!(
                "common attributes need 8 bytes, got {}",
                data.len()
            )));
        }
        Ok(CommonAttributes {
            revision: buf.get_u16_le(),
            max_instance: buf.get_u16_le(),
            number_of_instances: buf.get_u16_le(),
            number_of_attributes: buf.get_u16_le(),
        })
    }
}
