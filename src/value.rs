//! Decoding and encoding of tag payloads.
//!
//! A raw read payload is interpreted through the tag's [`TypeDescriptor`]
//! and its cached dimension lengths: rank 0 yields one scalar, rank 1 a
//! sequence, rank 2 a row-major matrix. STRING tags are variable-width
//! scalars (u32 length prefix + data) and fixed-slot array elements (u32
//! length prefix + 84-byte character buffer). Rank-2 STRING arrays and all
//! rank-3 arrays are explicit decode errors, never silent empty results.

use bytes::{Buf, BufMut};

use crate::error::{CipError, Result};
use crate::types::{ElementaryKind, TypeDescriptor, STRING_SLOT_BYTES};

/// Maximum character payload of a Logix STRING on writes.
const STRING_MAX_CHARS: usize = 82;

/// A decoded tag value.
///
/// Scalar variants follow the CIP elementary type names; [`TagValue::Array`]
/// holds a rank-1 sequence and [`TagValue::Matrix`] a rank-2 row-major
/// matrix, both with homogeneous scalar elements.
#[derive(Debug, Clone, PartialEq)]
pub enum TagValue {
    /// BOOL value.
    Bool(bool),
    /// 8-bit signed integer.
    Sint(i8),
    /// 16-bit signed integer.
    Int(i16),
    /// 32-bit signed integer.
    Dint(i32),
    /// 64-bit signed integer.
    Lint(i64),
    /// 8-bit unsigned integer.
    Usint(u8),
    /// 16-bit unsigned integer.
    Uint(u16),
    /// 32-bit unsigned integer.
    Udint(u32),
    /// 64-bit unsigned integer.
    Ulint(u64),
    /// 32-bit float.
    Real(f32),
    /// 64-bit float.
    Lreal(f64),
    /// STRING value.
    String(String),
    /// Rank-1 array.
    Array(Vec<TagValue>),
    /// Rank-2 row-major matrix.
    Matrix(Vec<Vec<TagValue>>),
}

impl TagValue {
    /// Encodes the value for transmission in a write request.
    ///
    /// Scalars use their little-endian wire form (BOOL as 0xFF/0x00);
    /// strings carry a u32 length prefix and at most 82 characters; arrays
    /// and matrices concatenate their elements in order.
    pub fn to_bytes(&self) -> Vec<u8> {
        match self {
            TagValue::Bool(val) => vec![if *val { 0xFF } else { 0x00 }],
            TagValue::Sint(val) => val.to_le_bytes().to_vec(),
            TagValue::Int(val) => val.to_le_bytes().to_vec(),
            TagValue::Dint(val) => val.to_le_bytes().to_vec(),
            TagValue::Lint(val) => val.to_le_bytes().to_vec(),
            TagValue::Usint(val) => val.to_le_bytes().to_vec(),
            TagValue::Uint(val) => val.to_le_bytes().to_vec(),
            TagValue::Udint(val) => val.to_le_bytes().to_vec(),
            TagValue::Ulint(val) => val.to_le_bytes().to_vec(),
            TagValue::Real(val) => val.to_le_bytes().to_vec(),
            TagValue::Lreal(val) => val.to_le_bytes().to_vec(),
            TagValue::String(val) => {
                let data = &val.as_bytes()[..val.len().min(STRING_MAX_CHARS)];
                let mut bytes = Vec::with_capacity(4 + data.len());
                bytes.put_u32_le(data.len() as u32);
                bytes.put_slice(data);
                bytes
            }
            TagValue::Array(elements) => {
                let mut bytes = Vec::new();
                for element in elements {
                    bytes.extend_from_slice(&element.to_bytes());
                }
                bytes
            }
            TagValue::Matrix(rows) => {
                let mut bytes = Vec::new();
                for row in rows {
                    for element in row {
                        bytes.extend_from_slice(&element.to_bytes());
                    }
                }
                bytes
            }
        }
    }
}

/// Decodes a raw read payload into a typed value.
///
/// `dim1`..`dim3` are the tag's cached dimension lengths (0 = unused). The
/// descriptor's array rank selects the shape; the elementary kind selects the
/// element decoder. Truncated payloads, unknown kinds, rank-2 STRING arrays
/// and rank-3 arrays return [`CipError::Decode`].
pub fn decode(
    payload: &[u8],
    descriptor: TypeDescriptor,
    dim1: u32,
    dim2: u32,
    _dim3: u32,
) -> Result<TagValue> {
    let kind = descriptor.elementary_kind();
    if kind == ElementaryKind::Unknown {
        return Err(CipError::Decode(format!(
            "unknown elementary type {descriptor}"
        )));
    }

    let mut buf = payload;
    match descriptor.array_rank() {
        0 => match kind {
            ElementaryKind::String => read_string_scalar(&mut buf),
            _ => read_scalar(&mut buf, kind),
        },
        1 => match kind {
            ElementaryKind::String => {
                let mut elements = Vec::with_capacity(dim1 as usize);
                for _ in 0..dim1 {
                    elements.push(read_string_slot(&mut buf)?);
                }
                Ok(TagValue::Array(elements))
            }
            _ => {
                let mut elements = Vec::with_capacity(dim1 as usize);
                for _ in 0..dim1 {
                    elements.push(read_scalar(&mut buf, kind)?);
                }
                Ok(TagValue::Array(elements))
            }
        },
        2 => {
            if kind == ElementaryKind::String {
                return Err(CipError::Decode(
                    "rank-2 STRING arrays are not supported".to_string(),
                ));
            }
            let mut rows = Vec::with_capacity(dim2 as usize);
            for _ in 0..dim2 {
                let mut row = Vec::with_capacity(dim1 as usize);
                for _ in 0..dim1 {
                    row.push(read_scalar(&mut buf, kind)?);
                }
                rows.push(row);
            }
            Ok(TagValue::Matrix(rows))
        }
        rank => Err(CipError::Decode(format!(
            "rank-{rank} arrays are not supported"
        ))),
    }
}

/// Reads one fixed-width value of the given kind.
fn read_scalar(buf: &mut &[u8], kind: ElementaryKind) -> Result<TagValue> {
    let need = kind.size();
    if buf.remaining() < need {
        return Err(CipError::Decode(format!(
            "payload truncated: need {need} bytes for one {kind:?}, have {}",
            buf.remaining()
        )));
    }

    let value = match kind {
        ElementaryKind::Bool => TagValue::Bool(buf.get_u8() != 0),
        ElementaryKind::Sint => TagValue::Sint(buf.get_i8()),
        ElementaryKind::Int => TagValue::Int(buf.get_i16_le()),
        ElementaryKind::Dint => TagValue::Dint(buf.get_i32_le()),
        ElementaryKind::Lint => TagValue::Lint(buf.get_i64_le()),
        ElementaryKind::Usint => TagValue::Usint(buf.get_u8()),
        ElementaryKind::Uint => TagValue::Uint(buf.get_u16_le()),
        ElementaryKind::Udint => TagValue::Udint(buf.get_u32_le()),
        ElementaryKind::Ulint => TagValue::Ulint(buf.get_u64_le()),
        ElementaryKind::Real => TagValue::Real(buf.get_f32_le()),
        ElementaryKind::Lreal => TagValue::Lreal(buf.get_f64_le()),
        ElementaryKind::String | ElementaryKind::Unknown => {
            return Err(CipError::Decode(format!(
                "{kind:?} has no fixed-width encoding"
            )))
        }
    };
    Ok(value)
}

/// Reads a scalar STRING: u32 length prefix followed by that many bytes.
fn read_string_scalar(buf: &mut &[u8]) -> Result<TagValue> {
    if buf.remaining() < 4 {
        return Err(CipError::Decode(
            "payload truncated in string length prefix".to_string(),
        ));
    }
    let len = buf.get_u32_le() as usize;
    if buf.remaining() < len {
        return Err(CipError::Decode(format!(
            "payload truncated: string declares {len} bytes, have {}",
            buf.remaining()
        )));
    }
    let text = String::from_utf8_lossy(&buf[..len]).into_owned();
    buf.advance(len);
    Ok(TagValue::String(text))
}

/// Reads one fixed-slot STRING array element: u32 length prefix plus an
/// 84-byte character buffer, truncated to the declared length.
fn read_string_slot(buf: &mut &[u8]) -> Result<TagValue> {
    if buf.remaining() < 4 + STRING_SLOT_BYTES {
        return Err(CipError::Decode(format!(
            "payload truncated: string slot needs {} bytes, have {}",
            4 + STRING_SLOT_BYTES,
            buf.remaining()
        )));
    }
    let len = (buf.get_u32_le() as usize).min(STRING_SLOT_BYTES);
    let text = String::from_utf8_lossy(&buf[..len]).into_owned();
    buf.advance(STRING_SLOT_BYTES);
    Ok(TagValue::String(text))
}
