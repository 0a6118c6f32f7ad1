//! Tag handles and symbol-table record parsing.
//!
//! A [`Tag`] is a caller-owned handle for one named data point in a device's
//! symbol table. It carries the server-assigned instance id, the type
//! descriptor and dimension lengths reported during enumeration, the last
//! raw payload decoded from the device, and an optional change observer that
//! fires when a decode produces bytes differing from the cache.

use std::collections::HashMap;
use std::fmt;

use bytes::Buf;
use log::trace;

use crate::error::{CipError, Result};
use crate::types::TypeDescriptor;
use crate::value::{self, TagValue};

/// Map of tag name to tag, as returned by a directory listing.
pub type TagMap = HashMap<String, Tag>;

/// A tag bound to a device symbol instance.
pub struct Tag {
    /// Server-assigned symbol instance id.
    pub instance_id: u32,
    /// Tag name, unique within the device's symbol table.
    pub name: String,
    /// 16-bit type descriptor reported by the device.
    pub ty: TypeDescriptor,
    dim1: u32,
    dim2: u32,
    dim3: u32,
    element_count: u16,
    raw: Vec<u8>,
    on_change: Option<Box<dyn FnMut() + Send>>,
}

impl Tag {
    /// Creates a tag from its symbol-table attributes.
    ///
    /// The element count is the product of the dimension lengths with unused
    /// (zero) dimensions counting as one; it is used as the requested element
    /// count in read requests. The request field is 16 bits wide, so the
    /// product saturates at 65535 elements.
    pub fn new(name: impl Into<String>, instance_id: u32, ty: TypeDescriptor, dims: [u32; 3]) -> Self {
        let count = dims
            .iter()
            .map(|&d| if d == 0 { 1 } else { u128::from(d) })
            .product::<u128>();
        Tag {
            instance_id,
            name: name.into(),
            ty,
            dim1: dims[0],
            dim2: dims[1],
            dim3: dims[2],
            element_count: count.min(u128::from(u16::MAX)) as u16,
            raw: Vec::new(),
            on_change: None,
        }
    }

    /// Dimension lengths as reported by the device (0 = unused dimension).
    pub fn dimensions(&self) -> [u32; 3] {
        [self.dim1, self.dim2, self.dim3]
    }

    /// Number of elements requested on reads, saturated to the 16-bit
    /// request field.
    pub fn element_count(&self) -> u16 {
        self.element_count
    }

    /// The last raw payload decoded for this tag.
    pub fn raw_value(&self) -> &[u8] {
        &self.raw
    }

    /// Registers a change observer, invoked synchronously on the decoding
    /// thread whenever a successful decode yields bytes that differ from the
    /// cached payload. The first decode of a tag with an empty cache always
    /// counts as a change.
    pub fn set_on_change(&mut self, callback: impl FnMut() + Send + 'static) {
        self.on_change = Some(Box::new(callback));
    }

    /// Removes the change observer.
    pub fn clear_on_change(&mut self) {
        self.on_change = None;
    }

    /// Decodes a raw read payload, updating the cache and notifying the
    /// change observer on success.
    ///
    /// On a decode failure the cache is left untouched and no notification
    /// fires.
    pub fn decode_payload(&mut self, payload: &[u8]) -> Result<TagValue> {
        let value = value::decode(payload, self.ty, self.dim1, self.dim2, self.dim3)?;

        if self.raw != payload {
            trace!("tag {} value changed ({} bytes)", self.name, payload.len());
            self.raw = payload.to_vec();
            if let Some(callback) = self.on_change.as_mut() {
                callback();
            }
        }

        Ok(value)
    }

    /// Decodes the cached payload.
    pub fn value(&self) -> Result<TagValue> {
        value::decode(&self.raw, self.ty, self.dim1, self.dim2, self.dim3)
    }

    /// Replaces the cached payload without notifying the observer. Used
    /// after successful writes so the cache reflects the value sent.
    pub(crate) fn store_raw(&mut self, payload: Vec<u8>) {
        self.raw = payload;
    }
}

impl fmt::Debug for Tag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Tag")
            .field("instance_id", &self.instance_id)
            .field("name", &self.name)
            .field("ty", &self.ty)
            .field("dims", &[self.dim1, self.dim2, self.dim3])
            .field("element_count", &self.element_count)
            .field("raw_len", &self.raw.len())
            .field("has_observer", &self.on_change.is_some())
            .finish()
    }
}

/// Parses one page of a symbol-table enumeration response.
///
/// Record layout: instance id (u32), name length (u16) + name bytes, type
/// descriptor (u16), three dimension lengths (u32 each). Records are parsed
/// until the buffer is exhausted; a record cut off mid-way is a decode
/// error. Returns the parsed tags (validity unchecked — the caller filters)
/// and the highest instance id seen, which seeds the next page request.
pub fn parse_symbol_page(data: &[u8]) -> Result<(Vec<Tag>, Option<u32>)> {
    let mut buf = data;
    let mut tags = Vec::new();
    let mut last_instance = None;

    while buf.has_remaining() {
        if buf.remaining() < 6 {
            return Err(CipError::Decode(format!(
                "symbol record truncated at header: {} bytes left",
                buf.remaining()
            )));
        }
        let instance_id = buf.get_u32_le();
        let name_len = buf.get_u16_le() as usize;

        if buf.remaining() < name_len + 14 {
            return Err(CipError::Decode(format!(
                "symbol record for instance {instance_id} truncated: need {} bytes, have {}",
                name_len + 14,
                buf.remaining()
            )));
        }
        let name = String::from_utf8_lossy(&buf[..name_len]).into_owned();
        buf.advance(name_len);

        let ty = TypeDescriptor::new(buf.get_u16_le());
        let dims = [buf.get_u32_le(), buf.get_u32_le(), buf.get_u32_le()];

        last_instance = Some(instance_id);
        tags.push(Tag::new(name, instance_id, ty, dims));
    }

    Ok((tags, last_instance))
}
