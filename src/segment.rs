//! CIP path segment encoders.
//!
//! A CIP request addresses its target with a sequence of encoded segments:
//! port segments route through backplanes and network hops, logical segments
//! address classes/instances/attributes, and data segments carry inline
//! payload such as ANSI symbolic names. The builders here are pure and total:
//! any address value and any link/data byte sequence encodes successfully.

use bytes::BufMut;

/// Segment class bits (upper three bits of the first segment byte).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum SegmentType {
    /// Port segment (routing hop).
    Port = 0 << 5,
    /// Logical segment (class/instance/attribute addressing).
    Logical = 1 << 5,
    /// Network segment.
    Network = 2 << 5,
    /// Symbolic segment.
    Symbolic = 3 << 5,
    /// Data segment.
    Data = 4 << 5,
    /// Data type segment (constructed).
    DataType1 = 5 << 5,
    /// Data type segment (elementary).
    DataType2 = 6 << 5,
}

/// Logical segment subtype bits (bits 2..=4 of the first segment byte).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum LogicalType {
    /// Class ID.
    ClassId = 0 << 2,
    /// Instance ID.
    InstanceId = 1 << 2,
    /// Member ID.
    MemberId = 2 << 2,
    /// Connection point.
    ConnectionPoint = 3 << 2,
    /// Attribute ID.
    AttributeId = 4 << 2,
    /// Special.
    Special = 5 << 2,
    /// Service ID.
    ServiceId = 6 << 2,
}

/// Data segment subtype bits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum DataSegmentType {
    /// Simple data segment.
    Simple = 0x00,
    /// ANSI extended symbol segment.
    Ansi = 0x11,
}

/// Builds a logical segment addressing `address` as the given logical type.
///
/// The address width is chosen by magnitude: one byte for values up to 255
/// (format bits 0), two bytes up to 65535 (format bits 1), otherwise four
/// bytes (format bits 2). In the 16-bit case a zero pad byte is inserted
/// between the header byte and the address when `padded` is requested, so
/// the address lands on a word boundary.
///
/// # Examples
///
/// ```rust
/// use cip_client::segment::{build_logical, LogicalType};
///
/// // Class 0x6B (Symbol object), one-byte address
/// assert_eq!(build_logical(LogicalType::ClassId, 0x6B, true), vec![0x20, 0x6B]);
///
/// // 16-bit instance address, padded
/// assert_eq!(
///     build_logical(LogicalType::InstanceId, 0x1234, true),
///     vec![0x25, 0x00, 0x34, 0x12]
/// );
/// ```
pub fn build_logical(kind: LogicalType, address: u32, padded: bool) -> Vec<u8> {
    let format: u8 = if address <= 0xFF {
        0
    } else if address <= 0xFFFF {
        1
    } else {
        2
    };

    let mut buffer = Vec::with_capacity(6);
    buffer.put_u8(SegmentType::Logical as u8 | kind as u8 | format);

    if format == 1 && padded {
        buffer.put_u8(0);
    }

    match format {
        0 => buffer.put_u8(address as u8),
        1 => buffer.put_u16_le(address as u16),
        _ => buffer.put_u32_le(address),
    }

    buffer
}

/// Builds a port segment routing through `port_id` with the given link
/// address.
///
/// Multi-byte links set the extended-link flag (0x10) and carry an explicit
/// link length byte; port ids of 15 or above are escaped to 0xF in the header
/// and carried as a trailing 16-bit value. An odd-length encoding gets a
/// single zero pad byte when `padded` is requested.
///
/// # Examples
///
/// ```rust
/// use cip_client::segment::build_port;
///
/// // Backplane (port 1), slot 0 — the common single-hop route
/// assert_eq!(build_port(&[0], 1, true), vec![0x01, 0x00]);
/// ```
pub fn build_port(link: &[u8], port_id: u16, padded: bool) -> Vec<u8> {
    let extended_link = link.len() > 1;
    let extended_port = port_id >= 15;

    let mut buffer = Vec::with_capacity(4 + link.len());

    let mut first = SegmentType::Port as u8;
    if extended_link {
        first |= 0x10;
    }
    if extended_port {
        first |= 0x0F;
    } else {
        first |= port_id as u8;
    }
    buffer.put_u8(first);

    if extended_link {
        buffer.put_u8(link.len() as u8);
    }
    if extended_port {
        buffer.put_u16_le(port_id);
    }
    buffer.put_slice(link);

    if padded && buffer.len() % 2 == 1 {
        buffer.put_u8(0);
    }

    buffer
}

/// Builds a data segment wrapping `data` with a one-byte length prefix.
///
/// Data length must fit in a byte; longer inputs are truncated to 255 by the
/// cast, matching the wire format's limit. A zero pad byte keeps the total
/// length even when `padded` is requested.
pub fn build_data(kind: DataSegmentType, data: &[u8], padded: bool) -> Vec<u8> {
    let mut buffer = Vec::with_capacity(3 + data.len());

    buffer.put_u8(SegmentType::Data as u8 | kind as u8);
    buffer.put_u8(data.len() as u8);
    buffer.put_slice(data);

    if padded && buffer.len() % 2 == 1 {
        buffer.put_u8(0);
    }

    buffer
}

/// Concatenates encoded segments into one path, in order, with no added
/// framing. Segment order is semantically meaningful (class before instance,
/// etc.) and is the caller's responsibility.
pub fn paths(segments: &[Vec<u8>]) -> Vec<u8> {
    let mut buffer = Vec::with_capacity(segments.iter().map(Vec::len).sum());
    for segment in segments {
        buffer.extend_from_slice(segment);
    }
    buffer
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_logical_one_byte_address() {
        // Format bits 0, one-byte address, no pad in any case
        assert_eq!(build_logical(LogicalType::ClassId, 0x01, true), vec![0x20, 0x01]);
        assert_eq!(build_logical(LogicalType::ClassId, 0xFF, true), vec![0x20, 0xFF]);
        assert_eq!(build_logical(LogicalType::InstanceId, 0x6B, false), vec![0x24, 0x6B]);
    }

    #[test]
    fn test_logical_two_byte_address() {
        // Format bits 1; pad byte only when requested
        assert_eq!(
            build_logical(LogicalType::InstanceId, 0x100, true),
            vec![0x25, 0x00, 0x00, 0x01]
        );
        assert_eq!(
            build_logical(LogicalType::InstanceId, 0x100, false),
            vec![0x25, 0x00, 0x01]
        );
        assert_eq!(
            build_logical(LogicalType::AttributeId, 0xFFFF, true),
            vec![0x31, 0x00, 0xFF, 0xFF]
        );
    }

    #[test]
    fn test_logical_four_byte_address() {
        // Format bits 2; no pad byte in the 32-bit case
        assert_eq!(
            build_logical(LogicalType::InstanceId, 0x10000, true),
            vec![0x26, 0x00, 0x00, 0x01, 0x00]
        );
        assert_eq!(
            build_logical(LogicalType::InstanceId, 0xDEAD_BEEF, false),
            vec![0x26, 0xEF, 0xBE, 0xAD, 0xDE]
        );
    }

    #[test]
    fn test_logical_padded_length_is_even() {
        // The pad byte applies to the 16-bit case only; 8-bit encodings are
        // naturally even and the 32-bit form is written as-is
        for address in [0u32, 1, 255, 256, 4096, 65535] {
            let encoded = build_logical(LogicalType::ClassId, address, true);
            assert_eq!(encoded.len() % 2, 0, "address {address} encoded odd length");
        }
        assert_eq!(build_logical(LogicalType::ClassId, 65536, true).len(), 5);
    }

    #[test]
    fn test_port_short_form() {
        // Single-hop backplane route: header carries the port id directly
        assert_eq!(build_port(&[1], 1, true), vec![0x01, 0x01]);
        assert_eq!(build_port(&[3], 2, true), vec![0x02, 0x03]);
        // portId 14 is the last value that fits the header nibble
        assert_eq!(build_port(&[0], 14, false), vec![0x0E, 0x00]);
    }

    #[test]
    fn test_port_extended_link() {
        // Two-hop link: extended-link flag plus explicit length byte
        let encoded = build_port(&[0x02, 0x05], 1, true);
        assert_eq!(encoded, vec![0x11, 0x02, 0x02, 0x05]);
    }

    #[test]
    fn test_port_extended_port_id() {
        // Port 15 and above escape to 0xF + trailing 16-bit id
        let encoded = build_port(&[1], 15, false);
        assert_eq!(encoded, vec![0x0F, 0x0F, 0x00, 0x01]);

        let encoded = build_port(&[1], 0x1234, false);
        assert_eq!(encoded, vec![0x0F, 0x34, 0x12, 0x01]);
    }

    #[test]
    fn test_port_round_trip() {
        // Decoding the emitted bytes recovers link and port id exactly
        fn decode(bytes: &[u8]) -> (Vec<u8>, u16) {
            let first = bytes[0];
            let extended_link = first & 0x10 != 0;
            let mut offset = 1;
            let link_len = if extended_link {
                let len = bytes[offset] as usize;
                offset += 1;
                len
            } else {
                1
            };
            let port_id = if first & 0x0F == 0x0F {
                let id = u16::from_le_bytes([bytes[offset], bytes[offset + 1]]);
                offset += 2;
                id
            } else {
                (first & 0x0F) as u16
            };
            (bytes[offset..offset + link_len].to_vec(), port_id)
        }

        let cases: &[(&[u8], u16)] = &[
            (&[0], 1),
            (&[7], 14),
            (&[1, 2, 3], 1),
            (&[9], 15),
            (&[4, 5], 300),
        ];
        for (link, port_id) in cases {
            let encoded = build_port(link, *port_id, true);
            let (got_link, got_port) = decode(&encoded);
            assert_eq!(got_link.as_slice(), *link);
            assert_eq!(got_port, *port_id);
        }
    }

    #[test]
    fn test_port_padding_parity() {
        // padded = true always yields an even length
        for link_len in 1..=5usize {
            let link = vec![0u8; link_len];
            for port_id in [1u16, 15, 400] {
                let padded = build_port(&link, port_id, true);
                assert_eq!(padded.len() % 2, 0);

                // padded = false follows natural parity: re-encoding with the
                // pad stripped matches
                let unpadded = build_port(&link, port_id, false);
                assert!(padded.len() - unpadded.len() <= 1);
                assert_eq!(&padded[..unpadded.len()], unpadded.as_slice());
            }
        }
    }

    #[test]
    fn test_data_segment() {
        let encoded = build_data(DataSegmentType::Ansi, b"Tag", true);
        assert_eq!(encoded, vec![0x91, 0x03, b'T', b'a', b'g', 0x00]);

        let encoded = build_data(DataSegmentType::Ansi, b"Tag1", true);
        assert_eq!(encoded, vec![0x91, 0x04, b'T', b'a', b'g', b'1']);

        // Unpadded keeps the natural (odd) length
        let encoded = build_data(DataSegmentType::Simple, &[0xAA], false);
        assert_eq!(encoded, vec![0x80, 0x01, 0xAA]);
    }

    #[test]
    fn test_paths_concatenation() {
        let class = build_logical(LogicalType::ClassId, 0x06, true);
        let instance = build_logical(LogicalType::InstanceId, 0x01, true);
        let combined = paths(&[class.clone(), instance.clone()]);
        assert_eq!(combined, vec![0x20, 0x06, 0x24, 0x01]);
        assert_eq!(combined.len(), class.len() + instance.len());

        assert!(paths(&[]).is_empty());
    }
}
