//! Unconnected Send (service 0x52) envelope.
//!
//! Routes an embedded Message Router request through intermediate ports to a
//! target without establishing a connection. The envelope is directed at the
//! Connection Manager object (class 6, instance 1); its route path is a port
//! segment addressing the target backplane slot.

use bytes::BufMut;

/// The Unconnected Send payload.
///
/// Wire layout of [`UnconnectedSend::encode`]:
///
/// | field                 | size              |
/// |-----------------------|-------------------|
/// | time tick             | 1 byte            |
/// | timeout ticks         | 1 byte            |
/// | embedded length       | 2 bytes, LE       |
/// | embedded request      | n bytes           |
/// | pad                   | 1 byte iff n odd  |
/// | route path size       | 1 byte (in words) |
/// | reserved              | 1 zero byte       |
/// | route path            | m bytes           |
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnconnectedSend {
    /// Priority/time tick value for the routing timeout.
    pub time_tick: u8,
    /// Timeout tick count; the effective timeout is derived from both tick
    /// fields by the devices along the route.
    pub timeout_ticks: u8,
    /// The embedded, already-encoded Message Router request.
    pub embedded: Vec<u8>,
    /// Encoded route path (normally a padded port segment).
    pub route_path: Vec<u8>,
}

impl UnconnectedSend {
    /// Builds an envelope from timing parameters, the embedded request and a
    /// route path.
    pub fn new(time_tick: u8, timeout_ticks: u8, embedded: Vec<u8>, route_path: Vec<u8>) -> Self {
        UnconnectedSend {
            time_tick,
            timeout_ticks,
            embedded,
            route_path,
        }
    }

    /// Encodes the envelope into its wire form.
    pub fn encode(&self) -> Vec<u8> {
        let mut buffer = Vec::with_capacity(6 + self.embedded.len() + self.route_path.len() + 1);

        buffer.put_u8(self.time_tick);
        buffer.put_u8(self.timeout_ticks);
        buffer.put_u16_le(self.embedded.len() as u16);
        buffer.put_slice(&self.embedded);

        if self.embedded.len() % 2 == 1 {
            buffer.put_u8(0);
        }

        buffer.put_u8((self.route_path.len() / 2) as u8);
        buffer.put_u8(0);
        buffer.put_slice(&self.route_path);

        buffer
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_even_embedded() {
        let ucs = UnconnectedSend::new(3, 250, vec![0xAA, 0xBB], vec![0x01, 0x00]);
        assert_eq!(
            ucs.encode(),
            vec![
                0x03, 0xFA, // ticks
                0x02, 0x00, // embedded length
                0xAA, 0xBB, // embedded request
                0x01, // route path words
                0x00, // reserved
                0x01, 0x00, // route path
            ]
        );
    }

    #[test]
    fn test_encode_odd_embedded_gets_pad() {
        let ucs = UnconnectedSend::new(3, 250, vec![0xAA, 0xBB, 0xCC], vec![0x01, 0x02]);
        let encoded = ucs.encode();
        // Length field reports the unpadded size
        assert_eq!(&encoded[2..4], &[0x03, 0x00]);
        // Pad byte sits between the embedded request and the path size
        assert_eq!(&encoded[4..8], &[0xAA, 0xBB, 0xCC, 0x00]);
        assert_eq!(encoded[8], 0x01);
        assert_eq!(encoded[9], 0x00);
        assert_eq!(&encoded[10..], &[0x01, 0x02]);
    }

    #[test]
    fn test_route_path_size_in_words() {
        let ucs = UnconnectedSend::new(1, 1, vec![], vec![0x01, 0x00, 0x02, 0x00]);
        let encoded = ucs.encode();
        assert_eq!(encoded[4], 0x02);
    }
}
