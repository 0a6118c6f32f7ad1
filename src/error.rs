use std::time::Duration;
use thiserror::Error;

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, CipError>;

/// Errors surfaced by the CIP client.
///
/// The variants map to the distinct failure classes of the protocol:
/// transport failures ([`CipError::Io`], [`CipError::Timeout`]), malformed
/// or non-compliant device behavior ([`CipError::Protocol`]), non-zero
/// device status replies ([`CipError::Status`]) and unsupported or truncated
/// payload shapes ([`CipError::Decode`]).
#[derive(Debug, Error)]
pub enum CipError {
    /// Underlying I/O failure from the transport.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The transport gave up waiting for a reply.
    #[error("operation timed out after {0:?}")]
    Timeout(Duration),

    /// The device violated the protocol (bad framing, non-advancing
    /// enumeration, unexpected payload shape at the transport seam).
    #[error("protocol error: {0}")]
    Protocol(String),

    /// Non-zero general status in a Message Router response. The reply
    /// service code and status bytes are carried verbatim, without
    /// reinterpretation.
    #[error("device error: service 0x{service:02X} | status 0x{general:02X} | additional {additional:02X?}")]
    Status {
        /// Reply service code from the response.
        service: u8,
        /// General status byte.
        general: u8,
        /// Additional status words, as raw bytes.
        additional: Vec<u8>,
    },

    /// A payload could not be decoded (truncated data, unsupported array
    /// rank, unknown elementary type). Cached tag state is never modified
    /// when this is returned.
    #[error("decode error: {0}")]
    Decode(String),

    /// Tag-level failure (unknown tag, unusable metadata).
    #[error("tag error: {0}")]
    Tag(String),
}

impl CipError {
    /// Builds a [`CipError::Status`] from the raw parts of a device reply.
    pub fn status(service: u8, general: u8, additional: &[u8]) -> Self {
        CipError::Status {
            service,
            general,
            additional: additional.to_vec(),
        }
    }
}
