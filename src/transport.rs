//! The seam between the CIP application layer and the EtherNet/IP
//! encapsulation transport.
//!
//! Everything below the Message Router envelope — TCP sessions, encapsulation
//! framing, Common Packet Format item packing — lives behind
//! [`EipTransport`]. The client hands the transport one
//! [`MessageRouterRequest`] per call and expects one decoded
//! [`MessageRouterResponse`] back. A conforming implementation submits the
//! request as a SendRRData pair of CPF items (an empty UCMM address item plus
//! an unconnected-message item carrying [`MessageRouterRequest::encode`]) and
//! decodes the second response item with [`MessageRouterResponse::decode`].

use async_trait::async_trait;
use bytes::{Buf, BufMut};

use crate::error::{CipError, Result};

/// A Message Router request: service code, addressing path and request data.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MessageRouterRequest {
    /// CIP service code.
    pub service: u8,
    /// Encoded request path (see [`crate::segment`]).
    pub path: Vec<u8>,
    /// Service-specific request data.
    pub data: Vec<u8>,
}

impl MessageRouterRequest {
    /// Builds a request from its parts.
    pub fn new(service: u8, path: Vec<u8>, data: Vec<u8>) -> Self {
        MessageRouterRequest { service, path, data }
    }

    /// Encodes the request: service byte, path size in words, path bytes,
    /// then request data.
    pub fn encode(&self) -> Vec<u8> {
        let mut buffer = Vec::with_capacity(2 + self.path.len() + self.data.len());
        buffer.put_u8(self.service);
        buffer.put_u8((self.path.len() / 2) as u8);
        buffer.put_slice(&self.path);
        buffer.put_slice(&self.data);
        buffer
    }
}

/// A decoded Message Router response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MessageRouterResponse {
    /// Reply service code (request service with the reply bit set).
    pub reply_service: u8,
    /// General status; zero means success, 0x06 means a partial reply with
    /// more data available.
    pub general_status: u8,
    /// Additional status words as raw bytes.
    pub additional_status: Vec<u8>,
    /// Service response data.
    pub data: Vec<u8>,
}

impl MessageRouterResponse {
    /// Decodes a raw response: reply service, reserved byte, general status,
    /// additional status size (in words) and bytes, then response data.
    pub fn decode(raw: &[u8]) -> Result<Self> {
        let mut buf = raw;
        if buf.remaining() < 4 {
            return Err(CipError::Protocol(format!(
                "message router response too short: {} bytes",
                raw.len()
            )));
        }

        let reply_service = buf.get_u8();
        let _reserved = buf.get_u8();
        let general_status = buf.get_u8();
        let additional_len = buf.get_u8() as usize * 2;

        if buf.remaining() < additional_len {
            return Err(CipError::Protocol(
                "message router response truncated in additional status".to_string(),
            ));
        }
        let additional_status = buf[..additional_len].to_vec();
        buf.advance(additional_len);

        Ok(MessageRouterResponse {
            reply_service,
            general_status,
            additional_status,
            data: buf.to_vec(),
        })
    }

    /// Converts a non-zero general status into [`CipError::Status`], carrying
    /// the reply service and status bytes verbatim.
    pub fn ensure_success(&self) -> Result<()> {
        if self.general_status != 0 {
            return Err(CipError::status(
                self.reply_service,
                self.general_status,
                &self.additional_status,
            ));
        }
        Ok(())
    }
}

/// The encapsulation-layer transport used to exchange one request/reply pair.
///
/// Implementations own connection management, timeouts and framing. The
/// channel carries a single outstanding request at a time; the client
/// serializes access on its side, so implementations may assume calls do not
/// overlap.
#[async_trait]
pub trait EipTransport: Send {
    /// Submits one request and waits for its decoded response.
    ///
    /// `timeout_secs` bounds the encapsulation-level wait; routing timeouts
    /// ride inside the request payload and are enforced by the devices on the
    /// path.
    async fn send_rr_data(
        &mut self,
        request: MessageRouterRequest,
        timeout_secs: u8,
    ) -> Result<MessageRouterResponse>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_encode() {
        let request = MessageRouterRequest::new(
            0x4C,
            vec![0x20, 0x6B, 0x24, 0x01],
            vec![0x01, 0x00],
        );
        assert_eq!(
            request.encode(),
            vec![0x4C, 0x02, 0x20, 0x6B, 0x24, 0x01, 0x01, 0x00]
        );
    }

    #[test]
    fn test_response_decode() {
        let raw = [0xCC, 0x00, 0x00, 0x00, 0xC4, 0x00, 0xD6, 0xFF, 0xFF, 0xFF];
        let response = MessageRouterResponse::decode(&raw).unwrap();
        assert_eq!(response.reply_service, 0xCC);
        assert_eq!(response.general_status, 0);
        assert!(response.additional_status.is_empty());
        assert_eq!(response.data, vec![0xC4, 0x00, 0xD6, 0xFF, 0xFF, 0xFF]);
        assert!(response.ensure_success().is_ok());
    }

    #[test]
    fn test_response_decode_with_additional_status() {
        let raw = [0xCC, 0x00, 0x01, 0x01, 0x34, 0x12, 0xAB];
        let response = MessageRouterResponse::decode(&raw).unwrap();
        assert_eq!(response.general_status, 0x01);
        assert_eq!(response.additional_status, vec![0x34, 0x12]);
        assert_eq!(response.data, vec![0xAB]);

        match response.ensure_success() {
            Err(CipError::Status {
                service,
                general,
                additional,
            }) => {
                assert_eq!(service, 0xCC);
                assert_eq!(general, 0x01);
                assert_eq!(additional, vec![0x34, 0x12]);
            }
            other => panic!("expected status error, got {other:?}"),
        }
    }

    #[test]
    fn test_response_decode_truncated() {
        assert!(MessageRouterResponse::decode(&[0xCC, 0x00]).is_err());
        // Claims two additional status words but carries none
        assert!(MessageRouterResponse::decode(&[0xCC, 0x00, 0x01, 0x02]).is_err());
    }
}
