//! # CIP client application layer
//!
//! A client-side implementation of the Common Industrial Protocol (CIP)
//! application layer for addressing, discovering and reading/writing tags on
//! CIP devices (PLCs) over an EtherNet/IP transport.
//!
//! The crate owns the protocol-correctness logic: CIP path segment encoding
//! ([`segment`]), the 16-bit type descriptor model ([`types`]), the
//! Unconnected Send routing envelope ([`unconnected`]), the typed tag value
//! codec ([`value`]) and the paginated symbol-table walk
//! ([`CipClient::list_all_tags`]). The encapsulation transport underneath —
//! TCP session, framing, Common Packet Format — is consumed through the
//! narrow [`EipTransport`](transport::EipTransport) seam and is not
//! implemented here.
//!
//! ## Example
//!
//! ```rust,no_run
//! use cip_client::{CipClient, TagValue};
//! use cip_client::transport::{EipTransport, MessageRouterRequest, MessageRouterResponse};
//!
//! # struct MyTransport;
//! # #[async_trait::async_trait]
//! # impl EipTransport for MyTransport {
//! #     async fn send_rr_data(
//! #         &mut self,
//! #         _request: MessageRouterRequest,
//! #         _timeout_secs: u8,
//! #     ) -> cip_client::Result<MessageRouterResponse> {
//! #         unimplemented!("encapsulation layer")
//! #     }
//! # }
//! #[tokio::main]
//! async fn main() -> cip_client::Result<()> {
//!     // `MyTransport` implements `EipTransport` on top of your
//!     // encapsulation/session layer.
//!     let client = CipClient::new(MyTransport, 0);
//!
//!     let identity = client.get_attribute_all().await?;
//!     println!("connected to {}", identity.product_name);
//!
//!     let mut tags = client.list_all_tags().await?;
//!     if let Some(tag) = tags.get_mut("SetPoint") {
//!         let value = client.read_tag(tag).await?;
//!         println!("SetPoint = {value:?}");
//!         client.write_tag(tag, &TagValue::Dint(1500)).await?;
//!     }
//!     Ok(())
//! }
//! ```

use std::sync::Arc;

use bytes::{Buf, BufMut};
use log::{debug, warn};
use tokio::sync::Mutex;

pub mod error;
pub mod segment;
pub mod tag;
pub mod transport;
pub mod types;
pub mod unconnected;
pub mod value;

pub use error::{CipError, Result};
pub use tag::{Tag, TagMap};
pub use types::{CommonAttributes, ElementaryKind, TypeDescriptor};
pub use value::TagValue;

use segment::{build_logical, build_port, paths, LogicalType};
use transport::{EipTransport, MessageRouterRequest, MessageRouterResponse};
use unconnected::UnconnectedSend;

// =========================================================================
// SERVICE AND OBJECT CONSTANTS
// =========================================================================

/// Get_Attribute_All service.
pub const SERVICE_GET_ATTRIBUTE_ALL: u8 = 0x01;
/// Read Tag service.
pub const SERVICE_READ_TAG: u8 = 0x4C;
/// Write Tag service.
pub const SERVICE_WRITE_TAG: u8 = 0x4D;
/// Unconnected Send service (also Read Tag Fragmented at the Symbol object).
pub const SERVICE_UNCONNECTED_SEND: u8 = 0x52;
/// Get_Instance_Attribute_List service, used for the symbol-table walk.
pub const SERVICE_GET_INSTANCE_ATTRIBUTE_LIST: u8 = 0x55;

/// Identity object class.
const CLASS_IDENTITY: u32 = 0x01;
/// Connection Manager object class.
const CLASS_CONNECTION_MANAGER: u32 = 0x06;
/// Symbol object class (the device's tag table).
const CLASS_SYMBOL: u32 = 0x6B;

/// General status signalling a partial reply with more data available.
const STATUS_MORE_DATA: u8 = 0x06;

/// Type code marker preceding structured-string read payloads.
const STRUCTURED_STRING_MARKER: u16 = 0x02A0;

/// Encapsulation-level timeout handed to the transport, in seconds.
const ENCAP_TIMEOUT_SECS: u8 = 10;

/// Messaging capability of a client.
///
/// Only unconnected (UCMM) messaging is implemented; the connected variant
/// exists so callers can express intent, but constructing a client with it
/// is rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Messaging {
    /// Unconnected messaging through the Connection Manager (supported).
    Unconnected,
    /// Class 3 connected messaging (not implemented).
    Connected,
}

/// Identity attributes of a device, from Get_Attribute_All on the Identity
/// object.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct DeviceIdentity {
    /// ODVA vendor id.
    pub vendor_id: u16,
    /// General device type.
    pub device_type: u16,
    /// Vendor-assigned product code.
    pub product_code: u16,
    /// Major revision.
    pub major: u8,
    /// Minor revision.
    pub minor: u8,
    /// Device status word.
    pub status: u16,
    /// Serial number.
    pub serial_number: u32,
    /// Product name string.
    pub product_name: String,
}

impl DeviceIdentity {
    fn decode(data: &[u8]) -> Result<Self> {
        let mut buf = data;
        if buf.remaining() < 15 {
            return Err(CipError::Decode(format!(
                "identity payload too short: {} bytes",
                data.len()
            )));
        }

        let vendor_id = buf.get_u16_le();
        let device_type = buf.get_u16_le();
        let product_code = buf.get_u16_le();
        let major = buf.get_u8();
        let minor = buf.get_u8();
        let status = buf.get_u16_le();
        let serial_number = buf.get_u32_le();

        let name_len = buf.get_u8() as usize;
        if buf.remaining() < name_len {
            return Err(CipError::Decode(
                "identity payload truncated in product name".to_string(),
            ));
        }
        let product_name = String::from_utf8_lossy(&buf[..name_len]).into_owned();

        Ok(DeviceIdentity {
            vendor_id,
            device_type,
            product_code,
            major,
            minor,
            status,
            serial_number,
            product_name,
        })
    }
}

/// The request/response orchestrator for one CIP device.
///
/// Owns the routing parameters (backplane slot, timing ticks) and funnels
/// every request through [`CipClient::send_unconnected`], which wraps it in
/// an Unconnected Send envelope routed to the target slot. The transport is
/// held behind a mutex so at most one request is outstanding at a time —
/// the underlying channel is a single request/reply stream with no
/// multiplexing.
///
/// Cloning a client is cheap and shares the transport; multiple [`Tag`]s can
/// be served by one client.
#[derive(Debug)]
pub struct CipClient<T> {
    transport: Arc<Mutex<T>>,
    slot: u8,
    time_tick: u8,
    timeout_ticks: u8,
    messaging: Messaging,
}

impl<T> Clone for CipClient<T> {
    fn clone(&self) -> Self {
        CipClient {
            transport: Arc::clone(&self.transport),
            slot: self.slot,
            time_tick: self.time_tick,
            timeout_ticks: self.timeout_ticks,
            messaging: self.messaging,
        }
    }
}

impl<T: EipTransport> CipClient<T> {
    /// Creates a client over an established transport, routing requests to
    /// the processor in the given backplane slot.
    ///
    /// Timing defaults to a time tick of 3 and 250 timeout ticks.
    pub fn new(transport: T, slot: u8) -> Self {
        CipClient {
            transport: Arc::new(Mutex::new(transport)),
            slot,
            time_tick: 3,
            timeout_ticks: 250,
            messaging: Messaging::Unconnected,
        }
    }

    /// Creates a client with an explicit messaging capability.
    ///
    /// Only [`Messaging::Unconnected`] is supported; requesting
    /// [`Messaging::Connected`] returns a protocol error.
    pub fn with_messaging(transport: T, slot: u8, messaging: Messaging) -> Result<Self> {
        if messaging == Messaging::Connected {
            return Err(CipError::Protocol(
                "connected messaging is not implemented".to_string(),
            ));
        }
        Ok(CipClient {
            messaging,
            ..Self::new(transport, slot)
        })
    }

    /// The client's messaging capability.
    pub fn messaging(&self) -> Messaging {
        self.messaging
    }

    /// The backplane slot requests are routed to.
    pub fn slot(&self) -> u8 {
        self.slot
    }

    /// Reconfigures the Unconnected Send timing parameters.
    pub fn set_timeout(&mut self, time_tick: u8, timeout_ticks: u8) {
        self.time_tick = time_tick;
        self.timeout_ticks = timeout_ticks;
    }

    /// Sends one unconnected request and returns the decoded response.
    ///
    /// The caller's service/path/payload triple is encoded as a Message
    /// Router request, embedded in an Unconnected Send (0x52) envelope routed
    /// through port 1 to the configured slot, and addressed to the Connection
    /// Manager (class 6, instance 1). The response status is returned as-is;
    /// callers that cannot handle a non-zero general status should follow up
    /// with [`MessageRouterResponse::ensure_success`].
    pub async fn send_unconnected(
        &self,
        service: u8,
        path: Vec<u8>,
        data: Vec<u8>,
    ) -> Result<MessageRouterResponse> {
        let embedded = MessageRouterRequest::new(service, path, data).encode();
        let envelope = UnconnectedSend::new(
            self.time_tick,
            self.timeout_ticks,
            embedded,
            build_port(&[self.slot], 1, true),
        );

        let request = MessageRouterRequest::new(
            SERVICE_UNCONNECTED_SEND,
            paths(&[
                build_logical(LogicalType::ClassId, CLASS_CONNECTION_MANAGER, true),
                build_logical(LogicalType::InstanceId, 0x01, true),
            ]),
            envelope.encode(),
        );

        let mut transport = self.transport.lock().await;
        transport.send_rr_data(request, ENCAP_TIMEOUT_SECS).await
    }

    /// Reads the device's identity (Get_Attribute_All on the Identity
    /// object).
    pub async fn get_attribute_all(&self) -> Result<DeviceIdentity> {
        let path = paths(&[
            build_logical(LogicalType::ClassId, CLASS_IDENTITY, true),
            build_logical(LogicalType::InstanceId, 0x01, true),
        ]);

        let response = self
            .send_unconnected(SERVICE_GET_ATTRIBUTE_ALL, path, Vec::new())
            .await?;
        response.ensure_success()?;

        DeviceIdentity::decode(&response.data)
    }

    /// Reads the common class-level attributes of an object class
    /// (Get_Attribute_All on instance 0).
    pub async fn get_class_attributes(&self, class_id: u32) -> Result<CommonAttributes> {
        let path = paths(&[
            build_logical(LogicalType::ClassId, class_id, true),
            build_logical(LogicalType::InstanceId, 0x00, true),
        ]);

        let response = self
            .send_unconnected(SERVICE_GET_ATTRIBUTE_ALL, path, Vec::new())
            .await?;
        response.ensure_success()?;

        CommonAttributes::decode(&response.data)
    }

    /// Reads a tag's current value.
    ///
    /// Issues a Read Tag (0x4C) for the tag's full element count against its
    /// symbol instance, strips the leading type code from the reply and runs
    /// the payload through [`Tag::decode_payload`] — updating the tag's cache
    /// and firing its change observer when the bytes differ.
    pub async fn read_tag(&self, tag: &mut Tag) -> Result<TagValue> {
        let mut data = Vec::with_capacity(2);
        data.put_u16_le(tag.element_count());

        let response = self
            .send_unconnected(SERVICE_READ_TAG, self.symbol_path(tag.instance_id), data)
            .await?;
        response.ensure_success()?;

        let mut buf = response.data.as_slice();
        if buf.remaining() < 2 {
            return Err(CipError::Decode(
                "read response missing type code".to_string(),
            ));
        }
        let type_code = buf.get_u16_le();
        // Structured strings carry an extra structure-handle word before the
        // payload
        if type_code == STRUCTURED_STRING_MARKER {
            if buf.remaining() < 2 {
                return Err(CipError::Decode(
                    "read response missing structure handle".to_string(),
                ));
            }
            buf.get_u16_le();
        }

        debug!(
            "read tag {}: type 0x{type_code:04X}, {} payload bytes",
            tag.name,
            buf.remaining()
        );
        tag.decode_payload(buf)
    }

    /// Writes a value to a tag.
    ///
    /// Issues a Write Tag (0x4D) carrying the tag's 16-bit type descriptor,
    /// its element count and the value's wire encoding. On success the tag's
    /// cached payload is replaced with the written bytes; the change observer
    /// is not fired (it reports device-side changes seen by reads). Written
    /// values are not read back for verification.
    pub async fn write_tag(&self, tag: &mut Tag, new_value: &TagValue) -> Result<()> {
        let value_bytes = new_value.to_bytes();

        let mut data = Vec::with_capacity(4 + value_bytes.len());
        data.put_u16_le(tag.ty.raw());
        data.put_u16_le(tag.element_count());
        data.put_slice(&value_bytes);

        let response = self
            .send_unconnected(SERVICE_WRITE_TAG, self.symbol_path(tag.instance_id), data)
            .await?;
        response.ensure_success()?;

        debug!("wrote tag {}: {} bytes", tag.name, value_bytes.len());
        tag.store_raw(value_bytes);
        Ok(())
    }

    /// Enumerates the device's symbol table into a name → tag map.
    ///
    /// Walks the Symbol object (class 0x6B) with Get_Instance_Attribute_List
    /// (0x55) requesting name, type and dimensions. A general status of 0x06
    /// means more data follows; the walk continues from the highest instance
    /// id seen plus one. Records whose type descriptor fails validation are
    /// dropped from the map without aborting the walk. Any other non-zero
    /// status aborts the walk and discards the accumulated map.
    pub async fn list_all_tags(&self) -> Result<TagMap> {
        let mut map = TagMap::new();
        let mut start_instance: u32 = 0;

        loop {
            // Attribute ids 1 (name), 2 (type), 8 (dimensions)
            let mut data = Vec::with_capacity(8);
            data.put_u16_le(3);
            data.put_u16_le(1);
            data.put_u16_le(2);
            data.put_u16_le(8);

            let response = self
                .send_unconnected(
                    SERVICE_GET_INSTANCE_ATTRIBUTE_LIST,
                    self.symbol_path(start_instance),
                    data,
                )
                .await?;

            if response.general_status != 0 && response.general_status != STATUS_MORE_DATA {
                return Err(CipError::status(
                    response.reply_service,
                    response.general_status,
                    &response.additional_status,
                ));
            }

            let (records, last_instance) = tag::parse_symbol_page(&response.data)?;
            debug!(
                "symbol page from instance {start_instance}: {} records",
                records.len()
            );

            for record in records {
                if record.ty.is_valid() {
                    map.insert(record.name.clone(), record);
                } else {
                    debug!(
                        "dropping tag {} with invalid descriptor {}",
                        record.name, record.ty
                    );
                }
            }

            if response.general_status != STATUS_MORE_DATA {
                return Ok(map);
            }

            // A compliant device reports strictly increasing instance ids;
            // refuse to loop if it does not advance.
            let next = match last_instance {
                Some(id) => id.wrapping_add(1),
                None => {
                    warn!(
                        "symbol page at instance {start_instance} was empty but reported more data"
                    );
                    return Err(CipError::Protocol(
                        "symbol enumeration returned an empty partial page".to_string(),
                    ));
                }
            };
            if next <= start_instance {
                return Err(CipError::Protocol(format!(
                    "symbol enumeration did not advance past instance {start_instance}"
                )));
            }
            start_instance = next;
        }
    }

    /// Path to a Symbol object instance.
    fn symbol_path(&self, instance_id: u32) -> Vec<u8> {
        paths(&[
            build_logical(LogicalType::ClassId, CLASS_SYMBOL, true),
            build_logical(LogicalType::InstanceId, instance_id, true),
        ])
    }
}
