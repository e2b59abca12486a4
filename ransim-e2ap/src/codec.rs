//! E2AP frame codec
//!
//! Every PDU travels in a frame: a 4-byte big-endian length followed by a JSON
//! body `{seq, pdu}`. Requests carry a sequence number chosen by the initiator;
//! the responding side echoes it so that answers can be matched to requests.
//!
//! ```text
//! +----------------+------------------------------+
//! | length (u32 BE)| {"seq": n, "pdu": {...}}     |
//! +----------------+------------------------------+
//! ```

use bytes::{BufMut, Bytes, BytesMut};
use serde::{Deserialize, Serialize};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

use crate::cause::Cause;
use crate::error::E2apError;
use crate::procedures::*;

/// Maximum accepted frame body length.
pub const MAX_FRAME_LEN: usize = 1 << 20;

/// E2AP PDU
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum E2apPdu {
    E2SetupRequest(E2SetupRequest),
    E2SetupResponse(E2SetupResponse),
    E2SetupFailure(E2SetupFailure),
    E2NodeConfigurationUpdate(E2NodeConfigurationUpdate),
    E2NodeConfigurationUpdateAcknowledge(E2NodeConfigurationUpdateAcknowledge),
    E2NodeConfigurationUpdateFailure(E2NodeConfigurationUpdateFailure),
    E2ConnectionUpdate(E2ConnectionUpdate),
    E2ConnectionUpdateAcknowledge(E2ConnectionUpdateAcknowledge),
    E2ConnectionUpdateFailure(E2ConnectionUpdateFailure),
    RicSubscriptionRequest(RicSubscriptionRequest),
    RicSubscriptionResponse(RicSubscriptionResponse),
    RicSubscriptionFailure(RicSubscriptionFailure),
    RicSubscriptionDeleteRequest(RicSubscriptionDeleteRequest),
    RicSubscriptionDeleteResponse(RicSubscriptionDeleteResponse),
    RicSubscriptionDeleteFailure(RicSubscriptionDeleteFailure),
    RicControlRequest(RicControlRequest),
    RicControlAcknowledge(RicControlAcknowledge),
    RicControlFailure(RicControlFailure),
    RicIndication(RicIndication),
    ErrorIndication { cause: Cause },
}

impl E2apPdu {
    /// Message name used in logs.
    pub fn message_type(&self) -> &'static str {
        match self {
            E2apPdu::E2SetupRequest(_) => "E2SetupRequest",
            E2apPdu::E2SetupResponse(_) => "E2SetupResponse",
            E2apPdu::E2SetupFailure(_) => "E2SetupFailure",
            E2apPdu::E2NodeConfigurationUpdate(_) => "E2nodeConfigurationUpdate",
            E2apPdu::E2NodeConfigurationUpdateAcknowledge(_) => {
                "E2nodeConfigurationUpdateAcknowledge"
            }
            E2apPdu::E2NodeConfigurationUpdateFailure(_) => "E2nodeConfigurationUpdateFailure",
            E2apPdu::E2ConnectionUpdate(_) => "E2connectionUpdate",
            E2apPdu::E2ConnectionUpdateAcknowledge(_) => "E2connectionUpdateAcknowledge",
            E2apPdu::E2ConnectionUpdateFailure(_) => "E2connectionUpdateFailure",
            E2apPdu::RicSubscriptionRequest(_) => "RICsubscriptionRequest",
            E2apPdu::RicSubscriptionResponse(_) => "RICsubscriptionResponse",
            E2apPdu::RicSubscriptionFailure(_) => "RICsubscriptionFailure",
            E2apPdu::RicSubscriptionDeleteRequest(_) => "RICsubscriptionDeleteRequest",
            E2apPdu::RicSubscriptionDeleteResponse(_) => "RICsubscriptionDeleteResponse",
            E2apPdu::RicSubscriptionDeleteFailure(_) => "RICsubscriptionDeleteFailure",
            E2apPdu::RicControlRequest(_) => "RICcontrolRequest",
            E2apPdu::RicControlAcknowledge(_) => "RICcontrolAcknowledge",
            E2apPdu::RicControlFailure(_) => "RICcontrolFailure",
            E2apPdu::RicIndication(_) => "RICindication",
            E2apPdu::ErrorIndication { .. } => "ErrorIndication",
        }
    }

    /// Returns true for initiating messages (requests and indications).
    pub fn is_initiating(&self) -> bool {
        matches!(
            self,
            E2apPdu::E2SetupRequest(_)
                | E2apPdu::E2NodeConfigurationUpdate(_)
                | E2apPdu::E2ConnectionUpdate(_)
                | E2apPdu::RicSubscriptionRequest(_)
                | E2apPdu::RicSubscriptionDeleteRequest(_)
                | E2apPdu::RicControlRequest(_)
                | E2apPdu::RicIndication(_)
        )
    }
}

/// A PDU with its correlation sequence number.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Frame {
    pub seq: u64,
    pub pdu: E2apPdu,
}

/// Encodes a frame including its length prefix.
pub fn encode_frame(frame: &Frame) -> Result<Bytes, E2apError> {
    let body = serde_json::to_vec(frame)?;
    if body.len() > MAX_FRAME_LEN {
        return Err(E2apError::Codec(format!(
            "frame of {} bytes exceeds limit",
            body.len()
        )));
    }
    let mut buf = BytesMut::with_capacity(4 + body.len());
    buf.put_u32(body.len() as u32);
    buf.put_slice(&body);
    Ok(buf.freeze())
}

/// Decodes a frame body (without the length prefix).
pub fn decode_frame(body: &[u8]) -> Result<Frame, E2apError> {
    Ok(serde_json::from_slice(body)?)
}

/// Reads one frame. Returns `Ok(None)` on a clean end of stream.
pub async fn read_frame<R: AsyncRead + Unpin>(reader: &mut R) -> Result<Option<Frame>, E2apError> {
    match read_frame_body(reader).await? {
        Some(body) => decode_frame(&body).map(Some),
        None => Ok(None),
    }
}

/// Reads the body of one frame without decoding it.
pub async fn read_frame_body<R: AsyncRead + Unpin>(reader: &mut R) -> Result<Option<Bytes>, E2apError> {
    let len = match reader.read_u32().await {
        Ok(len) => len as usize,
        Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => return Ok(None),
        Err(e) => return Err(e.into()),
    };
    if len > MAX_FRAME_LEN {
        return Err(E2apError::Codec(format!("frame length {len} exceeds limit")));
    }
    let mut body = BytesMut::zeroed(len);
    reader.read_exact(&mut body).await?;
    Ok(Some(body.freeze()))
}

/// Writes one frame and flushes the writer.
pub async fn write_frame<W: AsyncWrite + Unpin>(writer: &mut W, frame: &Frame) -> Result<(), E2apError> {
    let bytes = encode_frame(frame)?;
    writer.write_all(&bytes).await?;
    writer.flush().await?;
    Ok(())
}
