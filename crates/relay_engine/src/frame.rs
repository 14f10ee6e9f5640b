use relay_core::{RequestId, Status};
use serde::{Deserialize, Serialize};

/// Job request sent by the controller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InboundFrame {
    pub prompt_id: RequestId,
    pub text: String,
}

/// Status report sent back to the controller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutboundFrame {
    pub prompt_id: RequestId,
    pub status: Status,
}

#[derive(Debug, thiserror::Error)]
pub enum FrameError {
    #[error("malformed frame: {0}")]
    Malformed(#[from] serde_json::Error),
}

pub fn decode_inbound(raw: &str) -> Result<InboundFrame, FrameError> {
    Ok(serde_json::from_str(raw)?)
}

pub fn encode_inbound(frame: &InboundFrame) -> Result<String, FrameError> {
    Ok(serde_json::to_string(frame)?)
}

pub fn decode_outbound(raw: &str) -> Result<OutboundFrame, FrameError> {
    Ok(serde_json::from_str(raw)?)
}

pub fn encode_outbound(frame: &OutboundFrame) -> Result<String, FrameError> {
    Ok(serde_json::to_string(frame)?)
}
