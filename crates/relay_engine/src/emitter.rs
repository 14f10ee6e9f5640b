use engine_logging::{engine_debug, engine_error};
use relay_core::{RequestId, Status};

use crate::connection::ConnectionHandle;
use crate::frame::{encode_outbound, OutboundFrame};

/// Destination for lifecycle statuses.
pub trait StatusSink: Send + Sync {
    fn emit(&self, id: &RequestId, status: Status);
}

/// Serializes statuses onto the control channel.
///
/// Fire-and-forget: nothing is buffered or deduplicated, and a status
/// emitted while the channel is down is dropped.
#[derive(Clone)]
pub struct StatusEmitter {
    connection: ConnectionHandle,
}

impl StatusEmitter {
    pub fn new(connection: ConnectionHandle) -> Self {
        Self { connection }
    }
}

impl StatusSink for StatusEmitter {
    fn emit(&self, id: &RequestId, status: Status) {
        let frame = OutboundFrame {
            prompt_id: id.clone(),
            status,
        };
        match encode_outbound(&frame) {
            Ok(text) => {
                if !self.connection.try_send(text) {
                    engine_debug!("[{}] dropped status {}: channel not open", id, frame.status);
                }
            }
            Err(err) => engine_error!("[{}] failed to encode status: {}", id, err),
        }
    }
}
