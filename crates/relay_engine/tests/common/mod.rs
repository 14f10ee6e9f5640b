#![allow(dead_code)]

use std::sync::{Arc, Mutex, Once};

use relay_core::{RequestId, Status};
use relay_engine::StatusSink;

pub fn init_logging() {
    static INIT: Once = Once::new();
    INIT.call_once(engine_logging::initialize_for_tests);
}

/// Records every emitted status in order.
#[derive(Clone, Default)]
pub struct RecordingSink {
    events: Arc<Mutex<Vec<(RequestId, Status)>>>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<(RequestId, Status)> {
        self.events.lock().unwrap().clone()
    }

    pub fn statuses_for(&self, id: &str) -> Vec<Status> {
        self.events()
            .into_iter()
            .filter(|(event_id, _)| event_id.as_str() == id)
            .map(|(_, status)| status)
            .collect()
    }
}

impl StatusSink for RecordingSink {
    fn emit(&self, id: &RequestId, status: Status) {
        self.events.lock().unwrap().push((id.clone(), status));
    }
}
