use std::collections::BTreeMap;

use crate::{RequestId, Status};

/// Status recorded by the controller when a prompt has been handed to clients.
pub const SENT_MARKER: &str = "sent";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DispatchLimits {
    pub max_concurrent: usize,
    /// `None` disables the total cap.
    pub stop_after: Option<usize>,
}

impl Default for DispatchLimits {
    fn default() -> Self {
        Self {
            max_concurrent: 3,
            stop_after: Some(20),
        }
    }
}

/// Whether the controller may send another prompt right now.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Gate {
    Ready,
    NoClients,
    AtCapacity,
    /// The total cap was reached; generation stops for good.
    Exhausted,
}

/// Controller-side view of every prompt it has sent and the last status heard for it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DispatchLedger {
    limits: DispatchLimits,
    sent: usize,
    statuses: BTreeMap<RequestId, String>,
}

impl DispatchLedger {
    pub fn new(limits: DispatchLimits) -> Self {
        Self {
            limits,
            sent: 0,
            statuses: BTreeMap::new(),
        }
    }

    pub fn limits(&self) -> DispatchLimits {
        self.limits
    }

    pub fn gate(&self, connected_clients: usize) -> Gate {
        if let Some(cap) = self.limits.stop_after {
            if self.sent >= cap {
                return Gate::Exhausted;
            }
        }
        if connected_clients == 0 {
            return Gate::NoClients;
        }
        if self.in_flight() >= self.limits.max_concurrent {
            return Gate::AtCapacity;
        }
        Gate::Ready
    }

    pub fn record_sent(&mut self, id: RequestId) {
        self.statuses.insert(id, SENT_MARKER.to_string());
        self.sent += 1;
    }

    /// Stores the latest status for `id`; returns `true` when it differs from the previous one.
    ///
    /// Ids the ledger never sent are recorded too.
    pub fn record_status(&mut self, id: RequestId, status: &str) -> bool {
        match self.statuses.get(&id) {
            Some(previous) if previous == status => false,
            _ => {
                self.statuses.insert(id, status.to_string());
                true
            }
        }
    }

    /// Prompts whose last status is anything other than the terminal marker.
    pub fn in_flight(&self) -> usize {
        let terminal = Status::ProgressComplete.as_wire();
        self.statuses
            .values()
            .filter(|status| status.as_str() != terminal)
            .count()
    }

    pub fn sent(&self) -> usize {
        self.sent
    }

    pub fn status_of(&self, id: &RequestId) -> Option<&str> {
        self.statuses.get(id).map(String::as_str)
    }
}
