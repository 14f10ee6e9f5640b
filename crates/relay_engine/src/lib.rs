//! Relay engine: visual tree, tracker runtime, control channel and controller server.
mod bootstrap;
mod connection;
mod controller;
mod dispatcher;
mod emitter;
mod frame;
mod observer;
mod page;
mod tracker;
mod wildcards;

pub use bootstrap::wait_for_element;
pub use connection::{
    Channel, ConnectionHandle, ConnectionManager, ConnectionSettings, Connector, FrameSink,
    FrameStream, TransportError, WebSocketConnector, DEFAULT_RECONNECT_DELAY,
};
pub use controller::{
    Controller, ControllerSettings, SharedLedger, DEFAULT_GATE_POLL, DEFAULT_SEND_DELAY,
};
pub use dispatcher::{JobDispatcher, SubmissionDriver, SubmitError};
pub use emitter::{StatusEmitter, StatusSink};
pub use frame::{
    decode_inbound, decode_outbound, encode_inbound, encode_outbound, FrameError, InboundFrame,
    OutboundFrame,
};
pub use observer::{Discovered, VisualTreeObserver, TAG_ATTRIBUTE};
pub use page::{
    parse_selector, NodeChange, NodeHandle, PageDocument, PageError, VisualNode, VisualPage,
};
pub use scraper::Selector;
pub use tracker::TrackerContext;
pub use wildcards::{load_wildcard_dir, WildcardError};
