mod handler;
mod lifecycle;
mod message;

pub use handler::ws_handler;
pub use lifecycle::{ConnectionLifecycle, ConnectionState};
pub use message::OutboundMessage;
