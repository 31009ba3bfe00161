pub mod error;
pub mod framing;
pub mod message;
pub mod peer;
pub mod tls;
pub mod transport;

pub use error::TransportError;
pub use framing::{encode_frame, FrameReader, SEPARATOR};
pub use message::{Message, RawMessage};
pub use peer::{PeerAddress, SerializedPeer};
pub use transport::{LinkId, Transport, TransportEvent};
