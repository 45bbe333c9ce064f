mod connection;
mod identity;
mod request;
mod room;
mod signaling;

pub use connection::ConnectionId;
pub use identity::UserId;
pub use request::RequestId;
pub use room::{MemberInfo, RoomSnapshot};
pub use signaling::{ClientMessage, Payload, RejectReason, ServerMessage};
