//! 领域实体定义

pub mod message;
pub mod room;
pub mod session;

pub use message::{Message, MessageKind, VoicePayload};
pub use room::{Room, RoomKind, RoomSettings, GLOBAL_ROOM_CODE};
pub use session::Session;
