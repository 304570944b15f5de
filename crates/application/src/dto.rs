use chrono::{DateTime, Utc};
use domain::{Room, RoomKind, RoomSettings};
use serde::{Deserialize, Serialize};

/// 房间信息快照（管理端响应和协调器内部使用）
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoomDto {
    pub code: String,
    pub display_name: String,
    pub kind: RoomKind,
    pub settings: RoomSettings,
    pub participant_count: usize,
    pub message_count: usize,
    pub created_at: DateTime<Utc>,
    pub last_activity_at: DateTime<Utc>,
}

impl From<&Room> for RoomDto {
    fn from(room: &Room) -> Self {
        Self {
            code: room.code.clone(),
            display_name: room.display_name.clone(),
            kind: room.kind,
            settings: room.settings,
            participant_count: room.participant_count(),
            message_count: room.message_count(),
            created_at: room.created_at,
            last_activity_at: room.last_activity_at,
        }
    }
}
