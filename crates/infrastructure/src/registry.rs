//! 内存房间注册表实现
//!
//! 外层读写锁只保护房间表本身；每个房间的修改由房间自己的互斥锁
//! 串行化，避免跨房间的锁竞争。所有修改方法在锁内取快照、锁外返回，
//! 广播扇出永远不持有房间锁。

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::{Mutex, RwLock};
use uuid::Uuid;

use application::{
    ApplicationError, ApplicationResult, JoinSnapshot, LeaveSnapshot, RegistryStats, RoomDto,
    RoomRegistry,
};
use domain::{Message, Room, RoomKind, RoomSettings, GLOBAL_ROOM_CODE};

/// 注册表内部状态
///
/// `order` 记录创建顺序，统计的并列打破规则依赖它。
struct RegistryInner {
    rooms: HashMap<String, Arc<Mutex<Room>>>,
    order: Vec<String>,
}

/// 内存房间注册表
pub struct InMemoryRoomRegistry {
    inner: RwLock<RegistryInner>,
    history_limit: usize,
    default_settings: RoomSettings,
}

impl Default for InMemoryRoomRegistry {
    fn default() -> Self {
        Self::new(domain::room::DEFAULT_HISTORY_LIMIT, RoomSettings::default())
    }
}

impl InMemoryRoomRegistry {
    /// 创建新的内存注册表
    pub fn new(history_limit: usize, default_settings: RoomSettings) -> Self {
        Self {
            inner: RwLock::new(RegistryInner {
                rooms: HashMap::new(),
                order: Vec::new(),
            }),
            history_limit,
            default_settings,
        }
    }

    /// 获取当前时间戳
    fn now() -> DateTime<Utc> {
        Utc::now()
    }

    /// 取房间句柄（外层读锁短暂持有）
    async fn room_handle(&self, code: &str) -> Option<Arc<Mutex<Room>>> {
        let inner = self.inner.read().await;
        inner.rooms.get(code).cloned()
    }

    /// 插入新房间；并发竞争时返回已存在的房间
    async fn insert_room(
        &self,
        code: &str,
        display_name: &str,
        kind: RoomKind,
    ) -> ApplicationResult<RoomDto> {
        let mut inner = self.inner.write().await;

        if let Some(existing) = inner.rooms.get(code) {
            let room = existing.lock().await;
            return Ok(RoomDto::from(&*room));
        }

        let room = Room::new(code, display_name, kind, self.default_settings, Self::now())?
            .with_history_limit(self.history_limit);
        let dto = RoomDto::from(&room);

        inner.order.push(code.to_string());
        inner.rooms.insert(code.to_string(), Arc::new(Mutex::new(room)));

        tracing::info!(room_code = %code, kind = ?kind, "room created in registry");
        Ok(dto)
    }
}

#[async_trait]
impl RoomRegistry for InMemoryRoomRegistry {
    async fn create_room(
        &self,
        code: &str,
        display_name: &str,
        kind: RoomKind,
    ) -> ApplicationResult<RoomDto> {
        // 已存在的房间不会被重置设置
        if let Some(handle) = self.room_handle(code).await {
            let room = handle.lock().await;
            return Ok(RoomDto::from(&*room));
        }
        self.insert_room(code, display_name, kind).await
    }

    async fn get_or_create(&self, code: &str) -> ApplicationResult<RoomDto> {
        if let Some(handle) = self.room_handle(code).await {
            let room = handle.lock().await;
            return Ok(RoomDto::from(&*room));
        }
        self.insert_room(code, code, RoomKind::Standard).await
    }

    async fn get_room(&self, code: &str) -> Option<RoomDto> {
        let handle = self.room_handle(code).await?;
        let room = handle.lock().await;
        Some(RoomDto::from(&*room))
    }

    async fn join(&self, code: &str, connection_id: Uuid) -> ApplicationResult<JoinSnapshot> {
        let handle = self
            .room_handle(code)
            .await
            .ok_or_else(|| ApplicationError::not_found(format!("room {}", code)))?;

        let mut room = handle.lock().await;
        let newly_joined = room.add_participant(connection_id);
        let history = room.history_snapshot();
        let others = room
            .participant_ids()
            .into_iter()
            .filter(|id| *id != connection_id)
            .collect();

        Ok(JoinSnapshot {
            newly_joined,
            history,
            others,
        })
    }

    async fn leave(&self, code: &str, connection_id: Uuid) -> ApplicationResult<LeaveSnapshot> {
        // 房间不存在时离开是空操作（幂等）
        let handle = match self.room_handle(code).await {
            Some(handle) => handle,
            None => {
                return Ok(LeaveSnapshot {
                    removed: false,
                    remaining: Vec::new(),
                })
            }
        };

        let mut room = handle.lock().await;
        let removed = room.remove_participant(&connection_id);
        Ok(LeaveSnapshot {
            removed,
            remaining: room.participant_ids(),
        })
    }

    async fn append(&self, code: &str, message: Message) -> ApplicationResult<Vec<Uuid>> {
        // 协调器保证房间在追加前已存在；缺失属于程序错误一类
        let handle = self
            .room_handle(code)
            .await
            .ok_or_else(|| ApplicationError::not_found(format!("room {}", code)))?;

        let mut room = handle.lock().await;
        room.append_message(message);
        Ok(room.participant_ids())
    }

    async fn participants(&self, code: &str) -> Vec<Uuid> {
        match self.room_handle(code).await {
            Some(handle) => handle.lock().await.participant_ids(),
            None => Vec::new(),
        }
    }

    async fn history(&self, code: &str) -> ApplicationResult<Vec<Message>> {
        let handle = self
            .room_handle(code)
            .await
            .ok_or_else(|| ApplicationError::not_found(format!("room {}", code)))?;
        let room = handle.lock().await;
        Ok(room.history_snapshot())
    }

    async fn moderate_message(
        &self,
        code: &str,
        message_id: Uuid,
    ) -> ApplicationResult<Vec<Uuid>> {
        let handle = self
            .room_handle(code)
            .await
            .ok_or_else(|| ApplicationError::not_found(format!("room {}", code)))?;

        let mut room = handle.lock().await;
        if !room.moderate_message(message_id) {
            return Err(ApplicationError::not_found(format!(
                "message {} in room {}",
                message_id, code
            )));
        }
        Ok(room.participant_ids())
    }

    async fn remove_connection(&self, connection_id: Uuid) -> Vec<(String, Vec<Uuid>)> {
        // 先在外层读锁下取句柄快照，再逐个房间加锁移除
        let handles: Vec<(String, Arc<Mutex<Room>>)> = {
            let inner = self.inner.read().await;
            inner
                .order
                .iter()
                .filter_map(|code| {
                    inner
                        .rooms
                        .get(code)
                        .map(|handle| (code.clone(), handle.clone()))
                })
                .collect()
        };

        let mut affected = Vec::new();
        for (code, handle) in handles {
            let mut room = handle.lock().await;
            if room.remove_participant(&connection_id) {
                affected.push((code, room.participant_ids()));
            }
        }
        affected
    }

    async fn stats_snapshot(&self) -> RegistryStats {
        // 尽力而为：逐个房间短暂加锁，不持有全局锁
        let (mut codes, handles) = {
            let inner = self.inner.read().await;
            (inner.order.clone(), inner.rooms.clone())
        };

        // 并列时 "global" 优先，其次按创建顺序
        if let Some(pos) = codes.iter().position(|code| code == GLOBAL_ROOM_CODE) {
            let global = codes.remove(pos);
            codes.insert(0, global);
        }

        let mut total_messages = 0;
        let mut active_users: HashSet<Uuid> = HashSet::new();
        let mut most_active: Option<(String, usize)> = None;

        for code in &codes {
            let Some(handle) = handles.get(code) else {
                continue;
            };
            let room = handle.lock().await;

            let message_count = room.message_count();
            total_messages += message_count;
            active_users.extend(room.participant_ids());

            let is_more_active = match &most_active {
                Some((_, best)) => message_count > *best,
                None => true,
            };
            if is_more_active {
                most_active = Some((code.clone(), message_count));
            }
        }

        RegistryStats {
            total_rooms: codes.len(),
            total_messages,
            active_user_count: active_users.len(),
            most_active_room_code: most_active.map(|(code, _)| code),
        }
    }
}
