//! 房间注册表抽象
//!
//! 注册表是进程内唯一被多个连接共享修改的资源。所有修改方法都返回
//! 快照（参与者列表、历史副本），调用方在锁外完成广播扇出，
//! 避免慢客户端阻塞整个房间。

use async_trait::async_trait;
use domain::{Message, RoomKind};
use serde::Serialize;
use uuid::Uuid;

use crate::dto::RoomDto;
use crate::errors::ApplicationResult;

/// 加入房间的结果快照
#[derive(Debug, Clone)]
pub struct JoinSnapshot {
    /// 本次调用是否真正加入（重复加入时为 false）
    pub newly_joined: bool,
    /// 房间当前历史（按存储顺序）
    pub history: Vec<Message>,
    /// 加入者之外的参与者（"用户加入"通知的目标）
    pub others: Vec<Uuid>,
}

/// 离开房间的结果快照
#[derive(Debug, Clone)]
pub struct LeaveSnapshot {
    /// 本次调用是否真正移除了参与者
    pub removed: bool,
    /// 剩余参与者（"用户离开"通知的目标）
    pub remaining: Vec<Uuid>,
}

/// 注册表统计快照
///
/// 尽力而为的读取：逐个房间短暂加锁，不持有全局锁。
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RegistryStats {
    /// 房间总数
    pub total_rooms: usize,
    /// 所有房间历史中的消息总数
    pub total_messages: usize,
    /// 至少加入一个房间的不同连接数
    pub active_user_count: usize,
    /// 历史消息最多的房间（并列时 "global" 优先，其次按创建顺序）
    pub most_active_room_code: Option<String>,
}

/// 房间注册表
///
/// 进程启动时构造一次，以句柄形式传给聊天协调器；
/// 每个房间的修改由房间自己的互斥锁串行化。
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait RoomRegistry: Send + Sync {
    /// 创建房间：仅在代码不存在时创建，已存在的房间设置不会被重置
    async fn create_room(
        &self,
        code: &str,
        display_name: &str,
        kind: RoomKind,
    ) -> ApplicationResult<RoomDto>;

    /// 获取或以默认设置创建房间（加入和发送路径使用）
    async fn get_or_create(&self, code: &str) -> ApplicationResult<RoomDto>;

    /// 查找房间
    async fn get_room(&self, code: &str) -> Option<RoomDto>;

    /// 把连接加入房间（集合语义，重复加入是空操作）
    async fn join(&self, code: &str, connection_id: Uuid) -> ApplicationResult<JoinSnapshot>;

    /// 把连接移出房间（幂等；房间不存在时视为空操作）
    async fn leave(&self, code: &str, connection_id: Uuid) -> ApplicationResult<LeaveSnapshot>;

    /// 追加消息到房间历史，返回广播目标（包含发送者）
    async fn append(&self, code: &str, message: Message) -> ApplicationResult<Vec<Uuid>>;

    /// 房间当前参与者快照
    async fn participants(&self, code: &str) -> Vec<Uuid>;

    /// 房间历史快照（房间不存在时报未找到）
    async fn history(&self, code: &str) -> ApplicationResult<Vec<Message>>;

    /// 按 ID 屏蔽历史消息，返回广播目标
    async fn moderate_message(
        &self,
        code: &str,
        message_id: Uuid,
    ) -> ApplicationResult<Vec<Uuid>>;

    /// 把连接从所有房间移除（断开路径），返回每个受影响房间的剩余参与者
    async fn remove_connection(&self, connection_id: Uuid) -> Vec<(String, Vec<Uuid>)>;

    /// 统计快照
    async fn stats_snapshot(&self) -> RegistryStats;
}
