//! Web API 层。
//!
//! 提供 Axum 路由：WebSocket 聊天端点和管理端 REST 接口，
//! 把请求委托给应用层的用例服务。

mod error;
mod protocol;
mod routes;
mod state;
mod ws_connection;

pub use error::ApiError;
pub use protocol::ClientCommand;
pub use routes::router;
pub use state::AppState;
