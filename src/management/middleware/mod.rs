//! # 管理服务器中间件
//!
//! 请求 ID 与管理员认证

pub mod auth;
pub mod request_id;

pub use auth::{AdminContext, admin_auth};
pub use request_id::{RequestId, request_id_middleware};
