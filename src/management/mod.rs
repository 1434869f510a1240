//! # HTTP 接口模块
//!
//! 公开健康检查接口与管理端 API

pub mod handlers;
pub mod middleware;
pub mod response;
pub mod routes;
pub mod server;

pub use routes::create_routes;
pub use server::{AppState, ManagementServer, build_router};
