//! # 测试框架模块
//!
//! 提供测试数据库与探针替身

pub mod helpers;
pub mod mocks;

pub use helpers::*;
pub use mocks::*;
