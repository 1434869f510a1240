//! # Entity 模块
//!
//! 包含所有 Sea-ORM 实体定义

pub mod health_check_items;
pub mod health_check_runs;

pub use health_check_items::Entity as HealthCheckItems;
pub use health_check_runs::Entity as HealthCheckRuns;
