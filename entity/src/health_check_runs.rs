//! # 健康检查运行记录实体定义
//!
//! 每次健康检查执行对应一行，探针明细见 `health_check_items`

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// 健康检查运行记录
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "health_check_runs")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    /// 触发来源（scheduler / manual）
    pub source: String,
    /// 整体状态：RUNNING 为占位值，完成后为 OK / WARN / FAIL
    pub status: String,
    pub started_at: DateTime,
    pub finished_at: Option<DateTime>,
    pub total_duration_ms: Option<i64>,
    pub summary: Option<String>, // JSON 字符串
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::health_check_items::Entity")]
    Items,
}

impl Related<super::health_check_items::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Items.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
