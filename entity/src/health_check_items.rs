//! # 健康检查明细实体定义
//!
//! 每个探针在一次运行中的结果，随父运行记录一起删除

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// 健康检查明细
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "health_check_items")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub run_id: i32,
    pub check_name: String,
    pub status: String,
    pub duration_ms: i64,
    pub message: String,
    pub meta: Option<String>, // JSON 字符串
    pub created_at: DateTime,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::health_check_runs::Entity",
        from = "Column::RunId",
        to = "super::health_check_runs::Column::Id",
        on_update = "Cascade",
        on_delete = "Cascade"
    )]
    Run,
}

impl Related<super::health_check_runs::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Run.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
