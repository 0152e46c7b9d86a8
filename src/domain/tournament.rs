// ==========================================
// 赛事晋级管理系统 - 赛事/分组/队伍领域模型
// ==========================================

use crate::domain::types::TournamentStatus;
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

// ==========================================
// Tournament - 赛事
// ==========================================
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Tournament {
    pub id: i64,
    pub name: String,
    pub year: i32,
    pub status: TournamentStatus,
    pub logo_path: Option<String>,
    pub created_at: NaiveDateTime,
}

// ==========================================
// Group - 分组
// ==========================================
// 完成判定: 组内所有轮次 status=completed 时分组才视为完成
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Group {
    pub id: i64,
    pub tournament_id: i64,
    pub name: String,
    pub sort_order: i32,
}

// ==========================================
// Team - 队伍
// ==========================================
// deleted_at 软删除: 晋级写入时只做快照,不回查已删队伍
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Team {
    pub id: i64,
    pub team_name: String,
    pub icon_path: Option<String>,
    pub deleted_at: Option<NaiveDateTime>,
}

impl Team {
    /// 队伍是否仍然有效 (未被软删除)
    pub fn is_active(&self) -> bool {
        self.deleted_at.is_none()
    }
}
