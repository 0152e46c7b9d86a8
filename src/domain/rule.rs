// ==========================================
// 赛事晋级管理系统 - 晋级规则领域模型
// ==========================================
// 依据: 赛制规则 - 晋级/淘汰规则配置
// 执行顺序: (priority 升序, id 升序), 逐条独立评估
// ==========================================

use crate::domain::types::{RuleAction, SourceType};
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

// ==========================================
// AdvancementRule - 晋级规则
// ==========================================
// 约束: source_round_id XOR source_group_id (与 source_type 一致)
// 约束: eliminate 规则的 target/bonus 恒为空/0
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdvancementRule {
    pub id: i64,
    pub tournament_id: i64,
    pub source_type: SourceType,
    pub source_round_id: Option<i64>,
    pub source_group_id: Option<i64>,
    /// 来源名次 (1-based)
    pub source_rank: i32,
    pub action_type: RuleAction,
    pub target_round_id: Option<i64>,
    pub target_slot: Option<i32>,
    /// 晋级加成分: 目标轮为 draft 时, 席位得分重置为 default_score + bonus_score
    pub bonus_score: i32,
    /// 越小越先执行
    pub priority: i32,
    pub is_active: bool,
    pub created_by: Option<String>,
    pub created_at: NaiveDateTime,
}

impl AdvancementRule {
    /// 规则的来源实体ID (轮次或分组)
    pub fn source_id(&self) -> Option<i64> {
        match self.source_type {
            SourceType::Round => self.source_round_id,
            SourceType::Group => self.source_group_id,
        }
    }
}

// ==========================================
// NewAdvancementRule - 规则创建输入
// ==========================================
// API 层校验后落库; eliminate 在校验阶段就会被清空 target/bonus
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewAdvancementRule {
    pub tournament_id: i64,
    pub source_type: SourceType,
    pub source_round_id: Option<i64>,
    pub source_group_id: Option<i64>,
    pub source_rank: i32,
    pub action_type: RuleAction,
    pub target_round_id: Option<i64>,
    pub target_slot: Option<i32>,
    pub bonus_score: i32,
    pub priority: i32,
    pub is_active: bool,
    pub created_by: Option<String>,
}
