// ==========================================
// 赛事晋级管理系统 - 轮次领域模型
// ==========================================
// 依据: 赛制规则 - 轮次席位/得分/定榜结构
// 不变量: 同一轮次同一席位最多一条 participant / score 记录
// ==========================================

use crate::domain::types::{
    AssignmentMode, AssignmentReason, RoundPhase, RoundStatus, SourceType,
};
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

// ==========================================
// Round - 轮次
// ==========================================
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Round {
    pub id: i64,
    pub tournament_id: i64,
    pub group_id: Option<i64>,
    pub name: String,
    pub code: Option<String>,
    pub status: RoundStatus,
    pub phase: RoundPhase,
    /// 席位数 N, 席位编号 1..=N
    pub teams_per_round: i32,
    /// 得分基线: 新建席位/清场时写入的初始分
    pub default_score: i32,
    pub sort_order: i32,
    pub has_fever: bool,
    pub has_ultimate_fever: bool,
    /// 各阶段可用的加减分档位 (JSON 数组)
    pub lightning_score_deltas: Vec<i32>,
    pub buzzer_normal_score_deltas: Vec<i32>,
    pub buzzer_fever_score_deltas: Option<Vec<i32>>,
    pub buzzer_ultimate_score_deltas: Option<Vec<i32>>,
    pub created_at: NaiveDateTime,
}

impl Round {
    /// 席位编号是否在本轮范围内
    pub fn has_slot(&self, slot: i32) -> bool {
        slot >= 1 && slot <= self.teams_per_round
    }
}

// ==========================================
// RoundParticipant - 轮次席位占用
// ==========================================
// assignment_* 字段记录"这个队是怎么坐进来的"(人工 or 晋级引擎)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoundParticipant {
    pub id: i64,
    pub round_id: i64,
    pub slot: i32,
    pub team_id: Option<i64>,
    pub display_name_snapshot: Option<String>,
    pub icon_snapshot_path: Option<String>,
    pub assignment_mode: AssignmentMode,
    pub assignment_source_type: Option<SourceType>,
    pub assignment_source_id: Option<i64>,
    pub assignment_source_rank: Option<i32>,
    pub assignment_reason: Option<AssignmentReason>,
    pub assignment_updated_at: Option<NaiveDateTime>,
}

impl RoundParticipant {
    /// 是否人工锁定: 人工指定且已有队伍占座
    ///
    /// 锁定席位只有 force_apply 才允许晋级引擎覆盖
    pub fn is_manual_locked(&self) -> bool {
        self.assignment_mode == AssignmentMode::Manual && self.team_id.is_some()
    }
}

// ==========================================
// RoundScore - 轮次席位得分
// ==========================================
// 红线: 得分永不为负 (扣分在 0 处截断)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoundScore {
    pub id: i64,
    pub round_id: i64,
    pub slot: i32,
    pub score: i32,
}

// ==========================================
// RoundResult - 轮次定榜结果
// ==========================================
// 每轮最多一条; is_stale=true 表示上游席位已变, 榜单不可信
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoundResult {
    pub id: i64,
    pub round_id: i64,
    pub finalized_by: Option<String>,
    pub finalized_at: NaiveDateTime,
    pub is_overridden: bool,
    pub is_stale: bool,
}

// ==========================================
// RoundResultEntry - 定榜条目
// ==========================================
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoundResultEntry {
    pub id: i64,
    pub result_id: i64,
    pub slot: i32,
    pub team_id: Option<i64>,
    pub display_name_snapshot: String,
    pub score: i32,
    /// 人工指定名次; None 表示按得分推导
    pub rank: Option<i32>,
}

// ==========================================
// RoundAction - 赛务控制操作记录
// ==========================================
// 用途: 审计 + undo (仅最近一条未回滚的 add_score 可撤销)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoundAction {
    pub id: i64,
    /// 关联ID (UUID, 用于前端/日志对账)
    pub action_id: String,
    pub round_id: i64,
    pub actor: Option<String>,
    pub action_type: ControlActionType,
    pub payload: JsonValue,
    pub rolled_back_at: Option<NaiveDateTime>,
    pub created_at: NaiveDateTime,
}

// ==========================================
// ControlActionType - 赛务控制操作类型
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ControlActionType {
    StartCompetition, // 开始比赛 (draft -> live)
    EndCompetition,   // 结束比赛并定榜 (live -> completed)
    ToBuzzer,         // 切换到抢答阶段
    AddScore,         // 席位加减分
    Undo,             // 撤销最近一次加减分
    Clear,            // 清场回到 draft
}

impl ControlActionType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ControlActionType::StartCompetition => "start_competition",
            ControlActionType::EndCompetition => "end_competition",
            ControlActionType::ToBuzzer => "to_buzzer",
            ControlActionType::AddScore => "add_score",
            ControlActionType::Undo => "undo",
            ControlActionType::Clear => "clear",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "start_competition" => Some(ControlActionType::StartCompetition),
            "end_competition" => Some(ControlActionType::EndCompetition),
            "to_buzzer" => Some(ControlActionType::ToBuzzer),
            "add_score" => Some(ControlActionType::AddScore),
            "undo" => Some(ControlActionType::Undo),
            "clear" => Some(ControlActionType::Clear),
            _ => None,
        }
    }
}

// ==========================================
// NewRound - 轮次创建输入
// ==========================================
// API 层校验后落库, id/created_at 由数据库生成
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewRound {
    pub tournament_id: i64,
    pub group_id: Option<i64>,
    pub name: String,
    pub code: Option<String>,
    pub teams_per_round: i32,
    pub default_score: i32,
    pub sort_order: i32,
    pub has_fever: bool,
    pub has_ultimate_fever: bool,
    pub lightning_score_deltas: Vec<i32>,
    pub buzzer_normal_score_deltas: Vec<i32>,
    pub buzzer_fever_score_deltas: Option<Vec<i32>>,
    pub buzzer_ultimate_score_deltas: Option<Vec<i32>>,
}

// ==========================================
// ResultEntryDraft - 待写入的定榜条目
// ==========================================
// 定榜时整批替换旧条目, id/result_id 由仓储补齐
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResultEntryDraft {
    pub slot: i32,
    pub team_id: Option<i64>,
    pub display_name_snapshot: String,
    pub score: i32,
    pub rank: Option<i32>,
}

// ==========================================
// ResultOverride - 定榜时的人工覆盖条目
// ==========================================
// end_competition / overwrite_result 的输入: 按席位覆盖得分/名次
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResultOverride {
    pub slot: i32,
    pub score: Option<i32>,
    pub rank: Option<i32>,
}
