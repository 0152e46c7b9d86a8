// ==========================================
// 赛事晋级管理系统 - 晋级审计日志领域模型
// ==========================================
// 红线: 每次规则评估必须落一条日志, 只追加不修改
// 用途: 审计追踪, 复盘"为什么晋级/为什么没晋级"
// ==========================================

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use std::fmt;

// ==========================================
// AdvanceStatus - 规则评估结果状态
// ==========================================
// 这些都是一等公民结果, 不是错误; 引擎逐条记录并计数
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AdvanceStatus {
    Applied,           // 晋级写入成功
    BlockedManual,     // 目标席位人工锁定, 未写入
    Skipped,           // 条件不满足 (无队伍/目标缺失/优先级保护等)
    Eliminated,        // 淘汰规则 (仅记录)
    StaleMarked,       // 下游已定榜轮次被标记失效 (系统事件)
    BonusApplied,      // 加成分写入 (draft 目标轮的附属事件)
    BlockedRoundState, // 目标轮已开赛/已定榜, 得分重置被拦截
}

impl AdvanceStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            AdvanceStatus::Applied => "applied",
            AdvanceStatus::BlockedManual => "blocked_manual",
            AdvanceStatus::Skipped => "skipped",
            AdvanceStatus::Eliminated => "eliminated",
            AdvanceStatus::StaleMarked => "stale_marked",
            AdvanceStatus::BonusApplied => "bonus_applied",
            AdvanceStatus::BlockedRoundState => "blocked_round_state",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "applied" => Some(AdvanceStatus::Applied),
            "blocked_manual" => Some(AdvanceStatus::BlockedManual),
            "skipped" => Some(AdvanceStatus::Skipped),
            "eliminated" => Some(AdvanceStatus::Eliminated),
            "stale_marked" => Some(AdvanceStatus::StaleMarked),
            "bonus_applied" => Some(AdvanceStatus::BonusApplied),
            "blocked_round_state" => Some(AdvanceStatus::BlockedRoundState),
            _ => None,
        }
    }
}

impl fmt::Display for AdvanceStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// ==========================================
// LogSourceType - 日志来源类型
// ==========================================
// 比规则来源多一个 system: 失效标记等非规则触发的事件
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogSourceType {
    Round,
    Group,
    System,
}

impl LogSourceType {
    pub fn as_str(&self) -> &'static str {
        match self {
            LogSourceType::Round => "round",
            LogSourceType::Group => "group",
            LogSourceType::System => "system",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "round" => Some(LogSourceType::Round),
            "group" => Some(LogSourceType::Group),
            "system" => Some(LogSourceType::System),
            _ => None,
        }
    }
}

impl fmt::Display for LogSourceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// ==========================================
// AdvancementLogEntry - 待写入的日志条目
// ==========================================
// 引擎构造, 仓储落库 (id/created_at 由数据库生成)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdvancementLogEntry {
    pub tournament_id: i64,
    /// 系统事件 (如 stale_marked) 无关联规则
    pub rule_id: Option<i64>,
    pub actor: Option<String>,
    pub source_type: LogSourceType,
    pub source_round_id: Option<i64>,
    pub source_group_id: Option<i64>,
    pub target_round_id: Option<i64>,
    pub target_slot: Option<i32>,
    pub team_id_before: Option<i64>,
    pub team_id_after: Option<i64>,
    pub status: AdvanceStatus,
    pub message: String,
    pub context: JsonValue,
}

// ==========================================
// AdvancementLog - 日志读取模型
// ==========================================
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdvancementLog {
    pub id: i64,
    pub tournament_id: i64,
    pub rule_id: Option<i64>,
    pub actor: Option<String>,
    pub source_type: LogSourceType,
    pub source_round_id: Option<i64>,
    pub source_group_id: Option<i64>,
    pub target_round_id: Option<i64>,
    pub target_slot: Option<i32>,
    pub team_id_before: Option<i64>,
    pub team_id_after: Option<i64>,
    pub status: AdvanceStatus,
    pub message: String,
    pub context: JsonValue,
    pub created_at: NaiveDateTime,
}
