// ==========================================
// 赛事晋级管理系统 - 领域类型定义
// ==========================================
// 依据: 赛制规则 - 轮次生命周期与晋级来源
// ==========================================

use serde::{Deserialize, Serialize};
use std::fmt;

// ==========================================
// 赛事状态 (Tournament Status)
// ==========================================
// 约束: 同一时间最多一个赛事处于 live (由外层保证,核心不负责)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TournamentStatus {
    Draft,     // 筹备中
    Live,      // 进行中
    Completed, // 已结束
}

impl TournamentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TournamentStatus::Draft => "draft",
            TournamentStatus::Live => "live",
            TournamentStatus::Completed => "completed",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "draft" => Some(TournamentStatus::Draft),
            "live" => Some(TournamentStatus::Live),
            "completed" => Some(TournamentStatus::Completed),
            _ => None,
        }
    }
}

impl fmt::Display for TournamentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// ==========================================
// 轮次状态 (Round Status)
// ==========================================
// 状态机: draft -> live -> completed (clear 可回退到 draft)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RoundStatus {
    Draft,     // 未开赛
    Live,      // 比赛中
    Completed, // 已定榜
}

impl RoundStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            RoundStatus::Draft => "draft",
            RoundStatus::Live => "live",
            RoundStatus::Completed => "completed",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "draft" => Some(RoundStatus::Draft),
            "live" => Some(RoundStatus::Live),
            "completed" => Some(RoundStatus::Completed),
            _ => None,
        }
    }
}

impl fmt::Display for RoundStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// ==========================================
// 轮次阶段 (Round Phase)
// ==========================================
// 快答阶段(lightning)在前, 抢答阶段(buzzer_*)在后
// fever/ultimate 阶段需要轮次开启对应开关
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RoundPhase {
    Lightning,           // 快答
    BuzzerNormal,        // 抢答-普通
    BuzzerFever,         // 抢答-Fever
    BuzzerUltimateFever, // 抢答-Ultimate Fever
}

impl RoundPhase {
    pub fn as_str(&self) -> &'static str {
        match self {
            RoundPhase::Lightning => "lightning",
            RoundPhase::BuzzerNormal => "buzzer_normal",
            RoundPhase::BuzzerFever => "buzzer_fever",
            RoundPhase::BuzzerUltimateFever => "buzzer_ultimate_fever",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "lightning" => Some(RoundPhase::Lightning),
            // 兼容旧数据: 裸 "buzzer" 视为普通抢答
            "buzzer" | "buzzer_normal" => Some(RoundPhase::BuzzerNormal),
            "buzzer_fever" => Some(RoundPhase::BuzzerFever),
            "buzzer_ultimate_fever" => Some(RoundPhase::BuzzerUltimateFever),
            _ => None,
        }
    }

    /// 是否已进入抢答阶段
    pub fn is_buzzer(&self) -> bool {
        !matches!(self, RoundPhase::Lightning)
    }
}

impl fmt::Display for RoundPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// ==========================================
// 席位分配方式 (Assignment Mode)
// ==========================================
// 红线: manual + 已占座 = 人工锁定, 晋级引擎默认不可覆盖
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AssignmentMode {
    Manual, // 人工指定
    Auto,   // 晋级引擎写入
}

impl AssignmentMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            AssignmentMode::Manual => "manual",
            AssignmentMode::Auto => "auto",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "manual" => Some(AssignmentMode::Manual),
            "auto" => Some(AssignmentMode::Auto),
            _ => None,
        }
    }
}

impl fmt::Display for AssignmentMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// ==========================================
// 晋级来源类型 (Source Type)
// ==========================================
// 规则与席位 provenance 共用: 轮次榜 或 分组总榜
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceType {
    Round, // 单轮排名
    Group, // 分组累计排名
}

impl SourceType {
    pub fn as_str(&self) -> &'static str {
        match self {
            SourceType::Round => "round",
            SourceType::Group => "group",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "round" => Some(SourceType::Round),
            "group" => Some(SourceType::Group),
            _ => None,
        }
    }
}

impl fmt::Display for SourceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// ==========================================
// 席位分配原因 (Assignment Reason)
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AssignmentReason {
    RoundCompletion, // 轮次正常定榜触发
    Override,        // 管理员改写结果触发
}

impl AssignmentReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            AssignmentReason::RoundCompletion => "round_completion",
            AssignmentReason::Override => "override",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "round_completion" => Some(AssignmentReason::RoundCompletion),
            "override" => Some(AssignmentReason::Override),
            _ => None,
        }
    }
}

impl fmt::Display for AssignmentReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// ==========================================
// 规则动作类型 (Rule Action)
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RuleAction {
    Advance,   // 晋级到目标席位
    Eliminate, // 淘汰 (仅记录, 不改写任何轮次状态)
}

impl RuleAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            RuleAction::Advance => "advance",
            RuleAction::Eliminate => "eliminate",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "advance" => Some(RuleAction::Advance),
            "eliminate" => Some(RuleAction::Eliminate),
            _ => None,
        }
    }
}

impl fmt::Display for RuleAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_round_status_roundtrip() {
        for status in [RoundStatus::Draft, RoundStatus::Live, RoundStatus::Completed] {
            assert_eq!(RoundStatus::from_str(status.as_str()), Some(status));
        }
        assert_eq!(RoundStatus::from_str("unknown"), None);
    }

    #[test]
    fn test_phase_legacy_buzzer_alias() {
        // 旧数据中的 "buzzer" 必须落到普通抢答
        assert_eq!(RoundPhase::from_str("buzzer"), Some(RoundPhase::BuzzerNormal));
        assert!(RoundPhase::BuzzerNormal.is_buzzer());
        assert!(!RoundPhase::Lightning.is_buzzer());
    }
}
