// ==========================================
// 赛事晋级管理系统 - 领域模型层
// ==========================================
// 职责: 定义领域实体、类型、业务规则接口
// 红线: 不含数据访问逻辑,不含引擎逻辑
// ==========================================

pub mod advancement_log;
pub mod round;
pub mod rule;
pub mod tournament;
pub mod types;

// 重导出核心类型
pub use advancement_log::{AdvanceStatus, AdvancementLog, AdvancementLogEntry, LogSourceType};
pub use round::{
    ControlActionType, NewRound, ResultEntryDraft, ResultOverride, Round, RoundAction,
    RoundParticipant, RoundResult, RoundResultEntry, RoundScore,
};
pub use rule::{AdvancementRule, NewAdvancementRule};
pub use tournament::{Group, Team, Tournament};
pub use types::{
    AssignmentMode, AssignmentReason, RoundPhase, RoundStatus, RuleAction, SourceType,
    TournamentStatus,
};
