// ==========================================
// 赛事晋级管理系统 - 引擎层
// ==========================================
// 职责: 实现赛务与晋级业务规则
// 红线: 每条规则评估必须输出可解释的日志状态
// ==========================================

pub mod advancement;
pub mod control;
pub mod events;
pub mod ranking;
pub mod repositories;

// 重导出核心引擎
pub use advancement::{AdvancementEngine, AdvancementSummary};
pub use control::{ControlCommand, ControlOutcome, RoundControlEngine};
pub use events::{
    NoOpEventPublisher, OptionalEventPublisher, RoundEvent, RoundEventPublisher, RoundEventType,
};
pub use ranking::{RankedEntry, RankingEngine, RoundStanding};
pub use repositories::TournamentRepositories;
