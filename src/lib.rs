// ==========================================
// 赛事晋级管理系统 - 核心库
// ==========================================
// 技术栈: Rust + SQLite
// 系统定位: 赛务决策支持核心 (晋级传播 + 轮次控制, 人工最终控制权)
// ==========================================

// ==========================================
// 模块声明
// ==========================================

// 领域层 - 实体与类型
pub mod domain;

// 数据仓储层 - 数据访问
pub mod repository;

// 引擎层 - 业务规则
pub mod engine;

// 配置层 - 系统配置
pub mod config;

// 数据库基础设施（连接初始化/PRAGMA/建表 统一）
pub mod db;

// 日志系统
pub mod logging;

// API 层 - 业务接口
pub mod api;

// 应用层 - 状态装配
pub mod app;

// ==========================================
// 重导出核心类型
// ==========================================

// 领域类型
pub use domain::types::{
    AssignmentMode, AssignmentReason, RoundPhase, RoundStatus, RuleAction, SourceType,
    TournamentStatus,
};

// 领域实体
pub use domain::{
    AdvanceStatus, AdvancementLog, AdvancementLogEntry, AdvancementRule, ControlActionType, Group,
    LogSourceType, NewAdvancementRule, NewRound, ResultEntryDraft, ResultOverride, Round,
    RoundAction, RoundParticipant, RoundResult, RoundResultEntry, RoundScore, Team, Tournament,
};

// 引擎
pub use engine::{
    AdvancementEngine, AdvancementSummary, ControlCommand, ControlOutcome, NoOpEventPublisher,
    OptionalEventPublisher, RankedEntry, RankingEngine, RoundControlEngine, RoundEvent,
    RoundEventPublisher, RoundEventType, RoundStanding, TournamentRepositories,
};

// API
pub use api::{AdvancementRuleApi, ApiError, ApiResult, ControlApi, RoundApi};

// ==========================================
// 常量定义
// ==========================================

// 系统版本
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

// 系统名称
pub const APP_NAME: &str = "赛事晋级管理系统";

// ==========================================
// 预编译检查
// ==========================================
