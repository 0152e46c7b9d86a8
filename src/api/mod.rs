// ==========================================
// 赛事晋级管理系统 - API 层
// ==========================================
// 职责: 提供业务 API 接口,供外层 (HTTP/桌面壳) 调用
// 约定: 本层只做校验/错误翻译/消息拼装, 业务规则在引擎层
// ==========================================

pub mod control_api;
pub mod error;
pub mod round_api;
pub mod rule_api;

// 重导出核心类型
pub use control_api::{ControlActionRequest, ControlApi, OverwriteResultRequest};
pub use error::{ApiError, ApiResult};
pub use round_api::{CreateRoundRequest, ParticipantAssignment, RoundApi, UpdateRoundRequest};
pub use rule_api::{AdvancementRuleApi, CreateRuleRequest, UpdateRuleRequest};
