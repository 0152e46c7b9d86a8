// ==========================================
// 赛事晋级管理系统 - 数据仓储层
// ==========================================
// 红线: Repository 不含业务逻辑
// ==========================================
// 职责: 提供数据访问接口,屏蔽数据库细节
// 约束: 所有查询使用参数化,防止 SQL 注入
// 约定: *_tx(conn) 关联函数在调用方事务内执行;
//       实例方法自行拿连接, 仅用于事务外的便捷读取
// ==========================================

pub mod advancement_log_repo;
pub mod error;
pub mod round_repo;
pub mod rule_repo;
pub mod tournament_repo;

// 重导出核心仓储
pub use advancement_log_repo::AdvancementLogRepository;
pub use error::{RepositoryError, RepositoryResult};
pub use round_repo::{
    RoundActionRepository, RoundParticipantRepository, RoundRepository, RoundResultRepository,
    RoundScoreRepository,
};
pub use rule_repo::AdvancementRuleRepository;
pub use tournament_repo::{GroupRepository, TeamRepository, TournamentRepository};
