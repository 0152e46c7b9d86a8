// ==========================================
// 赛事晋级管理系统 - 引擎层仓储聚合
// ==========================================
// 职责: 聚合赛务/晋级引擎所需的所有 Repository
// 目标: 减少 API 层的构造函数参数数量，提升可维护性
// ==========================================

use std::sync::{Arc, Mutex};

use rusqlite::Connection;

use crate::repository::{
    AdvancementLogRepository, AdvancementRuleRepository, GroupRepository,
    RoundActionRepository, RoundParticipantRepository, RoundRepository, RoundResultRepository,
    RoundScoreRepository, TeamRepository, TournamentRepository,
};

/// 赛事仓储集合
///
/// 聚合引擎与 API 层所需的所有 Repository，简化依赖注入。
/// 所有仓储共享同一个数据库连接, 事务内写入则绕过实例方法,
/// 直接用各仓储的 *_tx 关联函数。
#[derive(Clone)]
pub struct TournamentRepositories {
    /// 赛事仓储
    pub tournament_repo: Arc<TournamentRepository>,
    /// 分组仓储
    pub group_repo: Arc<GroupRepository>,
    /// 队伍仓储
    pub team_repo: Arc<TeamRepository>,
    /// 轮次仓储
    pub round_repo: Arc<RoundRepository>,
    /// 轮次席位仓储
    pub participant_repo: Arc<RoundParticipantRepository>,
    /// 轮次得分仓储
    pub score_repo: Arc<RoundScoreRepository>,
    /// 轮次定榜仓储
    pub result_repo: Arc<RoundResultRepository>,
    /// 赛务操作记录仓储
    pub action_repo: Arc<RoundActionRepository>,
    /// 晋级规则仓储
    pub rule_repo: Arc<AdvancementRuleRepository>,
    /// 晋级审计日志仓储
    pub advancement_log_repo: Arc<AdvancementLogRepository>,
}

impl TournamentRepositories {
    /// 从共享连接构建全部仓储
    pub fn new(conn: Arc<Mutex<Connection>>) -> Self {
        Self {
            tournament_repo: Arc::new(TournamentRepository::new(conn.clone())),
            group_repo: Arc::new(GroupRepository::new(conn.clone())),
            team_repo: Arc::new(TeamRepository::new(conn.clone())),
            round_repo: Arc::new(RoundRepository::new(conn.clone())),
            participant_repo: Arc::new(RoundParticipantRepository::new(conn.clone())),
            score_repo: Arc::new(RoundScoreRepository::new(conn.clone())),
            result_repo: Arc::new(RoundResultRepository::new(conn.clone())),
            action_repo: Arc::new(RoundActionRepository::new(conn.clone())),
            rule_repo: Arc::new(AdvancementRuleRepository::new(conn.clone())),
            advancement_log_repo: Arc::new(AdvancementLogRepository::new(conn)),
        }
    }
}
