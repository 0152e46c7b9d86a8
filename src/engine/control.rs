// ==========================================
// 赛事晋级管理系统 - 赛务控制引擎
// ==========================================
// 职责: 轮次生命周期控制 (开赛/结束/切阶段/加减分/撤销/清场)
//       与定榜/改榜流程; 每个动作 = 一个 IMMEDIATE 事务
// 红线: 前置条件不满足 -> 业务错误并整体回滚, 不留半截状态
// 红线: 所有控制操作必须落 round_action 记录
// ==========================================

use crate::domain::round::{
    ControlActionType, ResultEntryDraft, ResultOverride, Round, RoundParticipant,
};
use crate::domain::types::{RoundPhase, RoundStatus};
use crate::engine::advancement::{AdvancementEngine, AdvancementSummary};
use crate::engine::events::{OptionalEventPublisher, RoundEvent, RoundEventType};
use crate::engine::ranking::RankingEngine;
use crate::repository::error::{RepositoryError, RepositoryResult};
use crate::repository::round_repo::{
    RoundActionRepository, RoundParticipantRepository, RoundRepository, RoundResultRepository,
    RoundScoreRepository,
};
use crate::repository::tournament_repo::TeamRepository;
use rusqlite::{Connection, TransactionBehavior};
use serde_json::json;
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};

// ==========================================
// ControlCommand - 控制台指令
// ==========================================
#[derive(Debug, Clone)]
pub enum ControlCommand {
    StartCompetition,
    EndCompetition {
        /// 定榜前的人工覆盖 (按席位覆盖得分/名次)
        results: Option<Vec<ResultOverride>>,
    },
    ToBuzzer,
    AddScore {
        slot: i32,
        delta: i32,
    },
    Undo,
    Clear,
}

impl ControlCommand {
    fn action_type(&self) -> ControlActionType {
        match self {
            ControlCommand::StartCompetition => ControlActionType::StartCompetition,
            ControlCommand::EndCompetition { .. } => ControlActionType::EndCompetition,
            ControlCommand::ToBuzzer => ControlActionType::ToBuzzer,
            ControlCommand::AddScore { .. } => ControlActionType::AddScore,
            ControlCommand::Undo => ControlActionType::Undo,
            ControlCommand::Clear => ControlActionType::Clear,
        }
    }

    /// 这些动作只在比赛进行中可用
    fn requires_live(&self) -> bool {
        matches!(
            self,
            ControlCommand::ToBuzzer | ControlCommand::AddScore { .. } | ControlCommand::Undo
        )
    }
}

// ==========================================
// ControlOutcome - 控制动作结果
// ==========================================
#[derive(Debug, Clone)]
pub struct ControlOutcome {
    pub message: String,
    /// 触发了晋级传播的动作 (end_competition) 附带汇总
    pub advancement: Option<AdvancementSummary>,
}

impl ControlOutcome {
    fn updated() -> Self {
        Self {
            message: "Round updated.".to_string(),
            advancement: None,
        }
    }
}

// ==========================================
// RoundControlEngine - 赛务控制引擎
// ==========================================
pub struct RoundControlEngine {
    conn: Arc<Mutex<Connection>>,
    events: OptionalEventPublisher,
}

impl RoundControlEngine {
    pub fn new(conn: Arc<Mutex<Connection>>, events: OptionalEventPublisher) -> Self {
        Self { conn, events }
    }

    fn get_conn(&self) -> RepositoryResult<std::sync::MutexGuard<Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    // ==========================================
    // 控制台动作入口
    // ==========================================

    /// 执行一个控制台动作 (单事务, 提交后才发事件)
    pub fn execute(
        &self,
        round_id: i64,
        command: &ControlCommand,
        actor: Option<&str>,
    ) -> RepositoryResult<ControlOutcome> {
        let (outcome, tournament_id) = {
            let mut conn = self.get_conn()?;
            let tx = conn
                .transaction_with_behavior(TransactionBehavior::Immediate)
                .map_err(|e| RepositoryError::DatabaseTransactionError(e.to_string()))?;

            let round = Self::load_round(&tx, round_id)?;
            let outcome = Self::execute_in_tx(&tx, &round, command, actor)?;

            tx.commit()
                .map_err(|e| RepositoryError::DatabaseTransactionError(e.to_string()))?;
            (outcome, round.tournament_id)
        };

        self.events.publish(RoundEvent::new(
            tournament_id,
            round_id,
            RoundEventType::RoundUpdated,
            Some(command.action_type().as_str().to_string()),
        ));

        Ok(outcome)
    }

    fn execute_in_tx(
        conn: &Connection,
        round: &Round,
        command: &ControlCommand,
        actor: Option<&str>,
    ) -> RepositoryResult<ControlOutcome> {
        // 前置条件 (原样保留各动作的状态机约束)
        if command.requires_live() && round.status != RoundStatus::Live {
            return Err(RepositoryError::BusinessRuleViolation(
                "This action is only available when the round is live.".to_string(),
            ));
        }
        match command {
            ControlCommand::Clear
                if !matches!(round.status, RoundStatus::Live | RoundStatus::Completed) =>
            {
                return Err(RepositoryError::BusinessRuleViolation(
                    "Clear is only available when the round is live or completed.".to_string(),
                ));
            }
            ControlCommand::StartCompetition if round.status != RoundStatus::Draft => {
                return Err(RepositoryError::BusinessRuleViolation(
                    "Only draft rounds can be started.".to_string(),
                ));
            }
            ControlCommand::EndCompetition { .. } if round.status != RoundStatus::Live => {
                return Err(RepositoryError::BusinessRuleViolation(
                    "Only live rounds can be ended.".to_string(),
                ));
            }
            ControlCommand::ToBuzzer if round.phase.is_buzzer() => {
                return Err(RepositoryError::BusinessRuleViolation(
                    "Round is already in buzzer phase.".to_string(),
                ));
            }
            _ => {}
        }

        match command {
            ControlCommand::StartCompetition => {
                // 同一赛事同时只有一轮 live: 其他 live 轮先收尾
                RoundRepository::complete_other_live_tx(conn, round.tournament_id, round.id)?;
                RoundRepository::update_status_tx(conn, round.id, RoundStatus::Live)?;
                RoundActionRepository::insert_tx(
                    conn,
                    round.id,
                    actor,
                    ControlActionType::StartCompetition,
                    &json!({}),
                )?;
                Ok(ControlOutcome::updated())
            }

            ControlCommand::EndCompetition { results } => {
                Self::finalize_round_result(conn, round, results.as_deref(), false, actor)?;
                RoundRepository::update_status_tx(conn, round.id, RoundStatus::Completed)?;
                let summary =
                    AdvancementEngine::recompute_in_tx(conn, round.id, actor, false, false)?;
                RoundActionRepository::insert_tx(
                    conn,
                    round.id,
                    actor,
                    ControlActionType::EndCompetition,
                    &json!({}),
                )?;
                Ok(ControlOutcome {
                    message: format!("Round updated. Advancement: {}.", summary.format_message()),
                    advancement: Some(summary),
                })
            }

            ControlCommand::ToBuzzer => {
                RoundRepository::update_phase_tx(conn, round.id, RoundPhase::BuzzerNormal)?;
                RoundActionRepository::insert_tx(
                    conn,
                    round.id,
                    actor,
                    ControlActionType::ToBuzzer,
                    &json!({}),
                )?;
                Ok(ControlOutcome::updated())
            }

            ControlCommand::AddScore { slot, delta } => {
                let score = RoundScoreRepository::find_by_slot_tx(conn, round.id, *slot)?
                    .ok_or_else(|| RepositoryError::NotFound {
                        entity: "RoundScore".to_string(),
                        id: format!("round={} slot={}", round.id, slot),
                    })?;

                // 得分永不为负: 在 0 截断, 记录实际生效的 delta 供 undo 精确还原
                let before = score.score;
                let after = (before + delta).max(0);
                let actual_delta = after - before;
                RoundScoreRepository::set_score_tx(conn, round.id, *slot, after)?;
                RoundActionRepository::insert_tx(
                    conn,
                    round.id,
                    actor,
                    ControlActionType::AddScore,
                    &json!({
                        "slot": slot,
                        "delta": actual_delta,
                        "phase": round.phase.as_str(),
                    }),
                )?;
                Ok(ControlOutcome::updated())
            }

            ControlCommand::Undo => {
                // 只允许撤销最近一条未回滚的加减分
                let last = RoundActionRepository::latest_active_tx(conn, round.id)?;
                if let Some(last) = last {
                    if last.action_type == ControlActionType::AddScore {
                        let slot = last.payload["slot"].as_i64().unwrap_or(0) as i32;
                        let delta = last.payload["delta"].as_i64().unwrap_or(0) as i32;
                        if let Some(score) =
                            RoundScoreRepository::find_by_slot_tx(conn, round.id, slot)?
                        {
                            let restored = (score.score - delta).max(0);
                            RoundScoreRepository::set_score_tx(conn, round.id, slot, restored)?;
                        }
                        RoundActionRepository::mark_rolled_back_tx(
                            conn,
                            last.id,
                            chrono::Utc::now().naive_utc(),
                        )?;
                    }
                }
                Ok(ControlOutcome::updated())
            }

            ControlCommand::Clear => {
                RoundScoreRepository::reset_all_tx(conn, round.id, round.default_score)?;
                RoundActionRepository::roll_back_all_tx(
                    conn,
                    round.id,
                    chrono::Utc::now().naive_utc(),
                )?;
                RoundResultRepository::delete_by_round_tx(conn, round.id)?;
                RoundRepository::update_status_tx(conn, round.id, RoundStatus::Draft)?;
                RoundRepository::update_phase_tx(conn, round.id, RoundPhase::Lightning)?;
                RoundActionRepository::insert_tx(
                    conn,
                    round.id,
                    actor,
                    ControlActionType::Clear,
                    &json!({}),
                )?;
                Ok(ControlOutcome::updated())
            }
        }
    }

    // ==========================================
    // 改榜 (仅限已定榜轮次)
    // ==========================================

    /// 管理员改写定榜结果, 并以 override 身份重跑晋级传播
    ///
    /// 致命前置条件 (整体回滚, 不留日志):
    /// - 轮次必须已完成
    /// - 至少要有一条落在现有席位上的条目
    pub fn overwrite_result(
        &self,
        round_id: i64,
        results: &[ResultOverride],
        force_apply: bool,
        actor: Option<&str>,
    ) -> RepositoryResult<AdvancementSummary> {
        let (summary, tournament_id) = {
            let mut conn = self.get_conn()?;
            let tx = conn
                .transaction_with_behavior(TransactionBehavior::Immediate)
                .map_err(|e| RepositoryError::DatabaseTransactionError(e.to_string()))?;

            let round = Self::load_round(&tx, round_id)?;
            if round.status != RoundStatus::Completed {
                return Err(RepositoryError::BusinessRuleViolation(
                    "Only completed rounds can have results overwritten.".to_string(),
                ));
            }

            let participants = RoundParticipantRepository::list_by_round_tx(&tx, round.id)?;
            let by_slot: BTreeMap<i32, &RoundParticipant> =
                participants.iter().map(|p| (p.slot, p)).collect();

            // 只接受落在现有席位上的条目; 名次/得分来自输入, 队伍来自席位快照
            let mut entries: Vec<ResultEntryDraft> = Vec::new();
            for item in results {
                let participant = match by_slot.get(&item.slot) {
                    Some(p) => *p,
                    None => continue,
                };
                entries.push(ResultEntryDraft {
                    slot: item.slot,
                    team_id: participant.team_id,
                    display_name_snapshot: Self::display_name(&tx, participant)?,
                    score: item.score.unwrap_or(0).max(0),
                    rank: item.rank.map(|r| r.max(1)),
                });
            }

            if entries.is_empty() {
                return Err(RepositoryError::BusinessRuleViolation(
                    "No valid result entries were provided.".to_string(),
                ));
            }

            RankingEngine::new().assign_derived_ranks(&mut entries);

            let result_id = RoundResultRepository::upsert_tx(
                &tx,
                round.id,
                actor,
                chrono::Utc::now().naive_utc(),
                true,
            )?;
            RoundResultRepository::replace_entries_tx(&tx, result_id, &entries)?;

            let summary = AdvancementEngine::recompute_in_tx(&tx, round.id, actor, true, force_apply)?;

            tx.commit()
                .map_err(|e| RepositoryError::DatabaseTransactionError(e.to_string()))?;
            (summary, round.tournament_id)
        };

        self.events.publish(RoundEvent::new(
            tournament_id,
            round_id,
            RoundEventType::ResultOverwritten,
            actor.map(str::to_string),
        ));

        Ok(summary)
    }

    // ==========================================
    // 定榜
    // ==========================================

    /// 从当前席位+得分生成定榜结果 (end_competition 路径)
    ///
    /// overrides 为按席位的人工覆盖; 没有任何人工名次时按得分推导密集名次
    pub(crate) fn finalize_round_result(
        conn: &Connection,
        round: &Round,
        overrides: Option<&[ResultOverride]>,
        is_overridden: bool,
        actor: Option<&str>,
    ) -> RepositoryResult<i64> {
        let participants = RoundParticipantRepository::list_by_round_tx(conn, round.id)?;
        let scores = RoundScoreRepository::list_by_round_tx(conn, round.id)?;
        let score_by_slot: BTreeMap<i32, i32> = scores.iter().map(|s| (s.slot, s.score)).collect();

        let mut entries: Vec<ResultEntryDraft> = Vec::with_capacity(participants.len());
        for participant in &participants {
            entries.push(ResultEntryDraft {
                slot: participant.slot,
                team_id: participant.team_id,
                display_name_snapshot: Self::display_name(conn, participant)?,
                score: score_by_slot.get(&participant.slot).copied().unwrap_or(0),
                rank: None,
            });
        }

        if let Some(overrides) = overrides {
            for item in overrides {
                if let Some(entry) = entries.iter_mut().find(|e| e.slot == item.slot) {
                    if let Some(score) = item.score {
                        entry.score = score.max(0);
                    }
                    if let Some(rank) = item.rank {
                        entry.rank = Some(rank.max(1));
                    }
                }
            }
        }

        RankingEngine::new().assign_derived_ranks(&mut entries);

        let result_id = RoundResultRepository::upsert_tx(
            conn,
            round.id,
            actor,
            chrono::Utc::now().naive_utc(),
            is_overridden,
        )?;
        RoundResultRepository::replace_entries_tx(conn, result_id, &entries)?;

        Ok(result_id)
    }

    // ==========================================
    // 辅助
    // ==========================================

    fn load_round(conn: &Connection, round_id: i64) -> RepositoryResult<Round> {
        RoundRepository::find_by_id_tx(conn, round_id)?.ok_or_else(|| RepositoryError::NotFound {
            entity: "Round".to_string(),
            id: round_id.to_string(),
        })
    }

    /// 显示名兜底: 席位快照 -> 队伍现名 -> "Team {slot}"
    fn display_name(conn: &Connection, participant: &RoundParticipant) -> RepositoryResult<String> {
        if let Some(name) = &participant.display_name_snapshot {
            return Ok(name.clone());
        }
        if let Some(team_id) = participant.team_id {
            if let Some(team) = TeamRepository::find_active_by_id_tx(conn, team_id)? {
                return Ok(team.team_name);
            }
        }
        Ok(format!("Team {}", participant.slot))
    }
}
