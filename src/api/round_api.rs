// ==========================================
// 赛事晋级管理系统 - 轮次管理 API
// ==========================================
// 职责: 轮次创建/编辑 (含席位扩缩容)、人工指定席位、轮次编组
// 红线: 人工改动已定榜轮次的席位 -> 榜单立刻标记失效
// ==========================================

use crate::api::error::{ApiError, ApiResult};
use crate::config::ConfigManager;
use crate::domain::round::{NewRound, Round};
use crate::domain::types::{RoundPhase, RoundStatus};
use crate::repository::round_repo::{
    RoundParticipantRepository, RoundRepository, RoundResultRepository, RoundScoreRepository,
};
use crate::repository::tournament_repo::{GroupRepository, TeamRepository};
use rusqlite::{Connection, TransactionBehavior};
use std::sync::{Arc, Mutex};

// 各阶段默认分差档位
const DEFAULT_LIGHTNING_DELTAS: &[i32] = &[20];
const DEFAULT_BUZZER_NORMAL_DELTAS: &[i32] = &[20, 10, -10];
const DEFAULT_BUZZER_FEVER_DELTAS: &[i32] = &[30, 15, -15];
const DEFAULT_BUZZER_ULTIMATE_DELTAS: &[i32] = &[40, 20, -20];

// ==========================================
// 请求结构
// ==========================================

#[derive(Debug, Clone)]
pub struct CreateRoundRequest {
    pub tournament_id: i64,
    pub name: String,
    pub code: Option<String>,
    pub group_id: Option<i64>,
    pub teams_per_round: i32,
    pub default_score: Option<i32>,
    pub sort_order: Option<i32>,
    pub has_fever: Option<bool>,
    pub has_ultimate_fever: Option<bool>,
    pub lightning_score_deltas: Option<Vec<i32>>,
    pub buzzer_normal_score_deltas: Option<Vec<i32>>,
    pub buzzer_fever_score_deltas: Option<Vec<i32>>,
    pub buzzer_ultimate_score_deltas: Option<Vec<i32>>,
}

#[derive(Debug, Clone)]
pub struct UpdateRoundRequest {
    pub name: String,
    pub code: Option<String>,
    pub group_id: Option<i64>,
    pub status: String,
    pub phase: String,
    pub teams_per_round: i32,
    pub default_score: Option<i32>,
    pub sort_order: Option<i32>,
    pub has_fever: Option<bool>,
    pub has_ultimate_fever: Option<bool>,
    pub lightning_score_deltas: Option<Vec<i32>>,
    pub buzzer_normal_score_deltas: Option<Vec<i32>>,
    pub buzzer_fever_score_deltas: Option<Vec<i32>>,
    pub buzzer_ultimate_score_deltas: Option<Vec<i32>>,
}

/// 人工指定席位: slot -> 队伍 (None = 清空席位)
#[derive(Debug, Clone)]
pub struct ParticipantAssignment {
    pub slot: i32,
    pub team_id: Option<i64>,
}

/// 阶段配置归一化结果
#[derive(Debug, Clone)]
struct PhaseConfig {
    has_fever: bool,
    has_ultimate_fever: bool,
    lightning: Vec<i32>,
    normal: Vec<i32>,
    fever: Option<Vec<i32>>,
    ultimate: Option<Vec<i32>>,
}

// ==========================================
// RoundApi
// ==========================================
pub struct RoundApi {
    conn: Arc<Mutex<Connection>>,
    config: Arc<ConfigManager>,
}

impl RoundApi {
    pub fn new(conn: Arc<Mutex<Connection>>, config: Arc<ConfigManager>) -> Self {
        Self { conn, config }
    }

    fn get_conn(&self) -> ApiResult<std::sync::MutexGuard<Connection>> {
        self.conn
            .lock()
            .map_err(|e| ApiError::DatabaseConnectionError(e.to_string()))
    }

    // ==========================================
    // 轮次创建
    // ==========================================

    /// 新建轮次并铺满 1..=N 的席位行与得分行
    pub fn create_round(&self, request: &CreateRoundRequest) -> ApiResult<i64> {
        if request.name.trim().is_empty() {
            return Err(ApiError::InvalidInput("轮次名称不能为空".to_string()));
        }
        let (min_teams, max_teams) = self.config.teams_per_round_bounds()?;
        if request.teams_per_round < min_teams || request.teams_per_round > max_teams {
            return Err(ApiError::InvalidInput(format!(
                "席位数必须在 {}..={} 之间",
                min_teams, max_teams
            )));
        }

        let default_score = match request.default_score {
            Some(score) if score < 0 => {
                return Err(ApiError::InvalidInput("初始分不可为负".to_string()));
            }
            Some(score) => score,
            None => self.config.default_round_score()?,
        };

        let phase_config = Self::resolve_phase_config(
            request.has_fever,
            request.has_ultimate_fever,
            request.lightning_score_deltas.as_ref(),
            request.buzzer_normal_score_deltas.as_ref(),
            request.buzzer_fever_score_deltas.as_ref(),
            request.buzzer_ultimate_score_deltas.as_ref(),
            None,
        );

        let mut conn = self.get_conn()?;
        let tx = conn
            .transaction_with_behavior(TransactionBehavior::Immediate)
            .map_err(|e| ApiError::DatabaseTransactionError(e.to_string()))?;

        if let Some(group_id) = request.group_id {
            if GroupRepository::find_in_tournament_tx(&tx, request.tournament_id, group_id)?
                .is_none()
            {
                return Err(ApiError::InvalidInput(
                    "所选分组不属于该赛事".to_string(),
                ));
            }
        }

        let round_id = RoundRepository::insert_tx(
            &tx,
            &NewRound {
                tournament_id: request.tournament_id,
                group_id: request.group_id,
                name: request.name.trim().to_string(),
                code: request.code.clone(),
                teams_per_round: request.teams_per_round,
                default_score,
                sort_order: request.sort_order.unwrap_or(0),
                has_fever: phase_config.has_fever,
                has_ultimate_fever: phase_config.has_ultimate_fever,
                lightning_score_deltas: phase_config.lightning.clone(),
                buzzer_normal_score_deltas: phase_config.normal.clone(),
                buzzer_fever_score_deltas: phase_config.fever.clone(),
                buzzer_ultimate_score_deltas: phase_config.ultimate.clone(),
            },
        )?;

        for slot in 1..=request.teams_per_round {
            RoundParticipantRepository::create_empty_tx(&tx, round_id, slot)?;
            RoundScoreRepository::create_tx(&tx, round_id, slot, default_score)?;
        }

        tx.commit()
            .map_err(|e| ApiError::DatabaseTransactionError(e.to_string()))?;

        tracing::info!(
            "轮次已创建: round_id={}, tournament_id={}, slots={}",
            round_id,
            request.tournament_id,
            request.teams_per_round
        );
        Ok(round_id)
    }

    // ==========================================
    // 轮次编辑
    // ==========================================

    /// 编辑轮次; 席位数变化时扩缩容, draft 轮次的初始分变化会铺到得分行
    pub fn update_round(&self, round_id: i64, request: &UpdateRoundRequest) -> ApiResult<()> {
        if request.name.trim().is_empty() {
            return Err(ApiError::InvalidInput("轮次名称不能为空".to_string()));
        }
        let (min_teams, max_teams) = self.config.teams_per_round_bounds()?;
        if request.teams_per_round < min_teams || request.teams_per_round > max_teams {
            return Err(ApiError::InvalidInput(format!(
                "席位数必须在 {}..={} 之间",
                min_teams, max_teams
            )));
        }

        let status = RoundStatus::from_str(&request.status)
            .ok_or_else(|| ApiError::InvalidInput(format!("未知轮次状态: {}", request.status)))?;
        let mut phase = RoundPhase::from_str(&request.phase)
            .ok_or_else(|| ApiError::InvalidInput(format!("未知轮次阶段: {}", request.phase)))?;

        let mut conn = self.get_conn()?;
        let tx = conn
            .transaction_with_behavior(TransactionBehavior::Immediate)
            .map_err(|e| ApiError::DatabaseTransactionError(e.to_string()))?;

        let round = RoundRepository::find_by_id_tx(&tx, round_id)?.ok_or_else(|| {
            ApiError::NotFound(format!("Round(id={})不存在", round_id))
        })?;

        if let Some(group_id) = request.group_id {
            if GroupRepository::find_in_tournament_tx(&tx, round.tournament_id, group_id)?.is_none()
            {
                return Err(ApiError::InvalidInput(
                    "所选分组不属于该赛事".to_string(),
                ));
            }
        }

        let phase_config = Self::resolve_phase_config(
            request.has_fever,
            request.has_ultimate_fever,
            request.lightning_score_deltas.as_ref(),
            request.buzzer_normal_score_deltas.as_ref(),
            request.buzzer_fever_score_deltas.as_ref(),
            request.buzzer_ultimate_score_deltas.as_ref(),
            Some(&round),
        );

        // 阶段与开关自洽: 未开启的 fever 阶段退回可用阶段
        if phase == RoundPhase::BuzzerFever && !phase_config.has_fever {
            phase = RoundPhase::BuzzerNormal;
        }
        if phase == RoundPhase::BuzzerUltimateFever && !phase_config.has_ultimate_fever {
            phase = if phase_config.has_fever {
                RoundPhase::BuzzerFever
            } else {
                RoundPhase::BuzzerNormal
            };
        }

        let new_default_score = match request.default_score {
            Some(score) if score < 0 => {
                return Err(ApiError::InvalidInput("初始分不可为负".to_string()));
            }
            Some(score) => score,
            None => round.default_score,
        };
        let default_score_changed = new_default_score != round.default_score;

        let updated = Round {
            group_id: request.group_id,
            name: request.name.trim().to_string(),
            code: request.code.clone(),
            status,
            phase,
            teams_per_round: request.teams_per_round,
            default_score: new_default_score,
            sort_order: request.sort_order.unwrap_or(round.sort_order),
            has_fever: phase_config.has_fever,
            has_ultimate_fever: phase_config.has_ultimate_fever,
            lightning_score_deltas: phase_config.lightning.clone(),
            buzzer_normal_score_deltas: phase_config.normal.clone(),
            buzzer_fever_score_deltas: phase_config.fever.clone(),
            buzzer_ultimate_score_deltas: phase_config.ultimate.clone(),
            ..round.clone()
        };
        RoundRepository::update_tx(&tx, &updated)?;

        // 席位扩缩容: 保证 1..=N 每席恰好一行
        let max_slot = RoundParticipantRepository::max_slot_tx(&tx, round_id)?;
        if request.teams_per_round > max_slot {
            for slot in (max_slot + 1)..=request.teams_per_round {
                RoundParticipantRepository::create_empty_tx(&tx, round_id, slot)?;
                RoundScoreRepository::create_tx(&tx, round_id, slot, new_default_score)?;
            }
        } else if request.teams_per_round < max_slot {
            RoundParticipantRepository::delete_above_slot_tx(&tx, round_id, request.teams_per_round)?;
            RoundScoreRepository::delete_above_slot_tx(&tx, round_id, request.teams_per_round)?;
        }

        // 初始分变化只影响尚未开赛的轮次
        if default_score_changed && updated.status == RoundStatus::Draft {
            RoundScoreRepository::reset_all_tx(&tx, round_id, new_default_score)?;
        }

        tx.commit()
            .map_err(|e| ApiError::DatabaseTransactionError(e.to_string()))?;
        Ok(())
    }

    // ==========================================
    // 人工指定席位
    // ==========================================

    /// 按席位人工指定队伍; 已定榜轮次的席位被改动时榜单标记失效
    pub fn update_participants(
        &self,
        round_id: i64,
        assignments: &[ParticipantAssignment],
    ) -> ApiResult<()> {
        if assignments.is_empty() {
            return Err(ApiError::InvalidInput("未提供任何席位指定".to_string()));
        }

        let mut conn = self.get_conn()?;
        let tx = conn
            .transaction_with_behavior(TransactionBehavior::Immediate)
            .map_err(|e| ApiError::DatabaseTransactionError(e.to_string()))?;

        let round = RoundRepository::find_by_id_tx(&tx, round_id)?.ok_or_else(|| {
            ApiError::NotFound(format!("Round(id={})不存在", round_id))
        })?;

        let now = chrono::Utc::now().naive_utc();
        for assignment in assignments {
            if assignment.slot < 1 {
                return Err(ApiError::InvalidInput(format!(
                    "非法席位号: {}",
                    assignment.slot
                )));
            }

            let team = match assignment.team_id {
                Some(team_id) => Some(
                    TeamRepository::find_active_by_id_tx(&tx, team_id)?.ok_or_else(|| {
                        ApiError::InvalidInput(format!("队伍不存在: id={}", team_id))
                    })?,
                ),
                None => None,
            };

            RoundParticipantRepository::assign_manual_tx(
                &tx,
                round_id,
                assignment.slot,
                team.as_ref(),
                now,
            )?;
            RoundScoreRepository::find_or_create_tx(
                &tx,
                round_id,
                assignment.slot,
                round.default_score,
            )?;
        }

        // 已定榜轮次被人工改了席位: 榜单立刻不可信
        if round.status == RoundStatus::Completed {
            if let Some(result) = RoundResultRepository::find_by_round_tx(&tx, round_id)? {
                RoundResultRepository::mark_stale_tx(&tx, result.id)?;
            }
        }

        tx.commit()
            .map_err(|e| ApiError::DatabaseTransactionError(e.to_string()))?;
        Ok(())
    }

    // ==========================================
    // 轮次编组
    // ==========================================

    pub fn update_group(&self, round_id: i64, group_id: Option<i64>) -> ApiResult<()> {
        let mut conn = self.get_conn()?;
        let tx = conn
            .transaction_with_behavior(TransactionBehavior::Immediate)
            .map_err(|e| ApiError::DatabaseTransactionError(e.to_string()))?;

        let round = RoundRepository::find_by_id_tx(&tx, round_id)?.ok_or_else(|| {
            ApiError::NotFound(format!("Round(id={})不存在", round_id))
        })?;

        if let Some(group_id) = group_id {
            if GroupRepository::find_in_tournament_tx(&tx, round.tournament_id, group_id)?.is_none()
            {
                return Err(ApiError::InvalidInput(
                    "所选分组不属于该赛事".to_string(),
                ));
            }
        }

        RoundRepository::update_group_tx(&tx, round_id, group_id)?;

        tx.commit()
            .map_err(|e| ApiError::DatabaseTransactionError(e.to_string()))?;
        Ok(())
    }

    // ==========================================
    // 阶段配置归一化
    // ==========================================

    /// 归一化阶段配置: ultimate 蕴含 fever, 空档位回落默认值
    fn resolve_phase_config(
        has_fever: Option<bool>,
        has_ultimate_fever: Option<bool>,
        lightning: Option<&Vec<i32>>,
        normal: Option<&Vec<i32>>,
        fever: Option<&Vec<i32>>,
        ultimate: Option<&Vec<i32>>,
        current: Option<&Round>,
    ) -> PhaseConfig {
        let mut has_fever = has_fever
            .or(current.map(|r| r.has_fever))
            .unwrap_or(false);
        let has_ultimate = has_ultimate_fever
            .or(current.map(|r| r.has_ultimate_fever))
            .unwrap_or(false);
        if has_ultimate {
            has_fever = true;
        }

        let lightning = Self::normalize_deltas(
            lightning,
            current.map(|r| &r.lightning_score_deltas),
            DEFAULT_LIGHTNING_DELTAS,
        );
        let normal = Self::normalize_deltas(
            normal,
            current.map(|r| &r.buzzer_normal_score_deltas),
            DEFAULT_BUZZER_NORMAL_DELTAS,
        );
        let fever_deltas = has_fever.then(|| {
            Self::normalize_deltas(
                fever,
                current.and_then(|r| r.buzzer_fever_score_deltas.as_ref()),
                DEFAULT_BUZZER_FEVER_DELTAS,
            )
        });
        let ultimate_deltas = has_ultimate.then(|| {
            Self::normalize_deltas(
                ultimate,
                current.and_then(|r| r.buzzer_ultimate_score_deltas.as_ref()),
                DEFAULT_BUZZER_ULTIMATE_DELTAS,
            )
        });

        PhaseConfig {
            has_fever,
            has_ultimate_fever: has_ultimate,
            lightning,
            normal,
            fever: fever_deltas,
            ultimate: ultimate_deltas,
        }
    }

    fn normalize_deltas(
        submitted: Option<&Vec<i32>>,
        current: Option<&Vec<i32>>,
        fallback: &[i32],
    ) -> Vec<i32> {
        submitted
            .or(current)
            .filter(|v| !v.is_empty())
            .cloned()
            .unwrap_or_else(|| fallback.to_vec())
    }
}
