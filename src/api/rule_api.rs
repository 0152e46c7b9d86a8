// ==========================================
// 赛事晋级管理系统 - 晋级规则管理 API
// ==========================================
// 职责: 规则的创建/编辑/删除与一致性校验
// 约束: eliminate 规则的 target/bonus 在落库前强制清空
// ==========================================

use crate::api::error::{ApiError, ApiResult};
use crate::domain::rule::NewAdvancementRule;
use crate::domain::types::{RuleAction, SourceType};
use crate::repository::round_repo::RoundRepository;
use crate::repository::rule_repo::AdvancementRuleRepository;
use crate::repository::tournament_repo::GroupRepository;
use rusqlite::{Connection, TransactionBehavior};
use std::sync::{Arc, Mutex};

// ==========================================
// 请求结构
// ==========================================

#[derive(Debug, Clone)]
pub struct CreateRuleRequest {
    pub tournament_id: i64,
    /// round | group
    pub source_type: String,
    pub source_round_id: Option<i64>,
    pub source_group_id: Option<i64>,
    pub source_rank: i32,
    /// advance | eliminate
    pub action_type: String,
    pub target_round_id: Option<i64>,
    pub target_slot: Option<i32>,
    pub bonus_score: Option<i32>,
    pub priority: Option<i32>,
    pub is_active: Option<bool>,
    pub created_by: Option<String>,
}

/// 规则编辑: 只开放运行期可调的字段
#[derive(Debug, Clone, Default)]
pub struct UpdateRuleRequest {
    pub is_active: Option<bool>,
    pub priority: Option<i32>,
    pub action_type: Option<String>,
    pub target_round_id: Option<Option<i64>>,
    pub target_slot: Option<Option<i32>>,
    pub bonus_score: Option<i32>,
}

// ==========================================
// AdvancementRuleApi
// ==========================================
pub struct AdvancementRuleApi {
    conn: Arc<Mutex<Connection>>,
}

impl AdvancementRuleApi {
    pub fn new(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    fn get_conn(&self) -> ApiResult<std::sync::MutexGuard<Connection>> {
        self.conn
            .lock()
            .map_err(|e| ApiError::DatabaseConnectionError(e.to_string()))
    }

    // ==========================================
    // 创建
    // ==========================================

    pub fn create_rule(&self, request: &CreateRuleRequest) -> ApiResult<i64> {
        let source_type = SourceType::from_str(&request.source_type)
            .ok_or_else(|| ApiError::InvalidInput(format!("未知来源类型: {}", request.source_type)))?;
        let action_type = RuleAction::from_str(&request.action_type)
            .ok_or_else(|| ApiError::InvalidInput(format!("未知动作类型: {}", request.action_type)))?;

        if request.source_rank < 1 {
            return Err(ApiError::InvalidInput("来源名次必须 >= 1".to_string()));
        }
        if matches!(request.priority, Some(p) if p < 0) {
            return Err(ApiError::InvalidInput("优先级不可为负".to_string()));
        }

        // 来源一致性: 类型与来源ID成对出现
        match source_type {
            SourceType::Round if request.source_round_id.is_none() => {
                return Err(ApiError::InvalidInput(
                    "Source round is required for round-based rules.".to_string(),
                ));
            }
            SourceType::Group if request.source_group_id.is_none() => {
                return Err(ApiError::InvalidInput(
                    "Source group is required for group-based rules.".to_string(),
                ));
            }
            _ => {}
        }

        // advance 必须有完整目标
        if action_type == RuleAction::Advance
            && (request.target_round_id.is_none() || request.target_slot.is_none())
        {
            return Err(ApiError::InvalidInput(
                "Target round and slot are required for advance rules.".to_string(),
            ));
        }
        if matches!(request.target_slot, Some(s) if s < 1) {
            return Err(ApiError::InvalidInput("目标席位号必须 >= 1".to_string()));
        }

        let mut conn = self.get_conn()?;
        let tx = conn
            .transaction_with_behavior(TransactionBehavior::Immediate)
            .map_err(|e| ApiError::DatabaseTransactionError(e.to_string()))?;

        // 来源/目标都必须落在本赛事内
        match source_type {
            SourceType::Round => {
                let round_id = request.source_round_id.unwrap_or(0);
                if RoundRepository::find_in_tournament_tx(&tx, request.tournament_id, round_id)?
                    .is_none()
                {
                    return Err(ApiError::InvalidInput(
                        "来源轮次不属于该赛事".to_string(),
                    ));
                }
            }
            SourceType::Group => {
                let group_id = request.source_group_id.unwrap_or(0);
                if GroupRepository::find_in_tournament_tx(&tx, request.tournament_id, group_id)?
                    .is_none()
                {
                    return Err(ApiError::InvalidInput(
                        "来源分组不属于该赛事".to_string(),
                    ));
                }
            }
        }
        if let Some(target_round_id) = request.target_round_id {
            if RoundRepository::find_in_tournament_tx(&tx, request.tournament_id, target_round_id)?
                .is_none()
            {
                return Err(ApiError::InvalidInput(
                    "目标轮次不属于该赛事".to_string(),
                ));
            }
        }

        // eliminate 强制清空目标与加成
        let (target_round_id, target_slot, bonus_score) = match action_type {
            RuleAction::Eliminate => (None, None, 0),
            RuleAction::Advance => (
                request.target_round_id,
                request.target_slot,
                request.bonus_score.unwrap_or(0),
            ),
        };

        let rule_id = AdvancementRuleRepository::insert_tx(
            &tx,
            &NewAdvancementRule {
                tournament_id: request.tournament_id,
                source_type,
                source_round_id: match source_type {
                    SourceType::Round => request.source_round_id,
                    SourceType::Group => None,
                },
                source_group_id: match source_type {
                    SourceType::Group => request.source_group_id,
                    SourceType::Round => None,
                },
                source_rank: request.source_rank,
                action_type,
                target_round_id,
                target_slot,
                bonus_score,
                priority: request.priority.unwrap_or(0),
                is_active: request.is_active.unwrap_or(true),
                created_by: request.created_by.clone(),
            },
        )?;

        tx.commit()
            .map_err(|e| ApiError::DatabaseTransactionError(e.to_string()))?;

        tracing::info!(
            "晋级规则已创建: rule_id={}, tournament_id={}, source={}#{}, action={}",
            rule_id,
            request.tournament_id,
            source_type,
            request.source_rank,
            action_type
        );
        Ok(rule_id)
    }

    // ==========================================
    // 编辑
    // ==========================================

    pub fn update_rule(&self, rule_id: i64, request: &UpdateRuleRequest) -> ApiResult<()> {
        if matches!(request.priority, Some(p) if p < 0) {
            return Err(ApiError::InvalidInput("优先级不可为负".to_string()));
        }
        if matches!(request.target_slot, Some(Some(s)) if s < 1) {
            return Err(ApiError::InvalidInput("目标席位号必须 >= 1".to_string()));
        }

        let mut conn = self.get_conn()?;
        let tx = conn
            .transaction_with_behavior(TransactionBehavior::Immediate)
            .map_err(|e| ApiError::DatabaseTransactionError(e.to_string()))?;

        let mut rule = AdvancementRuleRepository::find_by_id_tx(&tx, rule_id)?
            .ok_or_else(|| ApiError::NotFound(format!("AdvancementRule(id={})不存在", rule_id)))?;

        if let Some(action_str) = &request.action_type {
            rule.action_type = RuleAction::from_str(action_str)
                .ok_or_else(|| ApiError::InvalidInput(format!("未知动作类型: {}", action_str)))?;
        }
        if let Some(is_active) = request.is_active {
            rule.is_active = is_active;
        }
        if let Some(priority) = request.priority {
            rule.priority = priority;
        }
        if let Some(target_round_id) = request.target_round_id {
            rule.target_round_id = target_round_id;
        }
        if let Some(target_slot) = request.target_slot {
            rule.target_slot = target_slot;
        }
        if let Some(bonus_score) = request.bonus_score {
            rule.bonus_score = bonus_score;
        }

        // eliminate 强制清空目标与加成 (与创建同一条红线)
        if rule.action_type == RuleAction::Eliminate {
            rule.target_round_id = None;
            rule.target_slot = None;
            rule.bonus_score = 0;
        } else if let Some(target_round_id) = rule.target_round_id {
            if RoundRepository::find_in_tournament_tx(&tx, rule.tournament_id, target_round_id)?
                .is_none()
            {
                return Err(ApiError::InvalidInput(
                    "目标轮次不属于该赛事".to_string(),
                ));
            }
        }

        AdvancementRuleRepository::update_tx(&tx, &rule)?;

        tx.commit()
            .map_err(|e| ApiError::DatabaseTransactionError(e.to_string()))?;
        Ok(())
    }

    // ==========================================
    // 删除
    // ==========================================

    pub fn delete_rule(&self, rule_id: i64) -> ApiResult<()> {
        let mut conn = self.get_conn()?;
        let tx = conn
            .transaction_with_behavior(TransactionBehavior::Immediate)
            .map_err(|e| ApiError::DatabaseTransactionError(e.to_string()))?;

        let deleted = AdvancementRuleRepository::delete_tx(&tx, rule_id)?;
        if deleted == 0 {
            return Err(ApiError::NotFound(format!(
                "AdvancementRule(id={})不存在",
                rule_id
            )));
        }

        tx.commit()
            .map_err(|e| ApiError::DatabaseTransactionError(e.to_string()))?;
        Ok(())
    }
}
