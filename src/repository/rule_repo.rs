use crate::domain::rule::{AdvancementRule, NewAdvancementRule};
use crate::domain::types::{RuleAction, SourceType};
use crate::repository::error::{RepositoryError, RepositoryResult};
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::sync::{Arc, Mutex};

// ==========================================
// AdvancementRuleRepository - 晋级规则仓储
// ==========================================
// 红线: 规则执行顺序 = (priority 升序, id 升序), 排序在 SQL 中固定
pub struct AdvancementRuleRepository {
    conn: Arc<Mutex<Connection>>,
}

const RULE_COLUMNS: &str = "id, tournament_id, source_type, source_round_id, source_group_id, \
     source_rank, action_type, target_round_id, target_slot, bonus_score, priority, \
     is_active, created_by, created_at";

impl AdvancementRuleRepository {
    pub fn new(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    fn get_conn(&self) -> RepositoryResult<std::sync::MutexGuard<Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    /// 查询赛事下全部规则 (管理端列表)
    pub fn list_by_tournament(&self, tournament_id: i64) -> RepositoryResult<Vec<AdvancementRule>> {
        let conn = self.get_conn()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {RULE_COLUMNS} FROM advancement_rule
             WHERE tournament_id = ?1
             ORDER BY source_type, priority, id"
        ))?;
        let rules = stmt
            .query_map(params![tournament_id], Self::map_row)?
            .collect::<Result<Vec<AdvancementRule>, _>>()?;
        Ok(rules)
    }

    pub fn find_by_id(&self, rule_id: i64) -> RepositoryResult<Option<AdvancementRule>> {
        let conn = self.get_conn()?;
        Self::find_by_id_tx(&conn, rule_id)
    }

    // ==========================================
    // 事务内操作
    // ==========================================

    pub fn find_by_id_tx(
        conn: &Connection,
        rule_id: i64,
    ) -> RepositoryResult<Option<AdvancementRule>> {
        let row = conn
            .query_row(
                &format!("SELECT {RULE_COLUMNS} FROM advancement_rule WHERE id = ?1"),
                params![rule_id],
                Self::map_row,
            )
            .optional()?;
        Ok(row)
    }

    /// 某来源 (轮次或分组) 的全部生效规则, 按执行顺序返回
    pub fn list_active_by_source_tx(
        conn: &Connection,
        tournament_id: i64,
        source_type: SourceType,
        source_id: i64,
    ) -> RepositoryResult<Vec<AdvancementRule>> {
        let source_column = match source_type {
            SourceType::Round => "source_round_id",
            SourceType::Group => "source_group_id",
        };
        let mut stmt = conn.prepare(&format!(
            "SELECT {RULE_COLUMNS} FROM advancement_rule
             WHERE tournament_id = ?1 AND source_type = ?2 AND {source_column} = ?3
               AND is_active = 1
             ORDER BY priority, id"
        ))?;
        let rules = stmt
            .query_map(
                params![tournament_id, source_type.as_str(), source_id],
                Self::map_row,
            )?
            .collect::<Result<Vec<AdvancementRule>, _>>()?;
        Ok(rules)
    }

    pub fn insert_tx(conn: &Connection, rule: &NewAdvancementRule) -> RepositoryResult<i64> {
        conn.execute(
            r#"
            INSERT INTO advancement_rule (
                tournament_id, source_type, source_round_id, source_group_id,
                source_rank, action_type, target_round_id, target_slot,
                bonus_score, priority, is_active, created_by
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)
            "#,
            params![
                rule.tournament_id,
                rule.source_type.as_str(),
                rule.source_round_id,
                rule.source_group_id,
                rule.source_rank,
                rule.action_type.as_str(),
                rule.target_round_id,
                rule.target_slot,
                rule.bonus_score,
                rule.priority,
                rule.is_active as i32,
                rule.created_by,
            ],
        )?;
        Ok(conn.last_insert_rowid())
    }

    /// 规则编辑 (API 层已按动作类型归一化 target/bonus)
    pub fn update_tx(conn: &Connection, rule: &AdvancementRule) -> RepositoryResult<usize> {
        let rows = conn.execute(
            r#"
            UPDATE advancement_rule SET
                action_type = ?2, target_round_id = ?3, target_slot = ?4,
                bonus_score = ?5, priority = ?6, is_active = ?7
            WHERE id = ?1
            "#,
            params![
                rule.id,
                rule.action_type.as_str(),
                rule.target_round_id,
                rule.target_slot,
                rule.bonus_score,
                rule.priority,
                rule.is_active as i32,
            ],
        )?;
        Ok(rows)
    }

    pub fn delete_tx(conn: &Connection, rule_id: i64) -> RepositoryResult<usize> {
        let rows = conn.execute(
            "DELETE FROM advancement_rule WHERE id = ?1",
            params![rule_id],
        )?;
        Ok(rows)
    }

    // ==========================================
    // 行映射
    // ==========================================

    fn map_row(row: &Row<'_>) -> rusqlite::Result<AdvancementRule> {
        let source_type_str: String = row.get(2)?;
        let action_type_str: String = row.get(6)?;

        Ok(AdvancementRule {
            id: row.get(0)?,
            tournament_id: row.get(1)?,
            source_type: SourceType::from_str(&source_type_str).unwrap_or(SourceType::Round),
            source_round_id: row.get(3)?,
            source_group_id: row.get(4)?,
            source_rank: row.get(5)?,
            action_type: RuleAction::from_str(&action_type_str).unwrap_or(RuleAction::Advance),
            target_round_id: row.get(7)?,
            target_slot: row.get(8)?,
            bonus_score: row.get(9)?,
            priority: row.get(10)?,
            is_active: row.get::<_, i32>(11)? != 0,
            created_by: row.get(12)?,
            created_at: row.get(13)?,
        })
    }
}
