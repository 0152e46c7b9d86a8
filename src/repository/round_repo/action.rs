use crate::domain::round::{ControlActionType, RoundAction};
use crate::repository::error::{RepositoryError, RepositoryResult};
use chrono::NaiveDateTime;
use rusqlite::{params, Connection, OptionalExtension, Row};
use serde_json::Value as JsonValue;
use std::sync::{Arc, Mutex};
use uuid::Uuid;

// ==========================================
// RoundActionRepository - 赛务操作记录仓储
// ==========================================
// 红线: 所有控制操作必须记录
// 用途: 审计 + undo (仅最近一条未回滚记录可撤销)
pub struct RoundActionRepository {
    conn: Arc<Mutex<Connection>>,
}

const ACTION_COLUMNS: &str =
    "id, action_id, round_id, actor, action_type, payload, rolled_back_at, created_at";

impl RoundActionRepository {
    pub fn new(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    fn get_conn(&self) -> RepositoryResult<std::sync::MutexGuard<Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    /// 查询轮次操作记录 (新的在前)
    pub fn list_by_round(&self, round_id: i64, limit: i64) -> RepositoryResult<Vec<RoundAction>> {
        let conn = self.get_conn()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {ACTION_COLUMNS} FROM round_action
             WHERE round_id = ?1 ORDER BY id DESC LIMIT ?2"
        ))?;
        let rows = stmt
            .query_map(params![round_id, limit], Self::map_row)?
            .collect::<Result<Vec<RoundAction>, _>>()?;
        Ok(rows)
    }

    // ==========================================
    // 事务内操作
    // ==========================================

    /// 落一条操作记录, 返回新ID
    pub fn insert_tx(
        conn: &Connection,
        round_id: i64,
        actor: Option<&str>,
        action_type: ControlActionType,
        payload: &JsonValue,
    ) -> RepositoryResult<i64> {
        conn.execute(
            "INSERT INTO round_action (action_id, round_id, actor, action_type, payload)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                Uuid::new_v4().to_string(),
                round_id,
                actor,
                action_type.as_str(),
                payload.to_string(),
            ],
        )?;
        Ok(conn.last_insert_rowid())
    }

    /// 最近一条未回滚的操作 (undo 的唯一候选)
    pub fn latest_active_tx(
        conn: &Connection,
        round_id: i64,
    ) -> RepositoryResult<Option<RoundAction>> {
        let row = conn
            .query_row(
                &format!(
                    "SELECT {ACTION_COLUMNS} FROM round_action
                     WHERE round_id = ?1 AND rolled_back_at IS NULL
                     ORDER BY id DESC LIMIT 1"
                ),
                params![round_id],
                Self::map_row,
            )
            .optional()?;
        Ok(row)
    }

    pub fn mark_rolled_back_tx(
        conn: &Connection,
        action_row_id: i64,
        at: NaiveDateTime,
    ) -> RepositoryResult<usize> {
        let rows = conn.execute(
            "UPDATE round_action SET rolled_back_at = ?2 WHERE id = ?1",
            params![action_row_id, at.format("%Y-%m-%d %H:%M:%S").to_string()],
        )?;
        Ok(rows)
    }

    /// 整轮回滚全部操作记录 (clear 动作)
    pub fn roll_back_all_tx(
        conn: &Connection,
        round_id: i64,
        at: NaiveDateTime,
    ) -> RepositoryResult<usize> {
        let rows = conn.execute(
            "UPDATE round_action SET rolled_back_at = ?2
             WHERE round_id = ?1 AND rolled_back_at IS NULL",
            params![round_id, at.format("%Y-%m-%d %H:%M:%S").to_string()],
        )?;
        Ok(rows)
    }

    // ==========================================
    // 行映射
    // ==========================================

    fn map_row(row: &Row<'_>) -> rusqlite::Result<RoundAction> {
        let action_type_str: String = row.get(4)?;
        let payload_str: String = row.get(5)?;

        Ok(RoundAction {
            id: row.get(0)?,
            action_id: row.get(1)?,
            round_id: row.get(2)?,
            actor: row.get(3)?,
            action_type: ControlActionType::from_str(&action_type_str)
                .unwrap_or(ControlActionType::AddScore),
            payload: serde_json::from_str(&payload_str).unwrap_or(JsonValue::Null),
            rolled_back_at: row.get(6)?,
            created_at: row.get(7)?,
        })
    }
}
