use crate::domain::round::{ResultEntryDraft, RoundResult, RoundResultEntry};
use crate::repository::error::{RepositoryError, RepositoryResult};
use chrono::NaiveDateTime;
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::sync::{Arc, Mutex};

// ==========================================
// RoundResultRepository - 轮次定榜仓储
// ==========================================
// 不变量: 每轮最多一条 result (UNIQUE(round_id)),
//         每榜每席位最多一条 entry (UNIQUE(result_id, slot))
pub struct RoundResultRepository {
    conn: Arc<Mutex<Connection>>,
}

impl RoundResultRepository {
    pub fn new(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    fn get_conn(&self) -> RepositoryResult<std::sync::MutexGuard<Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    /// 查询轮次定榜 (含条目)
    pub fn find_with_entries(
        &self,
        round_id: i64,
    ) -> RepositoryResult<Option<(RoundResult, Vec<RoundResultEntry>)>> {
        let conn = self.get_conn()?;
        match Self::find_by_round_tx(&conn, round_id)? {
            Some(result) => {
                let entries = Self::list_entries_tx(&conn, result.id)?;
                Ok(Some((result, entries)))
            }
            None => Ok(None),
        }
    }

    // ==========================================
    // 事务内操作
    // ==========================================

    pub fn find_by_round_tx(
        conn: &Connection,
        round_id: i64,
    ) -> RepositoryResult<Option<RoundResult>> {
        let row = conn
            .query_row(
                "SELECT id, round_id, finalized_by, finalized_at, is_overridden, is_stale
                 FROM round_result WHERE round_id = ?1",
                params![round_id],
                Self::map_result_row,
            )
            .optional()?;
        Ok(row)
    }

    /// 定榜条目 (人工名次优先, 无名次的排在后面, 同名次按席位)
    pub fn list_entries_tx(
        conn: &Connection,
        result_id: i64,
    ) -> RepositoryResult<Vec<RoundResultEntry>> {
        let mut stmt = conn.prepare(
            "SELECT id, result_id, slot, team_id, display_name_snapshot, score, rank
             FROM round_result_entry
             WHERE result_id = ?1
             ORDER BY rank IS NULL, rank, slot",
        )?;
        let rows = stmt
            .query_map(params![result_id], Self::map_entry_row)?
            .collect::<Result<Vec<RoundResultEntry>, _>>()?;
        Ok(rows)
    }

    /// 定榜 upsert: 已有则覆盖定榜元数据并清除失效标记, 返回 result_id
    pub fn upsert_tx(
        conn: &Connection,
        round_id: i64,
        finalized_by: Option<&str>,
        finalized_at: NaiveDateTime,
        is_overridden: bool,
    ) -> RepositoryResult<i64> {
        conn.execute(
            r#"
            INSERT INTO round_result (round_id, finalized_by, finalized_at, is_overridden, is_stale)
            VALUES (?1, ?2, ?3, ?4, 0)
            ON CONFLICT (round_id) DO UPDATE SET
                finalized_by = excluded.finalized_by,
                finalized_at = excluded.finalized_at,
                is_overridden = excluded.is_overridden,
                is_stale = 0
            "#,
            params![
                round_id,
                finalized_by,
                finalized_at.format("%Y-%m-%d %H:%M:%S").to_string(),
                is_overridden as i32,
            ],
        )?;

        let result_id: i64 = conn.query_row(
            "SELECT id FROM round_result WHERE round_id = ?1",
            params![round_id],
            |row| row.get(0),
        )?;
        Ok(result_id)
    }

    /// 整批替换定榜条目 (先删后插, 按席位排序写入)
    pub fn replace_entries_tx(
        conn: &Connection,
        result_id: i64,
        entries: &[ResultEntryDraft],
    ) -> RepositoryResult<usize> {
        conn.execute(
            "DELETE FROM round_result_entry WHERE result_id = ?1",
            params![result_id],
        )?;

        let mut ordered: Vec<&ResultEntryDraft> = entries.iter().collect();
        ordered.sort_by_key(|e| e.slot);

        let mut stmt = conn.prepare(
            "INSERT INTO round_result_entry
                 (result_id, slot, team_id, display_name_snapshot, score, rank)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        )?;
        for entry in &ordered {
            stmt.execute(params![
                result_id,
                entry.slot,
                entry.team_id,
                entry.display_name_snapshot,
                entry.score,
                entry.rank,
            ])?;
        }

        Ok(ordered.len())
    }

    /// 标记定榜失效 (上游席位已变)
    pub fn mark_stale_tx(conn: &Connection, result_id: i64) -> RepositoryResult<usize> {
        let rows = conn.execute(
            "UPDATE round_result SET is_stale = 1 WHERE id = ?1",
            params![result_id],
        )?;
        Ok(rows)
    }

    /// 删除轮次定榜 (clear 动作; 条目随外键级联删除)
    pub fn delete_by_round_tx(conn: &Connection, round_id: i64) -> RepositoryResult<usize> {
        let rows = conn.execute(
            "DELETE FROM round_result WHERE round_id = ?1",
            params![round_id],
        )?;
        Ok(rows)
    }

    // ==========================================
    // 行映射
    // ==========================================

    fn map_result_row(row: &Row<'_>) -> rusqlite::Result<RoundResult> {
        Ok(RoundResult {
            id: row.get(0)?,
            round_id: row.get(1)?,
            finalized_by: row.get(2)?,
            finalized_at: row.get(3)?,
            is_overridden: row.get::<_, i32>(4)? != 0,
            is_stale: row.get::<_, i32>(5)? != 0,
        })
    }

    fn map_entry_row(row: &Row<'_>) -> rusqlite::Result<RoundResultEntry> {
        Ok(RoundResultEntry {
            id: row.get(0)?,
            result_id: row.get(1)?,
            slot: row.get(2)?,
            team_id: row.get(3)?,
            display_name_snapshot: row.get(4)?,
            score: row.get(5)?,
            rank: row.get(6)?,
        })
    }
}
