use crate::domain::round::RoundScore;
use crate::repository::error::{RepositoryError, RepositoryResult};
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::sync::{Arc, Mutex};

// ==========================================
// RoundScoreRepository - 轮次得分仓储
// ==========================================
// 红线: 得分永不为负, 截断逻辑在引擎层, 仓储只写入已截断的值
pub struct RoundScoreRepository {
    conn: Arc<Mutex<Connection>>,
}

impl RoundScoreRepository {
    pub fn new(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    fn get_conn(&self) -> RepositoryResult<std::sync::MutexGuard<Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    /// 查询轮次全部得分 (按席位号排序)
    pub fn list_by_round(&self, round_id: i64) -> RepositoryResult<Vec<RoundScore>> {
        let conn = self.get_conn()?;
        Self::list_by_round_tx(&conn, round_id)
    }

    // ==========================================
    // 事务内操作
    // ==========================================

    pub fn list_by_round_tx(conn: &Connection, round_id: i64) -> RepositoryResult<Vec<RoundScore>> {
        let mut stmt = conn.prepare(
            "SELECT id, round_id, slot, score FROM round_score
             WHERE round_id = ?1 ORDER BY slot",
        )?;
        let rows = stmt
            .query_map(params![round_id], Self::map_row)?
            .collect::<Result<Vec<RoundScore>, _>>()?;
        Ok(rows)
    }

    pub fn find_by_slot_tx(
        conn: &Connection,
        round_id: i64,
        slot: i32,
    ) -> RepositoryResult<Option<RoundScore>> {
        let row = conn
            .query_row(
                "SELECT id, round_id, slot, score FROM round_score
                 WHERE round_id = ?1 AND slot = ?2",
                params![round_id, slot],
                Self::map_row,
            )
            .optional()?;
        Ok(row)
    }

    pub fn create_tx(
        conn: &Connection,
        round_id: i64,
        slot: i32,
        score: i32,
    ) -> RepositoryResult<i64> {
        conn.execute(
            "INSERT INTO round_score (round_id, slot, score) VALUES (?1, ?2, ?3)",
            params![round_id, slot, score],
        )?;
        Ok(conn.last_insert_rowid())
    }

    /// 取得分行, 不存在则以初始分补建; 补建撞上并发建行时重查
    pub fn find_or_create_tx(
        conn: &Connection,
        round_id: i64,
        slot: i32,
        initial_score: i32,
    ) -> RepositoryResult<RoundScore> {
        if let Some(s) = Self::find_by_slot_tx(conn, round_id, slot)? {
            return Ok(s);
        }

        match Self::create_tx(conn, round_id, slot, initial_score) {
            Ok(_) => {}
            Err(e) if e.is_unique_violation() => {
                // 另一个事务先建了这一行, 重查即可
            }
            Err(e) => return Err(e),
        }

        Self::find_by_slot_tx(conn, round_id, slot)?.ok_or_else(|| RepositoryError::NotFound {
            entity: "RoundScore".to_string(),
            id: format!("round={} slot={}", round_id, slot),
        })
    }

    /// 按席位写入得分 (行不存在则补建)
    pub fn set_score_tx(
        conn: &Connection,
        round_id: i64,
        slot: i32,
        score: i32,
    ) -> RepositoryResult<usize> {
        let rows = conn.execute(
            r#"
            INSERT INTO round_score (round_id, slot, score) VALUES (?1, ?2, ?3)
            ON CONFLICT (round_id, slot) DO UPDATE SET score = excluded.score
            "#,
            params![round_id, slot, score],
        )?;
        Ok(rows)
    }

    /// 整轮重置得分 (清场/修改初始分时)
    pub fn reset_all_tx(conn: &Connection, round_id: i64, score: i32) -> RepositoryResult<usize> {
        let rows = conn.execute(
            "UPDATE round_score SET score = ?2 WHERE round_id = ?1",
            params![round_id, score],
        )?;
        Ok(rows)
    }

    /// 轮次缩容: 删除超出席位数的行
    pub fn delete_above_slot_tx(
        conn: &Connection,
        round_id: i64,
        max_slot: i32,
    ) -> RepositoryResult<usize> {
        let rows = conn.execute(
            "DELETE FROM round_score WHERE round_id = ?1 AND slot > ?2",
            params![round_id, max_slot],
        )?;
        Ok(rows)
    }

    // ==========================================
    // 行映射
    // ==========================================

    fn map_row(row: &Row<'_>) -> rusqlite::Result<RoundScore> {
        Ok(RoundScore {
            id: row.get(0)?,
            round_id: row.get(1)?,
            slot: row.get(2)?,
            score: row.get(3)?,
        })
    }
}
