use crate::domain::round::RoundParticipant;
use crate::domain::tournament::Team;
use crate::domain::types::{AssignmentMode, AssignmentReason, SourceType};
use crate::repository::error::{RepositoryError, RepositoryResult};
use chrono::NaiveDateTime;
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::sync::{Arc, Mutex};

// ==========================================
// RoundParticipantRepository - 轮次席位仓储
// ==========================================
// 不变量: UNIQUE(round_id, slot) 由 schema 兜底
// 说明: 晋级引擎的建行竞争处理 (捕获唯一冲突后重查) 依赖该约束
pub struct RoundParticipantRepository {
    conn: Arc<Mutex<Connection>>,
}

const PARTICIPANT_COLUMNS: &str = "id, round_id, slot, team_id, display_name_snapshot, \
     icon_snapshot_path, assignment_mode, assignment_source_type, assignment_source_id, \
     assignment_source_rank, assignment_reason, assignment_updated_at";

impl RoundParticipantRepository {
    pub fn new(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    fn get_conn(&self) -> RepositoryResult<std::sync::MutexGuard<Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    /// 查询轮次全部席位 (按席位号排序)
    pub fn list_by_round(&self, round_id: i64) -> RepositoryResult<Vec<RoundParticipant>> {
        let conn = self.get_conn()?;
        Self::list_by_round_tx(&conn, round_id)
    }

    // ==========================================
    // 事务内操作
    // ==========================================

    pub fn list_by_round_tx(
        conn: &Connection,
        round_id: i64,
    ) -> RepositoryResult<Vec<RoundParticipant>> {
        let mut stmt = conn.prepare(&format!(
            "SELECT {PARTICIPANT_COLUMNS} FROM round_participant WHERE round_id = ?1 ORDER BY slot"
        ))?;
        let rows = stmt
            .query_map(params![round_id], Self::map_row)?
            .collect::<Result<Vec<RoundParticipant>, _>>()?;
        Ok(rows)
    }

    pub fn find_by_slot_tx(
        conn: &Connection,
        round_id: i64,
        slot: i32,
    ) -> RepositoryResult<Option<RoundParticipant>> {
        let row = conn
            .query_row(
                &format!(
                    "SELECT {PARTICIPANT_COLUMNS} FROM round_participant
                     WHERE round_id = ?1 AND slot = ?2"
                ),
                params![round_id, slot],
                Self::map_row,
            )
            .optional()?;
        Ok(row)
    }

    /// 创建空席位行 (晋级引擎发现目标席位缺行时补建)
    ///
    /// 唯一冲突不在此处吞掉: 调用方负责"捕获冲突 -> 重查"
    pub fn create_empty_tx(conn: &Connection, round_id: i64, slot: i32) -> RepositoryResult<i64> {
        conn.execute(
            "INSERT INTO round_participant (round_id, slot, assignment_mode)
             VALUES (?1, ?2, 'manual')",
            params![round_id, slot],
        )?;
        Ok(conn.last_insert_rowid())
    }

    /// 取席位行, 不存在则补建; 补建撞上并发建行时重查
    pub fn find_or_create_tx(
        conn: &Connection,
        round_id: i64,
        slot: i32,
    ) -> RepositoryResult<RoundParticipant> {
        if let Some(p) = Self::find_by_slot_tx(conn, round_id, slot)? {
            return Ok(p);
        }

        match Self::create_empty_tx(conn, round_id, slot) {
            Ok(_) => {}
            Err(e) if e.is_unique_violation() => {
                // 另一个事务先建了这一行, 重查即可
            }
            Err(e) => return Err(e),
        }

        Self::find_by_slot_tx(conn, round_id, slot)?.ok_or_else(|| RepositoryError::NotFound {
            entity: "RoundParticipant".to_string(),
            id: format!("round={} slot={}", round_id, slot),
        })
    }

    /// 晋级写入: 队伍快照 + 分配来源
    #[allow(clippy::too_many_arguments)]
    pub fn apply_advancement_tx(
        conn: &Connection,
        participant_id: i64,
        team: &Team,
        source_type: SourceType,
        source_id: i64,
        source_rank: i32,
        reason: AssignmentReason,
        updated_at: NaiveDateTime,
    ) -> RepositoryResult<usize> {
        let rows = conn.execute(
            r#"
            UPDATE round_participant SET
                team_id = ?2,
                display_name_snapshot = ?3,
                icon_snapshot_path = ?4,
                assignment_mode = 'auto',
                assignment_source_type = ?5,
                assignment_source_id = ?6,
                assignment_source_rank = ?7,
                assignment_reason = ?8,
                assignment_updated_at = ?9
            WHERE id = ?1
            "#,
            params![
                participant_id,
                team.id,
                team.team_name,
                team.icon_path,
                source_type.as_str(),
                source_id,
                source_rank,
                reason.as_str(),
                updated_at.format("%Y-%m-%d %H:%M:%S").to_string(),
            ],
        )?;
        Ok(rows)
    }

    /// 人工指定席位 (upsert): 清空分配来源, 席位变为人工锁定语义
    pub fn assign_manual_tx(
        conn: &Connection,
        round_id: i64,
        slot: i32,
        team: Option<&Team>,
        updated_at: NaiveDateTime,
    ) -> RepositoryResult<usize> {
        let rows = conn.execute(
            r#"
            INSERT INTO round_participant (
                round_id, slot, team_id, display_name_snapshot, icon_snapshot_path,
                assignment_mode, assignment_source_type, assignment_source_id,
                assignment_source_rank, assignment_reason, assignment_updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, 'manual', NULL, NULL, NULL, NULL, ?6)
            ON CONFLICT (round_id, slot) DO UPDATE SET
                team_id = excluded.team_id,
                display_name_snapshot = excluded.display_name_snapshot,
                icon_snapshot_path = excluded.icon_snapshot_path,
                assignment_mode = 'manual',
                assignment_source_type = NULL,
                assignment_source_id = NULL,
                assignment_source_rank = NULL,
                assignment_reason = NULL,
                assignment_updated_at = excluded.assignment_updated_at
            "#,
            params![
                round_id,
                slot,
                team.map(|t| t.id),
                team.map(|t| t.team_name.clone()),
                team.and_then(|t| t.icon_path.clone()),
                updated_at.format("%Y-%m-%d %H:%M:%S").to_string(),
            ],
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
            "DELETE FROM round_participant WHERE round_id = ?1 AND slot > ?2",
            params![round_id, max_slot],
        )?;
        Ok(rows)
    }

    pub fn max_slot_tx(conn: &Connection, round_id: i64) -> RepositoryResult<i32> {
        let max: Option<i32> = conn.query_row(
            "SELECT MAX(slot) FROM round_participant WHERE round_id = ?1",
            params![round_id],
            |row| row.get(0),
        )?;
        Ok(max.unwrap_or(0))
    }

    // ==========================================
    // 行映射
    // ==========================================

    fn map_row(row: &Row<'_>) -> rusqlite::Result<RoundParticipant> {
        let mode_str: String = row.get(6)?;
        let source_type_str: Option<String> = row.get(7)?;
        let reason_str: Option<String> = row.get(10)?;

        Ok(RoundParticipant {
            id: row.get(0)?,
            round_id: row.get(1)?,
            slot: row.get(2)?,
            team_id: row.get(3)?,
            display_name_snapshot: row.get(4)?,
            icon_snapshot_path: row.get(5)?,
            assignment_mode: AssignmentMode::from_str(&mode_str).unwrap_or(AssignmentMode::Manual),
            assignment_source_type: source_type_str.as_deref().and_then(SourceType::from_str),
            assignment_source_id: row.get(8)?,
            assignment_source_rank: row.get(9)?,
            assignment_reason: reason_str.as_deref().and_then(AssignmentReason::from_str),
            assignment_updated_at: row.get(11)?,
        })
    }
}
