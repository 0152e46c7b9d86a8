use super::core::AdvancementLogRepository;
use crate::domain::advancement_log::{AdvanceStatus, AdvancementLog, LogSourceType};
use crate::repository::error::RepositoryResult;
use rusqlite::{params, Connection, Row};
use serde_json::Value as JsonValue;

// ==========================================
// 查询操作
// ==========================================

const LOG_COLUMNS: &str = "id, tournament_id, rule_id, actor, source_type, \
     source_round_id, source_group_id, target_round_id, target_slot, \
     team_id_before, team_id_after, status, message, context, created_at";

impl AdvancementLogRepository {
    /// 查询赛事日志 (新的在前, 分页)
    pub fn list_by_tournament(
        &self,
        tournament_id: i64,
        limit: i64,
        offset: i64,
    ) -> RepositoryResult<Vec<AdvancementLog>> {
        let conn = self.get_conn()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {LOG_COLUMNS} FROM advancement_log
             WHERE tournament_id = ?1
             ORDER BY id DESC LIMIT ?2 OFFSET ?3"
        ))?;
        let rows = stmt
            .query_map(params![tournament_id, limit, offset], Self::map_row)?
            .collect::<Result<Vec<AdvancementLog>, _>>()?;
        Ok(rows)
    }

    /// 查询目标轮次相关日志 (复盘某个席位怎么来的)
    pub fn list_by_target_round(
        &self,
        target_round_id: i64,
        limit: i64,
    ) -> RepositoryResult<Vec<AdvancementLog>> {
        let conn = self.get_conn()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {LOG_COLUMNS} FROM advancement_log
             WHERE target_round_id = ?1
             ORDER BY id DESC LIMIT ?2"
        ))?;
        let rows = stmt
            .query_map(params![target_round_id, limit], Self::map_row)?
            .collect::<Result<Vec<AdvancementLog>, _>>()?;
        Ok(rows)
    }

    /// 按状态计数 (测试与校验用)
    pub fn count_by_status_tx(
        conn: &Connection,
        tournament_id: i64,
        status: AdvanceStatus,
    ) -> RepositoryResult<i64> {
        let count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM advancement_log
             WHERE tournament_id = ?1 AND status = ?2",
            params![tournament_id, status.as_str()],
            |row| row.get(0),
        )?;
        Ok(count)
    }

    // ==========================================
    // 行映射
    // ==========================================

    fn map_row(row: &Row<'_>) -> rusqlite::Result<AdvancementLog> {
        let source_type_str: String = row.get(4)?;
        let status_str: String = row.get(11)?;
        let context_str: String = row.get(13)?;

        Ok(AdvancementLog {
            id: row.get(0)?,
            tournament_id: row.get(1)?,
            rule_id: row.get(2)?,
            actor: row.get(3)?,
            source_type: LogSourceType::from_str(&source_type_str)
                .unwrap_or(LogSourceType::System),
            source_round_id: row.get(5)?,
            source_group_id: row.get(6)?,
            target_round_id: row.get(7)?,
            target_slot: row.get(8)?,
            team_id_before: row.get(9)?,
            team_id_after: row.get(10)?,
            status: AdvanceStatus::from_str(&status_str).unwrap_or(AdvanceStatus::Skipped),
            message: row.get(12)?,
            context: serde_json::from_str(&context_str).unwrap_or(JsonValue::Null),
            created_at: row.get(14)?,
        })
    }
}
