use crate::domain::round::{NewRound, Round};
use crate::domain::types::{RoundPhase, RoundStatus};
use crate::repository::error::{RepositoryError, RepositoryResult};
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::sync::{Arc, Mutex};

// ==========================================
// RoundRepository - 轮次仓储
// ==========================================
pub struct RoundRepository {
    conn: Arc<Mutex<Connection>>,
}

const ROUND_COLUMNS: &str = "id, tournament_id, group_id, name, code, status, phase, \
     teams_per_round, default_score, sort_order, has_fever, has_ultimate_fever, \
     lightning_score_deltas, buzzer_normal_score_deltas, \
     buzzer_fever_score_deltas, buzzer_ultimate_score_deltas, created_at";

impl RoundRepository {
    pub fn new(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    fn get_conn(&self) -> RepositoryResult<std::sync::MutexGuard<Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    /// 按ID查询轮次
    pub fn find_by_id(&self, round_id: i64) -> RepositoryResult<Option<Round>> {
        let conn = self.get_conn()?;
        Self::find_by_id_tx(&conn, round_id)
    }

    /// 查询赛事下全部轮次 (按 sort_order, id 排序)
    pub fn list_by_tournament(&self, tournament_id: i64) -> RepositoryResult<Vec<Round>> {
        let conn = self.get_conn()?;
        Self::list_by_tournament_tx(&conn, tournament_id)
    }

    // ==========================================
    // 事务内操作 (由引擎传入打开事务的连接)
    // ==========================================

    pub fn find_by_id_tx(conn: &Connection, round_id: i64) -> RepositoryResult<Option<Round>> {
        let round = conn
            .query_row(
                &format!("SELECT {ROUND_COLUMNS} FROM round WHERE id = ?1"),
                params![round_id],
                Self::map_row,
            )
            .optional()?;
        Ok(round)
    }

    /// 按ID查询, 且必须属于指定赛事 (晋级目标轮校验用)
    pub fn find_in_tournament_tx(
        conn: &Connection,
        tournament_id: i64,
        round_id: i64,
    ) -> RepositoryResult<Option<Round>> {
        let round = conn
            .query_row(
                &format!("SELECT {ROUND_COLUMNS} FROM round WHERE id = ?1 AND tournament_id = ?2"),
                params![round_id, tournament_id],
                Self::map_row,
            )
            .optional()?;
        Ok(round)
    }

    pub fn list_by_tournament_tx(
        conn: &Connection,
        tournament_id: i64,
    ) -> RepositoryResult<Vec<Round>> {
        let mut stmt = conn.prepare(&format!(
            "SELECT {ROUND_COLUMNS} FROM round WHERE tournament_id = ?1 ORDER BY sort_order, id"
        ))?;
        let rounds = stmt
            .query_map(params![tournament_id], Self::map_row)?
            .collect::<Result<Vec<Round>, _>>()?;
        Ok(rounds)
    }

    /// 查询分组内全部轮次 (分组完成判定/总榜计算用)
    pub fn list_by_group_tx(conn: &Connection, group_id: i64) -> RepositoryResult<Vec<Round>> {
        let mut stmt = conn.prepare(&format!(
            "SELECT {ROUND_COLUMNS} FROM round WHERE group_id = ?1 ORDER BY sort_order, id"
        ))?;
        let rounds = stmt
            .query_map(params![group_id], Self::map_row)?
            .collect::<Result<Vec<Round>, _>>()?;
        Ok(rounds)
    }

    /// 新建轮次, 返回新ID
    pub fn insert_tx(conn: &Connection, round: &NewRound) -> RepositoryResult<i64> {
        conn.execute(
            r#"
            INSERT INTO round (
                tournament_id, group_id, name, code, status, phase,
                teams_per_round, default_score, sort_order,
                has_fever, has_ultimate_fever,
                lightning_score_deltas, buzzer_normal_score_deltas,
                buzzer_fever_score_deltas, buzzer_ultimate_score_deltas
            ) VALUES (?1, ?2, ?3, ?4, 'draft', 'lightning', ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13)
            "#,
            params![
                round.tournament_id,
                round.group_id,
                round.name,
                round.code,
                round.teams_per_round,
                round.default_score,
                round.sort_order,
                round.has_fever as i32,
                round.has_ultimate_fever as i32,
                serde_json::to_string(&round.lightning_score_deltas)
                    .map_err(|e| RepositoryError::InternalError(e.to_string()))?,
                serde_json::to_string(&round.buzzer_normal_score_deltas)
                    .map_err(|e| RepositoryError::InternalError(e.to_string()))?,
                round
                    .buzzer_fever_score_deltas
                    .as_ref()
                    .map(|v| serde_json::to_string(v).unwrap_or_default()),
                round
                    .buzzer_ultimate_score_deltas
                    .as_ref()
                    .map(|v| serde_json::to_string(v).unwrap_or_default()),
            ],
        )?;
        Ok(conn.last_insert_rowid())
    }

    /// 更新轮次基础字段 (管理端编辑)
    pub fn update_tx(conn: &Connection, round: &Round) -> RepositoryResult<usize> {
        let rows = conn.execute(
            r#"
            UPDATE round SET
                group_id = ?2, name = ?3, code = ?4, status = ?5, phase = ?6,
                teams_per_round = ?7, default_score = ?8, sort_order = ?9,
                has_fever = ?10, has_ultimate_fever = ?11,
                lightning_score_deltas = ?12, buzzer_normal_score_deltas = ?13,
                buzzer_fever_score_deltas = ?14, buzzer_ultimate_score_deltas = ?15
            WHERE id = ?1
            "#,
            params![
                round.id,
                round.group_id,
                round.name,
                round.code,
                round.status.as_str(),
                round.phase.as_str(),
                round.teams_per_round,
                round.default_score,
                round.sort_order,
                round.has_fever as i32,
                round.has_ultimate_fever as i32,
                serde_json::to_string(&round.lightning_score_deltas)
                    .map_err(|e| RepositoryError::InternalError(e.to_string()))?,
                serde_json::to_string(&round.buzzer_normal_score_deltas)
                    .map_err(|e| RepositoryError::InternalError(e.to_string()))?,
                round
                    .buzzer_fever_score_deltas
                    .as_ref()
                    .map(|v| serde_json::to_string(v).unwrap_or_default()),
                round
                    .buzzer_ultimate_score_deltas
                    .as_ref()
                    .map(|v| serde_json::to_string(v).unwrap_or_default()),
            ],
        )?;
        Ok(rows)
    }

    pub fn update_status_tx(
        conn: &Connection,
        round_id: i64,
        status: RoundStatus,
    ) -> RepositoryResult<usize> {
        let rows = conn.execute(
            "UPDATE round SET status = ?2 WHERE id = ?1",
            params![round_id, status.as_str()],
        )?;
        Ok(rows)
    }

    pub fn update_phase_tx(
        conn: &Connection,
        round_id: i64,
        phase: RoundPhase,
    ) -> RepositoryResult<usize> {
        let rows = conn.execute(
            "UPDATE round SET phase = ?2 WHERE id = ?1",
            params![round_id, phase.as_str()],
        )?;
        Ok(rows)
    }

    pub fn update_group_tx(
        conn: &Connection,
        round_id: i64,
        group_id: Option<i64>,
    ) -> RepositoryResult<usize> {
        let rows = conn.execute(
            "UPDATE round SET group_id = ?2 WHERE id = ?1",
            params![round_id, group_id],
        )?;
        Ok(rows)
    }

    /// 把同赛事下其他 live 轮次全部置为 completed (开赛前清场)
    pub fn complete_other_live_tx(
        conn: &Connection,
        tournament_id: i64,
        except_round_id: i64,
    ) -> RepositoryResult<usize> {
        let rows = conn.execute(
            "UPDATE round SET status = 'completed'
             WHERE tournament_id = ?1 AND id != ?2 AND status = 'live'",
            params![tournament_id, except_round_id],
        )?;
        Ok(rows)
    }

    // ==========================================
    // 行映射
    // ==========================================

    fn map_row(row: &Row<'_>) -> rusqlite::Result<Round> {
        let status_str: String = row.get(5)?;
        let phase_str: String = row.get(6)?;
        let lightning_json: String = row.get(12)?;
        let normal_json: String = row.get(13)?;
        let fever_json: Option<String> = row.get(14)?;
        let ultimate_json: Option<String> = row.get(15)?;

        Ok(Round {
            id: row.get(0)?,
            tournament_id: row.get(1)?,
            group_id: row.get(2)?,
            name: row.get(3)?,
            code: row.get(4)?,
            status: RoundStatus::from_str(&status_str).unwrap_or(RoundStatus::Draft),
            phase: RoundPhase::from_str(&phase_str).unwrap_or(RoundPhase::Lightning),
            teams_per_round: row.get(7)?,
            default_score: row.get(8)?,
            sort_order: row.get(9)?,
            has_fever: row.get::<_, i32>(10)? != 0,
            has_ultimate_fever: row.get::<_, i32>(11)? != 0,
            lightning_score_deltas: serde_json::from_str(&lightning_json).unwrap_or_default(),
            buzzer_normal_score_deltas: serde_json::from_str(&normal_json).unwrap_or_default(),
            buzzer_fever_score_deltas: fever_json.and_then(|j| serde_json::from_str(&j).ok()),
            buzzer_ultimate_score_deltas: ultimate_json.and_then(|j| serde_json::from_str(&j).ok()),
            created_at: row.get(16)?,
        })
    }
}
