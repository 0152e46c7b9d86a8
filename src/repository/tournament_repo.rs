use crate::domain::tournament::{Group, Team, Tournament};
use crate::domain::types::TournamentStatus;
use crate::repository::error::{RepositoryError, RepositoryResult};
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::sync::{Arc, Mutex};

// ==========================================
// TournamentRepository - 赛事仓储
// ==========================================
pub struct TournamentRepository {
    conn: Arc<Mutex<Connection>>,
}

impl TournamentRepository {
    pub fn new(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    fn get_conn(&self) -> RepositoryResult<std::sync::MutexGuard<Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    pub fn find_by_id(&self, tournament_id: i64) -> RepositoryResult<Option<Tournament>> {
        let conn = self.get_conn()?;
        Self::find_by_id_tx(&conn, tournament_id)
    }

    pub fn find_by_id_tx(
        conn: &Connection,
        tournament_id: i64,
    ) -> RepositoryResult<Option<Tournament>> {
        let row = conn
            .query_row(
                "SELECT id, name, year, status, logo_path, created_at
                 FROM tournament WHERE id = ?1",
                params![tournament_id],
                Self::map_row,
            )
            .optional()?;
        Ok(row)
    }

    pub fn insert_tx(
        conn: &Connection,
        name: &str,
        year: i32,
        status: TournamentStatus,
    ) -> RepositoryResult<i64> {
        conn.execute(
            "INSERT INTO tournament (name, year, status) VALUES (?1, ?2, ?3)",
            params![name, year, status.as_str()],
        )?;
        Ok(conn.last_insert_rowid())
    }

    fn map_row(row: &Row<'_>) -> rusqlite::Result<Tournament> {
        let status_str: String = row.get(3)?;
        Ok(Tournament {
            id: row.get(0)?,
            name: row.get(1)?,
            year: row.get(2)?,
            status: TournamentStatus::from_str(&status_str).unwrap_or(TournamentStatus::Draft),
            logo_path: row.get(4)?,
            created_at: row.get(5)?,
        })
    }
}

// ==========================================
// GroupRepository - 分组仓储
// ==========================================
pub struct GroupRepository {
    conn: Arc<Mutex<Connection>>,
}

impl GroupRepository {
    pub fn new(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    fn get_conn(&self) -> RepositoryResult<std::sync::MutexGuard<Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    pub fn find_by_id(&self, group_id: i64) -> RepositoryResult<Option<Group>> {
        let conn = self.get_conn()?;
        Self::find_by_id_tx(&conn, group_id)
    }

    pub fn find_by_id_tx(conn: &Connection, group_id: i64) -> RepositoryResult<Option<Group>> {
        let row = conn
            .query_row(
                "SELECT id, tournament_id, name, sort_order FROM team_group WHERE id = ?1",
                params![group_id],
                Self::map_row,
            )
            .optional()?;
        Ok(row)
    }

    /// 分组必须属于指定赛事 (轮次编组校验用)
    pub fn find_in_tournament_tx(
        conn: &Connection,
        tournament_id: i64,
        group_id: i64,
    ) -> RepositoryResult<Option<Group>> {
        let row = conn
            .query_row(
                "SELECT id, tournament_id, name, sort_order FROM team_group
                 WHERE id = ?1 AND tournament_id = ?2",
                params![group_id, tournament_id],
                Self::map_row,
            )
            .optional()?;
        Ok(row)
    }

    pub fn insert_tx(
        conn: &Connection,
        tournament_id: i64,
        name: &str,
        sort_order: i32,
    ) -> RepositoryResult<i64> {
        conn.execute(
            "INSERT INTO team_group (tournament_id, name, sort_order) VALUES (?1, ?2, ?3)",
            params![tournament_id, name, sort_order],
        )?;
        Ok(conn.last_insert_rowid())
    }

    fn map_row(row: &Row<'_>) -> rusqlite::Result<Group> {
        Ok(Group {
            id: row.get(0)?,
            tournament_id: row.get(1)?,
            name: row.get(2)?,
            sort_order: row.get(3)?,
        })
    }
}

// ==========================================
// TeamRepository - 队伍仓储
// ==========================================
// 软删除: 晋级写入前的队伍回查只认未删除的队伍
pub struct TeamRepository {
    conn: Arc<Mutex<Connection>>,
}

impl TeamRepository {
    pub fn new(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    fn get_conn(&self) -> RepositoryResult<std::sync::MutexGuard<Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    pub fn find_active_by_id(&self, team_id: i64) -> RepositoryResult<Option<Team>> {
        let conn = self.get_conn()?;
        Self::find_active_by_id_tx(&conn, team_id)
    }

    pub fn find_active_by_id_tx(conn: &Connection, team_id: i64) -> RepositoryResult<Option<Team>> {
        let row = conn
            .query_row(
                "SELECT id, team_name, icon_path, deleted_at FROM team
                 WHERE id = ?1 AND deleted_at IS NULL",
                params![team_id],
                Self::map_row,
            )
            .optional()?;
        Ok(row)
    }

    pub fn insert_tx(
        conn: &Connection,
        team_name: &str,
        icon_path: Option<&str>,
    ) -> RepositoryResult<i64> {
        conn.execute(
            "INSERT INTO team (team_name, icon_path) VALUES (?1, ?2)",
            params![team_name, icon_path],
        )?;
        Ok(conn.last_insert_rowid())
    }

    fn map_row(row: &Row<'_>) -> rusqlite::Result<Team> {
        Ok(Team {
            id: row.get(0)?,
            team_name: row.get(1)?,
            icon_path: row.get(2)?,
            deleted_at: row.get(3)?,
        })
    }
}
