use crate::domain::advancement_log::AdvancementLogEntry;
use crate::repository::error::{RepositoryError, RepositoryResult};
use rusqlite::{params, Connection};
use std::sync::{Arc, Mutex};

// ==========================================
// AdvancementLogRepository - 晋级审计日志仓储
// ==========================================
// 红线: Repository 不做业务逻辑,只做数据映射
pub struct AdvancementLogRepository {
    conn: Arc<Mutex<Connection>>,
}

impl AdvancementLogRepository {
    /// 创建新的晋级日志仓储
    pub fn new(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    pub(super) fn get_conn(&self) -> RepositoryResult<std::sync::MutexGuard<Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    // ==========================================
    // 写入操作
    // ==========================================

    /// 插入一条晋级日志, 返回新ID
    ///
    /// 调用方必须用 `?` 传播错误: 日志落库失败要让整个晋级事务回滚,
    /// 不允许静默吞掉
    pub fn insert_tx(conn: &Connection, entry: &AdvancementLogEntry) -> RepositoryResult<i64> {
        conn.execute(
            r#"
            INSERT INTO advancement_log (
                tournament_id, rule_id, actor, source_type,
                source_round_id, source_group_id, target_round_id, target_slot,
                team_id_before, team_id_after, status, message, context
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13)
            "#,
            params![
                entry.tournament_id,
                entry.rule_id,
                entry.actor,
                entry.source_type.as_str(),
                entry.source_round_id,
                entry.source_group_id,
                entry.target_round_id,
                entry.target_slot,
                entry.team_id_before,
                entry.team_id_after,
                entry.status.as_str(),
                entry.message,
                entry.context.to_string(),
            ],
        )?;
        Ok(conn.last_insert_rowid())
    }
}
