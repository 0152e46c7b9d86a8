// ==========================================
// 赛事晋级管理系统 - 配置管理器
// ==========================================
// 职责: 运营参数的加载、查询、覆写
// 存储: config_kv 表 (key-value)
// ==========================================

use crate::repository::error::{RepositoryError, RepositoryResult};
use rusqlite::{params, Connection};
use std::sync::{Arc, Mutex};

// ==========================================
// 配置键全集
// ==========================================
pub mod config_keys {
    /// 新建轮次的默认初始分
    pub const DEFAULT_ROUND_SCORE: &str = "round/default_score";
    /// 每轮最少席位数
    pub const MIN_TEAMS_PER_ROUND: &str = "round/min_teams";
    /// 每轮最多席位数
    pub const MAX_TEAMS_PER_ROUND: &str = "round/max_teams";
    /// 晋级日志默认分页条数
    pub const ADVANCEMENT_LOG_PAGE_SIZE: &str = "advancement/log_page_size";
}

// ==========================================
// ConfigManager - 配置管理器
// ==========================================
pub struct ConfigManager {
    conn: Arc<Mutex<Connection>>,
}

impl ConfigManager {
    /// 从共享连接创建 ConfigManager
    pub fn from_connection(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    fn get_conn(&self) -> RepositoryResult<std::sync::MutexGuard<Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    /// 读取配置值
    pub fn get(&self, key: &str) -> RepositoryResult<Option<String>> {
        let conn = self.get_conn()?;
        let result = conn.query_row(
            "SELECT value FROM config_kv WHERE key = ?1",
            params![key],
            |row| row.get::<_, String>(0),
        );

        match result {
            Ok(value) => Ok(Some(value)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// 读取整数配置, 不存在或不可解析时回落默认值
    pub fn get_i32_or(&self, key: &str, default: i32) -> RepositoryResult<i32> {
        Ok(self
            .get(key)?
            .and_then(|v| v.trim().parse::<i32>().ok())
            .unwrap_or(default))
    }

    /// 写入配置 (upsert)
    pub fn set(&self, key: &str, value: &str) -> RepositoryResult<()> {
        let conn = self.get_conn()?;
        conn.execute(
            r#"
            INSERT INTO config_kv (key, value, updated_at) VALUES (?1, ?2, datetime('now'))
            ON CONFLICT (key) DO UPDATE SET value = excluded.value, updated_at = datetime('now')
            "#,
            params![key, value],
        )?;
        Ok(())
    }

    // ==========================================
    // 业务语义的便捷读取
    // ==========================================

    /// 新建轮次的默认初始分 (默认 100)
    pub fn default_round_score(&self) -> RepositoryResult<i32> {
        self.get_i32_or(config_keys::DEFAULT_ROUND_SCORE, 100)
    }

    /// 每轮席位数的允许区间 (默认 2..=8)
    pub fn teams_per_round_bounds(&self) -> RepositoryResult<(i32, i32)> {
        let min = self.get_i32_or(config_keys::MIN_TEAMS_PER_ROUND, 2)?;
        let max = self.get_i32_or(config_keys::MAX_TEAMS_PER_ROUND, 8)?;
        Ok((min, max))
    }

    /// 晋级日志默认分页条数 (默认 50)
    pub fn advancement_log_page_size(&self) -> RepositoryResult<i64> {
        Ok(self.get_i32_or(config_keys::ADVANCEMENT_LOG_PAGE_SIZE, 50)? as i64)
    }
}
