// ==========================================
// 赛事晋级管理系统 - SQLite 连接初始化
// ==========================================
// 目标:
// - 统一所有 Connection::open 的 PRAGMA 行为，避免"部分模块外键开启/部分不开启"
// - 统一 busy_timeout，减少并发写入时的偶发 busy 错误
// - 建表语句集中在此处，应用/测试共用同一份 schema
// ==========================================

use rusqlite::Connection;
use rusqlite::OptionalExtension;
use std::time::Duration;

/// 默认 busy_timeout（毫秒）
///
/// 悲观并发模型: 第二个写事务阻塞等待, 在该超时内不会被取消
pub const DEFAULT_BUSY_TIMEOUT_MS: u64 = 5_000;

/// 当前代码所期望的 schema_version
pub const CURRENT_SCHEMA_VERSION: i64 = 1;

/// 配置 SQLite 连接的统一 PRAGMA
///
/// 说明：
/// - foreign_keys 需要"每个连接"单独开启
/// - busy_timeout 需要"每个连接"单独配置
pub fn configure_sqlite_connection(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch("PRAGMA foreign_keys = ON;")?;
    conn.busy_timeout(Duration::from_millis(DEFAULT_BUSY_TIMEOUT_MS))?;
    Ok(())
}

/// 打开 SQLite 连接并应用统一配置
pub fn open_sqlite_connection(db_path: &str) -> rusqlite::Result<Connection> {
    let conn = Connection::open(db_path)?;
    configure_sqlite_connection(&conn)?;
    Ok(conn)
}

/// 读取 schema_version（若表不存在则返回 None）
pub fn read_schema_version(conn: &Connection) -> rusqlite::Result<Option<i64>> {
    let has_table: bool = conn
        .query_row(
            "SELECT 1 FROM sqlite_master WHERE type='table' AND name='schema_version' LIMIT 1",
            [],
            |_row| Ok(true),
        )
        .optional()?
        .unwrap_or(false);

    if !has_table {
        return Ok(None);
    }

    let v: Option<i64> =
        conn.query_row("SELECT MAX(version) FROM schema_version", [], |row| row.get(0))?;
    Ok(v)
}

/// 确保全部业务表存在
///
/// 不变量 (由 UNIQUE 约束兜底, 晋级引擎的建行竞争处理依赖它们):
/// - round_participant / round_score: 每轮每席位最多一行
/// - round_result: 每轮最多一条定榜
/// - round_result_entry: 每榜每席位最多一条
pub fn ensure_schema(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch(
        r#"
        CREATE TABLE IF NOT EXISTS schema_version (
            version INTEGER PRIMARY KEY,
            applied_at TEXT NOT NULL DEFAULT (datetime('now'))
        );

        CREATE TABLE IF NOT EXISTS tournament (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            name TEXT NOT NULL,
            year INTEGER NOT NULL,
            status TEXT NOT NULL DEFAULT 'draft',
            logo_path TEXT,
            created_at TEXT NOT NULL DEFAULT (datetime('now'))
        );

        CREATE TABLE IF NOT EXISTS team (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            team_name TEXT NOT NULL,
            icon_path TEXT,
            deleted_at TEXT
        );

        CREATE TABLE IF NOT EXISTS team_group (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            tournament_id INTEGER NOT NULL REFERENCES tournament(id) ON DELETE CASCADE,
            name TEXT NOT NULL,
            sort_order INTEGER NOT NULL DEFAULT 0
        );

        CREATE TABLE IF NOT EXISTS round (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            tournament_id INTEGER NOT NULL REFERENCES tournament(id) ON DELETE CASCADE,
            group_id INTEGER REFERENCES team_group(id) ON DELETE SET NULL,
            name TEXT NOT NULL,
            code TEXT,
            status TEXT NOT NULL DEFAULT 'draft',
            phase TEXT NOT NULL DEFAULT 'lightning',
            teams_per_round INTEGER NOT NULL,
            default_score INTEGER NOT NULL DEFAULT 100,
            sort_order INTEGER NOT NULL DEFAULT 0,
            has_fever INTEGER NOT NULL DEFAULT 0,
            has_ultimate_fever INTEGER NOT NULL DEFAULT 0,
            lightning_score_deltas TEXT NOT NULL DEFAULT '[20]',
            buzzer_normal_score_deltas TEXT NOT NULL DEFAULT '[20,10,-10]',
            buzzer_fever_score_deltas TEXT,
            buzzer_ultimate_score_deltas TEXT,
            created_at TEXT NOT NULL DEFAULT (datetime('now'))
        );

        CREATE TABLE IF NOT EXISTS round_participant (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            round_id INTEGER NOT NULL REFERENCES round(id) ON DELETE CASCADE,
            slot INTEGER NOT NULL,
            team_id INTEGER REFERENCES team(id),
            display_name_snapshot TEXT,
            icon_snapshot_path TEXT,
            assignment_mode TEXT NOT NULL DEFAULT 'manual',
            assignment_source_type TEXT,
            assignment_source_id INTEGER,
            assignment_source_rank INTEGER,
            assignment_reason TEXT,
            assignment_updated_at TEXT,
            UNIQUE (round_id, slot)
        );

        CREATE TABLE IF NOT EXISTS round_score (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            round_id INTEGER NOT NULL REFERENCES round(id) ON DELETE CASCADE,
            slot INTEGER NOT NULL,
            score INTEGER NOT NULL DEFAULT 0 CHECK (score >= 0),
            UNIQUE (round_id, slot)
        );

        CREATE TABLE IF NOT EXISTS round_result (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            round_id INTEGER NOT NULL UNIQUE REFERENCES round(id) ON DELETE CASCADE,
            finalized_by TEXT,
            finalized_at TEXT NOT NULL,
            is_overridden INTEGER NOT NULL DEFAULT 0,
            is_stale INTEGER NOT NULL DEFAULT 0
        );

        CREATE TABLE IF NOT EXISTS round_result_entry (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            result_id INTEGER NOT NULL REFERENCES round_result(id) ON DELETE CASCADE,
            slot INTEGER NOT NULL,
            team_id INTEGER,
            display_name_snapshot TEXT NOT NULL,
            score INTEGER NOT NULL DEFAULT 0,
            rank INTEGER,
            UNIQUE (result_id, slot)
        );

        CREATE TABLE IF NOT EXISTS round_action (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            action_id TEXT NOT NULL,
            round_id INTEGER NOT NULL REFERENCES round(id) ON DELETE CASCADE,
            actor TEXT,
            action_type TEXT NOT NULL,
            payload TEXT NOT NULL DEFAULT '{}',
            rolled_back_at TEXT,
            created_at TEXT NOT NULL DEFAULT (datetime('now'))
        );

        CREATE TABLE IF NOT EXISTS advancement_rule (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            tournament_id INTEGER NOT NULL REFERENCES tournament(id) ON DELETE CASCADE,
            source_type TEXT NOT NULL,
            source_round_id INTEGER REFERENCES round(id) ON DELETE CASCADE,
            source_group_id INTEGER REFERENCES team_group(id) ON DELETE CASCADE,
            source_rank INTEGER NOT NULL,
            action_type TEXT NOT NULL,
            target_round_id INTEGER REFERENCES round(id) ON DELETE SET NULL,
            target_slot INTEGER,
            bonus_score INTEGER NOT NULL DEFAULT 0,
            priority INTEGER NOT NULL DEFAULT 0,
            is_active INTEGER NOT NULL DEFAULT 1,
            created_by TEXT,
            created_at TEXT NOT NULL DEFAULT (datetime('now'))
        );

        CREATE TABLE IF NOT EXISTS advancement_log (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            tournament_id INTEGER NOT NULL REFERENCES tournament(id) ON DELETE CASCADE,
            rule_id INTEGER,
            actor TEXT,
            source_type TEXT NOT NULL,
            source_round_id INTEGER,
            source_group_id INTEGER,
            target_round_id INTEGER,
            target_slot INTEGER,
            team_id_before INTEGER,
            team_id_after INTEGER,
            status TEXT NOT NULL,
            message TEXT NOT NULL,
            context TEXT NOT NULL DEFAULT '{}',
            created_at TEXT NOT NULL DEFAULT (datetime('now'))
        );

        CREATE TABLE IF NOT EXISTS config_kv (
            key TEXT PRIMARY KEY,
            value TEXT NOT NULL,
            updated_at TEXT NOT NULL DEFAULT (datetime('now'))
        );

        CREATE INDEX IF NOT EXISTS idx_round_tournament ON round(tournament_id, status);
        CREATE INDEX IF NOT EXISTS idx_round_group ON round(group_id);
        CREATE INDEX IF NOT EXISTS idx_rule_source_round
          ON advancement_rule(tournament_id, source_type, source_round_id, is_active);
        CREATE INDEX IF NOT EXISTS idx_rule_source_group
          ON advancement_rule(tournament_id, source_type, source_group_id, is_active);
        CREATE INDEX IF NOT EXISTS idx_advlog_tournament ON advancement_log(tournament_id, created_at);
        CREATE INDEX IF NOT EXISTS idx_round_action_round ON round_action(round_id, id);
        "#,
    )?;

    conn.execute(
        "INSERT OR IGNORE INTO schema_version (version) VALUES (?1)",
        [CURRENT_SCHEMA_VERSION],
    )?;

    Ok(())
}

/// 打开连接并确保 schema 就绪 (应用启动入口)
pub fn open_and_ensure(db_path: &str) -> rusqlite::Result<Connection> {
    let conn = open_sqlite_connection(db_path)?;
    ensure_schema(&conn)?;

    match read_schema_version(&conn)? {
        Some(v) if v != CURRENT_SCHEMA_VERSION => {
            tracing::warn!(
                "schema_version 不匹配: 库中={}, 代码期望={}",
                v,
                CURRENT_SCHEMA_VERSION
            );
        }
        _ => {}
    }

    Ok(conn)
}
