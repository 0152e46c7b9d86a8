use super::core::AdvancementLogRepository;
use crate::db;
use crate::domain::advancement_log::{AdvanceStatus, AdvancementLogEntry, LogSourceType};
use rusqlite::Connection;
use serde_json::json;
use std::sync::{Arc, Mutex};

fn setup_test_db() -> Arc<Mutex<Connection>> {
    let conn = Connection::open_in_memory().unwrap();
    db::configure_sqlite_connection(&conn).unwrap();
    db::ensure_schema(&conn).unwrap();

    conn.execute(
        "INSERT INTO tournament (name, year) VALUES ('测试赛', 2026)",
        [],
    )
    .unwrap();

    Arc::new(Mutex::new(conn))
}

fn sample_entry(status: AdvanceStatus) -> AdvancementLogEntry {
    AdvancementLogEntry {
        tournament_id: 1,
        rule_id: None,
        actor: Some("admin".to_string()),
        source_type: LogSourceType::Round,
        source_round_id: Some(1),
        source_group_id: None,
        target_round_id: Some(2),
        target_slot: Some(1),
        team_id_before: None,
        team_id_after: Some(7),
        status,
        message: "测试日志".to_string(),
        context: json!({"force_apply": false}),
    }
}

#[test]
fn test_insert_and_list() {
    let conn = setup_test_db();
    let repo = AdvancementLogRepository::new(conn.clone());

    {
        let c = conn.lock().unwrap();
        AdvancementLogRepository::insert_tx(&c, &sample_entry(AdvanceStatus::Applied)).unwrap();
        AdvancementLogRepository::insert_tx(&c, &sample_entry(AdvanceStatus::Skipped)).unwrap();
    }

    let logs = repo.list_by_tournament(1, 10, 0).unwrap();
    assert_eq!(logs.len(), 2);
    // 新的在前
    assert_eq!(logs[0].status, AdvanceStatus::Skipped);
    assert_eq!(logs[1].status, AdvanceStatus::Applied);
    assert_eq!(logs[1].team_id_after, Some(7));
    assert_eq!(logs[1].context["force_apply"], json!(false));
}

#[test]
fn test_count_by_status() {
    let conn = setup_test_db();

    let c = conn.lock().unwrap();
    AdvancementLogRepository::insert_tx(&c, &sample_entry(AdvanceStatus::Applied)).unwrap();
    AdvancementLogRepository::insert_tx(&c, &sample_entry(AdvanceStatus::Applied)).unwrap();
    AdvancementLogRepository::insert_tx(&c, &sample_entry(AdvanceStatus::BlockedManual)).unwrap();

    let applied =
        AdvancementLogRepository::count_by_status_tx(&c, 1, AdvanceStatus::Applied).unwrap();
    let blocked =
        AdvancementLogRepository::count_by_status_tx(&c, 1, AdvanceStatus::BlockedManual).unwrap();
    let stale =
        AdvancementLogRepository::count_by_status_tx(&c, 1, AdvanceStatus::StaleMarked).unwrap();

    assert_eq!(applied, 2);
    assert_eq!(blocked, 1);
    assert_eq!(stale, 0);
}

#[test]
fn test_list_by_target_round() {
    let conn = setup_test_db();
    let repo = AdvancementLogRepository::new(conn.clone());

    {
        let c = conn.lock().unwrap();
        let mut entry = sample_entry(AdvanceStatus::Applied);
        entry.target_round_id = Some(5);
        AdvancementLogRepository::insert_tx(&c, &entry).unwrap();
        AdvancementLogRepository::insert_tx(&c, &sample_entry(AdvanceStatus::Applied)).unwrap();
    }

    let logs = repo.list_by_target_round(5, 10).unwrap();
    assert_eq!(logs.len(), 1);
    assert_eq!(logs[0].target_round_id, Some(5));
}
