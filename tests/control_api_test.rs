// ==========================================
// 赛务控制 API 集成测试
// ==========================================
// 覆盖: 轮次状态机/加减分截断/undo/clear/定榜/改榜前置条件
// ==========================================


use std::sync::Arc;
use test_helpers::*;
use tournament_ams::api::{ControlActionRequest, ControlApi, OverwriteResultRequest};
use tournament_ams::domain::round::ResultOverride;
use tournament_ams::domain::types::{RoundPhase, RoundStatus};
use tournament_ams::engine::{OptionalEventPublisher, RoundControlEngine};
use tournament_ams::repository::round_repo::{
    RoundRepository, RoundResultRepository, RoundScoreRepository,
};

fn build_api(conn: &std::sync::Arc<std::sync::Mutex<rusqlite::Connection>>) -> ControlApi {
    let engine = Arc::new(RoundControlEngine::new(
        conn.clone(),
        OptionalEventPublisher::none(),
    ));
    ControlApi::new(engine)
}

fn simple_request(action: &str) -> ControlActionRequest {
    ControlActionRequest {
        action: action.to_string(),
        slot: None,
        delta: None,
        results: None,
    }
}

#[test]
fn test_start_competition_completes_other_live_round() {
    let (_tmp, conn) = create_test_db().unwrap();
    let api = build_api(&conn);

    let (round_a, round_b) = {
        let c = conn.lock().unwrap();
        let tid = seed_tournament(&c);
        let round_a = seed_round(&c, tid, "第1轮", 2, 100, None);
        let round_b = seed_round(&c, tid, "第2轮", 2, 100, None);
        set_round_status(&c, round_a, RoundStatus::Live);
        (round_a, round_b)
    };

    let message = api
        .action(round_b, &simple_request("start_competition"), Some("admin"))
        .unwrap();
    assert_eq!(message, "Round updated.");

    let c = conn.lock().unwrap();
    let a = RoundRepository::find_by_id_tx(&c, round_a).unwrap().unwrap();
    let b = RoundRepository::find_by_id_tx(&c, round_b).unwrap().unwrap();
    assert_eq!(a.status, RoundStatus::Completed);
    assert_eq!(b.status, RoundStatus::Live);
}

#[test]
fn test_start_requires_draft() {
    let (_tmp, conn) = create_test_db().unwrap();
    let api = build_api(&conn);

    let round_id = {
        let c = conn.lock().unwrap();
        let tid = seed_tournament(&c);
        let round_id = seed_round(&c, tid, "第1轮", 2, 100, None);
        set_round_status(&c, round_id, RoundStatus::Completed);
        round_id
    };

    let err = api
        .action(round_id, &simple_request("start_competition"), None)
        .unwrap_err();
    assert!(err.to_string().contains("Only draft rounds can be started."));
}

#[test]
fn test_add_score_clamps_at_zero_and_undo_restores() {
    let (_tmp, conn) = create_test_db().unwrap();
    let api = build_api(&conn);

    let round_id = {
        let c = conn.lock().unwrap();
        let tid = seed_tournament(&c);
        let round_id = seed_round(&c, tid, "第1轮", 2, 100, None);
        set_round_status(&c, round_id, RoundStatus::Live);
        set_score(&c, round_id, 1, 5);
        round_id
    };

    // 5 - 20 -> 0 截断
    api.action(
        round_id,
        &ControlActionRequest {
            action: "add_score".to_string(),
            slot: Some(1),
            delta: Some(-20),
            results: None,
        },
        None,
    )
    .unwrap();

    {
        let c = conn.lock().unwrap();
        let score = RoundScoreRepository::find_by_slot_tx(&c, round_id, 1)
            .unwrap()
            .unwrap();
        assert_eq!(score.score, 0);
        // 记录的是实际生效的 delta (-5), 不是请求的 -20
        let recorded_delta: i64 = c
            .query_row(
                "SELECT json_extract(payload, '$.delta') FROM round_action
                 WHERE round_id = ?1 AND action_type = 'add_score'
                 ORDER BY id DESC LIMIT 1",
                rusqlite::params![round_id],
                |row| row.get(0),
            )
            .unwrap();
        assert_eq!(recorded_delta, -5);
    }

    // undo 精确还原到 5
    api.action(round_id, &simple_request("undo"), None).unwrap();
    let c = conn.lock().unwrap();
    let score = RoundScoreRepository::find_by_slot_tx(&c, round_id, 1)
        .unwrap()
        .unwrap();
    assert_eq!(score.score, 5);
}

#[test]
fn test_undo_is_last_action_only() {
    let (_tmp, conn) = create_test_db().unwrap();
    let api = build_api(&conn);

    let round_id = {
        let c = conn.lock().unwrap();
        let tid = seed_tournament(&c);
        let round_id = seed_round(&c, tid, "第1轮", 2, 100, None);
        set_round_status(&c, round_id, RoundStatus::Live);
        round_id
    };

    let add = |slot: i32, delta: i32| ControlActionRequest {
        action: "add_score".to_string(),
        slot: Some(slot),
        delta: Some(delta),
        results: None,
    };

    api.action(round_id, &add(1, 20), None).unwrap(); // 100 -> 120
    api.action(round_id, &add(1, 10), None).unwrap(); // 120 -> 130

    // 第一次 undo 只回滚最近的 +10
    api.action(round_id, &simple_request("undo"), None).unwrap();
    {
        let c = conn.lock().unwrap();
        let score = RoundScoreRepository::find_by_slot_tx(&c, round_id, 1)
            .unwrap()
            .unwrap();
        assert_eq!(score.score, 120);
    }

    // 第二次 undo 回滚 +20
    api.action(round_id, &simple_request("undo"), None).unwrap();
    {
        let c = conn.lock().unwrap();
        let score = RoundScoreRepository::find_by_slot_tx(&c, round_id, 1)
            .unwrap()
            .unwrap();
        assert_eq!(score.score, 100);
    }

    // 没有可撤销的记录: 无操作, 不报错
    api.action(round_id, &simple_request("undo"), None).unwrap();
    let c = conn.lock().unwrap();
    let score = RoundScoreRepository::find_by_slot_tx(&c, round_id, 1)
        .unwrap()
        .unwrap();
    assert_eq!(score.score, 100);
}

#[test]
fn test_to_buzzer_switches_phase_once() {
    let (_tmp, conn) = create_test_db().unwrap();
    let api = build_api(&conn);

    let round_id = {
        let c = conn.lock().unwrap();
        let tid = seed_tournament(&c);
        let round_id = seed_round(&c, tid, "第1轮", 2, 100, None);
        set_round_status(&c, round_id, RoundStatus::Live);
        round_id
    };

    api.action(round_id, &simple_request("to_buzzer"), None).unwrap();
    {
        let c = conn.lock().unwrap();
        let round = RoundRepository::find_by_id_tx(&c, round_id).unwrap().unwrap();
        assert_eq!(round.phase, RoundPhase::BuzzerNormal);
    }

    // 已在抢答阶段: 再切换报错
    let err = api
        .action(round_id, &simple_request("to_buzzer"), None)
        .unwrap_err();
    assert!(err.to_string().contains("already in buzzer phase"));
}

#[test]
fn test_end_competition_finalizes_with_derived_ranks() {
    let (_tmp, conn) = create_test_db().unwrap();
    let api = build_api(&conn);

    let (round_id, alpha, beta) = {
        let c = conn.lock().unwrap();
        let tid = seed_tournament(&c);
        let alpha = seed_team(&c, "Alpha");
        let beta = seed_team(&c, "Beta");
        let round_id = seed_round(&c, tid, "第1轮", 3, 100, None);
        assign_team_manual(&c, round_id, 1, alpha);
        assign_team_manual(&c, round_id, 2, beta);
        set_round_status(&c, round_id, RoundStatus::Live);
        set_score(&c, round_id, 1, 140);
        set_score(&c, round_id, 2, 180);
        (round_id, alpha, beta)
    };

    let message = api
        .action(round_id, &simple_request("end_competition"), Some("staff"))
        .unwrap();
    assert!(message.contains("Advancement:"));

    let c = conn.lock().unwrap();
    let round = RoundRepository::find_by_id_tx(&c, round_id).unwrap().unwrap();
    assert_eq!(round.status, RoundStatus::Completed);

    let result = RoundResultRepository::find_by_round_tx(&c, round_id)
        .unwrap()
        .unwrap();
    assert!(!result.is_overridden);
    assert!(!result.is_stale);

    let entries = RoundResultRepository::list_entries_tx(&c, result.id).unwrap();
    assert_eq!(entries.len(), 3);
    // 得分降序推导密集名次: beta(180)=1, alpha(140)=2, 空席(100)=3
    assert_eq!(entries[0].team_id, Some(beta));
    assert_eq!(entries[0].rank, Some(1));
    assert_eq!(entries[1].team_id, Some(alpha));
    assert_eq!(entries[1].rank, Some(2));
    assert_eq!(entries[2].team_id, None);
    assert_eq!(entries[2].rank, Some(3));
}

#[test]
fn test_end_requires_live_and_leaves_no_partial_state() {
    let (_tmp, conn) = create_test_db().unwrap();
    let api = build_api(&conn);

    let (tid, round_id) = {
        let c = conn.lock().unwrap();
        let tid = seed_tournament(&c);
        let round_id = seed_round(&c, tid, "第1轮", 2, 100, None);
        (tid, round_id)
    };

    let err = api
        .action(round_id, &simple_request("end_competition"), None)
        .unwrap_err();
    assert!(err.to_string().contains("Only live rounds can be ended."));

    let c = conn.lock().unwrap();
    assert!(RoundResultRepository::find_by_round_tx(&c, round_id)
        .unwrap()
        .is_none());
    assert_eq!(count_logs(&c, tid, "applied"), 0);
}

#[test]
fn test_clear_resets_round_to_draft() {
    let (_tmp, conn) = create_test_db().unwrap();
    let api = build_api(&conn);

    let round_id = {
        let c = conn.lock().unwrap();
        let tid = seed_tournament(&c);
        let team = seed_team(&c, "Alpha");
        let round_id = seed_round(&c, tid, "第1轮", 2, 100, None);
        assign_team_manual(&c, round_id, 1, team);
        set_round_status(&c, round_id, RoundStatus::Live);
        round_id
    };

    // 加一笔分再结束, 制造 result + 操作记录
    api.action(
        round_id,
        &ControlActionRequest {
            action: "add_score".to_string(),
            slot: Some(1),
            delta: Some(20),
            results: None,
        },
        None,
    )
    .unwrap();
    api.action(round_id, &simple_request("end_competition"), None)
        .unwrap();

    api.action(round_id, &simple_request("clear"), None).unwrap();

    let c = conn.lock().unwrap();
    let round = RoundRepository::find_by_id_tx(&c, round_id).unwrap().unwrap();
    assert_eq!(round.status, RoundStatus::Draft);
    assert_eq!(round.phase, RoundPhase::Lightning);

    // 得分回到初始分, 榜单删除, 操作记录全部回滚
    let scores = RoundScoreRepository::list_by_round_tx(&c, round_id).unwrap();
    assert!(scores.iter().all(|s| s.score == 100));
    assert!(RoundResultRepository::find_by_round_tx(&c, round_id)
        .unwrap()
        .is_none());
    let active_actions: i64 = c
        .query_row(
            "SELECT COUNT(*) FROM round_action
             WHERE round_id = ?1 AND rolled_back_at IS NULL AND action_type != 'clear'",
            rusqlite::params![round_id],
            |row| row.get(0),
        )
        .unwrap();
    assert_eq!(active_actions, 0);
}

#[test]
fn test_overwrite_requires_completed_round() {
    let (_tmp, conn) = create_test_db().unwrap();
    let api = build_api(&conn);

    let (tid, round_id) = {
        let c = conn.lock().unwrap();
        let tid = seed_tournament(&c);
        let round_id = seed_round(&c, tid, "第1轮", 2, 100, None);
        (tid, round_id)
    };

    let err = api
        .overwrite_result(
            round_id,
            &OverwriteResultRequest {
                results: vec![ResultOverride {
                    slot: 1,
                    score: Some(50),
                    rank: None,
                }],
                force_apply: false,
            },
            None,
        )
        .unwrap_err();
    assert!(err
        .to_string()
        .contains("Only completed rounds can have results overwritten."));

    // 事务整体回滚: 不留任何日志行
    let c = conn.lock().unwrap();
    let total_logs: i64 = c
        .query_row(
            "SELECT COUNT(*) FROM advancement_log WHERE tournament_id = ?1",
            rusqlite::params![tid],
            |row| row.get(0),
        )
        .unwrap();
    assert_eq!(total_logs, 0);
}

#[test]
fn test_overwrite_reruns_advancement_with_override_reason() {
    let (_tmp, conn) = create_test_db().unwrap();
    let api = build_api(&conn);

    let (tid, round_a, round_b, alpha, beta) = {
        let c = conn.lock().unwrap();
        let tid = seed_tournament(&c);
        let alpha = seed_team(&c, "Alpha");
        let beta = seed_team(&c, "Beta");
        let round_a = seed_round(&c, tid, "预赛", 2, 100, None);
        let round_b = seed_round(&c, tid, "决赛", 2, 120, None);
        assign_team_manual(&c, round_a, 1, alpha);
        assign_team_manual(&c, round_a, 2, beta);
        complete_round_with_entries(
            &c,
            round_a,
            &[(1, Some(alpha), 90), (2, Some(beta), 40)],
        );
        seed_advance_rule(&c, tid, round_a, 1, round_b, 1, 0, 0);
        (tid, round_a, round_b, alpha, beta)
    };

    // 改榜: beta 反超
    let summary = api
        .overwrite_result(
            round_a,
            &OverwriteResultRequest {
                results: vec![
                    ResultOverride { slot: 1, score: Some(40), rank: None },
                    ResultOverride { slot: 2, score: Some(95), rank: None },
                ],
                force_apply: false,
            },
            Some("admin"),
        )
        .unwrap();
    assert_eq!(summary.applied, 1);
    assert_eq!(summary.changed_round_ids, vec![round_b]);

    let c = conn.lock().unwrap();
    let result = RoundResultRepository::find_by_round_tx(&c, round_a)
        .unwrap()
        .unwrap();
    assert!(result.is_overridden);

    let participant = tournament_ams::repository::round_repo::RoundParticipantRepository::
        find_by_slot_tx(&c, round_b, 1)
        .unwrap()
        .unwrap();
    assert_eq!(participant.team_id, Some(beta));
    assert_eq!(
        participant.assignment_reason,
        Some(tournament_ams::domain::types::AssignmentReason::Override)
    );
    assert_ne!(participant.team_id, Some(alpha));

    // 日志上下文记录 override 触发
    let override_logs: i64 = c
        .query_row(
            "SELECT COUNT(*) FROM advancement_log
             WHERE tournament_id = ?1 AND status = 'applied'
               AND json_extract(context, '$.due_to_override') = 1",
            rusqlite::params![tid],
            |row| row.get(0),
        )
        .unwrap();
    assert_eq!(override_logs, 1);
}

#[test]
fn test_unknown_action_rejected() {
    let (_tmp, conn) = create_test_db().unwrap();
    let api = build_api(&conn);

    let round_id = {
        let c = conn.lock().unwrap();
        let tid = seed_tournament(&c);
        seed_round(&c, tid, "第1轮", 2, 100, None)
    };

    let err = api
        .action(round_id, &simple_request("explode"), None)
        .unwrap_err();
    assert!(err.to_string().contains("未知控制动作"));
}
