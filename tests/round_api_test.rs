// ==========================================
// 轮次管理 API 集成测试
// ==========================================
// 覆盖: 轮次创建铺行/扩缩容/初始分传播/人工指定席位/编组校验
// ==========================================


use std::sync::{Arc, Mutex};
use rusqlite::Connection;
use test_helpers::*;
use tournament_ams::api::{
    CreateRoundRequest, ParticipantAssignment, RoundApi, UpdateRoundRequest,
};
use tournament_ams::config::ConfigManager;
use tournament_ams::domain::types::{AssignmentMode, RoundStatus};
use tournament_ams::repository::round_repo::{
    RoundParticipantRepository, RoundRepository, RoundResultRepository, RoundScoreRepository,
};

fn build_api(conn: &Arc<Mutex<Connection>>) -> RoundApi {
    let config = Arc::new(ConfigManager::from_connection(conn.clone()));
    RoundApi::new(conn.clone(), config)
}

fn create_request(tournament_id: i64, slots: i32) -> CreateRoundRequest {
    CreateRoundRequest {
        tournament_id,
        name: "新轮次".to_string(),
        code: None,
        group_id: None,
        teams_per_round: slots,
        default_score: None,
        sort_order: None,
        has_fever: None,
        has_ultimate_fever: None,
        lightning_score_deltas: None,
        buzzer_normal_score_deltas: None,
        buzzer_fever_score_deltas: None,
        buzzer_ultimate_score_deltas: None,
    }
}

fn update_request_from(slots: i32, default_score: Option<i32>) -> UpdateRoundRequest {
    UpdateRoundRequest {
        name: "新轮次".to_string(),
        code: None,
        group_id: None,
        status: "draft".to_string(),
        phase: "lightning".to_string(),
        teams_per_round: slots,
        default_score,
        sort_order: None,
        has_fever: None,
        has_ultimate_fever: None,
        lightning_score_deltas: None,
        buzzer_normal_score_deltas: None,
        buzzer_fever_score_deltas: None,
        buzzer_ultimate_score_deltas: None,
    }
}

#[test]
fn test_create_round_seeds_every_slot() {
    let (_tmp, conn) = create_test_db().unwrap();
    let api = build_api(&conn);

    let tid = {
        let c = conn.lock().unwrap();
        seed_tournament(&c)
    };

    let round_id = api.create_round(&create_request(tid, 4)).unwrap();

    let c = conn.lock().unwrap();
    let round = RoundRepository::find_by_id_tx(&c, round_id).unwrap().unwrap();
    assert_eq!(round.status, RoundStatus::Draft);
    assert_eq!(round.teams_per_round, 4);
    assert_eq!(round.default_score, 100);

    let participants = RoundParticipantRepository::list_by_round_tx(&c, round_id).unwrap();
    let scores = RoundScoreRepository::list_by_round_tx(&c, round_id).unwrap();
    assert_eq!(participants.len(), 4);
    assert_eq!(scores.len(), 4);
    assert!(scores.iter().all(|s| s.score == 100));
    let slots: Vec<i32> = participants.iter().map(|p| p.slot).collect();
    assert_eq!(slots, vec![1, 2, 3, 4]);
}

#[test]
fn test_create_round_validates_slot_bounds() {
    let (_tmp, conn) = create_test_db().unwrap();
    let api = build_api(&conn);

    let tid = {
        let c = conn.lock().unwrap();
        seed_tournament(&c)
    };

    assert!(api.create_round(&create_request(tid, 1)).is_err());
    assert!(api.create_round(&create_request(tid, 9)).is_err());
}

#[test]
fn test_update_round_resizes_slots() {
    let (_tmp, conn) = create_test_db().unwrap();
    let api = build_api(&conn);

    let (tid, round_id) = {
        let c = conn.lock().unwrap();
        let tid = seed_tournament(&c);
        (tid, seed_round(&c, tid, "新轮次", 4, 100, None))
    };
    let _ = tid;

    // 缩容 4 -> 2
    api.update_round(round_id, &update_request_from(2, None)).unwrap();
    {
        let c = conn.lock().unwrap();
        assert_eq!(
            RoundParticipantRepository::list_by_round_tx(&c, round_id).unwrap().len(),
            2
        );
        assert_eq!(
            RoundScoreRepository::list_by_round_tx(&c, round_id).unwrap().len(),
            2
        );
    }

    // 扩容 2 -> 5
    api.update_round(round_id, &update_request_from(5, None)).unwrap();
    let c = conn.lock().unwrap();
    let participants = RoundParticipantRepository::list_by_round_tx(&c, round_id).unwrap();
    assert_eq!(participants.len(), 5);
    let slots: Vec<i32> = participants.iter().map(|p| p.slot).collect();
    assert_eq!(slots, vec![1, 2, 3, 4, 5]);
}

#[test]
fn test_default_score_propagates_to_draft_round_only() {
    let (_tmp, conn) = create_test_db().unwrap();
    let api = build_api(&conn);

    let (round_draft, round_live) = {
        let c = conn.lock().unwrap();
        let tid = seed_tournament(&c);
        let round_draft = seed_round(&c, tid, "新轮次", 2, 100, None);
        let round_live = seed_round(&c, tid, "新轮次", 2, 100, None);
        set_round_status(&c, round_live, RoundStatus::Live);
        set_score(&c, round_live, 1, 140);
        (round_draft, round_live)
    };

    // draft: 初始分变化铺到得分行
    api.update_round(round_draft, &update_request_from(2, Some(200))).unwrap();
    {
        let c = conn.lock().unwrap();
        let scores = RoundScoreRepository::list_by_round_tx(&c, round_draft).unwrap();
        assert!(scores.iter().all(|s| s.score == 200));
    }

    // live: 只改配置, 比赛中的得分不动
    let mut live_update = update_request_from(2, Some(200));
    live_update.status = "live".to_string();
    api.update_round(round_live, &live_update).unwrap();
    let c = conn.lock().unwrap();
    let scores = RoundScoreRepository::list_by_round_tx(&c, round_live).unwrap();
    assert_eq!(scores.iter().find(|s| s.slot == 1).unwrap().score, 140);
}

#[test]
fn test_update_participants_marks_completed_round_stale() {
    let (_tmp, conn) = create_test_db().unwrap();
    let api = build_api(&conn);

    let (round_id, alpha) = {
        let c = conn.lock().unwrap();
        let tid = seed_tournament(&c);
        let alpha = seed_team(&c, "Alpha");
        let round_id = seed_round(&c, tid, "新轮次", 2, 100, None);
        complete_round_with_entries(&c, round_id, &[(1, None, 100), (2, None, 100)]);
        (round_id, alpha)
    };

    api.update_participants(
        round_id,
        &[ParticipantAssignment {
            slot: 1,
            team_id: Some(alpha),
        }],
    )
    .unwrap();

    let c = conn.lock().unwrap();
    let participant = RoundParticipantRepository::find_by_slot_tx(&c, round_id, 1)
        .unwrap()
        .unwrap();
    assert_eq!(participant.team_id, Some(alpha));
    assert_eq!(participant.assignment_mode, AssignmentMode::Manual);
    assert!(participant.assignment_source_type.is_none());

    // 已定榜轮次被人工改席位: 榜单失效
    let result = RoundResultRepository::find_by_round_tx(&c, round_id)
        .unwrap()
        .unwrap();
    assert!(result.is_stale);
}

#[test]
fn test_update_participants_rejects_unknown_team() {
    let (_tmp, conn) = create_test_db().unwrap();
    let api = build_api(&conn);

    let round_id = {
        let c = conn.lock().unwrap();
        let tid = seed_tournament(&c);
        seed_round(&c, tid, "新轮次", 2, 100, None)
    };

    let err = api
        .update_participants(
            round_id,
            &[ParticipantAssignment {
                slot: 1,
                team_id: Some(999),
            }],
        )
        .unwrap_err();
    assert!(err.to_string().contains("队伍不存在"));
}

#[test]
fn test_update_group_requires_same_tournament() {
    let (_tmp, conn) = create_test_db().unwrap();
    let api = build_api(&conn);

    let (round_id, own_group, foreign_group) = {
        let c = conn.lock().unwrap();
        let tid = seed_tournament(&c);
        let other_tid = seed_tournament(&c);
        let own_group = seed_group(&c, tid, "A组");
        let foreign_group = seed_group(&c, other_tid, "X组");
        let round_id = seed_round(&c, tid, "新轮次", 2, 100, None);
        (round_id, own_group, foreign_group)
    };

    // 别的赛事的分组: 拒绝
    assert!(api.update_group(round_id, Some(foreign_group)).is_err());

    // 本赛事分组 / 解除编组: 允许
    api.update_group(round_id, Some(own_group)).unwrap();
    {
        let c = conn.lock().unwrap();
        let round = RoundRepository::find_by_id_tx(&c, round_id).unwrap().unwrap();
        assert_eq!(round.group_id, Some(own_group));
    }
    api.update_group(round_id, None).unwrap();
    let c = conn.lock().unwrap();
    let round = RoundRepository::find_by_id_tx(&c, round_id).unwrap().unwrap();
    assert_eq!(round.group_id, None);
}

#[test]
fn test_fever_phase_requires_flag() {
    let (_tmp, conn) = create_test_db().unwrap();
    let api = build_api(&conn);

    let round_id = {
        let c = conn.lock().unwrap();
        let tid = seed_tournament(&c);
        seed_round(&c, tid, "新轮次", 2, 100, None)
    };

    // 未开启 fever 却要求 fever 阶段: 退回普通抢答
    let mut request = update_request_from(2, None);
    request.status = "live".to_string();
    request.phase = "buzzer_fever".to_string();
    api.update_round(round_id, &request).unwrap();

    let c = conn.lock().unwrap();
    let round = RoundRepository::find_by_id_tx(&c, round_id).unwrap().unwrap();
    assert_eq!(
        round.phase,
        tournament_ams::domain::types::RoundPhase::BuzzerNormal
    );
    // ultimate 蕴含 fever 的归一化在创建端同样生效
    assert!(!round.has_fever);
}
