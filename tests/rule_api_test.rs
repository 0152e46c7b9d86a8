// ==========================================
// 晋级规则管理 API 集成测试
// ==========================================
// 覆盖: 来源一致性/目标必填/淘汰规则清空目标/跨赛事拒绝
// ==========================================


use std::sync::{Arc, Mutex};
use rusqlite::Connection;
use test_helpers::*;
use tournament_ams::api::{AdvancementRuleApi, CreateRuleRequest, UpdateRuleRequest};
use tournament_ams::domain::types::RuleAction;
use tournament_ams::repository::rule_repo::AdvancementRuleRepository;

fn build_api(conn: &Arc<Mutex<Connection>>) -> AdvancementRuleApi {
    AdvancementRuleApi::new(conn.clone())
}

fn base_request(tournament_id: i64, source_round_id: i64, target_round_id: i64) -> CreateRuleRequest {
    CreateRuleRequest {
        tournament_id,
        source_type: "round".to_string(),
        source_round_id: Some(source_round_id),
        source_group_id: None,
        source_rank: 1,
        action_type: "advance".to_string(),
        target_round_id: Some(target_round_id),
        target_slot: Some(1),
        bonus_score: Some(30),
        priority: Some(0),
        is_active: None,
        created_by: Some("admin".to_string()),
    }
}

#[test]
fn test_create_advance_rule() {
    let (_tmp, conn) = create_test_db().unwrap();
    let api = build_api(&conn);

    let (tid, source, target) = {
        let c = conn.lock().unwrap();
        let tid = seed_tournament(&c);
        let source = seed_round(&c, tid, "预赛", 2, 100, None);
        let target = seed_round(&c, tid, "决赛", 2, 120, None);
        (tid, source, target)
    };

    let rule_id = api.create_rule(&base_request(tid, source, target)).unwrap();

    let c = conn.lock().unwrap();
    let rule = AdvancementRuleRepository::find_by_id_tx(&c, rule_id)
        .unwrap()
        .unwrap();
    assert_eq!(rule.action_type, RuleAction::Advance);
    assert_eq!(rule.source_round_id, Some(source));
    assert_eq!(rule.target_round_id, Some(target));
    assert_eq!(rule.bonus_score, 30);
    assert!(rule.is_active);
}

#[test]
fn test_advance_rule_requires_target() {
    let (_tmp, conn) = create_test_db().unwrap();
    let api = build_api(&conn);

    let (tid, source, target) = {
        let c = conn.lock().unwrap();
        let tid = seed_tournament(&c);
        let source = seed_round(&c, tid, "预赛", 2, 100, None);
        let target = seed_round(&c, tid, "决赛", 2, 120, None);
        (tid, source, target)
    };

    let mut request = base_request(tid, source, target);
    request.target_round_id = None;
    let err = api.create_rule(&request).unwrap_err();
    assert!(err
        .to_string()
        .contains("Target round and slot are required for advance rules."));
}

#[test]
fn test_round_rule_requires_source_round() {
    let (_tmp, conn) = create_test_db().unwrap();
    let api = build_api(&conn);

    let (tid, source, target) = {
        let c = conn.lock().unwrap();
        let tid = seed_tournament(&c);
        let source = seed_round(&c, tid, "预赛", 2, 100, None);
        let target = seed_round(&c, tid, "决赛", 2, 120, None);
        (tid, source, target)
    };

    let mut request = base_request(tid, source, target);
    request.source_round_id = None;
    let err = api.create_rule(&request).unwrap_err();
    assert!(err
        .to_string()
        .contains("Source round is required for round-based rules."));
}

#[test]
fn test_eliminate_rule_forces_null_target_and_zero_bonus() {
    let (_tmp, conn) = create_test_db().unwrap();
    let api = build_api(&conn);

    let (tid, source, target) = {
        let c = conn.lock().unwrap();
        let tid = seed_tournament(&c);
        let source = seed_round(&c, tid, "预赛", 2, 100, None);
        let target = seed_round(&c, tid, "决赛", 2, 120, None);
        (tid, source, target)
    };

    // 提交了 target/bonus 的淘汰规则: 落库时全部清空
    let mut request = base_request(tid, source, target);
    request.action_type = "eliminate".to_string();
    let rule_id = api.create_rule(&request).unwrap();

    let c = conn.lock().unwrap();
    let rule = AdvancementRuleRepository::find_by_id_tx(&c, rule_id)
        .unwrap()
        .unwrap();
    assert_eq!(rule.action_type, RuleAction::Eliminate);
    assert_eq!(rule.target_round_id, None);
    assert_eq!(rule.target_slot, None);
    assert_eq!(rule.bonus_score, 0);
}

#[test]
fn test_update_to_eliminate_clears_target() {
    let (_tmp, conn) = create_test_db().unwrap();
    let api = build_api(&conn);

    let (tid, source, target) = {
        let c = conn.lock().unwrap();
        let tid = seed_tournament(&c);
        let source = seed_round(&c, tid, "预赛", 2, 100, None);
        let target = seed_round(&c, tid, "决赛", 2, 120, None);
        (tid, source, target)
    };

    let rule_id = api.create_rule(&base_request(tid, source, target)).unwrap();

    api.update_rule(
        rule_id,
        &UpdateRuleRequest {
            action_type: Some("eliminate".to_string()),
            ..Default::default()
        },
    )
    .unwrap();

    let c = conn.lock().unwrap();
    let rule = AdvancementRuleRepository::find_by_id_tx(&c, rule_id)
        .unwrap()
        .unwrap();
    assert_eq!(rule.action_type, RuleAction::Eliminate);
    assert_eq!(rule.target_round_id, None);
    assert_eq!(rule.bonus_score, 0);
}

#[test]
fn test_rejects_invalid_rank_and_priority() {
    let (_tmp, conn) = create_test_db().unwrap();
    let api = build_api(&conn);

    let (tid, source, target) = {
        let c = conn.lock().unwrap();
        let tid = seed_tournament(&c);
        let source = seed_round(&c, tid, "预赛", 2, 100, None);
        let target = seed_round(&c, tid, "决赛", 2, 120, None);
        (tid, source, target)
    };

    let mut request = base_request(tid, source, target);
    request.source_rank = 0;
    assert!(api.create_rule(&request).is_err());

    let mut request = base_request(tid, source, target);
    request.priority = Some(-1);
    assert!(api.create_rule(&request).is_err());
}

#[test]
fn test_rejects_cross_tournament_source_and_target() {
    let (_tmp, conn) = create_test_db().unwrap();
    let api = build_api(&conn);

    let (tid, source, foreign_round) = {
        let c = conn.lock().unwrap();
        let tid = seed_tournament(&c);
        let other_tid = seed_tournament(&c);
        let source = seed_round(&c, tid, "预赛", 2, 100, None);
        let foreign_round = seed_round(&c, other_tid, "别家决赛", 2, 120, None);
        (tid, source, foreign_round)
    };

    // 目标轮属于别的赛事
    let request = base_request(tid, source, foreign_round);
    assert!(api.create_rule(&request).is_err());

    // 来源轮属于别的赛事
    let request = base_request(tid, foreign_round, source);
    assert!(api.create_rule(&request).is_err());
}

#[test]
fn test_delete_rule() {
    let (_tmp, conn) = create_test_db().unwrap();
    let api = build_api(&conn);

    let (tid, source, target) = {
        let c = conn.lock().unwrap();
        let tid = seed_tournament(&c);
        let source = seed_round(&c, tid, "预赛", 2, 100, None);
        let target = seed_round(&c, tid, "决赛", 2, 120, None);
        (tid, source, target)
    };

    let rule_id = api.create_rule(&base_request(tid, source, target)).unwrap();
    api.delete_rule(rule_id).unwrap();

    {
        let c = conn.lock().unwrap();
        assert!(AdvancementRuleRepository::find_by_id_tx(&c, rule_id)
            .unwrap()
            .is_none());
    }

    // 已删除的规则再删一次: NotFound
    assert!(api.delete_rule(rule_id).is_err());
}
