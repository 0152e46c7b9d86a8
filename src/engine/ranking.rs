// ==========================================
// 赛事晋级管理系统 - 排名引擎
// ==========================================
// 职责: 把定榜条目/分组累计得分算成密集名次 (1..K, 无空档)
// 输入: 定榜条目 或 分组内各轮的条目/席位/得分
// 输出: 有序 RankedEntry 列表 (rank = 下标 + 1, 顺序即结构保证)
// ==========================================

use crate::domain::round::{ResultEntryDraft, RoundParticipant, RoundResultEntry, RoundScore};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// 无队伍席位的同分垫底键: 保证空席位在平分时永远排在有队伍的条目之后
const UNASSIGNED_TIE_BASE: i64 = 1_000_000;

// ==========================================
// RankedEntry - 排名条目
// ==========================================
// 轮次排名带席位号; 分组总榜没有席位概念, slot 为 None
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RankedEntry {
    /// 名次 (1-based, 密集无空档)
    pub rank: i32,
    pub team_id: Option<i64>,
    pub slot: Option<i32>,
    pub score: i32,
}

// ==========================================
// RoundStanding - 分组总榜的单轮输入
// ==========================================
// 有定榜条目时用条目, 否则用 实时得分 x 席位 组合
#[derive(Debug, Clone)]
pub struct RoundStanding {
    pub result_entries: Vec<RoundResultEntry>,
    pub participants: Vec<RoundParticipant>,
    pub scores: Vec<RoundScore>,
}

// ==========================================
// RankingEngine - 排名引擎
// ==========================================
pub struct RankingEngine {
    // 无状态引擎,不需要注入依赖
}

impl RankingEngine {
    pub fn new() -> Self {
        Self {}
    }

    // ==========================================
    // 核心方法
    // ==========================================

    /// 单轮排名: 来自定榜条目
    ///
    /// - 条目为空 -> 空排名 (未定榜的轮次不可排名)
    /// - 任一条目带人工名次 -> 按 (rank, slot) 排序
    /// - 否则按得分降序推导, 平分时 team_id 升序,
    ///   无队伍条目用 1_000_000 + slot 垫底
    pub fn rank_round(&self, entries: &[RoundResultEntry]) -> Vec<RankedEntry> {
        if entries.is_empty() {
            return Vec::new();
        }

        let has_rank = entries.iter().any(|e| e.rank.is_some());

        let mut ordered: Vec<&RoundResultEntry> = entries.iter().collect();
        if has_rank {
            ordered.sort_by_key(|e| (e.rank.unwrap_or(999_999), e.slot));
        } else {
            ordered.sort_by(|a, b| {
                b.score
                    .cmp(&a.score)
                    .then_with(|| Self::tie_key(a.team_id, a.slot).cmp(&Self::tie_key(b.team_id, b.slot)))
            });
        }

        ordered
            .iter()
            .enumerate()
            .map(|(index, e)| RankedEntry {
                rank: index as i32 + 1,
                team_id: e.team_id,
                slot: Some(e.slot),
                score: e.score,
            })
            .collect()
    }

    /// 分组总榜: 组内每轮得分按队伍累加
    ///
    /// 调用方负责保证组内所有轮次已定榜完成 (分组只在全部完成后排名);
    /// 没有坐进席位的队伍 (team_id 为空) 不参与总榜
    pub fn rank_group(&self, rounds: &[RoundStanding]) -> Vec<RankedEntry> {
        // BTreeMap 保证累加顺序与遍历顺序稳定
        let mut totals: BTreeMap<i64, i32> = BTreeMap::new();

        for round in rounds {
            if !round.result_entries.is_empty() {
                for entry in &round.result_entries {
                    if let Some(team_id) = entry.team_id {
                        *totals.entry(team_id).or_insert(0) += entry.score;
                    }
                }
                continue;
            }

            let score_by_slot: BTreeMap<i32, i32> =
                round.scores.iter().map(|s| (s.slot, s.score)).collect();
            for participant in &round.participants {
                if let Some(team_id) = participant.team_id {
                    let score = score_by_slot.get(&participant.slot).copied().unwrap_or(0);
                    *totals.entry(team_id).or_insert(0) += score;
                }
            }
        }

        let mut ordered: Vec<(i64, i32)> = totals.into_iter().collect();
        ordered.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));

        ordered
            .iter()
            .enumerate()
            .map(|(index, (team_id, score))| RankedEntry {
                rank: index as i32 + 1,
                team_id: Some(*team_id),
                slot: None,
                score: *score,
            })
            .collect()
    }

    /// 定榜时的名次推导: 没有任何人工名次时, 按标准裁决序补密集名次
    ///
    /// 有任一人工名次则视为人工定榜, 原样保留 (含 None)
    pub fn assign_derived_ranks(&self, entries: &mut [ResultEntryDraft]) {
        if entries.iter().any(|e| e.rank.is_some()) {
            return;
        }

        let mut order: Vec<usize> = (0..entries.len()).collect();
        order.sort_by(|&a, &b| {
            entries[b]
                .score
                .cmp(&entries[a].score)
                .then_with(|| {
                    Self::tie_key(entries[a].team_id, entries[a].slot)
                        .cmp(&Self::tie_key(entries[b].team_id, entries[b].slot))
                })
        });

        for (position, index) in order.iter().enumerate() {
            entries[*index].rank = Some(position as i32 + 1);
        }
    }

    /// 平分裁决键: 有队伍按 team_id, 空席位垫底
    fn tie_key(team_id: Option<i64>, slot: i32) -> i64 {
        team_id.unwrap_or(UNASSIGNED_TIE_BASE + slot as i64)
    }
}

impl Default for RankingEngine {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::types::AssignmentMode;

    fn entry(slot: i32, team_id: Option<i64>, score: i32, rank: Option<i32>) -> RoundResultEntry {
        RoundResultEntry {
            id: slot as i64,
            result_id: 1,
            slot,
            team_id,
            display_name_snapshot: format!("Team {}", slot),
            score,
            rank,
        }
    }

    fn participant(slot: i32, team_id: Option<i64>) -> RoundParticipant {
        RoundParticipant {
            id: slot as i64,
            round_id: 1,
            slot,
            team_id,
            display_name_snapshot: None,
            icon_snapshot_path: None,
            assignment_mode: AssignmentMode::Manual,
            assignment_source_type: None,
            assignment_source_id: None,
            assignment_source_rank: None,
            assignment_reason: None,
            assignment_updated_at: None,
        }
    }

    fn score(slot: i32, value: i32) -> RoundScore {
        RoundScore {
            id: slot as i64,
            round_id: 1,
            slot,
            score: value,
        }
    }

    #[test]
    fn test_rank_round_empty() {
        let engine = RankingEngine::new();
        assert!(engine.rank_round(&[]).is_empty());
    }

    #[test]
    fn test_rank_round_dense_no_gaps() {
        let engine = RankingEngine::new();
        let rankings = engine.rank_round(&[
            entry(1, Some(2), 90, None),
            entry(2, Some(5), 70, None),
            entry(3, Some(9), 40, None),
        ]);
        let ranks: Vec<i32> = rankings.iter().map(|r| r.rank).collect();
        assert_eq!(ranks, vec![1, 2, 3]);
    }

    #[test]
    fn test_rank_round_tie_break_by_team_id() {
        // 同分: team 2 必须排在 team 5 前面
        let engine = RankingEngine::new();
        let rankings = engine.rank_round(&[
            entry(1, Some(5), 90, None),
            entry(2, Some(2), 90, None),
        ]);
        assert_eq!(rankings[0].team_id, Some(2));
        assert_eq!(rankings[1].team_id, Some(5));
    }

    #[test]
    fn test_rank_round_unassigned_loses_tie() {
        // 同分的空席位永远排在有队伍的条目后面
        let engine = RankingEngine::new();
        let rankings = engine.rank_round(&[
            entry(1, None, 90, None),
            entry(2, Some(7), 90, None),
        ]);
        assert_eq!(rankings[0].team_id, Some(7));
        assert_eq!(rankings[1].team_id, None);
    }

    #[test]
    fn test_rank_round_explicit_rank_wins() {
        // 人工名次优先于得分
        let engine = RankingEngine::new();
        let rankings = engine.rank_round(&[
            entry(1, Some(2), 90, Some(2)),
            entry(2, Some(5), 40, Some(1)),
        ]);
        assert_eq!(rankings[0].team_id, Some(5));
        assert_eq!(rankings[0].rank, 1);
        assert_eq!(rankings[1].team_id, Some(2));
    }

    #[test]
    fn test_rank_round_spec_scenario() {
        // slot1 team2 90 / slot2 team5 90 / slot3 空 40
        let engine = RankingEngine::new();
        let rankings = engine.rank_round(&[
            entry(1, Some(2), 90, None),
            entry(2, Some(5), 90, None),
            entry(3, None, 40, None),
        ]);
        assert_eq!(rankings[0], RankedEntry { rank: 1, team_id: Some(2), slot: Some(1), score: 90 });
        assert_eq!(rankings[1], RankedEntry { rank: 2, team_id: Some(5), slot: Some(2), score: 90 });
        assert_eq!(rankings[2], RankedEntry { rank: 3, team_id: None, slot: Some(3), score: 40 });
    }

    #[test]
    fn test_rank_group_sums_across_rounds() {
        let engine = RankingEngine::new();
        let rounds = vec![
            // 第一轮有定榜: 用条目
            RoundStanding {
                result_entries: vec![entry(1, Some(2), 60, None), entry(2, Some(5), 80, None)],
                participants: vec![],
                scores: vec![],
            },
            // 第二轮无定榜: 用席位 x 得分
            RoundStanding {
                result_entries: vec![],
                participants: vec![participant(1, Some(2)), participant(2, Some(5)), participant(3, None)],
                scores: vec![score(1, 50), score(2, 10), score(3, 99)],
            },
        ];

        let rankings = engine.rank_group(&rounds);
        // team2: 60+50=110, team5: 80+10=90; 空席位的 99 分不计入
        assert_eq!(rankings.len(), 2);
        assert_eq!(rankings[0], RankedEntry { rank: 1, team_id: Some(2), slot: None, score: 110 });
        assert_eq!(rankings[1], RankedEntry { rank: 2, team_id: Some(5), slot: None, score: 90 });
    }

    #[test]
    fn test_assign_derived_ranks_respects_manual() {
        let engine = RankingEngine::new();

        let mut drafts = vec![
            ResultEntryDraft { slot: 1, team_id: Some(5), display_name_snapshot: "A".into(), score: 90, rank: None },
            ResultEntryDraft { slot: 2, team_id: Some(2), display_name_snapshot: "B".into(), score: 90, rank: None },
            ResultEntryDraft { slot: 3, team_id: None, display_name_snapshot: "C".into(), score: 40, rank: None },
        ];
        engine.assign_derived_ranks(&mut drafts);
        // 平分: team2 压过 team5
        assert_eq!(drafts[0].rank, Some(2));
        assert_eq!(drafts[1].rank, Some(1));
        assert_eq!(drafts[2].rank, Some(3));

        // 有人工名次时完全不动
        let mut manual = vec![
            ResultEntryDraft { slot: 1, team_id: Some(5), display_name_snapshot: "A".into(), score: 90, rank: Some(2) },
            ResultEntryDraft { slot: 2, team_id: Some(2), display_name_snapshot: "B".into(), score: 10, rank: None },
        ];
        engine.assign_derived_ranks(&mut manual);
        assert_eq!(manual[0].rank, Some(2));
        assert_eq!(manual[1].rank, None);
    }

    #[test]
    fn test_rank_group_tie_break_by_team_id() {
        let engine = RankingEngine::new();
        let rounds = vec![RoundStanding {
            result_entries: vec![entry(1, Some(9), 70, None), entry(2, Some(3), 70, None)],
            participants: vec![],
            scores: vec![],
        }];
        let rankings = engine.rank_group(&rounds);
        assert_eq!(rankings[0].team_id, Some(3));
        assert_eq!(rankings[1].team_id, Some(9));
    }
}
