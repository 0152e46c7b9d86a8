// ==========================================
// 赛事晋级管理系统 - 晋级传播引擎
// ==========================================
// 职责: 轮次定榜/改榜后, 计算排名 -> 按序评估晋级规则 ->
//       写目标席位与得分基线 -> 级联到受影响的轮次/分组 -> 全程落审计日志
// 红线: 整个传播在调用方的同一事务内完成, 要么全部落库要么全部回滚
// 红线: 每条规则评估必须落一条日志, 预期内的不满足是结果不是错误
// ==========================================

use crate::domain::advancement_log::{AdvanceStatus, AdvancementLogEntry, LogSourceType};
use crate::domain::round::Round;
use crate::domain::rule::AdvancementRule;
use crate::domain::tournament::Team;
use crate::domain::types::{AssignmentMode, AssignmentReason, RoundStatus, RuleAction, SourceType};
use crate::engine::ranking::{RankedEntry, RankingEngine, RoundStanding};
use crate::repository::advancement_log_repo::AdvancementLogRepository;
use crate::repository::error::{RepositoryError, RepositoryResult};
use crate::repository::round_repo::{
    RoundParticipantRepository, RoundRepository, RoundResultRepository, RoundScoreRepository,
};
use crate::repository::rule_repo::AdvancementRuleRepository;
use crate::repository::tournament_repo::TeamRepository;
use rusqlite::{Connection, TransactionBehavior};
use serde_json::{json, Value as JsonValue};
use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::{Arc, Mutex};

// ==========================================
// AdvancementSummary - 一次传播的汇总结果
// ==========================================
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AdvancementSummary {
    pub applied: u32,
    pub blocked_manual: u32,
    pub skipped: u32,
    pub eliminated: u32,
    pub stale_marked: u32,
    /// 席位占用实际发生变化的轮次 (去重)
    pub changed_round_ids: Vec<i64>,
}

impl AdvancementSummary {
    pub fn new() -> Self {
        Self::default()
    }

    /// 合并子结果 (计数累加, changed 去重)
    pub fn merge(&mut self, other: &AdvancementSummary) {
        self.applied += other.applied;
        self.blocked_manual += other.blocked_manual;
        self.skipped += other.skipped;
        self.eliminated += other.eliminated;
        self.stale_marked += other.stale_marked;
        for id in &other.changed_round_ids {
            self.push_changed(*id);
        }
    }

    pub fn push_changed(&mut self, round_id: i64) {
        if !self.changed_round_ids.contains(&round_id) {
            self.changed_round_ids.push(round_id);
        }
    }

    /// 面向赛务人员的汇总文案
    pub fn format_message(&self) -> String {
        format!(
            "{} applied, {} blocked, {} skipped, {} eliminated, {} stale marked",
            self.applied, self.blocked_manual, self.skipped, self.eliminated, self.stale_marked
        )
    }
}

// ==========================================
// WorkItem - 传播队列节点
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum WorkItem {
    Round(i64),
    Group(i64),
}

impl WorkItem {
    /// visited 集合键; 同一节点每次传播最多处理一次 (环路在此断开)
    fn key(&self) -> String {
        match self {
            WorkItem::Round(id) => format!("round:{}", id),
            WorkItem::Group(id) => format!("group:{}", id),
        }
    }
}

// ==========================================
// RuleContext - 单来源规则评估上下文
// ==========================================
struct RuleContext<'a> {
    tournament_id: i64,
    source_type: SourceType,
    source_round_id: Option<i64>,
    source_group_id: Option<i64>,
    actor: Option<&'a str>,
    due_to_override: bool,
    force_apply: bool,
}

impl<'a> RuleContext<'a> {
    fn source_id(&self) -> i64 {
        match self.source_type {
            SourceType::Round => self.source_round_id.unwrap_or(0),
            SourceType::Group => self.source_group_id.unwrap_or(0),
        }
    }

    fn log_source(&self) -> LogSourceType {
        match self.source_type {
            SourceType::Round => LogSourceType::Round,
            SourceType::Group => LogSourceType::Group,
        }
    }

    fn base_context(&self) -> JsonValue {
        json!({
            "due_to_override": self.due_to_override,
            "force_apply": self.force_apply,
        })
    }

    /// 日志条目骨架, 调用处按需覆盖 target/before/after/context
    fn entry(
        &self,
        rule: &AdvancementRule,
        status: AdvanceStatus,
        message: String,
    ) -> AdvancementLogEntry {
        AdvancementLogEntry {
            tournament_id: self.tournament_id,
            rule_id: Some(rule.id),
            actor: self.actor.map(str::to_string),
            source_type: self.log_source(),
            source_round_id: self.source_round_id,
            source_group_id: self.source_group_id,
            target_round_id: None,
            target_slot: None,
            team_id_before: None,
            team_id_after: None,
            status,
            message,
            context: self.base_context(),
        }
    }
}

// ==========================================
// AdvancementEngine - 晋级传播引擎
// ==========================================
pub struct AdvancementEngine {
    conn: Arc<Mutex<Connection>>,
}

impl AdvancementEngine {
    pub fn new(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    fn get_conn(&self) -> RepositoryResult<std::sync::MutexGuard<Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    // ==========================================
    // 顶层入口
    // ==========================================

    /// 独立触发一次传播 (自带事务)
    ///
    /// 赛务控制/改榜流程已持有事务时直接用 [`Self::recompute_in_tx`],
    /// 不要在事务里再调本方法 (连接互斥锁不可重入)
    pub fn recompute_from_round(
        &self,
        round_id: i64,
        actor: Option<&str>,
        due_to_override: bool,
        force_apply: bool,
    ) -> RepositoryResult<AdvancementSummary> {
        let mut conn = self.get_conn()?;
        // IMMEDIATE: 先抢写锁再读, 等价于"锁行后改行"的悲观并发
        let tx = conn
            .transaction_with_behavior(TransactionBehavior::Immediate)
            .map_err(|e| RepositoryError::DatabaseTransactionError(e.to_string()))?;

        let summary = Self::recompute_in_tx(&tx, round_id, actor, due_to_override, force_apply)?;

        tx.commit()
            .map_err(|e| RepositoryError::DatabaseTransactionError(e.to_string()))?;
        Ok(summary)
    }

    /// 在调用方事务内执行完整传播
    ///
    /// 广度优先遍历: 触发轮次 (及其分组) 入队, 每处理一个节点把它
    /// 改变过席位的轮次/分组再入队; visited 集合保证终止
    pub fn recompute_in_tx(
        conn: &Connection,
        round_id: i64,
        actor: Option<&str>,
        due_to_override: bool,
        force_apply: bool,
    ) -> RepositoryResult<AdvancementSummary> {
        let round = RoundRepository::find_by_id_tx(conn, round_id)?.ok_or_else(|| {
            RepositoryError::NotFound {
                entity: "Round".to_string(),
                id: round_id.to_string(),
            }
        })?;

        let mut summary = AdvancementSummary::new();
        let mut queue: VecDeque<WorkItem> = VecDeque::new();
        let mut visited: HashSet<String> = HashSet::new();

        queue.push_back(WorkItem::Round(round.id));
        if let Some(group_id) = round.group_id {
            queue.push_back(WorkItem::Group(group_id));
        }

        while let Some(item) = queue.pop_front() {
            if !visited.insert(item.key()) {
                continue;
            }

            match item {
                WorkItem::Round(id) => {
                    Self::process_round_node(
                        conn,
                        id,
                        actor,
                        due_to_override,
                        force_apply,
                        &mut queue,
                        &mut summary,
                    )?;
                }
                WorkItem::Group(id) => {
                    Self::process_group_node(
                        conn,
                        id,
                        actor,
                        due_to_override,
                        force_apply,
                        &mut queue,
                        &mut summary,
                    )?;
                }
            }
        }

        tracing::info!(
            "晋级传播完成: 起点轮次={}, applied={}, blocked={}, skipped={}, eliminated={}, stale={}, changed={:?}",
            round_id,
            summary.applied,
            summary.blocked_manual,
            summary.skipped,
            summary.eliminated,
            summary.stale_marked,
            summary.changed_round_ids
        );

        Ok(summary)
    }

    // ==========================================
    // 节点处理
    // ==========================================

    /// 处理轮次节点: 只有已定榜完成的轮次才会向外晋级
    fn process_round_node(
        conn: &Connection,
        round_id: i64,
        actor: Option<&str>,
        due_to_override: bool,
        force_apply: bool,
        queue: &mut VecDeque<WorkItem>,
        summary: &mut AdvancementSummary,
    ) -> RepositoryResult<()> {
        let source_round = match RoundRepository::find_by_id_tx(conn, round_id)? {
            Some(r) if r.status == RoundStatus::Completed => r,
            _ => return Ok(()),
        };
        let result = match RoundResultRepository::find_by_round_tx(conn, source_round.id)? {
            Some(r) => r,
            None => return Ok(()),
        };

        let entries = RoundResultRepository::list_entries_tx(conn, result.id)?;
        let rankings = RankingEngine::new().rank_round(&entries);
        if rankings.is_empty() {
            return Ok(());
        }

        let rules = AdvancementRuleRepository::list_active_by_source_tx(
            conn,
            source_round.tournament_id,
            SourceType::Round,
            source_round.id,
        )?;

        let ctx = RuleContext {
            tournament_id: source_round.tournament_id,
            source_type: SourceType::Round,
            source_round_id: Some(source_round.id),
            source_group_id: None,
            actor,
            due_to_override,
            force_apply,
        };

        let node_summary = Self::apply_rules(conn, &ctx, &rules, &rankings)?;
        Self::absorb_node_result(conn, &ctx, node_summary, queue, summary)
    }

    /// 处理分组节点: 组内所有轮次完成后才按总榜晋级
    fn process_group_node(
        conn: &Connection,
        group_id: i64,
        actor: Option<&str>,
        due_to_override: bool,
        force_apply: bool,
        queue: &mut VecDeque<WorkItem>,
        summary: &mut AdvancementSummary,
    ) -> RepositoryResult<()> {
        let group = match crate::repository::tournament_repo::GroupRepository::find_by_id_tx(
            conn, group_id,
        )? {
            Some(g) => g,
            None => return Ok(()),
        };

        let rounds = RoundRepository::list_by_group_tx(conn, group.id)?;
        if rounds.is_empty() || rounds.iter().any(|r| r.status != RoundStatus::Completed) {
            return Ok(());
        }

        let mut standings = Vec::with_capacity(rounds.len());
        for round in &rounds {
            let result_entries = match RoundResultRepository::find_by_round_tx(conn, round.id)? {
                Some(result) => RoundResultRepository::list_entries_tx(conn, result.id)?,
                None => Vec::new(),
            };
            standings.push(RoundStanding {
                result_entries,
                participants: RoundParticipantRepository::list_by_round_tx(conn, round.id)?,
                scores: RoundScoreRepository::list_by_round_tx(conn, round.id)?,
            });
        }

        let rankings = RankingEngine::new().rank_group(&standings);
        if rankings.is_empty() {
            return Ok(());
        }

        let rules = AdvancementRuleRepository::list_active_by_source_tx(
            conn,
            group.tournament_id,
            SourceType::Group,
            group.id,
        )?;

        let ctx = RuleContext {
            tournament_id: group.tournament_id,
            source_type: SourceType::Group,
            source_round_id: None,
            source_group_id: Some(group.id),
            actor,
            due_to_override,
            force_apply,
        };

        let node_summary = Self::apply_rules(conn, &ctx, &rules, &rankings)?;
        Self::absorb_node_result(conn, &ctx, node_summary, queue, summary)
    }

    /// 合并节点结果: 受影响轮次入队 + 已定榜的下游标记失效
    fn absorb_node_result(
        conn: &Connection,
        ctx: &RuleContext<'_>,
        node_summary: AdvancementSummary,
        queue: &mut VecDeque<WorkItem>,
        summary: &mut AdvancementSummary,
    ) -> RepositoryResult<()> {
        let changed_ids = node_summary.changed_round_ids.clone();
        summary.merge(&node_summary);

        for changed_id in changed_ids {
            queue.push_back(WorkItem::Round(changed_id));

            let changed_round = match RoundRepository::find_by_id_tx(conn, changed_id)? {
                Some(r) => r,
                None => continue,
            };
            if let Some(group_id) = changed_round.group_id {
                queue.push_back(WorkItem::Group(group_id));
            }

            // 已定榜且未失效的下游轮次: 上游席位变了, 榜单不再可信
            if changed_round.status != RoundStatus::Completed {
                continue;
            }
            let result = match RoundResultRepository::find_by_round_tx(conn, changed_round.id)? {
                Some(r) if !r.is_stale => r,
                _ => continue,
            };

            RoundResultRepository::mark_stale_tx(conn, result.id)?;
            AdvancementLogRepository::insert_tx(
                conn,
                &AdvancementLogEntry {
                    tournament_id: changed_round.tournament_id,
                    rule_id: None,
                    actor: ctx.actor.map(str::to_string),
                    source_type: LogSourceType::System,
                    source_round_id: ctx.source_round_id,
                    source_group_id: ctx.source_group_id,
                    target_round_id: Some(changed_round.id),
                    target_slot: None,
                    team_id_before: None,
                    team_id_after: None,
                    status: AdvanceStatus::StaleMarked,
                    message: match ctx.source_type {
                        SourceType::Round => {
                            "Completed round marked stale because upstream advancement changed participants."
                                .to_string()
                        }
                        SourceType::Group => {
                            "Completed round marked stale because upstream group advancement changed participants."
                                .to_string()
                        }
                    },
                    context: ctx.base_context(),
                },
            )?;
            summary.stale_marked += 1;
        }

        Ok(())
    }

    // ==========================================
    // 规则评估 (priority 升序, id 升序; SQL 已排好)
    // ==========================================

    fn apply_rules(
        conn: &Connection,
        ctx: &RuleContext<'_>,
        rules: &[AdvancementRule],
        rankings: &[RankedEntry],
    ) -> RepositoryResult<AdvancementSummary> {
        let mut summary = AdvancementSummary::new();
        let mut team_cache: HashMap<i64, Option<Team>> = HashMap::new();

        for rule in rules {
            let ranked: Option<&RankedEntry> = if rule.source_rank >= 1 {
                rankings.get((rule.source_rank - 1) as usize)
            } else {
                None
            };

            // 淘汰规则: 仅记录, 不改写任何轮次状态
            if rule.action_type == RuleAction::Eliminate {
                let message = if ranked.is_some() {
                    format!("Rank {} team eliminated by rule.", rule.source_rank)
                } else {
                    format!(
                        "No team at rank {}; eliminate rule had no effect.",
                        rule.source_rank
                    )
                };
                let mut entry = ctx.entry(rule, AdvanceStatus::Eliminated, message);
                entry.team_id_after = ranked.and_then(|r| r.team_id);
                AdvancementLogRepository::insert_tx(conn, &entry)?;
                summary.eliminated += 1;
                continue;
            }

            // 来源名次上没有队伍
            let ranked_team_id = match ranked.and_then(|r| r.team_id) {
                Some(team_id) => team_id,
                None => {
                    let mut entry = ctx.entry(
                        rule,
                        AdvanceStatus::Skipped,
                        format!("No eligible team at rank {}.", rule.source_rank),
                    );
                    entry.target_round_id = rule.target_round_id;
                    entry.target_slot = rule.target_slot;
                    AdvancementLogRepository::insert_tx(conn, &entry)?;
                    summary.skipped += 1;
                    continue;
                }
            };

            // 目标配置缺失
            let (target_round_id, target_slot) = match (rule.target_round_id, rule.target_slot) {
                (Some(r), Some(s)) => (r, s),
                _ => {
                    let mut entry = ctx.entry(
                        rule,
                        AdvanceStatus::Skipped,
                        "Advance rule missing target round or slot.".to_string(),
                    );
                    entry.team_id_after = Some(ranked_team_id);
                    AdvancementLogRepository::insert_tx(conn, &entry)?;
                    summary.skipped += 1;
                    continue;
                }
            };

            // 目标轮必须在同一赛事内
            let target_round =
                match RoundRepository::find_in_tournament_tx(conn, ctx.tournament_id, target_round_id)? {
                    Some(r) => r,
                    None => {
                        let mut entry = ctx.entry(
                            rule,
                            AdvanceStatus::Skipped,
                            "Target round not found in tournament.".to_string(),
                        );
                        entry.target_round_id = Some(target_round_id);
                        entry.target_slot = Some(target_slot);
                        entry.team_id_after = Some(ranked_team_id);
                        AdvancementLogRepository::insert_tx(conn, &entry)?;
                        summary.skipped += 1;
                        continue;
                    }
                };

            // 席位号越界
            if target_slot > target_round.teams_per_round {
                let mut entry = ctx.entry(
                    rule,
                    AdvanceStatus::Skipped,
                    "Target slot exceeds target round team slots.".to_string(),
                );
                entry.target_round_id = Some(target_round.id);
                entry.target_slot = Some(target_slot);
                entry.team_id_after = Some(ranked_team_id);
                AdvancementLogRepository::insert_tx(conn, &entry)?;
                summary.skipped += 1;
                continue;
            }

            // 目标席位行缺失则补建; 并发建行冲突由 find_or_create 捕获后重查
            let participant =
                RoundParticipantRepository::find_or_create_tx(conn, target_round.id, target_slot)?;
            let before_team_id = participant.team_id;

            // 人工锁定席位, 非强制不覆盖
            if participant.is_manual_locked() && !ctx.force_apply {
                let mut entry = ctx.entry(
                    rule,
                    AdvanceStatus::BlockedManual,
                    "Target slot is manually locked.".to_string(),
                );
                entry.target_round_id = Some(target_round.id);
                entry.target_slot = Some(target_slot);
                entry.team_id_before = before_team_id;
                entry.team_id_after = Some(ranked_team_id);
                AdvancementLogRepository::insert_tx(conn, &entry)?;
                summary.blocked_manual += 1;
                continue;
            }

            // 轮次规则优先于分组规则: 分组规则不覆盖轮次规则已写的席位
            if !ctx.force_apply
                && ctx.source_type == SourceType::Group
                && participant.assignment_mode == AssignmentMode::Auto
                && participant.assignment_source_type == Some(SourceType::Round)
                && participant.team_id.is_some()
            {
                let mut entry = ctx.entry(
                    rule,
                    AdvanceStatus::Skipped,
                    "Skipped because slot already auto-assigned by round-based rule (higher priority)."
                        .to_string(),
                );
                entry.target_round_id = Some(target_round.id);
                entry.target_slot = Some(target_slot);
                entry.team_id_before = participant.team_id;
                entry.team_id_after = Some(ranked_team_id);
                AdvancementLogRepository::insert_tx(conn, &entry)?;
                summary.skipped += 1;
                continue;
            }

            // 席位已是该队且为引擎写入: 重复触发视为无变化, 不重复 applied
            if participant.assignment_mode == AssignmentMode::Auto
                && participant.team_id == Some(ranked_team_id)
            {
                let mut entry = ctx.entry(
                    rule,
                    AdvanceStatus::Skipped,
                    "Target slot already occupied by the advancing team.".to_string(),
                );
                entry.target_round_id = Some(target_round.id);
                entry.target_slot = Some(target_slot);
                entry.team_id_before = before_team_id;
                entry.team_id_after = Some(ranked_team_id);
                AdvancementLogRepository::insert_tx(conn, &entry)?;
                summary.skipped += 1;
                continue;
            }

            // 队伍回查 (已删队伍不晋级), 同一队伍一次传播内只查一次
            let cached_team = match team_cache.get(&ranked_team_id) {
                Some(cached) => cached.clone(),
                None => {
                    let loaded = TeamRepository::find_active_by_id_tx(conn, ranked_team_id)?;
                    team_cache.insert(ranked_team_id, loaded.clone());
                    loaded
                }
            };
            let team = match cached_team {
                Some(t) => t,
                None => {
                    let mut entry = ctx.entry(
                        rule,
                        AdvanceStatus::Skipped,
                        "Ranked team no longer exists.".to_string(),
                    );
                    entry.target_round_id = Some(target_round.id);
                    entry.target_slot = Some(target_slot);
                    entry.team_id_before = before_team_id;
                    entry.team_id_after = Some(ranked_team_id);
                    AdvancementLogRepository::insert_tx(conn, &entry)?;
                    summary.skipped += 1;
                    continue;
                }
            };

            // 晋级写入: 队伍快照 + 分配来源, 与得分基线同事务成对生效
            let reason = if ctx.due_to_override {
                AssignmentReason::Override
            } else {
                AssignmentReason::RoundCompletion
            };
            let now = chrono::Utc::now().naive_utc();
            RoundParticipantRepository::apply_advancement_tx(
                conn,
                participant.id,
                &team,
                ctx.source_type,
                ctx.source_id(),
                rule.source_rank,
                reason,
                now,
            )?;

            let mut entry = ctx.entry(
                rule,
                AdvanceStatus::Applied,
                "Team advanced into target slot.".to_string(),
            );
            entry.target_round_id = Some(target_round.id);
            entry.target_slot = Some(target_slot);
            entry.team_id_before = before_team_id;
            entry.team_id_after = Some(team.id);
            entry.context = json!({
                "due_to_override": ctx.due_to_override,
                "force_apply": ctx.force_apply,
                "source_rank": rule.source_rank,
                "target_round_name": target_round.name,
            });
            AdvancementLogRepository::insert_tx(conn, &entry)?;
            summary.applied += 1;

            Self::apply_score_baseline(
                conn,
                ctx,
                rule,
                &target_round,
                target_slot,
                before_team_id,
                team.id,
            )?;

            if before_team_id != Some(team.id) {
                summary.push_changed(target_round.id);
            }
        }

        Ok(summary)
    }

    /// 得分基线处理 (晋级成功后的附属事件, 只落日志不进汇总计数)
    ///
    /// - 目标轮 draft: 席位得分重置为 default_score + bonus_score, 记 bonus_applied
    /// - 目标轮 live/completed: 比赛中/已定榜的得分不允许被晋级悄悄改写,
    ///   只换人不动分, 记 blocked_round_state
    #[allow(clippy::too_many_arguments)]
    fn apply_score_baseline(
        conn: &Connection,
        ctx: &RuleContext<'_>,
        rule: &AdvancementRule,
        target_round: &Round,
        target_slot: i32,
        before_team_id: Option<i64>,
        after_team_id: i64,
    ) -> RepositoryResult<()> {
        if target_round.status == RoundStatus::Draft {
            let baseline = target_round.default_score + rule.bonus_score;
            RoundScoreRepository::set_score_tx(conn, target_round.id, target_slot, baseline)?;

            let mut entry = ctx.entry(
                rule,
                AdvanceStatus::BonusApplied,
                format!(
                    "Slot score baseline set to {} (default {} + bonus {}).",
                    baseline, target_round.default_score, rule.bonus_score
                ),
            );
            entry.target_round_id = Some(target_round.id);
            entry.target_slot = Some(target_slot);
            entry.team_id_before = before_team_id;
            entry.team_id_after = Some(after_team_id);
            entry.context = json!({
                "due_to_override": ctx.due_to_override,
                "force_apply": ctx.force_apply,
                "default_score": target_round.default_score,
                "bonus_score": rule.bonus_score,
            });
            AdvancementLogRepository::insert_tx(conn, &entry)?;
        } else {
            let mut entry = ctx.entry(
                rule,
                AdvanceStatus::BlockedRoundState,
                format!(
                    "Target round is {}; score baseline left untouched.",
                    target_round.status
                ),
            );
            entry.target_round_id = Some(target_round.id);
            entry.target_slot = Some(target_slot);
            entry.team_id_before = before_team_id;
            entry.team_id_after = Some(after_team_id);
            entry.context = json!({
                "due_to_override": ctx.due_to_override,
                "force_apply": ctx.force_apply,
                "bonus_score": rule.bonus_score,
                "target_round_status": target_round.status.as_str(),
            });
            AdvancementLogRepository::insert_tx(conn, &entry)?;
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_summary_merge_dedups_changed_rounds() {
        let mut base = AdvancementSummary::new();
        base.applied = 1;
        base.push_changed(5);

        let mut delta = AdvancementSummary::new();
        delta.applied = 2;
        delta.skipped = 1;
        delta.push_changed(5);
        delta.push_changed(7);

        base.merge(&delta);
        assert_eq!(base.applied, 3);
        assert_eq!(base.skipped, 1);
        assert_eq!(base.changed_round_ids, vec![5, 7]);
    }

    #[test]
    fn test_summary_format_message() {
        let mut summary = AdvancementSummary::new();
        summary.applied = 3;
        summary.blocked_manual = 1;
        summary.eliminated = 1;
        summary.stale_marked = 2;
        assert_eq!(
            summary.format_message(),
            "3 applied, 1 blocked, 0 skipped, 1 eliminated, 2 stale marked"
        );
    }

    #[test]
    fn test_work_item_keys_distinguish_types() {
        // 轮次与分组同ID不能撞 visited 键
        assert_ne!(WorkItem::Round(3).key(), WorkItem::Group(3).key());
        assert_eq!(WorkItem::Round(3).key(), WorkItem::Round(3).key());
    }
}
