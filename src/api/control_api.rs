// ==========================================
// 赛事晋级管理系统 - 赛务控制 API
// ==========================================
// 职责: 校验控制台请求, 委托 RoundControlEngine 执行,
//       把引擎结果翻译成面向赛务人员的消息
// ==========================================

use crate::api::error::{ApiError, ApiResult};
use crate::domain::round::ResultOverride;
use crate::engine::advancement::AdvancementSummary;
use crate::engine::control::{ControlCommand, RoundControlEngine};
use std::sync::Arc;

// ==========================================
// ControlActionRequest - 控制台请求
// ==========================================
#[derive(Debug, Clone)]
pub struct ControlActionRequest {
    /// start_competition | end_competition | to_buzzer | add_score | undo | clear
    pub action: String,
    pub slot: Option<i32>,
    pub delta: Option<i32>,
    /// end_competition 时的人工覆盖条目
    pub results: Option<Vec<ResultOverride>>,
}

// ==========================================
// OverwriteResultRequest - 改榜请求
// ==========================================
#[derive(Debug, Clone)]
pub struct OverwriteResultRequest {
    pub results: Vec<ResultOverride>,
    pub force_apply: bool,
}

// ==========================================
// ControlApi
// ==========================================
pub struct ControlApi {
    control_engine: Arc<RoundControlEngine>,
}

impl ControlApi {
    pub fn new(control_engine: Arc<RoundControlEngine>) -> Self {
        Self { control_engine }
    }

    /// 执行控制台动作, 返回提示消息
    pub fn action(
        &self,
        round_id: i64,
        request: &ControlActionRequest,
        actor: Option<&str>,
    ) -> ApiResult<String> {
        let command = Self::parse_command(request)?;
        let outcome = self.control_engine.execute(round_id, &command, actor)?;

        tracing::info!(
            "控制台动作完成: round_id={}, action={}, actor={:?}",
            round_id,
            request.action,
            actor
        );

        Ok(outcome.message)
    }

    /// 管理员改写定榜结果, 返回晋级传播汇总
    pub fn overwrite_result(
        &self,
        round_id: i64,
        request: &OverwriteResultRequest,
        actor: Option<&str>,
    ) -> ApiResult<AdvancementSummary> {
        if request.results.is_empty() {
            return Err(ApiError::InvalidInput(
                "改榜必须提供至少一条结果".to_string(),
            ));
        }
        for item in &request.results {
            if item.slot < 1 {
                return Err(ApiError::InvalidInput(format!("非法席位号: {}", item.slot)));
            }
            match item.score {
                Some(score) if score >= 0 => {}
                Some(score) => {
                    return Err(ApiError::InvalidInput(format!("得分不可为负: {}", score)));
                }
                None => {
                    return Err(ApiError::InvalidInput(format!(
                        "席位 {} 缺少得分",
                        item.slot
                    )));
                }
            }
            if let Some(rank) = item.rank {
                if rank < 1 {
                    return Err(ApiError::InvalidInput(format!("非法名次: {}", rank)));
                }
            }
        }

        let summary = self.control_engine.overwrite_result(
            round_id,
            &request.results,
            request.force_apply,
            actor,
        )?;

        tracing::info!(
            "改榜完成: round_id={}, force_apply={}, {}",
            round_id,
            request.force_apply,
            summary.format_message()
        );

        Ok(summary)
    }

    /// 把改榜汇总拼成提示消息 (与 end_competition 口径一致)
    pub fn format_overwrite_message(summary: &AdvancementSummary) -> String {
        format!(
            "Round result overwritten. Advancement: {}.",
            summary.format_message()
        )
    }

    // ==========================================
    // 请求解析
    // ==========================================

    fn parse_command(request: &ControlActionRequest) -> ApiResult<ControlCommand> {
        match request.action.as_str() {
            "start_competition" => Ok(ControlCommand::StartCompetition),
            "end_competition" => {
                if let Some(results) = &request.results {
                    for item in results {
                        if item.slot < 1 {
                            return Err(ApiError::InvalidInput(format!(
                                "非法席位号: {}",
                                item.slot
                            )));
                        }
                        if matches!(item.score, Some(s) if s < 0) {
                            return Err(ApiError::InvalidInput("得分不可为负".to_string()));
                        }
                        if matches!(item.rank, Some(r) if r < 1) {
                            return Err(ApiError::InvalidInput("非法名次".to_string()));
                        }
                    }
                }
                Ok(ControlCommand::EndCompetition {
                    results: request.results.clone(),
                })
            }
            "to_buzzer" => Ok(ControlCommand::ToBuzzer),
            "add_score" => {
                let slot = request
                    .slot
                    .ok_or_else(|| ApiError::InvalidInput("add_score 缺少席位号".to_string()))?;
                if slot < 1 {
                    return Err(ApiError::InvalidInput(format!("非法席位号: {}", slot)));
                }
                let delta = request
                    .delta
                    .ok_or_else(|| ApiError::InvalidInput("add_score 缺少分差".to_string()))?;
                Ok(ControlCommand::AddScore { slot, delta })
            }
            "undo" => Ok(ControlCommand::Undo),
            "clear" => Ok(ControlCommand::Clear),
            other => Err(ApiError::InvalidInput(format!("未知控制动作: {}", other))),
        }
    }
}
