// ==========================================
// 赛事晋级管理系统 - 引擎层事件发布
// ==========================================
// 职责: 定义轮次事件发布 trait，实现依赖倒置
// 说明: Engine 层定义 trait, 实时推送/看板刷新等下游自行实现适配器
// 约定: 事件在事务提交后发布, 发布失败只告警, 不影响已提交的业务结果
// ==========================================

use serde::{Deserialize, Serialize};
use std::error::Error;
use std::sync::Arc;

// ==========================================
// 轮次事件类型
// ==========================================

/// 轮次事件触发类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RoundEventType {
    /// 轮次状态/阶段/得分变更 (控制台操作)
    RoundUpdated,
    /// 定榜结果被管理员改写
    ResultOverwritten,
}

impl RoundEventType {
    /// 转换为字符串标识
    pub fn as_str(&self) -> &str {
        match self {
            RoundEventType::RoundUpdated => "RoundUpdated",
            RoundEventType::ResultOverwritten => "ResultOverwritten",
        }
    }
}

/// 轮次事件
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoundEvent {
    pub tournament_id: i64,
    pub round_id: i64,
    pub event_type: RoundEventType,
    /// 事件来源描述 (操作类型/操作人)
    pub source: Option<String>,
}

impl RoundEvent {
    pub fn new(
        tournament_id: i64,
        round_id: i64,
        event_type: RoundEventType,
        source: Option<String>,
    ) -> Self {
        Self {
            tournament_id,
            round_id,
            event_type,
            source,
        }
    }
}

// ==========================================
// 事件发布 Trait
// ==========================================

/// 轮次事件发布者 Trait
///
/// Engine 层定义, 推送层实现; 通过 trait 解除 Engine 对推送设施的直接依赖
pub trait RoundEventPublisher: Send + Sync {
    /// 发布轮次事件
    fn publish(&self, event: RoundEvent) -> Result<(), Box<dyn Error + Send + Sync>>;
}

/// 空操作事件发布者
///
/// 用于不需要事件发布的场景（如单元测试）
#[derive(Debug, Clone, Default)]
pub struct NoOpEventPublisher;

impl RoundEventPublisher for NoOpEventPublisher {
    fn publish(&self, event: RoundEvent) -> Result<(), Box<dyn Error + Send + Sync>> {
        tracing::debug!(
            "NoOpEventPublisher: 跳过事件发布 - round_id={}, event_type={}",
            event.round_id,
            event.event_type.as_str()
        );
        Ok(())
    }
}

/// 可选的事件发布者包装
///
/// 简化 Option<Arc<dyn RoundEventPublisher>> 的使用
pub struct OptionalEventPublisher {
    inner: Option<Arc<dyn RoundEventPublisher>>,
}

impl OptionalEventPublisher {
    /// 创建带发布者的实例
    pub fn with_publisher(publisher: Arc<dyn RoundEventPublisher>) -> Self {
        Self {
            inner: Some(publisher),
        }
    }

    /// 创建空实例（不发布事件）
    pub fn none() -> Self {
        Self { inner: None }
    }

    /// 发布事件（如果有发布者）; 失败只告警
    pub fn publish(&self, event: RoundEvent) {
        if let Some(publisher) = &self.inner {
            let round_id = event.round_id;
            if let Err(e) = publisher.publish(event) {
                tracing::warn!("轮次事件发布失败 (业务结果已提交): round_id={}, error={}", round_id, e);
            }
        }
    }

    /// 检查是否配置了发布者
    pub fn is_configured(&self) -> bool {
        self.inner.is_some()
    }
}

impl Default for OptionalEventPublisher {
    fn default() -> Self {
        Self::none()
    }
}
