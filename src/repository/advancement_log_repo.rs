// ==========================================
// 赛事晋级管理系统 - 晋级审计日志仓储
// ==========================================
// 红线: 只追加, 核心永不修改/删除日志行
// 红线: 日志写入失败必须让所在事务失败 (审计是正确性契约的一部分)
// ==========================================

mod core;
mod queries;

#[cfg(test)]
mod tests;

pub use core::AdvancementLogRepository;
