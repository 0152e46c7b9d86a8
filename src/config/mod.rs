// ==========================================
// 赛事晋级管理系统 - 配置层
// ==========================================
// 职责: 运营参数管理 (初始分/席位数边界等)
// 存储: config_kv 表
// ==========================================

pub mod config_manager;

// 重导出核心配置管理器
pub use config_manager::{config_keys, ConfigManager};
