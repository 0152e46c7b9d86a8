// ==========================================
// 赛事晋级管理系统 - 应用状态
// ==========================================
// 职责: 管理应用级别的共享状态和API实例
// ==========================================

use rusqlite::Connection;
use std::sync::{Arc, Mutex};

use crate::api::{AdvancementRuleApi, ControlApi, RoundApi};
use crate::config::ConfigManager;
use crate::engine::{
    AdvancementEngine, OptionalEventPublisher, RoundControlEngine, RoundEventPublisher,
    TournamentRepositories,
};

/// 应用状态
///
/// 包含所有API实例和共享资源
pub struct AppState {
    /// 数据库路径
    pub db_path: String,

    /// 赛务控制API
    pub control_api: Arc<ControlApi>,

    /// 轮次管理API
    pub round_api: Arc<RoundApi>,

    /// 晋级规则API
    pub rule_api: Arc<AdvancementRuleApi>,

    /// 晋级传播引擎 (独立触发重算时直接用)
    pub advancement_engine: Arc<AdvancementEngine>,

    /// 仓储集合 (审计/看板等读取路径)
    pub repositories: TournamentRepositories,

    /// 配置管理器
    pub config: Arc<ConfigManager>,
}

impl AppState {
    /// 创建新的AppState实例
    ///
    /// # 说明
    /// 该方法会：
    /// 1. 打开共享数据库连接并确保 schema 就绪
    /// 2. 初始化 Repository / Engine / API 各层
    pub fn new(db_path: String) -> Result<Self, String> {
        Self::with_event_publisher(db_path, None)
    }

    /// 创建带事件发布器的实例 (实时推送场景)
    pub fn with_event_publisher(
        db_path: String,
        event_publisher: Option<Arc<dyn RoundEventPublisher>>,
    ) -> Result<Self, String> {
        tracing::info!("初始化AppState，数据库路径: {}", db_path);

        let conn = crate::db::open_and_ensure(&db_path)
            .map_err(|e| format!("无法打开数据库: {}", e))?;
        let conn = Arc::new(Mutex::new(conn));

        // ==========================================
        // Repository 层
        // ==========================================
        let repositories = TournamentRepositories::new(conn.clone());

        // ==========================================
        // Engine 层
        // ==========================================
        let config = Arc::new(ConfigManager::from_connection(conn.clone()));
        let advancement_engine = Arc::new(AdvancementEngine::new(conn.clone()));

        let events = match event_publisher {
            Some(publisher) => OptionalEventPublisher::with_publisher(publisher),
            None => OptionalEventPublisher::none(),
        };
        let control_engine = Arc::new(RoundControlEngine::new(conn.clone(), events));

        // ==========================================
        // API 层
        // ==========================================
        let control_api = Arc::new(ControlApi::new(control_engine));
        let round_api = Arc::new(RoundApi::new(conn.clone(), config.clone()));
        let rule_api = Arc::new(AdvancementRuleApi::new(conn));

        tracing::info!("AppState初始化完成");

        Ok(Self {
            db_path,
            control_api,
            round_api,
            rule_api,
            advancement_engine,
            repositories,
            config,
        })
    }

    /// 获取数据库路径
    pub fn get_db_path(&self) -> &str {
        &self.db_path
    }
}

// ==========================================
// 默认数据库路径辅助函数
// ==========================================

/// 获取默认数据库路径
///
/// 优先级: 环境变量 TOURNAMENT_AMS_DB_PATH > 用户数据目录 > 当前目录
pub fn get_default_db_path() -> String {
    use std::path::PathBuf;

    // 允许通过环境变量显式指定 DB 路径（便于调试/测试/CI）
    if let Ok(path) = std::env::var("TOURNAMENT_AMS_DB_PATH") {
        let trimmed = path.trim();
        if !trimmed.is_empty() {
            return trimmed.to_string();
        }
    }

    let mut path = PathBuf::from("./tournament_ams.db");

    if let Some(data_dir) = dirs::data_dir() {
        // 开发环境使用独立目录，避免污染生产数据
        #[cfg(debug_assertions)]
        {
            path = data_dir.join("tournament-ams-dev");
        }

        #[cfg(not(debug_assertions))]
        {
            path = data_dir.join("tournament-ams");
        }

        // 确保目录存在
        std::fs::create_dir_all(&path).ok();
        path = path.join("tournament_ams.db");
    }

    path.to_string_lossy().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_get_default_db_path() {
        let path = get_default_db_path();
        assert!(!path.is_empty());
        assert!(path.ends_with(".db"));
    }

    // 注意：AppState::new() 的测试需要真实的数据库文件
    // 这些测试在集成测试中进行
}
