// ==========================================
// 赛事晋级管理系统 - 主入口
// ==========================================
// 技术栈: Rust + SQLite
// 系统定位: 赛务决策支持核心
// ==========================================

use tournament_ams::app::{get_default_db_path, AppState};

fn main() {
    // 初始化日志系统
    tournament_ams::logging::init();

    tracing::info!("==================================================");
    tracing::info!("{} - 赛务决策支持核心", tournament_ams::APP_NAME);
    tracing::info!("系统版本: {}", tournament_ams::VERSION);
    tracing::info!("==================================================");

    // 获取数据库路径
    let db_path = get_default_db_path();
    tracing::info!("使用数据库: {}", db_path);

    // 创建AppState (打开连接并确保 schema 就绪)
    tracing::info!("正在初始化AppState...");
    let app_state = match AppState::new(db_path) {
        Ok(state) => state,
        Err(e) => {
            tracing::error!("无法初始化AppState: {}", e);
            std::process::exit(1);
        }
    };

    tracing::info!("AppState初始化成功: db={}", app_state.get_db_path());
    tracing::info!("库模式使用说明: use tournament_ams::app::AppState;");
}
