// ==========================================
// 取件账户分配系统 - 应用状态
// ==========================================
// 职责: 管理应用级别的共享状态和API实例
// ==========================================

use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use crate::api::PlanApi;
use crate::config::config_manager::ConfigManager;
use crate::db::{init_schema, open_sqlite_connection};
use crate::report::LocalArtifactStore;
use crate::repository::PlannerRepository;

/// 数据库路径环境变量
pub const DB_PATH_ENV: &str = "PICKUP_PLANNER_DB_PATH";

/// 产物目录环境变量
pub const ARTIFACT_DIR_ENV: &str = "PICKUP_PLANNER_ARTIFACT_DIR";

const DATA_DIR_NAME: &str = "pickup-planner";

/// 应用状态
///
/// 仓储与配置共享同一连接
pub struct AppState {
    /// 数据库路径
    pub db_path: String,

    /// 产物目录
    pub artifact_dir: PathBuf,

    pub config_manager: Arc<ConfigManager>,

    pub plan_api: Arc<PlanApi>,
}

impl AppState {
    pub fn new(db_path: String, artifact_dir: PathBuf) -> Result<Self, String> {
        tracing::info!("初始化AppState，数据库路径: {}", db_path);

        let conn =
            open_sqlite_connection(&db_path).map_err(|e| format!("无法打开数据库: {}", e))?;
        init_schema(&conn).map_err(|e| format!("数据库初始化失败: {}", e))?;
        let conn = Arc::new(Mutex::new(conn));

        let planner_repo = Arc::new(PlannerRepository::from_connection(conn.clone()));
        let config_manager = Arc::new(
            ConfigManager::from_connection(conn)
                .map_err(|e| format!("无法创建ConfigManager: {}", e))?,
        );
        let artifact_store = Arc::new(LocalArtifactStore::new(artifact_dir.clone()));

        let plan_api = Arc::new(PlanApi::new(
            planner_repo,
            config_manager.clone(),
            artifact_store,
        ));

        tracing::info!("AppState初始化成功，产物目录: {}", artifact_dir.display());

        Ok(Self {
            db_path,
            artifact_dir,
            config_manager,
            plan_api,
        })
    }
}

fn env_path(key: &str) -> Option<String> {
    std::env::var(key)
        .ok()
        .map(|p| p.trim().to_string())
        .filter(|p| !p.is_empty())
}

fn default_data_dir() -> PathBuf {
    dirs::data_dir()
        .map(|d| d.join(DATA_DIR_NAME))
        .unwrap_or_else(|| PathBuf::from("."))
}

/// 默认数据库路径
///
/// 优先 PICKUP_PLANNER_DB_PATH, 否则用户数据目录
pub fn get_default_db_path() -> String {
    if let Some(path) = env_path(DB_PATH_ENV) {
        return path;
    }

    let dir = default_data_dir();
    std::fs::create_dir_all(&dir).ok();
    dir.join("pickup_planner.db").to_string_lossy().to_string()
}

/// 默认产物目录
///
/// 优先 PICKUP_PLANNER_ARTIFACT_DIR, 否则用户数据目录下 artifacts/
pub fn get_default_artifact_dir() -> PathBuf {
    match env_path(ARTIFACT_DIR_ENV) {
        Some(path) => PathBuf::from(path),
        None => default_data_dir().join("artifacts"),
    }
}
