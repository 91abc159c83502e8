// ==========================================
// 取件账户分配系统 - 应用层
// ==========================================
// 职责: 组装共享连接 / 仓储 / 配置 / 产物存储, 供命令行入口使用
// ==========================================

pub mod state;

// 重导出
pub use state::{get_default_artifact_dir, get_default_db_path, AppState};
