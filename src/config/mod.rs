// ==========================================
// 取件账户分配系统 - 配置层
// ==========================================
// 职责: 评分常量 / 窗口 / 时间格式等全局配置
// 存储: config_kv 表 (scope_id = 'global')
// ==========================================

pub mod config_manager;
pub mod planner_config_trait;
pub mod settings;

// 重导出核心配置
pub use config_manager::{config_keys, ConfigManager};
pub use planner_config_trait::PlannerConfigReader;
pub use settings::{parse_blacklist, PlannerSettings, RunOptions};
