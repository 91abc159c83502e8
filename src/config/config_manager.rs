// ==========================================
// 取件账户分配系统 - 配置管理器
// ==========================================
// 职责: 配置加载、查询、覆写
// 存储: config_kv 表 (key-value + scope)
// ==========================================

use crate::config::planner_config_trait::PlannerConfigReader;
use crate::config::settings::PlannerSettings;
use crate::db::open_sqlite_connection;
use async_trait::async_trait;
use rusqlite::{params, Connection};
use std::error::Error;
use std::str::FromStr;
use std::sync::{Arc, Mutex};

// ==========================================
// ConfigManager - 配置管理器
// ==========================================
pub struct ConfigManager {
    conn: Arc<Mutex<Connection>>,
}

impl ConfigManager {
    /// 创建新的 ConfigManager 实例
    ///
    /// # 参数
    /// - db_path: 数据库文件路径
    pub fn new(db_path: &str) -> Result<Self, Box<dyn Error>> {
        let conn = open_sqlite_connection(db_path)?;

        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// 从已有连接创建 ConfigManager
    ///
    /// 说明：为保证连接行为一致，会对传入连接再次应用统一 PRAGMA（幂等）。
    pub fn from_connection(conn: Arc<Mutex<Connection>>) -> Result<Self, Box<dyn Error>> {
        {
            let conn_guard = conn.lock().map_err(|e| format!("锁获取失败: {}", e))?;
            crate::db::apply_pragmas(&conn_guard)?;
        }

        Ok(Self { conn })
    }

    /// 从 config_kv 表读取配置值（scope_id='global'）
    fn get_config_value(&self, key: &str) -> Result<Option<String>, Box<dyn Error>> {
        let conn = self.conn.lock().map_err(|e| format!("锁获取失败: {}", e))?;

        let result = conn.query_row(
            "SELECT value FROM config_kv WHERE scope_id = 'global' AND key = ?1",
            params![key],
            |row| row.get::<_, String>(0),
        );

        match result {
            Ok(value) => Ok(Some(value)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(Box::new(e)),
        }
    }

    /// 读取并解析数值配置，缺失或格式错误时回退默认值
    fn get_parsed_or_default<T>(&self, key: &str, default: T) -> Result<T, Box<dyn Error>>
    where
        T: FromStr + Copy + std::fmt::Debug,
    {
        let Some(raw) = self.get_config_value(key)? else {
            return Ok(default);
        };

        match raw.trim().parse::<T>() {
            Ok(v) => Ok(v),
            Err(_) => {
                tracing::warn!(
                    config_key = key,
                    raw_value = %raw,
                    default = ?default,
                    "配置值格式错误，使用默认值"
                );
                Ok(default)
            }
        }
    }

    /// 写入配置值（UPSERT）
    pub fn set_config_value(&self, key: &str, value: &str) -> Result<(), Box<dyn Error>> {
        let conn = self.conn.lock().map_err(|e| format!("锁获取失败: {}", e))?;
        conn.execute(
            "INSERT INTO config_kv (scope_id, key, value) VALUES ('global', ?1, ?2)
             ON CONFLICT(scope_id, key) DO UPDATE SET value = ?2, updated_at = datetime('now')",
            params![key, value],
        )?;
        Ok(())
    }
}

// ==========================================
// PlannerConfigReader Trait 实现
// ==========================================
#[async_trait]
impl PlannerConfigReader for ConfigManager {
    async fn get_decay_constants(&self) -> Result<(f64, f64, f64), Box<dyn Error>> {
        let defaults = PlannerSettings::default();
        Ok((
            self.get_parsed_or_default(config_keys::R2, defaults.r2)?,
            self.get_parsed_or_default(config_keys::R3, defaults.r3)?,
            self.get_parsed_or_default(config_keys::R4, defaults.r4)?,
        ))
    }

    async fn get_score_weights(&self) -> Result<(f64, f64, f64, f64), Box<dyn Error>> {
        let defaults = PlannerSettings::default();
        Ok((
            self.get_parsed_or_default(config_keys::L2, defaults.l2)?,
            self.get_parsed_or_default(config_keys::L3, defaults.l3)?,
            self.get_parsed_or_default(config_keys::L4, defaults.l4)?,
            self.get_parsed_or_default(config_keys::L5, defaults.l5)?,
        ))
    }

    async fn get_last_order_days(&self) -> Result<i64, Box<dyn Error>> {
        self.get_parsed_or_default(config_keys::LAST_ORDER_DAYS, 30)
    }

    async fn get_account_life_days(&self) -> Result<i64, Box<dyn Error>> {
        self.get_parsed_or_default(config_keys::ACCOUNT_LIFE_DAYS, 365)
    }

    async fn get_time_format(&self) -> Result<String, Box<dyn Error>> {
        let value = self
            .get_config_value(config_keys::TIME_FORMAT)?
            .filter(|v| !v.trim().is_empty())
            .unwrap_or_else(|| PlannerSettings::default().time_format);
        Ok(value)
    }
}

// ==========================================
// 配置键常量
// ==========================================
pub mod config_keys {
    // 时效衰减 / 负载
    pub const R2: &str = "picker/r2";
    pub const R3: &str = "picker/r3";
    pub const R4: &str = "picker/r4";

    // 综合分权重
    pub const L2: &str = "picker/l2";
    pub const L3: &str = "picker/l3";
    pub const L4: &str = "picker/l4";
    pub const L5: &str = "picker/l5";

    // 准入窗口
    pub const LAST_ORDER_DAYS: &str = "picker/last_order_days";
    pub const ACCOUNT_LIFE_DAYS: &str = "picker/account_life_days";

    // 排程时间格式
    pub const TIME_FORMAT: &str = "picker/time_format";
}
