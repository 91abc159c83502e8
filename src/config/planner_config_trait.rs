// ==========================================
// 取件账户分配系统 - 配置读取 Trait
// ==========================================
// 职责: 定义引擎所需的配置读取接口（不包含实现）
// 红线: 不包含配置写入、不包含业务逻辑
// ==========================================

use crate::config::settings::PlannerSettings;
use async_trait::async_trait;
use std::error::Error;

// ==========================================
// PlannerConfigReader Trait
// ==========================================
// 实现者: ConfigManager（从 config_kv 表读取）
#[async_trait]
pub trait PlannerConfigReader: Send + Sync {
    // ===== 评分常量 =====

    /// 时效衰减常量 r2 / r3 与负载常量 r4
    ///
    /// # 默认值
    /// - (30.0, 0.5, 10.0)
    async fn get_decay_constants(&self) -> Result<(f64, f64, f64), Box<dyn Error>>;

    /// 综合分权重 (l2, l3, l4, l5)
    ///
    /// # 默认值
    /// - (1.0, 1.0, 1.0, 1.0)
    async fn get_score_weights(&self) -> Result<(f64, f64, f64, f64), Box<dyn Error>>;

    // ===== 准入窗口 =====

    /// 账户闲置窗口 (天)
    ///
    /// # 默认值
    /// - 30
    async fn get_last_order_days(&self) -> Result<i64, Box<dyn Error>>;

    /// 账户生命周期窗口 (天)
    ///
    /// # 默认值
    /// - 365
    async fn get_account_life_days(&self) -> Result<i64, Box<dyn Error>>;

    // ===== 输出 =====

    /// 排程时间格式 (strftime)
    ///
    /// # 默认值
    /// - "%H:%M"
    async fn get_time_format(&self) -> Result<String, Box<dyn Error>>;

    /// 汇总为 PlannerSettings 并校验
    async fn get_planner_settings(&self) -> Result<PlannerSettings, Box<dyn Error>> {
        let (r2, r3, r4) = self.get_decay_constants().await?;
        let (l2, l3, l4, l5) = self.get_score_weights().await?;
        let last_order_days = self.get_last_order_days().await?;
        let account_life_days = self.get_account_life_days().await?;
        let time_format = self.get_time_format().await?;

        let settings = PlannerSettings {
            r2,
            r3,
            r4,
            l2,
            l3,
            l4,
            l5,
            last_order_days,
            account_life_days,
            time_format,
        };
        settings.validate()?;
        Ok(settings)
    }
}
