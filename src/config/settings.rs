// ==========================================
// 取件账户分配系统 - 运行参数
// ==========================================
// PlannerSettings: 全局可调常量 (来自 config_kv)
// RunOptions: 单次运行参数 (来自操作员触发)
// ==========================================

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

// ==========================================
// PlannerSettings - 评分与准入常量
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlannerSettings {
    // ===== 时效衰减 =====
    pub r2: f64, // 近期阈值 (天)
    pub r3: f64, // 超阈值后的衰减斜率
    pub r4: f64, // 负载上界常量

    // ===== 综合分权重 =====
    pub l2: f64, // Y  (地址历史使用)
    pub l3: f64, // AA (时效)
    pub l4: f64, // AC (地址负载)
    pub l5: f64, // AE (账户负载)

    // ===== 准入窗口 =====
    pub last_order_days: i64,
    pub account_life_days: i64,

    // ===== 输出 =====
    pub time_format: String,
}

impl Default for PlannerSettings {
    fn default() -> Self {
        Self {
            r2: 30.0,
            r3: 0.5,
            r4: 10.0,
            l2: 1.0,
            l3: 1.0,
            l4: 1.0,
            l5: 1.0,
            last_order_days: 30,
            account_life_days: 365,
            time_format: "%H:%M".to_string(),
        }
    }
}

/// 窗口天数上限 (约 100 年)
pub const MAX_WINDOW_DAYS: i64 = 36_500;

impl PlannerSettings {
    /// 校验常量可用于归一化
    ///
    /// # 规则
    /// - r4 > 1 (AC 以 r4 - 1 为分母)
    /// - 权重非负且不全为 0
    /// - 窗口天数在 [0, MAX_WINDOW_DAYS] 内
    pub fn validate(&self) -> Result<(), String> {
        let all_finite = [self.r2, self.r3, self.r4, self.l2, self.l3, self.l4, self.l5]
            .iter()
            .all(|v| v.is_finite());
        if !all_finite {
            return Err("planner settings contain non-finite values".to_string());
        }
        if self.r4 <= 1.0 {
            return Err(format!("r4 must be greater than 1 (got {})", self.r4));
        }
        let weights = [self.l2, self.l3, self.l4, self.l5];
        if weights.iter().any(|w| *w < 0.0) || weights.iter().all(|w| *w == 0.0) {
            return Err(format!(
                "score weights must be non-negative and not all zero (got {:?})",
                weights
            ));
        }
        for (name, days) in [
            ("last_order_days", self.last_order_days),
            ("account_life_days", self.account_life_days),
        ] {
            if !(0..=MAX_WINDOW_DAYS).contains(&days) {
                return Err(format!(
                    "{} must be within [0, {}] (got {})",
                    name, MAX_WINDOW_DAYS, days
                ));
            }
        }
        if self.time_format.trim().is_empty() {
            return Err("time_format must not be empty".to_string());
        }
        Ok(())
    }
}

// ==========================================
// RunOptions - 单次运行参数
// ==========================================
#[derive(Debug, Clone, PartialEq)]
pub struct RunOptions {
    /// 计划日期 (任务的 planned_date)
    pub plan_date: NaiveDate,
    /// 运行当日 (准入窗口与时效计算的 "现在")
    pub today: NaiveDate,
    /// 当日黑名单账户号
    pub blacklist: HashSet<String>,
    /// 结果绑定打散种子 (None = 随机)
    pub shuffle_seed: Option<u64>,
}

impl RunOptions {
    pub fn new(plan_date: NaiveDate, today: NaiveDate) -> Self {
        Self {
            plan_date,
            today,
            blacklist: HashSet::new(),
            shuffle_seed: None,
        }
    }

    pub fn with_blacklist_text(mut self, text: &str) -> Self {
        self.blacklist = parse_blacklist(text);
        self
    }

    pub fn with_shuffle_seed(mut self, seed: u64) -> Self {
        self.shuffle_seed = Some(seed);
        self
    }
}

/// 解析黑名单自由文本
///
/// # 规则
/// - 以换行 / 回车分隔
/// - 去除所有空格
/// - 忽略空条目
pub fn parse_blacklist(text: &str) -> HashSet<String> {
    text.split(['\n', '\r'])
        .map(|line| line.replace(' ', ""))
        .filter(|line| !line.is_empty())
        .collect()
}
