// ==========================================
// 取件账户分配系统 - 服务器与承运商配置
// ==========================================
// 职责: 服务器 (履约池)、承运商配置、排程配置、VIP 客户
// 红线: 不含数据访问逻辑,不含引擎逻辑
// ==========================================

use chrono::{NaiveDate, NaiveTime};
use serde::{Deserialize, Serialize};

// ==========================================
// ContractorConfig - 承运商在某服务器上的配置
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContractorConfig {
    pub contractor_id: i64,
    pub contractor_name: String,

    // ===== 配额 =====
    pub load_percent: f64, // 配额比例 (0.0 - 1.0)

    // ===== 区间约束 (闭区间) =====
    pub load_j_min: i64, // 账户在该承运商下的使用次数 J
    pub load_j_max: i64,
    pub load_l_min: i64, // 地址负载 L = K + W
    pub load_l_max: i64,
    pub load_t_min: i64, // 账户未取件订单数 T
    pub load_t_max: i64,

    // ===== 其他约束 =====
    pub load_i: i64,         // 地址并发占用上限 (有未取件订单的不同账户数)
    pub load_m: NaiveDate,   // 复用截止日: 组织在地址的最近订单不得晚于此日
}

impl ContractorConfig {
    pub fn t_in_range(&self, t: i64) -> bool {
        t >= self.load_t_min && t <= self.load_t_max
    }

    pub fn l_in_range(&self, l: i64) -> bool {
        l >= self.load_l_min && l <= self.load_l_max
    }

    pub fn j_in_range(&self, j: i64) -> bool {
        j >= self.load_j_min && j <= self.load_j_max
    }
}

// ==========================================
// ScheduleConfig - 时段排程配置
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScheduleConfig {
    pub title: String,
    pub time_min_min_per_step: f64, // 每格最短分钟数
    pub time_max_min_per_step: f64, // 每格最长分钟数
    pub time_start: NaiveTime,
    pub time_end: NaiveTime,
    pub time_first_point: NaiveTime,  // 第一收缩点
    pub time_second_point: NaiveTime, // 第二收缩点
}

// ==========================================
// Server - 履约池
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Server {
    pub id: i64,
    pub number: String,
    pub name: String,
    pub is_active: bool,
    pub schedule: ScheduleConfig,
    pub contractors: Vec<ContractorConfig>,
}

impl Server {
    /// 按承运商ID查找配置
    pub fn contractor(&self, contractor_id: i64) -> Option<&ContractorConfig> {
        self.contractors
            .iter()
            .find(|c| c.contractor_id == contractor_id)
    }
}

// ==========================================
// VipClient - VIP 客户 (按服务器授予)
// ==========================================
// 覆盖默认规则 "每个组织每个账户终身只能下单一次"
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct VipClient {
    pub server_id: i64,
    pub org_id: i64,
    pub load_i: i64, // 每账户允许次数
}
