// ==========================================
// 取件账户分配系统 - 领域类型定义
// ==========================================
// 职责: 订单状态、准入排除原因、候选拒绝原因
// 红线: 所有排除/拒绝必须输出原因码 (可解释性)
// ==========================================

use serde::{Deserialize, Serialize};
use std::fmt;

// ==========================================
// 订单状态 (Order Status)
// ==========================================
// 序列化格式: SCREAMING_SNAKE_CASE (与数据库一致)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderStatus {
    Planned,   // 已计划 (待分配账户)
    Queued,    // 已分配, 等待下单取件
    Ordered,   // 已下单
    Delivered, // 已到达取件点
    Collected, // 已取件
    Cancelled, // 已取消
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl OrderStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::Planned => "PLANNED",
            OrderStatus::Queued => "QUEUED",
            OrderStatus::Ordered => "ORDERED",
            OrderStatus::Delivered => "DELIVERED",
            OrderStatus::Collected => "COLLECTED",
            OrderStatus::Cancelled => "CANCELLED",
        }
    }

    /// 从字符串解析状态
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_uppercase().as_str() {
            "PLANNED" => Some(OrderStatus::Planned),
            "QUEUED" => Some(OrderStatus::Queued),
            "ORDERED" => Some(OrderStatus::Ordered),
            "DELIVERED" => Some(OrderStatus::Delivered),
            "COLLECTED" => Some(OrderStatus::Collected),
            "CANCELLED" => Some(OrderStatus::Cancelled),
            _ => None,
        }
    }
}

// ==========================================
// 公共池排除原因 (Pool Exclusion Reason)
// ==========================================
// 顺序即判定顺序: 首个命中即排除
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "code", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PoolExclusionReason {
    /// 账户号在当日黑名单中
    Blacklisted,
    /// 账户未启用
    AccountInactive,
    /// 账户绑定地址未启用
    AddressInactive,
    /// 最近一笔未取件订单超出闲置窗口
    StaleLastOrder {
        last_order: chrono::NaiveDate,
        window_days: i64,
    },
    /// 账户注册日期超出生命周期窗口
    AccountExpired {
        reg_date: chrono::NaiveDate,
        age_days: i64,
        window_days: i64,
    },
    /// 地址所属承运商未在本服务器配置
    ContractorNotOnServer { contractor_id: i64 },
    /// 账户未取件订单数 T 超出承运商区间
    ActiveLoadOutOfRange { t: i64, min: i64, max: i64 },
}

impl PoolExclusionReason {
    /// 原因码 (稳定, 用于报表与测试断言)
    pub fn code(&self) -> &'static str {
        match self {
            PoolExclusionReason::Blacklisted => "BLACKLISTED",
            PoolExclusionReason::AccountInactive => "ACCOUNT_INACTIVE",
            PoolExclusionReason::AddressInactive => "ADDRESS_INACTIVE",
            PoolExclusionReason::StaleLastOrder { .. } => "STALE_LAST_ORDER",
            PoolExclusionReason::AccountExpired { .. } => "ACCOUNT_EXPIRED",
            PoolExclusionReason::ContractorNotOnServer { .. } => "CONTRACTOR_NOT_ON_SERVER",
            PoolExclusionReason::ActiveLoadOutOfRange { .. } => "ACTIVE_LOAD_OUT_OF_RANGE",
        }
    }
}

impl fmt::Display for PoolExclusionReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PoolExclusionReason::StaleLastOrder { last_order, window_days } => write!(
                f,
                "{}: last_order={} older than {} days",
                self.code(),
                last_order,
                window_days
            ),
            PoolExclusionReason::AccountExpired { reg_date, age_days, window_days } => write!(
                f,
                "{}: reg_date={}, age={} days (max {} days)",
                self.code(),
                reg_date,
                age_days,
                window_days
            ),
            PoolExclusionReason::ContractorNotOnServer { contractor_id } => {
                write!(f, "{}: contractor_id={}", self.code(), contractor_id)
            }
            PoolExclusionReason::ActiveLoadOutOfRange { t, min, max } => {
                write!(f, "{}: T={} not in [{}, {}]", self.code(), t, min, max)
            }
            _ => write!(f, "{}", self.code()),
        }
    }
}

// ==========================================
// 候选拒绝原因 (Candidate Rejection)
// ==========================================
// 覆盖两个阶段: 组织候选构建 + 逐槽位选取校验
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "code", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CandidateRejection {
    // ===== 候选构建阶段 =====
    /// 非 VIP 组织已在该账户下过单
    AlreadyOrdered { i: i64 },
    /// VIP 组织在该账户的下单次数已达上限
    VipAllowanceExhausted { i: i64, allowance: i64 },
    /// 该组织在此地址的最近订单晚于承运商复用截止日
    ReuseCutoff {
        last_order: chrono::NaiveDate,
        cutoff: chrono::NaiveDate,
    },

    // ===== 负载修剪 =====
    /// L = K + W 超出承运商区间
    AddressLoadOutOfRange { l: i64, min: i64, max: i64 },

    // ===== 选取校验阶段 =====
    /// VIP 文章独占: 该账户已用于同一文章, 或总次数达上限
    VipArticleConflict { article: String },
    /// 地址已被占用 (本组织或本次运行中其他组织)
    AddressAlreadyUsed,
    /// 承运商配额已满
    ContractorQuotaFull { contractor_id: i64 },
    /// 地址并发占用数超限
    OccupancyExceeded { occupancy: i64, limit: i64 },
    /// 账户在该承运商下的使用次数 J 超出区间
    ContractorUsageOutOfRange { j: i64, min: i64, max: i64 },
}

impl CandidateRejection {
    pub fn code(&self) -> &'static str {
        match self {
            CandidateRejection::AlreadyOrdered { .. } => "ALREADY_ORDERED",
            CandidateRejection::VipAllowanceExhausted { .. } => "VIP_ALLOWANCE_EXHAUSTED",
            CandidateRejection::ReuseCutoff { .. } => "REUSE_CUTOFF",
            CandidateRejection::AddressLoadOutOfRange { .. } => "ADDRESS_LOAD_OUT_OF_RANGE",
            CandidateRejection::VipArticleConflict { .. } => "VIP_ARTICLE_CONFLICT",
            CandidateRejection::AddressAlreadyUsed => "ADDRESS_ALREADY_USED",
            CandidateRejection::ContractorQuotaFull { .. } => "CONTRACTOR_QUOTA_FULL",
            CandidateRejection::OccupancyExceeded { .. } => "OCCUPANCY_EXCEEDED",
            CandidateRejection::ContractorUsageOutOfRange { .. } => "CONTRACTOR_USAGE_OUT_OF_RANGE",
        }
    }
}

impl fmt::Display for CandidateRejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CandidateRejection::AlreadyOrdered { i } => write!(f, "{}: I={}", self.code(), i),
            CandidateRejection::VipAllowanceExhausted { i, allowance } => {
                write!(f, "{}: I={} >= {}", self.code(), i, allowance)
            }
            CandidateRejection::ReuseCutoff { last_order, cutoff } => {
                write!(f, "{}: M={} > {}", self.code(), last_order, cutoff)
            }
            CandidateRejection::AddressLoadOutOfRange { l, min, max } => {
                write!(f, "{}: L={} not in [{}, {}]", self.code(), l, min, max)
            }
            CandidateRejection::VipArticleConflict { article } => {
                write!(f, "{}: article={}", self.code(), article)
            }
            CandidateRejection::ContractorQuotaFull { contractor_id } => {
                write!(f, "{}: contractor_id={}", self.code(), contractor_id)
            }
            CandidateRejection::OccupancyExceeded { occupancy, limit } => {
                write!(f, "{}: II={} >= {}", self.code(), occupancy, limit)
            }
            CandidateRejection::ContractorUsageOutOfRange { j, min, max } => {
                write!(f, "{}: J={} not in [{}, {}]", self.code(), j, min, max)
            }
            CandidateRejection::AddressAlreadyUsed => write!(f, "{}", self.code()),
        }
    }
}

// ==========================================
// 分配尝试状态 (Attempt State)
// ==========================================
// 转移函数见 engine::attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AttemptState {
    Attempt1,                 // 初始配额
    Attempt2Redistribute,     // 配额重分 + 占用偏移 +1
    Attempt3AcceptBestEffort, // 接受尝试2的结果 (允许缺口)
    Fulfilled,                // 需求全部满足
}

impl fmt::Display for AttemptState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AttemptState::Attempt1 => write!(f, "ATTEMPT_1"),
            AttemptState::Attempt2Redistribute => write!(f, "ATTEMPT_2_REDISTRIBUTE"),
            AttemptState::Attempt3AcceptBestEffort => write!(f, "ATTEMPT_3_ACCEPT_BEST_EFFORT"),
            AttemptState::Fulfilled => write!(f, "FULFILLED"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_order_status_round_trip_through_str() {
        for status in [
            OrderStatus::Planned,
            OrderStatus::Queued,
            OrderStatus::Collected,
            OrderStatus::Cancelled,
        ] {
            assert_eq!(OrderStatus::parse(status.as_str()), Some(status));
        }
        assert_eq!(OrderStatus::parse("planned"), Some(OrderStatus::Planned));
        assert_eq!(OrderStatus::parse("???"), None);
    }

    #[test]
    fn test_reason_display_carries_code() {
        let reason = PoolExclusionReason::ActiveLoadOutOfRange { t: 5, min: 0, max: 3 };
        assert_eq!(reason.to_string(), "ACTIVE_LOAD_OUT_OF_RANGE: T=5 not in [0, 3]");

        let rejection = CandidateRejection::AddressAlreadyUsed;
        assert_eq!(rejection.to_string(), "ADDRESS_ALREADY_USED");
    }
}
