// ==========================================
// 取件账户分配系统 - 订单领域模型
// ==========================================
// 职责: 当日待分配任务 (Task)、历史订单 (OrderRecord)、任务更新 (TaskUpdate)
// ==========================================

use crate::domain::types::OrderStatus;
use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

// ==========================================
// Task - 当日需求单元
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Task {
    pub id: i64,
    pub org_id: i64,
    pub org_title: String,
    pub article: String,
    pub size: Option<String>,
    pub keyword: Option<String>,
    pub price: Option<i64>,
    pub status: OrderStatus,
    pub planned_date: NaiveDate,
}

// ==========================================
// OrderRecord - 历史订单 (已下单)
// ==========================================
// account_id 缺失属于数据完整性错误 (整次运行失败)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderRecord {
    pub id: i64,
    pub account_id: Option<i64>,
    pub org_id: i64,
    pub article: String,
    pub dt_ordered: NaiveDate,
    pub dt_collected: Option<NaiveDate>,
}

impl OrderRecord {
    /// 未取件 = 仍占用账户/地址
    pub fn is_open(&self) -> bool {
        self.dt_collected.is_none()
    }
}

// ==========================================
// TaskUpdate - 分配结果落库
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskUpdate {
    pub task_id: i64,
    pub status: OrderStatus,
    pub account_id: i64,
    pub address_id: i64,
    pub scheduled_at: Option<NaiveDateTime>,
}
