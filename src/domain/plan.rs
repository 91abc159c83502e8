// ==========================================
// 取件账户分配系统 - 计划结果模型
// ==========================================
// 职责: 结果行 / 提交记录 / 组织结果 / 服务器计划 / 运行历史
// ==========================================

use crate::domain::decision_log::{DecisionLog, QuotaTally};
use crate::domain::order::TaskUpdate;
use crate::domain::types::AttemptState;
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

// ==========================================
// ResultRow - 结果表行 (以 task_id 为稳定键)
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResultRow {
    pub row_no: usize,
    pub task_id: i64,
    pub org_id: i64,
    pub org_title: String,
    pub article: String,
    pub size: Option<String>,
    pub keyword: Option<String>,
    pub price: Option<i64>,

    // ===== 分配结果 =====
    pub account_id: Option<i64>,
    pub account_number: Option<String>,
    pub address_id: Option<i64>,
    pub address: Option<String>,
    pub scheduled_at: Option<NaiveDateTime>,
}

// ==========================================
// Commitment - 一次成功的账户提交
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Commitment {
    pub org_id: i64,
    pub slot: usize,
    pub article: String,
    pub account_id: i64,
    pub account_number: String,
    pub address_id: i64,
    pub address: String,
    pub contractor_id: i64,
    pub af: f64,
    pub vip: bool,
}

// ==========================================
// OrganizationOutcome - 组织分配结果
// ==========================================
// 缺口 (shortfall) 不是错误, 但必须显式上报
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrganizationOutcome {
    pub org_id: i64,
    pub org_title: String,
    pub amount: usize,
    pub committed: usize,
    pub shortfall: usize,
    pub final_state: AttemptState,
    pub attempts: usize,
    pub tallies: Vec<QuotaTally>,
}

// ==========================================
// ServerPlan - 单服务器完整计划
// ==========================================
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerPlan {
    pub server_id: i64,
    pub server_name: String,
    pub rows: Vec<ResultRow>,
    pub commitments: Vec<Commitment>,
    pub outcomes: Vec<OrganizationOutcome>,
    pub task_updates: Vec<TaskUpdate>,
    pub log: DecisionLog,
}

impl ServerPlan {
    pub fn total_shortfall(&self) -> usize {
        self.outcomes.iter().map(|o| o.shortfall).sum()
    }
}

// ==========================================
// PlanHistoryRecord - 运行历史 (产物引用)
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlanHistoryRecord {
    pub server_id: i64,
    pub run_at: NaiveDateTime,
    pub logs_artifact: String,
    pub result_artifact: Option<String>,
}
