// ==========================================
// 取件账户分配系统 - 账户 / 地址 / 组织
// ==========================================

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// 取件账户: 绑定唯一地址与唯一服务器
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Account {
    pub id: i64,
    pub number: String,
    pub name: String,
    pub is_active: bool,
    pub reg_date: Option<NaiveDate>,
    pub address_id: i64,
    pub server_id: i64,
}

/// 取件地址: 归属某承运商
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Address {
    pub id: i64,
    pub address: String,
    pub district: Option<String>,
    pub contractor_id: i64,
    pub is_active: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Organization {
    pub id: i64,
    pub title: String,
    pub server_id: i64,
}
