// ==========================================
// 取件账户分配系统 - 历史订单索引
// ==========================================
// 职责: 一次性扫描历史订单, 提供准入与评分所需的计数
// 计数: T (账户未取件) / W (地址未取件) / HH (地址上有未取件订单的不同账户)
//       I (组织在账户) / I1 (组织在账户的某文章) / H, M (组织在地址)
// 红线: 历史订单缺账户 = 数据完整性错误
// ==========================================

use crate::domain::order::OrderRecord;
use crate::engine::error::{EngineError, EngineResult};
use chrono::NaiveDate;
use std::collections::{HashMap, HashSet};

/// 组织在某地址的历史 (H, M)
#[derive(Debug, Clone, Copy, Default)]
struct OrgAddressStat {
    count: i64,
    latest: Option<NaiveDate>,
}

#[derive(Debug, Default)]
pub struct OrderHistoryIndex {
    account_open: HashMap<i64, i64>,
    address_open: HashMap<i64, i64>,
    address_open_accounts: HashMap<i64, HashSet<i64>>,
    latest_open_order: HashMap<i64, NaiveDate>,
    earliest_order: HashMap<i64, NaiveDate>,
    org_account: HashMap<(i64, i64), i64>,
    org_account_article: HashMap<(i64, i64, String), i64>,
    org_address: HashMap<(i64, i64), OrgAddressStat>,
}

impl OrderHistoryIndex {
    /// 构建索引
    ///
    /// # 参数
    /// - orders: 全部已下单历史订单 (dt_ordered 非空)
    /// - account_addresses: account_id → address_id (全部服务器的账户)
    ///
    /// # 错误
    /// - MissingAccountLink: 历史订单未关联账户
    /// - UnknownAccount: 关联的账户不存在
    pub fn build(
        orders: &[OrderRecord],
        account_addresses: &HashMap<i64, i64>,
    ) -> EngineResult<Self> {
        let mut index = Self::default();

        for order in orders {
            let account_id = order
                .account_id
                .ok_or(EngineError::MissingAccountLink { order_id: order.id })?;
            let address_id = *account_addresses.get(&account_id).ok_or(
                EngineError::UnknownAccount {
                    order_id: order.id,
                    account_id,
                },
            )?;

            let earliest = index.earliest_order.entry(account_id).or_insert(order.dt_ordered);
            if order.dt_ordered < *earliest {
                *earliest = order.dt_ordered;
            }

            if order.is_open() {
                *index.account_open.entry(account_id).or_insert(0) += 1;
                *index.address_open.entry(address_id).or_insert(0) += 1;
                index
                    .address_open_accounts
                    .entry(address_id)
                    .or_default()
                    .insert(account_id);

                let latest = index
                    .latest_open_order
                    .entry(account_id)
                    .or_insert(order.dt_ordered);
                if order.dt_ordered > *latest {
                    *latest = order.dt_ordered;
                }
            }

            *index.org_account.entry((order.org_id, account_id)).or_insert(0) += 1;
            *index
                .org_account_article
                .entry((order.org_id, account_id, order.article.clone()))
                .or_insert(0) += 1;

            let stat = index
                .org_address
                .entry((order.org_id, address_id))
                .or_default();
            stat.count += 1;
            stat.latest = match stat.latest {
                Some(d) if d >= order.dt_ordered => Some(d),
                _ => Some(order.dt_ordered),
            };
        }

        Ok(index)
    }

    // ===== 公共池计数 =====

    /// T: 账户未取件订单数
    pub fn open_orders_on_account(&self, account_id: i64) -> i64 {
        self.account_open.get(&account_id).copied().unwrap_or(0)
    }

    /// W: 地址未取件订单数
    pub fn open_orders_at_address(&self, address_id: i64) -> i64 {
        self.address_open.get(&address_id).copied().unwrap_or(0)
    }

    /// HH: 地址上有未取件订单的不同账户数
    pub fn open_accounts_at_address(&self, address_id: i64) -> i64 {
        self.address_open_accounts
            .get(&address_id)
            .map(|s| s.len() as i64)
            .unwrap_or(0)
    }

    /// 账户最近一笔未取件订单日期
    pub fn latest_open_order(&self, account_id: i64) -> Option<NaiveDate> {
        self.latest_open_order.get(&account_id).copied()
    }

    /// 账户最早订单日期 (注册日期缺失时的替代)
    pub fn earliest_order(&self, account_id: i64) -> Option<NaiveDate> {
        self.earliest_order.get(&account_id).copied()
    }

    // ===== 组织维度计数 =====

    /// I: 组织在该账户的历史订单数
    pub fn org_orders_on_account(&self, org_id: i64, account_id: i64) -> i64 {
        self.org_account
            .get(&(org_id, account_id))
            .copied()
            .unwrap_or(0)
    }

    /// I1: 组织在该账户的某文章历史订单数
    pub fn org_article_orders_on_account(&self, org_id: i64, account_id: i64, article: &str) -> i64 {
        self.org_account_article
            .get(&(org_id, account_id, article.to_string()))
            .copied()
            .unwrap_or(0)
    }

    /// (H, M): 组织在该地址的历史订单数与最近日期
    pub fn org_history_at_address(&self, org_id: i64, address_id: i64) -> (i64, Option<NaiveDate>) {
        self.org_address
            .get(&(org_id, address_id))
            .map(|s| (s.count, s.latest))
            .unwrap_or((0, None))
    }
}
