// ==========================================
// 取件账户分配系统 - 公共池准入过滤
// ==========================================
// 职责: 从服务器全部账户中筛出可用 (账户, 地址, 承运商) 条目
// 规则顺序 (首个命中即排除):
//   1. 黑名单  2. 账户未启用  3. 地址未启用
//   4. 最近未取件订单超出闲置窗口  5. 注册日期超出生命周期
//   6. 承运商未在本服务器配置  7. T 超出承运商区间
// 红线: 每个被排除账户都输出原因码; 相同输入得到相同结果
// ==========================================

use crate::config::PlannerSettings;
use crate::domain::account::{Account, Address};
use crate::domain::candidate::PoolEntry;
use crate::domain::decision_log::DecisionLogEntry;
use crate::domain::server::Server;
use crate::domain::types::PoolExclusionReason;
use crate::engine::history::OrderHistoryIndex;
use chrono::{Duration, NaiveDate};
use std::collections::{HashMap, HashSet};
use tracing::{debug, info, instrument};

// ==========================================
// EligibilityFilter - 公共池准入过滤器
// ==========================================
// 红线: 不直接写库, 只计算并返回公共池与原因
pub struct EligibilityFilter {
    last_order_days: i64,
    account_life_days: i64,
}

impl EligibilityFilter {
    pub fn new(settings: &PlannerSettings) -> Self {
        Self {
            last_order_days: settings.last_order_days,
            account_life_days: settings.account_life_days,
        }
    }

    /// 构建服务器公共池
    ///
    /// # 参数
    /// - server: 服务器 (含承运商配置)
    /// - accounts: 账户列表 (仅处理 server_id 匹配的账户, 保持输入顺序)
    /// - addresses: address_id → 地址
    /// - history: 历史订单索引
    /// - blacklist: 当日黑名单账户号
    /// - today: 运行当日
    ///
    /// # 返回
    /// - (公共池, 决策日志条目)
    #[instrument(skip_all, fields(server_id = server.id))]
    pub fn build_pool(
        &self,
        server: &Server,
        accounts: &[Account],
        addresses: &HashMap<i64, Address>,
        history: &OrderHistoryIndex,
        blacklist: &HashSet<String>,
        today: NaiveDate,
    ) -> (Vec<PoolEntry>, Vec<DecisionLogEntry>) {
        let mut pool = Vec::new();
        let mut entries = Vec::new();

        for account in accounts.iter().filter(|a| a.server_id == server.id) {
            let address = addresses.get(&account.address_id);
            match self.evaluate(server, account, address, history, blacklist, today) {
                Ok(entry) => {
                    entries.push(DecisionLogEntry::PoolAdmitted {
                        account_id: entry.account_id,
                        account_number: entry.account_number.clone(),
                        address_id: entry.address_id,
                        contractor_id: entry.contractor.contractor_id,
                        t: entry.t,
                        w: entry.w,
                    });
                    pool.push(entry);
                }
                Err(reason) => {
                    debug!(
                        account_id = account.id,
                        reason = %reason,
                        "账户排除出公共池"
                    );
                    entries.push(DecisionLogEntry::PoolExcluded {
                        account_id: account.id,
                        account_number: account.number.clone(),
                        reason,
                    });
                }
            }
        }

        info!(
            pool_size = pool.len(),
            excluded = entries.len() - pool.len(),
            "公共池构建完成"
        );

        (pool, entries)
    }

    /// 评估单个账户
    ///
    /// # 返回
    /// - Ok(PoolEntry): 准入, 带 T / W / 承运商配置
    /// - Err(reason): 首个命中的排除原因
    pub fn evaluate(
        &self,
        server: &Server,
        account: &Account,
        address: Option<&Address>,
        history: &OrderHistoryIndex,
        blacklist: &HashSet<String>,
        today: NaiveDate,
    ) -> Result<PoolEntry, PoolExclusionReason> {
        // === 规则 1-3: 黑名单 / 启用状态 ===
        if blacklist.contains(&account.number) {
            return Err(PoolExclusionReason::Blacklisted);
        }
        if !account.is_active {
            return Err(PoolExclusionReason::AccountInactive);
        }
        let address = match address {
            Some(a) if a.is_active => a,
            _ => return Err(PoolExclusionReason::AddressInactive),
        };

        // === 规则 4: 闲置窗口 ===
        if let Some(last_order) = history.latest_open_order(account.id) {
            if last_order + Duration::days(self.last_order_days) < today {
                return Err(PoolExclusionReason::StaleLastOrder {
                    last_order,
                    window_days: self.last_order_days,
                });
            }
        }

        // === 规则 5: 生命周期窗口 ===
        let reg_date = account
            .reg_date
            .or_else(|| history.earliest_order(account.id))
            .unwrap_or(today);
        if reg_date + Duration::days(self.account_life_days) < today {
            return Err(PoolExclusionReason::AccountExpired {
                reg_date,
                age_days: (today - reg_date).num_days(),
                window_days: self.account_life_days,
            });
        }

        // === 规则 6: 承运商 ===
        let contractor = server.contractor(address.contractor_id).ok_or(
            PoolExclusionReason::ContractorNotOnServer {
                contractor_id: address.contractor_id,
            },
        )?;

        // === 规则 7: T 区间 ===
        let t = history.open_orders_on_account(account.id);
        if !contractor.t_in_range(t) {
            return Err(PoolExclusionReason::ActiveLoadOutOfRange {
                t,
                min: contractor.load_t_min,
                max: contractor.load_t_max,
            });
        }

        Ok(PoolEntry {
            account_id: account.id,
            account_number: account.number.clone(),
            address_id: address.id,
            address: address.address.clone(),
            district: address.district.clone(),
            contractor: contractor.clone(),
            t,
            w: history.open_orders_at_address(address.id),
        })
    }
}
