// ==========================================
// 取件账户分配系统 - 分配会话状态
// ==========================================
// AllocationSession: 编排器持有的累计状态 (跨组织、跨服务器)
//   - 地址提交次数 (K 的来源, 地址独占)
//   - 地址上已选账户 (占用计数 JJ)
//   - 承运商 × 账户使用次数 (J, 每个服务器重置)
// AttemptLedger: 单次尝试的增量覆盖层, 只读引用基线
//   尝试被丢弃时基线不受影响; 组织完成后 merge 增量
// ==========================================

use std::collections::{HashMap, HashSet};

#[derive(Debug, Clone, Default)]
pub struct AllocationSession {
    address_commits: HashMap<i64, i64>,
    selected_at_address: HashMap<i64, HashSet<i64>>,
    contractor_usage: HashMap<(i64, i64), i64>,
}

impl AllocationSession {
    pub fn new() -> Self {
        Self::default()
    }

    /// 进入新服务器: 仅重置承运商 × 账户使用次数
    pub fn begin_server(&mut self) {
        self.contractor_usage.clear();
    }

    pub fn address_commits(&self, address_id: i64) -> i64 {
        self.address_commits.get(&address_id).copied().unwrap_or(0)
    }

    pub fn is_address_used(&self, address_id: i64) -> bool {
        self.address_commits(address_id) > 0
    }

    /// 本次运行已占用的地址数
    pub fn used_address_count(&self) -> usize {
        self.address_commits.len()
    }

    /// 开启一次尝试
    pub fn ledger(&self) -> AttemptLedger<'_> {
        AttemptLedger {
            base: self,
            delta: AttemptDelta::default(),
        }
    }

    /// 合并已接受尝试的增量
    pub fn merge(&mut self, delta: AttemptDelta) {
        for (address_id, n) in delta.address_commits {
            *self.address_commits.entry(address_id).or_insert(0) += n;
        }
        for (address_id, accounts) in delta.selected_at_address {
            self.selected_at_address
                .entry(address_id)
                .or_default()
                .extend(accounts);
        }
        for (key, n) in delta.contractor_usage {
            *self.contractor_usage.entry(key).or_insert(0) += n;
        }
    }
}

/// 单次尝试产生的增量
#[derive(Debug, Clone, Default)]
pub struct AttemptDelta {
    address_commits: HashMap<i64, i64>,
    selected_at_address: HashMap<i64, HashSet<i64>>,
    contractor_usage: HashMap<(i64, i64), i64>,
    /// 组织内: contractor_id → 选取数
    contractor_picks: HashMap<i64, i64>,
    /// 组织内: account_id → 已选文章
    articles_on_account: HashMap<i64, Vec<String>>,
}

impl AttemptDelta {
    /// contractor_id → 本次尝试使用量
    pub fn contractor_picks(&self) -> &HashMap<i64, i64> {
        &self.contractor_picks
    }
}

// ==========================================
// AttemptLedger - 基线 + 增量 的组合视图
// ==========================================
pub struct AttemptLedger<'a> {
    base: &'a AllocationSession,
    delta: AttemptDelta,
}

impl AttemptLedger<'_> {
    /// K: 地址在本次运行的提交次数
    pub fn address_commits(&self, address_id: i64) -> i64 {
        self.base.address_commits(address_id)
            + self.delta.address_commits.get(&address_id).copied().unwrap_or(0)
    }

    pub fn is_address_used(&self, address_id: i64) -> bool {
        self.address_commits(address_id) > 0
    }

    /// JJ: 地址上已选的不同账户数
    pub fn selected_accounts_at(&self, address_id: i64) -> i64 {
        let base = self.base.selected_at_address.get(&address_id);
        let mut n = base.map(|s| s.len()).unwrap_or(0);
        if let Some(extra) = self.delta.selected_at_address.get(&address_id) {
            n += extra
                .iter()
                .filter(|a| base.map(|s| !s.contains(a)).unwrap_or(true))
                .count();
        }
        n as i64
    }

    /// J: 账户在该承运商下的使用次数 (当前服务器)
    pub fn contractor_account_usage(&self, contractor_id: i64, account_id: i64) -> i64 {
        let key = (contractor_id, account_id);
        self.base.contractor_usage.get(&key).copied().unwrap_or(0)
            + self.delta.contractor_usage.get(&key).copied().unwrap_or(0)
    }

    /// 本次尝试该承运商已选数
    pub fn contractor_picks(&self, contractor_id: i64) -> i64 {
        self.delta
            .contractor_picks
            .get(&contractor_id)
            .copied()
            .unwrap_or(0)
    }

    /// I2: 本次尝试该账户选取某文章的次数
    pub fn article_picks(&self, account_id: i64, article: &str) -> i64 {
        self.delta
            .articles_on_account
            .get(&account_id)
            .map(|arts| arts.iter().filter(|a| a.as_str() == article).count() as i64)
            .unwrap_or(0)
    }

    /// co: 本次尝试该账户的选取总数
    pub fn account_picks(&self, account_id: i64) -> i64 {
        self.delta
            .articles_on_account
            .get(&account_id)
            .map(|arts| arts.len() as i64)
            .unwrap_or(0)
    }

    /// 记录一次提交
    pub fn record(&mut self, account_id: i64, address_id: i64, contractor_id: i64, article: &str) {
        *self.delta.address_commits.entry(address_id).or_insert(0) += 1;
        self.delta
            .selected_at_address
            .entry(address_id)
            .or_default()
            .insert(account_id);
        *self
            .delta
            .contractor_usage
            .entry((contractor_id, account_id))
            .or_insert(0) += 1;
        *self.delta.contractor_picks.entry(contractor_id).or_insert(0) += 1;
        self.delta
            .articles_on_account
            .entry(account_id)
            .or_default()
            .push(article.to_string());
    }

    pub fn into_delta(self) -> AttemptDelta {
        self.delta
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_discarded_attempt_leaves_baseline_untouched() {
        let session = AllocationSession::new();
        {
            let mut ledger = session.ledger();
            ledger.record(1, 10, 100, "A1");
            assert_eq!(ledger.address_commits(10), 1);
            assert!(ledger.is_address_used(10));
        }
        assert_eq!(session.address_commits(10), 0);
        assert_eq!(session.used_address_count(), 0);
    }

    #[test]
    fn test_merge_and_server_reset() {
        let mut session = AllocationSession::new();
        let mut ledger = session.ledger();
        ledger.record(1, 10, 100, "A1");
        ledger.record(2, 10, 100, "A1");
        assert_eq!(ledger.selected_accounts_at(10), 2);
        assert_eq!(ledger.article_picks(1, "A1"), 1);
        assert_eq!(ledger.account_picks(2), 1);
        let delta = ledger.into_delta();
        session.merge(delta);

        let ledger = session.ledger();
        assert_eq!(ledger.address_commits(10), 2);
        assert_eq!(ledger.contractor_account_usage(100, 1), 1);
        // 组织内计数不跨尝试
        assert_eq!(ledger.contractor_picks(100), 0);
        assert_eq!(ledger.article_picks(1, "A1"), 0);
        drop(ledger);

        session.begin_server();
        let ledger = session.ledger();
        assert_eq!(ledger.contractor_account_usage(100, 1), 0);
        assert_eq!(ledger.address_commits(10), 2);
        assert_eq!(ledger.selected_accounts_at(10), 2);
    }
}
