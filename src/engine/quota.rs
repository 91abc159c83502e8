// ==========================================
// 取件账户分配系统 - 承运商配额分配
// ==========================================
// 职责: 将组织需求量按承运商比例拆分为配额上限
// 规则:
// - 按比例降序, 除最后一家外取 round(amount × percent) (四舍六入五成双)
// - 任何一家不超过剩余未分配量, 最后一家吸收余数 (总和恒等于 amount)
// - 尝试2重分: 未达上限的承运商固定为已用量, 其余量在达上限者之间按相对比例重分
// ==========================================

use crate::domain::server::ContractorConfig;
use crate::engine::error::{EngineError, EngineResult};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::HashMap;
use tracing::debug;

/// 单个承运商在一次尝试中的配额
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContractorQuota {
    pub contractor_id: i64,
    pub contractor_name: String,
    pub load_percent: f64,
    pub cap: i64,
}

#[derive(Debug, Default, Clone, Copy)]
pub struct QuotaAllocator;

impl QuotaAllocator {
    pub fn new() -> Self {
        Self
    }

    /// 初始配额
    ///
    /// # 错误
    /// - NoContractors: 服务器无承运商配置
    pub fn allocate(
        &self,
        server_id: i64,
        amount: usize,
        contractors: &[ContractorConfig],
    ) -> EngineResult<Vec<ContractorQuota>> {
        if contractors.is_empty() {
            return Err(EngineError::NoContractors { server_id });
        }

        let mut sorted: Vec<&ContractorConfig> = contractors.iter().collect();
        sorted.sort_by(|a, b| {
            b.load_percent
                .partial_cmp(&a.load_percent)
                .unwrap_or(Ordering::Equal)
        });

        let amount = amount as i64;
        let shares: Vec<f64> = sorted.iter().map(|c| amount as f64 * c.load_percent).collect();
        let caps = split_with_remainder(amount, &shares);

        let quotas: Vec<ContractorQuota> = sorted
            .iter()
            .zip(caps)
            .map(|(c, cap)| ContractorQuota {
                contractor_id: c.contractor_id,
                contractor_name: c.contractor_name.clone(),
                load_percent: c.load_percent,
                cap,
            })
            .collect();

        debug!(amount, quotas = ?quotas.iter().map(|q| q.cap).collect::<Vec<_>>(), "初始配额");
        Ok(quotas)
    }

    /// 尝试2配额重分
    ///
    /// # 参数
    /// - amount: 组织需求量
    /// - previous: 上一次尝试的配额
    /// - usage: contractor_id → 上一次尝试实际使用量
    ///
    /// # 规则
    /// - usage < cap: 供给已耗尽, 固定为 usage
    /// - usage >= cap: 参与重分 work_left = amount - 固定量之和
    /// - 参与者比例和为 0 时均分
    pub fn redistribute(
        &self,
        amount: usize,
        previous: &[ContractorQuota],
        usage: &HashMap<i64, i64>,
    ) -> Vec<ContractorQuota> {
        let used = |q: &ContractorQuota| usage.get(&q.contractor_id).copied().unwrap_or(0);

        let mut work_left = amount as i64;
        let mut working: Vec<&ContractorQuota> = Vec::new();
        let mut caps: HashMap<i64, i64> = HashMap::new();

        for q in previous {
            let u = used(q);
            if u < q.cap {
                caps.insert(q.contractor_id, u);
                work_left -= u;
            } else {
                working.push(q);
            }
        }
        let work_left = work_left.max(0);

        let percents_sum: f64 = working.iter().map(|q| q.load_percent).sum();
        let shares: Vec<f64> = working
            .iter()
            .map(|q| {
                if percents_sum > 0.0 {
                    work_left as f64 * q.load_percent / percents_sum
                } else {
                    work_left as f64 / working.len() as f64
                }
            })
            .collect();

        for (q, cap) in working.iter().zip(split_with_remainder(work_left, &shares)) {
            caps.insert(q.contractor_id, cap);
        }

        let quotas: Vec<ContractorQuota> = previous
            .iter()
            .map(|q| ContractorQuota {
                cap: caps.get(&q.contractor_id).copied().unwrap_or(0),
                ..q.clone()
            })
            .collect();

        debug!(
            amount,
            work_left,
            quotas = ?quotas.iter().map(|q| (q.contractor_id, q.cap)).collect::<Vec<_>>(),
            "配额重分"
        );
        quotas
    }
}

/// 按份额拆分 total: 前 n-1 项取整 (不超过剩余), 最后一项吸收余数
fn split_with_remainder(total: i64, shares: &[f64]) -> Vec<i64> {
    let Some((_, head)) = shares.split_last() else {
        return Vec::new();
    };

    let mut remaining = total;
    let mut caps = Vec::with_capacity(shares.len());
    for share in head {
        let mut cap = (share.round_ties_even() as i64).max(0);
        if cap >= remaining {
            cap = remaining;
            remaining = 0;
        } else {
            remaining -= cap;
        }
        caps.push(cap);
    }
    caps.push(remaining);
    caps
}
