// ==========================================
// 取件账户分配系统 - 组织分配循环
// ==========================================
// 职责: 单个组织的逐槽位贪心选取 + 逐级升级重试
// 每个槽位: 负载修剪 → 重新评分 → 按 AF 顺序取首个通过校验的候选
// 校验顺序:
//   (a) VIP 文章独占 / 次数上限
//   (b) 地址未被占用
//   (c) 承运商配额未满
//   (d) 地址并发占用未超限 (T != 0 时豁免)
//   (e) 账户在承运商下的使用次数 J 在区间内
// 升级: 见 engine::attempt (尝试2 重分配额 + 占用偏移, 尝试3 接受结果)
// ==========================================

use crate::domain::candidate::{Candidate, PoolEntry};
use crate::domain::decision_log::{DecisionLogEntry, QuotaTally};
use crate::domain::plan::{Commitment, OrganizationOutcome};
use crate::domain::server::ContractorConfig;
use crate::domain::types::{AttemptState, CandidateRejection};
use crate::engine::attempt::{is_terminal, next_state, occupancy_offset, runs_allocation};
use crate::engine::error::EngineResult;
use crate::engine::history::OrderHistoryIndex;
use crate::engine::quota::{ContractorQuota, QuotaAllocator};
use crate::engine::scoring::ScoringEngine;
use crate::engine::session::{AllocationSession, AttemptDelta, AttemptLedger};
use chrono::NaiveDate;
use std::collections::BTreeMap;
use tracing::{debug, info, instrument, warn};

// ==========================================
// OrganizationDemand - 组织当日需求
// ==========================================
#[derive(Debug, Clone, PartialEq)]
pub struct OrganizationDemand {
    pub org_id: i64,
    pub org_title: String,
    /// 槽位 i 对应组织第 i 个任务的文章
    pub articles: Vec<String>,
    /// VIP 每账户允许次数 (非 VIP 为 None)
    pub vip_allowance: Option<i64>,
}

impl OrganizationDemand {
    pub fn amount(&self) -> usize {
        self.articles.len()
    }

    pub fn is_vip(&self) -> bool {
        self.vip_allowance.is_some()
    }
}

/// 组织分配结果
#[derive(Debug, Clone)]
pub struct OrganizationAllocation {
    pub outcome: OrganizationOutcome,
    pub commitments: Vec<Commitment>,
    pub log: Vec<DecisionLogEntry>,
}

/// 单次尝试的结果 (未合并)
struct AttemptRun {
    delta: AttemptDelta,
    quotas: Vec<ContractorQuota>,
    commitments: Vec<Commitment>,
    tallies: Vec<QuotaTally>,
}

// ==========================================
// AssignmentLoop - 分配循环
// ==========================================
pub struct AssignmentLoop<'a> {
    scoring: ScoringEngine,
    quota: QuotaAllocator,
    history: &'a OrderHistoryIndex,
    server_id: i64,
    contractors: &'a [ContractorConfig],
    today: NaiveDate,
}

impl<'a> AssignmentLoop<'a> {
    pub fn new(
        scoring: ScoringEngine,
        history: &'a OrderHistoryIndex,
        server_id: i64,
        contractors: &'a [ContractorConfig],
        today: NaiveDate,
    ) -> Self {
        Self {
            scoring,
            quota: QuotaAllocator::new(),
            history,
            server_id,
            contractors,
            today,
        }
    }

    /// 分配单个组织
    ///
    /// 会话只在组织完成后合并被接受的尝试
    #[instrument(skip(self, demand, pool, session), fields(
        server_id = self.server_id,
        org_id = demand.org_id,
        amount = demand.amount(),
        vip = demand.is_vip()
    ))]
    pub fn allocate(
        &self,
        demand: &OrganizationDemand,
        pool: &[PoolEntry],
        session: &mut AllocationSession,
    ) -> EngineResult<OrganizationAllocation> {
        let amount = demand.amount();
        let mut log = Vec::new();

        let mut state = AttemptState::Attempt1;
        let mut quotas = self.quota.allocate(self.server_id, amount, self.contractors)?;
        let mut accepted: Option<AttemptRun> = None;
        let mut attempts = 0;

        while runs_allocation(state) {
            if let Some(previous) = &accepted {
                quotas = self
                    .quota
                    .redistribute(amount, &previous.quotas, previous.delta.contractor_picks());
            }

            let run = self.run_attempt(demand, pool, &quotas, state, session, &mut log);
            attempts += 1;

            let committed = run.commitments.len();
            let next = next_state(state, committed, amount);
            info!(attempt = %state, committed, next = %next, "分配尝试结束");

            accepted = Some(run);
            state = next;
        }
        debug_assert!(is_terminal(state));

        let (delta, commitments, tallies) = match accepted {
            Some(run) => (run.delta, run.commitments, run.tallies),
            None => (AttemptDelta::default(), Vec::new(), Vec::new()),
        };
        session.merge(delta);

        let committed = commitments.len();
        let shortfall = amount.saturating_sub(committed);
        if shortfall > 0 {
            warn!(
                org_id = demand.org_id,
                amount,
                committed,
                shortfall,
                "组织需求未完全满足, 按尽力结果接受"
            );
        }

        log.push(DecisionLogEntry::OrganizationFinished {
            org_id: demand.org_id,
            amount,
            committed,
            shortfall,
            final_state: state,
            attempts,
        });

        Ok(OrganizationAllocation {
            outcome: OrganizationOutcome {
                org_id: demand.org_id,
                org_title: demand.org_title.clone(),
                amount,
                committed,
                shortfall,
                final_state: state,
                attempts,
                tallies,
            },
            commitments,
            log,
        })
    }

    // ==========================================
    // 单次尝试
    // ==========================================
    fn run_attempt(
        &self,
        demand: &OrganizationDemand,
        pool: &[PoolEntry],
        quotas: &[ContractorQuota],
        state: AttemptState,
        session: &AllocationSession,
        log: &mut Vec<DecisionLogEntry>,
    ) -> AttemptRun {
        let mut ledger = session.ledger();
        let offset = occupancy_offset(state);
        let org_id = demand.org_id;

        // === 候选构建 ===
        let mut candidates = Vec::new();
        for (idx, entry) in pool.iter().enumerate() {
            match self.build_candidate(demand, idx, entry) {
                Ok(c) => {
                    log.push(DecisionLogEntry::CandidateAdmitted {
                        org_id,
                        attempt: state,
                        account_id: c.account_id(),
                        i: c.i,
                        h: c.h,
                        m: c.m,
                    });
                    candidates.push(c);
                }
                Err(reason) => log.push(DecisionLogEntry::CandidateRejected {
                    org_id,
                    attempt: state,
                    slot: None,
                    account_id: entry.account_id,
                    reason,
                }),
            }
        }

        // === 逐槽位选取 ===
        let mut commitments = Vec::new();
        for (slot, article) in demand.articles.iter().enumerate() {
            let pruned = self
                .scoring
                .prune_by_load(&mut candidates, |address_id| ledger.address_commits(address_id));
            for (c, reason) in pruned {
                log.push(DecisionLogEntry::CandidateRejected {
                    org_id,
                    attempt: state,
                    slot: Some(slot),
                    account_id: c.account_id(),
                    reason,
                });
            }

            if candidates.is_empty() {
                debug!(slot, "候选耗尽");
                log.push(DecisionLogEntry::SlotUnfilled {
                    org_id,
                    attempt: state,
                    slot,
                    article: article.clone(),
                    rejections: BTreeMap::new(),
                });
                break;
            }

            self.scoring.score(&mut candidates, self.today);

            if slot == 0 {
                log.extend(candidates.iter().map(|c| DecisionLogEntry::CandidateScored {
                    org_id,
                    attempt: state,
                    slot,
                    account_id: c.account_id(),
                    scores: c.scores(),
                }));
            }

            let mut rejections: BTreeMap<String, usize> = BTreeMap::new();
            let mut picked: Option<&Candidate> = None;
            for c in candidates.iter() {
                match self.check(demand, article, c, quotas, &ledger, offset) {
                    Ok(()) => {
                        picked = Some(c);
                        break;
                    }
                    Err(reason) => {
                        *rejections.entry(reason.code().to_string()).or_insert(0) += 1;
                    }
                }
            }

            match picked {
                Some(c) => {
                    ledger.record(c.account_id(), c.address_id(), c.contractor_id(), article);
                    debug!(
                        slot,
                        account_id = c.account_id(),
                        address_id = c.address_id(),
                        contractor_id = c.contractor_id(),
                        af = c.af,
                        "槽位提交"
                    );
                    log.push(DecisionLogEntry::Committed {
                        org_id,
                        attempt: state,
                        slot,
                        article: article.clone(),
                        account_id: c.account_id(),
                        address_id: c.address_id(),
                        contractor_id: c.contractor_id(),
                        scores: c.scores(),
                    });
                    commitments.push(Commitment {
                        org_id,
                        slot,
                        article: article.clone(),
                        account_id: c.account_id(),
                        account_number: c.entry.account_number.clone(),
                        address_id: c.address_id(),
                        address: c.entry.address.clone(),
                        contractor_id: c.contractor_id(),
                        af: c.af,
                        vip: demand.is_vip(),
                    });
                }
                None => log.push(DecisionLogEntry::SlotUnfilled {
                    org_id,
                    attempt: state,
                    slot,
                    article: article.clone(),
                    rejections,
                }),
            }
        }

        // === 配额对账 ===
        let tallies: Vec<QuotaTally> = quotas
            .iter()
            .map(|q| QuotaTally {
                contractor_id: q.contractor_id,
                contractor_name: q.contractor_name.clone(),
                cap: q.cap,
                used: ledger.contractor_picks(q.contractor_id),
            })
            .collect();
        log.extend(tallies.iter().map(|t| DecisionLogEntry::QuotaTallied {
            org_id,
            attempt: state,
            tally: t.clone(),
        }));

        AttemptRun {
            delta: ledger.into_delta(),
            quotas: quotas.to_vec(),
            commitments,
            tallies,
        }
    }

    /// 构建组织候选 (I / H / M), 并应用构建阶段的排除规则
    fn build_candidate(
        &self,
        demand: &OrganizationDemand,
        pool_index: usize,
        entry: &PoolEntry,
    ) -> Result<Candidate, CandidateRejection> {
        let i = self
            .history
            .org_orders_on_account(demand.org_id, entry.account_id);

        match demand.vip_allowance {
            None if i != 0 => return Err(CandidateRejection::AlreadyOrdered { i }),
            Some(allowance) if i >= allowance => {
                return Err(CandidateRejection::VipAllowanceExhausted { i, allowance })
            }
            _ => {}
        }

        let (h, m) = self
            .history
            .org_history_at_address(demand.org_id, entry.address_id);
        if let Some(last_order) = m {
            if last_order > entry.contractor.load_m {
                return Err(CandidateRejection::ReuseCutoff {
                    last_order,
                    cutoff: entry.contractor.load_m,
                });
            }
        }

        Ok(Candidate::new(pool_index, entry.clone(), i, h, m))
    }

    /// 槽位选取校验 (a)-(e)
    fn check(
        &self,
        demand: &OrganizationDemand,
        article: &str,
        c: &Candidate,
        quotas: &[ContractorQuota],
        ledger: &AttemptLedger<'_>,
        offset: i64,
    ) -> Result<(), CandidateRejection> {
        let account_id = c.account_id();
        let address_id = c.address_id();
        let contractor = &c.entry.contractor;

        // (a) VIP 文章独占
        if let Some(allowance) = demand.vip_allowance {
            let i1 = self
                .history
                .org_article_orders_on_account(demand.org_id, account_id, article);
            let i2 = ledger.article_picks(account_id, article);
            let co = ledger.account_picks(account_id);
            if i1 + i2 != 0 || c.i + co >= allowance {
                return Err(CandidateRejection::VipArticleConflict {
                    article: article.to_string(),
                });
            }
        }

        // (b) 地址独占
        if ledger.is_address_used(address_id) {
            return Err(CandidateRejection::AddressAlreadyUsed);
        }

        // (c) 配额
        let has_capacity = quotas
            .iter()
            .find(|q| q.contractor_id == contractor.contractor_id)
            .map(|q| ledger.contractor_picks(q.contractor_id) < q.cap)
            .unwrap_or(false);
        if !has_capacity {
            return Err(CandidateRejection::ContractorQuotaFull {
                contractor_id: contractor.contractor_id,
            });
        }

        // (d) 地址并发占用
        let occupancy = self.history.open_accounts_at_address(address_id)
            + ledger.selected_accounts_at(address_id)
            - offset;
        if occupancy >= contractor.load_i && c.entry.t == 0 {
            return Err(CandidateRejection::OccupancyExceeded {
                occupancy,
                limit: contractor.load_i,
            });
        }

        // (e) J 区间
        let j = ledger.contractor_account_usage(contractor.contractor_id, account_id);
        if !contractor.j_in_range(j) {
            return Err(CandidateRejection::ContractorUsageOutOfRange {
                j,
                min: contractor.load_j_min,
                max: contractor.load_j_max,
            });
        }

        Ok(())
    }
}
