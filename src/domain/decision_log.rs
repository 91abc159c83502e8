// ==========================================
// 取件账户分配系统 - 结构化决策日志
// ==========================================
// 职责: 每个服务器一份、只追加的决策记录
// 覆盖: 公共池排除原因 / 组织候选准入与拒绝 / 分数 / 提交 / 配额对账
// 红线: 日志与报表渲染解耦 (渲染见 report 模块)
// ==========================================

use crate::domain::candidate::CandidateScores;
use crate::domain::types::{AttemptState, CandidateRejection, PoolExclusionReason};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// 承运商配额对账 (配额 vs 实际)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuotaTally {
    pub contractor_id: i64,
    pub contractor_name: String,
    pub cap: i64,
    pub used: i64,
}

// ==========================================
// DecisionLogEntry - 单条决策记录
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DecisionLogEntry {
    PoolExcluded {
        account_id: i64,
        account_number: String,
        reason: PoolExclusionReason,
    },
    PoolAdmitted {
        account_id: i64,
        account_number: String,
        address_id: i64,
        contractor_id: i64,
        t: i64,
        w: i64,
    },
    CandidateAdmitted {
        org_id: i64,
        attempt: AttemptState,
        account_id: i64,
        i: i64,
        h: i64,
        m: Option<NaiveDate>,
    },
    CandidateRejected {
        org_id: i64,
        attempt: AttemptState,
        slot: Option<usize>,
        account_id: i64,
        reason: CandidateRejection,
    },
    CandidateScored {
        org_id: i64,
        attempt: AttemptState,
        slot: usize,
        account_id: i64,
        scores: CandidateScores,
    },
    Committed {
        org_id: i64,
        attempt: AttemptState,
        slot: usize,
        article: String,
        account_id: i64,
        address_id: i64,
        contractor_id: i64,
        scores: CandidateScores,
    },
    SlotUnfilled {
        org_id: i64,
        attempt: AttemptState,
        slot: usize,
        article: String,
        /// 原因码 → 被拒候选数
        rejections: BTreeMap<String, usize>,
    },
    QuotaTallied {
        org_id: i64,
        attempt: AttemptState,
        tally: QuotaTally,
    },
    OrganizationFinished {
        org_id: i64,
        amount: usize,
        committed: usize,
        shortfall: usize,
        final_state: AttemptState,
        attempts: usize,
    },
    ScheduleFailed {
        reason: String,
    },
}

impl DecisionLogEntry {
    pub fn kind(&self) -> &'static str {
        match self {
            DecisionLogEntry::PoolExcluded { .. } => "POOL_EXCLUDED",
            DecisionLogEntry::PoolAdmitted { .. } => "POOL_ADMITTED",
            DecisionLogEntry::CandidateAdmitted { .. } => "CANDIDATE_ADMITTED",
            DecisionLogEntry::CandidateRejected { .. } => "CANDIDATE_REJECTED",
            DecisionLogEntry::CandidateScored { .. } => "CANDIDATE_SCORED",
            DecisionLogEntry::Committed { .. } => "COMMITTED",
            DecisionLogEntry::SlotUnfilled { .. } => "SLOT_UNFILLED",
            DecisionLogEntry::QuotaTallied { .. } => "QUOTA_TALLIED",
            DecisionLogEntry::OrganizationFinished { .. } => "ORGANIZATION_FINISHED",
            DecisionLogEntry::ScheduleFailed { .. } => "SCHEDULE_FAILED",
        }
    }
}

// ==========================================
// DecisionLog - 服务器级决策日志 (只追加)
// ==========================================
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DecisionLog {
    pub server_id: i64,
    entries: Vec<DecisionLogEntry>,
}

impl DecisionLog {
    pub fn new(server_id: i64) -> Self {
        Self {
            server_id,
            entries: Vec::new(),
        }
    }

    pub fn push(&mut self, entry: DecisionLogEntry) {
        self.entries.push(entry);
    }

    pub fn extend(&mut self, entries: impl IntoIterator<Item = DecisionLogEntry>) {
        self.entries.extend(entries);
    }

    pub fn entries(&self) -> &[DecisionLogEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// 公共池排除原因 (account_id → reason), 便于校验与展示
    pub fn pool_exclusions(&self) -> Vec<(i64, &PoolExclusionReason)> {
        self.entries
            .iter()
            .filter_map(|e| match e {
                DecisionLogEntry::PoolExcluded {
                    account_id, reason, ..
                } => Some((*account_id, reason)),
                _ => None,
            })
            .collect()
    }
}
