// ==========================================
// 取件账户分配系统 - 报表渲染
// ==========================================
// 结果表: 每个任务一行, 以行号 / 任务ID 为键
// 追踪表: 每条决策日志一行, 含原因码与全部中间分数
// ==========================================

use crate::domain::candidate::CandidateScores;
use crate::domain::decision_log::{DecisionLog, DecisionLogEntry};
use crate::domain::plan::ResultRow;
use crate::report::error::{ReportError, ReportResult};
use chrono::format::{Item, StrftimeItems};
use chrono::NaiveDateTime;
use csv::Writer;
use std::fmt::Write as _;

const RESULT_HEADER: [&str; 11] = [
    "row_no",
    "task_id",
    "organization",
    "article",
    "quantity",
    "size",
    "keyword",
    "address",
    "account",
    "scheduled_at",
    "price",
];

const TRACE_HEADER: [&str; 25] = [
    "kind",
    "organization",
    "attempt",
    "slot",
    "account",
    "address",
    "contractor",
    "reason",
    "detail",
    "T",
    "W",
    "I",
    "H",
    "M",
    "K",
    "L",
    "X",
    "Z",
    "AB",
    "AD",
    "Y",
    "AA",
    "AC",
    "AE",
    "AF",
];

/// 追踪表单行 (空字段输出为空串)
#[derive(Debug, Default)]
struct TraceRow {
    kind: &'static str,
    org_id: Option<i64>,
    attempt: Option<String>,
    slot: Option<usize>,
    account_id: Option<i64>,
    address_id: Option<i64>,
    contractor_id: Option<i64>,
    reason: Option<String>,
    detail: String,
    scores: Option<CandidateScores>,
}

impl TraceRow {
    fn into_record(self) -> Vec<String> {
        let opt = |v: Option<String>| v.unwrap_or_default();
        let mut record = vec![
            self.kind.to_string(),
            opt(self.org_id.map(|v| v.to_string())),
            opt(self.attempt),
            opt(self.slot.map(|v| v.to_string())),
            opt(self.account_id.map(|v| v.to_string())),
            opt(self.address_id.map(|v| v.to_string())),
            opt(self.contractor_id.map(|v| v.to_string())),
            opt(self.reason),
            self.detail,
        ];
        match self.scores {
            Some(s) => record.extend([
                s.t.to_string(),
                s.w.to_string(),
                s.i.to_string(),
                s.h.to_string(),
                opt(s.m.map(|d| d.to_string())),
                s.k.to_string(),
                s.l.to_string(),
                format_score(s.x),
                format_score(s.z),
                format_score(s.ab),
                format_score(s.ad),
                format_score(s.y),
                format_score(s.aa),
                format_score(s.ac),
                format_score(s.ae),
                format_score(s.af),
            ]),
            None => record.extend((0..16).map(|_| String::new())),
        }
        record
    }
}

fn format_score(v: f64) -> String {
    format!("{:.4}", v)
}

// ==========================================
// ReportRenderer - CSV 渲染器
// ==========================================
pub struct ReportRenderer {
    time_format: String,
}

impl ReportRenderer {
    /// 创建渲染器 (校验 strftime 格式)
    pub fn new(time_format: &str) -> ReportResult<Self> {
        if time_format.is_empty()
            || StrftimeItems::new(time_format).any(|item| matches!(item, Item::Error))
        {
            return Err(ReportError::InvalidTimeFormat(time_format.to_string()));
        }
        Ok(Self {
            time_format: time_format.to_string(),
        })
    }

    fn format_time(&self, at: NaiveDateTime) -> String {
        let mut out = String::new();
        // 格式已在构造时校验
        if write!(out, "{}", at.format(&self.time_format)).is_err() {
            out.clear();
        }
        out
    }

    /// 渲染结果表
    pub fn render_results(&self, rows: &[ResultRow]) -> ReportResult<Vec<u8>> {
        let mut wtr = Writer::from_writer(Vec::new());
        wtr.write_record(RESULT_HEADER)?;

        for row in rows {
            wtr.write_record([
                row.row_no.to_string(),
                row.task_id.to_string(),
                row.org_title.clone(),
                row.article.clone(),
                "1".to_string(),
                row.size.clone().unwrap_or_default(),
                row.keyword.clone().unwrap_or_default(),
                row.address.clone().unwrap_or_default(),
                row.account_number.clone().unwrap_or_default(),
                row.scheduled_at
                    .map(|at| self.format_time(at))
                    .unwrap_or_default(),
                row.price.map(|p| p.to_string()).unwrap_or_default(),
            ])?;
        }

        Ok(wtr.into_inner()?)
    }

    /// 渲染追踪表
    pub fn render_trace(&self, log: &DecisionLog) -> ReportResult<Vec<u8>> {
        let mut wtr = Writer::from_writer(Vec::new());
        wtr.write_record(TRACE_HEADER)?;

        for entry in log.entries() {
            wtr.write_record(trace_row(entry).into_record())?;
        }

        Ok(wtr.into_inner()?)
    }
}

fn trace_row(entry: &DecisionLogEntry) -> TraceRow {
    let kind = entry.kind();
    match entry {
        DecisionLogEntry::PoolExcluded {
            account_id,
            account_number,
            reason,
        } => TraceRow {
            kind,
            account_id: Some(*account_id),
            reason: Some(reason.code().to_string()),
            detail: format!("{} {}", account_number, reason),
            ..Default::default()
        },
        DecisionLogEntry::PoolAdmitted {
            account_id,
            account_number,
            address_id,
            contractor_id,
            t,
            w,
        } => TraceRow {
            kind,
            account_id: Some(*account_id),
            address_id: Some(*address_id),
            contractor_id: Some(*contractor_id),
            detail: format!("{} T={} W={}", account_number, t, w),
            ..Default::default()
        },
        DecisionLogEntry::CandidateAdmitted {
            org_id,
            attempt,
            account_id,
            i,
            h,
            m,
        } => TraceRow {
            kind,
            org_id: Some(*org_id),
            attempt: Some(attempt.to_string()),
            account_id: Some(*account_id),
            detail: format!(
                "I={} H={} M={}",
                i,
                h,
                m.map(|d| d.to_string()).unwrap_or_else(|| "-".to_string())
            ),
            ..Default::default()
        },
        DecisionLogEntry::CandidateRejected {
            org_id,
            attempt,
            slot,
            account_id,
            reason,
        } => TraceRow {
            kind,
            org_id: Some(*org_id),
            attempt: Some(attempt.to_string()),
            slot: *slot,
            account_id: Some(*account_id),
            reason: Some(reason.code().to_string()),
            detail: reason.to_string(),
            ..Default::default()
        },
        DecisionLogEntry::CandidateScored {
            org_id,
            attempt,
            slot,
            account_id,
            scores,
        } => TraceRow {
            kind,
            org_id: Some(*org_id),
            attempt: Some(attempt.to_string()),
            slot: Some(*slot),
            account_id: Some(*account_id),
            scores: Some(scores.clone()),
            ..Default::default()
        },
        DecisionLogEntry::Committed {
            org_id,
            attempt,
            slot,
            article,
            account_id,
            address_id,
            contractor_id,
            scores,
        } => TraceRow {
            kind,
            org_id: Some(*org_id),
            attempt: Some(attempt.to_string()),
            slot: Some(*slot),
            account_id: Some(*account_id),
            address_id: Some(*address_id),
            contractor_id: Some(*contractor_id),
            detail: article.clone(),
            scores: Some(scores.clone()),
            ..Default::default()
        },
        DecisionLogEntry::SlotUnfilled {
            org_id,
            attempt,
            slot,
            article,
            rejections,
        } => TraceRow {
            kind,
            org_id: Some(*org_id),
            attempt: Some(attempt.to_string()),
            slot: Some(*slot),
            detail: format!(
                "{} [{}]",
                article,
                rejections
                    .iter()
                    .map(|(code, n)| format!("{}={}", code, n))
                    .collect::<Vec<_>>()
                    .join(";")
            ),
            ..Default::default()
        },
        DecisionLogEntry::QuotaTallied {
            org_id,
            attempt,
            tally,
        } => TraceRow {
            kind,
            org_id: Some(*org_id),
            attempt: Some(attempt.to_string()),
            contractor_id: Some(tally.contractor_id),
            detail: format!(
                "{} cap={} used={}",
                tally.contractor_name, tally.cap, tally.used
            ),
            ..Default::default()
        },
        DecisionLogEntry::OrganizationFinished {
            org_id,
            amount,
            committed,
            shortfall,
            final_state,
            attempts,
        } => TraceRow {
            kind,
            org_id: Some(*org_id),
            attempt: Some(final_state.to_string()),
            detail: format!(
                "amount={} committed={} shortfall={} attempts={}",
                amount, committed, shortfall, attempts
            ),
            ..Default::default()
        },
        DecisionLogEntry::ScheduleFailed { reason } => TraceRow {
            kind,
            detail: reason.clone(),
            ..Default::default()
        },
    }
}
