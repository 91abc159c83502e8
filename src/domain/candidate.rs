// ==========================================
// 取件账户分配系统 - 公共池条目与候选
// ==========================================
// 候选为显式结构体: 计数器 T W H M I K L + 派生分数 X Z AB AD Y AA AC AE AF
// 生命周期: 仅存在于单个组织的单次尝试内
// ==========================================

use crate::domain::server::ContractorConfig;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

// ==========================================
// PoolEntry - 公共池条目 (准入过滤后)
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PoolEntry {
    pub account_id: i64,
    pub account_number: String,
    pub address_id: i64,
    pub address: String,
    pub district: Option<String>,
    pub contractor: ContractorConfig,
    pub t: i64, // 账户未取件订单数
    pub w: i64, // 地址未取件订单数
}

// ==========================================
// Candidate - 组织维度的评分候选
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Candidate {
    /// 在公共池中的原始位置 (稳定排序的平局依据)
    pub pool_index: usize,
    pub entry: PoolEntry,

    // ===== 组织相关计数 =====
    pub i: i64,                 // 组织在该账户的历史订单数
    pub h: i64,                 // 组织在该地址的历史订单数
    pub m: Option<NaiveDate>,   // 组织在该地址的最近订单日期

    // ===== 运行期计数 =====
    pub k: i64, // 本次运行已提交到该地址的次数
    pub l: i64, // K + W

    // ===== 第一轮派生 =====
    pub x: f64,
    pub z: f64,
    pub ab: f64,
    pub ad: f64,

    // ===== 第二轮归一化 =====
    pub y: f64,
    pub aa: f64,
    pub ac: f64,
    pub ae: f64,

    // ===== 综合排名 =====
    pub af: f64,
}

impl Candidate {
    /// 由公共池条目构建候选 (分数归零, 待评分引擎计算)
    pub fn new(pool_index: usize, entry: PoolEntry, i: i64, h: i64, m: Option<NaiveDate>) -> Self {
        Self {
            pool_index,
            entry,
            i,
            h,
            m,
            k: 0,
            l: 0,
            x: 0.0,
            z: 0.0,
            ab: 0.0,
            ad: 0.0,
            y: 0.0,
            aa: 0.0,
            ac: 0.0,
            ae: 0.0,
            af: 0.0,
        }
    }

    pub fn account_id(&self) -> i64 {
        self.entry.account_id
    }

    pub fn address_id(&self) -> i64 {
        self.entry.address_id
    }

    pub fn contractor_id(&self) -> i64 {
        self.entry.contractor.contractor_id
    }

    /// 分数快照 (写入决策日志)
    pub fn scores(&self) -> CandidateScores {
        CandidateScores {
            t: self.entry.t,
            w: self.entry.w,
            i: self.i,
            h: self.h,
            m: self.m,
            k: self.k,
            l: self.l,
            x: self.x,
            z: self.z,
            ab: self.ab,
            ad: self.ad,
            y: self.y,
            aa: self.aa,
            ac: self.ac,
            ae: self.ae,
            af: self.af,
        }
    }
}

/// 候选全部中间量的快照
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CandidateScores {
    pub t: i64,
    pub w: i64,
    pub i: i64,
    pub h: i64,
    pub m: Option<NaiveDate>,
    pub k: i64,
    pub l: i64,
    pub x: f64,
    pub z: f64,
    pub ab: f64,
    pub ad: f64,
    pub y: f64,
    pub aa: f64,
    pub ac: f64,
    pub ae: f64,
    pub af: f64,
}
