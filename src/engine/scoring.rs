// ==========================================
// 取件账户分配系统 - 候选评分引擎
// ==========================================
// 职责: 负载修剪 (K, L) + 两轮归一化 + 综合排名 AF
// 第一轮: X Z AB AD    第二轮: Y AA AC AE    最终: AF
// 红线: 每次选取前基于当前候选集重新计算所有最大值, 不缓存
// ==========================================

use crate::config::PlannerSettings;
use crate::domain::candidate::Candidate;
use crate::domain::types::CandidateRejection;
use chrono::NaiveDate;
use std::cmp::Ordering;

/// 最大值为 0 时的兜底
const ZERO_MAX_FLOOR: f64 = 100.0;

/// 评分常量 (r2 r3 r4 + 权重 l2..l5)
#[derive(Debug, Clone, Copy)]
pub struct ScoringEngine {
    r2: f64,
    r3: f64,
    r4: f64,
    l2: f64,
    l3: f64,
    l4: f64,
    l5: f64,
}

impl ScoringEngine {
    pub fn new(settings: &PlannerSettings) -> Self {
        Self {
            r2: settings.r2,
            r3: settings.r3,
            r4: settings.r4,
            l2: settings.l2,
            l3: settings.l3,
            l4: settings.l4,
            l5: settings.l5,
        }
    }

    /// 负载修剪: 计算 K 与 L = K + W, 移除 L 超出承运商区间的候选
    ///
    /// # 参数
    /// - address_commits: address_id → 本次运行已提交次数 (K)
    ///
    /// # 返回
    /// - 被移除的候选及原因 (移除对本次尝试永久生效)
    pub fn prune_by_load<F>(
        &self,
        candidates: &mut Vec<Candidate>,
        address_commits: F,
    ) -> Vec<(Candidate, CandidateRejection)>
    where
        F: Fn(i64) -> i64,
    {
        let mut pruned = Vec::new();
        let mut kept = Vec::with_capacity(candidates.len());

        for mut c in candidates.drain(..) {
            c.k = address_commits(c.address_id());
            c.l = c.k + c.entry.w;
            if c.entry.contractor.l_in_range(c.l) {
                kept.push(c);
            } else {
                let reason = CandidateRejection::AddressLoadOutOfRange {
                    l: c.l,
                    min: c.entry.contractor.load_l_min,
                    max: c.entry.contractor.load_l_max,
                };
                pruned.push((c, reason));
            }
        }

        *candidates = kept;
        pruned
    }

    /// 计算全部分数并按 AF 降序排序 (平局按公共池原始顺序)
    pub fn score(&self, candidates: &mut [Candidate], today: NaiveDate) {
        if candidates.is_empty() {
            return;
        }

        self.first_pass(candidates, today);
        self.second_pass(candidates);
        self.composite(candidates);

        candidates.sort_by(|a, b| {
            b.af.partial_cmp(&a.af)
                .unwrap_or(Ordering::Equal)
                .then(a.pool_index.cmp(&b.pool_index))
        });
    }

    // ===== 第一轮: X Z AB AD =====
    fn first_pass(&self, candidates: &mut [Candidate], today: NaiveDate) {
        let max_h = candidates.iter().map(|c| c.h).max().unwrap_or(0);
        let max_h = if max_h == 0 { ZERO_MAX_FLOOR } else { max_h as f64 };

        for c in candidates.iter_mut() {
            c.x = (max_h - c.h as f64) / max_h * 100.0;

            c.z = match c.m {
                None => self.r2 + 10.0,
                Some(_) if c.h == 0 => self.r2,
                Some(m) => {
                    let t = (today - m).num_days() as f64;
                    if t > self.r2 {
                        self.r2 + t * self.r3
                    } else {
                        t
                    }
                }
            };

            let l = c.l as f64;
            c.ab = if c.l == 0 {
                0.0
            } else if l >= self.r4 {
                self.r4 - 1.0
            } else {
                l
            };

            c.ad = if c.entry.t == 0 {
                0.0
            } else {
                self.r4 - c.entry.t as f64
            };
        }
    }

    // ===== 第二轮: Y AA AC AE =====
    fn second_pass(&self, candidates: &mut [Candidate]) {
        let max_x = floor_zero(max_of(candidates, |c| c.x));
        let max_z = if candidates.iter().any(|c| c.m.is_none()) {
            self.r2 + 10.0
        } else {
            max_of(candidates, |c| c.z)
        };
        let max_z = floor_zero(max_z);

        for c in candidates.iter_mut() {
            c.y = c.x / max_x * 100.0;
            c.aa = c.z / max_z * 100.0;
            c.ac = c.ab / (self.r4 - 1.0) * 100.0;
            c.ae = c.ad / self.r4 * 100.0;
        }
    }

    // ===== 综合排名 AF =====
    fn composite(&self, candidates: &mut [Candidate]) {
        let denominator = max_of(candidates, |c| c.y) * self.l2
            + max_of(candidates, |c| c.aa) * self.l3
            + max_of(candidates, |c| c.ac) * self.l4
            + max_of(candidates, |c| c.ae) * self.l5;

        for c in candidates.iter_mut() {
            let numerator = c.y * self.l2 + c.aa * self.l3 + c.ac * self.l4 + c.ae * self.l5;
            c.af = if denominator == 0.0 {
                0.0
            } else {
                numerator * 100.0 / denominator
            };
        }
    }
}

fn max_of<F>(candidates: &[Candidate], f: F) -> f64
where
    F: Fn(&Candidate) -> f64,
{
    candidates.iter().map(f).fold(f64::MIN, f64::max)
}

fn floor_zero(v: f64) -> f64 {
    if v == 0.0 {
        ZERO_MAX_FLOOR
    } else {
        v
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::candidate::PoolEntry;
    use crate::domain::server::ContractorConfig;
    use chrono::Duration;

    fn create_test_contractor(l_min: i64, l_max: i64) -> ContractorConfig {
        ContractorConfig {
            contractor_id: 1,
            contractor_name: "C1".to_string(),
            load_percent: 1.0,
            load_j_min: 0,
            load_j_max: 100,
            load_l_min: l_min,
            load_l_max: l_max,
            load_t_min: 0,
            load_t_max: 100,
            load_i: 100,
            load_m: NaiveDate::from_ymd_opt(2099, 1, 1).unwrap(),
        }
    }

    fn create_test_candidate(
        idx: usize,
        address_id: i64,
        t: i64,
        w: i64,
        h: i64,
        m: Option<NaiveDate>,
    ) -> Candidate {
        let entry = PoolEntry {
            account_id: idx as i64 + 1,
            account_number: format!("ACC{}", idx),
            address_id,
            address: format!("ADDR{}", address_id),
            district: None,
            contractor: create_test_contractor(0, 100),
            t,
            w,
        };
        Candidate::new(idx, entry, 0, h, m)
    }

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 10, 19).unwrap()
    }

    #[test]
    fn test_fresh_candidates_tie_at_100() {
        let engine = ScoringEngine::new(&PlannerSettings::default());
        let mut cs: Vec<Candidate> = (0..3)
            .map(|i| create_test_candidate(i, i as i64 + 10, 0, 0, 0, None))
            .collect();

        engine.prune_by_load(&mut cs, |_| 0);
        engine.score(&mut cs, today());

        for c in &cs {
            assert!((c.af - 100.0).abs() < 1e-9, "af={}", c.af);
            assert_eq!(c.x, 100.0);
            assert_eq!(c.z, 40.0);
        }
        let order: Vec<usize> = cs.iter().map(|c| c.pool_index).collect();
        assert_eq!(order, vec![0, 1, 2]);
    }

    #[test]
    fn test_recency_decay_branches() {
        let engine = ScoringEngine::new(&PlannerSettings::default());
        let recent = today() - Duration::days(5);
        let old = today() - Duration::days(40);
        let mut cs = vec![
            create_test_candidate(0, 10, 0, 0, 2, Some(recent)),
            create_test_candidate(1, 11, 0, 0, 1, Some(old)),
        ];

        engine.score(&mut cs, today());

        let by_idx = |i: usize| cs.iter().find(|c| c.pool_index == i).unwrap().clone();
        assert_eq!(by_idx(0).z, 5.0);
        // 40 > r2 → r2 + 40 * r3
        assert_eq!(by_idx(1).z, 30.0 + 40.0 * 0.5);
        // maxH = 2
        assert_eq!(by_idx(0).x, 0.0);
        assert_eq!(by_idx(1).x, 50.0);
    }

    #[test]
    fn test_load_clamps() {
        let engine = ScoringEngine::new(&PlannerSettings::default());
        let mut cs = vec![
            create_test_candidate(0, 10, 3, 12, 0, None),
            create_test_candidate(1, 11, 0, 4, 0, None),
        ];

        engine.prune_by_load(&mut cs, |_| 0);
        engine.score(&mut cs, today());

        let heavy = cs.iter().find(|c| c.pool_index == 0).unwrap();
        assert_eq!(heavy.ab, 9.0); // L >= r4 → r4 - 1
        assert_eq!(heavy.ad, 7.0);
        assert_eq!(heavy.ac, 100.0);
        let light = cs.iter().find(|c| c.pool_index == 1).unwrap();
        assert_eq!(light.ab, 4.0);
        assert_eq!(light.ad, 0.0); // T == 0
    }

    #[test]
    fn test_prune_removes_out_of_range_load() {
        let engine = ScoringEngine::new(&PlannerSettings::default());
        let mut cs = vec![
            create_test_candidate(0, 10, 0, 1, 0, None),
            create_test_candidate(1, 11, 0, 1, 0, None),
        ];
        for c in cs.iter_mut() {
            c.entry.contractor = create_test_contractor(0, 1);
        }

        let pruned = engine.prune_by_load(&mut cs, |addr| if addr == 10 { 1 } else { 0 });

        assert_eq!(cs.len(), 1);
        assert_eq!(cs[0].address_id(), 11);
        assert_eq!(pruned.len(), 1);
        assert_eq!(
            pruned[0].1,
            CandidateRejection::AddressLoadOutOfRange { l: 2, min: 0, max: 1 }
        );
    }
}
