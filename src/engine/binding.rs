// ==========================================
// 取件账户分配系统 - 结果行绑定
// ==========================================
// 职责: 将服务器的全部提交打散后绑定到结果行
// - 非 VIP 行: 取本组织首个未绑定提交
// - VIP 行: 取本组织且文章一致的首个未绑定提交
// 打散使用可复现种子 (未提供时随机)
// ==========================================

use crate::domain::plan::{Commitment, ResultRow};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;

pub struct ResultBinder {
    rng: StdRng,
}

impl ResultBinder {
    pub fn new(seed: Option<u64>) -> Self {
        let rng = match seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_os_rng(),
        };
        Self { rng }
    }

    /// 绑定提交到结果行
    ///
    /// # 返回
    /// - 成功绑定的行数
    pub fn bind(&mut self, rows: &mut [ResultRow], commitments: &[Commitment]) -> usize {
        let (mut regular, mut vip): (Vec<&Commitment>, Vec<&Commitment>) =
            commitments.iter().partition(|c| !c.vip);
        regular.shuffle(&mut self.rng);
        vip.shuffle(&mut self.rng);

        let mut bound = 0;
        bound += Self::bind_pass(rows, &regular, |row, c| c.org_id == row.org_id);
        bound += Self::bind_pass(rows, &vip, |row, c| {
            c.org_id == row.org_id && c.article == row.article
        });
        bound
    }

    fn bind_pass<F>(rows: &mut [ResultRow], pool: &[&Commitment], matches: F) -> usize
    where
        F: Fn(&ResultRow, &Commitment) -> bool,
    {
        let mut taken = vec![false; pool.len()];
        let mut bound = 0;

        for row in rows.iter_mut().filter(|r| r.account_id.is_none()) {
            let hit = pool
                .iter()
                .enumerate()
                .find(|(i, c)| !taken[*i] && matches(row, c));
            if let Some((i, c)) = hit {
                taken[i] = true;
                row.account_id = Some(c.account_id);
                row.account_number = Some(c.account_number.clone());
                row.address_id = Some(c.address_id);
                row.address = Some(c.address.clone());
                bound += 1;
            }
        }

        bound
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn create_test_row(row_no: usize, org_id: i64, article: &str) -> ResultRow {
        ResultRow {
            row_no,
            task_id: row_no as i64 * 10,
            org_id,
            org_title: format!("ORG{}", org_id),
            article: article.to_string(),
            size: None,
            keyword: None,
            price: None,
            account_id: None,
            account_number: None,
            address_id: None,
            address: None,
            scheduled_at: None,
        }
    }

    fn create_test_commitment(org_id: i64, article: &str, account_id: i64, vip: bool) -> Commitment {
        Commitment {
            org_id,
            slot: 0,
            article: article.to_string(),
            account_id,
            account_number: format!("N{}", account_id),
            address_id: account_id + 100,
            address: format!("ADDR{}", account_id),
            contractor_id: 1,
            af: 100.0,
            vip,
        }
    }

    #[test]
    fn test_vip_rows_match_article() {
        let mut rows = vec![
            create_test_row(1, 1, "A"),
            create_test_row(2, 2, "X"),
            create_test_row(3, 2, "Y"),
        ];
        let commitments = vec![
            create_test_commitment(1, "A", 11, false),
            create_test_commitment(2, "Y", 21, true),
            create_test_commitment(2, "X", 22, true),
        ];

        let bound = ResultBinder::new(Some(7)).bind(&mut rows, &commitments);

        assert_eq!(bound, 3);
        assert_eq!(rows[0].account_id, Some(11));
        assert_eq!(rows[1].account_id, Some(22));
        assert_eq!(rows[2].account_id, Some(21));
    }

    #[test]
    fn test_same_seed_same_binding() {
        let rows: Vec<ResultRow> = (1..=5).map(|i| create_test_row(i, 1, "A")).collect();
        let commitments: Vec<Commitment> =
            (1..=5).map(|i| create_test_commitment(1, "A", i, false)).collect();

        let mut a = rows.clone();
        let mut b = rows.clone();
        ResultBinder::new(Some(42)).bind(&mut a, &commitments);
        ResultBinder::new(Some(42)).bind(&mut b, &commitments);

        assert_eq!(a, b);
        let mut ids: Vec<i64> = a.iter().filter_map(|r| r.account_id).collect();
        ids.sort();
        assert_eq!(ids, vec![1, 2, 3, 4, 5]);
    }

    #[test]
    fn test_unmatched_rows_stay_unbound() {
        let mut rows = vec![create_test_row(1, 1, "A"), create_test_row(2, 1, "A")];
        let commitments = vec![create_test_commitment(1, "A", 11, false)];

        let bound = ResultBinder::new(Some(1)).bind(&mut rows, &commitments);

        assert_eq!(bound, 1);
        assert!(rows.iter().any(|r| r.account_id.is_none()));
    }
}
