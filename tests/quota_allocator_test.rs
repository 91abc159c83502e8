// ==========================================
// QuotaAllocator 集成测试
// ==========================================
// 测试目标: 配额拆分总和恒等于需求量, 重分规则
// ==========================================

mod test_helpers;

use pickup_planner::engine::QuotaAllocator;
use std::collections::HashMap;
use test_helpers::*;

#[test]
fn test_shares_always_sum_to_amount() {
    let allocator = QuotaAllocator::new();
    let configs = [
        vec![0.5, 0.3, 0.2],
        vec![0.7, 0.3],
        vec![0.34, 0.33, 0.33],
        vec![0.25, 0.25, 0.25, 0.25],
        vec![1.0],
    ];

    for percents in &configs {
        let contractors: Vec<_> = percents
            .iter()
            .enumerate()
            .map(|(i, p)| create_test_contractor(i as i64 + 1, *p))
            .collect();
        for amount in 0..=60 {
            let quotas = allocator.allocate(1, amount, &contractors).unwrap();
            let total: i64 = quotas.iter().map(|q| q.cap).sum();
            assert_eq!(total, amount as i64, "percents={:?} amount={}", percents, amount);
            assert!(quotas.iter().all(|q| q.cap >= 0));
        }
    }
}

#[test]
fn test_17_over_three_contractors() {
    let contractors = vec![
        create_test_contractor(3, 0.2),
        create_test_contractor(1, 0.5),
        create_test_contractor(2, 0.3),
    ];

    let quotas = QuotaAllocator::new().allocate(1, 17, &contractors).unwrap();
    let caps: Vec<(i64, i64)> = quotas.iter().map(|q| (q.contractor_id, q.cap)).collect();

    // 8.5 → 8 (五成双), 5.1 → 5, 最后一家吸收 4
    assert_eq!(caps, vec![(1, 8), (2, 5), (3, 4)]);
}

#[test]
fn test_redistribute_keeps_total() {
    let allocator = QuotaAllocator::new();
    let contractors = vec![
        create_test_contractor(1, 0.5),
        create_test_contractor(2, 0.3),
        create_test_contractor(3, 0.2),
    ];
    let quotas = allocator.allocate(1, 10, &contractors).unwrap();

    // 承运商 2 用满, 1 和 3 各缺 2
    let usage: HashMap<i64, i64> = [(1, 3), (2, 3), (3, 0)].into_iter().collect();
    let next = allocator.redistribute(10, &quotas, &usage);
    let caps: HashMap<i64, i64> = next.iter().map(|q| (q.contractor_id, q.cap)).collect();

    assert_eq!(caps[&1], 3);
    assert_eq!(caps[&3], 0);
    assert_eq!(caps[&2], 7);
}
