// ==========================================
// ScheduleBuilder 集成测试
// ==========================================
// 测试目标: 步长升级级联与时间格约束
// 覆盖范围: 全天 / 收缩点 / 动态步长 / 不可行
// ==========================================

mod test_helpers;

use chrono::Duration;
use pickup_planner::domain::ScheduleConfig;
use pickup_planner::engine::{EngineError, ScheduleBuilder, StepStrategy};
use test_helpers::*;

/// 480 分钟窗口, 最大步长 10, 最小步长 2
fn create_480_schedule(first_point: (u32, u32)) -> ScheduleConfig {
    ScheduleConfig {
        title: "480".to_string(),
        time_min_min_per_step: 2.0,
        time_max_min_per_step: 10.0,
        time_start: hm(9, 0),
        time_end: hm(17, 0),
        time_first_point: hm(first_point.0, first_point.1),
        time_second_point: hm(13, 0),
    }
}

#[test]
fn test_full_day_fits_without_escalation() {
    let grid = ScheduleBuilder::new()
        .build(&create_480_schedule((16, 0)), plan_date(), 48)
        .unwrap();

    assert_eq!(grid.strategy, StepStrategy::FullDayMaxStep);
    assert_eq!(grid.step, Duration::minutes(10));
    assert_eq!(grid.len(), 48);
}

#[test]
fn test_50_tasks_escalate_past_full_day() {
    // 全天最大步长只有 48 格 < 50
    let schedule = create_480_schedule((16, 0));
    let grid = ScheduleBuilder::new()
        .build(&schedule, plan_date(), 50)
        .unwrap();

    // 收缩到 16:00 (42 格) 仍不足, 动态步长 42/50 × 10 分钟 = 8分24秒
    assert_eq!(grid.strategy, StepStrategy::FirstPointDynamic);
    assert_eq!(grid.step, Duration::seconds(504));
    assert!(grid.step >= Duration::minutes(2));
    assert_eq!(grid.len(), 50);
    assert_eq!(grid.end, plan_date().and_time(hm(16, 0)));
    assert!(grid.step * grid.len() as i32 <= grid.window());
}

#[test]
fn test_second_point_used_when_first_dynamic_too_small() {
    // 第一收缩点与起点重合: 0 格, 动态步长为 0 < 最小步长
    let mut schedule = create_480_schedule((9, 0));
    schedule.time_second_point = hm(17, 0);

    let grid = ScheduleBuilder::new()
        .build(&schedule, plan_date(), 50)
        .unwrap();

    // 第二收缩点 17:00: 48 格 < 50 → 动态步长 9分36秒
    assert_eq!(grid.strategy, StepStrategy::SecondPointDynamic);
    assert_eq!(grid.step, Duration::seconds(576));
    assert_eq!(grid.len(), 50);
    assert!(grid.step * grid.len() as i32 <= grid.window());
}

#[test]
fn test_infeasible_schedule() {
    let result = ScheduleBuilder::new().build(&create_tight_schedule(), plan_date(), 5);
    assert!(matches!(result, Err(EngineError::ScheduleInfeasible(_))));
}

#[test]
fn test_cells_start_at_window_start() {
    let grid = ScheduleBuilder::new()
        .build(&create_test_schedule(), plan_date(), 3)
        .unwrap();

    assert_eq!(grid.cells[0].at, plan_date().and_time(hm(9, 0)));
    assert!(grid
        .cells
        .windows(2)
        .all(|w| w[1].at - w[0].at == grid.step));
    assert!(grid.cells.iter().all(|c| c.org_id.is_none()));
}
