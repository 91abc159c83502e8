// ==========================================
// PlannerRepository 集成测试
// ==========================================
// 测试目标: 文件数据库上的加载与落库
// 覆盖范围: 输入快照、任务更新事务、运行历史
// ==========================================

mod test_helpers;

use chrono::NaiveDateTime;
use pickup_planner::db::open_sqlite_connection;
use pickup_planner::domain::{PlanHistoryRecord, TaskUpdate};
use pickup_planner::repository::PlannerRepository;
use pickup_planner::OrderStatus;
use test_helpers::*;

fn run_at(h: u32) -> NaiveDateTime {
    today().and_time(hm(h, 0))
}

fn history_record(server_id: i64, result: Option<&str>, h: u32) -> PlanHistoryRecord {
    PlanHistoryRecord {
        server_id,
        run_at: run_at(h),
        logs_artifact: format!("logs-{}.csv", h),
        result_artifact: result.map(str::to_string),
    }
}

#[test]
fn test_load_plan_input_snapshot() {
    let (_temp_file, db_path) = create_test_db().unwrap();
    seed_two_server_scenario(&db_path);
    {
        let conn = open_sqlite_connection(&db_path).unwrap();
        insert_history_order(&conn, 500, 100, Some(1), "Z", ymd(2026, 10, 1), None);
        // 非计划日任务不加载
        insert_task(&conn, 600, 100, "Z", ymd(2026, 10, 21));
    }

    let repo = PlannerRepository::new(&db_path).unwrap();
    let input = repo.load_plan_input(plan_date()).unwrap();

    assert_eq!(input.servers.len(), 2);
    let server1 = input.servers.iter().find(|s| s.id == 1).unwrap();
    assert_eq!(server1.contractors.len(), 2);
    assert_eq!(server1.schedule.time_first_point, hm(15, 0));
    let server2 = input.servers.iter().find(|s| s.id == 2).unwrap();
    assert_eq!(server2.schedule.time_end, hm(9, 30));

    assert_eq!(input.accounts.len(), 4);
    assert_eq!(input.addresses.len(), 4);
    assert_eq!(input.organizations.len(), 2);
    assert_eq!(input.tasks.len(), 8);
    assert!(input.tasks.iter().all(|t| t.status == OrderStatus::Planned));
    assert!(input.tasks.iter().all(|t| t.planned_date == plan_date()));
    let task = input.tasks.iter().find(|t| t.id == 1000).unwrap();
    assert_eq!(task.org_title, "ORG100");

    assert_eq!(input.history.len(), 1);
    assert_eq!(input.history[0].account_id, Some(1));
    assert!(input.history[0].is_open());
}

#[test]
fn test_history_without_account_is_loaded_as_is() {
    let (_temp_file, db_path) = create_test_db().unwrap();
    seed_two_server_scenario(&db_path);
    {
        let conn = open_sqlite_connection(&db_path).unwrap();
        insert_history_order(&conn, 500, 100, None, "Z", ymd(2026, 10, 1), None);
    }

    let repo = PlannerRepository::new(&db_path).unwrap();
    let history = repo.load_order_history().unwrap();

    assert_eq!(history.len(), 1);
    assert_eq!(history[0].account_id, None);
}

#[test]
fn test_apply_server_plan_updates_planned_tasks_once() {
    let (_temp_file, db_path) = create_test_db().unwrap();
    seed_two_server_scenario(&db_path);
    let repo = PlannerRepository::new(&db_path).unwrap();

    let scheduled = plan_date().and_time(hm(9, 0));
    let updates = vec![
        TaskUpdate {
            task_id: 1000,
            status: OrderStatus::Queued,
            account_id: 1,
            address_id: 11,
            scheduled_at: Some(scheduled),
        },
        TaskUpdate {
            task_id: 1001,
            status: OrderStatus::Queued,
            account_id: 3,
            address_id: 13,
            scheduled_at: None,
        },
    ];

    let updated = repo
        .apply_server_plan(&updates, &history_record(1, Some("result.csv"), 8))
        .unwrap();
    assert_eq!(updated, 2);

    // 重复落库不会覆盖已出队任务
    let updated_again = repo
        .apply_server_plan(&updates, &history_record(1, Some("result.csv"), 9))
        .unwrap();
    assert_eq!(updated_again, 0);

    let conn = open_sqlite_connection(&db_path).unwrap();
    let (status, account_id, address_id, at): (String, i64, i64, Option<NaiveDateTime>) = conn
        .query_row(
            "SELECT status, account_id, address_id, scheduled_at FROM orders WHERE id = 1000",
            [],
            |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?)),
        )
        .unwrap();
    assert_eq!(status, OrderStatus::Queued.as_str());
    assert_eq!((account_id, address_id), (1, 11));
    assert_eq!(at, Some(scheduled));

    let untouched: String = conn
        .query_row("SELECT status FROM orders WHERE id = 1002", [], |row| row.get(0))
        .unwrap();
    assert_eq!(untouched, OrderStatus::Planned.as_str());

    assert_eq!(repo.list_history(1).unwrap().len(), 2);
}

#[test]
fn test_history_listed_newest_first() {
    let (_temp_file, db_path) = create_test_db().unwrap();
    seed_two_server_scenario(&db_path);
    let repo = PlannerRepository::new(&db_path).unwrap();

    let first = repo.record_history(&history_record(2, None, 8)).unwrap();
    let second = repo
        .record_history(&history_record(2, Some("r.csv"), 10))
        .unwrap();
    assert!(second > first);

    let history = repo.list_history(2).unwrap();
    assert_eq!(history.len(), 2);
    assert_eq!(history[0], history_record(2, Some("r.csv"), 10));
    assert_eq!(history[1].result_artifact, None);
    assert!(repo.list_history(1).unwrap().is_empty());
}
