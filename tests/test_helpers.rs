// ==========================================
// 测试辅助函数
// ==========================================
// 职责: 临时数据库、领域对象构建、SQL 种子数据
// ==========================================

#![allow(dead_code)]

use chrono::{NaiveDate, NaiveTime};
use pickup_planner::db::{init_schema, open_sqlite_connection};
use pickup_planner::domain::{
    Account, Address, ContractorConfig, OrderRecord, Organization, ScheduleConfig, Server, Task,
};
use pickup_planner::OrderStatus;
use rusqlite::{params, Connection};
use std::error::Error;
use tempfile::NamedTempFile;

/// 创建临时测试数据库并初始化 schema
///
/// # 返回
/// - NamedTempFile: 临时数据库文件（需要保持存活）
/// - String: 数据库文件路径
pub fn create_test_db() -> Result<(NamedTempFile, String), Box<dyn Error>> {
    let temp_file = NamedTempFile::new()?;
    let db_path = temp_file.path().to_str().unwrap().to_string();

    let conn = open_sqlite_connection(&db_path)?;
    init_schema(&conn)?;

    Ok((temp_file, db_path))
}

// ==========================================
// 日期
// ==========================================

pub fn today() -> NaiveDate {
    NaiveDate::from_ymd_opt(2026, 10, 19).unwrap()
}

pub fn plan_date() -> NaiveDate {
    NaiveDate::from_ymd_opt(2026, 10, 20).unwrap()
}

pub fn ymd(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

pub fn hm(h: u32, m: u32) -> NaiveTime {
    NaiveTime::from_hms_opt(h, m, 0).unwrap()
}

// ==========================================
// 领域对象构建
// ==========================================

/// 宽松区间的承运商配置
pub fn create_test_contractor(contractor_id: i64, load_percent: f64) -> ContractorConfig {
    ContractorConfig {
        contractor_id,
        contractor_name: format!("C{}", contractor_id),
        load_percent,
        load_j_min: 0,
        load_j_max: 100,
        load_l_min: 0,
        load_l_max: 100,
        load_t_min: 0,
        load_t_max: 100,
        load_i: 10,
        load_m: ymd(2099, 12, 31),
    }
}

/// 09:00 - 17:00, 收缩点 15:00 / 13:00, 步长 2 - 10 分钟
pub fn create_test_schedule() -> ScheduleConfig {
    ScheduleConfig {
        title: "day".to_string(),
        time_min_min_per_step: 2.0,
        time_max_min_per_step: 10.0,
        time_start: hm(9, 0),
        time_end: hm(17, 0),
        time_first_point: hm(15, 0),
        time_second_point: hm(13, 0),
    }
}

/// 30 分钟窗口, 固定 10 分钟步长 (最多 3 格)
pub fn create_tight_schedule() -> ScheduleConfig {
    ScheduleConfig {
        title: "tight".to_string(),
        time_min_min_per_step: 10.0,
        time_max_min_per_step: 10.0,
        time_start: hm(9, 0),
        time_end: hm(9, 30),
        time_first_point: hm(9, 20),
        time_second_point: hm(9, 10),
    }
}

pub fn create_test_server(id: i64, contractors: Vec<ContractorConfig>) -> Server {
    Server {
        id,
        number: format!("S{}", id),
        name: format!("server-{}", id),
        is_active: true,
        schedule: create_test_schedule(),
        contractors,
    }
}

pub fn create_test_address(id: i64, contractor_id: i64) -> Address {
    Address {
        id,
        address: format!("street {}", id),
        district: None,
        contractor_id,
        is_active: true,
    }
}

pub fn create_test_account(id: i64, address_id: i64, server_id: i64) -> Account {
    Account {
        id,
        number: format!("ACC{:03}", id),
        name: format!("account {}", id),
        is_active: true,
        reg_date: None,
        address_id,
        server_id,
    }
}

pub fn create_test_org(id: i64, server_id: i64) -> Organization {
    Organization {
        id,
        title: format!("ORG{}", id),
        server_id,
    }
}

/// 组织当日任务, id 从 first_id 起连续
pub fn create_test_tasks(first_id: i64, org_id: i64, articles: &[&str]) -> Vec<Task> {
    articles
        .iter()
        .enumerate()
        .map(|(i, article)| Task {
            id: first_id + i as i64,
            org_id,
            org_title: format!("ORG{}", org_id),
            article: article.to_string(),
            size: None,
            keyword: None,
            price: Some(1000),
            status: OrderStatus::Planned,
            planned_date: plan_date(),
        })
        .collect()
}

pub fn create_test_order(
    id: i64,
    account_id: Option<i64>,
    org_id: i64,
    article: &str,
    dt_ordered: NaiveDate,
    dt_collected: Option<NaiveDate>,
) -> OrderRecord {
    OrderRecord {
        id,
        account_id,
        org_id,
        article: article.to_string(),
        dt_ordered,
        dt_collected,
    }
}

// ==========================================
// SQL 种子数据
// ==========================================

pub fn insert_contractor(conn: &Connection, id: i64) {
    conn.execute(
        "INSERT INTO contractor (id, name) VALUES (?1, ?2)",
        params![id, format!("C{}", id)],
    )
    .unwrap();
}

pub fn insert_schedule(conn: &Connection, id: i64, schedule: &ScheduleConfig) {
    conn.execute(
        r#"
        INSERT INTO server_schedule (id, title, time_min_min_per_step, time_max_min_per_step,
            time_start, time_end, time_first_point, time_second_point)
        VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
        "#,
        params![
            id,
            schedule.title,
            schedule.time_min_min_per_step,
            schedule.time_max_min_per_step,
            schedule.time_start,
            schedule.time_end,
            schedule.time_first_point,
            schedule.time_second_point,
        ],
    )
    .unwrap();
}

pub fn insert_server(conn: &Connection, id: i64, schedule_id: i64) {
    conn.execute(
        "INSERT INTO server (id, number, name, is_active, schedule_id) VALUES (?1, ?2, ?3, 1, ?4)",
        params![id, format!("S{}", id), format!("server-{}", id), schedule_id],
    )
    .unwrap();
}

pub fn insert_server_contractor(conn: &Connection, server_id: i64, c: &ContractorConfig) {
    conn.execute(
        r#"
        INSERT INTO server_contractor (server_id, contractor_id, load_percent,
            load_j_min, load_j_max, load_l_min, load_l_max, load_t_min, load_t_max,
            load_i, load_m)
        VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)
        "#,
        params![
            server_id,
            c.contractor_id,
            c.load_percent,
            c.load_j_min,
            c.load_j_max,
            c.load_l_min,
            c.load_l_max,
            c.load_t_min,
            c.load_t_max,
            c.load_i,
            c.load_m,
        ],
    )
    .unwrap();
}

pub fn insert_address(conn: &Connection, id: i64, contractor_id: i64) {
    conn.execute(
        "INSERT INTO address (id, address, contractor_id, is_active) VALUES (?1, ?2, ?3, 1)",
        params![id, format!("street {}", id), contractor_id],
    )
    .unwrap();
}

pub fn insert_account(conn: &Connection, id: i64, address_id: i64, server_id: i64) {
    conn.execute(
        r#"
        INSERT INTO account (id, number, name, is_active, address_id, server_id)
        VALUES (?1, ?2, ?3, 1, ?4, ?5)
        "#,
        params![
            id,
            format!("ACC{:03}", id),
            format!("account {}", id),
            address_id,
            server_id
        ],
    )
    .unwrap();
}

pub fn insert_org(conn: &Connection, id: i64, server_id: i64) {
    conn.execute(
        "INSERT INTO organization (id, title, server_id) VALUES (?1, ?2, ?3)",
        params![id, format!("ORG{}", id), server_id],
    )
    .unwrap();
}

pub fn insert_task(conn: &Connection, id: i64, org_id: i64, article: &str, planned: NaiveDate) {
    conn.execute(
        r#"
        INSERT INTO orders (id, org_id, article, price, status, dt_planned)
        VALUES (?1, ?2, ?3, 1000, ?4, ?5)
        "#,
        params![id, org_id, article, OrderStatus::Planned.as_str(), planned],
    )
    .unwrap();
}

pub fn insert_history_order(
    conn: &Connection,
    id: i64,
    org_id: i64,
    account_id: Option<i64>,
    article: &str,
    ordered: NaiveDate,
    collected: Option<NaiveDate>,
) {
    let status = if collected.is_some() {
        OrderStatus::Collected
    } else {
        OrderStatus::Ordered
    };
    conn.execute(
        r#"
        INSERT INTO orders (id, org_id, article, status, dt_ordered, dt_collected, account_id)
        VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
        "#,
        params![id, org_id, article, status.as_str(), ordered, collected, account_id],
    )
    .unwrap();
}

/// 两个服务器的标准场景
///
/// - 服务器 1: 承运商 1 (70%) / 2 (30%), 账户 1-3 (地址 11-13), 组织 100 三个任务
/// - 服务器 2: 排程过紧 (最多 3 格), 账户 4 (地址 14), 组织 200 五个任务
pub fn seed_two_server_scenario(db_path: &str) {
    let conn = open_sqlite_connection(db_path).unwrap();

    insert_contractor(&conn, 1);
    insert_contractor(&conn, 2);
    insert_schedule(&conn, 1, &create_test_schedule());
    insert_schedule(&conn, 2, &create_tight_schedule());

    insert_server(&conn, 1, 1);
    insert_server_contractor(&conn, 1, &create_test_contractor(1, 0.7));
    insert_server_contractor(&conn, 1, &create_test_contractor(2, 0.3));
    insert_server(&conn, 2, 2);
    insert_server_contractor(&conn, 2, &create_test_contractor(1, 1.0));

    insert_address(&conn, 11, 1);
    insert_address(&conn, 12, 1);
    insert_address(&conn, 13, 2);
    insert_address(&conn, 14, 1);
    insert_account(&conn, 1, 11, 1);
    insert_account(&conn, 2, 12, 1);
    insert_account(&conn, 3, 13, 1);
    insert_account(&conn, 4, 14, 2);

    insert_org(&conn, 100, 1);
    insert_org(&conn, 200, 2);
    for (i, article) in ["A", "B", "C"].iter().enumerate() {
        insert_task(&conn, 1000 + i as i64, 100, article, plan_date());
    }
    for i in 0..5 {
        insert_task(&conn, 2000 + i, 200, "X", plan_date());
    }
}
