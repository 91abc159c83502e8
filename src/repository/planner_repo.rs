// ==========================================
// 取件账户分配系统 - 计划数据仓储
// ==========================================
// 职责: 加载一次运行所需的全部输入; 落库单服务器计划
// 红线: Repository 不含业务逻辑
// 红线: 单服务器的任务更新与历史记录在同一事务内提交 (全有或全无)
// ==========================================

use crate::db::open_sqlite_connection;
use crate::domain::account::{Account, Address, Organization};
use crate::domain::order::{OrderRecord, Task, TaskUpdate};
use crate::domain::plan::PlanHistoryRecord;
use crate::domain::server::{ContractorConfig, ScheduleConfig, Server, VipClient};
use crate::domain::types::OrderStatus;
use crate::engine::orchestrator::PlanInput;
use crate::repository::error::{RepositoryError, RepositoryResult};
use chrono::NaiveDate;
use rusqlite::{params, Connection, Row};
use std::sync::{Arc, Mutex};
use tracing::{debug, info, instrument};

// ==========================================
// PlannerRepository - 计划数据仓储
// ==========================================
pub struct PlannerRepository {
    conn: Arc<Mutex<Connection>>,
}

impl PlannerRepository {
    /// 创建新的 PlannerRepository 实例
    pub fn new(db_path: &str) -> RepositoryResult<Self> {
        let conn = open_sqlite_connection(db_path)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// 从已有连接创建仓储实例
    pub fn from_connection(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    fn get_conn(&self) -> RepositoryResult<std::sync::MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    // ==========================================
    // 读取
    // ==========================================

    /// 加载计划日的完整输入
    #[instrument(skip(self))]
    pub fn load_plan_input(&self, plan_date: NaiveDate) -> RepositoryResult<PlanInput> {
        let input = PlanInput {
            servers: self.load_active_servers()?,
            accounts: self.load_accounts()?,
            addresses: self.load_addresses()?,
            organizations: self.load_organizations()?,
            vip_clients: self.load_vip_clients()?,
            tasks: self.load_day_tasks(plan_date)?,
            history: self.load_order_history()?,
        };
        info!(
            servers = input.servers.len(),
            accounts = input.accounts.len(),
            tasks = input.tasks.len(),
            history = input.history.len(),
            "计划输入加载完成"
        );
        Ok(input)
    }

    /// 启用的服务器 (含排程与承运商配置), 按 id 顺序
    pub fn load_active_servers(&self) -> RepositoryResult<Vec<Server>> {
        let conn = self.get_conn()?;
        let mut stmt = conn.prepare(
            r#"
            SELECT
                s.id, s.number, s.name, s.is_active,
                sc.title, sc.time_min_min_per_step, sc.time_max_min_per_step,
                sc.time_start, sc.time_end, sc.time_first_point, sc.time_second_point
            FROM server s
            JOIN server_schedule sc ON sc.id = s.schedule_id
            WHERE s.is_active = 1
            ORDER BY s.id
            "#,
        )?;
        let mut servers = stmt
            .query_map([], |row| {
                Ok(Server {
                    id: row.get(0)?,
                    number: row.get(1)?,
                    name: row.get(2)?,
                    is_active: row.get(3)?,
                    schedule: ScheduleConfig {
                        title: row.get(4)?,
                        time_min_min_per_step: row.get(5)?,
                        time_max_min_per_step: row.get(6)?,
                        time_start: row.get(7)?,
                        time_end: row.get(8)?,
                        time_first_point: row.get(9)?,
                        time_second_point: row.get(10)?,
                    },
                    contractors: Vec::new(),
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;

        let mut stmt = conn.prepare(
            r#"
            SELECT
                c.id, c.name, x.load_percent,
                x.load_j_min, x.load_j_max, x.load_l_min, x.load_l_max,
                x.load_t_min, x.load_t_max, x.load_i, x.load_m
            FROM server_contractor x
            JOIN contractor c ON c.id = x.contractor_id
            WHERE x.server_id = ?1
            ORDER BY c.id
            "#,
        )?;
        for server in servers.iter_mut() {
            server.contractors = stmt
                .query_map(params![server.id], map_contractor)?
                .collect::<Result<Vec<_>, _>>()?;
            debug!(
                server_id = server.id,
                contractors = server.contractors.len(),
                "服务器配置已加载"
            );
        }

        Ok(servers)
    }

    /// 全部账户 (历史订单解析需要跨服务器)
    pub fn load_accounts(&self) -> RepositoryResult<Vec<Account>> {
        let conn = self.get_conn()?;
        let mut stmt = conn.prepare(
            r#"
            SELECT id, number, name, is_active, reg_date, address_id, server_id
            FROM account
            ORDER BY id
            "#,
        )?;
        let accounts = stmt
            .query_map([], |row| {
                Ok(Account {
                    id: row.get(0)?,
                    number: row.get(1)?,
                    name: row.get(2)?,
                    is_active: row.get(3)?,
                    reg_date: row.get(4)?,
                    address_id: row.get(5)?,
                    server_id: row.get(6)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(accounts)
    }

    pub fn load_addresses(&self) -> RepositoryResult<Vec<Address>> {
        let conn = self.get_conn()?;
        let mut stmt = conn.prepare(
            "SELECT id, address, district, contractor_id, is_active FROM address ORDER BY id",
        )?;
        let addresses = stmt
            .query_map([], |row| {
                Ok(Address {
                    id: row.get(0)?,
                    address: row.get(1)?,
                    district: row.get(2)?,
                    contractor_id: row.get(3)?,
                    is_active: row.get(4)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(addresses)
    }

    pub fn load_organizations(&self) -> RepositoryResult<Vec<Organization>> {
        let conn = self.get_conn()?;
        let mut stmt = conn.prepare("SELECT id, title, server_id FROM organization ORDER BY id")?;
        let orgs = stmt
            .query_map([], |row| {
                Ok(Organization {
                    id: row.get(0)?,
                    title: row.get(1)?,
                    server_id: row.get(2)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(orgs)
    }

    pub fn load_vip_clients(&self) -> RepositoryResult<Vec<VipClient>> {
        let conn = self.get_conn()?;
        let mut stmt =
            conn.prepare("SELECT server_id, org_id, load_i FROM server_client ORDER BY server_id, org_id")?;
        let vips = stmt
            .query_map([], |row| {
                Ok(VipClient {
                    server_id: row.get(0)?,
                    org_id: row.get(1)?,
                    load_i: row.get(2)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(vips)
    }

    /// 计划日待分配任务 (状态 PLANNED), 按任务 id 顺序
    pub fn load_day_tasks(&self, plan_date: NaiveDate) -> RepositoryResult<Vec<Task>> {
        let conn = self.get_conn()?;
        let mut stmt = conn.prepare(
            r#"
            SELECT
                o.id, o.org_id, g.title, o.article, o.size, o.keyword, o.price,
                o.status, o.dt_planned
            FROM orders o
            JOIN organization g ON g.id = o.org_id
            WHERE o.status = ?1 AND o.dt_planned = ?2
            ORDER BY o.id
            "#,
        )?;
        let tasks = stmt
            .query_map(params![OrderStatus::Planned.as_str(), plan_date], |row| {
                Ok(Task {
                    id: row.get(0)?,
                    org_id: row.get(1)?,
                    org_title: row.get(2)?,
                    article: row.get(3)?,
                    size: row.get(4)?,
                    keyword: row.get(5)?,
                    price: row.get(6)?,
                    status: status_column(row, 7)?,
                    planned_date: row.get(8)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(tasks)
    }

    /// 全部已下单历史 (dt_ordered 非空)
    ///
    /// account_id 为空的记录原样返回, 由引擎判定为完整性错误
    pub fn load_order_history(&self) -> RepositoryResult<Vec<OrderRecord>> {
        let conn = self.get_conn()?;
        let mut stmt = conn.prepare(
            r#"
            SELECT id, account_id, org_id, article, dt_ordered, dt_collected
            FROM orders
            WHERE dt_ordered IS NOT NULL
            ORDER BY id
            "#,
        )?;
        let history = stmt
            .query_map([], |row| {
                Ok(OrderRecord {
                    id: row.get(0)?,
                    account_id: row.get(1)?,
                    org_id: row.get(2)?,
                    article: row.get(3)?,
                    dt_ordered: row.get(4)?,
                    dt_collected: row.get(5)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(history)
    }

    /// 某服务器的运行历史 (最新在前)
    pub fn list_history(&self, server_id: i64) -> RepositoryResult<Vec<PlanHistoryRecord>> {
        let conn = self.get_conn()?;
        let mut stmt = conn.prepare(
            r#"
            SELECT server_id, run_at, logs_artifact, result_artifact
            FROM picker_history
            WHERE server_id = ?1
            ORDER BY id DESC
            "#,
        )?;
        let records = stmt
            .query_map(params![server_id], |row| {
                Ok(PlanHistoryRecord {
                    server_id: row.get(0)?,
                    run_at: row.get(1)?,
                    logs_artifact: row.get(2)?,
                    result_artifact: row.get(3)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(records)
    }

    // ==========================================
    // 写入
    // ==========================================

    /// 落库单服务器计划 (任务更新 + 历史记录, 单事务)
    ///
    /// # 返回
    /// - 实际更新的任务数 (仅更新仍为 PLANNED 的任务)
    #[instrument(skip(self, updates, record), fields(server_id = record.server_id, updates = updates.len()))]
    pub fn apply_server_plan(
        &self,
        updates: &[TaskUpdate],
        record: &PlanHistoryRecord,
    ) -> RepositoryResult<usize> {
        let mut conn = self.get_conn()?;
        let tx = conn.transaction()?;

        let mut updated = 0;
        {
            let mut stmt = tx.prepare(
                r#"
                UPDATE orders
                SET status = ?1, account_id = ?2, address_id = ?3, scheduled_at = ?4
                WHERE id = ?5 AND status = ?6
                "#,
            )?;
            for u in updates {
                updated += stmt.execute(params![
                    u.status.as_str(),
                    u.account_id,
                    u.address_id,
                    u.scheduled_at,
                    u.task_id,
                    OrderStatus::Planned.as_str(),
                ])?;
            }
        }
        insert_history(&tx, record)?;

        tx.commit()
            .map_err(|e| RepositoryError::DatabaseTransactionError(e.to_string()))?;

        info!(updated, "服务器计划已落库");
        Ok(updated)
    }

    /// 仅写运行历史 (服务器失败时使用)
    pub fn record_history(&self, record: &PlanHistoryRecord) -> RepositoryResult<i64> {
        let conn = self.get_conn()?;
        insert_history(&conn, record)?;
        Ok(conn.last_insert_rowid())
    }
}

fn insert_history(conn: &Connection, record: &PlanHistoryRecord) -> rusqlite::Result<usize> {
    conn.execute(
        r#"
        INSERT INTO picker_history (server_id, run_at, logs_artifact, result_artifact)
        VALUES (?1, ?2, ?3, ?4)
        "#,
        params![
            record.server_id,
            record.run_at,
            record.logs_artifact,
            record.result_artifact,
        ],
    )
}

fn map_contractor(row: &Row<'_>) -> rusqlite::Result<ContractorConfig> {
    Ok(ContractorConfig {
        contractor_id: row.get(0)?,
        contractor_name: row.get(1)?,
        load_percent: row.get(2)?,
        load_j_min: row.get(3)?,
        load_j_max: row.get(4)?,
        load_l_min: row.get(5)?,
        load_l_max: row.get(6)?,
        load_t_min: row.get(7)?,
        load_t_max: row.get(8)?,
        load_i: row.get(9)?,
        load_m: row.get(10)?,
    })
}

fn status_column(row: &Row<'_>, idx: usize) -> rusqlite::Result<OrderStatus> {
    let raw: String = row.get(idx)?;
    OrderStatus::parse(&raw).ok_or_else(|| {
        rusqlite::Error::FromSqlConversionFailure(
            idx,
            rusqlite::types::Type::Text,
            format!("未知订单状态: {}", raw).into(),
        )
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::init_schema;

    fn create_test_repo() -> PlannerRepository {
        let conn = Connection::open_in_memory().unwrap();
        init_schema(&conn).unwrap();
        conn.execute_batch(
            r#"
            INSERT INTO contractor (id, name) VALUES (1, 'C1');
            INSERT INTO server_schedule (id, title, time_min_min_per_step, time_max_min_per_step,
                time_start, time_end, time_first_point, time_second_point)
                VALUES (1, 'day', 2, 10, '09:00', '17:00', '15:00', '13:00');
            INSERT INTO server (id, number, name, is_active, schedule_id) VALUES (1, 'S1', 'one', 1, 1);
            INSERT INTO server (id, number, name, is_active, schedule_id) VALUES (2, 'S2', 'two', 0, 1);
            INSERT INTO server_contractor (server_id, contractor_id, load_percent, load_m)
                VALUES (1, 1, 1.0, '2099-01-01');
            INSERT INTO organization (id, title, server_id) VALUES (1, 'ORG', 1);
            INSERT INTO orders (id, org_id, article, status, dt_planned)
                VALUES (10, 1, 'A', 'PLANNED', '2026-10-20');
            INSERT INTO orders (id, org_id, article, status, dt_planned)
                VALUES (11, 1, 'B', 'PLANNED', '2026-10-21');
            "#,
        )
        .unwrap();
        PlannerRepository::from_connection(Arc::new(Mutex::new(conn)))
    }

    #[test]
    fn test_only_active_servers_loaded() {
        let repo = create_test_repo();
        let servers = repo.load_active_servers().unwrap();
        assert_eq!(servers.len(), 1);
        assert_eq!(servers[0].contractors.len(), 1);
        assert_eq!(
            servers[0].schedule.time_start,
            chrono::NaiveTime::from_hms_opt(9, 0, 0).unwrap()
        );
    }

    #[test]
    fn test_day_tasks_filtered_by_date() {
        let repo = create_test_repo();
        let tasks = repo
            .load_day_tasks(NaiveDate::from_ymd_opt(2026, 10, 20).unwrap())
            .unwrap();
        assert_eq!(tasks.len(), 1);
        assert_eq!(tasks[0].id, 10);
        assert_eq!(tasks[0].org_title, "ORG");
    }
}
