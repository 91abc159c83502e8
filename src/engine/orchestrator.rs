// ==========================================
// 取件账户分配系统 - 计划编排器
// ==========================================
// 职责: 按固定顺序逐个服务器执行完整计划流程
// 流程 (单服务器):
//   1. 时间格 (失败 → 该服务器失败, 不触碰分配状态)
//   2. 公共池准入
//   3. 组织按任务数降序: 配额 + 分配循环
//   4. 结果行绑定 + 时间格绑定 → 任务更新
// 跨服务器: 地址占用 / 地址已选账户 随会话向后传递, 不在运行中重置
// 红线: 历史订单完整性错误在任何服务器开始前返回
// ==========================================

use crate::config::{PlannerSettings, RunOptions};
use crate::domain::account::{Account, Address, Organization};
use crate::domain::decision_log::{DecisionLog, DecisionLogEntry};
use crate::domain::order::{OrderRecord, Task, TaskUpdate};
use crate::domain::plan::{ResultRow, ServerPlan};
use crate::domain::server::{Server, VipClient};
use crate::domain::types::OrderStatus;
use crate::engine::assignment::{AssignmentLoop, OrganizationDemand};
use crate::engine::binding::ResultBinder;
use crate::engine::eligibility::EligibilityFilter;
use crate::engine::error::{EngineError, EngineResult};
use crate::engine::history::OrderHistoryIndex;
use crate::engine::schedule::ScheduleBuilder;
use crate::engine::scoring::ScoringEngine;
use crate::engine::session::AllocationSession;
use std::collections::HashMap;
use tracing::{debug, error, info, instrument, warn};

// ==========================================
// PlanInput - 一次运行的全部输入
// ==========================================
#[derive(Debug, Clone, Default)]
pub struct PlanInput {
    /// 按处理顺序排列
    pub servers: Vec<Server>,
    /// 全部服务器的账户 (历史订单解析需要)
    pub accounts: Vec<Account>,
    pub addresses: Vec<Address>,
    pub organizations: Vec<Organization>,
    pub vip_clients: Vec<VipClient>,
    /// 计划日的待分配任务
    pub tasks: Vec<Task>,
    /// 全部已下单历史订单
    pub history: Vec<OrderRecord>,
}

/// 单服务器失败 (配置错误)
#[derive(Debug, Clone)]
pub struct ServerFailure {
    pub server_id: i64,
    pub server_name: String,
    pub error: EngineError,
    pub log: DecisionLog,
}

#[derive(Debug, Clone)]
pub enum ServerRun {
    Planned(ServerPlan),
    Failed(ServerFailure),
}

/// 单次运行内各服务器共享的只读上下文
struct RunContext<'a> {
    history: OrderHistoryIndex,
    addresses: HashMap<i64, Address>,
    org_server: HashMap<i64, i64>,
    input: &'a PlanInput,
    options: &'a RunOptions,
}

// ==========================================
// PlanOrchestrator - 计划编排器
// ==========================================
pub struct PlanOrchestrator {
    settings: PlannerSettings,
    schedule_builder: ScheduleBuilder,
}

impl PlanOrchestrator {
    pub fn new(settings: PlannerSettings) -> Self {
        Self {
            settings,
            schedule_builder: ScheduleBuilder::new(),
        }
    }

    /// 执行一次完整运行
    ///
    /// # 返回
    /// - Ok(Vec<ServerRun>): 每个服务器的计划或失败原因 (按处理顺序)
    /// - Err(EngineError): 数据完整性错误, 整次运行失败
    #[instrument(skip_all, fields(
        servers = input.servers.len(),
        tasks = input.tasks.len(),
        plan_date = %options.plan_date
    ))]
    pub fn run(&self, input: &PlanInput, options: &RunOptions) -> EngineResult<Vec<ServerRun>> {
        let account_addresses: HashMap<i64, i64> =
            input.accounts.iter().map(|a| (a.id, a.address_id)).collect();
        let ctx = RunContext {
            history: OrderHistoryIndex::build(&input.history, &account_addresses)?,
            addresses: input.addresses.iter().map(|a| (a.id, a.clone())).collect(),
            org_server: input
                .organizations
                .iter()
                .map(|o| (o.id, o.server_id))
                .collect(),
            input,
            options,
        };

        let mut session = AllocationSession::new();
        let mut binder = ResultBinder::new(options.shuffle_seed);
        let mut runs = Vec::with_capacity(input.servers.len());

        for server in input.servers.iter().filter(|s| s.is_active) {
            match self.plan_server(server, &ctx, &mut session, &mut binder) {
                Ok(plan) => {
                    info!(
                        server_id = server.id,
                        rows = plan.rows.len(),
                        committed = plan.commitments.len(),
                        shortfall = plan.total_shortfall(),
                        used_addresses = session.used_address_count(),
                        "服务器计划完成"
                    );
                    runs.push(ServerRun::Planned(plan));
                }
                Err(failure) => {
                    error!(
                        server_id = server.id,
                        error = %failure.error,
                        "服务器计划失败, 继续处理其余服务器"
                    );
                    runs.push(ServerRun::Failed(failure));
                }
            }
        }

        Ok(runs)
    }

    /// 单服务器计划
    fn plan_server(
        &self,
        server: &Server,
        ctx: &RunContext<'_>,
        session: &mut AllocationSession,
        binder: &mut ResultBinder,
    ) -> Result<ServerPlan, ServerFailure> {
        let mut log = DecisionLog::new(server.id);
        let fail = |error: EngineError, log: DecisionLog| ServerFailure {
            server_id: server.id,
            server_name: server.name.clone(),
            error,
            log,
        };

        // === 当日任务 → 结果行 / 组织需求 ===
        let tasks: Vec<&Task> = ctx
            .input
            .tasks
            .iter()
            .filter(|t| match ctx.org_server.get(&t.org_id) {
                Some(&sid) => sid == server.id,
                None => {
                    warn!(task_id = t.id, org_id = t.org_id, "任务所属组织不存在, 跳过");
                    false
                }
            })
            .collect();
        let mut rows = build_rows(&tasks);
        let demands = build_demands(&tasks, &ctx.input.vip_clients, server.id);

        if server.contractors.is_empty() {
            let error = EngineError::NoContractors {
                server_id: server.id,
            };
            log.push(DecisionLogEntry::ScheduleFailed {
                reason: error.to_string(),
            });
            return Err(fail(error, log));
        }

        // === 步骤 1: 时间格 (先于分配) ===
        let mut grid = match self.schedule_builder.build(
            &server.schedule,
            ctx.options.plan_date,
            tasks.len(),
        ) {
            Ok(grid) => grid,
            Err(error) => {
                log.push(DecisionLogEntry::ScheduleFailed {
                    reason: error.to_string(),
                });
                return Err(fail(error, log));
            }
        };

        // === 步骤 2: 公共池 ===
        session.begin_server();
        let filter = EligibilityFilter::new(&self.settings);
        let (pool, pool_log) = filter.build_pool(
            server,
            &ctx.input.accounts,
            &ctx.addresses,
            &ctx.history,
            &ctx.options.blacklist,
            ctx.options.today,
        );
        log.extend(pool_log);

        // === 步骤 3: 逐组织分配 ===
        let assignment = AssignmentLoop::new(
            ScoringEngine::new(&self.settings),
            &ctx.history,
            server.id,
            &server.contractors,
            ctx.options.today,
        );
        let mut commitments = Vec::new();
        let mut outcomes = Vec::with_capacity(demands.len());
        for demand in &demands {
            let allocation = match assignment.allocate(demand, &pool, session) {
                Ok(a) => a,
                Err(error) => return Err(fail(error, log)),
            };
            log.extend(allocation.log);
            commitments.extend(allocation.commitments);
            outcomes.push(allocation.outcome);
        }

        // === 步骤 4: 结果绑定 + 时间格绑定 ===
        binder.bind(&mut rows, &commitments);

        let org_amounts: Vec<(i64, usize)> =
            demands.iter().map(|d| (d.org_id, d.amount())).collect();
        let org_order: Vec<i64> = demands.iter().map(|d| d.org_id).collect();
        for (org_id, cells) in self
            .schedule_builder
            .assign_organizations(&mut grid, &org_amounts)
        {
            debug!(server_id = server.id, org_id, cells, "组织占格");
        }
        self.schedule_builder.bind_rows(&grid, &mut rows, &org_order);

        let task_updates: Vec<TaskUpdate> = rows
            .iter()
            .filter_map(|r| match (r.account_id, r.address_id) {
                (Some(account_id), Some(address_id)) => Some(TaskUpdate {
                    task_id: r.task_id,
                    status: OrderStatus::Queued,
                    account_id,
                    address_id,
                    scheduled_at: r.scheduled_at,
                }),
                _ => None,
            })
            .collect();

        Ok(ServerPlan {
            server_id: server.id,
            server_name: server.name.clone(),
            rows,
            commitments,
            outcomes,
            task_updates,
            log,
        })
    }
}

/// 任务 → 结果行 (保持加载顺序, 行号从 1 开始)
fn build_rows(tasks: &[&Task]) -> Vec<ResultRow> {
    tasks
        .iter()
        .enumerate()
        .map(|(i, t)| ResultRow {
            row_no: i + 1,
            task_id: t.id,
            org_id: t.org_id,
            org_title: t.org_title.clone(),
            article: t.article.clone(),
            size: t.size.clone(),
            keyword: t.keyword.clone(),
            price: t.price,
            account_id: None,
            account_number: None,
            address_id: None,
            address: None,
            scheduled_at: None,
        })
        .collect()
}

/// 按组织聚合需求, 任务数降序 (相同数量保持首次出现顺序)
fn build_demands(tasks: &[&Task], vips: &[VipClient], server_id: i64) -> Vec<OrganizationDemand> {
    let mut demands: Vec<OrganizationDemand> = Vec::new();
    for task in tasks {
        match demands.iter_mut().find(|d| d.org_id == task.org_id) {
            Some(d) => d.articles.push(task.article.clone()),
            None => demands.push(OrganizationDemand {
                org_id: task.org_id,
                org_title: task.org_title.clone(),
                articles: vec![task.article.clone()],
                vip_allowance: vips
                    .iter()
                    .find(|v| v.server_id == server_id && v.org_id == task.org_id)
                    .map(|v| v.load_i),
            }),
        }
    }
    demands.sort_by(|a, b| b.amount().cmp(&a.amount()));
    demands
}
