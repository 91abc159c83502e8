// ==========================================
// 取件账户分配系统 - 计划生成 API
// ==========================================
// 职责: 操作员触发的一次完整运行
//   配置 → 加载输入 → 编排 → 渲染产物 → 逐服务器落库 → 汇总
// 红线: 数据完整性错误在落库前返回; 服务器失败只写日志产物与历史
// ==========================================

use std::sync::Arc;

use chrono::{Local, NaiveDate};
use serde::Serialize;
use tracing::{error, info, instrument, warn};

use crate::api::error::{ApiError, ApiResult};
use crate::config::{PlannerConfigReader, RunOptions};
use crate::domain::plan::{OrganizationOutcome, PlanHistoryRecord, ServerPlan};
use crate::domain::types::AttemptState;
use crate::engine::orchestrator::{PlanOrchestrator, ServerFailure, ServerRun};
use crate::report::{ArtifactStore, ReportRenderer};
use crate::repository::PlannerRepository;

// ==========================================
// 运行汇总
// ==========================================

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OrganizationSummary {
    pub org_id: i64,
    pub org_title: String,
    pub amount: usize,
    pub committed: usize,
    pub shortfall: usize,
    pub final_state: AttemptState,
}

impl From<&OrganizationOutcome> for OrganizationSummary {
    fn from(o: &OrganizationOutcome) -> Self {
        Self {
            org_id: o.org_id,
            org_title: o.org_title.clone(),
            amount: o.amount,
            committed: o.committed,
            shortfall: o.shortfall,
            final_state: o.final_state,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ServerRunSummary {
    Planned {
        server_id: i64,
        server_name: String,
        committed: usize,
        updated_tasks: usize,
        organizations: Vec<OrganizationSummary>,
        result_artifact: String,
        logs_artifact: String,
    },
    Failed {
        server_id: i64,
        server_name: String,
        reason: String,
        logs_artifact: Option<String>,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlanRunSummary {
    pub plan_date: NaiveDate,
    pub servers: Vec<ServerRunSummary>,
}

impl PlanRunSummary {
    /// 全部服务器成功 (允许缺口)
    pub fn is_success(&self) -> bool {
        self.servers
            .iter()
            .all(|s| matches!(s, ServerRunSummary::Planned { .. }))
    }

    pub fn total_shortfall(&self) -> usize {
        self.servers
            .iter()
            .map(|s| match s {
                ServerRunSummary::Planned { organizations, .. } => {
                    organizations.iter().map(|o| o.shortfall).sum()
                }
                ServerRunSummary::Failed { .. } => 0,
            })
            .sum()
    }
}

// ==========================================
// PlanApi - 计划生成 API
// ==========================================
pub struct PlanApi {
    planner_repo: Arc<PlannerRepository>,
    config_reader: Arc<dyn PlannerConfigReader>,
    artifact_store: Arc<dyn ArtifactStore>,
}

impl PlanApi {
    pub fn new(
        planner_repo: Arc<PlannerRepository>,
        config_reader: Arc<dyn PlannerConfigReader>,
        artifact_store: Arc<dyn ArtifactStore>,
    ) -> Self {
        Self {
            planner_repo,
            config_reader,
            artifact_store,
        }
    }

    /// 生成计划日的分配与排程
    ///
    /// # 返回
    /// - Ok(PlanRunSummary): 各服务器结果 (含失败服务器, 含落库失败的服务器)
    /// - Err(ApiError::DataIntegrity): 历史数据不完整, 未落库任何内容
    #[instrument(skip(self, options), fields(plan_date = %options.plan_date, today = %options.today))]
    pub async fn generate_plan(&self, options: &RunOptions) -> ApiResult<PlanRunSummary> {
        let settings = self
            .config_reader
            .get_planner_settings()
            .await
            .map_err(|e| ApiError::Config(e.to_string()))?;
        let renderer = ReportRenderer::new(&settings.time_format)?;

        let input = self.planner_repo.load_plan_input(options.plan_date)?;
        let runs = PlanOrchestrator::new(settings).run(&input, options)?;

        let mut servers = Vec::with_capacity(runs.len());
        for run in runs {
            let (server_id, server_name, persisted) = match run {
                ServerRun::Planned(plan) => (
                    plan.server_id,
                    plan.server_name.clone(),
                    self.persist_plan(&renderer, plan).await,
                ),
                ServerRun::Failed(failure) => (
                    failure.server_id,
                    failure.server_name.clone(),
                    self.persist_failure(&renderer, failure).await,
                ),
            };

            // 单个服务器落库失败不影响后续服务器
            let summary = persisted.unwrap_or_else(|e| {
                error!(server_id, error = %e, "服务器结果落库失败");
                ServerRunSummary::Failed {
                    server_id,
                    server_name,
                    reason: e.to_string(),
                    logs_artifact: None,
                }
            });
            servers.push(summary);
        }

        let summary = PlanRunSummary {
            plan_date: options.plan_date,
            servers,
        };
        info!(
            servers = summary.servers.len(),
            success = summary.is_success(),
            shortfall = summary.total_shortfall(),
            "计划生成完成"
        );
        Ok(summary)
    }

    async fn persist_plan(
        &self,
        renderer: &ReportRenderer,
        plan: ServerPlan,
    ) -> ApiResult<ServerRunSummary> {
        let result_artifact = self
            .artifact_store
            .put(renderer.render_results(&plan.rows)?)
            .await?;
        let logs_artifact = self
            .artifact_store
            .put(renderer.render_trace(&plan.log)?)
            .await?;

        let record = PlanHistoryRecord {
            server_id: plan.server_id,
            run_at: Local::now().naive_local(),
            logs_artifact: logs_artifact.clone(),
            result_artifact: Some(result_artifact.clone()),
        };
        let updated_tasks = match self
            .planner_repo
            .apply_server_plan(&plan.task_updates, &record)
        {
            Ok(n) => n,
            Err(e) => {
                // 事务已回滚, 两个产物没有历史记录引用
                error!(
                    server_id = plan.server_id,
                    result_artifact = %result_artifact,
                    logs_artifact = %logs_artifact,
                    error = %e,
                    "计划落库失败, 产物未登记"
                );
                return Ok(ServerRunSummary::Failed {
                    server_id: plan.server_id,
                    server_name: plan.server_name,
                    reason: ApiError::from(e).to_string(),
                    logs_artifact: Some(logs_artifact),
                });
            }
        };

        let organizations: Vec<OrganizationSummary> =
            plan.outcomes.iter().map(OrganizationSummary::from).collect();
        for o in organizations.iter().filter(|o| o.shortfall > 0) {
            warn!(
                server_id = plan.server_id,
                org_id = o.org_id,
                shortfall = o.shortfall,
                "组织需求未完全满足"
            );
        }

        Ok(ServerRunSummary::Planned {
            server_id: plan.server_id,
            server_name: plan.server_name,
            committed: plan.commitments.len(),
            updated_tasks,
            organizations,
            result_artifact,
            logs_artifact,
        })
    }

    async fn persist_failure(
        &self,
        renderer: &ReportRenderer,
        failure: ServerFailure,
    ) -> ApiResult<ServerRunSummary> {
        let logs_artifact = self
            .artifact_store
            .put(renderer.render_trace(&failure.log)?)
            .await?;
        self.planner_repo.record_history(&PlanHistoryRecord {
            server_id: failure.server_id,
            run_at: Local::now().naive_local(),
            logs_artifact: logs_artifact.clone(),
            result_artifact: None,
        })?;

        Ok(ServerRunSummary::Failed {
            server_id: failure.server_id,
            server_name: failure.server_name,
            reason: failure.error.to_string(),
            logs_artifact: Some(logs_artifact),
        })
    }
}
