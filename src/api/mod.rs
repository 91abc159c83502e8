// ==========================================
// 取件账户分配系统 - API 层
// ==========================================
// 职责: 面向操作员的入口, 组合仓储 / 配置 / 引擎 / 报表
// ==========================================

pub mod error;
pub mod plan_api;

pub use error::{ApiError, ApiResult};
pub use plan_api::{OrganizationSummary, PlanApi, PlanRunSummary, ServerRunSummary};
