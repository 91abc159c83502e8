// ==========================================
// 取件账户分配系统 - 引擎层
// ==========================================
// 职责: 实现分配与排程规则, 不拼 SQL
// 红线: 所有准入/拒绝必须写入决策日志并带原因码
// ==========================================

pub mod assignment;
pub mod attempt;
pub mod binding;
pub mod eligibility;
pub mod error;
pub mod history;
pub mod orchestrator;
pub mod quota;
pub mod schedule;
pub mod scoring;
pub mod session;

// 重导出核心引擎
pub use assignment::{AssignmentLoop, OrganizationAllocation, OrganizationDemand};
pub use binding::ResultBinder;
pub use eligibility::EligibilityFilter;
pub use error::{EngineError, EngineResult};
pub use history::OrderHistoryIndex;
pub use orchestrator::{PlanInput, PlanOrchestrator, ServerFailure, ServerRun};
pub use quota::{ContractorQuota, QuotaAllocator};
pub use schedule::{ScheduleBuilder, ScheduleCell, ScheduleGrid, StepStrategy};
pub use scoring::ScoringEngine;
pub use session::{AllocationSession, AttemptDelta, AttemptLedger};
