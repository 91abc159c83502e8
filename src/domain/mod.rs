// ==========================================
// 取件账户分配系统 - 领域模型层
// ==========================================
// 职责: 定义领域实体、类型、决策日志
// 红线: 不含数据访问逻辑,不含引擎逻辑
// ==========================================

pub mod account;
pub mod candidate;
pub mod decision_log;
pub mod order;
pub mod plan;
pub mod server;
pub mod types;

// 重导出核心类型
pub use account::{Account, Address, Organization};
pub use candidate::{Candidate, CandidateScores, PoolEntry};
pub use decision_log::{DecisionLog, DecisionLogEntry, QuotaTally};
pub use order::{OrderRecord, Task, TaskUpdate};
pub use plan::{Commitment, OrganizationOutcome, PlanHistoryRecord, ResultRow, ServerPlan};
pub use server::{ContractorConfig, ScheduleConfig, Server, VipClient};
pub use types::{AttemptState, CandidateRejection, OrderStatus, PoolExclusionReason};
