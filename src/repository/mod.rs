// ==========================================
// 取件账户分配系统 - 数据仓储层
// ==========================================
// 红线: Repository 不含业务逻辑
// 约束: 所有查询使用参数化
// ==========================================

pub mod error;
pub mod planner_repo;

pub use error::{RepositoryError, RepositoryResult};
pub use planner_repo::PlannerRepository;
