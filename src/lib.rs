// ==========================================
// 取件账户分配系统 - 核心库
// ==========================================
// 技术栈: Rust + SQLite
// 系统定位: 决策支持系统 (操作员触发, 批量运行至完成)
// ==========================================

// ==========================================
// 模块声明
// ==========================================

// 领域层 - 实体与类型
pub mod domain;

// 数据仓储层 - 数据访问
pub mod repository;

// 引擎层 - 分配与排程规则
pub mod engine;

// 配置层 - 系统配置
pub mod config;

// 报表层 - 结果表 / 追踪表 / 产物存储
pub mod report;

// 数据库基础设施（连接初始化/PRAGMA 统一）
pub mod db;

// 日志系统
pub mod logging;

// API 层 - 业务接口
pub mod api;

// 应用层 - 组装
pub mod app;

// ==========================================
// 重导出核心类型
// ==========================================

// 领域类型
pub use domain::types::{AttemptState, CandidateRejection, OrderStatus, PoolExclusionReason};

// 领域实体
pub use domain::{
    Account, Address, Commitment, ContractorConfig, DecisionLog, DecisionLogEntry, Organization,
    ResultRow, ScheduleConfig, Server, ServerPlan, Task, VipClient,
};

// 引擎
pub use engine::{
    EngineError, PlanInput, PlanOrchestrator, QuotaAllocator, ScheduleBuilder, ScoringEngine,
    ServerRun,
};

// API
pub use api::{PlanApi, PlanRunSummary};

// ==========================================
// 常量定义
// ==========================================

// 系统版本
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

// 系统名称
pub const APP_NAME: &str = "取件账户分配系统";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version() {
        assert!(!VERSION.is_empty());
    }
}
