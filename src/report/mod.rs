// ==========================================
// 取件账户分配系统 - 报表层
// ==========================================
// 职责: 结果表 / 追踪表渲染 (CSV), 产物存储
// 红线: 只消费决策日志与结果行, 不参与分配决策
// ==========================================

pub mod artifact_store;
pub mod error;
pub mod tables;

pub use artifact_store::{ArtifactStore, LocalArtifactStore};
pub use error::{ReportError, ReportResult};
pub use tables::ReportRenderer;
