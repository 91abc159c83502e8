// ==========================================
// 取件账户分配系统 - 报表层错误类型
// ==========================================

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ReportError {
    #[error("CSV 写入失败: {0}")]
    Csv(#[from] csv::Error),

    #[error("文件读写失败: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV 缓冲区取出失败: {0}")]
    Buffer(String),

    #[error("时间格式无效: {0}")]
    InvalidTimeFormat(String),

    #[error("产物不存在: {0}")]
    ArtifactNotFound(String),
}

impl<W> From<csv::IntoInnerError<W>> for ReportError {
    fn from(err: csv::IntoInnerError<W>) -> Self {
        ReportError::Buffer(err.error().to_string())
    }
}

pub type ReportResult<T> = Result<T, ReportError>;
