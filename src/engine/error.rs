// ==========================================
// 取件账户分配系统 - 引擎层错误类型
// ==========================================
// 分类:
// - 配置错误: 排程不可行 / 排程配置无效 (仅影响单个服务器)
// - 数据完整性错误: 历史订单缺账户 (整次运行失败, 不落库)
// 缺口 (shortfall) 不是错误, 见 OrganizationOutcome
// ==========================================

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum EngineError {
    // ===== 配置错误 (服务器级) =====
    #[error("排程不可行: {0}")]
    ScheduleInfeasible(String),

    #[error("排程配置无效: {0}")]
    InvalidScheduleConfig(String),

    #[error("服务器未配置承运商: server_id={server_id}")]
    NoContractors { server_id: i64 },

    // ===== 数据完整性错误 (运行级) =====
    #[error("历史订单缺少账户关联: order_id={order_id}")]
    MissingAccountLink { order_id: i64 },

    #[error("历史订单引用未知账户: order_id={order_id}, account_id={account_id}")]
    UnknownAccount { order_id: i64, account_id: i64 },
}

impl EngineError {
    /// 是否仅影响单个服务器 (其余服务器继续)
    pub fn is_server_scoped(&self) -> bool {
        matches!(
            self,
            EngineError::ScheduleInfeasible(_)
                | EngineError::InvalidScheduleConfig(_)
                | EngineError::NoContractors { .. }
        )
    }
}

pub type EngineResult<T> = Result<T, EngineError>;
