// ==========================================
// 地铁夜间编组排班系统 - 引擎层错误类型
// ==========================================
// 红线: 单条记录的数据质量问题不在此层出现,
//       已在数据源边界降级; 此处只保留不可恢复分类
// ==========================================

use crate::repository::RepositoryError;
use thiserror::Error;

/// 引擎层错误类型
#[derive(Error, Debug)]
pub enum ScheduleError {
    // ===== 规模不足 (对外表现为 infeasible 结果) =====
    #[error("车队不足: need {need}, have {have}")]
    InsufficientFleet { need: usize, have: usize },

    #[error("可用股道不足: need {need}, have {have}")]
    InsufficientBays { need: usize, have: usize },

    // ===== 求解失败 (触发兜底路径) =====
    #[error("求解器失败: {0}")]
    SolverFailure(String),

    // ===== 调用方取消 =====
    #[error("cancelled")]
    Cancelled,

    // ===== 数据源透传 =====
    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

pub type ScheduleResult<T> = Result<T, ScheduleError>;
