// ==========================================
// 地铁夜间编组排班系统 - 股道领域模型
// ==========================================
// 不变量: 占用与封锁互斥记录, 可用 = 未占用且未封锁
// ==========================================

use crate::domain::types::Depot;
use serde::{Deserialize, Serialize};

// ==========================================
// StablingBay - 停车股道
// ==========================================
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StablingBay {
    pub bay_id: i64,
    pub depot: Depot,
    pub line: String,        // 所属线路 (Blue Line / Green Line ...)
    pub position_order: i32, // 股位序号, 越小越靠近咽喉区, 晨间出车越快
    pub occupied: bool,
    pub blocked: bool,
    pub currently_assigned_trainset: Option<i64>, // 惯常停放的列车 (归属股道)
}

impl StablingBay {
    pub fn is_available(&self) -> bool {
        !self.occupied && !self.blocked
    }
}
