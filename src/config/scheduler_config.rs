// ==========================================
// 地铁夜间编组排班系统 - 排班配置
// ==========================================
// 职责: 约束模型与放宽策略的全部可调参数
// ==========================================

use serde::{Deserialize, Serialize};

// ==========================================
// SchedulerConfig - 排班参数全集
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SchedulerConfig {
    // ===== 目标规模与求解预算 =====
    pub roster_size: usize,         // 当日上线列数
    pub solver_budget_seconds: f64, // 求解墙钟预算 (秒)

    // ===== 放宽策略 =====
    pub enable_relaxation: bool, // false 时不进入兜底层 F

    // ===== 软约束参数 =====
    pub depot_balance_lo: i64,    // A 段入选下界
    pub depot_balance_hi: i64,    // A 段入选上界
    pub age_new_years_max: i32,   // "新车" 的最大投运年限
    pub age_new_min: i64,         // 新车入选下界 (候选充足时)
    pub vendor_min: i64,          // 单厂商入选下界 (候选充足时)
    pub critical_branding_min: i64, // critical 冠名入选下界
    pub mileage_band: (i64, i64), // 走行均衡区间 [lo, hi]
    pub mileage_band_min: i64,    // 区间内入选下界
    pub home_bay_min: i64,        // 归属股道可用入选下界
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            roster_size: 24,
            solver_budget_seconds: 10.0,
            enable_relaxation: true,
            depot_balance_lo: 9,
            depot_balance_hi: 15,
            age_new_years_max: 5,
            age_new_min: 8,
            vendor_min: 4,
            critical_branding_min: 6,
            mileage_band: (50_000, 150_000),
            mileage_band_min: 12,
            home_bay_min: 18,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_declared_contract() {
        let cfg = SchedulerConfig::default();
        assert_eq!(cfg.roster_size, 24);
        assert_eq!(cfg.solver_budget_seconds, 10.0);
        assert!(cfg.enable_relaxation);
        assert_eq!(cfg.depot_balance_lo, 9);
        assert_eq!(cfg.depot_balance_hi, 15);
        assert_eq!(cfg.mileage_band, (50_000, 150_000));
        assert_eq!(cfg.home_bay_min, 18);
        assert_eq!(cfg.critical_branding_min, 6);
    }
}
