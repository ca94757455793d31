// ==========================================
// 地铁夜间编组排班系统 - 演示入口
// ==========================================
// 用途: 生成确定性演示车队, 执行一次排班, 输出结果文档
// 用法: metro_induction_aps [fleet_size]
// ==========================================

use chrono::Utc;
use metro_induction_aps::{
    demo_fleet, logging, InductionScheduler, OptimiseRequest, SchedulerConfig,
};
use std::sync::Arc;
use tracing::info;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    logging::init();

    let fleet_size: usize = std::env::args()
        .nth(1)
        .and_then(|s| s.parse().ok())
        .unwrap_or(100);

    let now = Utc::now();
    let fleet = demo_fleet(fleet_size, now.date_naive());
    info!(fleet_size, "演示车队生成完成");

    let scheduler = InductionScheduler::new(Arc::new(fleet), SchedulerConfig::default());
    let result = scheduler.optimise(&OptimiseRequest::new(now)).await?;

    info!(
        status = %result.status,
        selected = result.selected.len(),
        execution_ms = result.execution_ms,
        "排班完成"
    );

    let report = scheduler.report(&result);
    println!("{}", serde_json::to_string_pretty(&report)?);

    Ok(())
}
