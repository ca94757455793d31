// ==========================================
// 排班门面端到端场景测试
// ==========================================
// 六个固定场景: 黄金路径 / 证书短缺 / 紧急工单阻断 /
// 求解超时兜底 / 单段失衡 / 车队不足
// ==========================================

mod helpers;

use helpers::{add_bay, add_train, snapshot_time, TrainSpec};
use metro_induction_aps::{
    AdmissionTier, CancelFlag, Depot, InMemoryFleet, InductionScheduler, OptimiseRequest,
    OptimiseResult, RosterStatus, SchedulerConfig,
};
use std::collections::HashSet;
use std::sync::Arc;

const VENDORS: [&str; 3] = ["Hyundai Rotem", "Alstom", "BEML"];

async fn run(fleet: InMemoryFleet, request: OptimiseRequest) -> OptimiseResult {
    let scheduler = InductionScheduler::new(Arc::new(fleet), SchedulerConfig::default());
    scheduler.optimise(&request).await.unwrap()
}

fn assert_core_invariants(result: &OptimiseResult, fleet_size: usize) {
    assert_eq!(result.selected.len(), result.roster_size);
    let sel: HashSet<i64> = result.selected.iter().map(|e| e.trainset_id).collect();
    let rej: HashSet<i64> = result.rejected.iter().map(|e| e.trainset_id).collect();
    assert!(sel.is_disjoint(&rej));
    assert_eq!(sel.len() + rej.len(), fleet_size);

    let bays: Vec<i64> = result.selected.iter().map(|e| e.bay_id).collect();
    let unique: HashSet<i64> = bays.iter().copied().collect();
    assert_eq!(unique.len(), bays.len());

    for entry in &result.selected {
        assert!((entry.breakdown.dimension_sum() - entry.score).abs() <= 0.05);
        assert!(entry.score >= 0.0 && entry.score <= 100.0);
    }
}

// ==========================================
// 场景 1: 黄金路径
// ==========================================
// 50 车: 30 在役 / 12 备用 / 8 检修; 两段均分; 三厂商均分;
// 证书余量充足; 无紧急工单; 6 个活跃 critical 冠名; 20 车在均衡区间
fn golden_fleet() -> InMemoryFleet {
    let mut fleet = InMemoryFleet::empty();
    for id in 1..=50i64 {
        let status = if id <= 30 {
            metro_induction_aps::OperationalStatus::InService
        } else if id <= 42 {
            metro_induction_aps::OperationalStatus::Standby
        } else {
            metro_induction_aps::OperationalStatus::Maintenance
        };
        let depot = if id % 2 == 0 { Depot::DepotA } else { Depot::DepotB };
        add_train(
            &mut fleet,
            TrainSpec {
                id,
                depot,
                vendor: VENDORS[(id % 3) as usize],
                year: if id <= 20 { 2022 } else { 2010 },
                status,
                cert_headroom_days: 90 + id,
                total_km: if id <= 20 { 80_000 + id * 100 } else { 40_000 },
                critical_branding: if id <= 12 && id % 2 == 0 { Some(0.3) } else { None },
                ..TrainSpec::default()
            },
        );
        if id <= 30 {
            add_bay(&mut fleet, id, depot, (1 + (id - 1) % 24) as i32, Some(id));
        }
    }
    fleet
}

#[tokio::test]
async fn test_golden_path_optimal_roster() {
    let result = run(golden_fleet(), OptimiseRequest::new(snapshot_time())).await;

    assert_eq!(result.status, RosterStatus::Optimal);
    assert_core_invariants(&result, 50);
    assert!(result.violations.is_empty());

    let depot = result.compliance.depot_distribution.as_ref().unwrap();
    assert!(depot.depot_a >= 9 && depot.depot_a <= 15, "depot_a={}", depot.depot_a);

    for vendor in VENDORS {
        assert!(
            result.compliance.vendor_distribution[vendor] >= 4,
            "vendor {vendor}"
        );
    }

    let age = result.compliance.age_distribution.as_ref().unwrap();
    assert!(age.new_trains >= 8);

    let branding = result.compliance.branding_priorities.as_ref().unwrap();
    assert!(branding.critical_campaigns >= 6);

    // 检修车全部落选且理由固定
    for entry in &result.rejected {
        if entry.trainset_id > 42 {
            assert_eq!(
                entry.exclusion_reason,
                "under maintenance — excluded from scheduling"
            );
        }
    }
}

// ==========================================
// 场景 2: 证书短缺, 放宽层补足
// ==========================================
#[tokio::test]
async fn test_fitness_shortage_admits_relaxed_tier() {
    let mut fleet = InMemoryFleet::empty();
    for id in 1..=40i64 {
        let (status, valid_certs) = if id <= 20 {
            (metro_induction_aps::OperationalStatus::InService, 3)
        } else if id <= 32 {
            (metro_induction_aps::OperationalStatus::InService, 1)
        } else {
            (metro_induction_aps::OperationalStatus::Maintenance, 3)
        };
        add_train(
            &mut fleet,
            TrainSpec {
                id,
                depot: Depot::DepotB,
                vendor: "Alstom",
                status,
                valid_certs,
                total_km: 60_000 + id * 500,
                ..TrainSpec::default()
            },
        );
        if id <= 32 {
            add_bay(&mut fleet, id, Depot::DepotB, (1 + (id - 1) % 24) as i32, Some(id));
        }
    }

    let result = run(fleet, OptimiseRequest::new(snapshot_time())).await;

    assert_eq!(result.status, RosterStatus::Optimal);
    assert_core_invariants(&result, 40);

    // 仅 1 张有效证书的入选车全部是放宽层
    let relaxed: Vec<_> = result
        .selected
        .iter()
        .filter(|e| e.tier == AdmissionTier::Relaxed)
        .collect();
    assert_eq!(relaxed.len(), 4);
    for entry in &relaxed {
        assert!(entry.trainset_id > 20);
        assert!(!entry.compliance.fitness_certificates_valid);
    }

    assert!(result
        .compliance
        .notes
        .contains(&"relaxed_fitness_used".to_string()));
}

// ==========================================
// 场景 3: 紧急工单阻断最高分车
// ==========================================
#[tokio::test]
async fn test_emergency_job_blocks_top_scorer() {
    let mut fleet = InMemoryFleet::empty();
    for id in 1..=40i64 {
        let depot = if id % 2 == 0 { Depot::DepotA } else { Depot::DepotB };
        add_train(
            &mut fleet,
            TrainSpec {
                id,
                depot,
                vendor: VENDORS[(id % 3) as usize],
                total_km: 60_000 + id * 200,
                ..TrainSpec::default()
            },
        );
        add_bay(&mut fleet, id, depot, (1 + (id - 1) % 24) as i32, Some(id));
    }
    // 41 号车分数拉满, 但带开口紧急工单
    add_train(
        &mut fleet,
        TrainSpec {
            id: 41,
            depot: Depot::DepotB,
            vendor: "Alstom",
            open_emergency: true,
            bogie_condition: 95,
            cleaned_days_ago: Some(1),
            critical_branding: Some(0.2),
            total_km: 80_000,
            ..TrainSpec::default()
        },
    );
    add_bay(&mut fleet, 41, Depot::DepotB, 1, Some(41));

    let result = run(fleet, OptimiseRequest::new(snapshot_time())).await;

    assert_eq!(result.status, RosterStatus::Optimal);
    assert_core_invariants(&result, 41);

    // 最高分车在落选名单首位, 理由为紧急工单
    let blocked = result
        .rejected
        .iter()
        .find(|e| e.trainset_id == 41)
        .expect("blocked train in rejected list");
    assert_eq!(blocked.exclusion_reason, "emergency work order open");
    assert_eq!(result.rejected[0].trainset_id, 41);
    let top_selected_score = result.selected[0].score;
    assert!(blocked.score > top_selected_score);
}

// ==========================================
// 场景 4: 求解超时, 兜底贪心
// ==========================================
#[tokio::test]
async fn test_solver_timeout_triggers_fallback() {
    let mut fleet = InMemoryFleet::empty();
    for id in 1..=100i64 {
        let depot = if id % 2 == 0 { Depot::DepotA } else { Depot::DepotB };
        add_train(
            &mut fleet,
            TrainSpec {
                id,
                depot,
                vendor: VENDORS[(id % 3) as usize],
                total_km: 60_000 + id * 100,
                ..TrainSpec::default()
            },
        );
        if id <= 60 {
            add_bay(&mut fleet, id, depot, (1 + (id - 1) % 24) as i32, Some(id));
        }
    }

    let mut request = OptimiseRequest::new(snapshot_time());
    request.solver_budget_seconds = Some(0.01);
    let result = run(fleet, request).await;

    assert_eq!(result.status, RosterStatus::FallbackUsed);
    assert_core_invariants(&result, 100);
    assert!(result
        .violations
        .iter()
        .any(|v| v.rule == "solver_fallback_used"));
}

// ==========================================
// 场景 5: 单段车队, 段平衡按充足性省略
// ==========================================
#[tokio::test]
async fn test_single_depot_omits_balance_without_violation() {
    let mut fleet = InMemoryFleet::empty();
    for id in 1..=30i64 {
        add_train(
            &mut fleet,
            TrainSpec {
                id,
                depot: Depot::DepotA,
                vendor: VENDORS[(id % 3) as usize],
                total_km: 60_000 + id * 300,
                ..TrainSpec::default()
            },
        );
        add_bay(&mut fleet, id, Depot::DepotA, (1 + (id - 1) % 24) as i32, Some(id));
    }
    for id in 31..=35i64 {
        add_train(
            &mut fleet,
            TrainSpec {
                id,
                depot: Depot::DepotB,
                vendor: "Alstom",
                status: metro_induction_aps::OperationalStatus::Maintenance,
                ..TrainSpec::default()
            },
        );
    }

    let result = run(fleet, OptimiseRequest::new(snapshot_time())).await;

    assert!(matches!(
        result.status,
        RosterStatus::Optimal | RosterStatus::Feasible
    ));
    assert_core_invariants(&result, 35);

    let depot = result.compliance.depot_distribution.as_ref().unwrap();
    assert_eq!(depot.depot_a, 24);
    assert_eq!(depot.depot_b, 0);
    // 段平衡未纳入模型, 不得报违规
    assert!(!result.violations.iter().any(|v| v.rule == "depot_balance"));
}

// ==========================================
// 场景 6: 车队不足
// ==========================================
#[tokio::test]
async fn test_insufficient_fleet_is_infeasible() {
    let mut fleet = InMemoryFleet::empty();
    for id in 1..=20i64 {
        add_train(&mut fleet, TrainSpec { id, ..TrainSpec::default() });
        add_bay(&mut fleet, id, Depot::DepotA, (id % 24) as i32 + 1, Some(id));
    }

    let result = run(fleet, OptimiseRequest::new(snapshot_time())).await;

    assert_eq!(result.status, RosterStatus::Infeasible);
    assert!(result.selected.is_empty());
    assert_eq!(result.rejected.len(), 20);
    let violation = &result.violations[0];
    assert_eq!(violation.rule, "insufficient_fleet");
    assert_eq!(violation.detail, "need 24, have 20");
}

// ==========================================
// 取消传播
// ==========================================
#[tokio::test]
async fn test_cancellation_yields_infeasible_with_note() {
    let mut fleet = InMemoryFleet::empty();
    for id in 1..=30i64 {
        add_train(&mut fleet, TrainSpec { id, ..TrainSpec::default() });
        add_bay(&mut fleet, id, Depot::DepotA, (1 + (id - 1) % 24) as i32, Some(id));
    }

    let scheduler = InductionScheduler::new(Arc::new(fleet), SchedulerConfig::default());
    let cancel = CancelFlag::new();
    cancel.cancel();
    let result = scheduler
        .optimise_with_cancel(&OptimiseRequest::new(snapshot_time()), &cancel)
        .await
        .unwrap();

    assert_eq!(result.status, RosterStatus::Infeasible);
    assert!(result.selected.is_empty());
    assert!(result.violations.iter().any(|v| v.rule == "cancelled"));
}

// ==========================================
// 结果文档投影
// ==========================================
#[tokio::test]
async fn test_report_projection_contract() {
    let fleet = golden_fleet();
    let scheduler = InductionScheduler::new(Arc::new(fleet), SchedulerConfig::default());
    let result = scheduler
        .optimise(&OptimiseRequest::new(snapshot_time()))
        .await
        .unwrap();
    let report = scheduler.report(&result);

    assert_eq!(report.scheduling_summary.status, RosterStatus::Optimal);
    assert_eq!(report.bay_assignments.len(), 24);
    assert_eq!(report.selected.len(), 24);
    assert_eq!(
        report.scheduling_summary.fleet_considered,
        report.selected.len() + report.rejected.len()
    );

    // 文档字段顺序是契约
    let json = serde_json::to_string(&report).unwrap();
    let summary = json.find("scheduling_summary").unwrap();
    let compliance = json.find("\"compliance\"").unwrap();
    let bays = json.find("bay_assignments").unwrap();
    assert!(summary < compliance && compliance < bays);
}
