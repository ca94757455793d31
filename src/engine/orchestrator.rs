// ==========================================
// 地铁夜间编组排班系统 - 排班门面
// ==========================================
// 用途: 协调 装载 -> 评分 -> 准入 -> 建模 -> 求解 -> 提取 -> 报告
// 红线: 无持久状态, 同输入同输出; 求解失败走兜底路径
// ==========================================

use crate::config::SchedulerConfig;
use crate::domain::types::{AdmissionTier, RosterStatus, SolveStatus};
use crate::domain::{
    OptimiseRequest, OptimiseResult, Score, SolverStats, StablingBay, TrainsetSnapshot, Violation,
};
use crate::engine::compliance::ComplianceReporter;
use crate::engine::eligibility::EligibilityGate;
use crate::engine::error::ScheduleError;
use crate::engine::extractor::{ExtractionContext, SolutionExtractor};
use crate::engine::model::RosterModelBuilder;
use crate::engine::report::InductionReport;
use crate::engine::scoring::ScoringEngine;
use crate::engine::solver::{CancelFlag, MilpRosterSolver, RosterSolver};
use crate::perf::PerfGuard;
use crate::repository::FleetDataSource;
use chrono::NaiveDate;
use std::collections::HashSet;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

// ==========================================
// InductionScheduler - 排班门面
// ==========================================
pub struct InductionScheduler<D>
where
    D: FleetDataSource,
{
    source: Arc<D>,
    config: SchedulerConfig,
    solver: Box<dyn RosterSolver>,
}

impl<D> InductionScheduler<D>
where
    D: FleetDataSource,
{
    pub fn new(source: Arc<D>, config: SchedulerConfig) -> Self {
        Self {
            source,
            config,
            solver: Box::new(MilpRosterSolver::new()),
        }
    }

    /// 注入替代求解器 (贪心桩 / 其他整数规划实现)
    pub fn with_solver(mut self, solver: Box<dyn RosterSolver>) -> Self {
        self.solver = solver;
        self
    }

    /// 执行一次完整排班
    pub async fn optimise(&self, request: &OptimiseRequest) -> Result<OptimiseResult, ScheduleError> {
        self.optimise_with_cancel(request, &CancelFlag::new()).await
    }

    /// 执行一次完整排班 (可取消)
    pub async fn optimise_with_cancel(
        &self,
        request: &OptimiseRequest,
        cancel: &CancelFlag,
    ) -> Result<OptimiseResult, ScheduleError> {
        let _perf = PerfGuard::new("optimise");
        let started = Instant::now();

        let mut cfg = self.config.clone();
        if let Some(n) = request.roster_size {
            cfg.roster_size = n;
        }
        if let Some(b) = request.solver_budget_seconds {
            cfg.solver_budget_seconds = b;
        }
        // 前置条件违规属程序员错误, 直接断言
        assert!(cfg.roster_size > 0, "roster_size 必须为正整数");
        assert!(
            cfg.solver_budget_seconds > 0.0,
            "solver_budget_seconds 必须为正"
        );

        let today = request.snapshot_time.date_naive();

        info!(
            scheduling_date = %today,
            roster_size = cfg.roster_size,
            budget_s = cfg.solver_budget_seconds,
            "开始执行排班流程"
        );

        // ==========================================
        // 步骤1: 装载车队快照
        // ==========================================
        debug!("步骤1: 装载车队快照");
        let (fleet, bays) = self.load_snapshot().await?;

        info!(
            fleet_count = fleet.len(),
            bay_count = bays.len(),
            "车队快照装载完成"
        );

        // ==========================================
        // 步骤2: 评分 (纯函数, 逐车独立)
        // ==========================================
        debug!("步骤2: 执行综合评分");
        let home_available: Vec<bool> = fleet
            .iter()
            .map(|snapshot| {
                bays.iter().any(|bay| {
                    bay.currently_assigned_trainset == Some(snapshot.trainset_id())
                        && bay.is_available()
                })
            })
            .collect();

        let scoring = ScoringEngine::new(cfg.mileage_band);
        let scores: Vec<Score> = fleet
            .iter()
            .zip(home_available.iter())
            .map(|(snapshot, &home)| scoring.score(snapshot, home, today))
            .collect();

        let extractor = SolutionExtractor::new(cfg.clone());
        let tiers_none: Vec<Option<AdmissionTier>> = vec![None; fleet.len()];

        // ==========================================
        // 步骤2.5: 规模前置条件
        // ==========================================
        if fleet.len() < cfg.roster_size {
            warn!(
                fleet = fleet.len(),
                roster_size = cfg.roster_size,
                "车队规模不足, 直接返回 infeasible"
            );
            let ctx = ExtractionContext {
                fleet: &fleet,
                scores: &scores,
                tiers: &tiers_none,
                home_available: &home_available,
                today,
            };
            return Ok(OptimiseResult::infeasible(
                today,
                cfg.roster_size,
                extractor.reject_all(&ctx),
                Violation::new(
                    "insufficient_fleet",
                    format!("need {}, have {}", cfg.roster_size, fleet.len()),
                ),
                started.elapsed().as_millis() as u64,
            ));
        }

        let available_bays: Vec<StablingBay> =
            bays.iter().filter(|b| b.is_available()).cloned().collect();
        if available_bays.len() < cfg.roster_size {
            warn!(
                available = available_bays.len(),
                roster_size = cfg.roster_size,
                "可用股道不足, 直接返回 infeasible"
            );
            let ctx = ExtractionContext {
                fleet: &fleet,
                scores: &scores,
                tiers: &tiers_none,
                home_available: &home_available,
                today,
            };
            return Ok(OptimiseResult::infeasible(
                today,
                cfg.roster_size,
                extractor.reject_all(&ctx),
                Violation::new(
                    "insufficient_bays",
                    format!("need {}, have {}", cfg.roster_size, available_bays.len()),
                ),
                started.elapsed().as_millis() as u64,
            ));
        }

        // ==========================================
        // 步骤3: 三级准入漏斗
        // ==========================================
        debug!("步骤3: 执行准入判定");
        let gate = EligibilityGate::new(cfg.enable_relaxation);
        let pool = match gate.build_pool(&fleet, today, cfg.roster_size) {
            Ok(pool) => pool,
            Err(ScheduleError::InsufficientFleet { need, have }) => {
                warn!(need, have, "放宽后池仍不足, 返回 infeasible");
                let ctx = ExtractionContext {
                    fleet: &fleet,
                    scores: &scores,
                    tiers: &tiers_none,
                    home_available: &home_available,
                    today,
                };
                return Ok(OptimiseResult::infeasible(
                    today,
                    cfg.roster_size,
                    extractor.reject_all(&ctx),
                    Violation::new(
                        "insufficient_fleet",
                        format!("need {}, have {}", need, have),
                    ),
                    started.elapsed().as_millis() as u64,
                ));
            }
            Err(other) => return Err(other),
        };

        let mut tiers: Vec<Option<AdmissionTier>> = vec![None; fleet.len()];
        for entry in &pool {
            tiers[entry.index] = Some(entry.tier);
        }

        info!(pool = pool.len(), "准入判定完成");

        // ==========================================
        // 步骤4: 装配约束模型
        // ==========================================
        debug!("步骤4: 装配约束模型");
        let model = RosterModelBuilder::new(cfg.clone()).build(
            &pool,
            &fleet,
            &scores,
            &home_available,
            &available_bays,
            today,
        );

        let ctx = ExtractionContext {
            fleet: &fleet,
            scores: &scores,
            tiers: &tiers,
            home_available: &home_available,
            today,
        };

        // ==========================================
        // 步骤5: 求解 (预算内, 可取消)
        // ==========================================
        if cancel.is_cancelled() {
            return Ok(self.cancelled_result(&extractor, &ctx, &cfg, today, started));
        }

        debug!("步骤5: 提交求解");
        let budget = Duration::from_secs_f64(cfg.solver_budget_seconds);
        let outcome = self.solver.solve(&model, budget, cancel);

        if cancel.is_cancelled() {
            return Ok(self.cancelled_result(&extractor, &ctx, &cfg, today, started));
        }

        // ==========================================
        // 步骤6: 提取 / 兜底 + 合规报告
        // ==========================================
        let reporter = ComplianceReporter::new(cfg.clone());
        let (status, roster, objective, mut violations) = match outcome.status {
            SolveStatus::Optimal | SolveStatus::Feasible => {
                debug!("步骤6: 从求解赋值提取名单");
                let roster = extractor.extract(&ctx, &model, &outcome);
                let status = if outcome.status == SolveStatus::Optimal {
                    RosterStatus::Optimal
                } else {
                    RosterStatus::Feasible
                };
                (status, roster, outcome.objective, Vec::new())
            }
            SolveStatus::Infeasible | SolveStatus::Timeout | SolveStatus::Error => {
                warn!(solver_status = %outcome.status, "求解失败, 切换兜底贪心投影");
                let (roster, objective) = extractor.fallback(&ctx, &model);
                let violations = vec![Violation::new(
                    "solver_fallback_used",
                    format!("solver status {}", outcome.status),
                )];
                (RosterStatus::FallbackUsed, roster, objective, violations)
            }
        };

        let (compliance, soft_violations) = reporter.report(&roster, &model, today);
        violations.extend(soft_violations);

        let optimization_score = if roster.selected.is_empty() {
            0.0
        } else {
            let mean: f64 = roster.selected.iter().map(|e| e.score).sum::<f64>()
                / roster.selected.len() as f64;
            (mean * 10.0).round() / 10.0
        };

        let result = OptimiseResult {
            status,
            scheduling_date: today,
            roster_size: cfg.roster_size,
            selected: roster.selected,
            rejected: roster.rejected,
            objective_value: objective,
            optimization_score,
            compliance,
            violations,
            solver_stats: Some(SolverStats {
                total_variables: model.total_variables(),
                total_constraints: model.total_constraints(),
                objective_value: objective,
            }),
            execution_ms: started.elapsed().as_millis() as u64,
        };

        info!(
            status = %result.status,
            selected = result.selected.len(),
            objective = result.objective_value,
            execution_ms = result.execution_ms,
            "排班流程完成"
        );

        Ok(result)
    }

    /// 结果文档投影
    pub fn report(&self, result: &OptimiseResult) -> InductionReport {
        InductionReport::from_result(result)
    }

    // ==========================================
    // 内部装配
    // ==========================================

    /// 一次性取齐七类集合并装配快照; 缺失的关联记录保守降级
    async fn load_snapshot(
        &self,
    ) -> Result<(Vec<TrainsetSnapshot>, Vec<StablingBay>), ScheduleError> {
        let mut trainsets = self.source.trainsets().await?;
        trainsets.sort_by_key(|t| t.trainset_id);

        let ids: Vec<i64> = trainsets.iter().map(|t| t.trainset_id).collect();
        let mut certificates = self.source.fitness_certificates(&ids).await?;
        let mut job_cards = self.source.job_cards(&ids).await?;
        let mut branding = self.source.branding_commitments(&ids).await?;
        let mut mileage = self.source.mileage_records(&ids).await?;
        let mut cleaning = self.source.cleaning_slots(&ids).await?;

        let fleet: Vec<TrainsetSnapshot> = trainsets
            .into_iter()
            .map(|trainset| {
                let id = trainset.trainset_id;
                TrainsetSnapshot {
                    trainset,
                    certificates: certificates.remove(&id).unwrap_or_default(),
                    job_cards: job_cards.remove(&id).unwrap_or_default(),
                    branding: branding.remove(&id),
                    mileage: mileage.remove(&id).unwrap_or_default(),
                    cleaning_slots: cleaning.remove(&id).unwrap_or_default(),
                }
            })
            .collect();

        let mut bays = self.source.bays().await?;
        bays.sort_by_key(|b| b.bay_id);
        // 股道号不可重复, 属程序员/数据建模错误
        let unique: HashSet<i64> = bays.iter().map(|b| b.bay_id).collect();
        assert_eq!(unique.len(), bays.len(), "股道号必须唯一");

        Ok((fleet, bays))
    }

    fn cancelled_result(
        &self,
        extractor: &SolutionExtractor,
        ctx: &ExtractionContext<'_>,
        cfg: &SchedulerConfig,
        today: NaiveDate,
        started: Instant,
    ) -> OptimiseResult {
        warn!("排班调用被取消");
        OptimiseResult::infeasible(
            today,
            cfg.roster_size,
            extractor.reject_all(ctx),
            Violation::new("cancelled", "optimisation cancelled by caller"),
            started.elapsed().as_millis() as u64,
        )
    }
}
