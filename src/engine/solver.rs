// ==========================================
// 地铁夜间编组排班系统 - 求解适配层
// ==========================================
// 职责: 模型翻译 + 墙钟预算 + 取消传播, 不解释模型语义
// 红线: 模型层不引用求解器类型, 本文件是唯一接缝
// ==========================================

use crate::domain::types::SolveStatus;
use crate::engine::model::RosterModel;
use good_lp::{
    constraint, default_solver, variable, variables, Expression, ResolutionError, Solution,
    SolverModel, Variable,
};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, RecvTimeoutError};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};
use tracing::{debug, warn};

/// 预算轮询粒度
const POLL_INTERVAL: Duration = Duration::from_millis(25);

// ==========================================
// CancelFlag - 取消令牌
// ==========================================
#[derive(Debug, Clone, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

// ==========================================
// SolveOutcome - 求解裁决
// ==========================================
#[derive(Debug, Clone)]
pub struct SolveOutcome {
    pub status: SolveStatus,
    pub objective: f64,
    pub selection: Vec<bool>,           // 与 model.candidates 对齐
    pub assignment: Vec<Option<usize>>, // 候选下标 -> 股道下标
}

impl SolveOutcome {
    fn empty(status: SolveStatus) -> Self {
        Self {
            status,
            objective: 0.0,
            selection: Vec::new(),
            assignment: Vec::new(),
        }
    }
}

// ==========================================
// RosterSolver - 求解器契约
// ==========================================
// 整数规划 / 约束规划 / 贪心桩实现均可坐在这条接缝后
pub trait RosterSolver: Send + Sync {
    fn solve(&self, model: &RosterModel, budget: Duration, cancel: &CancelFlag) -> SolveOutcome;
}

// ==========================================
// MilpRosterSolver - MILP 求解适配
// ==========================================
// 求解在工作线程内进行; 超出预算或被取消时放弃该线程的结果
#[derive(Debug, Default)]
pub struct MilpRosterSolver;

impl MilpRosterSolver {
    pub fn new() -> Self {
        Self
    }
}

impl RosterSolver for MilpRosterSolver {
    fn solve(&self, model: &RosterModel, budget: Duration, cancel: &CancelFlag) -> SolveOutcome {
        let owned = model.clone();
        let (tx, rx) = mpsc::channel();
        thread::spawn(move || {
            let _ = tx.send(solve_assembled(&owned));
        });

        let deadline = Instant::now() + budget;
        loop {
            if cancel.is_cancelled() {
                // 无可用 incumbent, 报告 error 由上层决定语义
                warn!("求解被调用方取消");
                return SolveOutcome::empty(SolveStatus::Error);
            }
            match rx.recv_timeout(POLL_INTERVAL) {
                Ok(outcome) => return outcome,
                Err(RecvTimeoutError::Timeout) => {
                    if Instant::now() >= deadline {
                        warn!(budget_ms = budget.as_millis() as u64, "求解超出墙钟预算");
                        return SolveOutcome::empty(SolveStatus::Timeout);
                    }
                }
                Err(RecvTimeoutError::Disconnected) => {
                    return SolveOutcome::empty(SolveStatus::Error);
                }
            }
        }
    }
}

/// 模型翻译与求解 (工作线程内)
fn solve_assembled(model: &RosterModel) -> SolveOutcome {
    let n = model.candidates.len();
    let m = model.bays.len();

    let mut vars = variables!();
    let xs: Vec<Variable> = (0..n).map(|_| vars.add(variable().binary())).collect();
    let ys: Vec<Vec<Variable>> = (0..n)
        .map(|_| (0..m).map(|_| vars.add(variable().binary())).collect())
        .collect();

    // 目标: Σ score_int * x[t] + Σ bay_bonus * y[t,b]
    let mut objective = Expression::from(0);
    for t in 0..n {
        objective += model.candidates[t].score_int as f64 * xs[t];
        for b in 0..m {
            let bonus = model.bay_bonus[t][b];
            if bonus != 0 {
                objective += bonus as f64 * ys[t][b];
            }
        }
    }

    let mut problem = vars.maximise(objective).using(default_solver);

    // H1: 选数恰为目标规模
    let mut selected_total = Expression::from(0);
    for t in 0..n {
        selected_total += xs[t];
    }
    problem = problem.with(constraint!(selected_total == model.roster_size as f64));

    // H2: 入选恰落一股, 未入选不落股
    for t in 0..n {
        let mut row = Expression::from(0);
        for b in 0..m {
            row += ys[t][b];
        }
        problem = problem.with(constraint!(row - xs[t] == 0));
    }

    // H3: 每股至多一车
    for b in 0..m {
        let mut col = Expression::from(0);
        for t in 0..n {
            col += ys[t][b];
        }
        problem = problem.with(constraint!(col <= 1));
    }

    // H4: 钉零的兜底候选
    for t in 0..n {
        if model.candidates[t].fixed_zero {
            problem = problem.with(constraint!(xs[t] == 0));
        }
    }

    // 软约束: 有界不等式
    for soft in &model.soft_constraints {
        let mut sum = Expression::from(0);
        for &t in &soft.members {
            sum += xs[t];
        }
        if let Some(lower) = soft.lower {
            problem = problem.with(constraint!(sum.clone() >= lower as f64));
        }
        if let Some(upper) = soft.upper {
            problem = problem.with(constraint!(sum.clone() <= upper as f64));
        }
    }

    match problem.solve() {
        Ok(solution) => {
            let selection: Vec<bool> = xs.iter().map(|&x| solution.value(x) > 0.5).collect();
            let assignment: Vec<Option<usize>> = (0..n)
                .map(|t| {
                    if !selection[t] {
                        return None;
                    }
                    (0..m).find(|&b| solution.value(ys[t][b]) > 0.5)
                })
                .collect();

            // 按整数系数复算目标值, 避免浮点噪声进入结果
            let mut objective = 0i64;
            for t in 0..n {
                if selection[t] {
                    objective += model.candidates[t].score_int;
                    if let Some(b) = assignment[t] {
                        objective += model.bay_bonus[t][b];
                    }
                }
            }

            debug!(objective, "求解完成");
            SolveOutcome {
                status: SolveStatus::Optimal,
                objective: objective as f64,
                selection,
                assignment,
            }
        }
        Err(ResolutionError::Infeasible) => {
            debug!("求解器报告不可行");
            SolveOutcome::empty(SolveStatus::Infeasible)
        }
        Err(e) => {
            warn!(error = %e, "求解器错误");
            SolveOutcome::empty(SolveStatus::Error)
        }
    }
}
