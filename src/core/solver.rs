use super::engine::run_simulation;
use super::error::SimulationError;
use super::types::{DebtInstrument, Strategy};

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum GoalType {
    /// Retire the whole portfolio within `target` months.
    HorizonTarget,
    /// Keep total interest accrued at or below `target` currency units.
    InterestCap,
}

/// Bisection search settings for the smallest sufficient extra payment.
#[derive(Debug, Clone, Copy)]
pub struct GoalSolveConfig {
    pub goal_type: GoalType,
    pub strategy: Strategy,
    /// Months for `HorizonTarget`, currency units for `InterestCap`.
    pub target: f64,
    pub search_min: f64,
    pub search_max: f64,
    pub tolerance: f64,
    pub max_iterations: u32,
}

#[derive(Debug, Clone, Copy)]
pub struct GoalSolveIteration {
    pub iteration: u32,
    pub lower_bound: f64,
    pub upper_bound: f64,
    pub candidate_value: f64,
    pub periods_elapsed: u32,
    pub total_interest_accrued: f64,
    pub meets_goal: bool,
}

#[derive(Debug, Clone)]
pub struct GoalSolveResult {
    pub goal_type: GoalType,
    pub strategy: Strategy,
    pub target: f64,
    pub search_min: f64,
    pub search_max: f64,
    pub tolerance: f64,
    pub max_iterations: u32,
    pub solved_extra_payment: Option<f64>,
    pub achieved_periods: Option<u32>,
    pub achieved_interest: Option<f64>,
    pub iterations: Vec<GoalSolveIteration>,
    pub converged: bool,
    pub feasible: bool,
    pub message: String,
}

#[derive(Debug, Clone, Copy)]
struct CandidateEval {
    converged: bool,
    periods_elapsed: u32,
    total_interest_accrued: f64,
}

/// Finds the smallest extra monthly payment that satisfies the goal. Both
/// goal metrics are monotone non-increasing in the extra payment and the
/// engine is deterministic, so plain bisection between the search bounds
/// applies.
pub fn solve_goal(
    instruments: &[DebtInstrument],
    config: GoalSolveConfig,
) -> Result<GoalSolveResult, SimulationError> {
    validate_config(config)?;

    let mut iterations = Vec::with_capacity(config.max_iterations as usize);
    let low_eval = evaluate_candidate(instruments, config, config.search_min)?;
    let high_eval = evaluate_candidate(instruments, config, config.search_max)?;

    let mut solved_value = None;
    let mut converged = false;
    let feasible;
    let message;

    if meets_goal(config, low_eval) {
        solved_value = Some(config.search_min);
        converged = true;
        feasible = true;
        message = "Already meets the goal at the lower search bound.".to_string();
    } else if !meets_goal(config, high_eval) {
        feasible = false;
        message = "No feasible extra payment within the search bounds.".to_string();
    } else {
        let mut lo = config.search_min;
        let mut hi = config.search_max;
        let mut it = 0;
        while it < config.max_iterations {
            it += 1;
            let mid = (lo + hi) * 0.5;
            let eval = evaluate_candidate(instruments, config, mid)?;
            let meets = meets_goal(config, eval);
            iterations.push(GoalSolveIteration {
                iteration: it,
                lower_bound: lo,
                upper_bound: hi,
                candidate_value: mid,
                periods_elapsed: eval.periods_elapsed,
                total_interest_accrued: eval.total_interest_accrued,
                meets_goal: meets,
            });

            if meets {
                hi = mid;
            } else {
                lo = mid;
            }

            if (hi - lo).abs() <= config.tolerance {
                converged = true;
                solved_value = Some(hi);
                break;
            }
        }
        if solved_value.is_none() {
            solved_value = Some(hi);
        }
        feasible = true;
        message = if converged {
            "Solved required extra payment.".to_string()
        } else {
            "Reached max iterations before tolerance was met; returning best estimate.".to_string()
        };
    }

    let mut achieved_periods = None;
    let mut achieved_interest = None;
    if let Some(value) = solved_value {
        let eval = evaluate_candidate(instruments, config, value)?;
        achieved_periods = Some(eval.periods_elapsed);
        achieved_interest = Some(eval.total_interest_accrued);
    }

    Ok(GoalSolveResult {
        goal_type: config.goal_type,
        strategy: config.strategy,
        target: config.target,
        search_min: config.search_min,
        search_max: config.search_max,
        tolerance: config.tolerance,
        max_iterations: config.max_iterations,
        solved_extra_payment: solved_value,
        achieved_periods,
        achieved_interest,
        iterations,
        converged,
        feasible,
        message,
    })
}

fn evaluate_candidate(
    instruments: &[DebtInstrument],
    config: GoalSolveConfig,
    extra_payment: f64,
) -> Result<CandidateEval, SimulationError> {
    let summary = run_simulation(config.strategy, instruments, extra_payment)?;
    Ok(CandidateEval {
        converged: summary.converged,
        periods_elapsed: summary.periods_elapsed,
        total_interest_accrued: summary.total_interest_accrued,
    })
}

fn meets_goal(config: GoalSolveConfig, eval: CandidateEval) -> bool {
    if !eval.converged {
        return false;
    }
    match config.goal_type {
        GoalType::HorizonTarget => (eval.periods_elapsed as f64) <= config.target,
        GoalType::InterestCap => eval.total_interest_accrued <= config.target,
    }
}

fn validate_config(config: GoalSolveConfig) -> Result<(), SimulationError> {
    if !config.target.is_finite() || config.target < 0.0 {
        return Err(SimulationError::invalid_input(
            "target",
            "must be a finite non-negative number",
        ));
    }
    if !config.search_min.is_finite() || config.search_min < 0.0 {
        return Err(SimulationError::invalid_input(
            "searchMin",
            "must be a finite non-negative amount",
        ));
    }
    if !config.search_max.is_finite() || config.search_max <= config.search_min {
        return Err(SimulationError::invalid_input(
            "searchMax",
            "must be finite and greater than searchMin",
        ));
    }
    if !config.tolerance.is_finite() || config.tolerance <= 0.0 {
        return Err(SimulationError::invalid_input(
            "tolerance",
            "must be greater than zero",
        ));
    }
    if config.max_iterations == 0 {
        return Err(SimulationError::invalid_input(
            "maxIterations",
            "must be greater than zero",
        ));
    }
    Ok(())
}
