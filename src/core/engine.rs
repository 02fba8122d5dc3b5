use super::error::SimulationError;
use super::strategy::select_priority_order;
use super::types::{ComparisonResult, DebtInstrument, MonthTracePoint, PayoffSummary, Strategy};

/// Balances at or below this are treated as fully paid, so sub-cent tails
/// cannot keep a run alive forever.
pub const SETTLED_EPSILON: f64 = 0.01;

/// Hard bound on simulated months (1,000 years). Hitting it means the budget
/// never retires the portfolio; the run reports `converged == false` instead
/// of looping.
pub const SAFETY_CEILING_MONTHS: u32 = 12_000;

/// Projects month-by-month amortization of `instruments` under `strategy`
/// with `extra_monthly_payment` of discretionary budget. The caller's
/// snapshot is never mutated; the run owns its working copy.
pub fn run_simulation(
    strategy: Strategy,
    instruments: &[DebtInstrument],
    extra_monthly_payment: f64,
) -> Result<PayoffSummary, SimulationError> {
    validate_inputs(instruments, extra_monthly_payment)?;
    let ordered = select_priority_order(strategy, instruments);
    Ok(simulate(ordered, extra_monthly_payment, strategy, None))
}

/// Same run as `run_simulation`, also returning one trace point per simulated
/// month for charting.
pub fn run_simulation_with_trace(
    strategy: Strategy,
    instruments: &[DebtInstrument],
    extra_monthly_payment: f64,
) -> Result<(PayoffSummary, Vec<MonthTracePoint>), SimulationError> {
    validate_inputs(instruments, extra_monthly_payment)?;
    let ordered = select_priority_order(strategy, instruments);
    let mut trace = Vec::new();
    let summary = simulate(ordered, extra_monthly_payment, strategy, Some(&mut trace));
    Ok((summary, trace))
}

/// Runs every strategy on the same snapshot and ranks the outcomes.
pub fn compare_strategies(
    instruments: &[DebtInstrument],
    extra_monthly_payment: f64,
) -> Result<ComparisonResult, SimulationError> {
    validate_inputs(instruments, extra_monthly_payment)?;
    let summaries: Vec<PayoffSummary> = Strategy::ALL
        .iter()
        .map(|&strategy| {
            simulate(
                select_priority_order(strategy, instruments),
                extra_monthly_payment,
                strategy,
                None,
            )
        })
        .collect();
    Ok(build_comparison(summaries))
}

fn build_comparison(summaries: Vec<PayoffSummary>) -> ComparisonResult {
    let cheapest_index = summaries
        .iter()
        .enumerate()
        .min_by(|(_, a), (_, b)| {
            a.total_interest_accrued
                .total_cmp(&b.total_interest_accrued)
        })
        .map(|(idx, _)| idx)
        .unwrap_or(0);
    let fastest_index = summaries
        .iter()
        .enumerate()
        .min_by_key(|(_, summary)| summary.periods_elapsed)
        .map(|(idx, _)| idx)
        .unwrap_or(0);

    ComparisonResult {
        summaries,
        cheapest_index,
        fastest_index,
    }
}

fn validate_inputs(
    instruments: &[DebtInstrument],
    extra_monthly_payment: f64,
) -> Result<(), SimulationError> {
    if instruments.is_empty() {
        return Err(SimulationError::invalid_input(
            "instruments",
            "portfolio must contain at least one instrument",
        ));
    }
    if !extra_monthly_payment.is_finite() || extra_monthly_payment < 0.0 {
        return Err(SimulationError::invalid_input(
            "extraMonthlyPayment",
            format!("must be a finite non-negative amount, got {extra_monthly_payment}"),
        ));
    }
    for instrument in instruments {
        instrument.validate()?;
    }
    Ok(())
}

fn is_open(debt: &DebtInstrument) -> bool {
    debt.principal_balance > SETTLED_EPSILON
}

struct MonthOutcome {
    interest: f64,
    principal: f64,
}

/// One calendar month: interest accrual, minimum payments to every open
/// non-target instrument, then the whole remaining pool to the target with a
/// same-month cascade into the next open instruments as they settle.
fn advance_month(ordered: &mut [DebtInstrument], monthly_pool: f64) -> MonthOutcome {
    let mut interest_accrued = 0.0;
    let mut principal_applied = 0.0;

    for debt in ordered.iter_mut().filter(|d| is_open(d)) {
        let interest = debt.monthly_interest();
        debt.principal_balance += interest;
        interest_accrued += interest;
    }

    let mut pool = monthly_pool;

    // The first open instrument in priority order is the target. Its own
    // minimum is folded into the pool remainder, never paid separately.
    if let Some(target_idx) = ordered.iter().position(is_open) {
        for (idx, debt) in ordered.iter_mut().enumerate() {
            if idx == target_idx || !is_open(debt) {
                continue;
            }
            let payment = debt.minimum_payment.min(debt.principal_balance);
            debt.principal_balance -= payment;
            pool -= payment;
            principal_applied += payment;
        }

        for debt in ordered.iter_mut().skip(target_idx) {
            if pool <= 0.0 {
                break;
            }
            if !is_open(debt) {
                continue;
            }
            let payment = pool.min(debt.principal_balance);
            debt.principal_balance -= payment;
            pool -= payment;
            principal_applied += payment;
        }
    }

    // Clamp near-zero tails to exactly zero. The written-off residue counts
    // as principal applied so interest + payments reconciles with the
    // balance delta.
    for debt in ordered.iter_mut() {
        if debt.principal_balance > 0.0 && !is_open(debt) {
            principal_applied += debt.principal_balance;
            debt.principal_balance = 0.0;
        }
    }

    MonthOutcome {
        interest: interest_accrued,
        principal: principal_applied,
    }
}

fn simulate(
    mut ordered: Vec<DebtInstrument>,
    extra_monthly_payment: f64,
    strategy: Strategy,
    mut trace: Option<&mut Vec<MonthTracePoint>>,
) -> PayoffSummary {
    // The pool is fixed for the whole run: minimums freed by settled
    // instruments stay available for reallocation.
    let monthly_pool: f64 =
        ordered.iter().map(|d| d.minimum_payment).sum::<f64>() + extra_monthly_payment;

    let mut total_interest = 0.0;
    let mut total_payments = 0.0;
    let mut periods = 0u32;

    while periods < SAFETY_CEILING_MONTHS && ordered.iter().any(is_open) {
        periods += 1;
        let outcome = advance_month(&mut ordered, monthly_pool);
        total_interest += outcome.interest;
        total_payments += outcome.principal;

        if let Some(points) = trace.as_deref_mut() {
            points.push(MonthTracePoint {
                month: periods,
                interest_accrued: outcome.interest,
                principal_applied: outcome.principal,
                ending_total_balance: ordered.iter().map(|d| d.principal_balance).sum(),
                open_instruments: ordered.iter().filter(|d| is_open(d)).count(),
            });
        }
    }

    let converged = !ordered.iter().any(is_open);
    let instruments_settled = ordered
        .iter()
        .filter(|d| d.principal_balance == 0.0)
        .count();

    PayoffSummary {
        strategy_name: strategy.name().to_string(),
        periods_elapsed: periods,
        total_interest_accrued: total_interest,
        total_payments_applied: total_payments,
        instruments_settled,
        converged,
        final_instrument_states: ordered,
    }
}
