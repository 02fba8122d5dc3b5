use serde::{Deserialize, Serialize};

use super::error::SimulationError;

/// Repayment priority strategies. Hybrid currently ranks instruments exactly
/// like Avalanche; see `select_priority_order`.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum Strategy {
    Snowball,
    Avalanche,
    Hybrid,
}

impl Strategy {
    pub const ALL: [Strategy; 3] = [Strategy::Snowball, Strategy::Avalanche, Strategy::Hybrid];

    pub fn name(self) -> &'static str {
        match self {
            Strategy::Snowball => "snowball",
            Strategy::Avalanche => "avalanche",
            Strategy::Hybrid => "hybrid",
        }
    }
}

/// One liability in the portfolio. The caller-supplied snapshot is never
/// mutated; the engine works on its own copies and only ever moves
/// `principal_balance`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DebtInstrument {
    pub id: String,
    pub name: String,
    pub principal_balance: f64,
    /// Annual interest rate in basis points (1 bp = 0.01%).
    pub annual_rate_bps: u32,
    /// Contractual floor payment per month while the balance is open.
    pub minimum_payment: f64,
    /// Advisory display ordering for the caller. The strategy decides the
    /// actual allocation order, not this field.
    #[serde(default)]
    pub priority_index: u32,
}

impl DebtInstrument {
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        principal_balance: f64,
        annual_rate_bps: u32,
        minimum_payment: f64,
    ) -> Result<Self, SimulationError> {
        let instrument = Self {
            id: id.into(),
            name: name.into(),
            principal_balance,
            annual_rate_bps,
            minimum_payment,
            priority_index: 0,
        };
        instrument.validate()?;
        Ok(instrument)
    }

    /// Rejects amounts the engine must never see. Construction through `new`
    /// runs this; values deserialized from the wire are checked again before
    /// a simulation starts.
    pub fn validate(&self) -> Result<(), SimulationError> {
        if !self.principal_balance.is_finite() || self.principal_balance < 0.0 {
            return Err(SimulationError::invalid_input(
                "principalBalance",
                format!(
                    "must be a finite non-negative amount, got {} for {:?}",
                    self.principal_balance, self.id
                ),
            ));
        }
        if !self.minimum_payment.is_finite() || self.minimum_payment < 0.0 {
            return Err(SimulationError::invalid_input(
                "minimumPayment",
                format!(
                    "must be a finite non-negative amount, got {} for {:?}",
                    self.minimum_payment, self.id
                ),
            ));
        }
        Ok(())
    }

    pub fn monthly_interest(&self) -> f64 {
        periodic_interest(self.principal_balance, self.annual_rate_bps)
    }
}

/// One month of interest on `balance` at `annual_rate_bps`.
pub fn periodic_interest(balance: f64, annual_rate_bps: u32) -> f64 {
    balance * (annual_rate_bps as f64 / 10_000.0) / 12.0
}

/// The outcome of one simulation run. `converged == false` means the run hit
/// the safety ceiling with debt still open; callers must check the flag
/// rather than assume payoff.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PayoffSummary {
    pub strategy_name: String,
    pub periods_elapsed: u32,
    pub total_interest_accrued: f64,
    pub total_payments_applied: f64,
    pub instruments_settled: usize,
    pub converged: bool,
    pub final_instrument_states: Vec<DebtInstrument>,
}

/// Per-month ledger point for charting the payoff curve.
#[derive(Debug, Clone, Copy, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MonthTracePoint {
    pub month: u32,
    pub interest_accrued: f64,
    pub principal_applied: f64,
    pub ending_total_balance: f64,
    pub open_instruments: usize,
}

/// Side-by-side run of every strategy on the same portfolio snapshot.
#[derive(Debug, Clone)]
pub struct ComparisonResult {
    pub summaries: Vec<PayoffSummary>,
    /// Index of the summary with the lowest total interest.
    pub cheapest_index: usize,
    /// Index of the summary with the fewest periods.
    pub fastest_index: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_approx(actual: f64, expected: f64) {
        assert!(
            (actual - expected).abs() <= 1e-9,
            "expected {expected}, got {actual}"
        );
    }

    #[test]
    fn periodic_interest_derives_monthly_rate_from_basis_points() {
        // 1200 bps = 12% annual = 1% monthly.
        assert_approx(periodic_interest(1_000.0, 1_200), 10.0);
        assert_approx(periodic_interest(500.0, 1_800), 7.5);
        assert_approx(periodic_interest(0.0, 2_400), 0.0);
        assert_approx(periodic_interest(1_000.0, 0), 0.0);
    }

    #[test]
    fn new_accepts_zero_amounts() {
        let instrument =
            DebtInstrument::new("d1", "Store card", 0.0, 0, 0.0).expect("zero amounts are valid");
        assert_approx(instrument.principal_balance, 0.0);
        assert_eq!(instrument.priority_index, 0);
    }

    #[test]
    fn new_rejects_negative_balance() {
        let err = DebtInstrument::new("d1", "Card", -1.0, 1_200, 25.0)
            .expect_err("negative balance must fail");
        assert!(err.to_string().contains("principalBalance"));
    }

    #[test]
    fn new_rejects_negative_minimum_payment() {
        let err = DebtInstrument::new("d1", "Card", 100.0, 1_200, -5.0)
            .expect_err("negative minimum must fail");
        assert!(err.to_string().contains("minimumPayment"));
    }

    #[test]
    fn validate_rejects_non_finite_amounts() {
        let mut instrument = DebtInstrument::new("d1", "Card", 100.0, 1_200, 5.0).expect("valid");
        instrument.principal_balance = f64::NAN;
        assert!(instrument.validate().is_err());

        let mut instrument = DebtInstrument::new("d2", "Loan", 100.0, 1_200, 5.0).expect("valid");
        instrument.minimum_payment = f64::INFINITY;
        assert!(instrument.validate().is_err());
    }

    #[test]
    fn monthly_interest_uses_current_balance() {
        let instrument = DebtInstrument::new("d1", "Card", 2_000.0, 600, 25.0).expect("valid");
        assert_approx(instrument.monthly_interest(), 1.0);
    }
}
