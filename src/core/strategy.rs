use super::types::{DebtInstrument, Strategy};

/// Returns a priority-ordered copy of the portfolio; the input is never
/// mutated. The sort is stable, so instruments that compare equal keep their
/// original input order.
///
/// Hybrid produces the same ordering as Avalanche. The product has named a
/// third strategy but never defined how it differs, so it is an explicit
/// alias here rather than invented logic.
/// TODO: give Hybrid its own ranking once its behavior is decided.
pub fn select_priority_order(
    strategy: Strategy,
    instruments: &[DebtInstrument],
) -> Vec<DebtInstrument> {
    let mut ordered = instruments.to_vec();
    match strategy {
        Strategy::Snowball => {
            ordered.sort_by(|a, b| a.principal_balance.total_cmp(&b.principal_balance));
        }
        Strategy::Avalanche | Strategy::Hybrid => {
            ordered.sort_by(|a, b| b.annual_rate_bps.cmp(&a.annual_rate_bps));
        }
    }
    ordered
}
