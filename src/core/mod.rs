mod engine;
mod error;
mod strategy;
mod types;

pub mod solver;

pub use engine::{
    SAFETY_CEILING_MONTHS, SETTLED_EPSILON, compare_strategies, run_simulation,
    run_simulation_with_trace,
};
pub use error::SimulationError;
pub use strategy::select_priority_order;
pub use types::{
    ComparisonResult, DebtInstrument, MonthTracePoint, PayoffSummary, Strategy, periodic_interest,
};
