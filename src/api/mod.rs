use axum::{
    Router,
    extract::Json,
    http::{HeaderValue, StatusCode, header},
    response::{IntoResponse, Response},
    routing::{get, post},
};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use tokio::net::TcpListener;

use crate::core::solver::{GoalSolveConfig, GoalSolveResult, GoalType, solve_goal};
use crate::core::{
    DebtInstrument, MonthTracePoint, PayoffSummary, Strategy, compare_strategies,
    run_simulation_with_trace,
};

#[derive(Copy, Clone, Debug, Eq, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case")]
enum ApiStrategy {
    #[serde(alias = "Snowball")]
    Snowball,
    #[serde(alias = "Avalanche")]
    Avalanche,
    #[serde(alias = "Hybrid")]
    Hybrid,
}

impl From<ApiStrategy> for Strategy {
    fn from(value: ApiStrategy) -> Self {
        match value {
            ApiStrategy::Snowball => Strategy::Snowball,
            ApiStrategy::Avalanche => Strategy::Avalanche,
            ApiStrategy::Hybrid => Strategy::Hybrid,
        }
    }
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case")]
enum ApiGoalType {
    #[serde(alias = "horizonTarget", alias = "horizon")]
    HorizonTarget,
    #[serde(alias = "interestCap", alias = "interest")]
    InterestCap,
}

impl From<ApiGoalType> for GoalType {
    fn from(value: ApiGoalType) -> Self {
        match value {
            ApiGoalType::HorizonTarget => GoalType::HorizonTarget,
            ApiGoalType::InterestCap => GoalType::InterestCap,
        }
    }
}

impl From<GoalType> for ApiGoalType {
    fn from(value: GoalType) -> Self {
        match value {
            GoalType::HorizonTarget => ApiGoalType::HorizonTarget,
            GoalType::InterestCap => ApiGoalType::InterestCap,
        }
    }
}

/// Wire shape of one instrument. Field aliases cover the names the web form
/// sends; `id` and `name` are defaulted positionally when omitted.
#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct InstrumentPayload {
    id: Option<String>,
    name: Option<String>,
    #[serde(alias = "balance")]
    principal_balance: Option<f64>,
    #[serde(alias = "aprBps", alias = "rateBps")]
    annual_rate_bps: Option<u32>,
    #[serde(alias = "minPayment")]
    minimum_payment: Option<f64>,
    priority_index: Option<u32>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct SimulatePayload {
    instruments: Vec<InstrumentPayload>,
    #[serde(alias = "extraPayment")]
    extra_monthly_payment: Option<f64>,
    /// Omit to compare every strategy side by side.
    strategy: Option<ApiStrategy>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct SolvePayload {
    instruments: Vec<InstrumentPayload>,
    strategy: Option<ApiStrategy>,
    goal: Option<ApiGoalType>,
    target: Option<f64>,
    search_min: Option<f64>,
    search_max: Option<f64>,
    tolerance: Option<f64>,
    max_iterations: Option<u32>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct SimulateResponse {
    extra_monthly_payment: f64,
    summaries: Vec<PayoffSummary>,
    cheapest_strategy: String,
    fastest_strategy: String,
    /// Strategy whose run the monthly trace belongs to: the requested one,
    /// or the cheapest when comparing.
    trace_strategy: String,
    monthly_trace: Vec<MonthTracePoint>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct SolveIterationResponse {
    iteration: u32,
    lower_bound: f64,
    upper_bound: f64,
    candidate_value: f64,
    periods_elapsed: u32,
    total_interest_accrued: f64,
    meets_goal: bool,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct SolveResponse {
    goal: ApiGoalType,
    strategy: ApiStrategy,
    target: f64,
    search_min: f64,
    search_max: f64,
    tolerance: f64,
    max_iterations: u32,
    solved_extra_payment: Option<f64>,
    achieved_periods: Option<u32>,
    achieved_interest: Option<f64>,
    iterations: Vec<SolveIterationResponse>,
    converged: bool,
    feasible: bool,
    message: String,
}

#[derive(Debug, Serialize)]
struct HealthResponse {
    status: &'static str,
}

#[derive(Debug, Serialize)]
struct ErrorResponse {
    error: String,
}

/// Parses a JSON array of instruments (the shape `/api/simulate` accepts)
/// into engine inputs. Shared by the CLI and the HTTP handlers.
pub fn parse_portfolio(json: &str) -> Result<Vec<DebtInstrument>, String> {
    let payloads = serde_json::from_str::<Vec<InstrumentPayload>>(json)
        .map_err(|e| format!("Invalid portfolio JSON: {e}"))?;
    build_instruments(&payloads)
}

fn build_instruments(payloads: &[InstrumentPayload]) -> Result<Vec<DebtInstrument>, String> {
    let mut instruments = Vec::with_capacity(payloads.len());
    for (idx, payload) in payloads.iter().enumerate() {
        let position = idx + 1;
        let principal_balance = payload
            .principal_balance
            .ok_or_else(|| format!("instrument {position}: principalBalance is required"))?;
        let id = payload
            .id
            .clone()
            .unwrap_or_else(|| format!("debt-{position}"));
        let name = payload.name.clone().unwrap_or_else(|| id.clone());

        let instrument = DebtInstrument {
            id,
            name,
            principal_balance,
            annual_rate_bps: payload.annual_rate_bps.unwrap_or(0),
            minimum_payment: payload.minimum_payment.unwrap_or(0.0),
            priority_index: payload.priority_index.unwrap_or(position as u32 - 1),
        };
        instrument.validate().map_err(|e| e.to_string())?;
        instruments.push(instrument);
    }
    Ok(instruments)
}

fn simulate_response_from_payload(payload: SimulatePayload) -> Result<SimulateResponse, String> {
    let instruments = build_instruments(&payload.instruments)?;
    let extra_monthly_payment = payload.extra_monthly_payment.unwrap_or(0.0);

    match payload.strategy {
        Some(api_strategy) => {
            let strategy = Strategy::from(api_strategy);
            let (summary, trace) =
                run_simulation_with_trace(strategy, &instruments, extra_monthly_payment)
                    .map_err(|e| e.to_string())?;
            let name = summary.strategy_name.clone();
            Ok(SimulateResponse {
                extra_monthly_payment,
                cheapest_strategy: name.clone(),
                fastest_strategy: name.clone(),
                trace_strategy: name,
                summaries: vec![summary],
                monthly_trace: trace,
            })
        }
        None => {
            let comparison = compare_strategies(&instruments, extra_monthly_payment)
                .map_err(|e| e.to_string())?;
            let cheapest_strategy =
                comparison.summaries[comparison.cheapest_index].strategy_name.clone();
            let fastest_strategy =
                comparison.summaries[comparison.fastest_index].strategy_name.clone();

            // Summaries are produced in Strategy::ALL order, so the cheapest
            // index maps straight back to its strategy for the trace run.
            let trace_strategy = Strategy::ALL[comparison.cheapest_index];
            let (_, trace) =
                run_simulation_with_trace(trace_strategy, &instruments, extra_monthly_payment)
                    .map_err(|e| e.to_string())?;

            Ok(SimulateResponse {
                extra_monthly_payment,
                summaries: comparison.summaries,
                cheapest_strategy,
                fastest_strategy,
                trace_strategy: trace_strategy.name().to_string(),
                monthly_trace: trace,
            })
        }
    }
}

fn solve_response_from_payload(payload: SolvePayload) -> Result<SolveResponse, String> {
    let instruments = build_instruments(&payload.instruments)?;
    let goal = payload
        .goal
        .ok_or_else(|| "goal is required: horizon-target or interest-cap".to_string())?;
    let target = payload
        .target
        .ok_or_else(|| "target is required".to_string())?;

    let config = GoalSolveConfig {
        goal_type: goal.into(),
        strategy: payload.strategy.unwrap_or(ApiStrategy::Avalanche).into(),
        target,
        search_min: payload.search_min.unwrap_or(0.0),
        search_max: payload.search_max.unwrap_or(100_000.0),
        tolerance: payload.tolerance.unwrap_or(0.01),
        max_iterations: payload.max_iterations.unwrap_or(64),
    };

    let result = solve_goal(&instruments, config).map_err(|e| e.to_string())?;
    Ok(build_solve_response(result))
}

fn build_solve_response(result: GoalSolveResult) -> SolveResponse {
    SolveResponse {
        goal: result.goal_type.into(),
        strategy: match result.strategy {
            Strategy::Snowball => ApiStrategy::Snowball,
            Strategy::Avalanche => ApiStrategy::Avalanche,
            Strategy::Hybrid => ApiStrategy::Hybrid,
        },
        target: result.target,
        search_min: result.search_min,
        search_max: result.search_max,
        tolerance: result.tolerance,
        max_iterations: result.max_iterations,
        solved_extra_payment: result.solved_extra_payment,
        achieved_periods: result.achieved_periods,
        achieved_interest: result.achieved_interest,
        iterations: result
            .iterations
            .iter()
            .map(|it| SolveIterationResponse {
                iteration: it.iteration,
                lower_bound: it.lower_bound,
                upper_bound: it.upper_bound,
                candidate_value: it.candidate_value,
                periods_elapsed: it.periods_elapsed,
                total_interest_accrued: it.total_interest_accrued,
                meets_goal: it.meets_goal,
            })
            .collect(),
        converged: result.converged,
        feasible: result.feasible,
        message: result.message,
    }
}

pub async fn run_http_server(port: u16) -> std::io::Result<()> {
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let app = Router::new()
        .route("/api/health", get(health_handler))
        .route("/api/simulate", post(simulate_handler))
        .route("/api/solve", post(solve_handler))
        .fallback(not_found_handler);

    let listener = TcpListener::bind(addr).await?;
    println!("Debt payoff API listening on http://{addr}");
    println!("Local access: http://127.0.0.1:{port}/api/health");

    axum::serve(listener, app).await
}

async fn health_handler() -> Response {
    json_response(StatusCode::OK, HealthResponse { status: "ok" })
}

async fn not_found_handler() -> Response {
    error_response(StatusCode::NOT_FOUND, "Not found")
}

async fn simulate_handler(Json(payload): Json<SimulatePayload>) -> Response {
    match simulate_response_from_payload(payload) {
        Ok(response) => json_response(StatusCode::OK, response),
        Err(msg) => error_response(StatusCode::BAD_REQUEST, &msg),
    }
}

async fn solve_handler(Json(payload): Json<SolvePayload>) -> Response {
    match solve_response_from_payload(payload) {
        Ok(response) => json_response(StatusCode::OK, response),
        Err(msg) => error_response(StatusCode::BAD_REQUEST, &msg),
    }
}

fn json_response<T: Serialize>(status: StatusCode, body: T) -> Response {
    let mut response = (status, Json(body)).into_response();
    response
        .headers_mut()
        .insert(header::CACHE_CONTROL, HeaderValue::from_static("no-store"));
    response
}

fn error_response(status: StatusCode, msg: &str) -> Response {
    json_response(
        status,
        ErrorResponse {
            error: msg.to_string(),
        },
    )
}

#[cfg(test)]
fn simulate_response_from_json(json: &str) -> Result<SimulateResponse, String> {
    let payload = serde_json::from_str::<SimulatePayload>(json)
        .map_err(|e| format!("Invalid API JSON payload: {e}"))?;
    simulate_response_from_payload(payload)
}

#[cfg(test)]
fn solve_response_from_json(json: &str) -> Result<SolveResponse, String> {
    let payload = serde_json::from_str::<SolvePayload>(json)
        .map_err(|e| format!("Invalid API JSON payload: {e}"))?;
    solve_response_from_payload(payload)
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
    fn parse_portfolio_accepts_web_field_aliases_and_defaults_ids() {
        let json = r#"[
          { "balance": 1000, "aprBps": 1200, "minPayment": 50 },
          { "id": "car", "name": "Car loan", "principalBalance": 500,
            "annualRateBps": 1800, "minimumPayment": 30, "priorityIndex": 7 }
        ]"#;
        let instruments = parse_portfolio(json).expect("portfolio should parse");

        assert_eq!(instruments.len(), 2);
        assert_eq!(instruments[0].id, "debt-1");
        assert_eq!(instruments[0].name, "debt-1");
        assert_approx(instruments[0].principal_balance, 1_000.0);
        assert_eq!(instruments[0].annual_rate_bps, 1_200);
        assert_approx(instruments[0].minimum_payment, 50.0);
        assert_eq!(instruments[0].priority_index, 0);

        assert_eq!(instruments[1].id, "car");
        assert_eq!(instruments[1].name, "Car loan");
        assert_eq!(instruments[1].priority_index, 7);
    }

    #[test]
    fn parse_portfolio_requires_a_balance() {
        let err = parse_portfolio(r#"[{ "aprBps": 1200 }]"#).expect_err("must reject");
        assert!(err.contains("principalBalance is required"));
    }

    #[test]
    fn parse_portfolio_rejects_negative_amounts() {
        let err =
            parse_portfolio(r#"[{ "balance": -10, "minPayment": 5 }]"#).expect_err("must reject");
        assert!(err.contains("principalBalance"));
    }

    #[test]
    fn simulate_with_explicit_strategy_returns_one_summary_and_its_trace() {
        let json = r#"{
          "instruments": [
            { "id": "card", "balance": 1000, "aprBps": 1200, "minPayment": 50 },
            { "id": "loan", "balance": 500, "aprBps": 1800, "minPayment": 30 }
          ],
          "extraMonthlyPayment": 100,
          "strategy": "avalanche"
        }"#;
        let response = simulate_response_from_json(json).expect("should simulate");

        assert_eq!(response.summaries.len(), 1);
        assert_eq!(response.summaries[0].strategy_name, "avalanche");
        assert_eq!(response.cheapest_strategy, "avalanche");
        assert_eq!(response.trace_strategy, "avalanche");
        assert!(response.summaries[0].converged);
        assert_eq!(
            response.monthly_trace.len(),
            response.summaries[0].periods_elapsed as usize
        );
        assert_approx(response.extra_monthly_payment, 100.0);
    }

    #[test]
    fn simulate_accepts_capitalized_strategy_alias() {
        let json = r#"{
          "instruments": [{ "balance": 100, "minPayment": 10 }],
          "strategy": "Snowball"
        }"#;
        let response = simulate_response_from_json(json).expect("should simulate");
        assert_eq!(response.summaries[0].strategy_name, "snowball");
    }

    #[test]
    fn simulate_without_strategy_compares_all_three() {
        let json = r#"{
          "instruments": [
            { "id": "low", "balance": 200, "aprBps": 600, "minPayment": 10 },
            { "id": "high", "balance": 1000, "aprBps": 2400, "minPayment": 25 }
          ],
          "extraPayment": 50
        }"#;
        let response = simulate_response_from_json(json).expect("should simulate");

        let names: Vec<&str> = response
            .summaries
            .iter()
            .map(|s| s.strategy_name.as_str())
            .collect();
        assert_eq!(names, vec!["snowball", "avalanche", "hybrid"]);
        assert_eq!(response.cheapest_strategy, "avalanche");
        assert_eq!(response.trace_strategy, response.cheapest_strategy);
        assert!(!response.monthly_trace.is_empty());
    }

    #[test]
    fn simulate_rejects_empty_portfolio() {
        let err = simulate_response_from_json(r#"{ "instruments": [] }"#)
            .expect_err("must reject empty portfolio");
        assert!(err.contains("instrument"));
    }

    #[test]
    fn simulate_response_serialization_uses_camel_case_wire_names() {
        let json = r#"{
          "instruments": [{ "balance": 120, "aprBps": 1200, "minPayment": 20 }]
        }"#;
        let response = simulate_response_from_json(json).expect("should simulate");
        let body = serde_json::to_string(&response).expect("response should serialize");

        assert!(body.contains("\"cheapestStrategy\""));
        assert!(body.contains("\"fastestStrategy\""));
        assert!(body.contains("\"monthlyTrace\""));
        assert!(body.contains("\"periodsElapsed\""));
        assert!(body.contains("\"totalInterestAccrued\""));
        assert!(body.contains("\"totalPaymentsApplied\""));
        assert!(body.contains("\"instrumentsSettled\""));
        assert!(body.contains("\"finalInstrumentStates\""));
        assert!(body.contains("\"converged\""));
    }

    #[test]
    fn solve_requires_goal_and_target() {
        let json = r#"{ "instruments": [{ "balance": 1200 }] }"#;
        let err = solve_response_from_json(json).expect_err("must require goal");
        assert!(err.contains("goal is required"));

        let json = r#"{ "instruments": [{ "balance": 1200 }], "goal": "horizon-target" }"#;
        let err = solve_response_from_json(json).expect_err("must require target");
        assert!(err.contains("target is required"));
    }

    #[test]
    fn solve_finds_extra_payment_for_horizon_goal() {
        let json = r#"{
          "instruments": [{ "id": "loan", "balance": 1200 }],
          "goal": "horizon",
          "target": 12,
          "searchMax": 1000,
          "tolerance": 0.5
        }"#;
        let response = solve_response_from_json(json).expect("should solve");

        assert!(response.feasible);
        assert!(response.converged);
        let solved = response.solved_extra_payment.expect("value expected");
        assert!(solved > 100.0 && solved <= 100.5 + 1e-9, "solved {solved}");
        assert!(response.achieved_periods.expect("periods expected") <= 12);

        let body = serde_json::to_string(&response).expect("response should serialize");
        assert!(body.contains("\"solvedExtraPayment\""));
        assert!(body.contains("\"meetsGoal\""));
        assert!(body.contains("\"goal\":\"horizon-target\""));
    }
}
