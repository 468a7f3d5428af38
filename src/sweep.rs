use crate::config::ModelOptions;
use crate::models::planning::{
    average_backorder, DegenerateResult, Family, Parameters, PlanningModel, PlanningResult, Sets,
};
use crate::problem::{ConfigurationError, InstanceData};
use crate::solver::{Backend, MicroLp, SolverError};
use derive_more::{Display, From};
use log::{debug, info, warn};

#[derive(Debug, Display, From, Clone, PartialEq)]
pub enum EvaluateError {
    #[display(fmt = "configuration error: {}", _0)]
    Configuration(ConfigurationError),
    #[display(fmt = "solver error: {}", _0)]
    Solver(SolverError),
    #[display(fmt = "{}", _0)]
    DegenerateResult(DegenerateResult),
}

impl std::error::Error for EvaluateError {}

/// The outcome of one solved instance
#[derive(Debug, Clone)]
pub struct Evaluation {
    pub ratio: f64,
    pub average_backorder: f64,
    pub plan: PlanningResult,
}

/// Build, solve and summarize one instance with the given backend.
///
/// The backend is created here and dropped before returning, on success and on failure.
pub fn solve_with<M: Backend>(
    data: &InstanceData,
    options: &ModelOptions,
    ratio: f64,
) -> Result<Evaluation, EvaluateError> {
    if !ratio.is_finite() || ratio < 0.0 {
        return Err(ConfigurationError::InvalidRatio(ratio).into());
    }

    let sets = Sets::new(data);
    let parameters = Parameters::new(data, &sets, options, ratio);
    let mut model = PlanningModel::<M>::build(data, sets, parameters, options.verbosity)?;

    if model.vars.family(Family::Backorder).next().is_none() {
        warn!("instance has no backorder variables, nothing to optimize for");
        return Err(DegenerateResult.into());
    }

    let plan = model.solve()?;
    let average = average_backorder(model.backorder_values()?)?;
    debug!(
        "ratio {}: cost {}, total backorder {}, average backorder {}",
        ratio,
        plan.cost,
        plan.total_backorder(),
        average
    );

    Ok(Evaluation {
        ratio,
        average_backorder: average,
        plan,
    })
}

/// The average backorder of the cost-minimal plan for `ratio`, solved with the default backend
pub fn evaluate(
    data: &InstanceData,
    options: &ModelOptions,
    ratio: f64,
) -> Result<f64, EvaluateError> {
    solve_with::<MicroLp>(data, options, ratio).map(|e| e.average_backorder)
}

/// Evaluate every ratio in order, returning `(ratio, average backorder)` pairs.
///
/// With `parallel` set every ratio is solved on its own thread with its own model.
pub fn sweep_with<M: Backend + 'static>(
    data: &InstanceData,
    options: &ModelOptions,
    ratios: &[f64],
    parallel: bool,
) -> Result<Vec<Evaluation>, EvaluateError> {
    info!(
        "Sweeping {} ratios ({})",
        ratios.len(),
        if parallel { "parallel" } else { "sequential" }
    );

    if !parallel {
        return ratios
            .iter()
            .map(|&ratio| solve_with::<M>(data, options, ratio))
            .collect();
    }

    std::thread::scope(|scope| {
        let handles = ratios
            .iter()
            .map(|&ratio| scope.spawn(move || solve_with::<M>(data, options, ratio)))
            .collect::<Vec<_>>();

        handles
            .into_iter()
            .map(|handle| match handle.join() {
                Ok(result) => result,
                Err(_) => Err(SolverError::Backend("solver thread panicked".to_string()).into()),
            })
            .collect()
    })
}

pub fn sweep(
    data: &InstanceData,
    options: &ModelOptions,
    ratios: &[f64],
    parallel: bool,
) -> Result<Vec<(f64, f64)>, EvaluateError> {
    Ok(sweep_with::<MicroLp>(data, options, ratios, parallel)?
        .into_iter()
        .map(|e| (e.ratio, e.average_backorder))
        .collect())
}
