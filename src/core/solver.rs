use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::{Assumptions, ProjectionError, ProjectionInput, project_with};

// f64 bisection stops narrowing long before this.
pub const MAX_SOLVE_ITERATIONS: u32 = 512;

#[derive(Copy, Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GoalType {
    /// Smallest monthly saving that closes the funding gap.
    RequiredSaving,
    /// Largest monthly basic expense the plan still covers.
    MaxBasicExpense,
}

#[derive(Debug, Clone, Copy)]
pub struct GoalSolveConfig {
    pub goal_type: GoalType,
    pub search_min: f64,
    pub search_max: f64,
    pub tolerance: f64,
    pub max_iterations: u32,
}

impl GoalSolveConfig {
    pub fn required_saving(search_max: f64) -> Self {
        Self {
            goal_type: GoalType::RequiredSaving,
            search_min: 0.0,
            search_max,
            tolerance: 1.0,
            max_iterations: 64,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize)]
pub struct GoalSolveIteration {
    pub iteration: u32,
    pub lower_bound: f64,
    pub upper_bound: f64,
    pub candidate_value: f64,
    pub gap: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct GoalSolveResult {
    pub goal_type: GoalType,
    pub search_min: f64,
    pub search_max: f64,
    pub tolerance: f64,
    pub max_iterations: u32,
    pub solved_value: Option<f64>,
    pub achieved_gap: Option<f64>,
    pub iterations: Vec<GoalSolveIteration>,
    pub converged: bool,
    pub feasible: bool,
    pub message: String,
}

#[derive(Debug, Error, PartialEq)]
pub enum SolveError {
    #[error("invalid solver config: {0}")]
    InvalidConfig(String),
    #[error(transparent)]
    Projection(#[from] ProjectionError),
}

/// Bisects one input of the plan until the funding gap just closes.
///
/// The gap never widens as saving grows and never narrows as expense grows,
/// so each goal has a single crossing inside the search bounds.
pub fn solve_goal(
    input: &ProjectionInput,
    assumptions: &Assumptions,
    config: GoalSolveConfig,
) -> Result<GoalSolveResult, SolveError> {
    validate_config(config)?;

    let mut iterations = Vec::new();
    let low_gap = evaluate_candidate(input, assumptions, config.goal_type, config.search_min)?;
    let high_gap = evaluate_candidate(input, assumptions, config.goal_type, config.search_max)?;

    let mut solved_value = None;
    let mut converged = false;
    let feasible;
    let message;

    match config.goal_type {
        GoalType::RequiredSaving => {
            if closes_gap(low_gap) {
                solved_value = Some(config.search_min);
                converged = true;
                feasible = true;
                message = "Already fully funded at the lower saving bound.".to_string();
            } else if !closes_gap(high_gap) {
                feasible = false;
                message = "No saving within the search bounds closes the gap.".to_string();
            } else {
                let mut lo = config.search_min;
                let mut hi = config.search_max;
                let mut it = 0;
                while it < config.max_iterations {
                    it += 1;
                    let mid = (lo + hi) * 0.5;
                    let gap = evaluate_candidate(input, assumptions, config.goal_type, mid)?;
                    iterations.push(GoalSolveIteration {
                        iteration: it,
                        lower_bound: lo,
                        upper_bound: hi,
                        candidate_value: mid,
                        gap,
                    });

                    if closes_gap(gap) {
                        hi = mid;
                    } else {
                        lo = mid;
                    }

                    if (hi - lo).abs() <= config.tolerance {
                        converged = true;
                        break;
                    }
                }
                solved_value = Some(hi);
                feasible = true;
                message = if converged {
                    "Solved required monthly saving.".to_string()
                } else {
                    "Reached max iterations before tolerance was met; returning best estimate."
                        .to_string()
                };
            }
        }
        GoalType::MaxBasicExpense => {
            if !closes_gap(low_gap) {
                feasible = false;
                message = "Even the lower expense bound leaves a funding gap.".to_string();
            } else if closes_gap(high_gap) {
                solved_value = Some(config.search_max);
                converged = true;
                feasible = true;
                message =
                    "Upper expense bound is still funded; increase search max for a higher target."
                        .to_string();
            } else {
                let mut lo = config.search_min;
                let mut hi = config.search_max;
                let mut it = 0;
                while it < config.max_iterations {
                    it += 1;
                    let mid = (lo + hi) * 0.5;
                    let gap = evaluate_candidate(input, assumptions, config.goal_type, mid)?;
                    iterations.push(GoalSolveIteration {
                        iteration: it,
                        lower_bound: lo,
                        upper_bound: hi,
                        candidate_value: mid,
                        gap,
                    });

                    if closes_gap(gap) {
                        lo = mid;
                    } else {
                        hi = mid;
                    }

                    if (hi - lo).abs() <= config.tolerance {
                        converged = true;
                        break;
                    }
                }
                solved_value = Some(lo);
                feasible = true;
                message = if converged {
                    "Solved maximum monthly basic expense.".to_string()
                } else {
                    "Reached max iterations before tolerance was met; returning best estimate."
                        .to_string()
                };
            }
        }
    }

    let achieved_gap = match solved_value {
        Some(value) => Some(evaluate_candidate(input, assumptions, config.goal_type, value)?),
        None => None,
    };

    Ok(GoalSolveResult {
        goal_type: config.goal_type,
        search_min: config.search_min,
        search_max: config.search_max,
        tolerance: config.tolerance,
        max_iterations: config.max_iterations,
        solved_value,
        achieved_gap,
        iterations,
        converged,
        feasible,
        message,
    })
}

fn closes_gap(gap: f64) -> bool {
    gap <= 0.0
}

fn evaluate_candidate(
    base_input: &ProjectionInput,
    assumptions: &Assumptions,
    goal_type: GoalType,
    candidate_value: f64,
) -> Result<f64, ProjectionError> {
    let mut input = base_input.clone();
    match goal_type {
        GoalType::RequiredSaving => input.monthly_saving = candidate_value.max(0.0),
        GoalType::MaxBasicExpense => input.monthly_basic_expense = candidate_value.max(0.0),
    }
    Ok(project_with(&input, assumptions)?.gap)
}

fn validate_config(config: GoalSolveConfig) -> Result<(), SolveError> {
    let invalid = |msg: &str| Err(SolveError::InvalidConfig(msg.to_string()));

    if !config.search_min.is_finite() || !config.search_max.is_finite() {
        return invalid("search bounds must be finite");
    }
    if config.search_min < 0.0 {
        return invalid("search_min must be >= 0");
    }
    if config.search_max <= config.search_min {
        return invalid("search_max must be greater than search_min");
    }
    if !config.tolerance.is_finite() || config.tolerance <= 0.0 {
        return invalid("tolerance must be > 0");
    }
    if config.max_iterations == 0 || config.max_iterations > MAX_SOLVE_ITERATIONS {
        return Err(SolveError::InvalidConfig(format!(
            "max_iterations must be between 1 and {MAX_SOLVE_ITERATIONS}"
        )));
    }
    Ok(())
}
