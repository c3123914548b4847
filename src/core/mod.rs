mod engine;
mod error;
mod solver;
mod types;

pub use engine::{project, project_with, round_money};
pub use error::ProjectionError;
pub use solver::{
    GoalSolveConfig, GoalSolveIteration, GoalSolveResult, GoalType, SolveError, solve_goal,
};
pub use types::{
    Assumptions, DEFAULT_INFLATION_RATE, DEFAULT_INTEREST_RATE, DEFAULT_MAX_AGE,
    MAX_PLAN_AGE, ProjectionHistory, ProjectionInput, ProjectionResult,
};
