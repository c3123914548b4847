use std::path::PathBuf;
use std::sync::Arc;

use clap::{Args, Parser, Subcommand, ValueEnum};
use log::info;
use serde::Serialize;

use retire_plan::api::{AppState, MAX_ACCEPTED_AGE, run_http_server, validate_input};
use retire_plan::core::{
    Assumptions, GoalSolveConfig, GoalType, ProjectionInput, project_with, solve_goal,
};
use retire_plan::report::{AuditSink, CsvAuditLog, LogNotifier, NullAuditLog, quickchart_url};

#[derive(Parser, Debug)]
#[command(
    name = "retire-plan",
    about = "Deterministic retirement savings projection against inflation-adjusted need"
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Project savings and need through the plan horizon and print the result as JSON
    Project(ProjectArgs),
    /// Solve for the monthly saving or basic expense that closes the funding gap
    Solve(SolveArgs),
    /// Serve the HTTP API
    Serve(ServeArgs),
}

#[derive(Args, Debug)]
struct PlanArgs {
    #[arg(long)]
    current_age: u32,
    #[arg(long)]
    retire_age: u32,
    #[arg(long, default_value_t = 0.0, help = "Essential monthly living cost")]
    monthly_basic_expense: f64,
    #[arg(long, default_value_t = 0.0, help = "Discretionary monthly cost")]
    monthly_fun_expense: f64,
    #[arg(
        long,
        default_value_t = 0.0,
        help = "Monthly saving, contributed up to and including the retirement year"
    )]
    monthly_saving: f64,
    #[arg(long, default_value_t = 0.0)]
    current_saving: f64,
    #[arg(long, default_value_t = 100, help = "Age the plan is funded through")]
    max_age: u32,
    #[arg(
        long,
        default_value_t = 3.0,
        help = "Annual inflation during retirement in percent"
    )]
    inflation_rate: f64,
    #[arg(long, default_value_t = 1.5, help = "Annual interest on savings in percent")]
    interest_rate: f64,
}

#[derive(Args, Debug)]
struct ProjectArgs {
    #[command(flatten)]
    plan: PlanArgs,
    #[arg(long, help = "Also print a chart image URL for the history")]
    chart: bool,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, ValueEnum)]
enum CliGoalType {
    RequiredSaving,
    MaxBasicExpense,
}

impl From<CliGoalType> for GoalType {
    fn from(value: CliGoalType) -> Self {
        match value {
            CliGoalType::RequiredSaving => GoalType::RequiredSaving,
            CliGoalType::MaxBasicExpense => GoalType::MaxBasicExpense,
        }
    }
}

#[derive(Args, Debug)]
struct SolveArgs {
    #[command(flatten)]
    plan: PlanArgs,
    #[arg(long, value_enum, default_value_t = CliGoalType::RequiredSaving)]
    goal: CliGoalType,
    #[arg(long, default_value_t = 0.0)]
    search_min: f64,
    #[arg(long, default_value_t = 1_000_000.0)]
    search_max: f64,
    #[arg(long, default_value_t = 1.0)]
    tolerance: f64,
    #[arg(long, default_value_t = 64)]
    max_iterations: u32,
}

#[derive(Args, Debug)]
struct ServeArgs {
    #[arg(long, default_value_t = 8080)]
    port: u16,
    #[arg(
        long,
        env = "RETIRE_AUDIT_LOG",
        help = "CSV file that receives one audit row per calculation"
    )]
    audit_log: Option<PathBuf>,
}

fn build_plan(args: &PlanArgs) -> Result<(ProjectionInput, Assumptions), String> {
    let input = ProjectionInput {
        current_age: args.current_age,
        retire_age: args.retire_age,
        monthly_basic_expense: args.monthly_basic_expense,
        monthly_fun_expense: args.monthly_fun_expense,
        monthly_saving: args.monthly_saving,
        current_saving: args.current_saving,
    };
    validate_input(&input)?;

    if args.max_age > MAX_ACCEPTED_AGE {
        return Err(format!("--max-age must be <= {MAX_ACCEPTED_AGE}"));
    }
    if !args.inflation_rate.is_finite() || args.inflation_rate <= -100.0 {
        return Err("--inflation-rate must be > -100".to_string());
    }
    if !args.interest_rate.is_finite() || args.interest_rate <= -100.0 {
        return Err("--interest-rate must be > -100".to_string());
    }

    let assumptions = Assumptions {
        max_age: args.max_age,
        inflation_rate: args.inflation_rate / 100.0,
        interest_rate: args.interest_rate / 100.0,
    };
    Ok((input, assumptions))
}

fn print_json<T: Serialize>(value: &T) -> Result<(), String> {
    let json = serde_json::to_string_pretty(value).map_err(|e| e.to_string())?;
    println!("{json}");
    Ok(())
}

fn run_project(args: ProjectArgs) -> Result<(), String> {
    let (input, assumptions) = build_plan(&args.plan)?;
    let result = project_with(&input, &assumptions).map_err(|e| e.to_string())?;
    print_json(&result)?;

    if args.chart {
        let url = quickchart_url(&result.history).map_err(|e| e.to_string())?;
        println!("{url}");
    }
    Ok(())
}

fn run_solve(args: SolveArgs) -> Result<(), String> {
    let (input, assumptions) = build_plan(&args.plan)?;
    let config = GoalSolveConfig {
        goal_type: args.goal.into(),
        search_min: args.search_min,
        search_max: args.search_max,
        tolerance: args.tolerance,
        max_iterations: args.max_iterations,
    };
    let result = solve_goal(&input, &assumptions, config).map_err(|e| e.to_string())?;
    print_json(&result)
}

async fn run_serve(args: ServeArgs) -> Result<(), String> {
    let audit: Arc<dyn AuditSink> = match args.audit_log {
        Some(path) => {
            info!("audit rows will be appended to {}", path.display());
            Arc::new(CsvAuditLog::new(path))
        }
        None => Arc::new(NullAuditLog),
    };
    let state = AppState {
        assumptions: Assumptions::default(),
        notifier: Arc::new(LogNotifier),
        audit,
    };

    run_http_server(args.port, state)
        .await
        .map_err(|e| format!("Server error: {e}"))
}

#[tokio::main]
async fn main() {
    env_logger::init();

    let cli = Cli::parse();
    let outcome = match cli.command {
        Command::Project(args) => run_project(args),
        Command::Solve(args) => run_solve(args),
        Command::Serve(args) => run_serve(args).await,
    };

    if let Err(msg) = outcome {
        eprintln!("{msg}");
        std::process::exit(1);
    }
}
