use super::error::ProjectionError;
use super::types::{
    Assumptions, MAX_PLAN_AGE, ProjectionHistory, ProjectionInput, ProjectionResult,
};

const MONTHS_PER_YEAR: f64 = 12.0;

// Carried between years at full precision.
#[derive(Debug, Clone, Copy)]
struct RunningTotals {
    fund: f64,
    need_basic: f64,
    need_with_fun: f64,
}

#[derive(Debug, Clone, Copy)]
struct PlanSpan {
    years_to_live: u32,
    years_to_retire: i64,
}

impl PlanSpan {
    fn new(input: &ProjectionInput, assumptions: &Assumptions) -> Result<Self, ProjectionError> {
        if assumptions.max_age > MAX_PLAN_AGE {
            return Err(ProjectionError::HorizonTooLong {
                max_age: assumptions.max_age,
                limit: MAX_PLAN_AGE,
            });
        }
        if input.current_age >= assumptions.max_age {
            return Err(ProjectionError::InvalidRange {
                current_age: input.current_age,
                max_age: assumptions.max_age,
            });
        }

        Ok(Self {
            years_to_live: assumptions.max_age - input.current_age,
            years_to_retire: i64::from(input.retire_age) - i64::from(input.current_age),
        })
    }

    fn is_working_year(self, year: u32) -> bool {
        i64::from(year) <= self.years_to_retire
    }

    fn years_in_retirement(self, year: u32) -> i64 {
        (i64::from(year) - self.years_to_retire).max(0)
    }
}

pub fn project(input: &ProjectionInput) -> Result<ProjectionResult, ProjectionError> {
    project_with(input, &Assumptions::default())
}

// Interest applies to the prior balance before the year's deposit. Need
// accrues only for years strictly after retirement.
pub fn project_with(
    input: &ProjectionInput,
    assumptions: &Assumptions,
) -> Result<ProjectionResult, ProjectionError> {
    let span = PlanSpan::new(input, assumptions)?;

    let annual_saving = input.monthly_saving * MONTHS_PER_YEAR;
    let annual_basic = input.monthly_basic_expense * MONTHS_PER_YEAR;
    let annual_with_fun =
        (input.monthly_basic_expense + input.monthly_fun_expense) * MONTHS_PER_YEAR;

    let mut totals = RunningTotals {
        fund: input.current_saving,
        need_basic: 0.0,
        need_with_fun: 0.0,
    };
    let mut history = ProjectionHistory::with_capacity(span.years_to_live as usize + 1);
    history.push(input.current_age, input.current_saving, 0.0, 0.0);

    for year in 1..=span.years_to_live {
        totals.fund *= 1.0 + assumptions.interest_rate;
        if span.is_working_year(year) {
            totals.fund += annual_saving;
        }

        let years_in_retirement = span.years_in_retirement(year);
        if years_in_retirement > 0 {
            let multiplier = inflation_multiplier(assumptions.inflation_rate, years_in_retirement);
            totals.need_basic += annual_basic * multiplier;
            totals.need_with_fun += annual_with_fun * multiplier;
        }

        history.push(
            input.current_age + year,
            round_money(totals.fund),
            round_money(totals.need_basic),
            round_money(totals.need_with_fun),
        );
    }

    let gap = (totals.need_with_fun - totals.fund).max(0.0);

    Ok(ProjectionResult {
        total_need_basic: round_money(totals.need_basic),
        total_need_with_fun: round_money(totals.need_with_fun),
        total_fund: round_money(totals.fund),
        gap: round_money(gap),
        history,
    })
}

fn inflation_multiplier(rate: f64, years: i64) -> f64 {
    // PlanSpan caps the horizon at MAX_PLAN_AGE years.
    (1.0 + rate).powi(years as i32)
}

pub fn round_money(value: f64) -> f64 {
    value.round_ties_even()
}
