use serde::Serialize;

pub const DEFAULT_MAX_AGE: u32 = 100;
pub const DEFAULT_INFLATION_RATE: f64 = 0.03;
pub const DEFAULT_INTEREST_RATE: f64 = 0.015;
pub const MAX_PLAN_AGE: u32 = 150;

#[derive(Copy, Clone, Debug, PartialEq, Serialize)]
pub struct Assumptions {
    pub max_age: u32,
    pub inflation_rate: f64,
    pub interest_rate: f64,
}

impl Default for Assumptions {
    fn default() -> Self {
        Self {
            max_age: DEFAULT_MAX_AGE,
            inflation_rate: DEFAULT_INFLATION_RATE,
            interest_rate: DEFAULT_INTEREST_RATE,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProjectionInput {
    pub current_age: u32,
    pub retire_age: u32,
    pub monthly_basic_expense: f64,
    pub monthly_fun_expense: f64,
    pub monthly_saving: f64,
    pub current_saving: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ProjectionHistory {
    pub ages: Vec<u32>,
    pub funds: Vec<f64>,
    pub needs_basic: Vec<f64>,
    pub needs_with_fun: Vec<f64>,
}

impl ProjectionHistory {
    pub(crate) fn with_capacity(capacity: usize) -> Self {
        Self {
            ages: Vec::with_capacity(capacity),
            funds: Vec::with_capacity(capacity),
            needs_basic: Vec::with_capacity(capacity),
            needs_with_fun: Vec::with_capacity(capacity),
        }
    }

    pub(crate) fn push(&mut self, age: u32, fund: f64, need_basic: f64, need_with_fun: f64) {
        self.ages.push(age);
        self.funds.push(fund);
        self.needs_basic.push(need_basic);
        self.needs_with_fun.push(need_with_fun);
    }

    pub fn len(&self) -> usize {
        self.ages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ages.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProjectionResult {
    pub total_need_basic: f64,
    pub total_need_with_fun: f64,
    pub total_fund: f64,
    pub gap: f64,
    pub history: ProjectionHistory,
}
