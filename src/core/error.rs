use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ProjectionError {
    #[error("current age {current_age} must be below the plan horizon age {max_age}")]
    InvalidRange { current_age: u32, max_age: u32 },
    #[error("plan horizon age {max_age} exceeds the supported maximum {limit}")]
    HorizonTooLong { max_age: u32, limit: u32 },
}
