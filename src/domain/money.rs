use {
    super::error::PipelineError,
    std::fmt,
};

/// Monetary amount in minor units (cents).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MoneyAmount(i64);

impl MoneyAmount {
    pub fn new(cents: i64) -> Result<Self, PipelineError> {
        if cents < 0 {
            return Err(PipelineError::Validation(format!(
                "MoneyAmount cannot be negative, got: {cents}"
            )));
        }
        Ok(Self(cents))
    }

    pub fn cents(&self) -> i64 {
        self.0
    }
}

impl fmt::Display for MoneyAmount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Quantity of purchased service hours.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Hours(i32);

impl Hours {
    pub fn new(hours: i32) -> Result<Self, PipelineError> {
        if hours < 0 {
            return Err(PipelineError::Validation(format!(
                "Hours cannot be negative, got: {hours}"
            )));
        }
        Ok(Self(hours))
    }

    pub fn get(&self) -> i32 {
        self.0
    }
}

impl fmt::Display for Hours {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
