//! Coded error type shared by the description phases.

use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Phase {
    Parse,
    Validate,
}

impl std::fmt::Display for Phase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Phase::Parse => write!(f, "Parse"),
            Phase::Validate => write!(f, "Validate"),
        }
    }
}

/// One problem found in an experiment description.
///
/// Codes are stable; messages are prose and may change.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DescriptionError {
    pub code: &'static str,
    pub phase: Phase,
    pub message: String,
    /// The graph step the problem was found in, if any.
    pub step: Option<String>,
}

impl std::fmt::Display for DescriptionError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.step {
            Some(step) => write!(
                f,
                "[{}:{}] {} (step '{}')",
                self.phase, self.code, self.message, step
            ),
            None => write!(f, "[{}:{}] {}", self.phase, self.code, self.message),
        }
    }
}

impl std::error::Error for DescriptionError {}

impl DescriptionError {
    pub fn parse(code: &'static str, message: impl Into<String>) -> Self {
        DescriptionError {
            code,
            phase: Phase::Parse,
            message: message.into(),
            step: None,
        }
    }

    pub fn parse_at(code: &'static str, message: impl Into<String>, step: &str) -> Self {
        DescriptionError {
            step: Some(step.to_string()),
            ..Self::parse(code, message)
        }
    }

    pub fn validate(code: &'static str, message: impl Into<String>, step: Option<&str>) -> Self {
        DescriptionError {
            code,
            phase: Phase::Validate,
            message: message.into(),
            step: step.map(str::to_string),
        }
    }
}
