//! Configuration and registration errors
//!
//! Runtime stimuli never produce errors: a spark or heat tick aimed at an
//! unregistered or already burning target is an expected, frequent event and
//! is ignored. Errors are reserved for problems that can be caught when the
//! system is assembled.

use crate::core_types::TargetId;

/// Errors raised while configuring or assembling the fire system
#[derive(Debug, Clone, PartialEq)]
pub enum IgnitionError {
    /// A flammable target was declared without a heat threshold
    MissingHeatThreshold(TargetId),
    /// A heat threshold was zero, negative or not finite
    InvalidHeatThreshold { target: TargetId, value: f32 },
    /// A required scene collaborator was not supplied
    MissingCollaborator(&'static str),
    /// A configuration value is out of range
    InvalidConfig { field: &'static str, message: String },
}

impl IgnitionError {
    pub(crate) fn invalid_config(field: &'static str, message: impl Into<String>) -> Self {
        IgnitionError::InvalidConfig {
            field,
            message: message.into(),
        }
    }
}

impl std::fmt::Display for IgnitionError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            IgnitionError::MissingHeatThreshold(target) => {
                write!(f, "Flammable {target} has no heat threshold")
            }
            IgnitionError::InvalidHeatThreshold { target, value } => write!(
                f,
                "Flammable {target}: heat threshold must be finite and positive, got {value}"
            ),
            IgnitionError::MissingCollaborator(name) => {
                write!(f, "Required scene collaborator '{name}' was not provided")
            }
            IgnitionError::InvalidConfig { field, message } => {
                write!(f, "Invalid configuration {field}: {message}")
            }
        }
    }
}

impl std::error::Error for IgnitionError {}

/// Reject negative or non-finite values (durations, radii, rates).
pub(crate) fn ensure_non_negative(field: &'static str, value: f32) -> Result<(), IgnitionError> {
    if value.is_finite() && value >= 0.0 {
        Ok(())
    } else {
        Err(IgnitionError::invalid_config(
            field,
            format!("must be finite and non-negative, got {value}"),
        ))
    }
}

/// Reject zero, negative or non-finite values.
pub(crate) fn ensure_positive(field: &'static str, value: f32) -> Result<(), IgnitionError> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(IgnitionError::invalid_config(
            field,
            format!("must be finite and positive, got {value}"),
        ))
    }
}

/// Reject values outside `[0, 1]`.
pub(crate) fn ensure_probability(field: &'static str, value: f32) -> Result<(), IgnitionError> {
    if (0.0..=1.0).contains(&value) {
        Ok(())
    } else {
        Err(IgnitionError::invalid_config(
            field,
            format!("must be within [0, 1], got {value}"),
        ))
    }
}
