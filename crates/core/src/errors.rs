use thiserror::Error;

/// Failures of the discount-optimization procedure itself.
#[derive(Clone, Debug, Error, PartialEq)]
pub enum OptimizationError {
    #[error("invalid quote request: {0}")]
    InvalidRequest(String),
    #[error("no historical record found for product `{product}`")]
    NotFound { product: String },
    #[error("feature schema mismatch for model `{model}`: {detail}")]
    FeatureMismatch { model: String, detail: String },
    #[error("model `{model}` inference failed: {detail}")]
    ModelInference { model: String, detail: String },
    #[error(
        "no feasible discount: every candidate predicts a conversion rate below the threshold {threshold}"
    )]
    NoFeasibleCandidate { threshold: f64, best_conversion_rate: Option<f64> },
}

impl OptimizationError {
    /// Stable machine-readable class, used in logs and API error bodies.
    pub fn class(&self) -> &'static str {
        match self {
            Self::InvalidRequest(_) => "invalid_request",
            Self::NotFound { .. } => "not_found",
            Self::FeatureMismatch { .. } => "feature_mismatch",
            Self::ModelInference { .. } => "model_inference",
            Self::NoFeasibleCandidate { .. } => "no_feasible_discount",
        }
    }
}

#[derive(Clone, Debug, Error, PartialEq)]
pub enum ApplicationError {
    #[error(transparent)]
    Optimization(#[from] OptimizationError),
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum InterfaceError {
    #[error("bad request: {message}")]
    BadRequest { message: String, correlation_id: String },
    #[error("not found: {message}")]
    NotFound { message: String, correlation_id: String },
    #[error("no feasible discount: {message}")]
    NoFeasibleDiscount { message: String, correlation_id: String },
    #[error("service unavailable: {message}")]
    ServiceUnavailable { message: String, correlation_id: String },
    #[error("internal error: {message}")]
    Internal { message: String, correlation_id: String },
}

impl InterfaceError {
    pub fn user_message(&self) -> &'static str {
        match self {
            Self::BadRequest { .. } => {
                "The request could not be processed. Check inputs and try again."
            }
            Self::NotFound { .. } => "No price history exists for the requested product.",
            Self::NoFeasibleDiscount { .. } => {
                "No discount reaches the requested conversion-rate limit. Lower the limit and try again."
            }
            Self::ServiceUnavailable { .. } => {
                "The service is temporarily unavailable. Please retry shortly."
            }
            Self::Internal { .. } => "An unexpected internal error occurred.",
        }
    }

    pub fn error_class(&self) -> &'static str {
        match self {
            Self::BadRequest { .. } => "bad_request",
            Self::NotFound { .. } => "not_found",
            Self::NoFeasibleDiscount { .. } => "no_feasible_discount",
            Self::ServiceUnavailable { .. } => "service_unavailable",
            Self::Internal { .. } => "internal",
        }
    }

    pub fn message(&self) -> &str {
        match self {
            Self::BadRequest { message, .. }
            | Self::NotFound { message, .. }
            | Self::NoFeasibleDiscount { message, .. }
            | Self::ServiceUnavailable { message, .. }
            | Self::Internal { message, .. } => message,
        }
    }

    pub fn correlation_id(&self) -> &str {
        match self {
            Self::BadRequest { correlation_id, .. }
            | Self::NotFound { correlation_id, .. }
            | Self::NoFeasibleDiscount { correlation_id, .. }
            | Self::ServiceUnavailable { correlation_id, .. }
            | Self::Internal { correlation_id, .. } => correlation_id,
        }
    }
}

impl ApplicationError {
    pub fn into_interface(self, correlation_id: impl Into<String>) -> InterfaceError {
        let correlation_id = correlation_id.into();
        let mut mapped = InterfaceError::from(self);
        match &mut mapped {
            InterfaceError::BadRequest { correlation_id: id, .. }
            | InterfaceError::NotFound { correlation_id: id, .. }
            | InterfaceError::NoFeasibleDiscount { correlation_id: id, .. }
            | InterfaceError::ServiceUnavailable { correlation_id: id, .. }
            | InterfaceError::Internal { correlation_id: id, .. } => *id = correlation_id,
        }
        mapped
    }
}

impl From<ApplicationError> for InterfaceError {
    fn from(value: ApplicationError) -> Self {
        let correlation_id = "unassigned".to_owned();
        match value {
            ApplicationError::Optimization(error) => {
                let message = error.to_string();
                match error {
                    OptimizationError::InvalidRequest(_) => {
                        Self::BadRequest { message, correlation_id }
                    }
                    OptimizationError::NotFound { .. } => Self::NotFound { message, correlation_id },
                    OptimizationError::NoFeasibleCandidate { .. } => {
                        Self::NoFeasibleDiscount { message, correlation_id }
                    }
                    OptimizationError::ModelInference { .. } => {
                        Self::ServiceUnavailable { message, correlation_id }
                    }
                    OptimizationError::FeatureMismatch { .. } => {
                        Self::Internal { message, correlation_id }
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::errors::{ApplicationError, InterfaceError, OptimizationError};

    #[test]
    fn missing_history_maps_to_not_found_interface_error() {
        let interface = ApplicationError::from(OptimizationError::NotFound {
            product: "TUBO 2\"".to_owned(),
        })
        .into_interface("req-1");

        assert!(matches!(
            interface,
            InterfaceError::NotFound {
                ref correlation_id,
                ..
            } if correlation_id == "req-1"
        ));
    }

    #[test]
    fn infeasible_search_is_distinct_from_system_faults() {
        let interface = ApplicationError::from(OptimizationError::NoFeasibleCandidate {
            threshold: 40.0,
            best_conversion_rate: Some(31.5),
        })
        .into_interface("req-2");

        assert!(matches!(interface, InterfaceError::NoFeasibleDiscount { .. }));
        assert_eq!(interface.error_class(), "no_feasible_discount");
        assert!(interface.message().contains("40"));
    }

    #[test]
    fn feature_mismatch_maps_to_internal() {
        let interface = ApplicationError::from(OptimizationError::FeatureMismatch {
            model: "margin".to_owned(),
            detail: "missing column `Desconto`".to_owned(),
        })
        .into_interface("req-3");

        assert!(matches!(interface, InterfaceError::Internal { .. }));
        assert_eq!(interface.user_message(), "An unexpected internal error occurred.");
    }

    #[test]
    fn inference_failure_maps_to_service_unavailable() {
        let interface = ApplicationError::from(OptimizationError::ModelInference {
            model: "conversion".to_owned(),
            detail: "returned 3 predictions for 128 rows".to_owned(),
        })
        .into_interface("req-4");

        assert!(matches!(interface, InterfaceError::ServiceUnavailable { .. }));
        assert_eq!(
            interface.user_message(),
            "The service is temporarily unavailable. Please retry shortly."
        );
    }

    #[test]
    fn invalid_request_maps_to_bad_request() {
        let interface = ApplicationError::from(OptimizationError::InvalidRequest(
            "limite must be within 0..=1".to_owned(),
        ))
        .into_interface("req-5");

        assert!(matches!(interface, InterfaceError::BadRequest { .. }));
        assert_eq!(interface.correlation_id(), "req-5");
    }

    #[test]
    fn application_error_is_transparent_over_the_optimization_failure() {
        let error = ApplicationError::from(OptimizationError::NotFound {
            product: "CHAPA FINA 3MM".to_owned(),
        });

        assert_eq!(error.to_string(), "no historical record found for product `CHAPA FINA 3MM`");
        assert_eq!(
            error.into_interface("req-6").message(),
            "no historical record found for product `CHAPA FINA 3MM`"
        );
    }
}
