use thiserror::Error;

/// Broad classification of every failure the engine can report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    Configuration,
    DataProcessing,
    Cancelled,
    ModelNotFound,
    ModelTraining,
    ModelPrediction,
    Unknown,
}

impl ErrorKind {
    /// Stable numeric code, suitable for exit codes and reports
    pub fn code(&self) -> u32 {
        match self {
            ErrorKind::DataProcessing => 1002,
            ErrorKind::Cancelled => 1003,
            ErrorKind::ModelTraining => 2001,
            ErrorKind::ModelPrediction => 2002,
            ErrorKind::ModelNotFound => 2003,
            ErrorKind::Configuration => 5001,
            ErrorKind::Unknown => 9999,
        }
    }
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            ErrorKind::Configuration => "CONFIGURATION_ERROR",
            ErrorKind::DataProcessing => "DATA_PROCESSING_ERROR",
            ErrorKind::Cancelled => "CANCELLED",
            ErrorKind::ModelNotFound => "MODEL_NOT_FOUND",
            ErrorKind::ModelTraining => "MODEL_TRAINING_ERROR",
            ErrorKind::ModelPrediction => "MODEL_PREDICTION_ERROR",
            ErrorKind::Unknown => "UNKNOWN_ERROR",
        };
        write!(f, "{}({})", label, self.code())
    }
}

/// Errors raised by processors, models and the model registry
#[derive(Debug, Error)]
pub enum FactorEngineError {
    #[error("Invalid configuration value for '{key}': {reason}")]
    Configuration { key: String, reason: String },

    #[error("Invalid input for processor '{processor}': {reason}")]
    InvalidInput { processor: String, reason: String },

    #[error("Record transform failed for record dated {date}: {reason}")]
    TransformFailed { date: chrono::NaiveDate, reason: String },

    #[error("Worker failed on batch {batch} of {total_batches}: {source}")]
    WorkerFailed {
        batch: usize,
        total_batches: usize,
        #[source]
        source: Box<FactorEngineError>,
    },

    /// `completed` and `total` count records for sequential runs and batches
    /// for parallel runs
    #[error("Processing cancelled by '{processor}' ({completed}/{total} completed)")]
    Cancelled {
        processor: String,
        completed: usize,
        total: usize,
    },

    #[error("Model not found: {name}")]
    ModelNotFound { name: String },

    #[error("Model training failed for '{model}': {source}")]
    TrainingFailed {
        model: String,
        #[source]
        source: Box<FactorEngineError>,
    },

    #[error("Invalid training data for '{model}': {reason}")]
    InvalidTrainingData { model: String, reason: String },

    #[error("Model '{model}' has not been trained yet")]
    NotTrained { model: String },

    #[error("Feature size mismatch for '{model}': expected {expected}, got {actual}")]
    FeatureSizeMismatch {
        model: String,
        expected: usize,
        actual: usize,
    },

    #[error("Ensemble '{model}' has no members")]
    EmptyEnsemble { model: String },

    #[error("Ensemble '{model}' weights sum to zero")]
    ZeroWeightSum { model: String },

    #[error("Invalid ensemble weight {weight}: weights must be finite and non-negative")]
    InvalidWeight { weight: f64 },

    #[error("Cannot evaluate '{model}' on an empty record set")]
    EmptyEvaluationSet { model: String },

    #[error("Prediction failed for '{model}': {reason}")]
    PredictionFailed { model: String, reason: String },

    #[error("Unexpected failure: {reason}")]
    Unknown { reason: String },
}

impl FactorEngineError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            FactorEngineError::Configuration { .. } | FactorEngineError::InvalidWeight { .. } => {
                ErrorKind::Configuration
            }
            FactorEngineError::InvalidInput { .. }
            | FactorEngineError::TransformFailed { .. }
            | FactorEngineError::WorkerFailed { .. } => ErrorKind::DataProcessing,
            FactorEngineError::Cancelled { .. } => ErrorKind::Cancelled,
            FactorEngineError::ModelNotFound { .. } => ErrorKind::ModelNotFound,
            FactorEngineError::TrainingFailed { .. }
            | FactorEngineError::InvalidTrainingData { .. } => ErrorKind::ModelTraining,
            FactorEngineError::NotTrained { .. }
            | FactorEngineError::FeatureSizeMismatch { .. }
            | FactorEngineError::EmptyEnsemble { .. }
            | FactorEngineError::ZeroWeightSum { .. }
            | FactorEngineError::EmptyEvaluationSet { .. }
            | FactorEngineError::PredictionFailed { .. } => ErrorKind::ModelPrediction,
            FactorEngineError::Unknown { .. } => ErrorKind::Unknown,
        }
    }

    pub fn configuration(key: impl Into<String>, reason: impl Into<String>) -> Self {
        FactorEngineError::Configuration {
            key: key.into(),
            reason: reason.into(),
        }
    }

    pub fn model_not_found(name: impl Into<String>) -> Self {
        FactorEngineError::ModelNotFound { name: name.into() }
    }

    /// Poisoned locks only happen after a panic in another thread
    pub(crate) fn poisoned(what: &str) -> Self {
        FactorEngineError::Unknown {
            reason: format!("{} lock poisoned", what),
        }
    }
}

pub type FactorResult<T> = Result<T, FactorEngineError>;
