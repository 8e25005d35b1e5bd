use thiserror::Error;

/// Failures that indicate a broken contract or a bad document.
///
/// "Not enough data yet" is never an error here; those states are modelled as
/// `Option::None` or as a [`crate::coordinator::PredictionOutcome`].
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("epoch needs exactly {expected} samples, got {actual}")]
    EpochSize { expected: usize, actual: usize },
    #[error("expected {expected} features, got {actual}")]
    FeatureLength { expected: usize, actual: usize },
    #[error("sample {index} at {timestamp} ms is earlier than the one before it ({previous} ms)")]
    OutOfOrder { index: usize, previous: u64, timestamp: u64 },
    #[error("classifier failure: {0}")]
    Classifier(String),
    #[error("normalization stats: {0}")]
    Stats(String),
    #[error("tree ensemble model: {0}")]
    Model(String),
    #[error("invalid config: {0}")]
    Config(String),
    #[error("json parse at {path}: {message}")]
    Json { path: String, message: String },
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error("csv: {0}")]
    Csv(String),
}

impl From<serde_path_to_error::Error<serde_json::Error>> for PipelineError {
    fn from(value: serde_path_to_error::Error<serde_json::Error>) -> Self {
        PipelineError::Json {
            path: value.path().to_string(),
            message: value.inner().to_string(),
        }
    }
}

impl From<csv::Error> for PipelineError {
    fn from(value: csv::Error) -> Self {
        PipelineError::Csv(value.to_string())
    }
}

pub type Result<T> = std::result::Result<T, PipelineError>;

/// Deserialize a JSON document, keeping the path of the first bad field.
pub(crate) fn from_json_str<T>(txt: &str) -> Result<T>
where
    T: serde::de::DeserializeOwned,
{
    let mut de = serde_json::Deserializer::from_str(txt);
    Ok(serde_path_to_error::deserialize(&mut de)?)
}
