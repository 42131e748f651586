use thiserror::Error;

pub type ConfigResult<T> = Result<T, ConfigError>;

/// Validation failures raised by settings normalization, before anything is drawn.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigError {
    #[error("No settings")]
    MissingConfig,

    #[error("No svg")]
    InvalidTarget,

    #[error("No data")]
    MissingData,

    #[error("No data entries")]
    MissingEntries,

    #[error("Data entries not an array")]
    EntriesNotASequence,

    #[error("Empty data entries")]
    EmptyEntries,

    #[error("No keys defined")]
    MissingKeys,

    #[error("Empty keys")]
    EmptyKeys,

    #[error("unknown curve type: {0}")]
    UnknownCurve(String),

    #[error("invalid date {value:?}: {context}")]
    InvalidDate { value: String, context: String },

    #[error("entry {0} is neither a keyed record nor a positional sequence")]
    InvalidEntry(usize),

    #[error("invalid value for key {key:?} in entry {entry}: {value}")]
    InvalidValue {
        key: String,
        entry: usize,
        value: String,
    },
}
