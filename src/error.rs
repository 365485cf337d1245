use thiserror::Error;

/// Errors that can occur while estimating stand yields.
#[derive(Error, Debug)]
pub enum StandError {
    #[error("Missing coefficients in table {table} for key {key}")]
    MissingCoefficients { table: &'static str, key: String },

    #[error("Processing failure: {0}")]
    ProcessingFailure(String),

    #[error("Stand validation failure: {0}")]
    StandValidation(String),

    #[error("Illegal argument: {0}")]
    IllegalArgument(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("Excel error: {0}")]
    Excel(String),

    #[error("Parse error: {0}")]
    Parse(String),
}

impl StandError {
    /// Whether the error must abort a whole batch run rather than a single polygon.
    pub fn is_fatal(&self) -> bool {
        matches!(self, StandError::MissingCoefficients { .. })
    }

    /// Whether the error is a per-polygon condition the batch runner bypasses.
    pub fn is_bypassable(&self) -> bool {
        matches!(
            self,
            StandError::StandValidation(_)
                | StandError::IllegalArgument(_)
                | StandError::ProcessingFailure(_)
        )
    }
}

impl From<calamine::Error> for StandError {
    fn from(e: calamine::Error) -> Self {
        StandError::Excel(e.to_string())
    }
}

impl From<calamine::XlsxError> for StandError {
    fn from(e: calamine::XlsxError) -> Self {
        StandError::Excel(e.to_string())
    }
}

impl From<rust_xlsxwriter::XlsxError> for StandError {
    fn from(e: rust_xlsxwriter::XlsxError) -> Self {
        StandError::Excel(e.to_string())
    }
}
