use thiserror::Error;

/// Visualizer error types
#[derive(Error, Debug)]
pub enum VizError {
    #[error("Table I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Table JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Invalid {table} table: {reason}")]
    InvalidTable { table: &'static str, reason: String },
    #[error(
        "Unusable band thresholds (max_bin={max_bin}, high_pass_bin={high_pass_bin}, low_pass_bin={low_pass_bin}, bins={num_magnitude_bins})"
    )]
    Thresholds {
        max_bin: usize,
        high_pass_bin: usize,
        low_pass_bin: usize,
        num_magnitude_bins: usize,
    },
    #[error("Surface error: {0}")]
    Surface(String),
}

pub type Result<T> = std::result::Result<T, VizError>;
