use thiserror::Error;

/// A metadata date string that does not match the canonical
/// `YYYY:MM:DD HH:MM:SS[±HH:MM|Z]` form. Recovered per tag: the caller
/// drops the tag from the timestamp candidates.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unparseable date string {0:?}")]
pub struct ParseError(pub String);

/// A user-supplied strftime format that cannot be rendered. Fatal: the
/// same format applies to every file, so the run aborts before planning.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid date format {format:?}")]
pub struct FormatError {
    pub format: String,
}

/// Failures on the exiftool channel.
#[derive(Debug, Error)]
pub enum ExtractError {
    #[error("failed to start exiftool: {0}")]
    Spawn(std::io::Error),
    #[error("exiftool channel error: {0}")]
    Io(#[from] std::io::Error),
    #[error("exiftool returned invalid JSON: {0}")]
    Json(#[from] serde_json::Error),
}
