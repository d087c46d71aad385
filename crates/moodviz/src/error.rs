use thiserror::Error;

/// Errors surfaced by the engine's public, non-frame operations.
///
/// Problems inside a frame (no audio, no surface, full particle pool) never
/// become errors; they are reported through `FrameOutcome` / `DrawOutcome`.
#[derive(Error, Debug)]
pub enum EngineError {
    /// Render mode name that is not one of the six known identifiers
    #[error("unknown render mode: {0}")]
    UnknownMode(String),

    #[error("unknown performance mode: {0}")]
    UnknownPerformanceMode(String),

    /// Track analysis payload was not valid JSON
    #[error("invalid track analysis: {0}")]
    InvalidTrackAnalysis(#[from] serde_json::Error),

    #[error("config parse error: {0}")]
    Config(#[from] toml::de::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, EngineError>;
