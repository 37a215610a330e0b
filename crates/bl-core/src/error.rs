use thiserror::Error;

/// Errors originating from the core module.
///
/// Every variant is a configuration error: they are raised when a detector is
/// built, never while samples are flowing.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CoreError {
    /// Window length is zero or not a power of two.
    #[error("window length {length} is not a positive power of two")]
    WindowLength {
        /// Rejected window length.
        length: usize,
    },

    /// Band count is zero.
    #[error("band count must be positive (got {count})")]
    BandCount {
        /// Rejected band count.
        count: usize,
    },

    /// Band count does not split the window into equal bands.
    #[error("band count {bands} does not divide window length {window}")]
    BandMismatch {
        /// Window (spectrum) length.
        window: usize,
        /// Requested band count.
        bands: usize,
    },

    /// Invalid configuration value or structure.
    #[error("invalid configuration: {0}")]
    Config(String),
}
