use thiserror::Error;

/// Codec compilation and (de)serialization errors.
#[derive(Debug, Error)]
pub enum CodecError {
    /// Malformed or truncated input bytes, a constant mismatch, or an
    /// unknown enum discriminant. Raised on the decode path.
    #[error("format error: {0}")]
    Format(String),

    /// A numeric value does not fit its declared byte width.
    #[error("value out of range: {0}")]
    Range(String),

    /// A logical value has the wrong shape for its node (missing struct
    /// field, unknown variant tag, wrong arity).
    #[error("invalid value: {0}")]
    Value(String),

    /// The descriptor tree exceeds the defensive nesting limit.
    #[error("schema nesting exceeds {0} levels")]
    Depth(usize),

    /// The descriptor tree is not compilable (e.g. a fixed-size option over
    /// a variable-size payload).
    #[error("invalid schema: {0}")]
    Schema(String),
}
