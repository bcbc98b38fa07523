use thiserror::Error;

/// Address and derivation errors.
#[derive(Debug, Error)]
pub enum KeyError {
    #[error("invalid address: {0}")]
    InvalidAddress(String),

    #[error("invalid hash: {0}")]
    InvalidHash(String),

    /// PDA search tried every bump seed in [0, 255] without finding an
    /// off-curve digest. Seed selection is the caller's problem; this layer
    /// never retries with different seeds.
    #[error("pda derivation exhausted all 256 bump seeds")]
    BumpSeedsExhausted,
}
