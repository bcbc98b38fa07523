//! Program-derived-address search.
//!
//! A PDA is the first SHA-256 digest of
//! `seeds || bump || program_id || "ProgramDerivedAddress"` that is NOT a
//! valid Ed25519 point, searching bump seeds from 255 down to 0. Off-curve
//! means no private key can sign for the address; the owning program
//! authorizes on its behalf instead.

use sha2::{Digest, Sha256};

use crate::address::Address;
use crate::curve::is_on_curve;
use crate::error::KeyError;

/// Domain tag appended to every PDA digest.
const PDA_MARKER: &[u8] = b"ProgramDerivedAddress";

/// Maximum number of seeds and maximum length of each seed, per the runtime.
pub const MAX_SEEDS: usize = 16;
pub const MAX_SEED_LEN: usize = 32;

/// Derive the PDA for `seeds` under `program`, discarding the bump.
pub fn derive_address(program: &Address, seeds: &[&[u8]]) -> Result<Address, KeyError> {
    find_program_address(seeds, program).map(|(address, _bump)| address)
}

/// Find the PDA and its bump seed, iterating bumps from 255 down to 0 and
/// accepting the first off-curve digest.
pub fn find_program_address(
    seeds: &[&[u8]],
    program: &Address,
) -> Result<(Address, u8), KeyError> {
    check_seeds(seeds)?;
    for bump in (0u8..=255).rev() {
        if let Some(address) = digest_candidate(seeds, &[bump], program) {
            return Ok((address, bump));
        }
    }
    Err(KeyError::BumpSeedsExhausted)
}

/// Create a PDA from explicit seeds + bump, failing if the digest lands on
/// the curve.
pub fn try_create_program_address(
    seeds: &[&[u8]],
    bump: u8,
    program: &Address,
) -> Result<Address, KeyError> {
    check_seeds(seeds)?;
    digest_candidate(seeds, &[bump], program).ok_or_else(|| {
        KeyError::InvalidAddress(format!("bump {bump} lands on the ed25519 curve"))
    })
}

fn check_seeds(seeds: &[&[u8]]) -> Result<(), KeyError> {
    if seeds.len() > MAX_SEEDS {
        return Err(KeyError::InvalidAddress(format!(
            "{} seeds exceed the maximum of {MAX_SEEDS}",
            seeds.len()
        )));
    }
    for (i, seed) in seeds.iter().enumerate() {
        if seed.len() > MAX_SEED_LEN {
            return Err(KeyError::InvalidAddress(format!(
                "seed {i} is {} bytes, maximum is {MAX_SEED_LEN}",
                seed.len()
            )));
        }
    }
    Ok(())
}

fn digest_candidate(seeds: &[&[u8]], bump: &[u8], program: &Address) -> Option<Address> {
    let mut hasher = Sha256::new();
    for seed in seeds {
        hasher.update(seed);
    }
    hasher.update(bump);
    hasher.update(program.as_bytes());
    hasher.update(PDA_MARKER);

    let digest: [u8; 32] = hasher.finalize().into();
    if is_on_curve(&digest) {
        return None;
    }
    Some(Address::new(digest))
}
