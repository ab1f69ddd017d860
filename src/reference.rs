//! Reference-base lookup port used to fill spliced (`N`) regions.

use crate::errors::{ReconcileError, Result};

/// Resolves reference bases for a genomic interval.
///
/// Coordinates are 1-based and inclusive on both ends.
pub trait ReferenceLookup: Sync {
    fn fetch(&self, chrom: &str, start: u64, end: u64) -> Result<Vec<u8>>;
}

impl<F> ReferenceLookup for F
where
    F: Fn(&str, u64, u64) -> Result<Vec<u8>> + Sync,
{
    fn fetch(&self, chrom: &str, start: u64, end: u64) -> Result<Vec<u8>> {
        self(chrom, start, end)
    }
}

/// Fetch `[start, end]` and check that exactly `end - start + 1` bases came back.
pub(crate) fn fetch_exact(
    lookup: &dyn ReferenceLookup,
    chrom: &str,
    start: u64,
    end: u64,
) -> Result<Vec<u8>> {
    let bases = lookup.fetch(chrom, start, end)?;
    let expected = end.saturating_sub(start) + 1;
    if bases.len() as u64 != expected {
        return Err(ReconcileError::LookupFailed {
            chrom: chrom.to_string(),
            start,
            end,
            reason: format!("expected {expected} bases, got {}", bases.len()),
        });
    }
    Ok(bases)
}
