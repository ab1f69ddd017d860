//! Error taxonomy for CIGAR/MD reconciliation.

use thiserror::Error;

/// Result type alias for reconciliation operations.
pub type Result<T> = std::result::Result<T, ReconcileError>;

/// Error type for reconciling one mate's CIGAR against its MD tag.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ReconcileError {
    /// MD text does not decode into runs, or runs remain after the CIGAR is exhausted.
    #[error("malformed MD tag '{md}': {reason}")]
    MalformedTag {
        /// The full MD tag text
        md: String,
        /// What went wrong while decoding
        reason: String,
    },

    /// CIGAR and MD disagree about where a deletion starts or how long it is.
    #[error("CIGAR/MD desynchronized: {reason}")]
    Desynchronized {
        /// Explanation of the disagreement
        reason: String,
    },

    /// CIGAR text could not be decoded.
    #[error("invalid CIGAR '{cigar}': {reason}")]
    InvalidCigar {
        /// The full CIGAR text
        cigar: String,
        /// What went wrong while decoding
        reason: String,
    },

    /// An operation asked for more query bases (or quality scores) than remain.
    #[error("query exhausted: needed {needed} more bases, {available} available")]
    QueryExhausted {
        /// Bases requested by the operation
        needed: usize,
        /// Bases left in the read cursor
        available: usize,
    },

    /// Query bases were left over after the CIGAR was exhausted.
    #[error("{remaining} query bases left unconsumed after CIGAR was exhausted")]
    UnconsumedQuery {
        /// Bases left in the read cursor
        remaining: usize,
    },

    /// The reference lookup could not resolve a skipped interval.
    #[error("reference lookup failed for {chrom}:{start}-{end}: {reason}")]
    LookupFailed {
        /// Chromosome name
        chrom: String,
        /// 1-based inclusive start
        start: u64,
        /// 1-based inclusive end
        end: u64,
        /// Explanation from the lookup provider
        reason: String,
    },

    /// Splice mode is on but no lookup was supplied.
    #[error("splice mode requires a reference lookup")]
    MissingLookup,

    /// Any of the above, tagged with the record it happened in.
    #[error("read '{read_id}', CIGAR operation {op_index}: {source}")]
    Record {
        /// Read identifier
        read_id: String,
        /// Zero-based index of the CIGAR operation being processed
        op_index: usize,
        /// Underlying error
        #[source]
        source: Box<ReconcileError>,
    },
}

impl ReconcileError {
    /// Attach the read identifier and operation offset to an error.
    #[must_use]
    pub fn in_record(self, read_id: &str, op_index: usize) -> Self {
        match self {
            Self::Record { .. } => self,
            other => Self::Record {
                read_id: read_id.to_string(),
                op_index,
                source: Box::new(other),
            },
        }
    }

    /// The innermost error, with record context stripped.
    #[must_use]
    pub fn kind(&self) -> &ReconcileError {
        match self {
            Self::Record { source, .. } => source.kind(),
            other => other,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_malformed_tag_message() {
        let error = ReconcileError::MalformedTag {
            md: "10A?".to_string(),
            reason: "unexpected character '?'".to_string(),
        };
        let msg = format!("{error}");
        assert!(msg.contains("malformed MD tag '10A?'"));
        assert!(msg.contains("unexpected character"));
    }

    #[test]
    fn test_in_record_wraps_once() {
        let error = ReconcileError::UnconsumedQuery { remaining: 3 }
            .in_record("read1", 2)
            .in_record("other", 9);
        let msg = format!("{error}");
        assert!(msg.starts_with("read 'read1', CIGAR operation 2"));
        assert_eq!(error.kind(), &ReconcileError::UnconsumedQuery { remaining: 3 });
    }

    #[test]
    fn test_lookup_failed_message() {
        let error = ReconcileError::LookupFailed {
            chrom: "chr1".to_string(),
            start: 100,
            end: 109,
            reason: "unknown sequence".to_string(),
        };
        assert_eq!(
            format!("{error}"),
            "reference lookup failed for chr1:100-109: unknown sequence"
        );
    }
}
