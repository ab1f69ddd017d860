//! mdsplit-rs: rebuild per-read alignments from CIGAR + MD and split bases by category.
//!
//! Every primary alignment is walked once, consuming its CIGAR operations and MD
//! runs in lock-step. The walk yields gapped query/reference/quality tracks and
//! four buckets of query segments (soft clips, insertions, matches, mismatches).
//!
//! # Library usage
//!
//! ```
//! use mdsplit_rs::{AlignmentReconciler, MateRole, ReadRecord, ReconcileConfig};
//!
//! let reconciler = AlignmentReconciler::new(ReconcileConfig::default())?;
//! let read = ReadRecord::new("q1", MateRole::First, "chr1", 100, "5M", "AGCTA", "IIIII", Some("2A2"));
//! let aln = reconciler.reconcile(&read)?;
//! assert_eq!(aln.aligned_reference, b"..A..");
//! assert_eq!(aln.mismatch.query, vec![b"C".to_vec()]);
//! # Ok::<(), mdsplit_rs::ReconcileError>(())
//! ```

// Internal modules, not part of the public API.
pub(crate) mod types;

// Public modules.
pub mod bam_input;
pub mod cigar;
pub mod errors;
pub mod fasta;
pub mod md;
pub mod output;
pub mod pairing;
pub mod pipeline;
pub mod reconcile;
pub mod record;
pub mod reference;

// Flat re-exports for the most commonly used public types.
pub use cigar::{CigarOp, CigarOperation, CigarStream};
pub use errors::ReconcileError;
pub use fasta::FastaDb;
pub use md::{MdChunk, MdCursor, MdRun};
pub use output::RowWriter;
pub use pairing::{AlignmentPair, MateGroup, MateGrouper, MatePairAssembler, reconcile_group};
pub use reconcile::{
    ABSENT_SENTINEL, AlignmentReconciler, AlignmentRecord, MATCH_SENTINEL, ReconcileConfig,
    SplitBucket, SplitKind, UNKNOWN_SENTINEL, UNRECORDED_BASE,
};
pub use record::{MateRole, ReadRecord};
pub use reference::ReferenceLookup;
