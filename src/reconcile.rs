//! Joint walk of a CIGAR and an MD tag over one mate's bases.
//!
//! The CIGAR drives: each operation says how many query bases and reference
//! positions it covers. Within mapped operations (`M`, `=`, `X`) the MD cursor
//! is asked, chunk by chunk, whether the next positions match or mismatch. The
//! result is an [`AlignmentRecord`] holding every query base sorted into one of
//! four categories, plus three column-aligned strings (query, reference,
//! quality) that always have the same length.

use crate::cigar::{CigarOp, CigarStream};
use crate::errors::{ReconcileError, Result};
use crate::md::{MdChunk, MdCursor};
use crate::record::{MateRole, ReadRecord};
use crate::reference::{self, ReferenceLookup};

/// Reference column for a position identical to the query.
pub const MATCH_SENTINEL: u8 = b'.';
/// Reference column for a soft-clipped position.
pub const UNKNOWN_SENTINEL: u8 = b'?';
/// Filler where one side contributes nothing (insertions in the reference,
/// deletions and introns in query and quality).
pub const ABSENT_SENTINEL: u8 = b'~';
/// Reference base for a deletion whose MD token carries no bases.
pub const UNRECORDED_BASE: u8 = b'N';

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SplitKind {
    SoftClip,
    Insertion,
    Match,
    Mismatch,
}

/// Ordered query/quality entries for one category.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SplitBucket {
    pub query: Vec<Vec<u8>>,
    pub quality: Vec<Vec<u8>>,
}

impl SplitBucket {
    fn push(&mut self, query: &[u8], quality: &[u8]) {
        self.query.push(query.to_vec());
        self.quality.push(quality.to_vec());
    }

    pub fn len(&self) -> usize {
        self.query.len()
    }

    pub fn is_empty(&self) -> bool {
        self.query.is_empty()
    }
}

/// One mate after reconciliation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AlignmentRecord {
    pub read_id: String,
    pub role: MateRole,
    pub chrom: String,
    /// Start position, advanced past every reference-consuming operation.
    pub position: u64,
    pub softclip: SplitBucket,
    pub insertion: SplitBucket,
    pub matched: SplitBucket,
    pub mismatch: SplitBucket,
    /// Reference base of each mismatch entry.
    pub mismatch_reference: Vec<Vec<u8>>,
    pub aligned_query: Vec<u8>,
    pub aligned_reference: Vec<u8>,
    pub aligned_quality: Vec<u8>,
    /// Category of each bucket entry, in the order the entries were produced.
    trail: Vec<SplitKind>,
}

impl AlignmentRecord {
    fn new(record: &ReadRecord) -> Self {
        let cap = record.sequence.len();
        Self {
            read_id: record.read_id.clone(),
            role: record.role,
            chrom: record.chrom.clone(),
            position: record.position,
            softclip: SplitBucket::default(),
            insertion: SplitBucket::default(),
            matched: SplitBucket::default(),
            mismatch: SplitBucket::default(),
            mismatch_reference: Vec::new(),
            aligned_query: Vec::with_capacity(cap),
            aligned_reference: Vec::with_capacity(cap),
            aligned_quality: Vec::with_capacity(cap),
            trail: Vec::new(),
        }
    }

    pub fn bucket(&self, kind: SplitKind) -> &SplitBucket {
        match kind {
            SplitKind::SoftClip => &self.softclip,
            SplitKind::Insertion => &self.insertion,
            SplitKind::Match => &self.matched,
            SplitKind::Mismatch => &self.mismatch,
        }
    }

    fn bucket_mut(&mut self, kind: SplitKind) -> &mut SplitBucket {
        match kind {
            SplitKind::SoftClip => &mut self.softclip,
            SplitKind::Insertion => &mut self.insertion,
            SplitKind::Match => &mut self.matched,
            SplitKind::Mismatch => &mut self.mismatch,
        }
    }

    /// Categories of all bucket entries in traversal order.
    pub fn trail(&self) -> &[SplitKind] {
        &self.trail
    }

    /// Concatenate bucket entries in traversal order, giving back the read's
    /// `(sequence, quality)`.
    pub fn reassemble(&self) -> (Vec<u8>, Vec<u8>) {
        let mut next = [0usize; 4];
        let mut query = Vec::with_capacity(self.aligned_query.len());
        let mut quality = Vec::with_capacity(self.aligned_quality.len());
        for &kind in &self.trail {
            let bucket = self.bucket(kind);
            let i = &mut next[kind as usize];
            query.extend_from_slice(&bucket.query[*i]);
            quality.extend_from_slice(&bucket.quality[*i]);
            *i += 1;
        }
        (query, quality)
    }

    fn split(&mut self, kind: SplitKind, query: &[u8], quality: &[u8]) {
        self.bucket_mut(kind).push(query, quality);
        self.trail.push(kind);
    }

    fn extend_aligned(&mut self, query: &[u8], reference: &[u8], quality: &[u8]) {
        self.aligned_query.extend_from_slice(query);
        self.aligned_reference.extend_from_slice(reference);
        self.aligned_quality.extend_from_slice(quality);
    }

    fn extend_filled(&mut self, query: &[u8], fill: u8, quality: &[u8]) {
        self.aligned_query.extend_from_slice(query);
        self.aligned_reference.extend(std::iter::repeat_n(fill, query.len()));
        self.aligned_quality.extend_from_slice(quality);
    }

    fn extend_reference_only(&mut self, reference: &[u8]) {
        let n = reference.len();
        self.aligned_query.extend(std::iter::repeat_n(ABSENT_SENTINEL, n));
        self.aligned_reference.extend_from_slice(reference);
        self.aligned_quality.extend(std::iter::repeat_n(ABSENT_SENTINEL, n));
    }
}

/// Front-consumed view over a read's bases and qualities.
struct ReadCursor<'a> {
    sequence: &'a [u8],
    quality: &'a [u8],
    offset: usize,
}

impl<'a> ReadCursor<'a> {
    fn new(sequence: &'a [u8], quality: &'a [u8]) -> Self {
        Self { sequence, quality, offset: 0 }
    }

    fn available(&self) -> usize {
        self.sequence.len().min(self.quality.len()).saturating_sub(self.offset)
    }

    fn take(&mut self, n: usize) -> Result<(&'a [u8], &'a [u8])> {
        let available = self.available();
        if n > available {
            return Err(ReconcileError::QueryExhausted { needed: n, available });
        }
        let (sequence, quality): (&'a [u8], &'a [u8]) = (self.sequence, self.quality);
        let range = self.offset..self.offset + n;
        self.offset += n;
        Ok((&sequence[range.clone()], &quality[range]))
    }

    fn remaining(&self) -> usize {
        self.sequence.len().max(self.quality.len()) - self.offset
    }
}

#[derive(Clone, Copy, Default)]
pub struct ReconcileConfig<'a> {
    /// Fill `N` regions from `lookup` instead of dropping them.
    pub splice: bool,
    pub lookup: Option<&'a dyn ReferenceLookup>,
}

impl std::fmt::Debug for ReconcileConfig<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReconcileConfig")
            .field("splice", &self.splice)
            .field("lookup", &self.lookup.is_some())
            .finish()
    }
}

#[derive(Debug, Clone, Copy)]
pub struct AlignmentReconciler<'a> {
    config: ReconcileConfig<'a>,
}

impl<'a> AlignmentReconciler<'a> {
    pub fn new(config: ReconcileConfig<'a>) -> Result<Self> {
        if config.splice && config.lookup.is_none() {
            return Err(ReconcileError::MissingLookup);
        }
        Ok(Self { config })
    }

    /// Walk `record`'s CIGAR against its MD tag.
    ///
    /// Errors carry the read identifier and the index of the CIGAR operation
    /// that failed.
    pub fn reconcile(&self, record: &ReadRecord) -> Result<AlignmentRecord> {
        let Some(md) = record.md.as_deref() else {
            return Err(ReconcileError::MalformedTag {
                md: String::new(),
                reason: "record has no MD tag".to_string(),
            }
            .in_record(&record.read_id, 0));
        };

        let mut out = AlignmentRecord::new(record);
        let mut read = ReadCursor::new(&record.sequence, &record.quality);
        let mut md = MdCursor::new(md);

        let mut op_index = 0usize;
        for op in CigarStream::new(&record.cigar) {
            let op = op.map_err(|e| e.in_record(&record.read_id, op_index))?;
            self.apply(op.op, op.len, &mut out, &mut read, &mut md)
                .map_err(|e| e.in_record(&record.read_id, op_index))?;
            op_index += 1;
        }

        if read.remaining() > 0 {
            return Err(ReconcileError::UnconsumedQuery { remaining: read.remaining() }
                .in_record(&record.read_id, op_index));
        }
        if !md.is_drained() {
            let reason = if md.remaining_in_run() > 0 {
                format!("{} matched bases left in the last run", md.remaining_in_run())
            } else {
                format!("'{}' left after CIGAR was exhausted", md.rest())
            };
            return Err(ReconcileError::MalformedTag { md: record.md.clone().unwrap_or_default(), reason }
                .in_record(&record.read_id, op_index));
        }

        debug_assert_eq!(out.aligned_query.len(), out.aligned_reference.len());
        debug_assert_eq!(out.aligned_query.len(), out.aligned_quality.len());
        Ok(out)
    }

    fn apply(
        &self,
        op: CigarOp,
        len: usize,
        out: &mut AlignmentRecord,
        read: &mut ReadCursor<'_>,
        md: &mut MdCursor<'_>,
    ) -> Result<()> {
        match op {
            CigarOp::SoftClip => {
                let (query, quality) = read.take(len)?;
                out.split(SplitKind::SoftClip, query, quality);
                out.extend_filled(query, UNKNOWN_SENTINEL, quality);
                out.position += len as u64;
            }
            CigarOp::Ins => {
                let (query, quality) = read.take(len)?;
                out.split(SplitKind::Insertion, query, quality);
                out.extend_filled(query, ABSENT_SENTINEL, quality);
            }
            CigarOp::Del => {
                let bases = md.take_deletion()?;
                if bases.is_empty() {
                    tracing::warn!(
                        read_id = %out.read_id,
                        len,
                        "MD deletion carries no bases; filling reference with N"
                    );
                    out.extend_reference_only(&vec![UNRECORDED_BASE; len]);
                } else if bases.len() != len {
                    return Err(ReconcileError::Desynchronized {
                        reason: format!(
                            "CIGAR deletion of {len} but MD deletion '^{}' has {}",
                            String::from_utf8_lossy(bases),
                            bases.len()
                        ),
                    });
                } else {
                    out.extend_reference_only(bases);
                }
                out.position += len as u64;
            }
            CigarOp::Match | CigarOp::Equal | CigarOp::Diff => {
                let mut remaining = len;
                while remaining > 0 {
                    let chunk = md.consume(remaining)?;
                    let (query, quality) = read.take(chunk.width())?;
                    match chunk {
                        MdChunk::Match(_) => {
                            out.split(SplitKind::Match, query, quality);
                            out.extend_filled(query, MATCH_SENTINEL, quality);
                        }
                        MdChunk::Mismatch(base) => {
                            out.split(SplitKind::Mismatch, query, quality);
                            out.mismatch_reference.push(vec![base]);
                            out.extend_aligned(query, &[base], quality);
                        }
                    }
                    remaining -= chunk.width();
                }
                out.position += len as u64;
            }
            CigarOp::RefSkip => {
                if self.config.splice {
                    let lookup = self.config.lookup.ok_or(ReconcileError::MissingLookup)?;
                    let start = out.position;
                    let end = start + len as u64 - 1;
                    let bases = reference::fetch_exact(lookup, &out.chrom, start, end)?;
                    out.extend_reference_only(&bases);
                }
                out.position += len as u64;
            }
            CigarOp::HardClip | CigarOp::Pad => {
                tracing::warn!(
                    read_id = %out.read_id,
                    op = %op.code(),
                    len,
                    "CIGAR operation has no defined transformation; ignoring"
                );
            }
        }
        Ok(())
    }
}
