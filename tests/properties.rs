/// Property-based checks of the reconciliation walk over generated alignments.
///
/// Every case is built so that its CIGAR, MD tag and read agree, which makes
/// the expected reference bases and track lengths known up front.
use mdsplit_rs::errors::Result;
use mdsplit_rs::{
    ABSENT_SENTINEL, AlignmentReconciler, MateRole, ReadRecord, ReconcileConfig, UNKNOWN_SENTINEL,
};
use proptest::prelude::*;
use std::fmt::Write as _;

// ── generators ───────────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
enum Piece {
    /// One `M` operation; `true` marks a mismatching position.
    Aligned(Vec<bool>),
    Ins(usize),
    Del(Vec<u8>),
    Skip(usize),
}

#[derive(Debug)]
struct Alignment {
    record: ReadRecord,
    clipped: usize,
    deleted: usize,
    skipped: usize,
    mismatch_reference: Vec<u8>,
}

fn nucleotide() -> impl Strategy<Value = u8> {
    prop::sample::select(b"ACGT".to_vec())
}

fn aligned() -> impl Strategy<Value = Piece> {
    prop::collection::vec(prop::bool::weighted(0.15), 1..20).prop_map(Piece::Aligned)
}

fn piece() -> impl Strategy<Value = Piece> {
    prop_oneof![
        4 => aligned(),
        1 => (1usize..4).prop_map(Piece::Ins),
        1 => prop::collection::vec(nucleotide(), 1..4).prop_map(Piece::Del),
        1 => (1usize..30).prop_map(Piece::Skip),
    ]
}

fn alignment() -> impl Strategy<Value = Alignment> {
    (
        0usize..4,
        aligned(),
        prop::collection::vec(piece(), 0..7),
        0usize..4,
        prop::collection::vec(nucleotide(), 200),
        prop::collection::vec(33u8..75, 200),
    )
        .prop_map(|(lead, first, rest, trail, bases, quals)| {
            let pieces: Vec<Piece> = std::iter::once(first).chain(rest).collect();
            build(lead, &pieces, trail, &bases, &quals)
        })
}

fn grow(seq: &mut Vec<u8>, pool: &[u8], n: usize) {
    let at = seq.len();
    seq.extend_from_slice(&pool[at..at + n]);
}

fn build(lead: usize, pieces: &[Piece], trail: usize, bases: &[u8], quals: &[u8]) -> Alignment {
    let mut cigar = String::new();
    let mut md = String::new();
    let mut run = 0usize;
    let mut seq = Vec::new();
    let mut deleted = 0;
    let mut skipped = 0;
    let mut mismatch_reference = Vec::new();

    if lead > 0 {
        write!(cigar, "{lead}S").unwrap();
        grow(&mut seq, bases, lead);
    }
    for piece in pieces {
        match piece {
            Piece::Aligned(flags) => {
                write!(cigar, "{}M", flags.len()).unwrap();
                for &mismatch in flags {
                    let query = bases[seq.len()];
                    grow(&mut seq, bases, 1);
                    if mismatch {
                        let reference = if query == b'A' { b'C' } else { b'A' };
                        write!(md, "{run}{}", reference as char).unwrap();
                        mismatch_reference.push(reference);
                        run = 0;
                    } else {
                        run += 1;
                    }
                }
            }
            Piece::Ins(n) => {
                write!(cigar, "{n}I").unwrap();
                grow(&mut seq, bases, *n);
            }
            Piece::Del(del) => {
                write!(cigar, "{}D", del.len()).unwrap();
                write!(md, "{run}^{}", std::str::from_utf8(del).unwrap()).unwrap();
                deleted += del.len();
                run = 0;
            }
            Piece::Skip(n) => {
                write!(cigar, "{n}N").unwrap();
                skipped += n;
            }
        }
    }
    if trail > 0 {
        write!(cigar, "{trail}S").unwrap();
        grow(&mut seq, bases, trail);
    }
    write!(md, "{run}").unwrap();

    let qual = quals[..seq.len()].to_vec();
    let record =
        ReadRecord::new("generated", MateRole::First, "chr1", 1000, cigar, seq, qual, Some(&md));
    Alignment { record, clipped: lead + trail, deleted, skipped, mismatch_reference }
}

fn unknown_bases(_chrom: &str, start: u64, end: u64) -> Result<Vec<u8>> {
    Ok(vec![b'N'; (end - start + 1) as usize])
}

// ── properties ───────────────────────────────────────────────────────────────

proptest! {
    #[test]
    fn tracks_share_one_length_and_reassemble_the_read(aln in alignment()) {
        let reconciler = AlignmentReconciler::new(ReconcileConfig::default()).unwrap();
        let out = reconciler.reconcile(&aln.record).unwrap();

        prop_assert_eq!(out.aligned_query.len(), out.aligned_reference.len());
        prop_assert_eq!(out.aligned_query.len(), out.aligned_quality.len());
        prop_assert_eq!(out.aligned_query.len(), aln.record.sequence.len() + aln.deleted);

        let (seq, qual) = out.reassemble();
        prop_assert_eq!(seq, aln.record.sequence.clone());
        prop_assert_eq!(qual, aln.record.quality.clone());
    }

    #[test]
    fn reconciling_twice_gives_the_same_record(aln in alignment()) {
        let reconciler = AlignmentReconciler::new(ReconcileConfig::default()).unwrap();
        let first = reconciler.reconcile(&aln.record).unwrap();
        let second = reconciler.reconcile(&aln.record).unwrap();
        prop_assert_eq!(first, second);
    }

    #[test]
    fn mismatches_report_the_tag_reference_bases(aln in alignment()) {
        let reconciler = AlignmentReconciler::new(ReconcileConfig::default()).unwrap();
        let out = reconciler.reconcile(&aln.record).unwrap();

        let reported: Vec<u8> = out.mismatch_reference.concat();
        prop_assert_eq!(reported, aln.mismatch_reference.clone());
        prop_assert_eq!(out.mismatch.len(), aln.mismatch_reference.len());
        let clips = out.aligned_reference.iter().filter(|&&b| b == UNKNOWN_SENTINEL).count();
        prop_assert_eq!(clips, aln.clipped);
    }

    #[test]
    fn splicing_adds_each_intron_to_the_tracks(aln in alignment()) {
        let reconciler = AlignmentReconciler::new(ReconcileConfig {
            splice: true,
            lookup: Some(&unknown_bases),
        })
        .unwrap();
        let out = reconciler.reconcile(&aln.record).unwrap();

        let expected = aln.record.sequence.len() + aln.deleted + aln.skipped;
        prop_assert_eq!(out.aligned_query.len(), expected);
        prop_assert_eq!(out.aligned_reference.len(), expected);
        let gaps = out.aligned_query.iter().filter(|&&b| b == ABSENT_SENTINEL).count();
        prop_assert_eq!(gaps, aln.deleted + aln.skipped);
    }
}
