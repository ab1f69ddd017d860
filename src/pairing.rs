//! Grouping of adjacent mates into one row per read.
//!
//! Input must be name-grouped: both mates of a read appear next to each other.
//! The grouper holds at most one record; when the next record carries the same
//! read identifier the two become a pair, otherwise the held record is flushed
//! as an orphan.

use crate::errors::Result;
use crate::reconcile::{AlignmentReconciler, AlignmentRecord};
use crate::record::{MateRole, ReadRecord};

/// Raw records that make up one output row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MateGroup {
    Pair(ReadRecord, ReadRecord),
    Single(ReadRecord),
}

impl MateGroup {
    pub fn read_id(&self) -> &str {
        match self {
            Self::Pair(a, _) | Self::Single(a) => &a.read_id,
        }
    }
}

/// Up to two reconciled mates, keyed by role.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AlignmentPair {
    pub read_id: String,
    pub first: Option<AlignmentRecord>,
    pub second: Option<AlignmentRecord>,
}

impl AlignmentPair {
    pub fn mate(&self, role: MateRole) -> Option<&AlignmentRecord> {
        match role {
            MateRole::First => self.first.as_ref(),
            MateRole::Second => self.second.as_ref(),
        }
    }

    pub fn is_orphan(&self) -> bool {
        self.first.is_none() || self.second.is_none()
    }

    fn insert(&mut self, record: AlignmentRecord) {
        match record.role {
            MateRole::First => self.first = Some(record),
            MateRole::Second => self.second = Some(record),
        }
    }
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct GroupStats {
    pub records: u64,
    pub missing_md: u64,
    pub pairs: u64,
    pub orphans: u64,
    /// Rows emitted in single-end mode.
    pub singles: u64,
}

#[derive(Debug, Default)]
pub struct MateGrouper {
    single_end: bool,
    held: Option<ReadRecord>,
    stats: GroupStats,
}

impl MateGrouper {
    pub fn new(single_end: bool) -> Self {
        Self { single_end, held: None, stats: GroupStats::default() }
    }

    pub fn stats(&self) -> GroupStats {
        self.stats
    }

    /// Feed the next record; returns a group when one is complete.
    pub fn push(&mut self, mut record: ReadRecord) -> Option<MateGroup> {
        self.stats.records += 1;
        if record.md.is_none() {
            self.stats.missing_md += 1;
            tracing::warn!(read_id = %record.read_id, role = %record.role, "no MD tag; skipping record");
            return None;
        }

        if self.single_end {
            record.role = MateRole::First;
            self.stats.singles += 1;
            return Some(MateGroup::Single(record));
        }

        match self.held.take() {
            None => {
                self.held = Some(record);
                None
            }
            Some(held) if held.read_id == record.read_id && held.role != record.role => {
                self.stats.pairs += 1;
                Some(MateGroup::Pair(held, record))
            }
            Some(held) => {
                if held.read_id == record.read_id {
                    tracing::warn!(
                        read_id = %record.read_id,
                        role = %record.role,
                        "two records with the same mate role; emitting them separately"
                    );
                }
                self.stats.orphans += 1;
                self.held = Some(record);
                Some(MateGroup::Single(held))
            }
        }
    }

    /// Flush the held record at end of input.
    pub fn finish(&mut self) -> Option<MateGroup> {
        let held = self.held.take()?;
        self.stats.orphans += 1;
        Some(MateGroup::Single(held))
    }
}

/// Reconcile every record in `group` and key the results by mate role.
pub fn reconcile_group(
    reconciler: &AlignmentReconciler<'_>,
    group: &MateGroup,
) -> Result<AlignmentPair> {
    let mut pair = AlignmentPair {
        read_id: group.read_id().to_string(),
        first: None,
        second: None,
    };
    match group {
        MateGroup::Pair(a, b) => {
            pair.insert(reconciler.reconcile(a)?);
            pair.insert(reconciler.reconcile(b)?);
        }
        MateGroup::Single(a) => pair.insert(reconciler.reconcile(a)?),
    }
    Ok(pair)
}

/// Pairs adjacent mates and reconciles each finished group.
#[derive(Debug)]
pub struct MatePairAssembler<'r> {
    grouper: MateGrouper,
    reconciler: AlignmentReconciler<'r>,
}

impl<'r> MatePairAssembler<'r> {
    pub fn new(reconciler: AlignmentReconciler<'r>, single_end: bool) -> Self {
        Self { grouper: MateGrouper::new(single_end), reconciler }
    }

    pub fn push(&mut self, record: ReadRecord) -> Result<Option<AlignmentPair>> {
        self.grouper
            .push(record)
            .map(|group| reconcile_group(&self.reconciler, &group))
            .transpose()
    }

    pub fn finish(&mut self) -> Result<Option<AlignmentPair>> {
        self.grouper
            .finish()
            .map(|group| reconcile_group(&self.reconciler, &group))
            .transpose()
    }

    pub fn stats(&self) -> GroupStats {
        self.grouper.stats()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reconcile::ReconcileConfig;

    fn rec(id: &str, role: MateRole, md: Option<&str>) -> ReadRecord {
        ReadRecord::new(id, role, "chr1", 1, "4M", "ACGT", "IIII", md)
    }

    fn ids(groups: &[MateGroup]) -> Vec<(String, bool)> {
        groups
            .iter()
            .map(|g| (g.read_id().to_string(), matches!(g, MateGroup::Pair(..))))
            .collect()
    }

    fn run(single_end: bool, records: Vec<ReadRecord>) -> (Vec<MateGroup>, GroupStats) {
        let mut grouper = MateGrouper::new(single_end);
        let mut out: Vec<MateGroup> = records.into_iter().filter_map(|r| grouper.push(r)).collect();
        out.extend(grouper.finish());
        (out, grouper.stats())
    }

    #[test]
    fn adjacent_mates_pair_and_orphans_flush() {
        let (groups, stats) = run(
            false,
            vec![
                rec("a", MateRole::First, Some("4")),
                rec("a", MateRole::Second, Some("4")),
                rec("b", MateRole::Second, Some("4")),
                rec("c", MateRole::First, Some("4")),
                rec("c", MateRole::Second, Some("4")),
                rec("d", MateRole::First, Some("4")),
            ],
        );
        assert_eq!(
            ids(&groups),
            vec![
                ("a".to_string(), true),
                ("b".to_string(), false),
                ("c".to_string(), true),
                ("d".to_string(), false),
            ]
        );
        assert_eq!(stats.pairs, 2);
        assert_eq!(stats.orphans, 2);
    }

    #[test]
    fn missing_md_is_skipped_without_disturbing_state() {
        let (groups, stats) = run(
            false,
            vec![
                rec("a", MateRole::First, Some("4")),
                rec("x", MateRole::First, None),
                rec("a", MateRole::Second, Some("4")),
            ],
        );
        assert_eq!(ids(&groups), vec![("a".to_string(), true)]);
        assert_eq!(stats.missing_md, 1);
        assert_eq!(stats.records, 3);
    }

    #[test]
    fn same_role_twice_is_not_a_pair() {
        let (groups, _) = run(
            false,
            vec![rec("a", MateRole::First, Some("4")), rec("a", MateRole::First, Some("4"))],
        );
        assert_eq!(ids(&groups), vec![("a".to_string(), false), ("a".to_string(), false)]);
    }

    #[test]
    fn single_end_emits_every_record_as_first_mate() {
        let (groups, stats) = run(
            true,
            vec![rec("a", MateRole::First, Some("4")), rec("a", MateRole::Second, Some("4"))],
        );
        assert_eq!(groups.len(), 2);
        for group in &groups {
            match group {
                MateGroup::Single(r) => assert_eq!(r.role, MateRole::First),
                other => panic!("unexpected group {other:?}"),
            }
        }
        assert_eq!(stats.singles, 2);
        assert_eq!(stats.orphans, 0);
        assert_eq!(stats.pairs, 0);
    }

    #[test]
    fn assembler_keys_pair_by_role() {
        let reconciler = AlignmentReconciler::new(ReconcileConfig::default()).unwrap();
        let mut assembler = MatePairAssembler::new(reconciler, false);
        assert!(assembler.push(rec("a", MateRole::Second, Some("4"))).unwrap().is_none());
        let pair = assembler.push(rec("a", MateRole::First, Some("1T2"))).unwrap().unwrap();
        assert_eq!(pair.read_id, "a");
        assert_eq!(pair.mate(MateRole::First).unwrap().aligned_reference, b".T..");
        assert_eq!(pair.mate(MateRole::Second).unwrap().aligned_reference, b"....");
        assert!(!pair.is_orphan());
        assert!(assembler.finish().unwrap().is_none());
    }

    #[test]
    fn assembler_surfaces_reconcile_errors() {
        let reconciler = AlignmentReconciler::new(ReconcileConfig::default()).unwrap();
        let mut assembler = MatePairAssembler::new(reconciler, false);
        assembler.push(rec("a", MateRole::First, Some("3"))).unwrap();
        let err = assembler.finish().unwrap_err();
        assert!(format!("{err}").contains("read 'a'"));
    }
}
