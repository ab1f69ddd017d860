use std::fmt;

/// Which read of a paired-end fragment a record is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum MateRole {
    First,
    Second,
}

impl MateRole {
    /// 1 or 2, as used in column names.
    pub fn number(self) -> u8 {
        match self {
            Self::First => 1,
            Self::Second => 2,
        }
    }
}

impl fmt::Display for MateRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "r{}", self.number())
    }
}

/// One primary alignment as handed over by a record source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReadRecord {
    pub read_id: String,
    pub role: MateRole,
    pub chrom: String,
    /// 1-based leftmost reference position.
    pub position: u64,
    pub cigar: String,
    /// ASCII bases.
    pub sequence: Vec<u8>,
    /// Phred+33 ASCII quality string, same length as `sequence`.
    pub quality: Vec<u8>,
    pub md: Option<String>,
}

impl ReadRecord {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        read_id: impl Into<String>,
        role: MateRole,
        chrom: impl Into<String>,
        position: u64,
        cigar: impl Into<String>,
        sequence: impl Into<Vec<u8>>,
        quality: impl Into<Vec<u8>>,
        md: Option<&str>,
    ) -> Self {
        Self {
            read_id: read_id.into(),
            role,
            chrom: chrom.into(),
            position,
            cigar: cigar.into(),
            sequence: sequence.into(),
            quality: quality.into(),
            md: md.map(str::to_string),
        }
    }
}
