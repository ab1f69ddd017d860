use crate::errors::{ReconcileError, Result};
use noodles::sam::alignment::record::cigar::op::Kind as CigarKind;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CigarOp {
    Match,
    Ins,
    Del,
    RefSkip,
    SoftClip,
    HardClip,
    Pad,
    Equal,
    Diff,
}

impl CigarOp {
    pub fn from_code(code: u8) -> Option<Self> {
        match code {
            b'M' => Some(Self::Match),
            b'I' => Some(Self::Ins),
            b'D' => Some(Self::Del),
            b'N' => Some(Self::RefSkip),
            b'S' => Some(Self::SoftClip),
            b'H' => Some(Self::HardClip),
            b'P' => Some(Self::Pad),
            b'=' => Some(Self::Equal),
            b'X' => Some(Self::Diff),
            _ => None,
        }
    }

    pub fn code(self) -> char {
        match self {
            Self::Match => 'M',
            Self::Ins => 'I',
            Self::Del => 'D',
            Self::RefSkip => 'N',
            Self::SoftClip => 'S',
            Self::HardClip => 'H',
            Self::Pad => 'P',
            Self::Equal => '=',
            Self::Diff => 'X',
        }
    }
}

impl From<CigarKind> for CigarOp {
    fn from(kind: CigarKind) -> Self {
        match kind {
            CigarKind::Match => Self::Match,
            CigarKind::Insertion => Self::Ins,
            CigarKind::Deletion => Self::Del,
            CigarKind::Skip => Self::RefSkip,
            CigarKind::SoftClip => Self::SoftClip,
            CigarKind::HardClip => Self::HardClip,
            CigarKind::Pad => Self::Pad,
            CigarKind::SequenceMatch => Self::Equal,
            CigarKind::SequenceMismatch => Self::Diff,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CigarOperation {
    pub len: usize,
    pub op: CigarOp,
}

impl fmt::Display for CigarOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.len, self.op.code())
    }
}

/// Decoder over CIGAR text, yielding `(length, op)` pairs left to right.
///
/// Only the syntax (a digit run followed by one opcode) is checked. `*` decodes
/// to an empty stream.
#[derive(Debug, Clone)]
pub struct CigarStream<'a> {
    text: &'a str,
    pos: usize,
}

impl<'a> CigarStream<'a> {
    pub fn new(text: &'a str) -> Self {
        let pos = if text == "*" { text.len() } else { 0 };
        Self { text, pos }
    }

    fn invalid(&self, reason: String) -> ReconcileError {
        ReconcileError::InvalidCigar { cigar: self.text.to_string(), reason }
    }
}

impl Iterator for CigarStream<'_> {
    type Item = Result<CigarOperation>;

    fn next(&mut self) -> Option<Self::Item> {
        let bytes = self.text.as_bytes();
        if self.pos >= bytes.len() {
            return None;
        }

        let digits_start = self.pos;
        while self.pos < bytes.len() && bytes[self.pos].is_ascii_digit() {
            self.pos += 1;
        }
        if self.pos == digits_start {
            let found = bytes[self.pos] as char;
            self.pos = bytes.len();
            return Some(Err(self.invalid(format!(
                "expected a length at offset {digits_start}, found '{found}'"
            ))));
        }
        let Some(&code) = bytes.get(self.pos) else {
            self.pos = bytes.len();
            return Some(Err(self.invalid("length without an operation at end".to_string())));
        };
        self.pos += 1;

        let Some(op) = CigarOp::from_code(code) else {
            self.pos = bytes.len();
            return Some(Err(self.invalid(format!("unknown operation '{}'", code as char))));
        };
        let len = match self.text[digits_start..self.pos - 1].parse::<usize>() {
            Ok(len) if len > 0 => len,
            Ok(_) => {
                self.pos = bytes.len();
                return Some(Err(self.invalid(format!("zero-length '{}' operation", op.code()))));
            }
            Err(e) => {
                self.pos = bytes.len();
                return Some(Err(self.invalid(e.to_string())));
            }
        };

        Some(Ok(CigarOperation { len, op }))
    }
}
