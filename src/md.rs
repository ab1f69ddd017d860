//! Pull-based decoder over an MD tag.
//!
//! The MD grammar is a sequence of tokens: a decimal match count, a single
//! mismatching reference base, or `^` followed by the deleted reference bases.
//! A `0` match count only separates adjacent mismatches (or a deletion from a
//! following mismatch) and is skipped.

use crate::errors::{ReconcileError, Result};

/// One decoded MD token.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MdRun<'a> {
    /// `len` consecutive positions where query equals reference.
    Match(usize),
    /// Exactly one mismatching reference base.
    Mismatch(u8),
    /// Reference bases absent from the query. May be empty when the tag
    /// records the deletion without its bases.
    Deletion(&'a [u8]),
}

/// What one call to [`MdCursor::consume`] handed back.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MdChunk {
    /// This many matching positions.
    Match(usize),
    /// One mismatching position and its reference base.
    Mismatch(u8),
}

impl MdChunk {
    pub fn width(self) -> usize {
        match self {
            Self::Match(n) => n,
            Self::Mismatch(_) => 1,
        }
    }
}

#[derive(Debug, Clone)]
pub struct MdCursor<'a> {
    text: &'a str,
    pos: usize,
    /// Matching positions left in the active match run.
    remaining: usize,
}

impl<'a> MdCursor<'a> {
    pub fn new(text: &'a str) -> Self {
        Self { text, pos: 0, remaining: 0 }
    }

    fn malformed(&self, reason: impl Into<String>) -> ReconcileError {
        ReconcileError::MalformedTag { md: self.text.to_string(), reason: reason.into() }
    }

    /// Decode the next run, skipping zero-length separators.
    pub fn next_run(&mut self) -> Result<MdRun<'a>> {
        let text: &'a str = self.text;
        let bytes = text.as_bytes();
        loop {
            let Some(&b) = bytes.get(self.pos) else {
                return Err(self.malformed("tag exhausted while more runs were expected"));
            };

            if b.is_ascii_digit() {
                let start = self.pos;
                while self.pos < bytes.len() && bytes[self.pos].is_ascii_digit() {
                    self.pos += 1;
                }
                let len: usize = text[start..self.pos]
                    .parse()
                    .map_err(|e| self.malformed(format!("bad match count: {e}")))?;
                if len == 0 {
                    continue;
                }
                return Ok(MdRun::Match(len));
            }

            if b == b'^' {
                self.pos += 1;
                let start = self.pos;
                while self.pos < bytes.len() && bytes[self.pos].is_ascii_alphabetic() {
                    self.pos += 1;
                }
                return Ok(MdRun::Deletion(&bytes[start..self.pos]));
            }

            if b.is_ascii_alphabetic() {
                self.pos += 1;
                return Ok(MdRun::Mismatch(b));
            }

            return Err(self.malformed(format!(
                "unexpected character '{}' at offset {}",
                b as char, self.pos
            )));
        }
    }

    /// Consume up to `n` aligned positions from the current run.
    ///
    /// Returns fewer than `n` when the current match run runs out; the caller
    /// re-invokes for the rest. A mismatch is always handed back whole.
    pub fn consume(&mut self, n: usize) -> Result<MdChunk> {
        if self.remaining == 0 {
            match self.next_run()? {
                MdRun::Match(len) => self.remaining = len,
                MdRun::Mismatch(base) => return Ok(MdChunk::Mismatch(base)),
                MdRun::Deletion(bases) => {
                    return Err(ReconcileError::Desynchronized {
                        reason: format!(
                            "MD deletion '^{}' where CIGAR expects {n} aligned bases",
                            String::from_utf8_lossy(bases)
                        ),
                    });
                }
            }
        }
        let taken = n.min(self.remaining);
        self.remaining -= taken;
        Ok(MdChunk::Match(taken))
    }

    /// Pop the next deletion run.
    ///
    /// Fails with `Desynchronized` if the current match run is only partly
    /// consumed, the next token is not a deletion, or the tag is used up.
    /// Undecodable text stays `MalformedTag`.
    pub fn take_deletion(&mut self) -> Result<&'a [u8]> {
        if self.remaining > 0 {
            return Err(ReconcileError::Desynchronized {
                reason: format!(
                    "deletion starts with {} matched bases of the current MD run undrained",
                    self.remaining
                ),
            });
        }
        match self.next_run() {
            Ok(MdRun::Deletion(bases)) => Ok(bases),
            Ok(other) => Err(ReconcileError::Desynchronized {
                reason: format!("CIGAR deletion has no MD deletion marker (found {other:?})"),
            }),
            Err(_) if self.pos >= self.text.len() => Err(ReconcileError::Desynchronized {
                reason: "CIGAR deletion after the MD tag was exhausted".to_string(),
            }),
            Err(e) => Err(e),
        }
    }

    /// Matching positions still owed by the active run.
    pub fn remaining_in_run(&self) -> usize {
        self.remaining
    }

    /// Undecoded tag text.
    pub fn rest(&self) -> &'a str {
        let text: &'a str = self.text;
        &text[self.pos..]
    }

    /// True when no run is active and only zero separators are left.
    pub fn is_drained(&self) -> bool {
        self.remaining == 0 && self.rest().bytes().all(|b| b == b'0')
    }
}
