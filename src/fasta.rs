use crate::errors::{ReconcileError, Result as ReconcileResult};
use crate::reference::ReferenceLookup;
use crate::types::{HashMap, HashMapExt};
use anyhow::Result;
use needletail::parse_fastx_file;
use std::path::Path;

/// Whole-genome FASTA held in memory, keyed by the first word of each header.
#[derive(Debug, Default)]
pub struct FastaDb {
    seqs: HashMap<String, Vec<u8>>,
}

impl FastaDb {
    pub fn load(path: &Path) -> Result<Self> {
        let mut reader = parse_fastx_file(path)
            .map_err(|e| anyhow::anyhow!("failed to open FASTA {}: {}", path.display(), e))?;
        let mut seqs: HashMap<String, Vec<u8>> = HashMap::new();

        while let Some(result) = reader.next() {
            let record = result
                .map_err(|e| anyhow::anyhow!("failed to parse FASTA record: {}", e))?;
            let id = String::from_utf8_lossy(record.id());
            let name = id.split_whitespace().next().unwrap_or("").to_string();
            seqs.insert(name, record.seq().to_vec());
        }

        tracing::debug!(sequences = seqs.len(), path = %path.display(), "loaded reference FASTA");
        Ok(Self { seqs })
    }

    pub fn from_sequences<I, S>(seqs: I) -> Self
    where
        I: IntoIterator<Item = (S, Vec<u8>)>,
        S: Into<String>,
    {
        let mut map = HashMap::new();
        for (name, seq) in seqs {
            map.insert(name.into(), seq);
        }
        Self { seqs: map }
    }

    /// Upper-cased bases of `[start, end]`, 1-based inclusive.
    pub fn get_slice(&self, seqname: &str, start: u64, end: u64) -> Option<Vec<u8>> {
        let seq = self.seqs.get(seqname)?;
        if start == 0 || end < start {
            return None;
        }
        let s = (start - 1) as usize;
        let e = end as usize;
        if e <= seq.len() {
            let mut out = seq[s..e].to_vec();
            out.make_ascii_uppercase();
            Some(out)
        } else {
            None
        }
    }
}

impl ReferenceLookup for FastaDb {
    fn fetch(&self, chrom: &str, start: u64, end: u64) -> ReconcileResult<Vec<u8>> {
        self.get_slice(chrom, start, end).ok_or_else(|| {
            let reason = match self.seqs.get(chrom) {
                None => "sequence not in FASTA".to_string(),
                Some(seq) => format!("interval outside sequence of length {}", seq.len()),
            };
            ReconcileError::LookupFailed { chrom: chrom.to_string(), start, end, reason }
        })
    }
}
