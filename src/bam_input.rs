use crate::cigar::CigarOp;
use crate::record::{MateRole, ReadRecord};
use anyhow::{Context, Result, anyhow};
use noodles::bam;
use noodles::sam::alignment::record::data::field::{Tag, Value};
use std::fmt::Write as _;
use std::io::Read;
use std::path::Path;

const PHRED_OFFSET: u8 = 33;
const MISSING_QUALITY: u8 = 0xff;

#[derive(Debug, Default, Clone, Copy)]
pub struct SourceStats {
    pub total: u64,
    pub unmapped: u64,
    pub secondary: u64,
    pub supplementary: u64,
}

/// Primary, mapped alignments from a BAM file, in file order.
pub struct BamInput<R> {
    reader: bam::io::Reader<R>,
    ref_names: Vec<String>,
    record: bam::Record,
    stats: SourceStats,
}

pub fn open_bam(path: &Path) -> Result<BamInput<impl Read>> {
    let mut reader = bam::io::reader::Builder
        .build_from_path(path)
        .with_context(|| format!("failed to open BAM {}", path.display()))?;
    let header = reader.read_header()?;
    let ref_names = header
        .reference_sequences()
        .keys()
        .map(|name| name.to_string())
        .collect();
    Ok(BamInput { reader, ref_names, record: bam::Record::default(), stats: SourceStats::default() })
}

impl<R: Read> BamInput<R> {
    pub fn stats(&self) -> SourceStats {
        self.stats
    }

    pub fn next_record(&mut self) -> Result<Option<ReadRecord>> {
        loop {
            if self.reader.read_record(&mut self.record)? == 0 {
                return Ok(None);
            }
            self.stats.total += 1;

            let flags = self.record.flags();
            if flags.is_unmapped() {
                self.stats.unmapped += 1;
                continue;
            }
            if flags.is_secondary() {
                self.stats.secondary += 1;
                continue;
            }
            if flags.is_supplementary() {
                self.stats.supplementary += 1;
                continue;
            }

            return extract_record(&self.record, &self.ref_names, self.stats.total).map(Some);
        }
    }
}

impl<R: Read> Iterator for BamInput<R> {
    type Item = Result<ReadRecord>;

    fn next(&mut self) -> Option<Self::Item> {
        self.next_record().transpose()
    }
}

/// Nameless records get a unique id so they never pair with a neighbour.
fn read_id_or_placeholder(name: Option<String>, ordinal: u64) -> String {
    name.unwrap_or_else(|| {
        tracing::warn!(record = ordinal, "record has no read name; emitting it unpaired");
        format!("*unnamed-{ordinal}")
    })
}

fn extract_record(record: &bam::Record, ref_names: &[String], ordinal: u64) -> Result<ReadRecord> {
    let read_id = read_id_or_placeholder(record.name().map(|n| n.to_string()), ordinal);
    let flags = record.flags();
    let role = if flags.is_last_segment() && !flags.is_first_segment() {
        MateRole::Second
    } else {
        MateRole::First
    };

    let chrom = match record.reference_sequence_id() {
        Some(Ok(id)) => ref_names
            .get(id)
            .cloned()
            .ok_or_else(|| anyhow!("read {read_id}: reference id {id} not in header"))?,
        Some(Err(e)) => return Err(e.into()),
        None => return Err(anyhow!("read {read_id}: mapped record without reference")),
    };
    let position = record
        .alignment_start()
        .transpose()?
        .map(|pos| pos.get() as u64)
        .ok_or_else(|| anyhow!("read {read_id}: mapped record without position"))?;

    let mut cigar = String::new();
    for result in record.cigar().iter() {
        let op = result?;
        write!(cigar, "{}{}", op.len(), CigarOp::from(op.kind()).code())?;
    }

    let sequence: Vec<u8> = record.sequence().iter().collect();
    let scores: Vec<u8> = record.quality_scores().iter().collect();
    let quality = if scores.iter().all(|&q| q == MISSING_QUALITY) {
        Vec::new()
    } else {
        scores.iter().map(|q| q.saturating_add(PHRED_OFFSET)).collect()
    };

    let md = get_string_tag(record, Tag::new(b'M', b'D'));

    Ok(ReadRecord { read_id, role, chrom, position, cigar, sequence, quality, md })
}

fn get_string_tag(record: &bam::Record, tag: Tag) -> Option<String> {
    let data = record.data();
    let value = data.get(&tag)?;
    match value.ok()? {
        Value::String(s) => Some(s.to_string()),
        _ => None,
    }
}

/// Load every record and stably sort by read name so mates become adjacent.
pub fn name_sorted<I>(records: I) -> Result<Vec<ReadRecord>>
where
    I: IntoIterator<Item = Result<ReadRecord>>,
{
    let mut all = records.into_iter().collect::<Result<Vec<_>>>()?;
    all.sort_by(|a, b| a.read_id.cmp(&b.read_id));
    tracing::info!(records = all.len(), "sorted input by read name");
    Ok(all)
}
