//! Tab-separated row sink, plain or gzip-compressed.

use crate::pairing::AlignmentPair;
use crate::reconcile::AlignmentRecord;
use crate::record::MateRole;
use anyhow::{Context, Result};
use flate2::Compression;
use flate2::write::GzEncoder;
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::Path;

/// Separator between entries of one split bucket.
pub const SPLIT_SEPARATOR: u8 = b',';

/// Column suffixes of one mate block, in output order.
pub const MATE_COLUMNS: [&str; 12] = [
    "aligned_query",
    "aligned_reference",
    "aligned_quality",
    "softclip_query",
    "softclip_quality",
    "insertion_query",
    "insertion_quality",
    "match_query",
    "match_quality",
    "mismatch_query",
    "mismatch_reference",
    "mismatch_quality",
];

const PAIRED_ROLES: &[MateRole] = &[MateRole::First, MateRole::Second];
const SINGLE_ROLES: &[MateRole] = &[MateRole::First];

enum Sink<W: Write> {
    Plain(BufWriter<W>),
    Gzip(GzEncoder<BufWriter<W>>),
}

impl<W: Write> Sink<W> {
    fn write_all(&mut self, buf: &[u8]) -> io::Result<()> {
        match self {
            Sink::Plain(w) => w.write_all(buf),
            Sink::Gzip(w) => w.write_all(buf),
        }
    }
}

pub struct RowWriter<W: Write> {
    sink: Sink<W>,
    roles: &'static [MateRole],
    line: Vec<u8>,
}

impl<W: Write> RowWriter<W> {
    pub fn new(inner: W, compress: bool, single_end: bool) -> Self {
        let buf = BufWriter::new(inner);
        let sink = if compress {
            Sink::Gzip(GzEncoder::new(buf, Compression::default()))
        } else {
            Sink::Plain(buf)
        };
        let roles = if single_end { SINGLE_ROLES } else { PAIRED_ROLES };
        Self { sink, roles, line: Vec::new() }
    }

    pub fn write_header(&mut self) -> io::Result<()> {
        self.line.clear();
        self.line.extend_from_slice(b"read_id");
        for role in self.roles {
            for column in MATE_COLUMNS {
                self.line.push(b'\t');
                self.line.extend_from_slice(format!("{role}_{column}").as_bytes());
            }
        }
        self.line.push(b'\n');
        self.sink.write_all(&self.line)
    }

    pub fn write_pair(&mut self, pair: &AlignmentPair) -> io::Result<()> {
        self.line.clear();
        self.line.extend_from_slice(pair.read_id.as_bytes());
        for &role in self.roles {
            match pair.mate(role) {
                Some(mate) => push_mate_block(&mut self.line, mate),
                None => self.line.extend(std::iter::repeat_n(b'\t', MATE_COLUMNS.len())),
            }
        }
        self.line.push(b'\n');
        self.sink.write_all(&self.line)
    }

    /// Flush everything, close the gzip stream and hand back the inner writer.
    pub fn finish(self) -> io::Result<W> {
        let buf = match self.sink {
            Sink::Plain(w) => w,
            Sink::Gzip(w) => w.finish()?,
        };
        let mut inner = buf.into_inner().map_err(|e| e.into_error())?;
        inner.flush()?;
        Ok(inner)
    }
}

fn push_mate_block(line: &mut Vec<u8>, mate: &AlignmentRecord) {
    let field = |line: &mut Vec<u8>, bytes: &[u8]| {
        line.push(b'\t');
        line.extend_from_slice(bytes);
    };
    let joined = |line: &mut Vec<u8>, entries: &[Vec<u8>]| {
        line.push(b'\t');
        for (i, entry) in entries.iter().enumerate() {
            if i > 0 {
                line.push(SPLIT_SEPARATOR);
            }
            line.extend_from_slice(entry);
        }
    };

    field(line, &mate.aligned_query);
    field(line, &mate.aligned_reference);
    field(line, &mate.aligned_quality);
    joined(line, &mate.softclip.query);
    joined(line, &mate.softclip.quality);
    joined(line, &mate.insertion.query);
    joined(line, &mate.insertion.quality);
    joined(line, &mate.matched.query);
    joined(line, &mate.matched.quality);
    joined(line, &mate.mismatch.query);
    joined(line, &mate.mismatch_reference);
    joined(line, &mate.mismatch.quality);
}

/// Open the row sink: `None` or `-` is stdout; a `.gz` suffix or `force_gzip` compresses.
pub fn create(
    path: Option<&Path>,
    force_gzip: bool,
    single_end: bool,
) -> Result<RowWriter<Box<dyn Write + Send>>> {
    match path {
        Some(path) if path.as_os_str() != "-" => {
            let file = File::create(path)
                .with_context(|| format!("Failed to create {}", path.display()))?;
            let gzip = force_gzip || path.extension().is_some_and(|ext| ext == "gz");
            Ok(RowWriter::new(Box::new(file), gzip, single_end))
        }
        _ => Ok(RowWriter::new(Box::new(io::stdout()), force_gzip, single_end)),
    }
}
