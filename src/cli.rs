use clap::Parser;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(
    name = "mdsplit-rs",
    about = "Reconcile CIGAR and MD tags into per-base query/reference tracks",
    version
)]
pub struct Args {
    /// Input BAM, grouped by read name (mates adjacent)
    pub in_bam: PathBuf,

    /// Output TSV path ("-" or absent for stdout; ".gz" suffix compresses)
    #[arg(short = 'o', long = "out", value_name = "TSV")]
    pub out: Option<PathBuf>,

    /// Gzip the output regardless of the file name
    #[arg(long)]
    pub gzip: bool,

    /// Treat every record as an unpaired first mate
    #[arg(long)]
    pub single_end: bool,

    /// Fill intron (N) operations with reference bases from --genome
    #[arg(long, requires = "genome_fasta")]
    pub splice: bool,

    /// Genome sequence FASTA
    #[arg(short = 'S', long = "genome", value_name = "FASTA")]
    pub genome_fasta: Option<PathBuf>,

    /// Sort records by read name in memory before pairing
    #[arg(long)]
    pub name_sort: bool,

    /// Log and drop reads that fail reconciliation instead of aborting
    #[arg(long)]
    pub skip_invalid: bool,

    /// Number of threads (CPUs) to use
    #[arg(short = 'p', long = "threads", default_value_t = 1)]
    pub threads: u8,

    /// Set logging level to WARN
    #[arg(short = 'q', long)]
    pub quiet: bool,
}
