mod cli;

use anyhow::Result;
use clap::Parser;
use mdsplit_rs::{
    AlignmentReconciler, FastaDb, ReconcileConfig, ReferenceLookup, bam_input, output, pipeline,
};
use mimalloc::MiMalloc;
use tracing_subscriber::EnvFilter;

#[global_allocator]
static GLOBAL: MiMalloc = MiMalloc;

fn main() -> Result<()> {
    let args = cli::Args::parse();

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        if args.quiet {
            EnvFilter::new("warn")
        } else {
            EnvFilter::new("info")
        }
    });
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let fasta = if let Some(path) = &args.genome_fasta {
        Some(FastaDb::load(path)?)
    } else {
        None
    };
    let config = ReconcileConfig {
        splice: args.splice,
        lookup: fasta.as_ref().map(|db| db as &dyn ReferenceLookup),
    };
    let reconciler = AlignmentReconciler::new(config)?;

    let mut writer = output::create(args.out.as_deref(), args.gzip, args.single_end)?;
    let options = pipeline::PipelineOptions {
        single_end: args.single_end,
        skip_invalid: args.skip_invalid,
        threads: usize::from(args.threads.max(1)),
    };

    let mut bam = bam_input::open_bam(&args.in_bam)?;
    let stats = if args.name_sort {
        let sorted = bam_input::name_sorted(&mut bam)?;
        pipeline::run(sorted.into_iter().map(Ok), &reconciler, &mut writer, &options)?
    } else {
        pipeline::run(&mut bam, &reconciler, &mut writer, &options)?
    };
    writer.finish()?;

    let source = bam.stats();
    tracing::info!(
        total_records = source.total,
        unmapped = source.unmapped,
        secondary = source.secondary,
        supplementary = source.supplementary,
        missing_md = stats.missing_md,
        pairs = stats.pairs,
        orphans = stats.orphans,
        single_end_rows = stats.singles,
        rows = stats.rows,
        invalid_skipped = stats.invalid_skipped,
        "mdsplit-rs: processing complete"
    );
    Ok(())
}
