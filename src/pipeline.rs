use crate::errors;
use crate::output::RowWriter;
use crate::pairing::{AlignmentPair, MateGroup, MateGrouper, reconcile_group};
use crate::reconcile::AlignmentReconciler;
use crate::record::ReadRecord;
use anyhow::Result;
use crossfire::mpmc;
use std::collections::BTreeMap;
use std::io::Write;
use std::thread;

#[derive(Debug, Clone, Copy, Default)]
pub struct PipelineOptions {
    pub single_end: bool,
    /// Drop reads that fail reconciliation instead of aborting.
    pub skip_invalid: bool,
    pub threads: usize,
}

#[derive(Debug, Default)]
pub struct Stats {
    pub records: u64,
    pub missing_md: u64,
    pub pairs: u64,
    pub orphans: u64,
    pub singles: u64,
    pub rows: u64,
    pub invalid_skipped: u64,
}

struct WorkItem {
    idx: usize,
    group: MateGroup,
}

struct ResultItem {
    idx: usize,
    result: errors::Result<AlignmentPair>,
}

/// Group, reconcile and write every record; rows come out in input order.
pub fn run<I, W>(
    records: I,
    reconciler: &AlignmentReconciler<'_>,
    writer: &mut RowWriter<W>,
    options: &PipelineOptions,
) -> Result<Stats>
where
    I: IntoIterator<Item = Result<ReadRecord>>,
    W: Write,
{
    writer.write_header()?;

    let mut stats = Stats::default();
    let mut grouper = MateGrouper::new(options.single_end);

    if options.threads > 1 {
        crossfire::detect_backoff_cfg();
        let worker_count = options.threads;
        let cap = worker_count.saturating_mul(4).max(8);
        let (tx_work, rx_work) = mpmc::bounded_blocking::<WorkItem>(cap);
        let (tx_res, rx_res) = mpmc::unbounded_blocking::<ResultItem>();

        let mut total_groups: usize = 0;

        thread::scope(|scope| -> Result<()> {
            for _ in 0..worker_count {
                let rx_work = rx_work.clone();
                let tx_res = tx_res.clone();
                scope.spawn(move || {
                    while let Ok(item) = rx_work.recv() {
                        let result = reconcile_group(reconciler, &item.group);
                        let _ = tx_res.send(ResultItem { idx: item.idx, result });
                    }
                });
            }
            drop(tx_res);

            for result in records {
                if let Some(group) = grouper.push(result?) {
                    tx_work.send(WorkItem { idx: total_groups, group })?;
                    total_groups += 1;
                }
            }
            if let Some(group) = grouper.finish() {
                tx_work.send(WorkItem { idx: total_groups, group })?;
                total_groups += 1;
            }

            drop(tx_work);

            let mut pending: BTreeMap<usize, errors::Result<AlignmentPair>> = BTreeMap::new();
            let mut next_idx = 0usize;

            while next_idx < total_groups {
                let res = rx_res
                    .recv()
                    .map_err(|_| anyhow::anyhow!("worker result channel closed"))?;
                pending.insert(res.idx, res.result);
                while let Some(result) = pending.remove(&next_idx) {
                    emit(result, writer, options, &mut stats)?;
                    next_idx += 1;
                }
            }

            Ok(())
        })?;
    } else {
        for result in records {
            if let Some(group) = grouper.push(result?) {
                emit(reconcile_group(reconciler, &group), writer, options, &mut stats)?;
            }
        }
        if let Some(group) = grouper.finish() {
            emit(reconcile_group(reconciler, &group), writer, options, &mut stats)?;
        }
    }

    let group_stats = grouper.stats();
    stats.records = group_stats.records;
    stats.missing_md = group_stats.missing_md;
    stats.pairs = group_stats.pairs;
    stats.orphans = group_stats.orphans;
    stats.singles = group_stats.singles;
    Ok(stats)
}

fn emit<W: Write>(
    result: errors::Result<AlignmentPair>,
    writer: &mut RowWriter<W>,
    options: &PipelineOptions,
    stats: &mut Stats,
) -> Result<()> {
    match result {
        Ok(pair) => {
            writer.write_pair(&pair)?;
            stats.rows += 1;
        }
        Err(e) if options.skip_invalid => {
            tracing::warn!(error = %e, "skipping read");
            stats.invalid_skipped += 1;
        }
        Err(e) => return Err(anyhow::Error::new(e).context("alignment reconciliation failed")),
    }
    Ok(())
}
