//! Build orchestration.
//!
//! Three tiers run concurrently:
//!
//! 1. A walker thread discovers files and queues them without bound.
//! 2. One producer task per discovered file streams its lines into a single
//!    shared line channel. Tasks run on a reader thread pool, so the number of
//!    tasks is unbounded while the number of open files is not.
//! 3. A fixed pool of workers drains the line channel, tokenizes and calls
//!    into the dictionary.
//!
//! The line channel is unbuffered by default: a producer blocks until a worker
//! takes its line, which throttles reading to the speed of processing.
//!
//! Completion is a two-phase barrier. First every producer finishes and the
//! channel's senders are dropped, then every worker drains what is left and
//! exits.
//!
//! A build counts as cancelled only if some stage dropped work because of the
//! token. A cancel that lands after the last line was processed leaves a
//! complete build.
use crossbeam_channel::{bounded, Receiver, Sender};
use rayon::ThreadPoolBuilder;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, PoisonError};
use std::thread;
use std::time::Instant;
use tracing::{debug, info, trace, warn};

use super::{lock, Dictionary};
use crate::cancel::CancellationToken;
use crate::config::EncodingMode;
use crate::errors::{DictionaryError, DictionaryResult};
use crate::metrics::BuildMetrics;
use crate::report::{BuildReport, SkippedEntry};
use crate::source::{enumerate_file, enumerate_files, WalkOptions};
use crate::tokenizer::tokenize;

pub(super) fn run(
    dict: &Dictionary,
    root: &Path,
    cancel: &CancellationToken,
) -> DictionaryResult<BuildReport> {
    let config = dict.config();
    let started = Instant::now();
    let metrics = BuildMetrics::new();
    let skipped = Mutex::new(Vec::new());
    let interrupted = AtomicBool::new(false);

    let readers = ThreadPoolBuilder::new()
        .num_threads(config.reader_threads.get())
        .thread_name(|idx| format!("wordhoard-reader-{}", idx))
        .build()
        .map_err(|e| DictionaryError::ThreadPool(e.to_string()))?;

    let files = enumerate_files(root, WalkOptions::from_config(config), cancel.clone())?;
    let (line_tx, line_rx) = bounded::<String>(config.line_channel_capacity);
    let encoding_mode = config.encoding_mode;
    let metrics_ref = &metrics;
    let skipped_ref = &skipped;
    let interrupted_ref = &interrupted;

    // Channel ends are moved in so an early return disconnects them and lets
    // every spawned thread exit before the scope joins it.
    thread::scope(move |s| -> DictionaryResult<()> {
        let mut files = files;

        let mut workers = Vec::with_capacity(config.worker_count.get());
        for idx in 0..config.worker_count.get() {
            let rx = line_rx.clone();
            let handle = thread::Builder::new()
                .name(format!("wordhoard-worker-{}", idx))
                .spawn_scoped(s, move || drain_lines(dict, rx, cancel))?;
            workers.push(handle);
        }
        drop(line_rx);
        debug!("Started {} workers", workers.len());

        readers.in_place_scope(|producers| {
            for item in files.by_ref() {
                match item {
                    Ok(path) => {
                        metrics_ref.record_discovery();
                        let tx = line_tx.clone();
                        producers.spawn(move |_| {
                            let outcome = produce_lines(
                                path,
                                tx,
                                encoding_mode,
                                metrics_ref,
                                skipped_ref,
                                cancel,
                            );
                            if outcome == Outcome::Stopped {
                                interrupted_ref.store(true, Ordering::Relaxed);
                            }
                        });
                    }
                    Err(err) => {
                        metrics_ref.record_traversal_error();
                        record_skip(skipped_ref, &err);
                    }
                }
            }
        });

        // Phase one: all producers are done, close the channel
        drop(line_tx);
        let walk_result = files.finish();

        // Phase two: workers drain the remaining lines and exit
        let mut panicked = 0;
        for handle in workers {
            match handle.join() {
                Ok(Outcome::Stopped) => interrupted_ref.store(true, Ordering::Relaxed),
                Ok(Outcome::Completed) => {}
                Err(_) => panicked += 1,
            }
        }
        if !walk_result? {
            interrupted_ref.store(true, Ordering::Relaxed);
        }
        if panicked > 0 {
            return Err(DictionaryError::WorkerPanicked(format!(
                "{} word workers",
                panicked
            )));
        }
        Ok(())
    })?;

    if interrupted.load(Ordering::Relaxed) {
        info!("Build of {} cancelled", root.display());
        return Err(DictionaryError::Cancelled);
    }

    metrics.log_stats();
    let stats = metrics.get_stats();
    let skipped = skipped.into_inner().unwrap_or_else(PoisonError::into_inner);

    Ok(BuildReport {
        files_discovered: stats.files_discovered,
        files_read: stats.files_read,
        lines_read: stats.lines_read,
        bytes_read: stats.bytes_read,
        total_words: dict.total_word_count(),
        unique_words: dict.unique_word_count(),
        skipped,
        elapsed: started.elapsed(),
    })
}

/// Whether a stage handled all of its input or dropped some of it
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Outcome {
    Completed,
    Stopped,
}

/// Streams one file into the line channel
fn produce_lines(
    path: PathBuf,
    tx: Sender<String>,
    encoding_mode: EncodingMode,
    metrics: &BuildMetrics,
    skipped: &Mutex<Vec<SkippedEntry>>,
    cancel: &CancellationToken,
) -> Outcome {
    let mut lines = match enumerate_file(&path, encoding_mode) {
        Ok(lines) => lines,
        Err(err) => {
            metrics.record_file_skipped(0);
            record_skip(skipped, &err);
            return Outcome::Completed;
        }
    };

    while let Some(line) = lines.next() {
        if cancel.is_cancelled() {
            return Outcome::Stopped;
        }
        match line {
            Ok(line) => {
                if tx.send(line).is_err() {
                    trace!("Line channel closed, abandoning {}", path.display());
                    return Outcome::Stopped;
                }
                metrics.record_line();
            }
            Err(err) => {
                metrics.record_file_skipped(lines.bytes_read());
                record_skip(skipped, &err);
                return Outcome::Completed;
            }
        }
    }

    metrics.record_file_read(lines.lines_read(), lines.bytes_read());
    Outcome::Completed
}

/// Worker loop: tokenizes lines until the channel closes
fn drain_lines(dict: &Dictionary, rx: Receiver<String>, cancel: &CancellationToken) -> Outcome {
    for line in rx.iter() {
        if cancel.is_cancelled() {
            return Outcome::Stopped;
        }
        for word in tokenize(&line) {
            dict.ingest(word);
        }
    }
    Outcome::Completed
}

fn record_skip(skipped: &Mutex<Vec<SkippedEntry>>, err: &DictionaryError) {
    warn!("Skipping: {}", err);
    lock(skipped).push(SkippedEntry::from(err));
}
