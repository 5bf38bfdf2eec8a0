//! The document generation pipeline
//!
//! One job runs through a fixed sequence:
//! Validating -> Warming -> Rendering -> Completed | Failed.
//!
//! The warm phase batch-fills the QR cache with bounded concurrency and
//! reports progress 0-40. The render phase streams pages in order and
//! reports 40-99; only the route marks 100 once the whole document has been
//! handed to the transport. Any failure aborts the job: a sheet with a
//! missing code is incorrect output, so numbers are never skipped.

use std::io::{self, BufWriter, Write};
use std::path::Path;

use bytes::Bytes;
use tokio::sync::mpsc;

use crate::error::{AppError, Result};
use crate::numbers::NumberSet;
use crate::progress::ProgressTracker;
use crate::qr::QrCache;

use super::layout;
use super::writer::{DocWriter, QrBitmap, Record};

/// Concurrency ceiling for the warm phase: all QR generations within a batch
/// run at once, batches run sequentially.
pub const WARM_BATCH_SIZE: usize = 15;

/// Transient pairing of a resolved number set with an optional progress id.
/// Lives for one request; never persisted or reused.
#[derive(Debug, Clone)]
pub struct RenderJob {
    pub numbers: NumberSet,
    pub request_id: Option<String>,
    pub filename: String,
}

impl RenderJob {
    pub fn new(numbers: NumberSet, request_id: Option<String>, filename_prefix: &str) -> Self {
        let filename = numbers.suggested_filename(filename_prefix);
        RenderJob {
            numbers,
            request_id,
            filename,
        }
    }

    fn report(&self, tracker: &ProgressTracker, pct: u8) {
        if let Some(id) = &self.request_id {
            tracker.set(id, pct);
        }
    }
}

/// Warm phase: ensure every QR artifact exists on disk before rendering.
///
/// Generation is blocking (encoding + file I/O), so each batch member runs
/// on `spawn_blocking`; the batch is awaited as a whole before the next one
/// starts, which caps concurrent filesystem writes at `WARM_BATCH_SIZE`.
pub async fn warm_cache(job: &RenderJob, cache: &QrCache, tracker: &ProgressTracker) -> Result<()> {
    let total = job.numbers.len();
    let mut done = 0usize;

    for batch in job.numbers.values().chunks(WARM_BATCH_SIZE) {
        let handles: Vec<_> = batch
            .iter()
            .map(|&number| {
                let cache = cache.clone();
                tokio::task::spawn_blocking(move || cache.ensure(number))
            })
            .collect();

        let results = futures::future::try_join_all(handles)
            .await
            .map_err(|e| AppError::Internal(format!("QR warm task panicked: {}", e)))?;
        for result in results {
            result?;
        }

        done += batch.len();
        job.report(tracker, warm_progress(done, total));
    }
    Ok(())
}

/// Warm-phase progress: 0 -> 40 across the whole set.
fn warm_progress(done: usize, total: usize) -> u8 {
    (40 * done / total) as u8
}

/// Render-phase progress: 40 -> 99 per record. Completion (100) is written
/// only by the route once the document has been fully handed over.
fn render_progress(done: usize, total: usize) -> u8 {
    (40 + 59 * done / total) as u8
}

/// Render phase: stream the paginated document into `out`.
///
/// Two consecutive numbers share a page (one per half), so the page count is
/// `ceil(n / 2)`. Blocking; callers run it on `spawn_blocking`. Progress
/// moves 40 -> 99 per record; the first failed write aborts the job so a
/// disconnected peer stops page production promptly.
pub fn render_document<W: Write>(
    out: W,
    job: &RenderJob,
    cache: &QrCache,
    tracker: &ProgressTracker,
    caption: &str,
) -> Result<()> {
    let total = job.numbers.len();
    let mut doc = DocWriter::new(BufWriter::new(out), caption).map_err(AppError::stream_write)?;
    let mut done = 0usize;

    for pair in job.numbers.values().chunks(layout::RECORDS_PER_PAGE) {
        let records = pair
            .iter()
            .map(|&number| {
                Ok(Record {
                    label: layout::format_label(number),
                    qr: load_bitmap(&cache.path_for(number))?,
                })
            })
            .collect::<Result<Vec<_>>>()?;

        doc.write_page(&records).map_err(AppError::stream_write)?;
        for _ in pair {
            done += 1;
            job.report(tracker, render_progress(done, total));
        }
    }

    let pages = doc.page_count();
    doc.finish().map_err(AppError::stream_write)?;
    tracing::debug!("rendered {} records across {} pages", total, pages);
    Ok(())
}

/// Read a cached QR PNG back and pack it for embedding.
fn load_bitmap(path: &Path) -> Result<QrBitmap> {
    let img = image::open(path)?;
    Ok(QrBitmap::from_luma(&img.to_luma8()))
}

/// `io::Write` adapter feeding an mpsc channel consumed by the HTTP body
/// stream. Must only be used from a blocking task: `blocking_send` panics on
/// a runtime thread.
pub struct ChannelWriter {
    tx: mpsc::Sender<Bytes>,
}

impl ChannelWriter {
    pub fn new(tx: mpsc::Sender<Bytes>) -> Self {
        ChannelWriter { tx }
    }
}

impl Write for ChannelWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.tx
            .blocking_send(Bytes::copy_from_slice(buf))
            .map_err(|_| {
                io::Error::new(io::ErrorKind::BrokenPipe, "response stream closed by peer")
            })?;
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}
