//! Recorded update captures.
//!
//! A capture is a JSON-lines file, one reflected update per line with its
//! wall-clock receive time. Replaying a capture rebuilds the receive
//! timeline on a virtual clock and runs the verifier over it.

use crate::context::SimContext;
use crate::error::SimError;
use crate::feed::{ScheduledFeed, ScheduledUpdate};
use crate::runner::{ingest, IngestStats};
use reckon_core::{
    DeadReckoningVerifier, Diagnostics, EvaluationOutcome, RunError, TestParams, Verdict,
};
use reckon_env::{AttributeUpdate, ObjectId};
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::Path;
use std::sync::Arc;
use std::time::{Duration, UNIX_EPOCH};

/// One captured update.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CaptureRecord {
    pub object: ObjectId,
    pub payload: Vec<u8>,
    pub tag: Vec<u8>,

    /// Receive time in microseconds since the Unix epoch
    pub received_micros: u64,
}

impl CaptureRecord {
    pub fn new(update: &AttributeUpdate, received_micros: u64) -> Self {
        Self {
            object: update.object.clone(),
            payload: update.payload.clone(),
            tag: update.tag.clone(),
            received_micros,
        }
    }

    pub fn to_update(&self) -> AttributeUpdate {
        AttributeUpdate::new(self.object.clone(), self.payload.clone(), self.tag.clone())
    }
}

/// Reads records, skipping blank lines.
pub fn read_capture(reader: impl BufRead) -> Result<Vec<CaptureRecord>, SimError> {
    let mut records = Vec::new();
    for (index, line) in reader.lines().enumerate() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        let record = serde_json::from_str(&line).map_err(|source| SimError::CaptureParse {
            line: index + 1,
            source,
        })?;
        records.push(record);
    }
    Ok(records)
}

pub fn write_capture(mut writer: impl Write, records: &[CaptureRecord]) -> Result<(), SimError> {
    for record in records {
        serde_json::to_writer(&mut writer, record)?;
        writer.write_all(b"\n")?;
    }
    writer.flush()?;
    Ok(())
}

pub fn load_capture(path: impl AsRef<Path>) -> Result<Vec<CaptureRecord>, SimError> {
    read_capture(BufReader::new(File::open(path)?))
}

pub fn save_capture(path: impl AsRef<Path>, records: &[CaptureRecord]) -> Result<(), SimError> {
    write_capture(BufWriter::new(File::create(path)?), records)
}

/// What a replay produced.
#[derive(Debug)]
pub struct ReplayReport {
    pub ingest: IngestStats,
    pub result: Result<EvaluationOutcome, RunError>,
}

impl ReplayReport {
    pub fn verdict(&self) -> Verdict {
        Verdict::from_result(&self.result)
    }
}

/// Runs the verifier over a capture.
///
/// Virtual time 0 is the earliest receive time, so the ingestion window
/// starts with the first captured update.
pub async fn replay<D: Diagnostics>(
    records: &[CaptureRecord],
    params: &TestParams,
    diagnostics: D,
) -> ReplayReport {
    let start = records.iter().map(|r| r.received_micros).min().unwrap_or(0);
    let ctx = SimContext::with_epoch(0, UNIX_EPOCH + Duration::from_micros(start));

    let schedule = records
        .iter()
        .map(|r| ScheduledUpdate {
            deliver_at: Duration::from_micros(r.received_micros - start),
            update: r.to_update(),
        })
        .collect();
    let feed = ScheduledFeed::from_schedule(ctx.clone(), schedule);

    let shared = Arc::new(ctx);
    let mut verifier = DeadReckoningVerifier::new(shared.clone(), params, diagnostics);
    let ingest = ingest(shared.as_ref(), &feed, &mut verifier, params.ingestion_window()).await;

    ReplayReport {
        ingest,
        result: verifier.run_evaluation(),
    }
}
