//! Scan Engine: orchestrates region enumeration and chunked reads, emitting
//! matching addresses lazily through the `Iterator` trait so a caller can
//! stop consuming at any point without the engine having buffered results
//! it will never need.

use crate::error::Result;
use crate::kmp;
use crate::predicate::{ScanPredicate, scan_chunk};
use crate::process::{MemoryRegion, MemoryRegionIterator, ProcessHandle, SystemInfo};
use crate::reader::{ChunkPlan, DEFAULT_CHUNK_CAP, read_chunk};
use crate::value::LogicalType;

/// Tunable knobs for a single scan pass.
#[derive(Debug, Clone)]
pub struct ScanConfig {
    pub logical_type: LogicalType,
    pub value_length: u8,
    pub writable_only: bool,
    pub chunk_cap: usize,
    /// Whether `ScanCursor` should compute a `ProgressInfo` for every
    /// emitted hit (§6 progress-info record). When false, `ScanHit::progress`
    /// is always `None` and the one-time region tally is skipped.
    pub progress: bool,
}

impl ScanConfig {
    pub fn new(logical_type: LogicalType, value_length: u8) -> Self {
        Self {
            logical_type,
            value_length,
            writable_only: false,
            chunk_cap: DEFAULT_CHUNK_CAP,
            progress: false,
        }
    }

    pub fn writable_only(mut self, yes: bool) -> Self {
        self.writable_only = yes;
        self
    }

    pub fn progress(mut self, yes: bool) -> Self {
        self.progress = yes;
        self
    }

    pub fn chunk_cap(mut self, cap: usize) -> Self {
        self.chunk_cap = cap;
        self
    }
}

/// Progress counters updated as the scan proceeds; read via
/// `ScanCursor::progress` to report to a caller without blocking the scan.
#[derive(Debug, Clone, Default)]
pub struct ScanProgress {
    pub regions_scanned: usize,
    pub bytes_scanned: u64,
    pub matches_found: u64,
    pub total_bytes_readable: u64,
}

/// `{ memory_total, progress }` as specified in §6: attached to a scan hit
/// only when the caller opted into progress reporting.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ProgressInfo {
    pub memory_total: u64,
    pub progress: f64,
}

/// One emitted scan match: its address, plus a progress snapshot when the
/// scan was configured to report one.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScanHit {
    pub address: usize,
    pub progress: Option<ProgressInfo>,
}

/// A lazy, pull-driven iterator over scan matches. Holds one region's
/// pending chunk plan and one chunk buffer at a time; nothing beyond that is
/// materialized regardless of how many regions or matches exist.
///
/// Phase 1 (§4.6): region enumeration is consumed eagerly into `regions` at
/// construction time so `total_bytes_readable` is known before any chunk is
/// read — computing a progress fraction requires the denominator up front.
/// Phase 2 streams region-by-region from that already-tallied vector.
pub struct ScanCursor<'a> {
    proc: &'a ProcessHandle,
    regions: std::vec::IntoIter<MemoryRegion>,
    predicate: ScanPredicate,
    config: ScanConfig,
    progress: ScanProgress,
    current_plan: Option<ChunkPlan>,
    chunk_buf: Vec<u8>,
    pending_hits: std::vec::IntoIter<usize>,
    pending_base: usize,
}

impl<'a> ScanCursor<'a> {
    pub fn new(
        proc: &'a ProcessHandle,
        sys: &SystemInfo,
        config: ScanConfig,
        predicate: ScanPredicate,
    ) -> Self {
        let regions: Vec<MemoryRegion> =
            MemoryRegionIterator::new(proc, sys).writable_only(config.writable_only).collect();
        let total_bytes_readable = regions.iter().map(|r| r.size as u64).sum();
        Self {
            proc,
            regions: regions.into_iter(),
            predicate,
            config,
            progress: ScanProgress {
                total_bytes_readable,
                ..ScanProgress::default()
            },
            current_plan: None,
            chunk_buf: Vec::new(),
            pending_hits: Vec::new().into_iter(),
            pending_base: 0,
        }
    }

    pub fn progress(&self) -> &ScanProgress {
        &self.progress
    }

    fn progress_info(&self) -> Option<ProgressInfo> {
        if !self.config.progress {
            return None;
        }
        let fraction = if self.progress.total_bytes_readable == 0 {
            1.0
        } else {
            (self.progress.bytes_scanned as f64 / self.progress.total_bytes_readable as f64).min(1.0)
        };
        Some(ProgressInfo {
            memory_total: self.progress.total_bytes_readable,
            progress: fraction,
        })
    }

    fn advance_to_next_region(&mut self) -> bool {
        let Some(region) = self.regions.next() else {
            return false;
        };
        self.progress.regions_scanned += 1;

        let resolved_len =
            crate::value::resolved_length(self.config.logical_type, self.config.value_length);
        let overlap = (resolved_len as usize).saturating_sub(1);
        self.current_plan = Some(ChunkPlan::new(
            region.base_address,
            region.size,
            self.config.chunk_cap,
            overlap,
        ));
        true
    }

    /// Pull and evaluate the next chunk in the current region's plan,
    /// reading it from the target process on demand. Returns `Ok(true)` once
    /// it has staged at least one hit in `pending_hits`.
    fn next_chunk_hits(&mut self) -> Result<bool> {
        loop {
            let Some(plan) = self.current_plan.as_mut() else {
                return Ok(false);
            };
            let Some(chunk) = plan.next() else {
                self.current_plan = None;
                return Ok(false);
            };

            read_chunk(self.proc, &chunk, &mut self.chunk_buf);
            // Only the fresh bytes count toward progress; `chunk_buf`'s
            // leading `fresh_from` bytes are the overlap already tallied
            // when the previous chunk was scanned (§4.6 step 6).
            self.progress.bytes_scanned += self.chunk_buf.len().saturating_sub(chunk.fresh_from) as u64;

            if self.chunk_buf.len() <= chunk.fresh_from {
                // The short read didn't even cover the overlap carried from
                // the previous chunk; nothing new to scan here.
                continue;
            }

            let length = crate::value::resolved_length(self.config.logical_type, self.config.value_length)
                as usize;
            let hits: Vec<usize> = match &self.predicate {
                ScanPredicate::Equal(pattern) => kmp::search_all(&self.chunk_buf[chunk.fresh_from..], pattern)
                    .into_iter()
                    .map(|o| o + chunk.fresh_from)
                    .collect(),
                ScanPredicate::NotEqual(pattern) => kmp::search_all_gaps(&self.chunk_buf, pattern)
                    .into_iter()
                    .filter(|&o| o >= chunk.fresh_from)
                    .collect(),
                _ => scan_chunk(
                    &self.chunk_buf,
                    length,
                    self.config.logical_type,
                    &self.predicate,
                    chunk.fresh_from,
                )?,
            };

            if !hits.is_empty() {
                self.progress.matches_found += hits.len() as u64;
                self.pending_base = chunk.addr;
                self.pending_hits = hits.into_iter();
                return Ok(true);
            }
        }
    }
}

impl<'a> Iterator for ScanCursor<'a> {
    type Item = Result<ScanHit>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some(offset) = self.pending_hits.next() {
                let address = self.pending_base + offset;
                return Some(Ok(ScanHit {
                    address,
                    progress: self.progress_info(),
                }));
            }

            match self.next_chunk_hits() {
                Ok(true) => continue,
                Ok(false) => {
                    if self.advance_to_next_region() {
                        continue;
                    }
                    return None;
                }
                Err(e) => return Some(Err(e)),
            }
        }
    }
}
