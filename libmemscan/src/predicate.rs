//! Predicate Scanner: evaluates inequality predicates (everything but
//! Equal/NotEqual, which go through the Substring Search instead) against
//! every byte offset in a chunk.
//!
//! Stride is always 1 byte: the scanner does not assume the target value is
//! naturally aligned, so it checks every offset and may over-report when a
//! real value happens to be aligned and a spurious decode at a neighboring
//! unaligned offset also satisfies the predicate. This is intentional —
//! narrowing with a second scan against known-good addresses discards those.

use crate::error::Result;
use crate::value::{LogicalType, NumericKey, numeric_key};

/// One of the eight inequality/equality relations a scan can narrow on.
/// `Equal`/`NotEqual` are included here for a uniform caller-facing type,
/// but the scan engine dispatches them to the Substring Search instead of
/// this module.
#[derive(Debug, Clone)]
pub enum ScanPredicate {
    Equal(Vec<u8>),
    NotEqual(Vec<u8>),
    Greater(NumericKey),
    Less(NumericKey),
    GreaterOrEqual(NumericKey),
    LessOrEqual(NumericKey),
    Between(NumericKey, NumericKey),
    NotBetween(NumericKey, NumericKey),
}

impl ScanPredicate {
    /// Whether this predicate is evaluated via the byte-pattern Substring
    /// Search rather than the per-offset Predicate Scanner.
    pub fn is_exact_match(&self) -> bool {
        matches!(self, ScanPredicate::Equal(_) | ScanPredicate::NotEqual(_))
    }
}

/// Evaluate an inequality predicate against the `length`-byte window of
/// `chunk` starting at `offset`, decoding it as `ty`.
pub fn matches_at(
    chunk: &[u8],
    offset: usize,
    length: usize,
    ty: LogicalType,
    predicate: &ScanPredicate,
) -> Result<bool> {
    let window = &chunk[offset..offset + length];
    let key = numeric_key(ty, window)?;
    Ok(match predicate {
        ScanPredicate::Greater(bound) => key.partial_cmp(bound) == Some(std::cmp::Ordering::Greater),
        ScanPredicate::Less(bound) => key.partial_cmp(bound) == Some(std::cmp::Ordering::Less),
        ScanPredicate::GreaterOrEqual(bound) => {
            matches!(
                key.partial_cmp(bound),
                Some(std::cmp::Ordering::Greater) | Some(std::cmp::Ordering::Equal)
            )
        }
        ScanPredicate::LessOrEqual(bound) => {
            matches!(
                key.partial_cmp(bound),
                Some(std::cmp::Ordering::Less) | Some(std::cmp::Ordering::Equal)
            )
        }
        ScanPredicate::Between(lo, hi) => {
            key.partial_cmp(lo) != Some(std::cmp::Ordering::Less)
                && key.partial_cmp(hi) != Some(std::cmp::Ordering::Greater)
        }
        ScanPredicate::NotBetween(lo, hi) => {
            key.partial_cmp(lo) == Some(std::cmp::Ordering::Less)
                || key.partial_cmp(hi) == Some(std::cmp::Ordering::Greater)
        }
        ScanPredicate::Equal(_) | ScanPredicate::NotEqual(_) => {
            unreachable!("exact-match predicates are handled by the substring search")
        }
    })
}

/// Scan every valid offset in `chunk` (an offset is valid while `offset +
/// length <= chunk.len()`) and return the offsets where the predicate holds.
/// `fresh_from` restricts output to offsets at or past the region's
/// not-yet-emitted boundary, so the Scan Engine can skip re-emitting matches
/// from the overlap region shared with the previous chunk.
pub fn scan_chunk(
    chunk: &[u8],
    length: usize,
    ty: LogicalType,
    predicate: &ScanPredicate,
    fresh_from: usize,
) -> Result<Vec<usize>> {
    if length == 0 || length > chunk.len() {
        return Ok(Vec::new());
    }
    let last_offset = chunk.len() - length;
    let mut out = Vec::new();
    for offset in fresh_from..=last_offset {
        if matches_at(chunk, offset, length, ty, predicate)? {
            out.push(offset);
        }
    }
    Ok(out)
}
