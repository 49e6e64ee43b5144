// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Deterministic midpoint merge over two adjacent sorted runs.

use crate::error::SortError;

/// Merges the adjacent sorted runs `[0, mid)` and `[mid, len)` of `buf` into
/// one sorted run through an auxiliary buffer of the same length.
///
/// The interleave is stable: ties take the left run first. The midpoint must
/// be the same `size / 2` the splitting side used, so the merge reunites
/// exactly the two pieces that were split.
///
/// # Errors
///
/// Returns [`SortError::Allocation`] when the auxiliary buffer cannot be
/// reserved. That is fatal to the job; there is no in-place fallback.
pub fn merge_midpoint(buf: &mut [i32], mid: usize) -> Result<(), SortError> {
    debug_assert!(mid <= buf.len(), "midpoint {mid} beyond buffer {}", buf.len());
    if mid == 0 || mid >= buf.len() {
        // One run is empty; the buffer is already the merged result.
        return Ok(());
    }

    let mut aux: Vec<i32> = Vec::new();
    aux.try_reserve_exact(buf.len())
        .map_err(|source| SortError::Allocation {
            elements: buf.len(),
            source,
        })?;

    let (mut i, mut j) = (0, mid);
    while i < mid && j < buf.len() {
        if buf[i] <= buf[j] {
            aux.push(buf[i]);
            i += 1;
        } else {
            aux.push(buf[j]);
            j += 1;
        }
    }
    aux.extend_from_slice(&buf[i..mid]);
    aux.extend_from_slice(&buf[j..]);

    buf.copy_from_slice(&aux);
    Ok(())
}
