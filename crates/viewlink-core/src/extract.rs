//! Change-unit extraction: turn a frame's packed change metadata into the
//! ordered list of regions to read back.
//!
//! Order is authoritative. Later rectangles may overlap earlier ones and
//! carry the final pixel state for their area, so nothing is merged,
//! deduplicated, or reordered.

use crate::errors::ChangeError;
use crate::geometry::Region;
use crate::source::{ChangeMetadata, DIRTY_RECT_BYTES, MOVE_RECT_BYTES};

/// Parse the regions of one frame, in the order the backend reported them.
///
/// Move records come first: the sink has no move primitive, so each move's
/// destination rectangle is treated as a full invalidation and re-read like
/// any dirty rect. Dirty rects follow in reported order.
///
/// Degenerate rectangles (zero width or height) are dropped here, before any
/// readback is attempted. The only failure is a blob too small for the
/// advertised counts, which rejects the whole frame.
pub fn dirty_regions(changes: &ChangeMetadata) -> Result<Vec<Region>, ChangeError> {
    let needed = changes.move_count * MOVE_RECT_BYTES + changes.dirty_count * DIRTY_RECT_BYTES;
    if changes.blob.len() < needed {
        return Err(ChangeError::Truncated {
            needed,
            available: changes.blob.len(),
            moves:     changes.move_count,
            dirty:     changes.dirty_count,
        });
    }

    let mut regions = Vec::with_capacity(changes.move_count + changes.dirty_count);

    for i in 0..changes.move_count {
        // Skip the 8-byte source point; only the destination is invalidated.
        let at = i * MOVE_RECT_BYTES + 8;
        push_rect(&mut regions, &changes.blob[at..at + DIRTY_RECT_BYTES]);
    }

    let dirty_base = changes.move_count * MOVE_RECT_BYTES;
    for i in 0..changes.dirty_count {
        let at = dirty_base + i * DIRTY_RECT_BYTES;
        push_rect(&mut regions, &changes.blob[at..at + DIRTY_RECT_BYTES]);
    }

    Ok(regions)
}

fn push_rect(regions: &mut Vec<Region>, raw: &[u8]) {
    let left   = read_i32(raw, 0);
    let top    = read_i32(raw, 4);
    let right  = read_i32(raw, 8);
    let bottom = read_i32(raw, 12);

    match Region::from_bounds(left, top, right, bottom) {
        Ok(region) => regions.push(region),
        Err(e) => tracing::trace!("dropping change rect: {e}"),
    }
}

fn read_i32(raw: &[u8], offset: usize) -> i32 {
    i32::from_le_bytes(raw[offset..offset + 4].try_into().unwrap())
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;

    fn rect_bytes(l: i32, t: i32, r: i32, b: i32) -> Vec<u8> {
        [l, t, r, b].iter().flat_map(|v| v.to_le_bytes()).collect()
    }

    fn move_bytes(sx: i32, sy: i32, dest: (i32, i32, i32, i32)) -> Vec<u8> {
        let mut out: Vec<u8> = [sx, sy].iter().flat_map(|v| v.to_le_bytes()).collect();
        out.extend(rect_bytes(dest.0, dest.1, dest.2, dest.3));
        out
    }

    fn metadata(moves: usize, dirty: usize, blob: Vec<u8>) -> ChangeMetadata {
        ChangeMetadata { move_count: moves, dirty_count: dirty, blob: Bytes::from(blob) }
    }

    #[test]
    fn preserves_reported_order_without_merging() {
        let mut blob = rect_bytes(0, 0, 100, 100);
        blob.extend(rect_bytes(50, 50, 150, 150)); // overlaps the first, kept
        blob.extend(rect_bytes(0, 0, 100, 100));   // exact duplicate, kept

        let regions = dirty_regions(&metadata(0, 3, blob)).unwrap();
        assert_eq!(regions.len(), 3);
        assert_eq!(regions[0], Region::from_bounds(0, 0, 100, 100).unwrap());
        assert_eq!(regions[1], Region::from_bounds(50, 50, 150, 150).unwrap());
        assert_eq!(regions[2], regions[0]);
    }

    #[test]
    fn truncated_blob_rejects_the_frame() {
        let mut blob = rect_bytes(0, 0, 10, 10);
        blob.truncate(blob.len() - 1);

        let err = dirty_regions(&metadata(0, 1, blob)).unwrap_err();
        assert_eq!(
            err,
            ChangeError::Truncated { needed: 16, available: 15, moves: 0, dirty: 1 }
        );
    }

    #[test]
    fn count_inconsistent_with_blob_rejects_the_frame() {
        let blob = rect_bytes(0, 0, 10, 10);
        assert!(dirty_regions(&metadata(0, 2, blob)).is_err());
    }

    #[test]
    fn move_destinations_are_invalidated_before_dirty_rects() {
        let mut blob = move_bytes(0, 0, (200, 0, 264, 64));
        blob.extend(rect_bytes(10, 10, 20, 20));

        let regions = dirty_regions(&metadata(1, 1, blob)).unwrap();
        assert_eq!(regions.len(), 2);
        assert_eq!(regions[0], Region::from_bounds(200, 0, 264, 64).unwrap());
        assert_eq!(regions[1], Region::from_bounds(10, 10, 20, 20).unwrap());
    }

    #[test]
    fn degenerate_rects_are_dropped_before_readback() {
        let mut blob = rect_bytes(5, 5, 5, 50);   // zero width
        blob.extend(rect_bytes(0, 9, 10, 9));      // zero height
        blob.extend(rect_bytes(1, 2, 3, 4));       // valid

        let regions = dirty_regions(&metadata(0, 3, blob)).unwrap();
        assert_eq!(regions, vec![Region::from_bounds(1, 2, 3, 4).unwrap()]);
    }

    #[test]
    fn empty_metadata_yields_no_regions() {
        let regions = dirty_regions(&ChangeMetadata::empty()).unwrap();
        assert!(regions.is_empty());
    }
}
