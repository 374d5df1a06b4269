//! Matching utilities for multi-object tracking.

use ndarray::Array2;

use crate::error::{Error, Result};
use crate::tracker::rect::{Rect, iou_batch};

/// Cost given to padding cells so they are only chosen when no real pair is left.
const PADDING_COST: f64 = 1e6;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Association {
    /// Pairs of (detection index, tracker index)
    pub matches: Vec<(usize, usize)>,
    pub unmatched_detections: Vec<usize>,
    pub unmatched_trackers: Vec<usize>,
}

/// Solve the rectangular assignment problem minimising the total cost.
///
/// Returns one `(row, col)` pair per matched row; at most `min(rows, cols)` pairs.
pub fn linear_assignment(cost_matrix: &Array2<f32>) -> Result<Vec<(usize, usize)>> {
    let (num_rows, num_cols) = cost_matrix.dim();
    if num_rows == 0 || num_cols == 0 {
        return Ok(vec![]);
    }

    let size = num_rows.max(num_cols);
    let mut padded = Array2::<f64>::from_elem((size, size), PADDING_COST);
    for i in 0..num_rows {
        for j in 0..num_cols {
            padded[[i, j]] = cost_matrix[[i, j]] as f64;
        }
    }

    let (row_to_col, _) =
        lapjv::lapjv(&padded).map_err(|e| Error::Assignment(format!("{:?}", e)))?;

    Ok(row_to_col
        .into_iter()
        .enumerate()
        .filter(|&(row, col)| row < num_rows && col < num_cols)
        .collect())
}

/// Whether a pair with this IoU may be matched. Disjoint boxes never match.
#[inline]
fn accepts(iou: f32, iou_threshold: f32) -> bool {
    iou >= iou_threshold && iou > 0.0
}

/// Acceptable pairs, if they already form a one-to-one matching.
fn unambiguous_matches(ious: &Array2<f32>, iou_threshold: f32) -> Option<Vec<(usize, usize)>> {
    let above = ious.mapv(|v| u8::from(accepts(v, iou_threshold)));
    let rows_ok = above.rows().into_iter().all(|r| r.sum() <= 1);
    let cols_ok = above.columns().into_iter().all(|c| c.sum() <= 1);
    if !(rows_ok && cols_ok) {
        return None;
    }
    Some(
        above
            .indexed_iter()
            .filter(|(_, v)| **v == 1)
            .map(|((d, t), _)| (d, t))
            .collect(),
    )
}

/// Assign detection boxes to tracked boxes by IoU.
///
/// Matches with IoU below `iou_threshold`, or with no overlap at all, are
/// split back into an unmatched detection and an unmatched tracker.
pub fn associate_detections_to_trackers(
    detections: &[Rect],
    trackers: &[Rect],
    iou_threshold: f32,
) -> Result<Association> {
    if trackers.is_empty() {
        return Ok(Association {
            matches: vec![],
            unmatched_detections: (0..detections.len()).collect(),
            unmatched_trackers: vec![],
        });
    }

    let ious = iou_batch(detections, trackers);

    let candidates = if detections.is_empty() {
        vec![]
    } else if let Some(pairs) = unambiguous_matches(&ious, iou_threshold) {
        pairs
    } else {
        linear_assignment(&ious.mapv(|v| 1.0 - v))?
    };

    let mut det_matched = vec![false; detections.len()];
    let mut trk_matched = vec![false; trackers.len()];
    let mut matches = Vec::with_capacity(candidates.len());
    for (d, t) in candidates {
        if !accepts(ious[[d, t]], iou_threshold) {
            continue;
        }
        det_matched[d] = true;
        trk_matched[t] = true;
        matches.push((d, t));
    }

    let unmatched = |mask: &[bool]| {
        mask.iter()
            .enumerate()
            .filter_map(|(i, &m)| if m { None } else { Some(i) })
            .collect::<Vec<_>>()
    };

    Ok(Association {
        matches,
        unmatched_detections: unmatched(&det_matched[..]),
        unmatched_trackers: unmatched(&trk_matched[..]),
    })
}
