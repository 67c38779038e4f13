//! Connected-component filtering on masks

use std::collections::VecDeque;

use wastelens_core::raster::{Mask, Raster};

/// 8-connected neighbor offsets
const NEIGHBORS: [(i64, i64); 8] = [
    (-1, -1),
    (-1, 0),
    (-1, 1),
    (0, -1),
    (0, 1),
    (1, -1),
    (1, 0),
    (1, 1),
];

/// Drop mask components smaller than `min_size` pixels.
///
/// Components are 8-connected. Counting saturates at `cap`: a component is
/// kept when `min(size, cap) >= min_size`, so `min_size` values above the
/// cap reject everything. Surviving pixels keep the value 1.0, everything
/// else is absent.
pub fn filter_components(mask: &Mask, min_size: usize, cap: usize) -> Mask {
    let (rows, cols) = mask.shape();
    let mut out = mask.like(f64::NAN);
    out.set_nodata(Some(f64::NAN));
    let mut visited = vec![false; rows * cols];
    let mut queue: VecDeque<(usize, usize)> = VecDeque::new();
    let mut component: Vec<(usize, usize)> = Vec::new();

    for row in 0..rows {
        for col in 0..cols {
            if visited[row * cols + col] || !mask.is_set(row, col) {
                continue;
            }

            component.clear();
            queue.push_back((row, col));
            visited[row * cols + col] = true;

            while let Some((r, c)) = queue.pop_front() {
                component.push((r, c));
                for (dr, dc) in NEIGHBORS {
                    let nr = r as i64 + dr;
                    let nc = c as i64 + dc;
                    if nr < 0 || nc < 0 || nr >= rows as i64 || nc >= cols as i64 {
                        continue;
                    }
                    let (nr, nc) = (nr as usize, nc as usize);
                    if !visited[nr * cols + nc] && mask.is_set(nr, nc) {
                        visited[nr * cols + nc] = true;
                        queue.push_back((nr, nc));
                    }
                }
            }

            if component.len().min(cap) >= min_size {
                for &(r, c) in &component {
                    unsafe { out.set_unchecked(r, c, 1.0) };
                }
            }
        }
    }

    out
}

/// Label 8-connected components, 1-based, 0 for background.
pub fn label_components(mask: &Mask) -> (Raster<i32>, usize) {
    let (rows, cols) = mask.shape();
    let mut labels: Raster<i32> = mask.with_same_meta::<i32>(rows, cols);
    let mut next_label: i32 = 0;
    let mut queue: VecDeque<(usize, usize)> = VecDeque::new();

    for row in 0..rows {
        for col in 0..cols {
            if labels.get(row, col).unwrap_or(0) != 0 || !mask.is_set(row, col) {
                continue;
            }
            next_label += 1;
            queue.push_back((row, col));
            unsafe { labels.set_unchecked(row, col, next_label) };

            while let Some((r, c)) = queue.pop_front() {
                for (dr, dc) in NEIGHBORS {
                    let nr = r as i64 + dr;
                    let nc = c as i64 + dc;
                    if nr < 0 || nc < 0 || nr >= rows as i64 || nc >= cols as i64 {
                        continue;
                    }
                    let (nr, nc) = (nr as usize, nc as usize);
                    if unsafe { labels.get_unchecked(nr, nc) } == 0 && mask.is_set(nr, nc) {
                        unsafe { labels.set_unchecked(nr, nc, next_label) };
                        queue.push_back((nr, nc));
                    }
                }
            }
        }
    }

    (labels, next_label as usize)
}
