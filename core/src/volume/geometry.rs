//! Binary morphology and shape descriptors on axial slices
//!
//! Slices are indexed `[row, col]`, which for an axial NIfTI slice is `[x, y]`.

use ndarray::{Array2, ArrayView2};
use std::collections::VecDeque;

const NEIGHBORS: [(isize, isize); 4] = [(-1, 0), (1, 0), (0, -1), (0, 1)];

fn neighbor(shape: (usize, usize), r: usize, c: usize, dr: isize, dc: isize) -> Option<(usize, usize)> {
    let nr = r.checked_add_signed(dr)?;
    let nc = c.checked_add_signed(dc)?;
    (nr < shape.0 && nc < shape.1).then_some((nr, nc))
}

/// Binary erosion with a 4-connected cross, repeated `iterations` times
///
/// Pixels outside the slice count as background, so foreground touching the
/// border erodes as well.
pub fn erode(mask: &ArrayView2<bool>, iterations: usize) -> Array2<bool> {
    let shape = mask.dim();
    let mut current = mask.to_owned();
    for _ in 0..iterations {
        if !current.iter().any(|&v| v) {
            break;
        }
        let next = Array2::from_shape_fn(shape, |(r, c)| {
            current[[r, c]]
                && NEIGHBORS.iter().all(|&(dr, dc)| {
                    neighbor(shape, r, c, dr, dc).is_some_and(|(nr, nc)| current[[nr, nc]])
                })
        });
        current = next;
    }
    current
}

/// Labels 4-connected foreground components in raster order
///
/// Returns the label image (0 = background, labels start at 1) and the
/// number of components.
pub fn label_components(mask: &ArrayView2<bool>) -> (Array2<usize>, usize) {
    let shape = mask.dim();
    let mut labels = Array2::<usize>::zeros(shape);
    let mut count = 0;
    let mut queue = VecDeque::new();

    for r in 0..shape.0 {
        for c in 0..shape.1 {
            if !mask[[r, c]] || labels[[r, c]] != 0 {
                continue;
            }
            count += 1;
            labels[[r, c]] = count;
            queue.push_back((r, c));
            while let Some((pr, pc)) = queue.pop_front() {
                for &(dr, dc) in &NEIGHBORS {
                    if let Some((nr, nc)) = neighbor(shape, pr, pc, dr, dc) {
                        if mask[[nr, nc]] && labels[[nr, nc]] == 0 {
                            labels[[nr, nc]] = count;
                            queue.push_back((nr, nc));
                        }
                    }
                }
            }
        }
    }
    (labels, count)
}

/// Keeps only the largest 4-connected component
///
/// Ties go to the component found first in raster order.
pub fn largest_component(mask: &ArrayView2<bool>) -> Array2<bool> {
    let (labels, count) = label_components(mask);
    if count <= 1 {
        return mask.to_owned();
    }
    let mut sizes = vec![0usize; count + 1];
    for &label in labels.iter() {
        sizes[label] += 1;
    }
    let mut largest = 1;
    for label in 2..=count {
        if sizes[label] > sizes[largest] {
            largest = label;
        }
    }
    labels.mapv(|l| l == largest)
}

/// Center of mass of the foreground as `(row, col)`
pub fn centroid(mask: &ArrayView2<bool>) -> Option<(f64, f64)> {
    let mut n = 0usize;
    let (mut sr, mut sc) = (0.0, 0.0);
    for ((r, c), &v) in mask.indexed_iter() {
        if v {
            n += 1;
            sr += r as f64;
            sc += c as f64;
        }
    }
    (n > 0).then(|| (sr / n as f64, sc / n as f64))
}

/// Inclusive bounding box of a 2-D foreground
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BoundingBox {
    pub row_min: usize,
    pub row_max: usize,
    pub col_min: usize,
    pub col_max: usize,
}

impl BoundingBox {
    /// Index distance between the first and last foreground row
    pub fn row_extent(&self) -> f64 {
        (self.row_max - self.row_min) as f64
    }

    /// Index distance between the first and last foreground column
    pub fn col_extent(&self) -> f64 {
        (self.col_max - self.col_min) as f64
    }
}

pub fn bounding_box(mask: &ArrayView2<bool>) -> Option<BoundingBox> {
    let mut bbox: Option<BoundingBox> = None;
    for ((r, c), &v) in mask.indexed_iter() {
        if !v {
            continue;
        }
        bbox = Some(match bbox {
            None => BoundingBox {
                row_min: r,
                row_max: r,
                col_min: c,
                col_max: c,
            },
            Some(b) => BoundingBox {
                row_min: b.row_min.min(r),
                row_max: b.row_max.max(r),
                col_min: b.col_min.min(c),
                col_max: b.col_max.max(c),
            },
        });
    }
    bbox
}

/// Filled axis-aligned ellipse `((r - r0)/a)² + ((c - c0)/b)² <= 1`
///
/// A non-positive radius yields an empty ellipse.
pub fn ellipse(shape: (usize, usize), center: (f64, f64), radii: (f64, f64)) -> Array2<bool> {
    let (r0, c0) = center;
    let (a, b) = radii;
    if a <= 0.0 || b <= 0.0 {
        return Array2::from_elem(shape, false);
    }
    Array2::from_shape_fn(shape, |(r, c)| {
        let dr = r as f64 - r0;
        let dc = c as f64 - c0;
        dr * dr / (a * a) + dc * dc / (b * b) <= 1.0
    })
}

/// Rotates a slice 90° counter-clockwise for display
///
/// Output `[i, j]` reads input `[j, cols - 1 - i]`, so an `[x, y]` axial
/// slice is shown with anterior at the top.
pub fn rot90<T: Clone>(slice: &ArrayView2<T>) -> Array2<T> {
    let (rows, cols) = slice.dim();
    Array2::from_shape_fn((cols, rows), |(i, j)| slice[[j, cols - 1 - i]].clone())
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::{array, s};

    fn square(size: usize, lo: usize, hi: usize) -> Array2<bool> {
        let mut m = Array2::from_elem((size, size), false);
        m.slice_mut(s![lo..hi, lo..hi]).fill(true);
        m
    }

    #[test]
    fn test_erode_square_shrinks_by_one_per_iteration() {
        let m = square(12, 2, 10);
        let once = erode(&m.view(), 1);
        assert_eq!(once, square(12, 3, 9));
        let twice = erode(&m.view(), 2);
        assert_eq!(twice, square(12, 4, 8));
    }

    #[test]
    fn test_erode_border_counts_as_background() {
        let m = Array2::from_elem((3, 3), true);
        let eroded = erode(&m.view(), 1);
        assert_eq!(eroded.iter().filter(|&&v| v).count(), 1);
        assert!(eroded[[1, 1]]);
    }

    #[test]
    fn test_erode_removes_thin_process() {
        let mut m = square(20, 4, 14);
        // one-pixel-wide spur
        m.slice_mut(s![14..19, 9..10]).fill(true);
        let eroded = erode(&m.view(), 1);
        assert!(!eroded.slice(s![14..19, ..]).iter().any(|&v| v));
    }

    #[test]
    fn test_label_components() {
        let m = array![
            [true, true, false, false],
            [false, false, false, true],
            [true, false, false, true],
        ];
        let (labels, count) = label_components(&m.view());
        assert_eq!(count, 3);
        assert_eq!(labels[[0, 0]], 1);
        assert_eq!(labels[[1, 3]], 2);
        assert_eq!(labels[[2, 0]], 3);
    }

    #[test]
    fn test_diagonal_pixels_are_separate_components() {
        let m = array![[true, false], [false, true]];
        assert_eq!(label_components(&m.view()).1, 2);
    }

    #[test]
    fn test_largest_component() {
        let m = array![
            [true, false, true, true],
            [false, false, true, true],
            [true, false, false, false],
        ];
        let largest = largest_component(&m.view());
        assert_eq!(largest.iter().filter(|&&v| v).count(), 4);
        assert!(largest[[0, 2]]);
        assert!(!largest[[0, 0]]);
    }

    #[test]
    fn test_largest_component_tie_keeps_first() {
        let m = array![[true, false, true]];
        let largest = largest_component(&m.view());
        assert_eq!(largest, array![[true, false, false]]);
    }

    #[test]
    fn test_centroid_and_bounding_box() {
        let m = square(10, 2, 6);
        assert_eq!(centroid(&m.view()), Some((3.5, 3.5)));
        let b = bounding_box(&m.view()).unwrap();
        assert_eq!((b.row_min, b.row_max, b.col_min, b.col_max), (2, 5, 2, 5));
        assert_eq!(b.row_extent(), 3.0);

        let empty = Array2::from_elem((3, 3), false);
        assert!(centroid(&empty.view()).is_none());
        assert!(bounding_box(&empty.view()).is_none());
    }

    #[test]
    fn test_ellipse() {
        let e = ellipse((9, 9), (4.0, 4.0), (4.0, 2.0));
        assert!(e[[4, 4]]);
        assert!(e[[0, 4]]);
        assert!(e[[4, 2]]);
        assert!(!e[[4, 1]]);
        assert!(!e[[0, 0]]);
    }

    #[test]
    fn test_ellipse_zero_radius_is_empty() {
        let e = ellipse((5, 5), (2.0, 2.0), (0.0, 2.0));
        assert!(!e.iter().any(|&v| v));
    }

    #[test]
    fn test_rot90_counter_clockwise() {
        let m = array![[1, 2, 3], [4, 5, 6]];
        assert_eq!(rot90(&m.view()), array![[3, 6], [2, 5], [1, 4]]);
    }
}
