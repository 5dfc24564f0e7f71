use sha2::{Digest, Sha256};

use crate::detect::backend::DetectionAdapter;
use crate::detect::result::Detection;
use crate::frame::Frame;
use crate::geometry::{Color, Rect};

const GRID_COLS: u32 = 16;
const GRID_ROWS: u32 = 9;
const SAMPLES_PER_AXIS: u32 = 4;
const CHANGE_THRESHOLD: u8 = 16;
const MOTION_CONFIDENCE: f64 = 0.85;

/// Frame-differencing adapter.
///
/// Keeps a coarse luma grid of the previous admitted frame (never its pixels)
/// and reports one `motion` detection bounding every grid cell whose mean
/// luma moved past a threshold.
#[derive(Default)]
pub struct MotionAdapter {
    reference: Option<Reference>,
}

struct Reference {
    width: u32,
    height: u32,
    hash: [u8; 32],
    grid: Vec<u8>,
}

impl MotionAdapter {
    pub fn new() -> Self {
        Self::default()
    }
}

impl DetectionAdapter for MotionAdapter {
    fn name(&self) -> &'static str {
        "motion"
    }

    fn detect(&mut self, frame: &Frame) -> Option<Vec<Detection>> {
        let hash: [u8; 32] = Sha256::digest(frame.pixels()).into();

        let previous = match self.reference.take() {
            Some(prev) if prev.width == frame.width() && prev.height == frame.height() => prev,
            _ => {
                // First frame or a resolution change: nothing to compare against yet.
                self.reference = Some(Reference {
                    width: frame.width(),
                    height: frame.height(),
                    hash,
                    grid: luma_grid(frame),
                });
                return None;
            }
        };

        if previous.hash == hash {
            self.reference = Some(previous);
            return Some(Vec::new());
        }

        let grid = luma_grid(frame);
        let detections = changed_region(frame, &previous.grid, &grid)
            .map(|rect| vec![Detection::new("motion", MOTION_CONFIDENCE, rect, Color::YELLOW)])
            .unwrap_or_default();

        self.reference = Some(Reference {
            width: frame.width(),
            height: frame.height(),
            hash,
            grid,
        });
        Some(detections)
    }
}

fn cell_span(index: u32, cells: u32, extent: u32) -> (u32, u32) {
    let start = index * extent / cells;
    let end = (index + 1) * extent / cells;
    (start, end.max(start + 1))
}

fn luma_grid(frame: &Frame) -> Vec<u8> {
    let mut grid = Vec::with_capacity((GRID_COLS * GRID_ROWS) as usize);
    for row in 0..GRID_ROWS {
        let (y0, y1) = cell_span(row, GRID_ROWS, frame.height());
        for col in 0..GRID_COLS {
            let (x0, x1) = cell_span(col, GRID_COLS, frame.width());
            let mut sum = 0u32;
            for sy in 0..SAMPLES_PER_AXIS {
                let y = y0 + ((2 * sy + 1) * (y1 - y0)) / (2 * SAMPLES_PER_AXIS);
                for sx in 0..SAMPLES_PER_AXIS {
                    let x = x0 + ((2 * sx + 1) * (x1 - x0)) / (2 * SAMPLES_PER_AXIS);
                    sum += frame.luma_at(x, y) as u32;
                }
            }
            grid.push((sum / (SAMPLES_PER_AXIS * SAMPLES_PER_AXIS)) as u8);
        }
    }
    grid
}

fn changed_region(frame: &Frame, before: &[u8], after: &[u8]) -> Option<Rect> {
    let mut cols = (u32::MAX, 0u32);
    let mut rows = (u32::MAX, 0u32);
    let mut any = false;
    for (i, (a, b)) in before.iter().zip(after).enumerate() {
        if a.abs_diff(*b) < CHANGE_THRESHOLD {
            continue;
        }
        let (col, row) = (i as u32 % GRID_COLS, i as u32 / GRID_COLS);
        cols = (cols.0.min(col), cols.1.max(col));
        rows = (rows.0.min(row), rows.1.max(row));
        any = true;
    }
    if !any {
        return None;
    }
    let (x0, _) = cell_span(cols.0, GRID_COLS, frame.width());
    let (_, x1) = cell_span(cols.1, GRID_COLS, frame.width());
    let (y0, _) = cell_span(rows.0, GRID_ROWS, frame.height());
    let (_, y1) = cell_span(rows.1, GRID_ROWS, frame.height());
    Some(Rect::new(
        x0 as f64,
        y0 as f64,
        (x1 - x0) as f64,
        (y1 - y0) as f64,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frame::PixelFormat;

    const W: u32 = 32;
    const H: u32 = 18;

    fn frame_with_square(square: Option<(u32, u32, u32, u32)>) -> Frame {
        let mut data = vec![0u8; (W * H * 4) as usize];
        if let Some((sx, sy, sw, sh)) = square {
            for y in sy..sy + sh {
                for x in sx..sx + sw {
                    let i = ((y * W + x) * 4) as usize;
                    data[i..i + 4].copy_from_slice(&[255, 255, 255, 255]);
                }
            }
        }
        Frame::new(data, W, H, PixelFormat::Bgra).unwrap()
    }

    #[test]
    fn first_frame_has_no_reference() {
        let mut adapter = MotionAdapter::new();
        assert!(adapter.detect(&frame_with_square(None)).is_none());
    }

    #[test]
    fn identical_frames_report_nothing() {
        let mut adapter = MotionAdapter::new();
        adapter.detect(&frame_with_square(None));
        assert_eq!(adapter.detect(&frame_with_square(None)), Some(vec![]));
    }

    #[test]
    fn changed_cells_are_bounded() {
        let mut adapter = MotionAdapter::new();
        adapter.detect(&frame_with_square(None));
        let found = adapter
            .detect(&frame_with_square(Some((8, 4, 8, 4))))
            .expect("reference frame exists");
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].class_name, "motion");
        assert_eq!(found[0].rect, Rect::new(8.0, 4.0, 8.0, 4.0));
        assert_eq!(found[0].label(), "motion  (85%)");
    }

    #[test]
    fn resolution_change_resets_reference() {
        let mut adapter = MotionAdapter::new();
        adapter.detect(&frame_with_square(None));
        let small = Frame::new(vec![0u8; 16], 2, 2, PixelFormat::Bgra).unwrap();
        assert!(adapter.detect(&small).is_none());
    }
}
