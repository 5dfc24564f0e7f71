//! Frame-space to view-space rectangle mapping.

use anyhow::{anyhow, Result};

use crate::geometry::{Rect, Size};

/// Default inset kept between a clamped box and the view edge.
pub const DEFAULT_EDGE_OFFSET: f64 = 2.0;

/// Maps detection rectangles from frame pixels into overlay-surface points.
///
/// X and Y scale independently; there is no aspect-ratio correction and no
/// rotation. Boxes that spill past the surface are clamped so the result is
/// always contained in the destination bounds.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct CoordinateMapper {
    edge_offset: f64,
}

impl CoordinateMapper {
    pub fn new(edge_offset: f64) -> Self {
        Self { edge_offset }
    }

    pub fn edge_offset(&self) -> f64 {
        self.edge_offset
    }

    /// Map `rect` (expressed in a `from_size` frame) into `to_bounds`.
    ///
    /// Clamp order is fixed: left, top, bottom, right. Origin clamps run first
    /// so a box clipped on its origin is measured from the new origin when its
    /// far edge is shrunk.
    pub fn map(&self, rect: Rect, from_size: Size, to_bounds: Rect) -> Result<Rect> {
        if !from_size.is_positive() {
            return Err(anyhow!(
                "cannot map from degenerate frame size {}x{}",
                from_size.width,
                from_size.height
            ));
        }
        if !to_bounds.size().is_positive() {
            return Err(anyhow!(
                "cannot map into degenerate bounds {}x{}",
                to_bounds.width,
                to_bounds.height
            ));
        }

        let sx = to_bounds.width / from_size.width;
        let sy = to_bounds.height / from_size.height;
        let mut out = rect.scaled(sx, sy).translated(to_bounds.x, to_bounds.y);
        let edge = self.edge_offset;

        if out.min_x() < to_bounds.min_x() {
            out.x = to_bounds.min_x() + edge;
        }
        if out.min_y() < to_bounds.min_y() {
            out.y = to_bounds.min_y() + edge;
        }
        if out.max_y() > to_bounds.max_y() {
            out.height = to_bounds.max_y() - out.y - edge;
        }
        if out.max_x() > to_bounds.max_x() {
            out.width = to_bounds.max_x() - out.x - edge;
        }

        // A box that starts past the far edge collapses onto the inset line.
        if out.width < 0.0 {
            out.x = (to_bounds.max_x() - edge).max(to_bounds.min_x());
            out.width = 0.0;
        }
        if out.height < 0.0 {
            out.y = (to_bounds.max_y() - edge).max(to_bounds.min_y());
            out.height = 0.0;
        }
        Ok(out)
    }
}

impl Default for CoordinateMapper {
    fn default() -> Self {
        Self::new(DEFAULT_EDGE_OFFSET)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const FRAME: Size = Size::new(640.0, 360.0);
    const VIEW: Rect = Rect::new(0.0, 0.0, 320.0, 180.0);

    #[test]
    fn scales_into_view() {
        let mapper = CoordinateMapper::default();
        let out = mapper.map(Rect::new(0.0, 0.0, 50.0, 50.0), FRAME, VIEW).unwrap();
        assert_eq!(out, Rect::new(0.0, 0.0, 25.0, 25.0));
    }

    #[test]
    fn axes_scale_independently() {
        let mapper = CoordinateMapper::default();
        let view = Rect::new(0.0, 0.0, 640.0, 720.0);
        let out = mapper.map(Rect::new(100.0, 100.0, 10.0, 10.0), FRAME, view).unwrap();
        assert_eq!(out, Rect::new(100.0, 200.0, 10.0, 20.0));
    }

    #[test]
    fn negative_origin_clamps_to_edge_offset() {
        let mapper = CoordinateMapper::default();
        let out = mapper.map(Rect::new(-20.0, -40.0, 100.0, 100.0), FRAME, VIEW).unwrap();
        assert_eq!(out.x, 2.0);
        assert_eq!(out.y, 2.0);
        // size only shrinks when the far edge overflows
        assert_eq!(out.width, 50.0);
        assert_eq!(out.height, 50.0);
    }

    #[test]
    fn far_edges_shrink_to_inset() {
        let mapper = CoordinateMapper::default();
        let out = mapper.map(Rect::new(600.0, 300.0, 100.0, 100.0), FRAME, VIEW).unwrap();
        assert_eq!(out.x, 300.0);
        assert_eq!(out.y, 150.0);
        assert_eq!(out.max_x(), 318.0);
        assert_eq!(out.max_y(), 178.0);
    }

    #[test]
    fn oversized_box_clamps_origin_before_far_edge() {
        let mapper = CoordinateMapper::default();
        let out = mapper.map(Rect::new(-100.0, -100.0, 2_000.0, 2_000.0), FRAME, VIEW).unwrap();
        assert_eq!(out, Rect::new(2.0, 2.0, 316.0, 176.0));
    }

    #[test]
    fn box_past_far_edge_collapses_inside() {
        let mapper = CoordinateMapper::default();
        let out = mapper.map(Rect::new(1_000.0, 10.0, 40.0, 40.0), FRAME, VIEW).unwrap();
        assert!(VIEW.contains_rect(&out), "{out:?}");
        assert_eq!(out.width, 0.0);
    }

    #[test]
    fn contained_rect_is_unchanged_at_unit_scale() {
        let mapper = CoordinateMapper::default();
        let rect = Rect::new(12.5, 40.0, 100.0, 60.0);
        let out = mapper.map(rect, VIEW.size(), VIEW).unwrap();
        assert_eq!(out, rect);
        assert_eq!(mapper.map(out, VIEW.size(), VIEW).unwrap(), rect);
    }

    #[test]
    fn offset_bounds_translate_the_result() {
        let mapper = CoordinateMapper::default();
        let bounds = Rect::new(100.0, 50.0, 320.0, 180.0);
        let out = mapper.map(Rect::new(0.0, 0.0, 50.0, 50.0), FRAME, bounds).unwrap();
        assert_eq!(out, Rect::new(100.0, 50.0, 25.0, 25.0));
    }

    #[test]
    fn mapped_rects_stay_inside_bounds() {
        let mapper = CoordinateMapper::default();
        let coords = [-700.0, -50.0, 0.0, 13.0, 320.0, 639.0, 900.0];
        let sizes = [0.0, 1.0, 45.5, 360.0, 1_500.0];
        for &x in &coords {
            for &y in &coords {
                for &w in &sizes {
                    for &h in &sizes {
                        let out = mapper.map(Rect::new(x, y, w, h), FRAME, VIEW).unwrap();
                        assert!(VIEW.contains_rect(&out), "({x},{y},{w},{h}) -> {out:?}");
                    }
                }
            }
        }
    }

    #[test]
    fn rejects_degenerate_sizes() {
        let mapper = CoordinateMapper::default();
        let rect = Rect::new(0.0, 0.0, 1.0, 1.0);
        assert!(mapper.map(rect, Size::new(0.0, 360.0), VIEW).is_err());
        assert!(mapper.map(rect, Size::new(640.0, 0.0), VIEW).is_err());
        assert!(mapper.map(rect, FRAME, Rect::new(0.0, 0.0, 0.0, 0.0)).is_err());
    }
}
