//! Overlay model and renderer.
//!
//! `OverlayRenderer` owns the overlays currently on screen. The set is only
//! ever replaced wholesale; nothing patches individual boxes. Drawing is
//! delegated to an `OverlaySurface` supplied by the host UI.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::geometry::{Color, Rect, Size};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FontWeight {
    Regular,
    #[default]
    Medium,
    Semibold,
    Bold,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FontSpec {
    pub family: String,
    pub size: f64,
    pub weight: FontWeight,
}

impl Default for FontSpec {
    fn default() -> Self {
        Self {
            family: "system".to_string(),
            size: 14.0,
            weight: FontWeight::Medium,
        }
    }
}

/// Shared display font. Every overlay built from one frame points at the same spec.
pub type FontRef = Arc<FontSpec>;

/// A labeled, colored box in overlay-surface coordinates.
#[derive(Clone, Debug, PartialEq)]
pub struct ObjectOverlay {
    pub label: String,
    pub rect: Rect,
    pub label_size: Size,
    pub color: Color,
    pub font: FontRef,
}

/// Measures rendered label text.
pub trait TextMeasurer: Send {
    fn measure(&self, text: &str, font: &FontSpec) -> Size;
}

/// Font-metric-free estimate: fixed advance per character, fixed line height.
#[derive(Clone, Copy, Debug)]
pub struct ApproximateTextMeasurer {
    pub advance_em: f64,
    pub line_height_em: f64,
}

impl Default for ApproximateTextMeasurer {
    fn default() -> Self {
        Self {
            advance_em: 0.6,
            line_height_em: 1.2,
        }
    }
}

impl TextMeasurer for ApproximateTextMeasurer {
    fn measure(&self, text: &str, font: &FontSpec) -> Size {
        let chars = text.chars().count() as f64;
        Size::new(
            chars * font.size * self.advance_em,
            font.size * self.line_height_em,
        )
    }
}

/// Paint parameters shared by every overlay on a surface.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct OverlayStyle {
    /// Opacity of the box fill; the label text stays opaque.
    pub fill_alpha: f64,
    /// Gap between the label baseline box and the top of its rectangle.
    pub label_offset: f64,
}

impl Default for OverlayStyle {
    fn default() -> Self {
        Self {
            fill_alpha: 0.5,
            label_offset: 10.0,
        }
    }
}

impl OverlayStyle {
    pub fn fill_color(&self, overlay: &ObjectOverlay) -> Color {
        overlay.color.with_opacity(self.fill_alpha)
    }

    /// Top-left corner of the label. Sits above the box, or inside it when
    /// there is no room above.
    pub fn label_origin(&self, overlay: &ObjectOverlay) -> (f64, f64) {
        let above = overlay.rect.y - self.label_offset - overlay.label_size.height;
        let y = if above >= 0.0 {
            above
        } else {
            overlay.rect.y + self.label_offset
        };
        (overlay.rect.x, y)
    }
}

/// Host-side drawing target for overlays.
pub trait OverlaySurface {
    /// Repaint the whole surface with `overlays`. An empty slice clears it.
    fn present(&mut self, overlays: &[ObjectOverlay]);
}

/// Surface that writes each repaint to the log.
#[derive(Default)]
pub struct LogSurface {
    style: OverlayStyle,
    repaints: u64,
}

impl LogSurface {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_style(style: OverlayStyle) -> Self {
        Self { style, repaints: 0 }
    }
}

impl OverlaySurface for LogSurface {
    fn present(&mut self, overlays: &[ObjectOverlay]) {
        self.repaints += 1;
        if overlays.is_empty() {
            log::debug!("overlay repaint #{}: cleared", self.repaints);
            return;
        }
        for overlay in overlays {
            let (label_x, label_y) = self.style.label_origin(overlay);
            let fill = self.style.fill_color(overlay);
            log::info!(
                "overlay repaint #{}: '{}' at ({:.1}, {:.1}) {:.1}x{:.1} label@({:.1}, {:.1}) fill alpha={}",
                self.repaints,
                overlay.label,
                overlay.rect.x,
                overlay.rect.y,
                overlay.rect.width,
                overlay.rect.height,
                label_x,
                label_y,
                fill.a
            );
        }
    }
}

/// Holds the current overlay set and drives repaints of its surface.
pub struct OverlayRenderer {
    surface: Box<dyn OverlaySurface>,
    bounds: Rect,
    overlays: Vec<ObjectOverlay>,
    needs_display: bool,
    redraws: u64,
}

impl OverlayRenderer {
    pub fn new(surface: Box<dyn OverlaySurface>, bounds: Rect) -> Self {
        Self {
            surface,
            bounds,
            overlays: Vec::new(),
            needs_display: false,
            redraws: 0,
        }
    }

    /// Surface bounds in its own coordinate space.
    pub fn bounds(&self) -> Rect {
        self.bounds
    }

    /// Record a layout change. The current overlays are kept; the next
    /// accepted frame is mapped against the new bounds.
    pub fn set_bounds(&mut self, bounds: Rect) {
        self.bounds = bounds;
    }

    pub fn overlays(&self) -> &[ObjectOverlay] {
        &self.overlays
    }

    /// Replace the overlay set in one step and mark the surface dirty.
    pub fn set_overlays(&mut self, overlays: Vec<ObjectOverlay>) {
        self.overlays = overlays;
        self.needs_display = true;
    }

    /// Drop every overlay and mark the surface dirty.
    pub fn clear(&mut self) {
        self.set_overlays(Vec::new());
    }

    pub fn needs_display(&self) -> bool {
        self.needs_display
    }

    /// Repaint the surface with the current set.
    pub fn redraw(&mut self) {
        self.surface.present(&self.overlays);
        self.needs_display = false;
        self.redraws += 1;
    }

    /// Number of repaints issued so far.
    pub fn redraw_count(&self) -> u64 {
        self.redraws
    }
}
