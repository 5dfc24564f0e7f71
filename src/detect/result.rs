use crate::geometry::{Color, Rect};

/// One recognized object in frame space.
#[derive(Clone, Debug, PartialEq)]
pub struct Detection {
    pub class_name: String,
    /// Model confidence in `0.0..=1.0`.
    pub confidence: f64,
    /// Bounding box in frame pixel coordinates.
    pub rect: Rect,
    pub display_color: Color,
}

impl Detection {
    pub fn new(class_name: impl Into<String>, confidence: f64, rect: Rect, color: Color) -> Self {
        Self {
            class_name: class_name.into(),
            confidence,
            rect,
            display_color: color,
        }
    }

    /// Confidence as a whole percentage, rounded to nearest.
    pub fn confidence_percent(&self) -> i64 {
        (self.confidence * 100.0).round() as i64
    }

    /// Overlay label: class name, two spaces, percentage in parentheses.
    pub fn label(&self) -> String {
        format!("{}  ({}%)", self.class_name, self.confidence_percent())
    }
}
