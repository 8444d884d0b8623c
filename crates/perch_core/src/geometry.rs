//! Geometry snapshots
//!
//! Every type here is a plain value captured at the moment a host is queried.
//! Nothing is cached across frames: widgets re-measure whenever a reposition
//! trigger fires.

use serde::{Deserialize, Serialize};

/// Replace NaN/infinite values with zero
#[inline]
pub(crate) fn finite_or_zero(v: f32) -> f32 {
    if v.is_finite() {
        v
    } else {
        0.0
    }
}

/// A 2D point in viewport coordinates
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub x: f32,
    pub y: f32,
}

impl Point {
    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }
}

/// Width and height of an overlay's content
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Size {
    pub width: f32,
    pub height: f32,
}

impl Size {
    pub fn new(width: f32, height: f32) -> Self {
        Self { width, height }
    }

    /// Clamp to finite, non-negative dimensions
    pub fn normalized(self) -> Self {
        Self {
            width: finite_or_zero(self.width).max(0.0),
            height: finite_or_zero(self.height).max(0.0),
        }
    }

    /// Whether the size has been measured (both dimensions non-zero)
    pub fn is_measured(&self) -> bool {
        self.width > 0.0 && self.height > 0.0
    }
}

/// Axis-aligned box of an anchor element in viewport coordinates
///
/// `right`/`bottom` are stored alongside `width`/`height` so callers can read
/// whichever edge they need without recomputing it.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct AnchorRect {
    pub top: f32,
    pub left: f32,
    pub right: f32,
    pub bottom: f32,
    pub width: f32,
    pub height: f32,
}

impl AnchorRect {
    /// Create from origin and size
    pub fn from_xywh(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self {
            top: y,
            left: x,
            right: x + width,
            bottom: y + height,
            width,
            height,
        }
    }

    /// Create from the four edges
    pub fn from_edges(top: f32, left: f32, right: f32, bottom: f32) -> Self {
        Self {
            top,
            left,
            right,
            bottom,
            width: right - left,
            height: bottom - top,
        }
    }

    /// Rebuild the rect with finite values and non-negative extents
    ///
    /// The edges are re-derived from `top`/`left` and the normalized size, so
    /// an inconsistent snapshot (e.g. `right < left`) collapses to zero width.
    pub fn normalized(self) -> Self {
        let left = finite_or_zero(self.left);
        let top = finite_or_zero(self.top);
        let width = finite_or_zero(self.width).max(0.0);
        let height = finite_or_zero(self.height).max(0.0);
        Self::from_xywh(left, top, width, height)
    }

    /// Shift the rect by a delta (used when an ancestor scrolls)
    pub fn translate(self, dx: f32, dy: f32) -> Self {
        Self::from_xywh(self.left + dx, self.top + dy, self.width, self.height)
    }

    /// Horizontal center
    pub fn center_x(&self) -> f32 {
        self.left + self.width / 2.0
    }

    /// Vertical center
    pub fn center_y(&self) -> f32 {
        self.top + self.height / 2.0
    }

    /// Check whether a point lies inside the rect (edges inclusive)
    pub fn contains(&self, point: Point) -> bool {
        point.x >= self.left
            && point.x <= self.right
            && point.y >= self.top
            && point.y <= self.bottom
    }
}

/// The visible area and the page scroll offset
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Viewport {
    pub width: f32,
    pub height: f32,
    #[serde(default)]
    pub scroll_x: f32,
    #[serde(default)]
    pub scroll_y: f32,
}

impl Viewport {
    /// Viewport with no page scroll
    pub fn new(width: f32, height: f32) -> Self {
        Self {
            width,
            height,
            scroll_x: 0.0,
            scroll_y: 0.0,
        }
    }

    /// Set the page scroll offset
    pub fn with_scroll(mut self, scroll_x: f32, scroll_y: f32) -> Self {
        self.scroll_x = scroll_x;
        self.scroll_y = scroll_y;
        self
    }

    /// Clamp to finite values and non-negative dimensions
    pub fn normalized(self) -> Self {
        Self {
            width: finite_or_zero(self.width).max(0.0),
            height: finite_or_zero(self.height).max(0.0),
            scroll_x: finite_or_zero(self.scroll_x),
            scroll_y: finite_or_zero(self.scroll_y),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_anchor_rect_edges() {
        let rect = AnchorRect::from_xywh(10.0, 20.0, 100.0, 30.0);
        assert_eq!(rect.right, 110.0);
        assert_eq!(rect.bottom, 50.0);
        assert_eq!(rect.center_x(), 60.0);
        assert_eq!(rect.center_y(), 35.0);

        let same = AnchorRect::from_edges(20.0, 10.0, 110.0, 50.0);
        assert_eq!(rect, same);
    }

    #[test]
    fn test_anchor_rect_normalized() {
        let rect = AnchorRect {
            top: f32::NAN,
            left: 5.0,
            right: 0.0,
            bottom: f32::INFINITY,
            width: -20.0,
            height: 10.0,
        }
        .normalized();

        assert_eq!(rect.top, 0.0);
        assert_eq!(rect.left, 5.0);
        assert_eq!(rect.width, 0.0);
        assert_eq!(rect.right, 5.0);
        assert_eq!(rect.bottom, 10.0);
    }

    #[test]
    fn test_anchor_rect_contains() {
        let rect = AnchorRect::from_xywh(0.0, 0.0, 10.0, 10.0);
        assert!(rect.contains(Point::new(0.0, 0.0)));
        assert!(rect.contains(Point::new(10.0, 10.0)));
        assert!(!rect.contains(Point::new(10.5, 3.0)));
    }

    #[test]
    fn test_size_measured() {
        assert!(!Size::default().is_measured());
        assert!(Size::new(10.0, 4.0).is_measured());
        assert_eq!(Size::new(-1.0, f32::NAN).normalized(), Size::default());
    }

    #[test]
    fn test_viewport_scroll() {
        let vp = Viewport::new(800.0, 600.0).with_scroll(0.0, 120.0);
        assert_eq!(vp.scroll_y, 120.0);
        assert_eq!(vp.normalized(), vp);
    }
}
