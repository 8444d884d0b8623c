//! Overlay placement
//!
//! A pure function from (anchor, overlay size, viewport, preference) to a
//! position in page coordinates. It never reads host state and never caches:
//! identical requests always produce identical results, so it is safe to call
//! on every scroll and resize event.
//!
//! # Algorithm
//!
//! 1. Measure the free space on each side of the anchor.
//! 2. Pick a side: an explicit preference is used as-is; `Auto` searches
//!    bottom, top, right, left for the first side the overlay fits on.
//!    Flexible-height overlays (menus) only choose between bottom and top,
//!    preferring bottom whenever it has comparable room.
//! 3. Center the overlay on the anchor along the cross axis and offset it by
//!    the gap along the primary axis.
//! 4. Clamp both axes so the overlay stays `margin` away from the viewport edges.
//! 5. Flexible overlays also get a height cap derived from the room on the
//!    chosen side, never below the configured floor.
//!
//! ```rust
//! use perch_core::{AnchorRect, Size, Viewport};
//! use perch_layout::placement::{compute_placement, PlacementRequest, Side};
//!
//! let anchor = AnchorRect::from_xywh(100.0, 750.0, 80.0, 30.0);
//! let request = PlacementRequest::popper(Some(anchor), Size::new(200.0, 300.0), Viewport::new(1200.0, 800.0));
//!
//! // Not enough room below, so the popper flips above the anchor
//! assert_eq!(compute_placement(&request).placement, Side::Top);
//! ```

use std::fmt;
use std::str::FromStr;

use perch_core::{AnchorRect, MenuSettings, PerchConfig, Size, Viewport};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Side preference for an overlay
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Placement {
    /// Let the engine pick the side with enough room
    #[default]
    Auto,
    Top,
    Bottom,
    Left,
    Right,
}

impl Placement {
    /// The explicit side, or `None` for `Auto`
    pub fn side(&self) -> Option<Side> {
        match self {
            Placement::Auto => None,
            Placement::Top => Some(Side::Top),
            Placement::Bottom => Some(Side::Bottom),
            Placement::Left => Some(Side::Left),
            Placement::Right => Some(Side::Right),
        }
    }
}

/// Error returned when parsing an unknown placement name
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("unknown placement `{0}` (expected auto, top, bottom, left or right)")]
pub struct ParsePlacementError(String);

impl FromStr for Placement {
    type Err = ParsePlacementError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "auto" => Ok(Placement::Auto),
            "top" => Ok(Placement::Top),
            "bottom" => Ok(Placement::Bottom),
            "left" => Ok(Placement::Left),
            "right" => Ok(Placement::Right),
            _ => Err(ParsePlacementError(s.to_string())),
        }
    }
}

/// The side an overlay was actually placed on
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    Top,
    #[default]
    Bottom,
    Left,
    Right,
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Side::Top => "top",
            Side::Bottom => "bottom",
            Side::Left => "left",
            Side::Right => "right",
        };
        f.write_str(name)
    }
}

/// Priority order for `Auto` placement of fixed-size overlays
const AUTO_ORDER: [Side; 4] = [Side::Bottom, Side::Top, Side::Right, Side::Left];

/// Height rules for overlays whose height adapts to the available room
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct MenuSizing {
    /// Cap used when there is plenty of room
    pub default_max_height: f32,
    /// Floor for the computed cap
    pub min_height: f32,
    /// Room below the anchor that is always enough to open downwards
    pub comfortable_height: f32,
    /// Space kept free between the menu and the viewport edge
    pub viewport_padding: f32,
}

impl Default for MenuSizing {
    fn default() -> Self {
        Self::from(&MenuSettings::default())
    }
}

impl From<&MenuSettings> for MenuSizing {
    fn from(settings: &MenuSettings) -> Self {
        Self {
            default_max_height: settings.default_max_height,
            min_height: settings.min_height,
            comfortable_height: settings.comfortable_height,
            viewport_padding: settings.viewport_padding,
        }
    }
}

/// How the overlay's height behaves
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub enum OverlayFit {
    /// Height is whatever the content measures (poppers, tooltips)
    #[default]
    Fixed,
    /// Height is capped to the room on the chosen side (menus)
    Flexible(MenuSizing),
}

/// Inputs to [`compute_placement`]
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PlacementRequest {
    /// Anchor box in viewport coordinates (`None` when it cannot be measured)
    pub anchor: Option<AnchorRect>,
    /// Measured overlay content size
    pub overlay: Size,
    /// Viewport and page scroll offset
    pub viewport: Viewport,
    /// Requested side
    pub preferred: Placement,
    /// Minimum distance to the viewport edges
    pub margin: f32,
    /// Distance between overlay and anchor along the primary axis
    pub gap: f32,
    /// Fixed or flexible height
    pub fit: OverlayFit,
}

impl PlacementRequest {
    /// Request for a fixed-size popper with the default 8px gap and margin
    pub fn popper(anchor: Option<AnchorRect>, overlay: Size, viewport: Viewport) -> Self {
        Self {
            anchor,
            overlay,
            viewport,
            preferred: Placement::Auto,
            margin: 8.0,
            gap: 8.0,
            fit: OverlayFit::Fixed,
        }
    }

    /// Request for a flexible-height menu flush against its anchor
    pub fn menu(anchor: Option<AnchorRect>, overlay: Size, viewport: Viewport) -> Self {
        Self {
            anchor,
            overlay,
            viewport,
            preferred: Placement::Auto,
            margin: 8.0,
            gap: 0.0,
            fit: OverlayFit::Flexible(MenuSizing::default()),
        }
    }

    /// Apply margins, gaps and menu sizing from a config
    pub fn with_config(mut self, config: &PerchConfig) -> Self {
        self.margin = config.placement.margin;
        match self.fit {
            OverlayFit::Fixed => {
                self.gap = config.placement.popper_gap;
            }
            OverlayFit::Flexible(_) => {
                self.gap = config.menu.gap;
                self.fit = OverlayFit::Flexible(MenuSizing::from(&config.menu));
            }
        }
        self
    }

    /// Set the preferred side
    pub fn preferred(mut self, preferred: Placement) -> Self {
        self.preferred = preferred;
        self
    }

    /// Set the viewport margin
    pub fn margin(mut self, margin: f32) -> Self {
        self.margin = margin;
        self
    }

    /// Set the anchor gap
    pub fn gap(mut self, gap: f32) -> Self {
        self.gap = gap;
        self
    }
}

/// Where to render the overlay
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct PlacementResult {
    /// Top edge in page coordinates
    pub top: f32,
    /// Left edge in page coordinates
    pub left: f32,
    /// Side actually used
    pub placement: Side,
    /// Height cap for flexible overlays
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_height: Option<f32>,
}

/// Free room around the anchor, in viewport coordinates
#[derive(Clone, Copy, Debug, PartialEq)]
struct Space {
    above: f32,
    below: f32,
    left: f32,
    right: f32,
}

impl Space {
    fn around(anchor: &AnchorRect, viewport: &Viewport) -> Self {
        Self {
            above: anchor.top,
            below: viewport.height - anchor.bottom,
            left: anchor.left,
            right: viewport.width - anchor.right,
        }
    }

    fn toward(&self, side: Side) -> f32 {
        match side {
            Side::Top => self.above,
            Side::Bottom => self.below,
            Side::Left => self.left,
            Side::Right => self.right,
        }
    }
}

fn length(v: f32) -> f32 {
    if v.is_finite() {
        v.max(0.0)
    } else {
        0.0
    }
}

/// Compute the overlay position for a request
///
/// An unmeasurable anchor yields the zeroed default result.
pub fn compute_placement(request: &PlacementRequest) -> PlacementResult {
    let Some(anchor) = request.anchor.map(AnchorRect::normalized) else {
        return PlacementResult::default();
    };
    let viewport = request.viewport.normalized();
    let overlay = request.overlay.normalized();
    let margin = length(request.margin);
    let gap = length(request.gap);
    let space = Space::around(&anchor, &viewport);

    match request.fit {
        OverlayFit::Fixed => {
            let side = request
                .preferred
                .side()
                .unwrap_or_else(|| auto_side(&space, overlay, gap));
            let (top, left) = place_on_side(&anchor, overlay, side, gap, &viewport, margin);
            PlacementResult {
                top,
                left,
                placement: side,
                max_height: None,
            }
        }
        OverlayFit::Flexible(sizing) => {
            let side = request
                .preferred
                .side()
                .unwrap_or_else(|| auto_side_flexible(&space, &sizing));

            // Left/right menus are centered vertically, so the whole viewport
            // height is usable room.
            let room = match side {
                Side::Top | Side::Bottom => space.toward(side),
                Side::Left | Side::Right => viewport.height,
            };
            let max_height = (room - length(sizing.viewport_padding))
                .min(length(sizing.default_max_height))
                .max(length(sizing.min_height));

            let height = if overlay.height > 0.0 {
                overlay.height.min(max_height)
            } else {
                max_height
            };
            let size = Size::new(overlay.width, height);
            let (top, left) = place_on_side(&anchor, size, side, gap, &viewport, margin);

            PlacementResult {
                top,
                left,
                placement: side,
                max_height: Some(max_height),
            }
        }
    }
}

/// First side in priority order the overlay fits on, falling back to bottom
fn auto_side(space: &Space, overlay: Size, gap: f32) -> Side {
    AUTO_ORDER
        .iter()
        .copied()
        .find(|&side| {
            let extent = match side {
                Side::Top | Side::Bottom => overlay.height,
                Side::Left | Side::Right => overlay.width,
            };
            extent + gap < space.toward(side)
        })
        .unwrap_or(Side::Bottom)
}

/// Bottom unless the room above is clearly better
fn auto_side_flexible(space: &Space, sizing: &MenuSizing) -> Side {
    let wanted = sizing.default_max_height.min(space.above);
    if space.below >= wanted || space.below >= sizing.comfortable_height {
        Side::Bottom
    } else {
        Side::Top
    }
}

/// Candidate position for a side, clamped into the viewport (page coordinates)
fn place_on_side(
    anchor: &AnchorRect,
    overlay: Size,
    side: Side,
    gap: f32,
    viewport: &Viewport,
    margin: f32,
) -> (f32, f32) {
    let sx = viewport.scroll_x;
    let sy = viewport.scroll_y;

    let centered_left = anchor.left + sx + (anchor.width - overlay.width) / 2.0;
    let centered_top = anchor.top + sy + (anchor.height - overlay.height) / 2.0;

    let (top, left) = match side {
        Side::Top => (anchor.top + sy - overlay.height - gap, centered_left),
        Side::Bottom => (anchor.bottom + sy + gap, centered_left),
        Side::Left => (centered_top, anchor.left + sx - overlay.width - gap),
        Side::Right => (centered_top, anchor.right + sx + gap),
    };

    (
        clamp_axis(top, overlay.height, viewport.height, sy, margin),
        clamp_axis(left, overlay.width, viewport.width, sx, margin),
    )
}

/// Clamp one axis into `[scroll + margin, scroll + extent - size - margin]`
///
/// When the overlay is larger than the viewport the leading edge wins.
fn clamp_axis(value: f32, size: f32, extent: f32, scroll: f32, margin: f32) -> f32 {
    let lo = scroll + margin;
    let hi = scroll + extent - size - margin;
    value.min(hi).max(lo)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    const EPS: f32 = 1e-2;

    fn viewport() -> Viewport {
        Viewport::new(1200.0, 800.0)
    }

    #[test]
    fn test_auto_flips_to_top_near_bottom() {
        let anchor = AnchorRect::from_xywh(400.0, 750.0, 100.0, 30.0);
        let request = PlacementRequest::popper(Some(anchor), Size::new(200.0, 300.0), viewport());

        let result = compute_placement(&request);
        assert_eq!(result.placement, Side::Top);
        assert_eq!(result.top, 750.0 - 300.0 - 8.0);
        assert_eq!(result.max_height, None);
    }

    #[test]
    fn test_menu_flips_to_top_near_bottom() {
        let anchor = AnchorRect::from_xywh(400.0, 750.0, 100.0, 30.0);
        let request = PlacementRequest::menu(Some(anchor), Size::new(100.0, 300.0), viewport());

        let result = compute_placement(&request);
        assert_eq!(result.placement, Side::Top);
        // 750 above - 10 padding, capped at 300
        assert_eq!(result.max_height, Some(300.0));
        assert_eq!(result.top, 750.0 - 300.0);
    }

    #[test]
    fn test_auto_prefers_bottom() {
        let anchor = AnchorRect::from_xywh(400.0, 100.0, 100.0, 30.0);
        let request = PlacementRequest::popper(Some(anchor), Size::new(120.0, 60.0), viewport());

        let result = compute_placement(&request);
        assert_eq!(result.placement, Side::Bottom);
        assert_eq!(result.top, 130.0 + 8.0);
        // Centered: 400 + (100 - 120) / 2
        assert_eq!(result.left, 390.0);
    }

    #[test]
    fn test_auto_falls_through_to_right_then_left() {
        let tall = Size::new(100.0, 780.0);
        let near_left = AnchorRect::from_xywh(50.0, 390.0, 20.0, 20.0);
        let result = compute_placement(&PlacementRequest::popper(Some(near_left), tall, viewport()));
        assert_eq!(result.placement, Side::Right);
        assert_eq!(result.left, 70.0 + 8.0);

        let near_right = AnchorRect::from_xywh(1150.0, 390.0, 20.0, 20.0);
        let result = compute_placement(&PlacementRequest::popper(Some(near_right), tall, viewport()));
        assert_eq!(result.placement, Side::Left);
        assert_eq!(result.left, 1150.0 - 100.0 - 8.0);
    }

    #[test]
    fn test_auto_falls_back_to_bottom_when_nothing_fits() {
        let anchor = AnchorRect::from_xywh(500.0, 300.0, 100.0, 100.0);
        let huge = Size::new(1190.0, 790.0);
        let result = compute_placement(&PlacementRequest::popper(Some(anchor), huge, viewport()));
        assert_eq!(result.placement, Side::Bottom);
    }

    #[test]
    fn test_fit_test_is_strict() {
        // 92 + 8 == 100 below: does not fit
        let anchor = AnchorRect::from_xywh(500.0, 670.0, 100.0, 30.0);
        let result = compute_placement(&PlacementRequest::popper(
            Some(anchor),
            Size::new(50.0, 92.0),
            viewport(),
        ));
        assert_eq!(result.placement, Side::Top);
    }

    #[test]
    fn test_explicit_side_is_honored_and_clamped() {
        let anchor = AnchorRect::from_xywh(0.0, 10.0, 40.0, 20.0);
        let request = PlacementRequest::popper(Some(anchor), Size::new(200.0, 100.0), viewport())
            .preferred(Placement::Top);

        let result = compute_placement(&request);
        assert_eq!(result.placement, Side::Top);
        // Would be negative on both axes
        assert_eq!(result.top, 8.0);
        assert_eq!(result.left, 8.0);
    }

    #[test]
    fn test_scroll_offsets_produce_page_coordinates() {
        let anchor = AnchorRect::from_xywh(300.0, 100.0, 100.0, 30.0);
        let vp = viewport().with_scroll(20.0, 500.0);
        let result = compute_placement(&PlacementRequest::popper(
            Some(anchor),
            Size::new(100.0, 50.0),
            vp,
        ));

        assert_eq!(result.placement, Side::Bottom);
        assert_eq!(result.top, 500.0 + 130.0 + 8.0);
        assert_eq!(result.left, 20.0 + 300.0);
    }

    #[test]
    fn test_clamps_right_edge() {
        let anchor = AnchorRect::from_xywh(1150.0, 100.0, 40.0, 20.0);
        let result = compute_placement(&PlacementRequest::popper(
            Some(anchor),
            Size::new(300.0, 50.0),
            viewport(),
        ));
        assert_eq!(result.left, 1200.0 - 300.0 - 8.0);
    }

    #[test]
    fn test_menu_height_floor() {
        // Only 40px below, 35px above: cap collapses, floor keeps 100
        let vp = Viewport::new(800.0, 100.0);
        let anchor = AnchorRect::from_xywh(10.0, 35.0, 200.0, 25.0);
        let result = compute_placement(&PlacementRequest::menu(
            Some(anchor),
            Size::new(200.0, 0.0),
            vp,
        ));
        assert_eq!(result.max_height, Some(100.0));
    }

    #[test]
    fn test_menu_uses_comfortable_room_below() {
        // 160 below beats the 150 threshold even though above has more room
        let anchor = AnchorRect::from_xywh(10.0, 610.0, 200.0, 30.0);
        let result = compute_placement(&PlacementRequest::menu(
            Some(anchor),
            Size::new(200.0, 400.0),
            viewport(),
        ));
        assert_eq!(result.placement, Side::Bottom);
        assert_eq!(result.max_height, Some(150.0));
    }

    #[test]
    fn test_menu_unmeasured_content_uses_cap() {
        let anchor = AnchorRect::from_xywh(10.0, 600.0, 200.0, 30.0);
        let result = compute_placement(
            &PlacementRequest::menu(Some(anchor), Size::new(200.0, 0.0), viewport())
                .preferred(Placement::Top),
        );
        assert_eq!(result.max_height, Some(300.0));
        assert_eq!(result.top, 600.0 - 300.0);
    }

    #[test]
    fn test_menu_short_content_sits_flush_above() {
        let anchor = AnchorRect::from_xywh(10.0, 600.0, 200.0, 30.0);
        let result = compute_placement(
            &PlacementRequest::menu(Some(anchor), Size::new(200.0, 80.0), viewport())
                .preferred(Placement::Top),
        );
        assert_eq!(result.top, 520.0);
    }

    #[test]
    fn test_unmeasurable_anchor_degrades_to_default() {
        let request = PlacementRequest::popper(None, Size::new(10.0, 10.0), viewport());
        assert_eq!(compute_placement(&request), PlacementResult::default());
    }

    #[test]
    fn test_non_finite_inputs_are_normalized() {
        let anchor = AnchorRect::from_xywh(f32::NAN, 100.0, 50.0, 20.0);
        let request = PlacementRequest::popper(Some(anchor), Size::new(f32::INFINITY, 40.0), viewport())
            .margin(f32::NAN);
        let result = compute_placement(&request);
        assert!(result.top.is_finite());
        assert!(result.left.is_finite());
    }

    #[test]
    fn test_with_config() {
        let mut config = PerchConfig::default();
        config.placement.margin = 16.0;
        config.menu.default_max_height = 200.0;

        let anchor = AnchorRect::from_xywh(0.0, 10.0, 100.0, 20.0);
        let request = PlacementRequest::menu(Some(anchor), Size::new(100.0, 0.0), viewport())
            .with_config(&config);

        let result = compute_placement(&request);
        assert_eq!(result.max_height, Some(200.0));
        assert_eq!(result.left, 16.0);
    }

    #[test]
    fn test_placement_from_str() {
        assert_eq!("auto".parse::<Placement>(), Ok(Placement::Auto));
        assert_eq!(" Left ".parse::<Placement>(), Ok(Placement::Left));
        assert!("diagonal".parse::<Placement>().is_err());
    }

    fn any_placement() -> impl Strategy<Value = Placement> {
        prop_oneof![
            Just(Placement::Auto),
            Just(Placement::Top),
            Just(Placement::Bottom),
            Just(Placement::Left),
            Just(Placement::Right),
        ]
    }

    proptest! {
        #[test]
        fn prop_popper_stays_inside_viewport(
            vw in 200.0f32..2000.0,
            vh in 200.0f32..2000.0,
            sx in 0.0f32..500.0,
            sy in 0.0f32..1000.0,
            ax in -500.0f32..2500.0,
            ay in -500.0f32..2500.0,
            aw in 0.0f32..300.0,
            ah in 0.0f32..300.0,
            w_frac in 0.0f32..1.0,
            h_frac in 0.0f32..1.0,
            margin in 0.0f32..40.0,
            preferred in any_placement(),
        ) {
            let vp = Viewport::new(vw, vh).with_scroll(sx, sy);
            let overlay = Size::new((vw - 2.0 * margin) * w_frac, (vh - 2.0 * margin) * h_frac);
            let anchor = AnchorRect::from_xywh(ax, ay, aw, ah);
            let request = PlacementRequest::popper(Some(anchor), overlay, vp)
                .preferred(preferred)
                .margin(margin);

            let result = compute_placement(&request);
            let left = result.left - sx;
            let top = result.top - sy;

            prop_assert!(left >= margin - EPS);
            prop_assert!(left + overlay.width <= vw - margin + EPS);
            prop_assert!(top >= margin - EPS);
            prop_assert!(top + overlay.height <= vh - margin + EPS);
        }

        #[test]
        fn prop_menu_stays_inside_viewport(
            vh in 400.0f32..2000.0,
            ay in 0.0f32..2000.0,
            content in 0.0f32..1000.0,
            preferred in any_placement(),
        ) {
            let vp = Viewport::new(1000.0, vh);
            let anchor = AnchorRect::from_xywh(100.0, ay.min(vh - 20.0), 200.0, 20.0);
            let request = PlacementRequest::menu(Some(anchor), Size::new(200.0, content), vp)
                .preferred(preferred);

            let result = compute_placement(&request);
            let max_height = result.max_height.unwrap_or(0.0);
            prop_assert!(max_height >= 100.0);

            let rendered = if content > 0.0 { content.min(max_height) } else { max_height };
            prop_assert!(result.top >= 8.0 - EPS);
            prop_assert!(result.top + rendered <= vh - 8.0 + EPS);
        }

        #[test]
        fn prop_compute_is_deterministic(
            ax in -100.0f32..1300.0,
            ay in -100.0f32..900.0,
            w in 0.0f32..600.0,
            h in 0.0f32..600.0,
            preferred in any_placement(),
            flexible in any::<bool>(),
        ) {
            let anchor = AnchorRect::from_xywh(ax, ay, 80.0, 24.0);
            let base = if flexible {
                PlacementRequest::menu(Some(anchor), Size::new(w, h), viewport())
            } else {
                PlacementRequest::popper(Some(anchor), Size::new(w, h), viewport())
            };
            let request = base.preferred(preferred);

            let a = compute_placement(&request);
            let b = compute_placement(&request);
            prop_assert_eq!(a.top.to_bits(), b.top.to_bits());
            prop_assert_eq!(a.left.to_bits(), b.left.to_bits());
            prop_assert_eq!(a.placement, b.placement);
            prop_assert_eq!(a.max_height.map(f32::to_bits), b.max_height.map(f32::to_bits));
        }
    }
}
