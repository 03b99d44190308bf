//! Aspect-constrained crop rectangle geometry.
//!
//! All functions here are pure and total: they take an image size, a
//! target aspect, and rectangle inputs, and always return a rectangle
//! satisfying the crop invariants. Degenerate requests (too-small
//! resizes, out-of-bounds positions) are resolved by clamping, never by
//! reporting an error.
//!
//! # Coordinate System
//!
//! - Image-pixel coordinates, origin at the top-left corner
//! - `x` grows rightward, `y` grows downward
//! - Rectangle values are float-valued; rounding happens at render time

use serde::{Deserialize, Serialize};

/// Minimum crop rectangle width in image pixels.
///
/// Prevents degenerate crops during interactive resizing. Images
/// narrower than this cannot hold such a rectangle; bounds clamping
/// then wins over the minimum.
pub const MIN_CROP_SIZE: f64 = 30.0;

/// Relative tolerance for aspect ratio comparisons.
pub const ASPECT_TOLERANCE: f64 = 1e-3;

/// The sub-region of an image that becomes the final output.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CropRect {
    /// Left edge in image pixels.
    pub x: f64,
    /// Top edge in image pixels.
    pub y: f64,
    /// Width in image pixels (positive).
    pub width: f64,
    /// Height in image pixels (positive).
    pub height: f64,
}

impl CropRect {
    pub fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Right edge (`x + width`).
    pub fn right(&self) -> f64 {
        self.x + self.width
    }

    /// Bottom edge (`y + height`).
    pub fn bottom(&self) -> f64 {
        self.y + self.height
    }

    /// Center point of the rectangle.
    pub fn center(&self) -> (f64, f64) {
        (self.x + self.width / 2.0, self.y + self.height / 2.0)
    }

    /// Whether a point lies inside the rectangle (edges inclusive).
    pub fn contains(&self, x: f64, y: f64) -> bool {
        x >= self.x && x <= self.right() && y >= self.y && y <= self.bottom()
    }

    /// Coordinates of the given corner.
    pub fn corner(&self, handle: Handle) -> (f64, f64) {
        match handle {
            Handle::Nw => (self.x, self.y),
            Handle::Ne => (self.right(), self.y),
            Handle::Sw => (self.x, self.bottom()),
            Handle::Se => (self.right(), self.bottom()),
        }
    }

    /// Width over height.
    pub fn aspect(&self) -> f64 {
        self.width / self.height
    }
}

/// A detector-reported rectangle indicating where a face was found.
///
/// Produced by an external detector; its bounds are not guaranteed to
/// lie inside the image and must be clamped downstream.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FaceBox {
    /// Left edge in image pixels.
    pub origin_x: f64,
    /// Top edge in image pixels.
    pub origin_y: f64,
    /// Width in image pixels.
    pub width: f64,
    /// Height in image pixels.
    pub height: f64,
}

impl FaceBox {
    pub fn new(origin_x: f64, origin_y: f64, width: f64, height: f64) -> Self {
        Self {
            origin_x,
            origin_y,
            width,
            height,
        }
    }

    /// Center point of the box, the focus for face-centered crops.
    pub fn center(&self) -> (f64, f64) {
        (
            self.origin_x + self.width / 2.0,
            self.origin_y + self.height / 2.0,
        )
    }
}

/// One of the four interactive corner grips of the crop rectangle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Handle {
    /// Top-left corner.
    Nw,
    /// Top-right corner.
    Ne,
    /// Bottom-left corner.
    Sw,
    /// Bottom-right corner.
    Se,
}

impl Handle {
    /// Hit-test priority order used by the editor.
    pub const ALL: [Handle; 4] = [Handle::Nw, Handle::Ne, Handle::Sw, Handle::Se];

    /// The corner held fixed while this handle is dragged.
    pub fn opposite(self) -> Handle {
        match self {
            Handle::Nw => Handle::Se,
            Handle::Ne => Handle::Sw,
            Handle::Sw => Handle::Ne,
            Handle::Se => Handle::Nw,
        }
    }
}

/// Compute the default crop rectangle for an image.
///
/// Returns the largest rectangle of ratio `aspect` that fits inside a
/// `image_width` x `image_height` image. When `focus` is given
/// (typically a face-box center) the rectangle is positioned so its
/// center is as close to the focus as image bounds allow; otherwise it
/// is centered on the image.
///
/// Deterministic for a given input tuple.
pub fn derive_default_rect(
    image_width: f64,
    image_height: f64,
    aspect: f64,
    focus: Option<(f64, f64)>,
) -> CropRect {
    // Fit: constrain by height when the image is wider than the target
    // ratio, by width otherwise.
    let (crop_w, crop_h) = if image_width / image_height > aspect {
        (image_height * aspect, image_height)
    } else {
        (image_width, image_width / aspect)
    };

    let (x, y) = match focus {
        Some((fx, fy)) => (
            (fx - crop_w / 2.0).min(image_width - crop_w).max(0.0),
            (fy - crop_h / 2.0).min(image_height - crop_h).max(0.0),
        ),
        None => ((image_width - crop_w) / 2.0, (image_height - crop_h) / 2.0),
    };

    CropRect::new(x, y, crop_w, crop_h)
}

/// Translate a rectangle so it lies fully inside the image.
///
/// Width and height are never altered; only the position moves. A rect
/// larger than the image (a caller precondition violation) lands at the
/// origin with its size unchanged.
pub fn clamp_rect(rect: CropRect, image_width: f64, image_height: f64) -> CropRect {
    CropRect {
        x: rect.x.min(image_width - rect.width).max(0.0),
        y: rect.y.min(image_height - rect.height).max(0.0),
        ..rect
    }
}

/// Resize a rectangle from one corner while holding the opposite corner
/// fixed.
///
/// `delta` is the horizontal image-space movement of the dragged
/// corner; the height is always re-derived from the new width as
/// `width / aspect`. Policy, in order:
///
/// 1. Clamp the requested width to [`MIN_CROP_SIZE`].
/// 2. If the growing side would cross an image edge, shrink the
///    rectangle so it touches that edge exactly (never translate).
///    The overflowing axis is resolved first, then the other axis is
///    rechecked and may shrink further.
///
/// The result always satisfies the crop invariants.
pub fn resize_from_handle(
    rect: CropRect,
    handle: Handle,
    delta: f64,
    aspect: f64,
    image_width: f64,
    image_height: f64,
) -> CropRect {
    let CropRect {
        x: cx,
        y: cy,
        width: cw,
        height: ch,
    } = rect;

    match handle {
        Handle::Se => {
            let mut new_w = (cw + delta).max(MIN_CROP_SIZE);
            let mut new_h = new_w / aspect;
            if cy + new_h > image_height {
                new_h = image_height - cy;
                new_w = new_h * aspect;
            }
            if cx + new_w > image_width {
                new_w = image_width - cx;
                new_h = new_w / aspect;
            }
            CropRect::new(cx, cy, new_w, new_h)
        }
        Handle::Nw => {
            let mut new_w = (cw - delta).max(MIN_CROP_SIZE);
            let mut new_h = new_w / aspect;
            let mut new_x = cx + (cw - new_w);
            let mut new_y = cy + (ch - new_h);
            if new_x < 0.0 {
                new_x = 0.0;
                new_w = cx + cw;
                new_h = new_w / aspect;
                new_y = cy + ch - new_h;
            }
            if new_y < 0.0 {
                new_y = 0.0;
                new_h = cy + ch;
                new_w = new_h * aspect;
                new_x = cx + cw - new_w;
            }
            CropRect::new(new_x, new_y, new_w, new_h)
        }
        Handle::Ne => {
            let mut new_w = (cw + delta).max(MIN_CROP_SIZE);
            let mut new_h = new_w / aspect;
            let mut new_y = cy + (ch - new_h);
            if cx + new_w > image_width {
                new_w = image_width - cx;
                new_h = new_w / aspect;
                new_y = cy + ch - new_h;
            }
            if new_y < 0.0 {
                new_y = 0.0;
                new_h = cy + ch;
                new_w = new_h * aspect;
            }
            CropRect::new(cx, new_y, new_w, new_h)
        }
        Handle::Sw => {
            let mut new_w = (cw - delta).max(MIN_CROP_SIZE);
            let mut new_h = new_w / aspect;
            let mut new_x = cx + (cw - new_w);
            if new_x < 0.0 {
                new_x = 0.0;
                new_w = cx + cw;
                new_h = new_w / aspect;
            }
            if cy + new_h > image_height {
                new_h = image_height - cy;
                new_w = new_h * aspect;
                new_x = cx + cw - new_w;
            }
            CropRect::new(new_x, cy, new_w, new_h)
        }
    }
}


// ============================================================================
// Property-Based Tests
// ============================================================================

#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    /// Strategy for image dimensions large enough to hold a minimum crop.
    fn dimensions_strategy() -> impl Strategy<Value = (f64, f64)> {
        (100.0f64..4000.0, 100.0f64..4000.0)
    }

    /// Strategy over the supported aspect values plus arbitrary ones.
    fn aspect_strategy() -> impl Strategy<Value = f64> {
        prop_oneof![
            Just(1.0),
            Just(4.0 / 5.0),
            Just(3.0 / 4.0),
            Just(9.0 / 16.0),
            Just(16.0 / 9.0),
            0.25f64..4.0,
        ]
    }

    fn rel_aspect_error(rect: &CropRect, aspect: f64) -> f64 {
        (rect.aspect() - aspect).abs() / aspect
    }

    proptest! {
        /// Property: derived rects satisfy every crop invariant.
        #[test]
        fn prop_derive_satisfies_invariants(
            (w, h) in dimensions_strategy(),
            aspect in aspect_strategy(),
            focus in proptest::option::of((0.0f64..4000.0, 0.0f64..4000.0)),
        ) {
            let rect = derive_default_rect(w, h, aspect, focus);

            prop_assert!(rect.width > 0.0 && rect.height > 0.0);
            prop_assert!(rel_aspect_error(&rect, aspect) <= ASPECT_TOLERANCE);
            prop_assert!(rect.x >= -1e-9);
            prop_assert!(rect.y >= -1e-9);
            prop_assert!(rect.right() <= w + 1e-9);
            prop_assert!(rect.bottom() <= h + 1e-9);
        }

        /// Property: without a focus the derived rect is image-centered.
        #[test]
        fn prop_derive_centered_without_focus(
            (w, h) in dimensions_strategy(),
            aspect in aspect_strategy(),
        ) {
            let rect = derive_default_rect(w, h, aspect, None);
            let (cx, cy) = rect.center();
            prop_assert!((cx - w / 2.0).abs() < 1e-6);
            prop_assert!((cy - h / 2.0).abs() < 1e-6);
        }

        /// Property: derivation is deterministic.
        #[test]
        fn prop_derive_deterministic(
            (w, h) in dimensions_strategy(),
            aspect in aspect_strategy(),
            focus in proptest::option::of((0.0f64..4000.0, 0.0f64..4000.0)),
        ) {
            let a = derive_default_rect(w, h, aspect, focus);
            let b = derive_default_rect(w, h, aspect, focus);
            prop_assert_eq!(a, b);
        }

        /// Property: clamping never changes width or height and always
        /// lands the rect inside the image.
        #[test]
        fn prop_clamp_translates_only(
            (w, h) in dimensions_strategy(),
            aspect in aspect_strategy(),
            dx in -5000.0f64..5000.0,
            dy in -5000.0f64..5000.0,
        ) {
            let rect = derive_default_rect(w, h, aspect, None);
            let moved = CropRect::new(rect.x + dx, rect.y + dy, rect.width, rect.height);
            let clamped = clamp_rect(moved, w, h);

            prop_assert_eq!(clamped.width, rect.width);
            prop_assert_eq!(clamped.height, rect.height);
            prop_assert!(clamped.x >= 0.0);
            prop_assert!(clamped.y >= 0.0);
            prop_assert!(clamped.right() <= w + 1e-9);
            prop_assert!(clamped.bottom() <= h + 1e-9);
        }

        /// Property: clamping an already-contained rect is the identity.
        #[test]
        fn prop_clamp_idempotent(
            (w, h) in dimensions_strategy(),
            aspect in aspect_strategy(),
            dx in -5000.0f64..5000.0,
            dy in -5000.0f64..5000.0,
        ) {
            let rect = derive_default_rect(w, h, aspect, None);
            let moved = CropRect::new(rect.x + dx, rect.y + dy, rect.width, rect.height);
            let once = clamp_rect(moved, w, h);
            let twice = clamp_rect(once, w, h);
            prop_assert_eq!(once, twice);
        }

        /// Property: resized rects satisfy every crop invariant.
        #[test]
        fn prop_resize_satisfies_invariants(
            (w, h) in dimensions_strategy(),
            aspect in aspect_strategy(),
            handle_idx in 0usize..4,
            delta in -2000.0f64..2000.0,
        ) {
            let rect = derive_default_rect(w, h, aspect, None);
            let handle = Handle::ALL[handle_idx];
            let out = resize_from_handle(rect, handle, delta, aspect, w, h);

            prop_assert!(out.width > 0.0 && out.height > 0.0);
            prop_assert!(rel_aspect_error(&out, aspect) <= ASPECT_TOLERANCE);
            prop_assert!(out.x >= -1e-9);
            prop_assert!(out.y >= -1e-9);
            prop_assert!(out.right() <= w + 1e-9);
            prop_assert!(out.bottom() <= h + 1e-9);
        }

        /// Property: zero delta never moves the rect.
        #[test]
        fn prop_resize_zero_delta_identity(
            (w, h) in dimensions_strategy(),
            aspect in aspect_strategy(),
            handle_idx in 0usize..4,
        ) {
            let rect = derive_default_rect(w, h, aspect, None);
            let handle = Handle::ALL[handle_idx];
            let out = resize_from_handle(rect, handle, 0.0, aspect, w, h);

            prop_assert!((out.x - rect.x).abs() < 1e-9);
            prop_assert!((out.y - rect.y).abs() < 1e-9);
            prop_assert!((out.width - rect.width).abs() < 1e-9);
            prop_assert!((out.height - rect.height).abs() < 1e-9);
        }

        /// Property: interior shrinks hold the opposite corner fixed.
        #[test]
        fn prop_resize_fixes_opposite_corner(
            handle_idx in 0usize..4,
            delta_mag in 1.0f64..50.0,
        ) {
            // A rect well clear of every edge, shrunk by less than the
            // headroom above MIN_CROP_SIZE, never touches a boundary.
            let rect = CropRect::new(400.0, 400.0, 200.0, 200.0);
            let handle = Handle::ALL[handle_idx];
            let delta = match handle {
                Handle::Se | Handle::Ne => -delta_mag,
                Handle::Nw | Handle::Sw => delta_mag,
            };
            let out = resize_from_handle(rect, handle, delta, 1.0, 1000.0, 1000.0);

            let fixed = handle.opposite();
            let (bx, by) = rect.corner(fixed);
            let (ax, ay) = out.corner(fixed);
            prop_assert!((ax - bx).abs() < 1e-9);
            prop_assert!((ay - by).abs() < 1e-9);
        }
    }
}
