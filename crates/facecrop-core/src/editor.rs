//! Interactive crop rectangle editing.
//!
//! An [`EditSession`] is a pointer-driven state machine over a single
//! crop rectangle. Pointer events arrive in display coordinates and are
//! translated into image-pixel space via the session's display scale;
//! all rectangle math is delegated to [`crate::geometry`], so every
//! intermediate rectangle satisfies the crop invariants.
//!
//! The machine has three states: idle, dragging the whole rectangle,
//! and resizing from one corner handle. All transitions are synchronous
//! with the input events; the machine never suspends mid-gesture.

use crate::geometry::{clamp_rect, derive_default_rect, resize_from_handle, CropRect, Handle};
use crate::ratio::AspectRatio;

/// Minimum corner handle side length in display pixels.
pub const MIN_HANDLE_SIZE: f64 = 8.0;

/// Handle side length as a fraction of the smaller displayed rect edge.
pub const HANDLE_SIZE_FRACTION: f64 = 0.06;

/// Current pointer-interaction state of an edit session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EditorState {
    /// No gesture in progress. Initial and terminal between gestures.
    #[default]
    Idle,
    /// The whole rectangle follows the pointer.
    Dragging,
    /// One corner follows the pointer; the opposite corner is fixed.
    Resizing(Handle),
}

/// An in-progress interactive edit of one image's crop rectangle.
///
/// Ephemeral: created when the editor opens, resolved into a saved
/// manual crop or discarded on close. The session owns the in-progress
/// rectangle; the caller decides what to do with [`EditSession::rect`]
/// when the session ends.
#[derive(Debug, Clone)]
pub struct EditSession {
    image_width: f64,
    image_height: f64,
    aspect: AspectRatio,
    rect: CropRect,
    /// `displayed_canvas_width / image_width`.
    scale: f64,
    state: EditorState,
    /// Last pointer position in display coordinates, recorded on
    /// pointer-down and updated on every move (incremental deltas).
    last_pointer: Option<(f64, f64)>,
}

impl EditSession {
    /// Open an edit session.
    ///
    /// The starting rectangle is `initial` when the record already has
    /// a manual crop, otherwise the default derived for `focus` (a
    /// face-box center) or the plain image center.
    pub fn new(
        image_width: f64,
        image_height: f64,
        aspect: AspectRatio,
        initial: Option<CropRect>,
        focus: Option<(f64, f64)>,
        display_width: f64,
    ) -> Self {
        let rect = initial.unwrap_or_else(|| {
            derive_default_rect(image_width, image_height, aspect.value(), focus)
        });
        Self {
            image_width,
            image_height,
            aspect,
            rect,
            scale: display_width / image_width,
            state: EditorState::Idle,
            last_pointer: None,
        }
    }

    /// The in-progress crop rectangle, in image-pixel coordinates.
    pub fn rect(&self) -> CropRect {
        self.rect
    }

    /// Current pointer-interaction state.
    pub fn state(&self) -> EditorState {
        self.state
    }

    /// The target aspect ratio this session preserves.
    pub fn aspect(&self) -> AspectRatio {
        self.aspect
    }

    /// Display scale factor applied to image coordinates.
    pub fn scale(&self) -> f64 {
        self.scale
    }

    /// Side length of the corner handle hit zones in display pixels.
    pub fn handle_size(&self) -> f64 {
        let sw = self.rect.width * self.scale;
        let sh = self.rect.height * self.scale;
        (sw.min(sh) * HANDLE_SIZE_FRACTION).round().max(MIN_HANDLE_SIZE)
    }

    /// Hit-test a display-space point against the corner handles, in
    /// fixed priority order: nw, ne, sw, se.
    pub fn hit_test_handle(&self, x: f64, y: f64) -> Option<Handle> {
        let size = self.handle_size();
        Handle::ALL.into_iter().find(|&handle| {
            let (cx, cy) = self.rect.corner(handle);
            let (hx, hy) = (cx * self.scale, cy * self.scale);
            (x - hx).abs() <= size && (y - hy).abs() <= size
        })
    }

    /// Begin a gesture at a display-space point.
    ///
    /// Enters `Resizing` on a handle hit, `Dragging` inside the
    /// rectangle, and stays `Idle` elsewhere. The pointer position is
    /// recorded in every case.
    pub fn pointer_down(&mut self, x: f64, y: f64) {
        self.state = if let Some(handle) = self.hit_test_handle(x, y) {
            EditorState::Resizing(handle)
        } else if self.rect.contains(x / self.scale, y / self.scale) {
            EditorState::Dragging
        } else {
            EditorState::Idle
        };
        self.last_pointer = Some((x, y));
    }

    /// Continue the active gesture at a display-space point.
    ///
    /// Deltas are applied incrementally against the last recorded
    /// position, which is then advanced to the current one, so the
    /// rectangle never drifts from the pointer over a long gesture.
    pub fn pointer_move(&mut self, x: f64, y: f64) {
        let Some((lx, ly)) = self.last_pointer else {
            return;
        };
        let dx = (x - lx) / self.scale;
        let dy = (y - ly) / self.scale;

        match self.state {
            EditorState::Idle => return,
            EditorState::Dragging => {
                let moved = CropRect {
                    x: self.rect.x + dx,
                    y: self.rect.y + dy,
                    ..self.rect
                };
                self.rect = clamp_rect(moved, self.image_width, self.image_height);
            }
            EditorState::Resizing(handle) => {
                self.rect = resize_from_handle(
                    self.rect,
                    handle,
                    dx,
                    self.aspect.value(),
                    self.image_width,
                    self.image_height,
                );
            }
        }
        self.last_pointer = Some((x, y));
    }

    /// End the active gesture, returning to `Idle`.
    pub fn pointer_up(&mut self) {
        self.state = EditorState::Idle;
        self.last_pointer = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::MIN_CROP_SIZE;

    /// A 1000x1000 image displayed at half size, square crop.
    fn session() -> EditSession {
        EditSession::new(1000.0, 1000.0, AspectRatio::default(), None, None, 500.0)
    }

    #[test]
    fn test_initial_rect_is_derived_default() {
        let s = session();
        assert_eq!(s.rect(), CropRect::new(0.0, 0.0, 1000.0, 1000.0));
        assert_eq!(s.state(), EditorState::Idle);
    }

    #[test]
    fn test_initial_rect_prefers_manual_crop() {
        let manual = CropRect::new(100.0, 100.0, 300.0, 300.0);
        let s = EditSession::new(
            1000.0,
            1000.0,
            AspectRatio::default(),
            Some(manual),
            Some((900.0, 900.0)),
            500.0,
        );
        assert_eq!(s.rect(), manual);
    }

    #[test]
    fn test_initial_rect_uses_focus_without_manual() {
        let s = EditSession::new(
            1000.0,
            2000.0,
            AspectRatio::default(),
            None,
            Some((500.0, 1800.0)),
            500.0,
        );
        assert_eq!(s.rect().y, 1000.0);
    }

    #[test]
    fn test_down_outside_rect_stays_idle() {
        let mut s = EditSession::new(
            2000.0,
            1000.0,
            AspectRatio::default(),
            None,
            None,
            1000.0,
        );
        // Crop is the centered 1000x1000 (display 500x500 at x=250);
        // a point left of it hits nothing.
        s.pointer_down(50.0, 250.0);
        assert_eq!(s.state(), EditorState::Idle);

        // Moves in idle with a recorded position must not mutate.
        let before = s.rect();
        s.pointer_move(60.0, 260.0);
        assert_eq!(s.rect(), before);
    }

    #[test]
    fn test_drag_translates_and_clamps() {
        let mut s = EditSession::new(
            2000.0,
            1000.0,
            AspectRatio::default(),
            None,
            None,
            1000.0,
        );
        let start = s.rect();
        assert_eq!(start.x, 500.0);

        // Down in the middle of the displayed rect, drag left 100
        // display px = 200 image px.
        s.pointer_down(500.0, 250.0);
        assert_eq!(s.state(), EditorState::Dragging);
        s.pointer_move(400.0, 250.0);
        assert_eq!(s.rect().x, 300.0);
        assert_eq!(s.rect().y, 0.0);

        // Keep dragging far past the left edge: clamped at 0.
        s.pointer_move(-500.0, 250.0);
        assert_eq!(s.rect().x, 0.0);
        assert_eq!(s.rect().width, start.width);

        s.pointer_up();
        assert_eq!(s.state(), EditorState::Idle);
    }

    #[test]
    fn test_drag_deltas_are_incremental() {
        let mut s = EditSession::new(
            2000.0,
            1000.0,
            AspectRatio::default(),
            None,
            None,
            1000.0,
        );
        s.pointer_down(500.0, 250.0);
        // Two 10px moves must equal one 20px move.
        s.pointer_move(510.0, 250.0);
        s.pointer_move(520.0, 250.0);
        let x_after_two = s.rect().x;

        let mut s2 = EditSession::new(
            2000.0,
            1000.0,
            AspectRatio::default(),
            None,
            None,
            1000.0,
        );
        s2.pointer_down(500.0, 250.0);
        s2.pointer_move(520.0, 250.0);
        assert_eq!(x_after_two, s2.rect().x);
    }

    #[test]
    fn test_handle_hit_priority_and_resize() {
        let manual = CropRect::new(200.0, 200.0, 400.0, 400.0);
        let mut s = EditSession::new(
            1000.0,
            1000.0,
            AspectRatio::default(),
            Some(manual),
            None,
            1000.0,
        );
        // Display scale 1.0: SE corner at (600, 600).
        assert_eq!(s.hit_test_handle(600.0, 600.0), Some(Handle::Se));
        assert_eq!(s.hit_test_handle(200.0, 200.0), Some(Handle::Nw));
        assert_eq!(s.hit_test_handle(400.0, 400.0), None);

        s.pointer_down(600.0, 600.0);
        assert_eq!(s.state(), EditorState::Resizing(Handle::Se));

        s.pointer_move(700.0, 700.0);
        let r = s.rect();
        assert_eq!(r.x, 200.0);
        assert_eq!(r.y, 200.0);
        assert_eq!(r.width, 500.0);
        assert_eq!(r.height, 500.0);

        s.pointer_up();
        assert_eq!(s.state(), EditorState::Idle);
    }

    #[test]
    fn test_resize_preserves_aspect() {
        let aspect: AspectRatio = "16:9".parse().unwrap();
        let mut s = EditSession::new(1920.0, 1080.0, aspect, None, None, 960.0);
        // Shrink from the SE handle (displayed at 960, 540).
        s.pointer_down(960.0, 540.0);
        assert_eq!(s.state(), EditorState::Resizing(Handle::Se));
        s.pointer_move(800.0, 540.0);

        let r = s.rect();
        let rel = (r.aspect() - aspect.value()).abs() / aspect.value();
        assert!(rel <= 1e-3, "aspect drifted to {}", r.aspect());
        assert!(r.width >= MIN_CROP_SIZE);
    }

    #[test]
    fn test_handle_size_floor() {
        // Tiny displayed rect: handle size bottoms out at the minimum.
        let manual = CropRect::new(0.0, 0.0, 40.0, 40.0);
        let s = EditSession::new(
            1000.0,
            1000.0,
            AspectRatio::default(),
            Some(manual),
            None,
            500.0,
        );
        assert_eq!(s.handle_size(), MIN_HANDLE_SIZE);
    }

    #[test]
    fn test_handle_size_scales_with_rect() {
        let manual = CropRect::new(0.0, 0.0, 500.0, 500.0);
        let s = EditSession::new(
            1000.0,
            1000.0,
            AspectRatio::default(),
            Some(manual),
            None,
            1000.0,
        );
        // 0.06 * 500 = 30
        assert_eq!(s.handle_size(), 30.0);
    }

    #[test]
    fn test_move_without_down_is_ignored() {
        let mut s = session();
        let before = s.rect();
        s.pointer_move(100.0, 100.0);
        assert_eq!(s.rect(), before);
        assert_eq!(s.state(), EditorState::Idle);
    }

    #[test]
    fn test_up_clears_gesture_state() {
        let mut s = session();
        s.pointer_down(250.0, 250.0);
        assert_eq!(s.state(), EditorState::Dragging);
        s.pointer_up();
        // A move after up must be inert until the next down.
        let before = s.rect();
        s.pointer_move(300.0, 300.0);
        assert_eq!(s.rect(), before);
    }

    #[test]
    fn test_full_gesture_keeps_invariants() {
        let aspect: AspectRatio = "4:5".parse().unwrap();
        let mut s = EditSession::new(1200.0, 900.0, aspect, None, None, 600.0);

        // Synthetic gesture: grab SE handle, sweep outward and back.
        let (cx, cy) = s.rect().corner(Handle::Se);
        s.pointer_down(cx * s.scale(), cy * s.scale());
        for step in [650.0, 700.0, 500.0, 300.0, 100.0, 400.0] {
            s.pointer_move(step, 400.0);
            let r = s.rect();
            assert!(r.width > 0.0 && r.height > 0.0);
            assert!(r.x >= -1e-9 && r.y >= -1e-9);
            assert!(r.right() <= 1200.0 + 1e-9);
            assert!(r.bottom() <= 900.0 + 1e-9);
            let rel = (r.aspect() - aspect.value()).abs() / aspect.value();
            assert!(rel <= 1e-3);
        }
        s.pointer_up();
    }
}
