//! Facecrop Core - Aspect-constrained crop engine
//!
//! This crate provides the geometry, interactive editing, and rendering
//! core for Facecrop: deriving an aspect-true crop rectangle from an
//! image (optionally centered on a detected face), editing that
//! rectangle under invariant-preserving drag and corner-resize
//! gestures, and compositing previews and final exports.
//!
//! Everything here is synchronous and free of shared mutable state;
//! the async per-image orchestration lives in `facecrop-session`.

pub mod compositor;
pub mod editor;
pub mod geometry;
pub mod raster;
pub mod ratio;

pub use compositor::{Compositor, EncodedFormat, EncodedImage, RenderError};
pub use editor::{EditSession, EditorState};
pub use geometry::{
    clamp_rect, derive_default_rect, resize_from_handle, CropRect, FaceBox, Handle, MIN_CROP_SIZE,
};
pub use raster::{load_image, LoadError, RasterImage};
pub use ratio::{AspectRatio, RatioParseError, SUPPORTED_RATIOS};
