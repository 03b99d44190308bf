//! Facecrop Session - batch crop orchestration
//!
//! This crate drives the per-image crop workflow on top of
//! `facecrop-core`: uploaded files become [`record::ImageRecord`]s,
//! face detection runs once per image through the pluggable
//! [`detector::FaceDetector`] seam, and the [`pipeline::CropPipeline`]
//! keeps previews and exports consistent with the selected aspect
//! ratio and any manual crop overrides.

pub mod detector;
pub mod pipeline;
pub mod record;

pub use detector::{DetectError, Detection, FaceDetector};
pub use pipeline::{authoritative_rect, export_file_name, CropPipeline, PipelineError};
pub use record::{ImageRecord, ImageStore, RecordId};
