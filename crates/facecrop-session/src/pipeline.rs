//! Crop session orchestration.
//!
//! The [`CropPipeline`] ties the record store, the detector capability,
//! and the compositor together. For each record it decides which
//! rectangle is authoritative — manual override, face-centered default,
//! or plain centered default, in that order — and produces previews and
//! exports from it.
//!
//! Refreshes fan out one task per record with no cross-record ordering.
//! Supersession is tracked with a per-record generation counter: a task
//! applies its result only if the record's generation has not advanced
//! since it started, so at most one refresh takes effect per record
//! without any cancellation machinery.

use std::path::Path;
use std::sync::Arc;

use facecrop_core::{
    derive_default_rect, AspectRatio, Compositor, CropRect, EncodedImage, FaceBox, LoadError,
    RenderError,
};
use parking_lot::RwLock;
use thiserror::Error;
use tokio::sync::Mutex;
use tokio::task::JoinSet;
use tracing::{debug, warn};

use crate::detector::{primary_face, FaceDetector};
use crate::record::{ImageStore, RecordId};

/// Errors surfaced per record by pipeline operations.
///
/// These never cross record boundaries: one record failing to load or
/// export has no effect on the rest of the batch.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// The record was removed (or never existed).
    #[error("Unknown image record")]
    RecordNotFound,

    /// The source image failed to decode.
    #[error(transparent)]
    Load(#[from] LoadError),

    /// Compositing the preview or export failed.
    #[error(transparent)]
    Render(#[from] RenderError),
}

/// Determine the authoritative crop rectangle for a record.
///
/// Precedence: manual override, then the face-centered default, then
/// the plain centered default.
pub fn authoritative_rect(
    manual_crop: Option<CropRect>,
    face: Option<FaceBox>,
    image_width: f64,
    image_height: f64,
    aspect: AspectRatio,
) -> CropRect {
    match manual_crop {
        Some(rect) => rect,
        None => derive_default_rect(
            image_width,
            image_height,
            aspect.value(),
            face.map(|f| f.center()),
        ),
    }
}

/// Export file name for a source file: `<stem>_cropped.jpg`.
pub fn export_file_name(file_name: &str) -> String {
    let stem = Path::new(file_name)
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or(file_name);
    format!("{stem}_cropped.jpg")
}

struct Inner {
    store: ImageStore,
    detector: Option<Arc<dyn FaceDetector>>,
    aspect: RwLock<AspectRatio>,
    /// Shared scratch render target; acquired per render call.
    compositor: Mutex<Compositor>,
}

/// Orchestrates detection, previews, and exports for a batch of images.
///
/// Cheap to clone; clones share the same store and compositor.
#[derive(Clone)]
pub struct CropPipeline {
    inner: Arc<Inner>,
}

impl CropPipeline {
    /// Create a pipeline. A missing detector is not an error: every
    /// image simply gets the plain centered default.
    pub fn new(detector: Option<Arc<dyn FaceDetector>>) -> Self {
        Self {
            inner: Arc::new(Inner {
                store: ImageStore::new(),
                detector,
                aspect: RwLock::new(AspectRatio::default()),
                compositor: Mutex::new(Compositor::new()),
            }),
        }
    }

    /// The record store backing this pipeline.
    pub fn store(&self) -> &ImageStore {
        &self.inner.store
    }

    /// The globally selected aspect ratio.
    pub fn aspect(&self) -> AspectRatio {
        *self.inner.aspect.read()
    }

    /// Add a batch of uploaded files and refresh them concurrently.
    ///
    /// Each file gets its own record and its own refresh task; a decode
    /// failure marks that record failed and leaves the rest of the
    /// batch untouched. Returns the new ids in input order.
    pub async fn add_images(&self, files: Vec<(String, Vec<u8>)>) -> Vec<RecordId> {
        let ids: Vec<RecordId> = files
            .into_iter()
            .map(|(name, bytes)| self.inner.store.insert(name, bytes))
            .collect();

        self.refresh_all(ids.clone()).await;
        ids
    }

    /// Change the selected aspect ratio.
    ///
    /// Invalidates every record's cached output and re-derives and
    /// re-renders every preview, reusing each record's cached detection
    /// (detection does not depend on the ratio and is not re-run).
    pub async fn set_aspect(&self, aspect: AspectRatio) {
        debug!(%aspect, "aspect ratio changed");
        *self.inner.aspect.write() = aspect;
        self.inner.store.invalidate_outputs();
        self.refresh_all(self.inner.store.ids()).await;
    }

    /// Refresh the preview for one record.
    ///
    /// Decodes the source on first touch, runs detection once per image
    /// (failures and absent detectors downgrade to "no face"), derives
    /// the authoritative rect, and renders the preview. The result is
    /// applied only if no newer refresh superseded this one.
    pub async fn refresh_preview(&self, id: RecordId) -> Result<(), PipelineError> {
        let store = &self.inner.store;
        let (generation, source) = store.begin_refresh(id).ok_or(PipelineError::RecordNotFound)?;
        let snapshot = store.get(id).ok_or(PipelineError::RecordNotFound)?;

        // Decode once; later refreshes reuse the cached raster.
        let image = match snapshot.image {
            Some(image) => image,
            None => match facecrop_core::load_image(&source) {
                Ok(image) => Arc::new(image),
                Err(err) => {
                    warn!(?id, error = %err, "image failed to decode");
                    store.with_mut(id, |record| {
                        if record.generation == generation {
                            record.loading = false;
                            record.failed = true;
                        }
                    });
                    return Err(err.into());
                }
            },
        };
        let (iw, ih) = (image.width as f64, image.height as f64);

        // Detect once per image; ratio changes reuse the cached result.
        let face = if snapshot.detected {
            snapshot.face
        } else {
            match &self.inner.detector {
                Some(detector) => {
                    debug!(?id, "detecting face for preview");
                    match detector.detect(&image) {
                        Ok(detections) => primary_face(&detections, iw, ih),
                        Err(err) => {
                            warn!(?id, error = %err, "face detection failed, using centered crop");
                            None
                        }
                    }
                }
                None => {
                    debug!(?id, "no detector available, skipping face detection");
                    None
                }
            }
        };

        let rect = authoritative_rect(snapshot.manual_crop, face, iw, ih, self.aspect());
        debug!(?id, ?face, ?rect, "derived crop rectangle");

        let preview = {
            let mut compositor = self.inner.compositor.lock().await;
            match compositor.render_preview(&image, rect, face.as_ref()) {
                Ok(preview) => preview,
                Err(err) => {
                    store.with_mut(id, |record| {
                        if record.generation == generation {
                            record.loading = false;
                        }
                    });
                    return Err(err.into());
                }
            }
        };

        store.with_mut(id, |record| {
            if record.generation != generation {
                debug!(?id, "stale refresh result dropped");
                return;
            }
            record.image = Some(image);
            record.face = face;
            record.detected = true;
            record.preview = Some(Arc::new(preview));
            record.loading = false;
        });
        Ok(())
    }

    /// Produce (and cache) the export for one record.
    ///
    /// Uses the same authoritative-rect precedence as previews. The
    /// cached result is returned until a ratio change, manual crop, or
    /// reset invalidates it.
    pub async fn export_crop(&self, id: RecordId) -> Result<Arc<EncodedImage>, PipelineError> {
        let store = &self.inner.store;
        let record = store.get(id).ok_or(PipelineError::RecordNotFound)?;
        if let Some(output) = record.output {
            return Ok(output);
        }

        let image = match record.image {
            Some(image) => image,
            None => {
                let image = Arc::new(facecrop_core::load_image(&record.source)?);
                let cached = Arc::clone(&image);
                store.with_mut(id, |r| {
                    if r.image.is_none() {
                        r.image = Some(cached);
                    }
                });
                image
            }
        };

        let rect = authoritative_rect(
            record.manual_crop,
            record.face,
            image.width as f64,
            image.height as f64,
            self.aspect(),
        );

        let output = {
            let mut compositor = self.inner.compositor.lock().await;
            Arc::new(compositor.render_export(&image, rect)?)
        };

        // Cache unless something changed the record while rendering.
        let cached = Arc::clone(&output);
        store.with_mut(id, |r| {
            if r.generation == record.generation {
                r.output = Some(cached);
            }
        });
        Ok(output)
    }

    /// Save a completed edit session's rectangle as the record's manual
    /// override and re-render its preview.
    pub async fn save_manual_crop(&self, id: RecordId, rect: CropRect) -> Result<(), PipelineError> {
        if !self.inner.store.set_manual_crop(id, rect) {
            return Err(PipelineError::RecordNotFound);
        }
        self.refresh_preview(id).await
    }

    /// Clear the manual override, restoring the face/plain-centered
    /// default on the refresh this triggers.
    pub async fn reset(&self, id: RecordId) -> Result<(), PipelineError> {
        if !self.inner.store.reset_crop(id) {
            return Err(PipelineError::RecordNotFound);
        }
        self.refresh_preview(id).await
    }

    /// Remove a record and its derived rasters.
    pub fn remove(&self, id: RecordId) -> bool {
        self.inner.store.remove(id)
    }

    /// Refresh a set of records concurrently; per-record failures are
    /// recorded on the records themselves and do not stop the batch.
    async fn refresh_all(&self, ids: Vec<RecordId>) {
        let mut tasks = JoinSet::new();
        for id in ids {
            let pipeline = self.clone();
            tasks.spawn(async move {
                if let Err(err) = pipeline.refresh_preview(id).await {
                    warn!(?id, error = %err, "refresh failed");
                }
            });
        }
        while tasks.join_next().await.is_some() {}
    }
}
