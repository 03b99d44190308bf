//! Per-image records and the batch store.
//!
//! One [`ImageRecord`] exists per uploaded file. It carries the decoded
//! image, the cached detection result, the user's manual crop override,
//! and the cached preview/output rasters. The store serializes all
//! record mutations behind one lock; long-running work (decode, detect,
//! render) happens outside the lock and re-enters through a generation
//! check so a stale task can never clobber newer state.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use facecrop_core::{CropRect, EncodedImage, FaceBox, RasterImage};
use parking_lot::RwLock;

static NEXT_RECORD_ID: AtomicU64 = AtomicU64::new(1);

/// Stable identifier of one uploaded image.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RecordId(u64);

impl RecordId {
    fn next() -> Self {
        Self(NEXT_RECORD_ID.fetch_add(1, Ordering::Relaxed))
    }
}

/// State of one uploaded image across its crop session lifecycle.
#[derive(Debug, Clone)]
pub struct ImageRecord {
    /// Stable identifier.
    pub id: RecordId,
    /// Original file name, used to derive the export name.
    pub file_name: String,
    /// Undecoded source bytes.
    pub source: Arc<Vec<u8>>,
    /// Decoded pixels, populated by the first refresh.
    pub image: Option<Arc<RasterImage>>,
    /// Cached face detection result. Valid only when `detected` is set;
    /// `None` with `detected` means detection ran and found nothing.
    pub face: Option<FaceBox>,
    /// Whether detection has run for this image. Detection runs once
    /// per image; ratio changes reuse the cached result.
    pub detected: bool,
    /// User-saved crop override. Takes precedence over any derived rect.
    pub manual_crop: Option<CropRect>,
    /// Cached annotated preview.
    pub preview: Option<Arc<EncodedImage>>,
    /// Cached export, cleared whenever the authoritative rect changes.
    pub output: Option<Arc<EncodedImage>>,
    /// A refresh is in flight for this record.
    pub loading: bool,
    /// The source failed to decode; no preview or output is produced.
    pub failed: bool,
    /// Monotonic counter guarding against stale task results.
    pub generation: u64,
}

impl ImageRecord {
    fn new(file_name: String, source: Vec<u8>) -> Self {
        Self {
            id: RecordId::next(),
            file_name,
            source: Arc::new(source),
            image: None,
            face: None,
            detected: false,
            manual_crop: None,
            preview: None,
            output: None,
            loading: true,
            failed: false,
            generation: 0,
        }
    }
}

/// Thread-safe collection of image records.
#[derive(Debug, Default)]
pub struct ImageStore {
    records: RwLock<HashMap<RecordId, ImageRecord>>,
}

impl ImageStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a record for an uploaded file. The record starts loading
    /// with no detection and no override.
    pub fn insert(&self, file_name: impl Into<String>, source: Vec<u8>) -> RecordId {
        let record = ImageRecord::new(file_name.into(), source);
        let id = record.id;
        self.records.write().insert(id, record);
        id
    }

    /// Remove a record, releasing its derived rasters.
    pub fn remove(&self, id: RecordId) -> bool {
        self.records.write().remove(&id).is_some()
    }

    /// Snapshot of one record's current state.
    pub fn get(&self, id: RecordId) -> Option<ImageRecord> {
        self.records.read().get(&id).cloned()
    }

    /// All current record ids.
    pub fn ids(&self) -> Vec<RecordId> {
        self.records.read().keys().copied().collect()
    }

    pub fn len(&self) -> usize {
        self.records.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.read().is_empty()
    }

    /// Run a mutation against one record under the store lock.
    pub fn with_mut<R>(&self, id: RecordId, f: impl FnOnce(&mut ImageRecord) -> R) -> Option<R> {
        self.records.write().get_mut(&id).map(f)
    }

    /// Mark a refresh as started: bumps the generation (superseding any
    /// in-flight refresh), sets the loading flag, and returns the new
    /// generation with the source bytes to work on.
    pub fn begin_refresh(&self, id: RecordId) -> Option<(u64, Arc<Vec<u8>>)> {
        self.with_mut(id, |record| {
            record.generation += 1;
            record.loading = true;
            record.failed = false;
            (record.generation, Arc::clone(&record.source))
        })
    }

    /// Save a manual crop override, invalidating the cached output.
    pub fn set_manual_crop(&self, id: RecordId, rect: CropRect) -> bool {
        self.with_mut(id, |record| {
            record.manual_crop = Some(rect);
            record.output = None;
            record.generation += 1;
        })
        .is_some()
    }

    /// Clear the manual override so the next refresh re-derives from
    /// detection (or the plain default).
    pub fn reset_crop(&self, id: RecordId) -> bool {
        self.with_mut(id, |record| {
            record.manual_crop = None;
            record.output = None;
            record.generation += 1;
        })
        .is_some()
    }

    /// Invalidate every record's cached output (e.g. on a ratio change).
    pub fn invalidate_outputs(&self) {
        for record in self.records.write().values_mut() {
            record.output = None;
            record.generation += 1;
        }
    }
}
