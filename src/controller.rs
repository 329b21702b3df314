// src/controller.rs
use anyhow::{anyhow, Context, Result};
use image::{DynamicImage, ImageFormat};
use log::{debug, error, info, warn};
use std::path::{Path, PathBuf};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender, TryRecvError};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use crate::ai::connector::{GeneratedImage, HugGenerator};
use crate::ai::error::GenerationError;
use crate::intake::{Preview, SlotKind, UploadSlot, UploadedImage};

/// File name offered when saving the generated image.
pub const DOWNLOAD_FILE_NAME: &str = "aevora-memory.png";

/// Shown when a failure carries no message of its own.
pub const FALLBACK_ERROR_MESSAGE: &str = "An unexpected error occurred while weaving memories.";

const RESULT_PREVIEW_MAX_EDGE: u32 = 1024;

/// Which view is on screen. Only the controller changes it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppStatus {
    Idle,
    Uploading,
    Processing,
    Success,
    Error,
}

/// The generated image, decoded and ready for display or saving.
pub struct GenerationResult {
    data_uri: String,
    image: DynamicImage,
    preview: Preview,
}

impl GenerationResult {
    fn from_generated(generated: GeneratedImage) -> Result<Self, GenerationError> {
        let image = image::load_from_memory(&generated.bytes)
            .map_err(|e| GenerationError::UnusableImage(e.to_string()))?;
        let preview = Preview::with_max_edge(&image, RESULT_PREVIEW_MAX_EDGE);
        Ok(Self {
            data_uri: generated.data_uri,
            image,
            preview,
        })
    }

    /// `data:image/png;base64,...` exactly as received.
    pub fn data_uri(&self) -> &str {
        &self.data_uri
    }

    pub fn image(&self) -> &DynamicImage {
        &self.image
    }

    pub fn preview_mut(&mut self) -> &mut Preview {
        &mut self.preview
    }

    pub fn save_png(&self, path: &Path) -> Result<()> {
        self.image
            .save_with_format(path, ImageFormat::Png)
            .with_context(|| format!("failed to save image to {}", path.display()))?;
        info!("Image saved to: {}", path.display());
        Ok(())
    }
}

enum Backend {
    Ready(Arc<dyn HugGenerator>),
    Unconfigured(String),
}

/// Messages sent back by worker threads.
enum WorkerEvent {
    ImageLoaded {
        slot: SlotKind,
        token: u64,
        result: Result<UploadedImage>,
    },
    Generated {
        token: u64,
        result: Result<GenerationResult, GenerationError>,
    },
}

type RepaintFn = Arc<dyn Fn() + Send + Sync>;

/// Owns the application state and every transition between views.
///
/// Slow work (file reads, the generation call) runs on worker threads which
/// report back over a channel. Each piece of work carries a token; results
/// whose token is no longer current are dropped, so a reset while a request
/// is in flight cannot be overwritten by its late answer.
pub struct AppController {
    status: AppStatus,
    child: UploadSlot,
    adult: UploadSlot,
    result: Option<GenerationResult>,
    error: Option<String>,
    backend: Backend,
    last_token: u64,
    active_request: Option<u64>,
    events_tx: Sender<WorkerEvent>,
    events_rx: Receiver<WorkerEvent>,
    repaint: Option<RepaintFn>,
}

impl AppController {
    pub fn new(generator: Arc<dyn HugGenerator>) -> Self {
        Self::with_backend(Backend::Ready(generator))
    }

    /// A controller whose Generate action always fails with `reason`.
    pub fn unconfigured(reason: impl Into<String>) -> Self {
        Self::with_backend(Backend::Unconfigured(reason.into()))
    }

    fn with_backend(backend: Backend) -> Self {
        let (events_tx, events_rx) = mpsc::channel();
        Self {
            status: AppStatus::Idle,
            child: UploadSlot::new(SlotKind::Child),
            adult: UploadSlot::new(SlotKind::Adult),
            result: None,
            error: None,
            backend,
            last_token: 0,
            active_request: None,
            events_tx,
            events_rx,
            repaint: None,
        }
    }

    /// Called by worker threads after they post an event.
    pub fn set_repaint_callback<F>(&mut self, callback: F)
    where
        F: Fn() + Send + Sync + 'static,
    {
        self.repaint = Some(Arc::new(callback));
    }

    pub fn status(&self) -> AppStatus {
        self.status
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn result(&self) -> Option<&GenerationResult> {
        self.result.as_ref()
    }

    pub fn result_mut(&mut self) -> Option<&mut GenerationResult> {
        self.result.as_mut()
    }

    pub fn slot(&self, kind: SlotKind) -> &UploadSlot {
        match kind {
            SlotKind::Child => &self.child,
            SlotKind::Adult => &self.adult,
        }
    }

    pub fn slot_mut(&mut self, kind: SlotKind) -> &mut UploadSlot {
        match kind {
            SlotKind::Child => &mut self.child,
            SlotKind::Adult => &mut self.adult,
        }
    }

    pub fn backend_name(&self) -> Option<&str> {
        match &self.backend {
            Backend::Ready(generator) => Some(generator.name()),
            Backend::Unconfigured(_) => None,
        }
    }

    /// Slots can be changed only on the upload view.
    pub fn slots_editable(&self) -> bool {
        matches!(
            self.status,
            AppStatus::Idle | AppStatus::Uploading | AppStatus::Error
        )
    }

    /// Both photos present, no read pending, and not already busy.
    pub fn can_generate(&self) -> bool {
        self.child.is_filled()
            && self.adult.is_filled()
            && !self.child.is_loading()
            && !self.adult.is_loading()
            && matches!(self.status, AppStatus::Idle | AppStatus::Error)
    }

    fn next_token(&mut self) -> u64 {
        self.last_token += 1;
        self.last_token
    }

    /// Start reading `path` into a slot on a worker thread.
    pub fn select_image(&mut self, kind: SlotKind, path: PathBuf) -> bool {
        if !self.slots_editable() {
            warn!("Ignoring image selection while {:?}", self.status);
            return false;
        }

        let token = self.next_token();
        self.slot_mut(kind).begin_load(token);
        self.error = None;
        self.status = AppStatus::Uploading;
        info!("Reading {} into {:?} slot", path.display(), kind);

        let tx = self.events_tx.clone();
        let repaint = self.repaint.clone();
        thread::spawn(move || {
            let result = UploadedImage::read(&path);
            if tx
                .send(WorkerEvent::ImageLoaded { slot: kind, token, result })
                .is_ok()
            {
                if let Some(repaint) = repaint {
                    repaint();
                }
            }
        });
        true
    }

    pub fn remove_image(&mut self, kind: SlotKind) -> bool {
        if !self.slots_editable() {
            warn!("Ignoring image removal while {:?}", self.status);
            return false;
        }
        self.slot_mut(kind).remove();
        self.settle_upload_status();
        true
    }

    /// Send both photos to the generator. Returns false if the click is ignored.
    pub fn generate(&mut self) -> bool {
        if self.status == AppStatus::Processing {
            warn!("Generation already in flight; ignoring click");
            return false;
        }
        if !self.can_generate() {
            warn!("Generate requested without both photos ready; ignoring");
            return false;
        }

        let (child, adult) = match (self.child.image(), self.adult.image()) {
            (Some(child), Some(adult)) => (child.data_uri().to_string(), adult.data_uri().to_string()),
            _ => return false,
        };

        self.error = None;
        if let Some(mut previous) = self.result.take() {
            previous.preview_mut().release();
        }
        self.status = AppStatus::Processing;
        let token = self.next_token();
        self.active_request = Some(token);

        let generator = match &self.backend {
            Backend::Ready(generator) => Arc::clone(generator),
            Backend::Unconfigured(reason) => {
                let reason = reason.clone();
                self.active_request = None;
                error!("Cannot generate: {}", reason);
                self.fail(reason);
                return true;
            }
        };

        info!("Starting generation request {} with {}", token, generator.name());
        let tx = self.events_tx.clone();
        let repaint = self.repaint.clone();
        thread::spawn(move || {
            // Decoded here so a large image never stalls the UI thread
            let result = generator
                .generate(&child, &adult)
                .and_then(GenerationResult::from_generated);
            if tx.send(WorkerEvent::Generated { token, result }).is_ok() {
                if let Some(repaint) = repaint {
                    repaint();
                }
            }
        });
        true
    }

    /// Return to empty slots and Idle from any state.
    pub fn reset(&mut self) {
        if let Some(token) = self.active_request.take() {
            info!("Abandoning in-flight request {}", token);
        }
        self.child.remove();
        self.adult.remove();
        if let Some(mut result) = self.result.take() {
            result.preview_mut().release();
        }
        self.error = None;
        self.status = AppStatus::Idle;
        info!("Application reset");
    }

    /// Write the generated image as PNG.
    pub fn save_result(&self, path: &Path) -> Result<()> {
        self.result
            .as_ref()
            .ok_or_else(|| anyhow!("No generated image to save"))?
            .save_png(path)
    }

    /// Apply every event that has arrived. Never blocks.
    pub fn poll(&mut self) -> bool {
        let mut applied = false;
        loop {
            match self.events_rx.try_recv() {
                Ok(event) => {
                    self.apply(event);
                    applied = true;
                }
                Err(TryRecvError::Empty) | Err(TryRecvError::Disconnected) => break,
            }
        }
        applied
    }

    /// Wait up to `timeout` for one event, then apply whatever else is queued.
    pub fn poll_blocking(&mut self, timeout: Duration) -> bool {
        match self.events_rx.recv_timeout(timeout) {
            Ok(event) => {
                self.apply(event);
                self.poll();
                true
            }
            Err(RecvTimeoutError::Timeout) | Err(RecvTimeoutError::Disconnected) => false,
        }
    }

    fn apply(&mut self, event: WorkerEvent) {
        match event {
            WorkerEvent::ImageLoaded { slot, token, result } => self.apply_image(slot, token, result),
            WorkerEvent::Generated { token, result } => self.apply_generation(token, result),
        }
    }

    fn apply_image(&mut self, kind: SlotKind, token: u64, result: Result<UploadedImage>) {
        if !self.slot_mut(kind).finish_load(token) {
            debug!("Discarding stale read for {:?} slot", kind);
            if let Ok(image) = result {
                image.discard();
            }
            return;
        }
        if !self.slots_editable() {
            warn!("Discarding read for {:?} slot while {:?}", kind, self.status);
            if let Ok(image) = result {
                image.discard();
            }
            return;
        }

        match result {
            Ok(image) => self.slot_mut(kind).select(image),
            Err(e) => {
                error!("Failed to load {:?} photo: {:#}", kind, e);
                self.fail(format!("Could not read image: {:#}", e));
            }
        }
        self.settle_upload_status();
    }

    fn apply_generation(&mut self, token: u64, result: Result<GenerationResult, GenerationError>) {
        if self.active_request != Some(token) || self.status != AppStatus::Processing {
            warn!("Discarding result of stale request {}", token);
            return;
        }
        self.active_request = None;

        match result {
            Ok(result) => {
                info!("Generation request {} succeeded", token);
                self.result = Some(result);
                self.status = AppStatus::Success;
            }
            Err(e) => {
                error!("Generation request {} failed ({:?}): {}", token, e.kind(), e);
                self.fail(e.to_string());
            }
        }
    }

    fn fail(&mut self, message: String) {
        let message = if message.trim().is_empty() {
            FALLBACK_ERROR_MESSAGE.to_string()
        } else {
            message
        };
        self.error = Some(message);
        self.status = AppStatus::Error;
    }

    fn settle_upload_status(&mut self) {
        if self.status == AppStatus::Uploading && !self.child.is_loading() && !self.adult.is_loading() {
            self.status = AppStatus::Idle;
        }
    }
}
