// src/intake/slot.rs
use log::info;

use super::uploaded_image::UploadedImage;

/// The two fixed upload positions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SlotKind {
    Child,
    Adult,
}

impl SlotKind {
    pub const ALL: [SlotKind; 2] = [SlotKind::Child, SlotKind::Adult];

    pub fn step(&self) -> &'static str {
        match self {
            SlotKind::Child => "Step 1",
            SlotKind::Adult => "Step 2",
        }
    }

    pub fn title(&self) -> &'static str {
        match self {
            SlotKind::Child => "Childhood Photo",
            SlotKind::Adult => "Current Photo",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            SlotKind::Child => "Upload Old Photo",
            SlotKind::Adult => "Upload Recent Photo",
        }
    }

    pub fn sub_label(&self) -> &'static str {
        match self {
            SlotKind::Child => "You as a child",
            SlotKind::Adult => "You as an adult",
        }
    }

    /// Short caption used under the result thumbnails.
    pub fn caption(&self) -> &'static str {
        match self {
            SlotKind::Child => "Child",
            SlotKind::Adult => "Adult",
        }
    }
}

/// One upload position: empty, loading, or holding an image.
pub struct UploadSlot {
    kind: SlotKind,
    image: Option<UploadedImage>,
    pending: Option<u64>,
}

impl UploadSlot {
    pub fn new(kind: SlotKind) -> Self {
        Self { kind, image: None, pending: None }
    }

    /// Replace the current image. The replaced image's preview is released.
    pub fn select(&mut self, image: UploadedImage) {
        info!("{:?} slot set to {}", self.kind, image.file_name());
        if let Some(previous) = self.image.replace(image) {
            previous.discard();
        }
    }

    /// Clear the slot, releasing its preview. Also forgets any pending read.
    pub fn remove(&mut self) {
        self.pending = None;
        if let Some(previous) = self.image.take() {
            info!("{:?} slot cleared", self.kind);
            previous.discard();
        }
    }

    pub fn is_filled(&self) -> bool {
        self.image.is_some()
    }

    pub fn image(&self) -> Option<&UploadedImage> {
        self.image.as_ref()
    }

    pub fn image_mut(&mut self) -> Option<&mut UploadedImage> {
        self.image.as_mut()
    }

    /// Mark a read as in flight for this slot.
    pub fn begin_load(&mut self, token: u64) {
        self.pending = Some(token);
    }

    /// Close the in-flight read if `token` is the one this slot waits for.
    pub fn finish_load(&mut self, token: u64) -> bool {
        if self.pending == Some(token) {
            self.pending = None;
            true
        } else {
            false
        }
    }

    pub fn is_loading(&self) -> bool {
        self.pending.is_some()
    }
}
