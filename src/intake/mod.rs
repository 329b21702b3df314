// src/intake/mod.rs
pub mod slot;
pub mod uploaded_image;

pub use slot::{SlotKind, UploadSlot};
pub use uploaded_image::{mime_type_of, strip_data_uri, Preview, UploadedImage};
