//! Morphological operations on masks

mod dilate;

pub use dilate::{dilate_mask, disk_offsets};
