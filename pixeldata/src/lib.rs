//! Pixel data codecs (native, RLE, JPEG) and the `Dataset`<->image bridge
//! (spec §4.6-§4.9).
//!
//! [`bridge::get_image`] and [`bridge::set_image`] are the crate's two entry
//! points: they read the Image Pixel module attributes off a
//! `rsdcm_object::Dataset`, dispatch on its transfer syntax to the matching
//! codec in [`native`], [`rle`] or [`jpeg_adapter`], and hand back (or
//! accept) one frame at a time as a [`image::DecodedImage`]. Modality/VOI LUT
//! and Palette Color LUT data can be read back out of a `Dataset` or a
//! decoded image, but applying either kind of LUT to samples is left to an
//! external collaborator (spec §1) — this crate only ever moves bytes.

pub mod bridge;
pub mod error;
pub mod image;
pub mod jpeg_adapter;
pub mod native;
pub mod rle;

pub use bridge::{get_image, get_image_with, image_params, number_of_frames, set_image};
pub use error::{Error, Result};
pub use image::{ColorSpace, DecodedImage, ImageParams, Palette, PaletteChannelLut, Quality};

/// Re-exports meant for `use rsdcm_pixeldata::prelude::*;`.
pub mod prelude {
    pub use crate::bridge::{get_image, get_image_with, image_params, number_of_frames, set_image};
    pub use crate::error::{Error, Result};
    pub use crate::image::{ColorSpace, DecodedImage, ImageParams, Palette, PaletteChannelLut, Quality};
}
