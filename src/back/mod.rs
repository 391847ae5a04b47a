//! The back end: serializing a finished memory image to and from its
//! on-disk text format.

pub mod image;

pub use image::{decode_image, encode_image, ImageError};
