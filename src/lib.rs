//! Bucket fill for layered raster images.
//!
//! Pixels live in [`canvas::BoundedImage`], a premultiplied RGBA buffer that
//! tracks the smallest rectangle holding its content. [`ops::bucket::BucketFill`]
//! drives one fill gesture: it picks a reference image from a
//! [`components::layers::LayerStack`], runs the scanline flood fill in
//! [`ops::flood_fill`], optionally dilates the result with [`ops::expand`], and
//! composites it into the target layer.

pub mod canvas;
pub mod cli;
pub mod components;
pub mod io;
pub mod logger;
pub mod ops;
pub mod settings;
