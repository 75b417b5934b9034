//! Annotation and record types shared by the conversion pipeline.
//!
//! - [`Annotation`] is what one annotation text file says about one image:
//!   pixel-space boxes and their class names.
//! - [`BBoxXYXY`] carries a [`Pixel`] or [`Normalized`] marker so pixel boxes
//!   cannot be written to a record without going through normalization.
//! - [`io_rects_txt`] reads the annotation text files.
//! - [`io_tfrecord`] holds the `tf.train.Example` messages and the TFRecord
//!   framing used for the output shards.

mod bbox;
pub mod io_rects_txt;
pub mod io_tfrecord;
mod model;
mod space;

pub use bbox::BBoxXYXY;
pub use model::{AnnotatedImage, Annotation};
pub use space::{Normalized, Pixel};
