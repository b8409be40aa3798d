//! Build chromatic scales out of tagged vocal samples.
//!
//! A sample folder is scanned into per-symbol buckets, a preset's token
//! list is resolved into one sample per note, and the generation worker
//! tunes each sample to its note and writes the results out, along with a
//! single `chromatic.wav` holding the whole scale.

pub mod audio;
pub mod error;
pub mod generation;
pub mod loader;
pub mod pipeline;
pub mod shared;

pub use error::{Error, Result, Stage};
