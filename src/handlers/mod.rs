//! Transformation engines behind one uniform contract
//!
//! The dispatch controller never touches pixels. It hands a staged input
//! path, a target format, and the request's [`ConvertOptions`] to whichever
//! [`ConvertHandler`] the route is bound to: the out-of-process ImageMagick
//! engine ([`MagickHandler`]) or the in-process `image`-crate engine
//! ([`LibraryHandler`]). Both produce exactly one output file on success and
//! leave nothing visible at the output path on failure.

mod library;
mod magick;
mod options;
mod traits;

pub use library::LibraryHandler;
pub use magick::MagickHandler;
pub use options::{ConvertOptions, Crop, Resize};
pub use traits::{ConvertHandler, HandlerError, HandlerResult, OutputMetadata};
