//! Frame sources and sinks backed by files.
//!
//! - [`raw`] - headerless packed RGB24 streams
//! - [`images`] - directories of image files, plus single-image encryption
//!
//! [`open_source`] and [`open_sink`] pick the implementation from
//! configuration and hand it back boxed, ready for the pipeline.

pub mod images;
pub mod raw;

pub use images::{encrypt_image, ImageSequenceReader, ImageSequenceWriter};
pub use raw::{RawVideoReader, RawVideoWriter};

use crate::config::{InputConfig, MediaFormat, OutputConfig};
use crate::error::Result;
use crate::pipeline::{ItemSink, ItemSource};
use crate::types::{Frame, VideoInfo};

/// Open the configured input and report what it contains.
pub fn open_source(input: &InputConfig) -> Result<(Box<dyn ItemSource<Frame>>, VideoInfo)> {
    match input.format {
        MediaFormat::Raw => {
            let reader = RawVideoReader::open(&input.path, input.width, input.height, input.fps)?;
            let info = reader.info();
            Ok((Box::new(reader), info))
        }
        MediaFormat::Images => {
            let reader = ImageSequenceReader::open(&input.path)?;
            let info = reader.info(input.fps)?;
            Ok((Box::new(reader), info))
        }
    }
}

/// Create the configured output.
pub fn open_sink(output: &OutputConfig) -> Result<Box<dyn ItemSink<Frame>>> {
    Ok(match output.format {
        MediaFormat::Raw => Box::new(RawVideoWriter::create(&output.path)?),
        MediaFormat::Images => Box::new(ImageSequenceWriter::create(&output.path)?),
    })
}
