//! # framecipher: selective frame encryption over a concurrent pipeline
//!
//! Streams video frames through three threads (read, encrypt, write)
//! connected by blocking hand-off queues. Only frames whose index falls in a
//! configured window are encrypted; every frame reaches the output, in order.
//!
//! ## Architecture
//!
//! - **Pipeline**: generic source → transform → sink stages, the queues between
//!   them, and the driver that starts and drains them ([`pipeline`])
//! - **Ciphers**: XOR keystream transforms over RGB24 frames ([`cipher`])
//! - **Media**: raw RGB24 streams and image sequences on disk ([`media`])
//! - **Configuration**: TOML run description with validation ([`config`])
//!
//! ## Example
//!
//! ```ignore
//! use framecipher::{cipher::build_cipher, config::PipelineConfig, media, pipeline::Pipeline};
//!
//! let config = PipelineConfig::load("framecipher.toml")?;
//! let (source, info) = media::open_source(&config.input)?;
//! let sink = media::open_sink(&config.output)?;
//!
//! let report = Pipeline::builder(config.window.resolve(info.fps))
//!     .build()
//!     .run(source, build_cipher(&config.cipher), sink)?;
//! println!("{}", report);
//! ```

pub mod cipher;
pub mod config;
pub mod error;
pub mod media;
pub mod pipeline;
pub mod types;

// Re-export commonly used types
pub use config::PipelineConfig;
pub use error::{FrameCipherError, Result};
pub use pipeline::{IndexRange, Pipeline, PipelineBuilder, RunReport, RunState};
pub use types::{Frame, VideoInfo};
