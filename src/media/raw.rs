//! Headerless packed RGB24 streams.
//!
//! A raw stream is frame after frame of `width * height * 3` bytes with no
//! header or padding, the format `ffmpeg -f rawvideo -pix_fmt rgb24` reads and
//! writes. Geometry and rate therefore come from configuration.

use crate::error::{FrameCipherError, Result};
use crate::pipeline::{BoxError, Item, ItemSink, ItemSource};
use crate::types::{Frame, VideoInfo};
use std::fs::File;
use std::io::{BufReader, BufWriter, ErrorKind, Read, Write};
use std::path::{Path, PathBuf};

/// Reads consecutive RGB24 frames.
///
/// A clean end of input on a frame boundary is exhaustion; a short trailing
/// frame is an error.
pub struct RawVideoReader<R = BufReader<File>> {
    reader: R,
    width: u32,
    height: u32,
    frame_len: usize,
    fps: f64,
    frames_read: u64,
    total_bytes: Option<u64>,
    label: String,
}

impl RawVideoReader {
    pub fn open(path: impl AsRef<Path>, width: u32, height: u32, fps: f64) -> Result<Self> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|e| {
            FrameCipherError::Io(e).with_context(format!("Failed to open raw input {:?}", path))
        })?;
        let total_bytes = file.metadata().map(|m| m.len()).ok();

        let mut reader = Self::from_reader(BufReader::new(file), width, height, fps)?;
        reader.total_bytes = total_bytes;
        reader.label = format!("raw rgb24 {}", path.display());
        Ok(reader)
    }
}

impl<R: Read> RawVideoReader<R> {
    pub fn from_reader(reader: R, width: u32, height: u32, fps: f64) -> Result<Self> {
        let frame_len = Frame::expected_len(width, height)?;
        Ok(Self {
            reader,
            width,
            height,
            frame_len,
            fps,
            frames_read: 0,
            total_bytes: None,
            label: "raw rgb24 stream".to_string(),
        })
    }

    /// Stream properties. `frame_count` is derived from the file size and is
    /// 0 for readers not backed by a file.
    pub fn info(&self) -> VideoInfo {
        let frame_count = match self.total_bytes {
            Some(bytes) => {
                let frame_len = self.frame_len as u64;
                if bytes % frame_len != 0 {
                    tracing::warn!(
                        "Input size {} is not a multiple of the {}-byte frame size",
                        bytes,
                        frame_len
                    );
                }
                bytes / frame_len
            }
            None => 0,
        };
        VideoInfo {
            width: self.width,
            height: self.height,
            fps: self.fps,
            frame_count,
        }
    }

    pub fn frames_read(&self) -> u64 {
        self.frames_read
    }

    /// Next frame, or `None` at a clean end of input.
    pub fn read_frame(&mut self) -> Result<Option<Frame>> {
        let mut data = vec![0u8; self.frame_len];
        let mut filled = 0;
        while filled < data.len() {
            match self.reader.read(&mut data[filled..]) {
                Ok(0) => break,
                Ok(n) => filled += n,
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) => {
                    return Err(FrameCipherError::Io(e)
                        .with_context(format!("Failed to read frame {}", self.frames_read)))
                }
            }
        }

        if filled == 0 {
            return Ok(None);
        }
        if filled < data.len() {
            return Err(FrameCipherError::Frame(format!(
                "Truncated frame {}: got {} of {} bytes",
                self.frames_read,
                filled,
                data.len()
            )));
        }

        self.frames_read += 1;
        Frame::new(self.width, self.height, data).map(Some)
    }
}

impl<R: Read + Send> ItemSource<Frame> for RawVideoReader<R> {
    fn next_item(&mut self) -> std::result::Result<Option<Frame>, BoxError> {
        self.read_frame().map_err(Into::into)
    }

    fn describe(&self) -> String {
        format!("{} ({}x{})", self.label, self.width, self.height)
    }
}

/// Appends RGB24 frames to a stream. Every frame must match the first one's geometry.
pub struct RawVideoWriter<W: Write = File> {
    writer: BufWriter<W>,
    geometry: Option<(u32, u32)>,
    frames_written: u64,
    path: Option<PathBuf>,
}

impl RawVideoWriter {
    /// Create (or truncate) `path`, creating parent directories as needed.
    pub fn create(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        let file = File::create(path).map_err(|e| {
            FrameCipherError::Io(e).with_context(format!("Failed to create raw output {:?}", path))
        })?;
        let mut writer = Self::from_writer(file);
        writer.path = Some(path.to_path_buf());
        Ok(writer)
    }
}

impl<W: Write> RawVideoWriter<W> {
    pub fn from_writer(writer: W) -> Self {
        Self {
            writer: BufWriter::new(writer),
            geometry: None,
            frames_written: 0,
            path: None,
        }
    }

    pub fn frames_written(&self) -> u64 {
        self.frames_written
    }

    pub fn write_frame(&mut self, frame: &Frame) -> Result<()> {
        let geometry = (frame.width, frame.height);
        match self.geometry {
            None => self.geometry = Some(geometry),
            Some(expected) if expected != geometry => {
                return Err(FrameCipherError::Frame(format!(
                    "Frame {} is {}x{}, stream is {}x{}",
                    self.frames_written, frame.width, frame.height, expected.0, expected.1
                )));
            }
            Some(_) => {}
        }

        self.writer.write_all(&frame.data)?;
        self.frames_written += 1;
        Ok(())
    }

    /// Flush buffered frames to the underlying writer.
    pub fn flush(&mut self) -> Result<()> {
        self.writer.flush()?;
        if let Some(path) = &self.path {
            tracing::debug!("Wrote {} frames to {:?}", self.frames_written, path);
        }
        Ok(())
    }

    /// Flush and return the underlying writer.
    pub fn into_inner(self) -> Result<W> {
        self.writer
            .into_inner()
            .map_err(|e| FrameCipherError::Io(e.into_error()))
    }
}

impl<W: Write + Send> ItemSink<Frame> for RawVideoWriter<W> {
    fn consume(&mut self, item: Item<Frame>) -> std::result::Result<(), BoxError> {
        self.write_frame(&item.payload).map_err(Into::into)
    }

    fn finish(&mut self) -> std::result::Result<(), BoxError> {
        self.flush().map_err(Into::into)
    }
}
