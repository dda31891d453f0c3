//! Image-file frame sequences and single-image encryption.
//!
//! Decoding and encoding go through the `image` crate. Output is always PNG
//! so a second pass with the same cipher restores the input exactly.

use crate::error::{FrameCipherError, Result, ResultExt};
use crate::pipeline::{BoxError, Item, ItemSink, ItemSource, Transform};
use crate::types::{Frame, VideoInfo};
use image::{ImageFormat, RgbImage};
use std::collections::VecDeque;
use std::path::{Path, PathBuf};

/// File extensions picked up by [`ImageSequenceReader`].
pub const IMAGE_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "bmp"];

/// Reads every image file of a directory, in lexical filename order.
pub struct ImageSequenceReader {
    dir: PathBuf,
    pending: VecDeque<PathBuf>,
    total: u64,
    geometry: Option<(u32, u32)>,
}

impl ImageSequenceReader {
    pub fn open(dir: impl AsRef<Path>) -> Result<Self> {
        let dir = dir.as_ref();
        let entries = std::fs::read_dir(dir)
            .with_context(|| format!("Failed to list image directory {:?}", dir))?;

        let mut paths = Vec::new();
        for entry in entries {
            let path = entry?.path();
            if path.is_file() && is_image_file(&path) {
                paths.push(path);
            }
        }
        paths.sort();
        tracing::debug!("Found {} images in {:?}", paths.len(), dir);

        Ok(Self {
            dir: dir.to_path_buf(),
            total: paths.len() as u64,
            pending: paths.into(),
            geometry: None,
        })
    }

    /// Sequence properties, using the first image's dimensions.
    pub fn info(&self, fps: f64) -> Result<VideoInfo> {
        let (width, height) = match self.pending.front() {
            Some(first) => image::image_dimensions(first)?,
            None => (0, 0),
        };
        Ok(VideoInfo {
            width,
            height,
            fps,
            frame_count: self.total,
        })
    }

    pub fn read_frame(&mut self) -> Result<Option<Frame>> {
        let Some(path) = self.pending.pop_front() else {
            return Ok(None);
        };

        let image = image::open(&path)
            .map_err(|e| FrameCipherError::from(e).with_context(format!("Failed to decode {:?}", path)))?
            .to_rgb8();
        let (width, height) = image.dimensions();

        match self.geometry {
            None => self.geometry = Some((width, height)),
            Some((w, h)) if (w, h) != (width, height) => {
                return Err(FrameCipherError::Frame(format!(
                    "{:?} is {}x{}, sequence is {}x{}",
                    path, width, height, w, h
                )));
            }
            Some(_) => {}
        }

        Frame::new(width, height, image.into_raw()).map(Some)
    }
}

fn is_image_file(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| {
            IMAGE_EXTENSIONS
                .iter()
                .any(|known| known.eq_ignore_ascii_case(ext))
        })
        .unwrap_or(false)
}

impl ItemSource<Frame> for ImageSequenceReader {
    fn next_item(&mut self) -> std::result::Result<Option<Frame>, BoxError> {
        self.read_frame().map_err(Into::into)
    }

    fn describe(&self) -> String {
        format!("image sequence {} ({} files)", self.dir.display(), self.total)
    }
}

/// Writes `frame_000000.png`, `frame_000001.png`, ... into a directory.
pub struct ImageSequenceWriter {
    dir: PathBuf,
    frames_written: u64,
}

impl ImageSequenceWriter {
    pub fn create(dir: impl AsRef<Path>) -> Result<Self> {
        let dir = dir.as_ref();
        std::fs::create_dir_all(dir)
            .with_context(|| format!("Failed to create output directory {:?}", dir))?;
        Ok(Self {
            dir: dir.to_path_buf(),
            frames_written: 0,
        })
    }

    /// Path the frame with sequence index `index` is written to.
    pub fn frame_path(&self, index: u64) -> PathBuf {
        self.dir.join(format!("frame_{:06}.png", index))
    }

    pub fn frames_written(&self) -> u64 {
        self.frames_written
    }

    pub fn write_frame(&mut self, index: u64, frame: Frame) -> Result<()> {
        let path = self.frame_path(index);
        save_png(frame, &path)?;
        self.frames_written += 1;
        Ok(())
    }
}

impl ItemSink<Frame> for ImageSequenceWriter {
    fn consume(&mut self, item: Item<Frame>) -> std::result::Result<(), BoxError> {
        let (index, frame) = item.into_parts();
        self.write_frame(index, frame).map_err(Into::into)
    }

    fn finish(&mut self) -> std::result::Result<(), BoxError> {
        tracing::debug!("Wrote {} images to {:?}", self.frames_written, self.dir);
        Ok(())
    }
}

fn save_png(frame: Frame, path: &Path) -> Result<()> {
    let (width, height) = (frame.width, frame.height);
    let image = RgbImage::from_raw(width, height, frame.data).ok_or_else(|| {
        FrameCipherError::Frame(format!("Buffer does not match {}x{} frame", width, height))
    })?;
    image
        .save_with_format(path, ImageFormat::Png)
        .map_err(|e| FrameCipherError::from(e).with_context(format!("Failed to write {:?}", path)))
}

/// Load one image, run `cipher` over it, and save the result as PNG.
pub fn encrypt_image(
    input: impl AsRef<Path>,
    output: impl AsRef<Path>,
    cipher: &mut dyn Transform<Frame>,
) -> Result<VideoInfo> {
    let (input, output) = (input.as_ref(), output.as_ref());

    let image = image::open(input)
        .map_err(|e| FrameCipherError::from(e).with_context(format!("Failed to decode {:?}", input)))?
        .to_rgb8();
    let (width, height) = image.dimensions();
    let mut frame = Frame::new(width, height, image.into_raw())?;

    cipher.apply(&mut frame);

    if let Some(parent) = output.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    save_png(frame, output)?;

    tracing::info!(
        "Applied {} to {:?} ({}x{}) -> {:?}",
        cipher.name(),
        input,
        width,
        height,
        output
    );
    Ok(VideoInfo {
        width,
        height,
        fps: 0.0,
        frame_count: 1,
    })
}
