//! Diffuse map sources for the shared material: a still image or a video
//! played back from a pre-decoded frame sequence.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::config::TextureSourceConfig;
use crate::gfx::loader::LoadError;

const FRAME_EXTENSIONS: [&str; 3] = ["png", "jpg", "jpeg"];

/// Decoded sRGB RGBA8 pixels.
#[derive(Debug, Clone, PartialEq)]
pub struct ImageFrame {
    width: u32,
    height: u32,
    pixels: Vec<u8>,
}

impl ImageFrame {
    pub fn from_rgba(image: image::RgbaImage) -> Self {
        let (width, height) = image.dimensions();
        Self {
            width,
            height,
            pixels: image.into_raw(),
        }
    }

    pub fn load(path: &Path) -> Result<Self, LoadError> {
        let image = image::open(path).map_err(|source| LoadError::image(path, source))?;
        Ok(Self::from_rgba(image.to_rgba8()))
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn pixels(&self) -> &[u8] {
        &self.pixels
    }
}

/// Looping, muted video. Playback starts when the texture is created and
/// follows the wall clock, independent of the render rate.
#[derive(Debug, Clone)]
pub struct VideoTexture {
    frames: Arc<[Arc<ImageFrame>]>,
    fps: f32,
    started: Instant,
}

impl VideoTexture {
    pub fn new(frames: Vec<Arc<ImageFrame>>, fps: f32) -> Option<Self> {
        if frames.is_empty() {
            return None;
        }
        Some(Self {
            frames: frames.into(),
            fps: if fps > 0.0 { fps } else { 30.0 },
            started: Instant::now(),
        })
    }

    /// Reads every png/jpeg in `dir`, ordered by file name. Frames whose
    /// size differs from the first one are skipped.
    pub fn load_frames(dir: &Path, fps: f32) -> Result<Self, LoadError> {
        let mut paths: Vec<PathBuf> = std::fs::read_dir(dir)
            .map_err(|source| LoadError::io(dir, source))?
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|path| {
                path.extension()
                    .and_then(|ext| ext.to_str())
                    .is_some_and(|ext| FRAME_EXTENSIONS.contains(&ext.to_ascii_lowercase().as_str()))
            })
            .collect();
        paths.sort();

        let mut frames: Vec<Arc<ImageFrame>> = Vec::with_capacity(paths.len());
        for path in &paths {
            let frame = ImageFrame::load(path)?;
            if let Some(first) = frames.first() {
                if (first.width, first.height) != (frame.width, frame.height) {
                    log::warn!("skipping video frame {} with mismatched size", path.display());
                    continue;
                }
            }
            frames.push(Arc::new(frame));
        }

        log::info!("decoded {} video frames from {}", frames.len(), dir.display());
        Self::new(frames, fps).ok_or_else(|| LoadError::EmptyFrameSequence(dir.to_path_buf()))
    }

    pub fn fps(&self) -> f32 {
        self.fps
    }

    pub fn frame_count(&self) -> usize {
        self.frames.len()
    }

    pub fn frame_index_at(&self, elapsed: Duration) -> usize {
        (elapsed.as_secs_f32() * self.fps) as usize % self.frames.len()
    }

    pub fn current_index(&self) -> usize {
        self.frame_index_at(self.started.elapsed())
    }

    pub fn frame(&self, index: usize) -> &Arc<ImageFrame> {
        &self.frames[index % self.frames.len()]
    }
}

/// What the material's `map` slot holds.
#[derive(Debug, Clone)]
pub enum MapTexture {
    Image(Arc<ImageFrame>),
    Video(VideoTexture),
}

impl MapTexture {
    /// Decodes the configured source. Runs on the loader thread.
    pub fn load(source: &TextureSourceConfig) -> Result<Self, LoadError> {
        match source {
            TextureSourceConfig::Image { path } => {
                Ok(MapTexture::Image(Arc::new(ImageFrame::load(path)?)))
            }
            TextureSourceConfig::Video { frames, fps } => {
                Ok(MapTexture::Video(VideoTexture::load_frames(frames, *fps)?))
            }
        }
    }

    /// The frame to show now and its index, so callers can skip re-uploads
    /// of an unchanged frame.
    pub fn current_frame(&self) -> (usize, &Arc<ImageFrame>) {
        match self {
            MapTexture::Image(frame) => (0, frame),
            MapTexture::Video(video) => {
                let index = video.current_index();
                (index, video.frame(index))
            }
        }
    }

    pub fn size(&self) -> (u32, u32) {
        let (_, frame) = self.current_frame();
        (frame.width, frame.height)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn frame(value: u8) -> Arc<ImageFrame> {
        Arc::new(ImageFrame::from_rgba(image::RgbaImage::from_pixel(
            2,
            2,
            image::Rgba([value, 0, 0, 255]),
        )))
    }

    #[test]
    fn test_video_loops_on_wall_clock() {
        let video = VideoTexture::new(vec![frame(0), frame(1), frame(2)], 30.0).unwrap();
        assert_eq!(video.frame_index_at(Duration::ZERO), 0);
        assert_eq!(video.frame_index_at(Duration::from_millis(40)), 1);
        assert_eq!(video.frame_index_at(Duration::from_millis(120)), 0);
        assert_eq!(video.frame(4).pixels()[0], 1);
    }

    #[test]
    fn test_empty_sequence_is_rejected() {
        assert!(VideoTexture::new(Vec::new(), 30.0).is_none());

        let dir = std::env::temp_dir().join(format!("vitrine-frames-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let result = VideoTexture::load_frames(&dir, 30.0);
        let _ = std::fs::remove_dir_all(&dir);
        assert!(matches!(result, Err(LoadError::EmptyFrameSequence(_))));
    }

    #[test]
    fn test_still_image_is_always_frame_zero() {
        let map = MapTexture::Image(frame(7));
        let (index, current) = map.current_frame();
        assert_eq!(index, 0);
        assert_eq!(current.pixels()[0], 7);
        assert_eq!(map.size(), (2, 2));
    }
}
