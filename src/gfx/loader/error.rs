use std::path::PathBuf;

use thiserror::Error;

/// Why an asset did not load. Every variant leaves the dependent feature
/// absent; none of them stop the frame loop.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("failed to read {path}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid glTF data")]
    Gltf(#[from] gltf::Error),
    #[error("failed to decode image {path}")]
    Image {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },
    #[error("glTF document contains no scene")]
    MissingScene,
    #[error("mesh `{mesh}` has a primitive without POSITION data")]
    MissingPositions { mesh: String },
    #[error("cube face {face} is {width}x{height}, expected {expected}x{expected}")]
    CubeFaceMismatch {
        face: usize,
        width: u32,
        height: u32,
        expected: u32,
    },
    #[error("no image frames found in {0}")]
    EmptyFrameSequence(PathBuf),
}

impl LoadError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        LoadError::Io {
            path: path.into(),
            source,
        }
    }

    pub(crate) fn image(path: impl Into<PathBuf>, source: image::ImageError) -> Self {
        LoadError::Image {
            path: path.into(),
            source,
        }
    }
}
