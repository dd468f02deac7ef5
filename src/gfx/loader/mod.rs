//! # Asset Loading
//!
//! Every load runs on its own detached thread and reports back over a
//! `std::sync::mpsc` channel. The main thread drains the channel once per
//! event-loop turn with [`AssetLoader::poll`] and applies the results, so
//! viewer state is only ever touched from one thread.
//!
//! ```text
//!  worker threads                       main thread
//!  ──────────────                       ───────────
//!  read model (chunks) ──Progress──┐
//!  parse glTF ─────────Model───────┤
//!  decode faces, prefilter ─Env────┼──► poll() ──► Viewer::apply_load_event
//!  decode texture frames ──Texture─┘
//! ```
//!
//! There is no cancellation. A worker whose receiver is gone drops its
//! result.

pub mod assemble;
mod error;
pub mod model;

use std::io::Read;
use std::path::{Path, PathBuf};
use std::sync::mpsc;
use std::sync::Arc;

pub use assemble::{assemble_model, AssembledModel, AssemblySettings, DESKTOP_NODE_NAME};
pub use error::LoadError;
pub use model::{parse_model_bytes, ModelAsset};

use crate::config::TextureSourceConfig;
use crate::gfx::resources::environment::{CubeFaces, PmremGenerator, PrefilteredEnvironment};
use crate::gfx::resources::texture_source::MapTexture;

const READ_CHUNK: usize = 64 * 1024;

/// Result or progress of one background load.
#[derive(Debug)]
pub enum LoadEvent {
    /// Bytes of the model file read so far.
    Progress { path: PathBuf, loaded: u64, total: u64 },
    Model(Result<ModelAsset, LoadError>),
    Environment(Result<Arc<PrefilteredEnvironment>, LoadError>),
    Texture(Result<MapTexture, LoadError>),
}

impl LoadEvent {
    /// Percentage for [`LoadEvent::Progress`].
    pub fn percent(&self) -> Option<f32> {
        match self {
            LoadEvent::Progress { loaded, total, .. } if *total > 0 => {
                Some(*loaded as f32 / *total as f32 * 100.0)
            }
            LoadEvent::Progress { .. } => Some(100.0),
            _ => None,
        }
    }
}

pub struct AssetLoader {
    sender: mpsc::Sender<LoadEvent>,
    receiver: mpsc::Receiver<LoadEvent>,
}

impl Default for AssetLoader {
    fn default() -> Self {
        let (sender, receiver) = mpsc::channel();
        Self { sender, receiver }
    }
}

impl AssetLoader {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn load_model(&self, path: PathBuf) {
        let sender = self.sender.clone();
        self.spawn("model", move || {
            let result = read_with_progress(&path, |loaded, total| {
                let _ = sender.send(LoadEvent::Progress {
                    path: path.clone(),
                    loaded,
                    total,
                });
            })
            .and_then(|bytes| parse_model_bytes(&bytes, path.parent()));
            let _ = sender.send(LoadEvent::Model(result));
        });
    }

    /// Decodes the six faces and prefilters them. The generator's scratch
    /// memory is released before the result is sent.
    pub fn load_environment(&self, faces: [PathBuf; 6]) {
        let sender = self.sender.clone();
        self.spawn("environment", move || {
            let result = CubeFaces::load(&faces).map(|cube| {
                let mut generator = PmremGenerator::new();
                let environment = generator.from_cubemap(&cube);
                generator.dispose();
                environment
            });
            let _ = sender.send(LoadEvent::Environment(result));
        });
    }

    pub fn load_texture(&self, source: TextureSourceConfig) {
        let sender = self.sender.clone();
        self.spawn("texture", move || {
            let _ = sender.send(LoadEvent::Texture(MapTexture::load(&source)));
        });
    }

    /// Everything that arrived since the last call, in arrival order.
    pub fn poll(&self) -> Vec<LoadEvent> {
        self.receiver.try_iter().collect()
    }

    fn spawn(&self, name: &str, work: impl FnOnce() + Send + 'static) {
        let spawned = std::thread::Builder::new()
            .name(format!("load-{name}"))
            .spawn(work);
        if let Err(err) = spawned {
            log::error!("failed to start {name} loader thread: {err}");
        }
    }
}

/// Reads a whole file, reporting `(loaded, total)` after every chunk.
fn read_with_progress(path: &Path, mut progress: impl FnMut(u64, u64)) -> Result<Vec<u8>, LoadError> {
    let mut file = std::fs::File::open(path).map_err(|source| LoadError::io(path, source))?;
    let total = file
        .metadata()
        .map(|meta| meta.len())
        .map_err(|source| LoadError::io(path, source))?;

    let mut bytes = Vec::with_capacity(total as usize);
    let mut chunk = vec![0u8; READ_CHUNK];
    loop {
        let read = file
            .read(&mut chunk)
            .map_err(|source| LoadError::io(path, source))?;
        if read == 0 {
            break;
        }
        bytes.extend_from_slice(&chunk[..read]);
        progress(bytes.len() as u64, total);
    }
    Ok(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn wait_for(loader: &AssetLoader, matches: impl Fn(&LoadEvent) -> bool) -> Vec<LoadEvent> {
        let mut seen = Vec::new();
        for _ in 0..500 {
            seen.extend(loader.poll());
            if seen.iter().any(&matches) {
                return seen;
            }
            std::thread::sleep(Duration::from_millis(10));
        }
        panic!("loader never produced the expected event: {seen:?}");
    }

    #[test]
    fn test_model_load_reports_progress_then_result() {
        let path = std::env::temp_dir().join(format!("vitrine-model-{}.glb", std::process::id()));
        std::fs::write(&path, model::tests::showcase_glb()).unwrap();

        let loader = AssetLoader::new();
        loader.load_model(path.clone());
        let events = wait_for(&loader, |event| matches!(event, LoadEvent::Model(_)));
        let _ = std::fs::remove_file(&path);

        let last_progress = events.iter().filter_map(LoadEvent::percent).last();
        assert_eq!(last_progress, Some(100.0));
        assert!(matches!(events.last(), Some(LoadEvent::Model(Ok(_)))));
    }

    #[test]
    fn test_missing_files_fail_quietly() {
        let loader = AssetLoader::new();
        loader.load_model(PathBuf::from("/nowhere/objects.glb"));
        loader.load_environment(std::array::from_fn(|i| PathBuf::from(format!("/nowhere/{i}.png"))));

        let mut events = wait_for(&loader, |event| matches!(event, LoadEvent::Model(_)));
        if !events.iter().any(|event| matches!(event, LoadEvent::Environment(_))) {
            events.extend(wait_for(&loader, |event| matches!(event, LoadEvent::Environment(_))));
        }
        assert!(events
            .iter()
            .any(|event| matches!(event, LoadEvent::Model(Err(LoadError::Io { .. })))));
        assert!(events
            .iter()
            .any(|event| matches!(event, LoadEvent::Environment(Err(LoadError::Image { .. })))));
    }
}
