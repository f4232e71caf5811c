//! Lazy, deduplicated loading of screamer sounds by id.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use smallvec::{smallvec, SmallVec};
use tracing::{debug, trace, warn};

use crate::constants::SCREAMER_EXTENSIONS;
use crate::error::AudioError;
use crate::tasks::{TaskResult, TaskSpawner};

/// Decoded mono PCM audio.
#[derive(Debug, Clone, PartialEq)]
pub struct SoundClip {
    pub samples: Vec<f32>,
    pub sample_rate: u32,
}

impl SoundClip {
    pub fn new(samples: Vec<f32>, sample_rate: u32) -> Self {
        Self { samples, sample_rate }
    }

    pub fn duration_seconds(&self) -> f32 {
        if self.sample_rate == 0 {
            return 0.0;
        }
        self.samples.len() as f32 / self.sample_rate as f32
    }
}

/// Turns encoded file bytes into a clip. Runs on the blocking pool.
pub trait SoundDecoder: Send + Sync {
    fn decode(&self, bytes: &[u8]) -> Result<SoundClip, AudioError>;
}

/// Decoder for builds without one; every file falls through to the synthesized stinger.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoDecoder;

impl SoundDecoder for NoDecoder {
    fn decode(&self, _bytes: &[u8]) -> Result<SoundClip, AudioError> {
        Err(AudioError::Decode("no decoder available".to_string()))
    }
}

/// Files tried for `id`, in order.
pub fn candidate_paths(asset_dir: &Path, id: &str) -> Vec<PathBuf> {
    SCREAMER_EXTENSIONS
        .iter()
        .map(|ext| asset_dir.join("sfx").join(format!("{id}.{ext}")))
        .collect()
}

/// Reads and decodes the first candidate file that works. Failures are silent.
pub async fn load_sound(asset_dir: PathBuf, id: String, decoder: Arc<dyn SoundDecoder>) -> Option<SoundClip> {
    for path in candidate_paths(&asset_dir, &id) {
        let bytes = match tokio::fs::read(&path).await {
            Ok(bytes) => bytes,
            Err(error) => {
                trace!(path = %path.display(), %error, "Screamer candidate unavailable");
                continue;
            }
        };

        let decoder = Arc::clone(&decoder);
        match tokio::task::spawn_blocking(move || decoder.decode(&bytes)).await {
            Ok(Ok(clip)) => {
                debug!(path = %path.display(), seconds = clip.duration_seconds(), "Screamer loaded");
                return Some(clip);
            }
            Ok(Err(error)) => debug!(path = %path.display(), %error, "Screamer candidate failed to decode"),
            Err(error) => warn!(path = %path.display(), %error, "Decoder task failed"),
        }
    }
    None
}

/// Result of asking the bank for a sound.
#[derive(Debug, Clone, PartialEq)]
pub enum Lookup {
    /// Already resolved. `None` means no asset exists and the stinger should be used.
    Ready(Option<Arc<SoundClip>>),
    /// A load is in flight; the request was queued behind it.
    Pending,
}

/// Per-id cache of screamer clips with at most one load in flight per id.
pub struct SoundBank {
    asset_dir: PathBuf,
    decoder: Arc<dyn SoundDecoder>,
    spawner: Option<TaskSpawner>,
    cache: HashMap<String, Option<Arc<SoundClip>>>,
    /// Intensities of plays waiting on an in-flight load.
    pending: HashMap<String, SmallVec<[f32; 2]>>,
}

impl SoundBank {
    pub fn new(asset_dir: impl Into<PathBuf>, decoder: Arc<dyn SoundDecoder>, spawner: Option<TaskSpawner>) -> Self {
        Self {
            asset_dir: asset_dir.into(),
            decoder,
            spawner,
            cache: HashMap::new(),
            pending: HashMap::new(),
        }
    }

    /// Looks up `id`, starting a load on first use. Without a runtime the id resolves to no asset.
    pub fn request(&mut self, id: &str, intensity: f32) -> Lookup {
        if let Some(clip) = self.cache.get(id) {
            return Lookup::Ready(clip.clone());
        }

        if let Some(waiting) = self.pending.get_mut(id) {
            trace!(id, "Joining in-flight screamer load");
            waiting.push(intensity);
            return Lookup::Pending;
        }

        let Some(spawner) = &self.spawner else {
            self.cache.insert(id.to_string(), None);
            return Lookup::Ready(None);
        };

        debug!(id, "Loading screamer");
        self.pending.insert(id.to_string(), smallvec![intensity]);
        let (asset_dir, decoder, task_id) = (self.asset_dir.clone(), Arc::clone(&self.decoder), id.to_string());
        spawner.spawn(async move {
            let clip = load_sound(asset_dir, task_id.clone(), decoder).await;
            TaskResult::SoundLoaded { id: task_id, clip }
        });
        Lookup::Pending
    }

    /// Caches a finished load and hands back the plays that were waiting for it.
    pub fn complete(&mut self, id: String, clip: Option<SoundClip>) -> (Option<Arc<SoundClip>>, SmallVec<[f32; 2]>) {
        let clip = clip.map(Arc::new);
        let waiting = self.pending.remove(&id).unwrap_or_default();
        self.cache.insert(id, clip.clone());
        (clip, waiting)
    }

    pub fn is_pending(&self, id: &str) -> bool {
        self.pending.contains_key(id)
    }

    pub fn is_cached(&self, id: &str) -> bool {
        self.cache.contains_key(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_candidates_follow_extension_order() {
        let paths = candidate_paths(Path::new("assets"), "screamer_03");
        let names: Vec<_> = paths.iter().map(|p| p.to_string_lossy().replace('\\', "/")).collect();
        assert_eq!(
            names,
            vec![
                "assets/sfx/screamer_03.ogg",
                "assets/sfx/screamer_03.mp3",
                "assets/sfx/screamer_03.wav"
            ]
        );
    }

    #[test]
    fn test_bank_without_runtime_resolves_to_stinger() {
        let mut bank = SoundBank::new("assets", Arc::new(NoDecoder), None);
        assert_eq!(bank.request("screamer_01", 0.5), Lookup::Ready(None));
        assert!(bank.is_cached("screamer_01"));
        assert!(!bank.is_pending("screamer_01"));
    }
}
