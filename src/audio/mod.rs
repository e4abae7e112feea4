use rodio::{Decoder, OutputStream, OutputStreamHandle, Sink, Source};
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use anyhow::{Context, Result};
use log::{debug, error, info, warn};

#[cfg(test)]
use mockall::automock;

pub use crate::models::SoundClip;

/// Fire-and-forget audio cue surface. Playback failures are logged by the
/// implementation, never propagated.
#[cfg_attr(test, automock)]
pub trait Chime: Send + Sync {
    fn play(&self, clip: SoundClip);
}

#[derive(Clone)]
pub struct AudioManager {
    volume: Arc<Mutex<f32>>,
    sound_files: Arc<Mutex<SoundFiles>>,
}

/// One clip per milestone. Missing files fall back to a generated tone so
/// an alert always makes some noise.
#[derive(Debug, Clone)]
pub struct SoundFiles {
    pub upcoming: PathBuf,
    pub imminent: PathBuf,
    pub started: PathBuf,
}

impl AudioManager {
    pub fn new() -> Self {
        info!("Initializing audio system");

        AudioManager {
            volume: Arc::new(Mutex::new(0.7)), // Default volume 70%
            sound_files: Arc::new(Mutex::new(SoundFiles::default())),
        }
    }

    pub fn set_volume(&self, volume: f32) {
        let vol = volume.clamp(0.0, 1.0);
        *self.volume.lock().unwrap() = vol;
        info!("Set audio volume to {:.0}%", vol * 100.0);
    }

    pub fn get_volume(&self) -> f32 {
        *self.volume.lock().unwrap()
    }

    pub fn update_sound_files(&self, sound_files: SoundFiles) {
        *self.sound_files.lock().unwrap() = sound_files;
        info!("Updated sound file paths");
    }

    pub fn ensure_sound_directory() -> Result<PathBuf> {
        let sounds_dir = dirs::data_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("caltray")
            .join("sounds");

        if !sounds_dir.exists() {
            std::fs::create_dir_all(&sounds_dir).context("Failed to create sounds directory")?;
            info!("Created sounds directory: {:?}", sounds_dir);
        }

        Ok(sounds_dir)
    }
}

impl Default for AudioManager {
    fn default() -> Self {
        Self::new()
    }
}

impl Chime for AudioManager {
    fn play(&self, clip: SoundClip) {
        let sound_path = {
            let sound_files = self.sound_files.lock().unwrap();
            match clip {
                SoundClip::Upcoming => sound_files.upcoming.clone(),
                SoundClip::Imminent => sound_files.imminent.clone(),
                SoundClip::Started => sound_files.started.clone(),
            }
        };
        let volume = *self.volume.lock().unwrap();

        tokio::task::spawn_blocking(move || {
            if let Err(e) = play_sound_file(&sound_path, volume) {
                error!("Failed to play sound {:?}: {}", sound_path, e);
            }
        });
    }
}

fn play_sound_file(sound_path: &Path, volume: f32) -> Result<()> {
    // Create output stream on each call (OutputStream is not Send + Sync)
    let (stream, stream_handle) =
        OutputStream::try_default().context("Failed to create audio output stream")?;

    if !sound_path.exists() {
        warn!("Sound file does not exist: {:?}", sound_path);
        return play_default_sound(&stream_handle, volume);
    }

    debug!("Playing sound file: {:?}", sound_path);

    let file = File::open(sound_path).context("Failed to open sound file")?;
    let reader = BufReader::new(file);

    let source = Decoder::new(reader)?.convert_samples::<f32>().amplify(volume);

    let sink = Sink::try_new(&stream_handle)?;
    sink.append(source);

    // Wait for the sound to finish playing
    sink.sleep_until_end();

    // Keep stream alive until sound finishes
    drop(stream);

    Ok(())
}

fn play_default_sound(stream_handle: &OutputStreamHandle, volume: f32) -> Result<()> {
    warn!("Playing default sine wave tone (no sound file found)");

    let source = rodio::source::SineWave::new(440.0) // A4 note
        .take_duration(Duration::from_millis(500))
        .amplify(volume * 0.3); // Lower volume for sine wave

    let sink = Sink::try_new(stream_handle)?;
    sink.append(source);

    sink.sleep_until_end();

    Ok(())
}

impl Default for SoundFiles {
    fn default() -> Self {
        let sounds_dir = dirs::data_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("caltray")
            .join("sounds");

        // Also check ./sounds for development
        let dev_sounds = PathBuf::from("sounds");

        let resolve = |name: &str| {
            if dev_sounds.join(name).exists() {
                dev_sounds.join(name)
            } else {
                sounds_dir.join(name)
            }
        };

        SoundFiles {
            upcoming: resolve("upcoming.wav"),
            imminent: resolve("imminent.wav"),
            started: resolve("started.wav"),
        }
    }
}
