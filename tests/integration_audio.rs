use std::fs::File;
use std::io::Write;

use tempfile::TempDir;

use caltray::{AudioManager, Chime, SoundClip, SoundFiles};

#[test]
fn test_audio_manager_volume_workflow() {
    let manager = AudioManager::new();

    // Default volume
    assert_eq!(manager.get_volume(), 0.7);

    manager.set_volume(0.5);
    assert_eq!(manager.get_volume(), 0.5);

    // Out-of-range values clamp instead of failing
    manager.set_volume(1.2);
    assert_eq!(manager.get_volume(), 1.0);

    manager.set_volume(-0.1);
    assert_eq!(manager.get_volume(), 0.0);

    manager.set_volume(1000.0);
    assert_eq!(manager.get_volume(), 1.0);

    manager.set_volume(-1000.0);
    assert_eq!(manager.get_volume(), 0.0);
}

#[tokio::test]
async fn test_playback_is_best_effort() {
    let manager = AudioManager::new();
    let temp_dir = TempDir::new().unwrap();

    // Point every clip at a file that is not valid audio. Playback must
    // log and move on, never panic or block the scheduler.
    let bogus = temp_dir.path().join("bogus.wav");
    let mut file = File::create(&bogus).unwrap();
    file.write_all(&[0; 44]).unwrap();

    manager.update_sound_files(SoundFiles {
        upcoming: bogus.clone(),
        imminent: bogus.clone(),
        started: bogus,
    });

    manager.play(SoundClip::Upcoming);
    manager.play(SoundClip::Imminent);
    manager.play(SoundClip::Started);
}

#[tokio::test]
async fn test_audio_manager_concurrent_access() {
    let manager = std::sync::Arc::new(AudioManager::new());
    let mut handles = vec![];

    for i in 0..10 {
        let manager_clone = manager.clone();
        let handle = tokio::spawn(async move {
            let volume = (i as f32) / 10.0;
            manager_clone.set_volume(volume);
            manager_clone.get_volume()
        });
        handles.push(handle);
    }

    for handle in handles {
        let result = handle.await.unwrap();
        assert!((0.0..=1.0).contains(&result));
    }
}

#[test]
fn test_audio_directory_creation_is_idempotent() {
    let sounds_dir = AudioManager::ensure_sound_directory().unwrap();

    assert!(sounds_dir.exists());
    assert!(sounds_dir.is_dir());

    let sounds_dir2 = AudioManager::ensure_sound_directory().unwrap();
    assert_eq!(sounds_dir, sounds_dir2);
}

#[test]
fn test_sound_files_struct() {
    let temp_dir = TempDir::new().unwrap();

    let sound_files = SoundFiles {
        upcoming: temp_dir.path().join("upcoming.wav"),
        imminent: temp_dir.path().join("imminent.wav"),
        started: temp_dir.path().join("started.wav"),
    };

    assert!(sound_files.upcoming.ends_with("upcoming.wav"));
    assert!(sound_files.imminent.ends_with("imminent.wav"));
    assert!(sound_files.started.ends_with("started.wav"));
}
