//! Persistent application settings (JSON file in app data directory).

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use soundsight_core::{DetectionFilter, HazardPolicy, ObjectKind, SessionConfig};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
#[serde(default)]
pub struct AudioSettings {
    pub master_volume: f32,
    pub spatial_audio_intensity: f32,
    pub voice_guidance_volume: f32,
    pub alert_volume: f32,
    pub haptic_feedback: bool,
}

impl Default for AudioSettings {
    fn default() -> Self {
        Self {
            master_volume: 0.8,
            spatial_audio_intensity: 0.7,
            voice_guidance_volume: 0.9,
            alert_volume: 0.6,
            haptic_feedback: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
#[serde(default)]
pub struct DetectionSettings {
    /// Master switch for the camera detection loop.
    pub object_detection: bool,
    pub person_detection: bool,
    pub vehicle_detection: bool,
    pub obstacle_detection: bool,
    pub text_recognition: bool,
    pub confidence_threshold: f32,
}

impl Default for DetectionSettings {
    fn default() -> Self {
        Self {
            object_detection: true,
            person_detection: true,
            vehicle_detection: true,
            obstacle_detection: true,
            text_recognition: false,
            confidence_threshold: 0.7,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
#[serde(default)]
pub struct AccessibilitySettings {
    pub high_contrast_mode: bool,
    pub large_text: bool,
    pub voice_announcements: bool,
    pub screen_reader: bool,
    pub slow_speech: bool,
}

impl Default for AccessibilitySettings {
    fn default() -> Self {
        Self {
            high_contrast_mode: false,
            large_text: true,
            voice_announcements: true,
            screen_reader: false,
            slow_speech: false,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
#[serde(default)]
pub struct AppSettings {
    pub audio: AudioSettings,
    pub detection: DetectionSettings,
    pub accessibility: AccessibilitySettings,
    /// Pause route auto-advance on hazardous steps.
    pub hold_on_hazard: bool,
}

impl AppSettings {
    pub fn normalize(&mut self) {
        let audio = &mut self.audio;
        audio.master_volume = clamp_unit(audio.master_volume, 0.8);
        audio.spatial_audio_intensity = clamp_unit(audio.spatial_audio_intensity, 0.7);
        audio.voice_guidance_volume = clamp_unit(audio.voice_guidance_volume, 0.9);
        audio.alert_volume = clamp_unit(audio.alert_volume, 0.6);
        self.detection.confidence_threshold =
            clamp_unit(self.detection.confidence_threshold, 0.7).clamp(0.1, 0.99);
    }

    /// Object kinds the user switched off.
    pub fn disabled_kinds(&self) -> Vec<ObjectKind> {
        let mut kinds = Vec::new();
        if !self.detection.person_detection {
            kinds.push(ObjectKind::Person);
        }
        if !self.detection.vehicle_detection {
            kinds.push(ObjectKind::Vehicle);
        }
        if !self.detection.obstacle_detection {
            kinds.push(ObjectKind::Obstacle);
        }
        kinds
    }

    /// Translate settings into the core's session configuration.
    pub fn session_config(&self) -> SessionConfig {
        let mut config = SessionConfig {
            filter: DetectionFilter {
                min_confidence: self.detection.confidence_threshold,
                disabled_kinds: self.disabled_kinds(),
            },
            hazard_policy: if self.hold_on_hazard {
                HazardPolicy::Hold
            } else {
                HazardPolicy::Continue
            },
            ..SessionConfig::default()
        };
        if self.accessibility.slow_speech {
            // Slower announcements get a longer step cadence.
            config.step_interval = config.step_interval.mul_f32(1.5);
            config.recognition_delay += Duration::from_millis(1_000);
        }
        config
    }

    /// Gain applied to a cue before it reaches the audio renderer.
    pub fn cue_gain(&self, intensity: f32) -> f32 {
        intensity * self.audio.spatial_audio_intensity * self.audio.master_volume
    }
}

fn clamp_unit(value: f32, fallback: f32) -> f32 {
    if value.is_finite() {
        value.clamp(0.0, 1.0)
    } else {
        fallback
    }
}

pub fn default_settings_path() -> PathBuf {
    #[cfg(target_os = "windows")]
    {
        std::env::var_os("APPDATA")
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from("."))
            .join("SoundSight")
            .join("settings.json")
    }
    #[cfg(not(target_os = "windows"))]
    {
        std::env::var_os("XDG_DATA_HOME")
            .map(PathBuf::from)
            .unwrap_or_else(|| {
                std::env::var_os("HOME")
                    .map(PathBuf::from)
                    .unwrap_or_else(|| PathBuf::from("/tmp"))
                    .join(".local")
                    .join("share")
            })
            .join("soundsight")
            .join("settings.json")
    }
}

pub fn load_settings(path: &Path) -> AppSettings {
    let mut settings = fs::read_to_string(path)
        .ok()
        .and_then(|raw| serde_json::from_str::<AppSettings>(&raw).ok())
        .unwrap_or_default();
    settings.normalize();
    settings
}

pub fn save_settings(path: &Path, settings: &AppSettings) -> std::io::Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let json = serde_json::to_string_pretty(settings).map_err(std::io::Error::other)?;
    fs::write(path, json)
}
