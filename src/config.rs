use anyhow::{anyhow, Result};
use serde::Deserialize;
use std::path::Path;
use std::sync::Arc;

use crate::capture::CaptureConfig;
use crate::overlay::{FontRef, FontSpec, FontWeight, OverlayStyle};
use crate::session::engine::{Bitrate, ChannelProfile, ClientRole, OrientationMode};
use crate::session::{EngineEventHandler, LoopbackEngine, SessionSettings, VideoProfile};

const DEFAULT_CHANNEL: &str = "ar-core";
const DEFAULT_INTERVAL_MS: f64 = crate::throttle::DEFAULT_MIN_INTERVAL_MS;
const DEFAULT_EDGE_OFFSET: f64 = crate::mapper::DEFAULT_EDGE_OFFSET;
const DEFAULT_DETECTOR: &str = "motion";
const DEFAULT_FONT_FAMILY: &str = "system";
const DEFAULT_FONT_SIZE: f64 = 14.0;
const DEFAULT_OVERLAY_ALPHA: f64 = 0.5;
const DEFAULT_LABEL_OFFSET: f64 = 10.0;

#[derive(Debug, Deserialize, Default)]
struct CallConfigFile {
    app_id: Option<String>,
    channel: Option<String>,
    token: Option<String>,
    speakerphone: Option<bool>,
    pipeline: Option<PipelineConfigFile>,
    overlay: Option<OverlayConfigFile>,
    video: Option<VideoConfigFile>,
}

#[derive(Debug, Deserialize, Default)]
struct PipelineConfigFile {
    inference_interval_ms: Option<f64>,
    edge_offset: Option<f64>,
    detector: Option<String>,
}

#[derive(Debug, Deserialize, Default)]
struct OverlayConfigFile {
    font_family: Option<String>,
    font_size: Option<f64>,
    font_weight: Option<FontWeight>,
    alpha: Option<f64>,
    label_offset: Option<f64>,
}

#[derive(Debug, Deserialize, Default)]
struct VideoConfigFile {
    width: Option<u32>,
    height: Option<u32>,
    fps: Option<u32>,
    bitrate: Option<Bitrate>,
    orientation: Option<OrientationMode>,
    channel_profile: Option<ChannelProfile>,
    client_role: Option<ClientRole>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CallConfig {
    /// Engine application id, passed to the engine at construction. Empty
    /// means "use the engine's own default".
    pub app_id: String,
    pub channel: String,
    pub token: Option<String>,
    pub speakerphone: bool,
    pub pipeline: PipelineSettings,
    pub overlay: OverlaySettings,
    pub video: VideoProfile,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PipelineSettings {
    pub inference_interval_ms: f64,
    pub edge_offset: f64,
    pub detector: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct OverlaySettings {
    pub font: FontSpec,
    pub style: OverlayStyle,
}

impl CallConfig {
    /// Load from the file named by `VISION_CALL_CONFIG` (if set), then apply
    /// environment overrides.
    pub fn load() -> Result<Self> {
        let config_path = std::env::var("VISION_CALL_CONFIG").ok();
        let file_cfg = match config_path.as_deref() {
            Some(path) if !path.trim().is_empty() => Some(read_config_file(Path::new(path))?),
            _ => None,
        };
        Self::finish(file_cfg.unwrap_or_default())
    }

    /// Load an explicit config file, then apply environment overrides.
    pub fn load_from(path: &Path) -> Result<Self> {
        Self::finish(read_config_file(path)?)
    }

    fn finish(file: CallConfigFile) -> Result<Self> {
        let mut cfg = Self::from_file(file);
        cfg.apply_env()?;
        cfg.validate()?;
        Ok(cfg)
    }

    fn from_file(file: CallConfigFile) -> Self {
        let pipeline = file.pipeline.unwrap_or_default();
        let overlay = file.overlay.unwrap_or_default();
        let video = file.video.unwrap_or_default();
        let default_video = VideoProfile::default();
        Self {
            app_id: file.app_id.unwrap_or_default(),
            channel: file.channel.unwrap_or_else(|| DEFAULT_CHANNEL.to_string()),
            token: file.token.filter(|token| !token.trim().is_empty()),
            speakerphone: file.speakerphone.unwrap_or(true),
            pipeline: PipelineSettings {
                inference_interval_ms: pipeline.inference_interval_ms.unwrap_or(DEFAULT_INTERVAL_MS),
                edge_offset: pipeline.edge_offset.unwrap_or(DEFAULT_EDGE_OFFSET),
                detector: pipeline
                    .detector
                    .unwrap_or_else(|| DEFAULT_DETECTOR.to_string()),
            },
            overlay: OverlaySettings {
                font: FontSpec {
                    family: overlay
                        .font_family
                        .unwrap_or_else(|| DEFAULT_FONT_FAMILY.to_string()),
                    size: overlay.font_size.unwrap_or(DEFAULT_FONT_SIZE),
                    weight: overlay.font_weight.unwrap_or_default(),
                },
                style: OverlayStyle {
                    fill_alpha: overlay.alpha.unwrap_or(DEFAULT_OVERLAY_ALPHA),
                    label_offset: overlay.label_offset.unwrap_or(DEFAULT_LABEL_OFFSET),
                },
            },
            video: VideoProfile {
                channel_profile: video.channel_profile.unwrap_or(default_video.channel_profile),
                client_role: video.client_role.unwrap_or(default_video.client_role),
                width: video.width.unwrap_or(default_video.width),
                height: video.height.unwrap_or(default_video.height),
                fps: video.fps.unwrap_or(default_video.fps),
                bitrate: video.bitrate.unwrap_or(default_video.bitrate),
                orientation: video.orientation.unwrap_or(default_video.orientation),
            },
        }
    }

    fn apply_env(&mut self) -> Result<()> {
        if let Ok(app_id) = std::env::var("VISION_CALL_APP_ID") {
            if !app_id.trim().is_empty() {
                self.app_id = app_id;
            }
        }
        if let Ok(channel) = std::env::var("VISION_CALL_CHANNEL") {
            if !channel.trim().is_empty() {
                self.channel = channel;
            }
        }
        if let Ok(token) = std::env::var("VISION_CALL_TOKEN") {
            if !token.trim().is_empty() {
                self.token = Some(token);
            }
        }
        if let Ok(interval) = std::env::var("VISION_CALL_INFERENCE_INTERVAL_MS") {
            self.pipeline.inference_interval_ms = interval.trim().parse().map_err(|_| {
                anyhow!("VISION_CALL_INFERENCE_INTERVAL_MS must be a number of milliseconds")
            })?;
        }
        if let Ok(offset) = std::env::var("VISION_CALL_EDGE_OFFSET") {
            self.pipeline.edge_offset = offset
                .trim()
                .parse()
                .map_err(|_| anyhow!("VISION_CALL_EDGE_OFFSET must be a number"))?;
        }
        if let Ok(detector) = std::env::var("VISION_CALL_DETECTOR") {
            if !detector.trim().is_empty() {
                self.pipeline.detector = detector.trim().to_lowercase();
            }
        }
        Ok(())
    }

    fn validate(&mut self) -> Result<()> {
        self.channel = self.channel.trim().to_string();
        if self.channel.is_empty() {
            return Err(anyhow!("channel must not be empty"));
        }
        let interval = self.pipeline.inference_interval_ms;
        if !interval.is_finite() || interval <= 0.0 {
            return Err(anyhow!("inference interval must be greater than zero"));
        }
        let edge = self.pipeline.edge_offset;
        if !edge.is_finite() || edge < 0.0 {
            return Err(anyhow!("edge offset must be zero or positive"));
        }
        let font_size = self.overlay.font.size;
        if !font_size.is_finite() || font_size <= 0.0 {
            return Err(anyhow!("overlay font size must be greater than zero"));
        }
        if !(0.0..=1.0).contains(&self.overlay.style.fill_alpha) {
            return Err(anyhow!("overlay alpha must be between 0 and 1"));
        }
        if self.video.width == 0 || self.video.height == 0 || self.video.fps == 0 {
            return Err(anyhow!("video width, height and fps must be greater than zero"));
        }
        Ok(())
    }

    pub fn session_settings(&self) -> SessionSettings {
        SessionSettings {
            channel_id: self.channel.clone(),
            token: self.token.clone(),
            video: self.video.clone(),
            speakerphone: self.speakerphone,
            ..SessionSettings::default()
        }
    }

    /// Loopback engine initialised with this config's app id.
    pub fn loopback_engine(&self, handler: Arc<dyn EngineEventHandler>) -> LoopbackEngine {
        LoopbackEngine::new(handler).with_app_id(self.app_id.clone())
    }

    pub fn capture(&self) -> CaptureConfig {
        CaptureConfig {
            width: self.video.width,
            height: self.video.height,
            fps: self.video.fps,
        }
    }

    pub fn font(&self) -> FontRef {
        Arc::new(self.overlay.font.clone())
    }
}

fn read_config_file(path: &Path) -> Result<CallConfigFile> {
    let raw = std::fs::read_to_string(path)
        .map_err(|e| anyhow!("failed to read config file {}: {}", path.display(), e))?;
    let is_toml = path
        .extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("toml"));
    let cfg = if is_toml {
        toml::from_str(&raw).map_err(|e| anyhow!("invalid config file {}: {}", path.display(), e))?
    } else {
        serde_json::from_str(&raw)
            .map_err(|e| anyhow!("invalid config file {}: {}", path.display(), e))?
    };
    Ok(cfg)
}
