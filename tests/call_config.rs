use std::sync::{Arc, Mutex};

use tempfile::NamedTempFile;

use vision_call::config::CallConfig;
use vision_call::overlay::FontWeight;
use vision_call::session::engine::{ClientRole, JoinRequest, OrientationMode};
use vision_call::session::{CallEngine, EngineCommand, EngineEventHandler, OfflineReason};
use vision_call::Size;

static ENV_LOCK: Mutex<()> = Mutex::new(());

fn clear_env() {
    for key in [
        "VISION_CALL_CONFIG",
        "VISION_CALL_APP_ID",
        "VISION_CALL_CHANNEL",
        "VISION_CALL_TOKEN",
        "VISION_CALL_INFERENCE_INTERVAL_MS",
        "VISION_CALL_EDGE_OFFSET",
        "VISION_CALL_DETECTOR",
    ] {
        std::env::remove_var(key);
    }
}

#[test]
fn loads_json_config_with_env_overrides() {
    let _guard = ENV_LOCK.lock().unwrap();
    clear_env();

    let mut file = NamedTempFile::new().expect("temp config");
    let json = r#"{
        "app_id": "app-123",
        "channel": "lab",
        "token": "secret",
        "speakerphone": false,
        "pipeline": {
            "inference_interval_ms": 250,
            "edge_offset": 4.0,
            "detector": "stub"
        },
        "overlay": {
            "font_size": 18,
            "font_weight": "bold",
            "alpha": 0.3
        },
        "video": {
            "width": 1280,
            "height": 720,
            "fps": 30,
            "client_role": "broadcaster"
        }
    }"#;
    std::io::Write::write_all(&mut file, json.as_bytes()).expect("write config");

    std::env::set_var("VISION_CALL_CONFIG", file.path());
    std::env::set_var("VISION_CALL_CHANNEL", "ar-core-2");
    std::env::set_var("VISION_CALL_INFERENCE_INTERVAL_MS", "100");

    let cfg = CallConfig::load().expect("load config");

    assert_eq!(cfg.app_id, "app-123");
    assert_eq!(cfg.channel, "ar-core-2");
    assert_eq!(cfg.token.as_deref(), Some("secret"));
    assert!(!cfg.speakerphone);
    assert_eq!(cfg.pipeline.inference_interval_ms, 100.0);
    assert_eq!(cfg.pipeline.edge_offset, 4.0);
    assert_eq!(cfg.pipeline.detector, "stub");
    assert_eq!(cfg.overlay.font.size, 18.0);
    assert_eq!(cfg.overlay.font.weight, FontWeight::Bold);
    assert_eq!(cfg.overlay.font.family, "system");
    assert_eq!(cfg.overlay.style.fill_alpha, 0.3);
    assert_eq!(cfg.overlay.style.label_offset, 10.0);
    assert_eq!((cfg.video.width, cfg.video.height, cfg.video.fps), (1280, 720, 30));
    assert_eq!(cfg.video.client_role, ClientRole::Broadcaster);
    assert_eq!(cfg.video.orientation, OrientationMode::Adaptive);

    let capture = cfg.capture();
    assert_eq!((capture.width, capture.height, capture.fps), (1280, 720, 30));

    clear_env();
}

#[test]
fn loads_toml_config_from_explicit_path() {
    let _guard = ENV_LOCK.lock().unwrap();
    clear_env();

    let mut file = tempfile::Builder::new()
        .suffix(".toml")
        .tempfile()
        .expect("temp config");
    let toml = r#"
channel = "toml-room"

[pipeline]
edge_offset = 0.0

[video]
fps = 24
orientation = "fixed_landscape"
"#;
    std::io::Write::write_all(&mut file, toml.as_bytes()).expect("write config");

    std::env::set_var("VISION_CALL_DETECTOR", "Stub");

    let cfg = CallConfig::load_from(file.path()).expect("load config");
    assert_eq!(cfg.channel, "toml-room");
    assert_eq!(cfg.pipeline.edge_offset, 0.0);
    assert_eq!(cfg.pipeline.inference_interval_ms, 200.0);
    assert_eq!(cfg.pipeline.detector, "stub");
    assert_eq!(cfg.video.fps, 24);
    assert_eq!(cfg.video.orientation, OrientationMode::FixedLandscape);

    clear_env();
}

#[test]
fn defaults_apply_without_a_config_file() {
    let _guard = ENV_LOCK.lock().unwrap();
    clear_env();

    let cfg = CallConfig::load().expect("load defaults");
    assert_eq!(cfg.channel, "ar-core");
    assert_eq!(cfg.pipeline.inference_interval_ms, 200.0);
    assert_eq!(cfg.pipeline.edge_offset, 2.0);
    assert_eq!(cfg.pipeline.detector, "motion");
    assert_eq!(cfg.video.width, 640);
    assert_eq!(cfg.video.height, 360);
    assert_eq!(cfg.video.fps, 15);
    assert!(cfg.speakerphone);
}

#[test]
fn rejects_invalid_env_overrides() {
    let _guard = ENV_LOCK.lock().unwrap();
    clear_env();

    std::env::set_var("VISION_CALL_INFERENCE_INTERVAL_MS", "soon");
    assert!(CallConfig::load().is_err());
    clear_env();

    std::env::set_var("VISION_CALL_INFERENCE_INTERVAL_MS", "-5");
    assert!(CallConfig::load().is_err());
    clear_env();

    std::env::set_var("VISION_CALL_EDGE_OFFSET", "-1");
    assert!(CallConfig::load().is_err());
    clear_env();
}

#[test]
fn rejects_malformed_config_file() {
    let _guard = ENV_LOCK.lock().unwrap();
    clear_env();

    let mut file = NamedTempFile::new().expect("temp config");
    std::io::Write::write_all(&mut file, b"{ \"channel\": 5 }").expect("write config");
    let err = CallConfig::load_from(file.path()).unwrap_err();
    assert!(err.to_string().contains("invalid config file"));
}

#[derive(Default)]
struct Joins(Mutex<Vec<String>>);

impl EngineEventHandler for Joins {
    fn on_join_success(&self, session_id: &str, _uid: u32, _elapsed_ms: u64) {
        self.0.lock().unwrap().push(session_id.to_string());
    }
    fn on_first_remote_video_decoded(&self, _uid: u32, _size: Size, _elapsed_ms: u64) {}
    fn on_remote_offline(&self, _uid: u32, _reason: OfflineReason) {}
    fn on_remote_video_muted(&self, _muted: bool, _uid: u32) {}
    fn on_command_failed(&self, _command: EngineCommand, _reason: String) {}
}

#[test]
fn app_id_reaches_the_engine() {
    let _guard = ENV_LOCK.lock().unwrap();
    clear_env();

    let mut file = NamedTempFile::new().expect("temp config");
    std::io::Write::write_all(&mut file, br#"{ "app_id": "app-123" }"#).expect("write config");
    std::env::set_var("VISION_CALL_APP_ID", "app-456");

    let cfg = CallConfig::load_from(file.path()).expect("load config");
    let joins = Arc::new(Joins::default());
    let mut engine = cfg.loopback_engine(joins.clone());
    assert_eq!(engine.app_id(), "app-456");

    let settings = cfg.session_settings();
    engine
        .join_channel(&JoinRequest {
            token: settings.token,
            channel_id: settings.channel_id,
            info: None,
            uid: Some(1),
        })
        .expect("join");
    assert_eq!(*joins.0.lock().unwrap(), vec!["app-456-ar-core-1"]);

    clear_env();
}
