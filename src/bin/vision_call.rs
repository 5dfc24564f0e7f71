//! vision-call - loopback video call with on-device detection overlays
//!
//! Joins a loopback channel with one simulated peer, feeds a synthetic camera
//! through the frame pipeline and logs every overlay repaint. The peer mutes
//! its video for the middle third of the run.

use anyhow::{anyhow, Result};
use clap::Parser;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use vision_call::session::HeadlessDisplay;
use vision_call::{
    AdapterRegistry, CallConfig, CallScreen, CallSessionController, EngineEventBridge,
    FramePipeline, LogSurface, OverlayRenderer, Rect, SharedPipeline, SyntheticCamera, UiQueue,
};

const PEER_UID: u32 = 4242;
const UI_SLICE: Duration = Duration::from_millis(50);
const JOIN_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Args {
    /// Config file (JSON, or TOML with a .toml extension).
    #[arg(long, env = "VISION_CALL_CONFIG")]
    config: Option<PathBuf>,
    /// Call duration in seconds.
    #[arg(long, default_value_t = 10)]
    seconds: u64,
    /// Camera frame rate (overrides config).
    #[arg(long)]
    fps: Option<u32>,
    /// Channel to join (overrides config).
    #[arg(long)]
    channel: Option<String>,
    /// Minimum milliseconds between inference runs (overrides config).
    #[arg(long)]
    interval_ms: Option<f64>,
    /// Detection adapter name (overrides config).
    #[arg(long)]
    detector: Option<String>,
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = Args::parse();

    let mut cfg = match args.config.as_deref() {
        Some(path) => CallConfig::load_from(path)?,
        None => CallConfig::load()?,
    };
    if let Some(fps) = args.fps {
        cfg.video.fps = fps;
    }
    if let Some(channel) = args.channel {
        cfg.channel = channel;
    }
    if let Some(interval) = args.interval_ms {
        cfg.pipeline.inference_interval_ms = interval;
    }
    if let Some(detector) = args.detector {
        cfg.pipeline.detector = detector.to_lowercase();
    }

    let registry = AdapterRegistry::with_builtin();
    let adapter = registry.select(&cfg.pipeline.detector)?;
    log::info!(
        "vision-call: channel '{}', detector '{}', inference every {}ms",
        cfg.channel,
        cfg.pipeline.detector,
        cfg.pipeline.inference_interval_ms
    );

    let queue: UiQueue<CallScreen> = UiQueue::new();
    let engine = cfg
        .loopback_engine(EngineEventBridge::new(queue.handle()))
        .with_peer(PEER_UID);
    let peer = engine.peer();
    let session = CallSessionController::new(
        Box::new(engine),
        Box::new(HeadlessDisplay::new()),
        cfg.session_settings(),
    );
    let overlay_bounds = Rect::new(
        0.0,
        0.0,
        cfg.video.width as f64 / 2.0,
        cfg.video.height as f64 / 2.0,
    );
    let renderer = OverlayRenderer::new(
        Box::new(LogSurface::with_style(cfg.overlay.style)),
        overlay_bounds,
    );
    let mut screen = CallScreen::new(session, renderer);

    let pipeline = SharedPipeline::new(
        FramePipeline::new(adapter, Box::new(queue.handle()), screen.shared_bounds())
            .with_min_interval_ms(cfg.pipeline.inference_interval_ms)
            .with_edge_offset(cfg.pipeline.edge_offset)
            .with_font(cfg.font()),
    );

    let stop = Arc::new(AtomicBool::new(false));
    {
        let stop = stop.clone();
        ctrlc::set_handler(move || stop.store(true, Ordering::SeqCst))
            .map_err(|e| anyhow!("error setting Ctrl-C handler: {}", e))?;
    }

    screen.join()?;

    let media = {
        let stop = stop.clone();
        let pipeline = pipeline.clone();
        let capture = cfg.capture();
        thread::spawn(move || -> Result<_> {
            let mut camera = SyntheticCamera::new(capture)?;
            camera.run(&pipeline, &stop, None)?;
            Ok(camera.stats())
        })
    };

    let started = Instant::now();
    let total = Duration::from_secs(args.seconds);
    let mut peer_muted = false;
    let mut last_flags = screen.session().view_flags();
    while started.elapsed() < total && !stop.load(Ordering::SeqCst) {
        queue.run_for(&mut screen, UI_SLICE);

        if let Some(pending) = screen.session().join_pending_for() {
            if pending > JOIN_TIMEOUT {
                log::warn!("join not acknowledged after {:?}; giving up", pending);
                break;
            }
        }

        let third = started.elapsed().as_secs_f64() / total.as_secs_f64() * 3.0;
        let want_muted = (1.0..2.0).contains(&third);
        if let Some(peer) = peer.as_ref().filter(|_| want_muted != peer_muted) {
            peer.set_video_muted(want_muted);
            peer_muted = want_muted;
        }

        let flags = screen.session().view_flags();
        if flags != last_flags {
            log::info!("view: {:?}", flags);
            last_flags = flags;
        }
    }

    if stop.load(Ordering::SeqCst) {
        log::info!("Ctrl-C received, leaving call");
    }
    screen.leave();
    stop.store(true, Ordering::SeqCst);
    let capture_stats = media
        .join()
        .map_err(|_| anyhow!("media thread panicked"))??;
    queue.run_pending(&mut screen);

    let stats = pipeline.stats();
    log::info!(
        "summary: {} frames captured, {} inferences, {} overlay sets dispatched, {} repaints, {} stale sets discarded",
        capture_stats.frames_captured,
        stats.frames_accepted,
        stats.dispatched,
        screen.overlay().redraw_count(),
        screen.stale_discards()
    );
    Ok(())
}
