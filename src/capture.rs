//! Synthetic local camera.
//!
//! Produces BGRA frames at the configured rate: a flat gray scene with a
//! bright square that drifts across it and pauses at regular intervals, so
//! motion-based adapters have both moving and still stretches to report on.

use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::{Duration, Instant};

use anyhow::{bail, Result};

use crate::frame::{Frame, PixelFormat};
use crate::pipeline::{FrameOutcome, FrameSink};

const BACKGROUND: u8 = 64;
const FOREGROUND: u8 = 230;
/// Frames per leg of the move/pause cycle.
const PHASE_FRAMES: u64 = 45;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CaptureConfig {
    pub width: u32,
    pub height: u32,
    pub fps: u32,
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            width: 640,
            height: 360,
            fps: 15,
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct CaptureStats {
    pub frames_captured: u64,
    pub throttled: u64,
    pub dispatched: u64,
}

pub struct SyntheticCamera {
    config: CaptureConfig,
    frame_count: u64,
    offset: u32,
    stats: CaptureStats,
}

impl SyntheticCamera {
    pub fn new(config: CaptureConfig) -> Result<Self> {
        if config.width < 16 || config.height < 16 {
            bail!("capture size {}x{} too small", config.width, config.height);
        }
        if config.fps == 0 || config.fps > 120 {
            bail!("capture fps must be between 1 and 120");
        }
        Ok(Self {
            config,
            frame_count: 0,
            offset: 0,
            stats: CaptureStats::default(),
        })
    }

    pub fn frame_interval(&self) -> Duration {
        Duration::from_secs_f64(1.0 / self.config.fps as f64)
    }

    pub fn stats(&self) -> CaptureStats {
        self.stats
    }

    pub fn next_frame(&mut self) -> Result<Frame> {
        self.frame_count += 1;
        self.stats.frames_captured += 1;

        let moving = (self.frame_count / PHASE_FRAMES) % 2 == 0;
        // square fits both axes, so travel and top never underflow
        let side = self.config.width.min(self.config.height) / 4;
        let travel = self.config.width - side;
        if moving {
            self.offset = (self.offset + 8) % travel.max(1);
        }

        let (width, height) = (self.config.width, self.config.height);
        let top = (height - side) / 2;
        let mut data = vec![BACKGROUND; PixelFormat::Bgra.buffer_len(width, height)];
        for y in top..top + side {
            let row = (y * width) as usize * 4;
            for x in self.offset..self.offset + side {
                let px = row + x as usize * 4;
                data[px..px + 3].fill(FOREGROUND);
            }
        }
        for alpha in data.iter_mut().skip(3).step_by(4) {
            *alpha = 255;
        }
        Frame::new(data, width, height, PixelFormat::Bgra)
    }

    /// Deliver frames to `sink` at the configured rate until `stop` is set
    /// or `max_frames` have been produced.
    pub fn run(&mut self, sink: &dyn FrameSink, stop: &AtomicBool, max_frames: Option<u64>) -> Result<()> {
        let interval = self.frame_interval();
        let mut next_at = Instant::now();
        while !stop.load(Ordering::SeqCst) {
            if max_frames.is_some_and(|max| self.stats.frames_captured >= max) {
                break;
            }
            let frame = self.next_frame()?;
            match sink.render_frame(frame) {
                FrameOutcome::Throttled => self.stats.throttled += 1,
                FrameOutcome::Dispatched { .. } => self.stats.dispatched += 1,
                FrameOutcome::HandoffClosed => {
                    log::info!("capture: overlay consumer gone, stopping");
                    break;
                }
                _ => {}
            }
            next_at += interval;
            let now = Instant::now();
            if next_at > now {
                thread::sleep(next_at - now);
            } else {
                next_at = now;
            }
        }
        log::info!(
            "capture: stopped after {} frames ({} dispatched, {} throttled)",
            self.stats.frames_captured,
            self.stats.dispatched,
            self.stats.throttled
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[test]
    fn frames_match_configured_size() {
        let mut camera = SyntheticCamera::new(CaptureConfig::default()).unwrap();
        let frame = camera.next_frame().unwrap();
        assert_eq!((frame.width(), frame.height()), (640, 360));
        assert_eq!(frame.format(), PixelFormat::Bgra);
    }

    #[test]
    fn square_moves_between_frames() {
        let mut camera = SyntheticCamera::new(CaptureConfig::default()).unwrap();
        let a = camera.next_frame().unwrap();
        let b = camera.next_frame().unwrap();
        assert_ne!(a.pixels(), b.pixels());
        assert_eq!(a.luma_at(0, 0), b.luma_at(0, 0));
    }

    #[test]
    fn rejects_degenerate_config() {
        let tiny = CaptureConfig {
            width: 4,
            height: 4,
            fps: 15,
        };
        assert!(SyntheticCamera::new(tiny).is_err());
        let still = CaptureConfig {
            fps: 0,
            ..CaptureConfig::default()
        };
        assert!(SyntheticCamera::new(still).is_err());
    }

    #[test]
    fn tall_and_wide_frames_keep_the_square_inside() {
        for (width, height) in [(64, 400), (400, 64), (16, 16)] {
            let mut camera = SyntheticCamera::new(CaptureConfig {
                width,
                height,
                fps: 15,
            })
            .unwrap();
            for _ in 0..(PHASE_FRAMES + 5) {
                let frame = camera.next_frame().unwrap();
                assert_eq!((frame.width(), frame.height()), (width, height));
            }
        }
    }

    #[test]
    fn run_stops_at_frame_limit() {
        struct Count(Mutex<u64>);
        impl FrameSink for Count {
            fn render_frame(&self, _frame: Frame) -> FrameOutcome {
                *self.0.lock().unwrap() += 1;
                FrameOutcome::Throttled
            }
        }

        let mut camera = SyntheticCamera::new(CaptureConfig {
            fps: 120,
            ..CaptureConfig::default()
        })
        .unwrap();
        let sink = Count(Mutex::new(0));
        camera.run(&sink, &AtomicBool::new(false), Some(5)).unwrap();
        assert_eq!(*sink.0.lock().unwrap(), 5);
        assert_eq!(camera.stats().throttled, 5);
    }
}
