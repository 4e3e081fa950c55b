//! CaptureLoop - Background Frame Capture
//!
//! ## Responsibilities
//!
//! - Pull frames from the camera source at a fixed cadence (~30 Hz)
//! - Publish successful captures into the FrameStore
//! - Skip failed reads silently (camera hiccups are expected)
//! - Deterministic start/stop via a running flag checked each tick

use crate::error::{Error, Result};
use crate::frame_store::{Frame, FrameStore};
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tokio::process::Command;
use tokio::sync::RwLock;
use tokio::time::interval;

/// Camera source boundary
///
/// Returns raw JPEG bytes per request; transient failures are reported
/// as errors and the caller decides whether to retry or skip.
#[async_trait]
pub trait CameraSource: Send + Sync {
    /// Capture a single frame
    async fn read_frame(&self) -> Result<Vec<u8>>;
}

/// Camera source backed by ffmpeg single-frame grabs
///
/// Works for both V4L2 devices (/dev/video0) and RTSP URLs. The child
/// process uses kill_on_drop so a timeout cancellation reaps ffmpeg
/// instead of leaking it.
pub struct FfmpegCamera {
    source: String,
    timeout: Duration,
}

impl FfmpegCamera {
    /// Create a camera for the given source identifier
    pub fn new(source: String, timeout_sec: u64) -> Self {
        Self {
            source,
            timeout: Duration::from_secs(timeout_sec),
        }
    }

    fn input_args(&self) -> Vec<String> {
        if self.source.starts_with("rtsp://") {
            // TCP transport is more reliable than UDP for RTSP cameras
            vec![
                "-rtsp_transport".into(),
                "tcp".into(),
                "-i".into(),
                self.source.clone(),
            ]
        } else {
            vec![
                "-f".into(),
                "v4l2".into(),
                "-i".into(),
                self.source.clone(),
            ]
        }
    }
}

#[async_trait]
impl CameraSource for FfmpegCamera {
    async fn read_frame(&self) -> Result<Vec<u8>> {
        use std::process::Stdio;

        let mut args = self.input_args();
        args.extend(
            [
                "-frames:v",
                "1",
                "-f",
                "image2pipe",
                "-vcodec",
                "mjpeg",
                "-loglevel",
                "error",
                "-y",
                "-",
            ]
            .iter()
            .map(|s| s.to_string()),
        );

        let child = Command::new("ffmpeg")
            .args(&args)
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| Error::Camera(format!("ffmpeg spawn failed: {}", e)))?;

        match tokio::time::timeout(self.timeout, child.wait_with_output()).await {
            Ok(Ok(output)) => {
                if !output.status.success() {
                    let stderr = String::from_utf8_lossy(&output.stderr);
                    return Err(Error::Camera(format!("ffmpeg failed: {}", stderr.trim())));
                }
                if output.stdout.is_empty() {
                    return Err(Error::Camera("ffmpeg returned empty output".to_string()));
                }
                Ok(output.stdout)
            }
            Ok(Err(e)) => Err(Error::Camera(format!("ffmpeg execution failed: {}", e))),
            Err(_) => {
                // Timeout: the Child was dropped and kill_on_drop sent SIGKILL
                tracing::warn!(
                    timeout_sec = self.timeout.as_secs(),
                    source = %self.source,
                    "ffmpeg capture timeout, process killed via kill_on_drop"
                );
                Err(Error::Camera(format!(
                    "ffmpeg timeout ({}s)",
                    self.timeout.as_secs()
                )))
            }
        }
    }
}

/// CaptureLoop instance
pub struct CaptureLoop {
    camera: Arc<dyn CameraSource>,
    frame_store: Arc<FrameStore>,
    tick: Duration,
    running: Arc<RwLock<bool>>,
}

impl CaptureLoop {
    /// Create a new CaptureLoop
    pub fn new(camera: Arc<dyn CameraSource>, frame_store: Arc<FrameStore>, tick: Duration) -> Self {
        Self {
            camera,
            frame_store,
            tick,
            running: Arc::new(RwLock::new(false)),
        }
    }

    /// Warmup probe: verify the camera can deliver a frame at all
    ///
    /// Startup is fatal only if every attempt fails; mid-run hiccups are
    /// handled per tick by the loop itself.
    pub async fn probe(&self, attempts: u32) -> Result<()> {
        let mut last_err = None;
        for attempt in 1..=attempts {
            match self.camera.read_frame().await {
                Ok(data) => {
                    self.frame_store.put(Frame::new(data)).await;
                    tracing::info!(attempt = attempt, "Camera probe succeeded");
                    return Ok(());
                }
                Err(e) => {
                    tracing::warn!(attempt = attempt, error = %e, "Camera probe failed");
                    last_err = Some(e);
                }
            }
        }
        Err(last_err.unwrap_or_else(|| Error::Camera("no probe attempts made".to_string())))
    }

    /// Start the capture loop
    pub async fn start(&self) {
        {
            let mut running = self.running.write().await;
            if *running {
                tracing::warn!("Capture loop already running");
                return;
            }
            *running = true;
        }

        tracing::info!(tick_ms = self.tick.as_millis() as u64, "Starting capture loop");

        let camera = self.camera.clone();
        let frame_store = self.frame_store.clone();
        let running = self.running.clone();
        let tick = self.tick;

        tokio::spawn(async move {
            let mut interval = interval(tick);

            loop {
                interval.tick().await;

                {
                    let is_running = running.read().await;
                    if !*is_running {
                        break;
                    }
                }

                match camera.read_frame().await {
                    Ok(data) => {
                        frame_store.put(Frame::new(data)).await;
                    }
                    Err(e) => {
                        // Transient read failure: skip this tick
                        tracing::debug!(error = %e, "Frame read failed, skipping tick");
                    }
                }
            }

            tracing::info!("Capture loop stopped");
        });
    }

    /// Whether the loop is currently running
    pub async fn is_running(&self) -> bool {
        *self.running.read().await
    }

    /// Stop the capture loop (releases the camera after the current tick)
    pub async fn stop(&self) {
        let mut running = self.running.write().await;
        *running = false;
        tracing::info!("Stopping capture loop");
    }
}
