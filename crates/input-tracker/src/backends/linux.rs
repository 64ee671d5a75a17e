//! Linux position sources.

use std::fs::OpenOptions;
use std::io::Read;
use std::os::unix::fs::MetadataExt;
use std::os::unix::fs::OpenOptionsExt;

use glide_common::config::SourceConfig;
use glide_common::error::{GlideError, GlideResult};
use glide_sample_model::Sample;

use super::ScriptedSource;
use crate::PositionSource;

const MICE_DEVICE: &str = "/dev/input/mice";

/// Absolute pointer position integrated from `/dev/input/mice` motion.
///
/// The mice device only reports relative PS/2 deltas, so the position
/// starts at the centre of the configured desktop and is clamped to it.
pub struct MiceDeviceSource {
    device: std::fs::File,
    x: i64,
    y: i64,
    width: i64,
    height: i64,
}

impl MiceDeviceSource {
    pub fn new(config: &SourceConfig) -> GlideResult<Self> {
        let device = OpenOptions::new()
            .read(true)
            .custom_flags(libc::O_NONBLOCK)
            .open(MICE_DEVICE)
            .map_err(|e| GlideError::platform(format!("Failed to open {MICE_DEVICE}: {e}")))?;

        let width = i64::from(config.desktop_width.max(1));
        let height = i64::from(config.desktop_height.max(1));

        Ok(Self {
            device,
            x: width / 2,
            y: height / 2,
            width,
            height,
        })
    }

    pub fn is_supported() -> bool {
        OpenOptions::new().read(true).open(MICE_DEVICE).is_ok()
    }

    fn ingest_packets(&mut self) -> GlideResult<()> {
        loop {
            let mut packet = [0u8; 3];
            match self.device.read(&mut packet) {
                Ok(3) => self.apply_motion(packet),
                Ok(_) => break,
                Err(err) if err.kind() == std::io::ErrorKind::WouldBlock => break,
                Err(err) => {
                    return Err(GlideError::acquisition(format!(
                        "Failed reading {MICE_DEVICE}: {err}"
                    )));
                }
            }
        }
        Ok(())
    }

    fn apply_motion(&mut self, packet: [u8; 3]) {
        let dx = i64::from(packet[1] as i8);
        let dy = i64::from(packet[2] as i8);

        // PS/2 reports +y as "up"; screen space grows downward.
        self.x = (self.x + dx).clamp(0, self.width - 1);
        self.y = (self.y - dy).clamp(0, self.height - 1);
    }
}

impl PositionSource for MiceDeviceSource {
    fn current_position(&mut self) -> GlideResult<Sample> {
        self.ingest_packets()?;
        Ok(Sample::new(self.x as i32, self.y as i32))
    }

    fn name(&self) -> &str {
        "mice-device"
    }

    fn is_available(&self) -> bool {
        true
    }
}

/// Detect the best available position source for the current system.
pub fn detect_best_source(config: &SourceConfig) -> Box<dyn PositionSource> {
    if MiceDeviceSource::is_supported() {
        match MiceDeviceSource::new(config) {
            Ok(source) => {
                tracing::info!("Using mice device position source");
                return Box::new(source);
            }
            Err(e) => {
                tracing::warn!(error = %e, "Failed to initialize mice device, using stationary source");
            }
        }
    }

    tracing::warn!(
        details = %mice_device_diagnostic(),
        "Using stationary position source; pointer motion will not be observed"
    );
    Box::new(ScriptedSource::stationary(Sample::new(
        (config.desktop_width / 2) as i32,
        (config.desktop_height / 2) as i32,
    )))
}

fn mice_device_diagnostic() -> String {
    // SAFETY: geteuid/getegid have no preconditions and cannot fail.
    let uid = unsafe { libc::geteuid() };
    let gid = unsafe { libc::getegid() };

    match std::fs::metadata(MICE_DEVICE) {
        Ok(meta) => {
            let mode = meta.mode() & 0o777;
            format!(
                "device={MICE_DEVICE} mode={mode:o} owner_uid={} owner_gid={} process_uid={uid} process_gid={gid}; likely missing 'input' group membership. Fix: sudo usermod -aG input $USER && log out/in",
                meta.uid(),
                meta.gid()
            )
        }
        Err(err) => format!(
            "device={MICE_DEVICE} unavailable ({err}); ensure kernel input device exists and permissions allow read access"
        ),
    }
}
