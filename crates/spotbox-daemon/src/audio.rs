//! ALSA volume control, driven through the `amixer` binary.

use anyhow::Context;
use spotbox_proto::platform;
use std::path::PathBuf;
use tokio::process::Command;
use tracing::{debug, info};

/// Route table downmixing both input channels onto the single speaker.
/// Slaving to `sysdefault` keeps the chain from looping back through the
/// overridden `!default`.
const ASOUNDRC_MONO: &str = "\
pcm.!default {
    type plug
    slave.pcm \"mono\"
}

pcm.mono {
    type route
    slave.pcm \"sysdefault\"
    ttable.0.0 0.5
    ttable.1.0 0.5
}
";

pub struct AudioService {
    amixer: PathBuf,
    control: String,
}

impl AudioService {
    pub fn new(control: String) -> anyhow::Result<Self> {
        let amixer = platform::find_amixer_binary()
            .context("amixer not found next to the executable or on PATH")?;
        debug!("Using amixer at {:?}", amixer);
        Ok(Self { amixer, control })
    }

    /// Sets the mixer control to `percent` (clamped to 100).
    pub async fn set_volume(&self, percent: u8) -> anyhow::Result<()> {
        let level = format!("{}%", percent.min(100));
        let output = Command::new(&self.amixer)
            .arg("set")
            .arg(&self.control)
            .arg(&level)
            .output()
            .await
            .context("failed to run amixer set")?;
        if !output.status.success() {
            anyhow::bail!(
                "amixer set exited with {}: {}",
                output.status,
                String::from_utf8_lossy(&output.stderr).trim()
            );
        }
        debug!("Volume set to {}", level);
        Ok(())
    }

    /// Reads the current mixer level back as a percentage.
    pub async fn get_volume(&self) -> anyhow::Result<u8> {
        let output = Command::new(&self.amixer)
            .arg("get")
            .arg(&self.control)
            .output()
            .await
            .context("failed to run amixer get")?;
        if !output.status.success() {
            anyhow::bail!(
                "amixer get exited with {}: {}",
                output.status,
                String::from_utf8_lossy(&output.stderr).trim()
            );
        }
        parse_volume(&String::from_utf8_lossy(&output.stdout))
            .context("no volume percentage in amixer output")
    }

    /// Writes an `~/.asoundrc` that downmixes stereo output to mono, for
    /// single-speaker enclosures. Existing contents are replaced.
    pub async fn setup_mono_output(&self) -> anyhow::Result<()> {
        let path = platform::asoundrc_path();
        tokio::fs::write(&path, ASOUNDRC_MONO)
            .await
            .with_context(|| format!("failed to write {path:?}"))?;
        info!("Mono output configured at {:?}", path);
        Ok(())
    }
}

/// Pulls the first `[NN%]` field out of `amixer get` output.
fn parse_volume(output: &str) -> Option<u8> {
    for part in output.split('[').skip(1) {
        if let Some(end) = part.find("%]") {
            if let Ok(level) = part[..end].trim().parse::<u8>() {
                return Some(level.min(100));
            }
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    const AMIXER_OUTPUT: &str = "\
Simple mixer control 'PCM',0
  Capabilities: pvolume pvolume-joined pswitch pswitch-joined
  Playback channels: Mono
  Limits: Playback -10239 - 400
  Mono: Playback -2000 [77%] [-20.00dB] [on]
";

    #[test]
    fn test_parse_volume_from_amixer_output() {
        assert_eq!(parse_volume(AMIXER_OUTPUT), Some(77));
    }

    #[test]
    fn test_parse_volume_ignores_non_percent_fields() {
        assert_eq!(parse_volume("Mono: Playback 0 [-20.00dB] [42%] [on]"), Some(42));
    }

    #[test]
    fn test_parse_volume_missing() {
        assert_eq!(parse_volume("Simple mixer control 'PCM',0"), None);
        assert_eq!(parse_volume(""), None);
    }

    #[test]
    fn test_mono_asoundrc_routes_both_channels() {
        assert!(ASOUNDRC_MONO.contains("ttable.0.0 0.5"));
        assert!(ASOUNDRC_MONO.contains("ttable.1.0 0.5"));
        assert!(ASOUNDRC_MONO.contains("pcm.!default"));
        assert!(ASOUNDRC_MONO.contains("slave.pcm \"sysdefault\""));
    }
}
