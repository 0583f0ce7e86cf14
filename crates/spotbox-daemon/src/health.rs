//! Periodic system health checks with basic self-recovery.
//!
//! Runs beside the daemon core rather than inside it: nothing here touches
//! playback, it only watches the box the appliance runs on.

use crate::audio::AudioService;
use spotbox_proto::state::StateManager;
use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use sysinfo::{Disks, System};
use tokio::net::TcpStream;
use tokio::process::Command;
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

const CHECK_INTERVAL: Duration = Duration::from_secs(60);
const RETRY_INTERVAL: Duration = Duration::from_secs(10);
const USAGE_THRESHOLD_PCT: f64 = 80.0;

/// Reachability probe target: a public DNS resolver on its TCP port.
const PROBE_ADDR: (&str, u16) = ("8.8.8.8", 53);
const PROBE_TIMEOUT: Duration = Duration::from_secs(3);

/// One flag per monitored subsystem, refreshed on every pass.
#[derive(Debug, Clone, Copy)]
pub struct HealthChecks {
    pub audio: bool,
    pub network: bool,
    pub spotify: bool,
    pub disk: bool,
    pub memory: bool,
}

impl Default for HealthChecks {
    fn default() -> Self {
        Self {
            audio: false,
            network: false,
            spotify: false,
            disk: true,
            memory: true,
        }
    }
}

pub struct HealthMonitor {
    state_manager: Arc<StateManager>,
    audio: Arc<AudioService>,
    sys: System,
    checks: HealthChecks,
    recovery_attempts: HashMap<&'static str, u32>,
}

impl HealthMonitor {
    pub fn new(state_manager: Arc<StateManager>, audio: Arc<AudioService>) -> Self {
        Self {
            state_manager,
            audio,
            sys: System::new(),
            checks: HealthChecks::default(),
            recovery_attempts: HashMap::new(),
        }
    }

    pub fn spawn(mut self) -> JoinHandle<()> {
        tokio::spawn(async move {
            info!("Health monitor started");
            loop {
                match self.check_system_health().await {
                    Ok(()) => tokio::time::sleep(CHECK_INTERVAL).await,
                    Err(e) => {
                        error!("Health check error: {}", e);
                        tokio::time::sleep(RETRY_INTERVAL).await;
                    }
                }
            }
        })
    }

    async fn check_system_health(&mut self) -> anyhow::Result<()> {
        // CPU usage is the delta between two refreshes, so sample twice.
        self.sys.refresh_cpu_usage();
        tokio::time::sleep(Duration::from_secs(1)).await;
        self.sys.refresh_cpu_usage();
        let cpu_pct = self.sys.global_cpu_usage() as f64;
        if cpu_pct > USAGE_THRESHOLD_PCT {
            warn!("High CPU usage: {:.1}%", cpu_pct);
        }

        self.sys.refresh_memory();
        let memory_pct = percent_used(self.sys.total_memory(), self.sys.available_memory());
        self.checks.memory = memory_pct <= USAGE_THRESHOLD_PCT;
        if memory_pct > USAGE_THRESHOLD_PCT {
            warn!("High memory usage: {:.1}%", memory_pct);
        }

        let disks = Disks::new_with_refreshed_list();
        let root = disks
            .list()
            .iter()
            .find(|disk| disk.mount_point() == Path::new("/"))
            .or_else(|| disks.list().first())
            .ok_or_else(|| anyhow::anyhow!("no disks reported"))?;
        let disk_pct = percent_used(root.total_space(), root.available_space());
        self.checks.disk = disk_pct <= USAGE_THRESHOLD_PCT;
        if disk_pct > USAGE_THRESHOLD_PCT {
            warn!("High disk usage: {:.1}%", disk_pct);
            self.cleanup_disk().await;
        }

        self.checks.network = network_reachable().await;
        if !self.checks.network {
            error!("Network connectivity check failed");
            self.attempt_recovery("network").await;
        }

        self.checks.audio = self.audio.get_volume().await.is_ok();
        self.checks.spotify = self.state_manager.get_state().await.spotify_ok;

        info!("Health status: {:?}", self.checks);
        Ok(())
    }

    async fn attempt_recovery(&mut self, service: &'static str) {
        let attempts = {
            let entry = self.recovery_attempts.entry(service).or_insert(0);
            *entry += 1;
            *entry
        };
        if !should_attempt(attempts) {
            error!("Multiple recovery attempts failed for {}", service);
            if should_reset(attempts) {
                self.recovery_attempts.insert(service, 0);
            }
            return;
        }
        info!("Attempting recovery for {} (attempt {})", service, attempts);
        match service {
            "network" => self.recover_network().await,
            other => warn!("No recovery handler for {}", other),
        }
    }

    async fn recover_network(&self) {
        match run_command("systemctl", &["restart", "systemd-networkd"]).await {
            Ok(()) => info!("Network recovery completed"),
            Err(e) => error!("Network recovery failed: {}", e),
        }
    }

    async fn cleanup_disk(&self) {
        info!("Attempting disk cleanup");
        if let Err(e) = run_command("journalctl", &["--vacuum-time=7d"]).await {
            warn!("Journal vacuum failed: {}", e);
        }
        if let Err(e) = run_command("apt-get", &["clean"]).await {
            warn!("Package cache clean failed: {}", e);
        }
    }
}

async fn network_reachable() -> bool {
    matches!(
        tokio::time::timeout(PROBE_TIMEOUT, TcpStream::connect(PROBE_ADDR)).await,
        Ok(Ok(_))
    )
}

async fn run_command(program: &str, args: &[&str]) -> anyhow::Result<()> {
    let status = Command::new(program).args(args).status().await?;
    if !status.success() {
        anyhow::bail!("{} exited with {}", program, status);
    }
    Ok(())
}

fn percent_used(total: u64, available: u64) -> f64 {
    if total == 0 {
        return 0.0;
    }
    (total - available) as f64 / total as f64 * 100.0
}

/// Recovery is attempted a few times, then parked until the failure count
/// wraps past the reset point.
fn should_attempt(attempts: u32) -> bool {
    attempts <= 3
}

fn should_reset(attempts: u32) -> bool {
    attempts > 10
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_percent_used() {
        assert_eq!(percent_used(100, 50), 50.0);
        assert_eq!(percent_used(100, 0), 100.0);
        assert_eq!(percent_used(0, 0), 0.0);
        assert!((percent_used(1000, 150) - 85.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_recovery_attempt_window() {
        assert!(should_attempt(1));
        assert!(should_attempt(3));
        assert!(!should_attempt(4));
        assert!(!should_attempt(10));
    }

    #[test]
    fn test_recovery_counter_reset_point() {
        assert!(!should_reset(10));
        assert!(should_reset(11));
    }

    #[test]
    fn test_default_checks_start_pessimistic_for_services() {
        let checks = HealthChecks::default();
        assert!(!checks.audio);
        assert!(!checks.network);
        assert!(!checks.spotify);
        assert!(checks.disk);
        assert!(checks.memory);
    }
}
