//! Fixed-cadence collection loop.
//!
//! One cycle calls every collector in turn. A collector that fails is logged
//! and skipped so the rest of the cycle still runs; only errors an operator
//! has to fix (pairing refused or revoked) stop the loop.

use std::future::Future;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::api::{ApiClient, ApiError};
use crate::models::{
    ConnectionXdsl, FreeplugNetwork, LanHost, RrdRow, SystemStatus, VpnConnection,
    WifiAccessPoint, WifiStation,
};

const DSL_FIELDS: &[&str] = &["rate_up", "rate_down", "snr_up", "snr_down"];
const TEMP_FIELDS: &[&str] = &["cpum", "cpub", "sw", "hdd", "fan_speed"];
const NET_FIELDS: &[&str] = &["bw_up", "bw_down", "rate_up", "rate_down", "vpn_rate_up", "vpn_rate_down"];
const SWITCH_FIELDS: &[&str] = &["rx_1", "tx_1", "rx_2", "tx_2", "rx_3", "tx_3", "rx_4", "tx_4"];

/// Everything one cycle managed to read. `None` means that collector failed
/// (or was skipped).
#[derive(Debug, Clone)]
pub struct Snapshot {
    pub collected_at: DateTime<Utc>,
    pub xdsl: Option<ConnectionXdsl>,
    pub dsl: Option<RrdRow>,
    pub temp: Option<RrdRow>,
    pub net: Option<RrdRow>,
    pub switch: Option<RrdRow>,
    pub freeplugs: Option<Vec<FreeplugNetwork>>,
    pub lan_hosts: Option<Vec<LanHost>>,
    pub system: Option<SystemStatus>,
    pub wifi: Option<Vec<(WifiAccessPoint, Vec<WifiStation>)>>,
    pub vpn: Option<Vec<VpnConnection>>,
    pub errors: usize,
}

impl Snapshot {
    fn empty() -> Self {
        Self {
            collected_at: Utc::now(),
            xdsl: None,
            dsl: None,
            temp: None,
            net: None,
            switch: None,
            freeplugs: None,
            lan_hosts: None,
            system: None,
            wifi: None,
            vpn: None,
            errors: 0,
        }
    }

    pub fn reachable_hosts(&self) -> usize {
        self.lan_hosts
            .iter()
            .flatten()
            .filter(|h| h.reachable)
            .count()
    }

    pub fn wifi_stations(&self) -> usize {
        self.wifi
            .iter()
            .flatten()
            .map(|(_, stations)| stations.len())
            .sum()
    }
}

pub struct Poller {
    client: ApiClient,
    interval: Duration,
    fiber: bool,
}

impl Poller {
    pub fn new(client: ApiClient, interval: Duration, fiber: bool) -> Self {
        Self {
            client,
            interval,
            fiber,
        }
    }

    /// Run one collection cycle.
    ///
    /// A failed login ends the cycle early with whatever was collected so far.
    pub async fn collect(&self) -> Result<Snapshot, ApiError> {
        let mut snap = Snapshot::empty();
        match self.collect_into(&mut snap).await {
            Ok(()) | Err(Halt::Cycle) => Ok(snap),
            Err(Halt::Fatal(e)) => Err(e),
        }
    }

    async fn collect_into(&self, snap: &mut Snapshot) -> Result<(), Halt> {
        let client = &self.client;

        // There is no DSL line on fibre boxes
        if !self.fiber {
            snap.xdsl = attempt("connection_xdsl", &mut snap.errors, client.fetch_connection_xdsl()).await?;
            snap.dsl = attempt("rrd_dsl", &mut snap.errors, client.fetch_rrd("dsl", DSL_FIELDS)).await?.flatten();
        }

        snap.temp = attempt("rrd_temp", &mut snap.errors, client.fetch_rrd("temp", TEMP_FIELDS)).await?.flatten();
        snap.net = attempt("rrd_net", &mut snap.errors, client.fetch_rrd("net", NET_FIELDS)).await?.flatten();
        snap.switch = attempt("rrd_switch", &mut snap.errors, client.fetch_rrd("switch", SWITCH_FIELDS)).await?.flatten();
        snap.freeplugs = attempt("freeplug", &mut snap.errors, client.fetch_freeplugs()).await?;
        snap.lan_hosts = attempt("lan", &mut snap.errors, client.fetch_lan_hosts()).await?;
        snap.system = attempt("system", &mut snap.errors, client.fetch_system()).await?;

        if let Some(access_points) =
            attempt("wifi", &mut snap.errors, client.fetch_wifi_access_points()).await?
        {
            let mut wifi = Vec::with_capacity(access_points.len());
            for ap in access_points {
                let stations = attempt("wifi_stations", &mut snap.errors, client.fetch_wifi_stations(ap.id))
                    .await?
                    .unwrap_or_default();
                wifi.push((ap, stations));
            }
            snap.wifi = Some(wifi);
        }

        snap.vpn = attempt("vpn", &mut snap.errors, client.fetch_vpn_connections()).await?;
        Ok(())
    }

    /// Collect every interval until `cancel` fires.
    pub async fn run(&self, cancel: CancellationToken) -> Result<(), ApiError> {
        loop {
            let snap = tokio::select! {
                snap = self.collect() => snap?,
                _ = cancel.cancelled() => break,
            };

            info!(
                errors = snap.errors,
                reachable_hosts = snap.reachable_hosts(),
                wifi_stations = snap.wifi_stations(),
                vpn_connections = snap.vpn.as_ref().map_or(0, Vec::len),
                "Collection cycle complete"
            );
            if let Some(ref system) = snap.system {
                debug!(
                    temperatures = ?system.temperatures(),
                    fan_rpm = system.fan_rpm,
                    uptime = system.uptime_val,
                    firmware = %system.firmware_version,
                    "System status"
                );
            }
            if let Some(ref xdsl) = snap.xdsl {
                debug!(
                    status = %xdsl.status.status,
                    attn_down_db = xdsl.down.attenuation_db(),
                    attn_up_db = xdsl.up.attenuation_db(),
                    snr_down_db = ?xdsl.down.snr_db(),
                    snr_up_db = ?xdsl.up.snr_db(),
                    "xDSL line"
                );
            }
            for member in snap.freeplugs.iter().flatten().flat_map(|n| &n.members) {
                debug!(
                    id = %member.id,
                    rx_bps = ?member.rx_bits_per_sec(),
                    tx_bps = ?member.tx_bits_per_sec(),
                    "Freeplug"
                );
            }
            for host in snap.lan_hosts.iter().flatten().filter(|h| h.reachable) {
                debug!(name = %host.primary_name, ip = host.primary_ip(), "Reachable host");
            }

            tokio::select! {
                _ = tokio::time::sleep(self.interval) => {}
                _ = cancel.cancelled() => break,
            }
        }

        info!("Poll loop stopped");
        Ok(())
    }
}

/// Why a cycle stopped before its last collector.
enum Halt {
    /// Login failed; try again next cycle.
    Cycle,
    Fatal(ApiError),
}

/// Await one collector. Recoverable failures are logged and counted; auth
/// failures end the cycle and fatal ones are returned.
async fn attempt<T, F>(name: &str, errors: &mut usize, fut: F) -> Result<Option<T>, Halt>
where
    F: Future<Output = Result<T, ApiError>>,
{
    match fut.await {
        Ok(value) => Ok(Some(value)),
        Err(e) if e.is_fatal() => Err(Halt::Fatal(e)),
        Err(e) if e.is_auth_failure() => {
            warn!(collector = name, error = %e, "Authentication failed, skipping the rest of this cycle");
            *errors += 1;
            Err(Halt::Cycle)
        }
        Err(e) => {
            warn!(collector = name, error = %e, "Collector failed");
            *errors += 1;
            Ok(None)
        }
    }
}
