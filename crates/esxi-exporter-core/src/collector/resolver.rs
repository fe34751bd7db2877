//! Resolves open ports into per-port bundles.
//!
//! Resolution runs four batched stages, each depending on the previous one:
//!
//! 1. list `/net/openPorts`
//! 2. read every port's `type` node → portset name
//! 3. read every port's `status` node → client type, subtype and name
//! 4. read every port's `stats` node plus the device summaries its client
//!    type calls for
//!
//! A failed or inconsistent batch yields no data for that stage; ports with
//! nothing to go on are dropped, never the whole poll.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use tracing::{debug, warn};

use super::model::{ClientSubType, PortBundle, PortStatus, PortType, StatRecord};
use crate::vsish::paths::{self, SummaryKind};
use crate::vsish::{Gateway, PortId, Value, Vsish};

/// Timing of each resolution stage.
#[derive(Debug, Clone, Default)]
pub struct CollectTiming {
    pub total: Duration,
    pub list: Duration,
    pub types: Duration,
    pub status: Duration,
    pub stats: Duration,
}

/// Knobs for what gets read in stage 4.
#[derive(Debug, Clone, Default)]
pub struct ResolverOptions {
    /// Read `e1000/rxQueueStats` and `e1000/txQueueStats` for E1000 vNICs.
    pub e1000_stats: bool,
}

impl ResolverOptions {
    /// Device summaries to read for a port with the given status.
    pub fn summaries_for(&self, status: &PortStatus) -> &'static [SummaryKind] {
        if status.is_virtual_nic(ClientSubType::Vmxnet3) {
            &[SummaryKind::Vmxnet3Rx, SummaryKind::Vmxnet3Tx]
        } else if status.is_virtual_nic(ClientSubType::E1000) && self.e1000_stats {
            &[SummaryKind::E1000Rx, SummaryKind::E1000Tx]
        } else {
            &[]
        }
    }
}

/// A port that made it through stage 3.
struct KnownPort {
    port: PortId,
    portset_name: String,
    status: PortStatus,
}

/// Drives the stage chain against a [`Gateway`].
pub struct PortResolver<V: Vsish> {
    gateway: Gateway<V>,
    options: ResolverOptions,
    /// Timing information from the last resolve call.
    last_timing: Option<CollectTiming>,
}

impl<V: Vsish> PortResolver<V> {
    pub fn new(gateway: Gateway<V>, options: ResolverOptions) -> Self {
        Self {
            gateway,
            options,
            last_timing: None,
        }
    }

    pub fn gateway(&self) -> &Gateway<V> {
        &self.gateway
    }

    pub fn last_timing(&self) -> Option<&CollectTiming> {
        self.last_timing.as_ref()
    }

    /// Runs all four stages and returns bundles in listing order.
    pub async fn resolve(&mut self) -> Vec<PortBundle> {
        let start = Instant::now();
        let mut timing = CollectTiming::default();

        let t = Instant::now();
        let ports = match self.gateway.list_open_ports().await {
            Ok(ports) => ports,
            Err(e) => {
                warn!(error = %e, "listing open ports failed");
                Vec::new()
            }
        };
        timing.list = t.elapsed();

        let t = Instant::now();
        let typed = self.resolve_types(&ports).await;
        timing.types = t.elapsed();

        let t = Instant::now();
        let known = self.resolve_status(typed).await;
        timing.status = t.elapsed();

        let t = Instant::now();
        let bundles = self.resolve_stats(known).await;
        timing.stats = t.elapsed();

        timing.total = start.elapsed();
        debug!(
            ports = ports.len(),
            bundles = bundles.len(),
            total_ms = timing.total.as_millis() as u64,
            list_ms = timing.list.as_millis() as u64,
            types_ms = timing.types.as_millis() as u64,
            status_ms = timing.status.as_millis() as u64,
            stats_ms = timing.stats.as_millis() as u64,
            "ports resolved"
        );
        self.last_timing = Some(timing);

        bundles
    }

    /// Stage 2: portset name per port.
    async fn resolve_types(&self, ports: &[PortId]) -> Vec<(PortId, String)> {
        let type_paths: Vec<String> = ports.iter().map(|&port| paths::port_type(port)).collect();
        let records = self.read_batch("type", &type_paths).await;

        ports
            .iter()
            .zip(&type_paths)
            .filter_map(|(&port, path)| {
                match records.get(path).and_then(PortType::from_value) {
                    Some(port_type) => Some((port, port_type.portset_name)),
                    None => {
                        debug!(port, "no type record, skipping port");
                        None
                    }
                }
            })
            .collect()
    }

    /// Stage 3: client status per port.
    async fn resolve_status(&self, typed: Vec<(PortId, String)>) -> Vec<KnownPort> {
        let status_paths: Vec<String> = typed
            .iter()
            .map(|(port, portset)| paths::port_status(portset, *port))
            .collect();
        let records = self.read_batch("status", &status_paths).await;

        typed
            .into_iter()
            .zip(&status_paths)
            .filter_map(|((port, portset_name), path)| {
                match records.get(path).and_then(PortStatus::from_value) {
                    Some(status) => Some(KnownPort {
                        port,
                        portset_name,
                        status,
                    }),
                    None => {
                        debug!(port, portset = %portset_name, "no status record, skipping port");
                        None
                    }
                }
            })
            .collect()
    }

    /// Stage 4: base stats for every port plus device summaries, in one batch.
    async fn resolve_stats(&self, known: Vec<KnownPort>) -> Vec<PortBundle> {
        let mut data_paths = Vec::new();
        for port in &known {
            data_paths.push(paths::port_stats(&port.portset_name, port.port));
            for &kind in self.options.summaries_for(&port.status) {
                data_paths.push(paths::summary(&port.portset_name, port.port, kind));
            }
        }
        let records = self.read_batch("stats", &data_paths).await;

        known
            .into_iter()
            .filter_map(|known| {
                let stats_path = paths::port_stats(&known.portset_name, known.port);
                let Some(stats) = records.get(&stats_path).and_then(StatRecord::from_value) else {
                    debug!(port = known.port, "no stats record, skipping port");
                    return None;
                };

                let summaries = self
                    .options
                    .summaries_for(&known.status)
                    .iter()
                    .filter_map(|&kind| {
                        let path = paths::summary(&known.portset_name, known.port, kind);
                        records
                            .get(&path)
                            .and_then(StatRecord::from_value)
                            .map(|record| (kind, record))
                    })
                    .collect();

                Some(PortBundle {
                    port_id: known.port,
                    portset_name: known.portset_name,
                    status: known.status,
                    stats,
                    summaries,
                })
            })
            .collect()
    }

    async fn read_batch(&self, stage: &'static str, paths: &[String]) -> HashMap<String, Value> {
        match self.gateway.batch_read(paths).await {
            Ok(records) => records,
            Err(e) => {
                warn!(stage, paths = paths.len(), error = %e, "batch read failed");
                HashMap::new()
            }
        }
    }
}
