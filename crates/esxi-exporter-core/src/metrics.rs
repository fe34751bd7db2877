//! Flattening resolved ports into labeled samples.

use crate::collector::{PortBundle, StatRecord};
use crate::vsish::PortId;
use crate::vsish::paths::SummaryKind;

/// Prefix of metrics built from a port's base `stats` node.
pub const STATS_PREFIX: &str = "esxi_";

/// Metric name prefix for a device summary family.
pub fn summary_prefix(kind: SummaryKind) -> &'static str {
    match kind {
        SummaryKind::Vmxnet3Rx => "esxi_vmxnet3_rx_",
        SummaryKind::Vmxnet3Tx => "esxi_vmxnet3_tx_",
        SummaryKind::E1000Rx => "esxi_e1000_rx_",
        SummaryKind::E1000Tx => "esxi_e1000_tx_",
    }
}

/// Labels attached to every sample of a port.
#[derive(Debug, Clone, PartialEq)]
pub struct Labels {
    pub esxi_name: String,
    pub port_id: PortId,
    pub client_name: String,
}

/// One metric value.
#[derive(Debug, Clone, PartialEq)]
pub struct MetricSample {
    pub name: String,
    pub labels: Labels,
    pub value: i64,
}

/// Builds samples for every bundle.
///
/// Per port: base stats first, then the device summaries in the order they
/// were read.
pub fn synthesize(bundles: &[PortBundle], esxi_name: &str) -> Vec<MetricSample> {
    let mut samples = Vec::new();

    for bundle in bundles {
        let labels = Labels {
            esxi_name: esxi_name.to_string(),
            port_id: bundle.port_id,
            client_name: bundle.status.client_name.clone(),
        };

        push_record(&mut samples, STATS_PREFIX, &bundle.stats, &labels);
        for (kind, record) in &bundle.summaries {
            push_record(&mut samples, summary_prefix(*kind), record, &labels);
        }
    }

    samples
}

fn push_record(samples: &mut Vec<MetricSample>, prefix: &str, record: &StatRecord, labels: &Labels) {
    samples.extend(record.iter().map(|(key, value)| MetricSample {
        name: format!("{prefix}{key}"),
        labels: labels.clone(),
        value,
    }));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collector::{ClientSubType, ClientType, PortStatus};

    fn bundle(port_id: PortId, name: &str, summaries: Vec<(SummaryKind, StatRecord)>) -> PortBundle {
        PortBundle {
            port_id,
            portset_name: "vSwitch0".to_string(),
            status: PortStatus {
                client_type: ClientType::VirtualNic,
                client_sub_type: Some(ClientSubType::Vmxnet3),
                client_name: name.to_string(),
            },
            stats: [("txBytes", 100), ("rxBytes", 50)].into_iter().collect(),
            summaries,
        }
    }

    #[test]
    fn test_base_stats_prefix_and_labels() {
        let samples = synthesize(&[bundle(17, "vnic0", vec![])], "esx01");

        assert_eq!(samples.len(), 2);
        assert_eq!(samples[0].name, "esxi_txBytes");
        assert_eq!(samples[0].value, 100);
        assert_eq!(samples[1].name, "esxi_rxBytes");
        assert_eq!(
            samples[0].labels,
            Labels {
                esxi_name: "esx01".to_string(),
                port_id: 17,
                client_name: "vnic0".to_string(),
            }
        );
    }

    #[test]
    fn test_summary_prefixes() {
        let summaries = vec![
            (SummaryKind::Vmxnet3Rx, [("pktsRx", 5)].into_iter().collect()),
            (SummaryKind::Vmxnet3Tx, [("pktsTx", 6)].into_iter().collect()),
        ];
        let names: Vec<String> = synthesize(&[bundle(17, "vnic0", summaries)], "h")
            .into_iter()
            .map(|s| s.name)
            .collect();
        assert_eq!(
            names,
            [
                "esxi_txBytes",
                "esxi_rxBytes",
                "esxi_vmxnet3_rx_pktsRx",
                "esxi_vmxnet3_tx_pktsTx"
            ]
        );
    }

    #[test]
    fn test_e1000_prefixes() {
        assert_eq!(summary_prefix(SummaryKind::E1000Rx), "esxi_e1000_rx_");
        assert_eq!(summary_prefix(SummaryKind::E1000Tx), "esxi_e1000_tx_");
    }

    #[test]
    fn test_empty_stats_emit_nothing() {
        let mut b = bundle(1, "x", vec![]);
        b.stats = StatRecord::default();
        assert!(synthesize(&[b], "h").is_empty());
        assert!(synthesize(&[], "h").is_empty());
    }
}
