//! Builders for `vsish` node paths.
//!
//! Every path the exporter reads is produced here, one function per family.

use super::PortId;

const OPEN_PORTS: &str = "/net/openPorts";
const PORTSETS: &str = "/net/portsets";

/// Per-device statistics nodes read in addition to the base `stats` node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SummaryKind {
    Vmxnet3Rx,
    Vmxnet3Tx,
    E1000Rx,
    E1000Tx,
}

impl SummaryKind {
    /// Node path relative to the port directory.
    pub fn node(self) -> &'static str {
        match self {
            SummaryKind::Vmxnet3Rx => "vmxnet3/rxSummary",
            SummaryKind::Vmxnet3Tx => "vmxnet3/txSummary",
            SummaryKind::E1000Rx => "e1000/rxQueueStats",
            SummaryKind::E1000Tx => "e1000/txQueueStats",
        }
    }
}

/// Directory listing every open port.
pub fn open_ports_root() -> &'static str {
    OPEN_PORTS
}

/// `/net/openPorts/{id}/type`
pub fn port_type(port: PortId) -> String {
    format!("{OPEN_PORTS}/{port}/type")
}

/// `/net/portsets/{portset}/ports/{id}/status`
pub fn port_status(portset: &str, port: PortId) -> String {
    format!("{}/status", port_dir(portset, port))
}

/// `/net/portsets/{portset}/ports/{id}/stats`
pub fn port_stats(portset: &str, port: PortId) -> String {
    format!("{}/stats", port_dir(portset, port))
}

/// `/net/portsets/{portset}/ports/{id}/{vmxnet3|e1000}/...`
pub fn summary(portset: &str, port: PortId, kind: SummaryKind) -> String {
    format!("{}/{}", port_dir(portset, port), kind.node())
}

fn port_dir(portset: &str, port: PortId) -> String {
    format!("{PORTSETS}/{portset}/ports/{port}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_paths() {
        assert_eq!(port_type(33554433), "/net/openPorts/33554433/type");
        assert_eq!(
            port_status("vSwitch0", 17),
            "/net/portsets/vSwitch0/ports/17/status"
        );
        assert_eq!(
            port_stats("vSwitch0", 17),
            "/net/portsets/vSwitch0/ports/17/stats"
        );
        assert_eq!(
            summary("vSwitch0", 17, SummaryKind::Vmxnet3Rx),
            "/net/portsets/vSwitch0/ports/17/vmxnet3/rxSummary"
        );
        assert_eq!(
            summary("DvsPortset-0", 5, SummaryKind::E1000Tx),
            "/net/portsets/DvsPortset-0/ports/5/e1000/txQueueStats"
        );
    }
}
