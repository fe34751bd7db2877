//! In-memory `vsish` for testing without an ESXi host.
//!
//! `MockVsish` stores the text `vsish` would print for each node, so tests
//! (and the `--mock` server mode) drive the real parser and resolver.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;

use super::paths::{self, SummaryKind};
use super::{CommandError, PortId, Vsish};

/// One recorded invocation.
#[derive(Debug, Clone, PartialEq)]
pub enum MockCall {
    Ls(String),
    Cat(Vec<String>),
}

/// In-memory introspection tool.
#[derive(Debug, Default)]
pub struct MockVsish {
    /// Map from directory path to `ls` output.
    listings: HashMap<String, String>,
    /// Map from node path to its `cat -p` record.
    nodes: HashMap<String, String>,
    fail_ls: bool,
    /// `cat` fails when any requested path contains one of these.
    fail_cat_on: Vec<String>,
    calls: Mutex<Vec<MockCall>>,
}

impl MockVsish {
    /// Creates an empty mock; every `ls` prints nothing.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the `ls` output for a directory.
    pub fn set_listing(&mut self, path: impl Into<String>, output: impl Into<String>) {
        self.listings.insert(path.into(), output.into());
    }

    /// Adds the record printed by `cat` for a node.
    pub fn add_node(&mut self, path: impl Into<String>, record: impl Into<String>) {
        self.nodes.insert(path.into(), record.into());
    }

    /// Makes every `ls` fail.
    pub fn fail_ls(&mut self, fail: bool) {
        self.fail_ls = fail;
    }

    /// Makes any `cat` whose paths contain `pattern` fail.
    pub fn fail_cat_on(&mut self, pattern: impl Into<String>) {
        self.fail_cat_on.push(pattern.into());
    }

    /// Adds an open port with its type, status and stats nodes.
    ///
    /// The port is appended to the `/net/openPorts` listing.
    pub fn add_port(
        &mut self,
        port: PortId,
        portset: &str,
        client_type: i64,
        client_sub_type: i64,
        client_name: &str,
        stats: &str,
    ) {
        let listing = self
            .listings
            .entry(paths::open_ports_root().to_string())
            .or_default();
        listing.push_str(&format!("{port}/\n"));

        self.add_node(
            paths::port_type(port),
            format!("{{\n   \"portCfg\":\"\",\n   \"portsetName\":\"{portset}\",\n}}"),
        );
        self.add_node(
            paths::port_status(portset, port),
            format!(
                "{{\n   \"clientType\":{client_type},\n   \"clientSubType\":{client_sub_type},\n   \"clientName\":\"{client_name}\",\n}}"
            ),
        );
        self.add_node(paths::port_stats(portset, port), stats);
    }

    /// Adds a device summary node for an existing port.
    pub fn add_summary(&mut self, port: PortId, portset: &str, kind: SummaryKind, record: &str) {
        self.add_node(paths::summary(portset, port, kind), record);
    }

    /// Invocations made so far, oldest first.
    pub fn calls(&self) -> Vec<MockCall> {
        self.calls.lock().map(|c| c.clone()).unwrap_or_default()
    }

    fn record(&self, call: MockCall) {
        if let Ok(mut calls) = self.calls.lock() {
            calls.push(call);
        }
    }

    /// A host with one VMXNET3 vNIC, one E1000 vNIC, one physical uplink
    /// and one port without a client.
    pub fn sample_host() -> Self {
        let mut vsish = Self::new();

        vsish.add_port(
            33554436,
            "vSwitch0",
            5,
            9,
            "web01.eth0",
            "{\n   \"pktsTx\":184223,\n   \"pktsTxMulticast\":12,\n   \"pktsTxBroadcast\":3,\n   \"bytesTx\":24338117,\n   \"pktsRx\":201117,\n   \"bytesRx\":190229311,\n   \"droppedTx\":0,\n   \"droppedRx\":4,\n}",
        );
        vsish.add_summary(
            33554436,
            "vSwitch0",
            SummaryKind::Vmxnet3Rx,
            "{\n   \"lroPktsRxOk\":0,\n   \"pktsRxOk\":201117,\n   \"outOfBuffers\":0,\n   \"ring1Full\":2,\n}",
        );
        vsish.add_summary(
            33554436,
            "vSwitch0",
            SummaryKind::Vmxnet3Tx,
            "{\n   \"pktsTxOk\":184223,\n   \"tsoPktsTx\":311,\n   \"ringFull\":0,\n}",
        );

        vsish.add_port(
            33554437,
            "vSwitch0",
            5,
            7,
            "legacy01.eth0",
            "{\n   \"pktsTx\":5120,\n   \"bytesTx\":611200,\n   \"pktsRx\":6001,\n   \"bytesRx\":702334,\n}",
        );
        vsish.add_summary(
            33554437,
            "vSwitch0",
            SummaryKind::E1000Rx,
            "{\n   \"pktsRx\":6001,\n   \"avgBatch\":1.75,\n}",
        );
        vsish.add_summary(
            33554437,
            "vSwitch0",
            SummaryKind::E1000Tx,
            "{\n   \"pktsTx\":5120,\n}",
        );

        vsish.add_port(
            33554434,
            "vSwitch0",
            4,
            0,
            "vmnic0",
            "{\n   \"pktsTx\":9912345,\n   \"bytesTx\":8811223344,\n   \"pktsRx\":10022334,\n   \"bytesRx\":9911882233,\n}",
        );

        vsish.add_port(
            33554433,
            "vSwitch0",
            0,
            0,
            "",
            "{\n   \"pktsTx\":0,\n   \"pktsRx\":0,\n}",
        );

        vsish
    }
}

#[async_trait]
impl Vsish for MockVsish {
    async fn ls(&self, path: &str) -> Result<String, CommandError> {
        self.record(MockCall::Ls(path.to_string()));
        if self.fail_ls {
            return Err(CommandError::Failed {
                status: "exit status: 1".to_string(),
                stderr: "mock: ls failed".to_string(),
            });
        }
        Ok(self.listings.get(path).cloned().unwrap_or_default())
    }

    async fn cat(&self, paths: &[String]) -> Result<String, CommandError> {
        self.record(MockCall::Cat(paths.to_vec()));
        if paths
            .iter()
            .any(|p| self.fail_cat_on.iter().any(|pattern| p.contains(pattern.as_str())))
        {
            return Err(CommandError::Failed {
                status: "exit status: 1".to_string(),
                stderr: "mock: cat failed".to_string(),
            });
        }

        // Unknown nodes print nothing, which the batch parser sees as a
        // short record count.
        let mut out = String::new();
        for path in paths {
            if let Some(record) = self.nodes.get(path) {
                out.push_str(record);
                out.push('\n');
            }
        }
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_add_port_builds_listing_and_nodes() {
        let mut vsish = MockVsish::new();
        vsish.add_port(17, "vSwitch0", 5, 9, "vnic0", "{ \"txBytes\":100 }");
        vsish.add_port(33, "vSwitch0", 4, 0, "pnic0", "{ \"txBytes\":200 }");

        assert_eq!(vsish.ls("/net/openPorts").await.unwrap(), "17/\n33/\n");
        let out = vsish
            .cat(&[paths::port_stats("vSwitch0", 33)])
            .await
            .unwrap();
        assert!(out.contains("200"));
    }

    #[tokio::test]
    async fn test_calls_are_recorded() {
        let vsish = MockVsish::new();
        vsish.ls("/net/openPorts").await.unwrap();
        vsish.cat(&["/a".to_string()]).await.unwrap();

        assert_eq!(
            vsish.calls(),
            vec![
                MockCall::Ls("/net/openPorts".to_string()),
                MockCall::Cat(vec!["/a".to_string()]),
            ]
        );
    }

    #[tokio::test]
    async fn test_fail_cat_on_pattern() {
        let mut vsish = MockVsish::new();
        vsish.fail_cat_on("/status");

        assert!(vsish.cat(&["/x/type".to_string()]).await.is_ok());
        assert!(vsish.cat(&["/x/type".to_string(), "/x/status".to_string()]).await.is_err());
    }
}
