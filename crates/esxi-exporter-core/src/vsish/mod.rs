//! Access to the ESXi `vsish` introspection tool.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────┐
//! │                  Gateway                     │
//! │  list_open_ports()   batch_read(paths)       │
//! │          │                  │                │
//! │          │           ┌──────▼──────┐         │
//! │          │           │   parser    │         │
//! │          │           └──────▲──────┘         │
//! │          └───────┬──────────┘                │
//! │           ┌──────▼──────┐                    │
//! │           │    Vsish    │ (trait)            │
//! │           └──────┬──────┘                    │
//! └──────────────────┼───────────────────────────┘
//!            ┌───────┴────────┐
//!     ┌──────▼──────┐  ┌──────▼──────┐
//!     │ VsishCommand│  │  MockVsish  │
//!     │ (ESXi host) │  │  (Testing)  │
//!     └─────────────┘  └─────────────┘
//! ```
//!
//! `Vsish` implementations only move raw text; parsing and the batch
//! consistency rules live in [`Gateway`] so they are exercised by tests too.

mod command;
pub mod mock;
pub mod parser;
pub mod paths;

use std::collections::HashMap;

use async_trait::async_trait;
use tracing::debug;

pub use command::VsishCommand;
pub use mock::MockVsish;
pub use parser::{ParseError, Value};

/// Port identifier as listed under `/net/openPorts`.
pub type PortId = u64;

/// Error type for `vsish` invocations.
#[derive(Debug)]
pub enum CommandError {
    /// The process could not be started.
    Spawn(String),
    /// The process exited unsuccessfully.
    Failed { status: String, stderr: String },
    /// The process did not finish within the configured timeout.
    Timeout(std::time::Duration),
    /// The process succeeded but its output was not usable.
    InvalidOutput(String),
}

impl std::fmt::Display for CommandError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CommandError::Spawn(msg) => write!(f, "vsish: failed to start: {}", msg),
            CommandError::Failed { status, stderr } => {
                write!(f, "vsish: exited with {}: {}", status, stderr.trim())
            }
            CommandError::Timeout(after) => write!(f, "vsish: timed out after {:?}", after),
            CommandError::InvalidOutput(msg) => write!(f, "vsish: invalid output: {}", msg),
        }
    }
}

impl std::error::Error for CommandError {}

/// Raw access to the introspection tool.
///
/// Implementations return the tool's standard output untouched.
#[async_trait]
pub trait Vsish: Send + Sync {
    /// Lists the children of a node (`vsish -e ls PATH`).
    async fn ls(&self, path: &str) -> Result<String, CommandError>;

    /// Reads several nodes in one invocation (`vsish -p -e cat PATH...`).
    ///
    /// The output holds one record per path, in request order.
    async fn cat(&self, paths: &[String]) -> Result<String, CommandError>;
}

#[async_trait]
impl<T: Vsish + ?Sized> Vsish for Box<T> {
    async fn ls(&self, path: &str) -> Result<String, CommandError> {
        (**self).ls(path).await
    }

    async fn cat(&self, paths: &[String]) -> Result<String, CommandError> {
        (**self).cat(paths).await
    }
}

/// Typed operations on top of a [`Vsish`] implementation.
pub struct Gateway<V: Vsish> {
    vsish: V,
}

impl<V: Vsish> Gateway<V> {
    pub fn new(vsish: V) -> Self {
        Self { vsish }
    }

    /// Returns the underlying tool implementation.
    pub fn vsish(&self) -> &V {
        &self.vsish
    }

    /// Lists open port ids in the order the tool reports them.
    pub async fn list_open_ports(&self) -> Result<Vec<PortId>, CommandError> {
        let output = self.vsish.ls(paths::open_ports_root()).await?;
        parse_port_listing(&output)
    }

    /// Reads `paths` in one invocation and keys the parsed records by path.
    ///
    /// An output that does not parse, or does not hold exactly one record
    /// per path, yields an empty map.
    pub async fn batch_read(&self, paths: &[String]) -> Result<HashMap<String, Value>, CommandError> {
        if paths.is_empty() {
            return Ok(HashMap::new());
        }
        let output = self.vsish.cat(paths).await?;
        let records = parser::parse_batch(&output, paths);
        debug!(requested = paths.len(), parsed = records.len(), "vsish batch read");
        Ok(records)
    }
}

/// Parses `ls` output such as `"33554433/\n33554434/\n"` into port ids.
fn parse_port_listing(output: &str) -> Result<Vec<PortId>, CommandError> {
    output
        .split_whitespace()
        .map(|entry| {
            entry
                .trim_end_matches('/')
                .parse::<PortId>()
                .map_err(|_| CommandError::InvalidOutput(format!("not a port id: {:?}", entry)))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_port_listing() {
        let ports = parse_port_listing("33554433/\n33554434/\n50331650/\n").unwrap();
        assert_eq!(ports, vec![33554433, 33554434, 50331650]);
    }

    #[test]
    fn test_parse_port_listing_empty() {
        assert!(parse_port_listing("").unwrap().is_empty());
        assert!(parse_port_listing("\n").unwrap().is_empty());
    }

    #[test]
    fn test_parse_port_listing_rejects_garbage() {
        let err = parse_port_listing("17/\nnot-a-port/\n").unwrap_err();
        assert!(matches!(err, CommandError::InvalidOutput(_)));
    }

    #[tokio::test]
    async fn test_list_open_ports_uses_root_path() {
        let mut vsish = MockVsish::new();
        vsish.set_listing(paths::open_ports_root(), "17/\n33/\n");
        let gateway = Gateway::new(vsish);

        assert_eq!(gateway.list_open_ports().await.unwrap(), vec![17, 33]);
    }

    #[tokio::test]
    async fn test_list_open_ports_propagates_failure() {
        let mut vsish = MockVsish::new();
        vsish.fail_ls(true);
        let gateway = Gateway::new(vsish);

        assert!(gateway.list_open_ports().await.is_err());
    }

    #[tokio::test]
    async fn test_batch_read_keys_records_by_path() {
        let mut vsish = MockVsish::new();
        vsish.add_node("/net/openPorts/17/type", "{ \"portsetName\":\"vSwitch0\", }");
        vsish.add_node("/net/openPorts/33/type", "{ \"portsetName\":\"vSwitch1\", }");
        let gateway = Gateway::new(vsish);

        let paths = vec![paths::port_type(33), paths::port_type(17)];
        let records = gateway.batch_read(&paths).await.unwrap();
        assert_eq!(
            records[&paths::port_type(33)].get("portsetName").and_then(Value::as_str),
            Some("vSwitch1")
        );
        assert_eq!(
            records[&paths::port_type(17)].get("portsetName").and_then(Value::as_str),
            Some("vSwitch0")
        );
    }

    #[tokio::test]
    async fn test_batch_read_missing_node_discards_batch() {
        let mut vsish = MockVsish::new();
        vsish.add_node("/net/openPorts/17/type", "{ \"portsetName\":\"vSwitch0\", }");
        let gateway = Gateway::new(vsish);

        // The mock prints nothing for an unknown node, like vsish does on a
        // vanished port, so the record count falls short.
        let paths = vec![paths::port_type(17), paths::port_type(99)];
        assert!(gateway.batch_read(&paths).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_batch_read_empty_skips_invocation() {
        let vsish = MockVsish::new();
        let gateway = Gateway::new(vsish);

        assert!(gateway.batch_read(&[]).await.unwrap().is_empty());
        assert!(gateway.vsish().calls().is_empty());
    }
}
