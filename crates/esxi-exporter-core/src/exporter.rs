//! The scrape pipeline: resolve → synthesize → render.

use std::time::Duration;

use tracing::debug;

use crate::collector::{PortResolver, ResolverOptions};
use crate::vsish::{Gateway, Vsish, VsishCommand};
use crate::{exposition, metrics, util};

/// Where the `esxi_name` label comes from.
#[derive(Debug, Clone)]
pub enum HostnameSource {
    /// Looked up on every scrape.
    System,
    Fixed(String),
}

/// Produces exposition text from a `vsish` implementation.
///
/// Holds no data between scrapes; every call starts from the port listing.
pub struct Exporter<V: Vsish> {
    resolver: PortResolver<V>,
    hostname: HostnameSource,
    hostname_timeout: Duration,
}

impl<V: Vsish> Exporter<V> {
    pub fn new(vsish: V, options: ResolverOptions) -> Self {
        Self {
            resolver: PortResolver::new(Gateway::new(vsish), options),
            hostname: HostnameSource::System,
            hostname_timeout: VsishCommand::DEFAULT_TIMEOUT,
        }
    }

    pub fn with_hostname(mut self, hostname: HostnameSource) -> Self {
        self.hostname = hostname;
        self
    }

    /// Bounds the system hostname lookup.
    pub fn with_hostname_timeout(mut self, limit: Duration) -> Self {
        self.hostname_timeout = limit;
        self
    }

    /// Runs one full poll and renders it.
    ///
    /// Never fails: unavailable data shrinks the output instead.
    pub async fn scrape(&mut self) -> String {
        let bundles = self.resolver.resolve().await;
        let esxi_name = match &self.hostname {
            HostnameSource::System => util::hostname(self.hostname_timeout).await,
            HostnameSource::Fixed(name) => name.clone(),
        };

        let samples = metrics::synthesize(&bundles, &esxi_name);
        debug!(ports = bundles.len(), samples = samples.len(), "scrape complete");
        exposition::render(&samples)
    }
}
