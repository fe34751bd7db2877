//! Shared application state.

use std::sync::Arc;

use tokio::sync::Mutex;

use esxi_exporter_core::exporter::Exporter;
use esxi_exporter_core::vsish::Vsish;

/// The exporter behind a lock: one scrape runs at a time, so `vsish` is
/// never invoked concurrently by this process.
pub(crate) type SharedExporter = Arc<Mutex<Exporter<Box<dyn Vsish>>>>;
