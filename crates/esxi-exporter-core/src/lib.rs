//! esxi-exporter-core - per-port network statistics from ESXi `vsish`.
//!
//! Provides:
//! - `vsish` - the introspection tool boundary (real command, mock), path
//!   builders and the output parser
//! - `collector` - the port hierarchy resolver and its data model
//! - `metrics` - flattening resolved ports into labeled samples
//! - `exposition` - rendering samples as scrape text
//! - `exporter` - the full scrape pipeline
//! - `util` - helper utilities

pub mod collector;
pub mod exporter;
pub mod exposition;
pub mod metrics;
pub mod util;
pub mod vsish;

/// Crate version with the short git SHA of the build.
pub const VERSION: &str = concat!(env!("CARGO_PKG_VERSION"), "-", env!("GIT_SHA"));
