//! Per-port network data collection from `vsish`.
//!
//! # Usage
//!
//! ```
//! use esxi_exporter_core::collector::{PortResolver, ResolverOptions};
//! use esxi_exporter_core::vsish::{Gateway, MockVsish};
//!
//! # tokio::runtime::Builder::new_current_thread().build().unwrap().block_on(async {
//! let gateway = Gateway::new(MockVsish::sample_host());
//! let mut resolver = PortResolver::new(gateway, ResolverOptions::default());
//! let bundles = resolver.resolve().await;
//! assert_eq!(bundles.len(), 4);
//! # });
//! ```

pub mod model;
mod resolver;

pub use model::{ClientSubType, ClientType, PortBundle, PortStatus, PortType, StatRecord};
pub use resolver::{CollectTiming, PortResolver, ResolverOptions};
