//! Utility modules for esxi-exporter.

mod hostname;

pub use hostname::hostname;
