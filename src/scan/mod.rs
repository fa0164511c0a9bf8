//! Background reconciliation of asset directories

pub mod scheduler;

pub use scheduler::{ScanOrder, ScanResult, ScanScheduler};
