//! Momentum Common - Shared configuration, errors and logging for the momentum scanner.
//!
//! This crate provides:
//! - Configuration types and loading
//! - Error types and handling utilities
//! - Logging setup

#![warn(clippy::all)]
#![allow(clippy::pedantic)]

pub mod config;
pub mod error;
pub mod logging;

pub use config::{
    BreakoutConfig, CalendarConfig, Config, DataSourcesConfig, ObservabilityConfig, OutputConfig,
    ReferenceConfig, ScannerConfig, StorageConfig, TrendTemplateConfig, VcpConfig,
};
pub use error::{Error, Result};
