// src/config/mod.rs

//! Configuration for the update executor.
//!
//! Responsibilities:
//! - Define the TOML-backed settings model (`model.rs`).
//! - Load a settings file from disk (`loader.rs`).
//! - Validate basic invariants (`validate.rs`).
//! - Locate the device config used for status reporting (`device.rs`).

pub mod device;
pub mod loader;
pub mod model;
pub mod validate;

pub use device::{resolve_device_config, DeviceConfig};
pub use loader::{load_and_validate, load_from_path, resolve_settings};
pub use model::{
    HealthSection, InstallSection, PollPolicy, PollSection, RawSettings, ReportSection,
    ServiceSection, Settings,
};
pub use validate::validate_settings;
