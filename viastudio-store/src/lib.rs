// Lint configuration for this crate
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::must_use_candidate)]

//! # VIA Studio Store
//!
//! State management for the VIA Studio application.
//!
//! This crate provides:
//!
//! - **GenerationController**: The generation lifecycle, published over a watch channel
//! - **SettingsStore**: User preferences with persistence
//! - **Persistence**: File I/O helpers for JSON data
//!
//! ## Usage
//!
//! ```ignore
//! use viastudio_store::{GenerationController, SettingsStore};
//!
//! let settings = SettingsStore::load_default().await?;
//! let controller = GenerationController::new(client, gate)
//!     .with_history_limit(settings.history_limit().await);
//!
//! let mut rx = controller.subscribe();
//! tokio::spawn(async move {
//!     while rx.changed().await.is_ok() {
//!         println!("{}", rx.borrow().progress_message());
//!     }
//! });
//!
//! let outcome = controller.submit(request).await;
//! ```

pub mod error;
pub mod lifecycle;
pub mod persistence;
pub mod settings_store;

pub use error::StoreError;
pub use lifecycle::GenerationController;
pub use persistence::{
    default_config_dir, default_settings_path, load_json, load_json_or_default, save_json,
};
pub use settings_store::{
    DEFAULT_REQUEST_TIMEOUT_SECS, LogLevel, SETTING_KEYS, Settings, SettingsStore,
};
