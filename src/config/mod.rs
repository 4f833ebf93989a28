//! Settings and batch file loading.
//!
//! - [`settings`]: `postinstall.toml` tunables and installation root lookup
//! - [`batch`]: TOML/JSON operation batches
pub mod batch;
pub mod settings;
pub mod toml_loader;

pub use settings::{Settings, Timeouts};
