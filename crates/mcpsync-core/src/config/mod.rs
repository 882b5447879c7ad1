//! Configuration: native client config formats, engine settings and paths.

pub mod client_config;
pub mod paths;
pub mod settings;
pub mod store;

pub use client_config::{ConfigFormat, ConfigSerializer, FormatError, serializer_for_format};
pub use settings::Settings;
pub use store::SettingsStore;
