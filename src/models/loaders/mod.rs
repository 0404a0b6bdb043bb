pub mod toml_loader;

pub use toml_loader::{load_configured_catalog, load_label_catalog, parse_label_catalog};
