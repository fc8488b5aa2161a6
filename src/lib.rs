//! Build middleware for single-file components
//!
//! Rewrites the intermediate source of component files so extra stages run
//! on their script, template and style blocks, and expands named imports of
//! a UI kit into direct imports of the components actually used. The kit's
//! options are merged into the host build configuration once at setup with
//! [`merge_config`]; the loaders in [`loaders`] then run per file.

pub mod attributes;
pub mod cache;
pub mod component_map;
pub mod config;
pub mod error;
pub mod host;
pub mod import_parser;
pub mod import_transformer;
pub mod loader_chain;
pub mod loaders;
pub mod locales;
pub mod merge;
pub mod paths;
pub mod plugin;
pub mod report;
pub mod settings;
pub mod template;
pub mod theme;

pub use config::Options;
pub use error::{LoaderError, LoaderWarning, Result};
pub use host::HostConfig;
pub use loader_chain::{inject_loader, BlockKind};
pub use loaders::LoaderContext;
pub use merge::{merge_config, Descriptor};
pub use plugin::{Plugin, PluginDescriptor};
pub use settings::LoaderSettings;
