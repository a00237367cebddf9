pub mod bootstrap;
pub mod cli;
pub mod config;
pub mod dn;
pub mod documents;
pub mod error;
pub mod handoff;
pub mod ldif;
pub mod limits;
pub mod preset;

pub use bootstrap::{Bootstrap, Outcome};
pub use config::{FileConfig, Inputs, Settings};
pub use error::{ConfigError, ToolError};
