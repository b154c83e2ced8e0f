//! CLI commands

pub mod apply;
pub mod config;
pub mod inspect;
pub mod name;

pub use apply::{ApplyCommand, EventLogger};
pub use config::{CheckConfigCommand, GenerateConfigCommand};
pub use inspect::{InspectCommand, OutputFormat};
pub use name::PortGroupNameCommand;
