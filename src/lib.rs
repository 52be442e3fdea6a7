//! Script-driven resource catalogs.
//!
//! A catalog script declares resources (files, commands, no-ops) through the
//! `mcm` Lua module. The crate evaluates the script, converts every declared
//! payload from dynamic Lua values into schema-typed structs, and assembles
//! the resources into an ordered [`Catalog`] that the binaries serialize.
//!
//! Layers, bottom-up: [`value`] and [`schema`] describe both sides of the
//! conversion, [`marshal`] bridges them, [`catalog`] owns identity, tagging
//! and assembly, [`script`] hosts Lua, and [`process`] runs one script end to
//! end with a [`ProcessConfig`].

pub mod catalog;
pub mod config;
pub mod emit;
pub mod marshal;
pub mod process;
pub mod schema;
pub mod script;
pub mod value;

pub use catalog::{
    CapabilityObject, Catalog, Id, Payload, RegistrationError, Resource, ResourceRegistry,
    ResourceType,
};
pub use config::{ConfigError, ProcessConfig};
pub use marshal::{DEFAULT_MAX_DEPTH, MarshalError, MarshalErrorKind, Marshaller};
pub use process::{ProcessError, Processor};
pub use script::LogSink;
pub use value::{Table, TableKey, Value};
