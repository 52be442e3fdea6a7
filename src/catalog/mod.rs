//! Resource identity, type tags and catalog assembly.
//!
//! Scripts reach this module through the `mcm` functions: `mcm.hash` builds
//! an [`Id`], `mcm.file`/`mcm.exec` tag capability objects, and
//! `mcm.resource` feeds the [`ResourceRegistry`]. The registry's
//! [`Catalog`] is what the binaries serialize; [`dot`] renders it as a graph.

pub mod dot;
pub mod identity;
pub mod model;
pub mod registry;
pub mod tag;

pub use identity::{ID_HASH_PREFIX, Id};
pub use model::{Catalog, Payload, Resource};
pub use registry::{RegistrationError, ResourceRegistry};
pub use tag::{CapabilityObject, ResourceType, TagBinding, read_tag, tag};
