//! Resource type tags attached to capability objects.
//!
//! A capability object is the script-side template of a resource (the table
//! handed to `mcm.file` or `mcm.exec`). Its type travels out-of-band in a
//! [`TagBinding`]; re-tagging an object pushes a new binding and keeps the
//! old one reachable through `previous`.

use crate::schema::{self, StructSchema};
use crate::value::{Table, Value};
use std::fmt;
use std::rc::Rc;

/// Opaque discriminator selecting the payload schema of a resource.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct ResourceType(pub u64);

impl ResourceType {
    pub const NOOP: ResourceType = ResourceType(0);
    pub const FILE: ResourceType = ResourceType(0x8dc4ac52b2962163);
    pub const EXEC: ResourceType = ResourceType(0x984c97311006f1ca);

    /// Payload schema for known non-noop types.
    pub fn payload_schema(self) -> Option<&'static StructSchema> {
        match self {
            ResourceType::FILE => Some(&schema::catalog::FILE),
            ResourceType::EXEC => Some(&schema::catalog::EXEC),
            _ => None,
        }
    }

    pub fn name(self) -> Option<&'static str> {
        match self {
            ResourceType::NOOP => Some("noop"),
            ResourceType::FILE => Some("file"),
            ResourceType::EXEC => Some("exec"),
            _ => None,
        }
    }
}

impl fmt::Display for ResourceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.name() {
            Some(name) => f.write_str(name),
            None => write!(f, "{:#018x}", self.0),
        }
    }
}

/// Most recent tag applied to an object, chained to the one it replaced.
#[derive(Clone, Debug, PartialEq)]
pub struct TagBinding {
    pub resource_type: ResourceType,
    pub previous: Option<Box<TagBinding>>,
}

impl TagBinding {
    /// A binding for `resource_type` that falls back to `previous`.
    pub fn over(previous: Option<TagBinding>, resource_type: ResourceType) -> Self {
        Self {
            resource_type,
            previous: previous.map(Box::new),
        }
    }

    /// Bindings from newest to oldest.
    pub fn chain(&self) -> impl Iterator<Item = ResourceType> + '_ {
        std::iter::successors(Some(self), |binding| binding.previous.as_deref())
            .map(|binding| binding.resource_type)
    }
}

/// Resource template plus its out-of-band type tag.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct CapabilityObject {
    pub template: Rc<Table>,
    binding: Option<TagBinding>,
}

impl CapabilityObject {
    pub fn new(template: Table) -> Self {
        Self {
            template: Rc::new(template),
            binding: None,
        }
    }

    /// Build an object already carrying `binding`, as imported from a script.
    pub fn with_binding(template: Rc<Table>, binding: Option<TagBinding>) -> Self {
        Self { template, binding }
    }

    pub fn binding(&self) -> Option<&TagBinding> {
        self.binding.as_ref()
    }
}

/// Attach `resource_type` to `object`, keeping any earlier tag as fallback.
pub fn tag(object: &mut CapabilityObject, resource_type: ResourceType) {
    let previous = object.binding.take();
    object.binding = Some(TagBinding::over(previous, resource_type));
}

/// Most recently applied tag, or `None` for untagged values.
///
/// Callers treat `None` as "not a resource object"; it never defaults to a
/// resource type.
pub fn read_tag(value: &Value) -> Option<ResourceType> {
    match value {
        Value::Capability(object) => object.binding.as_ref().map(|b| b.resource_type),
        _ => None,
    }
}
