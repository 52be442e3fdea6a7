//! Resource registry and catalog assembly.
//!
//! Every `mcm.resource` call goes through [`ResourceRegistry::register`],
//! the only way in: a draft is opened, its identity, dependencies and payload
//! are resolved in that order, and the sealed [`Resource`] is appended only
//! once all three succeeded. A failed registration leaves the registry
//! untouched.

use crate::catalog::identity::Id;
use crate::catalog::model::{Catalog, Payload, Resource};
use crate::catalog::tag::{ResourceType, read_tag};
use crate::marshal::{MarshalError, Marshaller};
use crate::value::Value;
use thiserror::Error;
use tracing::debug;

#[derive(Clone, Debug, Error)]
pub enum RegistrationError {
    #[error("resource identity must be an id from mcm.hash or a string, got {found}")]
    InvalidIdentitySource { found: &'static str },

    #[error("dependencies must be a table, got {found}")]
    InvalidDependencyList { found: &'static str },

    #[error("dependency {index} must be an id from mcm.hash or a string, got {found}")]
    InvalidDependencySource { index: usize, found: &'static str },

    #[error("expected resource object, got {found}")]
    NotAResource { found: &'static str },

    #[error("unknown resource type {0}")]
    UnknownResourceType(ResourceType),

    #[error("'{function}' takes {expected} argument{}, got {got}", plural(.expected))]
    ArityMismatch {
        function: &'static str,
        expected: usize,
        got: usize,
    },

    #[error("resource has no {missing}")]
    IncompleteResource { missing: &'static str },

    #[error(transparent)]
    Marshal(#[from] MarshalError),
}

/// Accumulates sealed resources for one script run.
#[derive(Debug, Default)]
pub struct ResourceRegistry {
    marshaller: Marshaller,
    resources: Vec<Resource>,
}

impl ResourceRegistry {
    pub fn new(marshaller: Marshaller) -> Self {
        Self {
            marshaller,
            resources: Vec::new(),
        }
    }

    /// Open a draft for the next resource. Nothing is recorded until
    /// [`ResourceDraft::commit`].
    fn new_resource(&mut self) -> ResourceDraft<'_> {
        ResourceDraft {
            registry: self,
            identity: None,
            dependencies: Vec::new(),
            payload: None,
        }
    }

    /// Resolve and append one resource.
    ///
    /// `identity` is an [`Id`] or a string to hash, `dependencies` a sequence
    /// table of the same, `capability` a tagged capability object.
    pub fn register(
        &mut self,
        identity: &Value,
        dependencies: &Value,
        capability: &Value,
    ) -> Result<&Resource, RegistrationError> {
        let mut draft = self.new_resource();
        draft.assign_identity(identity)?;
        draft.assign_dependencies(dependencies)?;
        draft.assign_payload(capability)?;
        draft.commit()
    }

    pub fn len(&self) -> usize {
        self.resources.len()
    }

    pub fn is_empty(&self) -> bool {
        self.resources.is_empty()
    }

    /// Hand over everything registered so far, in registration order.
    pub fn finish(self) -> Catalog {
        Catalog {
            resources: self.resources,
        }
    }
}

/// A resource under construction, exclusively borrowing its registry.
#[derive(Debug)]
struct ResourceDraft<'a> {
    registry: &'a mut ResourceRegistry,
    identity: Option<Id>,
    dependencies: Vec<u64>,
    payload: Option<Payload>,
}

impl<'a> ResourceDraft<'a> {
    fn assign_identity(&mut self, source: &Value) -> Result<(), RegistrationError> {
        let id = resolve_id(source).ok_or(RegistrationError::InvalidIdentitySource {
            found: source.type_name(),
        })?;
        self.identity = Some(id);
        Ok(())
    }

    /// Resolve `1..=len` of a sequence table, preserving declaration order.
    fn assign_dependencies(&mut self, sources: &Value) -> Result<(), RegistrationError> {
        let table = sources
            .as_table()
            .ok_or(RegistrationError::InvalidDependencyList {
                found: sources.type_name(),
            })?;
        let mut dependencies = Vec::with_capacity(table.sequence_len());
        for index in 0..table.sequence_len() {
            let Some(source) = table.get_index(index as i64 + 1) else {
                break;
            };
            let id = resolve_id(source).ok_or(RegistrationError::InvalidDependencySource {
                index,
                found: source.type_name(),
            })?;
            dependencies.push(id.value);
        }
        self.dependencies = dependencies;
        Ok(())
    }

    fn assign_payload(&mut self, capability: &Value) -> Result<(), RegistrationError> {
        let resource_type = read_tag(capability).ok_or(RegistrationError::NotAResource {
            found: capability.type_name(),
        })?;
        let payload = match (resource_type, capability) {
            (ResourceType::NOOP, _) => Payload::Noop {},
            (ResourceType::FILE | ResourceType::EXEC, Value::Capability(object)) => {
                let schema = resource_type
                    .payload_schema()
                    .ok_or(RegistrationError::UnknownResourceType(resource_type))?;
                let body = self
                    .registry
                    .marshaller
                    .convert_table(&object.template, schema, 0)?;
                if resource_type == ResourceType::FILE {
                    Payload::File(body)
                } else {
                    Payload::Exec(body)
                }
            }
            (other, _) => return Err(RegistrationError::UnknownResourceType(other)),
        };
        self.payload = Some(payload);
        Ok(())
    }

    /// Seal the draft and append it. Identity and payload must have been
    /// assigned; an empty dependency list is valid.
    fn commit(self) -> Result<&'a Resource, RegistrationError> {
        let identity = self
            .identity
            .ok_or(RegistrationError::IncompleteResource { missing: "identity" })?;
        let payload = self
            .payload
            .ok_or(RegistrationError::IncompleteResource { missing: "payload" })?;
        let resource = Resource {
            id: identity.value,
            comment: identity.comment,
            dependencies: self.dependencies,
            payload,
        };
        debug!(
            id = %format!("{:#018x}", resource.id),
            comment = %resource.comment,
            kind = %resource.payload.resource_type(),
            dependencies = resource.dependencies.len(),
            "registered resource"
        );
        let registry = self.registry;
        let index = registry.resources.len();
        registry.resources.push(resource);
        Ok(&registry.resources[index])
    }
}

fn plural(count: &usize) -> &'static str {
    if *count == 1 { "" } else { "s" }
}

/// An explicit id is taken verbatim; anything string-like is hashed.
fn resolve_id(source: &Value) -> Option<Id> {
    match source {
        Value::Id(id) => Some(id.clone()),
        other => other.as_bytes().map(|bytes| Id::hash_bytes(&bytes)),
    }
}
