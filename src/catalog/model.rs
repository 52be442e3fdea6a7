//! Serializable representation of an assembled catalog.
//!
//! `Resource` and `Catalog` mirror the JSON document written by the
//! `catscript` binary (`schema/catalog.schema.json`). Payloads are kept as
//! typed structs so the schema order of their fields survives serialization.

use crate::catalog::tag::ResourceType;
use crate::marshal::TypedStruct;
use serde::Serialize;

/// Schema-typed payload; exactly one variant per resource.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Payload {
    Noop {},
    File(TypedStruct),
    Exec(TypedStruct),
}

impl Payload {
    pub fn resource_type(&self) -> ResourceType {
        match self {
            Payload::Noop {} => ResourceType::NOOP,
            Payload::File(_) => ResourceType::FILE,
            Payload::Exec(_) => ResourceType::EXEC,
        }
    }
}

/// One sealed resource record.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Resource {
    pub id: u64,
    pub comment: String,
    pub dependencies: Vec<u64>,
    #[serde(flatten)]
    pub payload: Payload,
}

/// Resources in registration order. Duplicate ids are kept as declared.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct Catalog {
    pub resources: Vec<Resource>,
}

impl Catalog {
    pub fn len(&self) -> usize {
        self.resources.len()
    }

    pub fn is_empty(&self) -> bool {
        self.resources.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Resource> {
        self.resources.iter()
    }
}
