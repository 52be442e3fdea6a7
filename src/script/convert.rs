//! Import of Lua values into the owned [`Value`] tree.
//!
//! A Lua table reachable along several paths is imported once and shared, so
//! the cost of an import is linear in the number of distinct tables. A table
//! reached again while it is still being imported is a cycle and fails like
//! any nesting past the depth bound.

use super::{LuaCapability, LuaId};
use crate::catalog::{CapabilityObject, RegistrationError};
use crate::marshal::{MarshalError, MarshalErrorKind};
use crate::value::{Table, TableKey, Value};
use mlua::Value as LuaValue;
use std::collections::{HashMap, HashSet};
use std::rc::Rc;

/// Imports the arguments of one registration call.
pub(crate) struct Importer {
    max_depth: u32,
    imported: HashMap<usize, Rc<Table>>,
    open: HashSet<usize>,
}

impl Importer {
    pub(crate) fn new(max_depth: u32) -> Self {
        Self {
            max_depth,
            imported: HashMap::new(),
            open: HashSet::new(),
        }
    }

    pub(crate) fn import(&mut self, value: &LuaValue) -> mlua::Result<Value> {
        self.import_at(value, 0)
    }

    fn import_at(&mut self, value: &LuaValue, depth: u32) -> mlua::Result<Value> {
        let imported = match value {
            LuaValue::Nil => Value::Nil,
            LuaValue::Boolean(b) => Value::Bool(*b),
            LuaValue::Integer(i) => Value::Integer(*i),
            LuaValue::Number(n) => Value::Number(*n),
            LuaValue::String(s) => Value::String(s.as_bytes().to_vec()),
            LuaValue::Table(table) => Value::Table(self.import_table(table, depth)?),
            LuaValue::UserData(ud) => {
                if let Ok(id) = ud.borrow::<LuaId>() {
                    Value::Id(id.0.clone())
                } else if let Ok(capability) = ud.borrow::<LuaCapability>() {
                    let template = self.import_table(&capability.template, depth)?;
                    Value::from(CapabilityObject::with_binding(
                        template,
                        capability.binding.clone(),
                    ))
                } else {
                    Value::Opaque("userdata")
                }
            }
            other => Value::Opaque(other.type_name()),
        };
        Ok(imported)
    }

    fn import_table(&mut self, table: &mlua::Table, depth: u32) -> mlua::Result<Rc<Table>> {
        let address = table.to_pointer() as usize;
        if let Some(done) = self.imported.get(&address) {
            return Ok(Rc::clone(done));
        }
        if depth > self.max_depth || !self.open.insert(address) {
            return Err(self.depth_exceeded());
        }
        let mut imported = Table::new();
        for pair in table.clone().pairs::<LuaValue, LuaValue>() {
            let (key, value) = pair?;
            let value = self.import_at(&value, depth + 1)?;
            imported.insert(import_key(&key), value);
        }
        self.open.remove(&address);
        let imported = Rc::new(imported);
        self.imported.insert(address, Rc::clone(&imported));
        Ok(imported)
    }

    fn depth_exceeded(&self) -> mlua::Error {
        let err = MarshalError::new(MarshalErrorKind::RecursionLimitExceeded {
            limit: self.max_depth,
        });
        mlua::Error::external(RegistrationError::from(err))
    }
}

/// Keys are never descended into; reference keys are identified by address.
fn import_key(key: &LuaValue) -> TableKey {
    match key {
        LuaValue::Boolean(b) => TableKey::Bool(*b),
        LuaValue::Integer(i) => TableKey::Integer(*i),
        LuaValue::Number(n) => TableKey::from(*n),
        LuaValue::String(s) => TableKey::String(s.as_bytes().to_vec()),
        LuaValue::UserData(ud) => match ud.borrow::<LuaId>() {
            Ok(id) => TableKey::Id(id.0.clone()),
            Err(_) => object_key(key),
        },
        other => object_key(other),
    }
}

fn object_key(key: &LuaValue) -> TableKey {
    TableKey::Object {
        type_name: key.type_name(),
        address: key.to_pointer() as usize,
    }
}
