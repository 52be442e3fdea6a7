//! Lua host for catalog scripts.
//!
//! A [`ScriptHost`] owns one Lua state with a restricted standard library, the
//! `mcm` module and a `print` that writes to the caller's log sink. Resources
//! registered through `mcm.resource` accumulate in a [`ResourceRegistry`]
//! that [`ScriptHost::finish`] turns into the catalog.
//!
//! Script values cross into Rust through [`convert`], which copies them into
//! owned [`Value`](crate::value::Value)s before any registry code runs, so the
//! registry never re-enters Lua.

mod convert;

use crate::catalog::{Catalog, Id, RegistrationError, ResourceRegistry, ResourceType, TagBinding};
use crate::config::ProcessConfig;
use crate::marshal::Marshaller;
use mlua::{
    AnyUserData, Lua, LuaOptions, MetaMethod, StdLib, UserData, UserDataFields, UserDataMethods,
    Value as LuaValue, Variadic,
};
use std::cell::RefCell;
use std::io::Write;
use std::path::Path;
use std::rc::Rc;

use convert::Importer;

/// Destination of the script's `print` output.
pub type LogSink = Rc<RefCell<dyn Write>>;

/// Script-side handle for an [`Id`].
#[derive(Clone, Debug)]
pub(crate) struct LuaId(pub(crate) Id);

impl UserData for LuaId {
    fn add_fields<F: UserDataFields<Self>>(fields: &mut F) {
        fields.add_field_method_get("comment", |_, this| Ok(this.0.comment.clone()));
        fields.add_field_method_get("value", |_, this| Ok(this.0.value as i64));
    }

    fn add_methods<M: UserDataMethods<Self>>(methods: &mut M) {
        methods.add_meta_method(MetaMethod::ToString, |_, this, ()| Ok(this.0.to_string()));
        methods.add_meta_method(MetaMethod::Eq, |_, this, other: LuaValue| {
            let same = match other {
                LuaValue::UserData(ud) => ud
                    .borrow::<LuaId>()
                    .map(|other| other.0 == this.0)
                    .unwrap_or(false),
                _ => false,
            };
            Ok(same)
        });
    }
}

/// Script-side capability object: a live template table plus its tag.
///
/// Reads and writes of fields go straight to the template, which is only
/// copied out when the object is registered.
pub(crate) struct LuaCapability {
    pub(crate) template: mlua::Table,
    pub(crate) binding: Option<TagBinding>,
}

impl UserData for LuaCapability {
    fn add_methods<M: UserDataMethods<Self>>(methods: &mut M) {
        methods.add_meta_method(MetaMethod::Index, |_, this, key: LuaValue| {
            let value: LuaValue = this.template.get(key)?;
            Ok(value)
        });
        methods.add_meta_method(
            MetaMethod::NewIndex,
            |_, this, (key, value): (LuaValue, LuaValue)| this.template.set(key, value),
        );
        methods.add_meta_method(MetaMethod::ToString, |_, this, ()| {
            Ok(match &this.binding {
                Some(binding) => format!("resource object ({})", binding.resource_type),
                None => "resource object".to_string(),
            })
        });
    }
}

/// One Lua state wired to a resource registry.
pub struct ScriptHost {
    lua: Lua,
    registry: Rc<RefCell<ResourceRegistry>>,
}

impl ScriptHost {
    /// Build a host for a script located at `script` (if read from a file).
    pub fn new(config: &ProcessConfig, log: LogSink, script: Option<&Path>) -> mlua::Result<Self> {
        let lua = Lua::new_with(
            StdLib::PACKAGE
                | StdLib::COROUTINE
                | StdLib::TABLE
                | StdLib::STRING
                | StdLib::MATH
                | StdLib::UTF8,
            LuaOptions::default(),
        )?;
        let registry = Rc::new(RefCell::new(ResourceRegistry::new(Marshaller::new(
            config.max_depth,
        ))));

        let module = mcm_module(&lua, Rc::clone(&registry), config.max_depth)?;
        lua.globals().set("mcm", module.clone())?;
        let package: mlua::Table = lua.globals().get("package")?;
        let loaded: mlua::Table = package.get("loaded")?;
        loaded.set("mcm", module)?;
        package.set("path", config.search_path(script))?;

        lua.globals().set("print", print_function(&lua, log)?)?;

        Ok(Self { lua, registry })
    }

    /// Run a chunk. `name` follows Lua conventions: `@path` for files.
    pub fn exec(&self, source: &[u8], name: &str) -> mlua::Result<()> {
        self.lua.load(source).set_name(name).exec()
    }

    pub fn finish(self) -> Catalog {
        let Self { lua, registry } = self;
        // The module closures hold the other references to the registry.
        drop(lua);
        match Rc::try_unwrap(registry) {
            Ok(registry) => registry.into_inner().finish(),
            Err(shared) => shared.replace(ResourceRegistry::default()).finish(),
        }
    }
}

/// Recover a typed registration failure from a script error chain.
pub fn registration_error(err: &mlua::Error) -> Option<&RegistrationError> {
    match err {
        mlua::Error::CallbackError { cause, .. } => registration_error(cause),
        mlua::Error::WithContext { cause, .. } => registration_error(cause),
        mlua::Error::ExternalError(inner) => inner.downcast_ref::<RegistrationError>(),
        _ => None,
    }
}

fn check_arity(function: &'static str, expected: usize, got: usize) -> mlua::Result<()> {
    if got != expected {
        return Err(mlua::Error::external(RegistrationError::ArityMismatch {
            function,
            expected,
            got,
        }));
    }
    Ok(())
}

fn bad_argument(function: &str, position: usize, message: &str) -> mlua::Error {
    mlua::Error::RuntimeError(format!(
        "bad argument #{position} to '{function}' ({message})"
    ))
}

fn mcm_module(
    lua: &Lua,
    registry: Rc<RefCell<ResourceRegistry>>,
    max_depth: u32,
) -> mlua::Result<mlua::Table> {
    let module = lua.create_table()?;

    module.set("file", tag_function(lua, "mcm.file", ResourceType::FILE)?)?;
    module.set("exec", tag_function(lua, "mcm.exec", ResourceType::EXEC)?)?;

    let hash = lua.create_function(|lua, args: Variadic<LuaValue>| {
        check_arity("mcm.hash", 1, args.len())?;
        let comment = match &args[0] {
            LuaValue::String(s) => s.as_bytes().to_vec(),
            LuaValue::Integer(_) | LuaValue::Number(_) => {
                let text: mlua::String = lua.coerce_string(args[0].clone())?.ok_or_else(|| {
                    bad_argument("mcm.hash", 1, "must be a string")
                })?;
                text.as_bytes().to_vec()
            }
            _ => return Err(bad_argument("mcm.hash", 1, "must be a string")),
        };
        lua.create_userdata(LuaId(Id::hash_bytes(&comment)))
    })?;
    module.set("hash", hash)?;

    let resource = lua.create_function(move |_, args: Variadic<LuaValue>| {
        check_arity("mcm.resource", 3, args.len())?;
        let mut importer = Importer::new(max_depth);
        let identity = importer.import(&args[0])?;
        let dependencies = importer.import(&args[1])?;
        let capability = importer.import(&args[2])?;
        registry
            .borrow_mut()
            .register(&identity, &dependencies, &capability)
            .map_err(mlua::Error::external)?;
        Ok(())
    })?;
    module.set("resource", resource)?;

    let noop = lua.create_userdata(LuaCapability {
        template: lua.create_table()?,
        binding: Some(TagBinding::over(None, ResourceType::NOOP)),
    })?;
    module.set("noop", noop)?;

    Ok(module)
}

/// `mcm.file`/`mcm.exec`: wrap a table, or re-tag an existing object.
fn tag_function(
    lua: &Lua,
    function: &'static str,
    resource_type: ResourceType,
) -> mlua::Result<mlua::Function> {
    lua.create_function(move |lua, args: Variadic<LuaValue>| {
        check_arity(function, 1, args.len())?;
        match &args[0] {
            LuaValue::Table(template) => lua.create_userdata(LuaCapability {
                template: template.clone(),
                binding: Some(TagBinding::over(None, resource_type)),
            }),
            LuaValue::UserData(ud) => {
                retag(ud, resource_type)
                    .map_err(|_| bad_argument(function, 1, "must be a table"))?;
                Ok(ud.clone())
            }
            _ => Err(bad_argument(function, 1, "must be a table")),
        }
    })
}

fn retag(ud: &AnyUserData, resource_type: ResourceType) -> mlua::Result<()> {
    let mut capability = ud.borrow_mut::<LuaCapability>()?;
    let previous = capability.binding.take();
    capability.binding = Some(TagBinding::over(previous, resource_type));
    Ok(())
}

/// `print` rendering each argument with `tostring`, tab-separated.
fn print_function(lua: &Lua, log: LogSink) -> mlua::Result<mlua::Function> {
    lua.create_function(move |lua, args: Variadic<LuaValue>| {
        let tostring: mlua::Function = lua.globals().get("tostring")?;
        let mut line = Vec::new();
        for (idx, arg) in args.iter().enumerate() {
            if idx > 0 {
                line.push(b'\t');
            }
            let text: mlua::String = tostring.call(arg.clone())?;
            line.extend_from_slice(&text.as_bytes());
        }
        line.push(b'\n');
        log.borrow_mut()
            .write_all(&line)
            .map_err(mlua::Error::external)
    })
}
