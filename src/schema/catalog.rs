//! Payload schemas for the built-in resource types.
//!
//! Fields built with [`FieldSchema::member`] form the struct's union: a file
//! is plain, a directory or a symlink; a condition and a command's program
//! are likewise exclusive, as is naming a principal by id or by name.

use super::{FieldKind, FieldSchema, StructSchema};

pub static FILE: StructSchema = StructSchema {
    name: "File",
    fields: &[
        FieldSchema::new("path", FieldKind::Text),
        FieldSchema::member("plain", FieldKind::Struct(&PLAIN)),
        FieldSchema::member("directory", FieldKind::Struct(&DIRECTORY)),
        FieldSchema::member("symlink", FieldKind::Struct(&SYMLINK)),
    ],
};

pub static PLAIN: StructSchema = StructSchema {
    name: "Plain",
    fields: &[
        FieldSchema::new("content", FieldKind::Data),
        FieldSchema::new("mode", FieldKind::Struct(&MODE)),
    ],
};

pub static DIRECTORY: StructSchema = StructSchema {
    name: "Directory",
    fields: &[FieldSchema::new("mode", FieldKind::Struct(&MODE))],
};

pub static SYMLINK: StructSchema = StructSchema {
    name: "Symlink",
    fields: &[FieldSchema::new("target", FieldKind::Text)],
};

pub static MODE: StructSchema = StructSchema {
    name: "Mode",
    fields: &[
        FieldSchema::new("bits", FieldKind::UInt16),
        FieldSchema::new("user", FieldKind::Struct(&USER_REF)),
        FieldSchema::new("group", FieldKind::Struct(&GROUP_REF)),
    ],
};

pub static USER_REF: StructSchema = StructSchema {
    name: "UserRef",
    fields: &[
        FieldSchema::member("id", FieldKind::Int32),
        FieldSchema::member("name", FieldKind::Text),
    ],
};

pub static GROUP_REF: StructSchema = StructSchema {
    name: "GroupRef",
    fields: &[
        FieldSchema::member("id", FieldKind::Int32),
        FieldSchema::member("name", FieldKind::Text),
    ],
};

pub static EXEC: StructSchema = StructSchema {
    name: "Exec",
    fields: &[
        FieldSchema::new("command", FieldKind::Struct(&COMMAND)),
        FieldSchema::new("condition", FieldKind::Struct(&CONDITION)),
    ],
};

pub static CONDITION: StructSchema = StructSchema {
    name: "Condition",
    fields: &[
        FieldSchema::member("always", FieldKind::Void),
        FieldSchema::member("onlyIf", FieldKind::Struct(&COMMAND)),
        FieldSchema::member("unless", FieldKind::Struct(&COMMAND)),
        FieldSchema::member("fileAbsent", FieldKind::Text),
        FieldSchema::member("ifDepsChanged", FieldKind::List(&FieldKind::UInt64)),
    ],
};

pub static COMMAND: StructSchema = StructSchema {
    name: "Command",
    fields: &[
        FieldSchema::member("argv", FieldKind::List(&FieldKind::Text)),
        FieldSchema::member("bash", FieldKind::Data),
        FieldSchema::new("environment", FieldKind::List(&ENV_VAR_ELEMENT)),
        FieldSchema::new("workingDirectory", FieldKind::Text),
    ],
};

static ENV_VAR_ELEMENT: FieldKind = FieldKind::Struct(&ENV_VAR);

pub static ENV_VAR: StructSchema = StructSchema {
    name: "EnvVar",
    fields: &[
        FieldSchema::new("name", FieldKind::Text),
        FieldSchema::new("value", FieldKind::Text),
    ],
};

pub(super) static ALL_STRUCTS: &[&StructSchema] = &[
    &FILE, &PLAIN, &DIRECTORY, &SYMLINK, &MODE, &USER_REF, &GROUP_REF, &EXEC, &CONDITION,
    &COMMAND, &ENV_VAR,
];
