// Copyright (c) 2024 Mike Tsao

use super::{Value, ValueCell, ValueKind, VarHandle};
use crate::{
    error::{ConfigError, DispatchError},
    traits::LinkedStorage,
};
use core::fmt;
use rustc_hash::FxHashMap;
use std::sync::Arc;

/// Where a variable's value lives.
pub enum Storage {
    /// The variable owns its cell and configuration events may write to it.
    Owned(ValueCell),
    /// The value belongs to another subsystem, which is the only writer. This
    /// side can only read it.
    Linked(Arc<dyn LinkedStorage>),
}
impl fmt::Debug for Storage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Storage::Owned(cell) => f.debug_tuple("Owned").field(cell).finish(),
            Storage::Linked(linked) => f
                .debug_tuple("Linked")
                .field(&linked.kind())
                .field(&linked.value())
                .finish(),
        }
    }
}

/// A named, typed cell that bindings can read, compare and write.
#[derive(Debug)]
pub struct UserVariable {
    name: String,
    storage: Storage,
}
impl UserVariable {
    #[allow(missing_docs)]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[allow(missing_docs)]
    pub fn kind(&self) -> ValueKind {
        match &self.storage {
            Storage::Owned(cell) => cell.kind(),
            Storage::Linked(linked) => linked.kind(),
        }
    }

    /// Reads the current value.
    pub fn value(&self) -> Value {
        match &self.storage {
            Storage::Owned(cell) => cell.get(),
            Storage::Linked(linked) => linked.value(),
        }
    }

    /// Whether another subsystem owns this variable's storage.
    pub fn is_system(&self) -> bool {
        matches!(self.storage, Storage::Linked(_))
    }

    /// The cell that generic write events may modify. System variables have
    /// none.
    pub fn writable(&self) -> Option<&ValueCell> {
        match &self.storage {
            Storage::Owned(cell) => Some(cell),
            Storage::Linked(_) => None,
        }
    }
}

/// The flat registry of every declared variable.
///
/// Declaring and linking happen during configuration (`&mut self`). Once
/// configuration is done, the store is shared read-only and only the values
/// inside the cells change.
#[derive(Debug, Default)]
pub struct VariableStore {
    variables: Vec<UserVariable>,
    by_name: FxHashMap<String, VarHandle>,
}
impl VariableStore {
    /// Declares a variable from configuration text: a type name (`byte` or
    /// `char`, `int`, `long`, `float`, `range`) and an optional literal
    /// initializer.
    pub fn declare(
        &mut self,
        name: &str,
        type_name: &str,
        initializer: Option<&str>,
    ) -> Result<VarHandle, ConfigError> {
        let kind = type_name
            .trim()
            .parse::<ValueKind>()
            .ok()
            .filter(ValueKind::is_declarable)
            .ok_or_else(|| ConfigError::UnsupportedVariableType(type_name.to_string()))?;
        let initial = match initializer.map(str::trim).filter(|s| !s.is_empty()) {
            Some(text) => Value::parse_literal(text)?.coerce(kind),
            None => kind.zero(),
        };
        self.declare_value(name, kind, initial)
    }

    /// Declares a variable of the given kind with the given starting value.
    pub fn declare_value(
        &mut self,
        name: &str,
        kind: ValueKind,
        initial: Value,
    ) -> Result<VarHandle, ConfigError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(ConfigError::MalformedToken(name.to_string()));
        }
        if !kind.is_declarable() {
            return Err(ConfigError::UnsupportedVariableType(kind.to_string()));
        }
        if self.by_name.contains_key(name) {
            return Err(ConfigError::DuplicateVariable(name.to_string()));
        }
        let handle = VarHandle(self.variables.len());
        self.variables.push(UserVariable {
            name: name.to_string(),
            storage: Storage::Owned(ValueCell::new_with_kind(kind, initial)),
        });
        self.by_name.insert(name.to_string(), handle);
        Ok(handle)
    }

    /// Promotes an already-declared variable to a system variable whose value
    /// is read from another subsystem's storage. From now on, generic write
    /// events refuse it.
    pub fn link(
        &mut self,
        name: &str,
        storage: Arc<dyn LinkedStorage>,
    ) -> Result<VarHandle, ConfigError> {
        let handle = self
            .lookup(name)
            .ok_or_else(|| ConfigError::UnknownVariable(name.to_string()))?;
        self.variables[handle.0].storage = Storage::Linked(storage);
        Ok(handle)
    }

    /// Declares a variable and links it in one step, for system variables that
    /// the application provides whether or not configuration mentions them.
    pub fn declare_linked(
        &mut self,
        name: &str,
        storage: Arc<dyn LinkedStorage>,
    ) -> Result<VarHandle, ConfigError> {
        match self.lookup(name) {
            Some(_) => self.link(name, storage),
            None => {
                let kind = storage.kind();
                self.declare_value(name, kind, kind.zero())?;
                self.link(name, storage)
            }
        }
    }

    /// Finds a variable by name.
    pub fn lookup(&self, name: &str) -> Option<VarHandle> {
        self.by_name.get(name.trim()).copied()
    }

    #[allow(missing_docs)]
    pub fn get(&self, handle: VarHandle) -> Option<&UserVariable> {
        self.variables.get(handle.0)
    }

    /// The variable's current value, or [Value::Invalid] for an unknown
    /// handle.
    pub fn value(&self, handle: VarHandle) -> Value {
        self.get(handle).map_or(Value::Invalid, UserVariable::value)
    }

    /// The generic write path used by configuration-driven events. Refuses
    /// system variables. Returns the value actually stored.
    pub fn set(&self, handle: VarHandle, value: Value) -> Result<Value, DispatchError> {
        let variable = self
            .get(handle)
            .ok_or(DispatchError::InvalidValue("var"))?;
        let cell = variable
            .writable()
            .ok_or_else(|| DispatchError::SystemVariable(variable.name.clone()))?;
        let stored = cell.set(value);
        if stored.is_valid() {
            Ok(stored)
        } else {
            Err(DispatchError::InvalidValue("var"))
        }
    }

    /// Renders a value for display, naming referenced variables.
    pub fn display_value(&self, value: &Value) -> String {
        match value {
            Value::Ref(h) => match self.get(*h) {
                Some(v) => format!("&{}", v.name),
                None => value.to_string(),
            },
            _ => value.to_string(),
        }
    }

    /// `NAME = value`, for on-screen display and diagnostics.
    pub fn describe(&self, handle: VarHandle) -> String {
        match self.get(handle) {
            Some(v) => format!("{} = {}", v.name, self.display_value(&v.value())),
            None => format!("<unknown variable {handle}>"),
        }
    }

    /// Iterates over every variable with its handle.
    pub fn iter(&self) -> impl Iterator<Item = (VarHandle, &UserVariable)> {
        self.variables
            .iter()
            .enumerate()
            .map(|(i, v)| (VarHandle(i), v))
    }

    #[allow(missing_docs)]
    pub fn len(&self) -> usize {
        self.variables.len()
    }

    #[allow(missing_docs)]
    pub fn is_empty(&self) -> bool {
        self.variables.is_empty()
    }
}
