// Copyright (c) 2024 Mike Tsao

//! User variables: named, typed cells that bindings read in conditions and
//! expressions, and that control events write. A variable can also be linked
//! to storage owned by another subsystem (the loop engine's master volume, for
//! example), which turns it into a read-only system variable.

/// The most commonly used imports.
pub mod prelude {
    pub use super::{Operator, UserVariable, Value, ValueCell, ValueKind, VarHandle, VariableStore};
}

pub use {
    cell::ValueCell,
    store::{Storage, UserVariable, VariableStore},
    value::{Operator, Value, ValueKind},
};

use synonym::Synonym;

mod cell;
mod store;
mod value;

/// Identifies a variable in its [VariableStore].
#[derive(Synonym)]
pub struct VarHandle(pub usize);
