// Copyright (c) 2024 Mike Tsao

//! Compiling binding declarations into a hashed table of rules.

/// The most commonly used imports.
pub mod prelude {
    pub use super::{Binding, BindingCompiler, BindingDeclaration, BindingTable};
}

pub use {
    clause::{split_clause, split_clauses, CompiledClause, CLAUSE_SEPARATOR},
    compiler::{BindingCompiler, BindingDeclaration},
    table::{Binding, BindingTable, BucketSlot},
};

mod clause;
mod compiler;
mod table;
