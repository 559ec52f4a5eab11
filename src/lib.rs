// Copyright (c) 2024 Mike Tsao

#![warn(missing_docs, unused_imports, unused_variables)]
#![allow(rustdoc::private_intra_doc_links)]

//! Stagebind routes live input (keys, MIDI, mouse, joystick) to actions,
//! according to rules written in configuration rather than in code.
//!
//! A performance setup declares [variables] and bindings. Each binding says
//! "when this input arrives and these conditions hold, broadcast that action
//! with these parameters". The [binding] compiler turns the declarations into
//! a hashed table once, at startup, and the [Dispatcher] consults the table
//! for every incoming event from then on.
//!
//! * *Easiest*: describe each interface in an [InterfaceConfig] document,
//! load them into an [EngineBuilder], and [EngineBuilder::build()] an
//! [Engine]. Input sources call [Engine::send()]; other subsystems
//! [subscribe](EngineBuilder::subscribe) to hear the actions.
//! * *More control*: compile [BindingDeclaration](binding::BindingDeclaration)s
//! yourself with a [BindingCompiler](binding::BindingCompiler), and put the
//! [Dispatcher] on an [EventBus](events::EventBus) of your own.

/// A collection of imports that are useful to users of this crate. `use
/// stagebind::prelude::*;` for easier onboarding.
pub mod prelude {
    pub use super::{
        binding::prelude::*, events::prelude::*, traits::prelude::*, types::prelude::*,
        variables::prelude::*,
    };
    pub use super::{Dispatcher, Engine, EngineBuilder, EngineSettings, InterfaceConfig};
}

// Fundamental structures that are important enough to re-export at top level.
pub use {
    config::{InterfaceConfig, VariableDeclaration},
    diagnostics::{CollectingSink, Diagnostic, TracingSink},
    dispatch::Dispatcher,
    engine::{Engine, EngineBuilder},
    error::{ConfigError, DispatchError},
    settings::EngineSettings,
};

pub mod binding;
pub mod config;
pub mod diagnostics;
pub mod dispatch;
pub mod engine;
pub mod error;
pub mod events;
pub mod expression;
pub mod keys;
pub mod settings;
pub mod traits;
pub mod types;
pub mod variables;
