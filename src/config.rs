// Copyright (c) 2024 Mike Tsao

//! Interface configuration documents. An interface is one independently
//! addressable set of variables and bindings; a performance setup usually
//! loads several.

use crate::binding::BindingDeclaration;
use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// One variable as declared in configuration.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct VariableDeclaration {
    #[allow(missing_docs)]
    pub name: String,
    /// `byte` (or `char`), `int`, `long`, `float` or `range`.
    #[serde(rename = "type")]
    pub type_name: String,
    /// A literal such as `3`, `0.5` or `0>127`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
}
impl VariableDeclaration {
    #[allow(missing_docs)]
    pub fn new(name: &str, type_name: &str, value: Option<&str>) -> Self {
        Self {
            name: name.to_string(),
            type_name: type_name.to_string(),
            value: value.map(str::to_string),
        }
    }
}

/// Everything one interface declares.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct InterfaceConfig {
    /// The value of `interfaceid` on events that belong to this interface.
    pub id: i32,
    /// For display.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[allow(missing_docs)]
    #[serde(default)]
    pub variables: Vec<VariableDeclaration>,
    #[allow(missing_docs)]
    #[serde(default)]
    pub bindings: Vec<BindingDeclaration>,
}
impl InterfaceConfig {
    /// Parses an interface from JSON.
    pub fn from_json(json: &str) -> anyhow::Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Reads an interface from a JSON file.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let json = std::fs::read_to_string(path)
            .with_context(|| format!("reading interface from {}", path.display()))?;
        Self::from_json(&json).with_context(|| format!("parsing {}", path.display()))
    }
}
