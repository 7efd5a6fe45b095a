// SPDX-FileCopyrightText: 2026 Hatch Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Symbols and per-archive symbol tables.
//!
//! A symbol is a named value defined by one archive (or by the engine). The
//! runtime does not interpret values beyond telling plugin constructors
//! apart from opaque data, so hosts are free to store function tables,
//! service handles, or anything else that is `Send + Sync`.

use std::any::Any;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use hatch_core::{CodeOrigin, PluginError};

use crate::plugin::Plugin;

/// Constructs a plugin instance. The entry point of every archive resolves
/// to one of these.
pub trait PluginFactory: Send + Sync {
    fn create(&self) -> Result<Box<dyn Plugin>, PluginError>;
}

impl<F> PluginFactory for F
where
    F: Fn() -> Result<Box<dyn Plugin>, PluginError> + Send + Sync,
{
    fn create(&self) -> Result<Box<dyn Plugin>, PluginError> {
        self()
    }
}

/// Value bound to a symbol.
#[derive(Clone)]
pub enum SymbolValue {
    /// A plugin constructor.
    Factory(Arc<dyn PluginFactory>),
    /// Opaque shared data.
    Data(Arc<dyn Any + Send + Sync>),
}

impl fmt::Debug for SymbolValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SymbolValue::Factory(_) => f.write_str("Factory"),
            SymbolValue::Data(_) => f.write_str("Data"),
        }
    }
}

/// A resolved symbol together with the origin of the code that defined it.
#[derive(Debug, Clone)]
pub struct Symbol {
    name: String,
    origin: CodeOrigin,
    value: SymbolValue,
}

impl Symbol {
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Origin of the archive (or engine) that defined this symbol.
    pub fn origin(&self) -> &CodeOrigin {
        &self.origin
    }

    pub fn value(&self) -> &SymbolValue {
        &self.value
    }

    /// The constructor bound to this symbol, if it is one.
    pub fn as_factory(&self) -> Option<&Arc<dyn PluginFactory>> {
        match &self.value {
            SymbolValue::Factory(factory) => Some(factory),
            SymbolValue::Data(_) => None,
        }
    }

    /// The data bound to this symbol, if it is data of type `T`.
    pub fn downcast<T: Any + Send + Sync>(&self) -> Option<Arc<T>> {
        match &self.value {
            SymbolValue::Data(data) => data.clone().downcast::<T>().ok(),
            SymbolValue::Factory(_) => None,
        }
    }
}

/// Symbols defined by a single archive.
///
/// The table is stamped with its archive's origin when the engine creates
/// it; every symbol defined through it carries that origin, so code linked
/// from an archive cannot claim to come from anywhere else.
#[derive(Debug)]
pub struct SymbolTable {
    origin: CodeOrigin,
    symbols: HashMap<String, Symbol>,
}

impl SymbolTable {
    pub fn new(origin: CodeOrigin) -> Self {
        Self {
            origin,
            symbols: HashMap::new(),
        }
    }

    pub fn origin(&self) -> &CodeOrigin {
        &self.origin
    }

    /// Define (or redefine) a symbol. Returns the previous definition.
    pub fn define(&mut self, name: impl Into<String>, value: SymbolValue) -> Option<Symbol> {
        let name = name.into();
        let symbol = Symbol {
            name: name.clone(),
            origin: self.origin.clone(),
            value,
        };
        self.symbols.insert(name, symbol)
    }

    /// Define a plugin constructor.
    pub fn define_factory(
        &mut self,
        name: impl Into<String>,
        factory: impl PluginFactory + 'static,
    ) -> Option<Symbol> {
        self.define(name, SymbolValue::Factory(Arc::new(factory)))
    }

    /// Define a constructor for a plugin type that cannot fail to build.
    pub fn define_plugin<P, F>(&mut self, name: impl Into<String>, ctor: F) -> Option<Symbol>
    where
        P: Plugin + 'static,
        F: Fn() -> P + Send + Sync + 'static,
    {
        let factory = move || -> Result<Box<dyn Plugin>, PluginError> { Ok(Box::new(ctor())) };
        self.define_factory(name, factory)
    }

    /// Define a data symbol.
    pub fn define_data<T: Any + Send + Sync>(
        &mut self,
        name: impl Into<String>,
        value: T,
    ) -> Option<Symbol> {
        self.define(name, SymbolValue::Data(Arc::new(value)))
    }

    pub fn get(&self, name: &str) -> Option<&Symbol> {
        self.symbols.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.symbols.contains_key(name)
    }

    /// Defined symbol names, sorted.
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.symbols.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    pub fn len(&self) -> usize {
        self.symbols.len()
    }

    pub fn is_empty(&self) -> bool {
        self.symbols.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::NoopPlugin;

    #[test]
    fn defined_symbols_carry_table_origin() {
        let origin = CodeOrigin::new("file:///plugins/core");
        let mut table = SymbolTable::new(origin.clone());
        table.define_data("core.version", 3u32);

        let symbol = table.get("core.version").unwrap();
        assert_eq!(symbol.origin(), &origin);
        assert_eq!(symbol.name(), "core.version");
    }

    #[test]
    fn downcast_checks_type() {
        let mut table = SymbolTable::new(CodeOrigin::new("file:///p"));
        table.define_data("greeting", String::from("hello"));

        let symbol = table.get("greeting").unwrap();
        assert_eq!(symbol.downcast::<String>().as_deref().map(String::as_str), Some("hello"));
        assert!(symbol.downcast::<u32>().is_none());
        assert!(symbol.as_factory().is_none());
    }

    #[test]
    fn closures_are_factories() {
        let mut table = SymbolTable::new(CodeOrigin::new("file:///p"));
        table.define_factory("main", || -> Result<Box<dyn Plugin>, PluginError> {
            Err(PluginError::failed("not today"))
        });
        table.define_plugin("other", || NoopPlugin);

        let failing = table.get("main").unwrap().as_factory().unwrap().clone();
        assert!(failing.create().is_err());
        let working = table.get("other").unwrap().as_factory().unwrap().clone();
        assert!(working.create().is_ok());
    }

    #[test]
    fn redefinition_returns_previous_symbol() {
        let mut table = SymbolTable::new(CodeOrigin::new("file:///p"));
        assert!(table.define_data("x", 1u8).is_none());
        assert!(table.define_data("x", 2u8).is_some());
        assert_eq!(table.len(), 1);
        assert_eq!(table.names(), vec!["x"]);
    }
}
