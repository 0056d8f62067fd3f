//! LIFO scope stack shared by the type checker's object environment and
//! the code generator's location environment.

use std::collections::HashMap;

use coolc_core::Symbol;

/// A stack of name-to-value scopes. Lookup walks innermost to outermost.
#[derive(Debug, Clone)]
pub(crate) struct Scopes<V> {
    stack: Vec<HashMap<Symbol, V>>,
}

impl<V: Copy> Scopes<V> {
    pub fn new() -> Self {
        Self { stack: Vec::new() }
    }

    pub fn enter(&mut self) {
        self.stack.push(HashMap::new());
    }

    pub fn exit(&mut self) {
        self.stack.pop();
    }

    /// Bind `name` in the innermost scope, shadowing any outer binding.
    pub fn add(&mut self, name: Symbol, value: V) {
        self.stack
            .last_mut()
            .expect("no active scope")
            .insert(name, value);
    }

    /// Innermost binding of `name` across all scopes.
    pub fn lookup(&self, name: Symbol) -> Option<V> {
        self.stack
            .iter()
            .rev()
            .find_map(|scope| scope.get(&name).copied())
    }

    /// Binding of `name` in the innermost scope only.
    pub fn probe(&self, name: Symbol) -> Option<V> {
        self.stack.last().and_then(|scope| scope.get(&name).copied())
    }
}
