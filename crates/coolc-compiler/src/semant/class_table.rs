//! The class table: inheritance graph plus flattened feature maps.
//!
//! Feature maps are built by copy-and-extend: a class starts from a clone
//! of its parent's maps and appends its own features. `IndexMap::insert`
//! on an existing key replaces the value without moving its index, which
//! gives method overrides the same slot as the definition they replace.

use std::collections::{HashMap, HashSet};

use coolc_core::{Interner, Names, Symbol};
use indexmap::IndexMap;

use crate::ast::{Attr, Class, Feature, Method};
use crate::diagnostics::Diagnostics;

use super::Fatal;

/// Inheritance graph and per-class feature maps for one compilation.
pub struct ClassTable<'a> {
    names: Names,
    /// Every defined class, basics first, then user classes in declaration
    /// order. This order seeds every later deterministic traversal.
    class_map: IndexMap<Symbol, &'a Class>,
    /// Child class to parent class; `Object` maps to `_no_class`.
    parents: HashMap<Symbol, Symbol>,
    /// Flattened attributes per class: inherited first, in parent order.
    attrs: HashMap<Symbol, IndexMap<Symbol, &'a Attr>>,
    /// Flattened methods per class; overrides keep the inherited index.
    methods: HashMap<Symbol, IndexMap<Symbol, &'a Method>>,
}

impl<'a> ClassTable<'a> {
    /// Install the basic classes, then every user class. Rejected user
    /// classes (duplicates, illegal parents, `SELF_TYPE` redefinition) are
    /// reported and skipped.
    pub fn build(
        basics: &'a [Class],
        classes: &'a [Class],
        names: Names,
        interner: &Interner,
        diag: &mut Diagnostics,
    ) -> Self {
        let mut table = Self {
            names,
            class_map: IndexMap::new(),
            parents: HashMap::new(),
            attrs: HashMap::new(),
            methods: HashMap::new(),
        };
        for class in basics.iter().chain(classes) {
            table.add_class(class, interner, diag);
        }
        table
    }

    fn add_class(&mut self, class: &'a Class, interner: &Interner, diag: &mut Diagnostics) {
        let name = class.name;
        let parent = class.parent;
        let text = |s| interner.resolve(s);

        if self.class_map.contains_key(&name) {
            diag.error_at(
                class.filename,
                class.line,
                format!("Class {} has already been defined.", text(name)),
            );
            return;
        }
        if parent == self.names.bool_
            || parent == self.names.int
            || parent == self.names.string
            || parent == self.names.self_type
        {
            diag.error_at(
                class.filename,
                class.line,
                format!("Class {} cannot inherit class {}.", text(name), text(parent)),
            );
            return;
        }
        if name == self.names.self_type {
            diag.error_at(
                class.filename,
                class.line,
                format!("Redefinition of {} is not allowed.", text(name)),
            );
            return;
        }

        self.class_map.insert(name, class);
        self.parents.insert(name, parent);
    }

    pub fn check_main_defined(&self, diag: &mut Diagnostics) -> bool {
        if !self.class_map.contains_key(&self.names.main_class) {
            diag.error("Class Main is not defined.");
            return false;
        }
        true
    }

    pub fn check_parents_defined(&self, interner: &Interner, diag: &mut Diagnostics) -> bool {
        for (&child, class) in &self.class_map {
            if child == self.names.object {
                continue;
            }
            let parent = class.parent;
            if !self.class_map.contains_key(&parent) {
                diag.error_at(
                    class.filename,
                    class.line,
                    format!(
                        "Class {} inherits from an undefined class {}.",
                        interner.resolve(child),
                        interner.resolve(parent)
                    ),
                );
                return false;
            }
        }
        true
    }

    /// Walk each class's ancestor chain; a chain that revisits one of its
    /// own nodes before reaching `Object` (or an already-cleared node) is a
    /// cycle.
    pub fn check_acyclic(&self, interner: &Interner, diag: &mut Diagnostics) -> bool {
        let mut cleared: HashSet<Symbol> = HashSet::new();
        for (&start, class) in &self.class_map {
            if cleared.contains(&start) {
                continue;
            }
            let mut path: HashSet<Symbol> = HashSet::new();
            path.insert(start);
            let mut below = start;
            let mut ancestor = class.parent;
            while ancestor != self.names.no_class {
                if cleared.contains(&ancestor) {
                    break;
                }
                if path.contains(&ancestor) {
                    diag.error_at(
                        class.filename,
                        class.line,
                        format!(
                            "There exists a circular dependency for {} (the ancestor of {}).",
                            interner.resolve(ancestor),
                            interner.resolve(below)
                        ),
                    );
                    return false;
                }
                path.insert(ancestor);
                below = ancestor;
                ancestor = self.parents[&ancestor];
            }
            cleared.extend(path);
        }
        true
    }

    /// Build the flattened feature maps for every class. Structural feature
    /// errors (attribute redeclaration, bad override, `self` formal) are
    /// fatal.
    pub(crate) fn build_feature_maps(
        &mut self,
        interner: &Interner,
        diag: &mut Diagnostics,
    ) -> Result<(), Fatal> {
        let order: Vec<Symbol> = self.class_map.keys().copied().collect();
        for name in order {
            self.build_feature_map(name, interner, diag)?;
        }
        Ok(())
    }

    fn build_feature_map(
        &mut self,
        name: Symbol,
        interner: &Interner,
        diag: &mut Diagnostics,
    ) -> Result<(), Fatal> {
        if self.attrs.contains_key(&name) {
            return Ok(());
        }
        let class = self.class_map[&name];
        let text = |s| interner.resolve(s);

        // Parent first; `Object` starts from empty maps.
        let (mut attrs, mut methods) = if name == self.names.object {
            (IndexMap::new(), IndexMap::new())
        } else {
            self.build_feature_map(class.parent, interner, diag)?;
            (
                self.attrs[&class.parent].clone(),
                self.methods[&class.parent].clone(),
            )
        };

        for feature in &class.features {
            match feature {
                Feature::Attr(attr) => {
                    if attrs.contains_key(&attr.name) {
                        diag.error_at(
                            class.filename,
                            class.line,
                            format!(
                                "Attribute {} is an attribute of an inherited class.",
                                text(attr.name)
                            ),
                        );
                        return Err(Fatal);
                    }
                    attrs.insert(attr.name, attr);
                }
                Feature::Method(method) => {
                    for formal in &method.formals {
                        if formal.name == self.names.self_ {
                            diag.error_at(
                                class.filename,
                                class.line,
                                "'self' cannot be the name of a formal parameter.",
                            );
                            return Err(Fatal);
                        }
                    }
                    if let Some(original) = methods.get(&method.name) {
                        if original.return_ty != method.return_ty {
                            diag.error_at(
                                class.filename,
                                class.line,
                                format!(
                                    "In redefined method {}, return type {} is different \
                                     from original return type {}.",
                                    text(method.name),
                                    text(method.return_ty),
                                    text(original.return_ty)
                                ),
                            );
                            return Err(Fatal);
                        }
                        if original.formals.len() != method.formals.len() {
                            diag.error_at(
                                class.filename,
                                class.line,
                                format!(
                                    "In redefined method {}, parameter length {} is different \
                                     from original length {}.",
                                    text(method.name),
                                    method.formals.len(),
                                    original.formals.len()
                                ),
                            );
                            return Err(Fatal);
                        }
                        for (original_formal, formal) in
                            original.formals.iter().zip(&method.formals)
                        {
                            if original_formal.declared_ty != formal.declared_ty {
                                diag.error_at(
                                    class.filename,
                                    class.line,
                                    format!(
                                        "In redefined method {}, parameter type {} is different \
                                         from original type {}.",
                                        text(method.name),
                                        text(formal.declared_ty),
                                        text(original_formal.declared_ty)
                                    ),
                                );
                                return Err(Fatal);
                            }
                        }
                    }
                    methods.insert(method.name, method);
                }
            }
        }

        self.attrs.insert(name, attrs);
        self.methods.insert(name, methods);
        Ok(())
    }

    pub fn names(&self) -> Names {
        self.names
    }

    pub fn has_class(&self, name: Symbol) -> bool {
        self.class_map.contains_key(&name)
    }

    /// Declaration of a defined class.
    ///
    /// # Panics
    /// Panics if `name` is not a defined class.
    pub fn class(&self, name: Symbol) -> &'a Class {
        self.class_map[&name]
    }

    /// Every defined class, basics first, then user classes in declaration
    /// order.
    pub fn classes(&self) -> impl Iterator<Item = (Symbol, &'a Class)> + '_ {
        self.class_map.iter().map(|(&name, &class)| (name, class))
    }

    pub fn parent_of(&self, class: Symbol) -> Option<Symbol> {
        self.parents.get(&class).copied()
    }

    /// Flattened attributes of `class`, inherited first.
    ///
    /// # Panics
    /// Panics before `build_feature_maps` has run, or for an undefined class.
    pub fn attrs_of(&self, class: Symbol) -> &IndexMap<Symbol, &'a Attr> {
        &self.attrs[&class]
    }

    /// Flattened methods of `class`; overrides occupy the inherited slot.
    ///
    /// # Panics
    /// Panics before `build_feature_maps` has run, or for an undefined class.
    pub fn methods_of(&self, class: Symbol) -> &IndexMap<Symbol, &'a Method> {
        &self.methods[&class]
    }

    /// The definition of `method` visible in `class`, if any.
    pub fn method(&self, class: Symbol, method: Symbol) -> Option<&'a Method> {
        self.methods.get(&class)?.get(&method).copied()
    }

    /// Whether `t1 <= t2` under the inheritance relation. `SELF_TYPE`
    /// conforms only to itself; callers resolve it before asking about
    /// concrete classes.
    pub fn is_subtype_of(&self, t1: Symbol, t2: Symbol) -> bool {
        if t1 == self.names.self_type && t2 == self.names.self_type {
            return true;
        }
        if t1 == self.names.self_type || t2 == self.names.self_type {
            return false;
        }
        if t2 == self.names.object {
            return true;
        }
        let mut current = t1;
        while current != self.names.object {
            if current == t2 {
                return true;
            }
            match self.parents.get(&current) {
                Some(&parent) => current = parent,
                None => return false,
            }
        }
        false
    }

    /// Least upper bound of two concrete classes: their closest common
    /// ancestor. `SELF_TYPE` must be resolved to the enclosing class before
    /// calling this.
    pub fn lub(&self, t1: Symbol, t2: Symbol) -> Symbol {
        if t1 == self.names.object || t2 == self.names.object {
            return self.names.object;
        }
        let mut ancestors: HashSet<Symbol> = HashSet::new();
        let mut current = t1;
        while current != self.names.object {
            if current == t2 {
                return current;
            }
            ancestors.insert(current);
            match self.parents.get(&current) {
                Some(&parent) => current = parent,
                None => break,
            }
        }
        current = t2;
        while current != self.names.object {
            if ancestors.contains(&current) {
                return current;
            }
            match self.parents.get(&current) {
                Some(&parent) => current = parent,
                None => break,
            }
        }
        self.names.object
    }
}
