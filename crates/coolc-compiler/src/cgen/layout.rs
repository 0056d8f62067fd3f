//! Object layout planning.
//!
//! Visits classes breadth-first from `Object`, so every class sees its
//! parent's finished layout. Attribute and method vectors are inherited
//! verbatim and extended; a method override replaces the owner in place,
//! keeping the inherited dispatch index.

use std::collections::{HashMap, VecDeque};

use coolc_core::Symbol;
use indexmap::IndexMap;

use crate::ast::Feature;
use crate::semant::ClassTable;

/// Words occupied by the object header: tag, size, dispatch pointer.
pub const OBJECT_HEADER_WORDS: i32 = 3;

/// Reserved class tags. User classes are tagged sequentially from
/// `FIRST_USER_TAG` in BFS-visit order.
pub const OBJECT_TAG: i32 = 0;
pub const IO_TAG: i32 = 1;
pub const INT_TAG: i32 = 2;
pub const BOOL_TAG: i32 = 3;
pub const STRING_TAG: i32 = 4;
const FIRST_USER_TAG: i32 = 5;

/// Layout of one class: its tag, prototype size, and the slot assignment
/// of every attribute and method, each mapped to its owning class (the
/// most-derived class providing the definition).
#[derive(Debug, Clone)]
pub struct ClassLayout {
    pub tag: i32,
    pub size: i32,
    attrs: IndexMap<Symbol, Symbol>,
    methods: IndexMap<Symbol, Symbol>,
}

impl ClassLayout {
    /// Word offset of `attr` from the start of the object.
    pub fn attr_offset(&self, attr: Symbol) -> Option<i32> {
        self.attrs
            .get_index_of(&attr)
            .map(|index| OBJECT_HEADER_WORDS + index as i32)
    }

    /// Index of `method` in the dispatch table.
    pub fn method_index(&self, method: Symbol) -> Option<i32> {
        self.methods.get_index_of(&method).map(|index| index as i32)
    }

    /// `(attribute, owner)` pairs in slot order.
    pub fn attrs(&self) -> impl Iterator<Item = (Symbol, Symbol)> + '_ {
        self.attrs.iter().map(|(&attr, &owner)| (attr, owner))
    }

    /// `(method, owner)` pairs in dispatch-table order.
    pub fn methods(&self) -> impl Iterator<Item = (Symbol, Symbol)> + '_ {
        self.methods.iter().map(|(&method, &owner)| (method, owner))
    }

    pub fn attr_count(&self) -> usize {
        self.attrs.len()
    }

    pub fn method_count(&self) -> usize {
        self.methods.len()
    }
}

/// Layouts for every class, plus the traversal structure the emitter needs:
/// the BFS emission order and the children adjacency (used again by `case`
/// tag dispatch).
#[derive(Debug)]
pub struct Layouts {
    by_class: HashMap<Symbol, ClassLayout>,
    emit_order: Vec<Symbol>,
    children: HashMap<Symbol, Vec<Symbol>>,
}

impl Layouts {
    pub fn plan(table: &ClassTable<'_>) -> Self {
        let names = table.names();

        let mut children: HashMap<Symbol, Vec<Symbol>> = HashMap::new();
        for (name, class) in table.classes() {
            if name != names.object {
                children.entry(class.parent).or_default().push(name);
            }
        }

        let mut by_class: HashMap<Symbol, ClassLayout> = HashMap::new();
        let mut emit_order = Vec::new();
        let mut next_tag = FIRST_USER_TAG;

        let mut queue = VecDeque::from([names.object]);
        while let Some(name) = queue.pop_front() {
            let class = table.class(name);

            let (mut attrs, mut methods) = if name == names.object {
                (IndexMap::new(), IndexMap::new())
            } else {
                let parent = &by_class[&class.parent];
                (parent.attrs.clone(), parent.methods.clone())
            };
            for feature in &class.features {
                match feature {
                    // Redeclaration was rejected by the analyzer, so every
                    // attribute appends a fresh slot.
                    Feature::Attr(attr) => {
                        attrs.insert(attr.name, name);
                    }
                    // An override replaces the owner without moving the
                    // dispatch index.
                    Feature::Method(method) => {
                        methods.insert(method.name, name);
                    }
                }
            }

            let tag = if name == names.object {
                OBJECT_TAG
            } else if name == names.io {
                IO_TAG
            } else if name == names.int {
                INT_TAG
            } else if name == names.bool_ {
                BOOL_TAG
            } else if name == names.string {
                STRING_TAG
            } else {
                let tag = next_tag;
                next_tag += 1;
                tag
            };

            let size = OBJECT_HEADER_WORDS + attrs.len() as i32;
            by_class.insert(
                name,
                ClassLayout {
                    tag,
                    size,
                    attrs,
                    methods,
                },
            );
            emit_order.push(name);

            if let Some(kids) = children.get(&name) {
                queue.extend(kids.iter().copied());
            }
        }

        Self {
            by_class,
            emit_order,
            children,
        }
    }

    /// Layout of a defined class.
    ///
    /// # Panics
    /// Panics if `class` was not part of the planned table.
    pub fn class(&self, class: Symbol) -> &ClassLayout {
        &self.by_class[&class]
    }

    /// Every class in BFS order from `Object`; the order used for tags and
    /// for emitting every per-class section.
    pub fn emit_order(&self) -> &[Symbol] {
        &self.emit_order
    }

    /// Direct subclasses of `class`, in installation order.
    pub fn children_of(&self, class: Symbol) -> &[Symbol] {
        self.children
            .get(&class)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }
}
