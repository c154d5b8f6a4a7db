//! Lexical scope stack for local variable/parameter bindings.
//!
//! A stack of frames, innermost last, entered/exited around function and
//! closure bodies. Each binding maps to a `DeclRef::Local` handle plus its
//! declared `DataType`, since locals are resolved the same way top-level
//! decls are — weak handles, not owned expressions.

use std::collections::HashMap;

use crate::decl_ref::DeclRef;
use crate::sema::types::DataType;

#[derive(Debug, Clone)]
struct Binding {
    decl: DeclRef,
    ty: DataType,
    mutable: bool,
}

#[derive(Debug, Clone, Default)]
struct Frame {
    bindings: HashMap<String, Binding>,
}

#[derive(Debug, Clone)]
pub struct Scope {
    frames: Vec<Frame>,
    next_local: u32,
}

impl Default for Scope {
    fn default() -> Self {
        Scope { frames: vec![Frame::default()], next_local: 0 }
    }
}

impl Scope {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn enter_scope(&mut self) {
        self.frames.push(Frame::default());
    }

    pub fn exit_scope(&mut self) {
        self.frames.pop();
    }

    /// Binds `name` in the innermost frame to a fresh `DeclRef::Local`,
    /// shadowing any outer binding of the same name.
    pub fn declare(&mut self, name: impl Into<String>, ty: DataType, mutable: bool) -> DeclRef {
        let decl = DeclRef::Local(self.next_local);
        self.next_local += 1;
        let frame = self.frames.last_mut().expect("scope stack is never empty");
        frame.bindings.insert(name.into(), Binding { decl, ty, mutable });
        decl
    }

    pub fn resolve(&self, name: &str) -> Option<DeclRef> {
        self.frames.iter().rev().find_map(|f| f.bindings.get(name)).map(|b| b.decl)
    }

    pub fn type_of(&self, name: &str) -> Option<DataType> {
        self.frames.iter().rev().find_map(|f| f.bindings.get(name)).map(|b| b.ty.clone())
    }

    pub fn is_mutable(&self, name: &str) -> Option<bool> {
        self.frames.iter().rev().find_map(|f| f.bindings.get(name)).map(|b| b.mutable)
    }
}
