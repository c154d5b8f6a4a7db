//! Weak, non-owning handles to declarations owned by `ASTContext`.
//!
//! Resolved declaration references on expressions are back-edges into
//! `ASTContext`-owned storage. Modeled as plain indexes (no `Rc`/`Weak`) so
//! the AST can never form an ownership cycle with the context that owns it.

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub enum DeclRef {
    Function(u32),
    Operator(u32),
    Type(u32),
    Protocol(u32),
    Global(u32),
    TypeAlias(u32),
    /// A function parameter or `let`/`var` binding local to a function body
    /// or closure, resolved against the lexical `Scope` stack rather than
    /// one of `ASTContext`'s top-level tables.
    Local(u32),
}
