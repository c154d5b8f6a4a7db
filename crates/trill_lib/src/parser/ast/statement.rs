//! Statement AST nodes: blocks, control flow, switch/case, and declaration
//! statements.

use std::cell::Cell;

use super::declaration::DeclNode;
use super::expression::ExprNode;
use crate::source::SourceRange;

#[derive(Debug, Clone, PartialEq)]
pub struct StmtNode {
    pub kind: StmtKind,
    pub range: SourceRange,
}

impl StmtNode {
    pub fn new(kind: StmtKind, range: SourceRange) -> Self {
        StmtNode { kind, range }
    }
}

#[derive(Debug, Clone)]
pub struct SwitchCase {
    pub pattern: Option<ExprNode>,
    pub body: Vec<StmtNode>,
}

impl PartialEq for SwitchCase {
    fn eq(&self, other: &Self) -> bool {
        self.pattern == other.pattern && self.body == other.body
    }
}

#[derive(Debug, Clone)]
pub enum StmtKind {
    /// A `{ ... }` block. `has_return` is set by the semantic analyzer once
    /// every control-flow path through the block is known to return, and is
    /// read back by the formatter's and type checker's "unreachable code
    /// after return" pass.
    Block { statements: Vec<StmtNode>, has_return: Cell<bool> },
    IfChain { branches: Vec<(ExprNode, Vec<StmtNode>)>, else_branch: Option<Vec<StmtNode>> },
    While { cond: ExprNode, body: Vec<StmtNode> },
    /// C-style `for (init; cond; step) { ... }`.
    For {
        init: Option<Box<StmtNode>>,
        cond: Option<ExprNode>,
        step: Option<Box<StmtNode>>,
        body: Vec<StmtNode>,
    },
    Switch { scrutinee: ExprNode, cases: Vec<SwitchCase> },
    Break,
    Continue,
    Return(Option<ExprNode>),
    ExprStmt(ExprNode),
    DeclStmt(Box<DeclNode>),
    /// `#warning("...")` / `#error("...")` encountered during parsing or
    /// semantic analysis, surfaced as a diagnostic rather than executed.
    PoundDiagnostic { is_error: bool, message: String },
}

/// `has_return` is solver bookkeeping, not part of a statement's identity.
impl PartialEq for StmtKind {
    fn eq(&self, other: &Self) -> bool {
        use StmtKind::*;
        match (self, other) {
            (Block { statements: s1, .. }, Block { statements: s2, .. }) => s1 == s2,
            (IfChain { branches: b1, else_branch: e1 }, IfChain { branches: b2, else_branch: e2 }) => {
                b1 == b2 && e1 == e2
            }
            (While { cond: c1, body: b1 }, While { cond: c2, body: b2 }) => c1 == c2 && b1 == b2,
            (
                For { init: i1, cond: c1, step: s1, body: b1 },
                For { init: i2, cond: c2, step: s2, body: b2 },
            ) => i1 == i2 && c1 == c2 && s1 == s2 && b1 == b2,
            (Switch { scrutinee: s1, cases: c1 }, Switch { scrutinee: s2, cases: c2 }) => {
                s1 == s2 && c1 == c2
            }
            (Break, Break) | (Continue, Continue) => true,
            (Return(a), Return(b)) => a == b,
            (ExprStmt(a), ExprStmt(b)) => a == b,
            (DeclStmt(a), DeclStmt(b)) => a == b,
            (
                PoundDiagnostic { is_error: e1, message: m1 },
                PoundDiagnostic { is_error: e2, message: m2 },
            ) => e1 == e2 && m1 == m2,
            _ => false,
        }
    }
}
