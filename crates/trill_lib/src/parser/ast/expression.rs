//! Expression AST nodes.
//!
//! Every node carries a mutable type slot (`Rc<RefCell<DataType>>`) that the
//! constraint solver assigns and the post-solve type checker freezes, plus
//! `RefCell` back-edges for lazily-resolved declaration references.

use std::cell::RefCell;
use std::rc::Rc;

use crate::decl_ref::DeclRef;
use crate::lexer::token::StringSegment;
use crate::sema::types::DataType;
use crate::source::{Identifier, SourceRange};

use super::declaration::ParamDecl;
use super::statement::StmtNode;
use super::type_name::TypeName;

/// The mutable-until-validated type slot shared between the constraint
/// solver and the nodes it annotates.
pub type TypeSlot = Rc<RefCell<DataType>>;

pub fn fresh_type_slot() -> TypeSlot {
    Rc::new(RefCell::new(DataType::TypeVariable(String::new())))
}

#[derive(Debug, Clone, PartialEq)]
pub struct Argument {
    pub label: Option<Identifier>,
    pub value: ExprNode,
}

#[derive(Debug, Clone)]
pub struct ExprNode {
    pub kind: ExprKind,
    pub range: SourceRange,
    pub ty: TypeSlot,
}

impl ExprNode {
    pub fn new(kind: ExprKind, range: SourceRange) -> Self {
        ExprNode { kind, range, ty: fresh_type_slot() }
    }
}

impl PartialEq for ExprNode {
    fn eq(&self, other: &Self) -> bool {
        self.kind == other.kind
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PoundLiteralKind {
    File,
    Line,
    Function,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ExprKind {
    IntegerLiteral(String),
    FloatingLiteral(String),
    StringLiteral(Vec<StringSegment>),
    CharLiteral(char),
    BoolLiteral(bool),
    NilLiteral,
    VoidLiteral,
    PoundLiteral(PoundLiteralKind),

    VariableRef { name: Identifier, resolved: RefCell<Option<DeclRef>> },
    PropertyRef { base: Box<ExprNode>, name: Identifier, resolved: RefCell<Option<DeclRef>> },

    Tuple(Vec<ExprNode>),
    Array(Vec<ExprNode>),
    TupleFieldLookup { base: Box<ExprNode>, index: u32 },
    Paren(Box<ExprNode>),
    Subscript { base: Box<ExprNode>, index: Box<ExprNode> },
    Call { callee: Box<ExprNode>, args: Vec<Argument>, resolved: RefCell<Option<DeclRef>> },
    Closure { params: Vec<ParamDecl>, ret: Option<TypeName>, body: Vec<StmtNode>, captures: RefCell<Vec<DeclRef>> },

    Prefix { op: String, operand: Box<ExprNode>, resolved: RefCell<Option<DeclRef>> },
    Infix { op: String, lhs: Box<ExprNode>, rhs: Box<ExprNode>, resolved: RefCell<Option<DeclRef>> },
    Ternary { cond: Box<ExprNode>, then_branch: Box<ExprNode>, else_branch: Box<ExprNode> },

    /// `expr as TypeName`
    Coercion { expr: Box<ExprNode>, target: TypeName },
    /// `expr is TypeName`
    IsCheck { expr: Box<ExprNode>, target: TypeName },
    Sizeof(TypeName),
}
