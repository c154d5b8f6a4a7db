//! Declaration AST nodes covering variables, functions, types, extensions,
//! protocols, type aliases, and generic parameters.

use crate::source::{Identifier, SourceRange};

use super::expression::ExprNode;
use super::statement::StmtNode;
use super::type_name::TypeName;

/// The modifier matrix a declaration carries. Validity of a given
/// combination against the declaration kind is checked during parsing
/// rather than encoded in the type system, since the same lexical modifiers
/// apply across several unrelated kinds.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ModifierSet {
    pub foreign: bool,
    pub is_static: bool,
    pub mutating: bool,
    pub indirect: bool,
    pub noreturn: bool,
    pub implicit: bool,
}

impl ModifierSet {
    pub fn is_empty(&self) -> bool {
        *self == ModifierSet::default()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ParamDecl {
    pub label: Option<Identifier>,
    pub name: Identifier,
    pub type_name: TypeName,
    pub default_value: Option<ExprNode>,
    pub range: SourceRange,
}

#[derive(Debug, Clone, PartialEq)]
pub struct GenericParamDecl {
    pub name: Identifier,
    /// `where T: Protocol` bounds collected from the function/type's
    /// `where` clause, stored alongside the parameter for convenience.
    pub bounds: Vec<Identifier>,
    pub range: SourceRange,
}

#[derive(Debug, Clone, PartialEq)]
pub struct VariableDecl {
    pub name: Identifier,
    pub is_mutable: bool,
    pub type_name: Option<TypeName>,
    pub initializer: Option<ExprNode>,
    pub modifiers: ModifierSet,
    pub range: SourceRange,
}

#[derive(Debug, Clone, PartialEq)]
pub enum PropertyAccessor {
    Stored { initializer: Option<ExprNode> },
    Computed { getter: Vec<StmtNode>, setter: Option<(Identifier, Vec<StmtNode>)> },
}

#[derive(Debug, Clone, PartialEq)]
pub struct PropertyDecl {
    pub name: Identifier,
    pub is_mutable: bool,
    pub type_name: Option<TypeName>,
    pub accessor: PropertyAccessor,
    pub modifiers: ModifierSet,
    pub range: SourceRange,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FunctionKind {
    Free,
    Method,
    Init,
    Deinit,
    Subscript,
    Operator,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FunctionDecl {
    pub kind: FunctionKind,
    pub name: Identifier,
    pub generics: Vec<GenericParamDecl>,
    pub params: Vec<ParamDecl>,
    /// Trailing `...` in the parameter list, valid only on `foreign`
    /// declarations.
    pub has_varargs: bool,
    pub ret: Option<TypeName>,
    pub body: Option<Vec<StmtNode>>,
    pub modifiers: ModifierSet,
    pub range: SourceRange,
}

#[derive(Debug, Clone, PartialEq)]
pub enum TypeMember {
    Property(PropertyDecl),
    Function(FunctionDecl),
}

#[derive(Debug, Clone, PartialEq)]
pub struct TypeDecl {
    pub name: Identifier,
    pub generics: Vec<GenericParamDecl>,
    pub conforms_to: Vec<Identifier>,
    pub members: Vec<TypeMember>,
    pub modifiers: ModifierSet,
    pub range: SourceRange,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ExtensionDecl {
    pub target: Identifier,
    pub conforms_to: Vec<Identifier>,
    pub members: Vec<TypeMember>,
    pub range: SourceRange,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ProtocolMember {
    Property { name: Identifier, type_name: TypeName, is_mutable: bool },
    Function { name: Identifier, params: Vec<ParamDecl>, ret: Option<TypeName>, has_default: bool, default_body: Option<Vec<StmtNode>> },
}

#[derive(Debug, Clone, PartialEq)]
pub struct ProtocolDecl {
    pub name: Identifier,
    pub inherits: Vec<Identifier>,
    pub members: Vec<ProtocolMember>,
    pub range: SourceRange,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TypeAliasDecl {
    pub name: Identifier,
    pub generics: Vec<GenericParamDecl>,
    pub target: TypeName,
    pub range: SourceRange,
}

#[derive(Debug, Clone, PartialEq)]
pub enum DeclNode {
    Variable(VariableDecl),
    Param(ParamDecl),
    Property(PropertyDecl),
    Function(FunctionDecl),
    Type(TypeDecl),
    Extension(ExtensionDecl),
    Protocol(ProtocolDecl),
    TypeAlias(TypeAliasDecl),
    Generic(GenericParamDecl),
}

impl DeclNode {
    pub fn range(&self) -> SourceRange {
        match self {
            DeclNode::Variable(d) => d.range,
            DeclNode::Param(d) => d.range,
            DeclNode::Property(d) => d.range,
            DeclNode::Function(d) => d.range,
            DeclNode::Type(d) => d.range,
            DeclNode::Extension(d) => d.range,
            DeclNode::Protocol(d) => d.range,
            DeclNode::TypeAlias(d) => d.range,
            DeclNode::Generic(d) => d.range,
        }
    }

    pub fn name(&self) -> Option<&Identifier> {
        match self {
            DeclNode::Variable(d) => Some(&d.name),
            DeclNode::Param(d) => Some(&d.name),
            DeclNode::Property(d) => Some(&d.name),
            DeclNode::Function(d) => Some(&d.name),
            DeclNode::Type(d) => Some(&d.name),
            DeclNode::Extension(_) => None,
            DeclNode::Protocol(d) => Some(&d.name),
            DeclNode::TypeAlias(d) => Some(&d.name),
            DeclNode::Generic(d) => Some(&d.name),
        }
    }
}
