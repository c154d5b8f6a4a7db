//! Semantic-analysis error taxonomy.
//!
//! One flat enum with a `Display` impl feeding diagnostics, rather than
//! per-phase error types. Registration-time variants come first since
//! `ASTContext` needs them before anything else in the pipeline exists.

use std::fmt;

use crate::sema::types::DataType;
use crate::source::SourceRange;

#[derive(Debug, Clone)]
pub enum SemaError {
    DuplicateFunction { name: String, range: SourceRange },
    DuplicateOperator { op: String, range: SourceRange },
    DuplicateMain { range: SourceRange },
    DuplicateType { name: String, range: SourceRange },
    DuplicateTypeAlias { name: String, range: SourceRange },
    DuplicateGlobal { name: String, range: SourceRange },
    DuplicateProtocol { name: String, range: SourceRange },
    CircularAlias { name: String, range: SourceRange },
    CircularLayout { name: String, range: SourceRange },

    CannotConvert { from: DataType, to: DataType, range: SourceRange },
    Ambiguity { candidates: Vec<String>, range: SourceRange },
    NoCandidates { name: String, range: SourceRange },
    NoMatchingCandidates { name: String, reasons: Vec<String>, range: SourceRange },

    TypeDoesNotConform { type_name: String, protocol: String, missing: Vec<String>, range: SourceRange },

    Overflow { raw: String, type_name: String, range: SourceRange },
    Underflow { raw: String, type_name: String, range: SourceRange },
    ShiftOutOfRange { amount: String, width: u32, range: SourceRange },
    NonBoolCondition { range: SourceRange },
    ReturnTypeMismatch { expected: DataType, found: DataType, range: SourceRange },
    ArityMismatch { expected: usize, found: usize, range: SourceRange },
    UnknownLabel { label: String, range: SourceRange },
    SwitchCaseTypeMismatch { range: SourceRange },

    AssignToImmutable { culprit: Option<String>, range: SourceRange },
    DereferenceNonPointer { range: SourceRange },
    AddressOfNonLvalue { range: SourceRange },

    UnknownType { name: String, range: SourceRange },
    UnknownIdentifier { name: String, range: SourceRange },
    UnknownProtocol { name: String, range: SourceRange },

    PointerPropertyAccess { range: SourceRange },
    TuplePropertyAccess { range: SourceRange },
    FieldOfFunctionType { range: SourceRange },
    IncompleteTypeAccess { owner: DataType, member: String, range: SourceRange },
    CallNonFunction { callee_type: DataType, range: SourceRange },
    IndexIntoNonTuple { range: SourceRange },
    OutOfBoundsTupleField { index: u32, arity: usize, range: SourceRange },
    CannotSubscript { base_type: DataType, range: SourceRange },

    PoundFunctionOutsideFunction { range: SourceRange },
    BreakNotAllowed { range: SourceRange },
    ContinueNotAllowed { range: SourceRange },
    CaseMustBeConstant { range: SourceRange },
    CannotSwitch { scrutinee_type: DataType, range: SourceRange },
    DeinitOnStruct { range: SourceRange },
    ReferenceSelfInProp { type_name: String, range: SourceRange },

    NonForeignFunctionWithoutBody { name: String, range: SourceRange },
    ForeignFunctionWithBody { name: String, range: SourceRange },
    VarArgsInNonForeignDecl { name: String, range: SourceRange },
    NotAllPathsReturn { name: String, range: SourceRange },

    /// Solver: only type variables remained after solving.
    AmbiguousExpressionType { range: SourceRange },
    /// Solver: occurs check failed; fatal, aborts the enclosing phase.
    InfiniteType { var: String, range: SourceRange },
}

impl SemaError {
    pub fn range(&self) -> SourceRange {
        use SemaError::*;
        match self {
            DuplicateFunction { range, .. }
            | DuplicateOperator { range, .. }
            | DuplicateMain { range }
            | DuplicateType { range, .. }
            | DuplicateTypeAlias { range, .. }
            | DuplicateGlobal { range, .. }
            | DuplicateProtocol { range, .. }
            | CircularAlias { range, .. }
            | CircularLayout { range, .. }
            | CannotConvert { range, .. }
            | Ambiguity { range, .. }
            | NoCandidates { range, .. }
            | NoMatchingCandidates { range, .. }
            | TypeDoesNotConform { range, .. }
            | Overflow { range, .. }
            | Underflow { range, .. }
            | ShiftOutOfRange { range, .. }
            | NonBoolCondition { range }
            | ReturnTypeMismatch { range, .. }
            | ArityMismatch { range, .. }
            | UnknownLabel { range, .. }
            | SwitchCaseTypeMismatch { range }
            | AssignToImmutable { range, .. }
            | DereferenceNonPointer { range }
            | AddressOfNonLvalue { range }
            | UnknownType { range, .. }
            | UnknownIdentifier { range, .. }
            | UnknownProtocol { range, .. }
            | PointerPropertyAccess { range }
            | TuplePropertyAccess { range }
            | FieldOfFunctionType { range }
            | IncompleteTypeAccess { range, .. }
            | CallNonFunction { range, .. }
            | IndexIntoNonTuple { range }
            | OutOfBoundsTupleField { range, .. }
            | CannotSubscript { range, .. }
            | PoundFunctionOutsideFunction { range }
            | BreakNotAllowed { range }
            | ContinueNotAllowed { range }
            | CaseMustBeConstant { range }
            | CannotSwitch { range, .. }
            | DeinitOnStruct { range }
            | ReferenceSelfInProp { range, .. }
            | NonForeignFunctionWithoutBody { range, .. }
            | ForeignFunctionWithBody { range, .. }
            | VarArgsInNonForeignDecl { range, .. }
            | NotAllPathsReturn { range, .. }
            | AmbiguousExpressionType { range }
            | InfiniteType { range, .. } => *range,
        }
    }
}

impl fmt::Display for SemaError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SemaError::DuplicateFunction { name, .. } => {
                write!(f, "a function named '{name}' with this signature is already defined")
            }
            SemaError::DuplicateOperator { op, .. } => {
                write!(f, "an overload of operator '{op}' with this signature already exists")
            }
            SemaError::DuplicateMain { .. } => write!(f, "only one 'main' function may be defined"),
            SemaError::DuplicateType { name, .. } => write!(f, "a type named '{name}' is already defined"),
            SemaError::DuplicateTypeAlias { name, .. } => {
                write!(f, "an alias named '{name}' is already defined")
            }
            SemaError::DuplicateGlobal { name, .. } => {
                write!(f, "a global named '{name}' is already defined")
            }
            SemaError::DuplicateProtocol { name, .. } => {
                write!(f, "a protocol named '{name}' is already defined")
            }
            SemaError::CircularAlias { name, .. } => {
                write!(f, "type alias '{name}' refers to itself through a chain of aliases")
            }
            SemaError::CircularLayout { name, .. } => {
                write!(f, "type '{name}' contains itself without indirection")
            }
            SemaError::CannotConvert { from, to, .. } => write!(f, "cannot convert '{from}' to '{to}'"),
            SemaError::Ambiguity { candidates, .. } => {
                write!(f, "call is ambiguous between {} candidates", candidates.len())
            }
            SemaError::NoCandidates { name, .. } => write!(f, "no function named '{name}' found"),
            SemaError::NoMatchingCandidates { name, reasons, .. } => {
                write!(f, "no overload of '{name}' matches these arguments ({})", reasons.join("; "))
            }
            SemaError::TypeDoesNotConform { type_name, protocol, .. } => {
                write!(f, "'{type_name}' does not conform to '{protocol}'")
            }
            SemaError::Overflow { raw, type_name, .. } => {
                write!(f, "integer literal '{raw}' overflows '{type_name}'")
            }
            SemaError::Underflow { raw, type_name, .. } => {
                write!(f, "integer literal '{raw}' underflows '{type_name}'")
            }
            SemaError::ShiftOutOfRange { amount, width, .. } => {
                write!(f, "shift amount '{amount}' is out of range for a {width}-bit value")
            }
            SemaError::NonBoolCondition { .. } => write!(f, "condition must have type 'Bool'"),
            SemaError::ReturnTypeMismatch { expected, found, .. } => {
                write!(f, "expected return type '{expected}', found '{found}'")
            }
            SemaError::ArityMismatch { expected, found, .. } => {
                write!(f, "expected {expected} arguments, found {found}")
            }
            SemaError::UnknownLabel { label, .. } => write!(f, "unexpected argument label '{label}'"),
            SemaError::SwitchCaseTypeMismatch { .. } => {
                write!(f, "switch case constant does not match the scrutinee's type")
            }
            SemaError::AssignToImmutable { culprit, .. } => match culprit {
                Some(name) => write!(f, "cannot assign: '{name}' is not mutable"),
                None => write!(f, "cannot assign to an immutable expression"),
            },
            SemaError::DereferenceNonPointer { .. } => write!(f, "cannot dereference a non-pointer value"),
            SemaError::AddressOfNonLvalue { .. } => write!(f, "cannot take the address of a non-lvalue"),
            SemaError::UnknownType { name, .. } => write!(f, "unknown type '{name}'"),
            SemaError::UnknownIdentifier { name, .. } => write!(f, "unknown identifier '{name}'"),
            SemaError::UnknownProtocol { name, .. } => write!(f, "unknown protocol '{name}'"),
            SemaError::PointerPropertyAccess { .. } => write!(f, "cannot access a property on a pointer directly; dereference it first"),
            SemaError::TuplePropertyAccess { .. } => write!(f, "tuples are accessed by index (`.0`), not by name"),
            SemaError::FieldOfFunctionType { .. } => write!(f, "function types have no properties"),
            SemaError::IncompleteTypeAccess { owner, member, .. } => {
                write!(f, "'{owner}' has no member '{member}'")
            }
            SemaError::CallNonFunction { callee_type, .. } => {
                write!(f, "cannot call a value of type '{callee_type}'")
            }
            SemaError::IndexIntoNonTuple { .. } => write!(f, "tuple-field syntax used on a non-tuple value"),
            SemaError::OutOfBoundsTupleField { index, arity, .. } => {
                write!(f, "tuple field index {index} is out of bounds for a {arity}-element tuple")
            }
            SemaError::CannotSubscript { base_type, .. } => {
                write!(f, "cannot subscript a value of type '{base_type}'")
            }
            SemaError::PoundFunctionOutsideFunction { .. } => {
                write!(f, "'#function' may only be used inside a function body")
            }
            SemaError::BreakNotAllowed { .. } => write!(f, "'break' is only allowed inside a loop or switch"),
            SemaError::ContinueNotAllowed { .. } => write!(f, "'continue' is only allowed inside a loop"),
            SemaError::CaseMustBeConstant { .. } => write!(f, "switch case patterns must be constant expressions"),
            SemaError::CannotSwitch { scrutinee_type, .. } => {
                write!(f, "cannot switch over a value of type '{scrutinee_type}'")
            }
            SemaError::DeinitOnStruct { .. } => write!(f, "'deinit' is only allowed on indirect types"),
            SemaError::ReferenceSelfInProp { type_name, .. } => {
                write!(f, "type '{type_name}' contains itself without indirection")
            }
            SemaError::NonForeignFunctionWithoutBody { name, .. } => {
                write!(f, "function '{name}' has no body and is not marked 'foreign'")
            }
            SemaError::ForeignFunctionWithBody { name, .. } => {
                write!(f, "'foreign' function '{name}' must not have a body")
            }
            SemaError::VarArgsInNonForeignDecl { name, .. } => {
                write!(f, "'{name}' uses a variadic parameter list but is not marked 'foreign'")
            }
            SemaError::NotAllPathsReturn { name, .. } => {
                write!(f, "not all code paths in '{name}' return a value")
            }
            SemaError::AmbiguousExpressionType { .. } => {
                write!(f, "cannot infer a concrete type for this expression")
            }
            SemaError::InfiniteType { var, .. } => {
                write!(f, "type variable '{var}' occurs within its own solution (infinite type)")
            }
        }
    }
}

impl std::error::Error for SemaError {}
