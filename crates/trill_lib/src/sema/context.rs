//! `ASTContext`: the central registry the semantic analyzer fills in and
//! every later stage (constraint generator, solver, overload resolver)
//! queries.
//!
//! A full top-level declaration registry: ordered lists, lookup maps,
//! mangled-signature uniqueness, alias-cycle detection, builtin preloading,
//! and the derived queries used by the constraint solver and overload
//! resolver. Local-variable scope handling stays a separate, reusable
//! piece (`sema::scope::Scope`).

use std::collections::{HashMap, HashSet};

use crate::decl_ref::DeclRef;
use crate::diagnostics::{Diagnostic, DiagnosticEngine};
use crate::parser::ast::{
    ExprKind, ExprNode, ExtensionDecl, FunctionDecl, FunctionKind, ModifierSet, ParamDecl, ProtocolDecl, TypeAliasDecl,
    TypeDecl, TypeMember, VariableDecl,
};
use crate::parser::ast::type_name::TypeName;
use crate::sema::error::SemaError;
use crate::sema::scope::Scope;
use crate::sema::types::{DataType, FloatKind};
use crate::source::{Identifier, SourceRange};

/// Result of `ASTContext::match_rank`, ordered worst to best so overload
/// scoring can simply compare.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum MatchRank {
    None,
    Any,
    Equal,
}

#[derive(Debug, Clone)]
pub enum Mutability {
    Mutable,
    Immutable { culprit: Option<String> },
}

impl Mutability {
    pub fn is_mutable(&self) -> bool {
        matches!(self, Mutability::Mutable)
    }
}

/// Central registry of every top-level declaration plus builtins.
#[derive(Debug)]
pub struct ASTContext {
    functions: Vec<FunctionDecl>,
    operators: Vec<FunctionDecl>,
    types: Vec<TypeDecl>,
    extensions: Vec<ExtensionDecl>,
    protocols: Vec<ProtocolDecl>,
    globals: Vec<VariableDecl>,
    type_aliases: Vec<TypeAliasDecl>,
    diagnostics: DiagnosticEngine,

    function_overloads: HashMap<String, Vec<u32>>,
    function_signatures: HashSet<String>,
    operator_overloads: HashMap<String, Vec<u32>>,
    operator_signatures: HashSet<String>,
    builtin_operator_by_sig: HashMap<String, u32>,
    protocol_by_name: HashMap<String, u32>,
    type_by_name: HashMap<String, u32>,
    global_by_name: HashMap<String, u32>,
    alias_by_name: HashMap<String, u32>,

    main_function: Option<u32>,
}

impl Default for ASTContext {
    fn default() -> Self {
        let mut ctx = ASTContext {
            functions: vec![],
            operators: vec![],
            types: vec![],
            extensions: vec![],
            protocols: vec![],
            globals: vec![],
            type_aliases: vec![],
            diagnostics: DiagnosticEngine::new(),
            function_overloads: HashMap::new(),
            function_signatures: HashSet::new(),
            operator_overloads: HashMap::new(),
            operator_signatures: HashSet::new(),
            builtin_operator_by_sig: HashMap::new(),
            protocol_by_name: HashMap::new(),
            type_by_name: HashMap::new(),
            global_by_name: HashMap::new(),
            alias_by_name: HashMap::new(),
            main_function: None,
        };
        ctx.preload_builtins();
        ctx
    }
}

/// Maps a primitive keyword to its semantic type, as part of the preloaded
/// builtin list. `None` for anything nominal (user types, protocols,
/// generic parameters in scope).
fn primitive_data_type(name: &str) -> Option<DataType> {
    Some(match name {
        "Void" => DataType::Void,
        "Bool" => DataType::Bool,
        "Any" => DataType::Any,
        "Int" => DataType::Int { width: 64, signed: true },
        "Int8" => DataType::Int { width: 8, signed: true },
        "Int16" => DataType::Int { width: 16, signed: true },
        "Int32" => DataType::Int { width: 32, signed: true },
        "Int64" => DataType::Int { width: 64, signed: true },
        "UInt" => DataType::Int { width: 64, signed: false },
        "UInt8" => DataType::Int { width: 8, signed: false },
        "UInt16" => DataType::Int { width: 16, signed: false },
        "UInt32" => DataType::Int { width: 32, signed: false },
        "UInt64" => DataType::Int { width: 64, signed: false },
        "Float16" => DataType::Floating(FloatKind::Half),
        "Float" => DataType::Floating(FloatKind::Float),
        "Double" => DataType::Floating(FloatKind::Double),
        "Float80" => DataType::Floating(FloatKind::Float80),
        _ => return None,
    })
}

const INTEGER_KEYWORDS: &[&str] =
    &["Int", "Int8", "Int16", "Int32", "Int64", "UInt", "UInt8", "UInt16", "UInt32", "UInt64"];
const ARITHMETIC_OPS: &[&str] = &["+", "-", "*", "/", "%", "&", "|", "^", "<<", ">>"];
const COMPARISON_OPS: &[&str] = &["==", "!=", "<", "<=", ">", ">="];

/// Mangled signature: name plus parameter types in stable textual form
/// (their syntax, not a resolved `DataType` — registration happens before
/// cross-references between types are resolvable) plus generic arity.
fn mangle(name: &str, param_types: impl Iterator<Item = String>, generics: usize) -> String {
    let mut sig = format!("{name}(");
    for (i, t) in param_types.enumerate() {
        if i > 0 {
            sig.push_str(", ");
        }
        sig.push_str(&t);
    }
    sig.push(')');
    if generics > 0 {
        sig.push_str(&format!("<{generics}>"));
    }
    sig
}

fn fn_param_types(decl: &FunctionDecl) -> impl Iterator<Item = String> + '_ {
    decl.params.iter().map(|p| p.type_name.to_string())
}

fn synth_param(name: &str, ty: &DataType) -> ParamDecl {
    ParamDecl {
        label: None,
        name: Identifier::new(name),
        type_name: TypeName::Name(ty.to_string(), SourceRange::default()),
        default_value: None,
        range: SourceRange::default(),
    }
}

fn synth_operator(op: &str, params: Vec<(&str, DataType)>, ret: DataType) -> FunctionDecl {
    FunctionDecl {
        kind: FunctionKind::Operator,
        name: Identifier::new(op),
        generics: vec![],
        params: params.into_iter().map(|(n, t)| synth_param(n, &t)).collect(),
        has_varargs: false,
        ret: Some(TypeName::Name(ret.to_string(), SourceRange::default())),
        body: None,
        modifiers: ModifierSet { foreign: true, ..ModifierSet::default() },
        range: SourceRange::default(),
    }
}

impl ASTContext {
    pub fn new() -> Self {
        Self::default()
    }

    fn preload_builtins(&mut self) {
        for name in [
            "Int", "Int8", "Int16", "Int32", "Int64", "UInt", "UInt8", "UInt16", "UInt32", "UInt64", "Float16",
            "Float", "Double", "Float80", "Bool", "Void",
        ] {
            let idx = self.types.len() as u32;
            self.types.push(TypeDecl {
                name: Identifier::new(name),
                generics: vec![],
                conforms_to: vec![],
                members: vec![],
                modifiers: ModifierSet::default(),
                range: SourceRange::default(),
            });
            self.type_by_name.insert(name.to_string(), idx);
        }

        for &int_name in INTEGER_KEYWORDS {
            let ty = primitive_data_type(int_name).expect("integer keyword");
            for &op in ARITHMETIC_OPS {
                self.push_builtin_operator(synth_operator(op, vec![("lhs", ty.clone()), ("rhs", ty.clone())], ty.clone()));
            }
            for &op in COMPARISON_OPS {
                self.push_builtin_operator(synth_operator(op, vec![("lhs", ty.clone()), ("rhs", ty.clone())], DataType::Bool));
            }
        }
        for float_kind in [FloatKind::Half, FloatKind::Float, FloatKind::Double, FloatKind::Float80] {
            let ty = DataType::Floating(float_kind);
            for &op in &["+", "-", "*", "/"] {
                self.push_builtin_operator(synth_operator(op, vec![("lhs", ty.clone()), ("rhs", ty.clone())], ty.clone()));
            }
            for &op in COMPARISON_OPS {
                self.push_builtin_operator(synth_operator(op, vec![("lhs", ty.clone()), ("rhs", ty.clone())], DataType::Bool));
            }
        }
        for &op in &["&&", "||"] {
            self.push_builtin_operator(synth_operator(op, vec![("lhs", DataType::Bool), ("rhs", DataType::Bool)], DataType::Bool));
        }
        self.push_builtin_operator(FunctionDecl {
            kind: FunctionKind::Operator,
            name: Identifier::new("!"),
            generics: vec![],
            params: vec![synth_param("operand", &DataType::Bool)],
            has_varargs: false,
            ret: Some(TypeName::Name("Bool".into(), SourceRange::default())),
            body: None,
            modifiers: ModifierSet { foreign: true, ..ModifierSet::default() },
            range: SourceRange::default(),
        });

        let type_of = FunctionDecl {
            kind: FunctionKind::Free,
            name: Identifier::new("typeOf"),
            generics: vec![],
            params: vec![synth_param("value", &DataType::Any)],
            has_varargs: false,
            ret: Some(TypeName::Pointer(Box::new(TypeName::Name("Void".into(), SourceRange::default())), SourceRange::default())),
            body: None,
            modifiers: ModifierSet { foreign: true, ..ModifierSet::default() },
            range: SourceRange::default(),
        };
        let sig = mangle("typeOf", fn_param_types(&type_of), 0);
        self.function_signatures.insert(sig);
        let idx = self.functions.len() as u32;
        self.function_overloads.entry("typeOf".to_string()).or_default().push(idx);
        self.functions.push(type_of);
    }

    fn push_builtin_operator(&mut self, decl: FunctionDecl) {
        let sig = mangle(decl.name.as_str(), fn_param_types(&decl), 0);
        let idx = self.operators.len() as u32;
        self.builtin_operator_by_sig.insert(sig, idx);
        self.operator_overloads.entry(decl.name.to_string()).or_default().push(idx);
        self.operators.push(decl);
    }

    // --- registration -----------------------------------------------------

    pub fn register_function(&mut self, decl: FunctionDecl) -> Result<DeclRef, SemaError> {
        let sig = mangle(decl.name.as_str(), fn_param_types(&decl), decl.generics.len());
        if !self.function_signatures.insert(sig) {
            return Err(SemaError::DuplicateFunction { name: decl.name.to_string(), range: decl.range });
        }
        if decl.name.as_str() == "main" && self.main_function.is_some() {
            return Err(SemaError::DuplicateMain { range: decl.range });
        }
        let idx = self.functions.len() as u32;
        if decl.name.as_str() == "main" {
            self.main_function = Some(idx);
        }
        self.function_overloads.entry(decl.name.to_string()).or_default().push(idx);
        self.functions.push(decl);
        Ok(DeclRef::Function(idx))
    }

    pub fn register_operator(&mut self, decl: FunctionDecl) -> Result<DeclRef, SemaError> {
        let sig = mangle(decl.name.as_str(), fn_param_types(&decl), decl.generics.len());
        if !self.operator_signatures.insert(sig.clone()) {
            return Err(SemaError::DuplicateOperator { op: decl.name.to_string(), range: decl.range });
        }
        // A user overload whose mangled signature matches a builtin's shadows
        // it in place rather than clashing: the "must not clash" invariant is
        // about colliding with another *user* overload, not about
        // specializing a builtin.
        if let Some(&idx) = self.builtin_operator_by_sig.get(&sig) {
            self.operators[idx as usize] = decl;
            return Ok(DeclRef::Operator(idx));
        }
        let idx = self.operators.len() as u32;
        self.operator_overloads.entry(decl.name.to_string()).or_default().push(idx);
        self.operators.push(decl);
        Ok(DeclRef::Operator(idx))
    }

    pub fn register_type(&mut self, decl: TypeDecl) -> Result<DeclRef, SemaError> {
        let name = decl.name.to_string();
        if self.type_by_name.contains_key(&name) {
            return Err(SemaError::DuplicateType { name, range: decl.range });
        }
        let idx = self.types.len() as u32;
        self.type_by_name.insert(name, idx);
        self.types.push(decl);
        Ok(DeclRef::Type(idx))
    }

    pub fn register_protocol(&mut self, decl: ProtocolDecl) -> Result<DeclRef, SemaError> {
        let name = decl.name.to_string();
        if self.protocol_by_name.contains_key(&name) {
            return Err(SemaError::DuplicateProtocol { name, range: decl.range });
        }
        let idx = self.protocols.len() as u32;
        self.protocol_by_name.insert(name, idx);
        self.protocols.push(decl);
        Ok(DeclRef::Protocol(idx))
    }

    pub fn register_global(&mut self, decl: VariableDecl) -> Result<DeclRef, SemaError> {
        let name = decl.name.to_string();
        if self.global_by_name.contains_key(&name) {
            return Err(SemaError::DuplicateGlobal { name, range: decl.range });
        }
        let idx = self.globals.len() as u32;
        self.global_by_name.insert(name, idx);
        self.globals.push(decl);
        Ok(DeclRef::Global(idx))
    }

    pub fn register_type_alias(&mut self, decl: TypeAliasDecl) -> Result<DeclRef, SemaError> {
        let name = decl.name.to_string();
        if self.alias_by_name.contains_key(&name) {
            return Err(SemaError::DuplicateTypeAlias { name, range: decl.range });
        }
        let mut visiting = HashSet::new();
        visiting.insert(name.clone());
        if self.alias_target_reaches(&decl.target, &name, &mut visiting) {
            return Err(SemaError::CircularAlias { name, range: decl.range });
        }
        let idx = self.type_aliases.len() as u32;
        self.alias_by_name.insert(name, idx);
        self.type_aliases.push(decl);
        Ok(DeclRef::TypeAlias(idx))
    }

    pub fn register_extension(&mut self, decl: ExtensionDecl) {
        self.extensions.push(decl);
    }

    pub fn emit(&mut self, diagnostic: Diagnostic) {
        self.diagnostics.emit(diagnostic);
    }

    pub fn emit_error(&mut self, e: &SemaError) {
        self.diagnostics.error(e.to_string(), Some(e.range()));
    }

    /// De-duplicated, emission-ordered diagnostics.
    pub fn diagnostics(&self) -> Vec<Diagnostic> {
        self.diagnostics.diagnostics()
    }

    /// DFS through alias chains and compound subcomponents (pointer/array/
    /// tuple/function) looking for a reference back to `root`. Aliases are
    /// substituted, not indirect, so a cycle through a pointer subcomponent
    /// is still an infinite expansion.
    fn alias_target_reaches(&self, tn: &TypeName, root: &str, visiting: &mut HashSet<String>) -> bool {
        match tn {
            TypeName::Name(n, _) => {
                if n == root {
                    return true;
                }
                match self.alias_by_name.get(n) {
                    Some(&idx) => {
                        if !visiting.insert(n.clone()) {
                            return false;
                        }
                        let hit = self.alias_target_reaches(&self.type_aliases[idx as usize].target, root, visiting);
                        visiting.remove(n);
                        hit
                    }
                    None => false,
                }
            }
            TypeName::Pointer(inner, _) => self.alias_target_reaches(inner, root, visiting),
            TypeName::Array(inner, _, _) => self.alias_target_reaches(inner, root, visiting),
            TypeName::Tuple(fields, _) => fields.iter().any(|f| self.alias_target_reaches(f, root, visiting)),
            TypeName::Function { args, ret, .. } => {
                args.iter().any(|a| self.alias_target_reaches(a, root, visiting))
                    || self.alias_target_reaches(ret, root, visiting)
            }
            TypeName::Generic(_, args, _) => args.iter().any(|a| self.alias_target_reaches(a, root, visiting)),
        }
    }

    // --- lookups ------------------------------------------------------

    pub fn function(&self, idx: u32) -> &FunctionDecl {
        &self.functions[idx as usize]
    }

    pub fn operator(&self, idx: u32) -> &FunctionDecl {
        &self.operators[idx as usize]
    }

    pub fn type_decl(&self, idx: u32) -> &TypeDecl {
        &self.types[idx as usize]
    }

    pub fn protocol_decl(&self, idx: u32) -> &ProtocolDecl {
        &self.protocols[idx as usize]
    }

    pub fn global(&self, idx: u32) -> &VariableDecl {
        &self.globals[idx as usize]
    }

    pub fn type_alias(&self, idx: u32) -> &TypeAliasDecl {
        &self.type_aliases[idx as usize]
    }

    pub fn functions_named(&self, name: &str) -> &[u32] {
        self.function_overloads.get(name).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn operators_named(&self, op: &str) -> &[u32] {
        self.operator_overloads.get(op).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn protocol_named(&self, name: &str) -> Option<u32> {
        self.protocol_by_name.get(name).copied()
    }

    pub fn type_named(&self, name: &str) -> Option<u32> {
        self.type_by_name.get(name).copied()
    }

    pub fn global_named(&self, name: &str) -> Option<u32> {
        self.global_by_name.get(name).copied()
    }

    pub fn main_function(&self) -> Option<u32> {
        self.main_function
    }

    pub fn extensions(&self) -> &[ExtensionDecl] {
        &self.extensions
    }

    pub fn types(&self) -> impl Iterator<Item = (u32, &TypeDecl)> {
        self.types.iter().enumerate().map(|(i, t)| (i as u32, t))
    }

    pub fn functions(&self) -> impl Iterator<Item = (u32, &FunctionDecl)> {
        self.functions.iter().enumerate().map(|(i, f)| (i as u32, f))
    }

    pub fn all_operators(&self) -> impl Iterator<Item = (u32, &FunctionDecl)> {
        self.operators.iter().enumerate().map(|(i, f)| (i as u32, f))
    }

    pub fn protocols(&self) -> impl Iterator<Item = (u32, &ProtocolDecl)> {
        self.protocols.iter().enumerate().map(|(i, p)| (i as u32, p))
    }

    pub fn globals(&self) -> impl Iterator<Item = (u32, &VariableDecl)> {
        self.globals.iter().enumerate().map(|(i, g)| (i as u32, g))
    }

    pub fn type_aliases(&self) -> impl Iterator<Item = (u32, &TypeAliasDecl)> {
        self.type_aliases.iter().enumerate().map(|(i, a)| (i as u32, a))
    }

    // --- derived queries -------------------------------------------------

    /// Resolves a syntactic `TypeName` to its semantic `DataType`,
    /// expanding type aliases fully (so the result never contains a
    /// `Custom` name that is itself an alias).
    pub fn canonical_type(&self, tn: &TypeName) -> DataType {
        match tn {
            TypeName::Name(name, _) => self.canonical_named_type(name),
            TypeName::Pointer(inner, _) => DataType::Pointer(Box::new(self.canonical_type(inner))),
            TypeName::Array(inner, len, _) => DataType::Array(Box::new(self.canonical_type(inner)), *len),
            TypeName::Tuple(fields, _) => DataType::Tuple(fields.iter().map(|f| self.canonical_type(f)).collect()),
            TypeName::Function { args, ret, varargs, .. } => DataType::Function {
                args: args.iter().map(|a| self.canonical_type(a)).collect(),
                ret: Box::new(self.canonical_type(ret)),
                varargs: *varargs,
            },
            // Generic instantiations stay nominal; monomorphization is out
            // of scope for type resolution itself.
            TypeName::Generic(name, _, _) => self.canonical_named_type(name),
        }
    }

    fn canonical_named_type(&self, name: &str) -> DataType {
        if let Some(prim) = primitive_data_type(name) {
            return prim;
        }
        if let Some(&idx) = self.alias_by_name.get(name) {
            return self.canonical_type(&self.type_aliases[idx as usize].target);
        }
        DataType::Custom(name.to_string())
    }

    /// Re-canonicalizes an already-built `DataType` (as opposed to
    /// `canonical_type`, which starts from the syntactic `TypeName`),
    /// expanding any `Custom` name that is itself a type alias. Idempotent
    /// on already-canonical input.
    pub fn canonical_type_of(&self, t: &DataType) -> DataType {
        match t {
            DataType::Custom(name) => self.canonical_named_type(name),
            DataType::Pointer(inner) => DataType::Pointer(Box::new(self.canonical_type_of(inner))),
            DataType::Array(inner, len) => DataType::Array(Box::new(self.canonical_type_of(inner)), *len),
            DataType::Tuple(fields) => DataType::Tuple(fields.iter().map(|f| self.canonical_type_of(f)).collect()),
            DataType::Function { args, ret, varargs } => DataType::Function {
                args: args.iter().map(|a| self.canonical_type_of(a)).collect(),
                ret: Box::new(self.canonical_type_of(ret)),
                varargs: *varargs,
            },
            other => other.clone(),
        }
    }

    pub fn is_indirect(&self, t: &DataType) -> bool {
        match t {
            DataType::Custom(name) => {
                self.type_by_name.get(name).map(|&idx| self.types[idx as usize].modifiers.indirect).unwrap_or(false)
            }
            _ => false,
        }
    }

    pub fn can_be_nil(&self, t: &DataType) -> bool {
        t.is_pointer() || self.is_indirect(t)
    }

    /// Coercion lattice: identity, integer<->integer, integer<->floating,
    /// integer<->pointer, pointer<->pointer, indirect<->pointer (both
    /// ways), any<->anything.
    pub fn can_coerce(&self, from: &DataType, to: &DataType) -> bool {
        if from == to {
            return true;
        }
        if matches!(from, DataType::Any) || matches!(to, DataType::Any) {
            return true;
        }
        match (from, to) {
            (DataType::Int { .. }, DataType::Int { .. }) => true,
            (DataType::Int { .. }, DataType::Floating(_)) | (DataType::Floating(_), DataType::Int { .. }) => true,
            (DataType::Int { .. }, DataType::Pointer(_)) | (DataType::Pointer(_), DataType::Int { .. }) => true,
            (DataType::Pointer(_), DataType::Pointer(_)) => true,
            _ => (self.is_indirect(from) && to.is_pointer()) || (self.is_indirect(to) && from.is_pointer()),
        }
    }

    /// `equal` if structurally equal (recursing through tuples), `any` if
    /// either side is `any`, else `none`.
    pub fn match_rank(&self, t1: &DataType, t2: &DataType) -> MatchRank {
        if matches!(t1, DataType::Any) || matches!(t2, DataType::Any) {
            return MatchRank::Any;
        }
        match (t1, t2) {
            (DataType::Tuple(a), DataType::Tuple(b)) if a.len() == b.len() => {
                if a.iter().zip(b.iter()).all(|(x, y)| self.match_rank(x, y) == MatchRank::Equal) {
                    MatchRank::Equal
                } else {
                    MatchRank::None
                }
            }
            _ => {
                if t1 == t2 {
                    MatchRank::Equal
                } else {
                    MatchRank::None
                }
            }
        }
    }

    /// Looks up a named stored/computed property or method on a nominal
    /// type, including members contributed by `extension` blocks targeting
    /// it. Returns `None` for anything not nominal (pointers, tuples, etc. have
    /// no members of their own) or with no member of that name.
    pub fn member_type(&self, owner: &DataType, name: &str) -> Option<DataType> {
        let DataType::Custom(owner_name) = owner else { return None };
        let idx = *self.type_by_name.get(owner_name)?;
        if let Some(ty) = self.member_type_in(&self.types[idx as usize].members, name) {
            return Some(ty);
        }
        for ext in &self.extensions {
            if ext.target.as_str() == owner_name.as_str() {
                if let Some(ty) = self.member_type_in(&ext.members, name) {
                    return Some(ty);
                }
            }
        }
        None
    }

    fn member_type_in(&self, members: &[TypeMember], name: &str) -> Option<DataType> {
        for m in members {
            match m {
                TypeMember::Property(p) if p.name.as_str() == name => {
                    return Some(p.type_name.as_ref().map(|t| self.canonical_type(t)).unwrap_or(DataType::Error));
                }
                TypeMember::Function(f) if f.name.as_str() == name => {
                    return Some(DataType::Function {
                        args: f.params.iter().map(|p| self.canonical_type(&p.type_name)).collect(),
                        ret: Box::new(f.ret.as_ref().map(|r| self.canonical_type(r)).unwrap_or(DataType::Void)),
                        varargs: false,
                    });
                }
                _ => {}
            }
        }
        None
    }

    /// Walks the lvalue chain of `expr`. Locals are looked up in `scope`;
    /// anything not bound locally is assumed to be a global reference.
    pub fn mutability(&self, expr: &ExprNode, scope: &Scope) -> Mutability {
        match &expr.kind {
            ExprKind::VariableRef { name, .. } => {
                if let Some(mutable) = scope.is_mutable(name.as_str()) {
                    return if mutable { Mutability::Mutable } else { Mutability::Immutable { culprit: Some(name.to_string()) } };
                }
                match self.global_by_name.get(name.as_str()) {
                    Some(&idx) if self.globals[idx as usize].is_mutable => Mutability::Mutable,
                    Some(_) => Mutability::Immutable { culprit: Some(name.to_string()) },
                    None => Mutability::Immutable { culprit: Some(name.to_string()) },
                }
            }
            ExprKind::PropertyRef { base, .. } => self.mutability(base, scope),
            ExprKind::Prefix { op, operand: _, .. } if op == "*" => Mutability::Mutable,
            _ => Mutability::Immutable { culprit: None },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::SourceRange;

    fn dummy_range() -> SourceRange {
        SourceRange::default()
    }

    #[test]
    fn preloads_integer_arithmetic_and_comparison_operators() {
        let ctx = ASTContext::new();
        assert!(!ctx.operators_named("+").is_empty());
        assert!(!ctx.operators_named("==").is_empty());
        assert!(!ctx.functions_named("typeOf").is_empty());
    }

    #[test]
    fn duplicate_function_signature_is_rejected() {
        let mut ctx = ASTContext::new();
        let decl = FunctionDecl {
            kind: FunctionKind::Free,
            name: Identifier::new("f"),
            generics: vec![],
            params: vec![],
            has_varargs: false,
            ret: None,
            body: None,
            modifiers: ModifierSet::default(),
            range: dummy_range(),
        };
        assert!(ctx.register_function(decl.clone()).is_ok());
        assert!(matches!(ctx.register_function(decl), Err(SemaError::DuplicateFunction { .. })));
    }

    #[test]
    fn second_main_is_rejected() {
        let mut ctx = ASTContext::new();
        let main = FunctionDecl {
            kind: FunctionKind::Free,
            name: Identifier::new("main"),
            generics: vec![],
            params: vec![],
            has_varargs: false,
            ret: None,
            body: Some(vec![]),
            modifiers: ModifierSet::default(),
            range: dummy_range(),
        };
        assert!(ctx.register_function(main.clone()).is_ok());
        assert!(matches!(ctx.register_function(main), Err(SemaError::DuplicateMain { .. })));
    }

    fn int8_plus_decl() -> FunctionDecl {
        FunctionDecl {
            kind: FunctionKind::Operator,
            name: Identifier::new("+"),
            generics: vec![],
            params: vec![
                ParamDecl {
                    label: None,
                    name: Identifier::new("a"),
                    type_name: TypeName::Name("Int8".into(), dummy_range()),
                    default_value: None,
                    range: dummy_range(),
                },
                ParamDecl {
                    label: None,
                    name: Identifier::new("b"),
                    type_name: TypeName::Name("Int8".into(), dummy_range()),
                    default_value: None,
                    range: dummy_range(),
                },
            ],
            has_varargs: false,
            ret: Some(TypeName::Name("Int8".into(), dummy_range())),
            body: Some(vec![]),
            modifiers: ModifierSet::default(),
            range: dummy_range(),
        }
    }

    #[test]
    fn user_operator_overload_shadows_a_builtin_of_the_same_signature() {
        let mut ctx = ASTContext::new();
        let before = ctx.operators_named("+").len();
        assert!(ctx.register_operator(int8_plus_decl()).is_ok());
        // Shadowing replaces the builtin's slot rather than adding a sibling
        // candidate, so the overload count for `+` does not grow.
        assert_eq!(ctx.operators_named("+").len(), before);
    }

    #[test]
    fn two_user_operator_overloads_with_the_same_signature_clash() {
        let mut ctx = ASTContext::new();
        assert!(ctx.register_operator(int8_plus_decl()).is_ok());
        assert!(matches!(ctx.register_operator(int8_plus_decl()), Err(SemaError::DuplicateOperator { .. })));
    }

    #[test]
    fn direct_alias_cycle_is_rejected() {
        let mut ctx = ASTContext::new();
        let alias = TypeAliasDecl {
            name: Identifier::new("A"),
            generics: vec![],
            target: TypeName::Pointer(Box::new(TypeName::Name("A".into(), dummy_range())), dummy_range()),
            range: dummy_range(),
        };
        assert!(matches!(ctx.register_type_alias(alias), Err(SemaError::CircularAlias { .. })));
    }

    #[test]
    fn mutual_alias_cycle_is_rejected() {
        let mut ctx = ASTContext::new();
        let a = TypeAliasDecl {
            name: Identifier::new("A"),
            generics: vec![],
            target: TypeName::Name("B".into(), dummy_range()),
            range: dummy_range(),
        };
        let b = TypeAliasDecl {
            name: Identifier::new("B"),
            generics: vec![],
            target: TypeName::Name("A".into(), dummy_range()),
            range: dummy_range(),
        };
        assert!(ctx.register_type_alias(b).is_ok());
        assert!(matches!(ctx.register_type_alias(a), Err(SemaError::CircularAlias { .. })));
    }

    #[test]
    fn canonical_type_expands_aliases() {
        let mut ctx = ASTContext::new();
        let alias = TypeAliasDecl {
            name: Identifier::new("MyInt"),
            generics: vec![],
            target: TypeName::Name("Int64".into(), dummy_range()),
            range: dummy_range(),
        };
        ctx.register_type_alias(alias).unwrap();
        let tn = TypeName::Name("MyInt".into(), dummy_range());
        assert_eq!(ctx.canonical_type(&tn), DataType::INT64);
    }

    #[test]
    fn can_coerce_integer_to_pointer() {
        let ctx = ASTContext::new();
        assert!(ctx.can_coerce(&DataType::INT64, &DataType::Pointer(Box::new(DataType::Int { width: 8, signed: true }))));
    }

    #[test]
    fn match_rank_any_beats_structural_mismatch() {
        let ctx = ASTContext::new();
        assert_eq!(ctx.match_rank(&DataType::Any, &DataType::Bool), MatchRank::Any);
        assert_eq!(ctx.match_rank(&DataType::Bool, &DataType::Void), MatchRank::None);
        assert_eq!(ctx.match_rank(&DataType::Bool, &DataType::Bool), MatchRank::Equal);
    }
}
