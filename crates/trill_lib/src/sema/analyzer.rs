//! Semantic analyzer: the driver that ties registration, layout-cycle
//! detection, protocol conformance checking and per-declaration constraint
//! generation/solving/write-back together into one pass over a compilation
//! unit.
//!
//! Walks a program's declarations in dependency order, threading a single
//! `ASTContext` through distinct registration/layout/conformance/body
//! phases, since overloading and protocol conformance each need their own
//! stage rather than a single combined pass.

use std::collections::HashSet;

use crate::decl_ref::DeclRef;
use crate::parser::ast::{
    DeclNode, ExtensionDecl, FunctionDecl, FunctionKind, ParamDecl, ProtocolDecl, ProtocolMember, PropertyAccessor,
    SourceUnit, StmtKind, StmtNode, TypeDecl, TypeMember, TypeName,
};
use crate::sema::constraint::{generate, generate as generate_expr, write_back_expr, write_back_stmt, ConstraintSystem};
use crate::sema::context::ASTContext;
use crate::sema::error::SemaError;
use crate::sema::scope::Scope;
use crate::sema::solver::{self, Solution};
use crate::sema::types::DataType;

pub struct Analyzer<'a> {
    ctx: &'a mut ASTContext,
}

impl<'a> Analyzer<'a> {
    pub fn new(ctx: &'a mut ASTContext) -> Self {
        Analyzer { ctx }
    }

    /// Runs the full pipeline over every parsed unit: register every
    /// top-level declaration, check stored-property layout cycles and
    /// explicit protocol conformance, then visit every declaration body.
    pub fn run(&mut self, units: Vec<SourceUnit>) {
        self.register_all(units);
        self.check_layout_cycles();
        self.check_conformances();
        self.visit_globals();
        self.visit_protocol_defaults();
        self.visit_types();
        self.visit_functions();
        self.visit_operators();
        self.visit_extensions();
    }

    // --- registration --------------------------------------------------

    fn register_all(&mut self, units: Vec<SourceUnit>) {
        let mut types = vec![];
        let mut protocols = vec![];
        let mut aliases = vec![];
        let mut globals = vec![];
        let mut functions = vec![];
        let mut extensions = vec![];

        for unit in units {
            for decl in unit.declarations {
                match decl {
                    DeclNode::Type(t) => types.push(t),
                    DeclNode::Protocol(p) => protocols.push(p),
                    DeclNode::TypeAlias(a) => aliases.push(a),
                    DeclNode::Variable(v) => globals.push(v),
                    DeclNode::Function(f) => functions.push(f),
                    DeclNode::Extension(e) => extensions.push(e),
                    DeclNode::Param(_) | DeclNode::Property(_) | DeclNode::Generic(_) => {}
                }
            }
        }

        for t in types {
            if let Err(e) = self.ctx.register_type(t) {
                self.ctx.emit_error(&e);
            }
        }
        for p in protocols {
            if let Err(e) = self.ctx.register_protocol(p) {
                self.ctx.emit_error(&e);
            }
        }
        for a in aliases {
            if let Err(e) = self.ctx.register_type_alias(a) {
                self.ctx.emit_error(&e);
            }
        }
        for g in globals {
            if let Err(e) = self.ctx.register_global(g) {
                self.ctx.emit_error(&e);
            }
        }
        for f in functions {
            if f.modifiers.foreign && f.body.is_some() {
                self.ctx.emit_error(&SemaError::ForeignFunctionWithBody { name: f.name.to_string(), range: f.range });
            }
            if !f.modifiers.foreign && f.body.is_none() {
                self.ctx.emit_error(&SemaError::NonForeignFunctionWithoutBody {
                    name: f.name.to_string(),
                    range: f.range,
                });
            }
            if f.has_varargs && !f.modifiers.foreign {
                self.ctx.emit_error(&SemaError::VarArgsInNonForeignDecl { name: f.name.to_string(), range: f.range });
            }
            let is_operator = f.kind == FunctionKind::Operator;
            let result = if is_operator { self.ctx.register_operator(f) } else { self.ctx.register_function(f) };
            if let Err(e) = result {
                self.ctx.emit_error(&e);
            }
        }
        for e in extensions {
            self.ctx.register_extension(e);
        }
    }

    // --- stored-property layout cycles ----------------------------------

    fn check_layout_cycles(&mut self) {
        let count = self.ctx.types().count() as u32;
        for idx in 0..count {
            let decl = self.ctx.type_decl(idx);
            if decl.modifiers.indirect {
                continue;
            }
            let name = decl.name.to_string();
            let range = decl.range;
            let mut visiting = HashSet::new();
            if self.type_reaches_itself(idx, idx, &mut visiting) {
                if visiting.len() <= 1 {
                    self.ctx.emit_error(&SemaError::ReferenceSelfInProp { type_name: name, range });
                } else {
                    self.ctx.emit_error(&SemaError::CircularLayout { name, range });
                }
            }
        }
    }

    fn type_reaches_itself(&self, current: u32, root: u32, visiting: &mut HashSet<u32>) -> bool {
        if !visiting.insert(current) {
            return false;
        }
        let decl = self.ctx.type_decl(current);
        for member in &decl.members {
            let TypeMember::Property(p) = member else { continue };
            let PropertyAccessor::Stored { .. } = &p.accessor else { continue };
            let Some(tn) = &p.type_name else { continue };
            if self.type_name_reaches(tn, root, visiting) {
                return true;
            }
        }
        false
    }

    fn type_name_reaches(&self, tn: &TypeName, root: u32, visiting: &mut HashSet<u32>) -> bool {
        match tn {
            TypeName::Name(name, _) => {
                let Some(idx) = self.ctx.type_named(name) else { return false };
                if idx == root {
                    return true;
                }
                if self.ctx.type_decl(idx).modifiers.indirect {
                    return false;
                }
                self.type_reaches_itself(idx, root, visiting)
            }
            TypeName::Pointer(_, _) => false,
            TypeName::Array(inner, _, _) => self.type_name_reaches(inner, root, visiting),
            TypeName::Tuple(fields, _) => fields.iter().any(|f| self.type_name_reaches(f, root, visiting)),
            TypeName::Generic(_, args, _) => args.iter().any(|a| self.type_name_reaches(a, root, visiting)),
            TypeName::Function { .. } => false,
        }
    }

    // --- explicit protocol conformance ----------------------------------

    fn check_conformances(&mut self) {
        let count = self.ctx.types().count() as u32;
        for idx in 0..count {
            let decl = self.ctx.type_decl(idx);
            let conforms_to = decl.conforms_to.clone();
            let range = decl.range;
            let name = decl.name.to_string();
            for protocol_name in &conforms_to {
                let Some(protocol_idx) = self.ctx.protocol_named(protocol_name.as_str()) else {
                    self.ctx.emit_error(&SemaError::UnknownProtocol { name: protocol_name.to_string(), range });
                    continue;
                };
                let type_decl = self.ctx.type_decl(idx);
                let protocol_decl = self.ctx.protocol_decl(protocol_idx);
                let missing = missing_conformance_methods(self.ctx, type_decl, protocol_decl);
                if !missing.is_empty() {
                    self.ctx.emit_error(&SemaError::TypeDoesNotConform {
                        type_name: name.clone(),
                        protocol: protocol_name.to_string(),
                        missing,
                        range,
                    });
                }
            }
        }
    }

    // --- body visiting ---------------------------------------------------

    fn visit_globals(&mut self) {
        let count = self.ctx.globals().count() as u32;
        for idx in 0..count {
            let scope = Scope::new();
            let mut system = ConstraintSystem::new();
            {
                let global = self.ctx.global(idx);
                if let Some(init) = &global.initializer {
                    let init_ty = generate(self.ctx, &scope, &mut system, init);
                    if let Some(tn) = &global.type_name {
                        let declared = self.ctx.canonical_type(tn);
                        system.equal(init_ty, declared, global.range, "global initializer");
                    }
                }
            }
            if system.constraints.is_empty() && system.errors.is_empty() {
                continue;
            }
            let (solution, errors) = finish_system(self.ctx, system);
            for e in &errors {
                self.ctx.emit_error(e);
            }
            if let Some(solution) = solution {
                let global = self.ctx.global(idx);
                if let Some(init) = &global.initializer {
                    write_back_expr(init, &solution);
                }
            }
        }
    }

    fn visit_protocol_defaults(&mut self) {
        let count = self.ctx.protocols().count() as u32;
        for idx in 0..count {
            let member_count = self.ctx.protocol_decl(idx).members.len();
            for member_idx in 0..member_count {
                let mut scope = Scope::new();
                let mut system = ConstraintSystem::new();
                let mut has_body = false;
                {
                    let protocol = self.ctx.protocol_decl(idx);
                    if let ProtocolMember::Function { params, ret, default_body: Some(body), .. } =
                        &protocol.members[member_idx]
                    {
                        has_body = true;
                        // The concrete conforming type is unknown inside a
                        // protocol's own default body, so `self` is typed
                        // `Any` here; the post-solve checker still catches
                        // member accesses that no conforming type could
                        // satisfy once the protocol is actually applied.
                        scope.declare("self", DataType::Any, true);
                        for p in params {
                            let t = self.ctx.canonical_type(&p.type_name);
                            scope.declare(p.name.as_str(), t, false);
                        }
                        let ret_ty = ret.as_ref().map(|r| self.ctx.canonical_type(r)).unwrap_or(DataType::Void);
                        for stmt in body {
                            generate_for_statement(self.ctx, &mut scope, &mut system, stmt, &ret_ty);
                        }
                    }
                }
                if !has_body {
                    continue;
                }
                let (solution, errors) = finish_system(self.ctx, system);
                for e in &errors {
                    self.ctx.emit_error(e);
                }
                if let Some(solution) = solution {
                    let protocol = self.ctx.protocol_decl(idx);
                    if let ProtocolMember::Function { default_body: Some(body), .. } = &protocol.members[member_idx] {
                        for stmt in body {
                            write_back_stmt(stmt, &solution);
                        }
                    }
                }
            }
        }
    }

    fn visit_types(&mut self) {
        let count = self.ctx.types().count() as u32;
        for idx in 0..count {
            self.visit_type_properties(idx);
            self.visit_type_methods(idx);
        }
    }

    fn visit_type_properties(&mut self, idx: u32) {
        let member_count = self.ctx.type_decl(idx).members.len();
        for member_idx in 0..member_count {
            let scope = Scope::new();
            let mut system = ConstraintSystem::new();
            {
                let type_decl = self.ctx.type_decl(idx);
                if let TypeMember::Property(p) = &type_decl.members[member_idx] {
                    if let PropertyAccessor::Stored { initializer: Some(init) } = &p.accessor {
                        let init_ty = generate(self.ctx, &scope, &mut system, init);
                        if let Some(tn) = &p.type_name {
                            let declared = self.ctx.canonical_type(tn);
                            system.equal(init_ty, declared, p.range, "stored property initializer");
                        }
                    }
                }
            }
            if system.constraints.is_empty() && system.errors.is_empty() {
                continue;
            }
            let (solution, errors) = finish_system(self.ctx, system);
            for e in &errors {
                self.ctx.emit_error(e);
            }
            if let Some(solution) = solution {
                let type_decl = self.ctx.type_decl(idx);
                if let TypeMember::Property(p) = &type_decl.members[member_idx] {
                    if let PropertyAccessor::Stored { initializer: Some(init) } = &p.accessor {
                        write_back_expr(init, &solution);
                    }
                }
            }
        }
    }

    fn visit_type_methods(&mut self, idx: u32) {
        let member_count = self.ctx.type_decl(idx).members.len();
        let self_ty = DataType::Custom(self.ctx.type_decl(idx).name.to_string());
        let is_indirect = self.ctx.type_decl(idx).modifiers.indirect;
        for member_idx in 0..member_count {
            let mut scope = Scope::new();
            let mut system = ConstraintSystem::new();
            let mut has_body = false;
            {
                let type_decl = self.ctx.type_decl(idx);
                if let TypeMember::Function(f) = &type_decl.members[member_idx] {
                    if f.kind == FunctionKind::Deinit && !is_indirect {
                        system.push_error(SemaError::DeinitOnStruct { range: f.range });
                    }
                    if let Some(body) = &f.body {
                        has_body = true;
                        scope.declare("self", self_ty.clone(), f.modifiers.mutating);
                        for p in &f.params {
                            let t = self.ctx.canonical_type(&p.type_name);
                            scope.declare(p.name.as_str(), t, false);
                        }
                        let ret_ty = f.ret.as_ref().map(|r| self.ctx.canonical_type(r)).unwrap_or(DataType::Void);
                        for stmt in body {
                            generate_for_statement(self.ctx, &mut scope, &mut system, stmt, &ret_ty);
                        }
                        if ret_ty != DataType::Void && !stmts_return(body) {
                            system.push_error(SemaError::NotAllPathsReturn { name: f.name.to_string(), range: f.range });
                        }
                    }
                }
            }
            if !has_body && system.errors.is_empty() {
                continue;
            }
            let (solution, errors) = finish_system(self.ctx, system);
            for e in &errors {
                self.ctx.emit_error(e);
            }
            if let Some(solution) = solution {
                let type_decl = self.ctx.type_decl(idx);
                if let TypeMember::Function(f) = &type_decl.members[member_idx] {
                    if let Some(body) = &f.body {
                        for stmt in body {
                            write_back_stmt(stmt, &solution);
                        }
                    }
                }
            }
        }
    }

    fn visit_functions(&mut self) {
        let count = self.ctx.functions().count() as u32;
        for idx in 0..count {
            self.visit_function_like(idx, false);
        }
    }

    fn visit_operators(&mut self) {
        let count = self.ctx.all_operators().count() as u32;
        for idx in 0..count {
            self.visit_function_like(idx, true);
        }
    }

    fn visit_function_like(&mut self, idx: u32, is_operator: bool) {
        let mut scope = Scope::new();
        let mut system = ConstraintSystem::new();
        let has_body;
        {
            let decl = if is_operator { self.ctx.operator(idx) } else { self.ctx.function(idx) };
            has_body = decl.body.is_some();
            let ret_ty = decl.ret.as_ref().map(|r| self.ctx.canonical_type(r)).unwrap_or(DataType::Void);
            for p in &decl.params {
                let t = self.ctx.canonical_type(&p.type_name);
                scope.declare(p.name.as_str(), t, false);
            }
            if let Some(body) = &decl.body {
                for stmt in body {
                    generate_for_statement(self.ctx, &mut scope, &mut system, stmt, &ret_ty);
                }
                if ret_ty != DataType::Void && !stmts_return(body) {
                    system.push_error(SemaError::NotAllPathsReturn { name: decl.name.to_string(), range: decl.range });
                }
            }
        }
        if !has_body {
            for e in &system.errors {
                self.ctx.emit_error(e);
            }
            return;
        }
        let (solution, errors) = finish_system(self.ctx, system);
        for e in &errors {
            self.ctx.emit_error(e);
        }
        if let Some(solution) = solution {
            let decl = if is_operator { self.ctx.operator(idx) } else { self.ctx.function(idx) };
            if let Some(body) = &decl.body {
                for stmt in body {
                    write_back_stmt(stmt, &solution);
                }
            }
        }
    }

    fn visit_extensions(&mut self) {
        let count = self.ctx.extensions().len();
        for ext_idx in 0..count {
            let member_count = self.ctx.extensions()[ext_idx].members.len();
            let self_ty = DataType::Custom(self.ctx.extensions()[ext_idx].target.to_string());
            for member_idx in 0..member_count {
                let mut scope = Scope::new();
                let mut system = ConstraintSystem::new();
                let mut has_body = false;
                {
                    let ext = &self.ctx.extensions()[ext_idx];
                    if let TypeMember::Function(f) = &ext.members[member_idx] {
                        if let Some(body) = &f.body {
                            has_body = true;
                            scope.declare("self", self_ty.clone(), f.modifiers.mutating);
                            for p in &f.params {
                                let t = self.ctx.canonical_type(&p.type_name);
                                scope.declare(p.name.as_str(), t, false);
                            }
                            let ret_ty = f.ret.as_ref().map(|r| self.ctx.canonical_type(r)).unwrap_or(DataType::Void);
                            for stmt in body {
                                generate_for_statement(self.ctx, &mut scope, &mut system, stmt, &ret_ty);
                            }
                            if ret_ty != DataType::Void && !stmts_return(body) {
                                system.push_error(SemaError::NotAllPathsReturn {
                                    name: f.name.to_string(),
                                    range: f.range,
                                });
                            }
                        }
                    }
                }
                if !has_body {
                    continue;
                }
                let (solution, errors) = finish_system(self.ctx, system);
                for e in &errors {
                    self.ctx.emit_error(e);
                }
                if let Some(solution) = solution {
                    let ext = &self.ctx.extensions()[ext_idx];
                    if let TypeMember::Function(f) = &ext.members[member_idx] {
                        if let Some(body) = &f.body {
                            for stmt in body {
                                write_back_stmt(stmt, &solution);
                            }
                        }
                    }
                }
            }
        }
    }
}

fn finish_system(ctx: &ASTContext, system: ConstraintSystem) -> (Option<Solution>, Vec<SemaError>) {
    if !system.errors.is_empty() {
        return (None, system.errors);
    }
    match solver::solve(ctx, &system.sorted_for_solving()) {
        Ok(solution) => (Some(solution), vec![]),
        Err(e) => (None, vec![e]),
    }
}

/// Statement-level constraint generation, called both by the analyzer for
/// every declaration body and, recursively, by the constraint generator
/// for closure bodies.
pub fn generate_for_statement(
    ctx: &ASTContext,
    scope: &mut Scope,
    system: &mut ConstraintSystem,
    stmt: &StmtNode,
    ret_ty: &DataType,
) {
    walk_statement(ctx, scope, system, stmt, ret_ty, false, false);
}

fn walk_statement(
    ctx: &ASTContext,
    scope: &mut Scope,
    system: &mut ConstraintSystem,
    stmt: &StmtNode,
    ret_ty: &DataType,
    in_loop: bool,
    in_switch: bool,
) {
    match &stmt.kind {
        StmtKind::Block { statements, has_return } => {
            has_return.set(stmts_return(statements));
            scope.enter_scope();
            for s in statements {
                walk_statement(ctx, scope, system, s, ret_ty, in_loop, in_switch);
            }
            scope.exit_scope();
        }
        StmtKind::IfChain { branches, else_branch } => {
            for (cond, body) in branches {
                generate_expr(ctx, scope, system, cond);
                scope.enter_scope();
                for s in body {
                    walk_statement(ctx, scope, system, s, ret_ty, in_loop, in_switch);
                }
                scope.exit_scope();
            }
            if let Some(body) = else_branch {
                scope.enter_scope();
                for s in body {
                    walk_statement(ctx, scope, system, s, ret_ty, in_loop, in_switch);
                }
                scope.exit_scope();
            }
        }
        StmtKind::While { cond, body } => {
            generate_expr(ctx, scope, system, cond);
            scope.enter_scope();
            for s in body {
                walk_statement(ctx, scope, system, s, ret_ty, true, in_switch);
            }
            scope.exit_scope();
        }
        StmtKind::For { init, cond, step, body } => {
            scope.enter_scope();
            if let Some(init) = init {
                walk_statement(ctx, scope, system, init, ret_ty, in_loop, in_switch);
            }
            if let Some(cond) = cond {
                generate_expr(ctx, scope, system, cond);
            }
            for s in body {
                walk_statement(ctx, scope, system, s, ret_ty, true, in_switch);
            }
            if let Some(step) = step {
                walk_statement(ctx, scope, system, step, ret_ty, in_loop, in_switch);
            }
            scope.exit_scope();
        }
        StmtKind::Switch { scrutinee, cases } => {
            generate_expr(ctx, scope, system, scrutinee);
            for case in cases {
                if let Some(pattern) = &case.pattern {
                    if !is_constant_expr(pattern) {
                        system.push_error(SemaError::CaseMustBeConstant { range: pattern.range });
                    }
                    generate_expr(ctx, scope, system, pattern);
                }
                scope.enter_scope();
                for s in &case.body {
                    walk_statement(ctx, scope, system, s, ret_ty, in_loop, true);
                }
                scope.exit_scope();
            }
        }
        StmtKind::Break => {
            if !in_loop && !in_switch {
                system.push_error(SemaError::BreakNotAllowed { range: stmt.range });
            }
        }
        StmtKind::Continue => {
            if !in_loop {
                system.push_error(SemaError::ContinueNotAllowed { range: stmt.range });
            }
        }
        StmtKind::Return(value) => {
            let value_ty = match value {
                Some(v) => generate_expr(ctx, scope, system, v),
                None => DataType::Void,
            };
            system.equal(value_ty, ret_ty.clone(), stmt.range, "return value");
        }
        StmtKind::ExprStmt(expr) => {
            generate_expr(ctx, scope, system, expr);
        }
        StmtKind::DeclStmt(decl) => {
            if let DeclNode::Variable(v) = decl.as_ref() {
                let declared = v.type_name.as_ref().map(|t| ctx.canonical_type(t));
                let init_ty = v.initializer.as_ref().map(|e| generate_expr(ctx, scope, system, e));
                let final_ty = match (&declared, &init_ty) {
                    (Some(d), Some(i)) => {
                        system.equal(i.clone(), d.clone(), v.range, "variable initializer");
                        d.clone()
                    }
                    (Some(d), None) => d.clone(),
                    (None, Some(i)) => i.clone(),
                    (None, None) => crate::sema::constraint::fresh_type_variable("var"),
                };
                scope.declare(v.name.as_str(), final_ty, v.is_mutable);
            }
        }
        StmtKind::PoundDiagnostic { .. } => {}
    }
}

/// Shape test for switch-case patterns: literals and `+`/`-`-negated
/// literals, independent of solved types.
fn is_constant_expr(expr: &crate::parser::ast::ExprNode) -> bool {
    use crate::parser::ast::ExprKind;
    match &expr.kind {
        ExprKind::IntegerLiteral(_)
        | ExprKind::FloatingLiteral(_)
        | ExprKind::StringLiteral(_)
        | ExprKind::CharLiteral(_)
        | ExprKind::BoolLiteral(_)
        | ExprKind::NilLiteral => true,
        ExprKind::Prefix { op, operand, .. } if op == "-" || op == "+" => is_constant_expr(operand),
        ExprKind::Paren(inner) => is_constant_expr(inner),
        _ => false,
    }
}

/// Does this statement list guarantee a `return` on every path through it?
/// Also drives `Block::has_return`.
fn stmts_return(stmts: &[StmtNode]) -> bool {
    stmts.iter().any(stmt_returns)
}

fn stmt_returns(stmt: &StmtNode) -> bool {
    match &stmt.kind {
        StmtKind::Return(_) => true,
        StmtKind::Block { statements, has_return } => {
            let r = stmts_return(statements);
            has_return.set(r);
            r
        }
        StmtKind::IfChain { branches, else_branch } => match else_branch {
            Some(else_body) => branches.iter().all(|(_, body)| stmts_return(body)) && stmts_return(else_body),
            None => false,
        },
        StmtKind::Switch { cases, .. } => {
            let has_default = cases.iter().any(|c| c.pattern.is_none());
            has_default && cases.iter().all(|c| stmts_return(&c.body))
        }
        _ => false,
    }
}

/// Protocol conformance verification: every non-default protocol member
/// must have a matching method/property on the type itself or on an
/// extension targeting it.
pub fn missing_conformance_methods(ctx: &ASTContext, type_decl: &TypeDecl, protocol_decl: &ProtocolDecl) -> Vec<String> {
    let mut missing = Vec::new();
    for member in &protocol_decl.members {
        match member {
            ProtocolMember::Function { name, params, ret, has_default, .. } => {
                if *has_default {
                    continue;
                }
                if !type_has_method(ctx, type_decl, name.as_str(), params, ret.as_ref()) {
                    missing.push(method_signature(name.as_str(), params, ret.as_ref()));
                }
            }
            ProtocolMember::Property { name, type_name, is_mutable } => {
                if !type_has_property(ctx, type_decl, name.as_str(), type_name, *is_mutable) {
                    missing.push(format!("{name}: {type_name}"));
                }
            }
        }
    }
    missing
}

fn type_members_and_extensions<'c>(
    ctx: &'c ASTContext,
    type_decl: &'c TypeDecl,
) -> impl Iterator<Item = &'c TypeMember> {
    let own = type_decl.members.iter();
    let from_ext = ctx
        .extensions()
        .iter()
        .filter(move |e| e.target.as_str() == type_decl.name.as_str())
        .flat_map(|e: &'c ExtensionDecl| e.members.iter());
    own.chain(from_ext)
}

fn type_has_method(
    ctx: &ASTContext,
    type_decl: &TypeDecl,
    name: &str,
    params: &[ParamDecl],
    ret: Option<&TypeName>,
) -> bool {
    type_members_and_extensions(ctx, type_decl).any(|m| match m {
        TypeMember::Function(f) => signatures_match(ctx, f, name, params, ret),
        _ => false,
    })
}

fn signatures_match(ctx: &ASTContext, f: &FunctionDecl, name: &str, params: &[ParamDecl], ret: Option<&TypeName>) -> bool {
    if f.name.as_str() != name || f.params.len() != params.len() {
        return false;
    }
    for (a, b) in f.params.iter().zip(params.iter()) {
        if ctx.canonical_type(&a.type_name) != ctx.canonical_type(&b.type_name) {
            return false;
        }
    }
    let f_ret = f.ret.as_ref().map(|r| ctx.canonical_type(r)).unwrap_or(DataType::Void);
    let p_ret = ret.map(|r| ctx.canonical_type(r)).unwrap_or(DataType::Void);
    f_ret == p_ret
}

fn type_has_property(ctx: &ASTContext, type_decl: &TypeDecl, name: &str, type_name: &TypeName, needs_mutable: bool) -> bool {
    type_members_and_extensions(ctx, type_decl).any(|m| match m {
        TypeMember::Property(p) => {
            p.name.as_str() == name
                && p.type_name.as_ref().map(|t| ctx.canonical_type(t)) == Some(ctx.canonical_type(type_name))
                && (!needs_mutable || p.is_mutable)
        }
        _ => false,
    })
}

fn method_signature(name: &str, params: &[ParamDecl], ret: Option<&TypeName>) -> String {
    let args = params.iter().map(|p| p.type_name.to_string()).collect::<Vec<_>>().join(", ");
    match ret {
        Some(r) => format!("{name}({args}) -> {r}"),
        None => format!("{name}({args})"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::ast::{ModifierSet, PropertyDecl, VariableDecl};
    use crate::source::Identifier;

    fn dummy_range() -> crate::source::SourceRange {
        crate::source::SourceRange::default()
    }

    fn prop(name: &str, type_name: TypeName) -> TypeMember {
        TypeMember::Property(PropertyDecl {
            name: Identifier::new(name),
            is_mutable: false,
            type_name: Some(type_name),
            accessor: PropertyAccessor::Stored { initializer: None },
            modifiers: ModifierSet::default(),
            range: dummy_range(),
        })
    }

    fn type_decl(name: &str, members: Vec<TypeMember>, indirect: bool) -> TypeDecl {
        TypeDecl {
            name: Identifier::new(name),
            generics: vec![],
            conforms_to: vec![],
            members,
            modifiers: ModifierSet { indirect, ..ModifierSet::default() },
            range: dummy_range(),
        }
    }

    #[test]
    fn direct_self_reference_without_indirection_is_rejected() {
        let mut ctx = ASTContext::new();
        let node = type_decl("Node", vec![prop("next", TypeName::Name("Node".into(), dummy_range()))], false);
        ctx.register_type(node).unwrap();
        let mut analyzer = Analyzer::new(&mut ctx);
        analyzer.check_layout_cycles();
        assert!(ctx.diagnostics().iter().any(|d| d.message.contains("Node")));
    }

    #[test]
    fn pointer_indirection_breaks_the_cycle() {
        let mut ctx = ASTContext::new();
        let node = type_decl(
            "Node",
            vec![prop("next", TypeName::Pointer(Box::new(TypeName::Name("Node".into(), dummy_range())), dummy_range()))],
            false,
        );
        ctx.register_type(node).unwrap();
        let mut analyzer = Analyzer::new(&mut ctx);
        analyzer.check_layout_cycles();
        assert!(ctx.diagnostics().is_empty());
    }

    #[test]
    fn indirect_type_may_contain_itself_by_value() {
        let mut ctx = ASTContext::new();
        let node = type_decl("Node", vec![prop("next", TypeName::Name("Node".into(), dummy_range()))], true);
        ctx.register_type(node).unwrap();
        let mut analyzer = Analyzer::new(&mut ctx);
        analyzer.check_layout_cycles();
        assert!(ctx.diagnostics().is_empty());
    }

    #[test]
    fn unresolved_global_initializer_produces_no_diagnostics_when_absent() {
        let mut ctx = ASTContext::new();
        ctx.register_global(VariableDecl {
            name: Identifier::new("g"),
            is_mutable: false,
            type_name: Some(TypeName::Name("Int64".into(), dummy_range())),
            initializer: None,
            modifiers: ModifierSet::default(),
            range: dummy_range(),
        })
        .unwrap();
        let mut analyzer = Analyzer::new(&mut ctx);
        analyzer.visit_globals();
        assert!(ctx.diagnostics().is_empty());
    }
}
