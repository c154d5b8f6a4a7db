//! Constraint generator: walks a typed-AST expression, assigning each node
//! a goal type (often a fresh type variable) and recording how that goal
//! relates to its neighbors. The constraint solver (`solver.rs`) resolves
//! the resulting system; the semantic analyzer (`analyzer.rs`) drives
//! generation and solving together per declaration.
//!
//! A small tagged constraint enum and a visitor that builds a flat list,
//! deferred into a substitution map rather than unified directly, so
//! overload resolution can try multiple candidates without committing a
//! partial solution.

use std::sync::atomic::{AtomicU64, Ordering};

use crate::sema::types::DataType;
use crate::source::SourceRange;

static NEXT_TYPEVAR: AtomicU64 = AtomicU64::new(0);

/// Synthesizes a type variable distinct from every other one generated in
/// this process; collisions across unrelated declarations never matter
/// once substitution is applied locally to that declaration's own
/// constraint system.
pub fn fresh_type_variable(prefix: &str) -> DataType {
    let n = NEXT_TYPEVAR.fetch_add(1, Ordering::Relaxed);
    DataType::TypeVariable(format!("{prefix}${n}"))
}

#[derive(Debug, Clone)]
pub enum ConstraintKind {
    Equal(DataType, DataType),
    Conversion(DataType, DataType),
    Conforms(DataType, DataType),
}

/// One emitted constraint plus provenance used by diagnostics when the
/// solver fails it.
#[derive(Debug, Clone)]
pub struct Constraint {
    pub kind: ConstraintKind,
    pub origin: SourceRange,
    pub label: &'static str,
    /// True if a type variable mentioned in this constraint was written by
    /// the programmer (an explicit annotation) rather than synthesized by
    /// the generator — the solver and diagnostics prefer to blame
    /// synthesized variables over user-written ones.
    pub user_written: bool,
}

#[derive(Debug, Clone, Default)]
pub struct ConstraintSystem {
    pub constraints: Vec<Constraint>,
    /// Failures discovered eagerly during generation itself (overload
    /// resolution has no other way to report `NoCandidates`/`Ambiguity`,
    /// since those aren't expressible as a constraint the solver can fail
    /// later) — merged into the same diagnostics stream the solver's
    /// failure feeds.
    pub errors: Vec<crate::sema::error::SemaError>,
}

impl ConstraintSystem {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_error(&mut self, e: crate::sema::error::SemaError) {
        self.errors.push(e);
    }

    pub fn equal(&mut self, t1: DataType, t2: DataType, origin: SourceRange, label: &'static str) {
        self.constraints.push(Constraint { kind: ConstraintKind::Equal(t1, t2), origin, label, user_written: false });
    }

    pub fn conversion(&mut self, t1: DataType, t2: DataType, origin: SourceRange, label: &'static str) {
        self.constraints.push(Constraint {
            kind: ConstraintKind::Conversion(t1, t2),
            origin,
            label,
            user_written: false,
        });
    }

    pub fn conforms(&mut self, t: DataType, protocol: DataType, origin: SourceRange, label: &'static str) {
        self.constraints.push(Constraint {
            kind: ConstraintKind::Conforms(t, protocol),
            origin,
            label,
            user_written: false,
        });
    }

    /// Solver ordering: `Equal` constraints first, then `Conversion`/
    /// `Conforms`, stable within each group so diagnostics stay reproducible.
    pub fn sorted_for_solving(mut self) -> Vec<Constraint> {
        self.constraints.sort_by_key(|c| match c.kind {
            ConstraintKind::Equal(..) => 0,
            ConstraintKind::Conversion(..) => 1,
            ConstraintKind::Conforms(..) => 2,
        });
        self.constraints
    }

    pub fn extend(&mut self, other: ConstraintSystem) {
        self.constraints.extend(other.constraints);
    }
}

use crate::decl_ref::DeclRef;
use crate::parser::ast::{ExprKind, ExprNode, PoundLiteralKind};
use crate::sema::context::ASTContext;
use crate::sema::scope::Scope;

/// Visits `expr`, emitting constraints into `system` and returning its goal
/// type. Covers every `ExprKind` variant the parser produces.
pub fn generate(ctx: &ASTContext, scope: &Scope, system: &mut ConstraintSystem, expr: &ExprNode) -> DataType {
    let goal = match &expr.kind {
        ExprKind::IntegerLiteral(_) => DataType::IntegerLiteral,
        ExprKind::FloatingLiteral(_) => DataType::FloatingLiteral,
        ExprKind::StringLiteral(_) => DataType::StringLiteral,
        ExprKind::CharLiteral(_) => DataType::Int { width: 8, signed: false },
        ExprKind::BoolLiteral(_) => DataType::Bool,
        ExprKind::NilLiteral => DataType::NilLiteral,
        ExprKind::VoidLiteral => DataType::Void,
        ExprKind::PoundLiteral(PoundLiteralKind::File) => {
            DataType::Pointer(Box::new(DataType::Int { width: 8, signed: true }))
        }
        ExprKind::PoundLiteral(PoundLiteralKind::Line) => DataType::Int { width: 64, signed: true },
        ExprKind::PoundLiteral(PoundLiteralKind::Function) => {
            DataType::Pointer(Box::new(DataType::Int { width: 8, signed: true }))
        }

        ExprKind::VariableRef { name, resolved } => {
            if let Some(ty) = scope.type_of(name.as_str()) {
                if let Some(decl) = scope.resolve(name.as_str()) {
                    *resolved.borrow_mut() = Some(decl);
                }
                ty
            } else if let Some(idx) = ctx.global_named(name.as_str()) {
                *resolved.borrow_mut() = Some(DeclRef::Global(idx));
                let global = ctx.global(idx);
                global.type_name.as_ref().map(|tn| ctx.canonical_type(tn)).unwrap_or_else(|| fresh_type_variable("g"))
            } else {
                fresh_type_variable("unbound")
            }
        }

        ExprKind::PropertyRef { base, name, .. } => {
            let base_ty = generate(ctx, scope, system, base);
            let resolved = ctx.canonical_type_of(&base_ty);
            match &resolved {
                DataType::Pointer(_) => {
                    system.push_error(crate::sema::error::SemaError::PointerPropertyAccess { range: expr.range });
                    DataType::Error
                }
                DataType::Tuple(_) => {
                    system.push_error(crate::sema::error::SemaError::TuplePropertyAccess { range: expr.range });
                    DataType::Error
                }
                DataType::Function { .. } => {
                    system.push_error(crate::sema::error::SemaError::FieldOfFunctionType { range: expr.range });
                    DataType::Error
                }
                DataType::Custom(_) => match ctx.member_type(&resolved, name.as_str()) {
                    Some(ty) => ty,
                    None => {
                        system.push_error(crate::sema::error::SemaError::IncompleteTypeAccess {
                            owner: resolved.clone(),
                            member: name.to_string(),
                            range: expr.range,
                        });
                        DataType::Error
                    }
                },
                // Still a type variable (the base's type isn't pinned down yet) —
                // defer: the post-solve type checker re-checks member access once
                // every expression's final type is known.
                _ => fresh_type_variable("member"),
            }
        }

        ExprKind::Tuple(items) => {
            DataType::Tuple(items.iter().map(|i| generate(ctx, scope, system, i)).collect())
        }
        ExprKind::Array(items) => {
            let elem = fresh_type_variable("elem");
            for i in items {
                let t = generate(ctx, scope, system, i);
                system.equal(t, elem.clone(), i.range, "array element");
            }
            DataType::Array(Box::new(elem), Some(items.len() as u64))
        }
        ExprKind::TupleFieldLookup { base, index } => {
            let base_ty = generate(ctx, scope, system, base);
            if let DataType::Tuple(fields) = &base_ty {
                fields.get(*index as usize).cloned().unwrap_or(DataType::Error)
            } else {
                fresh_type_variable("tuple_field")
            }
        }
        ExprKind::Paren(inner) => generate(ctx, scope, system, inner),
        ExprKind::Subscript { base, index } => {
            let base_ty = generate(ctx, scope, system, base);
            let index_ty = generate(ctx, scope, system, index);
            system.equal(index_ty, DataType::INT64, index.range, "subscript index");
            match base_ty {
                DataType::Array(elem, _) => *elem,
                DataType::Pointer(elem) => *elem,
                _ => fresh_type_variable("subscript"),
            }
        }
        ExprKind::Call { callee, args, resolved } => {
            let direct_fn_name = match &callee.kind {
                ExprKind::VariableRef { name, .. } if scope.type_of(name.as_str()).is_none() => Some(name.clone()),
                _ => None,
            };
            let candidates: Vec<(DeclRef, &crate::parser::ast::FunctionDecl)> = direct_fn_name
                .as_ref()
                .map(|name| {
                    ctx.functions_named(name.as_str())
                        .iter()
                        .map(|&idx| (DeclRef::Function(idx), ctx.function(idx)))
                        .collect()
                })
                .unwrap_or_default();

            if !candidates.is_empty() {
                match crate::sema::overload::resolve(ctx, scope, &candidates, args) {
                    crate::sema::overload::Resolution::Resolved { decl, ret } => {
                        *resolved.borrow_mut() = Some(decl);
                        if let ExprKind::VariableRef { resolved: vr, .. } = &callee.kind {
                            *vr.borrow_mut() = Some(decl);
                        }
                        let fn_decl = match decl {
                            DeclRef::Function(i) => ctx.function(i),
                            _ => unreachable!("call candidates are always functions"),
                        };
                        *callee.ty.borrow_mut() = DataType::Function {
                            args: fn_decl.params.iter().map(|p| ctx.canonical_type(&p.type_name)).collect(),
                            ret: Box::new(ret.clone()),
                            varargs: fn_decl.has_varargs,
                        };
                        ret
                    }
                    crate::sema::overload::Resolution::NoCandidates => {
                        system.push_error(crate::sema::error::SemaError::NoCandidates {
                            name: direct_fn_name.clone().unwrap().to_string(),
                            range: expr.range,
                        });
                        DataType::Error
                    }
                    crate::sema::overload::Resolution::NoMatchingCandidates(reasons) => {
                        system.push_error(crate::sema::error::SemaError::NoMatchingCandidates {
                            name: direct_fn_name.unwrap().to_string(),
                            reasons,
                            range: expr.range,
                        });
                        DataType::Error
                    }
                    crate::sema::overload::Resolution::Ambiguity(decls) => {
                        system.push_error(crate::sema::error::SemaError::Ambiguity {
                            candidates: decls.iter().map(|d| format!("{d:?}")).collect(),
                            range: expr.range,
                        });
                        DataType::Error
                    }
                    crate::sema::overload::Resolution::ArityMismatch { expected, found } => {
                        system.push_error(crate::sema::error::SemaError::ArityMismatch {
                            expected,
                            found,
                            range: expr.range,
                        });
                        DataType::Error
                    }
                    crate::sema::overload::Resolution::UnknownLabel(label) => {
                        system.push_error(crate::sema::error::SemaError::UnknownLabel { label, range: expr.range });
                        DataType::Error
                    }
                }
            } else if let Some(name) = &direct_fn_name {
                if ctx.global_named(name.as_str()).is_none() && scope.type_of(name.as_str()).is_none() {
                    system.push_error(crate::sema::error::SemaError::NoCandidates {
                        name: name.to_string(),
                        range: expr.range,
                    });
                    DataType::Error
                } else {
                    generate_generic_call(ctx, scope, system, callee, args, expr.range)
                }
            } else {
                generate_generic_call(ctx, scope, system, callee, args, expr.range)
            }
        }
        ExprKind::Closure { params, ret, body, .. } => {
            let mut inner = scope.clone();
            inner.enter_scope();
            let mut arg_types = vec![];
            for p in params {
                let t = ctx.canonical_type(&p.type_name);
                inner.declare(p.name.as_str(), t.clone(), false);
                arg_types.push(t);
            }
            let ret_ty = ret.as_ref().map(|r| ctx.canonical_type(r)).unwrap_or_else(|| fresh_type_variable("closure_ret"));
            for stmt in body {
                crate::sema::analyzer::generate_for_statement(ctx, &mut inner, system, stmt, &ret_ty);
            }
            DataType::Function { args: arg_types, ret: Box::new(ret_ty), varargs: false }
        }

        ExprKind::Prefix { op, operand, resolved } => {
            if op == "*" {
                let operand_ty = generate(ctx, scope, system, operand);
                match &operand_ty {
                    DataType::Pointer(inner) => (**inner).clone(),
                    DataType::TypeVariable(_) | DataType::Error => fresh_type_variable("deref"),
                    _ => {
                        system.push_error(crate::sema::error::SemaError::DereferenceNonPointer { range: expr.range });
                        DataType::Error
                    }
                }
            } else if op == "&" {
                let operand_ty = generate(ctx, scope, system, operand);
                if !is_lvalue(operand) {
                    system.push_error(crate::sema::error::SemaError::AddressOfNonLvalue { range: expr.range });
                }
                DataType::Pointer(Box::new(operand_ty))
            } else {
                let candidates: Vec<(DeclRef, &crate::parser::ast::FunctionDecl)> =
                    ctx.operators_named(op).iter().map(|&idx| (DeclRef::Operator(idx), ctx.operator(idx))).collect();
                match crate::sema::overload::resolve_unlabeled(ctx, scope, &candidates, &[operand]) {
                    crate::sema::overload::Resolution::Resolved { decl, ret } => {
                        *resolved.borrow_mut() = Some(decl);
                        ret
                    }
                    crate::sema::overload::Resolution::NoCandidates => {
                        system.push_error(crate::sema::error::SemaError::NoCandidates {
                            name: op.clone(),
                            range: expr.range,
                        });
                        DataType::Error
                    }
                    crate::sema::overload::Resolution::NoMatchingCandidates(reasons) => {
                        system.push_error(crate::sema::error::SemaError::NoMatchingCandidates {
                            name: op.clone(),
                            reasons,
                            range: expr.range,
                        });
                        DataType::Error
                    }
                    crate::sema::overload::Resolution::Ambiguity(decls) => {
                        system.push_error(crate::sema::error::SemaError::Ambiguity {
                            candidates: decls.iter().map(|d| format!("{d:?}")).collect(),
                            range: expr.range,
                        });
                        DataType::Error
                    }
                    crate::sema::overload::Resolution::ArityMismatch { expected, found } => {
                        system.push_error(crate::sema::error::SemaError::ArityMismatch {
                            expected,
                            found,
                            range: expr.range,
                        });
                        DataType::Error
                    }
                    crate::sema::overload::Resolution::UnknownLabel(label) => {
                        system.push_error(crate::sema::error::SemaError::UnknownLabel { label, range: expr.range });
                        DataType::Error
                    }
                }
            }
        }
        ExprKind::Infix { op, lhs, rhs, resolved } => {
            if op.ends_with('=') && op != "==" && op != "!=" && op != "<=" && op != ">=" {
                let lhs_ty = generate(ctx, scope, system, lhs);
                let rhs_ty = generate(ctx, scope, system, rhs);
                system.equal(lhs_ty.clone(), rhs_ty, expr.range, "assignment");
                if !ctx.mutability(lhs, scope).is_mutable() {
                    let culprit = match ctx.mutability(lhs, scope) {
                        crate::sema::context::Mutability::Immutable { culprit } => culprit,
                        crate::sema::context::Mutability::Mutable => None,
                    };
                    system.push_error(crate::sema::error::SemaError::AssignToImmutable { culprit, range: expr.range });
                }
                lhs_ty
            } else {
                let candidates: Vec<(DeclRef, &crate::parser::ast::FunctionDecl)> =
                    ctx.operators_named(op).iter().map(|&idx| (DeclRef::Operator(idx), ctx.operator(idx))).collect();
                match crate::sema::overload::resolve_unlabeled(ctx, scope, &candidates, &[lhs, rhs]) {
                    crate::sema::overload::Resolution::Resolved { decl, ret } => {
                        *resolved.borrow_mut() = Some(decl);
                        ret
                    }
                    crate::sema::overload::Resolution::NoCandidates => {
                        system.push_error(crate::sema::error::SemaError::NoCandidates {
                            name: op.clone(),
                            range: expr.range,
                        });
                        DataType::Error
                    }
                    crate::sema::overload::Resolution::NoMatchingCandidates(reasons) => {
                        system.push_error(crate::sema::error::SemaError::NoMatchingCandidates {
                            name: op.clone(),
                            reasons,
                            range: expr.range,
                        });
                        DataType::Error
                    }
                    crate::sema::overload::Resolution::Ambiguity(decls) => {
                        system.push_error(crate::sema::error::SemaError::Ambiguity {
                            candidates: decls.iter().map(|d| format!("{d:?}")).collect(),
                            range: expr.range,
                        });
                        DataType::Error
                    }
                    crate::sema::overload::Resolution::ArityMismatch { expected, found } => {
                        system.push_error(crate::sema::error::SemaError::ArityMismatch {
                            expected,
                            found,
                            range: expr.range,
                        });
                        DataType::Error
                    }
                    crate::sema::overload::Resolution::UnknownLabel(label) => {
                        system.push_error(crate::sema::error::SemaError::UnknownLabel { label, range: expr.range });
                        DataType::Error
                    }
                }
            }
        }
        ExprKind::Ternary { cond, then_branch, else_branch } => {
            // Boolness of `cond` is a post-solve check, not a unification
            // constraint, so a non-Bool condition is reported
            // once with a precise message rather than as a generic mismatch.
            generate(ctx, scope, system, cond);
            let then_ty = generate(ctx, scope, system, then_branch);
            let else_ty = generate(ctx, scope, system, else_branch);
            system.equal(then_ty.clone(), else_ty, expr.range, "ternary branches");
            then_ty
        }

        ExprKind::Coercion { expr: inner, target } => {
            let inner_ty = generate(ctx, scope, system, inner);
            let target_ty = ctx.canonical_type(target);
            system.conversion(inner_ty, target_ty.clone(), expr.range, "as coercion");
            target_ty
        }
        ExprKind::IsCheck { expr: inner, .. } => {
            generate(ctx, scope, system, inner);
            DataType::Bool
        }
        ExprKind::Sizeof(_) => DataType::Int { width: 64, signed: false },
    };
    *expr.ty.borrow_mut() = goal.clone();
    goal
}

/// Falls back to generic function-value application when the callee isn't
/// a bare reference to a registered free function — a local/global holding
/// a function value, or a closure result.
fn generate_generic_call(
    ctx: &ASTContext,
    scope: &Scope,
    system: &mut ConstraintSystem,
    callee: &ExprNode,
    args: &[crate::parser::ast::Argument],
    range: SourceRange,
) -> DataType {
    let callee_ty = generate(ctx, scope, system, callee);
    let arg_types: Vec<DataType> = args.iter().map(|a| generate(ctx, scope, system, &a.value)).collect();
    let ret = fresh_type_variable("ret");
    system.equal(
        callee_ty,
        DataType::Function { args: arg_types, ret: Box::new(ret.clone()), varargs: false },
        range,
        "function call",
    );
    ret
}

/// Shape-based lvalue test for `&expr` — independent of
/// `ASTContext::mutability`, since taking the address of an immutable
/// binding is legal; only the assignment target needs mutability,
/// address-of only needs a storage location to exist.
fn is_lvalue(expr: &ExprNode) -> bool {
    match &expr.kind {
        ExprKind::VariableRef { .. }
        | ExprKind::PropertyRef { .. }
        | ExprKind::TupleFieldLookup { .. }
        | ExprKind::Subscript { .. } => true,
        ExprKind::Prefix { op, .. } => op == "*",
        ExprKind::Paren(inner) => is_lvalue(inner),
        _ => false,
    }
}

/// Rewrites every expression's type slot in place from `t`'s unsolved goal
/// (possibly a type variable) to its fully-substituted form, following the
/// "solve, then write back" sequencing the analyzer drives.
pub fn write_back_expr(expr: &ExprNode, solution: &crate::sema::solver::Solution) {
    let resolved = solution.resolve(&expr.ty.borrow().clone());
    *expr.ty.borrow_mut() = resolved;
    match &expr.kind {
        ExprKind::PropertyRef { base, .. }
        | ExprKind::TupleFieldLookup { base, .. }
        | ExprKind::Paren(base) => write_back_expr(base, solution),
        ExprKind::Tuple(items) | ExprKind::Array(items) => {
            items.iter().for_each(|i| write_back_expr(i, solution))
        }
        ExprKind::Subscript { base, index } => {
            write_back_expr(base, solution);
            write_back_expr(index, solution);
        }
        ExprKind::Call { callee, args, .. } => {
            write_back_expr(callee, solution);
            args.iter().for_each(|a| write_back_expr(&a.value, solution));
        }
        ExprKind::Closure { body, .. } => body.iter().for_each(|s| write_back_stmt(s, solution)),
        ExprKind::Prefix { operand, .. } => write_back_expr(operand, solution),
        ExprKind::Infix { lhs, rhs, .. } => {
            write_back_expr(lhs, solution);
            write_back_expr(rhs, solution);
        }
        ExprKind::Ternary { cond, then_branch, else_branch } => {
            write_back_expr(cond, solution);
            write_back_expr(then_branch, solution);
            write_back_expr(else_branch, solution);
        }
        ExprKind::Coercion { expr, .. } | ExprKind::IsCheck { expr, .. } => write_back_expr(expr, solution),
        _ => {}
    }
}

pub fn write_back_stmt(stmt: &crate::parser::ast::StmtNode, solution: &crate::sema::solver::Solution) {
    use crate::parser::ast::{DeclNode, StmtKind};
    match &stmt.kind {
        StmtKind::Block { statements, .. } => statements.iter().for_each(|s| write_back_stmt(s, solution)),
        StmtKind::IfChain { branches, else_branch } => {
            for (cond, body) in branches {
                write_back_expr(cond, solution);
                body.iter().for_each(|s| write_back_stmt(s, solution));
            }
            if let Some(body) = else_branch {
                body.iter().for_each(|s| write_back_stmt(s, solution));
            }
        }
        StmtKind::While { cond, body } => {
            write_back_expr(cond, solution);
            body.iter().for_each(|s| write_back_stmt(s, solution));
        }
        StmtKind::For { init, cond, step, body } => {
            if let Some(init) = init {
                write_back_stmt(init, solution);
            }
            if let Some(cond) = cond {
                write_back_expr(cond, solution);
            }
            if let Some(step) = step {
                write_back_stmt(step, solution);
            }
            body.iter().for_each(|s| write_back_stmt(s, solution));
        }
        StmtKind::Switch { scrutinee, cases } => {
            write_back_expr(scrutinee, solution);
            for case in cases {
                if let Some(pattern) = &case.pattern {
                    write_back_expr(pattern, solution);
                }
                case.body.iter().for_each(|s| write_back_stmt(s, solution));
            }
        }
        StmtKind::Return(Some(value)) => write_back_expr(value, solution),
        StmtKind::Return(None) | StmtKind::Break | StmtKind::Continue | StmtKind::PoundDiagnostic { .. } => {}
        StmtKind::ExprStmt(expr) => write_back_expr(expr, solution),
        StmtKind::DeclStmt(decl) => {
            if let DeclNode::Variable(v) = decl.as_ref() {
                if let Some(init) = &v.initializer {
                    write_back_expr(init, solution);
                }
            }
        }
    }
}
