//! Post-solve type checker: runs once every declaration's constraint system
//! has been solved and written back. Two jobs the solver itself cannot do:
//! reify leftover literal pseudo-types (`IntegerLiteral`, `FloatingLiteral`,
//! `StringLiteral`, `NilLiteral`) to a concrete default or their pinned
//! context type, and check properties the solver never turned into
//! constraints in the first place — condition boolness, switch-case
//! agreement with the scrutinee, shift amounts, integer literal bounds.
//!
//! The solver leaves literal nodes in their pseudo-type form whenever
//! unification with a concrete type costs nothing to satisfy (its
//! literal-promotion rules never bind a substitution for them), so this
//! pass is what actually picks a concrete type for every literal.

use crate::parser::ast::{
    DeclNode, ExprKind, ExprNode, ProtocolMember, StmtKind, StmtNode, SwitchCase, TypeMember,
};
use crate::sema::context::ASTContext;
use crate::sema::error::SemaError;
use crate::sema::types::{DataType, FloatKind};

/// Walks every registered declaration's body and reports every post-solve
/// finding. Called once, after `Analyzer::run` has solved and written back
/// every constraint system.
pub fn check(ctx: &ASTContext) -> Vec<SemaError> {
    let mut diags = Vec::new();

    for (_, f) in ctx.functions() {
        check_function_like(ctx, f, &mut diags);
    }
    for (_, op) in ctx.all_operators() {
        check_function_like(ctx, op, &mut diags);
    }
    for (_, t) in ctx.types() {
        for member in &t.members {
            check_type_member(ctx, member, &mut diags);
        }
    }
    for ext in ctx.extensions() {
        for member in &ext.members {
            check_type_member(ctx, member, &mut diags);
        }
    }
    for (_, p) in ctx.protocols() {
        for member in &p.members {
            if let ProtocolMember::Function { params, ret, default_body: Some(body), .. } = member {
                let ret_ty = ret.as_ref().map(|r| ctx.canonical_type(r)).unwrap_or(DataType::Void);
                check_params(ctx, params, &mut diags);
                check_stmts(ctx, body, &ret_ty, &mut diags);
            }
        }
    }
    for (_, g) in ctx.globals() {
        if let Some(init) = &g.initializer {
            let expected = g.type_name.as_ref().map(|t| ctx.canonical_type(t));
            check_expr(ctx, init, expected.as_ref(), &mut diags);
        }
    }

    diags
}

fn check_function_like(ctx: &ASTContext, f: &crate::parser::ast::FunctionDecl, diags: &mut Vec<SemaError>) {
    check_params(ctx, &f.params, diags);
    if let Some(body) = &f.body {
        let ret_ty = f.ret.as_ref().map(|r| ctx.canonical_type(r)).unwrap_or(DataType::Void);
        check_stmts(ctx, body, &ret_ty, diags);
    }
}

fn check_type_member(ctx: &ASTContext, member: &TypeMember, diags: &mut Vec<SemaError>) {
    match member {
        TypeMember::Function(f) => check_function_like(ctx, f, diags),
        TypeMember::Property(p) => {
            let expected = p.type_name.as_ref().map(|t| ctx.canonical_type(t));
            match &p.accessor {
                crate::parser::ast::PropertyAccessor::Stored { initializer: Some(init) } => {
                    check_expr(ctx, init, expected.as_ref(), diags);
                }
                crate::parser::ast::PropertyAccessor::Stored { initializer: None } => {}
                crate::parser::ast::PropertyAccessor::Computed { getter, setter } => {
                    let ret_ty = expected.clone().unwrap_or(DataType::Void);
                    check_stmts(ctx, getter, &ret_ty, diags);
                    if let Some((_, body)) = setter {
                        check_stmts(ctx, body, &DataType::Void, diags);
                    }
                }
            }
        }
    }
}

fn check_params(ctx: &ASTContext, params: &[crate::parser::ast::ParamDecl], diags: &mut Vec<SemaError>) {
    for p in params {
        if let Some(default) = &p.default_value {
            let expected = ctx.canonical_type(&p.type_name);
            check_expr(ctx, default, Some(&expected), diags);
        }
    }
}

fn check_stmts(ctx: &ASTContext, stmts: &[StmtNode], ret_ty: &DataType, diags: &mut Vec<SemaError>) {
    for s in stmts {
        check_stmt(ctx, s, ret_ty, diags);
    }
}

fn check_stmt(ctx: &ASTContext, stmt: &StmtNode, ret_ty: &DataType, diags: &mut Vec<SemaError>) {
    match &stmt.kind {
        StmtKind::Block { statements, .. } => check_stmts(ctx, statements, ret_ty, diags),
        StmtKind::IfChain { branches, else_branch } => {
            for (cond, body) in branches {
                check_condition(ctx, cond, diags);
                check_stmts(ctx, body, ret_ty, diags);
            }
            if let Some(body) = else_branch {
                check_stmts(ctx, body, ret_ty, diags);
            }
        }
        StmtKind::While { cond, body } => {
            check_condition(ctx, cond, diags);
            check_stmts(ctx, body, ret_ty, diags);
        }
        StmtKind::For { init, cond, step, body } => {
            if let Some(init) = init {
                check_stmt(ctx, init, ret_ty, diags);
            }
            if let Some(cond) = cond {
                check_condition(ctx, cond, diags);
            }
            if let Some(step) = step {
                check_stmt(ctx, step, ret_ty, diags);
            }
            check_stmts(ctx, body, ret_ty, diags);
        }
        StmtKind::Switch { scrutinee, cases } => {
            check_expr(ctx, scrutinee, None, diags);
            let scrutinee_ty = scrutinee.ty.borrow().clone();
            for case in cases {
                check_switch_case(ctx, case, &scrutinee_ty, ret_ty, diags);
            }
        }
        StmtKind::Break | StmtKind::Continue | StmtKind::PoundDiagnostic { .. } => {}
        StmtKind::Return(Some(value)) => {
            check_expr(ctx, value, Some(ret_ty), diags);
            let found = value.ty.borrow().clone();
            if *ret_ty != DataType::Void && found != DataType::Void && found != *ret_ty && !found.is_error() {
                diags.push(SemaError::ReturnTypeMismatch {
                    expected: ret_ty.clone(),
                    found,
                    range: value.range,
                });
            }
        }
        StmtKind::Return(None) => {}
        StmtKind::ExprStmt(expr) => check_expr(ctx, expr, None, diags),
        StmtKind::DeclStmt(decl) => {
            if let DeclNode::Variable(v) = decl.as_ref() {
                if let Some(init) = &v.initializer {
                    let expected = v.type_name.as_ref().map(|t| ctx.canonical_type(t));
                    check_expr(ctx, init, expected.as_ref(), diags);
                }
            }
        }
    }
}

fn check_switch_case(
    ctx: &ASTContext,
    case: &SwitchCase,
    scrutinee_ty: &DataType,
    ret_ty: &DataType,
    diags: &mut Vec<SemaError>,
) {
    if let Some(pattern) = &case.pattern {
        check_expr(ctx, pattern, Some(scrutinee_ty), diags);
        let pattern_ty = pattern.ty.borrow().clone();
        if !pattern_ty.is_error() && !scrutinee_ty.is_error() && pattern_ty != *scrutinee_ty {
            diags.push(SemaError::SwitchCaseTypeMismatch { range: pattern.range });
        }
    }
    check_stmts(ctx, &case.body, ret_ty, diags);
}

/// `if`/`while`/`for`-condition boolness — never expressed as an `Equal`
/// constraint during generation, so it's checked here against the
/// condition's final solved type.
fn check_condition(ctx: &ASTContext, cond: &ExprNode, diags: &mut Vec<SemaError>) {
    check_expr(ctx, cond, Some(&DataType::Bool), diags);
    let ty = cond.ty.borrow().clone();
    if ty != DataType::Bool && !ty.is_error() {
        diags.push(SemaError::NonBoolCondition { range: cond.range });
    }
}

/// Recursively finalizes `expr`'s type: picks a concrete type for any
/// literal pseudo-type left behind by the solver (using `expected` — the
/// type this expression is syntactically being matched against, if any —
/// or a default when nothing pins it down), and checks integer literal
/// bounds, shift amounts and nested pseudo-types along the way.
fn check_expr(ctx: &ASTContext, expr: &ExprNode, expected: Option<&DataType>, diags: &mut Vec<SemaError>) {
    match &expr.kind {
        ExprKind::IntegerLiteral(raw) => {
            finalize_integer_literal(expr, raw, false, expected, diags);
            return;
        }
        ExprKind::FloatingLiteral(_) => {
            let target = expected.cloned().unwrap_or(DataType::Floating(FloatKind::Double));
            *expr.ty.borrow_mut() = target;
            return;
        }
        ExprKind::StringLiteral(segments) => {
            let target = expected
                .cloned()
                .unwrap_or_else(|| DataType::Pointer(Box::new(DataType::Int { width: 8, signed: true })));
            *expr.ty.borrow_mut() = target;
            for segment in segments {
                if let crate::lexer::token::StringSegment::Interpolation(tokens) = segment {
                    let _ = tokens;
                }
            }
            return;
        }
        ExprKind::NilLiteral => {
            match expected {
                Some(t) if ctx.can_be_nil(t) => *expr.ty.borrow_mut() = t.clone(),
                Some(t) => *expr.ty.borrow_mut() = t.clone(),
                None => {
                    diags.push(SemaError::AmbiguousExpressionType { range: expr.range });
                    *expr.ty.borrow_mut() = DataType::Pointer(Box::new(DataType::Any));
                }
            }
            return;
        }
        ExprKind::CharLiteral(_) | ExprKind::BoolLiteral(_) | ExprKind::VoidLiteral | ExprKind::PoundLiteral(_) => {
            return;
        }
        ExprKind::VariableRef { .. } => {}
        ExprKind::PropertyRef { base, .. } => check_expr(ctx, base, None, diags),
        ExprKind::Tuple(items) => match expected {
            Some(DataType::Tuple(fields)) if fields.len() == items.len() => {
                for (item, field_ty) in items.iter().zip(fields) {
                    check_expr(ctx, item, Some(field_ty), diags);
                }
            }
            _ => items.iter().for_each(|item| check_expr(ctx, item, None, diags)),
        },
        ExprKind::Array(items) => {
            let elem_expected = match expected {
                Some(DataType::Array(elem, _)) => Some((**elem).clone()),
                _ => None,
            };
            for item in items {
                check_expr(ctx, item, elem_expected.as_ref(), diags);
            }
            let final_elem = items.first().map(|i| i.ty.borrow().clone()).unwrap_or(DataType::INT64);
            *expr.ty.borrow_mut() = DataType::Array(Box::new(final_elem), Some(items.len() as u64));
            return;
        }
        ExprKind::TupleFieldLookup { base, .. } => check_expr(ctx, base, None, diags),
        ExprKind::Paren(inner) => {
            check_expr(ctx, inner, expected, diags);
            *expr.ty.borrow_mut() = inner.ty.borrow().clone();
            return;
        }
        ExprKind::Subscript { base, index } => {
            check_expr(ctx, base, None, diags);
            check_expr(ctx, index, Some(&DataType::INT64), diags);
        }
        ExprKind::Call { callee, args, resolved } => {
            check_expr(ctx, callee, None, diags);
            let param_types = resolved.borrow().as_ref().and_then(|d| function_param_types(ctx, *d));
            for (i, a) in args.iter().enumerate() {
                let arg_expected = param_types.as_ref().and_then(|v| v.get(i));
                check_expr(ctx, &a.value, arg_expected, diags);
            }
        }
        ExprKind::Closure { params, ret, body, .. } => {
            check_params(ctx, params, diags);
            let ret_ty = ret.as_ref().map(|r| ctx.canonical_type(r)).unwrap_or(DataType::Void);
            check_stmts(ctx, body, &ret_ty, diags);
        }
        ExprKind::Prefix { op, operand, resolved } => {
            if op == "-" {
                if let ExprKind::IntegerLiteral(raw) = &operand.kind {
                    finalize_integer_literal(operand, raw, true, expected, diags);
                    *expr.ty.borrow_mut() = operand.ty.borrow().clone();
                    return;
                }
            }
            let operand_expected = resolved.borrow().as_ref().and_then(|d| {
                function_param_types(ctx, *d).and_then(|v| v.first().cloned())
            });
            check_expr(ctx, operand, operand_expected.as_ref(), diags);
        }
        ExprKind::Infix { op, lhs, rhs, resolved } => {
            let param_types = resolved.borrow().as_ref().and_then(|d| function_param_types(ctx, *d));
            let lhs_expected = param_types.as_ref().and_then(|v| v.first().cloned());
            let rhs_expected = param_types.as_ref().and_then(|v| v.get(1).cloned());
            check_expr(ctx, lhs, lhs_expected.as_ref(), diags);
            check_expr(ctx, rhs, rhs_expected.as_ref(), diags);
            if op == "<<" || op == ">>" {
                check_shift_amount(lhs, rhs, diags);
            }
        }
        ExprKind::Ternary { cond, then_branch, else_branch } => {
            check_condition(ctx, cond, diags);
            check_expr(ctx, then_branch, expected, diags);
            check_expr(ctx, else_branch, expected, diags);
            *expr.ty.borrow_mut() = then_branch.ty.borrow().clone();
            return;
        }
        ExprKind::Coercion { expr: inner, target } => {
            let target_ty = ctx.canonical_type(target);
            check_expr(ctx, inner, Some(&target_ty), diags);
        }
        ExprKind::IsCheck { expr: inner, .. } => check_expr(ctx, inner, None, diags),
        ExprKind::Sizeof(_) => {}
    }

    let reified = reify_pseudo(&expr.ty.borrow());
    *expr.ty.borrow_mut() = reified;
}

/// Looks up a resolved call/operator target's declared parameter types,
/// canonicalized, for use as the `expected` type of each argument/operand.
fn function_param_types(ctx: &ASTContext, decl: crate::decl_ref::DeclRef) -> Option<Vec<DataType>> {
    use crate::decl_ref::DeclRef;
    let params = match decl {
        DeclRef::Function(i) => &ctx.function(i).params,
        DeclRef::Operator(i) => &ctx.operator(i).params,
        _ => return None,
    };
    Some(params.iter().map(|p| ctx.canonical_type(&p.type_name)).collect())
}

/// Shift-amount bound check: only checkable when the shifted value's final
/// type is a concrete sized integer and the amount is a literal.
fn check_shift_amount(lhs: &ExprNode, rhs: &ExprNode, diags: &mut Vec<SemaError>) {
    let DataType::Int { width, .. } = *lhs.ty.borrow() else {
        return;
    };
    let ExprKind::IntegerLiteral(raw) = &rhs.kind else {
        return;
    };
    let Some(amount) = parse_integer_magnitude(raw) else {
        return;
    };
    if amount >= width as u128 {
        diags.push(SemaError::ShiftOutOfRange { amount: raw.clone(), width, range: rhs.range });
    }
}

/// Picks `expr`'s final type (from `expected`, defaulting to `Int64`),
/// writes it back into the type slot, and checks the literal's magnitude
/// against that type's bit width.
fn finalize_integer_literal(
    expr: &ExprNode,
    raw: &str,
    negated: bool,
    expected: Option<&DataType>,
    diags: &mut Vec<SemaError>,
) {
    let target = expected.cloned().unwrap_or(DataType::INT64);
    *expr.ty.borrow_mut() = target.clone();

    let DataType::Int { width, signed } = target else {
        return;
    };
    let Some(magnitude) = parse_integer_magnitude(raw) else {
        return;
    };

    if signed {
        let limit = 1u128 << (width - 1);
        if negated {
            if magnitude > limit {
                diags.push(SemaError::Underflow { raw: raw.to_string(), type_name: target.to_string(), range: expr.range });
            }
        } else if magnitude > limit - 1 {
            diags.push(SemaError::Overflow { raw: raw.to_string(), type_name: target.to_string(), range: expr.range });
        }
    } else if negated {
        if magnitude > 0 {
            diags.push(SemaError::Underflow { raw: raw.to_string(), type_name: target.to_string(), range: expr.range });
        }
    } else {
        let limit = if width >= 128 { u128::MAX } else { (1u128 << width) - 1 };
        if magnitude > limit {
            diags.push(SemaError::Overflow { raw: raw.to_string(), type_name: target.to_string(), range: expr.range });
        }
    }
}

/// Recovers an integer literal's numeric magnitude from its source text —
/// the lexer parses this once already (`lexer::mod::lex_number`), but only
/// the raw text survives into `ExprKind::IntegerLiteral`, so bounds-checking
/// re-parses it here, stripping the same radix prefixes and `_` separators.
fn parse_integer_magnitude(raw: &str) -> Option<u128> {
    let cleaned: String = raw.chars().filter(|&c| c != '_').collect();
    let (radix, digits) = if let Some(rest) = cleaned.strip_prefix("0x").or_else(|| cleaned.strip_prefix("0X")) {
        (16, rest)
    } else if let Some(rest) = cleaned.strip_prefix("0b").or_else(|| cleaned.strip_prefix("0B")) {
        (2, rest)
    } else if let Some(rest) = cleaned.strip_prefix("0o").or_else(|| cleaned.strip_prefix("0O")) {
        (8, rest)
    } else {
        (10, cleaned.as_str())
    };
    u128::from_str_radix(digits, radix).ok()
}

/// Rewrites any literal pseudo-type still embedded in `t` (possibly nested
/// inside an `Array`/`Tuple`/`Pointer`/`Function`) to its default concrete
/// type. Bare literal leaf nodes are handled directly by
/// `finalize_integer_literal` and the `FloatingLiteral`/`StringLiteral`/
/// `NilLiteral` arms of `check_expr`; this covers pseudo-types that survived
/// unification nested inside a composite type.
fn reify_pseudo(t: &DataType) -> DataType {
    match t {
        DataType::IntegerLiteral => DataType::INT64,
        DataType::FloatingLiteral => DataType::Floating(FloatKind::Double),
        DataType::StringLiteral => DataType::Pointer(Box::new(DataType::Int { width: 8, signed: true })),
        DataType::NilLiteral => DataType::Pointer(Box::new(DataType::Any)),
        DataType::Pointer(inner) => DataType::Pointer(Box::new(reify_pseudo(inner))),
        DataType::Array(inner, len) => DataType::Array(Box::new(reify_pseudo(inner)), *len),
        DataType::Tuple(fields) => DataType::Tuple(fields.iter().map(reify_pseudo).collect()),
        DataType::Function { args, ret, varargs } => DataType::Function {
            args: args.iter().map(reify_pseudo).collect(),
            ret: Box::new(reify_pseudo(ret)),
            varargs: *varargs,
        },
        other => other.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_radix_and_underscored_literals() {
        assert_eq!(parse_integer_magnitude("1_000"), Some(1000));
        assert_eq!(parse_integer_magnitude("0xFF"), Some(255));
        assert_eq!(parse_integer_magnitude("0b1010"), Some(10));
        assert_eq!(parse_integer_magnitude("0o17"), Some(15));
    }

    #[test]
    fn reify_pseudo_rewrites_nested_array_element() {
        let t = DataType::Array(Box::new(DataType::IntegerLiteral), Some(3));
        assert_eq!(reify_pseudo(&t), DataType::Array(Box::new(DataType::INT64), Some(3)));
    }

    #[test]
    fn signed_overflow_bound_is_one_below_the_unsigned_bound() {
        // Int8: [-128, 127]; 128 overflows, -128 (negated 128) does not underflow.
        let expr = ExprNode::new(ExprKind::IntegerLiteral("128".into()), Default::default());
        let mut diags = Vec::new();
        let i8 = DataType::Int { width: 8, signed: true };
        finalize_integer_literal(&expr, "128", false, Some(&i8), &mut diags);
        assert_eq!(diags.len(), 1);
        assert!(matches!(diags[0], SemaError::Overflow { .. }));

        let expr2 = ExprNode::new(ExprKind::IntegerLiteral("128".into()), Default::default());
        let mut diags2 = Vec::new();
        finalize_integer_literal(&expr2, "128", true, Some(&i8), &mut diags2);
        assert!(diags2.is_empty());
    }

    #[test]
    fn unsigned_rejects_any_negated_literal() {
        let expr = ExprNode::new(ExprKind::IntegerLiteral("1".into()), Default::default());
        let mut diags = Vec::new();
        let u8 = DataType::Int { width: 8, signed: false };
        finalize_integer_literal(&expr, "1", true, Some(&u8), &mut diags);
        assert_eq!(diags.len(), 1);
        assert!(matches!(diags[0], SemaError::Underflow { .. }));
    }
}
