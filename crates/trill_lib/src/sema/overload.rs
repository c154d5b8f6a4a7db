//! Overload resolver: scores candidate function/operator declarations
//! against a call site's operands by running the constraint generator and
//! solver once per candidate, then picks the candidate with the lowest
//! total punishment. Every candidate sharing a name is tried, since Trill
//! allows overloading.

use crate::decl_ref::DeclRef;
use crate::parser::ast::{Argument, FunctionDecl, ParamDecl};
use crate::sema::constraint::{generate, write_back_expr, ConstraintSystem};
use crate::sema::context::ASTContext;
use crate::sema::scope::Scope;
use crate::sema::solver;
use crate::sema::types::DataType;

#[derive(Debug)]
pub enum Resolution {
    Resolved { decl: DeclRef, ret: DataType },
    NoCandidates,
    NoMatchingCandidates(Vec<String>),
    Ambiguity(Vec<DeclRef>),
    /// A single candidate exists and the call's argument count doesn't match
    /// it (and it has no varargs) — precise enough to report as
    /// `SemaError::ArityMismatch` instead of a generic `NoMatchingCandidates`.
    ArityMismatch { expected: usize, found: usize },
    /// A single candidate exists and an argument carries a label the
    /// candidate doesn't expect.
    UnknownLabel(String),
}

/// Entry point for call sites, where operands carry optional argument
/// labels that must match the candidate's declared labels exactly.
pub fn resolve(
    ctx: &ASTContext,
    scope: &Scope,
    candidates: &[(DeclRef, &FunctionDecl)],
    args: &[Argument],
) -> Resolution {
    let operands: Vec<(Option<&str>, &crate::parser::ast::ExprNode)> =
        args.iter().map(|a| (a.label.as_ref().map(|l| l.as_str()), &a.value)).collect();
    resolve_operands(ctx, scope, candidates, &operands)
}

/// Entry point for operator application (infix/prefix), where operands have
/// no labels at all.
pub fn resolve_unlabeled(
    ctx: &ASTContext,
    scope: &Scope,
    candidates: &[(DeclRef, &FunctionDecl)],
    operands: &[&crate::parser::ast::ExprNode],
) -> Resolution {
    let operands: Vec<(Option<&str>, &crate::parser::ast::ExprNode)> =
        operands.iter().map(|e| (None, *e)).collect();
    resolve_operands(ctx, scope, candidates, &operands)
}

fn resolve_operands(
    ctx: &ASTContext,
    scope: &Scope,
    candidates: &[(DeclRef, &FunctionDecl)],
    operands: &[(Option<&str>, &crate::parser::ast::ExprNode)],
) -> Resolution {
    if candidates.is_empty() {
        return Resolution::NoCandidates;
    }

    // With exactly one candidate, an arity or label mismatch is not really
    // "no matching candidate among several" — it is a precise, single-cause
    // failure, so it is reported as such rather than folded into the
    // generic multi-candidate diagnostic.
    let single_candidate = candidates.len() == 1;

    let mut trials: Vec<(DeclRef, u32)> = Vec::new();
    let mut reasons = Vec::new();

    for (decl_ref, decl) in candidates {
        let params = &decl.params;
        if operands.len() != params.len() && !decl.has_varargs {
            if single_candidate {
                return Resolution::ArityMismatch { expected: params.len(), found: operands.len() };
            }
            reasons.push(format!(
                "{}: expected {} argument(s), found {}",
                signature(decl),
                params.len(),
                operands.len()
            ));
            continue;
        }
        if !labels_match(params, operands) {
            if single_candidate {
                if let Some(label) = first_unexpected_label(params, operands) {
                    return Resolution::UnknownLabel(label);
                }
            }
            reasons.push(format!("{}: argument labels do not match", signature(decl)));
            continue;
        }

        let mut system = ConstraintSystem::new();
        for (i, (_, value)) in operands.iter().enumerate() {
            let operand_ty = generate(ctx, scope, &mut system, value);
            if let Some(param) = params.get(i) {
                system.equal(operand_ty, ctx.canonical_type(&param.type_name), value.range, "argument");
            }
        }
        if !system.errors.is_empty() {
            reasons.push(format!("{}: {}", signature(decl), system.errors[0]));
            continue;
        }
        match solver::solve(ctx, &system.sorted_for_solving()) {
            Ok(solution) => trials.push((*decl_ref, solution.total_punishment())),
            Err(e) => reasons.push(format!("{}: {}", signature(decl), e)),
        }
    }

    if trials.is_empty() {
        return Resolution::NoMatchingCandidates(reasons);
    }
    let best = trials.iter().map(|(_, p)| *p).min().expect("trials is non-empty");
    let winners: Vec<DeclRef> = trials.iter().filter(|(_, p)| *p == best).map(|(d, _)| *d).collect();
    if winners.len() > 1 {
        return Resolution::Ambiguity(winners);
    }
    let winner = winners[0];
    let winner_decl = candidates.iter().find(|(d, _)| *d == winner).map(|(_, decl)| *decl).expect("winner is a candidate");

    // Re-run generation once more against only the winner, so every operand
    // expression's type slot ends up carrying *this* trial's substitution —
    // a losing trial's fresh type variables would otherwise be left behind
    // from the last time `generate` touched these nodes — a retried
    // resolution must be idempotent from the caller's perspective.
    let mut system = ConstraintSystem::new();
    for (i, (_, value)) in operands.iter().enumerate() {
        let operand_ty = generate(ctx, scope, &mut system, value);
        if let Some(param) = winner_decl.params.get(i) {
            system.equal(operand_ty, ctx.canonical_type(&param.type_name), value.range, "argument");
        }
    }
    let solution = solver::solve(ctx, &system.sorted_for_solving()).expect("winning candidate re-solves");
    for (_, value) in operands {
        write_back_expr(value, &solution);
    }

    let ret = winner_decl.ret.as_ref().map(|r| ctx.canonical_type(r)).unwrap_or(DataType::Void);
    Resolution::Resolved { decl: winner, ret: solution.resolve(&ret) }
}

fn labels_match(params: &[ParamDecl], operands: &[(Option<&str>, &crate::parser::ast::ExprNode)]) -> bool {
    for (param, (label, _)) in params.iter().zip(operands.iter()) {
        match (&param.label, label) {
            (Some(l), Some(a)) if l.as_str() == *a => {}
            (None, None) => {}
            _ => return false,
        }
    }
    true
}

/// First argument label the candidate doesn't expect, for the
/// single-candidate precise-diagnostic path. Only covers the case where the
/// caller supplied a label text that doesn't match (or isn't expected at
/// all) — a missing required label has no offending text to report here and
/// falls back to the generic reasons list.
fn first_unexpected_label(
    params: &[ParamDecl],
    operands: &[(Option<&str>, &crate::parser::ast::ExprNode)],
) -> Option<String> {
    for (param, (label, _)) in params.iter().zip(operands.iter()) {
        match (&param.label, label) {
            (Some(l), Some(a)) if l.as_str() == *a => {}
            (None, None) => {}
            (_, Some(a)) => return Some(a.to_string()),
            (Some(_), None) => {}
        }
    }
    None
}

fn signature(decl: &FunctionDecl) -> String {
    format!(
        "{}({})",
        decl.name,
        decl.params.iter().map(|p| p.type_name.to_string()).collect::<Vec<_>>().join(", ")
    )
}
