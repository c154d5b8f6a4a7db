//! Constraint solver: resolves a `ConstraintSystem` into a substitution map
//! plus a punishment score used to break overload-resolution ties.

use std::collections::HashMap;

use crate::sema::constraint::{Constraint, ConstraintKind};
use crate::sema::context::ASTContext;
use crate::sema::error::SemaError;
use crate::sema::types::DataType;

/// Tallies non-preferred-but-still-valid solutions. Ordered cheapest to
/// most expensive; `total` sums to a single scalar the overload resolver
/// compares directly.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Punishment {
    AnyPromotion,
    ExistentialPromotion,
    GenericPromotion,
    NumericLiteralPromotion,
    StringLiteralPromotion,
}

impl Punishment {
    fn weight(self) -> u32 {
        match self {
            Punishment::NumericLiteralPromotion | Punishment::StringLiteralPromotion => 1,
            Punishment::GenericPromotion => 2,
            Punishment::AnyPromotion => 4,
            Punishment::ExistentialPromotion => 8,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct Solution {
    pub substitution: HashMap<String, DataType>,
    penalties: Vec<Punishment>,
}

impl Solution {
    pub fn total_punishment(&self) -> u32 {
        self.penalties.iter().map(|p| p.weight()).sum()
    }

    fn punish(&mut self, p: Punishment) {
        self.penalties.push(p);
    }

    /// Applies the accumulated substitution to `t`, repeatedly, until a
    /// fixed point (a type variable may itself resolve to another type
    /// variable earlier in the solve).
    pub fn resolve(&self, t: &DataType) -> DataType {
        let mut current = t.clone();
        for _ in 0..64 {
            let next = current.substitute(&self.substitution);
            if next == current {
                return next;
            }
            current = next;
        }
        current
    }
}

/// Runs every constraint in `constraints` (already sorted `Equal` before
/// `Conversion`/`Conforms` by `ConstraintSystem::sorted_for_solving`)
/// against `ctx`, threading a single substitution map and punishment
/// tally. Returns the first failure as a `SemaError`, attached to that
/// constraint's originating node.
pub fn solve(ctx: &ASTContext, constraints: &[Constraint]) -> Result<Solution, SemaError> {
    let mut solution = Solution::default();
    for c in constraints {
        solve_one(ctx, &mut solution, c)?;
    }
    Ok(solution)
}

fn solve_one(ctx: &ASTContext, solution: &mut Solution, c: &Constraint) -> Result<(), SemaError> {
    match &c.kind {
        ConstraintKind::Equal(t1, t2) => solve_equal(ctx, solution, t1, t2, c),
        ConstraintKind::Conversion(t1, t2) => {
            let t1r = solution.resolve(t1);
            let t2r = solution.resolve(t2);
            if solve_equal(ctx, solution, &t1r, &t2r, c).is_ok() {
                return Ok(());
            }
            if ctx.can_coerce(&t1r, &t2r) {
                return Ok(());
            }
            Err(SemaError::CannotConvert { from: t1r, to: t2r, range: c.origin })
        }
        ConstraintKind::Conforms(t, protocol) => solve_conforms(ctx, solution, t, protocol, c),
    }
}

fn solve_equal(
    ctx: &ASTContext,
    solution: &mut Solution,
    t1: &DataType,
    t2: &DataType,
    c: &Constraint,
) -> Result<(), SemaError> {
    let t1 = solution.resolve(t1);
    let t2 = solution.resolve(t2);

    if t1 == t2 {
        return Ok(());
    }

    if let DataType::TypeVariable(name) = &t1 {
        return bind(solution, name, &t2, c);
    }
    if let DataType::TypeVariable(name) = &t2 {
        return bind(solution, name, &t1, c);
    }

    match (&t1, &t2) {
        (DataType::Pointer(a), DataType::Pointer(b)) => return solve_equal(ctx, solution, a, b, c),
        (DataType::Array(a, _), DataType::Array(b, _)) => return solve_equal(ctx, solution, a, b, c),
        (DataType::Tuple(a), DataType::Tuple(b)) if a.len() == b.len() => {
            for (x, y) in a.iter().zip(b.iter()) {
                solve_equal(ctx, solution, x, y, c)?;
            }
            return Ok(());
        }
        (
            DataType::Function { args: a1, ret: r1, varargs: v1 },
            DataType::Function { args: a2, ret: r2, varargs: v2 },
        ) => {
            let arity_ok = a1.len() == a2.len() || *v1 || *v2;
            if !arity_ok {
                return Err(SemaError::CannotConvert { from: t1.clone(), to: t2.clone(), range: c.origin });
            }
            for (x, y) in a1.iter().zip(a2.iter()) {
                solve_equal(ctx, solution, x, y, c)?;
            }
            solve_equal(ctx, solution, r1, r2, c)?;
            return Ok(());
        }
        _ => {}
    }

    if matches!(t1, DataType::Any) || matches!(t2, DataType::Any) {
        solution.punish(Punishment::AnyPromotion);
        return Ok(());
    }

    if let (DataType::IntegerLiteral, DataType::Int { width, signed }) | (DataType::Int { width, signed }, DataType::IntegerLiteral) =
        (&t1, &t2)
    {
        if *width != 64 || !*signed {
            solution.punish(Punishment::NumericLiteralPromotion);
        }
        return Ok(());
    }
    if let (DataType::IntegerLiteral, other) | (other, DataType::IntegerLiteral) = (&t1, &t2) {
        if matches!(other, DataType::Floating(_)) {
            solution.punish(Punishment::NumericLiteralPromotion);
            return Ok(());
        }
    }
    if let (DataType::FloatingLiteral, DataType::Floating(_)) | (DataType::Floating(_), DataType::FloatingLiteral) =
        (&t1, &t2)
    {
        return Ok(());
    }
    if let (DataType::StringLiteral, DataType::Pointer(inner)) | (DataType::Pointer(inner), DataType::StringLiteral) =
        (&t1, &t2)
    {
        if matches!(**inner, DataType::Int { width: 8, .. }) {
            solution.punish(Punishment::StringLiteralPromotion);
            return Ok(());
        }
    }
    if let DataType::NilLiteral = t1 {
        if ctx.can_be_nil(&t2) {
            return Ok(());
        }
    }
    if let DataType::NilLiteral = t2 {
        if ctx.can_be_nil(&t1) {
            return Ok(());
        }
    }

    Err(SemaError::CannotConvert { from: t1, to: t2, range: c.origin })
}

fn bind(solution: &mut Solution, name: &str, ty: &DataType, c: &Constraint) -> Result<(), SemaError> {
    if ty.is_type_variable() && ty == &DataType::TypeVariable(name.to_string()) {
        return Ok(());
    }
    if ty.free_type_variables().contains(name) {
        return Err(SemaError::InfiniteType { var: name.to_string(), range: c.origin });
    }
    solution.substitution.insert(name.to_string(), ty.clone());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sema::constraint::ConstraintSystem;
    use crate::source::SourceRange;

    fn eq(t1: DataType, t2: DataType) -> Vec<Constraint> {
        let mut system = ConstraintSystem::new();
        system.equal(t1, t2, SourceRange::default(), "test");
        system.sorted_for_solving()
    }

    #[test]
    fn binds_a_type_variable_to_a_concrete_type() {
        let ctx = ASTContext::new();
        let constraints = eq(DataType::TypeVariable("x".into()), DataType::INT64);
        let solution = solve(&ctx, &constraints).unwrap();
        assert_eq!(solution.substitution.get("x"), Some(&DataType::INT64));
        assert_eq!(solution.total_punishment(), 0);
    }

    #[test]
    fn occurs_check_rejects_infinite_types() {
        let ctx = ASTContext::new();
        let x = DataType::TypeVariable("x".into());
        let constraints = eq(x.clone(), DataType::Pointer(Box::new(x)));
        let err = solve(&ctx, &constraints).unwrap_err();
        assert!(matches!(err, SemaError::InfiniteType { .. }));
    }

    #[test]
    fn integer_literal_unifies_with_the_default_int_width_for_free() {
        let ctx = ASTContext::new();
        let constraints = eq(DataType::IntegerLiteral, DataType::INT64);
        let solution = solve(&ctx, &constraints).unwrap();
        assert_eq!(solution.total_punishment(), 0);
    }

    #[test]
    fn integer_literal_against_a_non_default_width_is_punished() {
        let ctx = ASTContext::new();
        let constraints = eq(DataType::IntegerLiteral, DataType::Int { width: 8, signed: true });
        let solution = solve(&ctx, &constraints).unwrap();
        assert_eq!(solution.total_punishment(), Punishment::NumericLiteralPromotion.weight());
    }

    #[test]
    fn integer_literal_against_floating_is_punished() {
        let ctx = ASTContext::new();
        let constraints = eq(DataType::IntegerLiteral, DataType::Floating(crate::sema::types::FloatKind::Double));
        let solution = solve(&ctx, &constraints).unwrap();
        assert_eq!(solution.total_punishment(), Punishment::NumericLiteralPromotion.weight());
    }

    #[test]
    fn any_promotion_is_punished_more_than_a_literal_promotion() {
        let ctx = ASTContext::new();
        let constraints = eq(DataType::Any, DataType::INT64);
        let solution = solve(&ctx, &constraints).unwrap();
        assert!(solution.total_punishment() > Punishment::NumericLiteralPromotion.weight());
    }

    #[test]
    fn nil_literal_unifies_with_a_pointer_but_not_a_value_type() {
        let ctx = ASTContext::new();
        let ok = eq(DataType::NilLiteral, DataType::Pointer(Box::new(DataType::INT64)));
        assert!(solve(&ctx, &ok).is_ok());

        let bad = eq(DataType::NilLiteral, DataType::Bool);
        assert!(solve(&ctx, &bad).is_err());
    }

    #[test]
    fn mismatched_arity_functions_fail_without_varargs() {
        let ctx = ASTContext::new();
        let f1 = DataType::Function { args: vec![DataType::INT64], ret: Box::new(DataType::Void), varargs: false };
        let f2 = DataType::Function {
            args: vec![DataType::INT64, DataType::INT64],
            ret: Box::new(DataType::Void),
            varargs: false,
        };
        let constraints = eq(f1, f2);
        assert!(solve(&ctx, &constraints).is_err());
    }

    #[test]
    fn tuple_equality_recurses_component_wise() {
        let ctx = ASTContext::new();
        let a = DataType::Tuple(vec![DataType::INT64, DataType::Bool]);
        let b = DataType::Tuple(vec![DataType::TypeVariable("x".into()), DataType::Bool]);
        let solution = solve(&ctx, &eq(a, b)).unwrap();
        assert_eq!(solution.substitution.get("x"), Some(&DataType::INT64));
    }
}

fn solve_conforms(
    ctx: &ASTContext,
    solution: &mut Solution,
    t: &DataType,
    protocol: &DataType,
    c: &Constraint,
) -> Result<(), SemaError> {
    let t = solution.resolve(t);
    let DataType::Custom(protocol_name) = protocol else {
        return Ok(());
    };
    let Some(protocol_idx) = ctx.protocol_named(protocol_name) else {
        return Ok(());
    };
    let protocol_decl = ctx.protocol_decl(protocol_idx);

    let DataType::Custom(type_name) = &t else {
        solution.punish(Punishment::GenericPromotion);
        return Ok(());
    };
    let Some(type_idx) = ctx.type_named(type_name) else {
        return Err(SemaError::TypeDoesNotConform {
            type_name: type_name.clone(),
            protocol: protocol_name.clone(),
            missing: vec![],
            range: c.origin,
        });
    };
    let type_decl = ctx.type_decl(type_idx);

    let missing = crate::sema::analyzer::missing_conformance_methods(ctx, type_decl, protocol_decl);
    if missing.is_empty() {
        Ok(())
    } else {
        Err(SemaError::TypeDoesNotConform {
            type_name: type_name.clone(),
            protocol: protocol_name.clone(),
            missing,
            range: c.origin,
        })
    }
}
