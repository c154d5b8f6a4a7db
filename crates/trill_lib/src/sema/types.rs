//! `DataType`: the recursive semantic type representation used throughout
//! constraint generation, solving and code-generation export.
//!
//! A small closed enum with structural equality plus a couple of
//! transparency rules: sized/signed integers, float widths, pointers,
//! generics, varargs, and the literal pseudo-types the constraint solver
//! needs.

use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub enum FloatKind {
    Half,
    Float,
    Double,
    Float80,
}

/// A semantic type. Two `DataType`s compare equal iff structurally equal in
/// canonical form; `array` equality ignores length (checked separately by
/// the type checker), and `Custom` compares by name only —
/// callers must canonicalize through `Context::canonical_type` before
/// relying on structural equality across alias boundaries.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub enum DataType {
    Int { width: u32, signed: bool },
    Floating(FloatKind),
    Bool,
    Void,
    Any,
    /// Nominal reference resolved via decl tables; may be a type, a protocol
    /// (in `Conforms` position), or an unresolved alias prior to
    /// canonicalization.
    Custom(String),
    TypeVariable(String),
    Pointer(Box<DataType>),
    Array(Box<DataType>, Option<u64>),
    Tuple(Vec<DataType>),
    Function { args: Vec<DataType>, ret: Box<DataType>, varargs: bool },
    /// Sentinel; never survives past successful semantic analysis.
    Error,

    // --- literal pseudo-types (solver-internal only; reified by the
    // post-solve type checker) ---
    IntegerLiteral,
    FloatingLiteral,
    StringLiteral,
    NilLiteral,
}

impl DataType {
    pub const INT64: DataType = DataType::Int { width: 64, signed: true };
    pub const INT32: DataType = DataType::Int { width: 32, signed: true };

    pub fn is_literal_pseudo_type(&self) -> bool {
        matches!(
            self,
            DataType::IntegerLiteral | DataType::FloatingLiteral | DataType::StringLiteral | DataType::NilLiteral
        )
    }

    pub fn is_type_variable(&self) -> bool {
        matches!(self, DataType::TypeVariable(_))
    }

    pub fn is_error(&self) -> bool {
        matches!(self, DataType::Error)
    }

    pub fn is_pointer(&self) -> bool {
        matches!(self, DataType::Pointer(_))
    }

    pub fn is_numeric(&self) -> bool {
        matches!(self, DataType::Int { .. } | DataType::Floating(_))
    }

    /// Every `type_variable` name reachable from this type.
    pub fn free_type_variables(&self) -> std::collections::HashSet<String> {
        let mut out = std::collections::HashSet::new();
        self.collect_free_type_variables(&mut out);
        out
    }

    fn collect_free_type_variables(&self, out: &mut std::collections::HashSet<String>) {
        match self {
            DataType::TypeVariable(name) => {
                out.insert(name.clone());
            }
            DataType::Pointer(inner) => inner.collect_free_type_variables(out),
            DataType::Array(inner, _) => inner.collect_free_type_variables(out),
            DataType::Tuple(fields) => fields.iter().for_each(|f| f.collect_free_type_variables(out)),
            DataType::Function { args, ret, .. } => {
                args.iter().for_each(|a| a.collect_free_type_variables(out));
                ret.collect_free_type_variables(out);
            }
            _ => {}
        }
    }

    /// Recursively substitutes every `TypeVariable(name)` found in `subst`.
    pub fn substitute(&self, subst: &std::collections::HashMap<String, DataType>) -> DataType {
        match self {
            DataType::TypeVariable(name) => subst.get(name).cloned().unwrap_or_else(|| self.clone()),
            DataType::Pointer(inner) => DataType::Pointer(Box::new(inner.substitute(subst))),
            DataType::Array(inner, len) => DataType::Array(Box::new(inner.substitute(subst)), *len),
            DataType::Tuple(fields) => DataType::Tuple(fields.iter().map(|f| f.substitute(subst)).collect()),
            DataType::Function { args, ret, varargs } => DataType::Function {
                args: args.iter().map(|a| a.substitute(subst)).collect(),
                ret: Box::new(ret.substitute(subst)),
                varargs: *varargs,
            },
            other => other.clone(),
        }
    }
}

/// Structural equality: `array` equality ignores length; all other variants
/// compare recursively. This does NOT expand aliases — compare
/// `Context::canonical_type` results for alias-transparent equality.
impl PartialEq for DataType {
    fn eq(&self, other: &Self) -> bool {
        use DataType::*;
        match (self, other) {
            (Int { width: w1, signed: s1 }, Int { width: w2, signed: s2 }) => w1 == w2 && s1 == s2,
            (Floating(a), Floating(b)) => a == b,
            (Bool, Bool) | (Void, Void) | (Any, Any) | (Error, Error) => true,
            (Custom(a), Custom(b)) => a == b,
            (TypeVariable(a), TypeVariable(b)) => a == b,
            (Pointer(a), Pointer(b)) => a == b,
            (Array(a, _), Array(b, _)) => a == b,
            (Tuple(a), Tuple(b)) => a == b,
            (
                Function { args: a1, ret: r1, varargs: v1 },
                Function { args: a2, ret: r2, varargs: v2 },
            ) => a1 == a2 && r1 == r2 && v1 == v2,
            (IntegerLiteral, IntegerLiteral) => true,
            (FloatingLiteral, FloatingLiteral) => true,
            (StringLiteral, StringLiteral) => true,
            (NilLiteral, NilLiteral) => true,
            _ => false,
        }
    }
}
impl Eq for DataType {}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DataType::Int { width, signed } => {
                write!(f, "{}{}", if *signed { "Int" } else { "UInt" }, width)
            }
            DataType::Floating(FloatKind::Half) => write!(f, "Float16"),
            DataType::Floating(FloatKind::Float) => write!(f, "Float"),
            DataType::Floating(FloatKind::Double) => write!(f, "Double"),
            DataType::Floating(FloatKind::Float80) => write!(f, "Float80"),
            DataType::Bool => write!(f, "Bool"),
            DataType::Void => write!(f, "Void"),
            DataType::Any => write!(f, "Any"),
            DataType::Custom(name) => write!(f, "{name}"),
            DataType::TypeVariable(name) => write!(f, "${name}"),
            DataType::Pointer(inner) => write!(f, "*{inner}"),
            DataType::Array(inner, Some(len)) => write!(f, "[{inner}; {len}]"),
            DataType::Array(inner, None) => write!(f, "[{inner}]"),
            DataType::Tuple(fields) => {
                write!(f, "(")?;
                for (i, t) in fields.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{t}")?;
                }
                write!(f, ")")
            }
            DataType::Function { args, ret, varargs } => {
                write!(f, "(")?;
                for (i, a) in args.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{a}")?;
                }
                if *varargs {
                    write!(f, ", ...")?;
                }
                write!(f, ") -> {ret}")
            }
            DataType::Error => write!(f, "<error>"),
            DataType::IntegerLiteral => write!(f, "<integer literal>"),
            DataType::FloatingLiteral => write!(f, "<floating literal>"),
            DataType::StringLiteral => write!(f, "<string literal>"),
            DataType::NilLiteral => write!(f, "<nil literal>"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn array_equality_ignores_length() {
        let a = DataType::Array(Box::new(DataType::INT64), Some(3));
        let b = DataType::Array(Box::new(DataType::INT64), Some(5));
        let c = DataType::Array(Box::new(DataType::INT64), None);
        assert_eq!(a, b);
        assert_eq!(a, c);
    }

    #[test]
    fn any_equals_any_error_equals_error() {
        assert_eq!(DataType::Any, DataType::Any);
        assert_eq!(DataType::Error, DataType::Error);
    }

    #[test]
    fn free_type_variables_recurses_through_function() {
        let t = DataType::Function {
            args: vec![DataType::TypeVariable("T".into())],
            ret: Box::new(DataType::Pointer(Box::new(DataType::TypeVariable("U".into())))),
            varargs: false,
        };
        let fvs = t.free_type_variables();
        assert!(fvs.contains("T"));
        assert!(fvs.contains("U"));
        assert_eq!(fvs.len(), 2);
    }

    #[test]
    fn substitute_rewrites_nested_type_variables() {
        let t = DataType::Pointer(Box::new(DataType::TypeVariable("T".into())));
        let mut subst = std::collections::HashMap::new();
        subst.insert("T".to_string(), DataType::INT64);
        assert_eq!(t.substitute(&subst), DataType::Pointer(Box::new(DataType::INT64)));
    }
}
