//! Syntactic type annotations, as written by the programmer. Resolved into
//! `sema::types::DataType` by `Context::resolve_type_name` once declarations
//! are registered.

use crate::source::SourceRange;

#[derive(Debug, Clone, PartialEq)]
pub enum TypeName {
    /// A bare name: a primitive keyword (`Int64`), a user type, or a
    /// generic parameter in scope.
    Name(String, SourceRange),
    Pointer(Box<TypeName>, SourceRange),
    Array(Box<TypeName>, Option<u64>, SourceRange),
    Tuple(Vec<TypeName>, SourceRange),
    Function { args: Vec<TypeName>, ret: Box<TypeName>, varargs: bool, range: SourceRange },
    /// `Name<Arg1, Arg2>` generic instantiation.
    Generic(String, Vec<TypeName>, SourceRange),
}

impl TypeName {
    pub fn range(&self) -> SourceRange {
        match self {
            TypeName::Name(_, r)
            | TypeName::Pointer(_, r)
            | TypeName::Array(_, _, r)
            | TypeName::Tuple(_, r)
            | TypeName::Function { range: r, .. }
            | TypeName::Generic(_, _, r) => *r,
        }
    }
}

impl std::fmt::Display for TypeName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TypeName::Name(n, _) => write!(f, "{n}"),
            TypeName::Pointer(inner, _) => write!(f, "*{inner}"),
            TypeName::Array(inner, Some(len), _) => write!(f, "[{inner}; {len}]"),
            TypeName::Array(inner, None, _) => write!(f, "[{inner}]"),
            TypeName::Tuple(fields, _) => {
                write!(f, "(")?;
                for (i, t) in fields.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{t}")?;
                }
                write!(f, ")")
            }
            TypeName::Function { args, ret, varargs, .. } => {
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
            TypeName::Generic(name, args, _) => {
                write!(f, "{name}<")?;
                for (i, a) in args.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{a}")?;
                }
                write!(f, ">")
            }
        }
    }
}
