//! Semantic analysis: registration, constraint generation/solving, overload
//! resolution and post-solve type checking.

pub mod analyzer;
pub mod constraint;
pub mod context;
pub mod error;
pub mod overload;
pub mod scope;
pub mod solver;
pub mod typecheck;
pub mod types;

pub use analyzer::Analyzer;
pub use context::{ASTContext, MatchRank, Mutability};
pub use error::SemaError;
pub use scope::Scope;
pub use types::{DataType, FloatKind};
