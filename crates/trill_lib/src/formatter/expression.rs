//! Expression pretty-printing.
//!
//! Every infix/prefix/ternary node is printed fully parenthesized rather
//! than with precedence-minimal parens. Re-parsing the printed output only
//! needs to yield a structurally equal AST, and unconditional
//! parenthesization guarantees that regardless of precedence-table details,
//! at the cost of noisier output.

use std::fmt::Write as _;

use crate::lexer::token::StringSegment;
use crate::parser::ast::{Argument, ExprKind, ExprNode};

use super::context::{Format, FormatterContext};

impl Format for ExprNode {
    fn format(&self, ctx: &mut FormatterContext) -> std::fmt::Result {
        self.kind.format(ctx)
    }
}

fn format_string_segments(segments: &[StringSegment], ctx: &mut FormatterContext) -> std::fmt::Result {
    ctx.write("\"")?;
    for seg in segments {
        match seg {
            StringSegment::Literal(s) => {
                for c in s.chars() {
                    match c {
                        '\n' => ctx.write("\\n")?,
                        '\t' => ctx.write("\\t")?,
                        '\r' => ctx.write("\\r")?,
                        '"' => ctx.write("\\\"")?,
                        '\\' => ctx.write("\\\\")?,
                        c => ctx.output.write_char(c).map_err(|_| std::fmt::Error)?,
                    }
                }
            }
            StringSegment::Interpolation(tokens) => {
                ctx.write("\\(")?;
                ctx.write(&crate::lexer::token::render_tokens(tokens))?;
                ctx.write(")")?;
            }
        }
    }
    ctx.write("\"")
}

impl Format for ExprKind {
    fn format(&self, ctx: &mut FormatterContext) -> std::fmt::Result {
        match self {
            ExprKind::IntegerLiteral(raw) => ctx.write(raw),
            ExprKind::FloatingLiteral(raw) => ctx.write(raw),
            ExprKind::StringLiteral(segments) => format_string_segments(segments, ctx),
            ExprKind::CharLiteral(c) => write!(ctx.output, "'{}'", c),
            ExprKind::BoolLiteral(b) => ctx.write(if *b { "true" } else { "false" }),
            ExprKind::NilLiteral => ctx.write("nil"),
            ExprKind::VoidLiteral => ctx.write("void"),
            ExprKind::PoundLiteral(kind) => {
                use crate::parser::ast::PoundLiteralKind::*;
                ctx.write(match kind {
                    File => "#file",
                    Line => "#line",
                    Function => "#function",
                })
            }
            ExprKind::VariableRef { name, .. } => ctx.write(name.as_str()),
            ExprKind::PropertyRef { base, name, .. } => {
                base.format(ctx)?;
                ctx.write(".")?;
                ctx.write(name.as_str())
            }
            ExprKind::Tuple(items) => {
                ctx.write("(")?;
                ctx.write_separated(items, ", ", |ctx, e| e.format(ctx))?;
                ctx.write(")")
            }
            ExprKind::Array(items) => {
                ctx.write("[")?;
                ctx.write_separated(items, ", ", |ctx, e| e.format(ctx))?;
                ctx.write("]")
            }
            ExprKind::TupleFieldLookup { base, index } => {
                base.format(ctx)?;
                write!(ctx.output, ".{index}")
            }
            ExprKind::Paren(inner) => {
                ctx.write("(")?;
                inner.format(ctx)?;
                ctx.write(")")
            }
            ExprKind::Subscript { base, index } => {
                base.format(ctx)?;
                ctx.write("[")?;
                index.format(ctx)?;
                ctx.write("]")
            }
            ExprKind::Call { callee, args, .. } => {
                callee.format(ctx)?;
                ctx.write("(")?;
                ctx.write_separated(args, ", ", |ctx, a| a.format(ctx))?;
                ctx.write(")")
            }
            ExprKind::Closure { params, ret, body, .. } => {
                ctx.write("func (")?;
                ctx.write_separated(params, ", ", |ctx, p| {
                    if let Some(label) = &p.label {
                        ctx.write(label.as_str())?;
                        ctx.write(" ")?;
                    }
                    ctx.write(p.name.as_str())?;
                    ctx.write(": ")?;
                    ctx.write(&p.type_name.to_string())
                })?;
                ctx.write(")")?;
                if let Some(ret) = ret {
                    ctx.write(" -> ")?;
                    ctx.write(&ret.to_string())?;
                }
                ctx.write(" {")?;
                ctx.write_newline()?;
                ctx.with_indent(|ctx| super::statement::format_block_body(body, ctx))?;
                ctx.write_indent()?;
                ctx.write("}")
            }
            ExprKind::Prefix { op, operand, .. } => {
                ctx.write("(")?;
                ctx.write(op)?;
                operand.format(ctx)?;
                ctx.write(")")
            }
            ExprKind::Infix { op, lhs, rhs, .. } => {
                ctx.write("(")?;
                lhs.format(ctx)?;
                ctx.write(" ")?;
                ctx.write(op)?;
                ctx.write(" ")?;
                rhs.format(ctx)?;
                ctx.write(")")
            }
            ExprKind::Ternary { cond, then_branch, else_branch } => {
                ctx.write("(")?;
                cond.format(ctx)?;
                ctx.write(" ? ")?;
                then_branch.format(ctx)?;
                ctx.write(" : ")?;
                else_branch.format(ctx)?;
                ctx.write(")")
            }
            ExprKind::Coercion { expr, target } => {
                ctx.write("(")?;
                expr.format(ctx)?;
                ctx.write(" as ")?;
                ctx.write(&target.to_string())?;
                ctx.write(")")
            }
            ExprKind::IsCheck { expr, target } => {
                ctx.write("(")?;
                expr.format(ctx)?;
                ctx.write(" is ")?;
                ctx.write(&target.to_string())?;
                ctx.write(")")
            }
            ExprKind::Sizeof(t) => write!(ctx.output, "sizeof({t})"),
        }
    }
}

impl Format for Argument {
    fn format(&self, ctx: &mut FormatterContext) -> std::fmt::Result {
        if let Some(label) = &self.label {
            ctx.write(label.as_str())?;
            ctx.write(": ")?;
        }
        self.value.format(ctx)
    }
}
