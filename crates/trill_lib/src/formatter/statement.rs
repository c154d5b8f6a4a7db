//! Statement and declaration pretty-printing: one line per statement,
//! brace-on-same-line blocks, 4-space indent.

use crate::parser::ast::{
    DeclNode, ExtensionDecl, FunctionDecl, FunctionKind, GenericParamDecl, ModifierSet, ProtocolDecl,
    ProtocolMember, PropertyAccessor, PropertyDecl, StmtKind, StmtNode, TypeAliasDecl, TypeDecl, TypeMember,
    VariableDecl,
};

use super::context::{Format, FormatterContext};

pub fn format_block_body(stmts: &[StmtNode], ctx: &mut FormatterContext) -> std::fmt::Result {
    for stmt in stmts {
        stmt.format(ctx)?;
    }
    Ok(())
}

fn format_block(stmts: &[StmtNode], ctx: &mut FormatterContext) -> std::fmt::Result {
    ctx.write("{")?;
    ctx.write_newline()?;
    ctx.with_indent(|ctx| format_block_body(stmts, ctx))?;
    ctx.write_indent()?;
    ctx.write("}")
}

fn format_generics(generics: &[GenericParamDecl], ctx: &mut FormatterContext) -> std::fmt::Result {
    if generics.is_empty() {
        return Ok(());
    }
    ctx.write("<")?;
    ctx.write_separated(generics, ", ", |ctx, g| {
        ctx.write(g.name.as_str())?;
        if !g.bounds.is_empty() {
            ctx.write(": ")?;
            ctx.write_separated(&g.bounds, " & ", |ctx, b| ctx.write(b.as_str()))?;
        }
        Ok(())
    })?;
    ctx.write(">")
}

fn format_modifiers(modifiers: &ModifierSet, ctx: &mut FormatterContext) -> std::fmt::Result {
    if modifiers.foreign {
        ctx.write("foreign ")?;
    }
    if modifiers.is_static {
        ctx.write("static ")?;
    }
    if modifiers.mutating {
        ctx.write("mutating ")?;
    }
    if modifiers.indirect {
        ctx.write("indirect ")?;
    }
    if modifiers.noreturn {
        ctx.write("noreturn ")?;
    }
    if modifiers.implicit {
        ctx.write("implicit ")?;
    }
    Ok(())
}

impl Format for StmtNode {
    fn format(&self, ctx: &mut FormatterContext) -> std::fmt::Result {
        self.kind.format(ctx)
    }
}

impl Format for StmtKind {
    fn format(&self, ctx: &mut FormatterContext) -> std::fmt::Result {
        match self {
            StmtKind::Block { statements, .. } => {
                ctx.write_indent()?;
                format_block(statements, ctx)?;
                ctx.write_newline()
            }
            StmtKind::IfChain { branches, else_branch } => {
                ctx.write_indent()?;
                for (i, (cond, body)) in branches.iter().enumerate() {
                    if i > 0 {
                        ctx.write("else ")?;
                    }
                    ctx.write("if ")?;
                    cond.format(ctx)?;
                    ctx.write(" ")?;
                    format_block(body, ctx)?;
                    ctx.write(" ")?;
                }
                if let Some(else_body) = else_branch {
                    ctx.write("else ")?;
                    format_block(else_body, ctx)?;
                }
                ctx.write_newline()
            }
            StmtKind::While { cond, body } => {
                ctx.write_indent()?;
                ctx.write("while ")?;
                cond.format(ctx)?;
                ctx.write(" ")?;
                format_block(body, ctx)?;
                ctx.write_newline()
            }
            StmtKind::For { init, cond, step, body } => {
                ctx.write_indent()?;
                ctx.write("for (")?;
                if let Some(init) = init {
                    init.kind.format_inline(ctx)?;
                }
                ctx.write("; ")?;
                if let Some(cond) = cond {
                    cond.format(ctx)?;
                }
                ctx.write("; ")?;
                if let Some(step) = step {
                    step.kind.format_inline(ctx)?;
                }
                ctx.write(") ")?;
                format_block(body, ctx)?;
                ctx.write_newline()
            }
            StmtKind::Switch { scrutinee, cases } => {
                ctx.write_indent()?;
                ctx.write("switch ")?;
                scrutinee.format(ctx)?;
                ctx.write(" {")?;
                ctx.write_newline()?;
                ctx.with_indent(|ctx| {
                    for case in cases {
                        ctx.write_indent()?;
                        match &case.pattern {
                            Some(pat) => {
                                ctx.write("case ")?;
                                pat.format(ctx)?;
                            }
                            None => ctx.write("default")?,
                        }
                        ctx.write(": ")?;
                        format_block(&case.body, ctx)?;
                        ctx.write_newline()?;
                    }
                    Ok(())
                })?;
                ctx.write_indent()?;
                ctx.write("}")?;
                ctx.write_newline()
            }
            StmtKind::Break => {
                ctx.write_indent()?;
                ctx.write("break")?;
                ctx.write_newline()
            }
            StmtKind::Continue => {
                ctx.write_indent()?;
                ctx.write("continue")?;
                ctx.write_newline()
            }
            StmtKind::Return(value) => {
                ctx.write_indent()?;
                ctx.write("return")?;
                if let Some(v) = value {
                    ctx.write(" ")?;
                    v.format(ctx)?;
                }
                ctx.write_newline()
            }
            StmtKind::ExprStmt(expr) => {
                ctx.write_indent()?;
                expr.format(ctx)?;
                ctx.write_newline()
            }
            StmtKind::DeclStmt(decl) => {
                decl.format(ctx)?;
                ctx.write_newline()
            }
            StmtKind::PoundDiagnostic { is_error, message } => {
                ctx.write_indent()?;
                ctx.write(if *is_error { "#error(\"" } else { "#warning(\"" })?;
                ctx.write(message)?;
                ctx.write("\")")?;
                ctx.write_newline()
            }
        }
    }
}

impl StmtKind {
    /// Inline rendering used for `for (init; cond; step)` clauses, which
    /// have no statement terminator of their own.
    fn format_inline(&self, ctx: &mut FormatterContext) -> std::fmt::Result {
        match self {
            StmtKind::ExprStmt(e) => e.format(ctx),
            StmtKind::DeclStmt(d) => d.format_inline(ctx),
            other => other.format(ctx),
        }
    }
}

impl Format for VariableDecl {
    fn format(&self, ctx: &mut FormatterContext) -> std::fmt::Result {
        format_modifiers(&self.modifiers, ctx)?;
        ctx.write(if self.is_mutable { "var " } else { "let " })?;
        ctx.write(self.name.as_str())?;
        if let Some(t) = &self.type_name {
            ctx.write(": ")?;
            ctx.write(&t.to_string())?;
        }
        if let Some(init) = &self.initializer {
            ctx.write(" = ")?;
            init.format(ctx)?;
        }
        Ok(())
    }
}

impl Format for FunctionDecl {
    fn format(&self, ctx: &mut FormatterContext) -> std::fmt::Result {
        ctx.write_indent()?;
        format_modifiers(&self.modifiers, ctx)?;
        match self.kind {
            FunctionKind::Init => ctx.write("init")?,
            FunctionKind::Deinit => ctx.write("deinit")?,
            FunctionKind::Subscript => ctx.write("subscript")?,
            FunctionKind::Operator => {
                ctx.write("func ")?;
                ctx.write(self.name.as_str())?;
            }
            FunctionKind::Free | FunctionKind::Method => {
                ctx.write("func ")?;
                ctx.write(self.name.as_str())?;
            }
        }
        format_generics(&self.generics, ctx)?;
        ctx.write("(")?;
        ctx.write_separated(&self.params, ", ", |ctx, p| {
            if let Some(label) = &p.label {
                ctx.write(label.as_str())?;
                ctx.write(" ")?;
            }
            ctx.write(p.name.as_str())?;
            ctx.write(": ")?;
            ctx.write(&p.type_name.to_string())?;
            if let Some(default) = &p.default_value {
                ctx.write(" = ")?;
                default.format(ctx)?;
            }
            Ok(())
        })?;
        if self.has_varargs {
            if !self.params.is_empty() {
                ctx.write(", ")?;
            }
            ctx.write("...")?;
        }
        ctx.write(")")?;
        if let Some(ret) = &self.ret {
            ctx.write(" -> ")?;
            ctx.write(&ret.to_string())?;
        }
        match &self.body {
            Some(body) => {
                ctx.write(" ")?;
                format_block(body, ctx)?;
                ctx.write_newline()
            }
            None => {
                ctx.write_newline()
            }
        }
    }
}

fn format_type_member(member: &TypeMember, ctx: &mut FormatterContext) -> std::fmt::Result {
    match member {
        TypeMember::Property(p) => p.format(ctx),
        TypeMember::Function(f) => f.format(ctx),
    }
}

impl Format for PropertyDecl {
    fn format(&self, ctx: &mut FormatterContext) -> std::fmt::Result {
        ctx.write_indent()?;
        format_modifiers(&self.modifiers, ctx)?;
        ctx.write(if self.is_mutable { "var " } else { "let " })?;
        ctx.write(self.name.as_str())?;
        if let Some(t) = &self.type_name {
            ctx.write(": ")?;
            ctx.write(&t.to_string())?;
        }
        match &self.accessor {
            PropertyAccessor::Stored { initializer: Some(init) } => {
                ctx.write(" = ")?;
                init.format(ctx)?;
                ctx.write_newline()
            }
            PropertyAccessor::Stored { initializer: None } => ctx.write_newline(),
            PropertyAccessor::Computed { getter, setter } => {
                ctx.write(" {")?;
                ctx.write_newline()?;
                ctx.with_indent(|ctx| {
                    ctx.write_indent()?;
                    ctx.write("get ")?;
                    format_block(getter, ctx)?;
                    ctx.write_newline()?;
                    if let Some((name, body)) = setter {
                        ctx.write_indent()?;
                        ctx.write("set(")?;
                        ctx.write(name.as_str())?;
                        ctx.write(") ")?;
                        format_block(body, ctx)?;
                        ctx.write_newline()?;
                    }
                    Ok(())
                })?;
                ctx.write_indent()?;
                ctx.write("}")?;
                ctx.write_newline()
            }
        }
    }
}

impl Format for TypeDecl {
    fn format(&self, ctx: &mut FormatterContext) -> std::fmt::Result {
        ctx.write_indent()?;
        format_modifiers(&self.modifiers, ctx)?;
        ctx.write("type ")?;
        ctx.write(self.name.as_str())?;
        format_generics(&self.generics, ctx)?;
        if !self.conforms_to.is_empty() {
            ctx.write(": ")?;
            ctx.write_separated(&self.conforms_to, ", ", |ctx, p| ctx.write(p.as_str()))?;
        }
        ctx.write(" {")?;
        ctx.write_newline()?;
        ctx.with_indent(|ctx| {
            for member in &self.members {
                format_type_member(member, ctx)?;
            }
            Ok(())
        })?;
        ctx.write_indent()?;
        ctx.write("}")?;
        ctx.write_newline()
    }
}

impl Format for ExtensionDecl {
    fn format(&self, ctx: &mut FormatterContext) -> std::fmt::Result {
        ctx.write_indent()?;
        ctx.write("extension ")?;
        ctx.write(self.target.as_str())?;
        if !self.conforms_to.is_empty() {
            ctx.write(": ")?;
            ctx.write_separated(&self.conforms_to, ", ", |ctx, p| ctx.write(p.as_str()))?;
        }
        ctx.write(" {")?;
        ctx.write_newline()?;
        ctx.with_indent(|ctx| {
            for member in &self.members {
                format_type_member(member, ctx)?;
            }
            Ok(())
        })?;
        ctx.write_indent()?;
        ctx.write("}")?;
        ctx.write_newline()
    }
}

impl Format for ProtocolDecl {
    fn format(&self, ctx: &mut FormatterContext) -> std::fmt::Result {
        ctx.write_indent()?;
        ctx.write("protocol ")?;
        ctx.write(self.name.as_str())?;
        if !self.inherits.is_empty() {
            ctx.write(": ")?;
            ctx.write_separated(&self.inherits, ", ", |ctx, p| ctx.write(p.as_str()))?;
        }
        ctx.write(" {")?;
        ctx.write_newline()?;
        ctx.with_indent(|ctx| {
            for member in &self.members {
                ctx.write_indent()?;
                match member {
                    ProtocolMember::Property { name, type_name, is_mutable } => {
                        ctx.write(if *is_mutable { "var " } else { "let " })?;
                        ctx.write(name.as_str())?;
                        ctx.write(": ")?;
                        ctx.write(&type_name.to_string())?;
                        ctx.write_newline()?;
                    }
                    ProtocolMember::Function { name, params, ret, default_body, .. } => {
                        ctx.write("func ")?;
                        ctx.write(name.as_str())?;
                        ctx.write("(")?;
                        ctx.write_separated(params, ", ", |ctx, p| {
                            ctx.write(p.name.as_str())?;
                            ctx.write(": ")?;
                            ctx.write(&p.type_name.to_string())
                        })?;
                        ctx.write(")")?;
                        if let Some(ret) = ret {
                            ctx.write(" -> ")?;
                            ctx.write(&ret.to_string())?;
                        }
                        match default_body {
                            Some(body) => {
                                ctx.write(" ")?;
                                format_block(body, ctx)?;
                                ctx.write_newline()?;
                            }
                            None => ctx.write_newline()?,
                        }
                    }
                }
            }
            Ok(())
        })?;
        ctx.write_indent()?;
        ctx.write("}")?;
        ctx.write_newline()
    }
}

impl Format for TypeAliasDecl {
    fn format(&self, ctx: &mut FormatterContext) -> std::fmt::Result {
        ctx.write_indent()?;
        ctx.write("type ")?;
        ctx.write(self.name.as_str())?;
        format_generics(&self.generics, ctx)?;
        ctx.write(" = ")?;
        ctx.write(&self.target.to_string())?;
        ctx.write_newline()
    }
}

impl Format for DeclNode {
    fn format(&self, ctx: &mut FormatterContext) -> std::fmt::Result {
        match self {
            DeclNode::Variable(d) => {
                ctx.write_indent()?;
                d.format(ctx)?;
                ctx.write_newline()
            }
            DeclNode::Param(p) => {
                ctx.write_indent()?;
                ctx.write(p.name.as_str())?;
                ctx.write(": ")?;
                ctx.write(&p.type_name.to_string())?;
                ctx.write_newline()
            }
            DeclNode::Property(d) => d.format(ctx),
            DeclNode::Function(d) => d.format(ctx),
            DeclNode::Type(d) => d.format(ctx),
            DeclNode::Extension(d) => d.format(ctx),
            DeclNode::Protocol(d) => d.format(ctx),
            DeclNode::TypeAlias(d) => d.format(ctx),
            DeclNode::Generic(g) => {
                ctx.write_indent()?;
                ctx.write(g.name.as_str())?;
                ctx.write_newline()
            }
        }
    }
}

impl DeclNode {
    /// Inline rendering with no trailing newline, for `for (decl-stmt; ...)`.
    fn format_inline(&self, ctx: &mut FormatterContext) -> std::fmt::Result {
        match self {
            DeclNode::Variable(d) => d.format(ctx),
            other => other.format(ctx),
        }
    }
}
