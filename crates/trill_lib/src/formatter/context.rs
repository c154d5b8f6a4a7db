//! Output buffer + indentation tracking for the pretty-printer.
//!
//! A write/indent/dedent helper reduced to what this grammar's printer
//! actually needs.

use std::fmt::Write;

#[derive(Debug, Clone)]
pub struct FormatterContext {
    pub output: String,
    indent_level: usize,
    indent_string: String,
}

impl FormatterContext {
    pub fn new() -> Self {
        Self::with_indent_size(4)
    }

    pub fn with_indent_size(indent_size: usize) -> Self {
        FormatterContext { output: String::new(), indent_level: 0, indent_string: " ".repeat(indent_size) }
    }

    pub fn write(&mut self, text: &str) -> std::fmt::Result {
        self.output.write_str(text)
    }

    pub fn write_indent(&mut self) -> std::fmt::Result {
        for _ in 0..self.indent_level {
            self.write(&self.indent_string.clone())?;
        }
        Ok(())
    }

    pub fn indent(&mut self) {
        self.indent_level += 1;
    }

    pub fn dedent(&mut self) {
        if self.indent_level > 0 {
            self.indent_level -= 1;
        }
    }

    pub fn with_indent<F>(&mut self, f: F) -> std::fmt::Result
    where
        F: FnOnce(&mut Self) -> std::fmt::Result,
    {
        self.indent();
        let result = f(self);
        self.dedent();
        result
    }

    pub fn write_newline(&mut self) -> std::fmt::Result {
        self.write("\n")
    }

    pub fn write_separated<T, F>(&mut self, items: &[T], separator: &str, mut f: F) -> std::fmt::Result
    where
        F: FnMut(&mut Self, &T) -> std::fmt::Result,
    {
        for (i, item) in items.iter().enumerate() {
            if i > 0 {
                self.write(separator)?;
            }
            f(self, item)?;
        }
        Ok(())
    }
}

impl Default for FormatterContext {
    fn default() -> Self {
        Self::new()
    }
}

pub trait Format {
    fn format(&self, ctx: &mut FormatterContext) -> std::fmt::Result;
}
