//! Styled stderr output.

use console::style;
use regval::{Diagnostic, Severity};

pub fn success(message: &str) {
    eprintln!("{} {}", style("✓").green().bold(), message);
}

pub fn error(message: &str) {
    eprintln!("{} {}", style("✗").red().bold(), message);
}

pub fn warning(message: &str) {
    eprintln!("{} {}", style("!").yellow().bold(), message);
}

pub fn dim(message: &str) {
    eprintln!("{}", style(message).dim());
}

pub fn diagnostic(diagnostic: &Diagnostic) {
    match diagnostic.severity() {
        Severity::Warning => warning(&diagnostic.to_string()),
        Severity::Error => error(&diagnostic.to_string()),
    }
}
