//! Terminal output helpers.

use console::Style;

/// Process exit codes for conditions other than "leaks found" (that one
/// is operator-configurable).
pub mod exit {
    /// An unrecoverable error occurred.
    pub const ERROR: i32 = 2;
}

/// Red - errors.
pub fn error_style() -> Style {
    Style::new().red().bold()
}

/// Prints an error message to stderr with a styled prefix.
pub fn print_error(message: &str) {
    eprintln!("{} {message}", error_style().apply_to("error:"));
}
