//! JSON output on stdout.

use serde::Serialize;

use crate::error::CliError;

/// Print `value` as pretty JSON on stdout.
///
/// # Errors
///
/// Returns an error if `value` cannot be serialized.
#[allow(clippy::print_stdout)]
pub fn print<T: Serialize + ?Sized>(value: &T) -> Result<(), CliError> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
