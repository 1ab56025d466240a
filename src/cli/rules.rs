//! Rules command implementation.

use super::CliError;
use hexcouncil::Rules;
use std::path::PathBuf;

/// Print a rule set as JSON: the stock rules, or `path` after loading it
/// with defaults filled in.
///
/// # Errors
///
/// Returns an error if the rules cannot be loaded or serialized.
pub(crate) fn execute(path: Option<PathBuf>) -> Result<(), CliError> {
    let rules = match path {
        Some(path) => Rules::load(&path)?,
        None => Rules::default(),
    };
    println!("{}", rules.to_json_string()?);
    Ok(())
}
