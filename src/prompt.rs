use crate::error::CliError;
use std::io::{BufRead, Write};

fn is_yes(answer: &str) -> bool {
    matches!(answer.trim().to_lowercase().as_str(), "y" | "yes")
}

/// Asks a yes/no question on stderr and reads the answer from stdin.
/// End of input counts as "no".
pub fn confirm(question: &str, assume_yes: bool) -> Result<bool, CliError> {
    if assume_yes {
        return Ok(true);
    }

    let mut stderr = std::io::stderr();
    write!(stderr, "{} [y/N] ", question)
        .and_then(|_| stderr.flush())
        .map_err(|e| CliError::io(format!("Cannot write prompt: {}", e)))?;

    let mut answer = String::new();
    std::io::stdin()
        .lock()
        .read_line(&mut answer)
        .map_err(|e| CliError::io(format!("Cannot read answer: {}", e)))?;

    Ok(is_yes(&answer))
}
