use crate::error::Result;
use std::io::Write;
use std::path::Path;

/// Append text to a file, creating it if it doesn't exist.
pub fn append_text(path: &Path, text: &str) -> Result<()> {
    let mut f = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)?;
    f.write_all(text.as_bytes())?;
    Ok(())
}

/// Record a step output in the `GITHUB_OUTPUT` file format (`name=value`).
///
/// Values containing a newline use the heredoc form with a delimiter that
/// does not occur in the value.
pub fn write_step_output(path: &Path, name: &str, value: &str) -> Result<()> {
    if !value.contains('\n') {
        return append_text(path, &format!("{name}={value}\n"));
    }
    let mut delimiter = String::from("ghadelimiter");
    while value.contains(&delimiter) {
        delimiter.push('_');
    }
    append_text(path, &format!("{name}<<{delimiter}\n{value}\n{delimiter}\n"))
}
