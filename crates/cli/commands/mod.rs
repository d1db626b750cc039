pub mod dashboard;
pub mod repair;
pub mod scheduled_repair;

use serde::Serialize;

use crate::args::OutputFormat;

/// Prints `value` as JSON, or runs `text` to print it for humans.
pub fn emit<T: Serialize>(format: OutputFormat, value: &T, text: impl FnOnce(&T)) -> anyhow::Result<()> {
    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(value)?),
        OutputFormat::Text => text(value),
    }
    Ok(())
}
