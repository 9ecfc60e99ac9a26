use serde::Serialize;
use serde_json::json;

use crate::cli::OutputFormat;

/// Print a success message, with the affected record attached in JSON mode
pub fn output_success<T: Serialize>(output_format: OutputFormat, message: &str, data: &T) -> anyhow::Result<()> {
    match output_format {
        OutputFormat::Json => {
            let response = json!({
                "success": true,
                "message": message,
                "data": data,
            });
            println!("{}", serde_json::to_string_pretty(&response)?);
        }
        OutputFormat::Text => {
            println!("✓ {}", message);
        }
    }
    Ok(())
}

/// Print a table in text mode, or the raw rows in JSON mode
pub fn output_rows<T: Serialize>(
    output_format: OutputFormat,
    rows: &[T],
    header: &str,
    line: impl Fn(&T) -> String,
) -> anyhow::Result<()> {
    match output_format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&json!({ "success": true, "data": rows }))?);
        }
        OutputFormat::Text => {
            if rows.is_empty() {
                println!("No results");
                return Ok(());
            }
            println!("{}", header);
            println!("{}", "-".repeat(header.len()));
            for row in rows {
                println!("{}", line(row));
            }
        }
    }
    Ok(())
}
