use serde_json::{json, Value};
use crate::cli::OutputFormat;

/// Output a success message in the appropriate format
pub fn output_success(
    output_format: &OutputFormat,
    message: &str,
    data: Option<Value>,
) -> anyhow::Result<()> {
    match output_format {
        OutputFormat::Json => {
            let mut response = json!({
                "success": true,
                "message": message
            });

            if let (Some(target), Some(Value::Object(extra))) = (response.as_object_mut(), data) {
                target.extend(extra);
            }

            println!("{}", serde_json::to_string_pretty(&response)?);
        }
        OutputFormat::Text => {
            println!("✓ {}", message);
        }
    }
    Ok(())
}

/// Output a list of strings: one per line, or a JSON array under `key`
pub fn output_list(output_format: &OutputFormat, key: &str, items: &[String]) -> anyhow::Result<()> {
    match output_format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&json!({ key: items }))?);
        }
        OutputFormat::Text => {
            if items.is_empty() {
                println!("(none)");
            }
            for item in items {
                println!("{}", item);
            }
        }
    }
    Ok(())
}
