use serde::Serialize;
use serde_json::{json, Value};

use crate::cli::OutputFormat;

/// Output a success message in the appropriate format
pub fn output_success(output_format: OutputFormat, message: &str, data: Option<Value>) -> anyhow::Result<()> {
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

/// Output a single record: pretty JSON, or `key: value` lines for text
pub fn output_record<T: Serialize>(output_format: OutputFormat, item_type: &str, record: &T) -> anyhow::Result<()> {
    let value = serde_json::to_value(record)?;
    match output_format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&json!({ item_type: value }))?);
        }
        OutputFormat::Text => {
            println!("{}", item_type);
            print_fields(&value, "  ");
        }
    }
    Ok(())
}

/// Output a collection; text mode prints one summary line per item
pub fn output_list<T: Serialize>(
    output_format: OutputFormat,
    collection_name: &str,
    items: &[T],
    summary: impl Fn(&T) -> String,
) -> anyhow::Result<()> {
    match output_format {
        OutputFormat::Json => {
            let values = serde_json::to_value(items)?;
            println!("{}", serde_json::to_string_pretty(&json!({ collection_name: values }))?);
        }
        OutputFormat::Text => {
            if items.is_empty() {
                println!("No {} found", collection_name);
            }
            for item in items {
                println!("{}", summary(item));
            }
        }
    }
    Ok(())
}

fn print_fields(value: &Value, indent: &str) {
    match value {
        Value::Object(map) => {
            for (key, field) in map {
                match field {
                    Value::Object(_) | Value::Array(_) => {
                        println!("{}{}:", indent, key);
                        print_fields(field, &format!("{}  ", indent));
                    }
                    Value::String(s) => println!("{}{}: {}", indent, key, s),
                    Value::Null => println!("{}{}: -", indent, key),
                    other => println!("{}{}: {}", indent, key, other),
                }
            }
        }
        Value::Array(items) => {
            for (i, item) in items.iter().enumerate() {
                println!("{}[{}]", indent, i);
                print_fields(item, &format!("{}  ", indent));
            }
        }
        other => println!("{}{}", indent, other),
    }
}

/// Parse `1,2,-,0` into answers; `-` or an empty slot leaves a question unanswered
pub fn parse_answers(raw: &str) -> anyhow::Result<Vec<Option<i32>>> {
    raw.split(',')
        .map(|part| match part.trim() {
            "" | "-" => Ok(None),
            n => n
                .parse::<i32>()
                .map(Some)
                .map_err(|_| anyhow::anyhow!("invalid answer '{}': expected a choice index or '-'", n)),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_answers_with_blanks() {
        assert_eq!(parse_answers("1,-,0,").unwrap(), vec![Some(1), None, Some(0), None]);
        assert_eq!(parse_answers(" 2 ").unwrap(), vec![Some(2)]);
        assert!(parse_answers("1,b").is_err());
    }
}
