use clap::Args;
use serde::Serialize;
use serde_json::{json, Map, Value};

use crate::cli::OutputFormat;
use crate::database::{ListOptions, Page};
use crate::error::AppError;

/// Paging flags shared by the list commands
#[derive(Args, Debug, Clone, Default)]
pub struct ListArgs {
    #[arg(long, help = "Page number (starts at 1)")]
    pub page: Option<u32>,

    #[arg(long, help = "Page size")]
    pub size: Option<u32>,

    #[arg(long = "order-field", value_delimiter = ',', help = "Columns to order by, comma separated")]
    pub order_field: Vec<String>,

    #[arg(long = "order-type", value_delimiter = ',', help = "asc/desc per order column, comma separated")]
    pub order_type: Vec<String>,

    #[arg(long = "query", help = "Filter as column[__op]=value, repeatable")]
    pub query: Vec<String>,
}

impl ListArgs {
    pub fn into_list_options(self) -> anyhow::Result<ListOptions> {
        let query = parse_query_pairs(&self.query)?;
        Ok(ListOptions {
            page: self.page,
            size: self.size,
            order_field: Some(self.order_field).filter(|f| !f.is_empty()),
            order_type: Some(self.order_type).filter(|t| !t.is_empty()),
            query: Some(query).filter(|q| !q.is_empty()),
        })
    }
}

/// Parse `key=value` pairs. Values that read as JSON (numbers, booleans, arrays, null) keep that type.
pub fn parse_query_pairs(pairs: &[String]) -> anyhow::Result<Map<String, Value>> {
    let mut query = Map::new();
    for pair in pairs {
        let (key, raw) = pair
            .split_once('=')
            .ok_or_else(|| AppError::invalid_input(format!("Expected key=value, got '{}'", pair)))?;
        let key = key.trim();
        if key.is_empty() {
            return Err(AppError::invalid_input(format!("Missing key in '{}'", pair)).into());
        }
        let value = serde_json::from_str::<Value>(raw)
            .ok()
            .filter(|v| !v.is_object() && !v.is_string())
            .unwrap_or_else(|| Value::String(raw.to_string()));
        query.insert(key.to_string(), value);
    }
    Ok(query)
}

/// Output a success message in the appropriate format
pub fn output_success(output_format: &OutputFormat, message: &str, data: Option<Value>) -> anyhow::Result<()> {
    match output_format {
        OutputFormat::Json => {
            let mut response = json!({
                "success": true,
                "message": message
            });

            if let (Some(Value::Object(extra)), Value::Object(body)) = (data, &mut response) {
                body.extend(extra);
            }

            println!("{}", serde_json::to_string_pretty(&response)?);
        }
        OutputFormat::Text => {
            println!("✓ {}", message);
        }
    }
    Ok(())
}

/// Output a single record: pretty JSON, or one `key: value` line per field
pub fn output_record<T: Serialize>(output_format: &OutputFormat, record: &T) -> anyhow::Result<()> {
    let value = serde_json::to_value(record)?;
    match output_format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&value)?),
        OutputFormat::Text => {
            if let Value::Object(fields) = &value {
                for (key, field) in fields {
                    println!("{:<16} {}", format!("{}:", key), display_value(field));
                }
            } else {
                println!("{}", display_value(&value));
            }
        }
    }
    Ok(())
}

/// Output a page of records. `row` renders one text line per record.
pub fn output_page<T, F>(output_format: &OutputFormat, header: &str, page: &Page<T>, row: F) -> anyhow::Result<()>
where
    T: Serialize,
    F: Fn(&T) -> String,
{
    match output_format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(page)?),
        OutputFormat::Text => {
            if page.data.is_empty() {
                println!("No records found");
            } else {
                println!("{}", header);
                println!("{}", "-".repeat(header.len().max(40)));
                for record in &page.data {
                    println!("{}", row(record));
                }
            }
            let p = &page.pagination;
            println!(
                "\nPage {}/{} ({} on page, {} matching, {} total)",
                p.page,
                p.total_pages.max(1),
                p.page_count,
                p.total_count,
                p.all_count
            );
        }
    }
    Ok(())
}

/// Output a plain list of records
pub fn output_list<T, F>(output_format: &OutputFormat, collection_name: &str, items: &[T], row: F) -> anyhow::Result<()>
where
    T: Serialize,
    F: Fn(&T) -> String,
{
    match output_format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&json!({ collection_name: items }))?);
        }
        OutputFormat::Text => {
            if items.is_empty() {
                println!("No {} found", collection_name);
            }
            for item in items {
                println!("{}", row(item));
            }
        }
    }
    Ok(())
}

/// Report a failed command. Service errors keep their code in JSON mode.
pub fn output_failure(output_format: &OutputFormat, err: &anyhow::Error) {
    match output_format {
        OutputFormat::Json => {
            let body = match err.downcast_ref::<AppError>() {
                Some(app_err) => app_err.to_json(),
                None => AppError::internal(err.to_string()).to_json(),
            };
            println!("{}", serde_json::to_string_pretty(&body).unwrap_or_else(|_| body.to_string()));
        }
        OutputFormat::Text => match std::env::var("CLI_VERBOSE").as_deref() {
            Ok("true") | Ok("1") => eprintln!("Error: {err:?}"),
            _ => eprintln!("Error: {err}"),
        },
    }
}

fn display_value(value: &Value) -> String {
    match value {
        Value::Null => "-".to_string(),
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn query_pairs_keep_json_scalars() {
        let pairs = vec![
            "title__icontains=milk".to_string(),
            "id__in=[1,2]".to_string(),
            "active=true".to_string(),
            "ref_id=null".to_string(),
            "content=a=b".to_string(),
        ];
        let query = parse_query_pairs(&pairs).unwrap();
        assert_eq!(query["title__icontains"], json!("milk"));
        assert_eq!(query["id__in"], json!([1, 2]));
        assert_eq!(query["active"], json!(true));
        assert_eq!(query["ref_id"], Value::Null);
        assert_eq!(query["content"], json!("a=b"));
    }

    #[test]
    fn malformed_pairs_are_invalid_input() {
        let err = parse_query_pairs(&["title".to_string()]).unwrap_err();
        assert_eq!(err.downcast_ref::<AppError>().map(|e| e.error_code()), Some("INVALID_INPUT"));
        assert!(parse_query_pairs(&["=x".to_string()]).is_err());
    }

    #[test]
    fn list_args_drop_empty_parts() {
        let options = ListArgs { page: Some(2), ..Default::default() }.into_list_options().unwrap();
        assert_eq!(options.page, Some(2));
        assert!(options.order_field.is_none());
        assert!(options.query.is_none());
    }
}
