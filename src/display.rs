use nova_quotas::{ApiResponse, QuotaSet, Value};

use crate::colors::*;

/// Render a quota set as an aligned table.
pub fn render_quota_set(title: &str, response: &ApiResponse<QuotaSet>) {
    println!();
    match response.body.id() {
        Some(id) => println!("{}{}{}{} {}({}){}", BOLD, CYAN, title, RESET, DIM, id, RESET),
        None => println!("{}{}{}{}", BOLD, CYAN, title, RESET),
    }

    let rows: Vec<(&String, &Value)> = response.body.iter().filter(|(k, _)| *k != "id").collect();
    if rows.is_empty() {
        println!("{}No quota information returned{}", DIM, RESET);
        return;
    }

    let width = rows.iter().map(|(k, _)| k.len()).max().unwrap_or(20).max(20);
    println!("{}{}{}", DIM, "─".repeat(width + 16), RESET);

    for (name, value) in rows {
        println!("  {:<width$}  {}", name, format_limit(value), width = width);
    }

    if let Some(request_id) = &response.request_id {
        println!();
        println!("{}request id: {}{}", DIM, request_id, RESET);
    }
    println!();
}

/// `-1` is the API's spelling of "no limit".
pub fn format_limit(value: &Value) -> String {
    match value {
        Value::Int(-1) => format!("{}unlimited{}", GREEN, RESET),
        Value::Int(n) => n.to_string(),
        other => format!("{}{}{}", YELLOW, other, RESET),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_limit() {
        assert_eq!(format_limit(&Value::Int(20)), "20");
        assert!(format_limit(&Value::Int(-1)).contains("unlimited"));
        assert!(format_limit(&Value::Text("n/a".to_string())).contains("n/a"));
    }
}
