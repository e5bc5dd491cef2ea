// rzpchat-core/src/format.rs

//! Renders tool results, docs answers and errors as Markdown.
//!
//! Results are dispatched on their JSON shape rather than on the tool that
//! produced them, in this order: payment-link card, order/payment table,
//! collection table, fenced JSON.

use chrono::{Local, TimeZone};
use serde_json::Value;
use std::fmt::Write as _;

use crate::docs::DocsAnswer;
use crate::errors::DispatchError;
use crate::extract::IdPrefix;
use crate::mcp::JsonRpcResponse;

/// Rows shown before a collection is truncated.
pub const MAX_COLLECTION_ROWS: usize = 10;

/// Minor units to a major-unit string: 50000 -> "500", 50050 -> "500.50".
pub fn display_amount(minor: u64) -> String {
    let (major, fraction) = (minor / 100, minor % 100);
    if fraction == 0 {
        major.to_string()
    } else {
        format!("{}.{:02}", major, fraction)
    }
}

fn currency_glyph(currency: &str) -> String {
    match currency.to_ascii_uppercase().as_str() {
        "INR" => "₹".to_string(),
        "USD" => "$".to_string(),
        "EUR" => "€".to_string(),
        "GBP" => "£".to_string(),
        other => format!("{} ", other),
    }
}

/// Formats an amount field with its currency glyph, `-` when absent.
pub fn display_money(amount: Option<&Value>, currency: Option<&str>) -> String {
    let glyph = currency_glyph(currency.unwrap_or("INR"));
    match amount.and_then(Value::as_i64) {
        Some(minor) if minor < 0 => format!("-{}{}", glyph, display_amount(minor.unsigned_abs())),
        Some(minor) => format!("{}{}", glyph, display_amount(minor as u64)),
        None => "-".to_string(),
    }
}

/// Unix seconds to a local date string, `-` when absent.
pub fn display_timestamp(value: Option<&Value>) -> String {
    value
        .and_then(Value::as_i64)
        .and_then(|secs| Local.timestamp_opt(secs, 0).single())
        .map(|dt| dt.format("%Y-%m-%d %H:%M").to_string())
        .unwrap_or_else(|| "-".to_string())
}

fn cell(value: &str) -> String {
    value.replace('|', "\\|").replace('\n', " ")
}

fn text_field<'a>(value: &'a Value, key: &str) -> Option<&'a str> {
    value.get(key).and_then(Value::as_str)
}

fn scalar_field(value: &Value, key: &str) -> Option<String> {
    match value.get(key)? {
        Value::String(s) => Some(s.clone()),
        Value::Null => None,
        other => Some(other.to_string()),
    }
}

fn is_payment_link(value: &Value) -> bool {
    text_field(value, "id").map_or(false, |id| id.starts_with(IdPrefix::PaymentLink.as_str()))
        && value.get("short_url").is_some()
}

fn is_order_or_payment(value: &Value) -> bool {
    matches!(text_field(value, "entity"), Some("order") | Some("payment"))
}

fn collection_items(value: &Value) -> Option<&Vec<Value>> {
    if text_field(value, "entity") != Some("collection") {
        return None;
    }
    value.get("items").and_then(Value::as_array)
}

/// Renders any tool result.
pub fn format_result(value: &Value) -> String {
    if is_payment_link(value) {
        format_payment_link(value)
    } else if is_order_or_payment(value) {
        format_entity_table(value)
    } else if let Some(items) = collection_items(value) {
        format_collection(items)
    } else {
        format_json(value)
    }
}

fn format_payment_link(link: &Value) -> String {
    let currency = text_field(link, "currency");
    let url = text_field(link, "short_url").unwrap_or("-");
    let mut out = String::from("**Payment link created**\n\n");
    let _ = writeln!(out, "[{}]({})\n", url, url);
    out.push_str("| Field | Value |\n|---|---|\n");
    let _ = writeln!(out, "| Amount | {} |", display_money(link.get("amount"), currency));
    let _ = writeln!(out, "| Status | {} |", cell(text_field(link, "status").unwrap_or("-")));
    let _ = writeln!(out, "| ID | `{}` |", text_field(link, "id").unwrap_or("-"));
    if let Some(reference) = text_field(link, "reference_id") {
        let _ = writeln!(out, "| Reference | `{}` |", reference);
    }
    out
}

fn format_entity_table(entity: &Value) -> String {
    let currency = text_field(entity, "currency");
    let kind = text_field(entity, "entity").unwrap_or("entity");
    let mut title = kind.to_string();
    if let Some(first) = title.get_mut(0..1) {
        first.make_ascii_uppercase();
    }

    let mut out = format!("**{}**\n\n| Field | Value |\n|---|---|\n", title);
    let _ = writeln!(out, "| ID | `{}` |", text_field(entity, "id").unwrap_or("-"));
    let _ = writeln!(out, "| Amount | {} |", display_money(entity.get("amount"), currency));
    for (key, label) in [("amount_due", "Amount due"), ("amount_paid", "Amount paid")] {
        if entity.get(key).is_some() {
            let _ = writeln!(out, "| {} | {} |", label, display_money(entity.get(key), currency));
        }
    }
    let _ = writeln!(out, "| Currency | {} |", currency.unwrap_or("-"));
    let _ = writeln!(out, "| Status | {} |", cell(text_field(entity, "status").unwrap_or("-")));
    for (key, label) in [("receipt", "Receipt"), ("method", "Method"), ("order_id", "Order")] {
        if let Some(value) = scalar_field(entity, key) {
            let _ = writeln!(out, "| {} | {} |", label, cell(&value));
        }
    }
    let _ = writeln!(out, "| Created | {} |", display_timestamp(entity.get("created_at")));
    out
}

fn format_collection(items: &[Value]) -> String {
    if items.is_empty() {
        return "No results found.".to_string();
    }
    let mut out = format!("**{} result{}**\n\n", items.len(), if items.len() == 1 { "" } else { "s" });
    out.push_str("| ID | Amount | Status | Created |\n|---|---|---|---|\n");
    for item in items.iter().take(MAX_COLLECTION_ROWS) {
        let amount = match item.get("amount") {
            Some(amount) if !amount.is_null() => display_money(Some(amount), text_field(item, "currency")),
            _ => "-".to_string(),
        };
        let _ = writeln!(
            out,
            "| `{}` | {} | {} | {} |",
            text_field(item, "id").unwrap_or("-"),
            amount,
            cell(text_field(item, "status").unwrap_or("-")),
            display_timestamp(item.get("created_at")),
        );
    }
    if items.len() > MAX_COLLECTION_ROWS {
        let _ = write!(out, "\n_...and {} more_\n", items.len() - MAX_COLLECTION_ROWS);
    }
    out
}

fn format_json(value: &Value) -> String {
    let pretty = serde_json::to_string_pretty(value).unwrap_or_else(|_| value.to_string());
    format!("```json\n{}\n```", pretty)
}

/// Renders a `tools/call` reply, unwrapping MCP `content` text blocks.
pub fn format_tool_response(response: &JsonRpcResponse) -> String {
    if let Some(err) = &response.error {
        return format!("**Razorpay error** (code {}): {}", err.code, err.message);
    }
    let Some(result) = &response.result else {
        return "_The server returned an empty response._".to_string();
    };
    let Some(content) = result.get("content").and_then(Value::as_array) else {
        return format_result(result);
    };

    let blocks: Vec<String> = content
        .iter()
        .filter_map(|block| text_field(block, "text"))
        .map(|text| match serde_json::from_str::<Value>(text) {
            Ok(json @ (Value::Object(_) | Value::Array(_))) => format_result(&json),
            _ => text.to_string(),
        })
        .collect();
    let body = if blocks.is_empty() {
        format_json(result)
    } else {
        blocks.join("\n\n")
    };

    if result.get("isError").and_then(Value::as_bool).unwrap_or(false) {
        format!("**Tool error:** {}", body)
    } else {
        body
    }
}

/// Bullet list from a `tools/list` result.
pub fn format_tool_list(result: &Value) -> String {
    let tools = result.get("tools").and_then(Value::as_array);
    let Some(tools) = tools.filter(|t| !t.is_empty()) else {
        return "The server reported no tools.".to_string();
    };
    let mut out = format!("**{} tools available**\n\n", tools.len());
    for tool in tools {
        let name = text_field(tool, "name").unwrap_or("?");
        match text_field(tool, "description").map(|d| d.lines().next().unwrap_or("")) {
            Some(desc) if !desc.is_empty() => {
                let _ = writeln!(out, "- `{}`: {}", name, desc);
            }
            _ => {
                let _ = writeln!(out, "- `{}`", name);
            }
        }
    }
    out
}

pub fn format_docs_answer(answer: &DocsAnswer) -> String {
    let mut out = if answer.answer.trim().is_empty() {
        "_No answer found in the documentation._".to_string()
    } else {
        answer.answer.trim().to_string()
    };
    if !answer.sources.is_empty() {
        out.push_str("\n\n**Sources**\n");
        for source in &answer.sources {
            let _ = match (&source.title, &source.url) {
                (Some(title), Some(url)) => writeln!(out, "- [{}]({})", title, url),
                (None, Some(url)) => writeln!(out, "- {}", url),
                (Some(title), None) => writeln!(out, "- {}", title),
                (None, None) => Ok(()),
            };
        }
    }
    out
}

/// Prompt asking the user for a missing argument.
pub fn format_need_input(tool: &str, missing: &str, message: Option<&str>) -> String {
    match message {
        Some(message) => format!("**Need more information for `{}`.** {}", tool, message),
        None => format!("**Need more information for `{}`:** please provide `{}`.", tool, missing),
    }
}

pub fn format_dispatch_error(err: &DispatchError) -> String {
    match err {
        DispatchError::Config(msg) => format!("**Configuration error:** {}", msg),
        DispatchError::Connection { endpoint, source } => {
            format!("**Could not reach** {}: {}", endpoint, source)
        }
        DispatchError::Timeout { endpoint, seconds } => {
            format!("**Timed out** after {}s waiting for {}.", seconds, endpoint)
        }
        DispatchError::Http {
            endpoint,
            status,
            snippet,
        } => format!("**HTTP {}** from {}:\n```\n{}\n```", status, endpoint, snippet),
        DispatchError::Parse { source, snippet } => {
            format!("**Unexpected response** ({}):\n```\n{}\n```", source, snippet)
        }
        DispatchError::Remote { code: Some(code), message } => {
            format!("**Razorpay error** (code {}): {}", code, message)
        }
        DispatchError::Remote { code: None, message } => format!("**Razorpay error:** {}", message),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::docs::DocsSource;
    use crate::mcp::JsonRpcError;
    use proptest::prelude::*;
    use serde_json::json;

    fn table_rows(text: &str) -> usize {
        text.lines().filter(|l| l.starts_with("| `")).count()
    }

    fn collection(n: usize) -> Value {
        let items: Vec<Value> = (0..n)
            .map(|i| json!({"id": format!("order_{:03}", i), "amount": 100 * i, "status": "paid", "created_at": 1_700_000_000}))
            .collect();
        json!({"entity": "collection", "count": n, "items": items})
    }

    #[test]
    fn test_display_amount() {
        assert_eq!(display_amount(50_000), "500");
        assert_eq!(display_amount(50_050), "500.50");
        assert_eq!(display_amount(5), "0.05");
        assert_eq!(display_amount(0), "0");
    }

    #[test]
    fn test_display_money() {
        assert_eq!(display_money(Some(&json!(50_000)), Some("INR")), "₹500");
        assert_eq!(display_money(Some(&json!(1_999)), Some("USD")), "$19.99");
        assert_eq!(display_money(Some(&json!(100)), Some("JPY")), "JPY 1");
        assert_eq!(display_money(None, Some("INR")), "-");
    }

    #[test]
    fn test_display_timestamp_missing() {
        assert_eq!(display_timestamp(None), "-");
        assert_eq!(display_timestamp(Some(&json!("yesterday"))), "-");
        assert_ne!(display_timestamp(Some(&json!(1_700_000_000))), "-");
    }

    #[test]
    fn test_payment_link_card() {
        let link = json!({
            "id": "plink_Abc123",
            "short_url": "https://rzp.io/i/abc",
            "amount": 50_000,
            "currency": "INR",
            "status": "created",
            "entity": "payment"
        });
        let out = format_result(&link);
        assert!(out.starts_with("**Payment link created**"));
        assert!(out.contains("[https://rzp.io/i/abc](https://rzp.io/i/abc)"));
        assert!(out.contains("₹500"));
        assert!(out.contains("`plink_Abc123`"));
    }

    #[test]
    fn test_order_table() {
        let order = json!({
            "id": "order_9A33XWu170gUtm",
            "entity": "order",
            "amount": 50_050,
            "amount_paid": 0,
            "amount_due": 50_050,
            "currency": "INR",
            "receipt": "rcpt_1",
            "status": "created",
            "created_at": 1_700_000_000
        });
        let out = format_result(&order);
        assert!(out.starts_with("**Order**"));
        assert!(out.contains("| Amount | ₹500.50 |"));
        assert!(out.contains("| Amount due | ₹500.50 |"));
        assert!(out.contains("| Amount paid | ₹0 |"));
        assert!(out.contains("| Receipt | rcpt_1 |"));
    }

    #[test]
    fn test_collection_truncates() {
        let out = format_result(&collection(15));
        assert_eq!(table_rows(&out), 10);
        assert!(out.contains("_...and 5 more_"));
        assert!(!out.contains("order_010"));
    }

    #[test]
    fn test_collection_missing_fields() {
        let out = format_result(&json!({"entity": "collection", "items": [{"id": "setl_1"}]}));
        assert!(out.contains("| `setl_1` | - | - | - |"));
        assert_eq!(format_result(&json!({"entity": "collection", "items": []})), "No results found.");
    }

    #[test]
    fn test_fallback_json() {
        let out = format_result(&json!({"entity": "customer", "id": "cust_1"}));
        assert!(out.starts_with("```json\n"));
        assert!(out.contains("\"cust_1\""));
    }

    #[test]
    fn test_tool_response_unwraps_text_content() {
        let response = JsonRpcResponse {
            jsonrpc: "2.0".into(),
            id: Some(json!(1)),
            result: Some(json!({"content": [
                {"type": "text", "text": "{\"entity\":\"order\",\"id\":\"order_1\",\"amount\":100,\"currency\":\"INR\",\"status\":\"paid\"}"},
                {"type": "text", "text": "Fetched successfully"}
            ]})),
            error: None,
        };
        let out = format_tool_response(&response);
        assert!(out.contains("| ID | `order_1` |"));
        assert!(out.ends_with("Fetched successfully"));
    }

    #[test]
    fn test_tool_response_errors() {
        let response = JsonRpcResponse {
            error: Some(JsonRpcError {
                code: -32000,
                message: "The id provided does not exist".into(),
                data: None,
            }),
            ..Default::default()
        };
        assert_eq!(
            format_tool_response(&response),
            "**Razorpay error** (code -32000): The id provided does not exist"
        );

        let tool_failure = JsonRpcResponse {
            result: Some(json!({"isError": true, "content": [{"type": "text", "text": "BAD_REQUEST_ERROR"}]})),
            ..Default::default()
        };
        assert_eq!(format_tool_response(&tool_failure), "**Tool error:** BAD_REQUEST_ERROR");
    }

    #[test]
    fn test_tool_list() {
        let out = format_tool_list(&json!({"tools": [
            {"name": "fetch_order", "description": "Fetch an order\nLong text"},
            {"name": "fetch_payment"}
        ]}));
        assert!(out.contains("- `fetch_order`: Fetch an order\n"));
        assert!(out.contains("- `fetch_payment`\n"));
        assert_eq!(format_tool_list(&json!({})), "The server reported no tools.");
    }

    #[test]
    fn test_docs_answer() {
        let answer = DocsAnswer {
            answer: "Use webhooks.".into(),
            sources: vec![DocsSource {
                title: Some("Webhooks".into()),
                url: Some("https://razorpay.com/docs/webhooks".into()),
            }],
        };
        let out = format_docs_answer(&answer);
        assert!(out.starts_with("Use webhooks."));
        assert!(out.contains("- [Webhooks](https://razorpay.com/docs/webhooks)"));
        assert!(format_docs_answer(&DocsAnswer::default()).contains("No answer"));
    }

    #[test]
    fn test_dispatch_errors() {
        let timeout = DispatchError::Timeout {
            endpoint: "https://mcp.example/mcp".into(),
            seconds: 30,
        };
        assert_eq!(
            format_dispatch_error(&timeout),
            "**Timed out** after 30s waiting for https://mcp.example/mcp."
        );
        let remote = DispatchError::Remote {
            code: None,
            message: "quota".into(),
        };
        assert_eq!(format_dispatch_error(&remote), "**Razorpay error:** quota");
    }

    proptest! {
        #[test]
        fn prop_display_amount_round_trips(minor in 0u64..1_000_000_000_000) {
            let shown: f64 = display_amount(minor).parse().unwrap();
            prop_assert_eq!((shown * 100.0).round() as u64, minor);
        }

        #[test]
        fn prop_collection_rows(n in 0usize..40) {
            let out = format_result(&collection(n));
            prop_assert_eq!(table_rows(&out), n.min(MAX_COLLECTION_ROWS));
            for i in 0..n.min(MAX_COLLECTION_ROWS) {
                let id = format!("`order_{:03}`", i);
                prop_assert_eq!(out.matches(id.as_str()).count(), 1);
            }
            let more = n.saturating_sub(MAX_COLLECTION_ROWS);
            prop_assert_eq!(out.contains("more_"), more > 0);
            if more > 0 {
                let note = format!("_...and {} more_", more);
                prop_assert!(out.contains(&note));
            }
        }
    }
}
