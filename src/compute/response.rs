use serde::Serialize;
use std::collections::BTreeMap;

use super::xml::{Element, Value};
use crate::error::{Error, Result};

/// Longest slice of a raw error body carried into an error message.
const ERROR_PREVIEW_CHARS: usize = 500;

/// Status, request id and parsed body of a compute API call.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ApiResponse<T> {
    pub status: u16,
    pub request_id: Option<String>,
    pub body: T,
}

impl<T> ApiResponse<T> {
    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> ApiResponse<U> {
        ApiResponse {
            status: self.status,
            request_id: self.request_id,
            body: f(self.body),
        }
    }
}

/// Resource limits of a tenant or quota class, keyed by resource name.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct QuotaSet(BTreeMap<String, Value>);

impl QuotaSet {
    pub fn get(&self, resource: &str) -> Option<&Value> {
        self.0.get(resource)
    }

    /// Integer limit for `resource`; `None` when absent or not numeric.
    pub fn limit(&self, resource: &str) -> Option<i64> {
        self.0.get(resource).and_then(Value::as_int)
    }

    /// The `id` attribute echoed back by the API (tenant or quota class id).
    pub fn id(&self) -> Option<String> {
        self.0.get("id").map(|v| v.to_string())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn into_inner(self) -> BTreeMap<String, Value> {
        self.0
    }
}

impl FromIterator<(String, Value)> for QuotaSet {
    fn from_iter<I: IntoIterator<Item = (String, Value)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

/// Convert every text value that parses as an integer into [`Value::Int`].
///
/// Surrounding whitespace is ignored when parsing. Non-numeric text, booleans
/// and nested maps are kept as they are, and no key is dropped.
pub fn format_quota(quota: BTreeMap<String, Value>) -> QuotaSet {
    quota
        .into_iter()
        .map(|(key, value)| {
            let value = match value {
                Value::Text(text) => match text.trim().parse::<i64>() {
                    Ok(n) => Value::Int(n),
                    Err(_) => Value::Text(text),
                },
                other => other,
            };
            (key, value)
        })
        .collect()
}

/// Parse a quota (class) set document into a formatted [`QuotaSet`].
pub fn parse_quota_body(body: &[u8]) -> Result<QuotaSet> {
    let text = std::str::from_utf8(body)
        .map_err(|e| Error::Xml(format!("response body is not UTF-8: {e}")))?;
    let root = Element::parse(text)?;
    match root.to_value()? {
        Value::Map(map) => Ok(format_quota(map)),
        other => Err(Error::Xml(format!(
            "expected <{}> to contain quota entries, got '{}'",
            root.tag, other
        ))),
    }
}

/// Human-readable message of an error response.
///
/// Compute faults look like `<itemNotFound code="404"><message>..</message></itemNotFound>`;
/// anything else falls back to a truncated copy of the raw body.
pub fn fault_message(body: &[u8]) -> String {
    let raw = String::from_utf8_lossy(body);
    if let Ok(root) = Element::parse(&raw)
        && let Some(message) = root.child("message")
        && !message.text.trim().is_empty()
    {
        return message.text.trim().to_string();
    }
    raw.trim().chars().take(ERROR_PREVIEW_CHARS).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn text_map(entries: &[(&str, &str)]) -> BTreeMap<String, Value> {
        entries
            .iter()
            .map(|(k, v)| (k.to_string(), Value::Text(v.to_string())))
            .collect()
    }

    #[test]
    fn test_format_quota_converts_numeric_strings() {
        let quota = format_quota(text_map(&[
            ("cores", "20"),
            ("ram", "51200"),
            ("instances", "-1"),
            ("padded", " 5\n"),
            ("plus", "+3"),
        ]));
        assert_eq!(quota.limit("cores"), Some(20));
        assert_eq!(quota.limit("ram"), Some(51200));
        assert_eq!(quota.limit("instances"), Some(-1));
        assert_eq!(quota.limit("padded"), Some(5));
        assert_eq!(quota.limit("plus"), Some(3));
    }

    #[test]
    fn test_format_quota_leaves_other_values_untouched() {
        let mut input = text_map(&[("id", "tenant-a"), ("empty", ""), ("float", "1.5")]);
        input.insert("flag".to_string(), Value::Bool(true));
        input.insert("nested".to_string(), Value::Map(text_map(&[("x", "1")])));
        let expected = input.clone();

        let quota = format_quota(input);

        assert_eq!(quota.len(), expected.len());
        for (key, value) in expected {
            assert_eq!(quota.get(&key), Some(&value), "key {key}");
        }
    }

    #[test]
    fn test_format_quota_keeps_bools_as_bools() {
        let mut input = BTreeMap::new();
        input.insert("enabled".to_string(), Value::Bool(true));
        input.insert("disabled".to_string(), Value::Bool(false));
        let quota = format_quota(input);
        assert_eq!(quota.get("enabled"), Some(&Value::Bool(true)));
        assert_eq!(quota.get("disabled"), Some(&Value::Bool(false)));
        assert_eq!(quota.limit("enabled"), None);
    }

    #[test]
    fn test_format_quota_preserves_every_key() {
        let input = text_map(&[("a", "1"), ("b", "two"), ("c", "3"), ("d", "")]);
        let keys: Vec<String> = input.keys().cloned().collect();
        let quota = format_quota(input);
        let formatted: Vec<String> = quota.iter().map(|(k, _)| k.clone()).collect();
        assert_eq!(keys, formatted);
    }

    #[test]
    fn test_format_quota_overflow_stays_text() {
        let quota = format_quota(text_map(&[("huge", "99999999999999999999999")]));
        assert_eq!(
            quota.get("huge"),
            Some(&Value::Text("99999999999999999999999".to_string()))
        );
    }

    #[test]
    fn test_parse_quota_body() {
        let body = br#"<?xml version="1.0" encoding="UTF-8"?>
<quota_set xmlns="http://docs.openstack.org/compute/api/v1.1" id="8f1c">
  <cores>20</cores>
  <floating_ips>10</floating_ips>
</quota_set>"#;
        let quota = parse_quota_body(body).unwrap();
        assert_eq!(quota.id().as_deref(), Some("8f1c"));
        assert_eq!(quota.limit("cores"), Some(20));
        assert_eq!(quota.limit("floating_ips"), Some(10));
        assert_eq!(quota.len(), 3);
    }

    #[test]
    fn test_parse_quota_body_numeric_id_becomes_int() {
        let quota = parse_quota_body(br#"<quota_set id="42"><cores>1</cores></quota_set>"#).unwrap();
        assert_eq!(quota.get("id"), Some(&Value::Int(42)));
        assert_eq!(quota.id().as_deref(), Some("42"));
    }

    #[test]
    fn test_parse_quota_body_rejects_text_root() {
        let err = parse_quota_body(b"<quota_set>oops</quota_set>").unwrap_err();
        assert!(matches!(err, Error::Xml(_)));
    }

    #[test]
    fn test_parse_quota_body_rejects_malformed() {
        assert!(matches!(
            parse_quota_body(b"<quota_set><cores>"),
            Err(Error::Xml(_))
        ));
    }

    #[test]
    fn test_fault_message_from_xml_fault() {
        let body = br#"<?xml version="1.0" encoding="UTF-8"?>
<itemNotFound code="404" xmlns="http://docs.openstack.org/compute/api/v1.1">
  <message>Quota class gold could not be found.</message>
</itemNotFound>"#;
        assert_eq!(fault_message(body), "Quota class gold could not be found.");
    }

    #[test]
    fn test_fault_message_falls_back_to_raw_body() {
        assert_eq!(fault_message(b"  plain failure \n"), "plain failure");
        let long = "x".repeat(2000);
        assert_eq!(fault_message(long.as_bytes()).len(), ERROR_PREVIEW_CHARS);
    }

    #[test]
    fn test_api_response_map() {
        let response = ApiResponse {
            status: 200,
            request_id: Some("req-1".to_string()),
            body: 2,
        };
        let mapped = response.map(|n| n * 10);
        assert_eq!(mapped.body, 20);
        assert_eq!(mapped.request_id.as_deref(), Some("req-1"));
    }
}
