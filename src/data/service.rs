//! Service records as served by the health-check backend.
//!
//! The backend owns service definitions and the observed health fields.
//! The client only reads the observed fields; it sends back the editable
//! subset as a [`ServiceDraft`].

use std::fmt;

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::de::IgnoredAny;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use tracing::warn;

/// Ports that are implied by the protocol and hidden in the address line.
const IMPLIED_PORTS: [u16; 2] = [80, 443];

/// Last observed reachability of a service.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ServiceStatus {
    Up,
    Down,
    #[default]
    Unknown,
}

impl ServiceStatus {
    /// Returns the upper-case label for display.
    pub fn label(&self) -> &'static str {
        match self {
            ServiceStatus::Up => "UP",
            ServiceStatus::Down => "DOWN",
            ServiceStatus::Unknown => "UNKNOWN",
        }
    }

    fn from_wire(value: &str) -> Self {
        match value {
            "up" => ServiceStatus::Up,
            "down" => ServiceStatus::Down,
            _ => ServiceStatus::Unknown,
        }
    }
}

impl fmt::Display for ServiceStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// A monitored service and its last observed health.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServiceRecord {
    pub id: String,
    pub name: String,
    pub host: String,
    #[serde(
        default,
        deserialize_with = "lenient_u16",
        skip_serializing_if = "Option::is_none"
    )]
    pub port: Option<u16>,
    #[serde(default = "default_protocol")]
    pub protocol: String,
    #[serde(default = "default_path")]
    pub path: String,
    #[serde(
        default,
        deserialize_with = "non_empty_string",
        skip_serializing_if = "Option::is_none"
    )]
    pub env: Option<String>,
    #[serde(default = "default_active")]
    pub active: bool,

    // Observed fields (server-authoritative)
    #[serde(default, deserialize_with = "lenient_status")]
    pub last_status: ServiceStatus,
    #[serde(
        default,
        deserialize_with = "lenient_u16",
        skip_serializing_if = "Option::is_none"
    )]
    pub last_http_status: Option<u16>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_latency_ms: Option<f64>,
    #[serde(
        default,
        deserialize_with = "non_empty_string",
        skip_serializing_if = "Option::is_none"
    )]
    pub last_error: Option<String>,
    #[serde(
        default,
        deserialize_with = "lenient_timestamp",
        skip_serializing_if = "Option::is_none"
    )]
    pub last_change: Option<DateTime<Utc>>,
    #[serde(
        default,
        deserialize_with = "lenient_timestamp",
        skip_serializing_if = "Option::is_none"
    )]
    pub last_checked: Option<DateTime<Utc>>,
}

impl ServiceRecord {
    /// Create a record with only identity fields set.
    pub fn new(id: impl Into<String>, name: impl Into<String>, host: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            host: host.into(),
            port: None,
            protocol: default_protocol(),
            path: default_path(),
            env: None,
            active: true,
            last_status: ServiceStatus::Unknown,
            last_http_status: None,
            last_latency_ms: None,
            last_error: None,
            last_change: None,
            last_checked: None,
        }
    }

    /// Host with the port appended unless it is absent or implied (80/443).
    pub fn address(&self) -> String {
        match self.port {
            Some(port) if !IMPLIED_PORTS.contains(&port) => format!("{}:{}", self.host, port),
            _ => self.host.clone(),
        }
    }

    /// Full probe URL, e.g. `https://api.example.com:8443/health`.
    pub fn url(&self) -> String {
        format!("{}://{}{}", self.protocol, self.address(), self.path)
    }

    /// Environment tag in upper case, if any.
    pub fn env_badge(&self) -> Option<String> {
        self.env.as_ref().map(|e| e.to_uppercase())
    }

    /// Latency label, e.g. "123ms" or "---".
    ///
    /// Negative samples are clamped to zero for display.
    pub fn latency_label(&self) -> String {
        match self.last_latency_ms {
            Some(ms) => format!("{:.0}ms", ms.max(0.0)),
            None => "---".to_string(),
        }
    }

    /// HTTP status label, e.g. "200" or "---".
    pub fn http_label(&self) -> String {
        self.last_http_status
            .map(|code| code.to_string())
            .unwrap_or_else(|| "---".to_string())
    }

    /// The editable subset of this record.
    pub fn to_draft(&self) -> ServiceDraft {
        ServiceDraft {
            id: self.id.clone(),
            name: self.name.clone(),
            host: self.host.clone(),
            port: self.port,
            protocol: self.protocol.clone(),
            path: self.path.clone(),
            env: self.env.clone(),
            active: self.active,
        }
    }
}

/// Create-or-update payload for `POST /api/services`, keyed by `id`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServiceDraft {
    pub id: String,
    pub name: String,
    pub host: String,
    #[serde(
        default,
        deserialize_with = "lenient_u16",
        skip_serializing_if = "Option::is_none"
    )]
    pub port: Option<u16>,
    pub protocol: String,
    pub path: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub env: Option<String>,
    pub active: bool,
}

fn default_protocol() -> String {
    "https".to_string()
}

fn default_path() -> String {
    "/".to_string()
}

fn default_active() -> bool {
    true
}

fn lenient_status<'de, D>(deserializer: D) -> Result<ServiceStatus, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Option<String> = Option::deserialize(deserializer)?;
    Ok(raw.as_deref().map(ServiceStatus::from_wire).unwrap_or_default())
}

/// Port-like numbers as sent by the backend: a number or a numeric string.
#[derive(Deserialize)]
#[serde(untagged)]
enum RawU16 {
    Number(u64),
    Text(String),
    Other(IgnoredAny),
}

fn lenient_u16<'de, D>(deserializer: D) -> Result<Option<u16>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Option<RawU16> = Option::deserialize(deserializer)?;
    Ok(match raw {
        Some(RawU16::Number(n)) => u16::try_from(n).ok(),
        Some(RawU16::Text(text)) => text.trim().parse().ok(),
        Some(RawU16::Other(_)) | None => None,
    })
}

fn non_empty_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Option<String> = Option::deserialize(deserializer)?;
    Ok(raw.filter(|s| !s.trim().is_empty()))
}

fn lenient_timestamp<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Option<String> = Option::deserialize(deserializer)?;
    Ok(raw.as_deref().and_then(parse_timestamp))
}

/// Decode a service list one record at a time, skipping records that do
/// not parse instead of failing the whole list.
pub fn decode_records(values: Vec<Value>) -> Vec<ServiceRecord> {
    values
        .into_iter()
        .filter_map(|value| {
            let id = value.get("id").and_then(Value::as_str).map(str::to_owned);
            match serde_json::from_value(value) {
                Ok(record) => Some(record),
                Err(e) => {
                    warn!(
                        "Skipping unreadable service record {}: {}",
                        id.as_deref().unwrap_or("<no id>"),
                        e
                    );
                    None
                }
            }
        })
        .collect()
}

/// Parse an RFC 3339 timestamp, or a naive ISO-8601 one taken as UTC.
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
        return Some(ts.with_timezone(&Utc));
    }
    NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f")
        .ok()
        .map(|naive| naive.and_utc())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_deserialize_full_record() {
        let json = r#"{
            "id": "api",
            "name": "API",
            "host": "api.example.com",
            "port": 8443,
            "protocol": "https",
            "path": "/health",
            "env": "prod",
            "active": true,
            "last_status": "up",
            "last_http_status": 200,
            "last_latency_ms": 123,
            "last_change": "2024-05-01T10:00:00+00:00",
            "last_checked": "2024-05-01T10:05:00.123456+00:00",
            "last_notified": "2024-05-01T10:00:00+00:00"
        }"#;

        let record: ServiceRecord = serde_json::from_str(json).unwrap();
        assert_eq!(record.id, "api");
        assert_eq!(record.port, Some(8443));
        assert_eq!(record.last_status, ServiceStatus::Up);
        assert_eq!(record.last_http_status, Some(200));
        assert_eq!(record.last_latency_ms, Some(123.0));
        assert_eq!(
            record.last_change,
            Some(Utc.with_ymd_and_hms(2024, 5, 1, 10, 0, 0).unwrap())
        );
        assert!(record.last_checked.is_some());
    }

    #[test]
    fn test_minimal_record_uses_defaults() {
        let record: ServiceRecord =
            serde_json::from_str(r#"{"id": "a", "name": "A", "host": "a.local"}"#).unwrap();
        assert_eq!(record.protocol, "https");
        assert_eq!(record.path, "/");
        assert!(record.active);
        assert_eq!(record.last_status, ServiceStatus::Unknown);
        assert!(record.last_latency_ms.is_none());
    }

    #[test]
    fn test_unrecognized_or_null_status_is_unknown() {
        let weird: ServiceRecord = serde_json::from_str(
            r#"{"id": "a", "name": "A", "host": "h", "last_status": "degraded"}"#,
        )
        .unwrap();
        assert_eq!(weird.last_status, ServiceStatus::Unknown);

        let null: ServiceRecord =
            serde_json::from_str(r#"{"id": "a", "name": "A", "host": "h", "last_status": null}"#)
                .unwrap();
        assert_eq!(null.last_status, ServiceStatus::Unknown);
    }

    #[test]
    fn test_bad_timestamp_does_not_fail_record() {
        let record: ServiceRecord = serde_json::from_str(
            r#"{"id": "a", "name": "A", "host": "h", "last_change": "yesterday-ish"}"#,
        )
        .unwrap();
        assert!(record.last_change.is_none());
    }

    #[test]
    fn test_odd_port_values() {
        let parse = |port: &str| {
            let json = format!(r#"{{"id": "a", "name": "A", "host": "h", "port": {}}}"#, port);
            serde_json::from_str::<ServiceRecord>(&json).unwrap().port
        };
        assert_eq!(parse("8080"), Some(8080));
        assert_eq!(parse(r#""8080""#), Some(8080));
        assert_eq!(parse("99999"), None);
        assert_eq!(parse("-1"), None);
        assert_eq!(parse(r#""http""#), None);
        assert_eq!(parse("null"), None);
        assert_eq!(parse("[1]"), None);
    }

    #[test]
    fn test_bad_record_does_not_sink_the_list() {
        let values: Vec<Value> = serde_json::from_str(
            r#"[
                {"id": "a", "name": "A", "host": "a.local"},
                {"id": "b", "name": "B", "host": "b.local", "port": "8080"},
                {"id": "c", "host": "missing-name.local"},
                {"id": "d", "name": "D", "host": "d.local", "last_latency_ms": "fast"}
            ]"#,
        )
        .unwrap();

        let records = decode_records(values);
        let ids: Vec<&str> = records.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, vec!["a", "b"]);
        assert_eq!(records[1].port, Some(8080));
    }

    #[test]
    fn test_naive_timestamp_is_utc() {
        let ts = parse_timestamp("2024-05-01T10:00:00").unwrap();
        assert_eq!(ts, Utc.with_ymd_and_hms(2024, 5, 1, 10, 0, 0).unwrap());
    }

    #[test]
    fn test_empty_env_is_dropped() {
        let record: ServiceRecord =
            serde_json::from_str(r#"{"id": "a", "name": "A", "host": "h", "env": ""}"#).unwrap();
        assert!(record.env.is_none());
        assert!(record.env_badge().is_none());
    }

    #[test]
    fn test_address_hides_implied_ports() {
        let mut record = ServiceRecord::new("a", "A", "example.com");
        assert_eq!(record.address(), "example.com");
        record.port = Some(443);
        assert_eq!(record.address(), "example.com");
        record.port = Some(80);
        assert_eq!(record.address(), "example.com");
        record.port = Some(8080);
        assert_eq!(record.address(), "example.com:8080");
        assert_eq!(record.url(), "https://example.com:8080/");
    }

    #[test]
    fn test_labels() {
        let mut record = ServiceRecord::new("a", "A", "h");
        assert_eq!(record.latency_label(), "---");
        assert_eq!(record.http_label(), "---");
        record.last_latency_ms = Some(-5.0);
        assert_eq!(record.latency_label(), "0ms");
        record.last_latency_ms = Some(312.4);
        assert_eq!(record.latency_label(), "312ms");
        record.env = Some("staging".into());
        assert_eq!(record.env_badge().as_deref(), Some("STAGING"));
    }

    #[test]
    fn test_draft_omits_absent_fields() {
        let draft = ServiceRecord::new("a", "A", "h").to_draft();
        let value = serde_json::to_value(&draft).unwrap();
        assert!(value.get("port").is_none());
        assert!(value.get("env").is_none());
        assert_eq!(value["protocol"], "https");
        assert_eq!(value["active"], true);
    }
}
