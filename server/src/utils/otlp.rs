//! OTLP utility functions
//!
//! Helpers for working with OTLP protobuf trace types:
//! - Span counting over the resource/scope nesting
//! - Resource attribute lookup (service name)

use opentelemetry_proto::tonic::collector::trace::v1::ExportTraceServiceRequest;
use opentelemetry_proto::tonic::common::v1::{AnyValue, KeyValue, any_value};
use opentelemetry_proto::tonic::trace::v1::ResourceSpans;

/// Attribute keys read from resources
pub mod keys {
    pub const SERVICE_NAME: &str = "service.name";
}

/// Placeholder for resources without a `service.name`
pub const UNKNOWN_SERVICE: &str = "unknown_service";

// ============================================================================
// SPAN COUNTING
// ============================================================================

/// Number of spans carried by a trace payload
pub trait SpanCount {
    fn span_count(&self) -> usize;
}

impl SpanCount for ResourceSpans {
    fn span_count(&self) -> usize {
        self.scope_spans.iter().map(|ss| ss.spans.len()).sum()
    }
}

impl SpanCount for ExportTraceServiceRequest {
    fn span_count(&self) -> usize {
        self.resource_spans.iter().map(SpanCount::span_count).sum()
    }
}

// ============================================================================
// ATTRIBUTE LOOKUP
// ============================================================================

/// Find an attribute value by key
pub fn find_attribute<'a>(attrs: &'a [KeyValue], key: &str) -> Option<&'a AnyValue> {
    attrs
        .iter()
        .find(|kv| kv.key == key)
        .and_then(|kv| kv.value.as_ref())
}

/// `service.name` of a resource, or [`UNKNOWN_SERVICE`]
pub fn service_name(resource_spans: &ResourceSpans) -> String {
    resource_spans
        .resource
        .as_ref()
        .and_then(|r| find_attribute(&r.attributes, keys::SERVICE_NAME))
        .map(any_value_to_string)
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| UNKNOWN_SERVICE.to_string())
}

/// Convert AnyValue to string representation
pub fn any_value_to_string(value: &AnyValue) -> String {
    match &value.value {
        Some(any_value::Value::StringValue(s)) => s.clone(),
        Some(any_value::Value::BoolValue(b)) => b.to_string(),
        Some(any_value::Value::IntValue(i)) => i.to_string(),
        Some(any_value::Value::DoubleValue(d)) => d.to_string(),
        Some(any_value::Value::ArrayValue(arr)) => {
            let values: Vec<String> = arr.values.iter().map(any_value_to_string).collect();
            serde_json::to_string(&values).unwrap_or_default()
        }
        Some(any_value::Value::KvlistValue(kvlist)) => {
            let map: serde_json::Map<String, serde_json::Value> = kvlist
                .values
                .iter()
                .filter_map(|kv| {
                    kv.value
                        .as_ref()
                        .map(|v| (kv.key.clone(), any_value_to_string(v).into()))
                })
                .collect();
            serde_json::to_string(&map).unwrap_or_default()
        }
        Some(any_value::Value::BytesValue(b)) => {
            b.iter().map(|byte| format!("{byte:02x}")).collect()
        }
        None => String::new(),
    }
}
