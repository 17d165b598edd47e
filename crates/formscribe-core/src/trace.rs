//! Best-effort extraction tracing.
//!
//! [`Tracer::record`] is the only place trace failures are handled: a missing
//! sink, a failed ingestion call or a slow one is logged and dropped.

use async_trait::async_trait;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;

use crate::config::TracingConfig;
use crate::error::PipelineError;
use crate::llm::provider::resolve_env_var;

const RECORD_TIMEOUT: Duration = Duration::from_secs(5);

/// Severity attached to a trace.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum TraceLevel {
    Warning,
    Error,
}

/// One observability event for an extraction attempt.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TraceRecord {
    pub name: String,
    pub input: Value,
    pub output: Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub level: Option<TraceLevel>,
}

/// Destination for trace records.
#[async_trait]
pub trait TraceSink: Send + Sync {
    async fn record(&self, record: &TraceRecord) -> Result<(), PipelineError>;
}

/// Langfuse-compatible ingestion sink.
pub struct LangfuseSink {
    endpoint: String,
    public_key: String,
    secret_key: String,
    client: reqwest::Client,
}

impl LangfuseSink {
    pub fn new(host: &str, public_key: &str, secret_key: &str) -> Self {
        Self {
            endpoint: format!("{}/api/public/ingestion", host.trim_end_matches('/')),
            public_key: public_key.to_string(),
            secret_key: secret_key.to_string(),
            client: reqwest::Client::new(),
        }
    }

    fn ingestion_body(record: &TraceRecord) -> Value {
        let timestamp = Utc::now().to_rfc3339();
        let mut body = json!({
            "id": uuid::Uuid::new_v4().to_string(),
            "name": record.name,
            "input": record.input,
            "output": record.output,
            "timestamp": timestamp,
        });
        if let Some(level) = record.level {
            body["metadata"] = json!({ "level": level });
        }
        json!({
            "batch": [{
                "id": uuid::Uuid::new_v4().to_string(),
                "type": "trace-create",
                "timestamp": timestamp,
                "body": body,
            }]
        })
    }
}

#[async_trait]
impl TraceSink for LangfuseSink {
    async fn record(&self, record: &TraceRecord) -> Result<(), PipelineError> {
        let resp = self
            .client
            .post(&self.endpoint)
            .basic_auth(&self.public_key, Some(&self.secret_key))
            .json(&Self::ingestion_body(record))
            .send()
            .await
            .map_err(|e| PipelineError::Trace(format!("ingestion request failed: {e}")))?;

        let status = resp.status();
        if !status.is_success() {
            let text = resp.text().await.unwrap_or_default();
            return Err(PipelineError::Trace(format!("ingestion HTTP {status}: {text}")));
        }
        Ok(())
    }
}

/// Guarded front for an optional [`TraceSink`].
#[derive(Clone, Default)]
pub struct Tracer {
    sink: Option<Arc<dyn TraceSink>>,
}

impl Tracer {
    pub fn new(sink: Option<Arc<dyn TraceSink>>) -> Self {
        Self { sink }
    }

    pub fn disabled() -> Self {
        Self { sink: None }
    }

    /// Build from config; tracing stays off unless both keys resolve.
    pub fn from_config(config: &TracingConfig) -> Self {
        let public_key = resolve_env_var(&config.public_key);
        let secret_key = resolve_env_var(&config.secret_key);
        match (public_key, secret_key) {
            (Some(public_key), Some(secret_key)) => {
                tracing::debug!(host = %config.host, "Trace ingestion enabled");
                let sink: Arc<dyn TraceSink> =
                    Arc::new(LangfuseSink::new(&config.host, &public_key, &secret_key));
                Self::new(Some(sink))
            }
            _ => Self::disabled(),
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.sink.is_some()
    }

    /// Send `record` to the sink. Never fails.
    pub async fn record(&self, record: TraceRecord) {
        let Some(sink) = &self.sink else {
            return;
        };
        match tokio::time::timeout(RECORD_TIMEOUT, sink.record(&record)).await {
            Ok(Ok(())) => tracing::debug!(trace = %record.name, "Trace recorded"),
            Ok(Err(e)) => tracing::warn!(trace = %record.name, "Dropping trace: {e}"),
            Err(_) => tracing::warn!(
                trace = %record.name,
                "Dropping trace: ingestion timed out after {}s",
                RECORD_TIMEOUT.as_secs()
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::MemorySink;
    use std::sync::atomic::Ordering;

    fn record() -> TraceRecord {
        TraceRecord {
            name: "handwriting_extraction_ollama".to_string(),
            input: json!({"filename": "a.png"}),
            output: json!({"success": true}),
            level: None,
        }
    }

    #[tokio::test]
    async fn test_disabled_tracer_is_noop() {
        Tracer::disabled().record(record()).await;
    }

    #[tokio::test]
    async fn test_failing_sink_is_swallowed() {
        let sink = Arc::new(MemorySink::failing());
        let tracer = Tracer::new(Some(sink.clone() as Arc<dyn TraceSink>));
        tracer.record(record()).await;
        assert_eq!(sink.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_records_reach_sink() {
        let sink = Arc::new(MemorySink::default());
        let tracer = Tracer::new(Some(sink.clone() as Arc<dyn TraceSink>));
        tracer.record(record()).await;
        assert_eq!(sink.names(), vec!["handwriting_extraction_ollama"]);
    }

    #[test]
    fn test_ingestion_body_shape() {
        let mut rec = record();
        rec.level = Some(TraceLevel::Error);
        let body = LangfuseSink::ingestion_body(&rec);
        let event = &body["batch"][0];
        assert_eq!(event["type"], "trace-create");
        assert_eq!(event["body"]["name"], "handwriting_extraction_ollama");
        assert_eq!(event["body"]["metadata"]["level"], "ERROR");
        assert!(uuid::Uuid::parse_str(event["id"].as_str().unwrap()).is_ok());
        assert!(chrono::DateTime::parse_from_rfc3339(event["timestamp"].as_str().unwrap()).is_ok());
    }

    #[test]
    fn test_from_config_requires_both_keys() {
        let config = TracingConfig {
            host: "http://localhost:3000".to_string(),
            public_key: "pk-lf".to_string(),
            secret_key: String::new(),
        };
        assert!(!Tracer::from_config(&config).is_enabled());
    }
}
