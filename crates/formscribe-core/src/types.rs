//! Core data types for the extraction pipeline.
//!
//! Model output is schema-free: field names are invented per document, so
//! [`StructuredResult`] wraps an untyped JSON value rather than a fixed record.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use std::path::{Path, PathBuf};

/// Language assumed when the caller does not declare one.
pub const DEFAULT_LANGUAGE: &str = "English";

/// Whether `language` names English (case-insensitive, surrounding whitespace ignored).
pub fn is_english(language: &str) -> bool {
    language.trim().eq_ignore_ascii_case("english")
}

/// A single label/value pair extracted from a form.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FormField {
    pub label: String,
    pub value: String,
}

impl FormField {
    pub fn new(label: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            value: value.into(),
        }
    }
}

/// Structured data extracted from a document.
///
/// Always a JSON object: an arbitrary nested mapping, a `{"raw_text": ...}`
/// fallback, or a `{"fields": [...]}` list of label/value pairs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StructuredResult(Value);

impl StructuredResult {
    /// Wrap a decoded JSON object. Non-object values degrade to `raw_text`.
    pub fn from_value(value: Value) -> Self {
        match value {
            Value::Object(_) => Self(value),
            other => Self::raw_text(other.to_string()),
        }
    }

    /// The fallback shape used when model output is not a JSON object.
    pub fn raw_text(text: impl Into<String>) -> Self {
        Self(json!({ "raw_text": text.into() }))
    }

    /// Build the `{"fields": [...]}` shape.
    pub fn from_fields(fields: Vec<FormField>) -> Self {
        let items: Vec<Value> = fields
            .into_iter()
            .map(|f| json!({ "label": f.label, "value": f.value }))
            .collect();
        Self(json!({ "fields": items }))
    }

    /// Diagnostic reported when the hosted model is still warming up (HTTP 503).
    pub fn model_loading() -> Self {
        Self::from_fields(vec![
            FormField::new(
                "Model Status",
                "Model is loading, please try again in 20-30 seconds",
            ),
            FormField::new("Status Code", "503"),
        ])
    }

    pub fn as_value(&self) -> &Value {
        &self.0
    }

    pub fn into_value(self) -> Value {
        self.0
    }

    /// Whether parsing degraded to the `raw_text` fallback.
    pub fn is_raw_text(&self) -> bool {
        match &self.0 {
            Value::Object(map) => map.len() == 1 && map.get("raw_text").is_some_and(Value::is_string),
            _ => false,
        }
    }

    /// The `fields` array, if this result has the list-of-pairs shape.
    pub fn fields(&self) -> Option<Vec<FormField>> {
        let items = self.0.get("fields")?.as_array()?;
        Some(items.iter().map(field_from_item).collect())
    }

    /// Label/value pairs for any shape.
    ///
    /// A `fields` array is returned as is; any other mapping is flattened with
    /// nested keys joined by `" > "`.
    pub fn to_fields(&self) -> Vec<FormField> {
        if let Some(fields) = self.fields() {
            return fields;
        }
        let mut out = Vec::new();
        if let Value::Object(map) = &self.0 {
            flatten_object(map, None, &mut out);
        }
        out
    }
}

fn field_from_item(item: &Value) -> FormField {
    match item {
        Value::Object(map) => FormField {
            label: map.get("label").map(scalar_to_string).unwrap_or_default(),
            value: map.get("value").map(scalar_to_string).unwrap_or_default(),
        },
        other => FormField::new("Value", scalar_to_string(other)),
    }
}

fn scalar_to_string(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

fn join_label(prefix: Option<&str>, key: &str) -> String {
    match prefix {
        Some(p) => format!("{p} > {key}"),
        None => key.to_string(),
    }
}

fn flatten_object(map: &Map<String, Value>, prefix: Option<&str>, out: &mut Vec<FormField>) {
    for (key, value) in map {
        let label = join_label(prefix, key);
        flatten_value(value, label, out);
    }
}

fn flatten_value(value: &Value, label: String, out: &mut Vec<FormField>) {
    match value {
        Value::Object(inner) => flatten_object(inner, Some(&label), out),
        Value::Array(items) if items.iter().all(|v| !v.is_object() && !v.is_array()) => {
            let joined: Vec<String> = items.iter().map(scalar_to_string).collect();
            out.push(FormField::new(label, joined.join(", ")));
        }
        Value::Array(items) => {
            for (i, item) in items.iter().enumerate() {
                flatten_value(item, format!("{label} > {}", i + 1), out);
            }
        }
        scalar => out.push(FormField::new(label, scalar_to_string(scalar))),
    }
}

/// The uniform success/failure wrapper every adapter returns.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResultEnvelope {
    pub success: bool,
    pub filename: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extracted_data: Option<StructuredResult>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub message: String,
}

impl ResultEnvelope {
    pub fn success(
        filename: impl Into<String>,
        data: StructuredResult,
        message: impl Into<String>,
    ) -> Self {
        Self {
            success: true,
            filename: filename.into(),
            extracted_data: Some(data),
            error: None,
            message: message.into(),
        }
    }

    pub fn failure(
        filename: impl Into<String>,
        error: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            success: false,
            filename: filename.into(),
            extracted_data: None,
            error: Some(error.into()),
            message: message.into(),
        }
    }

    /// Label/value pairs describing this envelope, for document-level assembly.
    pub fn to_fields(&self) -> Vec<FormField> {
        match (&self.extracted_data, self.success) {
            (Some(data), true) => data.to_fields(),
            _ => vec![
                FormField::new(
                    "Extraction Error",
                    self.error.clone().unwrap_or_else(|| "Unknown error".to_string()),
                ),
                FormField::new("Message", self.message.clone()),
            ],
        }
    }

    /// The structured result a document-level caller should persist.
    pub fn into_result(self) -> StructuredResult {
        let fields = self.to_fields();
        match self.extracted_data {
            Some(data) if self.success => data,
            _ => StructuredResult::from_fields(fields),
        }
    }
}

/// Position of a page within a multi-page document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageInfo {
    pub number: usize,
    pub total: usize,
}

/// A per-image extraction request. Transient, created per upload or page.
#[derive(Debug, Clone)]
pub struct ExtractionRequest {
    /// Image on disk
    pub path: PathBuf,
    /// Name reported back in the envelope
    pub filename: String,
    /// Declared document language
    pub language: String,
    /// Upload task this request belongs to
    pub task_id: Option<String>,
    /// Page position when the image was rasterized from a PDF
    pub page: Option<PageInfo>,
}

impl ExtractionRequest {
    /// Request for `path`, named after its file name, in [`DEFAULT_LANGUAGE`].
    pub fn new(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref().to_path_buf();
        let filename = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        Self {
            path,
            filename,
            language: DEFAULT_LANGUAGE.to_string(),
            task_id: None,
            page: None,
        }
    }

    pub fn filename(mut self, filename: impl Into<String>) -> Self {
        self.filename = filename.into();
        self
    }

    pub fn language(mut self, language: impl Into<String>) -> Self {
        let language = language.into();
        if !language.trim().is_empty() {
            self.language = language;
        }
        self
    }

    pub fn task_id(mut self, task_id: Option<&str>) -> Self {
        self.task_id = task_id.map(String::from);
        self
    }

    pub fn page(mut self, number: usize, total: usize) -> Self {
        self.page = Some(PageInfo { number, total });
        self
    }
}

/// A stored extraction result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PersistedRecord {
    pub id: i64,
    pub task_id: String,
    pub raw_json: StructuredResult,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Returned to the caller after an upload has been processed and stored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UploadReceipt {
    pub task_id: String,
    pub record_id: i64,
    pub status: String,
    pub message: String,
}

/// All stored records with their count.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecordList {
    pub records: Vec<PersistedRecord>,
    pub count: usize,
}

impl From<Vec<PersistedRecord>> for RecordList {
    fn from(records: Vec<PersistedRecord>) -> Self {
        let count = records.len();
        Self { records, count }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_english() {
        assert!(is_english("English"));
        assert!(is_english(" english "));
        assert!(!is_english("Hindi"));
    }

    #[test]
    fn test_from_value_non_object_degrades() {
        let result = StructuredResult::from_value(json!([1, 2]));
        assert!(result.is_raw_text());
        assert_eq!(result.as_value()["raw_text"], "[1,2]");
    }

    #[test]
    fn test_fields_shape() {
        let result = StructuredResult::from_fields(vec![FormField::new("Name", "Asha")]);
        assert_eq!(result.fields().unwrap(), vec![FormField::new("Name", "Asha")]);
        assert!(!result.is_raw_text());
    }

    #[test]
    fn test_fields_with_non_string_values() {
        let result = StructuredResult::from_value(json!({
            "fields": [{"label": "Age", "value": 42}, {"label": "Note"}]
        }));
        let fields = result.fields().unwrap();
        assert_eq!(fields[0], FormField::new("Age", "42"));
        assert_eq!(fields[1], FormField::new("Note", ""));
    }

    #[test]
    fn test_to_fields_flattens_nested_mapping() {
        let result = StructuredResult::from_value(json!({
            "applicant": {"name": "Asha", "phone": "98450"},
            "hobbies": ["chess", "tabla"],
            "date": "12/03/2024"
        }));
        let fields = result.to_fields();
        assert!(fields.contains(&FormField::new("applicant > name", "Asha")));
        assert!(fields.contains(&FormField::new("applicant > phone", "98450")));
        assert!(fields.contains(&FormField::new("hobbies", "chess, tabla")));
        assert!(fields.contains(&FormField::new("date", "12/03/2024")));
    }

    #[test]
    fn test_to_fields_array_of_objects() {
        let result = StructuredResult::from_value(json!({
            "items": [{"qty": 2}, {"qty": 5}]
        }));
        let fields = result.to_fields();
        assert_eq!(
            fields,
            vec![
                FormField::new("items > 1 > qty", "2"),
                FormField::new("items > 2 > qty", "5"),
            ]
        );
    }

    #[test]
    fn test_envelope_serialization_omits_absent_fields() {
        let ok = ResultEnvelope::success("a.png", StructuredResult::raw_text("x"), "done");
        let value = serde_json::to_value(&ok).unwrap();
        assert!(value.get("error").is_none());
        assert_eq!(value["extracted_data"]["raw_text"], "x");

        let failed = ResultEnvelope::failure("a.png", "boom", "Failed");
        let value = serde_json::to_value(&failed).unwrap();
        assert!(value.get("extracted_data").is_none());
        assert_eq!(value["error"], "boom");
    }

    #[test]
    fn test_failure_envelope_into_result() {
        let failed = ResultEnvelope::failure("a.png", "connection refused", "Failed to extract");
        let result = failed.into_result();
        let fields = result.fields().unwrap();
        assert_eq!(fields[0], FormField::new("Extraction Error", "connection refused"));
        assert_eq!(fields[1], FormField::new("Message", "Failed to extract"));
    }

    #[test]
    fn test_request_builder() {
        let request = ExtractionRequest::new("/tmp/scan.png")
            .language("")
            .task_id(Some("t-1"))
            .page(2, 3);
        assert_eq!(request.filename, "scan.png");
        assert_eq!(request.language, DEFAULT_LANGUAGE);
        assert_eq!(request.task_id.as_deref(), Some("t-1"));
        assert_eq!(request.page, Some(PageInfo { number: 2, total: 3 }));
    }
}
