//! Prompt text for extraction and translation.

use crate::config::ResponseFormat;

/// Build the handwriting extraction prompt for a document language.
pub fn extraction_prompt(language: &str, format: ResponseFormat) -> String {
    let output = match format {
        ResponseFormat::Structured => STRUCTURED_OUTPUT.to_string(),
        ResponseFormat::Fields => FIELDS_OUTPUT.to_string(),
    };

    format!(
        "You are an expert OCR system specialized in reading ONLY handwritten text with maximum accuracy.

This document contains both handwritten and computer-printed text. Extract ONLY the handwritten text and ignore any printed, typed, or machine-generated text.

This document is written in {language}. Read and extract the handwritten text in {language}.

INSTRUCTIONS:
1. Only extract text that was written by hand; ignore pre-printed labels, headers and instructions
2. Read each handwritten character carefully, especially numbers, names, addresses and email addresses
3. Do not assume or invent fields; only extract handwritten text that is clearly visible
4. For partially readable text, extract what you can see clearly
5. If handwritten text is illegible or blank, use the value \"unreadable\" (not null)
6. Name fields after what the handwritten entries describe (in {language})
7. Preserve the logical grouping of the handwritten information

{output}"
    )
}

const STRUCTURED_OUTPUT: &str = "Return ONLY valid JSON with no additional text, markdown, or explanation before or after.
The JSON should be an object with descriptive keys based on the handwritten content, nested where entries belong together.";

const FIELDS_OUTPUT: &str = r#"OUTPUT FORMAT (STRICT JSON ONLY):
{
  "fields": [
    {
      "label": "descriptive field name based on what you see",
      "value": "the handwritten text you read"
    }
  ]
}

Return ONLY valid JSON, no explanations or additional text."#;

/// System instruction for translating extracted JSON into English.
pub fn translation_system(source_language: &str) -> String {
    format!(
        "You are a translation assistant. Translate the following JSON from {source_language} to English."
    )
}

/// User message carrying the translation rules and the JSON to translate.
pub fn translation_prompt(json: &str) -> String {
    format!(
        "IMPORTANT RULES:
1. Translate ONLY the keys (field names) and string values
2. Keep all numbers, dates, and special characters unchanged
3. Preserve the exact JSON structure
4. Return ONLY valid JSON with no additional text before or after
5. Do not translate values that are already partially in English
6. If a value is \"unreadable\", keep it as is

JSON to translate:
{json}"
    )
}
