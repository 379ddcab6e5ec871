//! Response translation.
//!
//! Uses the public Google translate web endpoint (the same one the original
//! deployment's translator wrapped). Translation failures are non-fatal; the
//! pipeline falls back to the untranslated text with a warning.

use async_trait::async_trait;
use serde_json::Value;

use crate::core::errors::ChatError;

/// Response languages offered to the user, mapped to ISO codes.
const LANGUAGES: [(&str, &str); 15] = [
    ("english", "en"),
    ("spanish", "es"),
    ("french", "fr"),
    ("german", "de"),
    ("chinese", "zh-CN"),
    ("japanese", "ja"),
    ("korean", "ko"),
    ("arabic", "ar"),
    ("russian", "ru"),
    ("portuguese", "pt"),
    ("italian", "it"),
    ("hindi", "hi"),
    ("bengali", "bn"),
    ("tamil", "ta"),
    ("telugu", "te"),
];

pub fn language_code(name: &str) -> Option<&'static str> {
    let lowered = name.trim().to_lowercase();
    LANGUAGES
        .iter()
        .find(|(lang, _)| *lang == lowered)
        .map(|(_, code)| *code)
}

#[async_trait]
pub trait Translator: Send + Sync {
    /// Translate `text` into `target_language` (a display name such as
    /// "Spanish"). Unknown languages and provider failures are
    /// [`ChatError::Translation`].
    async fn translate(&self, text: &str, target_language: &str) -> Result<String, ChatError>;
}

pub struct GoogleTranslator {
    client: reqwest::Client,
}

impl GoogleTranslator {
    pub fn new() -> Self {
        Self {
            client: reqwest::Client::new(),
        }
    }
}

impl Default for GoogleTranslator {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Translator for GoogleTranslator {
    async fn translate(&self, text: &str, target_language: &str) -> Result<String, ChatError> {
        let code = language_code(target_language).ok_or_else(|| {
            ChatError::Translation(format!("unknown language: {}", target_language))
        })?;

        if code == "en" {
            return Ok(text.to_string());
        }

        let url = format!(
            "https://translate.googleapis.com/translate_a/single?client=gtx&sl=auto&tl={}&dt=t&q={}",
            code,
            urlencoding::encode(text)
        );

        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| ChatError::Translation(e.to_string()))?;

        if !response.status().is_success() {
            return Err(ChatError::Translation(format!(
                "translate endpoint returned {}",
                response.status()
            )));
        }

        let payload: Value = response
            .json()
            .await
            .map_err(|e| ChatError::Translation(e.to_string()))?;

        let translated = parse_translation(&payload);
        if translated.is_empty() {
            return Err(ChatError::Translation("empty translation".to_string()));
        }
        Ok(translated)
    }
}

/// The endpoint returns nested arrays: `[[[translated, original, ...], ...], ...]`.
/// Concatenate the first element of each segment.
fn parse_translation(payload: &Value) -> String {
    let mut out = String::new();
    if let Some(segments) = payload.get(0).and_then(|v| v.as_array()) {
        for segment in segments {
            if let Some(piece) = segment.get(0).and_then(|v| v.as_str()) {
                out.push_str(piece);
            }
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn language_names_resolve_to_codes() {
        assert_eq!(language_code("Spanish"), Some("es"));
        assert_eq!(language_code("chinese"), Some("zh-CN"));
        assert_eq!(language_code("English"), Some("en"));
        assert_eq!(language_code("Klingon"), None);
    }

    #[test]
    fn translation_segments_are_concatenated() {
        let payload = json!([
            [
                ["Hola, ", "Hello, ", null],
                ["mundo.", "world.", null]
            ],
            null
        ]);
        assert_eq!(parse_translation(&payload), "Hola, mundo.");
    }

    #[test]
    fn malformed_payload_yields_empty_string() {
        assert_eq!(parse_translation(&json!({"weird": true})), "");
    }
}
