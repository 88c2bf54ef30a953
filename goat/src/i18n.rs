use serde_json::Value;
use std::collections::HashMap;
use tracing::debug;

/// Text lookup applied to every leaf string before formatting
pub trait Translate {
    /// Translation of `text`, or None to keep the text as is
    fn translate(&self, text: &str) -> Option<String>;
}

impl<F> Translate for F
where
    F: Fn(&str) -> Option<String>,
{
    fn translate(&self, text: &str) -> Option<String> {
        self(text)
    }
}

/// Per-language string tables with a fallback language.
#[derive(Debug, Clone)]
pub struct Dictionary {
    lang: String,
    fallback_lang: Option<String>,
    entries: HashMap<String, HashMap<String, String>>,
}

impl Default for Dictionary {
    fn default() -> Self {
        Self::new("en")
    }
}

impl Dictionary {
    pub fn new(lang: impl Into<String>) -> Self {
        Self {
            lang: lang.into(),
            fallback_lang: None,
            entries: HashMap::new(),
        }
    }

    pub fn with_fallback(mut self, lang: impl Into<String>) -> Self {
        self.fallback_lang = Some(lang.into());
        self
    }

    /// Merge a table for `lang`; existing keys are overwritten.
    pub fn add_dictionary<K, V>(&mut self, lang: &str, table: impl IntoIterator<Item = (K, V)>)
    where
        K: Into<String>,
        V: Into<String>,
    {
        let entries = self.entries.entry(lang.to_string()).or_default();
        for (key, value) in table {
            entries.insert(key.into(), value.into());
        }
    }

    /// Merge `{"en": {"key": "text"}, "es": {...}}`. Non-string entries are skipped.
    pub fn add_dictionaries(&mut self, value: &Value) {
        let Some(langs) = value.as_object() else {
            return;
        };
        for (lang, table) in langs {
            let Some(table) = table.as_object() else {
                debug!(lang = %lang, "dictionary is not an object, skipping");
                continue;
            };
            self.add_dictionary(
                lang,
                table
                    .iter()
                    .filter_map(|(k, v)| v.as_str().map(|v| (k.clone(), v.to_string()))),
            );
        }
    }

    pub fn set_lang(&mut self, lang: impl Into<String>) {
        self.lang = lang.into();
    }

    pub fn lang(&self) -> &str {
        &self.lang
    }

    pub fn fallback_lang(&self) -> Option<&str> {
        self.fallback_lang.as_deref()
    }

    pub fn languages(&self) -> Vec<&str> {
        let mut langs: Vec<&str> = self.entries.keys().map(String::as_str).collect();
        langs.sort_unstable();
        langs
    }

    fn lookup(&self, lang: &str, key: &str) -> Option<&str> {
        self.entries.get(lang)?.get(key).map(String::as_str)
    }
}

impl Translate for Dictionary {
    fn translate(&self, text: &str) -> Option<String> {
        self.lookup(&self.lang, text)
            .or_else(|| self.fallback_lang.as_deref().and_then(|fb| self.lookup(fb, text)))
            .map(str::to_string)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_current_then_fallback() {
        let mut dict = Dictionary::new("es").with_fallback("en");
        dict.add_dictionaries(&json!({
            "en": {"hello": "Hello", "bye": "Bye"},
            "es": {"hello": "Hola"}
        }));
        assert_eq!(dict.translate("hello").as_deref(), Some("Hola"));
        assert_eq!(dict.translate("bye").as_deref(), Some("Bye"));
        assert_eq!(dict.translate("missing"), None);

        dict.set_lang("en");
        assert_eq!(dict.translate("hello").as_deref(), Some("Hello"));
        assert_eq!(dict.languages(), vec!["en", "es"]);
    }

    #[test]
    fn test_last_write_wins() {
        let mut dict = Dictionary::default();
        dict.add_dictionary("en", [("title", "One")]);
        dict.add_dictionary("en", [("title", "Two")]);
        assert_eq!(dict.translate("title").as_deref(), Some("Two"));
    }

    #[test]
    fn test_closure_translator() {
        let upper = |text: &str| Some(text.to_uppercase());
        assert_eq!(upper.translate("abc").as_deref(), Some("ABC"));
    }
}
