//! Leaf value formatting.
//!
//! The nearest enclosing section decides how its leaf values look through its
//! `format` prop (`number`, `currency`, `percent`, `date`) and the
//! `decimals`, `currency` and `dateFormat` options.

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde_json::Value;
use std::fmt::Write;
use tracing::warn;

use crate::components::value_text;
use crate::node::Props;

const DEFAULT_DATE_FORMAT: &str = "%Y-%m-%d";

#[derive(Debug, Clone)]
pub struct Formatter {
    lang: String,
}

impl Default for Formatter {
    fn default() -> Self {
        Self::new("en")
    }
}

/// Thousands and decimal separators for a language tag
fn separators(lang: &str) -> (&'static str, &'static str) {
    let primary = lang.split(['-', '_']).next().unwrap_or(lang).to_ascii_lowercase();
    match primary.as_str() {
        "es" | "de" | "it" | "pt" | "nl" | "id" | "tr" => (".", ","),
        "fr" | "ru" | "pl" | "cs" | "sv" | "fi" | "nb" => ("\u{a0}", ","),
        _ => (",", "."),
    }
}

fn currency_symbol(code: &str) -> &str {
    match code.to_ascii_uppercase().as_str() {
        "USD" | "MXN" | "CAD" | "AUD" => "$",
        "EUR" => "€",
        "GBP" => "£",
        "JPY" | "CNY" => "¥",
        "INR" => "₹",
        "BRL" => "R$",
        _ => code,
    }
}

impl Formatter {
    pub fn new(lang: impl Into<String>) -> Self {
        Self { lang: lang.into() }
    }

    pub fn lang(&self) -> &str {
        &self.lang
    }

    pub fn set_lang(&mut self, lang: impl Into<String>) {
        self.lang = lang.into();
    }

    /// Format `value` with the options of the enclosing `section`, if any.
    /// Values the requested format cannot handle are rendered as plain text.
    pub fn format(&self, value: &Value, section: Option<&Props>) -> String {
        let Some(section) = section else {
            return value_text(value);
        };
        let decimals = section.get("decimals").and_then(Value::as_u64).map(|d| d.min(20) as usize);

        match section.get("format").and_then(Value::as_str) {
            Some("number") => match as_number(value) {
                Some(n) => self.number(n, decimals.unwrap_or(if n.fract() == 0.0 { 0 } else { 2 })),
                None => value_text(value),
            },
            Some("currency") => match as_number(value) {
                Some(n) => {
                    let code = section.get("currency").and_then(Value::as_str).unwrap_or("USD");
                    self.currency(n, code, decimals.unwrap_or(2))
                }
                None => value_text(value),
            },
            Some("percent") => match as_number(value) {
                Some(n) => format!("{}%", self.number(n * 100.0, decimals.unwrap_or(0))),
                None => value_text(value),
            },
            Some("date") => {
                let pattern = section
                    .get("dateFormat")
                    .and_then(Value::as_str)
                    .unwrap_or(DEFAULT_DATE_FORMAT);
                match as_date(value) {
                    Some(date) => format_date(&date, pattern).unwrap_or_else(|| value_text(value)),
                    None => value_text(value),
                }
            }
            _ => value_text(value),
        }
    }

    /// Grouped number with a fixed count of decimals
    pub fn number(&self, n: f64, decimals: usize) -> String {
        let (thousands, decimal) = separators(&self.lang);
        let fixed = format!("{:.*}", decimals, n.abs());
        let (int_part, frac_part) = match fixed.split_once('.') {
            Some((i, f)) => (i, Some(f)),
            None => (fixed.as_str(), None),
        };

        let mut grouped = String::with_capacity(int_part.len() + int_part.len() / 3);
        for (i, digit) in int_part.chars().enumerate() {
            if i > 0 && (int_part.len() - i) % 3 == 0 {
                grouped.push_str(thousands);
            }
            grouped.push(digit);
        }

        let negative = n < 0.0 && fixed.chars().any(|c| c.is_ascii_digit() && c != '0');
        let mut out = String::new();
        if negative {
            out.push('-');
        }
        out.push_str(&grouped);
        if let Some(frac) = frac_part {
            out.push_str(decimal);
            out.push_str(frac);
        }
        out
    }

    pub fn currency(&self, n: f64, code: &str, decimals: usize) -> String {
        let amount = self.number(n, decimals);
        let symbol = currency_symbol(code);
        if separators(&self.lang).1 == "." {
            match amount.strip_prefix('-') {
                Some(rest) => format!("-{symbol}{rest}"),
                None => format!("{symbol}{amount}"),
            }
        } else {
            format!("{amount}\u{a0}{symbol}")
        }
    }
}

fn as_number(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

/// Dates from RFC 3339 strings, plain `YYYY-MM-DD` dates or epoch milliseconds
/// None when `pattern` holds a specifier chrono cannot render
fn format_date(date: &NaiveDateTime, pattern: &str) -> Option<String> {
    let mut out = String::new();
    if write!(out, "{}", date.format(pattern)).is_err() {
        warn!(pattern, "invalid dateFormat, leaving the value unformatted");
        return None;
    }
    Some(out)
}

fn as_date(value: &Value) -> Option<NaiveDateTime> {
    match value {
        Value::Number(n) => DateTime::<Utc>::from_timestamp_millis(n.as_i64()?).map(|d| d.naive_utc()),
        Value::String(s) => DateTime::parse_from_rfc3339(s)
            .map(|d| d.naive_utc())
            .ok()
            .or_else(|| NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S").ok())
            .or_else(|| NaiveDate::parse_from_str(s, "%Y-%m-%d").ok().and_then(|d| d.and_hms_opt(0, 0, 0))),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn section(value: Value) -> Props {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn test_plain_values_without_section() {
        let f = Formatter::default();
        assert_eq!(f.format(&json!("Hello"), None), "Hello");
        assert_eq!(f.format(&json!(42), None), "42");
        assert_eq!(f.format(&json!(true), None), "true");
    }

    #[test]
    fn test_number_grouping_per_language() {
        let s = section(json!({"format": "number", "decimals": 2}));
        assert_eq!(Formatter::new("en").format(&json!(1234567.891), Some(&s)), "1,234,567.89");
        assert_eq!(Formatter::new("es-MX").format(&json!(1234567.891), Some(&s)), "1.234.567,89");
        assert_eq!(Formatter::new("en").format(&json!(-999), Some(&s)), "-999.00");
        let whole = section(json!({"format": "number"}));
        assert_eq!(Formatter::new("en").format(&json!(1000), Some(&whole)), "1,000");
    }

    #[test]
    fn test_currency_and_percent() {
        let usd = section(json!({"format": "currency"}));
        assert_eq!(Formatter::new("en").format(&json!(1500), Some(&usd)), "$1,500.00");
        let eur = section(json!({"format": "currency", "currency": "EUR"}));
        assert_eq!(Formatter::new("de").format(&json!("12.5"), Some(&eur)), "12,50\u{a0}€");
        let pct = section(json!({"format": "percent", "decimals": 1}));
        assert_eq!(Formatter::new("en").format(&json!(0.256), Some(&pct)), "25.6%");
    }

    #[test]
    fn test_dates() {
        let s = section(json!({"format": "date", "dateFormat": "%d/%m/%Y"}));
        let f = Formatter::default();
        assert_eq!(f.format(&json!("2024-03-05"), Some(&s)), "05/03/2024");
        assert_eq!(f.format(&json!("2024-03-05T10:00:00Z"), Some(&s)), "05/03/2024");
        assert_eq!(f.format(&json!(0), Some(&s)), "01/01/1970");
        assert_eq!(f.format(&json!("soon"), Some(&s)), "soon");
    }

    #[test]
    fn test_invalid_date_pattern_keeps_value() {
        let s = section(json!({"format": "date", "dateFormat": "%Q"}));
        assert_eq!(Formatter::default().format(&json!("2024-01-02"), Some(&s)), "2024-01-02");
        let trailing = section(json!({"format": "date", "dateFormat": "%Y %"}));
        assert_eq!(Formatter::default().format(&json!("2024-01-02"), Some(&trailing)), "2024-01-02");
    }
}
