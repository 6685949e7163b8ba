//! Validation of quote card input
//!
//! Works on raw JSON so that wrong types are reported per field instead of
//! failing the whole body.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::design::{LIMIT_AUTHOR, LIMIT_CORE_VALUE, LIMIT_QUOTE, LIMIT_SUPPORTING_VALUE, Limit};
use super::presets::{CLASSIC_STYLE, is_known_style};

/// Field name (camelCase, as sent) to its first error message
pub type FieldErrors = BTreeMap<String, String>;

/// Trimmed, length-checked input for a quote card
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuoteInput {
    pub core_value: String,
    pub supporting_value: String,
    pub quote: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub author: Option<String>,
    #[serde(default = "default_style")]
    pub style: String,
}

fn default_style() -> String {
    CLASSIC_STYLE.to_string()
}

impl QuoteInput {
    pub fn new(core_value: &str, supporting_value: &str, quote: &str, author: Option<&str>) -> Self {
        Self {
            core_value: core_value.to_string(),
            supporting_value: supporting_value.to_string(),
            quote: quote.to_string(),
            author: author.filter(|a| !a.is_empty()).map(str::to_string),
            style: default_style(),
        }
    }
}

/// Validate a JSON body into a [`QuoteInput`]
pub fn validate_quote(body: &Value) -> Result<QuoteInput, FieldErrors> {
    let mut errors = FieldErrors::new();

    let core_value = required_text(body, "coreValue", "Core value", LIMIT_CORE_VALUE, &mut errors);
    let supporting_value = required_text(body, "supportingValue", "Supporting value", LIMIT_SUPPORTING_VALUE, &mut errors);
    let quote = required_text(body, "quote", "Quote", LIMIT_QUOTE, &mut errors);

    let author = match body.get("author") {
        None | Some(Value::Null) => None,
        Some(Value::String(s)) => {
            let s = s.trim();
            if s.chars().count() > LIMIT_AUTHOR.max {
                errors.insert(
                    "author".into(),
                    format!("Author must be {} characters or less", LIMIT_AUTHOR.max),
                );
            }
            (!s.is_empty()).then(|| s.to_string())
        }
        Some(_) => {
            errors.insert("author".into(), "Author must be a string".into());
            None
        }
    };

    let style = match body.get("style") {
        None | Some(Value::Null) => default_style(),
        Some(Value::String(s)) if is_known_style(s) => s.clone(),
        Some(_) => {
            errors.insert("style".into(), "Invalid style selected".into());
            String::new()
        }
    };

    if !errors.is_empty() {
        return Err(errors);
    }
    Ok(QuoteInput {
        core_value,
        supporting_value,
        quote,
        author,
        style,
    })
}

fn required_text(body: &Value, field: &str, label: &str, limit: Limit, errors: &mut FieldErrors) -> String {
    let text = match body.get(field) {
        Some(Value::String(s)) => s.trim().to_string(),
        None | Some(Value::Null) => String::new(),
        Some(_) => {
            errors.insert(field.to_string(), format!("{} must be a string", label));
            return String::new();
        }
    };

    let length = text.chars().count();
    let message = if length < limit.min {
        if limit.min <= 1 {
            Some(format!("{} is required", label))
        } else {
            Some(format!("{} must be at least {} characters", label, limit.min))
        }
    } else if length > limit.max {
        Some(format!("{} must be {} characters or less", label, limit.max))
    } else {
        None
    };
    if let Some(message) = message {
        errors.insert(field.to_string(), message);
    }
    text
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_valid_input_is_trimmed() {
        let input = validate_quote(&json!({
            "coreValue": "  Growth ",
            "supportingValue": "Curiosity",
            "quote": "  Stay hungry, stay foolish.  ",
            "author": "   "
        }))
        .unwrap();

        assert_eq!(input.core_value, "Growth");
        assert_eq!(input.quote, "Stay hungry, stay foolish.");
        assert_eq!(input.author, None);
        assert_eq!(input.style, "style1");
    }

    #[test]
    fn test_missing_and_short_fields() {
        let errors = validate_quote(&json!({ "quote": "short" })).unwrap_err();
        assert_eq!(errors["coreValue"], "Core value is required");
        assert_eq!(errors["supportingValue"], "Supporting value is required");
        assert_eq!(errors["quote"], "Quote must be at least 10 characters");
    }

    #[test]
    fn test_limits_count_characters() {
        let ok = validate_quote(&json!({
            "coreValue": "é".repeat(50),
            "supportingValue": "x",
            "quote": "q".repeat(200),
            "author": "a".repeat(30)
        }));
        assert!(ok.is_ok());

        let errors = validate_quote(&json!({
            "coreValue": "x".repeat(51),
            "supportingValue": "x".repeat(61),
            "quote": "q".repeat(201),
            "author": "a".repeat(31)
        }))
        .unwrap_err();
        assert_eq!(errors.len(), 4);
        assert_eq!(errors["author"], "Author must be 30 characters or less");
    }

    #[test]
    fn test_style_must_be_known_and_active() {
        let body = |style: &str| {
            json!({
                "coreValue": "Growth",
                "supportingValue": "Curiosity",
                "quote": "Every day is a new beginning.",
                "style": style
            })
        };
        assert_eq!(validate_quote(&body("daily-anchor-2")).unwrap().style, "daily-anchor-2");
        let errors = validate_quote(&body("daily-anchor-1")).unwrap_err();
        assert_eq!(errors["style"], "Invalid style selected");
    }

    #[test]
    fn test_wrong_types_reported_per_field() {
        let errors = validate_quote(&json!({
            "coreValue": 5,
            "supportingValue": "Curiosity",
            "quote": "Every day is a new beginning.",
            "author": ["x"]
        }))
        .unwrap_err();
        assert_eq!(errors["coreValue"], "Core value must be a string");
        assert_eq!(errors["author"], "Author must be a string");
        assert!(!errors.contains_key("quote"));
    }
}
