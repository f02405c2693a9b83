//! Choice strings: `Name` or `Name(key=value,key2=value2)`.

use std::sync::LazyLock;

use regex::Regex;

use crate::core::errors::TunableError;
use crate::core::value::Value;
use crate::select::capability::Params;

static CHOICE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\s*([^()\s]+)\s*(?:\((.*)\))?\s*$").expect("valid choice regex")
});

/// A parsed choice string.
#[derive(Debug, Clone, PartialEq)]
pub struct Choice {
    pub name: String,
    pub params: Params,
}

impl Choice {
    /// Parse `Name` or `Name(k=v,...)`.
    pub fn parse(input: &str) -> Result<Choice, TunableError> {
        let caps = CHOICE_RE
            .captures(input)
            .ok_or_else(|| TunableError::malformed("choice", format!("`{}`", input)))?;

        let name = caps[1].to_string();
        let mut params = Params::new();

        if let Some(list) = caps.get(2) {
            for item in list.as_str().split(',') {
                let item = item.trim();
                if item.is_empty() {
                    continue;
                }
                let (key, value) = item.split_once('=').ok_or_else(|| {
                    TunableError::malformed(
                        "choice",
                        format!("parameter `{}` in `{}` has no `=`", item, input),
                    )
                })?;
                params.insert(key.trim().to_string(), cast_param(value.trim()));
            }
        }

        Ok(Choice { name, params })
    }
}

/// Best-effort typing of an inline parameter: bool, then int, then float,
/// otherwise text.
pub fn cast_param(raw: &str) -> Value {
    match raw.to_lowercase().as_str() {
        "true" => return Value::Bool(true),
        "false" => return Value::Bool(false),
        _ => {}
    }

    if let Ok(i) = raw.parse::<i64>() {
        return Value::Int(i);
    }

    if let Ok(x) = raw.parse::<f64>() {
        return Value::Float(x);
    }

    Value::Str(raw.to_string())
}
