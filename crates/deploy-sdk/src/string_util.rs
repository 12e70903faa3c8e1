use serde::Serialize;

/// String utility functions.
pub struct StringUtil;

impl StringUtil {
    /// Serialize a value to a pretty-printed JSON string for console dumps.
    pub fn convert_to_json<T: Serialize>(value: &T) -> String {
        serde_json::to_string_pretty(value)
            .unwrap_or_else(|e| format!("<serialization error: {e}>"))
    }

    /// Convert a string to a boolean.
    ///
    /// Valid true values: `"1"`, `"true"`, `"$true"` (case-insensitive).
    /// Valid false values: `"0"`, `"false"`, `"$false"` (case-insensitive).
    /// Returns `None` for unrecognized values.
    pub fn convert_to_bool(value: &str) -> Option<bool> {
        let value = value.trim();
        if value.is_empty() {
            return None;
        }
        match value.to_lowercase().as_str() {
            "1" | "true" | "$true" => Some(true),
            "0" | "false" | "$false" => Some(false),
            _ => None,
        }
    }
}
