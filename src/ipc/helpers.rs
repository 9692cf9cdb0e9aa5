use crate::store::StoreError;

pub fn required_str(params: &serde_json::Value, key: &str) -> Result<String, StoreError> {
    params
        .get(key)
        .and_then(|v| v.as_str())
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .ok_or_else(|| StoreError::Validation(format!("missing {}", key)))
}

pub fn required_i64(params: &serde_json::Value, key: &str) -> Result<i64, StoreError> {
    params
        .get(key)
        .and_then(|v| v.as_i64())
        .ok_or_else(|| StoreError::Validation(format!("missing {}", key)))
}

pub fn optional_str(params: &serde_json::Value, key: &str) -> Option<String> {
    params
        .get(key)
        .and_then(|v| v.as_str())
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}

pub fn optional_bool(params: &serde_json::Value, key: &str, default: bool) -> bool {
    params.get(key).and_then(|v| v.as_bool()).unwrap_or(default)
}

pub fn required_str_array(
    params: &serde_json::Value,
    key: &str,
) -> Result<Vec<String>, StoreError> {
    let arr = params
        .get(key)
        .and_then(|v| v.as_array())
        .ok_or_else(|| StoreError::Validation(format!("missing {}", key)))?;
    arr.iter()
        .map(|v| {
            v.as_str()
                .map(|s| s.to_string())
                .ok_or_else(|| StoreError::Validation(format!("{} must be an array of ids", key)))
        })
        .collect()
}
