use thiserror::Error;
use wasm_bindgen::JsValue;

/// JS 边界上的解码错误。核心评估本身不会失败。
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("invalid JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("invalid JS value: {0}")]
    Value(#[from] serde_wasm_bindgen::Error),
    #[error("unknown numeric attribute `{0}`")]
    UnknownAttribute(String),
}

impl From<EngineError> for JsValue {
    fn from(error: EngineError) -> Self {
        JsValue::from_str(&error.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn json_errors_keep_their_message() {
        let error: EngineError = serde_json::from_str::<u32>("{")
            .map_err(EngineError::from)
            .expect_err("truncated json should fail");
        assert!(error.to_string().starts_with("invalid JSON:"));
    }

    #[test]
    fn unknown_attribute_names_the_input() {
        let error = EngineError::UnknownAttribute("speed".into());
        assert_eq!(error.to_string(), "unknown numeric attribute `speed`");
    }
}
