//! jq-style body reshaping, evaluated in-process with the jaq crates.
//!
//! Lets a non-feed JSON endpoint be reshaped into JSON-Feed shape before
//! parsing. The program's first output is taken as the new body.

use jaq_interpret::{Ctx, FilterT, ParseCtx, RcIter, Val};

use crate::app::{FreshetError, Result};

/// Run `program` over a raw response body. The body must be valid JSON.
pub fn apply_bytes(program: &str, body: &[u8]) -> Result<serde_json::Value> {
    let input: serde_json::Value = serde_json::from_slice(body)
        .map_err(|e| FreshetError::Transform(format!("jq input is not valid JSON: {e}")))?;
    apply(program, input)
}

pub fn apply(program: &str, input: serde_json::Value) -> Result<serde_json::Value> {
    let mut defs = ParseCtx::new(Vec::new());
    defs.insert_natives(jaq_core::core());
    defs.insert_defs(jaq_std::std());

    let (parsed, errs) = jaq_parse::parse(program, jaq_parse::main());
    let Some(main) = parsed.filter(|_| errs.is_empty()) else {
        return Err(FreshetError::Transform(format!(
            "invalid jq program {program:?}"
        )));
    };
    let filter = defs.compile(main);
    if !defs.errs.is_empty() {
        return Err(FreshetError::Transform(format!(
            "jq program {program:?} uses undefined names"
        )));
    }

    let inputs = RcIter::new(core::iter::empty());
    let mut outputs = filter.run((Ctx::new([], &inputs), Val::from(input)));
    let value = outputs
        .next()
        .ok_or_else(|| FreshetError::Transform("jq program produced no output".into()))?
        .map_err(|e| FreshetError::Transform(format!("jq evaluation failed: {e}")))?;
    Ok(serde_json::Value::from(value))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_identity() {
        let out = apply_bytes(".", br#"{"a": 1}"#).unwrap();
        assert_eq!(out, json!({"a": 1}));
    }

    #[test]
    fn test_reshape_array_into_feed() {
        let body = br#"[{"name": "Title 1", "link": "https://example.com/1"},
                        {"name": "Title 2", "link": "https://example.com/2"}]"#;
        let out = apply_bytes(
            r#"{title: "Example", items: [.[] | {id: .link, title: .name, url: .link}]}"#,
            body,
        )
        .unwrap();
        assert_eq!(out["title"], "Example");
        assert_eq!(out["items"][1]["title"], "Title 2");
        assert_eq!(out["items"][0]["url"], "https://example.com/1");
    }

    #[test]
    fn test_invalid_program() {
        let err = apply_bytes("][", br#"{}"#).unwrap_err();
        assert!(matches!(err, FreshetError::Transform(_)));
    }

    #[test]
    fn test_non_json_input() {
        let err = apply_bytes(".", b"<html></html>").unwrap_err();
        assert!(matches!(err, FreshetError::Transform(_)));
    }

    #[test]
    fn test_empty_output() {
        let err = apply_bytes("empty", br#"{}"#).unwrap_err();
        assert!(matches!(err, FreshetError::Transform(_)));
    }

    #[test]
    fn test_runtime_error() {
        let err = apply_bytes(r#".a + "x""#, br#"{"a": 1}"#).unwrap_err();
        assert!(matches!(err, FreshetError::Transform(_)));
    }
}
