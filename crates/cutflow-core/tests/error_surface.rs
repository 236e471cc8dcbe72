use cutflow_core::errors::{AnaError, ErrorInfo};

fn sample_info(code: &str, message: &str) -> ErrorInfo {
    ErrorInfo::new(code, message)
        .with_context("stage", "CutJet1")
        .with_context("run", 5)
}

#[test]
fn usage_error_surface() {
    let err = AnaError::Usage(sample_info("vary_token", "token names neither met nor jet"));
    assert_eq!(err.info().code, "vary_token");
    assert!(err.to_string().starts_with("usage error:"));
}

#[test]
fn config_error_surface() {
    let err = AnaError::config("origin_mismatch", "record origin differs from the job");
    assert_eq!(err.info().code, "origin_mismatch");
    assert!(err.info().context.is_empty());
}

#[test]
fn stage_error_surface() {
    let err = AnaError::Stage(sample_info("flag_index", "flag index out of range"));
    assert_eq!(err.info().code, "flag_index");
    assert_eq!(err.info().context.get("run").map(String::as_str), Some("5"));
}

#[test]
fn io_error_keeps_message() {
    let err = AnaError::io("log_write", "disk full");
    assert_eq!(err.info().message, "disk full");
}

#[test]
fn display_includes_context_and_hint() {
    let info = sample_info("S001", "schema mismatch").with_hint("regenerate the sample");
    let rendered = AnaError::Serde(info).to_string();
    assert!(rendered.contains("code: S001"));
    assert!(rendered.contains("stage=CutJet1"));
    assert!(rendered.contains("hint: regenerate the sample"));
}

#[test]
fn errors_serialize_with_family_tag() {
    let err = AnaError::Source(sample_info("malformed_record", "bad json"));
    let value = serde_json::to_value(&err).expect("serialize");
    assert_eq!(value["family"], "Source");
    assert_eq!(value["detail"]["code"], "malformed_record");
    let back: AnaError = serde_json::from_value(value).expect("deserialize");
    assert_eq!(back, err);
}
