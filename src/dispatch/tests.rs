use super::{Args, DispatchParam, Dispatchable, ParamType};
use crate::error::{DefinitionError, HttpErrorKind};
use serde_json::json;

#[test]
fn test_rule_derives_typed_params() {
    let d = Dispatchable::from_rule("/users/{id:int}/files/{name}").expect("valid rule");
    let params = d.params();
    assert_eq!(params.len(), 2);
    assert_eq!(params[0].name, "id");
    assert_eq!(params[0].ty, ParamType::Int);
    assert_eq!(params[1].name, "name");
    assert_eq!(params[1].ty, ParamType::Str);
}

#[test]
fn test_unknown_type_tag_is_definition_error() {
    let err = Dispatchable::from_rule("/users/{id:uuid}").unwrap_err();
    assert!(matches!(err, DefinitionError::MalformedRule { .. }));
}

#[test]
fn test_duplicate_param_is_definition_error() {
    let err = Dispatchable::from_rule("/a/{x}/b/{x:int}").unwrap_err();
    assert!(matches!(
        err,
        DefinitionError::DuplicateParameter { ref name, .. } if name == "x"
    ));
}

#[test]
fn test_malformed_segment_is_definition_error() {
    let err = Dispatchable::from_rule("/users/{bad name}").unwrap_err();
    assert!(matches!(err, DefinitionError::MalformedRule { .. }));
}

#[test]
fn test_stray_brace_segment_is_a_literal() {
    // Only fully-braced segments are parameters; a lone brace stays literal.
    let d = Dispatchable::from_rule("/v1}/x/{id:int}").expect("valid rule");
    let params = d.params();
    assert_eq!(params.len(), 1);
    assert_eq!(params[0].name, "id");
}

#[test]
fn test_ensure_typed_rejects_untyped_param() {
    let d = Dispatchable::from_params(vec![DispatchParam::new("blob", ParamType::Untyped)])
        .expect("schema");
    let err = d.ensure_typed("/blobs").unwrap_err();
    assert!(matches!(
        err,
        DefinitionError::UntypedParameter { ref name, .. } if name == "blob"
    ));
}

#[test]
fn test_int_coercion() {
    assert_eq!(ParamType::Int.coerce("id", "42").expect("int"), json!(42));
    let err = ParamType::Int.coerce("id", "abc").unwrap_err();
    assert_eq!(err.kind, HttpErrorKind::InvalidParameter);
}

#[test]
fn test_float_coercion() {
    assert_eq!(
        ParamType::Float.coerce("ratio", "0.5").expect("float"),
        json!(0.5)
    );
    assert!(ParamType::Float.coerce("ratio", "half").is_err());
}

#[test]
fn test_string_and_path_pass_through() {
    assert_eq!(
        ParamType::Str.coerce("name", "abc").expect("str"),
        json!("abc")
    );
    assert_eq!(
        ParamType::Path.coerce("rest", "a/b/c").expect("path"),
        json!("a/b/c")
    );
}

#[test]
fn test_value_coercion_for_body_fields() {
    // Form-decoded strings coerce to the declared type.
    assert_eq!(
        ParamType::Int.coerce_value("n", &json!("25")).expect("int"),
        json!(25)
    );
    // Already-typed JSON passes through.
    assert_eq!(
        ParamType::Int.coerce_value("n", &json!(25)).expect("int"),
        json!(25)
    );
    assert_eq!(
        ParamType::Float.coerce_value("r", &json!(2)).expect("float"),
        json!(2)
    );
    let err = ParamType::Int.coerce_value("n", &json!(true)).unwrap_err();
    assert_eq!(err.kind, HttpErrorKind::InvalidParameter);
}

#[test]
fn test_args_accessors() {
    let mut args = Args::new();
    args.insert("id", json!(7));
    args.insert("name", json!("ada"));
    args.insert("debug", json!(true));
    assert_eq!(args.get_i64("id"), Some(7));
    assert_eq!(args.get_str("name"), Some("ada"));
    assert_eq!(args.get_bool("debug"), Some(true));
    assert!(args.require("id").is_ok());
    let err = args.require("absent").unwrap_err();
    assert_eq!(err.kind, HttpErrorKind::MissingParameter);
}
