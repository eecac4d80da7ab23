use laconic::{
    Application, Args, ErrorFamily, ErrorMatcher, HttpError, HttpErrorKind, RawRequest, Region,
};
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::Arc;

use tracing_util::TestTracing;

fn failing(kind: HttpErrorKind) -> laconic::region::EndpointFn {
    Arc::new(move |_: &Args| Err(HttpError::new(kind)))
}

fn tagged(tag: &'static str) -> laconic::region::ErrorHandlerFn {
    Arc::new(move |err: &HttpError| Ok(json!({ "via": tag, "error": err.kind.name() })))
}

#[test]
fn test_inner_handler_shadows_outer() {
    let _tracing = TestTracing::init();
    let mut app = Application::new("handlers");
    app.add_exception_handler(
        ErrorMatcher::Kind(HttpErrorKind::Conflict),
        tagged("outer"),
        HashMap::new(),
    );

    let mut inner = Region::new("inner");
    inner.add_exception_handler(
        ErrorMatcher::Family(ErrorFamily::Client),
        tagged("inner"),
        HashMap::new(),
    );
    inner
        .get("/conflict", failing(HttpErrorKind::Conflict))
        .expect("add");
    app.add_region(inner, None).expect("attach");

    let app = app.build().expect("build");
    let response = app.handle(RawRequest::new("GET", "/conflict"));

    // The inner family matcher wins over the outer exact one.
    assert_eq!(response.status, 409);
    assert_eq!(response.body["via"], json!("inner"));
}

#[test]
fn test_exact_beats_family_beats_any_in_one_scope() {
    let _tracing = TestTracing::init();
    let mut app = Application::new("handlers");
    app.add_exception_handler(ErrorMatcher::Any, tagged("any"), HashMap::new());
    app.add_exception_handler(
        ErrorMatcher::Family(ErrorFamily::Server),
        tagged("family"),
        HashMap::new(),
    );
    app.add_exception_handler(
        ErrorMatcher::Kind(HttpErrorKind::BadGateway),
        tagged("exact"),
        HashMap::new(),
    );
    app.get("/boom", failing(HttpErrorKind::BadGateway))
        .expect("add");
    app.get("/down", failing(HttpErrorKind::ServiceUnavailable))
        .expect("add");
    app.get("/teapot", failing(HttpErrorKind::Gone)).expect("add");
    let app = app.build().expect("build");

    let response = app.handle(RawRequest::new("GET", "/boom"));
    assert_eq!(response.body["via"], json!("exact"));

    let response = app.handle(RawRequest::new("GET", "/down"));
    assert_eq!(response.body["via"], json!("family"));

    let response = app.handle(RawRequest::new("GET", "/teapot"));
    assert_eq!(response.body["via"], json!("any"));
}

#[test]
fn test_unrouted_errors_use_root_handlers() {
    let _tracing = TestTracing::init();
    let mut app = Application::new("handlers");
    app.add_exception_handler(
        ErrorMatcher::Kind(HttpErrorKind::EndpointNotFound),
        tagged("root-404"),
        HashMap::new(),
    );
    let app = app.build().expect("build");

    let response = app.handle(RawRequest::new("GET", "/nowhere"));
    assert_eq!(response.status, 404);
    assert_eq!(response.body["via"], json!("root-404"));
    assert_eq!(response.body["error"], json!("EndpointNotFound"));
}

#[test]
fn test_handler_failure_degrades_to_runtime_error() {
    let _tracing = TestTracing::init();
    let mut app = Application::new("handlers");
    app.add_exception_handler(
        ErrorMatcher::Any,
        Arc::new(|_: &HttpError| -> Result<Value, HttpError> {
            Err(HttpError::new(HttpErrorKind::InternalServerError))
        }),
        HashMap::new(),
    );
    app.get("/gone", failing(HttpErrorKind::Gone)).expect("add");
    let app = app.build().expect("build");

    let response = app.handle(RawRequest::new("GET", "/gone"));
    assert_eq!(response.status, 500);
    assert_eq!(response.body["error"], json!("EndpointRuntime"));
}

#[test]
fn test_redirect_error_keeps_location_header_through_handler() {
    let _tracing = TestTracing::init();
    let mut app = Application::new("handlers");
    app.add_exception_handler(
        ErrorMatcher::Family(ErrorFamily::Redirection),
        tagged("redirect"),
        HashMap::new(),
    );
    app.get(
        "/old",
        Arc::new(|_: &Args| Err(HttpError::redirect(HttpErrorKind::MovedPermanently, "/new"))),
    )
    .expect("add");
    let app = app.build().expect("build");

    let response = app.handle(RawRequest::new("GET", "/old"));
    assert_eq!(response.status, 301);
    assert_eq!(response.get_header("location"), Some("/new"));
    assert_eq!(response.body["via"], json!("redirect"));
}
