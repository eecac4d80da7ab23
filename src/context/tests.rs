use super::{Context, State};
use crate::dispatch::{Args, DispatchParam, Dispatchable, ParamType};
use crate::error::{ErrorMatcher, HttpError, HttpErrorKind};
use crate::http::RawRequest;
use crate::region::{EndpointFn, EndpointOptions, Region};
use crate::router::Router;
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

fn echo_args() -> EndpointFn {
    Arc::new(|args: &Args| {
        Ok(json!({
            "q": args.get_str("q"),
            "limit": args.get_i64("limit"),
        }))
    })
}

fn search_region() -> Region {
    let schema = Dispatchable::from_params(vec![
        DispatchParam::new("q", ParamType::Str),
        DispatchParam::new("limit", ParamType::Int).with_default(json!(10)),
    ])
    .expect("schema");
    let mut root = Region::new("root");
    root.add_endpoint(
        "/search",
        echo_args(),
        EndpointOptions::new()
            .methods([http::Method::GET, http::Method::POST])
            .dispatchable(schema),
    )
    .expect("add");
    root
}

fn run_pipeline(router: &Router, raw: RawRequest) -> Context {
    let mut ctx = Context::new(raw, true);
    let steps = ctx
        .initialize()
        .and_then(|()| ctx.process_request())
        .and_then(|()| ctx.determine_endpoint(router))
        .and_then(|()| ctx.generate_response());
    if let Err(err) = steps {
        ctx.fail(err, router.root_chain());
    }
    ctx.cleanup();
    ctx
}

#[test]
fn test_pipeline_happy_path() {
    let router = Router::new(&search_region(), HashMap::new()).expect("seal");
    let mut ctx = Context::new(RawRequest::new("GET", "/search?q=ada"), true);

    assert_eq!(ctx.state(), State::Created);
    ctx.initialize().expect("init");
    assert_eq!(ctx.state(), State::Initialized);
    ctx.process_request().expect("process");
    assert_eq!(ctx.state(), State::RequestProcessed);
    ctx.determine_endpoint(&router).expect("route");
    assert_eq!(ctx.state(), State::EndpointDetermined);
    ctx.generate_response().expect("respond");
    assert_eq!(ctx.state(), State::ResponseGenerated);
    ctx.cleanup();
    assert_eq!(ctx.state(), State::Cleaned);

    let response = ctx.into_response().expect("response");
    assert_eq!(response.status, 200);
    assert_eq!(response.body["q"], json!("ada"));
    assert_eq!(response.body["limit"], json!(10));
}

#[test]
fn test_stage_out_of_order_is_context_processing() {
    let mut ctx = Context::new(RawRequest::new("GET", "/"), false);
    let err = ctx.generate_response().unwrap_err();
    assert_eq!(err.kind, HttpErrorKind::ContextProcessing);
    assert_eq!(ctx.state(), State::Created);

    ctx.initialize().expect("init");
    let err = ctx.initialize().unwrap_err();
    assert_eq!(err.kind, HttpErrorKind::ContextProcessing);
}

#[test]
fn test_required_parameter_missing_fails() {
    let router = Router::new(&search_region(), HashMap::new()).expect("seal");
    let ctx = run_pipeline(&router, RawRequest::new("GET", "/search"));

    let exc = ctx.exception().expect("exception");
    assert_eq!(exc.kind, HttpErrorKind::MissingParameter);
    let response = ctx.into_response().expect("response");
    assert_eq!(response.status, 400);
}

#[test]
fn test_body_field_binds_and_coerces() {
    let router = Router::new(&search_region(), HashMap::new()).expect("seal");
    let raw = RawRequest::new("POST", "/search").with_json(&json!({"q": "ada", "limit": "25"}));
    let ctx = run_pipeline(&router, raw);

    let response = ctx.into_response().expect("response");
    assert_eq!(response.status, 200);
    // The form-style string "25" is coerced to the declared int type.
    assert_eq!(response.body["limit"], json!(25));
}

#[test]
fn test_query_beats_body_and_default() {
    let router = Router::new(&search_region(), HashMap::new()).expect("seal");
    let raw = RawRequest::new("POST", "/search?q=query-wins&limit=3")
        .with_json(&json!({"q": "body-loses"}));
    let ctx = run_pipeline(&router, raw);

    let response = ctx.into_response().expect("response");
    assert_eq!(response.body["q"], json!("query-wins"));
    assert_eq!(response.body["limit"], json!(3));
}

#[test]
fn test_null_endpoint_body_becomes_204() {
    let mut root = Region::new("root");
    root.delete("/thing", Arc::new(|_: &Args| Ok(Value::Null)))
        .expect("add");
    let router = Router::new(&root, HashMap::new()).expect("seal");

    let ctx = run_pipeline(&router, RawRequest::new("DELETE", "/thing"));
    let response = ctx.into_response().expect("response");
    assert_eq!(response.status, 204);
}

#[test]
fn test_fail_renders_through_exception_handler() {
    let mut root = Region::new("root");
    root.add_exception_handler(
        ErrorMatcher::Kind(HttpErrorKind::EndpointNotFound),
        Arc::new(|err: &HttpError| Ok(json!({"custom": err.kind.name()}))),
        HashMap::new(),
    );
    let router = Router::new(&root, HashMap::new()).expect("seal");

    let ctx = run_pipeline(&router, RawRequest::new("GET", "/missing"));
    assert_eq!(ctx.state(), State::Cleaned);
    let response = ctx.into_response().expect("response");
    assert_eq!(response.status, 404);
    assert_eq!(response.body["custom"], json!("EndpointNotFound"));
}

#[test]
fn test_unhandled_error_uses_catalog_body() {
    let root = Region::new("root");
    let router = Router::new(&root, HashMap::new()).expect("seal");

    let ctx = run_pipeline(&router, RawRequest::new("GET", "/missing"));
    let response = ctx.into_response().expect("response");
    assert_eq!(response.status, 404);
    assert_eq!(response.body["error"], json!("EndpointNotFound"));
}

#[test]
fn test_hooks_run_in_cascade_order() {
    let log: Arc<Mutex<Vec<&'static str>>> = Arc::new(Mutex::new(Vec::new()));
    let push = |log: &Arc<Mutex<Vec<&'static str>>>, tag: &'static str| {
        let log = Arc::clone(log);
        move || log.lock().expect("lock").push(tag)
    };

    let mut outer = Region::new("outer");
    let record = push(&log, "outer-before");
    outer.add_before_hook(Arc::new(move |_| {
        record();
        Ok(())
    }));
    let record = push(&log, "outer-after");
    outer.add_after_hook(Arc::new(move |_, _| {
        record();
        Ok(())
    }));

    let mut inner = Region::new("inner");
    let record = push(&log, "inner-before");
    inner.add_before_hook(Arc::new(move |_| {
        record();
        Ok(())
    }));
    let record = push(&log, "inner-after");
    inner.add_after_hook(Arc::new(move |_, _| {
        record();
        Ok(())
    }));
    inner
        .get("/ping", Arc::new(|_: &Args| Ok(json!("pong"))))
        .expect("add");
    outer.add_region(inner, None).expect("attach");

    let router = Router::new(&outer, HashMap::new()).expect("seal");
    let ctx = run_pipeline(&router, RawRequest::new("GET", "/ping"));
    assert_eq!(ctx.into_response().expect("response").status, 200);
    assert_eq!(
        *log.lock().expect("lock"),
        vec!["outer-before", "inner-before", "inner-after", "outer-after"]
    );
}

#[test]
fn test_failing_after_hook_does_not_rerun_earlier_hooks() {
    let log: Arc<Mutex<Vec<&'static str>>> = Arc::new(Mutex::new(Vec::new()));

    let mut root = Region::new("root");
    let audit = Arc::clone(&log);
    root.add_after_hook(Arc::new(move |_, _| {
        audit.lock().expect("lock").push("audit");
        Ok(())
    }));
    let broken = Arc::clone(&log);
    root.add_after_hook(Arc::new(move |_, _| {
        broken.lock().expect("lock").push("broken");
        Err(HttpError::new(HttpErrorKind::Conflict))
    }));
    let trailer = Arc::clone(&log);
    root.add_after_hook(Arc::new(move |_, _| {
        trailer.lock().expect("lock").push("trailer");
        Ok(())
    }));
    root.get("/ping", Arc::new(|_: &Args| Ok(json!("pong"))))
        .expect("add");
    let router = Router::new(&root, HashMap::new()).expect("seal");

    let ctx = run_pipeline(&router, RawRequest::new("GET", "/ping"));
    let exc = ctx.exception().expect("exception");
    assert_eq!(exc.kind, HttpErrorKind::Conflict);
    let response = ctx.into_response().expect("response");
    assert_eq!(response.status, 409);
    // The hook that succeeded and the one that failed both ran exactly once;
    // only the remaining hook fires on the error response.
    assert_eq!(*log.lock().expect("lock"), vec!["audit", "broken", "trailer"]);
}

#[test]
fn test_before_hook_error_is_rendered_as_failure() {
    let mut root = Region::new("root");
    root.add_before_hook(Arc::new(|_| {
        Err(HttpError::new(HttpErrorKind::Unauthorized))
    }));
    root.get("/secret", Arc::new(|_: &Args| Ok(json!("never"))))
        .expect("add");
    let router = Router::new(&root, HashMap::new()).expect("seal");

    let ctx = run_pipeline(&router, RawRequest::new("GET", "/secret"));
    let exc = ctx.exception().expect("exception");
    assert_eq!(exc.kind, HttpErrorKind::Unauthorized);
    let response = ctx.into_response().expect("response");
    assert_eq!(response.status, 401);
}

#[test]
fn test_cleanup_releases_resources_and_is_idempotent() {
    let mut ctx = Context::new(RawRequest::new("GET", "/"), false);
    ctx.set_resource("db", json!("connection"));
    assert_eq!(ctx.resource("db"), Some(&json!("connection")));

    ctx.cleanup();
    assert_eq!(ctx.state(), State::Cleaned);
    assert_eq!(ctx.resource("db"), None);
    ctx.cleanup();
    assert_eq!(ctx.state(), State::Cleaned);
}

#[test]
fn test_debug_flag_gates_error_detail() {
    let root = Region::new("root");
    let router = Router::new(&root, HashMap::new()).expect("seal");

    let run = |debug: bool| {
        let mut ctx = Context::new(RawRequest::new("GET", "/missing"), debug);
        let steps = ctx
            .initialize()
            .and_then(|()| ctx.process_request())
            .and_then(|()| ctx.determine_endpoint(&router));
        if let Err(err) = steps {
            ctx.fail(err, router.root_chain());
        }
        ctx.cleanup();
        ctx.into_response().expect("response").body
    };

    assert!(run(true).get("description").is_some());
    assert!(run(false).get("description").is_none());
}
