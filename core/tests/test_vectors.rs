//! Verify build/parse methods against JSON test vectors stored in `test-vectors/`.
//!
//! Each vector file describes inputs, the expected request, a simulated
//! response and the expected parse result or error. Request parameters are
//! compared after decoding the body back into values, so the check covers
//! positional order and types rather than whitespace.

use odoo_core::codec::decode_method_call;
use odoo_core::{HttpRequest, HttpResponse, OdooClient, RpcError, SearchOptions, Struct, Value};

fn client(input: &serde_json::Value) -> OdooClient {
    OdooClient::new(
        input["server_url"].as_str().unwrap(),
        input["db"].as_str().unwrap(),
        input["use_proxy"].as_bool().unwrap(),
    )
}

fn to_struct(json: &serde_json::Value) -> Struct {
    match Value::from(json.clone()) {
        Value::Struct(s) => s,
        other => panic!("expected an object, got {other:?}"),
    }
}

fn simulated(case: &serde_json::Value) -> HttpResponse {
    let sim = &case["simulated_response"];
    HttpResponse {
        status: sim["status"].as_u64().unwrap() as u16,
        headers: Vec::new(),
        body: sim["body"].as_str().unwrap().to_string(),
    }
}

/// Compare a built request against `expected_request`.
fn check_request(name: &str, req: &HttpRequest, expected: &serde_json::Value) {
    assert_eq!(req.url, expected["url"].as_str().unwrap(), "{name}: url");

    let expected_headers: Vec<(String, String)> = expected["headers"]
        .as_array()
        .unwrap()
        .iter()
        .map(|h| {
            let arr = h.as_array().unwrap();
            (arr[0].as_str().unwrap().to_string(), arr[1].as_str().unwrap().to_string())
        })
        .collect();
    assert_eq!(req.headers, expected_headers, "{name}: headers");

    let call = decode_method_call(&req.body).unwrap();
    assert_eq!(call.method, expected["method"].as_str().unwrap(), "{name}: method");
    assert_eq!(Value::Array(call.params).into_json(), expected["params"], "{name}: params");

    if let Some(fragments) = expected.get("body_contains") {
        for fragment in fragments.as_array().unwrap() {
            let fragment = fragment.as_str().unwrap();
            assert!(req.body.contains(fragment), "{name}: body missing {fragment}\n{}", req.body);
        }
    }
}

fn check_error(name: &str, err: &RpcError, case: &serde_json::Value) {
    let expected = case["expected_error"].as_str().unwrap();
    let matched = match expected {
        "AuthenticationFailed" => matches!(err, RpcError::AuthenticationFailed),
        "RemoteFault" => matches!(err, RpcError::RemoteFault { .. }),
        "HttpStatus" => matches!(err, RpcError::HttpStatus { .. }),
        "MalformedResponse" => matches!(err, RpcError::MalformedResponse(_)),
        other => panic!("{name}: unknown expected_error: {other}"),
    };
    assert!(matched, "{name}: expected {expected}, got {err:?}");

    if let Some(parts) = case.get("expected_message_contains") {
        let msg = err.to_string();
        for part in parts.as_array().unwrap() {
            let part = part.as_str().unwrap();
            assert!(msg.contains(part), "{name}: '{msg}' should contain '{part}'");
        }
    }
}

// ---------------------------------------------------------------------------
// authenticate
// ---------------------------------------------------------------------------

#[test]
fn authenticate_test_vectors() {
    let raw = include_str!("../../test-vectors/authenticate.json");
    let vectors: serde_json::Value = serde_json::from_str(raw).unwrap();

    for case in vectors["cases"].as_array().unwrap() {
        let name = case["name"].as_str().unwrap();
        let input = &case["input"];
        let c = client(input);

        // Verify build
        let req = c.build_authenticate(
            input["username"].as_str().unwrap(),
            input["api_key"].as_str().unwrap(),
        );
        check_request(name, &req, &case["expected_request"]);

        // Verify parse
        match c.parse_authenticate(simulated(case)) {
            Ok(uid) => assert_eq!(uid, case["expected_result"].as_i64().unwrap(), "{name}: uid"),
            Err(err) => check_error(name, &err, case),
        }
    }
}

// ---------------------------------------------------------------------------
// search_read
// ---------------------------------------------------------------------------

fn search_options(json: &serde_json::Value) -> SearchOptions {
    let mut options = SearchOptions::new();
    if let Some(limit) = json.get("limit").and_then(serde_json::Value::as_i64) {
        options = options.limit(limit);
    }
    if let Some(offset) = json.get("offset").and_then(serde_json::Value::as_i64) {
        options = options.offset(offset);
    }
    if let Some(order) = json.get("order").and_then(serde_json::Value::as_str) {
        options = options.order(order);
    }
    if let Some(context) = json.get("context") {
        options = options.context(to_struct(context));
    }
    options
}

#[test]
fn search_read_test_vectors() {
    let raw = include_str!("../../test-vectors/search_read.json");
    let vectors: serde_json::Value = serde_json::from_str(raw).unwrap();

    for case in vectors["cases"].as_array().unwrap() {
        let name = case["name"].as_str().unwrap();
        let input = &case["input"];
        let c = client(input);
        let fields: Vec<&str> = input["fields"]
            .as_array()
            .unwrap()
            .iter()
            .map(|f| f.as_str().unwrap())
            .collect();

        // Verify build
        let req = c.build_search_read(
            input["uid"].as_i64().unwrap(),
            input["api_key"].as_str().unwrap(),
            input["model"].as_str().unwrap(),
            Value::from(input["domain"].clone()),
            &fields,
            &search_options(&input["options"]),
        );
        check_request(name, &req, &case["expected_request"]);

        // Verify parse
        match c.parse_search_read(simulated(case)) {
            Ok(records) => assert_eq!(
                Value::Array(records).into_json(),
                case["expected_result"],
                "{name}: records"
            ),
            Err(err) => check_error(name, &err, case),
        }
    }
}

// ---------------------------------------------------------------------------
// create
// ---------------------------------------------------------------------------

#[test]
fn create_test_vectors() {
    let raw = include_str!("../../test-vectors/create.json");
    let vectors: serde_json::Value = serde_json::from_str(raw).unwrap();

    for case in vectors["cases"].as_array().unwrap() {
        let name = case["name"].as_str().unwrap();
        let input = &case["input"];
        let c = client(input);

        // Verify build
        let req = c.build_create(
            input["uid"].as_i64().unwrap(),
            input["api_key"].as_str().unwrap(),
            input["model"].as_str().unwrap(),
            to_struct(&input["values"]),
            to_struct(&input["context"]),
        );
        check_request(name, &req, &case["expected_request"]);

        // Verify parse
        match c.parse_create(simulated(case)) {
            Ok(id) => assert_eq!(id, case["expected_result"].as_i64().unwrap(), "{name}: id"),
            Err(err) => check_error(name, &err, case),
        }
    }
}
