use axum::http::{self, Request, StatusCode};
use http_body_util::BodyExt;
use mock_odoo::app;
use odoo_core::codec::{decode_method_response, encode_method_call};
use odoo_core::{RpcError, Struct, Value};
use tower::ServiceExt;

async fn body_text(response: axum::response::Response) -> String {
    let bytes: bytes::Bytes = response.into_body().collect().await.unwrap().to_bytes();
    String::from_utf8(bytes.to_vec()).unwrap()
}

fn xml_request(uri: &str, body: String) -> Request<String> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header(http::header::CONTENT_TYPE, "text/xml")
        .body(body)
        .unwrap()
}

fn execute_kw(key: &str, model: &str, method: &str, args: Vec<Value>, kwargs: Struct) -> String {
    encode_method_call(
        "execute_kw",
        &[
            Value::from("lemon"),
            Value::Int(2),
            Value::from(key),
            Value::from(model),
            Value::from(method),
            Value::Array(args),
            Value::Struct(kwargs),
        ],
    )
}

// --- common ---

#[tokio::test]
async fn authenticate_returns_uid() {
    let body = encode_method_call(
        "authenticate",
        &[
            Value::from("lemon"),
            Value::from("bot@lemon.test"),
            Value::from("key123"),
            Value::Struct(Struct::new()),
        ],
    );
    let resp = app()
        .oneshot(xml_request("/xmlrpc/2/common", body))
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(
        resp.headers().get(http::header::CONTENT_TYPE).unwrap(),
        "text/xml"
    );
    let value = decode_method_response(&body_text(resp).await).unwrap();
    assert_eq!(value, Value::Int(2));
}

#[tokio::test]
async fn version_reports_server() {
    let resp = app()
        .oneshot(xml_request("/xmlrpc/2/common", encode_method_call("version", &[])))
        .await
        .unwrap();
    let value = decode_method_response(&body_text(resp).await).unwrap();
    assert_eq!(value.get("server_version"), Some(&Value::from("17.0")));
}

#[tokio::test]
async fn unknown_common_method_is_fault() {
    let resp = app()
        .oneshot(xml_request("/xmlrpc/2/common", encode_method_call("login_as_root", &[])))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let err = decode_method_response(&body_text(resp).await).unwrap_err();
    assert!(matches!(err, RpcError::RemoteFault { ref code, .. } if code == "1"));
}

// --- object ---

#[tokio::test]
async fn search_read_filters_and_limits() {
    let domain = Value::from(vec![Value::from(vec![
        Value::from("sale_ok"),
        Value::from("="),
        Value::Boolean(true),
    ])]);
    let kwargs = Struct::new()
        .with("fields", vec!["name"])
        .with("limit", 2)
        .with("order", "name asc");
    let resp = app()
        .oneshot(xml_request(
            "/xmlrpc/2/object",
            execute_kw("key123", "product.product", "search_read", vec![domain], kwargs),
        ))
        .await
        .unwrap();

    let records = decode_method_response(&body_text(resp).await).unwrap();
    let records = records.as_array().unwrap();
    assert_eq!(records.len(), 2);
    assert_eq!(records[0].get("name"), Some(&Value::from("Alcohol 70%")));
    assert_eq!(records[1].get("name"), Some(&Value::from("Ibuprofeno 400mg")));
    assert!(records[0].get("list_price").is_none());
}

#[tokio::test]
async fn wrong_key_is_access_denied() {
    let resp = app()
        .oneshot(xml_request(
            "/xmlrpc/2/object",
            execute_kw("nope", "res.company", "search_read", vec![Value::Array(Vec::new())], Struct::new()),
        ))
        .await
        .unwrap();
    let err = decode_method_response(&body_text(resp).await).unwrap_err();
    assert_eq!(err.to_string(), "Odoo fault 3: Access Denied");
}

#[tokio::test]
async fn unknown_model_is_fault() {
    let resp = app()
        .oneshot(xml_request(
            "/xmlrpc/2/object",
            execute_kw("key123", "x.model", "search_read", vec![Value::Array(Vec::new())], Struct::new()),
        ))
        .await
        .unwrap();
    let err = decode_method_response(&body_text(resp).await).unwrap_err();
    assert!(err.to_string().contains("x.model"));
}

#[tokio::test]
async fn create_returns_new_id() {
    let vals = Struct::new().with("name", "Cliente Web").with("phone", "999");
    let resp = app()
        .oneshot(xml_request(
            "/xmlrpc/2/object",
            execute_kw(
                "key123",
                "res.partner",
                "create",
                vec![Value::Struct(vals)],
                Struct::new().with("context", Struct::new()),
            ),
        ))
        .await
        .unwrap();
    let id = decode_method_response(&body_text(resp).await).unwrap();
    assert_eq!(id, Value::Int(1));
}

// --- transport-level errors ---

#[tokio::test]
async fn unknown_endpoint_returns_404() {
    let resp = app()
        .oneshot(xml_request("/xmlrpc/2/db", encode_method_call("list", &[])))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn malformed_xml_returns_400() {
    let resp = app()
        .oneshot(xml_request("/xmlrpc/2/common", "<methodCall>".to_string()))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
}

// --- proxy ---

#[tokio::test]
async fn proxy_relays_to_encoded_target() {
    let body = encode_method_call(
        "authenticate",
        &[
            Value::from("lemon"),
            Value::from("bot@lemon.test"),
            Value::from("key123"),
            Value::Struct(Struct::new()),
        ],
    );
    let resp = app()
        .oneshot(xml_request(
            "/proxy?http%3A%2F%2Ferp.local%2Fxmlrpc%2F2%2Fcommon",
            body,
        ))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let value = decode_method_response(&body_text(resp).await).unwrap();
    assert_eq!(value, Value::Int(2));
}

#[tokio::test]
async fn proxy_without_target_returns_400() {
    let resp = app()
        .oneshot(xml_request("/proxy", encode_method_call("version", &[])))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
}
