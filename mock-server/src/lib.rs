//! Mock Odoo server speaking XML-RPC over HTTP.
//!
//! Serves `POST /xmlrpc/2/common` (`authenticate`, `version`) and
//! `POST /xmlrpc/2/object` (`execute_kw` with `search_read`, `search_count`,
//! `create`), plus `POST /proxy?{url-encoded target}` which behaves like a
//! CORS relay pointed back at this server. Faults use the same shape as a
//! real Odoo: a struct with `faultCode` and `faultString`.

pub mod store;

use std::sync::Arc;

use axum::{
    extract::{Path, RawQuery, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    routing::post,
    Router,
};
use odoo_core::codec::{decode_method_call, encode_fault, encode_method_response, MethodCall};
use odoo_core::{Struct, Value};
use percent_encoding::percent_decode_str;
use tokio::{net::TcpListener, sync::RwLock};
use tracing::{debug, warn};

pub use store::{Fixture, MockOdoo, ModelError, User};

pub type Db = Arc<RwLock<MockOdoo>>;

/// Fault codes returned by the mock.
pub const FAULT_UNKNOWN_METHOD: i64 = 1;
pub const FAULT_MODEL: i64 = 2;
pub const FAULT_ACCESS_DENIED: i64 = 3;

/// Router seeded with `MockOdoo::demo()`.
pub fn app() -> Router {
    app_with(MockOdoo::demo())
}

pub fn app_with(odoo: MockOdoo) -> Router {
    let db: Db = Arc::new(RwLock::new(odoo));
    Router::new()
        .route("/xmlrpc/2/{endpoint}", post(xmlrpc))
        .route("/proxy", post(proxy))
        .with_state(db)
}

pub async fn run(listener: TcpListener) -> Result<(), std::io::Error> {
    axum::serve(listener, app()).await
}

pub async fn run_with(listener: TcpListener, odoo: MockOdoo) -> Result<(), std::io::Error> {
    axum::serve(listener, app_with(odoo)).await
}

async fn xmlrpc(State(db): State<Db>, Path(endpoint): Path<String>, body: String) -> Response {
    dispatch(&db, &endpoint, &body).await
}

async fn proxy(State(db): State<Db>, RawQuery(query): RawQuery, body: String) -> Response {
    let target = query
        .and_then(|q| percent_decode_str(&q).decode_utf8().ok().map(|t| t.into_owned()))
        .unwrap_or_default();
    let Some((_, endpoint)) = target.split_once("/xmlrpc/2/") else {
        return (StatusCode::BAD_REQUEST, format!("cannot relay to '{target}'")).into_response();
    };
    debug!(%target, "relaying");
    dispatch(&db, endpoint, &body).await
}

async fn dispatch(db: &Db, endpoint: &str, body: &str) -> Response {
    let call = match decode_method_call(body) {
        Ok(call) => call,
        Err(e) => return (StatusCode::BAD_REQUEST, e.to_string()).into_response(),
    };
    debug!(endpoint, method = %call.method, "XML-RPC call");
    let result = match endpoint {
        "common" => common(db, &call).await,
        "object" => object(db, call).await,
        _ => return StatusCode::NOT_FOUND.into_response(),
    };
    let body = match result {
        Ok(value) => encode_method_response(&value),
        Err((code, message)) => {
            warn!(code, %message, "returning fault");
            encode_fault(code, &message)
        }
    };
    ([(header::CONTENT_TYPE, "text/xml")], body).into_response()
}

type Fault = (i64, String);

fn unknown_method(method: &str) -> Fault {
    (FAULT_UNKNOWN_METHOD, format!("Method not available: {method}"))
}

fn str_param<'a>(params: &'a [Value], index: usize) -> &'a str {
    params.get(index).and_then(Value::as_str).unwrap_or_default()
}

async fn common(db: &Db, call: &MethodCall) -> Result<Value, Fault> {
    match call.method.as_str() {
        "authenticate" => {
            let odoo = db.read().await;
            let uid = odoo.authenticate(
                str_param(&call.params, 0),
                str_param(&call.params, 1),
                str_param(&call.params, 2),
            );
            // Odoo answers bad credentials with False, not a fault.
            Ok(uid.map_or(Value::Boolean(false), Value::Int))
        }
        "version" => Ok(Value::Struct(
            Struct::new()
                .with("server_version", "17.0")
                .with("protocol_version", 1),
        )),
        other => Err(unknown_method(other)),
    }
}

async fn object(db: &Db, call: MethodCall) -> Result<Value, Fault> {
    if call.method != "execute_kw" {
        return Err(unknown_method(&call.method));
    }
    let mut params = call.params.into_iter();
    let (Some(database), Some(uid), Some(api_key), Some(model), Some(method), Some(args)) = (
        params.next(),
        params.next(),
        params.next(),
        params.next(),
        params.next(),
        params.next(),
    ) else {
        return Err((FAULT_UNKNOWN_METHOD, "execute_kw expects at least 6 arguments".to_string()));
    };
    let kwargs = match params.next() {
        Some(Value::Struct(kwargs)) => kwargs,
        _ => Struct::new(),
    };

    let authorized = {
        let odoo = db.read().await;
        odoo.check_access(
            database.as_str().unwrap_or_default(),
            uid.as_i64().unwrap_or_default(),
            api_key.as_str().unwrap_or_default(),
        )
    };
    if !authorized {
        return Err((FAULT_ACCESS_DENIED, "Access Denied".to_string()));
    }

    let model = model.as_str().unwrap_or_default().to_string();
    let method = method.as_str().unwrap_or_default().to_string();
    let args = match args {
        Value::Array(args) => args,
        _ => Vec::new(),
    };
    let domain = args
        .first()
        .and_then(Value::as_array)
        .map(<[Value]>::to_vec)
        .unwrap_or_default();

    let result = match method.as_str() {
        "search_read" => db
            .read()
            .await
            .search_read(&model, &domain, &kwargs)
            .map(Value::Array),
        "search_count" => db.read().await.search_count(&model, &domain).map(Value::Int),
        "create" => {
            let Some(Value::Struct(values)) = args.into_iter().next() else {
                return Err((FAULT_MODEL, "create expects a values dict".to_string()));
            };
            db.write().await.create(&model, values).map(Value::Int)
        }
        other => return Err(unknown_method(other)),
    };
    result.map_err(|e| match e {
        ModelError::UnknownModel(m) => (FAULT_MODEL, format!("Object {m} doesn't exist")),
        ModelError::InvalidDomain(msg) => (FAULT_MODEL, format!("Invalid domain: {msg}")),
    })
}
