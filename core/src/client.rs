//! Stateless XML-RPC client for Odoo.
//!
//! # Design
//! `OdooClient` holds only the connection context (server URL, database,
//! proxy routing) and never changes after construction. Each operation is
//! split into a `build_*` method that produces an `HttpRequest` and a
//! `parse_*` method that consumes an `HttpResponse`, so the wire format can
//! be tested without a network. The round-trip methods (`authenticate`,
//! `search_read`, `create`, ...) glue the two halves around a `Transport`.
//!
//! The protocol is credential-per-call: the uid returned by `authenticate`
//! and the API key must be passed again on every `object` call. Nothing is
//! cached and nothing is retried.

use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use serde::de::DeserializeOwned;
use tracing::debug;

use crate::codec::{decode_method_response, encode_method_call};
use crate::error::RpcError;
use crate::http::{HttpRequest, HttpResponse, Transport};
use crate::query::SearchOptions;
use crate::value::{Struct, Value};

/// Public CORS relay used when `use_proxy` is set.
pub const DEFAULT_PROXY_BASE: &str = "https://corsproxy.io/?";

/// Endpoint serving `authenticate` and `version`.
pub const COMMON_ENDPOINT: &str = "common";

/// Endpoint serving `execute_kw`.
pub const OBJECT_ENDPOINT: &str = "object";

/// Characters `encodeURIComponent` leaves alone.
const URI_COMPONENT: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'!')
    .remove(b'~')
    .remove(b'*')
    .remove(b'\'')
    .remove(b'(')
    .remove(b')');

/// Client bound to one Odoo server and database.
#[derive(Debug, Clone)]
pub struct OdooClient {
    server_url: String,
    database: String,
    use_proxy: bool,
    proxy_base: String,
}

impl OdooClient {
    /// Trailing slashes on `server_url` are dropped; the URL is otherwise
    /// taken as given and only checked when a request is sent.
    pub fn new(server_url: &str, database: &str, use_proxy: bool) -> Self {
        Self {
            server_url: server_url.trim_end_matches('/').to_string(),
            database: database.to_string(),
            use_proxy,
            proxy_base: DEFAULT_PROXY_BASE.to_string(),
        }
    }

    /// Route proxied requests through `proxy_base` instead of the public relay.
    /// The encoded target URL is appended directly, so the base normally ends
    /// in `?`.
    pub fn with_proxy_base(mut self, proxy_base: &str) -> Self {
        self.proxy_base = proxy_base.to_string();
        self
    }

    pub fn server_url(&self) -> &str {
        &self.server_url
    }

    pub fn database(&self) -> &str {
        &self.database
    }

    pub fn use_proxy(&self) -> bool {
        self.use_proxy
    }

    /// `{server_url}/xmlrpc/2/{endpoint}`.
    pub fn endpoint_url(&self, endpoint: &str) -> String {
        format!("{}/xmlrpc/2/{endpoint}", self.server_url)
    }

    /// The URL actually requested: the endpoint URL, or the relay with the
    /// endpoint URL percent-encoded after it.
    pub fn request_url(&self, endpoint: &str) -> String {
        let target = self.endpoint_url(endpoint);
        if self.use_proxy {
            format!("{}{}", self.proxy_base, utf8_percent_encode(&target, URI_COMPONENT))
        } else {
            target
        }
    }

    // -----------------------------------------------------------------------
    // Generic call
    // -----------------------------------------------------------------------

    pub fn build_rpc_call(&self, endpoint: &str, method: &str, params: &[Value]) -> HttpRequest {
        let url = self.request_url(endpoint);
        debug!(endpoint, method, %url, params = params.len(), "building XML-RPC call");
        HttpRequest {
            url,
            headers: vec![("content-type".to_string(), "text/xml".to_string())],
            body: encode_method_call(method, params),
        }
    }

    /// Check the status, then decode the body: a fault becomes
    /// `RemoteFault`, anything else must carry `params/param/value`.
    pub fn parse_rpc_response(&self, response: HttpResponse) -> Result<Value, RpcError> {
        if !response.is_success() {
            return Err(RpcError::HttpStatus {
                status: response.status,
                body: response.body,
            });
        }
        decode_method_response(&response.body)
    }

    pub fn rpc_call<T: Transport>(
        &self,
        transport: &T,
        endpoint: &str,
        method: &str,
        params: &[Value],
    ) -> Result<Value, RpcError> {
        let request = self.build_rpc_call(endpoint, method, params);
        let response = transport.execute(request)?;
        self.parse_rpc_response(response)
    }

    // -----------------------------------------------------------------------
    // authenticate
    // -----------------------------------------------------------------------

    pub fn build_authenticate(&self, username: &str, api_key: &str) -> HttpRequest {
        self.build_rpc_call(
            COMMON_ENDPOINT,
            "authenticate",
            &[
                Value::from(self.database.as_str()),
                Value::from(username),
                Value::from(api_key),
                Value::Struct(Struct::new()),
            ],
        )
    }

    /// The server reports bad credentials by returning `0`/`false` rather
    /// than a fault; any falsy result is `AuthenticationFailed`.
    pub fn parse_authenticate(&self, response: HttpResponse) -> Result<i64, RpcError> {
        let uid = self.parse_rpc_response(response)?;
        if !uid.is_truthy() {
            return Err(RpcError::AuthenticationFailed);
        }
        expect_id(uid, "authenticate")
    }

    pub fn authenticate<T: Transport>(
        &self,
        transport: &T,
        username: &str,
        api_key: &str,
    ) -> Result<i64, RpcError> {
        let response = transport.execute(self.build_authenticate(username, api_key))?;
        self.parse_authenticate(response)
    }

    // -----------------------------------------------------------------------
    // execute_kw
    // -----------------------------------------------------------------------

    /// `execute_kw(database, uid, api_key, model, method, args, kwargs)`.
    pub fn build_execute_kw(
        &self,
        uid: i64,
        api_key: &str,
        model: &str,
        method: &str,
        args: Vec<Value>,
        kwargs: Struct,
    ) -> HttpRequest {
        self.build_rpc_call(
            OBJECT_ENDPOINT,
            "execute_kw",
            &[
                Value::from(self.database.as_str()),
                Value::Int(uid),
                Value::from(api_key),
                Value::from(model),
                Value::from(method),
                Value::Array(args),
                Value::Struct(kwargs),
            ],
        )
    }

    #[allow(clippy::too_many_arguments)]
    pub fn execute_kw<T: Transport>(
        &self,
        transport: &T,
        uid: i64,
        api_key: &str,
        model: &str,
        method: &str,
        args: Vec<Value>,
        kwargs: Struct,
    ) -> Result<Value, RpcError> {
        let request = self.build_execute_kw(uid, api_key, model, method, args, kwargs);
        self.parse_rpc_response(transport.execute(request)?)
    }

    // -----------------------------------------------------------------------
    // search_read
    // -----------------------------------------------------------------------

    /// `domain` is passed through as-is; `options` are merged after `fields`.
    pub fn build_search_read(
        &self,
        uid: i64,
        api_key: &str,
        model: &str,
        domain: impl Into<Value>,
        fields: &[&str],
        options: &SearchOptions,
    ) -> HttpRequest {
        let mut kwargs = Struct::new().with("fields", fields.to_vec());
        kwargs.merge(options.to_struct());
        self.build_execute_kw(uid, api_key, model, "search_read", vec![domain.into()], kwargs)
    }

    pub fn parse_search_read(&self, response: HttpResponse) -> Result<Vec<Value>, RpcError> {
        match self.parse_rpc_response(response)? {
            Value::Array(records) => Ok(records),
            other => Err(RpcError::MalformedResponse(format!(
                "search_read returned a non-list value: {other:?}"
            ))),
        }
    }

    #[allow(clippy::too_many_arguments)]
    pub fn search_read<T: Transport>(
        &self,
        transport: &T,
        uid: i64,
        api_key: &str,
        model: &str,
        domain: impl Into<Value>,
        fields: &[&str],
        options: &SearchOptions,
    ) -> Result<Vec<Value>, RpcError> {
        let request = self.build_search_read(uid, api_key, model, domain, fields, options);
        self.parse_search_read(transport.execute(request)?)
    }

    /// `search_read`, then deserialize every record into `R`.
    #[allow(clippy::too_many_arguments)]
    pub fn search_read_as<R: DeserializeOwned, T: Transport>(
        &self,
        transport: &T,
        uid: i64,
        api_key: &str,
        model: &str,
        domain: impl Into<Value>,
        fields: &[&str],
        options: &SearchOptions,
    ) -> Result<Vec<R>, RpcError> {
        self.search_read(transport, uid, api_key, model, domain, fields, options)?
            .into_iter()
            .map(|record| {
                serde_json::from_value(record.into_json())
                    .map_err(|e| RpcError::MalformedResponse(format!("{model} record: {e}")))
            })
            .collect()
    }

    // -----------------------------------------------------------------------
    // create
    // -----------------------------------------------------------------------

    pub fn build_create(
        &self,
        uid: i64,
        api_key: &str,
        model: &str,
        values: Struct,
        context: Struct,
    ) -> HttpRequest {
        let kwargs = Struct::new().with("context", context);
        self.build_execute_kw(uid, api_key, model, "create", vec![Value::Struct(values)], kwargs)
    }

    pub fn parse_create(&self, response: HttpResponse) -> Result<i64, RpcError> {
        let id = self.parse_rpc_response(response)?;
        expect_id(id, "create")
    }

    pub fn create<T: Transport>(
        &self,
        transport: &T,
        uid: i64,
        api_key: &str,
        model: &str,
        values: Struct,
        context: Struct,
    ) -> Result<i64, RpcError> {
        let request = self.build_create(uid, api_key, model, values, context);
        self.parse_create(transport.execute(request)?)
    }
}

/// Accept integer ids, including integral doubles.
fn expect_id(value: Value, operation: &str) -> Result<i64, RpcError> {
    match value {
        Value::Int(id) => Ok(id),
        Value::Double(f) if f.is_finite() && f.fract() == 0.0 => Ok(f as i64),
        other => Err(RpcError::MalformedResponse(format!(
            "{operation} returned a non-integer id: {other:?}"
        ))),
    }
}
