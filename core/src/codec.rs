//! XML-RPC wire encoding and decoding.
//!
//! # Design
//! Encoding is infallible and reproduces the dialect Odoo's Python server
//! accepts from browser clients:
//! - integral numbers go out as `<int>` even when held as `Double`, so a
//!   price of `100.0` is sent as `<int>100</int>`;
//! - array items are concatenated inside `<data>` without `<value>` wrappers
//!   (the Python unmarshaller does not require them);
//! - struct member names are written verbatim;
//! - `Nil` encodes to nothing at all. The member or param survives with an
//!   empty `<value>`, which the server reads as an empty string.
//!
//! Decoding accepts both wrapped and unwrapped array items, so everything the
//! encoder produces decodes back to the same value up to the int/double
//! distinction.

use std::fmt::Write as _;

use tracing::warn;

use crate::error::RpcError;
use crate::value::{iso_timestamp, Struct, Value};
use crate::xml::XmlNode;

/// A decoded `methodCall` document.
#[derive(Debug, Clone, PartialEq)]
pub struct MethodCall {
    pub method: String,
    pub params: Vec<Value>,
}

/// Escape the five XML metacharacters. `&` goes first so entities produced
/// by later substitutions are not escaped twice.
pub fn escape(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&apos;")
}

/// Encode a value as the typed fragment that goes inside `<value>…</value>`.
pub fn encode_value(value: &Value) -> String {
    let mut out = String::new();
    write_value(value, &mut out);
    out
}

fn write_value(value: &Value, out: &mut String) {
    match value {
        Value::Int(n) => {
            let _ = write!(out, "<int>{n}</int>");
        }
        Value::Double(f) => {
            if f.is_finite() && f.fract() == 0.0 {
                let _ = write!(out, "<int>{}</int>", format_number(*f));
            } else {
                let _ = write!(out, "<double>{}</double>", format_number(*f));
            }
        }
        Value::String(s) => {
            let _ = write!(out, "<string>{}</string>", escape(s));
        }
        Value::Boolean(b) => {
            out.push_str(if *b { "<boolean>1</boolean>" } else { "<boolean>0</boolean>" });
        }
        Value::Array(items) => {
            out.push_str("<array><data>");
            for item in items {
                write_value(item, out);
            }
            out.push_str("</data></array>");
        }
        Value::Struct(members) => {
            out.push_str("<struct>");
            for (name, member) in members.iter() {
                let _ = write!(out, "<member><name>{name}</name><value>");
                write_value(member, out);
                out.push_str("</value></member>");
            }
            out.push_str("</struct>");
        }
        Value::DateTime(dt) => {
            let _ = write!(out, "<string>{}</string>", iso_timestamp(dt));
        }
        Value::Nil => {
            warn!("nil value encoded as an empty XML-RPC fragment");
        }
    }
}

/// Render a number the way the server expects to read it back: no trailing
/// `.0` on integral values, `NaN`/`Infinity` spelled out.
fn format_number(f: f64) -> String {
    if f.is_nan() {
        "NaN".to_string()
    } else if f == f64::INFINITY {
        "Infinity".to_string()
    } else if f == f64::NEG_INFINITY {
        "-Infinity".to_string()
    } else if f == 0.0 {
        "0".to_string()
    } else {
        f.to_string()
    }
}

/// Build a complete `methodCall` document.
pub fn encode_method_call(method: &str, params: &[Value]) -> String {
    let mut body = String::new();
    for param in params {
        body.push_str("<param><value>");
        write_value(param, &mut body);
        body.push_str("</value></param>");
    }
    format!(
        "<?xml version=\"1.0\"?>\n<methodCall>\n  <methodName>{method}</methodName>\n  <params>\n    {body}\n  </params>\n</methodCall>"
    )
}

/// Build a successful `methodResponse` document carrying `value`.
pub fn encode_method_response(value: &Value) -> String {
    format!(
        "<?xml version=\"1.0\"?>\n<methodResponse><params><param><value>{}</value></param></params></methodResponse>",
        encode_value(value)
    )
}

/// Build a `methodResponse` carrying a fault.
pub fn encode_fault(code: i64, message: &str) -> String {
    let fault = Struct::new().with("faultCode", code).with("faultString", message);
    format!(
        "<?xml version=\"1.0\"?>\n<methodResponse><fault><value>{}</value></fault></methodResponse>",
        encode_value(&Value::Struct(fault))
    )
}

/// Decode a `<value>` node.
///
/// A `<value>` with no element child is the untyped scalar case and decodes
/// to its text as a string.
pub fn decode_value(node: &XmlNode) -> Result<Value, RpcError> {
    match node.first_child() {
        None => Ok(Value::String(node.text_content())),
        Some(typed) => decode_typed(typed),
    }
}

fn decode_typed(el: &XmlNode) -> Result<Value, RpcError> {
    match el.tag.as_str() {
        "string" => Ok(Value::String(el.text_content())),
        "int" | "i4" => {
            let text = el.text_content();
            let text = text.trim();
            if text.is_empty() {
                return Ok(Value::Int(0));
            }
            text.parse()
                .map(Value::Int)
                .map_err(|_| RpcError::MalformedResponse(format!("invalid integer '{text}'")))
        }
        "double" => {
            let text = el.text_content();
            let text = text.trim();
            if text.is_empty() {
                return Ok(Value::Double(0.0));
            }
            text.parse()
                .map(Value::Double)
                .map_err(|_| RpcError::MalformedResponse(format!("invalid double '{text}'")))
        }
        "boolean" => Ok(Value::Boolean(el.text_content() == "1")),
        "array" => {
            let Some(data) = el.find_descendant("data") else {
                return Ok(Value::Array(Vec::new()));
            };
            data.children
                .iter()
                .map(|item| {
                    if item.tag == "value" {
                        decode_value(item)
                    } else {
                        decode_typed(item)
                    }
                })
                .collect::<Result<Vec<_>, _>>()
                .map(Value::Array)
        }
        "struct" => {
            let mut members = Struct::new();
            for member in &el.children {
                let name = member
                    .find_descendant("name")
                    .map(XmlNode::text_content)
                    .unwrap_or_default();
                let Some(value) = member.find_descendant("value") else {
                    continue;
                };
                if name.is_empty() {
                    continue;
                }
                members.insert(name, decode_value(value)?);
            }
            Ok(Value::Struct(members))
        }
        _ => Ok(Value::String(el.text_content())),
    }
}

/// Decode a `methodResponse` body into its return value.
///
/// A `<fault>` anywhere in the document wins over `<params>`, which is not
/// read at all in that case.
pub fn decode_method_response(text: &str) -> Result<Value, RpcError> {
    let root = XmlNode::parse(text)?;

    let fault = if root.tag == "fault" {
        Some(&root)
    } else {
        root.find_descendant("fault")
    };
    if let Some(fault) = fault {
        let value = fault
            .find_descendant("value")
            .ok_or_else(|| RpcError::MalformedResponse("fault without a value".to_string()))?;
        let decoded = decode_value(value)?;
        let code = decoded.get("faultCode").map(scalar_text).unwrap_or_default();
        let message = decoded.get("faultString").map(scalar_text).unwrap_or_default();
        warn!(%code, %message, "XML-RPC fault");
        return Err(RpcError::RemoteFault { code, message });
    }

    let value = root
        .find_path(&["params", "param", "value"])
        .ok_or_else(|| RpcError::MalformedResponse("missing params/param/value".to_string()))?;
    decode_value(value)
}

/// Decode a `methodCall` body, as received by a server.
pub fn decode_method_call(text: &str) -> Result<MethodCall, RpcError> {
    let root = XmlNode::parse(text)?;
    if root.tag != "methodCall" {
        return Err(RpcError::MalformedResponse(format!(
            "expected methodCall, found {}",
            root.tag
        )));
    }
    let method = root
        .child("methodName")
        .map(|n| n.text_content().trim().to_string())
        .filter(|m| !m.is_empty())
        .ok_or_else(|| RpcError::MalformedResponse("missing methodName".to_string()))?;

    let mut params = Vec::new();
    if let Some(list) = root.child("params") {
        for param in list.children.iter().filter(|p| p.tag == "param") {
            let value = param
                .child("value")
                .ok_or_else(|| RpcError::MalformedResponse("param without a value".to_string()))?;
            params.push(decode_value(value)?);
        }
    }
    Ok(MethodCall { method, params })
}

fn scalar_text(value: &Value) -> String {
    match value {
        Value::Int(n) => n.to_string(),
        Value::Double(f) => format_number(*f),
        Value::String(s) => s.clone(),
        Value::Boolean(b) => b.to_string(),
        other => format!("{other:?}"),
    }
}
