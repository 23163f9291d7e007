//! Builders for `search_read` arguments.
//!
//! Odoo domains are prefix-notation lists: 3-element condition tuples with
//! implicit AND between them, plus the operator tokens `&`, `|` and `!`
//! that apply to the terms that follow.

use crate::value::{Struct, Value};

/// An Odoo search domain.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Domain(Vec<Value>);

impl Domain {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a `[field, operator, value]` condition.
    pub fn filter(mut self, field: &str, operator: &str, value: impl Into<Value>) -> Self {
        self.0.push(Value::Array(vec![
            Value::from(field),
            Value::from(operator),
            value.into(),
        ]));
        self
    }

    /// `&`: the next two terms must both hold.
    pub fn and(mut self) -> Self {
        self.0.push(Value::from("&"));
        self
    }

    /// `|`: at least one of the next two terms holds.
    pub fn or(mut self) -> Self {
        self.0.push(Value::from("|"));
        self
    }

    /// `!`: negate the next term.
    pub fn not(mut self) -> Self {
        self.0.push(Value::from("!"));
        self
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }
}

impl From<Domain> for Value {
    fn from(domain: Domain) -> Self {
        Value::Array(domain.0)
    }
}

/// Keyword arguments for `search_read` besides `fields`.
///
/// Rendered as a struct that is merged after `fields`, so an `extra` entry
/// named `fields` replaces the field list.
#[derive(Debug, Clone, Default)]
pub struct SearchOptions {
    pub limit: Option<i64>,
    pub offset: Option<i64>,
    pub order: Option<String>,
    pub context: Option<Struct>,
    pub extra: Struct,
}

impl SearchOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn limit(mut self, limit: i64) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn offset(mut self, offset: i64) -> Self {
        self.offset = Some(offset);
        self
    }

    /// Sort clause, e.g. `"date_order desc"`.
    pub fn order(mut self, order: impl Into<String>) -> Self {
        self.order = Some(order.into());
        self
    }

    pub fn context(mut self, context: Struct) -> Self {
        self.context = Some(context);
        self
    }

    /// Any other keyword argument, passed through untouched.
    pub fn with(mut self, name: &str, value: impl Into<Value>) -> Self {
        self.extra.insert(name, value);
        self
    }

    pub fn to_struct(&self) -> Struct {
        let mut kwargs = Struct::new();
        if let Some(limit) = self.limit {
            kwargs.insert("limit", limit);
        }
        if let Some(offset) = self.offset {
            kwargs.insert("offset", offset);
        }
        if let Some(order) = &self.order {
            kwargs.insert("order", order.as_str());
        }
        if let Some(context) = &self.context {
            kwargs.insert("context", context.clone());
        }
        kwargs.merge(self.extra.clone());
        kwargs
    }
}
