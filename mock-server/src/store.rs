//! In-memory stand-in for the Odoo database.
//!
//! Records are ordered structs keyed by model name. Search domains are
//! evaluated the way Odoo reads them: prefix operators `&`, `|`, `!` apply
//! to the terms that follow, and whatever remains is AND-ed together.

use std::cmp::Ordering;
use std::collections::HashMap;

use odoo_core::{Struct, Value};
use serde::Deserialize;

/// A login the mock accepts.
#[derive(Debug, Clone, Deserialize)]
pub struct User {
    pub uid: i64,
    pub login: String,
    pub api_key: String,
}

/// JSON seed file layout: `{"database": "...", "users": [...], "records": {"model": [{...}]}}`.
#[derive(Debug, Clone, Deserialize)]
pub struct Fixture {
    pub database: String,
    pub users: Vec<User>,
    #[serde(default)]
    pub records: HashMap<String, Vec<serde_json::Value>>,
}

#[derive(Debug, Default)]
struct Table {
    next_id: i64,
    records: Vec<Struct>,
}

impl Table {
    fn insert(&mut self, mut record: Struct) -> i64 {
        let id = match record.get("id").and_then(Value::as_i64) {
            Some(id) => id,
            None => self.next_id.max(1),
        };
        self.next_id = self.next_id.max(id + 1);
        let mut stored = Struct::new().with("id", id);
        record.insert("id", id);
        stored.merge(record);
        self.records.push(stored);
        id
    }
}

/// Database state behind the mock server.
#[derive(Debug)]
pub struct MockOdoo {
    pub database: String,
    users: Vec<User>,
    tables: HashMap<String, Table>,
}

/// Why a model call was rejected. Mapped to XML-RPC faults by the router.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ModelError {
    UnknownModel(String),
    InvalidDomain(String),
}

impl MockOdoo {
    pub fn new(database: &str, users: Vec<User>) -> Self {
        Self {
            database: database.to_string(),
            users,
            tables: HashMap::new(),
        }
    }

    pub fn from_fixture(fixture: Fixture) -> Self {
        let mut odoo = Self::new(&fixture.database, fixture.users);
        for (model, rows) in fixture.records {
            odoo.ensure_model(&model);
            for row in rows {
                if let Value::Struct(record) = Value::from(row) {
                    odoo.insert(&model, record);
                }
            }
        }
        odoo
    }

    /// Database `lemon`, user `bot@lemon.test` / `key123` (uid 2) with two
    /// companies, a handful of products and point-of-sale orders.
    pub fn demo() -> Self {
        let mut odoo = Self::new(
            "lemon",
            vec![User {
                uid: 2,
                login: "bot@lemon.test".to_string(),
                api_key: "key123".to_string(),
            }],
        );
        odoo.insert(
            "res.users",
            Struct::new()
                .with("id", 2)
                .with("name", "Lemon Bot")
                .with("login", "bot@lemon.test")
                .with("company_ids", vec![1, 3]),
        );
        for (id, name) in [(1, "Botica Central"), (3, "Botica Norte")] {
            odoo.insert("res.company", Struct::new().with("id", id).with("name", name));
        }
        for (name, price, sale_ok) in [
            ("Paracetamol 500mg", 2.5, true),
            ("Ibuprofeno 400mg", 4.0, true),
            ("Alcohol 70%", 8.9, true),
            ("Insumo interno", 1.0, false),
        ] {
            odoo.insert(
                "product.product",
                Struct::new()
                    .with("name", name)
                    .with("list_price", price)
                    .with("sale_ok", sale_ok),
            );
        }
        for (name, state, company) in [
            ("POS/0001", "paid", 1),
            ("POS/0002", "cancel", 1),
            ("POS/0003", "done", 3),
        ] {
            odoo.insert(
                "pos.order",
                Struct::new()
                    .with("name", name)
                    .with("state", state)
                    .with("company_id", vec![Value::Int(company), Value::from("Company")]),
            );
        }
        odoo.ensure_model("res.partner");
        odoo.ensure_model("sale.order");
        odoo
    }

    pub fn ensure_model(&mut self, model: &str) {
        self.tables.entry(model.to_string()).or_insert_with(|| Table {
            next_id: 1,
            records: Vec::new(),
        });
    }

    pub fn insert(&mut self, model: &str, record: Struct) -> i64 {
        self.ensure_model(model);
        self.tables
            .get_mut(model)
            .map(|t| t.insert(record))
            .unwrap_or_default()
    }

    /// `authenticate`: the uid, or `None` for an unknown database or login.
    pub fn authenticate(&self, database: &str, login: &str, api_key: &str) -> Option<i64> {
        if database != self.database {
            return None;
        }
        self.users
            .iter()
            .find(|u| u.login == login && u.api_key == api_key)
            .map(|u| u.uid)
    }

    /// Credential check for `execute_kw`.
    pub fn check_access(&self, database: &str, uid: i64, api_key: &str) -> bool {
        database == self.database && self.users.iter().any(|u| u.uid == uid && u.api_key == api_key)
    }

    fn table(&self, model: &str) -> Result<&Table, ModelError> {
        self.tables
            .get(model)
            .ok_or_else(|| ModelError::UnknownModel(model.to_string()))
    }

    pub fn search_read(
        &self,
        model: &str,
        domain: &[Value],
        kwargs: &Struct,
    ) -> Result<Vec<Value>, ModelError> {
        let table = self.table(model)?;
        let mut matched = Vec::new();
        for record in &table.records {
            if matches_domain(record, domain)? {
                matched.push(record);
            }
        }

        if let Some(order) = kwargs.get("order").and_then(Value::as_str) {
            let mut parts = order.split_whitespace();
            if let Some(field) = parts.next() {
                let descending = parts.next().is_some_and(|d| d.eq_ignore_ascii_case("desc"));
                matched.sort_by(|a, b| {
                    let ord = compare(&field_value(a, field), &field_value(b, field));
                    if descending {
                        ord.reverse()
                    } else {
                        ord
                    }
                });
            }
        }

        let offset = kwargs.get("offset").and_then(Value::as_i64).unwrap_or(0).max(0) as usize;
        let limit = kwargs
            .get("limit")
            .and_then(Value::as_i64)
            .filter(|l| *l > 0)
            .map_or(usize::MAX, |l| l as usize);
        let fields: Vec<&str> = kwargs
            .get("fields")
            .and_then(Value::as_array)
            .map(|f| f.iter().filter_map(Value::as_str).collect())
            .unwrap_or_default();

        Ok(matched
            .into_iter()
            .skip(offset)
            .take(limit)
            .map(|record| Value::Struct(project(record, &fields)))
            .collect())
    }

    pub fn search_count(&self, model: &str, domain: &[Value]) -> Result<i64, ModelError> {
        let table = self.table(model)?;
        let mut count = 0;
        for record in &table.records {
            if matches_domain(record, domain)? {
                count += 1;
            }
        }
        Ok(count)
    }

    pub fn create(&mut self, model: &str, values: Struct) -> Result<i64, ModelError> {
        self.table(model)?;
        Ok(self.insert(model, values))
    }

    pub fn records(&self, model: &str) -> Vec<Struct> {
        self.tables
            .get(model)
            .map(|t| t.records.clone())
            .unwrap_or_default()
    }
}

/// Odoo reads missing fields as `False`.
fn field_value(record: &Struct, field: &str) -> Value {
    record.get(field).cloned().unwrap_or(Value::Boolean(false))
}

fn project(record: &Struct, fields: &[&str]) -> Struct {
    if fields.is_empty() {
        return record.clone();
    }
    let mut out = Struct::new().with("id", field_value(record, "id"));
    for field in fields {
        out.insert(*field, field_value(record, field));
    }
    out
}

fn matches_domain(record: &Struct, domain: &[Value]) -> Result<bool, ModelError> {
    let mut stack: Vec<bool> = Vec::new();
    for term in domain.iter().rev() {
        match term {
            Value::String(op) if op == "!" => {
                let a = pop(&mut stack, op)?;
                stack.push(!a);
            }
            Value::String(op) if op == "&" || op == "|" => {
                let a = pop(&mut stack, op)?;
                let b = pop(&mut stack, op)?;
                stack.push(if op == "&" { a && b } else { a || b });
            }
            Value::Array(condition) => stack.push(matches_condition(record, condition)?),
            other => {
                return Err(ModelError::InvalidDomain(format!("unexpected term {other:?}")));
            }
        }
    }
    Ok(stack.into_iter().all(|b| b))
}

fn pop(stack: &mut Vec<bool>, op: &str) -> Result<bool, ModelError> {
    stack
        .pop()
        .ok_or_else(|| ModelError::InvalidDomain(format!("operator {op} is missing operands")))
}

fn matches_condition(record: &Struct, condition: &[Value]) -> Result<bool, ModelError> {
    let [field, operator, expected] = condition else {
        return Err(ModelError::InvalidDomain(format!(
            "condition needs 3 items, got {}",
            condition.len()
        )));
    };
    let (Some(field), Some(operator)) = (field.as_str(), operator.as_str()) else {
        return Err(ModelError::InvalidDomain("field and operator must be strings".to_string()));
    };
    let actual = field_value(record, field);
    let result = match operator {
        "=" => loosely_equal(&actual, expected),
        "!=" => !loosely_equal(&actual, expected),
        "in" => contains_any(expected, &actual),
        "not in" => !contains_any(expected, &actual),
        "<" => compare(&actual, expected) == Ordering::Less,
        "<=" => compare(&actual, expected) != Ordering::Greater,
        ">" => compare(&actual, expected) == Ordering::Greater,
        ">=" => compare(&actual, expected) != Ordering::Less,
        "like" => text(&actual).contains(&text(expected)),
        "ilike" => text(&actual)
            .to_lowercase()
            .contains(&text(expected).to_lowercase()),
        other => {
            return Err(ModelError::InvalidDomain(format!("unsupported operator {other}")));
        }
    };
    Ok(result)
}

/// Many2one fields are stored as `[id, name]` and compare by id.
fn scalar(value: &Value) -> &Value {
    match value {
        Value::Array(items)
            if items.len() == 2 && items[0].as_i64().is_some() && items[1].as_str().is_some() =>
        {
            &items[0]
        }
        other => other,
    }
}

fn loosely_equal(actual: &Value, expected: &Value) -> bool {
    let actual = scalar(actual);
    match (actual.as_f64(), expected.as_f64()) {
        (Some(a), Some(b)) => a == b,
        _ => actual == expected,
    }
}

/// `in` against a list; x2many fields match when any member is listed.
fn contains_any(list: &Value, actual: &Value) -> bool {
    let Some(list) = list.as_array() else {
        return false;
    };
    match actual {
        Value::Array(members) if scalar(actual) == actual => members
            .iter()
            .any(|m| list.iter().any(|l| loosely_equal(m, l))),
        _ => list.iter().any(|l| loosely_equal(actual, l)),
    }
}

fn compare(a: &Value, b: &Value) -> Ordering {
    let (a, b) = (scalar(a), scalar(b));
    match (a.as_f64(), b.as_f64()) {
        (Some(x), Some(y)) => x.partial_cmp(&y).unwrap_or(Ordering::Equal),
        _ => text(a).cmp(&text(b)),
    }
}

fn text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Int(n) => n.to_string(),
        Value::Double(f) => f.to_string(),
        Value::Boolean(b) => b.to_string(),
        _ => String::new(),
    }
}
