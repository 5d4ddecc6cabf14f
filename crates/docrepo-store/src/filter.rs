//! Document predicates and orderings understood by every store backend.

use std::cmp::Ordering;

use serde_json::{Map, Number, Value};

/// A stored document: a JSON object keyed by field name.
pub type Document = Map<String, Value>;

/// Predicate over documents.
///
/// Field names may be dotted paths (`"address.city"`). Numbers compare
/// numerically regardless of integer/float representation, strings compare
/// lexically. Range operators never match a missing field; `Ne` does.
#[derive(Clone, Debug, PartialEq)]
pub enum Filter {
    /// Matches every document.
    All,
    Eq(String, Value),
    Ne(String, Value),
    Gt(String, Value),
    Gte(String, Value),
    Lt(String, Value),
    Lte(String, Value),
    /// Field value equals one of the listed values.
    In(String, Vec<Value>),
    /// Field presence (`true`) or absence (`false`).
    Exists(String, bool),
    And(Vec<Filter>),
    Or(Vec<Filter>),
    Not(Box<Filter>),
}

impl Filter {
    pub fn eq(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Filter::Eq(field.into(), value.into())
    }

    pub fn ne(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Filter::Ne(field.into(), value.into())
    }

    pub fn gt(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Filter::Gt(field.into(), value.into())
    }

    pub fn gte(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Filter::Gte(field.into(), value.into())
    }

    pub fn lt(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Filter::Lt(field.into(), value.into())
    }

    pub fn lte(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Filter::Lte(field.into(), value.into())
    }

    pub fn is_in(field: impl Into<String>, values: Vec<Value>) -> Self {
        Filter::In(field.into(), values)
    }

    pub fn exists(field: impl Into<String>, present: bool) -> Self {
        Filter::Exists(field.into(), present)
    }

    /// Conjunction, flattening nested `And`s and dropping `All`.
    pub fn and(self, other: Filter) -> Self {
        let mut parts = Vec::new();
        for f in [self, other] {
            match f {
                Filter::All => {}
                Filter::And(inner) => parts.extend(inner),
                f => parts.push(f),
            }
        }
        match parts.len() {
            0 => Filter::All,
            1 => parts.pop().unwrap_or(Filter::All),
            _ => Filter::And(parts),
        }
    }

    pub fn or(self, other: Filter) -> Self {
        match self {
            Filter::Or(mut inner) => {
                inner.push(other);
                Filter::Or(inner)
            }
            f => Filter::Or(vec![f, other]),
        }
    }

    #[allow(clippy::should_implement_trait)]
    pub fn not(self) -> Self {
        Filter::Not(Box::new(self))
    }

    /// Evaluate the predicate against a document.
    pub fn matches(&self, doc: &Document) -> bool {
        match self {
            Filter::All => true,
            Filter::Eq(field, v) => lookup(doc, field).is_some_and(|x| values_equal(x, v)),
            Filter::Ne(field, v) => !lookup(doc, field).is_some_and(|x| values_equal(x, v)),
            Filter::Gt(field, v) => ranged(doc, field, v, |o| o == Ordering::Greater),
            Filter::Gte(field, v) => ranged(doc, field, v, |o| o != Ordering::Less),
            Filter::Lt(field, v) => ranged(doc, field, v, |o| o == Ordering::Less),
            Filter::Lte(field, v) => ranged(doc, field, v, |o| o != Ordering::Greater),
            Filter::In(field, vs) => {
                lookup(doc, field).is_some_and(|x| vs.iter().any(|v| values_equal(x, v)))
            }
            Filter::Exists(field, present) => lookup(doc, field).is_some() == *present,
            Filter::And(fs) => fs.iter().all(|f| f.matches(doc)),
            Filter::Or(fs) => fs.iter().any(|f| f.matches(doc)),
            Filter::Not(f) => !f.matches(doc),
        }
    }

    /// Field/value pairs a matching document is guaranteed to contain.
    ///
    /// Used to seed a document when an upsert finds nothing to update.
    pub fn equalities(&self) -> Vec<(&str, &Value)> {
        match self {
            Filter::Eq(field, v) => vec![(field.as_str(), v)],
            Filter::And(fs) => fs.iter().flat_map(Filter::equalities).collect(),
            _ => Vec::new(),
        }
    }
}

impl Default for Filter {
    fn default() -> Self {
        Filter::All
    }
}

fn ranged(doc: &Document, field: &str, v: &Value, accept: impl Fn(Ordering) -> bool) -> bool {
    lookup(doc, field)
        .and_then(|x| compare_same_kind(x, v))
        .is_some_and(accept)
}

/// Resolve a dotted path inside a document.
pub fn lookup<'a>(doc: &'a Document, path: &str) -> Option<&'a Value> {
    let mut parts = path.split('.');
    let mut current = doc.get(parts.next()?)?;
    for part in parts {
        current = current.as_object()?.get(part)?;
    }
    Some(current)
}

fn values_equal(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => compare_numbers(x, y) == Some(Ordering::Equal),
        _ => a == b,
    }
}

fn compare_numbers(a: &Number, b: &Number) -> Option<Ordering> {
    match (a.as_i64(), b.as_i64()) {
        (Some(x), Some(y)) => Some(x.cmp(&y)),
        _ => a.as_f64()?.partial_cmp(&b.as_f64()?),
    }
}

/// Ordering between two values of the same JSON kind; `None` across kinds.
fn compare_same_kind(a: &Value, b: &Value) -> Option<Ordering> {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => compare_numbers(x, y),
        (Value::String(x), Value::String(y)) => Some(x.cmp(y)),
        (Value::Bool(x), Value::Bool(y)) => Some(x.cmp(y)),
        (Value::Null, Value::Null) => Some(Ordering::Equal),
        _ => None,
    }
}

fn kind_rank(v: Option<&Value>) -> u8 {
    match v {
        None | Some(Value::Null) => 0,
        Some(Value::Number(_)) => 1,
        Some(Value::String(_)) => 2,
        Some(Value::Object(_)) => 3,
        Some(Value::Array(_)) => 4,
        Some(Value::Bool(_)) => 5,
    }
}

/// Total order used for sorting: missing/null < numbers < strings <
/// objects < arrays < booleans, then by value within a kind.
pub fn compare_for_sort(a: Option<&Value>, b: Option<&Value>) -> Ordering {
    let by_kind = kind_rank(a).cmp(&kind_rank(b));
    if by_kind != Ordering::Equal {
        return by_kind;
    }
    match (a, b) {
        (Some(x), Some(y)) => compare_same_kind(x, y).unwrap_or(Ordering::Equal),
        _ => Ordering::Equal,
    }
}

/// Result ordering for a find.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Sort {
    Ascending(String),
    Descending(String),
    /// Insertion order.
    Natural,
    /// Reverse insertion order (most recent first).
    NaturalDescending,
}

/// Options applied to a find, in the order sort → skip → limit.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct FindOptions {
    pub sort: Option<Sort>,
    pub skip: u64,
    pub limit: Option<u64>,
}

impl FindOptions {
    pub fn sorted(mut self, sort: Sort) -> Self {
        self.sort = Some(sort);
        self
    }

    pub fn skip(mut self, skip: u64) -> Self {
        self.skip = skip;
        self
    }

    pub fn limit(mut self, limit: u64) -> Self {
        self.limit = Some(limit);
        self
    }
}
