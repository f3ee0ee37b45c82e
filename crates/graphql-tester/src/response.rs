use std::{borrow::Cow, cell::RefCell, fmt, ops::Deref};

use serde_json::Value;

use crate::{
    error::AssertionMismatch,
    json_path::{self, Resolved},
};

/// Controls what a path that resolves to nothing means: an immediate
/// mismatch (the default), or JSON `null`.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonPathConfig {
    missing_leaf_is_null: bool,
}

impl JsonPathConfig {
    /// Missing leaves decode and compare as `null` instead of failing, so
    /// `path("absent").entity::<Option<T>>()` yields `None`.
    pub fn missing_leaf_is_null(mut self) -> Self {
        self.missing_leaf_is_null = true;
        self
    }
}

/// One decoded execution result: a query/mutation response, or a single
/// subscription event.
///
/// Checks fail fast: the first mismatch panics with the queried path,
/// expected and actual values, any checks already run on this response,
/// and the full document.
#[derive(Debug)]
pub struct GraphqlResponse {
    body: Value,
    headers: http::HeaderMap,
    config: JsonPathConfig,
    checks: RefCell<Vec<String>>,
}

impl GraphqlResponse {
    pub(crate) fn new(body: Value, headers: http::HeaderMap, config: JsonPathConfig) -> Self {
        GraphqlResponse {
            body,
            headers,
            config,
            checks: RefCell::new(Vec::new()),
        }
    }

    pub fn headers(&self) -> &http::HeaderMap {
        &self.headers
    }

    pub fn into_body(self) -> Value {
        self.body
    }

    pub fn errors(&self) -> Cow<'_, Vec<Value>> {
        self.body["errors"]
            .as_array()
            .map(Cow::Borrowed)
            .unwrap_or_else(|| Cow::Owned(Vec::new()))
    }

    /// Hands back `data`, panicking when the response carries errors.
    #[track_caller]
    pub fn into_data(self) -> Value {
        assert!(self.errors().is_empty(), "{self}");

        match self.body {
            Value::Object(mut object) => object.remove("data"),
            _ => None,
        }
        .unwrap_or_default()
    }

    #[track_caller]
    pub fn deserialize_data<T: serde::de::DeserializeOwned>(self) -> T {
        serde_json::from_value(self.into_data()).expect("to be able to deserialize")
    }

    /// Starts a check at `expression`.
    ///
    /// Expressions use dot/bracket notation with array indices and `*`
    /// wildcards, e.g. `friends[1].name` or `friends[*].name`. A path
    /// starting with `data`, `errors`, `extensions` or `$` addresses the
    /// document root; anything else is relative to `data`, so
    /// `path("greeting")` and `path("data.greeting")` hit the same node.
    /// Resolving to nothing is not itself a failure, the assertions on the
    /// returned selection decide what absence means.
    #[track_caller]
    pub fn path(&self, expression: &str) -> PathSelection<'_> {
        let path = match json_path::parse(expression) {
            Ok(path) => path,
            Err(reason) => panic!("invalid path `{expression}`: {reason}"),
        };
        self.record(format!("queried path `{expression}`"));
        PathSelection {
            response: self,
            expression: expression.to_string(),
            resolved: json_path::resolve(&self.body, &path),
        }
    }

    fn record(&self, check: String) {
        self.checks.borrow_mut().push(check);
    }

    fn mismatch(&self, path: &str, expected: impl fmt::Display, actual: impl fmt::Display) -> AssertionMismatch {
        AssertionMismatch {
            path: path.to_string(),
            expected: expected.to_string(),
            actual: actual.to_string(),
            checks: self.checks.borrow().clone(),
            document: serde_json::to_string_pretty(&self.body).unwrap_or_default(),
        }
    }
}

impl fmt::Display for GraphqlResponse {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let pretty = serde_json::to_string_pretty(&self.body).map_err(|_| fmt::Error)?;
        write!(f, "{pretty}")
    }
}

impl Deref for GraphqlResponse {
    type Target = Value;

    fn deref(&self) -> &Self::Target {
        &self.body
    }
}

impl serde::Serialize for GraphqlResponse {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.body.serialize(serializer)
    }
}

/// One queried path, ready for assertions.
#[must_use]
pub struct PathSelection<'a> {
    response: &'a GraphqlResponse,
    expression: String,
    resolved: Resolved<'a>,
}

impl PathSelection<'_> {
    fn is_present(&self) -> bool {
        match &self.resolved {
            Resolved::Missing => false,
            Resolved::One(_) => true,
            Resolved::Many(values) => !values.is_empty(),
        }
    }

    /// The resolved value, with missing leaves mapped to `null` when the
    /// tester is configured that way.
    fn value(&self) -> Option<Value> {
        match &self.resolved {
            Resolved::One(value) => Some((*value).clone()),
            Resolved::Many(values) => Some(Value::Array(values.iter().map(|value| (*value).clone()).collect())),
            Resolved::Missing if self.response.config.missing_leaf_is_null => Some(Value::Null),
            Resolved::Missing => None,
        }
    }

    #[track_caller]
    pub fn exists(self) -> Self {
        if !self.is_present() {
            panic!(
                "{}",
                self.response.mismatch(&self.expression, "a value at this path", "nothing")
            );
        }
        self.response.record(format!("`{}` exists", self.expression));
        self
    }

    #[track_caller]
    pub fn does_not_exist(self) {
        if self.is_present() {
            let actual = self.value().unwrap_or(Value::Null);
            panic!(
                "{}",
                self.response.mismatch(&self.expression, "no value at this path", actual)
            );
        }
        self.response.record(format!("`{}` does not exist", self.expression));
    }

    /// Decodes the resolved node into `T`.
    #[track_caller]
    pub fn entity<T: serde::de::DeserializeOwned>(self) -> T {
        let type_name = std::any::type_name::<T>();
        let Some(value) = self.value() else {
            panic!(
                "{}",
                self.response
                    .mismatch(&self.expression, format!("a value decoding as {type_name}"), "nothing")
            );
        };
        match serde_json::from_value(value.clone()) {
            Ok(entity) => {
                self.response
                    .record(format!("`{}` decoded as {type_name}", self.expression));
                entity
            }
            Err(error) => panic!(
                "{}",
                self.response.mismatch(
                    &self.expression,
                    format!("a value decoding as {type_name}"),
                    format!("{value} ({error})"),
                )
            ),
        }
    }

    /// Decodes the resolved array, or a wildcard fan-out, into an ordered
    /// list of `T`.
    #[track_caller]
    pub fn entity_list<T: serde::de::DeserializeOwned>(self) -> Vec<T> {
        self.entity()
    }

    /// Compares the resolved value structurally with anything serializable.
    #[track_caller]
    pub fn is_equal_to(self, expected: impl serde::Serialize) -> Self {
        let expected = serde_json::to_value(expected).expect("the expected value to serialize");
        let Some(actual) = self.value() else {
            panic!("{}", self.response.mismatch(&self.expression, &expected, "nothing"));
        };
        if actual != expected {
            panic!("{}", self.response.mismatch(&self.expression, &expected, &actual));
        }
        self.response
            .record(format!("`{}` equals {expected}", self.expression));
        self
    }

    /// Compares the resolved value structurally with raw JSON text. Object
    /// key order is irrelevant on both sides.
    #[track_caller]
    pub fn matches_json(self, expected: &str) -> Self {
        let expected: Value = match serde_json::from_str(expected) {
            Ok(value) => value,
            Err(error) => panic!("the expected JSON for `{}` does not parse: {error}", self.expression),
        };
        self.is_equal_to(expected)
    }
}
