//! Composable validation rules over `serde_json::Value`.
//!
//! A [`Rule`] describes one value: its kind (string, number, date, enum,
//! array, object, ...), whether it may be absent or null, and an optional
//! default. An [`ObjectShape`] is an ordered list of named rules; validating
//! an object runs every field rule and accumulates all failures instead of
//! stopping at the first one. On success the result is a normalized value:
//! coerced dates and numbers, defaults filled in, unknown keys dropped.

use chrono::{DateTime, NaiveDate, NaiveDateTime, SecondsFormat, TimeZone, Utc};
use serde_json::{Map, Number, Value};
use validator::{ValidateEmail, ValidateUrl};

use super::error::{FieldError, ValidationErrors};

/// Object-level check run after every field of the object validated.
pub type Refinement = fn(&Map<String, Value>) -> Vec<FieldError>;

#[derive(Debug, Clone)]
enum Format {
    Url,
    Email(String),
}

#[derive(Debug, Clone)]
struct Bound {
    value: f64,
    message: Option<String>,
}

#[derive(Debug, Clone)]
enum Kind {
    String {
        min_len: Option<(usize, String)>,
        format: Option<Format>,
        empty_as_null: bool,
    },
    Number {
        coerce: bool,
        int: bool,
        positive: bool,
        min: Option<Bound>,
        max: Option<Bound>,
    },
    Boolean,
    Date {
        coerce: bool,
    },
    Enum(Vec<String>),
    Record,
    Array(Box<Rule>),
    Object(ObjectShape),
}

#[derive(Debug, Clone)]
pub struct Rule {
    kind: Kind,
    optional: bool,
    nullable: bool,
    default: Option<Value>,
    null_to_default: bool,
}

impl Rule {
    fn of(kind: Kind) -> Self {
        Self {
            kind,
            optional: false,
            nullable: false,
            default: None,
            null_to_default: false,
        }
    }

    pub fn string() -> Self {
        Self::of(Kind::String {
            min_len: None,
            format: None,
            empty_as_null: false,
        })
    }

    pub fn number() -> Self {
        Self::of(Kind::Number {
            coerce: false,
            int: false,
            positive: false,
            min: None,
            max: None,
        })
    }

    pub fn boolean() -> Self {
        Self::of(Kind::Boolean)
    }

    /// A date given as an RFC 3339 or `YYYY-MM-DD` string.
    pub fn date() -> Self {
        Self::of(Kind::Date { coerce: false })
    }

    /// Exactly one of `options`.
    pub fn one_of<I, S>(options: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::of(Kind::Enum(options.into_iter().map(Into::into).collect()))
    }

    /// Any JSON object, passed through untouched.
    pub fn record() -> Self {
        Self::of(Kind::Record)
    }

    pub fn array(item: Rule) -> Self {
        Self::of(Kind::Array(Box::new(item)))
    }

    pub fn object(shape: ObjectShape) -> Self {
        Self::of(Kind::Object(shape))
    }

    pub fn optional(mut self) -> Self {
        self.optional = true;
        self
    }

    pub fn nullable(mut self) -> Self {
        self.nullable = true;
        self
    }

    /// Value used when the key is absent.
    pub fn default_value(mut self, value: Value) -> Self {
        self.default = Some(value);
        self
    }

    /// Also use the default when the value is an explicit null.
    pub fn null_as_default(mut self) -> Self {
        self.null_to_default = true;
        self
    }

    pub fn min_len(mut self, len: usize, message: &str) -> Self {
        if let Kind::String { min_len, .. } = &mut self.kind {
            *min_len = Some((len, message.to_string()));
        }
        self
    }

    pub fn url(mut self) -> Self {
        if let Kind::String { format, .. } = &mut self.kind {
            *format = Some(Format::Url);
        }
        self
    }

    pub fn email(mut self, message: &str) -> Self {
        if let Kind::String { format, .. } = &mut self.kind {
            *format = Some(Format::Email(message.to_string()));
        }
        self
    }

    /// Treat `""` as null before any other string check.
    pub fn empty_as_null(mut self) -> Self {
        if let Kind::String { empty_as_null, .. } = &mut self.kind {
            *empty_as_null = true;
        }
        self
    }

    /// Accept numeric strings, booleans and null for numbers; also epoch
    /// milliseconds, null, booleans and naive date-times for dates.
    pub fn coerce(mut self) -> Self {
        match &mut self.kind {
            Kind::Number { coerce, .. } | Kind::Date { coerce } => *coerce = true,
            _ => {}
        }
        self
    }

    pub fn int(mut self) -> Self {
        if let Kind::Number { int, .. } = &mut self.kind {
            *int = true;
        }
        self
    }

    pub fn positive(mut self) -> Self {
        if let Kind::Number { positive, .. } = &mut self.kind {
            *positive = true;
        }
        self
    }

    pub fn min(mut self, value: f64, message: &str) -> Self {
        if let Kind::Number { min, .. } = &mut self.kind {
            *min = Some(Bound {
                value,
                message: Some(message.to_string()),
            });
        }
        self
    }

    pub fn max(mut self, value: f64, message: &str) -> Self {
        if let Kind::Number { max, .. } = &mut self.kind {
            *max = Some(Bound {
                value,
                message: Some(message.to_string()),
            });
        }
        self
    }

    /// Validate `value` against this rule.
    pub fn validate(&self, value: &Value) -> Result<Value, ValidationErrors> {
        let mut errors = Vec::new();
        let mut path = FieldPath::default();
        let normalized = self.check(Some(value), &mut path, &mut errors);

        match ValidationErrors::from_vec(errors) {
            Some(errors) => Err(errors),
            None => Ok(normalized.unwrap_or(Value::Null)),
        }
    }

    /// Returns `None` when the key should be left out of the output, or when
    /// the value failed (in which case `errors` is non-empty).
    fn check(
        &self,
        input: Option<&Value>,
        path: &mut FieldPath,
        errors: &mut Vec<FieldError>,
    ) -> Option<Value> {
        let value = match input {
            None => {
                if let Some(default) = &self.default {
                    return Some(default.clone());
                }
                if !self.optional {
                    errors.push(path.error("Required"));
                }
                return None;
            }
            Some(value) => value,
        };

        if value.is_null() {
            if let (true, Some(default)) = (self.null_to_default, &self.default) {
                return Some(default.clone());
            }
            if self.nullable {
                return Some(Value::Null);
            }
        }

        match &self.kind {
            Kind::String {
                min_len,
                format,
                empty_as_null,
            } => {
                let Some(text) = value.as_str() else {
                    errors.push(path.error(mismatch("string", value)));
                    return None;
                };
                if *empty_as_null && text.is_empty() {
                    return Some(Value::Null);
                }
                if let Some((len, message)) = min_len {
                    if text.chars().count() < *len {
                        errors.push(path.error(message.as_str()));
                        return None;
                    }
                }
                match format {
                    Some(Format::Url) if !text.validate_url() => {
                        errors.push(path.error("Invalid url"));
                        None
                    }
                    Some(Format::Email(message)) if !text.validate_email() => {
                        errors.push(path.error(message.as_str()));
                        None
                    }
                    _ => Some(value.clone()),
                }
            }
            Kind::Number {
                coerce,
                int,
                positive,
                min,
                max,
            } => {
                let number = if *coerce {
                    coerce_number(value)
                } else {
                    value.as_f64().ok_or_else(|| mismatch("number", value))
                };
                let number = match number {
                    Ok(number) => number,
                    Err(message) => {
                        errors.push(path.error(message));
                        return None;
                    }
                };
                if *int && number.fract() != 0.0 {
                    errors.push(path.error("Expected integer, received float"));
                    return None;
                }
                if *positive && number <= 0.0 {
                    errors.push(path.error("Number must be greater than 0"));
                    return None;
                }
                if let Some(bound) = min {
                    if number < bound.value {
                        let message = bound.message.clone().unwrap_or_else(|| {
                            format!("Number must be greater than or equal to {}", bound.value)
                        });
                        errors.push(path.error(message));
                        return None;
                    }
                }
                if let Some(bound) = max {
                    if number > bound.value {
                        let message = bound.message.clone().unwrap_or_else(|| {
                            format!("Number must be less than or equal to {}", bound.value)
                        });
                        errors.push(path.error(message));
                        return None;
                    }
                }
                if value.is_number() {
                    Some(value.clone())
                } else {
                    Some(number_value(number))
                }
            }
            Kind::Boolean => {
                if value.is_boolean() {
                    Some(value.clone())
                } else {
                    errors.push(path.error(mismatch("boolean", value)));
                    None
                }
            }
            Kind::Date { coerce } => match parse_date(value, *coerce) {
                Ok(date) => Some(Value::String(
                    date.to_rfc3339_opts(SecondsFormat::Millis, true),
                )),
                Err(message) => {
                    errors.push(path.error(message));
                    None
                }
            },
            Kind::Enum(options) => {
                let expected = options
                    .iter()
                    .map(|o| format!("'{}'", o))
                    .collect::<Vec<_>>()
                    .join(" | ");
                match value.as_str() {
                    Some(text) if options.iter().any(|o| o == text) => Some(value.clone()),
                    Some(text) => {
                        errors.push(path.error(format!(
                            "Invalid enum value. Expected {}, received '{}'",
                            expected, text
                        )));
                        None
                    }
                    None => {
                        errors.push(path.error(format!(
                            "Expected {}, received {}",
                            expected,
                            type_name(value)
                        )));
                        None
                    }
                }
            }
            Kind::Record => {
                if value.is_object() {
                    Some(value.clone())
                } else {
                    errors.push(path.error(mismatch("object", value)));
                    None
                }
            }
            Kind::Array(item) => {
                let Some(items) = value.as_array() else {
                    errors.push(path.error(mismatch("array", value)));
                    return None;
                };
                let before = errors.len();
                let mut out = Vec::with_capacity(items.len());
                for (index, element) in items.iter().enumerate() {
                    path.push(Segment::Index(index));
                    if let Some(normalized) = item.check(Some(element), path, errors) {
                        out.push(normalized);
                    }
                    path.pop();
                }
                (errors.len() == before).then_some(Value::Array(out))
            }
            Kind::Object(shape) => {
                let Some(fields) = value.as_object() else {
                    errors.push(path.error(mismatch("object", value)));
                    return None;
                };
                shape.check(fields, path, errors).map(Value::Object)
            }
        }
    }
}

/// Named field rules for one JSON object, in declaration order.
#[derive(Debug, Clone, Default)]
pub struct ObjectShape {
    fields: Vec<(String, Rule)>,
    refinements: Vec<Refinement>,
}

impl ObjectShape {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a field, replacing any earlier rule under the same name.
    pub fn field(mut self, name: impl Into<String>, rule: Rule) -> Self {
        self.insert(name, rule);
        self
    }

    pub fn insert(&mut self, name: impl Into<String>, rule: Rule) {
        let name = name.into();
        match self.fields.iter_mut().find(|(existing, _)| *existing == name) {
            Some((_, slot)) => *slot = rule,
            None => self.fields.push((name, rule)),
        }
    }

    pub fn refine(mut self, refinement: Refinement) -> Self {
        self.refinements.push(refinement);
        self
    }

    pub fn into_rule(self) -> Rule {
        Rule::object(self)
    }

    fn check(
        &self,
        input: &Map<String, Value>,
        path: &mut FieldPath,
        errors: &mut Vec<FieldError>,
    ) -> Option<Map<String, Value>> {
        let before = errors.len();
        let mut out = Map::new();

        for (name, rule) in &self.fields {
            path.push(Segment::Key(name.clone()));
            if let Some(value) = rule.check(input.get(name), path, errors) {
                out.insert(name.clone(), value);
            }
            path.pop();
        }

        if errors.len() != before {
            return None;
        }

        for refinement in &self.refinements {
            for error in refinement(&out) {
                errors.push(path.nested(error));
            }
        }

        (errors.len() == before).then_some(out)
    }
}

#[derive(Debug, Clone)]
enum Segment {
    Key(String),
    Index(usize),
}

#[derive(Debug, Default)]
struct FieldPath(Vec<Segment>);

impl FieldPath {
    fn push(&mut self, segment: Segment) {
        self.0.push(segment);
    }

    fn pop(&mut self) {
        self.0.pop();
    }

    fn render(&self) -> String {
        self.0
            .iter()
            .map(|segment| match segment {
                Segment::Key(key) => key.clone(),
                Segment::Index(index) => index.to_string(),
            })
            .collect::<Vec<_>>()
            .join(".")
    }

    fn error(&self, message: impl Into<String>) -> FieldError {
        FieldError::new(self.render(), message)
    }

    /// Re-root an error produced relative to the current object.
    fn nested(&self, error: FieldError) -> FieldError {
        let prefix = self.render();
        let path = match (prefix.is_empty(), error.path.is_empty()) {
            (true, _) => error.path,
            (false, true) => prefix,
            (false, false) => format!("{}.{}", prefix, error.path),
        };
        FieldError::new(path, error.message)
    }
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

fn mismatch(expected: &str, value: &Value) -> String {
    format!("Expected {}, received {}", expected, type_name(value))
}

fn coerce_number(value: &Value) -> Result<f64, String> {
    let number = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) if s.trim().is_empty() => Some(0.0),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        Value::Bool(b) => Some(if *b { 1.0 } else { 0.0 }),
        Value::Null => Some(0.0),
        Value::Array(_) | Value::Object(_) => None,
    };
    number
        .filter(|n| n.is_finite())
        .ok_or_else(|| "Expected number, received nan".to_string())
}

fn number_value(number: f64) -> Value {
    if number.fract() == 0.0 && number.abs() < i64::MAX as f64 {
        Value::Number(Number::from(number as i64))
    } else {
        Number::from_f64(number).map_or(Value::Null, Value::Number)
    }
}

fn parse_date(value: &Value, coerce: bool) -> Result<DateTime<Utc>, String> {
    match value {
        Value::String(text) => {
            parse_date_str(text.trim(), coerce).ok_or_else(|| "Invalid date".to_string())
        }
        Value::Number(n) if coerce => n
            .as_i64()
            .and_then(|millis| Utc.timestamp_millis_opt(millis).single())
            .ok_or_else(|| "Invalid date".to_string()),
        // Coerced like a millisecond timestamp: null and false are the epoch.
        Value::Null | Value::Bool(_) if coerce => {
            let millis = i64::from(value.as_bool().unwrap_or(false));
            Utc.timestamp_millis_opt(millis)
                .single()
                .ok_or_else(|| "Invalid date".to_string())
        }
        other => Err(mismatch("date", other)),
    }
}

fn parse_date_str(text: &str, coerce: bool) -> Option<DateTime<Utc>> {
    if let Ok(date) = DateTime::parse_from_rfc3339(text) {
        return Some(date.with_timezone(&Utc));
    }
    if let Ok(date) = NaiveDate::parse_from_str(text, "%Y-%m-%d") {
        return date.and_hms_opt(0, 0, 0).map(|naive| naive.and_utc());
    }
    if coerce {
        for format in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%dT%H:%M", "%Y-%m-%d %H:%M:%S"] {
            if let Ok(naive) = NaiveDateTime::parse_from_str(text, format) {
                return Some(naive.and_utc());
            }
        }
    }
    None
}
