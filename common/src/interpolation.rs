//! Interpolated strings of the form `literal ${! expression } literal`,
//! resolved against a [`Message`] at processing time.
//!
//! Supported expressions:
//!
//! - `content()`: the payload as text
//! - `meta("key")`, `metadata("key")` or `@key`: a metadata value
//! - `json()`, `json("a.b.0")`, `this` or `this.a.b.0`: the payload parsed as
//!   JSON, optionally narrowed by a dotted path
//!
//! Missing metadata keys and JSON paths render as `null`. `${{! ... }}`
//! produces a literal `${! ... }`.

use regex::Regex;
use serde_json::Value;
use std::sync::LazyLock;
use thiserror::Error;

use crate::message::Message;

const OPEN: &str = "${!";
const OPEN_ESCAPED: &str = "${{!";
const NULL: &str = "null";

static FUNCTION_CALL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"^([a-z_]+)\(\s*(?:"((?:[^"\\]|\\.)*)")?\s*\)$"#).expect("valid regex")
});
static METADATA_SHORTHAND: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^@([\w.\-]+)$").expect("valid regex"));
static THIS_PATH: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^this((?:\.[\w\-]+)*)$").expect("valid regex"));

#[derive(Debug, Error)]
pub enum TemplateError {
    #[error("unterminated interpolation starting at byte {0}")]
    Unterminated(usize),
    #[error("empty interpolation at byte {0}")]
    Empty(usize),
    #[error("unrecognised expression `{0}`")]
    UnknownExpression(String),
    #[error("function `{0}` requires a string argument")]
    MissingArgument(String),
    #[error("invalid string argument `{argument}`: {source}")]
    InvalidArgument {
        argument: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("failed to parse message payload as JSON: {0}")]
    Json(#[from] serde_json::Error),
}

#[derive(Clone, Debug, PartialEq)]
enum Expression {
    Content,
    Metadata(String),
    Json(Vec<String>),
}

#[derive(Clone, Debug, PartialEq)]
enum Segment {
    Literal(String),
    Expression(Expression),
}

#[derive(Clone, Debug)]
pub struct InterpolatedString {
    segments: Vec<Segment>,
}

impl InterpolatedString {
    pub fn parse(template: &str) -> Result<Self, TemplateError> {
        let mut segments = Vec::new();
        let mut literal = String::new();
        let mut cursor = 0;

        while let Some(found) = template[cursor..].find("${") {
            let start = cursor + found;
            literal.push_str(&template[cursor..start]);
            let rest = &template[start..];

            if rest.starts_with(OPEN_ESCAPED) {
                let body_start = start + OPEN_ESCAPED.len();
                let close = template[body_start..]
                    .find("}}")
                    .ok_or(TemplateError::Unterminated(start))?;
                literal.push_str(OPEN);
                literal.push_str(&template[body_start..body_start + close]);
                literal.push('}');
                cursor = body_start + close + 2;
            } else if rest.starts_with(OPEN) {
                let body_start = start + OPEN.len();
                let close = find_closing_brace(&template[body_start..])
                    .ok_or(TemplateError::Unterminated(start))?;
                let body = template[body_start..body_start + close].trim();
                if body.is_empty() {
                    return Err(TemplateError::Empty(start));
                }
                if !literal.is_empty() {
                    segments.push(Segment::Literal(std::mem::take(&mut literal)));
                }
                segments.push(Segment::Expression(parse_expression(body)?));
                cursor = body_start + close + 1;
            } else {
                literal.push_str("${");
                cursor = start + 2;
            }
        }

        literal.push_str(&template[cursor..]);
        if !literal.is_empty() {
            segments.push(Segment::Literal(literal));
        }

        Ok(Self { segments })
    }

    pub fn try_string(&self, message: &Message) -> Result<String, TemplateError> {
        let mut parsed: Option<Value> = None;
        let mut out = String::new();

        for segment in &self.segments {
            match segment {
                Segment::Literal(text) => out.push_str(text),
                Segment::Expression(Expression::Content) => {
                    out.push_str(&String::from_utf8_lossy(message.payload()));
                }
                Segment::Expression(Expression::Metadata(key)) => {
                    out.push_str(message.meta(key).unwrap_or(NULL));
                }
                Segment::Expression(Expression::Json(path)) => {
                    if parsed.is_none() {
                        parsed = Some(serde_json::from_slice(message.payload())?);
                    }
                    match parsed.as_ref().and_then(|root| lookup(root, path)) {
                        Some(Value::String(s)) => out.push_str(s),
                        Some(value) => out.push_str(&value.to_string()),
                        None => out.push_str(NULL),
                    }
                }
            }
        }

        Ok(out)
    }
}

fn find_closing_brace(body: &str) -> Option<usize> {
    let mut in_quotes = false;
    let mut escaped = false;

    for (i, c) in body.char_indices() {
        match c {
            _ if escaped => escaped = false,
            '\\' if in_quotes => escaped = true,
            '"' => in_quotes = !in_quotes,
            '}' if !in_quotes => return Some(i),
            _ => {}
        }
    }

    None
}

fn parse_expression(body: &str) -> Result<Expression, TemplateError> {
    if let Some(captures) = METADATA_SHORTHAND.captures(body) {
        return Ok(Expression::Metadata(captures[1].to_string()));
    }

    if let Some(captures) = THIS_PATH.captures(body) {
        return Ok(Expression::Json(split_path(&captures[1])));
    }

    let captures = FUNCTION_CALL
        .captures(body)
        .ok_or_else(|| TemplateError::UnknownExpression(body.to_string()))?;
    let name = &captures[1];
    let argument = captures
        .get(2)
        .map(|raw| {
            serde_json::from_str::<String>(&format!("\"{}\"", raw.as_str())).map_err(|source| {
                TemplateError::InvalidArgument {
                    argument: raw.as_str().to_string(),
                    source,
                }
            })
        })
        .transpose()?;

    match (name, argument) {
        ("content", None) => Ok(Expression::Content),
        ("meta" | "metadata", Some(key)) => Ok(Expression::Metadata(key)),
        ("meta" | "metadata", None) => Err(TemplateError::MissingArgument(name.to_string())),
        ("json", path) => Ok(Expression::Json(
            path.as_deref().map(split_path).unwrap_or_default(),
        )),
        _ => Err(TemplateError::UnknownExpression(body.to_string())),
    }
}

fn split_path(path: &str) -> Vec<String> {
    path.split('.')
        .filter(|segment| !segment.is_empty())
        .map(str::to_string)
        .collect()
}

fn lookup<'a>(root: &'a Value, path: &[String]) -> Option<&'a Value> {
    path.iter().try_fold(root, |value, segment| match value {
        Value::Object(map) => map.get(segment),
        Value::Array(items) => segment.parse::<usize>().ok().and_then(|i| items.get(i)),
        _ => None,
    })
}
