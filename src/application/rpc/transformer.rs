//! Transformer - 富类型序列化
//!
//! 与 superjson 线格式兼容的编码：普通 JSON 放在 `json`，
//! JSON 无法原生表达的值（Date、bigint、undefined、NaN/Infinity）
//! 在 `meta.values` 中按路径标注类型。
//!
//! ```text
//! { "json": { "id": "u1", "createdAt": "2024-01-01T00:00:00.000Z" },
//!   "meta": { "values": { "createdAt": ["Date"] } } }
//! ```

use std::collections::BTreeMap;

use chrono::{DateTime, Datelike, SecondsFormat, Utc};
use serde_json::{json, Map, Value};
use thiserror::Error;

const DATE: &str = "Date";
const BIGINT: &str = "bigint";
const UNDEFINED: &str = "undefined";
const NUMBER: &str = "number";

/// 2^53，超过此范围的整数不再以 JSON 整数输出
const MAX_SAFE_INTEGER: f64 = 9_007_199_254_740_992.0;

/// 解码错误
#[derive(Debug, Error, PartialEq)]
pub enum TransformError {
    #[error("Missing `json` field in transformed payload")]
    MissingJson,

    #[error("Invalid meta: {0}")]
    InvalidMeta(String),

    #[error("Unknown type annotation `{annotation}` at `{path}`")]
    UnknownAnnotation { path: String, annotation: String },

    #[error("Annotated path `{0}` does not exist")]
    PathNotFound(String),

    #[error("Invalid {annotation} value at `{path}`: {reason}")]
    InvalidValue {
        path: String,
        annotation: &'static str,
        reason: String,
    },
}

/// 可跨线传输的值
#[derive(Debug, Clone)]
pub enum RpcValue {
    Undefined,
    Null,
    Bool(bool),
    Number(f64),
    String(String),
    BigInt(i128),
    Date(DateTime<Utc>),
    Array(Vec<RpcValue>),
    Object(BTreeMap<String, RpcValue>),
}

impl PartialEq for RpcValue {
    fn eq(&self, other: &Self) -> bool {
        use RpcValue::*;
        match (self, other) {
            (Undefined, Undefined) | (Null, Null) => true,
            (Bool(a), Bool(b)) => a == b,
            (Number(a), Number(b)) => a == b || (a.is_nan() && b.is_nan()),
            (String(a), String(b)) => a == b,
            (BigInt(a), BigInt(b)) => a == b,
            (Date(a), Date(b)) => a == b,
            (Array(a), Array(b)) => a == b,
            (Object(a), Object(b)) => a == b,
            _ => false,
        }
    }
}

impl RpcValue {
    /// 构造 Date，精度截断到毫秒（与线格式一致）
    pub fn date(value: DateTime<Utc>) -> Self {
        let millis = value.timestamp_millis();
        RpcValue::Date(DateTime::from_timestamp_millis(millis).unwrap_or(value))
    }

    /// 按键值对构造对象
    pub fn object<K, I>(entries: I) -> Self
    where
        K: Into<String>,
        I: IntoIterator<Item = (K, RpcValue)>,
    {
        RpcValue::Object(entries.into_iter().map(|(k, v)| (k.into(), v)).collect())
    }

    pub fn get(&self, key: &str) -> Option<&RpcValue> {
        match self {
            RpcValue::Object(map) => map.get(key),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            RpcValue::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_date(&self) -> Option<&DateTime<Utc>> {
        match self {
            RpcValue::Date(d) => Some(d),
            _ => None,
        }
    }

    /// null 或 undefined
    pub fn is_nullish(&self) -> bool {
        matches!(self, RpcValue::Null | RpcValue::Undefined)
    }

    /// 普通 JSON 转换（不处理任何类型标注）
    pub fn from_plain(value: Value) -> Self {
        match value {
            Value::Null => RpcValue::Null,
            Value::Bool(b) => RpcValue::Bool(b),
            Value::Number(n) => RpcValue::Number(n.as_f64().unwrap_or(f64::NAN)),
            Value::String(s) => RpcValue::String(s),
            Value::Array(items) => {
                RpcValue::Array(items.into_iter().map(RpcValue::from_plain).collect())
            }
            Value::Object(map) => RpcValue::Object(
                map.into_iter()
                    .map(|(k, v)| (k, RpcValue::from_plain(v)))
                    .collect(),
            ),
        }
    }
}

// ============================================================================
// Encode
// ============================================================================

/// 编码为 `{ json, meta? }`
pub fn encode(value: &RpcValue) -> Value {
    let mut path = Vec::new();
    let mut annotations = Vec::new();
    let plain = encode_value(value, &mut path, &mut annotations);

    let mut out = Map::new();
    out.insert("json".to_string(), plain);

    if !annotations.is_empty() {
        // 根路径是空段列表，只有叶子值本身需要标注时出现
        let values = match annotations.as_slice() {
            [(p, annotation)] if p.is_empty() => json!([annotation]),
            _ => {
                let mut values = Map::new();
                for (p, annotation) in &annotations {
                    values.insert(join_path(p), json!([annotation]));
                }
                Value::Object(values)
            }
        };
        out.insert("meta".to_string(), json!({ "values": values }));
    }

    Value::Object(out)
}

fn encode_value(
    value: &RpcValue,
    path: &mut Vec<String>,
    annotations: &mut Vec<(Vec<String>, &'static str)>,
) -> Value {
    match value {
        RpcValue::Undefined => {
            annotations.push((path.clone(), UNDEFINED));
            Value::Null
        }
        RpcValue::Null => Value::Null,
        RpcValue::Bool(b) => Value::Bool(*b),
        RpcValue::Number(n) => {
            if n.is_nan() || n.is_infinite() {
                annotations.push((path.clone(), NUMBER));
                let repr = if n.is_nan() {
                    "NaN"
                } else if *n > 0.0 {
                    "Infinity"
                } else {
                    "-Infinity"
                };
                Value::String(repr.to_string())
            } else if n.fract() == 0.0 && n.abs() < MAX_SAFE_INTEGER {
                Value::from(*n as i64)
            } else {
                serde_json::Number::from_f64(*n)
                    .map(Value::Number)
                    .unwrap_or(Value::Null)
            }
        }
        RpcValue::String(s) => Value::String(s.clone()),
        RpcValue::BigInt(i) => {
            annotations.push((path.clone(), BIGINT));
            Value::String(i.to_string())
        }
        RpcValue::Date(d) => {
            annotations.push((path.clone(), DATE));
            Value::String(format_date(d))
        }
        RpcValue::Array(items) => {
            let mut out = Vec::with_capacity(items.len());
            for (i, item) in items.iter().enumerate() {
                path.push(i.to_string());
                out.push(encode_value(item, path, annotations));
                path.pop();
            }
            Value::Array(out)
        }
        RpcValue::Object(map) => {
            let mut out = Map::new();
            for (k, v) in map {
                path.push(k.clone());
                out.insert(k.clone(), encode_value(v, path, annotations));
                path.pop();
            }
            Value::Object(out)
        }
    }
}

/// RFC 3339，毫秒精度；0000-9999 以外的年份用扩展形式 `±YYYYYY`
fn format_date(date: &DateTime<Utc>) -> String {
    let year = date.year();
    if (0..=9999).contains(&year) {
        return date.to_rfc3339_opts(SecondsFormat::Millis, true);
    }
    let sign = if year < 0 { '-' } else { '+' };
    format!(
        "{}{:06}{}",
        sign,
        year.unsigned_abs(),
        date.format("-%m-%dT%H:%M:%S%.3fZ")
    )
}

fn parse_date(s: &str) -> Result<DateTime<Utc>, String> {
    let (sign, rest) = match s.as_bytes().first() {
        Some(b'+') => (1, &s[1..]),
        Some(b'-') => (-1, &s[1..]),
        _ => {
            return DateTime::parse_from_rfc3339(s)
                .map(|d| d.with_timezone(&Utc))
                .map_err(|e| e.to_string())
        }
    };

    let digits = rest
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(rest.len());
    let year: i32 = rest[..digits]
        .parse()
        .map_err(|e: std::num::ParseIntError| format!("invalid expanded year: {}", e))?;

    // 2000 是闰年，任何月日都能先按占位年份解析
    let parsed = DateTime::parse_from_rfc3339(&format!("2000{}", &rest[digits..]))
        .map_err(|e| e.to_string())?;
    parsed
        .with_year(sign * year)
        .map(|d| d.with_timezone(&Utc))
        .ok_or_else(|| format!("year {} out of range", sign * year))
}

fn escape_key(key: &str) -> String {
    key.replace('\\', "\\\\").replace('.', "\\.")
}

fn join_path(path: &[String]) -> String {
    path.iter()
        .map(|k| escape_key(k))
        .collect::<Vec<_>>()
        .join(".")
}

/// 对象形式 `values` 的键至少有一段，`""` 即空字符串键
fn split_path(path: &str) -> Vec<String> {
    let mut segments = Vec::new();
    let mut current = String::new();
    let mut chars = path.chars();
    while let Some(c) = chars.next() {
        match c {
            '\\' => {
                if let Some(next) = chars.next() {
                    current.push(next);
                }
            }
            '.' => segments.push(std::mem::take(&mut current)),
            _ => current.push(c),
        }
    }
    segments.push(current);
    segments
}

// ============================================================================
// Decode
// ============================================================================

/// 解码 `{ json, meta? }`
pub fn decode(payload: Value) -> Result<RpcValue, TransformError> {
    let Value::Object(mut envelope) = payload else {
        return Err(TransformError::MissingJson);
    };
    let plain = envelope.remove("json").ok_or(TransformError::MissingJson)?;
    let mut value = RpcValue::from_plain(plain);

    let values = match envelope.remove("meta") {
        None | Some(Value::Null) => return Ok(value),
        Some(Value::Object(mut meta)) => meta.remove("values"),
        Some(other) => {
            return Err(TransformError::InvalidMeta(format!(
                "expected object, got {}",
                other
            )))
        }
    };

    match values {
        None | Some(Value::Null) => {}
        Some(Value::Array(annotation)) => apply_annotation(&mut value, &[], &annotation)?,
        Some(Value::Object(paths)) => {
            for (path, annotation) in paths {
                let Value::Array(annotation) = annotation else {
                    return Err(TransformError::InvalidMeta(format!(
                        "annotation at `{}` must be an array",
                        path
                    )));
                };
                apply_annotation(&mut value, &split_path(&path), &annotation)?;
            }
        }
        Some(other) => {
            return Err(TransformError::InvalidMeta(format!(
                "expected values object, got {}",
                other
            )))
        }
    }

    Ok(value)
}

fn apply_annotation(
    root: &mut RpcValue,
    segments: &[String],
    annotation: &[Value],
) -> Result<(), TransformError> {
    let path = join_path(segments);
    let path = path.as_str();
    let name = annotation
        .first()
        .and_then(Value::as_str)
        .ok_or_else(|| TransformError::InvalidMeta(format!("empty annotation at `{}`", path)))?;

    let target = navigate(root, segments)
        .ok_or_else(|| TransformError::PathNotFound(path.to_string()))?;

    let invalid = |annotation: &'static str, reason: String| TransformError::InvalidValue {
        path: path.to_string(),
        annotation,
        reason,
    };

    *target = match name {
        DATE => {
            let s = target
                .as_str()
                .ok_or_else(|| invalid(DATE, "expected string".into()))?;
            RpcValue::Date(parse_date(s).map_err(|reason| invalid(DATE, reason))?)
        }
        BIGINT => {
            let s = target
                .as_str()
                .ok_or_else(|| invalid(BIGINT, "expected string".into()))?;
            RpcValue::BigInt(s.parse().map_err(|e: std::num::ParseIntError| {
                invalid(BIGINT, e.to_string())
            })?)
        }
        UNDEFINED => RpcValue::Undefined,
        NUMBER => match target.as_str() {
            Some("NaN") => RpcValue::Number(f64::NAN),
            Some("Infinity") => RpcValue::Number(f64::INFINITY),
            Some("-Infinity") => RpcValue::Number(f64::NEG_INFINITY),
            _ => return Err(invalid(NUMBER, "expected NaN or Infinity".into())),
        },
        other => {
            return Err(TransformError::UnknownAnnotation {
                path: path.to_string(),
                annotation: other.to_string(),
            })
        }
    };

    Ok(())
}

fn navigate<'a>(value: &'a mut RpcValue, segments: &[String]) -> Option<&'a mut RpcValue> {
    let Some((head, rest)) = segments.split_first() else {
        return Some(value);
    };
    let next = match value {
        RpcValue::Object(map) => map.get_mut(head)?,
        RpcValue::Array(items) => items.get_mut(head.parse::<usize>().ok()?)?,
        _ => return None,
    };
    navigate(next, rest)
}

// ============================================================================
// Conversions
// ============================================================================

/// 处理器输出转换为 [`RpcValue`]
pub trait IntoRpcValue {
    fn into_rpc_value(self) -> RpcValue;
}

impl IntoRpcValue for RpcValue {
    fn into_rpc_value(self) -> RpcValue {
        self
    }
}

impl IntoRpcValue for () {
    fn into_rpc_value(self) -> RpcValue {
        RpcValue::Undefined
    }
}

impl IntoRpcValue for bool {
    fn into_rpc_value(self) -> RpcValue {
        RpcValue::Bool(self)
    }
}

impl IntoRpcValue for String {
    fn into_rpc_value(self) -> RpcValue {
        RpcValue::String(self)
    }
}

impl IntoRpcValue for &str {
    fn into_rpc_value(self) -> RpcValue {
        RpcValue::String(self.to_string())
    }
}

impl IntoRpcValue for i64 {
    fn into_rpc_value(self) -> RpcValue {
        RpcValue::Number(self as f64)
    }
}

impl IntoRpcValue for u64 {
    fn into_rpc_value(self) -> RpcValue {
        RpcValue::Number(self as f64)
    }
}

impl IntoRpcValue for f64 {
    fn into_rpc_value(self) -> RpcValue {
        RpcValue::Number(self)
    }
}

impl IntoRpcValue for DateTime<Utc> {
    fn into_rpc_value(self) -> RpcValue {
        RpcValue::date(self)
    }
}

impl<T: IntoRpcValue> IntoRpcValue for Option<T> {
    fn into_rpc_value(self) -> RpcValue {
        match self {
            Some(v) => v.into_rpc_value(),
            None => RpcValue::Null,
        }
    }
}

impl<T: IntoRpcValue> IntoRpcValue for Vec<T> {
    fn into_rpc_value(self) -> RpcValue {
        RpcValue::Array(self.into_iter().map(IntoRpcValue::into_rpc_value).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn sample_date() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 9, 12, 30, 0).unwrap()
            + chrono::Duration::milliseconds(250)
    }

    #[test]
    fn test_plain_values_have_no_meta() {
        let value = RpcValue::object([
            ("id", "test-user".into_rpc_value()),
            ("count", 3_i64.into_rpc_value()),
        ]);
        let encoded = encode(&value);
        assert_eq!(encoded, json!({ "json": { "count": 3, "id": "test-user" } }));
    }

    #[test]
    fn test_date_is_annotated_by_path() {
        let value = RpcValue::object([(
            "user",
            RpcValue::object([("createdAt", RpcValue::date(sample_date()))]),
        )]);
        let encoded = encode(&value);
        assert_eq!(
            encoded["json"]["user"]["createdAt"],
            "2024-03-09T12:30:00.250Z"
        );
        assert_eq!(encoded["meta"]["values"]["user.createdAt"], json!(["Date"]));
    }

    #[test]
    fn test_root_date_uses_root_annotation() {
        let encoded = encode(&RpcValue::date(sample_date()));
        assert_eq!(encoded["meta"]["values"], json!(["Date"]));
        assert_eq!(decode(encoded).unwrap(), RpcValue::date(sample_date()));
    }

    #[test]
    fn test_round_trip_preserves_rich_types() {
        let value = RpcValue::object([
            ("createdAt", RpcValue::date(sample_date())),
            ("big", RpcValue::BigInt(170_141_183_460_469_231_731_687_303_715_884_105_727)),
            ("missing", RpcValue::Undefined),
            ("ratio", RpcValue::Number(f64::NAN)),
            ("limit", RpcValue::Number(f64::NEG_INFINITY)),
            ("half", RpcValue::Number(0.5)),
            (
                "history",
                RpcValue::Array(vec![RpcValue::date(sample_date()), RpcValue::Null]),
            ),
            ("dotted.key", RpcValue::date(sample_date())),
            ("", RpcValue::date(sample_date())),
            (
                "far",
                RpcValue::Array(vec![
                    RpcValue::date(Utc.with_ymd_and_hms(10000, 1, 1, 0, 0, 0).unwrap()),
                    RpcValue::date(Utc.with_ymd_and_hms(-50, 6, 30, 8, 0, 0).unwrap()),
                ]),
            ),
        ]);

        let decoded = decode(encode(&value)).unwrap();
        assert_eq!(decoded, value);
    }

    #[test]
    fn test_empty_key_is_not_the_root() {
        let value = RpcValue::object([("", RpcValue::date(sample_date()))]);
        let encoded = encode(&value);
        assert_eq!(encoded["meta"]["values"], json!({ "": ["Date"] }));
        assert_eq!(decode(encoded).unwrap(), value);
    }

    #[test]
    fn test_expanded_year_dates() {
        let far = Utc.with_ymd_and_hms(10000, 1, 1, 0, 0, 0).unwrap();
        let encoded = encode(&RpcValue::date(far));
        assert_eq!(encoded["json"], "+010000-01-01T00:00:00.000Z");
        assert_eq!(decode(encoded).unwrap(), RpcValue::date(far));

        let decoded = decode(json!({ "json": "-000050-06-30T08:00:00.000Z", "meta": { "values": ["Date"] } }))
            .unwrap();
        assert_eq!(
            decoded,
            RpcValue::date(Utc.with_ymd_and_hms(-50, 6, 30, 8, 0, 0).unwrap())
        );
    }

    #[test]
    fn test_date_constructor_truncates_to_millis() {
        let precise = sample_date() + chrono::Duration::nanoseconds(999);
        assert_eq!(RpcValue::date(precise), RpcValue::date(sample_date()));
    }

    #[test]
    fn test_decode_requires_json_field() {
        assert_eq!(decode(json!({ "meta": {} })), Err(TransformError::MissingJson));
        assert_eq!(decode(json!("hello")), Err(TransformError::MissingJson));
    }

    #[test]
    fn test_decode_rejects_unknown_annotation() {
        let err = decode(json!({ "json": { "a": 1 }, "meta": { "values": { "a": ["regexp"] } } }))
            .unwrap_err();
        assert!(matches!(err, TransformError::UnknownAnnotation { .. }));
    }

    #[test]
    fn test_decode_rejects_missing_path() {
        let err = decode(json!({ "json": {}, "meta": { "values": { "a": ["Date"] } } }))
            .unwrap_err();
        assert_eq!(err, TransformError::PathNotFound("a".into()));
    }

    #[test]
    fn test_decode_rejects_bad_date() {
        let err = decode(json!({ "json": "yesterday", "meta": { "values": ["Date"] } }))
            .unwrap_err();
        assert!(matches!(err, TransformError::InvalidValue { annotation: DATE, .. }));
    }

    #[test]
    fn test_split_path_handles_escapes() {
        assert_eq!(split_path("a.b\\.c"), vec!["a", "b.c"]);
        assert_eq!(split_path(""), vec![""]);
        assert_eq!(join_path(&["a".into(), "b.c".into()]), "a.b\\.c");
    }
}
