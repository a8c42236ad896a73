//! Zero-panic conversion utilities: lenient JSON field coercion and, with the
//! `python` feature, JSON <-> Python object conversion.
use serde::de::{self, DeserializeOwned};
use serde::{Deserialize, Deserializer, Serializer};
use serde_json::Value;

/// Read a JSON value as a number. Numeric strings are parsed, everything else
/// (null, empty string, garbage, objects) reads as zero.
pub fn number_from_value(value: &Value) -> f64 {
    match value {
        Value::Number(n) => n.as_f64().filter(|f| f.is_finite()).unwrap_or(0.0),
        Value::String(s) => s
            .trim()
            .replace(',', "")
            .parse::<f64>()
            .ok()
            .filter(|f| f.is_finite())
            .unwrap_or(0.0),
        Value::Bool(true) => 1.0,
        _ => 0.0,
    }
}

/// Read a JSON value as text. Numbers are rendered, null and containers are empty.
pub fn text_from_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        _ => String::new(),
    }
}

/// Render a number back to JSON, keeping integral values integral.
pub fn number_to_value(number: f64) -> Value {
    if number.fract() == 0.0 && number.abs() < 9_007_199_254_740_992.0 {
        Value::from(number as i64)
    } else {
        serde_json::Number::from_f64(number)
            .map(Value::Number)
            .unwrap_or_else(|| Value::from(0))
    }
}

/// Identity form of a container number: trimmed and upper-cased.
pub fn normalize_container_no(raw: &str) -> String {
    raw.trim().to_uppercase()
}

pub(crate) fn lenient_number<'de, D>(deserializer: D) -> Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(value.as_ref().map(number_from_value).unwrap_or(0.0))
}

pub(crate) fn lenient_sequence<'de, D>(deserializer: D) -> Result<u32, D::Error>
where
    D: Deserializer<'de>,
{
    let number = lenient_number(deserializer)?;
    Ok(if number >= 1.0 { number as u32 } else { 0 })
}

pub(crate) fn lenient_text<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(value.as_ref().map(text_from_value).unwrap_or_default())
}

/// A record list where `null` means empty and entries that are not JSON
/// objects are skipped rather than failing the whole document.
pub(crate) fn lenient_records<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    let items = Option::<Vec<Value>>::deserialize(deserializer)?.unwrap_or_default();
    let total = items.len();
    let records = items
        .into_iter()
        .filter(Value::is_object)
        .map(|item| serde_json::from_value(item).map_err(de::Error::custom))
        .collect::<Result<Vec<T>, D::Error>>()?;
    if records.len() < total {
        log::debug!("converters: skipped {} non-object records", total - records.len());
    }
    Ok(records)
}

pub(crate) fn compact_number<S>(number: &f64, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    serde::Serialize::serialize(&number_to_value(*number), serializer)
}

#[cfg(feature = "python")]
pub use self::python::{json_to_pyobject, python_to_json};

#[cfg(feature = "python")]
mod python {
    use crate::errors::ReconcilerError;
    use pyo3::prelude::*;
    use pyo3::types::{PyBool, PyDict, PyList, PyModule, PyString};
    use serde_json::Value;

    /// Convert a Python object (dict/list/scalars) to JSON via the `json` module.
    pub fn python_to_json<'py>(
        py: Python<'py>,
        obj: &Bound<'py, PyAny>,
    ) -> Result<Value, ReconcilerError> {
        let json_mod = PyModule::import(py, "json")?;
        let dumped = json_mod.getattr("dumps")?.call1((obj,))?;
        let text: String = dumped.extract()?;
        Ok(serde_json::from_str(&text)?)
    }

    /// Build the Python mirror of a reconciled document: objects become
    /// dicts in key order, and numbers become `int` whenever they are
    /// integral so weights read back the way the editors wrote them.
    pub fn json_to_pyobject<'py>(py: Python<'py>, value: &Value) -> PyResult<Bound<'py, PyAny>> {
        let object = match value {
            Value::Null => py.None().into_bound(py),
            Value::Bool(flag) => PyBool::new(py, *flag).to_owned().into_any(),
            Value::Number(number) => match (number.as_i64(), number.as_u64()) {
                (Some(signed), _) => signed.into_pyobject(py)?.into_any(),
                (None, Some(unsigned)) => unsigned.into_pyobject(py)?.into_any(),
                (None, None) => number.as_f64().unwrap_or(0.0).into_pyobject(py)?.into_any(),
            },
            Value::String(text) => PyString::new(py, text).into_any(),
            Value::Array(items) => {
                let converted = items
                    .iter()
                    .map(|item| json_to_pyobject(py, item))
                    .collect::<PyResult<Vec<_>>>()?;
                PyList::new(py, converted)?.into_any()
            }
            Value::Object(fields) => {
                let dict = PyDict::new(py);
                for (key, field) in fields {
                    dict.set_item(key, json_to_pyobject(py, field)?)?;
                }
                dict.into_any()
            }
        };
        Ok(object)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn malformed_numbers_read_as_zero() {
        assert_eq!(number_from_value(&json!("")), 0.0);
        assert_eq!(number_from_value(&json!(null)), 0.0);
        assert_eq!(number_from_value(&json!("12kg")), 0.0);
        assert_eq!(number_from_value(&json!({"a": 1})), 0.0);
        assert_eq!(number_from_value(&json!(" 2,200 ")), 2200.0);
        assert_eq!(number_from_value(&json!(5000)), 5000.0);
    }

    #[test]
    fn integral_numbers_stay_integral() {
        assert_eq!(number_to_value(7200.0), json!(7200));
        assert_eq!(number_to_value(12.5), json!(12.5));
    }

    #[test]
    fn container_numbers_normalize() {
        assert_eq!(normalize_container_no("  abcu1234567 "), "ABCU1234567");
        assert_eq!(text_from_value(&json!(42)), "42");
    }
}
