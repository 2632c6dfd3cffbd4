//! Wire types of the math service API.
//!
//! These types are shared between the server and its clients, such as the `loadtest` crate. Both
//! are plain values with no identity: an [`AddRequest`] lives for the duration of one HTTP request,
//! and the matching [`AddResponse`] is discarded once it has been written to the response body.
#![warn(missing_docs)]
#![warn(missing_debug_implementations)]

use serde::{Deserialize, Serialize};

/// Request body of the `POST /` addition endpoint.
///
/// Operands are decoded leniently, see [`operand`] for the accepted forms.
#[derive(Clone, Copy, Debug, PartialEq, Deserialize, Serialize)]
pub struct AddRequest {
    /// The left operand.
    #[serde(deserialize_with = "operand::deserialize")]
    pub a: f64,
    /// The right operand.
    #[serde(deserialize_with = "operand::deserialize")]
    pub b: f64,
}

impl AddRequest {
    /// Creates a request for `a + b`.
    pub fn new(a: f64, b: f64) -> Self {
        Self { a, b }
    }

    /// Computes the response for this request.
    ///
    /// This is plain IEEE-754 addition. Infinities and NaN propagate and are never rejected.
    pub fn compute(&self) -> AddResponse {
        AddResponse {
            result: self.a + self.b,
        }
    }
}

/// Response body of the `POST /` addition endpoint.
///
/// JSON cannot carry infinities or NaN, so only finite results can be sent. See
/// [`AddResponse::is_representable`].
#[derive(Clone, Copy, Debug, PartialEq, Deserialize, Serialize)]
pub struct AddResponse {
    /// The sum of both operands.
    pub result: f64,
}

impl AddResponse {
    /// Returns `true` if the result can be written as a JSON number.
    pub fn is_representable(&self) -> bool {
        self.result.is_finite()
    }
}

/// Decoding of a single operand.
///
/// An operand is accepted in two forms:
///
///  - A JSON number. Integers are widened to `f64`, and numbers beyond the range of `f64` become
///    positive or negative infinity instead of failing.
///  - A JSON string containing a floating point number, such as `"10"` or `" 2.5e3 "`. Surrounding
///    whitespace is ignored.
///
/// Everything else, including strings like `"ten"`, is rejected.
pub mod operand {
    use serde::de::{Deserialize, Deserializer, Error, Unexpected};
    use serde_json::Value;
    use serde_json::value::RawValue;

    const EXPECTED: &str = "a number or a numeric string";

    /// Deserializes an operand from its raw JSON text.
    ///
    /// This only works with `serde_json` deserializers.
    pub fn deserialize<'de, D>(deserializer: D) -> Result<f64, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = <Box<RawValue>>::deserialize(deserializer)?;
        parse(raw.get())
    }

    /// Parses the raw JSON text of an operand.
    pub fn parse<E: Error>(raw: &str) -> Result<f64, E> {
        let raw = raw.trim();

        // The JSON number grammar is a subset of what `f64::from_str` accepts. Out of range
        // values saturate to infinity.
        if let Ok(number) = raw.parse::<f64>() {
            return Ok(number);
        }

        match serde_json::from_str::<Value>(raw).map_err(E::custom)? {
            Value::String(s) => s
                .trim()
                .parse()
                .map_err(|_| E::invalid_value(Unexpected::Str(&s), &EXPECTED)),
            Value::Null => Err(E::invalid_type(Unexpected::Unit, &EXPECTED)),
            Value::Bool(b) => Err(E::invalid_type(Unexpected::Bool(b), &EXPECTED)),
            Value::Array(_) => Err(E::invalid_type(Unexpected::Seq, &EXPECTED)),
            Value::Object(_) => Err(E::invalid_type(Unexpected::Map, &EXPECTED)),
            Value::Number(n) => Err(E::invalid_type(Unexpected::Other(&n.to_string()), &EXPECTED)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn decode(json: &str) -> Result<AddRequest, serde_json::Error> {
        serde_json::from_str(json)
    }

    #[test]
    fn integers_are_accepted() {
        let request = decode(r#"{"a": 10, "b": 5}"#).unwrap();
        assert_eq!(request, AddRequest::new(10.0, 5.0));
        assert_eq!(request.compute().result, 15.0);
    }

    #[test]
    fn numeric_strings_are_accepted() {
        let request = decode(r#"{"a": "10", "b": " -2.5e1 "}"#).unwrap();
        assert_eq!(request, AddRequest::new(10.0, -25.0));
    }

    #[test]
    fn rejects_non_numeric_strings() {
        let err = decode(r#"{"a": "ten", "b": 5}"#).unwrap_err();
        assert!(err.to_string().contains(r#"string "ten""#), "{err}");
    }

    #[test]
    fn rejects_other_types() {
        assert!(decode(r#"{"a": true, "b": 5}"#).is_err());
        assert!(decode(r#"{"a": null, "b": 5}"#).is_err());
        assert!(decode(r#"{"a": [1], "b": 5}"#).is_err());
        assert!(decode(r#"{"a": {"value": 1}, "b": 5}"#).is_err());
    }

    #[test]
    fn rejects_missing_operand() {
        let err = decode(r#"{"a": 1}"#).unwrap_err();
        assert!(err.to_string().contains("missing field `b`"), "{err}");
    }

    #[test]
    fn out_of_range_operands_saturate() {
        let request = decode(r#"{"a": 1e309, "b": -1e309}"#).unwrap();
        assert_eq!(request.a, f64::INFINITY);
        assert_eq!(request.b, f64::NEG_INFINITY);
        assert!(request.compute().result.is_nan());
    }

    #[test]
    fn overflow_is_not_representable() {
        let response = AddRequest::new(f64::MAX, f64::MAX).compute();
        assert!(response.result.is_infinite());
        assert!(!response.is_representable());
        assert!(AddRequest::new(10.0, 5.0).compute().is_representable());
    }

    #[test]
    fn response_round_trip() {
        let response = AddRequest::new(0.1, 0.2).compute();
        let json = serde_json::to_string(&response).unwrap();
        assert_eq!(serde_json::from_str::<AddResponse>(&json).unwrap(), response);
    }
}
