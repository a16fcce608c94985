use serde_json::{Map, Value};

use super::Error;

/// Read-only view over the members of one introspection response.
#[derive(Clone, Debug, Default)]
pub struct ClaimSet {
    claims: Map<String, Value>,
}

impl ClaimSet {
    /// Parses an introspection response body. The body must be a JSON object.
    pub fn parse(body: &[u8]) -> Result<Self, Error> {
        if body.iter().all(u8::is_ascii_whitespace) {
            return Err(Error::Response("empty response body".to_string()));
        }

        match serde_json::from_slice::<Value>(body) {
            Ok(Value::Object(claims)) => Ok(Self { claims }),
            Ok(_) => Err(Error::Response(
                "response body is not a JSON object".to_string(),
            )),
            Err(e) => Err(Error::Response(format!("malformed JSON: {e}"))),
        }
    }

    pub fn get_str(&self, name: &str) -> Option<&str> {
        self.claims.get(name).and_then(Value::as_str)
    }

    pub fn get_bool(&self, name: &str) -> Option<bool> {
        self.claims.get(name).and_then(Value::as_bool)
    }

    /// RFC 7662 `active` member. Only the JSON literal `true` counts.
    pub fn is_active(&self) -> bool {
        self.get_bool("active") == Some(true)
    }
}

impl From<Map<String, Value>> for ClaimSet {
    fn from(claims: Map<String, Value>) -> Self {
        Self { claims }
    }
}
