//! The closed set of values the codec can carry: [`PekelValue`].

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use num_bigint::BigInt;
use num_traits::ToPrimitive;

use crate::EncodeError;

/// A pekelable value.
///
/// `Bool` is its own variant and never an integer. Values carry no identity:
/// equal values encode to identical bytes.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum PekelValue {
    /// Python `None`
    Unit,
    Bool(bool),
    /// Arbitrary-precision signed integer
    Integer(BigInt),
    /// Raw bytes, no encoding assumed
    Bytes(Vec<u8>),
    /// Unicode text, UTF-8 on the wire
    Text(String),
    Tuple(Vec<PekelValue>),
    List(Vec<PekelValue>),
}

impl PekelValue {
    /// Short name of the variant, for diagnostics.
    pub fn kind(&self) -> &'static str {
        match self {
            PekelValue::Unit => "unit",
            PekelValue::Bool(_) => "bool",
            PekelValue::Integer(_) => "integer",
            PekelValue::Bytes(_) => "bytes",
            PekelValue::Text(_) => "text",
            PekelValue::Tuple(_) => "tuple",
            PekelValue::List(_) => "list",
        }
    }

    pub fn is_unit(&self) -> bool {
        matches!(self, PekelValue::Unit)
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            PekelValue::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// The integer value if it fits in an `i64`.
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            PekelValue::Integer(i) => i.to_i64(),
            _ => None,
        }
    }

    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            PekelValue::Bytes(b) => Some(b),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            PekelValue::Text(s) => Some(s),
            _ => None,
        }
    }

    /// Items of a tuple or list.
    pub fn as_items(&self) -> Option<&[PekelValue]> {
        match self {
            PekelValue::Tuple(items) | PekelValue::List(items) => Some(items),
            _ => None,
        }
    }
}

impl From<()> for PekelValue {
    fn from(_: ()) -> Self {
        PekelValue::Unit
    }
}

impl From<bool> for PekelValue {
    fn from(b: bool) -> Self {
        PekelValue::Bool(b)
    }
}

macro_rules! impl_from_int {
    ($($t:ty),*) => {
        $(
            impl From<$t> for PekelValue {
                fn from(i: $t) -> Self {
                    PekelValue::Integer(BigInt::from(i))
                }
            }
        )*
    };
}

impl_from_int!(i8, i16, i32, i64, i128, isize, u8, u16, u32, u64, u128, usize);

impl From<BigInt> for PekelValue {
    fn from(i: BigInt) -> Self {
        PekelValue::Integer(i)
    }
}

impl From<Vec<u8>> for PekelValue {
    fn from(b: Vec<u8>) -> Self {
        PekelValue::Bytes(b)
    }
}

impl From<&[u8]> for PekelValue {
    fn from(b: &[u8]) -> Self {
        PekelValue::Bytes(b.to_vec())
    }
}

impl From<String> for PekelValue {
    fn from(s: String) -> Self {
        PekelValue::Text(s)
    }
}

impl From<&str> for PekelValue {
    fn from(s: &str) -> Self {
        PekelValue::Text(s.to_owned())
    }
}

impl TryFrom<&serde_json::Value> for PekelValue {
    type Error = EncodeError;

    /// Converts a JSON document. Floats and objects have no pekel form.
    fn try_from(v: &serde_json::Value) -> Result<Self, Self::Error> {
        json_to_pekel(v, &mut String::from("$"))
    }
}

fn json_to_pekel(v: &serde_json::Value, path: &mut String) -> Result<PekelValue, EncodeError> {
    match v {
        serde_json::Value::Null => Ok(PekelValue::Unit),
        serde_json::Value::Bool(b) => Ok(PekelValue::Bool(*b)),
        serde_json::Value::Number(n) => json_number_to_int(n, path).map(PekelValue::Integer),
        serde_json::Value::String(s) => Ok(PekelValue::Text(s.clone())),
        serde_json::Value::Array(arr) => {
            let mut items = Vec::with_capacity(arr.len());
            for (i, item) in arr.iter().enumerate() {
                let len = path.len();
                path.push_str(&format!("[{i}]"));
                items.push(json_to_pekel(item, path)?);
                path.truncate(len);
            }
            Ok(PekelValue::List(items))
        }
        serde_json::Value::Object(_) => Err(EncodeError::NotEncodable(format!(
            "object at {path}"
        ))),
    }
}

pub(crate) fn json_number_to_int(
    n: &serde_json::Number,
    path: &str,
) -> Result<BigInt, EncodeError> {
    if let Some(i) = n.as_i64() {
        Ok(BigInt::from(i))
    } else if let Some(u) = n.as_u64() {
        Ok(BigInt::from(u))
    } else {
        Err(EncodeError::NotEncodable(format!("float {n} at {path}")))
    }
}

impl From<PekelValue> for serde_json::Value {
    fn from(v: PekelValue) -> Self {
        match v {
            PekelValue::Unit => serde_json::Value::Null,
            PekelValue::Bool(b) => serde_json::Value::Bool(b),
            PekelValue::Integer(i) => {
                if let Some(n) = i.to_i64() {
                    serde_json::json!(n)
                } else if let Some(n) = i.to_u64() {
                    serde_json::json!(n)
                } else {
                    serde_json::Value::String(i.to_string())
                }
            }
            PekelValue::Bytes(b) => serde_json::Value::String(format!(
                "data:application/octet-stream;base64,{}",
                STANDARD.encode(b)
            )),
            PekelValue::Text(s) => serde_json::Value::String(s),
            PekelValue::Tuple(items) | PekelValue::List(items) => {
                serde_json::Value::Array(items.into_iter().map(serde_json::Value::from).collect())
            }
        }
    }
}
