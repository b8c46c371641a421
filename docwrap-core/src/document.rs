//! The envelope that wraps every persisted value.
//!
//! An [`Envelope`] pairs a caller-chosen identifier with a typed payload. The payload
//! may be a primitive, a record or a nested record graph; any type implementing
//! [`Attributes`] can be stored.

use serde::{Deserialize, Serialize, de::DeserializeOwned};
use uuid::Uuid;

/// Marker trait for payload types that can be stored inside an [`Envelope`].
///
/// This is the compile-time type descriptor handed to decode: callers name the
/// payload type at the call site and serde supplies the shape.
///
/// Implemented automatically for every `Serialize + DeserializeOwned` type.
///
/// # Example
///
/// ```ignore
/// use serde::{Serialize, Deserialize};
///
/// #[derive(Debug, Clone, Serialize, Deserialize)]
/// pub struct Product {
///     pub id: String,
///     pub name: String,
///     pub quantity: i64,
/// }
///
/// // Product: Attributes, and so are f64, bool, String, Vec<Product>...
/// ```
pub trait Attributes: Serialize + DeserializeOwned + Send + Sync + 'static {}

impl<T> Attributes for T where T: Serialize + DeserializeOwned + Send + Sync + 'static {}

/// Identifier plus typed payload, the unit of persistence.
///
/// Within one named source at most one stored record carries a given `id`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Envelope<T> {
    /// Caller-supplied identifier, unique within one named source.
    pub id: String,
    /// The typed payload.
    pub attributes: T,
}

impl<T> Envelope<T> {
    /// Wraps `attributes` under the given identifier.
    pub fn new(id: impl Into<String>, attributes: T) -> Self {
        Self {
            id: id.into(),
            attributes,
        }
    }

    /// Wraps `attributes` under a freshly generated UUID v4 identifier.
    pub fn generate(attributes: T) -> Self {
        Self::new(Uuid::new_v4().to_string(), attributes)
    }

    /// Consumes the envelope and returns its payload.
    pub fn into_attributes(self) -> T {
        self.attributes
    }

    /// Maps the payload while keeping the identifier.
    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Envelope<U> {
        Envelope {
            id: self.id,
            attributes: f(self.attributes),
        }
    }
}

impl<T> From<(String, T)> for Envelope<T> {
    fn from((id, attributes): (String, T)) -> Self {
        Envelope::new(id, attributes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generate_assigns_distinct_ids() {
        let first = Envelope::generate(1_i64);
        let second = Envelope::generate(1_i64);

        assert_ne!(first.id, second.id);
        assert!(Uuid::parse_str(&first.id).is_ok());
    }

    #[test]
    fn test_map_keeps_identifier() {
        let envelope = Envelope::new("7", 20_i64).map(|q| q * 2);

        assert_eq!(envelope, Envelope::new("7", 40_i64));
    }
}
