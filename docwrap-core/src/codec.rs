//! Conversion between typed envelopes and the generic records the engine stores.
//!
//! A record is a BSON document with two keys, `id` and `attributes`. Query results
//! are projected under the source name, so every attribute is reachable through the
//! uniform path `<source>.attributes.<field>` whatever the payload type is:
//!
//! ```text
//! { "vehicles": { "id": "1", "attributes": { "name": "car", "quantity": 40 } } }
//! ```
//!
//! Primitive payloads are wrapped the same way, e.g. `{ "id": "1", "attributes": 20.5 }`.

use bson::{Bson, Deserializer, Document, doc, ser::serialize_to_bson};
use serde_json::{Value, from_value, to_value};

use crate::{
    document::{Attributes, Envelope},
    error::{DocumentStoreError, DocumentStoreResult},
};

/// Key holding the envelope identifier inside a record.
pub const ID_KEY: &str = "id";
/// Key holding the serialized payload inside a record.
pub const ATTRIBUTES_KEY: &str = "attributes";

/// Stateless serializer for [`Envelope`] values.
///
/// The codec holds no source-specific state and is safe to use from any thread.
#[derive(Debug, Clone, Copy, Default)]
pub struct EnvelopeCodec;

impl EnvelopeCodec {
    /// Serializes an envelope into a record.
    ///
    /// # Errors
    ///
    /// Returns [`DocumentStoreError::Encode`] if the payload cannot be represented,
    /// e.g. a `u64` above `i64::MAX` or a map with non-string keys.
    pub fn encode<T: Attributes>(envelope: &Envelope<T>) -> DocumentStoreResult<Document> {
        let attributes = serialize_to_bson(&envelope.attributes)
            .map_err(|err| DocumentStoreError::Encode(format!("{}: {err}", envelope.id)))?;

        Ok(doc! {
            ID_KEY: envelope.id.as_str(),
            ATTRIBUTES_KEY: attributes,
        })
    }

    /// Reconstructs an envelope of payload type `T` from a record.
    ///
    /// A missing `attributes` key is read as null, so optional and unit payloads decode.
    ///
    /// # Errors
    ///
    /// Returns [`DocumentStoreError::Decode`] naming the offending path when the record
    /// is structurally incompatible with `T`.
    pub fn decode<T: Attributes>(mut record: Document) -> DocumentStoreResult<Envelope<T>> {
        let id = match record.remove(ID_KEY) {
            Some(Bson::String(id)) => id,
            Some(other) => {
                return Err(DocumentStoreError::decode(
                    ID_KEY,
                    format!("expected a string identifier, found {:?}", other.element_type()),
                ));
            }
            None => return Err(DocumentStoreError::decode(ID_KEY, "missing identifier")),
        };

        let raw = record.remove(ATTRIBUTES_KEY).unwrap_or(Bson::Null);
        let attributes = serde_path_to_error::deserialize::<_, T>(Deserializer::new(raw)).map_err(|err| {
            let located = err.path().to_string();
            let message = err.into_inner().to_string();

            DocumentStoreError::decode(Self::failure_path(&located, &message), message)
        })?;

        Ok(Envelope { id, attributes })
    }

    /// Wraps a record under the source name, producing a query result row.
    pub fn project(source: &str, record: Document) -> Document {
        doc! { source: record }
    }

    /// Extracts the record projected under `source` from a query result row.
    ///
    /// # Errors
    ///
    /// Returns [`DocumentStoreError::Decode`] at path `source` if the row does not
    /// hold a record under that key.
    pub fn unproject(source: &str, mut row: Document) -> DocumentStoreResult<Document> {
        match row.remove(source) {
            Some(Bson::Document(record)) => Ok(record),
            Some(other) => Err(DocumentStoreError::decode(
                source,
                format!("expected a record, found {:?}", other.element_type()),
            )),
            None => Err(DocumentStoreError::decode(source, "row has no record for this source")),
        }
    }

    /// Decodes a query result row produced for `source`.
    pub fn decode_row<T: Attributes>(source: &str, row: Document) -> DocumentStoreResult<Envelope<T>> {
        Self::decode(Self::unproject(source, row)?).map_err(|err| err.within(source))
    }

    /// Reads the identifier of a record without decoding its payload.
    pub fn record_id(record: &Document) -> DocumentStoreResult<String> {
        match record.get(ID_KEY) {
            Some(Bson::String(id)) => Ok(id.clone()),
            Some(_) => Err(DocumentStoreError::decode(ID_KEY, "identifier is not a string")),
            None => Err(DocumentStoreError::decode(ID_KEY, "missing identifier")),
        }
    }

    /// Converts an envelope to a JSON value, with the same `id`/`attributes` layout.
    pub fn to_json<T: Attributes>(envelope: &Envelope<T>) -> DocumentStoreResult<Value> {
        Ok(to_value(envelope)?)
    }

    /// Creates an envelope from a JSON value with the `id`/`attributes` layout.
    pub fn from_json<T: Attributes>(value: Value) -> DocumentStoreResult<Envelope<T>> {
        from_value(value).map_err(|err| DocumentStoreError::decode("$", err))
    }

    /// Resolves the path of a payload decode failure.
    ///
    /// `located` is the position inside the payload where deserialization stopped
    /// (`.` for the payload root). A missing field is reported at its parent, so its
    /// name is appended.
    fn failure_path(located: &str, message: &str) -> String {
        let mut path = ATTRIBUTES_KEY.to_string();

        if located != "." {
            path.push('.');
            path.push_str(located);
        }

        let missing = message
            .split_once("missing field `")
            .and_then(|(_, rest)| rest.split_once('`'))
            .map(|(field, _)| field);

        if let Some(field) = missing {
            path.push('.');
            path.push_str(field);
        }

        path
    }
}
