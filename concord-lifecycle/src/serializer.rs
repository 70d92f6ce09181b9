//! Typed record serializer over the key-value ledger.
//!
//! A record is flattened into a bounded set of entries under its namespace:
//! one `StateData` per non-zero field at `ns/fields/key/<Field>`, plus a
//! `StateMetadata` type envelope at `ns/metadata/key` naming the record type
//! and listing the serialized fields with their kinds. Zero-valued fields are
//! omitted entirely and reappear as their zero value on read.
//!
//! The encoding of every entry depends only on the field's logical value and
//! kind, never on insertion order or surrounding fields, so two organizations
//! serializing equal records into their private partitions produce
//! byte-identical entries. [`Serializer::is_serialized`] exploits this to
//! compare partitions by digest alone.

use std::collections::HashMap;

use concord_model::{
    value_hash, OpaqueState, RangeableState, ReadWritableState, ReadableState, StateError,
};
use prost::Message;
use thiserror::Error;

use crate::proto::{state_data, FieldKind, StateData, StateField, StateMetadata};

/// A single field value, tagged with its kind.
///
/// `Message` carries the canonical encoding of a nested message; on the wire
/// it is indistinguishable from `Bytes`, the kind distinction lives in the
/// envelope.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldValue {
    Int64(i64),
    String(String),
    Bytes(Vec<u8>),
    Message(Vec<u8>),
}

impl FieldValue {
    pub fn kind(&self) -> FieldKind {
        match self {
            FieldValue::Int64(_) => FieldKind::Int64,
            FieldValue::String(_) => FieldKind::String,
            FieldValue::Bytes(_) => FieldKind::Bytes,
            FieldValue::Message(_) => FieldKind::Message,
        }
    }

    /// Zero values are not written to state.
    pub fn is_zero(&self) -> bool {
        match self {
            FieldValue::Int64(v) => *v == 0,
            FieldValue::String(s) => s.is_empty(),
            FieldValue::Bytes(b) | FieldValue::Message(b) => b.is_empty(),
        }
    }

    fn into_state_data(self) -> StateData {
        let value = match self {
            FieldValue::Int64(v) => state_data::Value::Int64(v),
            FieldValue::String(s) => state_data::Value::String(s),
            FieldValue::Bytes(b) | FieldValue::Message(b) => state_data::Value::Bytes(b),
        };
        StateData { value: Some(value) }
    }

    fn from_state_data(kind: FieldKind, data: StateData) -> Result<FieldValue, RecordError> {
        match (kind, data.value) {
            (FieldKind::Int64, Some(state_data::Value::Int64(v))) => Ok(FieldValue::Int64(v)),
            (FieldKind::String, Some(state_data::Value::String(s))) => Ok(FieldValue::String(s)),
            (FieldKind::Bytes, Some(state_data::Value::Bytes(b))) => Ok(FieldValue::Bytes(b)),
            (FieldKind::Message, Some(state_data::Value::Bytes(b))) => Ok(FieldValue::Message(b)),
            (kind, _) => Err(RecordError::Kind(kind)),
        }
    }
}

/// A record type registered with the serializer.
///
/// Implementations declare an explicit field table: `fields` reports every
/// declared field with its current value in canonical declaration order, and
/// `apply` assigns one decoded field back. Dispatch stays closed over the
/// [`FieldKind`] sum.
pub trait StateRecord: Default {
    /// The type name stored in the metadata envelope.
    fn type_name() -> &'static str;

    /// Every declared field with its current value, in declaration order.
    fn fields(&self) -> Vec<(&'static str, FieldValue)>;

    /// Assign one decoded field.
    fn apply(&mut self, name: &str, value: FieldValue) -> Result<(), RecordError>;
}

/// Failure to reconstruct a record field from stored bytes.
#[derive(Debug, Error)]
pub enum RecordError {
    #[error(transparent)]
    Decode(#[from] prost::DecodeError),
    #[error("value does not encode a field of kind {0:?}")]
    Kind(FieldKind),
    #[error("field {0} is not part of this record")]
    UnknownField(String),
}

#[derive(Debug, Error)]
pub enum SerializerError {
    #[error("could not get state for key {key}: {source}")]
    Read { key: String, source: StateError },
    #[error("could not write key into state: {0}")]
    Write(#[source] StateError),
    #[error("could not query metadata for namespace {namespace}: {source}")]
    MetadataRead { namespace: String, source: StateError },
    #[error("could not unmarshal metadata for namespace {namespace}: {source}")]
    MetadataDecode {
        namespace: String,
        source: prost::DecodeError,
    },
    #[error("could not unmarshal state for key {key}: {source}")]
    FieldDecode { key: String, source: RecordError },
    #[error("could not get state range for namespace {namespace}: {source}")]
    RangeRead { namespace: String, source: StateError },
    #[error("could not get state hash for key {key}: {source}")]
    HashRead { key: String, source: StateError },
    #[error("type name mismatch '{expected}' != '{actual}'")]
    TypeMismatch {
        expected: &'static str,
        actual: String,
    },
}

/// Maps typed records to ledger entries and back.
///
/// Stateless; held by value and shared freely.
#[derive(Debug, Clone, Copy, Default)]
pub struct Serializer;

impl Serializer {
    /// The exact entry set `serialize` would produce: one encoded `StateData`
    /// per non-zero field, then the metadata envelope.
    fn encoded_entries<R: StateRecord>(
        namespace: &str,
        name: &str,
        record: &R,
    ) -> Vec<(String, Vec<u8>)> {
        let mut entries = Vec::new();
        let mut descriptors = Vec::new();
        for (field, value) in record.fields() {
            if value.is_zero() {
                continue;
            }
            descriptors.push(StateField {
                name: field.to_string(),
                kind: value.kind() as i32,
            });
            let data = value.into_state_data();
            entries.push((
                format!("{namespace}/fields/{name}/{field}"),
                data.encode_to_vec(),
            ));
        }
        let metadata = StateMetadata {
            datatype: R::type_name().to_string(),
            fields: descriptors,
        };
        entries.push((
            format!("{namespace}/metadata/{name}"),
            metadata.encode_to_vec(),
        ));
        entries
    }

    /// Write `record` under `namespace`/`name`.
    ///
    /// Each entry is read back first and rewritten only when the stored bytes
    /// differ, so re-serializing an unchanged record issues no writes.
    pub fn serialize<R, S>(
        &self,
        namespace: &str,
        name: &str,
        record: &R,
        state: &mut S,
    ) -> Result<(), SerializerError>
    where
        R: StateRecord,
        S: ReadWritableState + ?Sized,
    {
        for (key, bytes) in Self::encoded_entries(namespace, name, record) {
            let existing = state.get_state(&key).map_err(|e| SerializerError::Read {
                key: key.clone(),
                source: e,
            })?;
            if existing.as_deref() == Some(bytes.as_slice()) {
                continue;
            }
            state
                .put_state(&key, bytes)
                .map_err(SerializerError::Write)?;
        }
        Ok(())
    }

    /// Reconstruct a record of type `R` from the entries listed in its
    /// envelope. Fields absent from the envelope keep their zero value.
    pub fn deserialize<R, S>(
        &self,
        namespace: &str,
        name: &str,
        metadata: &StateMetadata,
        state: &S,
    ) -> Result<R, SerializerError>
    where
        R: StateRecord,
        S: ReadableState + ?Sized,
    {
        if metadata.datatype != R::type_name() {
            return Err(SerializerError::TypeMismatch {
                expected: R::type_name(),
                actual: metadata.datatype.clone(),
            });
        }
        let mut record = R::default();
        for field in &metadata.fields {
            let key = format!("{namespace}/fields/{name}/{}", field.name);
            let bytes = state
                .get_state(&key)
                .map_err(|e| SerializerError::Read {
                    key: key.clone(),
                    source: e,
                })?
                .unwrap_or_default();
            let kind = FieldKind::try_from(field.kind).unwrap_or(FieldKind::Unspecified);
            StateData::decode(bytes.as_slice())
                .map_err(RecordError::from)
                .and_then(|data| FieldValue::from_state_data(kind, data))
                .and_then(|value| record.apply(&field.name, value))
                .map_err(|e| SerializerError::FieldDecode { key, source: e })?;
        }
        Ok(record)
    }

    /// Fetch the type envelope for `namespace`/`name`, or `None` when the
    /// record does not exist.
    pub fn deserialize_metadata<S>(
        &self,
        namespace: &str,
        name: &str,
        state: &S,
    ) -> Result<Option<StateMetadata>, SerializerError>
    where
        S: ReadableState + ?Sized,
    {
        let key = format!("{namespace}/metadata/{name}");
        let bytes = state
            .get_state(&key)
            .map_err(|e| SerializerError::MetadataRead {
                namespace: format!("{namespace}/{name}"),
                source: e,
            })?;
        match bytes {
            None => Ok(None),
            Some(bytes) => StateMetadata::decode(bytes.as_slice()).map(Some).map_err(|e| {
                SerializerError::MetadataDecode {
                    namespace: format!("{namespace}/{name}"),
                    source: e,
                }
            }),
        }
    }

    /// Fetch every type envelope under `namespace`, keyed by bare record key.
    pub fn deserialize_all_metadata<S>(
        &self,
        namespace: &str,
        state: &S,
    ) -> Result<HashMap<String, StateMetadata>, SerializerError>
    where
        S: RangeableState + ?Sized,
    {
        let prefix = format!("{namespace}/metadata/");
        let entries = state
            .get_state_range(&prefix)
            .map_err(|e| SerializerError::RangeRead {
                namespace: namespace.to_string(),
                source: e,
            })?;
        let mut result = HashMap::with_capacity(entries.len());
        for (key, bytes) in entries {
            let name = key.strip_prefix(&prefix).unwrap_or(key.as_str()).to_string();
            let metadata = StateMetadata::decode(bytes.as_slice()).map_err(|e| {
                SerializerError::MetadataDecode {
                    namespace: format!("{namespace}/{name}"),
                    source: e,
                }
            })?;
            result.insert(name, metadata);
        }
        Ok(result)
    }

    fn deserialize_field<S>(
        &self,
        namespace: &str,
        name: &str,
        field: &str,
        state: &S,
    ) -> Result<(String, Option<state_data::Value>), SerializerError>
    where
        S: ReadableState + ?Sized,
    {
        let key = format!("{namespace}/fields/{name}/{field}");
        let bytes = state.get_state(&key).map_err(|e| SerializerError::Read {
            key: key.clone(),
            source: e,
        })?;
        match bytes {
            None => Ok((key, None)),
            Some(bytes) => {
                let data = StateData::decode(bytes.as_slice()).map_err(|e| {
                    SerializerError::FieldDecode {
                        key: key.clone(),
                        source: RecordError::Decode(e),
                    }
                })?;
                Ok((key, data.value))
            }
        }
    }

    /// Targeted partial read of one int64 field; absent reads as 0.
    pub fn deserialize_field_as_int64<S>(
        &self,
        namespace: &str,
        name: &str,
        field: &str,
        state: &S,
    ) -> Result<i64, SerializerError>
    where
        S: ReadableState + ?Sized,
    {
        let (key, value) = self.deserialize_field(namespace, name, field, state)?;
        match value {
            None => Ok(0),
            Some(state_data::Value::Int64(v)) => Ok(v),
            Some(_) => Err(SerializerError::FieldDecode {
                key,
                source: RecordError::Kind(FieldKind::Int64),
            }),
        }
    }

    /// Targeted partial read of one string field; absent reads as "".
    pub fn deserialize_field_as_string<S>(
        &self,
        namespace: &str,
        name: &str,
        field: &str,
        state: &S,
    ) -> Result<String, SerializerError>
    where
        S: ReadableState + ?Sized,
    {
        let (key, value) = self.deserialize_field(namespace, name, field, state)?;
        match value {
            None => Ok(String::new()),
            Some(state_data::Value::String(s)) => Ok(s),
            Some(_) => Err(SerializerError::FieldDecode {
                key,
                source: RecordError::Kind(FieldKind::String),
            }),
        }
    }

    /// Targeted partial read of one bytes field; absent reads as empty.
    pub fn deserialize_field_as_bytes<S>(
        &self,
        namespace: &str,
        name: &str,
        field: &str,
        state: &S,
    ) -> Result<Vec<u8>, SerializerError>
    where
        S: ReadableState + ?Sized,
    {
        let (key, value) = self.deserialize_field(namespace, name, field, state)?;
        match value {
            None => Ok(Vec::new()),
            Some(state_data::Value::Bytes(b)) => Ok(b),
            Some(_) => Err(SerializerError::FieldDecode {
                key,
                source: RecordError::Kind(FieldKind::Bytes),
            }),
        }
    }

    /// Decide, by digest alone, whether a private partition holds exactly the
    /// serialization of `record` under `namespace`/`name`.
    ///
    /// True exactly when every entry `serialize` would produce (envelope
    /// included) hashes to the partition's stored digest for that key. The
    /// envelope pins the record type and field set, so a partition holding a
    /// different field set can never compare equal.
    pub fn is_serialized<R, S>(
        &self,
        namespace: &str,
        name: &str,
        record: &R,
        state: &S,
    ) -> Result<bool, SerializerError>
    where
        R: StateRecord,
        S: OpaqueState + ?Sized,
    {
        for (key, bytes) in Self::encoded_entries(namespace, name, record) {
            let stored = state
                .get_state_hash(&key)
                .map_err(|e| SerializerError::HashRead {
                    key: key.clone(),
                    source: e,
                })?;
            if stored.as_deref() != Some(value_hash(&bytes).as_slice()) {
                return Ok(false);
            }
        }
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chaincode::{ChaincodeDefinition, ChaincodeParameters};
    use crate::proto::{ChaincodeEndorsementInfo, ChaincodeValidationInfo};
    use concord_mockstate::{FakeState, MapLedgerShim};

    fn sample_definition() -> ChaincodeDefinition {
        ChaincodeDefinition {
            sequence: 4,
            endorsement_info: ChaincodeEndorsementInfo {
                version: "version".to_string(),
                endorsement_plugin: "endorsement-plugin".to_string(),
                init_required: false,
            },
            validation_info: ChaincodeValidationInfo {
                validation_plugin: "validation-plugin".to_string(),
                validation_parameter: b"validation-parameter".to_vec(),
            },
            collections: Default::default(),
        }
    }

    #[test]
    fn round_trips_a_full_record() {
        let serializer = Serializer;
        let mut state = MapLedgerShim::default();
        let def = sample_definition();

        serializer
            .serialize("namespaces", "cc-name", &def, &mut state)
            .unwrap();

        let metadata = serializer
            .deserialize_metadata("namespaces", "cc-name", &state)
            .unwrap()
            .expect("metadata should exist");
        assert_eq!(metadata.datatype, "ChaincodeDefinition");

        let restored: ChaincodeDefinition = serializer
            .deserialize("namespaces", "cc-name", &metadata, &state)
            .unwrap();
        assert_eq!(restored, def);
    }

    #[test]
    fn zero_fields_are_omitted_and_restored_as_zero() {
        let serializer = Serializer;
        let mut state = MapLedgerShim::default();

        serializer
            .serialize(
                "namespaces",
                "cc-name",
                &ChaincodeDefinition::default(),
                &mut state,
            )
            .unwrap();

        // Only the envelope is written; every field of the record is zero.
        assert_eq!(state.keys(), vec!["namespaces/metadata/cc-name"]);

        let metadata = serializer
            .deserialize_metadata("namespaces", "cc-name", &state)
            .unwrap()
            .unwrap();
        assert!(metadata.fields.is_empty());

        let restored: ChaincodeDefinition = serializer
            .deserialize("namespaces", "cc-name", &metadata, &state)
            .unwrap();
        assert_eq!(restored, ChaincodeDefinition::default());
    }

    #[test]
    fn unchanged_record_issues_no_writes() {
        let serializer = Serializer;
        let mut state = FakeState::default();
        let def = sample_definition();

        serializer
            .serialize("namespaces", "cc-name", &def, &mut state)
            .unwrap();
        let puts = state.put_call_count();
        assert!(puts > 0);

        serializer
            .serialize("namespaces", "cc-name", &def, &mut state)
            .unwrap();
        assert_eq!(state.put_call_count(), puts);
    }

    #[test]
    fn single_field_change_rewrites_only_that_entry() {
        let serializer = Serializer;
        let mut state = FakeState::default();
        let mut def = sample_definition();

        serializer
            .serialize("namespaces", "cc-name", &def, &mut state)
            .unwrap();
        let puts = state.put_call_count();

        // Same field set, so the envelope is unchanged; only the one field
        // entry is rewritten.
        def.endorsement_info.version = "v2".to_string();
        serializer
            .serialize("namespaces", "cc-name", &def, &mut state)
            .unwrap();
        assert_eq!(state.put_call_count(), puts + 1);
    }

    #[test]
    fn deserialize_rejects_type_mismatch() {
        let serializer = Serializer;
        let mut state = MapLedgerShim::default();

        serializer
            .serialize(
                "namespaces",
                "cc-name",
                &ChaincodeParameters::default(),
                &mut state,
            )
            .unwrap();
        let metadata = serializer
            .deserialize_metadata("namespaces", "cc-name", &state)
            .unwrap()
            .unwrap();

        let err = serializer
            .deserialize::<ChaincodeDefinition, _>("namespaces", "cc-name", &metadata, &state)
            .unwrap_err();
        assert_eq!(
            err.to_string(),
            "type name mismatch 'ChaincodeDefinition' != 'ChaincodeParameters'"
        );
    }

    #[test]
    fn metadata_is_none_when_absent() {
        let serializer = Serializer;
        let state = MapLedgerShim::default();
        let metadata = serializer
            .deserialize_metadata("namespaces", "missing", &state)
            .unwrap();
        assert!(metadata.is_none());
    }

    #[test]
    fn metadata_read_failure_names_the_namespace() {
        let serializer = Serializer;
        let mut state = FakeState::default();
        state.fail_get = Some("state-error".to_string());

        let err = serializer
            .deserialize_metadata("namespaces", "cc-name", &state)
            .unwrap_err();
        assert_eq!(
            err.to_string(),
            "could not query metadata for namespace namespaces/cc-name: state-error"
        );
    }

    #[test]
    fn corrupt_metadata_fails_to_unmarshal() {
        let serializer = Serializer;
        let mut state = MapLedgerShim::default();
        state.put_state("namespaces/metadata/cc-name", b"garbage".to_vec()).unwrap();

        let err = serializer
            .deserialize_metadata("namespaces", "cc-name", &state)
            .unwrap_err();
        assert!(err
            .to_string()
            .starts_with("could not unmarshal metadata for namespace namespaces/cc-name:"));
    }

    #[test]
    fn partial_field_reads() {
        let serializer = Serializer;
        let mut state = MapLedgerShim::default();
        serializer
            .serialize("namespaces", "cc-name", &sample_definition(), &mut state)
            .unwrap();

        let sequence = serializer
            .deserialize_field_as_int64("namespaces", "cc-name", "Sequence", &state)
            .unwrap();
        assert_eq!(sequence, 4);

        // Absent fields read as the kind's zero value.
        let absent = serializer
            .deserialize_field_as_int64("namespaces", "other", "Sequence", &state)
            .unwrap();
        assert_eq!(absent, 0);
        let absent = serializer
            .deserialize_field_as_string("namespaces", "other", "Name", &state)
            .unwrap();
        assert_eq!(absent, "");
        let absent = serializer
            .deserialize_field_as_bytes("chaincode-sources", "other", "Hash", &state)
            .unwrap();
        assert!(absent.is_empty());
    }

    #[test]
    fn partial_field_read_rejects_wrong_kind() {
        let serializer = Serializer;
        let mut state = MapLedgerShim::default();
        serializer
            .serialize("namespaces", "cc-name", &sample_definition(), &mut state)
            .unwrap();

        // Sequence is an int64 entry; asking for a string must fail.
        let err = serializer
            .deserialize_field_as_string("namespaces", "cc-name", "Sequence", &state)
            .unwrap_err();
        assert_eq!(
            err.to_string(),
            "could not unmarshal state for key namespaces/fields/cc-name/Sequence: \
             value does not encode a field of kind String"
        );
    }

    #[test]
    fn read_failure_during_serialize_names_the_key() {
        let serializer = Serializer;
        let mut state = FakeState::default();
        state.fail_get = Some("get-state-error".to_string());

        let err = serializer
            .serialize("namespaces", "cc-name", &sample_definition(), &mut state)
            .unwrap_err();
        assert_eq!(
            err.to_string(),
            "could not get state for key namespaces/fields/cc-name/Sequence: get-state-error"
        );
    }

    #[test]
    fn write_failure_is_surfaced() {
        let serializer = Serializer;
        let mut state = FakeState::default();
        state.fail_put = Some("put-state-error".to_string());

        let err = serializer
            .serialize("namespaces", "cc-name", &sample_definition(), &mut state)
            .unwrap_err();
        assert_eq!(
            err.to_string(),
            "could not write key into state: put-state-error"
        );
    }

    #[test]
    fn is_serialized_matches_equal_records_only() {
        let serializer = Serializer;
        let mut state = MapLedgerShim::default();
        let params = sample_definition().parameters();

        serializer
            .serialize("namespaces", "cc-name#5", &params, &mut state)
            .unwrap();

        assert!(serializer
            .is_serialized("namespaces", "cc-name#5", &params, &state)
            .unwrap());

        let mut other = params.clone();
        other.endorsement_info.version = "other-version".to_string();
        assert!(!serializer
            .is_serialized("namespaces", "cc-name#5", &other, &state)
            .unwrap());

        // An empty partition matches nothing.
        let empty = MapLedgerShim::default();
        assert!(!serializer
            .is_serialized("namespaces", "cc-name#5", &params, &empty)
            .unwrap());
    }

    #[test]
    fn is_serialized_detects_field_set_differences() {
        let serializer = Serializer;
        let mut state = MapLedgerShim::default();

        // The stored record has one extra non-zero field relative to the
        // candidate; the envelopes differ, so the digests cannot all match.
        let mut stored = ChaincodeParameters::default();
        stored.endorsement_info.version = "version".to_string();
        serializer
            .serialize("namespaces", "cc-name#5", &stored, &mut state)
            .unwrap();

        assert!(!serializer
            .is_serialized(
                "namespaces",
                "cc-name#5",
                &ChaincodeParameters::default(),
                &state
            )
            .unwrap());
    }

    #[test]
    fn all_metadata_strips_the_prefix() {
        let serializer = Serializer;
        let mut state = MapLedgerShim::default();
        serializer
            .serialize("namespaces", "cc-name", &sample_definition(), &mut state)
            .unwrap();
        serializer
            .serialize(
                "namespaces",
                "other-name",
                &ChaincodeParameters::default(),
                &mut state,
            )
            .unwrap();

        let all = serializer
            .deserialize_all_metadata("namespaces", &state)
            .unwrap();
        assert_eq!(all.len(), 2);
        assert_eq!(all["cc-name"].datatype, "ChaincodeDefinition");
        assert_eq!(all["other-name"].datatype, "ChaincodeParameters");
    }

    #[test]
    fn range_failure_names_the_namespace() {
        let serializer = Serializer;
        let mut state = FakeState::default();
        state.fail_range = Some("state-range-error".to_string());

        let err = serializer
            .deserialize_all_metadata("namespaces", &state)
            .unwrap_err();
        assert_eq!(
            err.to_string(),
            "could not get state range for namespace namespaces: state-range-error"
        );
    }
}
