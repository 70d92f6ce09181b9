//! Chaincode lifecycle records.
//!
//! Three record types are persisted through the serializer: the full
//! committed definition in the public partition, the per-org approved
//! parameters, and the per-org local package pin. Field names here are part
//! of the persisted key layout and must never change.

use prost::Message;
use thiserror::Error;

use crate::proto::{
    ChaincodeEndorsementInfo, ChaincodeValidationInfo, CollectionConfigPackage, FieldKind,
};
use crate::serializer::{FieldValue, RecordError, StateRecord};

/// The full published description of a chaincode at a namespace.
///
/// Only the latest committed value is retained publicly; its sequence is the
/// namespace's canonical current sequence.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ChaincodeDefinition {
    pub sequence: i64,
    pub endorsement_info: ChaincodeEndorsementInfo,
    pub validation_info: ChaincodeValidationInfo,
    pub collections: CollectionConfigPackage,
}

impl ChaincodeDefinition {
    /// The sequence-independent subset used for cross-org comparison.
    pub fn parameters(&self) -> ChaincodeParameters {
        ChaincodeParameters {
            endorsement_info: self.endorsement_info.clone(),
            validation_info: self.validation_info.clone(),
            collections: self.collections.clone(),
        }
    }
}

impl StateRecord for ChaincodeDefinition {
    fn type_name() -> &'static str {
        "ChaincodeDefinition"
    }

    fn fields(&self) -> Vec<(&'static str, FieldValue)> {
        vec![
            ("Sequence", FieldValue::Int64(self.sequence)),
            (
                "EndorsementInfo",
                FieldValue::Message(self.endorsement_info.encode_to_vec()),
            ),
            (
                "ValidationInfo",
                FieldValue::Message(self.validation_info.encode_to_vec()),
            ),
            (
                "Collections",
                FieldValue::Message(self.collections.encode_to_vec()),
            ),
        ]
    }

    fn apply(&mut self, name: &str, value: FieldValue) -> Result<(), RecordError> {
        match (name, value) {
            ("Sequence", FieldValue::Int64(v)) => self.sequence = v,
            ("EndorsementInfo", FieldValue::Message(b)) => {
                self.endorsement_info = ChaincodeEndorsementInfo::decode(b.as_slice())?;
            }
            ("ValidationInfo", FieldValue::Message(b)) => {
                self.validation_info = ChaincodeValidationInfo::decode(b.as_slice())?;
            }
            ("Collections", FieldValue::Message(b)) => {
                self.collections = CollectionConfigPackage::decode(b.as_slice())?;
            }
            ("Sequence", _) => return Err(RecordError::Kind(FieldKind::Int64)),
            ("EndorsementInfo" | "ValidationInfo" | "Collections", _) => {
                return Err(RecordError::Kind(FieldKind::Message));
            }
            (other, _) => return Err(RecordError::UnknownField(other.to_string())),
        }
        Ok(())
    }
}

/// A [`ChaincodeDefinition`] without its sequence.
///
/// Two organizations agree at a sequence when the parameters they approved
/// serialize to byte-identical entries.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ChaincodeParameters {
    pub endorsement_info: ChaincodeEndorsementInfo,
    pub validation_info: ChaincodeValidationInfo,
    pub collections: CollectionConfigPackage,
}

/// First differing field between two parameter sets, with both values.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParameterMismatch {
    #[error("Version '{0}' != '{1}'")]
    Version(String, String),
    #[error("InitRequired '{0}' != '{1}'")]
    InitRequired(bool, bool),
    #[error("EndorsementPlugin '{0}' != '{1}'")]
    EndorsementPlugin(String, String),
    #[error("ValidationPlugin '{0}' != '{1}'")]
    ValidationPlugin(String, String),
    #[error("ValidationParameter '{0}' != '{1}'")]
    ValidationParameter(String, String),
    #[error("Collections do not match")]
    Collections,
}

impl ChaincodeParameters {
    /// Compare field by field, reporting the first difference.
    ///
    /// Byte-valued differences are reported hex-encoded; collections are
    /// compared by canonical serialization and reported without detail.
    pub fn equal(&self, other: &ChaincodeParameters) -> Result<(), ParameterMismatch> {
        if self.endorsement_info.version != other.endorsement_info.version {
            return Err(ParameterMismatch::Version(
                self.endorsement_info.version.clone(),
                other.endorsement_info.version.clone(),
            ));
        }
        if self.endorsement_info.init_required != other.endorsement_info.init_required {
            return Err(ParameterMismatch::InitRequired(
                self.endorsement_info.init_required,
                other.endorsement_info.init_required,
            ));
        }
        if self.endorsement_info.endorsement_plugin != other.endorsement_info.endorsement_plugin {
            return Err(ParameterMismatch::EndorsementPlugin(
                self.endorsement_info.endorsement_plugin.clone(),
                other.endorsement_info.endorsement_plugin.clone(),
            ));
        }
        if self.validation_info.validation_plugin != other.validation_info.validation_plugin {
            return Err(ParameterMismatch::ValidationPlugin(
                self.validation_info.validation_plugin.clone(),
                other.validation_info.validation_plugin.clone(),
            ));
        }
        if self.validation_info.validation_parameter != other.validation_info.validation_parameter {
            return Err(ParameterMismatch::ValidationParameter(
                hex::encode(&self.validation_info.validation_parameter),
                hex::encode(&other.validation_info.validation_parameter),
            ));
        }
        if self.collections.encode_to_vec() != other.collections.encode_to_vec() {
            return Err(ParameterMismatch::Collections);
        }
        Ok(())
    }
}

impl StateRecord for ChaincodeParameters {
    fn type_name() -> &'static str {
        "ChaincodeParameters"
    }

    fn fields(&self) -> Vec<(&'static str, FieldValue)> {
        vec![
            (
                "EndorsementInfo",
                FieldValue::Message(self.endorsement_info.encode_to_vec()),
            ),
            (
                "ValidationInfo",
                FieldValue::Message(self.validation_info.encode_to_vec()),
            ),
            (
                "Collections",
                FieldValue::Message(self.collections.encode_to_vec()),
            ),
        ]
    }

    fn apply(&mut self, name: &str, value: FieldValue) -> Result<(), RecordError> {
        match (name, value) {
            ("EndorsementInfo", FieldValue::Message(b)) => {
                self.endorsement_info = ChaincodeEndorsementInfo::decode(b.as_slice())?;
            }
            ("ValidationInfo", FieldValue::Message(b)) => {
                self.validation_info = ChaincodeValidationInfo::decode(b.as_slice())?;
            }
            ("Collections", FieldValue::Message(b)) => {
                self.collections = CollectionConfigPackage::decode(b.as_slice())?;
            }
            ("EndorsementInfo" | "ValidationInfo" | "Collections", _) => {
                return Err(RecordError::Kind(FieldKind::Message));
            }
            (other, _) => return Err(RecordError::UnknownField(other.to_string())),
        }
        Ok(())
    }
}

/// Per-org, per-sequence pin of the package an organization intends to run.
///
/// Exactly one field, the store-assigned content hash; the sequence lives in
/// the record's key.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ChaincodeLocalPackage {
    pub hash: Vec<u8>,
}

impl StateRecord for ChaincodeLocalPackage {
    fn type_name() -> &'static str {
        "ChaincodeLocalPackage"
    }

    fn fields(&self) -> Vec<(&'static str, FieldValue)> {
        vec![("Hash", FieldValue::Bytes(self.hash.clone()))]
    }

    fn apply(&mut self, name: &str, value: FieldValue) -> Result<(), RecordError> {
        match (name, value) {
            ("Hash", FieldValue::Bytes(b)) => self.hash = b,
            ("Hash", _) => return Err(RecordError::Kind(FieldKind::Bytes)),
            (other, _) => return Err(RecordError::UnknownField(other.to_string())),
        }
        Ok(())
    }
}
