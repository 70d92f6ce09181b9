//! concord-lifecycle - chaincode lifecycle core
//!
//! Governs how named, versioned chaincodes are installed on a peer, approved
//! per organization, and committed to the ledger as the active definition for
//! a namespace:
//!
//! - `serializer` flattens typed records into key-value entries with a
//!   canonical encoding, so private-partition digests are comparable across
//!   organizations.
//! - `chaincode` declares the persisted record types and the parameter
//!   comparison used at re-approval.
//! - `lifecycle` holds the sequence-numbered approve/commit state machine,
//!   the install pipeline, and the read-side queries.
//!
//! The crate is stateless and transaction-scoped: ledger partitions and
//! collaborators arrive through the traits in `concord-model`.

pub mod chaincode;
pub mod lifecycle;
pub mod proto;
pub mod serializer;

pub use chaincode::{
    ChaincodeDefinition, ChaincodeLocalPackage, ChaincodeParameters, ParameterMismatch,
};
pub use lifecycle::{
    ExternalFunctions, LifecycleError, Resources, CHAINCODE_SOURCES_NAME,
    FRIENDLY_CHAINCODE_DEFINITION_TYPE, LIFECYCLE_NAMESPACE, NAMESPACES_NAME,
};
pub use serializer::{FieldValue, RecordError, Serializer, SerializerError, StateRecord};
