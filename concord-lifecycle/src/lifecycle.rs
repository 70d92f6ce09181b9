//! The lifecycle state machine: install, per-org approve, commit, and the
//! read-side queries.
//!
//! The core is invoked serially per transaction by the host ledger and holds
//! no state of its own; every operation receives the ledger partitions it
//! touches as capability traits. Concurrent writers are reconciled by the
//! host's MVCC; a lost commit race surfaces as a transaction rejection
//! outside this crate, never inside it.

use std::collections::HashMap;

use concord_model::{
    ChaincodeStore, CollaboratorError, InstallListener, OpaqueState, PackageParser,
    RangeableState, ReadWritableState, ReadableState, InstalledChaincode,
};
use thiserror::Error;

use crate::chaincode::{
    ChaincodeDefinition, ChaincodeLocalPackage, ChaincodeParameters, ParameterMismatch,
};
use crate::serializer::{Serializer, SerializerError, StateRecord};

/// Namespace for committed definitions (public) and approved parameters
/// (private, keyed `<name>#<sequence>`).
pub const NAMESPACES_NAME: &str = "namespaces";

/// Namespace for per-org package pins (private, keyed `<name>#<sequence>`).
pub const CHAINCODE_SOURCES_NAME: &str = "chaincode-sources";

/// The lifecycle manager's own reserved namespace. Always defined, never
/// written to state.
pub const LIFECYCLE_NAMESPACE: &str = "_lifecycle";

/// Display name reported for committed definitions by the namespace query.
pub const FRIENDLY_CHAINCODE_DEFINITION_TYPE: &str = "Chaincode";

#[derive(Debug, Error)]
pub enum LifecycleError {
    #[error("could not parse as a chaincode install package: {0}")]
    ParsePackage(CollaboratorError),
    #[error("could not save cc install package: {0}")]
    SavePackage(CollaboratorError),
    #[error("could not retrieve hash for chaincode '{name}:{version}': {cause}")]
    RetrieveHash {
        name: String,
        version: String,
        cause: CollaboratorError,
    },
    #[error("{0}")]
    ListInstalled(CollaboratorError),
    #[error("could not get current sequence: {0}")]
    CurrentSequence(#[source] SerializerError),
    #[error("requested sequence is 0, but first definable sequence number is 1")]
    SequenceZero,
    #[error("currently defined sequence {current} is larger than requested sequence {requested}")]
    SequenceExpired { current: i64, requested: i64 },
    #[error("requested sequence {requested} is larger than the next available sequence number {next}")]
    SequenceDistant { requested: i64, next: i64 },
    #[error("missing metadata for currently committed sequence number ({0})")]
    MissingCurrentMetadata(i64),
    #[error("could not fetch metadata for current definition: {0}")]
    CurrentMetadata(#[source] SerializerError),
    #[error("attempted to define the current sequence ({sequence}) for namespace {namespace}, but: {source}")]
    CurrentSequenceMismatch {
        sequence: i64,
        namespace: String,
        source: ParameterMismatch,
    },
    #[error("could not serialize chaincode parameters to state: {0}")]
    SerializeParameters(#[source] SerializerError),
    #[error("could not serialize chaincode package info to state: {0}")]
    SerializePackageInfo(#[source] SerializerError),
    #[error("requested sequence is {requested}, but new definition must be sequence {required}")]
    CommitSequence { requested: i64, required: i64 },
    #[error("could not serialize chaincode definition: {0}")]
    SerializeDefinition(#[source] SerializerError),
    #[error("namespace {0} is not defined")]
    NotDefined(String),
    #[error("could not fetch metadata for namespace {namespace}: {source}")]
    FetchMetadata {
        namespace: String,
        source: SerializerError,
    },
    #[error("could not deserialize namespace {namespace} as chaincode: {source}")]
    DeserializeNamespace {
        namespace: String,
        source: SerializerError,
    },
    #[error("could not query namespace metadata: {0}")]
    QueryNamespaces(#[source] SerializerError),
    #[error("could not deserialize metadata for chaincode {name}: {source}")]
    DeserializeChaincodeMetadata {
        name: String,
        source: SerializerError,
    },
    #[error("could not deserialize chaincode definition for chaincode {name}: {source}")]
    DeserializeChaincodeDefinition {
        name: String,
        source: SerializerError,
    },
    #[error("not a chaincode type: {0}")]
    NotAChaincode(String),
}

/// Read-side facade over the public partition.
#[derive(Debug, Clone, Copy, Default)]
pub struct Resources {
    pub serializer: Serializer,
}

impl Resources {
    /// Decide whether `name` has a committed chaincode definition and return
    /// it.
    ///
    /// The reserved self-namespace short-circuits to a sentinel definition
    /// without touching state: the lifecycle manager is always defined.
    pub fn chaincode_definition_if_defined<S>(
        &self,
        name: &str,
        state: &S,
    ) -> Result<Option<ChaincodeDefinition>, LifecycleError>
    where
        S: ReadableState + ?Sized,
    {
        if name == LIFECYCLE_NAMESPACE {
            return Ok(Some(ChaincodeDefinition::default()));
        }
        let metadata = self
            .serializer
            .deserialize_metadata(NAMESPACES_NAME, name, state)
            .map_err(|e| LifecycleError::DeserializeChaincodeMetadata {
                name: name.to_string(),
                source: e,
            })?;
        let Some(metadata) = metadata else {
            return Ok(None);
        };
        if metadata.datatype != ChaincodeDefinition::type_name() {
            return Err(LifecycleError::NotAChaincode(metadata.datatype));
        }
        let definition = self
            .serializer
            .deserialize(NAMESPACES_NAME, name, &metadata, state)
            .map_err(|e| LifecycleError::DeserializeChaincodeDefinition {
                name: name.to_string(),
                source: e,
            })?;
        Ok(Some(definition))
    }
}

/// Write-side state machine and queries.
///
/// Holds the read facade plus the injected collaborators; ledger partitions
/// are passed per call so the whole object stays transaction-scoped.
pub struct ExternalFunctions {
    pub resources: Resources,
    pub package_parser: Box<dyn PackageParser>,
    pub chaincode_store: Box<dyn ChaincodeStore>,
    pub install_listeners: Vec<Box<dyn InstallListener>>,
}

impl ExternalFunctions {
    pub fn new(
        resources: Resources,
        package_parser: Box<dyn PackageParser>,
        chaincode_store: Box<dyn ChaincodeStore>,
    ) -> Self {
        Self {
            resources,
            package_parser,
            chaincode_store,
            install_listeners: Vec::new(),
        }
    }

    pub fn register_install_listener(&mut self, listener: Box<dyn InstallListener>) {
        self.install_listeners.push(listener);
    }

    /// Parse and persist an install package, returning the content hash the
    /// store assigned.
    ///
    /// Listeners observe a completed install; they cannot fail it.
    pub fn install_chaincode(
        &self,
        name: &str,
        version: &str,
        package: &[u8],
    ) -> Result<Vec<u8>, LifecycleError> {
        let parsed = self
            .package_parser
            .parse(package)
            .map_err(LifecycleError::ParsePackage)?;
        let hash = self
            .chaincode_store
            .save(name, version, package)
            .map_err(LifecycleError::SavePackage)?;
        for listener in &self.install_listeners {
            listener.handle_chaincode_installed(&parsed.metadata, &hash);
        }
        log::info!(
            "installed chaincode package {}:{} with hash {}",
            name,
            version,
            hex::encode(&hash)
        );
        Ok(hash)
    }

    /// Pass-through to the package store, with `name:version` context.
    pub fn query_installed_chaincode(
        &self,
        name: &str,
        version: &str,
    ) -> Result<Vec<u8>, LifecycleError> {
        self.chaincode_store
            .retrieve_hash(name, version)
            .map_err(|e| LifecycleError::RetrieveHash {
                name: name.to_string(),
                version: version.to_string(),
                cause: e,
            })
    }

    /// Pass-through listing of everything the package store holds.
    pub fn query_installed_chaincodes(&self) -> Result<Vec<InstalledChaincode>, LifecycleError> {
        self.chaincode_store
            .list_installed_chaincodes()
            .map_err(LifecycleError::ListInstalled)
    }

    /// Record this organization's approval of `cd` at its requested sequence.
    ///
    /// The requested sequence must be the current one (re-approval, only with
    /// parameters equal to the committed ones) or the immediately next one.
    /// On success the parameters and the package pin are written into the
    /// org's private partition under `<name>#<sequence>`.
    pub fn approve_chaincode_definition_for_org<P, O>(
        &self,
        name: &str,
        cd: &ChaincodeDefinition,
        package_hash: &[u8],
        public_state: &P,
        org_state: &mut O,
    ) -> Result<(), LifecycleError>
    where
        P: ReadableState + ?Sized,
        O: ReadWritableState + ?Sized,
    {
        let serializer = &self.resources.serializer;
        let current_sequence = serializer
            .deserialize_field_as_int64(NAMESPACES_NAME, name, "Sequence", public_state)
            .map_err(LifecycleError::CurrentSequence)?;
        let requested_sequence = cd.sequence;

        if requested_sequence == 0 && current_sequence == 0 {
            return Err(LifecycleError::SequenceZero);
        }
        if requested_sequence < current_sequence {
            return Err(LifecycleError::SequenceExpired {
                current: current_sequence,
                requested: requested_sequence,
            });
        }
        if requested_sequence > current_sequence + 1 {
            return Err(LifecycleError::SequenceDistant {
                requested: requested_sequence,
                next: current_sequence + 1,
            });
        }

        if requested_sequence == current_sequence {
            let metadata = serializer
                .deserialize_metadata(NAMESPACES_NAME, name, public_state)
                .map_err(LifecycleError::CurrentMetadata)?
                .ok_or(LifecycleError::MissingCurrentMetadata(requested_sequence))?;
            let defined: ChaincodeDefinition = serializer
                .deserialize(NAMESPACES_NAME, name, &metadata, public_state)
                .map_err(|e| LifecycleError::DeserializeNamespace {
                    namespace: name.to_string(),
                    source: e,
                })?;
            defined
                .parameters()
                .equal(&cd.parameters())
                .map_err(|e| LifecycleError::CurrentSequenceMismatch {
                    sequence: requested_sequence,
                    namespace: name.to_string(),
                    source: e,
                })?;
        }

        let private_name = format!("{name}#{requested_sequence}");
        serializer
            .serialize(NAMESPACES_NAME, &private_name, &cd.parameters(), org_state)
            .map_err(LifecycleError::SerializeParameters)?;
        serializer
            .serialize(
                CHAINCODE_SOURCES_NAME,
                &private_name,
                &ChaincodeLocalPackage {
                    hash: package_hash.to_vec(),
                },
                org_state,
            )
            .map_err(LifecycleError::SerializePackageInfo)?;
        log::debug!("approved chaincode {} at sequence {}", name, requested_sequence);
        Ok(())
    }

    /// Advance the namespace to the next sequence and report, per org,
    /// whether its approved parameters match this definition.
    ///
    /// Agreement is computed by digest comparison against each org's private
    /// partition; an unreadable partition counts as disagreement. The
    /// agreement vector is a report, not a gate: the commit is recorded
    /// regardless.
    pub fn commit_chaincode_definition<P>(
        &self,
        name: &str,
        cd: &ChaincodeDefinition,
        public_state: &mut P,
        org_states: &[&dyn OpaqueState],
    ) -> Result<Vec<bool>, LifecycleError>
    where
        P: ReadWritableState + ?Sized,
    {
        let serializer = &self.resources.serializer;
        let current_sequence = serializer
            .deserialize_field_as_int64(NAMESPACES_NAME, name, "Sequence", public_state)
            .map_err(LifecycleError::CurrentSequence)?;
        if cd.sequence != current_sequence + 1 {
            return Err(LifecycleError::CommitSequence {
                requested: cd.sequence,
                required: current_sequence + 1,
            });
        }

        let private_name = format!("{name}#{}", cd.sequence);
        let parameters = cd.parameters();
        let mut agreements = Vec::with_capacity(org_states.len());
        for org_state in org_states {
            let matched = match serializer.is_serialized(
                NAMESPACES_NAME,
                &private_name,
                &parameters,
                *org_state,
            ) {
                Ok(matched) => matched,
                Err(e) => {
                    log::warn!(
                        "could not compute agreement for chaincode {} at sequence {}: {}",
                        name,
                        cd.sequence,
                        e
                    );
                    false
                }
            };
            agreements.push(matched);
        }

        serializer
            .serialize(NAMESPACES_NAME, name, cd, public_state)
            .map_err(LifecycleError::SerializeDefinition)?;
        log::info!("committed definition of chaincode {} at sequence {}", name, cd.sequence);
        Ok(agreements)
    }

    /// Read the committed definition for `name` from the public partition.
    pub fn query_chaincode_definition<S>(
        &self,
        name: &str,
        public_state: &S,
    ) -> Result<ChaincodeDefinition, LifecycleError>
    where
        S: ReadableState + ?Sized,
    {
        let serializer = &self.resources.serializer;
        let metadata = serializer
            .deserialize_metadata(NAMESPACES_NAME, name, public_state)
            .map_err(|e| LifecycleError::FetchMetadata {
                namespace: name.to_string(),
                source: e,
            })?
            .ok_or_else(|| LifecycleError::NotDefined(name.to_string()))?;
        serializer
            .deserialize(NAMESPACES_NAME, name, &metadata, public_state)
            .map_err(|e| LifecycleError::DeserializeNamespace {
                namespace: name.to_string(),
                source: e,
            })
    }

    /// Enumerate every defined namespace with the display name of its record
    /// type. Committed definitions report as `Chaincode`; any other datatype
    /// is surfaced verbatim.
    pub fn query_namespace_definitions<S>(
        &self,
        public_state: &S,
    ) -> Result<HashMap<String, String>, LifecycleError>
    where
        S: RangeableState + ?Sized,
    {
        let metadatas = self
            .resources
            .serializer
            .deserialize_all_metadata(NAMESPACES_NAME, public_state)
            .map_err(LifecycleError::QueryNamespaces)?;
        let mut result = HashMap::with_capacity(metadatas.len());
        for (namespace, metadata) in metadatas {
            let display = if metadata.datatype == ChaincodeDefinition::type_name() {
                FRIENDLY_CHAINCODE_DEFINITION_TYPE.to_string()
            } else {
                metadata.datatype
            };
            result.insert(namespace, display);
        }
        Ok(result)
    }
}
