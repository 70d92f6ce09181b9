//! Concord Model
//!
//! Pure data types and traits for the concord chaincode lifecycle core,
//! decoupled from any concrete ledger, package store, or peer runtime.
//!
//! The lifecycle core is stateless and transaction-scoped: every operation
//! receives the ledger capabilities it needs as trait objects or generics
//! declared here, so the core can run against the real peer ledger in
//! production and against in-memory doubles in tests.

pub mod chaincode;
pub mod collaborators;
pub mod state;

pub use chaincode::{ChaincodePackage, ChaincodePackageMetadata, InstalledChaincode};
pub use collaborators::{ChaincodeStore, CollaboratorError, InstallListener, PackageParser};
pub use state::{
    value_hash, OpaqueState, RangeableState, ReadWritableState, ReadableState, StateError,
};
