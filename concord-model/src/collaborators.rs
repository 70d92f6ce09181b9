//! External collaborator contracts.
//!
//! The package archive format, the on-disk package store, and any subsystems
//! interested in installs live outside the core. They stay injectable so the
//! core can be exercised against in-memory doubles.

use crate::chaincode::{ChaincodePackage, ChaincodePackageMetadata, InstalledChaincode};

/// Boxed error used at the collaborator boundary.
///
/// Collaborators are foreign implementations with their own error types; the
/// core wraps whatever they surface with operation context.
pub type CollaboratorError = Box<dyn std::error::Error + Send + Sync>;

/// Parses an opaque code package archive into metadata plus content.
pub trait PackageParser {
    fn parse(&self, data: &[u8]) -> Result<ChaincodePackage, CollaboratorError>;
}

/// Persists install packages and reports what is installed.
pub trait ChaincodeStore {
    /// Save the package bytes under `(name, version)` and return the content
    /// hash the store assigned to them.
    fn save(&self, name: &str, version: &str, package: &[u8]) -> Result<Vec<u8>, CollaboratorError>;

    /// Return the content hash previously assigned to `(name, version)`.
    fn retrieve_hash(&self, name: &str, version: &str) -> Result<Vec<u8>, CollaboratorError>;

    /// Enumerate every installed package.
    ///
    /// On error the enumeration is discarded wholesale; callers must not act
    /// on a partial listing.
    fn list_installed_chaincodes(&self) -> Result<Vec<InstalledChaincode>, CollaboratorError>;
}

/// Observer of completed installs.
///
/// Listeners are notified after the package has been parsed and saved. They
/// are infallible by signature: an install is already complete when they run,
/// so there is nothing for them to veto.
pub trait InstallListener {
    fn handle_chaincode_installed(&self, metadata: &ChaincodePackageMetadata, hash: &[u8]);
}
