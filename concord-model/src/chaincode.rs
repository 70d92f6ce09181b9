//! Shared chaincode data types.

/// A chaincode package known to the local package store.
///
/// The `id` is the content hash assigned by the store at save time and is the
/// sole identifier used to retrieve the package bytes again.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct InstalledChaincode {
    pub name: String,
    pub version: String,
    pub id: Vec<u8>,
}

/// Metadata extracted from a code package at install time.
///
/// Surfaced to install listeners so downstream subsystems (e.g. a launcher)
/// can prepare a runtime for the package before it is ever invoked.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ChaincodePackageMetadata {
    pub package_type: String,
    pub path: String,
}

/// A parsed code package: the extracted metadata plus the opaque content.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ChaincodePackage {
    pub metadata: ChaincodePackageMetadata,
    pub code: Vec<u8>,
}
