//! Mock ledger state and collaborator fakes for testing the lifecycle core
//! without a real peer.
//!
//! Provides:
//! - `MapLedgerShim`: a map-backed shim implementing all four state
//!   capabilities, with digests computed by the shared `value_hash`.
//! - `FakeState`: wraps a `MapLedgerShim` with scripted failures and call
//!   counting, for exercising error paths and read/write accounting.
//! - `FakePackageParser`, `FakeChaincodeStore`, `RecordingInstallListener`:
//!   collaborator doubles that record their invocations.

mod fakes;
mod map_state;

pub use fakes::{FakeChaincodeStore, FakePackageParser, FakeState, RecordingInstallListener};
pub use map_state::MapLedgerShim;
