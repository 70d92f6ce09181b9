use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::rc::Rc;

use concord_model::{
    ChaincodePackage, ChaincodePackageMetadata, ChaincodeStore, CollaboratorError,
    InstallListener, InstalledChaincode, OpaqueState, PackageParser, RangeableState,
    ReadWritableState, ReadableState, StateError,
};

use crate::map_state::MapLedgerShim;

/// A `MapLedgerShim` with scripted failures and call counting.
///
/// Failure fields are plain options so tests set exactly what they need;
/// `fail_put_on_call` fires on the zero-based nth put and lets earlier writes
/// through.
#[derive(Debug, Default)]
pub struct FakeState {
    pub state: MapLedgerShim,
    pub fail_get: Option<String>,
    pub fail_put: Option<String>,
    pub fail_put_on_call: Option<(usize, String)>,
    pub fail_range: Option<String>,
    pub fail_hash: Option<String>,
    get_calls: Cell<usize>,
    put_calls: Cell<usize>,
    range_calls: Cell<usize>,
    hash_calls: Cell<usize>,
}

impl FakeState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get_call_count(&self) -> usize {
        self.get_calls.get()
    }

    pub fn put_call_count(&self) -> usize {
        self.put_calls.get()
    }

    pub fn range_call_count(&self) -> usize {
        self.range_calls.get()
    }

    pub fn hash_call_count(&self) -> usize {
        self.hash_calls.get()
    }
}

impl ReadableState for FakeState {
    fn get_state(&self, key: &str) -> Result<Option<Vec<u8>>, StateError> {
        self.get_calls.set(self.get_calls.get() + 1);
        if let Some(msg) = &self.fail_get {
            return Err(StateError::from(msg.as_str()));
        }
        self.state.get_state(key)
    }
}

impl ReadWritableState for FakeState {
    fn put_state(&mut self, key: &str, value: Vec<u8>) -> Result<(), StateError> {
        let call = self.put_calls.get();
        self.put_calls.set(call + 1);
        if let Some((failing_call, msg)) = &self.fail_put_on_call {
            if *failing_call == call {
                return Err(StateError::from(msg.as_str()));
            }
        }
        if let Some(msg) = &self.fail_put {
            return Err(StateError::from(msg.as_str()));
        }
        self.state.put_state(key, value)
    }
}

impl RangeableState for FakeState {
    fn get_state_range(&self, prefix: &str) -> Result<HashMap<String, Vec<u8>>, StateError> {
        self.range_calls.set(self.range_calls.get() + 1);
        if let Some(msg) = &self.fail_range {
            return Err(StateError::from(msg.as_str()));
        }
        self.state.get_state_range(prefix)
    }
}

impl OpaqueState for FakeState {
    fn get_state_hash(&self, key: &str) -> Result<Option<Vec<u8>>, StateError> {
        self.hash_calls.set(self.hash_calls.get() + 1);
        if let Some(msg) = &self.fail_hash {
            return Err(StateError::from(msg.as_str()));
        }
        self.state.get_state_hash(key)
    }
}

/// Package parser double: returns the configured package, or the configured
/// error, and records every payload it was handed.
#[derive(Debug, Default)]
pub struct FakePackageParser {
    pub package: ChaincodePackage,
    pub error: Option<String>,
    pub calls: RefCell<Vec<Vec<u8>>>,
}

impl FakePackageParser {
    pub fn parse_call_count(&self) -> usize {
        self.calls.borrow().len()
    }

    pub fn parse_args_for_call(&self, call: usize) -> Vec<u8> {
        self.calls.borrow()[call].clone()
    }
}

impl PackageParser for FakePackageParser {
    fn parse(&self, data: &[u8]) -> Result<ChaincodePackage, CollaboratorError> {
        self.calls.borrow_mut().push(data.to_vec());
        if let Some(error) = &self.error {
            return Err(error.clone().into());
        }
        Ok(self.package.clone())
    }
}

/// Chaincode store double with per-operation scripted errors.
#[derive(Debug, Default)]
pub struct FakeChaincodeStore {
    pub hash: Vec<u8>,
    pub installed: Vec<InstalledChaincode>,
    pub save_error: Option<String>,
    pub retrieve_error: Option<String>,
    pub list_error: Option<String>,
    pub save_calls: RefCell<Vec<(String, String, Vec<u8>)>>,
    pub retrieve_calls: RefCell<Vec<(String, String)>>,
}

impl FakeChaincodeStore {
    pub fn save_call_count(&self) -> usize {
        self.save_calls.borrow().len()
    }

    pub fn save_args_for_call(&self, call: usize) -> (String, String, Vec<u8>) {
        self.save_calls.borrow()[call].clone()
    }

    pub fn retrieve_call_count(&self) -> usize {
        self.retrieve_calls.borrow().len()
    }

    pub fn retrieve_args_for_call(&self, call: usize) -> (String, String) {
        self.retrieve_calls.borrow()[call].clone()
    }
}

impl ChaincodeStore for FakeChaincodeStore {
    fn save(&self, name: &str, version: &str, package: &[u8]) -> Result<Vec<u8>, CollaboratorError> {
        self.save_calls
            .borrow_mut()
            .push((name.to_string(), version.to_string(), package.to_vec()));
        if let Some(error) = &self.save_error {
            return Err(error.clone().into());
        }
        Ok(self.hash.clone())
    }

    fn retrieve_hash(&self, name: &str, version: &str) -> Result<Vec<u8>, CollaboratorError> {
        self.retrieve_calls
            .borrow_mut()
            .push((name.to_string(), version.to_string()));
        if let Some(error) = &self.retrieve_error {
            return Err(error.clone().into());
        }
        Ok(self.hash.clone())
    }

    fn list_installed_chaincodes(&self) -> Result<Vec<InstalledChaincode>, CollaboratorError> {
        if let Some(error) = &self.list_error {
            return Err(error.clone().into());
        }
        Ok(self.installed.clone())
    }
}

/// Install listener that records every notification.
///
/// Clones share the same event log, so a test can register one clone and
/// inspect the other after the install completes.
#[derive(Debug, Clone, Default)]
pub struct RecordingInstallListener {
    events: Rc<RefCell<Vec<(ChaincodePackageMetadata, Vec<u8>)>>>,
}

impl RecordingInstallListener {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<(ChaincodePackageMetadata, Vec<u8>)> {
        self.events.borrow().clone()
    }
}

impl InstallListener for RecordingInstallListener {
    fn handle_chaincode_installed(&self, metadata: &ChaincodePackageMetadata, hash: &[u8]) {
        self.events
            .borrow_mut()
            .push((metadata.clone(), hash.to_vec()));
    }
}
