//! Wire messages persisted into the ledger.
//!
//! Declared by hand with explicit tags rather than generated from a schema
//! file; the tags are the on-disk contract and must never be renumbered.
//! prost encodes fields in ascending tag order, which gives every message a
//! single canonical byte form. Cross-organization digest comparison depends
//! on that.

/// Kind tag carried for each field in a [`StateMetadata`] envelope.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, ::prost::Enumeration)]
#[repr(i32)]
pub enum FieldKind {
    Unspecified = 0,
    Int64 = 1,
    String = 2,
    Bytes = 3,
    Message = 4,
}

/// Type envelope stored at `<namespace>/metadata/<key>`.
///
/// `fields` lists exactly the fields that were serialized (zero-valued fields
/// are omitted), in the record's declaration order.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct StateMetadata {
    #[prost(string, tag = "1")]
    pub datatype: ::prost::alloc::string::String,
    #[prost(message, repeated, tag = "2")]
    pub fields: ::prost::alloc::vec::Vec<StateField>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct StateField {
    #[prost(string, tag = "1")]
    pub name: ::prost::alloc::string::String,
    #[prost(enumeration = "FieldKind", tag = "2")]
    pub kind: i32,
}

/// One stored field value, at `<namespace>/fields/<key>/<FieldName>`.
///
/// Message-kind fields travel as the `bytes` variant carrying the nested
/// message's canonical encoding; the kind distinction lives in the envelope.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct StateData {
    #[prost(oneof = "state_data::Value", tags = "1, 2, 3")]
    pub value: ::core::option::Option<state_data::Value>,
}

pub mod state_data {
    #[derive(Clone, PartialEq, ::prost::Oneof)]
    pub enum Value {
        #[prost(int64, tag = "1")]
        Int64(i64),
        #[prost(bytes, tag = "2")]
        Bytes(::prost::alloc::vec::Vec<u8>),
        #[prost(string, tag = "3")]
        String(::prost::alloc::string::String),
    }
}

/// How a chaincode is endorsed: its version, the endorsement plugin that
/// validates proposal responses, and whether it requires initialization
/// before first use.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct ChaincodeEndorsementInfo {
    #[prost(string, tag = "1")]
    pub version: ::prost::alloc::string::String,
    #[prost(string, tag = "2")]
    pub endorsement_plugin: ::prost::alloc::string::String,
    #[prost(bool, tag = "3")]
    pub init_required: bool,
}

/// How committed transactions against the chaincode are validated.
///
/// The parameter bytes are opaque to the core; later layers interpret them.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct ChaincodeValidationInfo {
    #[prost(string, tag = "1")]
    pub validation_plugin: ::prost::alloc::string::String,
    #[prost(bytes = "vec", tag = "2")]
    pub validation_parameter: ::prost::alloc::vec::Vec<u8>,
}

/// Private data collection configuration, possibly empty.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct CollectionConfigPackage {
    #[prost(message, repeated, tag = "1")]
    pub config: ::prost::alloc::vec::Vec<CollectionConfig>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct CollectionConfig {
    #[prost(string, tag = "1")]
    pub name: ::prost::alloc::string::String,
    #[prost(int32, tag = "2")]
    pub required_peer_count: i32,
    #[prost(int32, tag = "3")]
    pub maximum_peer_count: i32,
    #[prost(uint64, tag = "4")]
    pub block_to_live: u64,
    #[prost(bytes = "vec", tag = "5")]
    pub member_orgs_policy: ::prost::alloc::vec::Vec<u8>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use prost::Message;

    #[test]
    fn default_messages_encode_to_nothing() {
        assert!(ChaincodeEndorsementInfo::default().encode_to_vec().is_empty());
        assert!(CollectionConfigPackage::default().encode_to_vec().is_empty());
    }

    #[test]
    fn encoding_is_canonical() {
        let a = ChaincodeEndorsementInfo {
            version: "v1".to_string(),
            endorsement_plugin: "escc".to_string(),
            init_required: true,
        };
        let b = a.clone();
        assert_eq!(a.encode_to_vec(), b.encode_to_vec());

        let decoded = ChaincodeEndorsementInfo::decode(a.encode_to_vec().as_slice()).unwrap();
        assert_eq!(decoded, a);
    }
}
