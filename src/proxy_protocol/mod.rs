//! PROXY protocol v2 header decoding.
//!
//! Only the validation side lives here: bytes come from whatever the service
//! under test sent us, and every check performed on them is reported back as
//! a [`Finding`]. Reference: https://www.haproxy.org/download/1.8/doc/proxy-protocol.txt

mod decoder;
mod header;

pub use decoder::decode;
pub use header::{
    Check, Decoded, EXPECTED_FAMILY_PROTOCOL, EXPECTED_VERSION_COMMAND, Finding, Header,
    IPV4_ADDRESS_LENGTH, Ipv4Addresses, SIGNATURE,
};
