use std::fmt;
use std::net::{Ipv4Addr, SocketAddrV4};

/// PROXY protocol v2 signature (12 bytes)
pub const SIGNATURE: [u8; 12] = [
    0x0D, 0x0A, 0x0D, 0x0A, 0x00, 0x0D, 0x0A, 0x51, 0x55, 0x49, 0x54, 0x0A,
];

/// Version 2, PROXY command
pub const EXPECTED_VERSION_COMMAND: u8 = 0x21;

/// AF_INET, STREAM
pub const EXPECTED_FAMILY_PROTOCOL: u8 = 0x11;

/// 4 (src ip) + 4 (dst ip) + 2 (src port) + 2 (dst port)
pub const IPV4_ADDRESS_LENGTH: u16 = 12;

pub(super) const VERSION_COMMAND_OFFSET: usize = 12;
pub(super) const FAMILY_PROTOCOL_OFFSET: usize = 13;
pub(super) const ADDRESS_LENGTH_OFFSET: usize = 14;
pub(super) const ADDRESSES_OFFSET: usize = 16;
pub(super) const IPV4_HEADER_LEN: usize = ADDRESSES_OFFSET + IPV4_ADDRESS_LENGTH as usize;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Ipv4Addresses {
    pub source_ip: Ipv4Addr,
    pub dest_ip: Ipv4Addr,
    pub source_port: u16,
    pub dest_port: u16,
}

impl Ipv4Addresses {
    pub fn source(&self) -> SocketAddrV4 {
        SocketAddrV4::new(self.source_ip, self.source_port)
    }

    pub fn dest(&self) -> SocketAddrV4 {
        SocketAddrV4::new(self.dest_ip, self.dest_port)
    }
}

/// Fields read from the front of a connection. A field is `None` when the
/// buffer ended before it or decoding stopped at an earlier field.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Header {
    pub version_command: Option<u8>,
    pub family_protocol: Option<u8>,
    pub address_length: Option<u16>,
    pub addresses: Option<Ipv4Addresses>,
}

impl Header {
    pub fn version(&self) -> Option<u8> {
        self.version_command.map(|b| b >> 4)
    }

    pub fn command(&self) -> Option<u8> {
        self.version_command.map(|b| b & 0x0F)
    }

    pub fn address_family(&self) -> Option<u8> {
        self.family_protocol.map(|b| b >> 4)
    }

    pub fn transport(&self) -> Option<u8> {
        self.family_protocol.map(|b| b & 0x0F)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Check {
    Signature,
    VersionCommand,
    FamilyProtocol,
    AddressLength,
    Addresses,
    SourceIp,
}

impl fmt::Display for Check {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Check::Signature => "signature",
            Check::VersionCommand => "version/command",
            Check::FamilyProtocol => "family/protocol",
            Check::AddressLength => "address length",
            Check::Addresses => "addresses",
            Check::SourceIp => "source ip",
        };
        f.write_str(name)
    }
}

/// One validation outcome for one checked field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Finding {
    Ok(Check),
    /// Carries at most the first 12 received bytes.
    SignatureMismatch {
        received: Vec<u8>,
    },
    Truncated {
        check: Check,
        needed: usize,
        available: usize,
    },
    UnexpectedVersionCommand(u8),
    UnexpectedFamilyProtocol(u8),
    /// No IPv4/TCP address block to parse.
    UnsupportedAddressFamily {
        family_protocol: u8,
        address_length: u16,
    },
    SourceIpMismatch {
        expected: Ipv4Addr,
        actual: Ipv4Addr,
    },
}

impl Finding {
    pub fn is_ok(&self) -> bool {
        matches!(self, Finding::Ok(_))
    }
}

impl fmt::Display for Finding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Finding::Ok(Check::Signature) => write!(f, "PROXY protocol v2 signature matched"),
            Finding::Ok(Check::VersionCommand) => write!(f, "version 2, PROXY command"),
            Finding::Ok(Check::FamilyProtocol) => write!(f, "AF_INET (IPv4), STREAM (TCP)"),
            Finding::Ok(Check::AddressLength) => write!(f, "address length {}", IPV4_ADDRESS_LENGTH),
            Finding::Ok(Check::Addresses) => write!(f, "IPv4 address block parsed"),
            Finding::Ok(Check::SourceIp) => write!(f, "source ip is correct"),
            Finding::SignatureMismatch { received } => {
                write!(f, "PROXY protocol v2 signature did not match, received: ")?;
                for b in received {
                    write!(f, "{:02x}", b)?;
                }
                Ok(())
            }
            Finding::Truncated {
                check,
                needed,
                available,
            } => write!(
                f,
                "truncated before {}: need {} bytes, have {}",
                check, needed, available
            ),
            Finding::UnexpectedVersionCommand(v) => {
                write!(f, "unexpected version/command: {:#04x}", v)
            }
            Finding::UnexpectedFamilyProtocol(v) => {
                write!(f, "unexpected family/protocol: {:#04x}", v)
            }
            Finding::UnsupportedAddressFamily {
                family_protocol,
                address_length,
            } => write!(
                f,
                "unsupported address block: family/protocol {:#04x}, length {}",
                family_protocol, address_length
            ),
            Finding::SourceIpMismatch { expected, actual } => {
                write!(f, "source ip mismatch: expected {}, got {}", expected, actual)
            }
        }
    }
}

/// Output of [`decode`](super::decode): every field that could be read, and
/// one finding per check performed, in order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Decoded {
    pub header: Header,
    pub findings: Vec<Finding>,
    pub bytes_len: usize,
}

impl Decoded {
    pub fn is_clean(&self) -> bool {
        self.findings.iter().all(Finding::is_ok)
    }

    /// Appends a source ip finding against `expected`. Nothing is appended
    /// after a signature mismatch; a v2 header without a parsed address
    /// block gets a `Truncated` finding.
    pub fn check_source_ip(&mut self, expected: Ipv4Addr) {
        if !matches!(self.findings.first(), Some(Finding::Ok(Check::Signature))) {
            return;
        }
        let finding = match self.header.addresses {
            Some(addrs) if addrs.source_ip == expected => Finding::Ok(Check::SourceIp),
            Some(addrs) => Finding::SourceIpMismatch {
                expected,
                actual: addrs.source_ip,
            },
            None => Finding::Truncated {
                check: Check::SourceIp,
                needed: IPV4_HEADER_LEN,
                available: self.bytes_len,
            },
        };
        self.findings.push(finding);
    }
}
