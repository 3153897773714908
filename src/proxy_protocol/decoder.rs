use std::net::Ipv4Addr;

use super::header::{
    ADDRESS_LENGTH_OFFSET, ADDRESSES_OFFSET, Check, Decoded, EXPECTED_FAMILY_PROTOCOL,
    EXPECTED_VERSION_COMMAND, FAMILY_PROTOCOL_OFFSET, Finding, Header, IPV4_ADDRESS_LENGTH,
    IPV4_HEADER_LEN, Ipv4Addresses, SIGNATURE, VERSION_COMMAND_OFFSET,
};

/// Decodes a PROXY protocol v2 header from the front of `bytes`.
///
/// Never fails: a short or malformed buffer produces findings describing
/// what went wrong. Version/command and family/protocol mismatches are
/// recorded and decoding continues; a signature mismatch or a truncated
/// field ends decoding.
pub fn decode(bytes: &[u8]) -> Decoded {
    let mut header = Header::default();
    let mut findings = Vec::new();

    if bytes.len() < SIGNATURE.len() || bytes[..SIGNATURE.len()] != SIGNATURE {
        let shown = bytes.len().min(SIGNATURE.len());
        findings.push(Finding::SignatureMismatch {
            received: bytes[..shown].to_vec(),
        });
        return Decoded {
            header,
            findings,
            bytes_len: bytes.len(),
        };
    }
    findings.push(Finding::Ok(Check::Signature));

    let Some(&version_command) = bytes.get(VERSION_COMMAND_OFFSET) else {
        findings.push(truncated(Check::VersionCommand, VERSION_COMMAND_OFFSET + 1, bytes));
        return Decoded {
            header,
            findings,
            bytes_len: bytes.len(),
        };
    };
    header.version_command = Some(version_command);
    if version_command == EXPECTED_VERSION_COMMAND {
        findings.push(Finding::Ok(Check::VersionCommand));
    } else {
        findings.push(Finding::UnexpectedVersionCommand(version_command));
    }

    let Some(&family_protocol) = bytes.get(FAMILY_PROTOCOL_OFFSET) else {
        findings.push(truncated(Check::FamilyProtocol, FAMILY_PROTOCOL_OFFSET + 1, bytes));
        return Decoded {
            header,
            findings,
            bytes_len: bytes.len(),
        };
    };
    header.family_protocol = Some(family_protocol);
    if family_protocol == EXPECTED_FAMILY_PROTOCOL {
        findings.push(Finding::Ok(Check::FamilyProtocol));
    } else {
        findings.push(Finding::UnexpectedFamilyProtocol(family_protocol));
    }

    let Some(address_length) = read_u16(bytes, ADDRESS_LENGTH_OFFSET) else {
        findings.push(truncated(Check::AddressLength, ADDRESSES_OFFSET, bytes));
        return Decoded {
            header,
            findings,
            bytes_len: bytes.len(),
        };
    };
    header.address_length = Some(address_length);

    if family_protocol == EXPECTED_FAMILY_PROTOCOL && address_length == IPV4_ADDRESS_LENGTH {
        findings.push(Finding::Ok(Check::AddressLength));
    } else {
        findings.push(Finding::UnsupportedAddressFamily {
            family_protocol,
            address_length,
        });
        return Decoded {
            header,
            findings,
            bytes_len: bytes.len(),
        };
    }

    match read_ipv4_addresses(bytes) {
        Some(addresses) => {
            header.addresses = Some(addresses);
            findings.push(Finding::Ok(Check::Addresses));
        }
        None => findings.push(truncated(Check::Addresses, IPV4_HEADER_LEN, bytes)),
    }

    Decoded {
        header,
        findings,
        bytes_len: bytes.len(),
    }
}

fn truncated(check: Check, needed: usize, bytes: &[u8]) -> Finding {
    Finding::Truncated {
        check,
        needed,
        available: bytes.len(),
    }
}

fn read_u16(bytes: &[u8], offset: usize) -> Option<u16> {
    let raw = bytes.get(offset..offset + 2)?;
    Some(u16::from_be_bytes([raw[0], raw[1]]))
}

fn read_ipv4(bytes: &[u8], offset: usize) -> Option<Ipv4Addr> {
    let raw = bytes.get(offset..offset + 4)?;
    Some(Ipv4Addr::new(raw[0], raw[1], raw[2], raw[3]))
}

fn read_ipv4_addresses(bytes: &[u8]) -> Option<Ipv4Addresses> {
    Some(Ipv4Addresses {
        source_ip: read_ipv4(bytes, ADDRESSES_OFFSET)?,
        dest_ip: read_ipv4(bytes, ADDRESSES_OFFSET + 4)?,
        source_port: read_u16(bytes, ADDRESSES_OFFSET + 8)?,
        dest_port: read_u16(bytes, ADDRESSES_OFFSET + 10)?,
    })
}
