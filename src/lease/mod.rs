//! DHCP lease handling: the line-oriented lease listing parser, the
//! in-memory lease cache, and the background poller that keeps it fresh.

pub mod cache;
pub mod poller;

use std::fmt;

use serde::{Deserialize, Serialize};

/// Field layout of one lease line: timestamp, MAC, IP, hostname, client-id.
const LEASE_FIELD_COUNT: usize = 5;

/// One DHCP lease as reported by the lease source. Derived entirely from the
/// latest poll and never persisted; the MAC is the identity key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Lease {
    pub ip: String,
    /// Display hostname. Lease listings report unknown hostnames as "*".
    pub hostname: String,
    /// Canonical lowercase colon-separated hardware address.
    pub mac: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseLeasesError {
    pub line_number: usize,
    pub field_count: usize,
}

impl fmt::Display for ParseLeasesError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "malformed lease line {}: expected {} fields, found {}",
            self.line_number, LEASE_FIELD_COUNT, self.field_count
        )
    }
}

/// Normalize a hardware address to lowercase colon-separated form so it can
/// be used as a join key against persisted devices.
pub fn canonicalize_mac(mac: &str) -> String {
    mac.to_lowercase().replace(['-', '.'], ":")
}

/// Parse a raw lease listing into leases, preserving input order.
///
/// Blank lines are ignored. A line with the wrong field count fails the whole
/// payload; there is no partial-result mode. Empty input is an empty listing,
/// not an error.
pub fn parse_leases(payload: &str) -> Result<Vec<Lease>, ParseLeasesError> {
    let mut leases = Vec::new();
    for (index, line) in payload.lines().enumerate() {
        if line.trim().is_empty() {
            continue;
        }
        let fields: Vec<&str> = line.split_whitespace().collect();
        if fields.len() != LEASE_FIELD_COUNT {
            return Err(ParseLeasesError {
                line_number: index + 1,
                field_count: fields.len(),
            });
        }
        // fields: [timestamp, mac, ip, hostname, client-id]
        leases.push(Lease {
            ip: fields[2].to_string(),
            hostname: fields[3].to_string(),
            mac: canonicalize_mac(fields[1]),
        });
    }
    Ok(leases)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_leases_empty_payload() {
        assert_eq!(parse_leases(""), Ok(vec![]));
        assert_eq!(parse_leases("\n\n  \n"), Ok(vec![]));
    }

    #[test]
    fn test_parse_leases_one_lease() {
        let payload = "0000000000 1a:2b:3c:4d:5e:6f 192.168.1.100 test-hostname 01:1a:2b:3c:4d:5e:6f";
        let leases = parse_leases(payload).unwrap();
        assert_eq!(
            leases,
            vec![Lease {
                ip: "192.168.1.100".to_string(),
                hostname: "test-hostname".to_string(),
                mac: "1a:2b:3c:4d:5e:6f".to_string(),
            }]
        );
    }

    #[test]
    fn test_parse_leases_preserves_input_order() {
        let payload = "0000000000 1a:2b:3c:4d:5e:6f 192.168.1.100 test-hostname-1 01:1a:2b:3c:4d:5e:6f\n\
                       1111111111 6f:5e:4d:3c:2b:1a 192.168.1.101 test-hostname-2 01:6f:5e:4d:3c:2b:1a";
        let leases = parse_leases(payload).unwrap();
        assert_eq!(leases.len(), 2);
        assert_eq!(leases[0].ip, "192.168.1.100");
        assert_eq!(leases[1].ip, "192.168.1.101");
    }

    #[test]
    fn test_parse_leases_skips_blank_lines() {
        let payload = "\n0000000000 1a:2b:3c:4d:5e:6f 192.168.1.100 host-a 01:1a\n\n\
                       1111111111 6f:5e:4d:3c:2b:1a 192.168.1.101 host-b 01:6f\n";
        let leases = parse_leases(payload).unwrap();
        assert_eq!(leases.len(), 2);
    }

    #[test]
    fn test_parse_leases_wrong_field_count_fails_whole_payload() {
        let payload = "0000000000 1a:2b:3c:4d:5e:6f 192.168.1.100 host-a 01:1a\n\
                       1111111111 6f:5e:4d:3c:2b:1a 192.168.1.101\n\
                       2222222222 aa:bb:cc:dd:ee:ff 192.168.1.102 host-c 01:aa";
        let err = parse_leases(payload).unwrap_err();
        assert_eq!(err.line_number, 2);
        assert_eq!(err.field_count, 3);
    }

    #[test]
    fn test_parse_leases_too_many_fields_fails() {
        let payload = "0000000000 1a:2b:3c:4d:5e:6f 192.168.1.100 host a 01:1a";
        assert!(parse_leases(payload).is_err());
    }

    #[test]
    fn test_parse_leases_canonicalizes_mac() {
        let payload = "0000000000 1A-2B-3C-4D-5E-6F 192.168.1.100 host-a 01:1a";
        let leases = parse_leases(payload).unwrap();
        assert_eq!(leases[0].mac, "1a:2b:3c:4d:5e:6f");
    }

    #[test]
    fn test_canonicalize_mac_separators() {
        assert_eq!(canonicalize_mac("AA:BB:CC:DD:EE:FF"), "aa:bb:cc:dd:ee:ff");
        assert_eq!(canonicalize_mac("aa-bb-cc-dd-ee-ff"), "aa:bb:cc:dd:ee:ff");
        assert_eq!(canonicalize_mac("aabb.ccdd.eeff"), "aabb:ccdd:eeff");
    }
}
