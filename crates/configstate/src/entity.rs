// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Discoverable services and what they can do.

use serde::{Deserialize, Serialize};

/// Something a service can do, and how much of it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Capability {
    pub name: String,
    pub capacity: i64,
}

/// A service on the network.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Service {
    pub uri: String,
    #[serde(rename = "capabilities")]
    pub caps: Vec<Capability>,
}

impl Service {
    pub fn new(uri: impl Into<String>) -> Self {
        Self {
            uri: uri.into(),
            caps: Vec::new(),
        }
    }

    /// Add a capability.
    pub fn capability(mut self, name: impl Into<String>, capacity: i64) -> Self {
        self.caps.push(Capability {
            name: name.into(),
            capacity,
        });
        self
    }
}

/// Decode a raw payload (a JSON array of services).
pub fn decode_services(data: &[u8]) -> Result<Vec<Service>, serde_json::Error> {
    serde_json::from_slice(data)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_services() {
        let data = br#"[{"uri":"http://a","capabilities":[{"name":"resize","capacity":23}]}]"#;
        let services = decode_services(data).unwrap();

        assert_eq!(services, vec![Service::new("http://a").capability("resize", 23)]);
    }

    #[test]
    fn test_decode_keeps_capability_order() {
        let data = br#"[{"uri":"http://b","capabilities":[
            {"name":"resize","capacity":1},
            {"name":"crop","capacity":2},
            {"name":"rotate","capacity":3}
        ]}]"#;
        let services = decode_services(data).unwrap();

        let names: Vec<_> = services[0].caps.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, ["resize", "crop", "rotate"]);
    }

    #[test]
    fn test_decode_empty_array() {
        assert!(decode_services(b"[]").unwrap().is_empty());
    }

    #[test]
    fn test_decode_malformed() {
        assert!(decode_services(b"[{\"uri\":").is_err());
        assert!(decode_services(b"{\"uri\":\"http://a\"}").is_err());
    }

    #[test]
    fn test_encode_uses_wire_names() {
        let service = Service::new("http://a").capability("resize", 23);
        let json = serde_json::to_string(&service).unwrap();

        assert_eq!(
            json,
            r#"{"uri":"http://a","capabilities":[{"name":"resize","capacity":23}]}"#
        );
    }
}
