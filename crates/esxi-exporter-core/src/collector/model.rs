//! Typed records read from `vsish` for one poll.

use crate::vsish::paths::SummaryKind;
use crate::vsish::{PortId, Value};

/// What is attached to a port (`clientType` in the port status node).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClientType {
    None,
    PhysicalNic,
    VirtualNic,
    Other(i64),
}

impl ClientType {
    pub fn from_code(code: i64) -> Self {
        match code {
            0 => ClientType::None,
            4 => ClientType::PhysicalNic,
            5 => ClientType::VirtualNic,
            other => ClientType::Other(other),
        }
    }
}

/// Emulated device model of a virtual NIC (`clientSubType`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClientSubType {
    E1000,
    Vmxnet3,
    Other(i64),
}

impl ClientSubType {
    pub fn from_code(code: i64) -> Self {
        match code {
            7 => ClientSubType::E1000,
            9 => ClientSubType::Vmxnet3,
            other => ClientSubType::Other(other),
        }
    }
}

/// `/net/openPorts/{id}/type`
#[derive(Debug, Clone, PartialEq)]
pub struct PortType {
    pub portset_name: String,
}

impl PortType {
    /// Returns `None` if the record has no `portsetName` string.
    pub fn from_value(value: &Value) -> Option<Self> {
        let portset_name = value.get("portsetName")?.as_str()?;
        Some(Self {
            portset_name: portset_name.to_string(),
        })
    }
}

/// `/net/portsets/{portset}/ports/{id}/status`
#[derive(Debug, Clone, PartialEq)]
pub struct PortStatus {
    pub client_type: ClientType,
    /// Absent on ports whose status carries no subtype.
    pub client_sub_type: Option<ClientSubType>,
    pub client_name: String,
}

impl PortStatus {
    /// Returns `None` if the record has no numeric `clientType`.
    ///
    /// A missing `clientName` reads as an empty name.
    pub fn from_value(value: &Value) -> Option<Self> {
        let client_type = ClientType::from_code(value.get("clientType")?.as_i64()?);
        let client_sub_type = value
            .get("clientSubType")
            .and_then(Value::as_i64)
            .map(ClientSubType::from_code);
        let client_name = value
            .get("clientName")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string();

        Some(Self {
            client_type,
            client_sub_type,
            client_name,
        })
    }

    pub fn is_virtual_nic(&self, sub_type: ClientSubType) -> bool {
        self.client_type == ClientType::VirtualNic && self.client_sub_type == Some(sub_type)
    }
}

/// Counter name → value, in the order `vsish` printed them.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StatRecord {
    entries: Vec<(String, i64)>,
}

impl StatRecord {
    /// Keeps every numeric field of a struct record.
    ///
    /// Floats are truncated to integers. Strings, nested structs and arrays
    /// are not counters and are left out. Returns `None` for non-structs.
    pub fn from_value(value: &Value) -> Option<Self> {
        let entries = value
            .fields()?
            .iter()
            .filter_map(|(name, v)| v.as_i64().map(|n| (name.clone(), n)))
            .collect();
        Some(Self { entries })
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, i64)> {
        self.entries.iter().map(|(name, value)| (name.as_str(), *value))
    }

    pub fn get(&self, name: &str) -> Option<i64> {
        self.entries
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, value)| *value)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<S: Into<String>> FromIterator<(S, i64)> for StatRecord {
    fn from_iter<I: IntoIterator<Item = (S, i64)>>(iter: I) -> Self {
        Self {
            entries: iter.into_iter().map(|(n, v)| (n.into(), v)).collect(),
        }
    }
}

/// Everything read for one port during a poll.
#[derive(Debug, Clone, PartialEq)]
pub struct PortBundle {
    pub port_id: PortId,
    pub portset_name: String,
    pub status: PortStatus,
    pub stats: StatRecord,
    /// Device summaries that were requested and returned.
    pub summaries: Vec<(SummaryKind, StatRecord)>,
}

impl PortBundle {
    pub fn summary(&self, kind: SummaryKind) -> Option<&StatRecord> {
        self.summaries
            .iter()
            .find(|(k, _)| *k == kind)
            .map(|(_, record)| record)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vsish::parser::parse_document;

    fn record(text: &str) -> Value {
        parse_document(text).unwrap().remove(0)
    }

    #[test]
    fn test_port_type() {
        let t = PortType::from_value(&record("{ \"portsetName\":\"vSwitch0\" }")).unwrap();
        assert_eq!(t.portset_name, "vSwitch0");
        assert!(PortType::from_value(&record("{ \"portsetName\":3 }")).is_none());
        assert!(PortType::from_value(&record("{ }")).is_none());
    }

    #[test]
    fn test_port_status_vmxnet3() {
        let status = PortStatus::from_value(&record(
            "{ \"clientType\":5, \"clientSubType\":9, \"clientName\":\"vm.eth0\" }",
        ))
        .unwrap();
        assert_eq!(status.client_type, ClientType::VirtualNic);
        assert_eq!(status.client_sub_type, Some(ClientSubType::Vmxnet3));
        assert!(status.is_virtual_nic(ClientSubType::Vmxnet3));
        assert!(!status.is_virtual_nic(ClientSubType::E1000));
        assert_eq!(status.client_name, "vm.eth0");
    }

    #[test]
    fn test_port_status_without_subtype() {
        let status =
            PortStatus::from_value(&record("{ \"clientType\":4, \"clientName\":\"vmnic0\" }"))
                .unwrap();
        assert_eq!(status.client_type, ClientType::PhysicalNic);
        assert_eq!(status.client_sub_type, None);
    }

    #[test]
    fn test_port_status_requires_client_type() {
        assert!(PortStatus::from_value(&record("{ \"clientName\":\"x\" }")).is_none());
        let unnamed = PortStatus::from_value(&record("{ \"clientType\":0 }")).unwrap();
        assert_eq!(unnamed.client_type, ClientType::None);
        assert_eq!(unnamed.client_name, "");
    }

    #[test]
    fn test_unknown_codes_are_kept() {
        assert_eq!(ClientType::from_code(11), ClientType::Other(11));
        assert_eq!(ClientSubType::from_code(3), ClientSubType::Other(3));
    }

    #[test]
    fn test_stat_record_keeps_numeric_fields() {
        let stats = StatRecord::from_value(&record(
            "{ \"pktsTx\":10, \"name\":\"x\", \"avg\":2.9, \"q\":[1,2], \"neg\":-1.5 }",
        ))
        .unwrap();
        let entries: Vec<(&str, i64)> = stats.iter().collect();
        assert_eq!(entries, [("pktsTx", 10), ("avg", 2), ("neg", -1)]);
        assert_eq!(stats.get("avg"), Some(2));
        assert_eq!(stats.get("name"), None);
    }

    #[test]
    fn test_stat_record_from_iter() {
        let stats: StatRecord = [("a", 1), ("b", 2)].into_iter().collect();
        assert_eq!(stats.len(), 2);
        assert!(!stats.is_empty());
    }
}
