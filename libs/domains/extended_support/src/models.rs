use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use strum::Display;
use tracing::debug;

/// Identifier of one member of the account pool
pub type AccountId = String;

/// Placeholder written for node roles a domain does not have
pub const NOT_APPLICABLE: &str = "N/A";

/// Node-option type tag that marks dedicated coordinator nodes
pub const COORDINATOR_NODE_TYPE: &str = "coordinator";

/// Node roles that contribute to extended support capacity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum NodeRole {
    DedicatedMaster,
    Data,
    UltraWarm,
    Coordinator,
}

/// A homogeneous group of nodes: one instance type, `count` instances
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeGroup {
    pub instance_type: String,
    pub count: u32,
}

impl NodeGroup {
    pub fn new(instance_type: impl Into<String>, count: u32) -> Self {
        Self {
            instance_type: instance_type.into(),
            count,
        }
    }
}

/// One entry of a domain's node-options collection
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeOption {
    /// Role tag, e.g. "coordinator"
    pub node_type: String,
    /// Configured nodes, `None` when the option is disabled or has no type
    pub node: Option<NodeGroup>,
}

/// Cluster layout of a domain
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClusterShape {
    pub data: NodeGroup,
    pub dedicated_master: Option<NodeGroup>,
    pub warm: Option<NodeGroup>,
    #[serde(default)]
    pub node_options: Vec<NodeOption>,
}

impl ClusterShape {
    /// Data nodes only, no optional roles
    pub fn data_only(instance_type: impl Into<String>, count: u32) -> Self {
        Self {
            data: NodeGroup::new(instance_type, count),
            dedicated_master: None,
            warm: None,
            node_options: Vec::new(),
        }
    }

    /// Dedicated coordinator nodes, taken from the first node option tagged
    /// "coordinator". Later coordinator entries and other tags are ignored.
    pub fn coordinator(&self) -> Option<&NodeGroup> {
        let mut selected: Option<&NodeGroup> = None;
        let mut found = false;

        for option in &self.node_options {
            if option.node_type != COORDINATOR_NODE_TYPE {
                debug!(node_type = %option.node_type, "Ignoring non-coordinator node option");
                continue;
            }
            if found {
                debug!("Ignoring additional coordinator node option");
                continue;
            }
            found = true;
            selected = option.node.as_ref();
        }

        selected
    }
}

/// An OpenSearch domain as described by the provider, for one (account, region)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DomainRecord {
    pub domain_name: String,
    pub arn: String,
    /// `<Engine>_<Major>.<Minor>`, absent when the provider omits it
    pub engine_version: Option<String>,
    pub cluster: ClusterShape,
}

/// Instance type, count and normalization factor of one node role
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoleCapacity {
    pub instance_type: String,
    pub count: u32,
    pub normalization_factor: f64,
}

impl RoleCapacity {
    pub fn new(instance_type: impl Into<String>, count: u32, normalization_factor: f64) -> Self {
        Self {
            instance_type: instance_type.into(),
            count,
            normalization_factor,
        }
    }

    /// Role not present on the domain
    pub fn absent() -> Self {
        Self::new(NOT_APPLICABLE, 0, 0.0)
    }

    /// Capacity in normalized instances (count × factor)
    pub fn normalized_units(&self) -> f64 {
        f64::from(self.count) * self.normalization_factor
    }
}

/// A domain eligible for extended support, priced. One report row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EligibleDomainReport {
    pub account_id: AccountId,
    pub region: String,
    pub region_name: String,
    pub domain_name: String,
    pub arn: String,
    pub engine_version: String,
    pub dedicated_master: RoleCapacity,
    pub data: RoleCapacity,
    pub ultrawarm: RoleCapacity,
    pub coordinator: RoleCapacity,
    pub price_per_nih: f64,
    pub end_of_standard_support: Option<NaiveDate>,
    pub end_of_extended_support: Option<NaiveDate>,
    pub yearly_cost: f64,
}

impl EligibleDomainReport {
    /// Capacity of every role, in report column order
    pub fn roles(&self) -> [(NodeRole, &RoleCapacity); 4] {
        [
            (NodeRole::DedicatedMaster, &self.dedicated_master),
            (NodeRole::Data, &self.data),
            (NodeRole::UltraWarm, &self.ultrawarm),
            (NodeRole::Coordinator, &self.coordinator),
        ]
    }

    /// Sum of normalized capacity across all roles
    pub fn normalized_capacity(&self) -> f64 {
        self.roles()
            .iter()
            .map(|(_, capacity)| capacity.normalized_units())
            .sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn option(node_type: &str, node: Option<NodeGroup>) -> NodeOption {
        NodeOption {
            node_type: node_type.to_string(),
            node,
        }
    }

    #[test]
    fn test_coordinator_absent_without_node_options() {
        let shape = ClusterShape::data_only("r6g.large.search", 3);
        assert!(shape.coordinator().is_none());
    }

    #[test]
    fn test_coordinator_uses_first_matching_entry() {
        let mut shape = ClusterShape::data_only("r6g.large.search", 3);
        shape.node_options = vec![
            option("ingest", Some(NodeGroup::new("m6g.large.search", 9))),
            option(COORDINATOR_NODE_TYPE, Some(NodeGroup::new("m6g.xlarge.search", 2))),
            option(COORDINATOR_NODE_TYPE, Some(NodeGroup::new("m6g.2xlarge.search", 4))),
        ];

        let coordinator = shape.coordinator().unwrap();
        assert_eq!(coordinator.instance_type, "m6g.xlarge.search");
        assert_eq!(coordinator.count, 2);
    }

    #[test]
    fn test_disabled_first_coordinator_is_not_replaced_by_later_one() {
        let mut shape = ClusterShape::data_only("r6g.large.search", 3);
        shape.node_options = vec![
            option(COORDINATOR_NODE_TYPE, None),
            option(COORDINATOR_NODE_TYPE, Some(NodeGroup::new("m6g.xlarge.search", 2))),
        ];
        assert!(shape.coordinator().is_none());
    }

    #[test]
    fn test_absent_role_capacity() {
        let absent = RoleCapacity::absent();
        assert_eq!(absent.instance_type, NOT_APPLICABLE);
        assert_eq!(absent.count, 0);
        assert_eq!(absent.normalized_units(), 0.0);
    }

    #[test]
    fn test_node_role_display() {
        assert_eq!(NodeRole::DedicatedMaster.to_string(), "dedicated_master");
        assert_eq!(NodeRole::UltraWarm.to_string(), "ultra_warm");
    }
}
