//! VPC resource models and list parameters.
//!
//! Only fields shared across API versions are typed; everything else the
//! server returns lands in each model's `extra` map.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use vpc_core::id::{
    BareMetalServerId, FloatingIpId, InstanceId, LoadBalancerId, PublicGatewayId,
    ResourceGroupId, SecurityGroupId, SubnetId, VpcId, VpnGatewayId,
};
use vpc_core::operation::LIMIT_PARAM;
use vpc_core::RequestParams;

/// Parameters shared by every list endpoint.
#[derive(Debug, Default, Clone)]
pub struct ListParams {
    /// Filter by resource group.
    pub resource_group_id: Option<ResourceGroupId>,
    /// Filter by resource name.
    pub name: Option<String>,
    /// Page size (1-100).
    pub limit: Option<u32>,
    /// Sort key, prefixed with `-` for descending order.
    pub sort: Option<String>,
    /// Endpoint-specific filters such as `vpc.id` or `zone.name`.
    pub filters: RequestParams,
}

impl ListParams {
    /// Set the page size.
    #[must_use]
    pub fn with_limit(mut self, limit: u32) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Filter by resource group.
    #[must_use]
    pub fn with_resource_group(mut self, id: ResourceGroupId) -> Self {
        self.resource_group_id = Some(id);
        self
    }

    /// Filter by name.
    #[must_use]
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Set the sort key.
    #[must_use]
    pub fn with_sort(mut self, sort: impl Into<String>) -> Self {
        self.sort = Some(sort.into());
        self
    }

    /// Restrict to resources in one VPC.
    #[must_use]
    pub fn with_vpc(self, id: &VpcId) -> Self {
        self.with_filter("vpc.id", id)
    }

    /// Restrict to resources in one zone.
    #[must_use]
    pub fn with_zone(self, zone: impl Into<String>) -> Self {
        self.with_filter("zone.name", zone.into())
    }

    /// Add an endpoint-specific filter.
    #[must_use]
    pub fn with_filter(mut self, key: impl Into<String>, value: impl std::fmt::Display) -> Self {
        self.filters.push(key, value);
        self
    }

    /// Convert into a request parameter bag.
    #[must_use]
    pub fn to_params(&self) -> RequestParams {
        let mut params = RequestParams::new();
        params.push_opt("resource_group.id", self.resource_group_id.as_ref());
        params.push_opt("name", self.name.as_deref());
        params.push_opt(LIMIT_PARAM, self.limit);
        params.push_opt("sort", self.sort.as_deref());
        for (key, value) in self.filters.as_pairs() {
            params.push(key.clone(), value);
        }
        params
    }
}

/// Reference to another resource, as embedded in VPC responses.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ResourceReference {
    /// Resource identifier.
    pub id: String,
    /// Resource name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Canonical URL of the resource.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub href: Option<String>,
    /// Cloud resource name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub crn: Option<String>,
}

/// Reference to a named entity without an ID (zones, profiles).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct NameReference {
    /// Entity name.
    pub name: String,
    /// Canonical URL.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub href: Option<String>,
}

/// Link to a page of a collection.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PageLink {
    /// Absolute URL of the page.
    pub href: String,
}

/// Virtual private cloud.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Vpc {
    /// VPC identifier.
    pub id: VpcId,
    /// User-defined name.
    pub name: String,
    /// Lifecycle status.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    /// Cloud resource name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub crn: Option<String>,
    /// Canonical URL.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub href: Option<String>,
    /// Whether the VPC can reach classic infrastructure.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub classic_access: Option<bool>,
    /// Owning resource group.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resource_group: Option<ResourceReference>,
    /// Creation timestamp.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
    /// Untyped fields.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// One page of `GET /vpcs`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct VpcCollection {
    /// VPCs on this page.
    #[serde(default)]
    pub vpcs: Vec<Vpc>,
    /// Link to the first page.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub first: Option<PageLink>,
    /// Link to the next page, absent on the last page.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub next: Option<PageLink>,
    /// Page size the server applied.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub limit: Option<u32>,
    /// Total number of VPCs across all pages.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_count: Option<u64>,
}

/// Subnet within a VPC.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Subnet {
    /// Subnet identifier.
    pub id: SubnetId,
    /// User-defined name.
    pub name: String,
    /// Lifecycle status.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    /// IPv4 range in CIDR notation.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ipv4_cidr_block: Option<String>,
    /// Addresses still free.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub available_ipv4_address_count: Option<u32>,
    /// Addresses in the range.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_ipv4_address_count: Option<u32>,
    /// Parent VPC.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vpc: Option<ResourceReference>,
    /// Zone the subnet lives in.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub zone: Option<NameReference>,
    /// Attached public gateway.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub public_gateway: Option<ResourceReference>,
    /// Creation timestamp.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
    /// Untyped fields.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Virtual server instance.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Instance {
    /// Instance identifier.
    pub id: InstanceId,
    /// User-defined name.
    pub name: String,
    /// Lifecycle status (running, stopped, ...).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    /// Instance profile.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub profile: Option<NameReference>,
    /// Memory in GiB.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub memory: Option<u32>,
    /// Parent VPC.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vpc: Option<ResourceReference>,
    /// Zone the instance runs in.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub zone: Option<NameReference>,
    /// Creation timestamp.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
    /// Untyped fields.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Load balancer.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LoadBalancer {
    /// Load balancer identifier.
    pub id: LoadBalancerId,
    /// User-defined name.
    pub name: String,
    /// Fully qualified hostname.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hostname: Option<String>,
    /// Whether the load balancer is internet-facing.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_public: Option<bool>,
    /// Operating status (online, offline).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub operating_status: Option<String>,
    /// Provisioning status.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub provisioning_status: Option<String>,
    /// Subnets the load balancer is attached to.
    #[serde(default)]
    pub subnets: Vec<ResourceReference>,
    /// Creation timestamp.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
    /// Untyped fields.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// VPN gateway.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct VpnGateway {
    /// VPN gateway identifier.
    pub id: VpnGatewayId,
    /// User-defined name.
    pub name: String,
    /// Gateway mode (route, policy).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mode: Option<String>,
    /// Lifecycle status.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    /// Subnet the gateway is attached to.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subnet: Option<ResourceReference>,
    /// Creation timestamp.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
    /// Untyped fields.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Bare metal server.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BareMetalServer {
    /// Server identifier.
    pub id: BareMetalServerId,
    /// User-defined name.
    pub name: String,
    /// Lifecycle status.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    /// Server profile.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub profile: Option<NameReference>,
    /// Parent VPC.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vpc: Option<ResourceReference>,
    /// Zone the server is placed in.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub zone: Option<NameReference>,
    /// Creation timestamp.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
    /// Untyped fields.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Security group.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SecurityGroup {
    /// Security group identifier.
    pub id: SecurityGroupId,
    /// User-defined name.
    pub name: String,
    /// Parent VPC.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vpc: Option<ResourceReference>,
    /// Rules, kept as raw JSON.
    #[serde(default)]
    pub rules: Vec<Value>,
    /// Creation timestamp.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
    /// Untyped fields.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Floating IP address.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FloatingIp {
    /// Floating IP identifier.
    pub id: FloatingIpId,
    /// User-defined name.
    pub name: String,
    /// The public address.
    pub address: String,
    /// Lifecycle status.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    /// Zone the address is reserved in.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub zone: Option<NameReference>,
    /// Bound network interface or gateway.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target: Option<ResourceReference>,
    /// Creation timestamp.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
    /// Untyped fields.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Public gateway.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PublicGateway {
    /// Public gateway identifier.
    pub id: PublicGatewayId,
    /// User-defined name.
    pub name: String,
    /// Lifecycle status.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    /// Parent VPC.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vpc: Option<ResourceReference>,
    /// Zone the gateway serves.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub zone: Option<NameReference>,
    /// Floating IP bound to the gateway.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub floating_ip: Option<ResourceReference>,
    /// Creation timestamp.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
    /// Untyped fields.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}
