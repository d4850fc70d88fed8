//! VPC client and data models.
//!
//! Provides typed resource structures, an asynchronous HTTP client for the VPC
//! API and typed pagers over every list operation.

#![deny(missing_docs)]

pub mod client;
pub mod models;

pub use client::{
    BareMetalServersPager, FloatingIpsPager, InstancesPager, LoadBalancersPager,
    PublicGatewaysPager, SecurityGroupsPager, SubnetsPager, VpcClient, VpcClientBuilder,
    VpcsPager, VpnGatewaysPager, REQUEST_ID_HEADER,
};
pub use models::{
    BareMetalServer, FloatingIp, Instance, ListParams, LoadBalancer, NameReference, PageLink,
    PublicGateway, ResourceReference, SecurityGroup, Subnet, Vpc, VpcCollection, VpnGateway,
};
pub use vpc_core::{ListOperation, Page, Pager, PagerPhase};

/// Convenient result alias sharing the `vpc-core` error type.
pub type Result<T> = vpc_core::Result<T>;
