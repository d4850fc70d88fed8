//! The list-operation table.
//!
//! Each paginated list operation the API exposes is described by a
//! [`ListOperation`]: its HTTP path, the response field that carries the page
//! of items, and how the continuation marker is found ([`PageSpec`]).

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::str::FromStr;
use url::Url;

use crate::error::{Error, Result};

/// Response field that carries the next-page link on VPC collections.
pub const NEXT_LINK_FIELD: &str = "next";

/// Query parameter that carries the cursor on VPC list calls.
pub const START_PARAM: &str = "start";

/// Query parameter that carries the page size on VPC list calls.
pub const LIMIT_PARAM: &str = "limit";

/// Where the continuation marker lives in a list response, and which request
/// parameter carries it back.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum CursorStrategy {
    /// Marker is a query parameter of the URL at `body[link_field].href`.
    NextHref {
        /// Response field holding the link object (usually `next`)
        link_field: String,
        /// Query parameter of the link carrying the cursor (usually `start`)
        param: String,
    },

    /// Marker is returned directly in a (possibly dotted) response field.
    Token {
        /// Dotted path of the token in the response body
        field: String,
        /// Request parameter the token is sent back under
        param: String,
    },

    /// Marker is the next numeric offset: the current offset plus the number
    /// of items the page held.
    ///
    /// Servers may cap the page size below the requested `limit`, so only an
    /// empty page ends iteration.
    Offset {
        /// Request parameter carrying the offset
        param: String,
    },
}

impl CursorStrategy {
    /// The VPC convention: `next.href` carrying a `start` query parameter.
    #[must_use]
    pub fn next_href() -> Self {
        Self::NextHref {
            link_field: NEXT_LINK_FIELD.to_string(),
            param: START_PARAM.to_string(),
        }
    }

    /// A bare token field sent back under `param`.
    #[must_use]
    pub fn token(field: impl Into<String>, param: impl Into<String>) -> Self {
        Self::Token {
            field: field.into(),
            param: param.into(),
        }
    }

    /// Offset paging sent back under `param`.
    #[must_use]
    pub fn offset(param: impl Into<String>) -> Self {
        Self::Offset {
            param: param.into(),
        }
    }

    /// Request parameter the cursor is injected under.
    #[must_use]
    pub fn param(&self) -> &str {
        match self {
            Self::NextHref { param, .. }
            | Self::Token { param, .. }
            | Self::Offset { param } => param,
        }
    }

    /// Extract the marker for the page after this one.
    ///
    /// `current` is the cursor the page was requested with and `returned` the
    /// number of items it held. `Ok(None)` means this was the last page.
    ///
    /// # Errors
    ///
    /// Returns a description of the problem when a marker is present but
    /// cannot be parsed.
    pub fn next_marker(
        &self,
        body: &Value,
        current: Option<&str>,
        returned: usize,
    ) -> std::result::Result<Option<String>, String> {
        match self {
            Self::NextHref { link_field, param } => {
                next_href_marker(body.get(link_field), link_field, param)
            }
            Self::Token { field, .. } => token_marker(lookup_path(body, field), field),
            Self::Offset { .. } => offset_marker(current, returned),
        }
    }
}

fn lookup_path<'a>(body: &'a Value, path: &str) -> Option<&'a Value> {
    path.split('.')
        .try_fold(body, |value, segment| value.get(segment))
}

fn non_empty(marker: &str) -> Option<String> {
    if marker.is_empty() {
        None
    } else {
        Some(marker.to_string())
    }
}

fn next_href_marker(
    link: Option<&Value>,
    link_field: &str,
    param: &str,
) -> std::result::Result<Option<String>, String> {
    let href = match link {
        None | Some(Value::Null) => return Ok(None),
        Some(Value::String(href)) => href.as_str(),
        Some(Value::Object(object)) => match object.get("href") {
            Some(Value::String(href)) => href.as_str(),
            Some(Value::Null) | None => {
                return Err(format!("`{link_field}` has no `href`"));
            }
            Some(other) => return Err(format!("`{link_field}.href` is not a string: {other}")),
        },
        Some(other) => return Err(format!("`{link_field}` is not a link object: {other}")),
    };

    let url = parse_href(href).map_err(|err| format!("`{link_field}.href` `{href}`: {err}"))?;
    url.query_pairs()
        .find(|(key, _)| key == param)
        .map(|(_, value)| non_empty(&value))
        .ok_or_else(|| format!("`{link_field}.href` `{href}` has no `{param}` parameter"))
}

fn parse_href(href: &str) -> std::result::Result<Url, url::ParseError> {
    match Url::parse(href) {
        Err(url::ParseError::RelativeUrlWithoutBase) => {
            Url::parse("http://relative.invalid/")?.join(href)
        }
        other => other,
    }
}

fn token_marker(value: Option<&Value>, field: &str) -> std::result::Result<Option<String>, String> {
    match value {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(token)) => Ok(non_empty(token)),
        Some(Value::Number(number)) => Ok(Some(number.to_string())),
        Some(other) => Err(format!("`{field}` is not a string token: {other}")),
    }
}

fn offset_marker(
    current: Option<&str>,
    returned: usize,
) -> std::result::Result<Option<String>, String> {
    let offset = match current {
        None => 0,
        Some(raw) => raw
            .parse::<u64>()
            .map_err(|err| format!("offset `{raw}` is not a number: {err}"))?,
    };

    if returned == 0 {
        return Ok(None);
    }
    let returned = u64::try_from(returned).map_err(|err| format!("page size: {err}"))?;
    offset
        .checked_add(returned)
        .map(|next| Some(next.to_string()))
        .ok_or_else(|| format!("offset `{offset}` + {returned} overflows"))
}

/// How a present-but-unparseable continuation marker is handled.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MarkerPolicy {
    /// Treat it as the end of the result set.
    #[default]
    Lenient,
    /// Fail the fetch with [`Error::MalformedContinuationMarker`].
    Strict,
}

/// Page layout of one list operation: item field, cursor strategy and marker
/// policy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageSpec {
    /// Response field holding the array of items
    pub item_field: String,
    /// Where the continuation marker lives
    pub cursor: CursorStrategy,
    /// Handling of unparseable markers
    #[serde(default)]
    pub marker_policy: MarkerPolicy,
}

impl PageSpec {
    /// Create a page spec with the lenient marker policy.
    #[must_use]
    pub fn new(item_field: impl Into<String>, cursor: CursorStrategy) -> Self {
        Self {
            item_field: item_field.into(),
            cursor,
            marker_policy: MarkerPolicy::default(),
        }
    }

    /// Set the marker policy.
    #[must_use]
    pub const fn with_marker_policy(mut self, policy: MarkerPolicy) -> Self {
        self.marker_policy = policy;
        self
    }

    /// Shorthand for [`MarkerPolicy::Strict`].
    #[must_use]
    pub const fn strict(self) -> Self {
        self.with_marker_policy(MarkerPolicy::Strict)
    }
}

/// Paginated list operations of the VPC API.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ListOperation {
    /// `GET /vpcs`
    ListVpcs,
    /// `GET /subnets`
    ListSubnets,
    /// `GET /instances`
    ListInstances,
    /// `GET /load_balancers`
    ListLoadBalancers,
    /// `GET /vpn_gateways`
    ListVpnGateways,
    /// `GET /bare_metal_servers`
    ListBareMetalServers,
    /// `GET /security_groups`
    ListSecurityGroups,
    /// `GET /floating_ips`
    ListFloatingIps,
    /// `GET /public_gateways`
    ListPublicGateways,
}

impl ListOperation {
    /// Returns the operation name as a string.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::ListVpcs => "list_vpcs",
            Self::ListSubnets => "list_subnets",
            Self::ListInstances => "list_instances",
            Self::ListLoadBalancers => "list_load_balancers",
            Self::ListVpnGateways => "list_vpn_gateways",
            Self::ListBareMetalServers => "list_bare_metal_servers",
            Self::ListSecurityGroups => "list_security_groups",
            Self::ListFloatingIps => "list_floating_ips",
            Self::ListPublicGateways => "list_public_gateways",
        }
    }

    /// Collection path relative to the versioned API root.
    ///
    /// Collections are served under the same name as their item field.
    #[must_use]
    pub const fn path(&self) -> &'static str {
        self.item_field()
    }

    /// Response field holding the page of items.
    #[must_use]
    pub const fn item_field(&self) -> &'static str {
        match self {
            Self::ListVpcs => "vpcs",
            Self::ListSubnets => "subnets",
            Self::ListInstances => "instances",
            Self::ListLoadBalancers => "load_balancers",
            Self::ListVpnGateways => "vpn_gateways",
            Self::ListBareMetalServers => "bare_metal_servers",
            Self::ListSecurityGroups => "security_groups",
            Self::ListFloatingIps => "floating_ips",
            Self::ListPublicGateways => "public_gateways",
        }
    }

    /// Page layout for this operation.
    #[must_use]
    pub fn page_spec(&self) -> PageSpec {
        PageSpec::new(self.item_field(), CursorStrategy::next_href())
    }

    /// Returns all list operations.
    #[must_use]
    pub const fn all() -> &'static [Self] {
        &[
            Self::ListVpcs,
            Self::ListSubnets,
            Self::ListInstances,
            Self::ListLoadBalancers,
            Self::ListVpnGateways,
            Self::ListBareMetalServers,
            Self::ListSecurityGroups,
            Self::ListFloatingIps,
            Self::ListPublicGateways,
        ]
    }
}

impl FromStr for ListOperation {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::all()
            .iter()
            .copied()
            .find(|op| op.name() == s)
            .ok_or_else(|| Error::InvalidRequest(format!("Unknown list operation: {s}")))
    }
}

impl std::fmt::Display for ListOperation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}
