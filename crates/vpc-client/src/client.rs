//! Asynchronous VPC client implementation.

use crate::models::{
    BareMetalServer, FloatingIp, Instance, ListParams, LoadBalancer, PublicGateway,
    SecurityGroup, Subnet, Vpc, VpcCollection, VpnGateway,
};
use crate::Result;
use async_trait::async_trait;
use reqwest::{Client, ClientBuilder, RequestBuilder, StatusCode};
use secrecy::{ExposeSecret, SecretString};
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::sleep;
use tracing::{debug, info};
use url::Url;
use uuid::Uuid;
use vpc_core::client::{
    ClientConfig, RetryPolicy, DEFAULT_API_VERSION, DEFAULT_CONNECT_TIMEOUT, DEFAULT_GENERATION,
};
use vpc_core::config::VpcClientConfig;
use vpc_core::operation::{ListOperation, LIMIT_PARAM, START_PARAM};
use vpc_core::{
    decode_page, Error, Page, PageRequest, Pager, RequestParams, RpcInvoker, RpcResponse,
};

const USER_AGENT: &str = concat!("vpc-client/", env!("CARGO_PKG_VERSION"));

/// Header carrying the per-request correlation ID.
pub const REQUEST_ID_HEADER: &str = "X-Request-Id";

/// Pager over VPCs.
pub type VpcsPager = Pager<Vpc, VpcClient>;
/// Pager over subnets.
pub type SubnetsPager = Pager<Subnet, VpcClient>;
/// Pager over instances.
pub type InstancesPager = Pager<Instance, VpcClient>;
/// Pager over load balancers.
pub type LoadBalancersPager = Pager<LoadBalancer, VpcClient>;
/// Pager over VPN gateways.
pub type VpnGatewaysPager = Pager<VpnGateway, VpcClient>;
/// Pager over bare-metal servers.
pub type BareMetalServersPager = Pager<BareMetalServer, VpcClient>;
/// Pager over security groups.
pub type SecurityGroupsPager = Pager<SecurityGroup, VpcClient>;
/// Pager over floating IPs.
pub type FloatingIpsPager = Pager<FloatingIp, VpcClient>;
/// Pager over public gateways.
pub type PublicGatewaysPager = Pager<PublicGateway, VpcClient>;

/// Builder for [`VpcClient`].
#[derive(Debug, Clone)]
pub struct VpcClientBuilder {
    base_url: Url,
    http_config: ClientConfig,
    retry_policy: RetryPolicy,
    token: Option<Arc<SecretString>>,
    api_version: String,
    generation: u8,
    page_limit: Option<u32>,
}

impl VpcClientBuilder {
    /// Create a new builder from the regional service URL.
    pub fn new(base_url: impl AsRef<str>) -> Result<Self> {
        let mut url = Url::parse(base_url.as_ref()).map_err(|err| {
            Error::ConfigError(format!(
                "Invalid VPC base URL `{}`: {err}",
                base_url.as_ref()
            ))
        })?;
        if !url.path().ends_with('/') {
            let path = format!("{}/", url.path());
            url.set_path(&path);
        }

        let config = ClientConfig::new();

        Ok(Self {
            base_url: url,
            retry_policy: config.retry_policy,
            http_config: config,
            token: None,
            api_version: DEFAULT_API_VERSION.to_string(),
            generation: DEFAULT_GENERATION,
            page_limit: None,
        })
    }

    /// Create a builder from a validated [`VpcClientConfig`].
    pub fn from_config(config: &VpcClientConfig) -> Result<Self> {
        config.ensure_valid()?;

        let http_config = ClientConfig::new()
            .with_timeout(config.timeout())
            .with_retry_policy(RetryPolicy::new().with_max_retries(config.max_retries));

        let mut builder = Self::new(&config.service_url)?
            .with_http_config(http_config)
            .with_api_version(config.api_version.clone())
            .with_generation(config.generation);
        builder.page_limit = config.page_limit;
        Ok(builder)
    }

    /// Override the retry policy.
    #[must_use]
    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry_policy = retry;
        self
    }

    /// Override the HTTP client configuration.
    #[must_use]
    pub fn with_http_config(mut self, config: ClientConfig) -> Self {
        self.retry_policy = config.retry_policy;
        self.http_config = config;
        self
    }

    /// Configure the bearer token sent in the `Authorization` header.
    #[must_use]
    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(Arc::new(SecretString::from(token.into())));
        self
    }

    /// Override the API version date.
    #[must_use]
    pub fn with_api_version(mut self, version: impl Into<String>) -> Self {
        self.api_version = version.into();
        self
    }

    /// Override the API generation.
    #[must_use]
    pub fn with_generation(mut self, generation: u8) -> Self {
        self.generation = generation;
        self
    }

    /// Page size applied to list calls that do not set `limit`.
    #[must_use]
    pub fn with_page_limit(mut self, limit: u32) -> Self {
        self.page_limit = Some(limit);
        self
    }

    /// Build the client instance.
    pub fn build(self) -> Result<VpcClient> {
        let mut builder = ClientBuilder::new()
            .timeout(self.http_config.timeout)
            .user_agent(USER_AGENT)
            .pool_idle_timeout(self.http_config.pool_idle_timeout)
            .pool_max_idle_per_host(self.http_config.pool_max_idle_per_host)
            .connect_timeout(Duration::from_secs(DEFAULT_CONNECT_TIMEOUT));

        if !self.http_config.enable_compression {
            builder = builder.no_gzip();
        }

        let http = builder
            .build()
            .map_err(|err| Error::ConfigError(format!("Failed to build VPC HTTP client: {err}")))?;

        Ok(VpcClient {
            http,
            base_url: self.base_url,
            retry_policy: self.retry_policy,
            token: self.token,
            api_version: self.api_version,
            generation: self.generation,
            page_limit: self.page_limit,
        })
    }
}

/// Asynchronous client for the VPC API.
///
/// Cloning is cheap; clones share the connection pool.
#[derive(Debug, Clone)]
pub struct VpcClient {
    http: Client,
    base_url: Url,
    retry_policy: RetryPolicy,
    token: Option<Arc<SecretString>>,
    api_version: String,
    generation: u8,
    page_limit: Option<u32>,
}

impl VpcClient {
    /// Construct directly from a base URL.
    pub fn new(base_url: impl AsRef<str>) -> Result<Self> {
        VpcClientBuilder::new(base_url)?.build()
    }

    /// Access the base URL.
    #[must_use]
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Fetch one page of VPCs, starting at `start` when given.
    pub async fn list_vpcs(
        &self,
        params: &ListParams,
        start: Option<&str>,
    ) -> Result<VpcCollection> {
        let mut query = self.base_params(params);
        query.push_opt(START_PARAM, start);

        let (_, body) = self.execute(ListOperation::ListVpcs.path(), &query).await?;
        serde_json::from_value(body).map_err(|err| {
            Error::ParseError(format!("Failed to parse VPC collection: {err}"))
        })
    }

    /// Fetch one page of any list operation, starting at `start` when given.
    pub async fn list_page<T>(
        &self,
        operation: ListOperation,
        params: &ListParams,
        start: Option<&str>,
    ) -> Result<Page<T>>
    where
        T: DeserializeOwned,
    {
        let mut query = self.base_params(params);
        query.push_opt(START_PARAM, start);

        let response = self.invoke(operation.name(), &query).await?;
        decode_page(operation.name(), &operation.page_spec(), start, response)
    }

    /// Create a pager over any list operation.
    pub fn pager<T>(&self, operation: ListOperation, params: &ListParams) -> Result<Pager<T, Self>>
    where
        T: DeserializeOwned,
    {
        Pager::new(
            Arc::new(self.clone()),
            PageRequest::new(operation.name(), self.base_params(params)),
            operation.page_spec(),
        )
    }

    /// Pager over `GET /vpcs`.
    pub fn vpcs_pager(&self, params: &ListParams) -> Result<VpcsPager> {
        self.pager(ListOperation::ListVpcs, params)
    }

    /// Pager over `GET /subnets`.
    pub fn subnets_pager(&self, params: &ListParams) -> Result<SubnetsPager> {
        self.pager(ListOperation::ListSubnets, params)
    }

    /// Pager over `GET /instances`.
    pub fn instances_pager(&self, params: &ListParams) -> Result<InstancesPager> {
        self.pager(ListOperation::ListInstances, params)
    }

    /// Pager over `GET /load_balancers`.
    pub fn load_balancers_pager(&self, params: &ListParams) -> Result<LoadBalancersPager> {
        self.pager(ListOperation::ListLoadBalancers, params)
    }

    /// Pager over `GET /vpn_gateways`.
    pub fn vpn_gateways_pager(&self, params: &ListParams) -> Result<VpnGatewaysPager> {
        self.pager(ListOperation::ListVpnGateways, params)
    }

    /// Pager over `GET /bare_metal_servers`.
    pub fn bare_metal_servers_pager(
        &self,
        params: &ListParams,
    ) -> Result<BareMetalServersPager> {
        self.pager(ListOperation::ListBareMetalServers, params)
    }

    /// Pager over `GET /security_groups`.
    pub fn security_groups_pager(&self, params: &ListParams) -> Result<SecurityGroupsPager> {
        self.pager(ListOperation::ListSecurityGroups, params)
    }

    /// Pager over `GET /floating_ips`.
    pub fn floating_ips_pager(&self, params: &ListParams) -> Result<FloatingIpsPager> {
        self.pager(ListOperation::ListFloatingIps, params)
    }

    /// Pager over `GET /public_gateways`.
    pub fn public_gateways_pager(&self, params: &ListParams) -> Result<PublicGatewaysPager> {
        self.pager(ListOperation::ListPublicGateways, params)
    }

    fn base_params(&self, params: &ListParams) -> RequestParams {
        let mut query = params.to_params();
        if !query.contains(LIMIT_PARAM) {
            query.push_opt(LIMIT_PARAM, self.page_limit);
        }
        query
    }

    fn build_url(&self, path: &str) -> Result<Url> {
        let normalized = path.trim_start_matches('/');
        self.base_url
            .join(&format!("v1/{normalized}"))
            .map_err(|err| Error::InvalidEndpoint(format!("Invalid VPC path `{path}`: {err}")))
    }

    async fn execute(&self, path: &str, params: &RequestParams) -> Result<(StatusCode, Value)> {
        let url = self.build_url(path)?;
        let generation = self.generation.to_string();
        let mut attempt = 0;

        loop {
            let request_id = Uuid::new_v4().to_string();
            let mut request = self
                .http
                .get(url.clone())
                .query(&[
                    ("version", self.api_version.as_str()),
                    ("generation", generation.as_str()),
                ])
                .query(params.as_pairs())
                .header("Accept", "application/json")
                .header(REQUEST_ID_HEADER, request_id.as_str());

            if let Some(token) = &self.token {
                request = request.bearer_auth(token.expose_secret());
            }

            info!(path, attempt, request_id = %request_id, "VPC request");

            let error = match send_once(request).await {
                Ok((status, bytes)) if status.is_success() => {
                    return deserialize_body(path, &bytes).map(|body| (status, body));
                }
                Ok((status, bytes)) => {
                    let error = status_error(status, &bytes);
                    if !status.is_server_error() && status != StatusCode::TOO_MANY_REQUESTS {
                        return Err(error);
                    }
                    error
                }
                Err(error) if error.is_retryable() => error,
                Err(error) => return Err(error),
            };

            attempt += 1;
            if attempt > self.retry_policy.max_retries {
                return Err(error);
            }
            let delay = self.retry_policy.delay_for_attempt(attempt);
            if delay > Duration::ZERO {
                debug!("Retrying VPC request after {:?}", delay);
                sleep(delay).await;
            }
        }
    }
}

/// Send one request and read its whole body. Failures while sending and while
/// reading map to the same [`Error`] kinds.
async fn send_once(request: RequestBuilder) -> Result<(StatusCode, Vec<u8>)> {
    let response = request.send().await?;
    let status = response.status();
    let body = response.bytes().await?;
    Ok((status, body.to_vec()))
}

fn status_error(status: StatusCode, body: &[u8]) -> Error {
    let text = String::from_utf8_lossy(body).into_owned();
    match status {
        StatusCode::NOT_FOUND => Error::NotFound(text),
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
            Error::Unauthorized(format!("VPC authentication failed: {text}"))
        }
        StatusCode::BAD_REQUEST => Error::InvalidRequest(format!("VPC rejected request: {text}")),
        StatusCode::TOO_MANY_REQUESTS
        | StatusCode::BAD_GATEWAY
        | StatusCode::SERVICE_UNAVAILABLE
        | StatusCode::GATEWAY_TIMEOUT => {
            Error::ServiceUnavailable(format!("VPC temporarily unavailable: {text}"))
        }
        status if status.is_server_error() => {
            Error::ServiceUnavailable(format!("VPC server error {status}: {text}"))
        }
        status => Error::HttpError(format!("VPC error {status}: {text}")),
    }
}

#[async_trait]
impl RpcInvoker for VpcClient {
    async fn invoke(&self, operation: &str, params: &RequestParams) -> Result<RpcResponse> {
        let operation = ListOperation::from_str(operation)?;
        let (status, body) = self.execute(operation.path(), params).await?;
        Ok(RpcResponse::new(status.as_u16(), body))
    }
}

fn deserialize_body(path: &str, bytes: &[u8]) -> Result<Value> {
    if bytes.is_empty() {
        return Ok(Value::Null);
    }
    serde_json::from_slice(bytes).map_err(|err| {
        Error::ParseError(format!("Failed to parse VPC response for `{path}`: {err}"))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use vpc_core::PagerPhase;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;
    use wiremock::matchers::{
        header, header_exists, method, path, query_param, query_param_is_missing,
    };
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client(server: &MockServer) -> VpcClient {
        VpcClientBuilder::new(server.uri())
            .unwrap()
            .with_retry_policy(RetryPolicy::no_retry())
            .build()
            .unwrap()
    }

    fn vpc(id: &str) -> Value {
        json!({ "id": id, "name": format!("vpc-{id}"), "status": "available" })
    }

    #[tokio::test]
    async fn list_vpcs_sends_version_and_generation() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v1/vpcs"))
            .and(query_param("version", DEFAULT_API_VERSION))
            .and(query_param("generation", "2"))
            .and(query_param("limit", "10"))
            .and(header("Accept", "application/json"))
            .and(header_exists(REQUEST_ID_HEADER))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "vpcs": [vpc("r006-a")],
                "first": { "href": format!("{}/v1/vpcs?limit=10", server.uri()) },
                "limit": 10,
                "total_count": 1
            })))
            .expect(1)
            .mount(&server)
            .await;

        let collection = client(&server)
            .list_vpcs(&ListParams::default().with_limit(10), None)
            .await
            .unwrap();
        assert_eq!(collection.vpcs.len(), 1);
        assert_eq!(collection.vpcs[0].name, "vpc-r006-a");
        assert!(collection.next.is_none());
    }

    #[tokio::test]
    async fn vpcs_pager_follows_next_href() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v1/vpcs"))
            .and(query_param_is_missing("start"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "vpcs": [vpc("r006-a"), vpc("r006-b")],
                "limit": 2,
                "next": { "href": format!("{}/v1/vpcs?limit=2&start=page-2", server.uri()) }
            })))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/v1/vpcs"))
            .and(query_param("start", "page-2"))
            .and(query_param("limit", "2"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "vpcs": [vpc("r006-c")],
                "limit": 2
            })))
            .expect(1)
            .mount(&server)
            .await;

        let mut pager = client(&server)
            .vpcs_pager(&ListParams::default().with_limit(2))
            .unwrap();
        let vpcs = pager.collect_all().await.unwrap();

        let ids: Vec<_> = vpcs.iter().map(|vpc| vpc.id.as_str()).collect();
        assert_eq!(ids, vec!["r006-a", "r006-b", "r006-c"]);
        assert_eq!(pager.phase(), PagerPhase::Done);
    }

    #[tokio::test]
    async fn retries_server_errors_before_succeeding() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v1/subnets"))
            .respond_with(ResponseTemplate::new(503).set_body_string("busy"))
            .up_to_n_times(1)
            .with_priority(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/v1/subnets"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "subnets": [] })))
            .mount(&server)
            .await;

        let client = VpcClientBuilder::new(server.uri())
            .unwrap()
            .with_retry_policy(
                RetryPolicy::new()
                    .with_max_retries(2)
                    .with_initial_delay(Duration::from_millis(1)),
            )
            .build()
            .unwrap();

        let page: Page<Subnet> = client
            .list_page(ListOperation::ListSubnets, &ListParams::default(), None)
            .await
            .unwrap();
        assert!(page.items.is_empty());
        assert!(page.is_last());
    }

    #[tokio::test]
    async fn pager_surfaces_transport_failure_and_replays() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v1/instances"))
            .respond_with(ResponseTemplate::new(503).set_body_string("busy"))
            .up_to_n_times(1)
            .with_priority(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/v1/instances"))
            .and(query_param_is_missing("start"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "instances": [{ "id": "i-1", "name": "web-1", "status": "running" }]
            })))
            .mount(&server)
            .await;

        let mut pager = client(&server)
            .instances_pager(&ListParams::default())
            .unwrap();

        let err = pager.next_page().await.unwrap_err();
        assert!(matches!(
            err.cause(),
            Some(Error::ServiceUnavailable(_))
        ));
        assert_eq!(pager.phase(), PagerPhase::Fresh);

        let instances = pager.next_page().await.unwrap();
        assert_eq!(instances[0].status.as_deref(), Some("running"));
        assert!(!pager.has_next());
    }

    const TRUNCATED_BODY: &str = "HTTP/1.1 200 OK\r\ncontent-type: application/json\r\n\
        content-length: 64\r\n\r\n{\"subnets\"";
    const SUBNETS_BODY: &str = "HTTP/1.1 200 OK\r\ncontent-type: application/json\r\n\
        content-length: 15\r\nconnection: close\r\n\r\n{\"subnets\": []}";

    /// Serve one canned raw response per connection, closing each afterwards.
    async fn raw_server(responses: Vec<&'static str>) -> String {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            for response in responses {
                let (mut socket, _) = listener.accept().await.unwrap();
                let mut buf = [0u8; 4096];
                let _ = socket.read(&mut buf).await;
                socket.write_all(response.as_bytes()).await.unwrap();
                let _ = socket.shutdown().await;
            }
        });
        format!("http://{addr}")
    }

    #[tokio::test]
    async fn body_read_failure_is_retried() {
        let base = raw_server(vec![TRUNCATED_BODY, SUBNETS_BODY]).await;
        let client = VpcClientBuilder::new(base)
            .unwrap()
            .with_retry_policy(
                RetryPolicy::new()
                    .with_max_retries(1)
                    .with_initial_delay(Duration::from_millis(1)),
            )
            .build()
            .unwrap();

        let page: Page<Subnet> = client
            .list_page(ListOperation::ListSubnets, &ListParams::default(), None)
            .await
            .unwrap();
        assert!(page.items.is_empty());
        assert!(page.is_last());
    }

    #[tokio::test]
    async fn body_read_failure_without_retries_surfaces() {
        let base = raw_server(vec![TRUNCATED_BODY]).await;
        let client = VpcClientBuilder::new(base)
            .unwrap()
            .with_retry_policy(RetryPolicy::no_retry())
            .build()
            .unwrap();

        let err = client
            .list_vpcs(&ListParams::default(), None)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::HttpError(_)));
        assert!(err.is_retryable());
    }

    #[tokio::test]
    async fn not_found_is_not_retried() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v1/floating_ips"))
            .respond_with(ResponseTemplate::new(404).set_body_string("missing"))
            .expect(1)
            .mount(&server)
            .await;

        let client = VpcClientBuilder::new(server.uri()).unwrap().build().unwrap();
        let err = client
            .invoke("list_floating_ips", &RequestParams::new())
            .await
            .unwrap_err();
        assert_eq!(err, Error::NotFound("missing".to_string()));
    }

    #[tokio::test]
    async fn bearer_token_is_sent() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v1/security_groups"))
            .and(header("Authorization", "Bearer iam-token"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "security_groups": [{ "id": "sg-1", "name": "default", "rules": [] }]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let client = VpcClientBuilder::new(server.uri())
            .unwrap()
            .with_token("iam-token")
            .build()
            .unwrap();
        let groups = client
            .security_groups_pager(&ListParams::default())
            .unwrap()
            .collect_all()
            .await
            .unwrap();
        assert_eq!(groups.len(), 1);
    }

    #[tokio::test]
    async fn unauthorized_maps_to_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v1/vpcs"))
            .respond_with(ResponseTemplate::new(401).set_body_string("expired"))
            .expect(1)
            .mount(&server)
            .await;

        let err = client(&server)
            .list_vpcs(&ListParams::default(), None)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Unauthorized(_)));
    }

    #[tokio::test]
    async fn unknown_operation_is_rejected() {
        let client = VpcClient::new("http://127.0.0.1:9").unwrap();
        let err = client
            .invoke("list_widgets", &RequestParams::new())
            .await
            .unwrap_err();
        assert!(matches!(err, Error::InvalidRequest(_)));
    }

    #[tokio::test]
    async fn config_page_limit_is_default_limit() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v1/public_gateways"))
            .and(query_param("limit", "50"))
            .and(query_param("generation", "1"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(json!({ "public_gateways": [] })),
            )
            .expect(1)
            .mount(&server)
            .await;

        let config = VpcClientConfig::new(server.uri())
            .unwrap()
            .with_generation(1)
            .with_page_limit(50);
        let client = VpcClientBuilder::from_config(&config).unwrap().build().unwrap();

        let mut pager = client.public_gateways_pager(&ListParams::default()).unwrap();
        assert_eq!(pager.request().base_params.get("limit"), Some("50"));
        assert!(pager.collect_all().await.unwrap().is_empty());
    }

    #[test]
    fn builder_normalizes_base_path() {
        let client = VpcClient::new("https://vpc.example.com/api").unwrap();
        assert_eq!(client.base_url().as_str(), "https://vpc.example.com/api/");
        assert_eq!(
            client.build_url("vpcs").unwrap().as_str(),
            "https://vpc.example.com/api/v1/vpcs"
        );
    }

    #[test]
    fn builder_rejects_invalid_url() {
        assert!(matches!(
            VpcClientBuilder::new("not a url"),
            Err(Error::ConfigError(_))
        ));
    }
}
