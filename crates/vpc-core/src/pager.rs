//! Paginated list cursor.
//!
//! A [`Pager`] walks one list operation page by page. It owns the cursor, so
//! callers only ask [`Pager::has_next`] and pull pages with
//! [`Pager::next_page`]. The pager never retries and never swallows errors: a
//! failed fetch leaves its state untouched, so calling `next_page` again
//! replays the same cursor.
//!
//! The pager does not detect cycles. A server that keeps returning a marker
//! pointing at the same page makes iteration unbounded; callers that need a
//! bound should stop after a fixed number of pages.

use async_trait::async_trait;
use futures::stream::{self, Stream};
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;

use crate::error::{Error, Result};
use crate::operation::{MarkerPolicy, PageSpec};
use crate::query::RequestParams;

/// Parsed response of one RPC round trip.
#[derive(Debug, Clone, PartialEq)]
pub struct RpcResponse {
    /// HTTP status code
    pub status: u16,
    /// Decoded response body
    pub body: Value,
}

impl RpcResponse {
    /// Create a response.
    #[must_use]
    pub const fn new(status: u16, body: Value) -> Self {
        Self { status, body }
    }

    /// A `200 OK` response with the given body.
    #[must_use]
    pub const fn ok(body: Value) -> Self {
        Self::new(200, body)
    }

    /// Returns true for 2xx statuses.
    #[must_use]
    pub const fn is_success(&self) -> bool {
        self.status >= 200 && self.status < 300
    }
}

/// Capability that performs one request/response round trip.
///
/// Implementations own transport concerns: URLs, credentials, retries and
/// timeouts.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait RpcInvoker: Send + Sync {
    /// Invoke `operation` with the given parameter bag.
    ///
    /// # Errors
    ///
    /// Returns an error on transport failure, non-2xx status, or an
    /// undecodable body.
    async fn invoke(&self, operation: &str, params: &RequestParams) -> Result<RpcResponse>;
}

/// Immutable configuration of one pager: which operation, with which filters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageRequest {
    /// Operation identifier passed to the invoker
    pub operation: String,
    /// Caller-supplied parameters; never carries the cursor
    pub base_params: RequestParams,
}

impl PageRequest {
    /// Create a page request.
    #[must_use]
    pub fn new(operation: impl Into<String>, base_params: RequestParams) -> Self {
        Self {
            operation: operation.into(),
            base_params,
        }
    }
}

/// One page of results.
#[derive(Debug, Clone, PartialEq)]
pub struct Page<T> {
    /// Items in server order
    pub items: Vec<T>,
    /// Cursor for the following page, `None` on the last page
    pub next_marker: Option<String>,
}

impl<T> Page<T> {
    /// Returns true if no page follows this one.
    #[must_use]
    pub const fn is_last(&self) -> bool {
        self.next_marker.is_none()
    }
}

/// Lifecycle of a pager.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PagerPhase {
    /// No page fetched yet
    Fresh,
    /// At least one page fetched and the server returned a marker
    Active,
    /// The last page has been fetched
    Done,
}

#[derive(Debug, Clone)]
struct PagerState {
    next_token: Option<String>,
    first_fetch: bool,
}

/// Cursor over a paginated list operation yielding items of type `T`.
///
/// `has_next` borrows shared, `next_page` borrows exclusively: one logical
/// caller drives a pager at a time. Independent pagers sharing one invoker
/// are fully independent.
pub struct Pager<T, I: ?Sized> {
    invoker: Arc<I>,
    request: PageRequest,
    spec: PageSpec,
    state: PagerState,
    _item: PhantomData<fn() -> T>,
}

impl<T, I> Pager<T, I>
where
    T: DeserializeOwned,
    I: RpcInvoker + ?Sized,
{
    /// Create a pager in the fresh state.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidRequest`] if the base parameters already carry
    /// the cursor parameter; the pager owns that field.
    pub fn new(invoker: Arc<I>, request: PageRequest, spec: PageSpec) -> Result<Self> {
        let cursor_param = spec.cursor.param();
        if request.base_params.contains(cursor_param) {
            return Err(Error::InvalidRequest(format!(
                "`{cursor_param}` is managed by the pager and must not be set for `{}`",
                request.operation
            )));
        }

        Ok(Self {
            invoker,
            request,
            spec,
            state: PagerState {
                next_token: None,
                first_fetch: true,
            },
            _item: PhantomData,
        })
    }

    /// Returns true while another fetch is expected.
    #[must_use]
    pub fn has_next(&self) -> bool {
        self.state.first_fetch || self.state.next_token.is_some()
    }

    /// Current lifecycle phase.
    #[must_use]
    pub fn phase(&self) -> PagerPhase {
        match (self.state.first_fetch, self.state.next_token.is_some()) {
            (true, _) => PagerPhase::Fresh,
            (false, true) => PagerPhase::Active,
            (false, false) => PagerPhase::Done,
        }
    }

    /// Cursor the next fetch will send, if any.
    #[must_use]
    pub fn next_token(&self) -> Option<&str> {
        self.state.next_token.as_deref()
    }

    /// The operation and base parameters this pager was built with.
    #[must_use]
    pub fn request(&self) -> &PageRequest {
        &self.request
    }

    /// The page layout this pager decodes.
    #[must_use]
    pub fn spec(&self) -> &PageSpec {
        &self.spec
    }

    /// Fetch the next page and return its items.
    ///
    /// # Errors
    ///
    /// - [`Error::PaginationExhausted`] if [`Pager::has_next`] is false; no
    ///   request is sent.
    /// - [`Error::OperationFailed`] if the invoker fails or the page cannot be
    ///   decoded. State is unchanged and the call may be retried.
    /// - [`Error::MalformedContinuationMarker`] under [`MarkerPolicy::Strict`].
    pub async fn next_page(&mut self) -> Result<Vec<T>> {
        self.next_page_with_marker().await.map(|page| page.items)
    }

    /// Fetch the next page, keeping the continuation marker alongside the
    /// items.
    ///
    /// # Errors
    ///
    /// Same as [`Pager::next_page`].
    pub async fn next_page_with_marker(&mut self) -> Result<Page<T>> {
        if !self.has_next() {
            return Err(Error::PaginationExhausted {
                operation: self.request.operation.clone(),
            });
        }

        let params = self.page_params();
        let response = self
            .invoker
            .invoke(&self.request.operation, &params)
            .await
            .map_err(|err| Error::operation_failed(&self.request.operation, err))?;

        let page = self.decode(response)?;

        self.state.first_fetch = false;
        self.state.next_token.clone_from(&page.next_marker);
        Ok(page)
    }

    /// Fetch every remaining page and concatenate the items in order.
    ///
    /// Returns an empty list when the pager is already done.
    ///
    /// # Errors
    ///
    /// Returns the first fetch error. Items of pages fetched before the error
    /// are dropped; drive [`Pager::next_page`] directly to keep them.
    pub async fn collect_all(&mut self) -> Result<Vec<T>> {
        let mut items = Vec::new();
        while self.has_next() {
            items.extend(self.next_page().await?);
        }
        Ok(items)
    }

    /// Convert into a stream yielding one item list per page.
    ///
    /// The stream ends after the last page or right after the first error.
    pub fn into_stream(self) -> impl Stream<Item = Result<Vec<T>>> {
        stream::unfold(Some(self), |pager| async move {
            let mut pager = pager?;
            if !pager.has_next() {
                return None;
            }
            match pager.next_page().await {
                Ok(items) => Some((Ok(items), Some(pager))),
                Err(err) => Some((Err(err), None)),
            }
        })
    }

    fn page_params(&self) -> RequestParams {
        let mut params = self.request.base_params.clone();
        params.push_opt(self.spec.cursor.param(), self.state.next_token.as_deref());
        params
    }

    fn decode(&self, response: RpcResponse) -> Result<Page<T>> {
        decode_page(
            &self.request.operation,
            &self.spec,
            self.state.next_token.as_deref(),
            response,
        )
    }
}

impl<T, I: ?Sized> fmt::Debug for Pager<T, I> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Pager")
            .field("request", &self.request)
            .field("spec", &self.spec)
            .field("next_token", &self.state.next_token)
            .field("first_fetch", &self.state.first_fetch)
            .finish_non_exhaustive()
    }
}

/// Decode one list response into a [`Page`].
///
/// `current` is the cursor the page was requested with. A missing or `null`
/// item field is an empty page.
///
/// # Errors
///
/// Returns [`Error::OperationFailed`] for a non-2xx status, a body that is not
/// an object, an item field that is not an array, or items that do not
/// deserialize into `T`. Returns [`Error::MalformedContinuationMarker`] when
/// the marker cannot be parsed under [`MarkerPolicy::Strict`].
pub fn decode_page<T>(
    operation: &str,
    spec: &PageSpec,
    current: Option<&str>,
    response: RpcResponse,
) -> Result<Page<T>>
where
    T: DeserializeOwned,
{
    let field = &spec.item_field;

    if !response.is_success() {
        return Err(Error::operation_failed(
            operation,
            Error::HttpError(format!("unexpected status {}", response.status)),
        ));
    }

    let mut body = response.body;
    if !body.is_object() {
        return Err(Error::operation_failed(
            operation,
            Error::ParseError(format!("response body is not an object: {body}")),
        ));
    }

    let raw_items = match body.get_mut(field).map(Value::take) {
        None | Some(Value::Null) => Vec::new(),
        Some(Value::Array(items)) => items,
        Some(other) => {
            return Err(Error::operation_failed(
                operation,
                Error::ParseError(format!("`{field}` is not an array: {other}")),
            ));
        }
    };

    let next_marker = match spec.cursor.next_marker(&body, current, raw_items.len()) {
        Ok(marker) => marker,
        Err(detail) => match spec.marker_policy {
            MarkerPolicy::Lenient => None,
            MarkerPolicy::Strict => {
                return Err(Error::MalformedContinuationMarker {
                    operation: operation.to_string(),
                    detail,
                });
            }
        },
    };

    let items = raw_items
        .into_iter()
        .map(serde_json::from_value)
        .collect::<std::result::Result<Vec<T>, _>>()
        .map_err(|err| Error::operation_failed(operation, Error::from(err)))?;

    Ok(Page { items, next_marker })
}
