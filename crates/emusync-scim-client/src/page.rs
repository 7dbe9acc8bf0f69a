//! Cursor-based page iteration.
//!
//! A [`PageCursor`] issues one GET per page and buffers one parsed page at a
//! time. Its lifecycle is an explicit state machine: `Idle` (a next request
//! is known, nothing fetched), `Buffered` (one page cached, unconsumed),
//! `Exhausted` (no further request), and the terminal `Failed`. Contract
//! violations ("final response before exhaustion", "next with nothing
//! buffered") are detectable rather than latent.
//!
//! Two pagination styles share the one cursor: SCIM list responses link
//! pages through their own `startIndex`/`itemsPerPage`/`totalResults`
//! fields, while the seat listing announces its next page in the `Link`
//! response header. A cursor instance is confined to one logical iteration.

use std::sync::Arc;

use serde::de::DeserializeOwned;
use tracing::debug;
use url::Url;

use emusync_connector::error::{ConnectorError, ConnectorResult};

use crate::transport::{Method, RestRequest, RestResponse, Transport};

/// A typed page container.
pub trait Page: DeserializeOwned + Send {
    type Item: Send;

    /// Total number of items available on the server, as reported by this
    /// page.
    fn total(&self) -> u32;

    /// Consume the page into its item array.
    fn into_items(self) -> Vec<Self::Item>;
}

/// A page container that reports the server's own offset linkage.
pub trait OffsetPage: Page {
    /// Index of the first item on this page, as reported by the server.
    fn start_index(&self) -> u32;

    /// Number of items per page, as reported by the server.
    fn items_per_page(&self) -> u32;
}

/// Strategy for discovering the request that fetches the next page.
pub trait NextPage<P>: Send + Sync {
    /// Derive the next-page request, or `None` when this page is the last.
    fn next_request(
        &self,
        current: &RestRequest,
        response: &RestResponse,
        page: &P,
    ) -> ConnectorResult<Option<RestRequest>>;
}

/// Offset/count discovery: the next request advances `startIndex` to the
/// position the server itself reported, never to a client-side guess.
pub struct OffsetPaging;

impl<P: OffsetPage> NextPage<P> for OffsetPaging {
    fn next_request(
        &self,
        current: &RestRequest,
        _response: &RestResponse,
        page: &P,
    ) -> ConnectorResult<Option<RestRequest>> {
        let consumed = page.start_index().saturating_add(page.items_per_page());
        if page.items_per_page() == 0 || consumed >= page.total() {
            return Ok(None);
        }
        Ok(Some(
            current.clone().replacing_query("startIndex", consumed.to_string()),
        ))
    }
}

/// `Link`-header discovery: scan the response's comma-separated
/// `<url>; rel="relation"` entries for `rel="next"`.
pub struct LinkHeaderPaging;

impl<P> NextPage<P> for LinkHeaderPaging {
    fn next_request(
        &self,
        current: &RestRequest,
        response: &RestResponse,
        _page: &P,
    ) -> ConnectorResult<Option<RestRequest>> {
        let Some(link) = response.header("Link") else {
            return Ok(None);
        };
        let Some(raw) = find_rel_next(link) else {
            return Ok(None);
        };
        let url = Url::parse(raw).map_err(|e| ConnectorError::InvalidPageUrl {
            url: raw.to_string(),
            message: e.to_string(),
        })?;
        Ok(Some(current.derive_get(url)))
    }
}

/// Extract the URL tagged `rel="next"` from a `Link` header value.
fn find_rel_next(header: &str) -> Option<&str> {
    for entry in header.split(',') {
        let entry = entry.trim();
        let Some(rest) = entry.strip_prefix('<') else {
            continue;
        };
        let Some((url, params)) = rest.split_once('>') else {
            continue;
        };
        if params.contains("rel=\"next\"") {
            return Some(url);
        }
    }
    None
}

enum CursorState<P> {
    /// The next request is known; nothing is buffered.
    Idle { next: RestRequest },
    /// One parsed page is cached and unconsumed.
    Buffered {
        page: P,
        next: Option<RestRequest>,
        response: RestResponse,
    },
    /// No further request to issue; the final response is available.
    Exhausted { final_response: RestResponse },
    /// A fetch failed. Terminal.
    Failed,
}

/// Stateful one-page-at-a-time iterator over a paginated listing.
///
/// Not safe for concurrent use; confine one cursor to one iteration.
pub struct PageCursor<P: Page> {
    transport: Arc<dyn Transport>,
    pager: Box<dyn NextPage<P>>,
    state: CursorState<P>,
    first_total: Option<u32>,
}

impl<P: Page> std::fmt::Debug for PageCursor<P> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PageCursor")
            .field("first_total", &self.first_total)
            .finish_non_exhaustive()
    }
}

impl<P: Page> PageCursor<P> {
    /// Create a cursor with an explicit discovery strategy.
    ///
    /// Only GET requests are accepted: pagination is read-only by contract.
    /// A page size greater than zero adds the `count` parameter, and a page
    /// offset greater than zero additionally adds `startIndex`.
    pub fn with_pager(
        transport: Arc<dyn Transport>,
        request: RestRequest,
        pager: Box<dyn NextPage<P>>,
        page_size: u32,
        page_offset: u32,
    ) -> ConnectorResult<Self> {
        if request.method() != Method::Get {
            return Err(ConnectorError::cursor_misuse(
                "page cursors require a GET request",
            ));
        }
        let mut request = request;
        if page_size > 0 {
            request = request.replacing_query("count", page_size.to_string());
            if page_offset > 0 {
                request = request.replacing_query("startIndex", page_offset.to_string());
            }
        }
        Ok(Self {
            transport,
            pager,
            state: CursorState::Idle { next: request },
            first_total: None,
        })
    }

    /// Create an offset/count cursor.
    pub fn offset(
        transport: Arc<dyn Transport>,
        request: RestRequest,
        page_size: u32,
        page_offset: u32,
    ) -> ConnectorResult<Self>
    where
        P: OffsetPage,
    {
        Self::with_pager(transport, request, Box::new(OffsetPaging), page_size, page_offset)
    }

    /// Create a `Link`-header cursor.
    pub fn linked(
        transport: Arc<dyn Transport>,
        request: RestRequest,
        page_size: u32,
        page_offset: u32,
    ) -> ConnectorResult<Self> {
        Self::with_pager(
            transport,
            request,
            Box::new(LinkHeaderPaging),
            page_size,
            page_offset,
        )
    }

    /// Whether another page is available, fetching it if necessary.
    ///
    /// Issues at most one GET; a second call with a page already buffered
    /// fetches nothing.
    pub async fn has_next(&mut self) -> ConnectorResult<bool> {
        if matches!(self.state, CursorState::Idle { .. }) {
            self.fetch().await?;
        }
        match &self.state {
            CursorState::Buffered { .. } => Ok(true),
            CursorState::Exhausted { .. } => Ok(false),
            CursorState::Failed => Err(ConnectorError::cursor_misuse(
                "cursor already failed; create a new cursor to retry",
            )),
            CursorState::Idle { .. } => unreachable!("fetch always leaves Idle"),
        }
    }

    /// Consume the buffered page's item array.
    ///
    /// Calling this with nothing buffered and nothing left to fetch is a
    /// usage error.
    pub async fn next_page(&mut self) -> ConnectorResult<Vec<P::Item>> {
        if matches!(self.state, CursorState::Idle { .. }) {
            self.fetch().await?;
        }
        match std::mem::replace(&mut self.state, CursorState::Failed) {
            CursorState::Buffered {
                page,
                next,
                response,
            } => {
                self.state = match next {
                    Some(next) => CursorState::Idle { next },
                    None => CursorState::Exhausted {
                        final_response: response,
                    },
                };
                Ok(page.into_items())
            }
            exhausted @ CursorState::Exhausted { .. } => {
                self.state = exhausted;
                Err(ConnectorError::cursor_misuse(
                    "no page buffered; the cursor is exhausted",
                ))
            }
            CursorState::Failed => Err(ConnectorError::cursor_misuse(
                "cursor already failed; create a new cursor to retry",
            )),
            CursorState::Idle { .. } => unreachable!("fetch always leaves Idle"),
        }
    }

    /// The response that carried the last page, with its pagination totals.
    ///
    /// Requesting it before the cursor is exhausted is a usage error, not a
    /// data error.
    pub fn final_response(&self) -> ConnectorResult<&RestResponse> {
        match &self.state {
            CursorState::Exhausted { final_response } => Ok(final_response),
            _ => Err(ConnectorError::cursor_misuse(
                "final response is not available until the cursor is exhausted",
            )),
        }
    }

    /// The total reported by the first fetched page, if any page was fetched.
    pub fn first_total(&self) -> Option<u32> {
        self.first_total
    }

    async fn fetch(&mut self) -> ConnectorResult<()> {
        let CursorState::Idle { next } = std::mem::replace(&mut self.state, CursorState::Failed)
        else {
            return Ok(());
        };

        debug!(url = %next.url(), "fetching page");
        let response = self.transport.send(&next).await?.error_for_status()?;
        let page: P = response.parse()?;
        if self.first_total.is_none() {
            self.first_total = Some(page.total());
        }
        let next_request = self.pager.next_request(&next, &response, &page)?;
        self.state = CursorState::Buffered {
            page,
            next: next_request,
            response,
        };
        Ok(())
    }
}

/// Iterate a cursor, flattening pages into a per-item callback.
///
/// The callback returns whether to continue; iteration also stops once
/// `item_budget` items have been delivered (zero means unbounded). The
/// returned total is the first page's total even when iteration stops
/// early.
pub async fn drain<P, F>(
    cursor: &mut PageCursor<P>,
    item_budget: u32,
    mut on_item: F,
) -> ConnectorResult<u32>
where
    P: Page,
    F: FnMut(P::Item) -> bool,
{
    let mut delivered: u32 = 0;
    'pages: while (item_budget == 0 || delivered < item_budget) && cursor.has_next().await? {
        for item in cursor.next_page().await? {
            if item_budget > 0 && delivered >= item_budget {
                break 'pages;
            }
            delivered += 1;
            if !on_item(item) {
                break 'pages;
            }
        }
    }
    Ok(cursor.first_total().unwrap_or(0))
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use serde::Deserialize;
    use std::sync::Mutex;

    #[derive(Debug, Deserialize)]
    struct TestPage {
        total: u32,
        start: u32,
        per_page: u32,
        items: Vec<u32>,
    }

    impl Page for TestPage {
        type Item = u32;

        fn total(&self) -> u32 {
            self.total
        }

        fn into_items(self) -> Vec<u32> {
            self.items
        }
    }

    impl OffsetPage for TestPage {
        fn start_index(&self) -> u32 {
            self.start
        }

        fn items_per_page(&self) -> u32 {
            self.per_page
        }
    }

    struct ScriptedTransport {
        responses: Mutex<Vec<RestResponse>>,
        requests: Mutex<Vec<RestRequest>>,
    }

    impl ScriptedTransport {
        fn new(responses: Vec<RestResponse>) -> Arc<Self> {
            Arc::new(Self {
                responses: Mutex::new(responses),
                requests: Mutex::new(Vec::new()),
            })
        }

        fn recorded(&self) -> Vec<RestRequest> {
            self.requests.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl Transport for ScriptedTransport {
        async fn send(&self, request: &RestRequest) -> ConnectorResult<RestResponse> {
            self.requests.lock().unwrap().push(request.clone());
            let mut responses = self.responses.lock().unwrap();
            if responses.is_empty() {
                return Err(ConnectorError::io("no scripted response left"));
            }
            Ok(responses.remove(0))
        }
    }

    fn page_json(total: u32, start: u32, per_page: u32, items: &[u32]) -> Vec<u8> {
        serde_json::to_vec(&serde_json::json!({
            "total": total,
            "start": start,
            "per_page": per_page,
            "items": items,
        }))
        .unwrap()
    }

    fn ok(body: Vec<u8>) -> RestResponse {
        RestResponse::new(200, Vec::new(), body)
    }

    fn ok_with_link(body: Vec<u8>, link: &str) -> RestResponse {
        RestResponse::new(200, vec![("Link".into(), link.into())], body)
    }

    fn base_request() -> RestRequest {
        RestRequest::get(Url::parse("https://api.example.com/items").unwrap())
    }

    #[test]
    fn test_offset_zero_adds_no_start_index() {
        let transport = ScriptedTransport::new(Vec::new());
        let cursor: PageCursor<TestPage> =
            PageCursor::offset(transport, base_request(), 10, 0).unwrap();
        let CursorState::Idle { next } = &cursor.state else {
            panic!("expected Idle");
        };
        assert_eq!(next.query_value("count"), Some("10"));
        assert_eq!(next.query_value("startIndex"), None);
    }

    #[test]
    fn test_offset_greater_than_zero_adds_start_index() {
        let transport = ScriptedTransport::new(Vec::new());
        let cursor: PageCursor<TestPage> =
            PageCursor::offset(transport, base_request(), 10, 5).unwrap();
        let CursorState::Idle { next } = &cursor.state else {
            panic!("expected Idle");
        };
        assert_eq!(next.query_value("count"), Some("10"));
        assert_eq!(next.query_value("startIndex"), Some("5"));
    }

    #[test]
    fn test_non_get_request_is_rejected() {
        let transport = ScriptedTransport::new(Vec::new());
        let request = RestRequest::new(Method::Post, Url::parse("https://x.example/items").unwrap());
        let result: ConnectorResult<PageCursor<TestPage>> =
            PageCursor::offset(transport, request, 10, 0);
        assert!(matches!(
            result.unwrap_err(),
            ConnectorError::CursorMisuse { .. }
        ));
    }

    #[tokio::test]
    async fn test_offset_cursor_walks_server_reported_linkage() {
        let transport = ScriptedTransport::new(vec![
            ok(page_json(5, 0, 2, &[1, 2])),
            ok(page_json(5, 2, 2, &[3, 4])),
            ok(page_json(5, 4, 2, &[5])),
        ]);
        let mut cursor: PageCursor<TestPage> =
            PageCursor::offset(transport.clone(), base_request(), 2, 0).unwrap();

        let mut items = Vec::new();
        while cursor.has_next().await.unwrap() {
            items.extend(cursor.next_page().await.unwrap());
        }
        assert_eq!(items, vec![1, 2, 3, 4, 5]);

        // Requests advanced startIndex exactly as the server reported.
        let recorded = transport.recorded();
        assert_eq!(recorded.len(), 3);
        assert_eq!(recorded[0].query_value("startIndex"), None);
        assert_eq!(recorded[1].query_value("startIndex"), Some("2"));
        assert_eq!(recorded[2].query_value("startIndex"), Some("4"));
    }

    #[tokio::test]
    async fn test_has_next_buffers_without_refetching() {
        let transport = ScriptedTransport::new(vec![ok(page_json(1, 1, 1, &[7]))]);
        let mut cursor: PageCursor<TestPage> =
            PageCursor::offset(transport.clone(), base_request(), 0, 0).unwrap();

        assert!(cursor.has_next().await.unwrap());
        assert!(cursor.has_next().await.unwrap());
        assert_eq!(transport.recorded().len(), 1);

        assert_eq!(cursor.next_page().await.unwrap(), vec![7]);
        assert!(!cursor.has_next().await.unwrap());
    }

    #[tokio::test]
    async fn test_final_response_before_exhaustion_is_a_usage_error() {
        let transport = ScriptedTransport::new(vec![
            ok(page_json(4, 1, 2, &[1, 2])),
            ok(page_json(4, 3, 2, &[3, 4])),
        ]);
        let mut cursor: PageCursor<TestPage> =
            PageCursor::offset(transport, base_request(), 2, 0).unwrap();

        assert!(cursor.has_next().await.unwrap());
        assert!(matches!(
            cursor.final_response().unwrap_err(),
            ConnectorError::CursorMisuse { .. }
        ));

        cursor.next_page().await.unwrap();
        cursor.next_page().await.unwrap();
        assert!(!cursor.has_next().await.unwrap());
        assert_eq!(cursor.final_response().unwrap().status(), 200);
    }

    #[tokio::test]
    async fn test_next_after_exhaustion_is_a_usage_error() {
        let transport = ScriptedTransport::new(vec![ok(page_json(1, 1, 1, &[9]))]);
        let mut cursor: PageCursor<TestPage> =
            PageCursor::offset(transport, base_request(), 0, 0).unwrap();

        assert_eq!(cursor.next_page().await.unwrap(), vec![9]);
        let err = cursor.next_page().await.unwrap_err();
        assert!(matches!(err, ConnectorError::CursorMisuse { .. }));
    }

    #[tokio::test]
    async fn test_fetch_failure_is_terminal() {
        let transport = ScriptedTransport::new(vec![RestResponse::new(
            503,
            Vec::new(),
            b"down".to_vec(),
        )]);
        let mut cursor: PageCursor<TestPage> =
            PageCursor::offset(transport, base_request(), 0, 0).unwrap();

        assert!(cursor.has_next().await.is_err());
        // Terminal: subsequent calls keep failing as usage errors.
        assert!(matches!(
            cursor.has_next().await.unwrap_err(),
            ConnectorError::CursorMisuse { .. }
        ));
    }

    #[tokio::test]
    async fn test_link_cursor_follows_rel_next() {
        let transport = ScriptedTransport::new(vec![
            ok_with_link(
                page_json(3, 0, 0, &[1, 2]),
                "<https://api.example.com/items?page=2>; rel=\"next\", <https://api.example.com/items?page=9>; rel=\"last\"",
            ),
            ok(page_json(3, 0, 0, &[3])),
        ]);
        let mut cursor: PageCursor<TestPage> =
            PageCursor::linked(transport.clone(), base_request(), 0, 0).unwrap();

        let mut items = Vec::new();
        while cursor.has_next().await.unwrap() {
            items.extend(cursor.next_page().await.unwrap());
        }
        assert_eq!(items, vec![1, 2, 3]);

        let recorded = transport.recorded();
        assert_eq!(recorded[1].url().query(), Some("page=2"));
    }

    #[tokio::test]
    async fn test_link_header_without_next_ends_iteration() {
        let transport = ScriptedTransport::new(vec![ok_with_link(
            page_json(2, 0, 0, &[1, 2]),
            "<https://api.example.com/items?page=1>; rel=\"last\"",
        )]);
        let mut cursor: PageCursor<TestPage> =
            PageCursor::linked(transport, base_request(), 0, 0).unwrap();

        assert_eq!(cursor.next_page().await.unwrap(), vec![1, 2]);
        assert!(!cursor.has_next().await.unwrap());
    }

    #[tokio::test]
    async fn test_malformed_next_url_is_a_fatal_configuration_error() {
        let transport = ScriptedTransport::new(vec![ok_with_link(
            page_json(2, 0, 0, &[1]),
            "<not a url>; rel=\"next\"",
        )]);
        let mut cursor: PageCursor<TestPage> =
            PageCursor::linked(transport, base_request(), 0, 0).unwrap();

        let err = cursor.has_next().await.unwrap_err();
        assert!(matches!(err, ConnectorError::InvalidPageUrl { .. }));
    }

    #[tokio::test]
    async fn test_drain_delivers_every_item_and_first_page_total() {
        let transport = ScriptedTransport::new(vec![
            ok(page_json(5, 1, 3, &[1, 2, 3])),
            ok(page_json(5, 4, 3, &[4, 5])),
        ]);
        let mut cursor: PageCursor<TestPage> =
            PageCursor::offset(transport, base_request(), 3, 0).unwrap();

        let mut seen = Vec::new();
        let total = drain(&mut cursor, 0, |item| {
            seen.push(item);
            true
        })
        .await
        .unwrap();

        assert_eq!(seen, vec![1, 2, 3, 4, 5]);
        assert_eq!(total, 5);
    }

    #[tokio::test]
    async fn test_drain_stops_when_the_callback_says_so() {
        let transport = ScriptedTransport::new(vec![
            ok(page_json(50, 1, 3, &[1, 2, 3])),
            ok(page_json(50, 4, 3, &[4, 5, 6])),
        ]);
        let mut cursor: PageCursor<TestPage> =
            PageCursor::offset(transport.clone(), base_request(), 3, 0).unwrap();

        let mut seen = Vec::new();
        let total = drain(&mut cursor, 0, |item| {
            seen.push(item);
            item < 2
        })
        .await
        .unwrap();

        // Delivered exactly k items, reported the first page's total, and
        // never fetched the second page.
        assert_eq!(seen, vec![1, 2]);
        assert_eq!(total, 50);
        assert_eq!(transport.recorded().len(), 1);
    }

    #[tokio::test]
    async fn test_drain_honors_the_item_budget() {
        let transport = ScriptedTransport::new(vec![
            ok(page_json(9, 1, 2, &[1, 2])),
            ok(page_json(9, 3, 2, &[3, 4])),
        ]);
        let mut cursor: PageCursor<TestPage> =
            PageCursor::offset(transport, base_request(), 2, 1).unwrap();

        let mut seen = Vec::new();
        let total = drain(&mut cursor, 2, |item| {
            seen.push(item);
            true
        })
        .await
        .unwrap();

        assert_eq!(seen, vec![1, 2]);
        assert_eq!(total, 9);
    }

    #[test]
    fn test_find_rel_next_parses_comma_separated_relations() {
        let header = "<https://a.example/?page=2>; rel=\"next\", <https://a.example/?page=7>; rel=\"last\"";
        assert_eq!(find_rel_next(header), Some("https://a.example/?page=2"));

        assert_eq!(find_rel_next("<https://a.example/?page=7>; rel=\"last\""), None);
        assert_eq!(find_rel_next(""), None);
    }
}
