//! Lazily fetched page streams.
//!
//! Page `n` is requested only when the consumer polls for it, with a fresh `GET`
//! carrying the page number as a query parameter. The caller decides from each
//! decoded page whether another one follows.

use futures_util::stream::{self, Stream};
use reqwest::Method;
use tracing::debug;

use crate::auth::AuthStrategy;
use crate::codec::PayloadCodec;
use crate::error::Result;
use crate::request::RequestOptions;
use crate::session::Session;

/// Default name of the page number query parameter.
pub const DEFAULT_PAGE_PARAM: &str = "page";

/// Description of a paginated collection.
#[derive(Debug, Clone)]
pub struct PageQuery {
    /// Collection path
    pub path: String,
    /// Options applied to every page request
    pub options: RequestOptions,
    /// Name of the page number query parameter
    pub page_param: &'static str,
    /// Number of the first page
    pub first_page: u32,
}

impl PageQuery {
    /// Query `path` starting at page 1 with the `page` parameter.
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            options: RequestOptions::default(),
            page_param: DEFAULT_PAGE_PARAM,
            first_page: 1,
        }
    }

    /// Set the options applied to every page request.
    #[must_use]
    pub fn with_options(mut self, options: RequestOptions) -> Self {
        self.options = options;
        self
    }

    /// Set the page number parameter name.
    #[must_use]
    pub const fn with_page_param(mut self, name: &'static str) -> Self {
        self.page_param = name;
        self
    }

    /// Set the first page number.
    #[must_use]
    pub const fn starting_at(mut self, page: u32) -> Self {
        self.first_page = page;
        self
    }
}

struct PageCursor<'s, A: AuthStrategy, C: PayloadCodec, F, E> {
    session: &'s Session<A, C>,
    query: PageQuery,
    has_next: F,
    is_empty: E,
    next_page: Option<u32>,
}

impl<A: AuthStrategy, C: PayloadCodec> Session<A, C> {
    /// Stream the pages of a collection.
    ///
    /// The stream ends after a page for which `has_next` returns false, or at the
    /// first page that comes back empty or with an unacceptable status (that page
    /// is not yielded). An error is yielded once and ends the stream.
    pub fn pages<'s, F>(
        &'s self,
        query: PageQuery,
        has_next: F,
    ) -> impl Stream<Item = Result<C::Value>> + 's
    where
        F: Fn(&C::Value) -> bool + 's,
    {
        self.pages_with(query, has_next, |_: &C::Value| false)
    }

    /// Like [`Session::pages`], with `is_empty` deciding which decoded pages count
    /// as empty. The first empty page ends the stream and is not yielded.
    pub fn pages_with<'s, F, E>(
        &'s self,
        query: PageQuery,
        has_next: F,
        is_empty: E,
    ) -> impl Stream<Item = Result<C::Value>> + 's
    where
        F: Fn(&C::Value) -> bool + 's,
        E: Fn(&C::Value) -> bool + 's,
    {
        let cursor = PageCursor {
            session: self,
            next_page: Some(query.first_page),
            query,
            has_next,
            is_empty,
        };

        stream::try_unfold(cursor, PageCursor::advance)
    }
}

impl<'s, A, C, F, E> PageCursor<'s, A, C, F, E>
where
    A: AuthStrategy,
    C: PayloadCodec,
    F: Fn(&C::Value) -> bool,
    E: Fn(&C::Value) -> bool,
{
    async fn advance(mut self) -> Result<Option<(C::Value, Self)>> {
        let Some(page) = self.next_page else {
            return Ok(None);
        };

        let mut options = self.query.options.clone();
        options.query.set(self.query.page_param, page);

        let response = self
            .session
            .request(Method::GET, &self.query.path, None, &options)
            .await?;

        let Some(value) = response.into_value().filter(|value| !(self.is_empty)(value)) else {
            debug!(path = %self.query.path, page, "page without data, ending pagination");
            return Ok(None);
        };

        self.next_page = if (self.has_next)(&value) {
            Some(page.saturating_add(1))
        } else {
            None
        };
        Ok(Some((value, self)))
    }
}
