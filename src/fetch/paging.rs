use std::fmt::Debug;

use super::FetchError;
use crate::models::{AddressGroup, RawTransfer};

/// One page of a paginated transfer listing.
#[derive(Debug)]
pub struct Page<C> {
    /// Inbound transfers on this page, already filtered.
    pub transfers: Vec<RawTransfer>,
    /// Where to continue from, or `None` when this was the last page.
    pub next: Option<C>,
}

impl<C> Page<C> {
    pub fn last(transfers: Vec<RawTransfer>) -> Self {
        Self {
            transfers,
            next: None,
        }
    }
}

/// A source that lists transfers one page at a time.
///
/// Implementations own only the shape of their continuation state; the loop
/// itself lives in [`fetch_all_pages`].
#[async_trait::async_trait]
pub trait PagedSource: Send + Sync {
    type Cursor: Debug + Send + Sync;

    fn network(&self) -> &str;

    /// Continuation state for the first request.
    fn first_cursor(&self) -> Self::Cursor;

    async fn fetch_page(
        &self,
        group: &AddressGroup,
        cursor: &Self::Cursor,
    ) -> Result<Page<Self::Cursor>, FetchError>;
}

/// Fetches pages strictly in sequence until the source reports no
/// continuation, accumulating every transfer.
pub async fn fetch_all_pages<S>(
    source: &S,
    group: &AddressGroup,
) -> Result<Vec<RawTransfer>, FetchError>
where
    S: PagedSource + ?Sized,
{
    let mut transfers = Vec::new();
    let mut cursor = source.first_cursor();
    let mut pages = 0usize;

    loop {
        tracing::debug!(
            network = source.network(),
            address = %group,
            ?cursor,
            "fetching transfer page"
        );
        let page = source.fetch_page(group, &cursor).await?;
        pages += 1;
        transfers.extend(page.transfers);

        match page.next {
            Some(next) => cursor = next,
            None => break,
        }
    }

    tracing::debug!(
        network = source.network(),
        address = %group,
        pages,
        transfers = transfers.len(),
        "fetched inbound transfers"
    );

    Ok(transfers)
}
