//! All-or-nothing fan-out of the extractor over a page catalog.

use std::sync::Arc;

use futures::{StreamExt, TryStreamExt, stream};
use tracing::{info, instrument, warn};

use sitechat_shared::{ContentBundle, ContentDocument, PageCatalog, Result, SiteChatError};

use crate::extract::ContentExtractor;

/// Runs the extractor once per catalog entry and merges the results.
///
/// At most `concurrency` fetches are in flight. The first failure to
/// complete is returned at once and every outstanding fetch is dropped; a
/// partial bundle is never returned. With a bound of 1 pages are fetched
/// strictly in catalog order, so that failure is also the first in catalog
/// order. Successful bundles are always assembled in catalog order.
#[derive(Clone)]
pub struct ContentAggregator {
    extractor: Arc<dyn ContentExtractor>,
    concurrency: usize,
}

impl ContentAggregator {
    /// `concurrency` of 0 is treated as 1.
    pub fn new(extractor: Arc<dyn ContentExtractor>, concurrency: usize) -> Self {
        Self {
            extractor,
            concurrency: concurrency.max(1),
        }
    }

    pub fn concurrency(&self) -> usize {
        self.concurrency
    }

    #[instrument(skip_all, fields(pages = catalog.len(), concurrency = self.concurrency))]
    pub async fn collect(&self, catalog: &PageCatalog) -> Result<ContentBundle> {
        let mut pages: Vec<(usize, String, ContentDocument)> =
            stream::iter(catalog.iter().cloned().enumerate())
                .map(|(index, entry)| {
                    let extractor = Arc::clone(&self.extractor);
                    async move {
                        let doc = extractor.extract(&entry.url).await.inspect_err(|e| {
                            warn!(page = %entry.name, url = %entry.url, error = %e, "page extraction failed");
                        })?;
                        Ok::<_, SiteChatError>((index, entry.name, doc))
                    }
                })
                .buffer_unordered(self.concurrency)
                .try_collect()
                .await?;

        pages.sort_unstable_by_key(|(index, _, _)| *index);

        info!(pages = pages.len(), "content bundle assembled");
        Ok(pages.into_iter().map(|(_, name, doc)| (name, doc)).collect())
    }
}
