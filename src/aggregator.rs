use std::collections::hash_map::Entry as MapEntry;
use std::collections::HashMap;
use std::sync::Arc;

use anyhow::Context;
use feed_rs::parser;
use thiserror::Error;
use tracing::{info, warn};

use crate::fetcher::{FetchBody, Fetcher};
use crate::normalize::{host, normalize, Item, RawItem};

#[derive(Debug, Error)]
pub enum AggregateError {
    #[error("all {feeds} feeds failed")]
    AllFeedsFailed { feeds: usize },
}

pub struct Aggregator {
    fetcher: Arc<Fetcher>,
}

impl Aggregator {
    pub fn new(fetcher: Arc<Fetcher>) -> Self {
        Self { fetcher }
    }

    /// Merge all configured feeds into one newest-first list.
    ///
    /// Each feed runs its own fetch/parse/normalize pipeline on its own
    /// task; all tasks are spawned before any is awaited. A failing feed
    /// contributes nothing and only fails the call when every feed of a
    /// non-empty list has failed.
    pub async fn aggregate(
        &self,
        feed_urls: &[String],
        limit: usize,
    ) -> Result<Vec<Item>, AggregateError> {
        if feed_urls.is_empty() {
            return Ok(Vec::new());
        }

        let mut handles = Vec::with_capacity(feed_urls.len());
        for url in feed_urls {
            let fetcher = self.fetcher.clone();
            let url = url.clone();
            handles.push(tokio::spawn(async move {
                let result = fetch_one(&fetcher, &url).await;
                (url, result)
            }));
        }

        let mut per_feed = Vec::with_capacity(handles.len());
        let mut failed = 0usize;
        for handle in handles {
            match handle.await {
                Ok((url, Ok(items))) => {
                    info!("Fetched {} items from {}", items.len(), url);
                    per_feed.push(items);
                }
                Ok((url, Err(e))) => {
                    warn!("Failed to fetch feed '{}': {:#}", url, e);
                    failed += 1;
                }
                Err(e) => {
                    warn!("Feed task failed to complete: {}", e);
                    failed += 1;
                }
            }
        }

        if per_feed.is_empty() {
            return Err(AggregateError::AllFeedsFailed { feeds: failed });
        }

        Ok(merge(per_feed, limit))
    }
}

/// Fetch, parse and normalize a single feed. A 304 answer yields an empty
/// item list.
async fn fetch_one(fetcher: &Fetcher, url: &str) -> anyhow::Result<Vec<Item>> {
    let body = match fetcher.fetch(url).await? {
        FetchBody::NotModified => return Ok(Vec::new()),
        FetchBody::Fresh(bytes) => bytes,
    };

    let parsed = parser::parse(&body[..]).context("parsing feed body")?;
    let raw_items: Vec<RawItem> = parsed.entries.into_iter().map(RawItem::from_entry).collect();

    Ok(normalize(raw_items, &host(url)))
}

/// Flatten the per-feed item lists, dedup by id keeping the freshest
/// duplicate, sort newest first and cap the result.
///
/// Truncation happens strictly after the sort so the cap can never drop a
/// newer item in favor of an older one from another feed. Items whose id is
/// empty carry no usable identity and are never collapsed into one slot.
pub fn merge(per_feed: Vec<Vec<Item>>, limit: usize) -> Vec<Item> {
    let mut by_id: HashMap<String, Item> = HashMap::new();
    let mut anonymous = Vec::new();

    for item in per_feed.into_iter().flatten() {
        if item.id.is_empty() {
            anonymous.push(item);
            continue;
        }
        match by_id.entry(item.id.clone()) {
            MapEntry::Occupied(mut slot) => {
                // Freshest duplicate wins; on an exact tie the one seen
                // last replaces the earlier one.
                if item.published_at >= slot.get().published_at {
                    slot.insert(item);
                }
            }
            MapEntry::Vacant(slot) => {
                slot.insert(item);
            }
        }
    }

    let mut merged: Vec<Item> = by_id.into_values().chain(anonymous).collect();
    merged.sort_by(|a, b| b.published_at.cmp(&a.published_at));
    merged.truncate(limit);
    merged
}
