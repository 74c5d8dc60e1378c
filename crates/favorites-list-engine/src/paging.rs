//! Visibility filtering and pagination of a document for readers.

use favorites_model::Entry;
use serde::Serialize;
use url::Url;

/// Reader-supplied list parameters. Values are taken as given and clamped.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ListQuery {
    pub hidden: Option<bool>,
    pub page: Option<i64>,
    pub page_size: Option<i64>,
}

/// One page of entries with cursor links.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Page {
    pub entries: Vec<Entry>,
    pub total_results: usize,
    pub page: usize,
    #[serde(rename = "ps")]
    pub page_size: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub previous: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub next: Option<String>,
}

#[derive(Debug, Clone)]
pub struct PagingView {
    base_url: Url,
    default_page_size: usize,
    max_page_size: usize,
}

impl PagingView {
    pub fn new(base_url: Url, default_page_size: usize, max_page_size: usize) -> Self {
        Self {
            base_url,
            default_page_size,
            max_page_size,
        }
    }

    /// Keep entries whose `hidden` flag equals `hidden`; no filter when unset.
    pub fn filter_by_visibility(entries: &[Entry], hidden: Option<bool>) -> Vec<Entry> {
        match hidden {
            None => entries.to_vec(),
            Some(hidden) => entries
                .iter()
                .filter(|e| e.metadata.hidden == hidden)
                .cloned()
                .collect(),
        }
    }

    /// Slice an already filtered list.
    pub fn paginate(&self, entries: Vec<Entry>, query: &ListQuery) -> Page {
        let page = query.page.unwrap_or(1).max(1) as usize;
        let max = self.max_page_size as i64;
        let page_size = query
            .page_size
            .map(|ps| ps.clamp(0, max) as usize)
            .unwrap_or(self.default_page_size.min(self.max_page_size));

        let total_results = entries.len();
        let start = (page - 1).saturating_mul(page_size);
        let entries: Vec<Entry> = entries.into_iter().skip(start).take(page_size).collect();

        // No cursor links without a page size or anything to page through.
        let linkable = page_size > 0 && total_results > 0;
        let previous = (linkable && page > 1).then(|| self.link(page - 1, page_size, query.hidden));
        let next = (linkable && page.saturating_mul(page_size) < total_results)
            .then(|| self.link(page + 1, page_size, query.hidden));

        Page {
            entries,
            total_results,
            page,
            page_size,
            previous,
            next,
        }
    }

    /// Filter then paginate.
    pub fn view(&self, entries: &[Entry], query: &ListQuery) -> Page {
        self.paginate(Self::filter_by_visibility(entries, query.hidden), query)
    }

    fn link(&self, page: usize, page_size: usize, hidden: Option<bool>) -> String {
        let mut url = self.base_url.clone();
        {
            let mut pairs = url.query_pairs_mut();
            pairs
                .append_pair("page", &page.to_string())
                .append_pair("ps", &page_size.to_string());
            if let Some(hidden) = hidden {
                pairs.append_pair("hidden", &hidden.to_string());
            }
        }
        url.to_string()
    }
}
