//! Article filter criteria and pagination.
//!
//! Fields are private so the pagination invariant holds: every filter
//! setter puts the offset back to zero, and only [`FilterCriteria::next_page`]
//! / [`FilterCriteria::previous_page`] move it.

use chrono::NaiveDate;

use crate::api::ArticleQuery;

pub const MIN_PAGE_SIZE: u32 = 5;
pub const MAX_PAGE_SIZE: u32 = 100;
pub const PAGE_SIZE_STEP: u32 = 5;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilterCriteria {
    source_id: Option<i64>,
    tag_id: Option<i64>,
    date_from: Option<NaiveDate>,
    date_to: Option<NaiveDate>,
    limit: u32,
    offset: u32,
}

impl FilterCriteria {
    pub fn new(page_size: u32) -> Self {
        Self {
            source_id: None,
            tag_id: None,
            date_from: None,
            date_to: None,
            limit: clamp_page_size(page_size),
            offset: 0,
        }
    }

    pub fn source_id(&self) -> Option<i64> {
        self.source_id
    }

    pub fn tag_id(&self) -> Option<i64> {
        self.tag_id
    }

    pub fn date_from(&self) -> Option<NaiveDate> {
        self.date_from
    }

    pub fn date_to(&self) -> Option<NaiveDate> {
        self.date_to
    }

    pub fn limit(&self) -> u32 {
        self.limit
    }

    pub fn offset(&self) -> u32 {
        self.offset
    }

    /// 1-based page number for display.
    pub fn page(&self) -> u32 {
        self.offset / self.limit + 1
    }

    // -- filter fields (each resets the offset) ------------------------------

    pub fn set_source(&mut self, source_id: Option<i64>) {
        self.source_id = source_id;
        self.offset = 0;
    }

    pub fn set_tag(&mut self, tag_id: Option<i64>) {
        self.tag_id = tag_id;
        self.offset = 0;
    }

    pub fn set_date_from(&mut self, date: Option<NaiveDate>) {
        self.date_from = date;
        self.offset = 0;
    }

    pub fn set_date_to(&mut self, date: Option<NaiveDate>) {
        self.date_to = date;
        self.offset = 0;
    }

    pub fn set_page_size(&mut self, limit: u32) {
        self.limit = clamp_page_size(limit);
        self.offset = 0;
    }

    pub fn grow_page(&mut self) {
        self.set_page_size(self.limit.saturating_add(PAGE_SIZE_STEP));
    }

    pub fn shrink_page(&mut self) {
        self.set_page_size(self.limit.saturating_sub(PAGE_SIZE_STEP));
    }

    /// Drop every narrowing filter, keeping the page size.
    pub fn clear(&mut self) {
        self.source_id = None;
        self.tag_id = None;
        self.date_from = None;
        self.date_to = None;
        self.offset = 0;
    }

    pub fn is_filtered(&self) -> bool {
        self.source_id.is_some()
            || self.tag_id.is_some()
            || self.date_from.is_some()
            || self.date_to.is_some()
    }

    // -- pagination ----------------------------------------------------------

    pub fn next_page(&mut self) {
        self.offset = self.offset.saturating_add(self.limit);
    }

    /// Returns `false` when already on the first page.
    pub fn previous_page(&mut self) -> bool {
        if self.offset == 0 {
            return false;
        }
        self.offset = self.offset.saturating_sub(self.limit);
        true
    }

    pub fn to_query(&self) -> ArticleQuery {
        ArticleQuery {
            source_id: self.source_id,
            tag_id: self.tag_id,
            date_from: self.date_from,
            date_to: self.date_to,
            limit: self.limit,
            offset: self.offset,
        }
    }
}

fn clamp_page_size(limit: u32) -> u32 {
    limit.clamp(MIN_PAGE_SIZE, MAX_PAGE_SIZE)
}

/// Which date bound a [`DatePrompt`] edits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DateBound {
    From,
    To,
}

impl DateBound {
    pub fn label(self) -> &'static str {
        match self {
            Self::From => "Published from",
            Self::To => "Published until",
        }
    }
}

/// Single-line input for a date bound.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DatePrompt {
    pub bound: DateBound,
    pub input: String,
    pub error: Option<String>,
}

impl DatePrompt {
    pub fn new(bound: DateBound, current: Option<NaiveDate>) -> Self {
        Self {
            bound,
            input: current
                .map(|d| d.format("%Y-%m-%d").to_string())
                .unwrap_or_default(),
            error: None,
        }
    }

    /// Blank input clears the bound.
    pub fn parse(&self) -> Result<Option<NaiveDate>, String> {
        let raw = self.input.trim();
        if raw.is_empty() {
            return Ok(None);
        }
        NaiveDate::parse_from_str(raw, "%Y-%m-%d")
            .map(Some)
            .map_err(|_| "Use YYYY-MM-DD".to_string())
    }
}
