//! Paginated, searchable catalog of an owner's documents.

use serde::Serialize;

use super::{DokeepService, OwnerId};
use crate::db::{Document, DocumentFilter, SearchField};
use crate::error::ServiceResult;

pub const PAGE_SIZE: u64 = 10;

/// Parse a 1-based page number. Missing, non-numeric and non-positive
/// values all mean page 1.
pub fn parse_page(raw: Option<&str>) -> u64 {
    raw.and_then(|p| p.trim().parse::<i64>().ok())
        .filter(|p| *p >= 1)
        .map(|p| p as u64)
        .unwrap_or(1)
}

pub fn total_pages(total_documents: u64) -> u64 {
    total_documents.div_ceil(PAGE_SIZE)
}

/// Catalog request parameters
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CatalogQuery {
    /// Free text; blank lists everything
    pub query: String,
    pub page: u64,
}

impl CatalogQuery {
    pub fn new(query: Option<&str>, page: Option<&str>) -> Self {
        Self {
            query: query.map(str::trim).unwrap_or_default().to_string(),
            page: parse_page(page),
        }
    }
}

/// One catalog page with its pagination counts
#[derive(Debug, Clone, Serialize)]
pub struct CatalogPage {
    pub documents: Vec<Document>,
    pub total_documents: u64,
    pub page: u64,
    pub total_pages: u64,
    pub query: String,
}

impl DokeepService {
    pub fn list_documents(&self, owner: &OwnerId, query: &CatalogQuery) -> ServiceResult<CatalogPage> {
        let page = query.page.max(1);
        let filter =
            DocumentFilter::for_owner(owner.as_str()).matching_any(&SearchField::ALL, &query.query);

        let offset = (page - 1).saturating_mul(PAGE_SIZE);
        let (documents, total_documents) = self.db.search_documents(&filter, PAGE_SIZE, offset)?;

        Ok(CatalogPage {
            documents,
            total_documents,
            page,
            total_pages: total_pages(total_documents),
            query: query.query.clone(),
        })
    }
}
