//! Page-number pagination parameters for list endpoints.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Default number of rows per page in list views.
pub const DEFAULT_PAGE_SIZE: u32 = 10;

/// Error type for pagination parameters.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum PaginationError {
    #[error("Page must be 1 or greater")]
    InvalidPage,
    #[error("Invalid page size: {0}")]
    InvalidLimit(String),
}

/// Page size; `All` asks the backend to bypass pagination.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum PageLimit {
    Count(u32),
    All,
}

impl Default for PageLimit {
    fn default() -> Self {
        PageLimit::Count(DEFAULT_PAGE_SIZE)
    }
}

impl fmt::Display for PageLimit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PageLimit::Count(n) => write!(f, "{}", n),
            PageLimit::All => f.write_str("all"),
        }
    }
}

impl FromStr for PageLimit {
    type Err = PaginationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.eq_ignore_ascii_case("all") {
            return Ok(PageLimit::All);
        }
        match s.parse::<u32>() {
            Ok(n) if n > 0 => Ok(PageLimit::Count(n)),
            _ => Err(PaginationError::InvalidLimit(s.to_string())),
        }
    }
}

impl TryFrom<String> for PageLimit {
    type Error = PaginationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<PageLimit> for String {
    fn from(limit: PageLimit) -> Self {
        limit.to_string()
    }
}

/// A 1-based page request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    pub page: u32,
    pub limit: PageLimit,
}

impl Default for PageRequest {
    fn default() -> Self {
        Self {
            page: 1,
            limit: PageLimit::default(),
        }
    }
}

impl PageRequest {
    pub fn new(page: u32, limit: PageLimit) -> Result<Self, PaginationError> {
        if page == 0 {
            return Err(PaginationError::InvalidPage);
        }
        Ok(Self { page, limit })
    }

    /// Request for every row at once.
    pub fn all() -> Self {
        Self {
            page: 1,
            limit: PageLimit::All,
        }
    }

    /// Query-string pairs understood by the backend list endpoints.
    pub fn query_pairs(&self) -> Vec<(&'static str, String)> {
        vec![("page", self.page.to_string()), ("limit", self.limit.to_string())]
    }

    /// Clamps a page number reported back by the backend's `totalPages`.
    pub fn clamp_to(&self, total_pages: u32) -> Self {
        let last = total_pages.max(1);
        Self {
            page: self.page.min(last),
            limit: self.limit,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_limit_parsing() {
        assert_eq!("25".parse::<PageLimit>().unwrap(), PageLimit::Count(25));
        assert_eq!("ALL".parse::<PageLimit>().unwrap(), PageLimit::All);
        assert!("0".parse::<PageLimit>().is_err());
        assert!("many".parse::<PageLimit>().is_err());
    }

    #[test]
    fn test_limit_display() {
        assert_eq!(PageLimit::All.to_string(), "all");
        assert_eq!(PageLimit::default().to_string(), "10");
    }

    #[test]
    fn test_page_zero_rejected() {
        assert_eq!(
            PageRequest::new(0, PageLimit::All),
            Err(PaginationError::InvalidPage)
        );
    }

    #[test]
    fn test_query_pairs() {
        let req = PageRequest::new(3, PageLimit::Count(50)).unwrap();
        assert_eq!(
            req.query_pairs(),
            vec![("page", "3".to_string()), ("limit", "50".to_string())]
        );
        assert_eq!(PageRequest::all().query_pairs()[1].1, "all");
    }

    #[test]
    fn test_clamp_to_total_pages() {
        let req = PageRequest::new(7, PageLimit::default()).unwrap();
        assert_eq!(req.clamp_to(4).page, 4);
        assert_eq!(req.clamp_to(0).page, 1);
        assert_eq!(req.clamp_to(9).page, 7);
    }

    #[test]
    fn test_limit_serde() {
        let json = serde_json::to_string(&PageLimit::All).unwrap();
        assert_eq!(json, "\"all\"");
        let parsed: PageLimit = serde_json::from_str("\"20\"").unwrap();
        assert_eq!(parsed, PageLimit::Count(20));
    }
}
