pub mod identity;
pub mod listings;
pub mod media;

use axum::http::StatusCode;
use serde::Serialize;

/// Category attached to every workflow failure. Routers derive the response
/// status from the category, so handlers never match individual variants.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Fault {
    Validation,
    Unauthorized,
    Forbidden,
    NotFound,
    Conflict,
    Upstream,
}

impl Fault {
    pub const fn status(self) -> StatusCode {
        match self {
            Fault::Validation => StatusCode::BAD_REQUEST,
            Fault::Unauthorized => StatusCode::UNAUTHORIZED,
            Fault::Forbidden => StatusCode::FORBIDDEN,
            Fault::NotFound => StatusCode::NOT_FOUND,
            Fault::Conflict => StatusCode::CONFLICT,
            Fault::Upstream => StatusCode::BAD_GATEWAY,
        }
    }
}

/// One-based page request used by the listing and directory queries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Page {
    pub number: usize,
    pub size: usize,
}

impl Page {
    pub fn of_size(number: Option<usize>, size: usize) -> Self {
        Self {
            number: number.unwrap_or(1).max(1),
            size: size.max(1),
        }
    }
}

impl Default for Page {
    fn default() -> Self {
        Self {
            number: 1,
            size: 10,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PageOf<T> {
    pub items: Vec<T>,
    pub total: usize,
    pub page: usize,
    pub total_pages: usize,
}

impl<T> PageOf<T> {
    /// Slices an already-ordered result set down to the requested page.
    pub fn slice(all: Vec<T>, page: Page) -> Self {
        let total = all.len();
        let total_pages = total.div_ceil(page.size).max(1);
        let start = page.number.saturating_sub(1) * page.size;
        let items = all.into_iter().skip(start).take(page.size).collect();
        Self {
            items,
            total,
            page: page.number,
            total_pages,
        }
    }

    /// Projects the items while keeping the page arithmetic intact.
    pub fn map<U>(self, project: impl FnMut(T) -> U) -> PageOf<U> {
        PageOf {
            items: self.items.into_iter().map(project).collect(),
            total: self.total,
            page: self.page,
            total_pages: self.total_pages,
        }
    }
}
