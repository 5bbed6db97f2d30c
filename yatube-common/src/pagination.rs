//! Splitting ordered result sets into fixed-size pages.
//!
//! Page numbers are 1-based. A missing or non-numeric page number selects the
//! first page, and numbers outside the valid range are clamped to the nearest
//! existing page, so every request resolves to some page.

use serde::Serialize;
use std::num::{IntErrorKind, NonZeroU32};

pub const POSTS_PER_PAGE: NonZeroU32 = NonZeroU32::new(10).unwrap();

#[derive(Copy, Clone, Eq, PartialEq, Debug, Hash)]
pub struct Paginator {
    count: u64,
    per_page: NonZeroU32,
}

/// The `LIMIT`/`OFFSET` pair selecting one page.
#[derive(Copy, Clone, Eq, PartialEq, Debug, Hash)]
pub struct PageWindow {
    pub offset: u64,
    pub limit: u32,
}

#[derive(Clone, Eq, PartialEq, Debug, Hash, Serialize)]
pub struct Page<T> {
    pub object_list: Vec<T>,
    pub number: u64,
    pub num_pages: u64,
    pub count: u64,
    pub has_next: bool,
    pub has_previous: bool,
    pub next_page_number: Option<u64>,
    pub previous_page_number: Option<u64>,
}

impl Paginator {
    #[must_use]
    pub fn new(count: u64, per_page: NonZeroU32) -> Self {
        Self { count, per_page }
    }

    /// An empty result set still has one (empty) page.
    #[must_use]
    pub fn num_pages(self) -> u64 {
        self.count.div_ceil(self.per_page.get().into()).max(1)
    }

    #[must_use]
    pub fn page_number(self, requested: Option<&str>) -> u64 {
        let Some(requested) = requested else {
            return 1;
        };

        match requested.trim().parse::<i64>() {
            // Zero and negative numbers resolve to the nearest page, the first.
            Ok(number) => {
                u64::try_from(number).map_or(1, |number| number.clamp(1, self.num_pages()))
            }
            Err(e) if *e.kind() == IntErrorKind::PosOverflow => self.num_pages(),
            Err(_) => 1,
        }
    }

    #[must_use]
    pub fn window(self, number: u64) -> PageWindow {
        let per_page = self.per_page.get();

        PageWindow {
            offset: (number.max(1) - 1) * u64::from(per_page),
            limit: per_page,
        }
    }

    #[must_use]
    pub fn page<T>(self, number: u64, object_list: Vec<T>) -> Page<T> {
        let num_pages = self.num_pages();
        let has_next = number < num_pages;
        let has_previous = number > 1;

        Page {
            object_list,
            number,
            num_pages,
            count: self.count,
            has_next,
            has_previous,
            next_page_number: has_next.then_some(number + 1),
            previous_page_number: has_previous.then(|| number - 1),
        }
    }
}

impl<T> Page<T> {
    #[must_use]
    pub fn len(&self) -> usize {
        self.object_list.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.object_list.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use crate::pagination::{POSTS_PER_PAGE, PageWindow, Paginator};

    #[test]
    fn num_pages() {
        assert_eq!(Paginator::new(0, POSTS_PER_PAGE).num_pages(), 1);
        assert_eq!(Paginator::new(1, POSTS_PER_PAGE).num_pages(), 1);
        assert_eq!(Paginator::new(10, POSTS_PER_PAGE).num_pages(), 1);
        assert_eq!(Paginator::new(11, POSTS_PER_PAGE).num_pages(), 2);
        assert_eq!(Paginator::new(13, POSTS_PER_PAGE).num_pages(), 2);
    }

    #[test]
    fn page_number_falls_back_to_valid_page() {
        let paginator = Paginator::new(13, POSTS_PER_PAGE);

        assert_eq!(paginator.page_number(None), 1);
        assert_eq!(paginator.page_number(Some("2")), 2);
        assert_eq!(paginator.page_number(Some(" 2 ")), 2);
        assert_eq!(paginator.page_number(Some("last")), 1);
        assert_eq!(paginator.page_number(Some("")), 1);
        assert_eq!(paginator.page_number(Some("0")), 1);
        assert_eq!(paginator.page_number(Some("-4")), 1);
        assert_eq!(paginator.page_number(Some("99")), 2);
        assert_eq!(paginator.page_number(Some("99999999999999999999")), 2);
        assert_eq!(paginator.page_number(Some("-99999999999999999999")), 1);
    }

    #[test]
    fn window_and_page_metadata() {
        let paginator = Paginator::new(13, POSTS_PER_PAGE);

        assert_eq!(
            paginator.window(1),
            PageWindow {
                offset: 0,
                limit: 10
            }
        );
        assert_eq!(
            paginator.window(2),
            PageWindow {
                offset: 10,
                limit: 10
            }
        );

        let first = paginator.page(1, vec![0; 10]);
        assert!(first.has_next);
        assert!(!first.has_previous);
        assert_eq!(first.next_page_number, Some(2));
        assert_eq!(first.previous_page_number, None);

        let second = paginator.page(2, vec![0; 3]);
        assert_eq!(second.len(), 3);
        assert!(!second.has_next);
        assert_eq!(second.previous_page_number, Some(1));
        assert_eq!(second.count, 13);
    }
}
