//! Offset based pagination shared by every listing.
//!
//! Pages are numbered from 1. A request for a page before the first or past the last one
//! produces an empty page instead of an error. The special page number `-1` asks for the last
//! page, so a client can show a freshly added entry without knowing how many there are.

/// The page asked for by a client
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PageRequest {
    Number(i64),
    Last,
}

impl PageRequest {
    /// Interprets the `page` query parameter. Missing means the first page.
    pub fn from_query(page: Option<i64>) -> Self {
        match page {
            Some(-1) => PageRequest::Last,
            Some(number) => PageRequest::Number(number),
            None => PageRequest::Number(1),
        }
    }

    /// The concrete page number given the size of the listing.
    pub fn resolve(self, total: i64, per_page: i64) -> i64 {
        match self {
            PageRequest::Number(number) => number,
            // An empty listing still has a (blank) first page
            PageRequest::Last => page_count(total, per_page).max(1),
        }
    }
}

impl Default for PageRequest {
    fn default() -> Self {
        PageRequest::Number(1)
    }
}

/// Number of pages needed to show `total` entries, i.e. `ceil(total / per_page)`.
pub fn page_count(total: i64, per_page: i64) -> i64 {
    if per_page <= 0 || total <= 0 {
        0
    } else {
        (total + per_page - 1) / per_page
    }
}

/// One page of a listing along with what's needed to render page navigation.
#[derive(Clone, Debug, Serialize)]
pub struct Pagination<T> {
    pub page: i64,
    pub per_page: i64,
    pub total: i64,
    pub pages: i64,
    pub has_prev: bool,
    pub has_next: bool,
    /// Page numbers to link to, `None` marking a gap
    pub page_links: Vec<Option<i64>>,
    pub items: Vec<T>,
}

impl<T> Pagination<T> {
    pub fn new(page: i64, per_page: i64, total: i64, items: Vec<T>) -> Self {
        let pages = page_count(total, per_page);
        let mut pagination = Pagination {
            page,
            per_page,
            total,
            pages,
            has_prev: page > 1,
            has_next: page < pages,
            page_links: Vec::new(),
            items,
        };
        pagination.page_links = pagination.iter_pages(2, 2, 5, 2);
        pagination
    }

    /// Fetches a page. `total` is the size of the full listing; `load` receives a limit and an
    /// offset and is only called when the page can contain anything.
    pub fn fetch<E, F>(
        request: PageRequest,
        per_page: i64,
        total: i64,
        load: F,
    ) -> Result<Self, E>
    where
        F: FnOnce(i64, i64) -> Result<Vec<T>, E>,
    {
        let per_page = per_page.max(1);
        let page = request.resolve(total, per_page);
        let offset = if page < 1 {
            None
        } else {
            (page - 1).checked_mul(per_page)
        };
        let items = match offset {
            Some(offset) if offset < total => load(per_page, offset)?,
            _ => Vec::new(),
        };
        Ok(Pagination::new(page, per_page, total, items))
    }

    pub fn map<U, F: FnMut(T) -> U>(self, f: F) -> Pagination<U> {
        Pagination {
            page: self.page,
            per_page: self.per_page,
            total: self.total,
            pages: self.pages,
            has_prev: self.has_prev,
            has_next: self.has_next,
            page_links: self.page_links,
            items: self.items.into_iter().map(f).collect(),
        }
    }

    /// Page numbers for a navigation widget. Pages near the edges and around the current page
    /// are listed; `None` stands for a skipped run of pages.
    pub fn iter_pages(
        &self,
        left_edge: i64,
        left_current: i64,
        right_current: i64,
        right_edge: i64,
    ) -> Vec<Option<i64>> {
        let mut numbers = Vec::new();
        let mut last = 0;
        for number in 1..=self.pages {
            let near_current = number > self.page.saturating_sub(left_current).saturating_sub(1)
                && number < self.page.saturating_add(right_current);
            if number <= left_edge || near_current || number > self.pages.saturating_sub(right_edge)
            {
                if last + 1 != number {
                    numbers.push(None);
                }
                numbers.push(Some(number));
                last = number;
            }
        }
        numbers
    }
}

#[cfg(test)]
mod tests {
    use super::{page_count, PageRequest, Pagination};

    fn fetch(request: PageRequest, per_page: i64, total: i64) -> Pagination<i64> {
        Pagination::fetch::<(), _>(request, per_page, total, |limit, offset| {
            Ok((offset..total).take(limit as usize).collect())
        })
        .unwrap()
    }

    #[test]
    fn query_parameter() {
        assert_eq!(PageRequest::from_query(None), PageRequest::Number(1));
        assert_eq!(PageRequest::from_query(Some(-1)), PageRequest::Last);
        assert_eq!(PageRequest::from_query(Some(3)), PageRequest::Number(3));
    }

    #[test]
    fn counts_pages() {
        assert_eq!(page_count(0, 20), 0);
        assert_eq!(page_count(20, 20), 1);
        assert_eq!(page_count(21, 20), 2);
        assert_eq!(page_count(25, 20), 2);
    }

    #[test]
    fn last_page_of_comments() {
        let page = fetch(PageRequest::Last, 20, 25);
        assert_eq!(page.page, 2);
        assert_eq!(page.items, (20..25).collect::<Vec<_>>());
        assert!(page.has_prev);
        assert!(!page.has_next);
    }

    #[test]
    fn last_page_includes_newest_entry() {
        let before = fetch(PageRequest::Last, 20, 40);
        assert_eq!(before.page, 2);
        let after = fetch(PageRequest::Last, 20, 41);
        assert_eq!(after.page, 3);
        assert_eq!(after.items, vec![40]);
    }

    #[test]
    fn last_page_of_empty_listing() {
        let page = fetch(PageRequest::Last, 20, 0);
        assert_eq!(page.page, 1);
        assert!(page.items.is_empty());
        assert!(!page.has_next);
    }

    #[test]
    fn out_of_range_is_empty() {
        let page = fetch(PageRequest::Number(7), 10, 25);
        assert!(page.items.is_empty());
        assert_eq!(page.pages, 3);

        let page = fetch(PageRequest::Number(0), 10, 25);
        assert!(page.items.is_empty());

        let page = fetch(PageRequest::Number(-4), 10, 25);
        assert!(page.items.is_empty());
    }

    #[test]
    fn extreme_page_numbers() {
        for &number in &[i64::MAX, i64::MIN, i64::MAX / 10 + 1] {
            let page = fetch(PageRequest::from_query(Some(number)), 10, 25);
            assert!(page.items.is_empty());
            assert_eq!(page.pages, 3);
            assert_eq!(page.page_links, vec![Some(1), Some(2), Some(3)]);
        }
    }

    #[test]
    fn loader_not_called_for_empty_pages() {
        let page = Pagination::<i64>::fetch::<(), _>(PageRequest::Number(2), 10, 5, |_, _| {
            panic!("nothing to load")
        })
        .unwrap();
        assert!(page.items.is_empty());
    }

    #[test]
    fn page_widget() {
        let page = Pagination::new(10, 10, 200, Vec::<()>::new());
        let numbers = page.iter_pages(2, 2, 5, 2);
        assert_eq!(
            numbers,
            vec![
                Some(1),
                Some(2),
                None,
                Some(8),
                Some(9),
                Some(10),
                Some(11),
                Some(12),
                Some(13),
                Some(14),
                None,
                Some(19),
                Some(20),
            ]
        );

        let short = Pagination::new(1, 10, 30, Vec::<()>::new());
        assert_eq!(short.iter_pages(2, 2, 5, 2), vec![Some(1), Some(2), Some(3)]);
    }

    #[test]
    fn serializes_items() {
        let page = Pagination::new(1, 2, 3, vec!["a", "b"]).map(str::to_uppercase);
        let json = serde_json::to_value(&page).unwrap();
        assert_eq!(json["items"], serde_json::json!(["A", "B"]));
        assert_eq!(json["pages"], 2);
        assert_eq!(json["has_next"], true);
        assert_eq!(json["page_links"], serde_json::json!([1, 2]));
    }
}
