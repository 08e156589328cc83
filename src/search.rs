use std::collections::HashMap;

use crate::catalog::Book;

/// Genres below this count stay out of the pill row; they remain reachable
/// through free-text search.
pub(crate) const GENRE_PILL_MIN_COUNT: usize = 10;
pub(crate) const RESULTS_PER_PAGE: usize = 10;

/// Case-insensitive substring match over title, author, description, tags
/// and genre. Stable: results keep catalog order.
pub(crate) fn filter(catalog: &[Book], term: &str) -> Vec<Book> {
    let needle = term.to_lowercase();
    catalog
        .iter()
        .filter(|book| {
            book.title.to_lowercase().contains(&needle)
                || book.author.to_lowercase().contains(&needle)
                || book.description.to_lowercase().contains(&needle)
                || book
                    .tags
                    .iter()
                    .any(|tag| tag.to_lowercase().contains(&needle))
                || book.genre.to_lowercase().contains(&needle)
        })
        .cloned()
        .collect()
}

/// Exact genre match or category membership, in catalog order.
pub(crate) fn filter_by_genre(catalog: &[Book], genre: &str) -> Vec<Book> {
    catalog
        .iter()
        .filter(|book| book.genre == genre || book.categories.iter().any(|c| c == genre))
        .cloned()
        .collect()
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct GenrePill {
    pub genre: String,
    pub count: usize,
}

/// Counts books per genre and surfaces only genres meeting the display
/// threshold, busiest first.
pub(crate) fn genre_pills(catalog: &[Book]) -> Vec<GenrePill> {
    let mut counts: HashMap<&str, usize> = HashMap::new();
    for book in catalog {
        if !book.genre.is_empty() {
            *counts.entry(book.genre.as_str()).or_default() += 1;
        }
    }

    let mut pills: Vec<GenrePill> = counts
        .into_iter()
        .filter(|(_, count)| *count >= GENRE_PILL_MIN_COUNT)
        .map(|(genre, count)| GenrePill {
            genre: genre.to_string(),
            count,
        })
        .collect();
    pills.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.genre.cmp(&b.genre)));
    pills
}

/// Fixed-size pager over a result list; forward/back only, no wraparound.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Pager {
    total: usize,
    page: usize,
}

impl Pager {
    pub(crate) fn new(total: usize) -> Self {
        Self { total, page: 0 }
    }

    pub(crate) fn total_pages(&self) -> usize {
        self.total.div_ceil(RESULTS_PER_PAGE).max(1)
    }

    pub(crate) fn page(&self) -> usize {
        self.page
    }

    /// Absolute index range of the current page.
    pub(crate) fn range(&self) -> std::ops::Range<usize> {
        let start = self.page * RESULTS_PER_PAGE;
        let end = (start + RESULTS_PER_PAGE).min(self.total);
        start..end
    }

    pub(crate) fn next(&mut self) -> bool {
        if self.page + 1 < self.total_pages() {
            self.page += 1;
            true
        } else {
            false
        }
    }

    pub(crate) fn prev(&mut self) -> bool {
        if self.page > 0 {
            self.page -= 1;
            true
        } else {
            false
        }
    }

    pub(crate) fn label(&self) -> String {
        format!("Page {} of {}", self.page + 1, self.total_pages())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{RawRecord, normalize_record};

    fn book(id: &str, title: &str) -> Book {
        normalize_record(
            id,
            RawRecord {
                real_title: Some(title.to_string()),
                url: Some("https://youtu.be/AAAAAAAAAAA".to_string()),
                ..RawRecord::default()
            },
        )
    }

    fn sample_catalog() -> Vec<Book> {
        let mut dragon_title = book("1", "The Dragon Keeper");
        dragon_title.genre = "fantasy".to_string();
        let mut dragon_tag = book("2", "Quiet Valleys");
        dragon_tag.tags = vec!["dragons".to_string()];
        let mut author_match = book("3", "Collected Poems");
        author_match.author = "Enzo Draghi".to_string();
        let plain = book("4", "A Plain Story");
        vec![dragon_title, dragon_tag, author_match, plain]
    }

    #[test]
    fn filter_matches_all_five_fields_case_insensitively() {
        let catalog = sample_catalog();

        let by_title = filter(&catalog, "DRAGON");
        assert_eq!(by_title.len(), 2);
        assert_eq!(by_title[0].id, "1");
        assert_eq!(by_title[1].id, "2");

        let by_author = filter(&catalog, "draghi");
        assert_eq!(by_author.len(), 1);
        assert_eq!(by_author[0].id, "3");

        let by_genre = filter(&catalog, "fanta");
        assert_eq!(by_genre.len(), 1);
        assert_eq!(by_genre[0].id, "1");
    }

    #[test]
    fn filter_results_are_a_subset_in_catalog_order() {
        let catalog = sample_catalog();
        let results = filter(&catalog, "a");
        let mut last_pos = 0;
        for result in &results {
            let pos = catalog
                .iter()
                .position(|b| b.id == result.id)
                .expect("result must come from the catalog");
            assert!(pos >= last_pos, "filter must preserve catalog order");
            last_pos = pos;
        }
    }

    #[test]
    fn filter_by_genre_matches_genre_or_categories_and_is_idempotent() {
        let mut catalog = sample_catalog();
        catalog[1].categories = vec!["fantasy".to_string()];

        let filtered = filter_by_genre(&catalog, "fantasy");
        assert_eq!(filtered.len(), 2);

        let again = filter_by_genre(&filtered, "fantasy");
        assert_eq!(again, filtered);
    }

    #[test]
    fn genre_pills_apply_display_threshold() {
        let mut catalog = Vec::new();
        for i in 0..12 {
            let mut b = book(&format!("f{i}"), &format!("Fantasy {i}"));
            b.genre = "fantasy".to_string();
            catalog.push(b);
        }
        for i in 0..3 {
            let mut b = book(&format!("n{i}"), &format!("Noir {i}"));
            b.genre = "noir".to_string();
            catalog.push(b);
        }

        let pills = genre_pills(&catalog);
        assert_eq!(pills.len(), 1);
        assert_eq!(pills[0].genre, "fantasy");
        assert_eq!(pills[0].count, 12);

        // Below-threshold genres stay reachable through free search.
        assert_eq!(filter(&catalog, "noir").len(), 3);
        assert_eq!(filter_by_genre(&catalog, "noir").len(), 3);
    }

    #[test]
    fn pager_walks_forward_and_back_without_wraparound() {
        let mut pager = Pager::new(25);
        assert_eq!(pager.total_pages(), 3);
        assert_eq!(pager.range(), 0..10);
        assert_eq!(pager.label(), "Page 1 of 3");

        assert!(pager.next());
        assert!(pager.next());
        assert_eq!(pager.range(), 20..25);
        assert!(!pager.next(), "no wraparound past the last page");
        assert_eq!(pager.page(), 2);

        assert!(pager.prev());
        assert!(pager.prev());
        assert!(!pager.prev(), "no wraparound before the first page");
        assert_eq!(pager.range(), 0..10);
    }

    #[test]
    fn pager_handles_empty_and_exact_multiples() {
        let empty = Pager::new(0);
        assert_eq!(empty.total_pages(), 1);
        assert_eq!(empty.range(), 0..0);

        let exact = Pager::new(20);
        assert_eq!(exact.total_pages(), 2);
    }
}
