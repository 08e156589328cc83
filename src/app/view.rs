//! The browsing state machine: one current book, a LIFO history for back
//! navigation, and the view being presented. Playback is owned separately
//! by `super::playback`; every method that returns a `Book` is telling the
//! caller to (re)display it, which resets the playback session.

use crate::catalog::{Book, pick_random_index};
use crate::search::{self, Pager};

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum View {
    Loading,
    SingleBook,
    GenreGrid {
        genre: String,
        books: Vec<Book>,
    },
    SearchResults {
        term: String,
        books: Vec<Book>,
        pager: Pager,
    },
    /// Informational terminal state. With `can_go_back` it is the
    /// zero-results sub-state and offers a back action; without it the
    /// catalog itself is empty and there is nothing to return to.
    Empty {
        message: String,
        can_go_back: bool,
    },
    Error {
        message: String,
    },
}

pub(crate) struct Session {
    catalog: Vec<Book>,
    current_book: Option<Book>,
    history: Vec<Book>,
    view: View,
}

impl Session {
    pub(crate) fn new() -> Self {
        Self {
            catalog: Vec::new(),
            current_book: None,
            history: Vec::new(),
            view: View::Loading,
        }
    }

    pub(crate) fn catalog(&self) -> &[Book] {
        &self.catalog
    }

    pub(crate) fn current_book(&self) -> Option<&Book> {
        self.current_book.as_ref()
    }

    pub(crate) fn history_len(&self) -> usize {
        self.history.len()
    }

    pub(crate) fn view(&self) -> &View {
        &self.view
    }

    /// Load success. Picks a uniformly random initial book, or lands in the
    /// terminal empty state when nothing survived normalization.
    pub(crate) fn finish_load(&mut self, catalog: Vec<Book>, seed: u64) -> Option<Book> {
        self.catalog = catalog;
        match pick_random_index(self.catalog.len(), seed) {
            Some(index) => {
                let book = self.catalog[index].clone();
                self.current_book = Some(book.clone());
                self.view = View::SingleBook;
                Some(book)
            }
            None => {
                self.view = View::Empty {
                    message: "No audiobooks found in the library.".to_string(),
                    can_go_back: false,
                };
                None
            }
        }
    }

    /// Load failure; terminal until a retry re-enters `Loading`.
    pub(crate) fn fail_load(&mut self, message: String) {
        self.view = View::Error { message };
    }

    pub(crate) fn retry_load(&mut self) {
        self.view = View::Loading;
    }

    /// Genre pill selection: current book (if any) goes onto the history
    /// stack and the first filtered book becomes current.
    pub(crate) fn show_genre(&mut self, genre: &str) -> Option<Book> {
        let books = search::filter_by_genre(&self.catalog, genre);
        if books.is_empty() {
            self.view = View::Empty {
                message: format!("No audiobooks found in the \"{genre}\" category."),
                can_go_back: true,
            };
            return None;
        }

        let first = books[0].clone();
        if let Some(previous) = self.current_book.replace(first.clone()) {
            self.history.push(previous);
        }
        self.view = View::GenreGrid {
            genre: genre.to_string(),
            books,
        };
        Some(first)
    }

    /// Search submission. The caller trims and rejects empty terms before
    /// getting here.
    pub(crate) fn submit_search(&mut self, term: &str) -> Option<Book> {
        let books = search::filter(&self.catalog, term);
        if books.is_empty() {
            self.view = View::Empty {
                message: format!("No audiobooks found for \"{term}\"."),
                can_go_back: true,
            };
            return None;
        }

        let first = books[0].clone();
        if let Some(previous) = self.current_book.replace(first.clone()) {
            self.history.push(previous);
        }
        let pager = Pager::new(books.len());
        self.view = View::SearchResults {
            term: term.to_string(),
            books,
            pager,
        };
        Some(first)
    }

    /// Back navigation: pop the history, else redisplay the current book,
    /// else fall back to a random pick.
    pub(crate) fn go_back(&mut self, seed: u64) -> Option<Book> {
        if let Some(previous) = self.history.pop() {
            self.current_book = Some(previous.clone());
            self.view = View::SingleBook;
            return Some(previous);
        }
        if let Some(current) = self.current_book.clone() {
            self.view = View::SingleBook;
            return Some(current);
        }
        match pick_random_index(self.catalog.len(), seed) {
            Some(index) => {
                let book = self.catalog[index].clone();
                self.current_book = Some(book.clone());
                self.view = View::SingleBook;
                Some(book)
            }
            None => {
                self.view = View::Empty {
                    message: "No audiobooks found in the library.".to_string(),
                    can_go_back: false,
                };
                None
            }
        }
    }

    /// The filtered list backing the visible grid, when one is shown.
    pub(crate) fn grid_books(&self) -> Option<&[Book]> {
        match &self.view {
            View::GenreGrid { books, .. } | View::SearchResults { books, .. } => {
                Some(books.as_slice())
            }
            _ => None,
        }
    }

    /// Picks a book out of the visible grid by absolute index. Out-of-range
    /// indices are silently ignored: no crash, no navigation.
    pub(crate) fn select_from_grid(&mut self, index: usize) -> Option<Book> {
        let book = self.grid_books()?.get(index).cloned()?;
        if let Some(previous) = self.current_book.replace(book.clone()) {
            self.history.push(previous);
        }
        Some(book)
    }

    pub(crate) fn next_page(&mut self) -> bool {
        match &mut self.view {
            View::SearchResults { pager, .. } => pager.next(),
            _ => false,
        }
    }

    pub(crate) fn prev_page(&mut self) -> bool {
        match &mut self.view {
            View::SearchResults { pager, .. } => pager.prev(),
            _ => false,
        }
    }
}
