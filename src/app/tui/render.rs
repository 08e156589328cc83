use ratatui::Frame;
use ratatui::layout::{Alignment, Constraint, Direction, Layout, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{
    Block, BorderType, Borders, Cell, Gauge, Paragraph, Row, Table, TableState, Wrap,
};

use crate::catalog::{Book, LibraryStats, format_time_display, format_upload_date};
use crate::changelog;
use crate::search::GenrePill;

use super::super::playback::PlaybackSession;
use super::super::truncate;
use super::super::view::{Session, View};
use super::{ChangelogPanel, Focus};

struct Palette {
    bg: Color,
    border: Color,
    heading: Color,
    text: Color,
    dim: Color,
    accent: Color,
    pill_bg: Color,
    pill_fg: Color,
}

impl Palette {
    fn dark() -> Self {
        Self {
            bg: Color::Black,
            border: Color::Rgb(125, 135, 150),
            heading: Color::Rgb(110, 170, 255),
            text: Color::Rgb(230, 230, 230),
            dim: Color::Rgb(185, 195, 210),
            accent: Color::Rgb(130, 190, 255),
            pill_bg: Color::Rgb(72, 82, 96),
            pill_fg: Color::Rgb(230, 235, 242),
        }
    }

    fn light() -> Self {
        Self {
            bg: Color::Rgb(240, 242, 246),
            border: Color::Rgb(120, 130, 145),
            heading: Color::Rgb(30, 90, 190),
            text: Color::Rgb(30, 34, 42),
            dim: Color::Rgb(90, 100, 115),
            accent: Color::Rgb(40, 110, 210),
            pill_bg: Color::Rgb(205, 212, 222),
            pill_fg: Color::Rgb(30, 34, 42),
        }
    }
}

#[allow(clippy::too_many_arguments)]
pub(super) fn draw_tui(
    frame: &mut Frame,
    session: &Session,
    playback: &PlaybackSession,
    table_state: &mut TableState,
    pills: &[GenrePill],
    pill_index: usize,
    stats: &LibraryStats,
    focus: Focus,
    search_input: &str,
    changelog_panel: &ChangelogPanel,
    changelog_collapsed: bool,
    dark_mode: bool,
    status: &str,
) {
    let palette = if dark_mode {
        Palette::dark()
    } else {
        Palette::light()
    };

    let bg = Block::default().style(Style::default().bg(palette.bg));
    frame.render_widget(bg, frame.area());

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3),
            Constraint::Length(3),
            Constraint::Min(10),
            Constraint::Length(3),
        ])
        .split(frame.area());

    let header = Paragraph::new(Line::from(vec![
        Span::styled(
            "AUDIOTECA",
            Style::default()
                .fg(palette.heading)
                .add_modifier(Modifier::BOLD),
        ),
        Span::styled("   ", Style::default()),
        Span::styled(
            format!("{} audiobooks", stats.total_books),
            Style::default().fg(palette.dim),
        ),
        Span::styled("   ", Style::default()),
        Span::styled(
            format!("{} authors", stats.total_authors),
            Style::default().fg(palette.dim),
        ),
        Span::styled("   ", Style::default()),
        Span::styled(
            stats.formatted_total_duration(),
            Style::default().fg(palette.dim),
        ),
    ]))
    .alignment(Alignment::Center)
    .block(panel_block("Library".to_string(), &palette));
    frame.render_widget(header, chunks[0]);

    let nav = match focus {
        Focus::Search => Paragraph::new(Line::from(vec![
            Span::styled("Search: ", Style::default().fg(palette.dim)),
            Span::styled(
                format!("{search_input}_"),
                Style::default()
                    .fg(palette.text)
                    .add_modifier(Modifier::BOLD),
            ),
        ]))
        .block(panel_block("Find an audiobook".to_string(), &palette)),
        Focus::Browse => Paragraph::new(pill_row(pills, pill_index, &palette))
            .block(panel_block("Categories".to_string(), &palette)),
    };
    frame.render_widget(nav, chunks[1]);

    let body_chunks = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(58), Constraint::Percentage(42)])
        .split(chunks[2]);

    match session.view() {
        View::Loading => {
            let loading = Paragraph::new("Loading the audiobook library...")
                .style(Style::default().fg(palette.dim))
                .alignment(Alignment::Center)
                .block(panel_block("Now Playing".to_string(), &palette));
            frame.render_widget(loading, body_chunks[0]);
        }
        View::Error { message } => {
            let error = Paragraph::new(format!(
                "Could not load the audiobook library.\n\n{message}\n\nPress r to retry."
            ))
            .style(Style::default().fg(palette.text))
            .wrap(Wrap { trim: true })
            .block(panel_block("Error".to_string(), &palette));
            frame.render_widget(error, body_chunks[0]);
        }
        View::Empty {
            message,
            can_go_back,
        } => {
            let hint = if *can_go_back {
                "\n\nPress b to go back."
            } else {
                ""
            };
            let empty = Paragraph::new(format!("{message}{hint}"))
                .style(Style::default().fg(palette.text))
                .wrap(Wrap { trim: true })
                .block(panel_block("No Results".to_string(), &palette));
            frame.render_widget(empty, body_chunks[0]);
        }
        View::SingleBook | View::GenreGrid { .. } | View::SearchResults { .. } => {
            draw_book_panel(frame, session.current_book(), playback, &palette, body_chunks[0]);
        }
    }

    match session.view() {
        View::GenreGrid { genre, books } => {
            draw_grid(
                frame,
                table_state,
                books,
                0,
                format!("Genre: {genre}"),
                &palette,
                body_chunks[1],
            );
        }
        View::SearchResults { term, books, pager } => {
            let range = pager.range();
            let visible = &books[range.clone()];
            draw_grid(
                frame,
                table_state,
                visible,
                range.start,
                format!("\"{}\" ({}) - {}", truncate(term, 18), books.len(), pager.label()),
                &palette,
                body_chunks[1],
            );
        }
        _ => {
            draw_changelog(frame, changelog_panel, changelog_collapsed, &palette, body_chunks[1]);
        }
    }

    let status_widget = Paragraph::new(status.to_string())
        .style(status_style(status, &palette))
        .block(panel_block("Status".to_string(), &palette));
    frame.render_widget(status_widget, chunks[3]);
}

fn draw_book_panel(
    frame: &mut Frame,
    book: Option<&Book>,
    playback: &PlaybackSession,
    palette: &Palette,
    area: Rect,
) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Min(8), Constraint::Length(3)])
        .split(area);

    let Some(book) = book else {
        let placeholder = Paragraph::new("Nothing selected.")
            .style(Style::default().fg(palette.dim))
            .block(panel_block("Now Playing".to_string(), palette));
        frame.render_widget(placeholder, chunks[0]);
        return;
    };

    let state = playback.state();
    let play_flag = if state.is_playing { "Playing" } else { "Paused" };
    let uploaded = format_upload_date(&book.upload_date);
    let mut lines = vec![
        Line::from(Span::styled(
            truncate(&book.title, 64),
            Style::default()
                .fg(palette.heading)
                .add_modifier(Modifier::BOLD),
        )),
        Line::from(Span::styled(
            format!("by {}", book.author),
            Style::default().fg(palette.text),
        )),
        Line::from(Span::styled(
            if book.genre.is_empty() {
                book.channel.clone()
            } else {
                format!("{}   {}", book.genre, book.channel)
            },
            Style::default().fg(palette.dim),
        )),
        Line::from(Span::styled(
            if uploaded.is_empty() {
                book.formatted_duration()
            } else {
                format!("{}   uploaded {uploaded}", book.formatted_duration())
            },
            Style::default().fg(palette.dim),
        )),
        Line::from(""),
    ];
    for text_line in book.description.lines().take(8) {
        lines.push(Line::from(Span::styled(
            text_line.to_string(),
            Style::default().fg(palette.text),
        )));
    }
    lines.push(Line::from(""));
    lines.push(Line::from(Span::styled(
        format!("{play_flag}   volume {}%", state.volume),
        Style::default().fg(palette.accent),
    )));
    if let Some(err) = playback.last_error() {
        lines.push(Line::from(Span::styled(
            err.to_string(),
            Style::default()
                .fg(Color::Rgb(255, 145, 120))
                .add_modifier(Modifier::BOLD),
        )));
    }

    let detail = Paragraph::new(lines)
        .wrap(Wrap { trim: true })
        .block(panel_block("Now Playing".to_string(), palette));
    frame.render_widget(detail, chunks[0]);

    let ratio = (playback.progress_percentage() / 100.0).clamp(0.0, 1.0);
    let label = format!(
        "{} / {}",
        format_time_display(state.current_time),
        format_time_display(state.duration)
    );
    let progress = Gauge::default()
        .block(panel_block("Progress".to_string(), palette))
        .gauge_style(
            Style::default()
                .fg(palette.accent)
                .bg(palette.bg)
                .add_modifier(Modifier::BOLD),
        )
        .label(label)
        .ratio(ratio);
    frame.render_widget(progress, chunks[1]);
}

fn draw_grid(
    frame: &mut Frame,
    table_state: &mut TableState,
    books: &[Book],
    first_index: usize,
    title: String,
    palette: &Palette,
    area: Rect,
) {
    let rows: Vec<Row> = books
        .iter()
        .enumerate()
        .map(|(i, book)| {
            Row::new(vec![
                Cell::from((first_index + i + 1).to_string()),
                Cell::from(truncate(&book.title, 34)),
                Cell::from(truncate(&book.author, 20)),
                Cell::from(book.formatted_duration()),
            ])
        })
        .collect();

    let table = Table::new(
        rows,
        [
            Constraint::Length(4),
            Constraint::Percentage(52),
            Constraint::Percentage(30),
            Constraint::Length(8),
        ],
    )
    .header(
        Row::new(vec!["#", "Title", "Author", "Length"]).style(
            Style::default()
                .fg(palette.heading)
                .add_modifier(Modifier::BOLD),
        ),
    )
    .block(panel_block(title, palette))
    .row_highlight_style(
        Style::default()
            .bg(palette.heading)
            .fg(palette.bg)
            .add_modifier(Modifier::BOLD),
    )
    .highlight_symbol("▸ ");
    frame.render_stateful_widget(table, area, table_state);
}

fn draw_changelog(
    frame: &mut Frame,
    panel: &ChangelogPanel,
    collapsed: bool,
    palette: &Palette,
    area: Rect,
) {
    let text = if collapsed {
        "Press c to expand.".to_string()
    } else {
        match panel {
            ChangelogPanel::Hidden => {
                "No update feed configured.\n\nPass --base-url to enable it.".to_string()
            }
            ChangelogPanel::Loading => "Checking for updates...".to_string(),
            ChangelogPanel::Failed(err) => {
                format!("Could not load updates.\n{err}\n\nPress u to retry.")
            }
            ChangelogPanel::Ready(entries) if entries.is_empty() => {
                "No updates available.".to_string()
            }
            ChangelogPanel::Ready(entries) => {
                let mut out = String::new();
                for entry in entries {
                    out.push_str(&format!(
                        "{}  {}\n",
                        changelog::format_entry_date(&entry.date),
                        entry.title
                    ));
                    if let Some(description) = entry.description.as_deref() {
                        out.push_str(&format!("  {description}\n"));
                    }
                    for change in entry.changes.as_deref().unwrap_or_default() {
                        out.push_str(&format!("  - {change}\n"));
                    }
                    out.push('\n');
                }
                out
            }
        }
    };

    let widget = Paragraph::new(text)
        .style(Style::default().fg(palette.text))
        .wrap(Wrap { trim: true })
        .block(panel_block("Updates".to_string(), palette));
    frame.render_widget(widget, area);
}

fn pill_row(pills: &[GenrePill], pill_index: usize, palette: &Palette) -> Line<'static> {
    if pills.is_empty() {
        return Line::from(Span::styled(
            "No categories yet   s search  Space play/pause  q quit",
            Style::default().fg(palette.dim),
        ));
    }

    let mut spans = Vec::new();
    for (i, pill) in pills.iter().enumerate() {
        let style = if i == pill_index {
            Style::default()
                .bg(palette.heading)
                .fg(palette.bg)
                .add_modifier(Modifier::BOLD)
        } else {
            Style::default().bg(palette.pill_bg).fg(palette.pill_fg)
        };
        spans.push(Span::styled(
            format!(" {} ({}) ", pill.genre, pill.count),
            style,
        ));
        spans.push(Span::styled(" ", Style::default()));
    }
    spans.push(Span::styled(
        "  Tab next  g open  s search  b back  q quit",
        Style::default().fg(palette.dim),
    ));
    Line::from(spans)
}

fn panel_block(title: String, palette: &Palette) -> Block<'static> {
    Block::default()
        .borders(Borders::ALL)
        .border_type(BorderType::Rounded)
        .border_style(Style::default().fg(palette.border))
        .title(title)
}

fn status_style(status: &str, palette: &Palette) -> Style {
    if status.starts_with("ERROR:") {
        Style::default()
            .fg(Color::Rgb(255, 145, 120))
            .add_modifier(Modifier::BOLD)
    } else if status.starts_with("INFO:") {
        Style::default().fg(palette.accent)
    } else {
        Style::default().fg(palette.text)
    }
}
