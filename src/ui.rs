use anyhow::Result;
use business_dashboard::dashboard::{self, LocationsView, ReviewsPanel, ReviewsView};
use business_dashboard::{BusinessDataSource, Credential, Insights, Review};
use crossterm::{
    event::{self, Event, KeyCode, KeyEventKind},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{
    backend::CrosstermBackend,
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Cell, Paragraph, Row, Table, TableState, Wrap},
    Frame, Terminal,
};
use std::io;
use std::sync::Arc;
use tokio::runtime::Handle;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Screen {
    Locations,
    Reviews,
}

pub struct App {
    source: Arc<dyn BusinessDataSource>,
    credential: Credential,
    concurrency: usize,
    runtime: Handle,
    pub screen: Screen,
    pub locations: LocationsView,
    pub state: TableState,
    pub panel: Option<ReviewsPanel>,
    pub scroll: u16,
}

impl App {
    pub fn new(
        source: Arc<dyn BusinessDataSource>,
        credential: Credential,
        concurrency: usize,
        runtime: Handle,
    ) -> Self {
        Self {
            source,
            credential,
            concurrency,
            runtime,
            screen: Screen::Locations,
            locations: LocationsView::Empty,
            state: TableState::default(),
            panel: None,
            scroll: 0,
        }
    }

    pub fn source_name(&self) -> &'static str {
        self.source.name()
    }

    /// Fetch every location across the user's accounts
    pub fn load_locations(&mut self) {
        self.locations = self.runtime.block_on(dashboard::load_locations(
            self.source.as_ref(),
            &self.credential,
            self.concurrency,
        ));

        if self.locations.cards().is_empty() {
            self.state.select(None);
        } else {
            self.state.select(Some(0));
        }
    }

    /// Enter: open the reviews panel for the selected location
    pub fn open_selected(&mut self) {
        let Some(card) = self
            .state
            .selected()
            .and_then(|i| self.locations.cards().get(i))
            .cloned()
        else {
            return;
        };

        self.panel = Some(self.runtime.block_on(dashboard::load_reviews(
            self.source.as_ref(),
            &self.credential,
            Some(&card.name),
            Some(&card.title),
        )));
        self.scroll = 0;
        self.screen = Screen::Reviews;
    }

    /// Esc: back to the locations list
    pub fn back(&mut self) {
        self.screen = Screen::Locations;
        self.panel = None;
        self.scroll = 0;
    }

    /// r: reload whatever is on screen
    pub fn retry(&mut self) {
        match self.screen {
            Screen::Locations => self.load_locations(),
            Screen::Reviews => self.open_selected(),
        }
    }

    pub fn next(&mut self) {
        match self.screen {
            Screen::Locations => {
                let len = self.locations.cards().len();
                if len == 0 {
                    return;
                }
                let i = match self.state.selected() {
                    Some(i) if i + 1 < len => i + 1,
                    _ => 0,
                };
                self.state.select(Some(i));
            }
            Screen::Reviews => self.scroll = self.scroll.saturating_add(1),
        }
    }

    pub fn previous(&mut self) {
        match self.screen {
            Screen::Locations => {
                let len = self.locations.cards().len();
                if len == 0 {
                    return;
                }
                let i = match self.state.selected() {
                    Some(0) | None => len - 1,
                    Some(i) => i - 1,
                };
                self.state.select(Some(i));
            }
            Screen::Reviews => self.scroll = self.scroll.saturating_sub(1),
        }
    }
}

pub fn run_ui(app: &mut App) -> Result<()> {
    // Setup terminal
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let res = run_app(&mut terminal, app);

    // Restore terminal
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    if let Err(err) = res {
        println!("Error: {:?}", err);
    }

    Ok(())
}

fn run_app<B: ratatui::backend::Backend>(
    terminal: &mut Terminal<B>,
    app: &mut App,
) -> io::Result<()> {
    loop {
        terminal.draw(|f| ui(f, app))?;

        if let Event::Key(key) = event::read()? {
            if key.kind != KeyEventKind::Press {
                continue;
            }
            match key.code {
                KeyCode::Char('q') => return Ok(()),
                KeyCode::Esc => app.back(),
                KeyCode::Enter if app.screen == Screen::Locations => app.open_selected(),
                KeyCode::Char('r') => app.retry(),
                KeyCode::Down | KeyCode::Char('j') => app.next(),
                KeyCode::Up | KeyCode::Char('k') => app.previous(),
                _ => {}
            }
        }
    }
}

fn ui(f: &mut Frame, app: &mut App) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3), // Header
            Constraint::Min(0),    // Locations or reviews
            Constraint::Length(3), // Key help
        ])
        .split(f.size());

    render_header(f, chunks[0], app);

    match app.screen {
        Screen::Locations => render_locations(f, chunks[1], app),
        Screen::Reviews => render_reviews(f, chunks[1], app),
    }

    render_status_bar(f, chunks[2], app);
}

fn render_header(f: &mut Frame, area: Rect, app: &App) {
    let mut spans = vec![
        Span::styled(
            "MyGoProfile",
            Style::default()
                .fg(Color::Yellow)
                .add_modifier(Modifier::BOLD),
        ),
        Span::raw("  |  "),
        Span::styled(
            format!("Source: {}", app.source_name()),
            Style::default().fg(Color::White),
        ),
    ];

    match (&app.screen, &app.panel) {
        (Screen::Reviews, Some(panel)) => {
            spans.push(Span::raw("  |  "));
            spans.push(Span::styled(
                panel.title.clone(),
                Style::default().fg(Color::Cyan),
            ));
            if let Some(insights) = &panel.insights {
                spans.push(Span::raw("  |  "));
                spans.extend(insights_spans(insights));
            }
        }
        _ => {
            spans.push(Span::raw("  |  "));
            spans.push(Span::styled(
                format!("Businesses: {}", app.locations.cards().len()),
                Style::default().fg(Color::Green),
            ));
        }
    }

    let header = Paragraph::new(vec![Line::from(spans)])
        .block(Block::default().borders(Borders::ALL).border_style(Style::default().fg(Color::Cyan)));

    f.render_widget(header, area);
}

fn insights_spans(insights: &Insights) -> Vec<Span<'static>> {
    [
        ("Views", insights.total_views),
        ("Clicks", insights.total_clicks),
        ("Calls", insights.total_calls),
        ("Directions", insights.total_direction_requests),
    ]
    .into_iter()
    .enumerate()
    .flat_map(|(i, (label, value))| {
        let mut spans = Vec::new();
        if i > 0 {
            spans.push(Span::raw("  "));
        }
        spans.push(Span::styled(
            format!("{} {}", label, value),
            Style::default().fg(Color::Magenta),
        ));
        spans
    })
    .collect()
}

fn render_locations(f: &mut Frame, area: Rect, app: &mut App) {
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::White))
        .title(" Select Your Business ");

    let cards = match &app.locations {
        LocationsView::Loaded(cards) => cards,
        LocationsView::Empty => {
            let text = vec![
                Line::from(Span::styled(
                    "No businesses found",
                    Style::default().add_modifier(Modifier::BOLD),
                )),
                Line::from("You don't have any Google Business Profiles associated with this account."),
                Line::from("Create one at https://business.google.com/"),
            ];
            f.render_widget(Paragraph::new(text).block(block), area);
            return;
        }
        LocationsView::Failed(err) => {
            f.render_widget(failure(err.message(), err.needs_sign_in()).block(block), area);
            return;
        }
    };

    let header_cells = ["Business", "Address", "Phone", "Website"].iter().map(|h| {
        Cell::from(*h).style(
            Style::default()
                .fg(Color::Yellow)
                .add_modifier(Modifier::BOLD),
        )
    });
    let header = Row::new(header_cells)
        .style(Style::default().bg(Color::DarkGray))
        .height(1);

    let rows: Vec<Row> = cards
        .iter()
        .map(|card| {
            let address = [card.street.as_str(), card.city_line.as_str()]
                .iter()
                .filter(|s| !s.is_empty())
                .copied()
                .collect::<Vec<_>>()
                .join(", ");
            Row::new(vec![
                Cell::from(truncate(&card.title, 30)),
                Cell::from(truncate(&address, 40)),
                Cell::from(card.phone.clone().unwrap_or_default()),
                Cell::from(truncate(card.website.as_deref().unwrap_or(""), 30))
                    .style(Style::default().fg(Color::Cyan)),
            ])
            .height(1)
        })
        .collect();

    let table = Table::new(
        rows,
        [
            Constraint::Length(32),
            Constraint::Length(42),
            Constraint::Length(18),
            Constraint::Min(10),
        ],
    )
    .header(header)
    .block(block)
    .highlight_style(
        Style::default()
            .bg(Color::DarkGray)
            .add_modifier(Modifier::BOLD),
    )
    .highlight_symbol("→ ");

    f.render_stateful_widget(table, area, &mut app.state);
}

fn render_reviews(f: &mut Frame, area: Rect, app: &App) {
    let Some(panel) = &app.panel else {
        return;
    };

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::White))
        .title(format!(" Reviews for {} ", panel.title));

    let widget = match &panel.reviews {
        ReviewsView::Loaded(reviews) => {
            let lines: Vec<Line> = reviews.iter().flat_map(review_lines).collect();
            Paragraph::new(lines)
                .wrap(Wrap { trim: false })
                .scroll((app.scroll, 0))
        }
        ReviewsView::Empty => Paragraph::new("No reviews found for this location"),
        ReviewsView::NoLocation => Paragraph::new("No location specified"),
        ReviewsView::Failed(err) => failure(err.message(), err.needs_sign_in()),
    };

    f.render_widget(widget.block(block), area);
}

fn review_lines(review: &Review) -> Vec<Line<'static>> {
    let mut lines = vec![Line::from(vec![
        Span::styled(
            review.star_rating.glyphs(),
            Style::default().fg(Color::Yellow),
        ),
        Span::raw("  "),
        Span::styled(
            review.reviewer.display_name.clone(),
            Style::default().add_modifier(Modifier::BOLD),
        ),
        Span::raw("  "),
        Span::styled(
            dashboard::format_date(&review.create_time),
            Style::default().fg(Color::DarkGray),
        ),
    ])];

    if !review.comment.is_empty() {
        lines.push(Line::from(format!("  {}", review.comment)));
    }

    if let Some(reply) = &review.review_reply {
        lines.push(Line::from(vec![
            Span::styled(
                "  ↳ Business Response ",
                Style::default().fg(Color::Blue).add_modifier(Modifier::BOLD),
            ),
            Span::styled(
                dashboard::format_date(&reply.update_time),
                Style::default().fg(Color::DarkGray),
            ),
        ]));
        lines.push(Line::from(Span::styled(
            format!("    {}", reply.comment),
            Style::default().fg(Color::Blue),
        )));
    }

    lines.push(Line::from(""));
    lines
}

/// Soft failure with the way forward
fn failure(message: &str, needs_sign_in: bool) -> Paragraph<'static> {
    let hint = if needs_sign_in {
        "Sign in again (refresh GOOGLE_ACCESS_TOKEN), then press r to retry"
    } else {
        "Press r to try again"
    };
    Paragraph::new(vec![
        Line::from(Span::styled(message.to_string(), Style::default().fg(Color::Red))),
        Line::from(""),
        Line::from(Span::styled(hint, Style::default().fg(Color::Yellow))),
    ])
}

fn render_status_bar(f: &mut Frame, area: Rect, app: &App) {
    let mut status_spans = Vec::new();

    if app.screen == Screen::Locations {
        let selected = app.state.selected().map(|i| i + 1).unwrap_or(0);
        status_spans.push(Span::styled(
            format!(" Row: {}/{} ", selected, app.locations.cards().len()),
            Style::default().fg(Color::Cyan),
        ));
        status_spans.push(Span::raw(" | "));
        status_spans.push(Span::styled("Enter", Style::default().fg(Color::Yellow)));
        status_spans.push(Span::raw(" Reviews | "));
    } else {
        status_spans.push(Span::styled("Esc", Style::default().fg(Color::Yellow)));
        status_spans.push(Span::raw(" Back | "));
    }

    status_spans.push(Span::styled("↑/↓", Style::default().fg(Color::Yellow)));
    status_spans.push(Span::raw(" Nav | "));
    status_spans.push(Span::styled("r", Style::default().fg(Color::Yellow)));
    status_spans.push(Span::raw(" Retry | "));
    status_spans.push(Span::styled("q", Style::default().fg(Color::Red)));
    status_spans.push(Span::raw(" Quit"));

    let status_bar = Paragraph::new(vec![Line::from(status_spans)]).block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::White)),
    );

    f.render_widget(status_bar, area);
}

fn truncate(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max_len.saturating_sub(3)).collect();
        format!("{}...", kept)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use business_dashboard::source::mock::MOCK_ACCESS_TOKEN;
    use business_dashboard::MockBusinessData;
    use tokio::runtime::Runtime;

    fn app(runtime: &Runtime) -> App {
        App::new(
            Arc::new(MockBusinessData::new()),
            Credential::new(MOCK_ACCESS_TOKEN).unwrap(),
            2,
            runtime.handle().clone(),
        )
    }

    #[test]
    fn test_load_and_open_reviews() {
        let runtime = Runtime::new().unwrap();
        let mut app = app(&runtime);

        app.load_locations();
        assert_eq!(app.locations.cards().len(), 1);
        assert_eq!(app.state.selected(), Some(0));

        app.open_selected();
        assert_eq!(app.screen, Screen::Reviews);
        let panel = app.panel.as_ref().unwrap();
        assert_eq!(panel.title, "My Business Location");
        assert!(matches!(&panel.reviews, ReviewsView::Loaded(r) if r.len() == 2));

        app.back();
        assert_eq!(app.screen, Screen::Locations);
        assert!(app.panel.is_none());
    }

    #[test]
    fn test_navigation_wraps() {
        let runtime = Runtime::new().unwrap();
        let mut app = app(&runtime);
        app.load_locations();

        app.next();
        assert_eq!(app.state.selected(), Some(0));
        app.previous();
        assert_eq!(app.state.selected(), Some(0));
    }

    #[test]
    fn test_open_without_selection_is_noop() {
        let runtime = Runtime::new().unwrap();
        let mut app = app(&runtime);

        app.open_selected();
        assert_eq!(app.screen, Screen::Locations);
        assert!(app.panel.is_none());
    }

    #[test]
    fn test_truncate_is_char_safe() {
        assert_eq!(truncate("Café Ünïcode Place", 8), "Café ...");
        assert_eq!(truncate("Short", 10), "Short");
    }

    fn line_text(line: &Line) -> String {
        line.spans.iter().map(|span| span.content.as_ref()).collect()
    }

    #[test]
    fn test_review_lines_include_reply() {
        use business_dashboard::models::{ReviewReply, Reviewer, StarRating};

        let time = "2024-01-15T10:30:00Z".parse().unwrap();
        let mut review = Review {
            name: None,
            review_id: "review1".to_string(),
            reviewer: Reviewer {
                display_name: "John Doe".to_string(),
                profile_photo_url: None,
                is_anonymous: false,
            },
            star_rating: StarRating::Four,
            comment: "Great service!".to_string(),
            create_time: time,
            update_time: time,
            review_reply: None,
        };

        let without_reply: Vec<String> = review_lines(&review).iter().map(line_text).collect();
        assert!(!without_reply.iter().any(|l| l.contains("Business Response")));

        review.review_reply = Some(ReviewReply {
            comment: "Thank you for the kind words!".to_string(),
            update_time: "2024-01-16T09:00:00Z".parse().unwrap(),
        });
        let lines: Vec<String> = review_lines(&review).iter().map(line_text).collect();

        assert!(lines.iter().any(|l| l.contains("Business Response") && l.contains("January 16, 2024")));
        assert!(lines.iter().any(|l| l.contains("Thank you for the kind words!")));
        assert_eq!(lines.len(), without_reply.len() + 2);
    }
}
