use anyhow::Result;
use crossterm::{
    event::{self, Event, KeyCode, KeyEventKind},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use quote_sync::{
    export_to_dir, lock_store, CategoryIndex, Quote, ReconciliationReport, SyncScheduler,
    TickOutcome, ALL_CATEGORIES,
};
use ratatui::{
    backend::CrosstermBackend,
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph, Wrap},
    Frame, Terminal,
};
use std::io;
use std::path::Path;
use std::time::{Duration, Instant};
use tokio::runtime::Handle;

/// How long a conflict notice stays on screen
const NOTICE_TTL: Duration = Duration::from_secs(5);

/// Event poll timeout, so background sync results show up without a key press
const POLL_INTERVAL: Duration = Duration::from_millis(250);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    Browse,
    AddForm,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormField {
    Text,
    Category,
}

#[derive(Debug, Clone)]
pub struct AddForm {
    pub text: String,
    pub category: String,
    pub focus: FormField,
}

impl AddForm {
    fn new() -> Self {
        Self {
            text: String::new(),
            category: String::new(),
            focus: FormField::Text,
        }
    }

    fn focused_mut(&mut self) -> &mut String {
        match self.focus {
            FormField::Text => &mut self.text,
            FormField::Category => &mut self.category,
        }
    }

    fn toggle_focus(&mut self) {
        self.focus = match self.focus {
            FormField::Text => FormField::Category,
            FormField::Category => FormField::Text,
        };
    }
}

pub struct App {
    scheduler: SyncScheduler,
    runtime: Handle,
    pub categories: Vec<String>,
    pub selected_category: usize,
    pub current: Option<Quote>,
    pub mode: Mode,
    pub form: AddForm,
    pub message: Option<String>,
    notice: Option<(String, Instant)>,
    last_seen_sync: Option<chrono::DateTime<chrono::Utc>>,
}

impl App {
    pub fn new(scheduler: SyncScheduler, runtime: Handle) -> Self {
        // Restore the last viewed quote, like reopening the page
        let current = lock_store(scheduler.store()).last_viewed();

        // Periodic sync runs on the runtime for as long as the UI is open
        runtime.spawn(scheduler.clone().run());

        let mut app = Self {
            scheduler,
            runtime,
            categories: Vec::new(),
            selected_category: 0,
            current,
            mode: Mode::Browse,
            form: AddForm::new(),
            message: None,
            notice: None,
            last_seen_sync: None,
        };
        app.refresh_categories();
        app
    }

    pub fn active_category(&self) -> &str {
        self.categories
            .get(self.selected_category)
            .map(String::as_str)
            .unwrap_or(ALL_CATEGORIES)
    }

    /// Recompute categories, keeping the current selection by name.
    pub fn refresh_categories(&mut self) {
        let active = self.active_category().to_string();
        self.categories = CategoryIndex::categories(&lock_store(self.scheduler.store()));
        self.selected_category = self
            .categories
            .iter()
            .position(|c| *c == active)
            .unwrap_or(0);
    }

    pub fn next_category(&mut self) {
        self.selected_category = (self.selected_category + 1) % self.categories.len().max(1);
        self.show_random_quote();
    }

    pub fn previous_category(&mut self) {
        let len = self.categories.len().max(1);
        self.selected_category = (self.selected_category + len - 1) % len;
        self.show_random_quote();
    }

    pub fn show_random_quote(&mut self) {
        let category = self.active_category().to_string();
        let mut store = lock_store(self.scheduler.store());

        self.current = CategoryIndex::random(&store, &category, &mut rand::thread_rng()).cloned();
        match &self.current {
            Some(quote) => store.remember_last_viewed(quote),
            None => self.message = Some("No quotes available in this category!".to_string()),
        }
    }

    pub fn open_form(&mut self) {
        self.form = AddForm::new();
        self.mode = Mode::AddForm;
    }

    pub fn cancel_form(&mut self) {
        self.mode = Mode::Browse;
    }

    pub fn submit_form(&mut self) {
        // add_quote spawns the remote push
        let _enter = self.runtime.enter();

        match self.scheduler.add_quote(&self.form.text, &self.form.category) {
            Ok(quote) => {
                self.mode = Mode::Browse;
                self.refresh_categories();
                self.message = Some(format!("New quote added successfully! (id {})", quote.id));
                self.show_random_quote();
            }
            Err(e) => self.message = Some(e.to_string()),
        }
    }

    pub fn sync_now(&mut self) {
        match self.runtime.block_on(self.scheduler.tick()) {
            TickOutcome::Completed(report) => self.apply_report(&report),
            TickOutcome::Skipped => self.message = Some("Sync already in progress".to_string()),
            TickOutcome::Failed(e) => self.message = Some(format!("Sync failed: {}", e)),
        }
    }

    pub fn export(&mut self) {
        let result = export_to_dir(&lock_store(self.scheduler.store()), Path::new("."));
        self.message = Some(match result {
            Ok(path) => format!("Exported to {}", path.display()),
            Err(e) => format!("Export failed: {:#}", e),
        });
    }

    /// Pick up results of background ticks.
    fn poll_background_sync(&mut self) {
        if let Some(report) = self.scheduler.last_report() {
            if self.last_seen_sync != Some(report.reconciled_at) {
                self.apply_report(&report);
            }
        }
    }

    fn apply_report(&mut self, report: &ReconciliationReport) {
        self.last_seen_sync = Some(report.reconciled_at);
        self.refresh_categories();
        self.message = Some(report.summary());
        if let Some(notice) = report.notice() {
            self.notice = Some((notice, Instant::now()));
        }
    }

    pub fn active_notice(&self) -> Option<&str> {
        self.notice
            .as_ref()
            .filter(|(_, shown_at)| shown_at.elapsed() < NOTICE_TTL)
            .map(|(text, _)| text.as_str())
    }

    pub fn quote_count(&self) -> usize {
        lock_store(self.scheduler.store()).len()
    }
}

pub fn run_ui(app: &mut App) -> Result<()> {
    // Setup terminal
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    // Run the app
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
        app.poll_background_sync();
        terminal.draw(|f| ui(f, app))?;

        if !event::poll(POLL_INTERVAL)? {
            continue;
        }

        let Event::Key(key) = event::read()? else {
            continue;
        };
        if key.kind != KeyEventKind::Press {
            continue;
        }

        match app.mode {
            Mode::Browse => match key.code {
                KeyCode::Char('q') | KeyCode::Esc => return Ok(()),
                KeyCode::Char('n') | KeyCode::Enter => app.show_random_quote(),
                KeyCode::Right | KeyCode::Char('l') => app.next_category(),
                KeyCode::Left | KeyCode::Char('h') => app.previous_category(),
                KeyCode::Char('a') => app.open_form(),
                KeyCode::Char('s') => app.sync_now(),
                KeyCode::Char('e') => app.export(),
                _ => {}
            },
            Mode::AddForm => match key.code {
                KeyCode::Esc => app.cancel_form(),
                KeyCode::Tab | KeyCode::BackTab => app.form.toggle_focus(),
                KeyCode::Enter => app.submit_form(),
                KeyCode::Backspace => {
                    app.form.focused_mut().pop();
                }
                KeyCode::Char(c) => app.form.focused_mut().push(c),
                _ => {}
            },
        }
    }
}

fn ui(f: &mut Frame, app: &mut App) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3), // Header with categories
            Constraint::Min(0),    // Quote display
            Constraint::Length(3), // Status bar
        ])
        .split(f.size());

    render_header(f, chunks[0], app);

    if app.mode == Mode::AddForm {
        let content_chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Min(0), Constraint::Length(8)])
            .split(chunks[1]);

        render_quote(f, content_chunks[0], app);
        render_add_form(f, content_chunks[1], app);
    } else {
        render_quote(f, chunks[1], app);
    }

    render_status_bar(f, chunks[2], app);
}

fn render_header(f: &mut Frame, area: Rect, app: &App) {
    let mut spans = vec![Span::styled(
        "Quotes ",
        Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD),
    )];

    for (i, name) in app.categories.iter().enumerate() {
        spans.push(Span::raw(" │ "));
        let style = if i == app.selected_category {
            Style::default()
                .fg(Color::Yellow)
                .add_modifier(Modifier::BOLD | Modifier::UNDERLINED)
        } else {
            Style::default().fg(Color::DarkGray)
        };
        spans.push(Span::styled(name.as_str(), style));
    }

    spans.push(Span::raw("  |  "));
    spans.push(Span::styled(
        format!("Total: {}", app.quote_count()),
        Style::default().fg(Color::White),
    ));

    let header = Paragraph::new(vec![Line::from(spans)])
        .block(Block::default().borders(Borders::ALL).border_style(Style::default().fg(Color::Cyan)));

    f.render_widget(header, area);
}

fn render_quote(f: &mut Frame, area: Rect, app: &App) {
    let lines = match &app.current {
        Some(quote) => vec![
            Line::from(""),
            Line::from(Span::styled(
                format!("\"{}\"", quote.text),
                Style::default().fg(Color::White).add_modifier(Modifier::ITALIC),
            )),
            Line::from(""),
            Line::from(Span::styled(
                format!("— {}", quote.category),
                Style::default().fg(Color::Green),
            )),
        ],
        None => vec![
            Line::from(""),
            Line::from(Span::styled(
                "Press n to show a quote",
                Style::default().fg(Color::DarkGray),
            )),
        ],
    };

    let title = format!(" {} ", app.active_category());
    let paragraph = Paragraph::new(lines)
        .alignment(Alignment::Center)
        .wrap(Wrap { trim: true })
        .block(Block::default().borders(Borders::ALL).title(title));

    f.render_widget(paragraph, area);
}

fn render_add_form(f: &mut Frame, area: Rect, app: &App) {
    let field = |label: &str, value: &str, focused: bool| {
        let style = if focused {
            Style::default().fg(Color::Yellow)
        } else {
            Style::default().fg(Color::Gray)
        };
        let cursor = if focused { "▏" } else { "" };
        Line::from(vec![
            Span::styled(format!("{:<10}", label), style.add_modifier(Modifier::BOLD)),
            Span::styled(format!("{}{}", value, cursor), style),
        ])
    };

    let lines = vec![
        field(
            "Quote:",
            &app.form.text,
            app.form.focus == FormField::Text,
        ),
        Line::from(""),
        field(
            "Category:",
            &app.form.category,
            app.form.focus == FormField::Category,
        ),
        Line::from(""),
        Line::from(Span::styled(
            "Enter add │ Tab switch field │ Esc cancel",
            Style::default().fg(Color::DarkGray),
        )),
    ];

    let form = Paragraph::new(lines).block(
        Block::default()
            .borders(Borders::ALL)
            .title(" Add Quote ")
            .border_style(Style::default().fg(Color::Yellow)),
    );

    f.render_widget(form, area);
}

fn render_status_bar(f: &mut Frame, area: Rect, app: &App) {
    let mut status_spans = Vec::new();

    if let Some(notice) = app.active_notice() {
        status_spans.push(Span::styled(
            format!(" {} ", notice),
            Style::default().fg(Color::Red).add_modifier(Modifier::BOLD),
        ));
        status_spans.push(Span::raw(" | "));
    } else if let Some(message) = &app.message {
        status_spans.push(Span::styled(
            format!(" {} ", message),
            Style::default().fg(Color::Cyan),
        ));
        status_spans.push(Span::raw(" | "));
    }

    for (key, label) in [
        ("n", " New"),
        ("←/→", " Category"),
        ("a", " Add"),
        ("s", " Sync"),
        ("e", " Export"),
    ] {
        status_spans.push(Span::styled(key, Style::default().fg(Color::Yellow)));
        status_spans.push(Span::raw(format!("{} | ", label)));
    }
    status_spans.push(Span::styled("q", Style::default().fg(Color::Red)));
    status_spans.push(Span::raw(" Quit"));

    let status_bar = Paragraph::new(vec![Line::from(status_spans)]).block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::White)),
    );

    f.render_widget(status_bar, area);
}
