use crate::error::QuoteError;
use crate::form::{Field, ManualForm, QuoteForm, StockForm};
use crate::portfolio::{PendingQuote, Portfolio, StockRow};
use crate::quote::{QuoteProvider, StockQuote};
use crate::stock::StockId;
use crate::valuation::{format_percent, format_price, format_value, Outlook};
use chrono::{DateTime, Local};
use crossterm::{
    event::{self, DisableMouseCapture, EnableMouseCapture, Event, KeyCode, KeyEventKind},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{
    backend::CrosstermBackend,
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Bar, BarChart, BarGroup, Block, Borders, Cell, Clear, Paragraph, Row, Table, Wrap},
    Frame, Terminal,
};
use std::io;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, watch};
use tracing::{debug, error};
use tui_big_text::{BigText, PixelSize};

const CURRENT_PE_COLOR: Color = Color::Indexed(63);
const TARGET_PE_COLOR: Color = Color::Indexed(36);

type QuoteOutcome = (PendingQuote, Result<StockQuote, QuoteError>);

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum AppMode {
    Normal,
    AddQuote,
    AddManual,
    EditTarget,
}

fn outlook_color(outlook: Outlook) -> Color {
    match outlook {
        Outlook::Gain => Color::Green,
        Outlook::Loss => Color::Red,
        Outlook::Neutral => Color::Gray,
    }
}

pub struct App<P> {
    pub portfolio: Portfolio,
    provider: Arc<P>,
    pub mode: AppMode,
    pub selected: usize,
    pub quote_form: QuoteForm,
    pub manual_form: ManualForm,
    pub focused_field: usize,
    pub edit_input: String,
    editing: Option<StockId>,
    pub notice: Option<String>,
    pub last_quote_at: Option<DateTime<Local>>,
    pub should_quit: bool,
    quote_sender: mpsc::UnboundedSender<QuoteOutcome>,
    quote_receiver: mpsc::UnboundedReceiver<QuoteOutcome>,
    changes: watch::Receiver<u64>,
}

impl<P> App<P>
where
    P: QuoteProvider + Send + Sync + 'static,
{
    pub fn new(portfolio: Portfolio, provider: P) -> App<P> {
        let (quote_sender, quote_receiver) = mpsc::unbounded_channel();
        let changes = portfolio.subscribe();
        App {
            portfolio,
            provider: Arc::new(provider),
            mode: AppMode::Normal,
            selected: 0,
            quote_form: QuoteForm::default(),
            manual_form: ManualForm::default(),
            focused_field: 0,
            edit_input: String::new(),
            editing: None,
            notice: None,
            last_quote_at: None,
            should_quit: false,
            quote_sender,
            quote_receiver,
            changes,
        }
    }

    /// True once per change of the portfolio since the last call.
    pub fn take_portfolio_change(&mut self) -> bool {
        match self.changes.has_changed() {
            Ok(true) => {
                let _ = self.changes.borrow_and_update();
                debug!(revision = self.portfolio.revision(), "portfolio changed");
                true
            }
            _ => false,
        }
    }

    pub fn visible_error(&self) -> Option<&str> {
        self.notice.as_deref().or(self.portfolio.error())
    }

    pub fn dismiss_error(&mut self) {
        self.notice = None;
        self.portfolio.clear_error();
    }

    pub fn selected_row(&self) -> Option<StockRow> {
        self.portfolio.rows().into_iter().nth(self.selected)
    }

    fn selected_id(&self) -> Option<StockId> {
        self.portfolio
            .entries()
            .get(self.selected)
            .map(|e| e.get_id())
    }

    pub fn select_next(&mut self) {
        if self.selected < self.portfolio.len().saturating_sub(1) {
            self.selected += 1;
        }
    }

    pub fn select_previous(&mut self) {
        if self.selected > 0 {
            self.selected -= 1;
        }
    }

    fn editing_row(&self) -> Option<StockRow> {
        let id = self.editing?;
        self.portfolio.rows().into_iter().find(|r| r.entry.get_id() == id)
    }

    fn select_id(&mut self, id: StockId) {
        if let Some(index) = self.portfolio.entries().iter().position(|e| e.get_id() == id) {
            self.selected = index;
        }
    }

    pub fn enter_edit_mode(&mut self) {
        if let Some(entry) = self.portfolio.entries().get(self.selected) {
            let target = entry.get_target_pe();
            // Start from the raw number so the user can adjust it
            self.edit_input = if target.fract() == 0.0 {
                format!("{}", target as i64)
            } else {
                format!("{target}")
            };
            self.editing = Some(entry.get_id());
            self.mode = AppMode::EditTarget;
        }
    }

    pub fn exit_edit_mode(&mut self) {
        self.mode = AppMode::Normal;
        self.edit_input.clear();
        self.editing = None;
    }

    pub fn save_edit(&mut self) -> Result<(), String> {
        let id = self.editing.ok_or("Invalid stock selected")?;
        let value = self
            .edit_input
            .trim()
            .parse::<f64>()
            .map_err(|_| "Invalid number format".to_string())?;

        match self.portfolio.update_target_pe(id, value) {
            Ok(true) => {
                self.exit_edit_mode();
                Ok(())
            }
            Ok(false) => Err("Stock no longer in the portfolio".to_string()),
            Err(e) => Err(e.to_string()),
        }
    }

    pub fn remove_selected(&mut self) {
        if let Some(id) = self.selected_id() {
            self.portfolio.remove(id);
            self.selected = self.selected.min(self.portfolio.len().saturating_sub(1));
        }
    }

    pub fn open_form(&mut self, mode: AppMode) {
        self.mode = mode;
        self.focused_field = 0;
    }

    fn form_fields(&self) -> &'static [Field] {
        match self.mode {
            AppMode::AddManual => self.manual_form.fields(),
            _ => self.quote_form.fields(),
        }
    }

    fn focused(&self) -> Field {
        let fields = self.form_fields();
        fields[self.focused_field.min(fields.len() - 1)]
    }

    fn form_mut(&mut self) -> &mut dyn StockForm {
        match self.mode {
            AppMode::AddManual => &mut self.manual_form,
            _ => &mut self.quote_form,
        }
    }

    pub fn submit_manual(&mut self) {
        match self.portfolio.add_manual(&mut self.manual_form) {
            Ok(id) => {
                self.mode = AppMode::Normal;
                self.select_id(id);
            }
            Err(e) => self.notice = Some(e.to_string()),
        }
    }

    /// Starts a live fetch in the background. The outcome arrives through
    /// [`App::poll_quotes`].
    pub fn submit_quote(&mut self) {
        // the add button is disabled while a fetch is outstanding
        if self.portfolio.is_loading() {
            return;
        }
        let Ok(pending) = self.portfolio.begin_quote(&self.quote_form) else {
            return;
        };

        let provider = Arc::clone(&self.provider);
        let sender = self.quote_sender.clone();
        tokio::spawn(async move {
            let ticker = pending.ticker.clone();
            let fetch = tokio::spawn(async move { provider.fetch_quote(&ticker).await });
            let result = match fetch.await {
                Ok(result) => result,
                Err(e) => {
                    error!(ticker = %pending.ticker, "quote task failed: {e}");
                    Err(QuoteError::Transport(format!("quote task failed: {e}")))
                }
            };
            if sender.send((pending, result)).is_err() {
                debug!("dashboard closed before the quote arrived");
            }
        });
    }

    /// Applies finished fetches to the portfolio. Returns whether any arrived.
    pub fn poll_quotes(&mut self) -> bool {
        let mut received = false;
        while let Ok((pending, result)) = self.quote_receiver.try_recv() {
            received = true;
            if let Ok(id) = self.portfolio.complete_quote(pending, result) {
                self.quote_form.clear();
                self.last_quote_at = Some(Local::now());
                if self.mode == AppMode::AddQuote {
                    self.mode = AppMode::Normal;
                }
                // Keep the highlight on the row being edited
                if self.editing.is_none() {
                    self.select_id(id);
                }
            }
        }
        received
    }

    pub fn handle_key(&mut self, code: KeyCode) {
        if self.visible_error().is_some() {
            if matches!(code, KeyCode::Esc | KeyCode::Enter) {
                self.dismiss_error();
            }
            return;
        }

        match self.mode {
            AppMode::Normal => match code {
                KeyCode::Char('q') | KeyCode::Esc => self.should_quit = true,
                KeyCode::Char('j') | KeyCode::Down => self.select_next(),
                KeyCode::Char('k') | KeyCode::Up => self.select_previous(),
                KeyCode::Char('e') | KeyCode::Enter => self.enter_edit_mode(),
                KeyCode::Char('d') | KeyCode::Delete => self.remove_selected(),
                KeyCode::Char('a') => self.open_form(AppMode::AddQuote),
                KeyCode::Char('m') => self.open_form(AppMode::AddManual),
                _ => {}
            },
            AppMode::AddQuote | AppMode::AddManual => match code {
                KeyCode::Esc => self.mode = AppMode::Normal,
                KeyCode::Tab | KeyCode::Down => {
                    self.focused_field = (self.focused_field + 1) % self.form_fields().len();
                }
                KeyCode::BackTab | KeyCode::Up => {
                    let len = self.form_fields().len();
                    self.focused_field = (self.focused_field + len - 1) % len;
                }
                KeyCode::Enter => {
                    if self.mode == AppMode::AddManual {
                        self.submit_manual();
                    } else {
                        self.submit_quote();
                    }
                }
                KeyCode::Backspace => {
                    let field = self.focused();
                    self.form_mut().pop_char(field);
                }
                KeyCode::Char(c) => {
                    let field = self.focused();
                    self.form_mut().push_char(field, c);
                }
                _ => {}
            },
            AppMode::EditTarget => match code {
                KeyCode::Esc => self.exit_edit_mode(),
                KeyCode::Enter => {
                    if let Err(e) = self.save_edit() {
                        self.notice = Some(e);
                        self.exit_edit_mode();
                    }
                }
                KeyCode::Backspace => {
                    self.edit_input.pop();
                }
                KeyCode::Char(c) => {
                    if c.is_ascii_digit() || (c == '.' && !self.edit_input.contains('.')) {
                        self.edit_input.push(c);
                    }
                }
                _ => {}
            },
        }
    }
}

pub async fn run_dashboard<P>(portfolio: Portfolio, provider: P) -> eyre::Result<()>
where
    P: QuoteProvider + Send + Sync + 'static,
{
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let mut app = App::new(portfolio, provider);
    let res = run_app(&mut terminal, &mut app).await;

    disable_raw_mode()?;
    execute!(
        terminal.backend_mut(),
        LeaveAlternateScreen,
        DisableMouseCapture
    )?;
    terminal.show_cursor()?;

    res
}

async fn run_app<P>(
    terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
    app: &mut App<P>,
) -> eyre::Result<()>
where
    P: QuoteProvider + Send + Sync + 'static,
{
    let mut dirty = true;
    loop {
        if dirty {
            terminal.draw(|f| ui(f, app))?;
            dirty = false;
        }

        // Finished fetches from background tasks (non-blocking)
        app.poll_quotes();

        if crossterm::event::poll(Duration::from_millis(100))? {
            if let Event::Key(key) = event::read()? {
                if key.kind == KeyEventKind::Press {
                    app.handle_key(key.code);
                    dirty = true;
                }
            }
        }

        if app.take_portfolio_change() {
            dirty = true;
        }

        if app.should_quit {
            break;
        }
    }
    Ok(())
}

fn ui<P>(f: &mut Frame, app: &App<P>)
where
    P: QuoteProvider + Send + Sync + 'static,
{
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3),
            Constraint::Percentage(45),
            Constraint::Min(0),
            Constraint::Length(3),
        ])
        .split(f.area());

    render_header(f, chunks[0], app);

    let chart_chunks = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(70), Constraint::Percentage(30)])
        .split(chunks[1]);
    let rows = app.portfolio.rows();
    render_pe_chart(f, chart_chunks[0], &rows);
    render_selected_outlook(f, chart_chunks[1], app);

    render_stock_table(f, chunks[2], &rows, app);
    render_help(f, chunks[3], app);

    match app.mode {
        AppMode::EditTarget => render_edit_dialog(f, app),
        AppMode::AddQuote => render_form_dialog(f, app, " Add Stock (live quote) ", &app.quote_form),
        AppMode::AddManual => render_form_dialog(f, app, " Add Stock (manual) ", &app.manual_form),
        AppMode::Normal => {}
    }

    if let Some(error) = app.visible_error() {
        render_error_popup(f, error);
    }
}

fn render_header<P>(f: &mut Frame, area: Rect, app: &App<P>)
where
    P: QuoteProvider + Send + Sync + 'static,
{
    let mut spans = vec![
        Span::styled(
            "P/E Ratio Stock Visualizer",
            Style::default()
                .fg(Color::Yellow)
                .add_modifier(Modifier::BOLD),
        ),
        Span::raw(format!("   {} stocks", app.portfolio.len())),
    ];
    if app.portfolio.is_loading() {
        spans.push(Span::styled(
            "   Loading stock data...",
            Style::default().fg(Color::Cyan),
        ));
    }
    if let Some(at) = app.last_quote_at {
        spans.push(Span::styled(
            format!("   Last quote: {}", at.format("%H:%M:%S")),
            Style::default().fg(Color::Gray),
        ));
    }

    let header = Paragraph::new(Line::from(spans))
        .block(Block::default().borders(Borders::ALL))
        .alignment(Alignment::Center);
    f.render_widget(header, area);
}

fn pe_bar(value: f64, color: Color) -> Bar<'static> {
    // Bars only have integer heights; a non-finite or negative ratio draws
    // an empty bar but keeps its label
    let height = if value.is_finite() && value > 0.0 {
        (value * 100.0).round() as u64
    } else {
        0
    };
    Bar::default()
        .value(height)
        .text_value(format_value(value))
        .style(Style::default().fg(color))
        .value_style(Style::default().fg(Color::Black).bg(color))
}

fn render_pe_chart(f: &mut Frame, area: Rect, rows: &[StockRow]) {
    let title = Line::from(vec![
        Span::raw(" P/E Ratio Comparison  "),
        Span::styled("■ Current P/E ", Style::default().fg(CURRENT_PE_COLOR)),
        Span::styled("■ Target P/E ", Style::default().fg(TARGET_PE_COLOR)),
    ]);
    let block = Block::default().borders(Borders::ALL).title(title);

    if rows.is_empty() {
        let placeholder = Paragraph::new("No data to display")
            .block(block)
            .style(Style::default().fg(Color::Gray))
            .alignment(Alignment::Center);
        f.render_widget(placeholder, area);
        return;
    }

    let mut chart = BarChart::default()
        .block(block)
        .bar_width(7)
        .bar_gap(1)
        .group_gap(3);

    for row in rows {
        let group = BarGroup::default()
            .label(Line::from(row.entry.get_ticker().to_string()))
            .bars(&[
                pe_bar(row.valuation.current_pe, CURRENT_PE_COLOR),
                pe_bar(row.entry.get_target_pe(), TARGET_PE_COLOR),
            ]);
        chart = chart.data(group);
    }

    f.render_widget(chart, area);
}

fn render_selected_outlook<P>(f: &mut Frame, area: Rect, app: &App<P>)
where
    P: QuoteProvider + Send + Sync + 'static,
{
    let Some(row) = app.selected_row() else {
        let block = Block::default().borders(Borders::ALL).title("Implied Move");
        f.render_widget(block, area);
        return;
    };

    let color = outlook_color(row.valuation.outlook());
    let block = Block::default()
        .borders(Borders::ALL)
        .title(format!(
            "{} at {} P/E",
            row.entry.get_ticker(),
            format_value(row.entry.get_target_pe())
        ))
        .title_alignment(Alignment::Center);
    let inner = block.inner(area);
    f.render_widget(block, area);

    let layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(4), Constraint::Min(0)])
        .split(inner);

    let change = format_percent(row.valuation.price_change);
    let big_text_width = change.len() as u16 * 4; // quadrant glyphs are 4 cells wide
    let big_text_area = if big_text_width < layout[0].width {
        let margin = (layout[0].width - big_text_width) / 2;
        Layout::default()
            .direction(Direction::Horizontal)
            .constraints([
                Constraint::Length(margin),
                Constraint::Min(0),
                Constraint::Length(margin),
            ])
            .split(layout[0])[1]
    } else {
        layout[0]
    };

    let big_text = BigText::builder()
        .pixel_size(PixelSize::Quadrant)
        .style(Style::default().fg(color).add_modifier(Modifier::BOLD))
        .lines(vec![change.into()])
        .build();
    f.render_widget(big_text, big_text_area);

    let summary = Paragraph::new(vec![
        Line::from(row.entry.get_name().to_string()),
        Line::from(format!(
            "${} -> ${}",
            format_value(row.entry.get_current_price()),
            format_value(row.valuation.target_price)
        )),
    ])
    .style(Style::default().fg(Color::Gray))
    .alignment(Alignment::Center)
    .wrap(Wrap { trim: true });
    f.render_widget(summary, layout[1]);
}

fn render_stock_table<P>(f: &mut Frame, area: Rect, rows: &[StockRow], app: &App<P>)
where
    P: QuoteProvider + Send + Sync + 'static,
{
    let header_cells = [
        "Ticker",
        "Name",
        "Current Price ($)",
        "EPS ($)",
        "Current P/E",
        "Target P/E",
        "Target Price ($)",
        "Price Change (%)",
    ]
    .iter()
    .map(|h| {
        Cell::from(*h).style(
            Style::default()
                .fg(Color::Yellow)
                .add_modifier(Modifier::BOLD),
        )
    });
    let header = Row::new(header_cells).height(1).bottom_margin(1);

    let table_rows = rows.iter().enumerate().map(|(i, row)| {
        let selected = i == app.selected;
        let row_style = if selected {
            Style::default().bg(Color::DarkGray)
        } else {
            Style::default()
        };

        let target_cell = if app.editing == Some(row.entry.get_id()) {
            Cell::from(format!("{}▌", app.edit_input)).style(
                Style::default()
                    .fg(Color::Yellow)
                    .add_modifier(Modifier::BOLD),
            )
        } else {
            Cell::from(format_value(row.entry.get_target_pe()))
        };

        let change_color = outlook_color(row.valuation.outlook());

        Row::new(vec![
            Cell::from(row.entry.get_ticker().to_string())
                .style(Style::default().add_modifier(Modifier::BOLD)),
            Cell::from(row.entry.get_name().to_string()),
            Cell::from(format_price(row.entry.get_current_price())),
            Cell::from(format_value(row.entry.get_eps())),
            Cell::from(format_value(row.valuation.current_pe)),
            target_cell,
            Cell::from(format_price(row.valuation.target_price)),
            Cell::from(format_percent(row.valuation.price_change))
                .style(Style::default().fg(change_color)),
        ])
        .height(1)
        .style(row_style)
    });

    let widths = [
        Constraint::Length(8),
        Constraint::Min(16),
        Constraint::Length(18),
        Constraint::Length(9),
        Constraint::Length(12),
        Constraint::Length(11),
        Constraint::Length(17),
        Constraint::Length(17),
    ];

    let table = Table::new(table_rows, widths)
        .header(header)
        .block(Block::default().borders(Borders::ALL).title("Stock Analysis"))
        .style(Style::default().fg(Color::White));

    f.render_widget(table, area);
}

fn render_help<P>(f: &mut Frame, area: Rect, app: &App<P>)
where
    P: QuoteProvider + Send + Sync + 'static,
{
    let help = match app.mode {
        AppMode::Normal => {
            "j/k (select) | e (edit target P/E) | d (remove) | a (add live) | m (add manual) | q (quit)"
        }
        AppMode::AddQuote | AppMode::AddManual => "Tab (next field) | Enter (add) | Esc (close)",
        AppMode::EditTarget => "Edit Mode: Enter (save) | Esc (cancel)",
    };
    let help_text = Paragraph::new(help)
        .block(Block::default().borders(Borders::ALL).title("Help"))
        .style(Style::default().fg(Color::Gray))
        .alignment(Alignment::Center);
    f.render_widget(help_text, area);
}

fn render_edit_dialog<P>(f: &mut Frame, app: &App<P>)
where
    P: QuoteProvider + Send + Sync + 'static,
{
    let Some(row) = app.editing_row() else {
        return;
    };
    let popup_area = centered_rect(50, 30, f.area());
    f.render_widget(Clear, popup_area);

    let main_block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Cyan))
        .title(format!(" Target P/E for {} ", row.entry.get_ticker()))
        .title_alignment(Alignment::Center)
        .style(Style::default().bg(Color::Black));
    let inner = main_block.inner(popup_area);
    f.render_widget(main_block, popup_area);

    let popup_layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3),
            Constraint::Length(2),
            Constraint::Min(0),
        ])
        .split(inner);

    let input_field = Paragraph::new(format!("{}▌", app.edit_input))
        .style(
            Style::default()
                .fg(Color::White)
                .add_modifier(Modifier::BOLD),
        )
        .alignment(Alignment::Center)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(Style::default().fg(Color::Yellow))
                .title(" New Target P/E "),
        );
    f.render_widget(input_field, popup_layout[0]);

    // Preview the implied target price while typing
    let (preview, style) = match app.edit_input.trim().parse::<f64>() {
        Ok(pe) if pe > 0.0 => {
            let price = row.entry.get_eps() * pe;
            (
                format!("Target Price: {}", format_price(price)),
                Style::default().fg(Color::Green),
            )
        }
        Ok(_) => (
            "Target P/E must be positive".to_string(),
            Style::default().fg(Color::Red),
        ),
        Err(_) if app.edit_input.is_empty() => (
            "Enter a multiple...".to_string(),
            Style::default().fg(Color::Gray),
        ),
        Err(_) => (
            "Invalid number format".to_string(),
            Style::default().fg(Color::Red),
        ),
    };
    f.render_widget(
        Paragraph::new(preview).style(style).alignment(Alignment::Center),
        popup_layout[1],
    );
}

fn render_form_dialog<P>(f: &mut Frame, app: &App<P>, title: &str, form: &dyn StockForm)
where
    P: QuoteProvider + Send + Sync + 'static,
{
    let fields = form.fields();
    let height = (fields.len() as u16) * 3 + 6;
    let area = f.area();
    let popup_area = centered_rect(60, 100, area);
    let popup_area = Rect {
        y: area.y + area.height.saturating_sub(height) / 2,
        height: height.min(area.height),
        ..popup_area
    };
    f.render_widget(Clear, popup_area);

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Cyan))
        .title(title.to_string())
        .title_alignment(Alignment::Center)
        .style(Style::default().bg(Color::Black));
    let inner = block.inner(popup_area);
    f.render_widget(block, popup_area);

    let mut constraints: Vec<Constraint> = fields.iter().map(|_| Constraint::Length(3)).collect();
    constraints.push(Constraint::Min(0));
    let layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints(constraints)
        .split(inner);

    for (i, field) in fields.iter().enumerate() {
        let focused = i == app.focused_field;
        let value = form.value(*field);
        let (text, style) = if value.is_empty() && !focused {
            (field.placeholder().to_string(), Style::default().fg(Color::DarkGray))
        } else if focused {
            (format!("{value}▌"), Style::default().fg(Color::White))
        } else {
            (value.to_string(), Style::default().fg(Color::White))
        };
        let border = if focused { Color::Yellow } else { Color::Gray };
        let input = Paragraph::new(text).style(style).block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(Style::default().fg(border))
                .title(format!(" {} ", field.label())),
        );
        f.render_widget(input, layout[i]);
    }

    let status = if app.portfolio.is_loading() {
        Span::styled("Loading stock data...", Style::default().fg(Color::Cyan))
    } else if form.is_blank() {
        Span::styled("Please fill in all fields", Style::default().fg(Color::Gray))
    } else {
        Span::styled(
            "Enter: Add | Tab: Next Field | Esc: Close",
            Style::default().fg(Color::Gray),
        )
    };
    f.render_widget(
        Paragraph::new(Line::from(status)).alignment(Alignment::Center),
        layout[fields.len()],
    );
}

fn render_error_popup(f: &mut Frame, error: &str) {
    let popup_area = centered_rect(60, 20, f.area());
    f.render_widget(Clear, popup_area);

    let error_paragraph = Paragraph::new(error)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .title("Error (Enter/Esc to dismiss)")
                .style(Style::default().fg(Color::Red)),
        )
        .style(Style::default().fg(Color::White))
        .alignment(Alignment::Center)
        .wrap(Wrap { trim: true });

    f.render_widget(error_paragraph, popup_area);
}

fn centered_rect(percent_x: u16, percent_y: u16, r: Rect) -> Rect {
    let popup_layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage((100 - percent_y) / 2),
            Constraint::Percentage(percent_y),
            Constraint::Percentage((100 - percent_y) / 2),
        ])
        .split(r);

    Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage((100 - percent_x) / 2),
            Constraint::Percentage(percent_x),
            Constraint::Percentage((100 - percent_x) / 2),
        ])
        .split(popup_layout[1])[1]
}
