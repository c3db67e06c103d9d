use crate::{
    controller::AppController,
    notify::{
        NotificationKind,
        Toasts,
    },
};
use alloy::primitives::Address;
use color_eyre::eyre::{
    Result,
    eyre,
};
use crossterm::{
    event::{
        Event,
        EventStream,
        KeyCode,
        KeyEventKind,
    },
    terminal::{
        disable_raw_mode,
        enable_raw_mode,
    },
};
use futures::StreamExt;
use ratatui::{
    prelude::*,
    widgets::*,
};
use std::io::{
    Stdout,
    stdout,
};

const SPINNER_FRAMES: [&str; 4] = ["|", "/", "-", "\\"];

pub type InputEventReceiver = EventStream;

pub enum UserEvent {
    Quit,
    EnterRaffle,
    Refresh,
    Redraw,
}

#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
enum Mode {
    #[default]
    Normal,
    QuitModal,
}

#[derive(Default)]
pub struct UiState {
    mode: Mode,
    spinner_frame: usize,
    terminal: Option<Terminal<CrosstermBackend<Stdout>>>,
}

impl UiState {
    /// Advance the pending-entry spinner by one frame.
    pub fn tick(&mut self) {
        self.spinner_frame = (self.spinner_frame + 1) % SPINNER_FRAMES.len();
    }

    fn spinner(&self) -> &'static str {
        SPINNER_FRAMES[self.spinner_frame]
    }
}

/// Everything one frame needs.
pub struct View<'a> {
    pub controller: &'a AppController,
    pub toasts: &'a Toasts,
    pub wallet: Option<Address>,
}

pub fn terminal_enter(state: &mut UiState) -> Result<()> {
    enable_raw_mode()?;
    crossterm::execute!(stdout(), crossterm::terminal::EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout());
    state.terminal = Some(Terminal::new(backend)?);
    Ok(())
}

pub fn terminal_exit() -> Result<()> {
    disable_raw_mode()?;
    crossterm::execute!(stdout(), crossterm::terminal::LeaveAlternateScreen)?;
    Ok(())
}

pub fn input_event_stream() -> InputEventReceiver {
    EventStream::new()
}

pub async fn next_raw_event(input: &mut InputEventReceiver) -> Result<Event> {
    match input.next().await {
        Some(event) => Ok(event?),
        None => Err(eyre!("terminal input stream closed")),
    }
}

pub fn interpret_event(state: &mut UiState, event: Event) -> Option<UserEvent> {
    let key = match event {
        Event::Key(key) if key.kind == KeyEventKind::Press => key,
        Event::Resize(..) => return Some(UserEvent::Redraw),
        _ => return None,
    };
    match state.mode {
        Mode::QuitModal => match key.code {
            KeyCode::Char('y') | KeyCode::Char('Y') => Some(UserEvent::Quit),
            KeyCode::Char('n') | KeyCode::Char('N') | KeyCode::Esc => {
                state.mode = Mode::Normal;
                Some(UserEvent::Redraw)
            }
            _ => None,
        },
        Mode::Normal => match key.code {
            KeyCode::Char('q') | KeyCode::Esc => {
                state.mode = Mode::QuitModal;
                Some(UserEvent::Redraw)
            }
            KeyCode::Char('e') | KeyCode::Enter => Some(UserEvent::EnterRaffle),
            KeyCode::Char('r') => Some(UserEvent::Refresh),
            _ => None,
        },
    }
}

pub fn draw(state: &mut UiState, view: &View<'_>) -> Result<()> {
    if let Some(mut term) = state.terminal.take() {
        let drawn = term.draw(|f| render(f, state, view)).map(|_| ());
        state.terminal = Some(term);
        drawn?;
    }
    Ok(())
}

pub fn render(f: &mut Frame, state: &UiState, view: &View<'_>) {
    f.render_widget(Clear, f.area());
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(4), // status
            Constraint::Min(7),    // lottery
            Constraint::Length(6), // errors
            Constraint::Length(3), // help
        ])
        .split(f.area());

    draw_status(f, chunks[0], view);
    draw_lottery(f, chunks[1], state, view);
    draw_errors(f, chunks[2], view.controller);
    draw_help(f, chunks[3]);
    draw_toasts(f, view.toasts);
    if state.mode == Mode::QuitModal {
        draw_quit_modal(f);
    }
}

fn draw_status(f: &mut Frame, area: Rect, view: &View<'_>) {
    let controller = view.controller;
    let network = controller.network();
    let chain = match network.network_id {
        Some(id) => format!("{} ({id})", network.descriptor),
        None => String::from("unknown"),
    };
    let raffle = match network.contract_address {
        Some(address) => address.to_string(),
        None => String::from("none"),
    };
    let wallet = match view.wallet {
        Some(address) => address.to_string(),
        None => String::from("read-only"),
    };
    let lines = vec![
        Line::from(format!("Network: {chain} | Raffle: {raffle}")),
        Line::from(format!("Wallet: {wallet} | {}", controller.status())),
    ];
    let status = Paragraph::new(lines).block(Block::default().borders(Borders::ALL).title("Status"));
    f.render_widget(status, area);
}

fn draw_lottery(f: &mut Frame, area: Rect, state: &UiState, view: &View<'_>) {
    let controller = view.controller;
    let block = Block::default().borders(Borders::ALL).title("Lottery");
    if !controller.network().has_contract() {
        let fallback = Paragraph::new("No Raffle Address detected")
            .style(Style::default().fg(Color::DarkGray))
            .block(block);
        f.render_widget(fallback, area);
        return;
    }

    let snapshot = controller.snapshot();
    let symbol = controller.network().descriptor.currency_symbol();
    let lines = vec![
        enter_button(state, controller),
        Line::from(""),
        Line::from(format!(
            "EntranceFee: {} {symbol}",
            snapshot.entrance_fee_display()
        )),
        Line::from(format!("NumberOfPlayers: {}", snapshot.player_count_display())),
        Line::from(format!("RecentWinner: {}", snapshot.recent_winner_display())),
    ];
    f.render_widget(Paragraph::new(lines).block(block), area);
}

fn enter_button(state: &UiState, controller: &AppController) -> Line<'static> {
    if controller.pending().is_active() {
        return Line::styled(
            format!("[ {} Entering... ]", state.spinner()),
            Style::default().fg(Color::Yellow),
        );
    }
    let style = if controller.can_enter() {
        Style::default()
            .fg(Color::Black)
            .bg(Color::Blue)
            .add_modifier(Modifier::BOLD)
    } else {
        Style::default().fg(Color::DarkGray)
    };
    Line::styled("[ Enter Raffle ]", style)
}

fn draw_errors(f: &mut Frame, area: Rect, controller: &AppController) {
    let errors = controller.errors();
    let visible = area.height.saturating_sub(2) as usize;
    let lines: Vec<Line> = if errors.is_empty() {
        vec![Line::from("No errors")]
    } else {
        errors
            .iter()
            .rev()
            .take(visible.max(1))
            .map(|e| Line::from(e.clone()))
            .collect()
    };
    let color = if errors.is_empty() {
        Color::DarkGray
    } else {
        Color::Red
    };
    let panel = Paragraph::new(lines)
        .style(Style::default().fg(color))
        .block(Block::default().borders(Borders::ALL).title("Errors"));
    f.render_widget(panel, area);
}

fn draw_help(f: &mut Frame, area: Rect) {
    let help = Paragraph::new("e/Enter enter raffle | r refresh | q/Esc quit")
        .block(Block::default().borders(Borders::ALL).title("Help"));
    f.render_widget(help, area);
}

fn draw_toasts(f: &mut Frame, toasts: &Toasts) {
    let full = f.area();
    let width = full.width.min(48);
    let mut y = full.y;
    for toast in toasts.visible() {
        if y + 4 > full.bottom() {
            break;
        }
        let area = Rect::new(full.right() - width, y, width, 4);
        let color = match toast.kind {
            NotificationKind::Info => Color::Cyan,
            NotificationKind::Success => Color::Green,
            NotificationKind::Warning => Color::Yellow,
            NotificationKind::Error => Color::Red,
        };
        let block = Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(color))
            .title(toast.title.clone());
        f.render_widget(Clear, area);
        f.render_widget(
            Paragraph::new(toast.message.clone())
                .wrap(Wrap { trim: true })
                .block(block),
            area,
        );
        y += 4;
    }
}

fn draw_quit_modal(f: &mut Frame) {
    let area = centered_rect(40, 20, f.area());
    let block = Block::default().borders(Borders::ALL).title("Confirm Quit");
    f.render_widget(Clear, area);
    f.render_widget(block.clone(), area);
    f.render_widget(Paragraph::new("Quit? (Y/N)"), block.inner(area));
}

fn centered_rect(w_percent: u16, h_percent: u16, r: Rect) -> Rect {
    let popup_layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage((100 - h_percent) / 2),
            Constraint::Percentage(h_percent),
            Constraint::Percentage((100 - h_percent) / 2),
        ])
        .split(r);

    Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage((100 - w_percent) / 2),
            Constraint::Percentage(w_percent),
            Constraint::Percentage((100 - w_percent) / 2),
        ])
        .split(popup_layout[1])[1]
}
