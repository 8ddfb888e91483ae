use crate::{
    action::ActionKind,
    session::SessionView,
};
use color_eyre::eyre::Result;
use crossterm::{
    event::{
        Event,
        EventStream,
        KeyCode,
        KeyEvent,
        KeyEventKind,
        KeyModifiers,
    },
    terminal::{
        disable_raw_mode,
        enable_raw_mode,
    },
};
use ratatui::{
    prelude::*,
    widgets::*,
};
use std::io::stdout;

const LOADING: &str = "Loading...";
const STAKE_LABEL: &str = "0.001";

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum UserEvent {
    Quit,
    Invoke(ActionKind),
    NextAccount,
    Disconnect,
}

#[derive(Default)]
pub struct UiState {
    terminal: Option<Terminal<CrosstermBackend<std::io::Stdout>>>,
}

pub fn terminal_enter(state: &mut UiState) -> Result<()> {
    enable_raw_mode()?;
    crossterm::execute!(std::io::stdout(), crossterm::terminal::EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout());
    state.terminal = Some(Terminal::new(backend)?);
    Ok(())
}

pub fn terminal_exit(state: &mut UiState) -> Result<()> {
    state.terminal = None;
    disable_raw_mode()?;
    crossterm::execute!(std::io::stdout(), crossterm::terminal::LeaveAlternateScreen)?;
    Ok(())
}

pub fn input_event_stream() -> EventStream {
    EventStream::new()
}

pub fn draw(state: &mut UiState, view: &SessionView) -> Result<()> {
    if let Some(term) = state.terminal.as_mut() {
        term.draw(|f| render(f, view))?;
    }
    Ok(())
}

/// Map a terminal event to what the user asked for. Key releases and
/// anything unbound are ignored.
pub fn interpret(event: &Event) -> Option<UserEvent> {
    let Event::Key(key) = event else {
        return None;
    };
    interpret_key(key)
}

pub fn interpret_key(key: &KeyEvent) -> Option<UserEvent> {
    if key.kind != KeyEventKind::Press {
        return None;
    }
    if key.modifiers.contains(KeyModifiers::CONTROL) {
        return matches!(key.code, KeyCode::Char('c')).then_some(UserEvent::Quit);
    }
    let event = match key.code {
        KeyCode::Char('q') | KeyCode::Esc => UserEvent::Quit,
        KeyCode::Char('e') => UserEvent::Invoke(ActionKind::Enter),
        KeyCode::Char('p') => UserEvent::Invoke(ActionKind::PickWinner),
        KeyCode::Char('c') => UserEvent::Invoke(ActionKind::ClaimPrize),
        KeyCode::Char('r') => UserEvent::Invoke(ActionKind::Reset),
        KeyCode::Char('n') => UserEvent::NextAccount,
        KeyCode::Char('d') => UserEvent::Disconnect,
        _ => return None,
    };
    Some(event)
}

pub fn render(f: &mut Frame, view: &SessionView) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3), // wallet
            Constraint::Min(8),    // lottery + winner
            Constraint::Length(4), // status
            Constraint::Length(3), // help
        ])
        .split(f.area());

    draw_wallet_panel(f, chunks[0], view);

    let middle = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(60), Constraint::Percentage(40)])
        .split(chunks[1]);
    let home = Paragraph::new(home_lines(view))
        .wrap(Wrap { trim: false })
        .block(Block::default().borders(Borders::ALL).title("Lottery"));
    f.render_widget(home, middle[0]);
    let winner = Paragraph::new(winner_lines(view))
        .wrap(Wrap { trim: false })
        .block(Block::default().borders(Borders::ALL).title("Winner"));
    f.render_widget(winner, middle[1]);

    draw_status(f, chunks[2], view);

    let help = Paragraph::new(
        "e enter | p pick winner | c claim | r reset | n next account | d disconnect | q/Esc quit",
    )
    .block(Block::default().borders(Borders::ALL).title("Help"));
    f.render_widget(help, chunks[3]);
}

fn draw_wallet_panel(f: &mut Frame, area: Rect, view: &SessionView) {
    let account = match &view.account {
        Some(account) => account.to_string(),
        None => String::from("not connected"),
    };
    let role = if view.is_manager { " (manager)" } else { "" };
    let widget = Paragraph::new(format!("Account: {account}{role}"))
        .block(Block::default().borders(Borders::ALL).title("Wallet"));
    f.render_widget(widget, area);
}

fn draw_status(f: &mut Frame, area: Rect, view: &SessionView) {
    let (text, color) = match (&view.message, view.busy) {
        (_, true) => (LOADING.to_string(), Color::Yellow),
        (Some(message), false) => (message.clone(), Color::Green),
        (None, false) => (String::from("Ready"), Color::Green),
    };
    let widget = Paragraph::new(text)
        .wrap(Wrap { trim: false })
        .block(Block::default().borders(Borders::ALL).title("Status"))
        .style(Style::default().fg(color));
    f.render_widget(widget, area);
}

fn action_line(key: char, label: &str, enabled: bool) -> Line<'static> {
    let text = format!("[{key}] {label}");
    if enabled {
        Line::from(text)
    } else {
        Line::styled(text, Style::default().fg(Color::DarkGray))
    }
}

fn home_lines(view: &SessionView) -> Vec<Line<'static>> {
    let Some(lottery) = &view.lottery else {
        return vec![Line::styled(LOADING, Style::default().fg(Color::DarkGray))];
    };
    let mut lines = vec![
        Line::from(format!(
            "Round: {}",
            if lottery.completed() { "complete" } else { "open" }
        )),
        Line::from(format!("Manager: {}", lottery.manager().short())),
        Line::from(""),
    ];
    if !lottery.completed() {
        lines.push(action_line(
            'e',
            &format!("Enter the lottery ({STAKE_LABEL})"),
            view.eligibility.enter,
        ));
    } else if let Some(notice) = view.home_notice() {
        lines.push(Line::from(notice));
    } else {
        lines.push(action_line('c', "Claim Prize", view.eligibility.claim_prize));
    }
    if view.is_manager {
        lines.push(action_line('r', "Reset Lottery", view.eligibility.reset));
    }
    lines
}

fn winner_lines(view: &SessionView) -> Vec<Line<'static>> {
    if view.lottery.is_none() {
        return vec![Line::styled(LOADING, Style::default().fg(Color::DarkGray))];
    }
    match view.result_notice() {
        Some(notice) => vec![Line::from(notice)],
        None => vec![action_line('p', "Pick Winner", view.eligibility.pick_winner)],
    }
}
