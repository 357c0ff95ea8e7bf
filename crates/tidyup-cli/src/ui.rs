use std::io;
use std::path::Path;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::anyhow;
use crossterm::event::{
    DisableBracketedPaste, EnableBracketedPaste, Event, KeyCode, KeyEvent, KeyEventKind,
    KeyModifiers,
};
use crossterm::execute;
use crossterm::terminal::{
    disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen,
};
use ratatui::backend::{Backend, CrosstermBackend};
use ratatui::layout::{Alignment, Constraint, Direction, Layout, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Clear, Gauge, List, ListItem, ListState, Paragraph, Wrap};
use ratatui::Terminal;
use tokio::sync::mpsc;
use tracing::debug;
use tracing::info;

use tidyup_core::actions::{ReviewAction, RuntimeAction, UserAction};
use tidyup_core::config::Config;
use tidyup_core::reducer::{bootstrap, reduce, ReviewEffect};
use tidyup_core::state::{ItemKind, ReviewItem, ReviewPhase, ReviewState, UiTheme};
use tidyup_exec::{apply_plan, read_snapshot, DryRunFs, GeminiAdvisor, RealFs};

use crate::input::{InputMsg, InputPump};

const TICK_INTERVAL: Duration = Duration::from_millis(200);

struct TuiGuard;

impl Drop for TuiGuard {
    fn drop(&mut self) {
        let _ = disable_raw_mode();
        let _ = execute!(
            io::stdout(),
            LeaveAlternateScreen,
            DisableBracketedPaste,
            crossterm::cursor::Show
        );
    }
}

pub async fn run(config: Config, root: PathBuf, dry_run: bool) -> anyhow::Result<()> {
    let advisor = GeminiAdvisor::from_env(&config.advisor)?;
    let palette = palette_for(config.ui.theme);
    let (tx, rx) = mpsc::unbounded_channel();
    let runner = EffectRunner {
        root: Arc::new(root),
        advisor,
        dry_run,
        tx,
    };

    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(
        stdout,
        EnterAlternateScreen,
        EnableBracketedPaste,
        crossterm::cursor::Hide
    )?;
    let _guard = TuiGuard;

    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;
    let mut state = ReviewState::new();

    run_app(&mut terminal, &mut state, &runner, rx, palette).await
}

enum Flow {
    Continue,
    Redraw,
    Exit,
}

/// Carries out reducer effects. Blocking filesystem work goes to the blocking
/// pool, the advisory call to a task; both report back over `tx`.
struct EffectRunner {
    root: Arc<PathBuf>,
    advisor: GeminiAdvisor,
    dry_run: bool,
    tx: mpsc::UnboundedSender<RuntimeAction>,
}

impl EffectRunner {
    fn dispatch(&self, effect: ReviewEffect) -> Flow {
        match effect {
            ReviewEffect::RequestFrame => Flow::Redraw,
            ReviewEffect::Exit => Flow::Exit,
            ReviewEffect::ReadSnapshot { cycle, depth } => {
                let root = Arc::clone(&self.root);
                let tx = self.tx.clone();
                tokio::task::spawn_blocking(move || {
                    let result = read_snapshot(&root, depth).map_err(|err| err.to_string());
                    let _ = tx.send(RuntimeAction::SnapshotReady { cycle, result });
                });
                Flow::Continue
            }
            ReviewEffect::RequestPlan {
                cycle,
                listing,
                instruction,
            } => {
                let advisor = self.advisor.clone();
                let tx = self.tx.clone();
                tokio::spawn(async move {
                    let result = advisor
                        .propose(&listing, instruction.as_deref())
                        .await
                        .map_err(|err| err.to_string());
                    let _ = tx.send(RuntimeAction::PlanReady { cycle, result });
                });
                Flow::Continue
            }
            ReviewEffect::ApplyPlan { cycle, items } => {
                let root = Arc::clone(&self.root);
                let tx = self.tx.clone();
                let dry_run = self.dry_run;
                tokio::task::spawn_blocking(move || {
                    let result = apply_items(&root, &items, dry_run).map_err(|err| err.to_string());
                    let _ = tx.send(RuntimeAction::ApplyDone { cycle, result });
                });
                Flow::Continue
            }
        }
    }
}

fn apply_items(
    root: &Path,
    items: &[ReviewItem],
    dry_run: bool,
) -> Result<tidyup_core::ApplyReport, tidyup_exec::ApplyError> {
    if !dry_run {
        return apply_plan(&mut RealFs, root, items);
    }
    let mut disk = DryRunFs::default();
    let report = apply_plan(&mut disk, root, items)?;
    for line in &disk.log {
        info!(dry_run = true, "{line}");
    }
    Ok(report)
}

async fn run_app<B: Backend>(
    terminal: &mut Terminal<B>,
    state: &mut ReviewState,
    runner: &EffectRunner,
    mut completions: mpsc::UnboundedReceiver<RuntimeAction>,
    palette: UiPalette,
) -> anyhow::Result<()> {
    let mut input = InputPump::new();
    let mut ticker = tokio::time::interval(TICK_INTERVAL);
    let mut effects = bootstrap(state);
    terminal.draw(|f| ui(f, state, runner, palette))?;

    loop {
        let mut redraw = false;
        for effect in effects.drain(..) {
            match runner.dispatch(effect) {
                Flow::Continue => {}
                Flow::Redraw => redraw = true,
                Flow::Exit => {
                    input.shutdown().await;
                    return Ok(());
                }
            }
        }
        if redraw {
            terminal.draw(|f| ui(f, state, runner, palette))?;
        }

        effects = tokio::select! {
            Some(msg) = input.recv() => match msg {
                InputMsg::Event(event) => handle_event(event, state),
                InputMsg::Error(err) => return Err(anyhow!("terminal input failed: {err}")),
            },
            Some(action) = completions.recv() => reduce(state, ReviewAction::Runtime(action)),
            _ = ticker.tick() => reduce(state, ReviewAction::Runtime(RuntimeAction::Tick)),
        };
    }
}

fn handle_event(event: Event, state: &mut ReviewState) -> Vec<ReviewEffect> {
    match event {
        Event::Key(key) if key.kind != KeyEventKind::Release => handle_key_event(key, state),
        Event::Paste(text) => reduce(
            state,
            ReviewAction::User(UserAction::InstructionPaste(text)),
        ),
        Event::Resize(..) => vec![ReviewEffect::RequestFrame],
        _ => Vec::new(),
    }
}

fn handle_key_event(key: KeyEvent, state: &mut ReviewState) -> Vec<ReviewEffect> {
    if key.modifiers.contains(KeyModifiers::CONTROL) && key.code == KeyCode::Char('c') {
        return reduce(state, ReviewAction::User(UserAction::Quit));
    }
    let action = if state.is_editing_instruction() {
        instruction_key(key)
    } else {
        review_key(key, state)
    };
    match action {
        Some(action) => {
            debug!(?action, "key");
            reduce(state, ReviewAction::User(action))
        }
        None => Vec::new(),
    }
}

fn instruction_key(key: KeyEvent) -> Option<UserAction> {
    match key.code {
        KeyCode::Esc => Some(UserAction::CancelInstruction),
        KeyCode::Enter => Some(UserAction::SubmitInstruction),
        KeyCode::Backspace => Some(UserAction::InstructionBackspace),
        KeyCode::Char(c) => Some(UserAction::InstructionInput(c)),
        _ => None,
    }
}

fn review_key(key: KeyEvent, state: &ReviewState) -> Option<UserAction> {
    match key.code {
        KeyCode::Char('q') => Some(UserAction::Quit),
        KeyCode::Enter => Some(UserAction::RequestPlan),
        KeyCode::Char(' ') => Some(UserAction::ToggleItem(state.selected)),
        KeyCode::Char('y') => Some(UserAction::Approve),
        KeyCode::Char('r') => Some(UserAction::Restart),
        KeyCode::Char('l') => Some(UserAction::Relist),
        KeyCode::Char('i') => Some(UserAction::OpenInstruction),
        KeyCode::Up | KeyCode::Char('k') => Some(UserAction::MoveUp),
        KeyCode::Down | KeyCode::Char('j') => Some(UserAction::MoveDown),
        _ => None,
    }
}

#[derive(Debug, Clone, Copy)]
struct UiPalette {
    accent: Color,
    success: Color,
    warning: Color,
    danger: Color,
    muted: Color,
    border: Color,
    selected_bg: Color,
}

fn palette_for(theme: UiTheme) -> UiPalette {
    match theme {
        UiTheme::Classic => UiPalette {
            accent: Color::Cyan,
            success: Color::Green,
            warning: Color::Yellow,
            danger: Color::Red,
            muted: Color::DarkGray,
            border: Color::Gray,
            selected_bg: Color::DarkGray,
        },
        UiTheme::Mono => UiPalette {
            accent: Color::White,
            success: Color::White,
            warning: Color::Gray,
            danger: Color::White,
            muted: Color::DarkGray,
            border: Color::Gray,
            selected_bg: Color::Rgb(48, 48, 48),
        },
    }
}

fn ui(f: &mut ratatui::Frame, state: &ReviewState, runner: &EffectRunner, palette: UiPalette) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .margin(1)
        .constraints([
            Constraint::Length(3), // Header
            Constraint::Min(0),    // Plan + activity
            Constraint::Length(5), // Status
            Constraint::Length(1), // Footer
        ])
        .split(f.area());

    let mode = if runner.dry_run { " | dry run" } else { "" };
    let header_text = format!(
        "tidyup | {} | {} | model {}{}",
        runner.root.display(),
        state.phase.label(),
        runner.advisor.model(),
        mode
    );
    let header = Paragraph::new(header_text)
        .style(Style::default().fg(palette.accent))
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(Style::default().fg(palette.border)),
        );
    f.render_widget(header, chunks[0]);

    let body = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(68), Constraint::Percentage(32)])
        .split(chunks[1]);
    render_plan(f, body[0], state, palette);
    render_activity(f, body[1], state, palette);
    render_status(f, chunks[2], state, palette);
    render_footer(f, chunks[3], state, palette);

    if let Some(draft) = state.instruction_draft.as_deref() {
        render_instruction(f, draft, palette);
    }
}

fn tree_prefix(item: &ReviewItem) -> String {
    match item.depth() {
        0 => String::new(),
        depth => format!("{}└─ ", "│  ".repeat(depth - 1)),
    }
}

fn plan_line(item: &ReviewItem, palette: UiPalette) -> Line<'static> {
    let prefix = Span::styled(tree_prefix(item), Style::default().fg(palette.muted));
    if item.rejected {
        let text = if item.is_synthetic() {
            item.target.clone()
        } else {
            item.source.clone()
        };
        return Line::from(vec![
            prefix,
            Span::styled("x ", Style::default().fg(palette.danger)),
            Span::styled(
                text,
                Style::default()
                    .fg(palette.danger)
                    .add_modifier(Modifier::CROSSED_OUT),
            ),
        ]);
    }

    match item.kind {
        ItemKind::Move => Line::from(vec![
            prefix,
            Span::styled("→ ", Style::default().fg(palette.accent)),
            Span::raw(item.target.clone()),
            Span::styled(
                format!("  (from {})", item.source),
                Style::default().fg(palette.muted),
            ),
        ]),
        ItemKind::Create => Line::from(vec![
            prefix,
            Span::styled("+ ", Style::default().fg(palette.success)),
            Span::styled(item.target.clone(), Style::default().fg(palette.success)),
        ]),
        ItemKind::Keep | ItemKind::RejectedCreate => Line::from(vec![
            prefix,
            Span::raw("  "),
            Span::raw(item.target.clone()),
        ]),
    }
}

fn render_plan(f: &mut ratatui::Frame, area: Rect, state: &ReviewState, palette: UiPalette) {
    let counts = state.plan.counts();
    let title = format!(
        "Plan | {} moves, {} new, {} rejected",
        counts.moves, counts.creates, counts.rejected
    );
    let items: Vec<ListItem> = state
        .plan
        .items
        .iter()
        .map(|item| ListItem::new(plan_line(item, palette)))
        .collect();

    let list = List::new(items)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(Style::default().fg(palette.border))
                .title(title),
        )
        .highlight_style(
            Style::default()
                .bg(palette.selected_bg)
                .add_modifier(Modifier::BOLD),
        );

    let mut list_state = ListState::default();
    if !state.plan.is_empty() {
        list_state.select(Some(state.selected));
    }
    f.render_stateful_widget(list, area, &mut list_state);
}

fn render_activity(f: &mut ratatui::Frame, area: Rect, state: &ReviewState, palette: UiPalette) {
    let visible = area.height.saturating_sub(2) as usize;
    let entries: Vec<&tidyup_core::ActivityEntry> = state.activity.iter().collect();
    let start = entries.len().saturating_sub(visible);
    let items: Vec<ListItem> = entries[start..]
        .iter()
        .map(|entry| {
            ListItem::new(Line::from(vec![
                Span::styled(
                    format!("#{} ", entry.cycle),
                    Style::default().fg(palette.muted),
                ),
                Span::raw(entry.message.clone()),
            ]))
        })
        .collect();

    let list = List::new(items).block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(palette.border))
            .title("Activity"),
    );
    f.render_widget(list, area);
}

fn render_status(f: &mut ratatui::Frame, area: Rect, state: &ReviewState, palette: UiPalette) {
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(palette.border))
        .title("Status");

    if let Some(in_flight) = state.in_flight {
        let gauge = Gauge::default()
            .block(block)
            .gauge_style(Style::default().fg(palette.accent))
            .ratio(state.progress.clamp(0.0, 1.0))
            .label(in_flight.label());
        f.render_widget(gauge, area);
        return;
    }

    let lines: Vec<Line> = match state.phase {
        ReviewPhase::Started => {
            let mut lines = vec![Line::from(
                "Press Enter to ask for a tidy-up plan, i to add an instruction, l to re-read the directory.",
            )];
            if let Some(instruction) = state.instruction.as_deref() {
                lines.push(Line::from(Span::styled(
                    format!("Instruction: {instruction}"),
                    Style::default().fg(palette.muted),
                )));
            }
            lines
        }
        ReviewPhase::Waiting => vec![Line::from("Waiting for the directory listing...")],
        ReviewPhase::Ready => vec![
            Line::from("Space rejects or restores the selected item."),
            Line::from(Span::styled(
                "Press y to apply the plan.",
                Style::default().fg(palette.warning),
            )),
        ],
        ReviewPhase::Finished => {
            let summary = match state.last_report {
                Some(report) => format!(
                    "Done: {} directories created, {} entries moved.",
                    report.created, report.moved
                ),
                None => "Done.".to_string(),
            };
            vec![
                Line::from(Span::styled(summary, Style::default().fg(palette.success))),
                Line::from("Press r to plan again or q to quit."),
            ]
        }
        ReviewPhase::Error => {
            let message = state
                .error
                .as_ref()
                .map(|err| format!("{} failed: {}", err.kind.label(), err.message))
                .unwrap_or_else(|| "Something went wrong.".to_string());
            vec![
                Line::from(Span::styled(message, Style::default().fg(palette.danger))),
                Line::from("Press r to start over or q to quit."),
            ]
        }
    };

    let p = Paragraph::new(lines).block(block).wrap(Wrap { trim: true });
    f.render_widget(p, area);
}

fn render_footer(f: &mut ratatui::Frame, area: Rect, state: &ReviewState, palette: UiPalette) {
    let hints: &[(&str, &str)] = match state.phase {
        ReviewPhase::Started => &[("enter", "plan"), ("i", "instruction"), ("l", "re-read")],
        ReviewPhase::Ready => &[("space", "toggle"), ("y", "apply"), ("↑↓", "move")],
        ReviewPhase::Finished | ReviewPhase::Error => &[("r", "restart"), ("↑↓", "move")],
        ReviewPhase::Waiting => &[("↑↓", "move")],
    };

    let mut spans = Vec::new();
    for (key, label) in hints {
        spans.push(Span::styled(*key, Style::default().fg(palette.accent)));
        spans.push(Span::styled(format!(" {label}  "), Style::default().fg(palette.muted)));
    }
    spans.push(Span::styled("q", Style::default().fg(palette.warning)));
    spans.push(Span::styled(" quit", Style::default().fg(palette.muted)));

    let p = Paragraph::new(Line::from(spans)).alignment(Alignment::Center);
    f.render_widget(p, area);
}

fn render_instruction(f: &mut ratatui::Frame, draft: &str, palette: UiPalette) {
    let area = centered_rect(60, 20, f.area());
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(palette.accent))
        .title("Instruction | Enter to save, Esc to cancel");
    let p = Paragraph::new(format!("{draft}▏"))
        .block(block)
        .wrap(Wrap { trim: false });
    f.render_widget(Clear, area);
    f.render_widget(p, area);
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

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn key(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    fn item(source: &str, kind: ItemKind, target: &str) -> ReviewItem {
        ReviewItem {
            source: source.to_string(),
            kind,
            target: target.to_string(),
            rejected: false,
        }
    }

    #[test]
    fn space_toggles_the_selected_item() {
        let mut state = ReviewState::new();
        state.selected = 3;
        assert_eq!(
            review_key(key(KeyCode::Char(' ')), &state),
            Some(UserAction::ToggleItem(3))
        );
    }

    #[test]
    fn editor_captures_plain_letters() {
        assert_eq!(
            instruction_key(key(KeyCode::Char('q'))),
            Some(UserAction::InstructionInput('q'))
        );
        assert_eq!(instruction_key(key(KeyCode::Esc)), Some(UserAction::CancelInstruction));
    }

    #[test]
    fn ctrl_c_quits_even_while_editing() {
        let mut state = ReviewState::new();
        state.instruction_draft = Some(String::new());
        let effects = handle_key_event(
            KeyEvent::new(KeyCode::Char('c'), KeyModifiers::CONTROL),
            &mut state,
        );
        assert_eq!(effects, vec![ReviewEffect::Exit]);
    }

    #[test]
    fn tree_prefix_tracks_depth() {
        assert_eq!(tree_prefix(&item("a.txt", ItemKind::Keep, "a.txt")), "");
        assert_eq!(tree_prefix(&item("", ItemKind::Create, "archive/")), "");
        assert_eq!(
            tree_prefix(&item("b.txt", ItemKind::Move, "archive/2024/b.txt")),
            "│  └─ "
        );
    }
}
