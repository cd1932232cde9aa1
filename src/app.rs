//! App: terminal init, main loop and key handling. Turns key presses into session calls and
//! keeps the screen in step with the session's level status.

use crate::GameConfig;
use crate::board::{Grid, Position};
use crate::game::{GameError, GameSession, LevelStatus, TapOutcome};
use crate::input::{Action, key_to_action};
use crate::theme::Theme;
use crate::ui::RevealState;
use anyhow::Result;
use crossterm::event::{self, Event, KeyEventKind};
use ratatui::DefaultTerminal;
use std::time::{Duration, Instant};

/// Notices fade from the status line after this long.
const NOTICE_TTL: Duration = Duration::from_secs(3);

/// Render cadence (~60 FPS).
const FRAME: Duration = Duration::from_millis(16);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Screen {
    Playing,
    LevelComplete,
    GameOver,
    ConfirmReset,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeKind {
    Info,
    Warn,
    Error,
}

/// One line of feedback under the board.
#[derive(Debug, Clone)]
pub struct Notice {
    pub text: String,
    pub kind: NoticeKind,
    pub at: Instant,
}

pub struct App {
    session: GameSession,
    config: GameConfig,
    theme: Theme,
    screen: Screen,
    /// Screen to return to when the reset prompt is dismissed.
    screen_before_prompt: Screen,
    cursor: Position,
    notice: Option<Notice>,
    reveal: RevealState,
}

impl App {
    pub fn new(session: GameSession, config: GameConfig, theme: Theme) -> Self {
        Self {
            session,
            config,
            theme,
            screen: Screen::Playing,
            screen_before_prompt: Screen::Playing,
            cursor: Position::new(3, 3),
            notice: None,
            reveal: RevealState::default(),
        }
    }

    pub fn run(&mut self) -> Result<()> {
        use crossterm::{
            execute,
            terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
        };

        enable_raw_mode()?;
        let mut stdout = std::io::stdout();
        execute!(stdout, EnterAlternateScreen)?;
        let mut terminal =
            ratatui::DefaultTerminal::new(ratatui::backend::CrosstermBackend::new(stdout))?;

        let result = self.run_loop(&mut terminal);

        execute!(std::io::stdout(), LeaveAlternateScreen)?;
        disable_raw_mode()?;
        if let Err(e) = &result {
            tracing::error!(error = %e, "game loop failed");
        }
        result
    }

    fn run_loop(&mut self, terminal: &mut DefaultTerminal) -> Result<()> {
        loop {
            let now = Instant::now();
            if self
                .notice
                .as_ref()
                .is_some_and(|n| now.duration_since(n.at) >= NOTICE_TTL)
            {
                self.notice = None;
            }

            terminal.draw(|f| {
                crate::ui::draw(
                    f,
                    self.screen,
                    &self.session,
                    &self.theme,
                    self.cursor,
                    self.notice.as_ref(),
                    &mut self.reveal,
                    now,
                    self.config.no_animation,
                )
            })?;
            self.reveal.finish_if_done();

            let timeout = FRAME.saturating_sub(now.elapsed());
            if !event::poll(timeout)? {
                continue;
            }
            while event::poll(Duration::ZERO)? {
                let Event::Key(key) = event::read()? else {
                    continue;
                };
                if key.kind != KeyEventKind::Press {
                    continue;
                }
                let action = key_to_action(key);
                if action == Action::Quit {
                    return Ok(());
                }
                self.handle(action);
            }
        }
    }

    /// Dispatch one action for the current screen.
    fn handle(&mut self, action: Action) {
        match action {
            Action::CursorUp => self.cursor = self.cursor.offset(-1, 0),
            Action::CursorDown => self.cursor = self.cursor.offset(1, 0),
            Action::CursorLeft => self.cursor = self.cursor.offset(0, -1),
            Action::CursorRight => self.cursor = self.cursor.offset(0, 1),
            _ => {}
        }

        match self.screen {
            Screen::Playing => {
                // Inputs wait for the last action's reveal, like a board that is still settling.
                if self.reveal.active() {
                    return;
                }
                match action {
                    Action::Tap | Action::Confirm => self.tap(),
                    Action::Bomb => self.bomb(),
                    Action::Shuffle => self.shuffle(),
                    Action::Reset => self.prompt_reset(),
                    _ => {}
                }
            }
            Screen::LevelComplete | Screen::GameOver => match action {
                Action::Tap | Action::Confirm => {
                    self.session.start_level();
                    self.reveal.clear();
                    self.screen = Screen::Playing;
                }
                Action::Reset => self.prompt_reset(),
                _ => {}
            },
            Screen::ConfirmReset => match action {
                Action::Confirm => {
                    let result = self.session.reset_progress();
                    self.reveal.clear();
                    self.screen = Screen::Playing;
                    match result {
                        Ok(()) => self.notify(NoticeKind::Info, "Progress reset to level 1"),
                        Err(e) => self.report_error(&e),
                    }
                }
                Action::Cancel => self.screen = self.screen_before_prompt,
                _ => {}
            },
        }
    }

    fn tap(&mut self) {
        let before = self.session.grid().clone();
        match self.session.tap(self.cursor) {
            Ok(TapOutcome::Committed(report)) => {
                let chain = report.passes.len();
                let text = if chain > 1 {
                    format!("+{} pts  chain x{chain}", report.score_delta)
                } else {
                    format!("+{} pts", report.score_delta)
                };
                self.notify(NoticeKind::Info, text);
                self.start_reveal(&before);
            }
            Ok(TapOutcome::NoLegalSwapMatch) => {
                self.notify(NoticeKind::Warn, "No match there; tiles swapped back");
            }
            Ok(TapOutcome::Selected(_) | TapOutcome::InvalidAdjacency | TapOutcome::Ignored) => {}
            Err(e) => self.report_error(&e),
        }
        self.sync_screen();
    }

    fn bomb(&mut self) {
        let before = self.session.grid().clone();
        match self.session.detonate() {
            Ok(report) => {
                self.notify(
                    NoticeKind::Info,
                    format!(
                        "Boom! {} tiles, +{} pts, +{} coins",
                        report.blast.destroyed + report.cascade.removed,
                        report.score_delta(),
                        report.coin_delta()
                    ),
                );
                self.start_reveal(&before);
            }
            Err(e @ GameError::NoChargesAvailable { .. }) => {
                self.notify(NoticeKind::Warn, e.to_string());
            }
            Err(e) => self.report_error(&e),
        }
        self.sync_screen();
    }

    fn shuffle(&mut self) {
        let before = self.session.grid().clone();
        match self.session.shuffle() {
            Ok(_) => {
                self.notify(NoticeKind::Info, "Board shuffled");
                self.start_reveal(&before);
            }
            Err(e) => self.report_error(&e),
        }
        self.sync_screen();
    }

    fn prompt_reset(&mut self) {
        self.screen_before_prompt = self.screen;
        self.screen = Screen::ConfirmReset;
    }

    /// Follow the session's level status onto the overlay screens.
    fn sync_screen(&mut self) {
        self.screen = match self.session.status() {
            LevelStatus::Playing => Screen::Playing,
            LevelStatus::LevelComplete => Screen::LevelComplete,
            LevelStatus::GameOver => Screen::GameOver,
        };
    }

    fn start_reveal(&mut self, before: &Grid) {
        if self.config.no_animation {
            return;
        }
        self.reveal.start(before.diff(self.session.grid()));
    }

    fn notify(&mut self, kind: NoticeKind, text: impl Into<String>) {
        self.notice = Some(Notice {
            text: text.into(),
            kind,
            at: Instant::now(),
        });
    }

    fn report_error(&mut self, e: &GameError) {
        match e {
            GameError::Persist(_) => tracing::error!(error = %e, "progress not saved"),
            _ => tracing::debug!(error = %e, "action refused"),
        }
        self.notify(NoticeKind::Error, e.to_string());
    }
}
