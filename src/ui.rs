//! Layout and drawing: board, sidebar, notice line, level/game-over/reset overlays.

use crate::app::{Notice, NoticeKind, Screen};
use crate::board::{BOARD_SIZE, Cell, Position};
use crate::bomb::{self, MAX_BOMBS};
use crate::game::GameSession;
use crate::theme::Theme;
use ratatui::Frame;
use ratatui::layout::{Alignment, Constraint, Direction, Layout, Position as CellPos, Rect};
use ratatui::style::{Color, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Gauge, Paragraph, Widget};
use std::collections::HashSet;
use std::time::Instant;
use tachyonfx::{
    CellFilter, Duration as TfxDuration, Effect, EffectRenderer, Interpolation, fx, ref_count,
};

/// Terminal columns per tile: bracket, 3-wide face, bracket.
const TILE_W: u16 = 5;
/// Terminal rows per tile: face plus a spacer row.
const TILE_H: u16 = 2;

const SIDEBAR_WIDTH: u16 = 28;

/// Duration of the fade-in on changed tiles (TachyonFX) in ms.
const REVEAL_MS: u32 = 350;

/// Board size in terminal cells, border included.
fn board_outer_size() -> (u16, u16) {
    let n = BOARD_SIZE as u16;
    (n * TILE_W + 2, n * TILE_H + 2)
}

/// Tiles that changed in the last action, and the fade that reveals them.
#[derive(Default)]
pub struct RevealState {
    cells: Vec<Position>,
    effect: Option<Effect>,
    processed_at: Option<Instant>,
}

impl RevealState {
    pub fn start(&mut self, cells: Vec<Position>) {
        self.clear();
        self.cells = cells;
    }

    pub fn active(&self) -> bool {
        !self.cells.is_empty()
    }

    pub fn clear(&mut self) {
        self.cells.clear();
        self.effect = None;
        self.processed_at = None;
    }

    pub fn finish_if_done(&mut self) {
        if self.effect.as_ref().is_some_and(Effect::done) {
            self.clear();
        }
    }
}

/// Top-left buffer cell of a tile inside the board's inner rect.
fn tile_origin(board: Rect, pos: Position) -> (u16, u16) {
    (
        board.x + pos.col as u16 * TILE_W,
        board.y + pos.row as u16 * TILE_H,
    )
}

/// Buffer (x, y) cells covered by the faces of the given tiles.
fn reveal_buffer_positions(board: Rect, cells: &[Position]) -> HashSet<(u16, u16)> {
    let mut set = HashSet::new();
    for &pos in cells {
        let (x0, y0) = tile_origin(board, pos);
        for x in x0 + 1..x0 + TILE_W - 1 {
            if x < board.x + board.width && y0 < board.y + board.height {
                set.insert((x, y0));
            }
        }
    }
    set
}

/// Draw the current screen. While a reveal is pending (and animation is on), fades the
/// changed tiles in from the board background.
pub fn draw(
    frame: &mut Frame,
    screen: Screen,
    session: &GameSession,
    theme: &Theme,
    cursor: Position,
    notice: Option<&Notice>,
    reveal: &mut RevealState,
    now: Instant,
    no_animation: bool,
) {
    let area = frame.area();
    fill_background(frame, area, theme);
    let board = draw_game(frame, session, theme, cursor, notice, area);

    if reveal.active() && !no_animation {
        apply_reveal_effect(frame, theme, board, reveal, now);
    }

    match screen {
        Screen::Playing => {}
        Screen::LevelComplete => draw_level_complete(frame, session, theme, area),
        Screen::GameOver => draw_game_over(frame, session, theme, area),
        Screen::ConfirmReset => draw_confirm_reset(frame, theme, area),
    }
}

fn fill_background(frame: &mut Frame, area: Rect, theme: &Theme) {
    let buf = frame.buffer_mut();
    for y in area.y..area.y + area.height {
        for x in area.x..area.x + area.width {
            buf[(x, y)].set_style(Style::default().bg(theme.bg));
        }
    }
}

fn apply_reveal_effect(
    frame: &mut Frame,
    theme: &Theme,
    board: Rect,
    reveal: &mut RevealState,
    now: Instant,
) {
    let delta = reveal
        .processed_at
        .map(|t| now.saturating_duration_since(t))
        .unwrap_or(std::time::Duration::ZERO);
    let delta_ms = delta.as_millis().min(u32::MAX as u128) as u32;
    reveal.processed_at = Some(now);

    if reveal.effect.is_none() {
        let set = reveal_buffer_positions(board, &reveal.cells);
        let filter = CellFilter::PositionFn(ref_count(move |pos: CellPos| {
            set.contains(&(pos.x, pos.y))
        }));
        let bg = theme.bg;
        let effect = fx::fade_from(bg, bg, (REVEAL_MS, Interpolation::Linear))
            .with_filter(filter)
            .with_area(board);
        reveal.effect = Some(effect);
    }

    if let Some(effect) = reveal.effect.as_mut() {
        frame.render_effect(effect, board, TfxDuration::from_millis(delta_ms));
    }
}

/// Board + sidebar centred, notice line underneath. Returns the board's inner rect.
fn draw_game(
    frame: &mut Frame,
    session: &GameSession,
    theme: &Theme,
    cursor: Position,
    notice: Option<&Notice>,
    area: Rect,
) -> Rect {
    let (bw, bh) = board_outer_size();
    let total_w = bw + SIDEBAR_WIDTH;

    let horiz = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Fill(1),
            Constraint::Length(total_w),
            Constraint::Fill(1),
        ])
        .split(area);
    let vert = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Fill(1),
            Constraint::Length(bh),
            Constraint::Length(1),
            Constraint::Fill(1),
        ])
        .split(horiz[1]);

    let inner = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Length(bw), Constraint::Length(SIDEBAR_WIDTH)])
        .split(vert[1]);

    let board = draw_board(frame, session, theme, cursor, inner[0]);
    draw_sidebar(frame, session, theme, cursor, inner[1]);
    draw_notice(frame, theme, notice, vert[2]);
    board
}

fn draw_board(
    frame: &mut Frame,
    session: &GameSession,
    theme: &Theme,
    cursor: Position,
    area: Rect,
) -> Rect {
    let title = format!(" FruitMatch  | Level {} ", session.level().level);
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(theme.div_line).bg(theme.bg))
        .title(Span::styled(title, theme.title));
    let board = block.inner(area);
    block.render(area, frame.buffer_mut());

    let selected = session.selection();
    let limit_x = board.x + board.width;
    let limit_y = board.y + board.height;
    let buf = frame.buffer_mut();

    for (r, row) in session.grid().rows().iter().enumerate() {
        for (c, cell) in row.iter().enumerate() {
            let pos = Position::new(r, c);
            let (x0, y0) = tile_origin(board, pos);
            if x0 + TILE_W > limit_x || y0 >= limit_y {
                continue;
            }

            let (face, style) = match *cell {
                Cell::Symbol(s) => {
                    let colour = theme.tile_color(s);
                    let style = if selected == Some(pos) {
                        Style::default().fg(colour).bg(theme.selected).bold()
                    } else {
                        Style::default().fg(theme.bg).bg(colour).bold()
                    };
                    (s.glyph(), style)
                }
                Cell::Empty => ('·', Style::default().fg(theme.inactive_fg).bg(theme.bg)),
            };
            buf[(x0 + 1, y0)].set_symbol(" ").set_style(style);
            buf[(x0 + 2, y0)]
                .set_symbol(face.encode_utf8(&mut [0; 4]))
                .set_style(style);
            buf[(x0 + 3, y0)].set_symbol(" ").set_style(style);

            if pos == cursor {
                let marker = Style::default().fg(theme.title).bg(theme.bg).bold();
                buf[(x0, y0)].set_symbol("[").set_style(marker);
                buf[(x0 + TILE_W - 1, y0)].set_symbol("]").set_style(marker);
            }
        }
    }
    board
}

fn draw_sidebar(
    frame: &mut Frame,
    session: &GameSession,
    theme: &Theme,
    cursor: Position,
    area: Rect,
) {
    let title_style = Style::default().fg(theme.title);
    let fg_style = Style::default().fg(theme.main_fg);
    let dim_style = Style::default().fg(theme.inactive_fg);
    let border_style = Style::default().fg(theme.div_line).bg(theme.bg);
    let level = session.level();

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(7), // Stats (border + player, level, moves, coins, bombs)
            Constraint::Length(4), // Target (border + label + gauge)
            Constraint::Fill(1),   // Keys
        ])
        .split(area);

    // --- Stats ---
    let stats_block = Block::default().borders(Borders::ALL).border_style(border_style);
    let stats_inner = stats_block.inner(chunks[0]);
    stats_block.render(chunks[0], frame.buffer_mut());
    let charges: String = (0..MAX_BOMBS)
        .map(|i| if i < session.bombs() { '●' } else { '○' })
        .collect();
    let moves_style = if level.moves <= 3 {
        Style::default().fg(Color::Red).bold()
    } else {
        fg_style
    };
    let stat = |label: &'static str, value: String, style: Style| {
        Line::from(vec![Span::styled(label, title_style), Span::styled(value, style)])
    };
    let stats_lines = vec![
        stat("Player: ", session.player().to_string(), fg_style),
        stat("Level:  ", level.level.to_string(), fg_style),
        stat("Moves:  ", level.moves.to_string(), moves_style),
        stat("Coins:  ", session.coins().to_string(), fg_style),
        Line::from(vec![
            Span::styled("Bombs:  ", title_style),
            Span::styled(charges, fg_style),
            Span::styled(
                format!("  ↻ L{}", bomb::next_recharge_level(level.level)),
                dim_style,
            ),
        ]),
    ];
    Paragraph::new(ratatui::text::Text::from(stats_lines)).render(stats_inner, frame.buffer_mut());

    // --- Target ---
    let target_block = Block::default().borders(Borders::ALL).border_style(border_style);
    let target_inner = target_block.inner(chunks[1]);
    target_block.render(chunks[1], frame.buffer_mut());
    let target_layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(1), Constraint::Length(1)])
        .split(target_inner);
    Paragraph::new(Line::from(vec![
        Span::styled("Score ", title_style),
        Span::styled(format!("{} / {}", level.score, level.target), fg_style),
    ]))
    .render(target_layout[0], frame.buffer_mut());
    let ratio = if level.target > 0 {
        (f64::from(level.score) / f64::from(level.target)).min(1.0)
    } else {
        1.0
    };
    let bar_color = if ratio >= 1.0 {
        Color::Green
    } else if ratio > 0.5 {
        Color::Yellow
    } else {
        theme.title
    };
    Gauge::default()
        .ratio(ratio)
        .gauge_style(Style::default().fg(bar_color).bg(theme.div_line))
        .render(target_layout[1], frame.buffer_mut());

    // --- Keys ---
    let keys_block = Block::default().borders(Borders::ALL).border_style(border_style);
    let keys_inner = keys_block.inner(chunks[2]);
    keys_block.render(chunks[2], frame.buffer_mut());
    let under_cursor = session
        .grid()
        .get(cursor)
        .symbol()
        .map_or("empty", |s| s.name());
    let key = |k: &'static str, what: &'static str| {
        vec![Span::styled(k, title_style), Span::styled(what, dim_style)]
    };
    let keys_lines = vec![
        Line::from(vec![
            Span::styled("Cursor: ", title_style),
            Span::styled(under_cursor, fg_style),
        ]),
        Line::from([key("←↑↓→ ", "move  "), key("space ", "swap")].concat()),
        Line::from([key("b ", "bomb  "), key("s ", "shuffle")].concat()),
        Line::from([key("r ", "reset "), key("q ", "quit")].concat()),
    ];
    Paragraph::new(ratatui::text::Text::from(keys_lines)).render(keys_inner, frame.buffer_mut());
}

fn draw_notice(frame: &mut Frame, theme: &Theme, notice: Option<&Notice>, area: Rect) {
    let Some(notice) = notice else {
        return;
    };
    let colour = match notice.kind {
        NoticeKind::Info => theme.main_fg,
        NoticeKind::Warn => Color::Yellow,
        NoticeKind::Error => Color::Red,
    };
    Paragraph::new(Line::from(Span::styled(
        notice.text.as_str(),
        Style::default().fg(colour).bg(theme.bg),
    )))
    .alignment(Alignment::Center)
    .render(area, frame.buffer_mut());
}

/// Rect of `w` x `h` centred in `area`, clamped to it, with its background cleared.
fn popup_rect(frame: &mut Frame, theme: &Theme, area: Rect, w: u16, h: u16) -> Rect {
    let popup = Rect {
        x: area.x + area.width.saturating_sub(w) / 2,
        y: area.y + area.height.saturating_sub(h) / 2,
        width: w.min(area.width),
        height: h.min(area.height),
    };
    fill_background(frame, popup, theme);
    popup
}

fn draw_popup(frame: &mut Frame, theme: &Theme, popup: Rect, title: &str, lines: Vec<Line>) {
    let p = Paragraph::new(lines).alignment(Alignment::Center).block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(theme.div_line).bg(theme.bg))
            .title(Span::styled(title.to_string(), theme.title)),
    );
    p.render(popup, frame.buffer_mut());
}

fn draw_level_complete(frame: &mut Frame, session: &GameSession, theme: &Theme, area: Rect) {
    let popup = popup_rect(frame, theme, area, 34, 9);
    let level = session.level();
    let fg = Style::default().fg(theme.main_fg);
    let mut lines = vec![
        Line::from(""),
        Line::from(Span::styled(
            format!(" Level {} cleared! ", level.level.saturating_sub(1)),
            Style::default().fg(Color::Black).bg(Color::Green).bold(),
        )),
        Line::from(""),
        Line::from(Span::styled(format!(" Score: {} ", level.score), fg)),
        Line::from(Span::styled(format!(" Coins: {} ", session.coins()), fg)),
    ];
    if bomb::recharges_on_entering(level.level) {
        lines.push(Line::from(Span::styled(
            " Bombs recharged! ",
            Style::default().fg(Color::Yellow).bold(),
        )));
    }
    lines.push(Line::from(Span::styled(
        format!(" Enter — Level {}    Q — Quit ", level.level),
        fg,
    )));
    draw_popup(frame, theme, popup, " Level complete ", lines);
}

fn draw_game_over(frame: &mut Frame, session: &GameSession, theme: &Theme, area: Rect) {
    let popup = popup_rect(frame, theme, area, 34, 8);
    let level = session.level();
    let fg = Style::default().fg(theme.main_fg);
    let lines = vec![
        Line::from(""),
        Line::from(Span::styled(
            " Out of moves ",
            Style::default().fg(Color::White).bg(Color::Red),
        )),
        Line::from(""),
        Line::from(Span::styled(
            format!(" Score: {} / {} ", level.score, level.target),
            fg,
        )),
        Line::from(""),
        Line::from(Span::styled(" Enter — Retry    Q — Quit ", fg)),
    ];
    draw_popup(frame, theme, popup, " Game over ", lines);
}

fn draw_confirm_reset(frame: &mut Frame, theme: &Theme, area: Rect) {
    let popup = popup_rect(frame, theme, area, 36, 7);
    let lines = vec![
        Line::from(""),
        Line::from(Span::styled(
            " Reset all progress? ",
            Style::default().fg(Color::Black).bg(Color::Yellow),
        )),
        Line::from(Span::styled(
            " Back to level 1, no coins ",
            Style::default().fg(theme.inactive_fg),
        )),
        Line::from(""),
        Line::from(Span::styled(
            " Y — Reset    N — Keep ",
            Style::default().fg(theme.main_fg),
        )),
    ];
    draw_popup(frame, theme, popup, " Reset ", lines);
}
