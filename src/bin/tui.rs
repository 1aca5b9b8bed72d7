use std::io;

use crossterm::{
    event::{self, DisableMouseCapture, EnableMouseCapture, Event, KeyCode},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ninetty::{GameState, Player, SubBoard, UltimateTicTacToe, WinningLine};
use sodium as na;
use tui::{
    backend::{Backend, CrosstermBackend},
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Span, Spans},
    widgets::{Block, Borders, Paragraph, Widget},
    Frame, Terminal,
};

fn main() -> io::Result<()> {
    let ctx = na::SodiumCtx::new();

    let (selections, game) = ctx.transaction(|| {
        let selections: na::StreamSink<(usize, usize)> = ctx.new_stream_sink();
        let game = UltimateTicTacToe::new(&ctx, &selections.stream());
        (selections, game)
    });

    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;

    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let mut ui = Ui {
        state: game.state.clone(),
        cursor: (4, 4),
    };

    loop {
        terminal.draw(|f| ui.draw(f))?;

        if let Event::Key(key) = event::read()? {
            match key.code {
                KeyCode::Char('q') | KeyCode::Esc => break,
                KeyCode::Left => ui.move_cursor(-1, 0),
                KeyCode::Right => ui.move_cursor(1, 0),
                KeyCode::Up => ui.move_cursor(0, -1),
                KeyCode::Down => ui.move_cursor(0, 1),
                KeyCode::Enter | KeyCode::Char(' ') => {
                    selections.send(ui.selection());
                }
                _ => {}
            }
        }
    }

    // restore terminal
    disable_raw_mode()?;
    execute!(
        terminal.backend_mut(),
        LeaveAlternateScreen,
        DisableMouseCapture
    )?;
    terminal.show_cursor()?;

    Ok(())
}

struct Ui {
    state: na::Cell<GameState>,
    /// Global (column, row) over the 9x9 cell grid.
    cursor: (i16, i16),
}

impl Ui {
    fn move_cursor(&mut self, dx: i16, dy: i16) {
        self.cursor.0 = (self.cursor.0 + dx).clamp(0, 8);
        self.cursor.1 = (self.cursor.1 + dy).clamp(0, 8);
    }

    fn selection(&self) -> (usize, usize) {
        let (col, row) = (self.cursor.0 as usize, self.cursor.1 as usize);
        let board = (row / 3) * 3 + col / 3;
        let cell = (row % 3) * 3 + col % 3;
        (board, cell)
    }

    fn draw<B: Backend>(&self, f: &mut Frame<B>) {
        let state = self.state.sample();

        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .margin(1)
            .constraints([Constraint::Length(3), Constraint::Min(0)].as_ref())
            .split(f.size());

        self.draw_scoreboard(f, chunks[0], &state);
        self.draw_boards(f, chunks[1], &state);
    }

    fn draw_scoreboard<B: Backend>(&self, f: &mut Frame<B>, area: Rect, state: &GameState) {
        let mover_style = Style::default().add_modifier(Modifier::BOLD);
        let idle_style = Style::default();
        let (x_style, o_style) = match state.current_player {
            Player::X => (mover_style, idle_style),
            Player::O => (idle_style, mover_style),
        };

        let target = match state.active_board {
            Some(board) => format!("{:?} plays board {}", state.current_player, board + 1),
            None => format!("{:?} plays any board", state.current_player),
        };
        let line = Spans::from(vec![
            Span::styled(format!("Player O: {}", state.o_score), o_style),
            Span::raw("    "),
            Span::styled(format!("Player X: {}", state.x_score), x_style),
            Span::raw("    "),
            Span::raw(target),
        ]);

        let block = Block::default()
            .title("Ultimate Tic Tac Toe")
            .borders(Borders::ALL);
        f.render_widget(Paragraph::new(line).block(block), area);
    }

    fn draw_boards<B: Backend>(&self, f: &mut Frame<B>, area: Rect, state: &GameState) {
        let thirds = [
            Constraint::Ratio(1, 3),
            Constraint::Ratio(1, 3),
            Constraint::Ratio(1, 3),
        ];
        let rows = Layout::default()
            .direction(Direction::Vertical)
            .constraints(thirds.as_ref())
            .split(area);

        let (cursor_board, cursor_cell) = self.selection();

        for board_row in 0..3 {
            let cols = Layout::default()
                .direction(Direction::Horizontal)
                .constraints(thirds.as_ref())
                .split(rows[board_row]);

            for board_col in 0..3 {
                let index = board_row * 3 + board_col;
                let is_active = state.active_board.map_or(true, |active| active == index);
                let border_style = if is_active {
                    Style::default()
                        .fg(Color::Blue)
                        .add_modifier(Modifier::BOLD)
                } else {
                    Style::default().fg(Color::DarkGray)
                };

                let block = Block::default()
                    .borders(Borders::ALL)
                    .border_style(border_style);
                let view = SubBoardView {
                    board: state.boards[index],
                    lines: state.winning_lines[index].clone(),
                    cursor: (cursor_board == index).then_some(cursor_cell),
                };
                f.render_widget(view, block.inner(cols[board_col]));
                f.render_widget(block, cols[board_col]);
            }
        }
    }
}

struct SubBoardView {
    board: SubBoard,
    lines: Vec<WinningLine>,
    cursor: Option<usize>,
}

impl Widget for SubBoardView {
    fn render(self, area: Rect, buf: &mut tui::buffer::Buffer) {
        if area.width < 3 || area.height < 3 {
            return;
        }

        // Streak segments first, so the marks stay legible on top of them.
        for line in &self.lines {
            draw_streak(area, buf, line);
        }

        for cell in 0..9 {
            let (x, y) = cell_midpoint(area, cell);
            let symbol = match self.board.cells[cell] {
                Some(Player::X) => "X",
                Some(Player::O) => "O",
                None => "·",
            };
            let style = if self.cursor == Some(cell) {
                Style::default()
                    .fg(Color::Black)
                    .bg(Color::Yellow)
                    .add_modifier(Modifier::BOLD)
            } else {
                Style::default()
            };
            buf.set_string(x, y, symbol, style);
        }
    }
}

/// Midpoint of a cell in sub-board-local screen coordinates; the cell grid
/// splits the area into thirds both ways.
fn cell_midpoint(area: Rect, cell: usize) -> (u16, u16) {
    let col = (cell % 3) as u16;
    let row = (cell / 3) as u16;
    (
        area.x + (col * 2 + 1) * area.width / 6,
        area.y + (row * 2 + 1) * area.height / 6,
    )
}

/// A completed line is drawn from the midpoint of its first cell to the
/// midpoint of its last cell.
fn draw_streak(area: Rect, buf: &mut tui::buffer::Buffer, line: &WinningLine) {
    let (x0, y0) = cell_midpoint(area, line.start);
    let (x1, y1) = cell_midpoint(area, line.end);

    let steps = (x1 as i32 - x0 as i32)
        .abs()
        .max((y1 as i32 - y0 as i32).abs())
        .max(1);
    for i in 0..=steps {
        let t = i as f32 / steps as f32;
        let x = x0 as f32 + (x1 as f32 - x0 as f32) * t;
        let y = y0 as f32 + (y1 as f32 - y0 as f32) * t;
        buf.get_mut(x.round() as u16, y.round() as u16)
            .set_char('*')
            .set_fg(Color::Red);
    }
}
