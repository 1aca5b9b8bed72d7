use std::fmt;

const WIN_SEQUENCES: [[usize; 3]; 8] = [
    // Horizontal
    [0, 1, 2],
    [3, 4, 5],
    [6, 7, 8],
    // Vertical
    [0, 3, 6],
    [1, 4, 7],
    [2, 5, 8],
    // Diagonal
    [0, 4, 8],
    [2, 4, 6],
];

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Player {
    X,
    O,
}

impl Player {
    pub fn swap(&self) -> Player {
        match self {
            Player::X => Player::O,
            Player::O => Player::X,
        }
    }
}

/// One completed three-in-a-row inside a sub-board, identified by the first
/// and last cell of its combination. Equality is structural, so a combination
/// is recorded at most once no matter which cell completed it.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct WinningLine {
    pub start: usize,
    pub end: usize,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct SubBoard {
    pub cells: [Option<Player>; 9],
}

impl SubBoard {
    pub fn new() -> Self {
        let cells = [None; 9];
        Self { cells }
    }

    pub fn mark(&self, index: usize, player: Player) -> SubBoard {
        let mut new_board = *self;
        new_board.cells[index] = Some(player);
        new_board
    }

    pub fn is_full(&self) -> bool {
        self.cells.iter().all(|cell| cell.is_some())
    }

    /// Every combination currently held entirely by `player`, in the fixed
    /// row/column/diagonal evaluation order.
    pub fn completed_lines(&self, player: Player) -> Vec<WinningLine> {
        WIN_SEQUENCES
            .iter()
            .filter(|seq| seq.iter().all(|&i| self.cells[i] == Some(player)))
            .map(|seq| WinningLine {
                start: seq[0],
                end: seq[2],
            })
            .collect()
    }

    fn display_cells(&self) -> [&'static str; 9] {
        let mut display = [""; 9];
        for (dcell, cell) in display.iter_mut().zip(self.cells.iter()) {
            match cell {
                Some(Player::X) => *dcell = "X",
                Some(Player::O) => *dcell = "O",
                None => *dcell = " ",
            }
        }
        display
    }
}

impl Default for SubBoard {
    fn default() -> Self {
        SubBoard::new()
    }
}

/// One immutable snapshot of the whole game. `apply_move` derives the next
/// snapshot and never touches this one, so any number of observers may hold
/// onto a snapshot while play continues.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GameState {
    pub boards: [SubBoard; 9],
    pub current_player: Player,
    /// The sub-board the mover is forced into; `None` means free choice.
    pub active_board: Option<usize>,
    pub x_score: u32,
    pub o_score: u32,
    /// Discovery-ordered, append-only record of scored lines, one list per
    /// sub-board.
    pub winning_lines: [Vec<WinningLine>; 9],
}

impl GameState {
    pub fn new() -> Self {
        Self {
            boards: [SubBoard::new(); 9],
            current_player: Player::X,
            active_board: None,
            x_score: 0,
            o_score: 0,
            winning_lines: std::array::from_fn(|_| Vec::new()),
        }
    }

    pub fn score(&self, player: Player) -> u32 {
        match player {
            Player::X => self.x_score,
            Player::O => self.o_score,
        }
    }

    pub fn is_valid_move(&self, board_index: usize, cell_index: usize) -> bool {
        self.boards[board_index].cells[cell_index].is_none()
            && self.active_board.map_or(true, |active| active == board_index)
    }

    /// Plays `current_player` at `cell_index` of `board_index`.
    ///
    /// An illegal move (occupied cell, or a board other than the forced one)
    /// returns an unchanged copy of `self`; there is no error to handle, a
    /// late or duplicate click simply does nothing. Both indices must be in
    /// `0..=8`.
    ///
    /// A legal move marks the cell, records and scores every combination it
    /// newly completes (several can complete at once, and boards keep
    /// scoring after their first line until they fill), forces the opponent
    /// into sub-board `cell_index` unless that board is already full, and
    /// hands over the turn.
    pub fn apply_move(&self, board_index: usize, cell_index: usize) -> GameState {
        if !self.is_valid_move(board_index, cell_index) {
            return self.clone();
        }

        let player = self.current_player;
        let mut next = self.clone();
        next.boards[board_index] = next.boards[board_index].mark(cell_index, player);

        let mut new_streaks = 0;
        let completed = next.boards[board_index].completed_lines(player);
        let recorded = &mut next.winning_lines[board_index];
        for line in completed {
            if !recorded.contains(&line) {
                recorded.push(line);
                new_streaks += 1;
            }
        }
        match player {
            Player::X => next.x_score += new_streaks,
            Player::O => next.o_score += new_streaks,
        }

        next.active_board = if next.boards[cell_index].is_full() {
            None
        } else {
            Some(cell_index)
        };
        next.current_player = player.swap();
        next
    }
}

impl Default for GameState {
    fn default() -> Self {
        GameState::new()
    }
}

impl fmt::Display for GameState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for board_row in 0..3 {
            for cell_row in 0..3 {
                for board_col in 0..3 {
                    let ds = self.boards[board_row * 3 + board_col].display_cells();
                    let base = cell_row * 3;
                    write!(f, " {} | {} | {} ", ds[base], ds[base + 1], ds[base + 2])?;
                    if board_col < 2 {
                        f.write_str("#")?;
                    }
                }
                writeln!(f)?;
                if cell_row < 2 {
                    f.write_str("---+---+---#---+---+---#---+---+---\n")?;
                }
            }
            if board_row < 2 {
                f.write_str("###################################\n")?;
            }
        }
        Ok(())
    }
}
