use std::num::ParseIntError;

use sodium::{Cell, CellLoop, SodiumCtx, Stream};
use thiserror::Error;

mod game;
pub use game::{GameState, Player, SubBoard, WinningLine};

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum Error {
    #[error("invalid move: cell {1} of board {0} is already taken!")]
    CellTaken(usize, usize),

    #[error("invalid move: board {0} is not in play, you must play in board {1}!")]
    WrongBoard(usize, usize),

    #[error("invalid index: {0}!")]
    InvalidIndex(usize),

    #[error("invalid input: {0}!")]
    InvalidInteger(ParseIntError),

    #[error("expected a move as two numbers: `board cell`!")]
    MissingIndex,
}

/// The reactive store around [`GameState`].
///
/// `state` always holds the current snapshot; each legal selection arriving
/// on the input stream replaces it with `apply_move` of the old one, inside
/// a single sodium transaction, so observers only ever see whole snapshots
/// in arrival order. Illegal selections leave `state` untouched and surface
/// on `error` instead.
pub struct UltimateTicTacToe {
    pub state: Cell<GameState>,
    pub placements: Stream<(usize, usize, Player)>,
    pub streaks: Stream<(Player, u32)>,
    pub error: Stream<Error>,
}

struct MoveValidator {
    legal_move_stream: Stream<(usize, usize)>,
    error_stream: Stream<Error>,
}

/// Turns `"board cell"` input lines (both 1-9, row-major from the top left)
/// into zero-based selection pairs.
pub struct SelectionParser {
    pub selections: Stream<(usize, usize)>,
    pub error: Stream<Error>,
}

impl UltimateTicTacToe {
    /// Must be called inside a sodium transaction. `selections` carries
    /// zero-based `(board, cell)` pairs, both in `0..=8`.
    pub fn new(ctx: &SodiumCtx, selections: &Stream<(usize, usize)>) -> UltimateTicTacToe {
        let state_cell_loop: CellLoop<GameState> = ctx.new_cell_loop();
        let state_cell_fwd = state_cell_loop.cell();

        let MoveValidator {
            legal_move_stream,
            error_stream,
        } = MoveValidator::new(selections, &state_cell_fwd);

        let placement_stream = legal_move_stream.snapshot(
            &state_cell_fwd,
            |&(board, cell): &(usize, usize), state: &GameState| (board, cell, state.current_player),
        );

        let streak_stream = legal_move_stream
            .snapshot(
                &state_cell_fwd,
                |&(board, cell): &(usize, usize), state: &GameState| {
                    let player = state.current_player;
                    let next = state.apply_move(board, cell);
                    (player, next.score(player) - state.score(player))
                },
            )
            .filter(|&(_, count): &(Player, u32)| count > 0);

        let state_stream = legal_move_stream.snapshot(
            &state_cell_fwd,
            |&(board, cell): &(usize, usize), state: &GameState| state.apply_move(board, cell),
        );
        let state_cell = state_stream.hold(GameState::new());
        state_cell_loop.loop_(&state_cell);

        UltimateTicTacToe {
            state: state_cell,
            placements: placement_stream,
            streaks: streak_stream,
            error: error_stream,
        }
    }
}

impl MoveValidator {
    fn new(selections: &Stream<(usize, usize)>, state_cell: &Cell<GameState>) -> MoveValidator {
        let state = state_cell.clone();
        let legal_move_stream = selections.filter(move |&(board, cell): &(usize, usize)| {
            state.sample().is_valid_move(board, cell)
        });

        // Occupancy is checked before the forced-board rule, so a taken cell
        // reports as taken even outside the board in play.
        let state = state_cell.clone();
        let taken_stream = selections
            .filter(move |&(board, cell): &(usize, usize)| {
                state.sample().boards[board].cells[cell].is_some()
            })
            .map(|&(board, cell): &(usize, usize)| Error::CellTaken(board + 1, cell + 1));

        let wrong_board_stream = selections
            .snapshot(
                state_cell,
                |&(board, cell): &(usize, usize), state: &GameState| match state.active_board {
                    Some(active) if active != board && state.boards[board].cells[cell].is_none() => {
                        Some(Error::WrongBoard(board + 1, active + 1))
                    }
                    _ => None,
                },
            )
            .filter_option();

        let error_stream = taken_stream.or_else(&wrong_board_stream);

        MoveValidator {
            legal_move_stream,
            error_stream,
        }
    }
}

impl SelectionParser {
    pub fn new(input_stream: &Stream<String>) -> SelectionParser {
        let (pair_stream, parse_err_stream) = input_stream
            .map(|line: &String| parse_selection(line))
            .split_res();

        let in_range = |index: usize| (1..=9).contains(&index);

        let selections = pair_stream
            .filter(move |&(board, cell): &(usize, usize)| in_range(board) && in_range(cell))
            .map(|&(board, cell): &(usize, usize)| (board - 1, cell - 1));

        let invalid_index_stream = pair_stream
            .filter(move |&(board, cell): &(usize, usize)| !in_range(board) || !in_range(cell))
            .map(move |&(board, cell): &(usize, usize)| {
                let offending = if in_range(board) { cell } else { board };
                Error::InvalidIndex(offending)
            });

        let error = parse_err_stream.or_else(&invalid_index_stream);

        SelectionParser { selections, error }
    }
}

fn parse_selection(line: &str) -> Result<(usize, usize), Error> {
    let mut parts = line.split_whitespace();
    let board = parts
        .next()
        .ok_or(Error::MissingIndex)?
        .parse()
        .map_err(Error::InvalidInteger)?;
    let cell = parts
        .next()
        .ok_or(Error::MissingIndex)?
        .parse()
        .map_err(Error::InvalidInteger)?;
    Ok((board, cell))
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use sodium::{Listener, SodiumCtx, StreamSink};

    use super::*;

    struct Fixture {
        selections: StreamSink<(usize, usize)>,
        game: UltimateTicTacToe,
        errors: Arc<Mutex<Vec<Error>>>,
        streaks: Arc<Mutex<Vec<(Player, u32)>>>,
        _listeners: Vec<Listener>,
    }

    fn fixture(ctx: &SodiumCtx) -> Fixture {
        ctx.transaction(|| {
            let selections: StreamSink<(usize, usize)> = ctx.new_stream_sink();
            let game = UltimateTicTacToe::new(ctx, &selections.stream());

            let errors = Arc::new(Mutex::new(Vec::new()));
            let streaks = Arc::new(Mutex::new(Vec::new()));
            let listeners = vec![
                game.error.listen({
                    let errors = errors.clone();
                    move |err: &Error| errors.lock().unwrap().push(err.clone())
                }),
                game.streaks.listen({
                    let streaks = streaks.clone();
                    move |streak: &(Player, u32)| streaks.lock().unwrap().push(*streak)
                }),
            ];

            Fixture {
                selections,
                game,
                errors,
                streaks,
                _listeners: listeners,
            }
        })
    }

    #[test]
    fn selections_drive_the_state_cell() {
        let ctx = SodiumCtx::new();
        let fixture = fixture(&ctx);

        fixture.selections.send((0, 4));
        let state = fixture.game.state.sample();
        assert_eq!(state.boards[0].cells[4], Some(Player::X));
        assert_eq!(state.active_board, Some(4));
        assert_eq!(state.current_player, Player::O);
        assert!(fixture.errors.lock().unwrap().is_empty());
    }

    #[test]
    fn rejected_selections_leave_the_state_alone() {
        let ctx = SodiumCtx::new();
        let fixture = fixture(&ctx);

        fixture.selections.send((0, 4));
        let before = fixture.game.state.sample();

        // Taken cell, then a board other than the forced one.
        fixture.selections.send((0, 4));
        fixture.selections.send((7, 0));

        assert_eq!(fixture.game.state.sample(), before);
        assert_eq!(
            *fixture.errors.lock().unwrap(),
            vec![Error::CellTaken(1, 5), Error::WrongBoard(8, 5)]
        );
    }

    #[test]
    fn streak_stream_fires_at_the_completing_move() {
        let ctx = SodiumCtx::new();
        let fixture = fixture(&ctx);

        let script = [
            (0, 0), // X
            (0, 4), // O
            (4, 0), // X
            (0, 3), // O
            (3, 1), // X
            (1, 0), // O
            (0, 1), // X
            (1, 3), // O
            (3, 2), // X
            (2, 0), // O
            (0, 2), // X completes row 0-1-2 of board 0
        ];
        for selection in script {
            fixture.selections.send(selection);
        }

        assert_eq!(*fixture.streaks.lock().unwrap(), vec![(Player::X, 1)]);
        let state = fixture.game.state.sample();
        assert_eq!(state.x_score, 1);
        assert_eq!(
            state.winning_lines[0],
            vec![WinningLine { start: 0, end: 2 }]
        );
    }

    #[test]
    fn parser_accepts_one_based_pairs() {
        let ctx = SodiumCtx::new();
        let (input, seen, _listener) = ctx.transaction(|| {
            let input: StreamSink<String> = ctx.new_stream_sink();
            let parser = SelectionParser::new(&input.stream());
            let seen = Arc::new(Mutex::new(Vec::new()));
            let listener = parser.selections.listen({
                let seen = seen.clone();
                move |selection: &(usize, usize)| seen.lock().unwrap().push(*selection)
            });
            (input, seen, listener)
        });

        input.send(String::from("1 5"));
        input.send(String::from("9 9"));
        assert_eq!(*seen.lock().unwrap(), vec![(0, 4), (8, 8)]);
    }

    #[test]
    fn parser_reports_bad_input() {
        let ctx = SodiumCtx::new();
        let (input, errors, _listener) = ctx.transaction(|| {
            let input: StreamSink<String> = ctx.new_stream_sink();
            let parser = SelectionParser::new(&input.stream());
            let errors = Arc::new(Mutex::new(Vec::new()));
            let listener = parser.error.listen({
                let errors = errors.clone();
                move |err: &Error| errors.lock().unwrap().push(err.clone())
            });
            (input, errors, listener)
        });

        input.send(String::from("0 3"));
        input.send(String::from("4"));
        input.send(String::from("one two"));

        let errors = errors.lock().unwrap();
        assert_eq!(errors.len(), 3);
        assert_eq!(errors[0], Error::InvalidIndex(0));
        assert_eq!(errors[1], Error::MissingIndex);
        assert!(matches!(errors[2], Error::InvalidInteger(_)));
    }
}
