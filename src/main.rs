use std::io::BufRead;

use sodium::{SodiumCtx, StreamSink};

use ninetty::{Error, GameState, Player, SelectionParser, UltimateTicTacToe};

fn main() {
    let ctx = SodiumCtx::new();

    let (boot, kb_input, _listeners) = ctx.transaction(|| {
        let mut listeners = Vec::new();

        let boot: StreamSink<()> = ctx.new_stream_sink();
        let kb_input: StreamSink<String> = ctx.new_stream_sink();

        let parser = SelectionParser::new(&kb_input.stream());
        let game = UltimateTicTacToe::new(&ctx, &parser.selections);

        listeners.push(boot.stream().listen(|_: &()| {
            println!("Welcome to Ultimate Tic Tac Toe!\n");
            println!("Enter a move as `board cell`, both 1-9, counted");
            println!("left to right, top to bottom. Your move decides");
            println!("which board your opponent plays in next.\n");
        }));

        listeners.push(boot.stream().listen({
            let state = game.state.clone();
            move |_: &()| {
                let state = state.sample();
                println!("{}", state);
                println!("{}", status_line(&state));
            }
        }));

        let error_stream = parser.error.or_else(&game.error);
        listeners.push(error_stream.listen(|err: &Error| println!("{}", err)));

        listeners.push(game.placements.listen(
            |&(board, cell, player): &(usize, usize, Player)| {
                println!("\n{:?} takes cell {} of board {}:", player, cell + 1, board + 1)
            },
        ));

        listeners.push(
            game.streaks
                .listen(|&(player, count): &(Player, u32)| match count {
                    1 => println!("{:?} completes a line!", player),
                    _ => println!("{:?} completes {} lines at once!", player, count),
                }),
        );

        listeners.push(game.state.updates().listen(|state: &GameState| {
            println!("{}", state);
            println!("{}", status_line(state));
        }));

        (boot, kb_input, listeners)
    });

    let stdin = std::io::stdin().lock();

    boot.send(());
    for line in stdin.lines() {
        kb_input.send(line.unwrap());
    }
}

fn status_line(state: &GameState) -> String {
    let target = match state.active_board {
        Some(board) => format!("board {}", board + 1),
        None => String::from("any board"),
    };
    format!(
        "X {} - O {}  |  {:?} to move in {}",
        state.x_score, state.o_score, state.current_player, target
    )
}
