//! Tests for the tic-tac-toe game.

use serde_json::json;
use strictly_sessions::games::tictactoe::{GameStatus, MoveError, TicTacToeView};
use strictly_sessions::{Addressee, Game, Request, ResponseKind, TicTacToe};

fn play(game: &mut TicTacToe, moves: &[(usize, usize)]) {
    for &(seat, pos) in moves {
        game.make_move(seat, pos)
            .unwrap_or_else(|e| panic!("move {pos} by {seat} failed: {e}"));
    }
}

fn move_request(position: serde_json::Value) -> Request {
    Request::game("make_move", json!({ "position": position }))
}

#[test]
fn test_seat_zero_moves_first() {
    let mut game = TicTacToe::new();
    assert_eq!(game.make_move(1, 4), Err(MoveError::WrongPlayer(1)));
    assert_eq!(game.make_move(0, 4), Ok(()));
    assert_eq!(game.state().current_player(), 1);
}

#[test]
fn test_occupied_square() {
    let mut game = TicTacToe::new();
    play(&mut game, &[(0, 4)]);
    let err = game.make_move(1, 4).unwrap_err();
    assert_eq!(err.to_string(), "Position 4 is already taken");
}

#[test]
fn test_win_ends_game() {
    let mut game = TicTacToe::new();
    play(&mut game, &[(0, 0), (1, 3), (0, 1), (1, 4), (0, 2)]);

    assert_eq!(
        game.state().status(),
        GameStatus::Won {
            seat: 0,
            line: [0, 1, 2]
        }
    );
    assert!(game.is_complete());
    assert_eq!(
        game.make_move(1, 5).unwrap_err().to_string(),
        "Game already has a winner: player 0"
    );
}

#[test]
fn test_draw() {
    let mut game = TicTacToe::new();
    // 0 1 0
    // 0 1 1
    // 1 0 0
    play(
        &mut game,
        &[(0, 0), (1, 1), (0, 2), (1, 4), (0, 3), (1, 5), (0, 7), (1, 6), (0, 8)],
    );
    assert_eq!(game.state().status(), GameStatus::Draw);
    assert!(game.is_complete());
    assert!(game.view().is_draw);
    assert_eq!(game.make_move(1, 0), Err(MoveError::GameOver));
}

#[test]
fn test_request_validation_messages() {
    let mut game = TicTacToe::new();

    let reject = |game: &mut TicTacToe, request: Request| {
        game.handle_action(0, &request).unwrap_err().message
    };

    assert_eq!(
        reject(&mut game, Request::game("resign", json!({}))),
        "Function resign not supported"
    );
    assert_eq!(
        reject(&mut game, Request::game("make_move", json!({}))),
        "Missing position parameter"
    );
    assert_eq!(
        reject(&mut game, move_request(json!("centre"))),
        "Invalid position parameter type"
    );
    assert_eq!(
        reject(&mut game, move_request(json!(9))),
        "Position 9 out of range (must be 0-8)"
    );
    assert_eq!(
        reject(&mut game, move_request(json!(-1))),
        "Position -1 out of range (must be 0-8)"
    );

    // Whole-number floats are positions too
    assert!(game.handle_action(0, &move_request(json!(4.0))).is_ok());
    assert_eq!(game.state().history(), &[4]);
}

#[test]
fn test_state_for_all_is_one_broadcast() {
    let mut game = TicTacToe::new();
    play(&mut game, &[(0, 8), (1, 0)]);

    let messages = game.state_for_all();
    assert_eq!(messages.len(), 1);
    assert_eq!(messages[0].addressee, Addressee::Broadcast);
    assert_eq!(messages[0].response.kind, ResponseKind::GameState);

    let view: TicTacToeView = serde_json::from_value(messages[0].response.parameters.clone()).unwrap();
    assert_eq!(view.board[8], Some(0));
    assert_eq!(view.board[0], Some(1));
    assert_eq!(view.moves, vec![8, 0]);
    assert_eq!(view.current_player, 0);
    assert_eq!(view.winner, None);
    assert_eq!(view.winning_line, None);
    assert!(!view.is_draw);
}

#[test]
fn test_metadata_and_ai_types() {
    let game = TicTacToe::new();
    assert_eq!(game.game_type(), "tictactoe");
    assert_eq!(
        game.metadata(),
        json!({ "game_type": "tictactoe", "max_players": 2, "parameters": null })
    );

    let ai_types = game.ai_types();
    assert_eq!(ai_types.get("random").map(String::as_str), Some("Easy"));
    assert_eq!(ai_types.get("blocker").map(String::as_str), Some("Medium"));
    assert_eq!(ai_types.get("unbeatable").map(String::as_str), Some("Hard"));
}
