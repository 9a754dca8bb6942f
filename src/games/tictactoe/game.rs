//! Tic-tac-toe as a hosted [`Game`].

use super::action::{MoveError, parse_move};
use super::rules::{check_winner, is_full};
use super::types::{BOARD_SIZE, GameState, GameStatus, PLAYER_COUNT, TicTacToeView};
use crate::game::{ActionRejected, Game};
use crate::protocol::{Request, Response, Seat, StateMessage};
use serde_json::json;
use std::collections::BTreeMap;
use tracing::{debug, error, info, instrument};

/// Game type identifier.
pub const GAME_TYPE: &str = "tictactoe";

/// Tic-tac-toe engine.
#[derive(Debug, Clone, Default)]
pub struct TicTacToe {
    state: GameState,
}

impl TicTacToe {
    /// Creates a new game.
    #[instrument]
    pub fn new() -> Self {
        info!("Tic-tac-toe game initialized");
        Self::default()
    }

    /// Returns the current game state.
    pub fn state(&self) -> &GameState {
        &self.state
    }

    /// Returns the payload broadcast to players.
    pub fn view(&self) -> TicTacToeView {
        TicTacToeView::from(&self.state)
    }

    /// Marks `pos` for `seat`.
    #[instrument(skip(self))]
    pub fn make_move(&mut self, seat: Seat, pos: usize) -> Result<(), MoveError> {
        match self.state.status() {
            GameStatus::Won { seat: winner, .. } => return Err(MoveError::AlreadyWon(winner)),
            GameStatus::Draw => return Err(MoveError::GameOver),
            GameStatus::InProgress => {}
        }

        if pos >= BOARD_SIZE {
            return Err(MoveError::OutOfRange(pos as i64));
        }

        if seat != self.state.current_player() {
            debug!(current_player = self.state.current_player(), "Not this seat's turn");
            return Err(MoveError::WrongPlayer(seat));
        }

        if !self.state.board().is_empty(pos) {
            return Err(MoveError::SquareOccupied(pos));
        }

        self.state.apply_move(pos, seat);
        info!(move_number = self.state.history().len(), "Move made");
        self.update_status();
        Ok(())
    }

    fn update_status(&mut self) {
        let board = self.state.board();
        if let Some((seat, line)) = check_winner(board) {
            info!(winner = seat, ?line, "Game won");
            self.state.set_status(GameStatus::Won { seat, line });
        } else if is_full(board) {
            info!("Game drawn");
            self.state.set_status(GameStatus::Draw);
        }
    }
}

impl Game for TicTacToe {
    #[instrument(skip(self, request), fields(function = %request.function))]
    fn handle_action(&mut self, seat: Seat, request: &Request) -> Result<(), ActionRejected> {
        let pos = parse_move(request)?;
        self.make_move(seat, pos)?;
        Ok(())
    }

    fn state_for_all(&self) -> Vec<StateMessage> {
        match Response::game_state(&self.view()) {
            Ok(response) => vec![StateMessage::broadcast(response)],
            Err(e) => {
                error!(error = %e, "Failed to encode game state");
                Vec::new()
            }
        }
    }

    fn is_complete(&self) -> bool {
        self.state.status() != GameStatus::InProgress
    }

    fn game_type(&self) -> &'static str {
        GAME_TYPE
    }

    fn ai_types(&self) -> BTreeMap<String, String> {
        [("random", "Easy"), ("blocker", "Medium"), ("unbeatable", "Hard")]
            .into_iter()
            .map(|(name, difficulty)| (name.to_string(), difficulty.to_string()))
            .collect()
    }

    fn metadata(&self) -> serde_json::Value {
        json!({
            "game_type": GAME_TYPE,
            "max_players": PLAYER_COUNT,
            "parameters": null,
        })
    }
}
