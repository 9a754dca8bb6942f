//! Games that can be hosted in a session.

pub mod tictactoe;

pub use tictactoe::TicTacToe;
