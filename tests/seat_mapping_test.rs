//! Tests for position-based seat bookkeeping.

use serde_json::json;
use std::collections::HashSet;
use std::sync::Arc;
use strictly_sessions::{
    AI_NAMES, AuthService, PlayerMapping, Request, SeatError, SeatMapping, UserDirectory,
};

struct Names;

impl UserDirectory for Names {
    fn display_name(&self, user_id: &str) -> Option<String> {
        match user_id {
            "u1" => Some("Alice".to_string()),
            _ => None,
        }
    }
}

fn mapping(seats: usize) -> SeatMapping {
    SeatMapping::new(seats, Arc::new(Names))
}

fn join(position: usize) -> Request {
    Request::session("join_position", json!({ "position": position }))
}

fn add_ai(position: usize, ai_type: &str) -> Request {
    Request::session("add_ai", json!({ "position": position, "ai_type": ai_type }))
}

fn remove_ai(position: usize) -> Request {
    Request::session("remove_ai", json!({ "position": position }))
}

#[test]
fn test_join_and_leave() {
    let mut seats = mapping(2);
    let alice = "u1".to_string();

    seats.handle_session_event(&alice, &join(1)).unwrap();
    assert_eq!(seats.player_position(&alice), Some(1));
    assert!(!seats.is_seat_free(1));
    assert!(seats.is_seat_free(0));

    let info = seats.session_state().player_positions[&1].clone().unwrap();
    assert_eq!(info.display_name, "Alice");
    assert!(!info.is_ai);
    assert!(info.connected);

    seats
        .handle_session_event(&alice, &Request::session("leave_position", json!({})))
        .unwrap();
    assert_eq!(seats.player_position(&alice), None);
    assert!(seats.is_seat_free(1));
}

#[test]
fn test_rejoining_own_seat_is_noop() {
    let mut seats = mapping(2);
    let alice = "u1".to_string();
    seats.handle_session_event(&alice, &join(0)).unwrap();
    assert_eq!(seats.handle_session_event(&alice, &join(0)), Ok(()));
    assert_eq!(
        seats.handle_session_event(&alice, &join(1)),
        Err(SeatError::AlreadySeated(0))
    );
}

#[test]
fn test_join_errors() {
    let mut seats = mapping(2);
    let alice = "u1".to_string();
    let bob = "u2".to_string();

    seats.handle_session_event(&alice, &join(0)).unwrap();
    assert_eq!(
        seats.handle_session_event(&bob, &join(0)),
        Err(SeatError::Occupied(0))
    );
    assert_eq!(
        seats.handle_session_event(&bob, &join(2)),
        Err(SeatError::OutOfRange {
            position: 2,
            last: 1
        })
    );
    assert_eq!(
        seats.handle_session_event(
            &bob,
            &Request::session("join_position", json!({ "position": "one" }))
        ),
        Err(SeatError::InvalidParameter("position"))
    );
    assert_eq!(
        seats.handle_session_event(&bob, &Request::session("leave_position", json!({}))),
        Err(SeatError::NotSeated)
    );
    assert_eq!(
        seats.handle_session_event(&bob, &Request::session("sit", json!({}))),
        Err(SeatError::UnknownFunction("sit".to_string()))
    );
}

#[test]
fn test_unknown_user_falls_back_to_id() {
    let mut seats = mapping(2);
    let stranger = "u9".to_string();
    seats.handle_session_event(&stranger, &join(0)).unwrap();
    let info = seats.session_state().player_positions[&0].clone().unwrap();
    assert_eq!(info.display_name, "u9");
}

#[test]
fn test_display_name_from_auth_service() {
    let auth = Arc::new(AuthService::default());
    let user_id = auth.register("carol", "hunter2").unwrap();

    let mut seats = SeatMapping::new(2, auth);
    seats.handle_session_event(&user_id, &join(0)).unwrap();
    let info = seats.session_state().player_positions[&0].clone().unwrap();
    assert_eq!(info.display_name, "carol");
    assert_eq!(info.user_id, user_id);
}

#[test]
fn test_add_and_remove_ai() {
    let mut seats = mapping(2);
    let host = "u1".to_string();

    seats.handle_session_event(&host, &add_ai(1, "random")).unwrap();
    assert_eq!(seats.player_position(&"ai_random_1".to_string()), Some(1));

    let info = seats.session_state().player_positions[&1].clone().unwrap();
    assert!(info.is_ai);
    assert_eq!(info.user_id, "random");
    let name = info.display_name.strip_prefix("AI-").unwrap();
    assert!(AI_NAMES.contains(&name));

    assert_eq!(
        seats.handle_session_event(&host, &add_ai(1, "random")),
        Err(SeatError::Occupied(1))
    );

    seats.handle_session_event(&host, &remove_ai(1)).unwrap();
    assert!(seats.is_seat_free(1));
    assert_eq!(seats.player_position(&"ai_random_1".to_string()), None);
}

#[test]
fn test_remove_ai_errors() {
    let mut seats = mapping(2);
    let host = "u1".to_string();
    seats.handle_session_event(&host, &join(0)).unwrap();

    assert_eq!(
        seats.handle_session_event(&host, &remove_ai(0)),
        Err(SeatError::NotAi(0))
    );
    assert_eq!(
        seats.handle_session_event(&host, &remove_ai(1)),
        Err(SeatError::Vacant(1))
    );
}

#[test]
fn test_ai_names_are_unique_then_fall_back() {
    let seats_count = AI_NAMES.len() + 2;
    let mut seats = mapping(seats_count);
    let host = "u1".to_string();

    for position in 0..seats_count {
        seats
            .handle_session_event(&host, &add_ai(position, "random"))
            .unwrap();
    }

    let state = seats.session_state();
    let names: Vec<String> = state
        .player_positions
        .values()
        .map(|info| info.clone().unwrap().display_name)
        .collect();

    let listed: HashSet<&String> = names.iter().filter(|n| *n != "AI-alfred").collect();
    assert_eq!(listed.len(), AI_NAMES.len());
    assert_eq!(names.iter().filter(|n| *n == "AI-alfred").count(), 2);
}

#[test]
fn test_connection_flags() {
    let mut seats = mapping(2);
    let alice = "u1".to_string();
    seats.handle_session_event(&alice, &join(0)).unwrap();

    seats.mark_disconnected(&alice);
    assert!(!seats.session_state().player_positions[&0].clone().unwrap().connected);

    seats.mark_connected(&alice);
    assert!(seats.session_state().player_positions[&0].clone().unwrap().connected);

    // Unseated players are ignored
    seats.mark_disconnected(&"nobody".to_string());
}

#[test]
fn test_session_state_lists_every_seat() {
    let seats = mapping(3);
    let messages = seats.session_state_for_all();
    assert_eq!(messages.len(), 1);
    assert_eq!(
        messages[0].response.parameters,
        json!({ "player_positions": { "0": null, "1": null, "2": null } })
    );
}

#[test]
fn test_presence_counts_every_connection() {
    let mut seats = mapping(2);
    let alice = "u1".to_string();
    let connected = |seats: &SeatMapping| {
        seats.session_state().player_positions[&0]
            .as_ref()
            .map(|info| info.connected)
    };

    seats.mark_connected(&alice);
    seats.mark_connected(&alice);
    seats.handle_session_event(&alice, &join(0)).unwrap();

    seats.mark_disconnected(&alice);
    assert_eq!(connected(&seats), Some(true));

    seats.mark_disconnected(&alice);
    assert_eq!(connected(&seats), Some(false));

    seats.mark_connected(&alice);
    assert_eq!(connected(&seats), Some(true));
}
