//! Integration tests for room lifecycle and move arbitration.

use std::sync::Arc;
use std::time::Duration;

use duel_protocol::{GameType, RoomCode, Seat, Winner};
use duel_room::{
    Cell, ChessBoard, ChessEngine, ChessMove, ChessRules, GameRules, ListFilter, MemoryRoomStore,
    MoveArbiter, Player, Room, RoomConfig, RoomError, RoomLifecycle, RoomStatus, RoomStore,
    TicTacToeRules,
};
use proptest::prelude::*;

// =========================================================================
// Helpers
// =========================================================================

type Store = MemoryRoomStore<<TicTacToeRules as GameRules>::Board>;

struct TicTacToeDesk {
    store: Arc<Store>,
    lifecycle: RoomLifecycle<TicTacToeRules, Store>,
    arbiter: MoveArbiter<TicTacToeRules, Store>,
}

fn desk() -> TicTacToeDesk {
    let rules = Arc::new(TicTacToeRules);
    let store = Arc::new(Store::new());
    TicTacToeDesk {
        lifecycle: RoomLifecycle::new(
            Arc::clone(&rules),
            Arc::clone(&store),
            RoomConfig::default(),
        ),
        arbiter: MoveArbiter::new(rules, Arc::clone(&store)),
        store,
    }
}

fn code(raw: &str) -> RoomCode {
    RoomCode::parse(raw).unwrap()
}

/// Creates AB12CD with alice (X) and bob (O).
async fn seated(desk: &TicTacToeDesk) -> RoomCode {
    let room = desk.lifecycle.create(Some(code("AB12CD")), "alice", None).await.unwrap();
    desk.lifecycle.join(&room.room_id, "bob", None).await.unwrap();
    room.room_id
}

// =========================================================================
// Lifecycle
// =========================================================================

#[tokio::test]
async fn test_create_seats_creator_with_opening_symbol() {
    let desk = desk();
    let room = desk.lifecycle.create(None, "alice", Some("cat.png".into())).await.unwrap();

    assert_eq!(room.game_type, GameType::TicTacToe);
    assert_eq!(room.room_id.as_str().len(), 6);
    assert_eq!(room.players, vec![Player::new("alice", Seat::X, Some("cat.png".into()))]);
    assert_eq!(room.turn, Seat::X);
    assert_eq!(room.round_index, 0);
    assert_eq!(room.winner, None);
    assert_eq!(room.status(2), RoomStatus::WaitingForPlayers);
}

#[tokio::test]
async fn test_join_seats_complementary_symbol() {
    let desk = desk();
    let room_id = seated(&desk).await;
    let room = desk.lifecycle.get(&room_id).await.unwrap();

    assert_eq!(room.seat_of("alice"), Some(Seat::X));
    assert_eq!(room.seat_of("bob"), Some(Seat::O));
    assert_eq!(room.status(2), RoomStatus::InProgress);
}

#[tokio::test]
async fn test_join_missing_room_is_not_found() {
    let desk = desk();
    let err = desk.lifecycle.join(&code("NOPE"), "bob", None).await.unwrap_err();
    assert!(matches!(err, RoomError::NotFound(_)));
}

#[tokio::test]
async fn test_join_full_room_fails_for_any_name() {
    let desk = desk();
    let room_id = seated(&desk).await;

    for name in ["carol", "alice", "BOB"] {
        let err = desk.lifecycle.join(&room_id, name, None).await.unwrap_err();
        assert!(matches!(err, RoomError::Full(_)), "{name} should see Full");
    }
}

#[tokio::test]
async fn test_join_existing_name_returns_room_unchanged() {
    let desk = desk();
    let room = desk.lifecycle.create(Some(code("AB12CD")), "Alice", None).await.unwrap();

    let again = desk.lifecycle.join(&room.room_id, " alice ", None).await.unwrap();
    assert_eq!(again, room);
    assert_eq!(again.players.len(), 1);
}

#[tokio::test]
async fn test_join_falls_back_to_parity_when_first_seat_unset() {
    let desk = desk();
    let mut room = desk.lifecycle.create(Some(code("AB12CD")), "alice", None).await.unwrap();
    room.players[0].seat = None;
    room.round_index = 1;
    desk.store.put(room).await.unwrap();

    let room = desk.lifecycle.join(&code("AB12CD"), "bob", None).await.unwrap();
    // Round 1 gives the first occupant O, so the joiner takes X.
    assert_eq!(room.seat_of("bob"), Some(Seat::X));
}

#[tokio::test]
async fn test_finish_swaps_seats_and_resets_round() {
    let desk = desk();
    let room_id = seated(&desk).await;
    desk.arbiter.submit_move(&room_id, "alice", &Cell::new(1, 1)).await.unwrap();

    let before = desk.lifecycle.get(&room_id).await.unwrap();
    let after = desk.lifecycle.finish(&room_id).await.unwrap();

    assert_eq!(after.round_index, before.round_index + 1);
    assert_eq!(after.player_names(), before.player_names());
    assert_eq!(after.seat_of("alice"), Some(Seat::O));
    assert_eq!(after.seat_of("bob"), Some(Seat::X));
    assert_eq!(after.board, TicTacToeRules.initial_board());
    assert_eq!(after.turn, Seat::X);
    assert_eq!(after.winner, None);
    assert_eq!(after.last_move_by, None);
}

#[tokio::test]
async fn test_finish_missing_room_is_not_found() {
    let desk = desk();
    assert!(matches!(
        desk.lifecycle.finish(&code("GONE")).await,
        Err(RoomError::NotFound(_))
    ));
}

#[tokio::test]
async fn test_create_reuse_keeps_round_parity() {
    let desk = desk();
    let room_id = seated(&desk).await;
    desk.lifecycle.finish(&room_id).await.unwrap();

    let room = desk.lifecycle.create(Some(room_id.clone()), "carol", None).await.unwrap();
    assert_eq!(room.round_index, 1);
    assert_eq!(room.players.len(), 1);
    assert_eq!(room.seat_of("carol"), Some(Seat::O));
    assert_eq!(room.turn, Seat::X);

    let room = desk.lifecycle.join(&room_id, "dave", None).await.unwrap();
    assert_eq!(room.seat_of("dave"), Some(Seat::X));
}

#[tokio::test]
async fn test_list_skips_empty_rooms_and_sorts_newest_first() {
    let desk = desk();
    desk.lifecycle.create(Some(code("OLD")), "alice", None).await.unwrap();
    tokio::time::sleep(Duration::from_millis(5)).await;
    desk.lifecycle.create(Some(code("NEW")), "bob", None).await.unwrap();

    let mut empty = desk.lifecycle.get(&code("OLD")).await.unwrap();
    empty.room_id = code("EMPTY");
    empty.players.clear();
    desk.store.put(empty).await.unwrap();

    let rooms = desk.lifecycle.list(ListFilter::default()).await.unwrap();
    let codes: Vec<_> = rooms.iter().map(|r| r.room_id.as_str()).collect();
    assert_eq!(codes, vec!["NEW", "OLD"]);

    let rooms = desk
        .lifecycle
        .list(ListFilter { online: false, limit: Some(1) })
        .await
        .unwrap();
    assert_eq!(rooms.len(), 1);
}

#[tokio::test]
async fn test_list_online_drops_stale_rooms() {
    let desk = desk();
    desk.lifecycle.create(Some(code("FRESH")), "alice", None).await.unwrap();
    let mut stale = desk.lifecycle.create(Some(code("STALE")), "bob", None).await.unwrap();
    stale.updated_at = 1;
    desk.store.put(stale).await.unwrap();

    let online = desk
        .lifecycle
        .list(ListFilter { online: true, limit: None })
        .await
        .unwrap();
    assert_eq!(online.len(), 1);
    assert_eq!(online[0].room_id, code("FRESH"));

    let all = desk.lifecycle.list(ListFilter::default()).await.unwrap();
    assert_eq!(all.len(), 2);
}

#[tokio::test]
async fn test_store_outage_surfaces_as_store_error() {
    let desk = desk();
    let room_id = seated(&desk).await;
    desk.store.set_available(false);

    let err = desk.arbiter.submit_move(&room_id, "alice", &Cell::new(0, 0)).await.unwrap_err();
    assert_eq!(err.status_code(), 503);
}

// =========================================================================
// Move arbitration
// =========================================================================

#[tokio::test]
async fn test_move_flips_turn_and_records_mover() {
    let desk = desk();
    let room_id = seated(&desk).await;

    let room = desk.arbiter.submit_move(&room_id, "Alice", &Cell::new(0, 0)).await.unwrap();
    assert_eq!(room.board[0][0], Some(Seat::X));
    assert_eq!(room.turn, Seat::O);
    assert_eq!(room.last_move_by.as_deref(), Some("Alice"));
}

#[tokio::test]
async fn test_move_missing_room_is_not_found() {
    let desk = desk();
    let err = desk.arbiter.submit_move(&code("NONE"), "alice", &Cell::new(0, 0)).await.unwrap_err();
    assert!(matches!(err, RoomError::NotFound(_)));
}

#[tokio::test]
async fn test_move_by_stranger_is_invalid_before_turn_check() {
    let desk = desk();
    let room_id = seated(&desk).await;
    let err = desk.arbiter.submit_move(&room_id, "mallory", &Cell::new(0, 0)).await.unwrap_err();
    assert!(matches!(err, RoomError::InvalidMove(_)));
}

#[tokio::test]
async fn test_move_out_of_turn_is_turn_violation() {
    let desk = desk();
    let room_id = seated(&desk).await;
    let err = desk.arbiter.submit_move(&room_id, "bob", &Cell::new(0, 0)).await.unwrap_err();
    assert_eq!(
        err,
        RoomError::TurnViolation {
            expected: Seat::X,
            actual: Seat::O
        }
    );
}

#[tokio::test]
async fn test_turn_is_checked_before_cell() {
    let desk = desk();
    let room_id = seated(&desk).await;
    desk.arbiter.submit_move(&room_id, "alice", &Cell::new(0, 0)).await.unwrap();

    // Out of turn and onto an occupied cell: the turn check wins.
    let err = desk.arbiter.submit_move(&room_id, "alice", &Cell::new(0, 0)).await.unwrap_err();
    assert!(matches!(err, RoomError::TurnViolation { .. }));

    let err = desk.arbiter.submit_move(&room_id, "bob", &Cell::new(0, 0)).await.unwrap_err();
    assert!(matches!(err, RoomError::InvalidMove(_)));
}

#[tokio::test]
async fn test_rejected_move_leaves_room_untouched() {
    let desk = desk();
    let room_id = seated(&desk).await;
    let before = desk.lifecycle.get(&room_id).await.unwrap();

    let _ = desk.arbiter.submit_move(&room_id, "alice", &Cell::new(5, 5)).await;
    let _ = desk.arbiter.submit_move(&room_id, "bob", &Cell::new(0, 0)).await;

    assert_eq!(desk.lifecycle.get(&room_id).await.unwrap(), before);
}

#[tokio::test]
async fn test_winning_move_then_terminal_state() {
    let desk = desk();
    let room_id = seated(&desk).await;
    let mut room = desk.lifecycle.get(&room_id).await.unwrap();
    room.board = [
        [Some(Seat::X), Some(Seat::X), None],
        [Some(Seat::O), Some(Seat::O), None],
        [None, None, None],
    ];
    desk.store.put(room).await.unwrap();

    let room = desk.arbiter.submit_move(&room_id, "alice", &Cell::new(0, 2)).await.unwrap();
    assert_eq!(room.winner, Some(Winner::Seat(Seat::X)));
    assert_eq!(room.turn, Seat::X);
    assert_eq!(room.status(2), RoomStatus::Terminal);

    for (who, cell) in [("bob", Cell::new(1, 2)), ("alice", Cell::new(2, 2))] {
        let err = desk.arbiter.submit_move(&room_id, who, &cell).await.unwrap_err();
        assert!(matches!(err, RoomError::TerminalState(_)), "{who}: {err}");
    }
}

#[tokio::test]
async fn test_full_board_without_line_is_draw() {
    let desk = desk();
    let room_id = seated(&desk).await;
    let moves = [
        ("alice", 0, 0),
        ("bob", 0, 1),
        ("alice", 0, 2),
        ("bob", 1, 1),
        ("alice", 1, 0),
        ("bob", 1, 2),
        ("alice", 2, 1),
        ("bob", 2, 0),
        ("alice", 2, 2),
    ];
    let mut last = None;
    for (who, row, col) in moves {
        last = Some(desk.arbiter.submit_move(&room_id, who, &Cell::new(row, col)).await.unwrap());
    }
    assert_eq!(last.and_then(|r| r.winner), Some(Winner::Draw));
}

#[tokio::test]
async fn test_next_round_after_finish_is_playable() {
    let desk = desk();
    let room_id = seated(&desk).await;
    let mut room = desk.lifecycle.get(&room_id).await.unwrap();
    room.winner = Some(Winner::Draw);
    desk.store.put(room).await.unwrap();

    desk.lifecycle.finish(&room_id).await.unwrap();
    // bob holds X now and opens.
    let room = desk.arbiter.submit_move(&room_id, "bob", &Cell::new(1, 1)).await.unwrap();
    assert_eq!(room.board[1][1], Some(Seat::X));
}

// =========================================================================
// Chess through a scripted engine
// =========================================================================

/// Every move whose from and to squares differ is legal. A move onto
/// `h4` mates; a move onto `a1` draws.
struct PermissiveEngine;

impl ChessEngine for PermissiveEngine {
    fn starting_position(&self) -> String {
        "start".into()
    }
    fn is_legal(&self, _position: &str, mv: &ChessMove) -> bool {
        mv.from != mv.to
    }
    fn apply(&self, position: &str, mv: &ChessMove) -> Result<String, RoomError> {
        Ok(format!("{position} {}{}", mv.from, mv.to))
    }
    fn is_checkmate(&self, position: &str) -> bool {
        position.ends_with("h4")
    }
    fn is_draw(&self, position: &str) -> bool {
        position.ends_with("a1")
    }
}

type ChessStore = MemoryRoomStore<ChessBoard>;

fn chess_desk() -> (
    RoomLifecycle<ChessRules<PermissiveEngine>, ChessStore>,
    MoveArbiter<ChessRules<PermissiveEngine>, ChessStore>,
) {
    let rules = Arc::new(ChessRules::new(PermissiveEngine));
    let store = Arc::new(ChessStore::new());
    (
        RoomLifecycle::new(Arc::clone(&rules), Arc::clone(&store), RoomConfig::default()),
        MoveArbiter::new(rules, store),
    )
}

#[tokio::test]
async fn test_chess_seats_colors_and_white_opens() {
    let (lifecycle, arbiter) = chess_desk();
    let room = lifecycle.create(Some(code("CHESS1")), "alice", None).await.unwrap();
    let room = lifecycle.join(&room.room_id, "bob", None).await.unwrap();
    assert_eq!(room.seat_of("alice"), Some(Seat::White));
    assert_eq!(room.seat_of("bob"), Some(Seat::Black));
    assert_eq!(room.board.fen, "start");

    let err = arbiter
        .submit_move(&room.room_id, "bob", &ChessMove::new("e7", "e5"))
        .await
        .unwrap_err();
    assert!(matches!(err, RoomError::TurnViolation { .. }));

    let room = arbiter
        .submit_move(&room.room_id, "alice", &ChessMove::new("e2", "e4"))
        .await
        .unwrap();
    assert_eq!(room.turn, Seat::Black);
    assert_eq!(room.board.history.len(), 1);
}

#[tokio::test]
async fn test_chess_checkmate_sets_winner_and_finish_clears_history() {
    let (lifecycle, arbiter) = chess_desk();
    let room_id = code("CHESS2");
    lifecycle.create(Some(room_id.clone()), "alice", None).await.unwrap();
    lifecycle.join(&room_id, "bob", None).await.unwrap();

    arbiter.submit_move(&room_id, "alice", &ChessMove::new("f2", "f3")).await.unwrap();
    let room = arbiter.submit_move(&room_id, "bob", &ChessMove::new("d8", "h4")).await.unwrap();
    assert_eq!(room.winner, Some(Winner::Seat(Seat::Black)));

    let room = lifecycle.finish(&room_id).await.unwrap();
    assert!(room.board.history.is_empty());
    assert_eq!(room.seat_of("alice"), Some(Seat::Black));
    assert_eq!(room.turn, Seat::White);
}

#[tokio::test]
async fn test_chess_engine_draw_sets_draw() {
    let (lifecycle, arbiter) = chess_desk();
    let room_id = code("CHESS3");
    lifecycle.create(Some(room_id.clone()), "alice", None).await.unwrap();
    lifecycle.join(&room_id, "bob", None).await.unwrap();

    let room = arbiter.submit_move(&room_id, "alice", &ChessMove::new("h8", "a1")).await.unwrap();
    assert_eq!(room.winner, Some(Winner::Draw));
}

// =========================================================================
// Properties
// =========================================================================

fn check_alternating_game(order: Vec<usize>) -> Result<(), TestCaseError> {
    let rt = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .unwrap();
    rt.block_on(async {
        let desk = desk();
        let room_id = seated(&desk).await;
        let mut previous_mover: Option<String> = None;

        for index in order {
            let before: Room<_> = desk.lifecycle.get(&room_id).await.unwrap();
            if before.winner.is_some() {
                break;
            }
            let mover = if before.turn == Seat::X { "alice" } else { "bob" };
            let cell = Cell::new(index / 3, index % 3);
            prop_assert!(before.board[cell.row][cell.col].is_none());

            let after = desk.arbiter.submit_move(&room_id, mover, &cell).await.unwrap();
            prop_assert_eq!(after.board[cell.row][cell.col], before.seat_of(mover));
            prop_assert_ne!(after.last_move_by.clone(), previous_mover.clone());
            previous_mover = after.last_move_by.clone();

            // Moving again straight away is never accepted.
            let again = desk.arbiter.submit_move(&room_id, mover, &cell).await;
            prop_assert!(again.is_err());
        }
        Ok(())
    })
}

proptest! {
    #[test]
    fn test_alternating_moves_never_repeat_cell_or_mover(
        order in Just((0..9).collect::<Vec<usize>>()).prop_shuffle()
    ) {
        check_alternating_game(order)?;
    }
}
