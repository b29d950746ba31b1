//! Live match session
//!
//! Holds the state of the match being scored right now: the doubling
//! cube, the rounds added during this session (for undo) and the latest
//! snapshot of the match row. Storage is passed in to every operation.

use crate::model::{Match, MatchId, Player, PlayerId, RoundId, Side};
use crate::scoring::{CubeError, DoublingCube, GameType, WinType};
use crate::storage::{Storage, StorageError};

#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error(transparent)]
    Storage(#[from] StorageError),
    #[error(transparent)]
    Cube(#[from] CubeError),
    #[error("answer the double first")]
    OfferPending,
    #[error("no Backgammon in {0} games")]
    BackgammonNotAllowed(GameType),
    #[error("no doubling cube in {0} games")]
    DoublingNotAllowed(GameType),
    #[error("the match is already finished")]
    MatchFinished,
    #[error("nothing to undo")]
    NothingToUndo,
    #[error("round {0} could not be removed")]
    UndoFailed(RoundId),
}

pub struct MatchSession {
    game: Match,
    player1: Player,
    player2: Player,
    cube: DoublingCube,
    undo_stack: Vec<RoundId>,
}

impl MatchSession {
    /// Start a new match and open a session on it.
    pub fn start(
        storage: &Storage,
        player1: Player,
        player2: Player,
        game_type: GameType,
        target_score: u32,
    ) -> Result<Self, SessionError> {
        let match_id = storage.start_match(player1.id, player2.id, game_type, target_score)?;
        let game = load(storage, match_id)?;
        Ok(MatchSession {
            game,
            player1,
            player2,
            cube: DoublingCube::new(),
            undo_stack: Vec::new(),
        })
    }

    /// Pick up an existing match. Rounds from earlier sessions cannot be
    /// undone. Stale totals are replayed from the rounds first.
    pub fn resume(storage: &Storage, match_id: MatchId) -> Result<Self, SessionError> {
        let mut game = load(storage, match_id)?;
        if !game.is_consistent_with(&storage.match_rounds(match_id)?) {
            log::warn!("match {} totals out of step with its rounds, recalculating", match_id);
            game = storage.recalculate_match(match_id)?;
        }
        let player1 = storage
            .player_by_id(game.player1_id)?
            .ok_or(StorageError::PlayerNotFound(game.player1_id))?;
        let player2 = storage
            .player_by_id(game.player2_id)?
            .ok_or(StorageError::PlayerNotFound(game.player2_id))?;
        Ok(MatchSession {
            game,
            player1,
            player2,
            cube: DoublingCube::new(),
            undo_stack: Vec::new(),
        })
    }

    pub fn game(&self) -> &Match {
        &self.game
    }

    pub fn player(&self, side: Side) -> &Player {
        match side {
            Side::One => &self.player1,
            Side::Two => &self.player2,
        }
    }

    pub fn cube(&self) -> &DoublingCube {
        &self.cube
    }

    pub fn is_finished(&self) -> bool {
        self.game.is_finished()
    }

    /// Winner's slot once the match is over.
    pub fn winner(&self) -> Option<Side> {
        self.game.winner_id.and_then(|id| self.game.side_of(id))
    }

    pub fn can_undo(&self) -> bool {
        !self.is_finished() && !self.undo_stack.is_empty()
    }

    pub fn rounds_this_session(&self) -> usize {
        self.undo_stack.len()
    }

    /// Score a round for `side` at the current cube value.
    ///
    /// Returns the winner's id if this round ended the match.
    pub fn record_round(
        &mut self,
        storage: &Storage,
        side: Side,
        win_type: WinType,
    ) -> Result<Option<PlayerId>, SessionError> {
        self.ensure_open()?;
        if self.cube.pending_offer().is_some() {
            return Err(SessionError::OfferPending);
        }
        let game_type = self.game.game_type;
        if win_type == WinType::Backgammon && !game_type.allows_backgammon() {
            return Err(SessionError::BackgammonNotAllowed(game_type));
        }

        let multiplier = self.cube.multiplier();
        self.add_round(storage, side, win_type, multiplier)
    }

    pub fn offer_double(&mut self, side: Side) -> Result<u32, SessionError> {
        self.ensure_open()?;
        let game_type = self.game.game_type;
        if !game_type.allows_doubling() {
            return Err(SessionError::DoublingNotAllowed(game_type));
        }
        Ok(self.cube.offer(side)?)
    }

    /// The opponent takes; returns the side now holding the cube.
    pub fn accept_double(&mut self) -> Result<Side, SessionError> {
        Ok(self.cube.accept()?)
    }

    pub fn cancel_offer(&mut self) -> Result<(), SessionError> {
        Ok(self.cube.cancel()?)
    }

    /// The opponent refuses: the offerer takes a Tekli round at the value
    /// the cube had before the offer.
    pub fn decline_double(&mut self, storage: &Storage) -> Result<Option<PlayerId>, SessionError> {
        self.ensure_open()?;
        let declined = self.cube.decline()?;
        log::debug!(
            "match {}: double declined, player {} takes the round at {}",
            self.game.id,
            declined.winner,
            declined.multiplier
        );
        self.add_round(storage, declined.winner, WinType::Single, declined.multiplier)
    }

    /// Remove the most recent round scored in this session.
    pub fn undo(&mut self, storage: &Storage) -> Result<RoundId, SessionError> {
        self.ensure_open()?;
        let round_id = self.undo_stack.pop().ok_or(SessionError::NothingToUndo)?;
        if !storage.delete_round(round_id) {
            self.undo_stack.push(round_id);
            return Err(SessionError::UndoFailed(round_id));
        }
        self.reload(storage)?;
        Ok(round_id)
    }

    /// End the match now; the leader wins.
    pub fn finish(&mut self, storage: &Storage) -> Result<PlayerId, SessionError> {
        let winner_id = storage.finish_match(self.game.id)?;
        self.reload(storage)?;
        Ok(winner_id)
    }

    /// Leave the scoreboard. A match with any rounds is finished on the
    /// way out; an empty one is left open.
    pub fn abandon(&mut self, storage: &Storage) -> Result<Option<PlayerId>, SessionError> {
        if let Some(winner_id) = self.game.winner_id {
            return Ok(Some(winner_id));
        }
        if self.game.total_rounds == 0 {
            return Ok(None);
        }
        self.finish(storage).map(Some)
    }

    fn ensure_open(&self) -> Result<(), SessionError> {
        if self.is_finished() {
            Err(SessionError::MatchFinished)
        } else {
            Ok(())
        }
    }

    fn add_round(
        &mut self,
        storage: &Storage,
        side: Side,
        win_type: WinType,
        multiplier: u32,
    ) -> Result<Option<PlayerId>, SessionError> {
        let winner_id = self.game.player_id(side);
        let round_id = storage.add_round(
            self.game.id,
            winner_id,
            win_type,
            multiplier > 1,
            multiplier,
        )?;
        self.undo_stack.push(round_id);
        self.cube.reset();
        self.reload(storage)?;

        if self.game.threshold_winner(self.game.target_score).is_some() {
            return self.finish(storage).map(Some);
        }
        Ok(None)
    }

    fn reload(&mut self, storage: &Storage) -> Result<(), SessionError> {
        self.game = load(storage, self.game.id)?;
        Ok(())
    }
}

fn load(storage: &Storage, match_id: MatchId) -> Result<Match, SessionError> {
    Ok(storage
        .match_by_id(match_id)?
        .ok_or(StorageError::MatchNotFound(match_id))?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scoring::CubePosition;

    fn setup(game_type: GameType, target: u32) -> (Storage, MatchSession) {
        let storage = Storage::open_in_memory().unwrap();
        let a = storage.add_player("Ali").unwrap();
        let b = storage.add_player("Veli").unwrap();
        let session = MatchSession::start(&storage, a, b, game_type, target).unwrap();
        (storage, session)
    }

    #[test]
    fn test_record_round_at_cube_value() {
        let (storage, mut session) = setup(GameType::Modern, 11);

        session.record_round(&storage, Side::One, WinType::Single).unwrap();
        assert_eq!(session.game().player1_score, 1);

        session.offer_double(Side::Two).unwrap();
        assert_eq!(session.accept_double().unwrap(), Side::One);
        session.record_round(&storage, Side::Two, WinType::Mars).unwrap();

        let game = session.game();
        assert_eq!(game.player2_score, 4);
        assert_eq!(game.total_rounds, 2);
        // The cube goes back to the middle after every round
        assert_eq!(session.cube().position(), CubePosition::Center);
        assert_eq!(session.cube().value(), 1);

        let rounds = storage.match_rounds(game.id).unwrap();
        assert_eq!(rounds[1].combined_win_type().to_string(), "2M");
    }

    #[test]
    fn test_record_refused_while_offer_pending() {
        let (storage, mut session) = setup(GameType::Modern, 11);
        session.offer_double(Side::One).unwrap();
        assert!(matches!(
            session.record_round(&storage, Side::One, WinType::Single),
            Err(SessionError::OfferPending)
        ));
        session.cancel_offer().unwrap();
        assert_eq!(session.cube().value(), 1);
        session.record_round(&storage, Side::One, WinType::Single).unwrap();
    }

    #[test]
    fn test_traditional_rules() {
        let (storage, mut session) = setup(GameType::Traditional, 11);
        assert!(matches!(
            session.record_round(&storage, Side::One, WinType::Backgammon),
            Err(SessionError::BackgammonNotAllowed(GameType::Traditional))
        ));
        assert!(matches!(
            session.offer_double(Side::One),
            Err(SessionError::DoublingNotAllowed(GameType::Traditional))
        ));
        assert_eq!(session.game().total_rounds, 0);
    }

    #[test]
    fn test_decline_credits_offerer() {
        let (storage, mut session) = setup(GameType::Modern, 11);

        session.offer_double(Side::One).unwrap();
        session.accept_double().unwrap();
        session.offer_double(Side::Two).unwrap();
        session.decline_double(&storage).unwrap();

        let game = session.game();
        assert_eq!(game.player2_score, 2);
        assert_eq!(game.player2_rounds_won, 1);
        assert_eq!(session.cube().position(), CubePosition::Center);
        assert!(game.is_consistent_with(&storage.match_rounds(game.id).unwrap()));
    }

    #[test]
    fn test_undo_last_round() {
        let (storage, mut session) = setup(GameType::Modern, 11);
        assert!(matches!(session.undo(&storage), Err(SessionError::NothingToUndo)));

        session.record_round(&storage, Side::One, WinType::Mars).unwrap();
        session.record_round(&storage, Side::Two, WinType::Single).unwrap();
        session.undo(&storage).unwrap();

        let game = session.game();
        assert_eq!((game.player1_score, game.player2_score), (2, 0));
        assert_eq!(game.total_rounds, 1);
        assert_eq!(session.rounds_this_session(), 1);
    }

    #[test]
    fn test_failed_undo_keeps_round_on_stack() {
        let (storage, mut session) = setup(GameType::Modern, 11);
        session.record_round(&storage, Side::One, WinType::Single).unwrap();
        let round_id = session.undo_stack[0];

        // Removed behind the session's back, so the delete finds nothing
        assert!(storage.try_delete_round(round_id).unwrap());
        assert!(matches!(
            session.undo(&storage),
            Err(SessionError::UndoFailed(id)) if id == round_id
        ));
        assert_eq!(session.rounds_this_session(), 1);
        assert!(session.can_undo());
    }

    #[test]
    fn test_reaching_target_finishes_match() {
        let (storage, mut session) = setup(GameType::Modern, 5);

        assert_eq!(session.record_round(&storage, Side::Two, WinType::Backgammon).unwrap(), None);
        let winner = session
            .record_round(&storage, Side::Two, WinType::Mars)
            .unwrap();
        let veli = session.player(Side::Two).id;
        assert_eq!(winner, Some(veli));
        assert!(session.is_finished());
        assert_eq!(session.winner(), Some(Side::Two));

        // Nothing more can change a finished match
        assert!(!session.can_undo());
        assert!(matches!(session.undo(&storage), Err(SessionError::MatchFinished)));
        assert!(matches!(
            session.record_round(&storage, Side::One, WinType::Single),
            Err(SessionError::MatchFinished)
        ));
        assert_eq!(storage.player_stats(veli).unwrap().unwrap().matches_won, 1);
    }

    #[test]
    fn test_abandon() {
        let (storage, mut session) = setup(GameType::Modern, 11);
        assert_eq!(session.abandon(&storage).unwrap(), None);
        assert!(!session.is_finished());

        session.record_round(&storage, Side::One, WinType::Single).unwrap();
        let ali = session.player(Side::One).id;
        assert_eq!(session.abandon(&storage).unwrap(), Some(ali));
        assert_eq!(session.abandon(&storage).unwrap(), Some(ali));
    }

    #[test]
    fn test_resume() {
        let (storage, mut session) = setup(GameType::Traditional, 7);
        session.record_round(&storage, Side::Two, WinType::Mars).unwrap();

        let resumed = MatchSession::resume(&storage, session.game().id).unwrap();
        assert_eq!(resumed.game(), session.game());
        assert_eq!(resumed.player(Side::Two).name, "Veli");
        assert!(!resumed.can_undo());

        assert!(matches!(
            MatchSession::resume(&storage, 404),
            Err(SessionError::Storage(StorageError::MatchNotFound(404)))
        ));
    }
}
