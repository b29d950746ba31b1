//! Doubling cube state for a live match
//!
//! The cube sits in the center until someone doubles. An offer moves it to
//! the offering side; the opponent then accepts (taking control of the cube),
//! declines (conceding the round at the pre-offer value) or the offer is
//! withdrawn. Only the side in control may redouble.

use super::MAX_CUBE_VALUE;
use crate::model::Side;

/// Where the cube currently is.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum CubePosition {
    #[default]
    Center,
    Player1Offer,
    Player1Control,
    Player2Offer,
    Player2Control,
}

impl CubePosition {
    fn offer_of(side: Side) -> Self {
        match side {
            Side::One => CubePosition::Player1Offer,
            Side::Two => CubePosition::Player2Offer,
        }
    }

    fn control_of(side: Side) -> Self {
        match side {
            Side::One => CubePosition::Player1Control,
            Side::Two => CubePosition::Player2Control,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum CubeError {
    #[error("a double is already on offer")]
    OfferPending,
    #[error("no double is on offer")]
    NoOfferPending,
    #[error("player {0} does not hold the cube")]
    NotInControl(Side),
    #[error("the cube is already at its highest value")]
    AtMaximum,
}

/// A declined double: who takes the round and at what multiplier.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Declined {
    pub winner: Side,
    pub multiplier: u32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DoublingCube {
    value: u32,
    position: CubePosition,
    previous_value: u32,
    previous_position: CubePosition,
}

impl Default for DoublingCube {
    fn default() -> Self {
        Self::new()
    }
}

impl DoublingCube {
    pub fn new() -> Self {
        DoublingCube {
            value: 1,
            position: CubePosition::Center,
            previous_value: 1,
            previous_position: CubePosition::Center,
        }
    }

    /// Face value; during an offer this is the offered value.
    pub fn value(&self) -> u32 {
        self.value
    }

    pub fn position(&self) -> CubePosition {
        self.position
    }

    /// Side whose offer is waiting for an answer.
    pub fn pending_offer(&self) -> Option<Side> {
        match self.position {
            CubePosition::Player1Offer => Some(Side::One),
            CubePosition::Player2Offer => Some(Side::Two),
            _ => None,
        }
    }

    /// Side holding the cube after an accepted double.
    pub fn owner(&self) -> Option<Side> {
        match self.position {
            CubePosition::Player1Control => Some(Side::One),
            CubePosition::Player2Control => Some(Side::Two),
            _ => None,
        }
    }

    /// Multiplier to apply to a round finished now.
    pub fn multiplier(&self) -> u32 {
        self.value
    }

    pub fn can_offer(&self, side: Side) -> bool {
        self.check_offer(side).is_ok()
    }

    fn check_offer(&self, side: Side) -> Result<(), CubeError> {
        if self.pending_offer().is_some() {
            return Err(CubeError::OfferPending);
        }
        if let Some(owner) = self.owner() {
            if owner != side {
                return Err(CubeError::NotInControl(side));
            }
        }
        if self.value >= MAX_CUBE_VALUE {
            return Err(CubeError::AtMaximum);
        }
        Ok(())
    }

    /// Double the cube on behalf of `side`. Returns the offered value.
    pub fn offer(&mut self, side: Side) -> Result<u32, CubeError> {
        self.check_offer(side)?;
        self.previous_value = self.value;
        self.previous_position = self.position;
        self.value *= 2;
        self.position = CubePosition::offer_of(side);
        Ok(self.value)
    }

    /// The opponent takes the double and now holds the cube.
    pub fn accept(&mut self) -> Result<Side, CubeError> {
        let offerer = self.pending_offer().ok_or(CubeError::NoOfferPending)?;
        let taker = offerer.opponent();
        self.position = CubePosition::control_of(taker);
        self.previous_value = self.value;
        self.previous_position = self.position;
        Ok(taker)
    }

    /// Withdraw the offer, restoring the cube as it was before it.
    pub fn cancel(&mut self) -> Result<(), CubeError> {
        self.pending_offer().ok_or(CubeError::NoOfferPending)?;
        self.value = self.previous_value;
        self.position = self.previous_position;
        Ok(())
    }

    /// The opponent refuses; the offerer wins at the pre-offer value.
    ///
    /// The cube is reset for the next round.
    pub fn decline(&mut self) -> Result<Declined, CubeError> {
        let offerer = self.pending_offer().ok_or(CubeError::NoOfferPending)?;
        let declined = Declined {
            winner: offerer,
            multiplier: self.previous_value,
        };
        self.reset();
        Ok(declined)
    }

    /// Back to the center at 1, as at the start of every round.
    pub fn reset(&mut self) {
        *self = DoublingCube::new();
    }
}
