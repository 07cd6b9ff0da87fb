//! Rotating lead-squad ("tango") selection.

use super::schedule::Shift;
use super::squad_id::SquadId;

/// Picks the tango for each shift of a day by rotating through the
/// active squads in ascending ID order.
#[derive(Debug, Clone, Copy, Default)]
pub struct TangoSelector;

impl TangoSelector {
    /// Picks the tango among `candidates` (ascending) following `previous`.
    ///
    /// Returns the smallest candidate strictly greater than `previous`,
    /// wrapping to the smallest. With no previous tango the smallest
    /// candidate wins.
    #[must_use]
    pub fn next(candidates: &[SquadId], previous: Option<SquadId>) -> Option<SquadId> {
        let smallest = candidates.first().copied();
        match previous {
            None => smallest,
            Some(prev) => candidates
                .iter()
                .copied()
                .find(|id| *id > prev)
                .or(smallest),
        }
    }

    /// Assigns tango to every shift in order and returns the last tango
    /// assigned (or `prior` if no shift had an active squad).
    ///
    /// Shifts without active squads get `None` and leave the rotation
    /// untouched.
    pub fn assign(shifts: &mut [Shift], prior: Option<SquadId>) -> Option<SquadId> {
        let mut previous = prior;
        for shift in shifts {
            shift.tango = Self::next(&shift.active_ids(), previous);
            if shift.tango.is_some() {
                previous = shift.tango;
            }
        }
        previous
    }
}
