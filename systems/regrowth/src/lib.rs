#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Daily pass that regrows destroyed bushes once their delay has elapsed.

use destroyable_bushes_core::{regrow_date, DestroyedBush, Event, ModData, PlacementError, SimDate};
use thiserror::Error;
use tracing::{debug, error};

/// Failure to put a due bush back into the world.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
#[error("could not regrow bush at {location} ({x}, {y}): {reason:?}")]
pub struct RegrowthError {
    /// Location named by the record.
    pub location: String,
    /// Horizontal tile of the record.
    pub x: i32,
    /// Vertical tile of the record.
    pub y: i32,
    /// Reason the host gave.
    pub reason: PlacementError,
}

impl RegrowthError {
    fn new(record: &DestroyedBush, reason: PlacementError) -> Self {
        Self {
            location: record.location_name.clone(),
            x: record.tile.x(),
            y: record.tile.y(),
            reason,
        }
    }
}

/// Outcome of one regrowth pass.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct RegrowthSummary {
    /// Bushes placed back into the world.
    pub regrown: usize,
    /// Records still waiting afterwards.
    pub pending: usize,
}

/// Reports whether a record is due on `today` under the schedule.
///
/// A disabled or malformed schedule is never due.
#[must_use]
pub fn is_due(record: &DestroyedBush, schedule: Option<&str>, today: SimDate) -> bool {
    regrow_date(Some(record.date_destroyed), schedule).is_some_and(|due| today >= due)
}

/// Host operations the scheduler needs to put a bush back.
pub trait RegrowthHost {
    /// Reports whether the recorded footprint is free right now.
    fn footprint_free(&self, record: &DestroyedBush) -> Result<bool, PlacementError>;

    /// Places the recorded bush.
    fn place(&mut self, record: &DestroyedBush) -> Result<(), PlacementError>;
}

/// System that regrows destroyed bushes at the start of each day.
#[derive(Debug, Default)]
pub struct RegrowthScheduler;

impl RegrowthScheduler {
    /// Creates a new scheduler.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    /// Runs a pass for every `DayStarted` event.
    ///
    /// A record is removed only when the host places its bush. Blocked
    /// footprints stay pending without noise; any other failure is logged
    /// and retried on a later day.
    pub fn handle(
        &mut self,
        events: &[Event],
        schedule: Option<&str>,
        data: &mut ModData,
        host: &mut dyn RegrowthHost,
    ) -> RegrowthSummary {
        let mut summary = RegrowthSummary {
            regrown: 0,
            pending: data.destroyed_bushes.len(),
        };

        for event in events {
            let Event::DayStarted { date } = event else {
                continue;
            };

            for index in (0..data.destroyed_bushes.len()).rev() {
                let record = &data.destroyed_bushes[index];
                if !is_due(record, schedule, *date) {
                    continue;
                }

                let placed = match host.footprint_free(record) {
                    Ok(true) => host.place(record),
                    Ok(false) => {
                        debug!(
                            location = %record.location_name,
                            x = record.tile.x(),
                            y = record.tile.y(),
                            "regrowth blocked; retrying tomorrow"
                        );
                        continue;
                    }
                    Err(reason) => Err(reason),
                };

                match placed {
                    Ok(()) => {
                        let _ = data.destroyed_bushes.remove(index);
                        summary.regrown += 1;
                    }
                    Err(reason) => {
                        let regrowth_error = RegrowthError::new(record, reason);
                        error!(%regrowth_error, "bush regrowth failed");
                    }
                }
            }

            summary.pending = data.destroyed_bushes.len();
        }

        summary
    }
}
