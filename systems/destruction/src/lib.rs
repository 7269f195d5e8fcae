#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Reacts to destroyed bushes: records them for regrowth and hands out rewards.
//!
//! Where a record goes depends on the session's role. The authoritative
//! session stores it in its own save data through [`LocalRecorder`]; a
//! replica forwards it to the host peer through [`RemoteRecorder`].

use std::{collections::HashSet, fmt, mem::Discriminant};

use destroyable_bushes_core::{
    BushSize, Command, DebrisKind, DestroyedBush, Event, FarmerId, FarmerTraits, ModConfig,
    ModData, SimDate, Skill, Tile, DESTROYED_BUSH_MESSAGE,
};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use thiserror::Error;
use tracing::{debug, error};

/// Extra wood granted by the Forester profession.
pub const FORESTER_WOOD_MULTIPLIER: f64 = 1.25;

/// Chance that the woodcutting book doubles the wood dropped.
pub const WOODCUTTING_BOOK_DOUBLE_CHANCE: f64 = 0.05;

/// Failures raised while persisting a destruction record.
#[derive(Debug, Error)]
pub enum RecordError {
    /// The destroyed bush did not belong to a named location.
    #[error("destroyed bush has no location name")]
    MissingLocation,
    /// The record could not be encoded for the host peer.
    #[error("could not encode destroyed bush: {0}")]
    Encode(#[from] bincode::Error),
}

/// Strategy that decides where destruction records are stored.
pub trait RecordSink: fmt::Debug {
    /// Stores or forwards the record.
    fn persist(
        &mut self,
        record: DestroyedBush,
        data: &mut ModData,
        out: &mut Vec<Command>,
    ) -> Result<(), RecordError>;
}

/// Appends records to the local save data; used by the authoritative session.
#[derive(Clone, Copy, Debug, Default)]
pub struct LocalRecorder;

impl RecordSink for LocalRecorder {
    fn persist(
        &mut self,
        record: DestroyedBush,
        data: &mut ModData,
        _out: &mut Vec<Command>,
    ) -> Result<(), RecordError> {
        if record.location_name.is_empty() {
            return Err(RecordError::MissingLocation);
        }
        data.destroyed_bushes.push(record);
        Ok(())
    }
}

/// Sends records to the host peer; used by replicas, which never touch save data.
#[derive(Clone, Copy, Debug)]
pub struct RemoteRecorder {
    sender: FarmerId,
    host: FarmerId,
}

impl RemoteRecorder {
    /// Creates a recorder that forwards from `sender` to the `host` peer.
    #[must_use]
    pub const fn new(sender: FarmerId, host: FarmerId) -> Self {
        Self { sender, host }
    }
}

impl RecordSink for RemoteRecorder {
    fn persist(
        &mut self,
        record: DestroyedBush,
        _data: &mut ModData,
        out: &mut Vec<Command>,
    ) -> Result<(), RecordError> {
        if record.location_name.is_empty() {
            return Err(RecordError::MissingLocation);
        }
        out.push(Command::SendModMessage {
            message_type: DESTROYED_BUSH_MESSAGE.to_owned(),
            sender: self.sender,
            recipient: self.host,
            payload: encode_record(&record)?,
        });
        Ok(())
    }
}

/// Encodes a record as a replication payload.
pub fn encode_record(record: &DestroyedBush) -> Result<Vec<u8>, RecordError> {
    Ok(bincode::serialize(record)?)
}

/// Decodes a replication payload produced by [`encode_record`].
pub fn decode_record(payload: &[u8]) -> Result<DestroyedBush, RecordError> {
    Ok(bincode::deserialize(payload)?)
}

/// Configured rewards for a destroyed bush of the provided size.
///
/// Returns `(wood, experience, should_regrow)`. Green tea bushes never
/// regrow and unknown sizes yield nothing.
#[must_use]
pub fn rewards_for(config: &ModConfig, size: i32) -> (i32, i32, bool) {
    match BushSize::from_id(size) {
        Some(size) => (
            config.amount_of_wood_dropped.for_size(size),
            config.amount_of_experience_gained.for_size(size),
            size != BushSize::GreenTea,
        ),
        None => (0, 0, false),
    }
}

/// Tile-sheet offset forced on the regrown bush.
///
/// Walnut bushes regrow without their walnut and berry bushes (wild medium
/// bushes) let the host pick a seasonal offset. Every other bush keeps the
/// offset it had.
#[must_use]
pub fn forced_tile_sheet_offset(size: i32, town_bush: bool, current: i32) -> Option<i32> {
    match BushSize::from_id(size) {
        Some(BushSize::Walnut) => Some(0),
        Some(BushSize::Medium) if !town_bush => None,
        _ => Some(current),
    }
}

/// Pieces of wood a farmer receives for a bush configured to drop `base`.
///
/// Foresters get 25% more, with the fractional part used as the chance of
/// one extra piece. Readers of the woodcutting book then have a small
/// chance to double the result.
pub fn wood_dropped<R>(base: i32, traits: FarmerTraits, rng: &mut R) -> u32
where
    R: Rng + ?Sized,
{
    let Ok(mut wood) = u32::try_from(base) else {
        return 0;
    };
    if wood == 0 {
        return 0;
    }

    if traits.forester {
        let multiplied = FORESTER_WOOD_MULTIPLIER * f64::from(wood);
        let whole = multiplied.floor();
        wood = whole as u32;
        let fraction = multiplied - whole;
        if fraction > 0.0 && rng.gen_bool(fraction) {
            wood += 1;
        }
    }

    if traits.read_woodcutting_book && rng.gen_bool(WOODCUTTING_BOOK_DOUBLE_CHANCE) {
        wood = wood.saturating_mul(2);
    }

    wood
}

/// System that turns destroyed bushes into records and rewards.
#[derive(Debug)]
pub struct DestructionRecorder {
    rng: ChaCha8Rng,
    reported: HashSet<Discriminant<RecordError>>,
}

impl DestructionRecorder {
    /// Creates a recorder whose random rolls follow the provided seed.
    #[must_use]
    pub fn new(seed: u64) -> Self {
        Self {
            rng: ChaCha8Rng::seed_from_u64(seed),
            reported: HashSet::new(),
        }
    }

    /// Consumes world events and emits reward commands for destroyed bushes.
    ///
    /// `farmer_traits` should mirror the world's `query::farmer_traits`.
    /// Records go through `sink`; a failure there is logged once per kind
    /// and never undoes the destruction or withholds rewards. Wood drops
    /// even when the destroying farmer is unknown, without their bonuses;
    /// experience needs a farmer who is present.
    #[allow(clippy::too_many_arguments)]
    pub fn handle<F>(
        &mut self,
        events: &[Event],
        config: &ModConfig,
        today: SimDate,
        mut farmer_traits: F,
        sink: &mut dyn RecordSink,
        data: &mut ModData,
        out: &mut Vec<Command>,
    ) where
        F: FnMut(FarmerId) -> Option<FarmerTraits>,
    {
        for event in events {
            let Event::BushDestroyed {
                farmer,
                location,
                tile,
                struck_tile,
                size,
                town_bush,
                tile_sheet_offset,
            } = event
            else {
                continue;
            };

            let (wood, experience, should_regrow) = rewards_for(config, *size);
            if should_regrow {
                let record = DestroyedBush {
                    location_name: location.clone(),
                    tile: *tile,
                    size: *size,
                    town_bush: *town_bush,
                    tile_sheet_offset: forced_tile_sheet_offset(
                        *size,
                        *town_bush,
                        *tile_sheet_offset,
                    ),
                    date_destroyed: today,
                };
                if let Err(record_error) = sink.persist(record, data, out) {
                    self.report(location, *tile, record_error);
                }
            }

            let known_farmer = (*farmer).and_then(|farmer| {
                let traits = farmer_traits(farmer);
                if traits.is_none() {
                    debug!(farmer = farmer.get(), "destroying farmer is not present; no bonuses");
                }
                traits.map(|traits| (farmer, traits))
            });

            if wood > 0 {
                let traits = known_farmer.map(|(_, traits)| traits).unwrap_or_default();
                let count = wood_dropped(wood, traits, &mut self.rng);
                out.push(Command::DropDebris {
                    location: location.clone(),
                    tile: *struck_tile,
                    kind: DebrisKind::Wood,
                    count,
                });
            }

            let Some((farmer, _)) = known_farmer else {
                debug!(%location, "bush destroyed without a known farmer; no experience");
                continue;
            };
            let amount = u32::try_from(experience).unwrap_or(0);
            if amount > 0 {
                out.push(Command::GainExperience {
                    farmer,
                    skill: Skill::Foraging,
                    amount,
                });
            }
        }
    }

    fn report(&mut self, location: &str, tile: Tile, record_error: RecordError) {
        if self.reported.insert(std::mem::discriminant(&record_error)) {
            error!(
                %record_error,
                %location,
                x = tile.x(),
                y = tile.y(),
                "could not record destroyed bush; it will not regrow"
            );
        }
    }
}
