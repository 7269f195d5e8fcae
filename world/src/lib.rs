#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Authoritative host state for the Destroyable Bushes workspace.
//!
//! The world owns the locations, bushes, farmers, calendar and peer mailboxes
//! the mod runs against. It only changes through [`apply`], and every bush a
//! tool strikes is handled by interpreting the installed strike procedure.

mod bushes;
pub mod procedure;

use std::collections::{BTreeMap, BTreeSet, VecDeque};

use destroyable_bushes_core::{
    CodeInstruction, Command, DebrisKind, Event, Facing, FarmerId, PlacementError, Profession,
    RemovalError, SimDate, Skill, StrikeHooks, Tile, Tool,
};
use tracing::{debug, error, warn};

use bushes::{default_tile_sheet_offset, footprint, BushState, Location};

/// Locations every new world starts with.
pub const DEFAULT_LOCATIONS: [&str; 5] = ["Farm", "Forest", "Town", "BusStop", "IslandWest"];

/// Represents the authoritative host world.
#[derive(Debug)]
pub struct World {
    date: SimDate,
    locations: BTreeMap<String, Location>,
    farmers: BTreeMap<FarmerId, Farmer>,
    host: Option<FarmerId>,
    mailboxes: BTreeMap<FarmerId, VecDeque<Envelope>>,
    dropped_wood: BTreeMap<String, u32>,
    strike_procedure: Vec<CodeInstruction>,
}

impl World {
    /// Creates a world on the first day of the calendar.
    #[must_use]
    pub fn new() -> Self {
        Self::starting_on(SimDate::START)
    }

    /// Creates a world whose calendar starts on the provided date.
    #[must_use]
    pub fn starting_on(date: SimDate) -> Self {
        Self {
            date,
            locations: DEFAULT_LOCATIONS
                .iter()
                .map(|name| ((*name).to_owned(), Location::default()))
                .collect(),
            farmers: BTreeMap::new(),
            host: None,
            mailboxes: BTreeMap::new(),
            dropped_wood: BTreeMap::new(),
            strike_procedure: procedure::vanilla_perform_tool_action(),
        }
    }

    fn footprint_free(&self, location: &str, origin: Tile, size: i32) -> Result<bool, PlacementError> {
        let Some(state) = self.locations.get(location) else {
            return Err(PlacementError::UnknownLocation);
        };
        if !state.footprint_is_clear(origin, size) {
            return Ok(false);
        }
        let standing = self
            .farmers
            .values()
            .filter(|farmer| farmer.location == location)
            .any(|farmer| footprint(origin, size).any(|tile| tile == farmer.tile));
        Ok(!standing)
    }

    fn strike(
        &mut self,
        farmer: FarmerId,
        location: String,
        tile: Tile,
        tool: Tool,
        hooks: &dyn StrikeHooks,
        out_events: &mut Vec<Event>,
    ) {
        if !self.farmers.contains_key(&farmer) {
            warn!(farmer = farmer.get(), "tool used by unknown farmer");
            return;
        }
        let Some(state) = self.locations.get_mut(&location) else {
            debug!(%location, "tool used in unknown location");
            return;
        };
        let Some(origin) = state.bush_covering(tile) else {
            return;
        };
        let Some(bush) = state.bush_mut(origin) else {
            return;
        };

        let health_before = bush.health;
        let destroyed = match procedure::execute(
            &self.strike_procedure,
            &location,
            origin,
            bush,
            tool,
            hooks,
        ) {
            Ok(destroyed) => destroyed,
            Err(execution_error) => {
                error!(%execution_error, %location, x = tile.x(), y = tile.y(), "strike procedure failed");
                false
            }
        };
        let health = bush.health;

        if destroyed {
            let Some(removed) = state.remove_bush(origin) else {
                return;
            };
            out_events.push(Event::BushDestroyed {
                farmer: Some(farmer),
                location,
                tile: origin,
                struck_tile: tile,
                size: removed.size,
                town_bush: removed.town_bush,
                tile_sheet_offset: removed.tile_sheet_offset,
            });
        } else if health < health_before {
            out_events.push(Event::BushStruck {
                farmer,
                location,
                tile: origin,
                health,
            });
        } else {
            out_events.push(Event::ToolBounced {
                farmer,
                location,
                tile: origin,
            });
        }
    }
}

impl Default for World {
    fn default() -> Self {
        Self::new()
    }
}

/// Applies the provided command to the world, mutating state deterministically.
///
/// Tool strikes run the installed strike procedure, which calls back into
/// `hooks` at its extension points.
pub fn apply(
    world: &mut World,
    command: Command,
    hooks: &dyn StrikeHooks,
    out_events: &mut Vec<Event>,
) {
    match command {
        Command::AddFarmer {
            farmer,
            location,
            tile,
            facing,
        } => {
            let _ = world.farmers.insert(
                farmer,
                Farmer {
                    location,
                    tile,
                    facing,
                    professions: BTreeSet::new(),
                    stats: BTreeMap::new(),
                    foraging_experience: 0,
                },
            );
            let _ = world.host.get_or_insert(farmer);
            out_events.push(Event::FarmerJoined { farmer });
        }
        Command::GrantProfession { farmer, profession } => {
            if let Some(state) = world.farmers.get_mut(&farmer) {
                let _ = state.professions.insert(profession);
            }
        }
        Command::SetStat {
            farmer,
            stat,
            value,
        } => {
            if let Some(state) = world.farmers.get_mut(&farmer) {
                let _ = state.stats.insert(stat, value);
            }
        }
        Command::PlaceBush {
            location,
            tile,
            size,
            town_bush,
            tile_sheet_offset,
        } => {
            let rejection = match world.footprint_free(&location, tile, size) {
                Ok(true) => None,
                Ok(false) => Some(PlacementError::Occupied),
                Err(reason) => Some(reason),
            };
            if let Some(reason) = rejection {
                out_events.push(Event::BushPlacementRejected {
                    location,
                    tile,
                    reason,
                });
                return;
            }

            let offset = tile_sheet_offset
                .unwrap_or_else(|| default_tile_sheet_offset(size, town_bush, world.date));
            if let Some(state) = world.locations.get_mut(&location) {
                state.insert_bush(tile, BushState::new(size, town_bush, offset));
                out_events.push(Event::BushPlaced {
                    location,
                    tile,
                    size,
                });
            }
        }
        Command::RemoveBush { location, tile } => {
            let Some(state) = world.locations.get_mut(&location) else {
                out_events.push(Event::BushRemovalRejected {
                    location,
                    tile,
                    reason: RemovalError::UnknownLocation,
                });
                return;
            };
            let removed = state
                .bush_covering(tile)
                .and_then(|origin| state.remove_bush(origin).map(|bush| (origin, bush)));
            match removed {
                Some((origin, bush)) => out_events.push(Event::BushRemoved {
                    location,
                    tile: origin,
                    size: bush.size,
                }),
                None => out_events.push(Event::BushRemovalRejected {
                    location,
                    tile,
                    reason: RemovalError::MissingBush,
                }),
            }
        }
        Command::PlaceObstruction { location, tile } => match world.locations.get_mut(&location) {
            Some(state) => state.block(tile),
            None => debug!(%location, "obstruction ignored for unknown location"),
        },
        Command::ClearObstruction { location, tile } => {
            if let Some(state) = world.locations.get_mut(&location) {
                state.unblock(tile);
            }
        }
        Command::UseTool {
            farmer,
            location,
            tile,
            tool,
        } => world.strike(farmer, location, tile, tool, hooks, out_events),
        Command::DropDebris {
            location,
            tile,
            kind,
            count,
        } => {
            if !world.locations.contains_key(&location) {
                debug!(%location, "debris ignored for unknown location");
                return;
            }
            match kind {
                DebrisKind::Wood => {
                    let total = world.dropped_wood.entry(location.clone()).or_insert(0);
                    *total = total.saturating_add(count);
                }
            }
            out_events.push(Event::DebrisDropped {
                location,
                tile,
                kind,
                count,
            });
        }
        Command::GainExperience {
            farmer,
            skill,
            amount,
        } => {
            let Some(state) = world.farmers.get_mut(&farmer) else {
                return;
            };
            match skill {
                Skill::Foraging => {
                    state.foraging_experience = state.foraging_experience.saturating_add(amount);
                }
            }
            out_events.push(Event::ExperienceGained {
                farmer,
                skill,
                amount,
            });
        }
        Command::SendModMessage {
            message_type,
            sender,
            recipient,
            payload,
        } => {
            if !world.farmers.contains_key(&recipient) {
                out_events.push(Event::ModMessageDropped {
                    message_type,
                    recipient,
                });
                return;
            }
            world
                .mailboxes
                .entry(recipient)
                .or_default()
                .push_back(Envelope {
                    message_type,
                    sender,
                    payload,
                });
        }
        Command::DeliverMessages { recipient } => {
            let Some(inbox) = world.mailboxes.get_mut(&recipient) else {
                return;
            };
            for envelope in inbox.drain(..) {
                out_events.push(Event::ModMessageReceived {
                    message_type: envelope.message_type,
                    sender: envelope.sender,
                    payload: envelope.payload,
                });
            }
        }
        Command::AdvanceDay => {
            match world.date.next_day() {
                Some(date) => world.date = date,
                None => error!("calendar cannot advance past its final year"),
            }
            out_events.push(Event::DayStarted { date: world.date });
        }
        Command::InstallStrikeProcedure { listing } => {
            debug!(instructions = listing.len(), "strike procedure installed");
            world.strike_procedure = listing;
        }
    }
}

/// Query functions that provide read-only access to the world state.
pub mod query {
    use super::World;
    use destroyable_bushes_core::{
        CodeInstruction, Facing, FarmerId, FarmerTraits, PlacementError, Profession, SimDate, Tile,
        WOODCUTTING_BOOK_STAT,
    };

    /// Current calendar date.
    #[must_use]
    pub fn date(world: &World) -> SimDate {
        world.date
    }

    /// Listing the host runs when a tool strikes a bush.
    #[must_use]
    pub fn strike_procedure(world: &World) -> &[CodeInstruction] {
        &world.strike_procedure
    }

    /// Names of every location in deterministic order.
    #[must_use]
    pub fn location_names(world: &World) -> Vec<&str> {
        world.locations.keys().map(String::as_str).collect()
    }

    /// Reports whether a bush of the provided size could be placed at `origin`.
    ///
    /// Bushes, blocking objects, and farmers all occupy tiles.
    pub fn is_footprint_free(
        world: &World,
        location: &str,
        origin: Tile,
        size: i32,
    ) -> Result<bool, PlacementError> {
        world.footprint_free(location, origin, size)
    }

    /// Captures every bush in the world, ordered by location then origin tile.
    #[must_use]
    pub fn bushes(world: &World) -> Vec<BushSnapshot> {
        world
            .locations
            .iter()
            .flat_map(|(name, state)| {
                state
                    .bushes()
                    .map(move |(tile, bush)| BushSnapshot::capture(name, tile, bush))
            })
            .collect()
    }

    /// Bush whose footprint covers the tile, if any.
    #[must_use]
    pub fn bush_at(world: &World, location: &str, tile: Tile) -> Option<BushSnapshot> {
        let state = world.locations.get(location)?;
        let origin = state.bush_covering(tile)?;
        state
            .bushes()
            .find(|(candidate, _)| *candidate == origin)
            .map(|(origin, bush)| BushSnapshot::capture(location, origin, bush))
    }

    /// Farmer that hosts the session and owns the save.
    #[must_use]
    pub fn host_peer(world: &World) -> Option<FarmerId> {
        world.host
    }

    /// Position of a farmer, if they are present.
    #[must_use]
    pub fn farmer_position(world: &World, farmer: FarmerId) -> Option<FarmerPosition> {
        world.farmers.get(&farmer).map(|state| FarmerPosition {
            location: state.location.clone(),
            tile: state.tile,
            facing: state.facing,
        })
    }

    /// Attributes that influence destruction rewards.
    #[must_use]
    pub fn farmer_traits(world: &World, farmer: FarmerId) -> Option<FarmerTraits> {
        world.farmers.get(&farmer).map(|state| FarmerTraits {
            forester: state.professions.contains(&Profession::Forester),
            read_woodcutting_book: state
                .stats
                .get(WOODCUTTING_BOOK_STAT)
                .is_some_and(|value| *value != 0),
        })
    }

    /// Foraging experience a farmer has accumulated.
    #[must_use]
    pub fn foraging_experience(world: &World, farmer: FarmerId) -> Option<u32> {
        world
            .farmers
            .get(&farmer)
            .map(|state| state.foraging_experience)
    }

    /// Pieces of wood dropped in a location so far.
    #[must_use]
    pub fn dropped_wood(world: &World, location: &str) -> u32 {
        world.dropped_wood.get(location).copied().unwrap_or(0)
    }

    /// Number of messages waiting for the provided peer.
    #[must_use]
    pub fn pending_messages(world: &World, recipient: FarmerId) -> usize {
        world.mailboxes.get(&recipient).map_or(0, |inbox| inbox.len())
    }

    /// Immutable representation of a single bush.
    #[derive(Clone, Debug, PartialEq)]
    pub struct BushSnapshot {
        /// Location containing the bush.
        pub location: String,
        /// Leftmost tile of the footprint.
        pub tile: Tile,
        /// Host size id.
        pub size: i32,
        /// Current health.
        pub health: f32,
        /// Whether the bush uses the town sprite.
        pub town_bush: bool,
        /// Secondary sprite offset.
        pub tile_sheet_offset: i32,
    }

    impl BushSnapshot {
        fn capture(location: &str, tile: Tile, bush: &super::BushState) -> Self {
            Self {
                location: location.to_owned(),
                tile,
                size: bush.size,
                health: bush.health,
                town_bush: bush.town_bush,
                tile_sheet_offset: bush.tile_sheet_offset,
            }
        }
    }

    /// Where a farmer stands and which way they face.
    #[derive(Clone, Debug, PartialEq, Eq)]
    pub struct FarmerPosition {
        /// Location the farmer is in.
        pub location: String,
        /// Tile the farmer stands on.
        pub tile: Tile,
        /// Direction the farmer faces.
        pub facing: Facing,
    }
}

#[derive(Clone, Debug)]
struct Farmer {
    location: String,
    tile: Tile,
    facing: Facing,
    professions: BTreeSet<Profession>,
    stats: BTreeMap<String, u32>,
    foraging_experience: u32,
}

#[derive(Clone, Debug)]
struct Envelope {
    message_type: String,
    sender: FarmerId,
    payload: Vec<u8>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use destroyable_bushes_core::Season;
    use procedure::VanillaHooks;

    const PLAYER: FarmerId = FarmerId::new(1);

    fn run(world: &mut World, command: Command) -> Vec<Event> {
        let mut events = Vec::new();
        apply(world, command, &VanillaHooks, &mut events);
        events
    }

    fn place(world: &mut World, location: &str, x: i32, y: i32, size: i32) -> Vec<Event> {
        run(
            world,
            Command::PlaceBush {
                location: location.to_owned(),
                tile: Tile::new(x, y),
                size,
                town_bush: false,
                tile_sheet_offset: None,
            },
        )
    }

    #[test]
    fn overlapping_placements_are_rejected() {
        let mut world = World::new();

        assert_eq!(
            place(&mut world, "Forest", 5, 5, 2),
            vec![Event::BushPlaced {
                location: "Forest".to_owned(),
                tile: Tile::new(5, 5),
                size: 2,
            }]
        );
        assert_eq!(
            place(&mut world, "Forest", 7, 5, 0),
            vec![Event::BushPlacementRejected {
                location: "Forest".to_owned(),
                tile: Tile::new(7, 5),
                reason: PlacementError::Occupied,
            }]
        );
        assert_eq!(
            place(&mut world, "Moon", 0, 0, 0),
            vec![Event::BushPlacementRejected {
                location: "Moon".to_owned(),
                tile: Tile::new(0, 0),
                reason: PlacementError::UnknownLocation,
            }]
        );
    }

    #[test]
    fn farmers_block_placement() {
        let mut world = World::new();
        let _ = run(
            &mut world,
            Command::AddFarmer {
                farmer: PLAYER,
                location: "Farm".to_owned(),
                tile: Tile::new(3, 3),
                facing: Facing::Down,
            },
        );

        assert_eq!(query::is_footprint_free(&world, "Farm", Tile::new(2, 3), 1), Ok(false));
        assert_eq!(query::is_footprint_free(&world, "Farm", Tile::new(2, 3), 0), Ok(true));
        assert_eq!(query::is_footprint_free(&world, "Town", Tile::new(2, 3), 1), Ok(true));
    }

    #[test]
    fn extreme_tiles_are_rejected_instead_of_overflowing() {
        let mut world = World::new();

        assert_eq!(
            run(
                &mut world,
                Command::RemoveBush {
                    location: "Farm".to_owned(),
                    tile: Tile::new(i32::MIN, 0),
                }
            ),
            vec![Event::BushRemovalRejected {
                location: "Farm".to_owned(),
                tile: Tile::new(i32::MIN, 0),
                reason: RemovalError::MissingBush,
            }]
        );
        assert_eq!(
            place(&mut world, "Farm", i32::MAX, 0, 2),
            vec![Event::BushPlacementRejected {
                location: "Farm".to_owned(),
                tile: Tile::new(i32::MAX, 0),
                reason: PlacementError::Occupied,
            }]
        );
        assert_eq!(
            place(&mut world, "Farm", i32::MAX, 0, 0),
            vec![Event::BushPlaced {
                location: "Farm".to_owned(),
                tile: Tile::new(i32::MAX, 0),
                size: 0,
            }]
        );
        assert!(query::bush_at(&world, "Farm", Tile::new(i32::MAX, 0)).is_some());
    }

    #[test]
    fn removal_works_from_any_covered_tile() {
        let mut world = World::new();
        let _ = place(&mut world, "Town", 1, 1, 2);

        assert_eq!(
            run(
                &mut world,
                Command::RemoveBush {
                    location: "Town".to_owned(),
                    tile: Tile::new(3, 1),
                }
            ),
            vec![Event::BushRemoved {
                location: "Town".to_owned(),
                tile: Tile::new(1, 1),
                size: 2,
            }]
        );
        assert!(query::bushes(&world).is_empty());
    }

    #[test]
    fn vanilla_strikes_bounce_off_wild_bushes() {
        let mut world = World::new();
        let _ = run(
            &mut world,
            Command::AddFarmer {
                farmer: PLAYER,
                location: "Forest".to_owned(),
                tile: Tile::new(0, 1),
                facing: Facing::Up,
            },
        );
        let _ = place(&mut world, "Forest", 0, 0, 0);

        let events = run(
            &mut world,
            Command::UseTool {
                farmer: PLAYER,
                location: "Forest".to_owned(),
                tile: Tile::new(0, 0),
                tool: Tool::axe(4),
            },
        );

        assert_eq!(
            events,
            vec![Event::ToolBounced {
                farmer: PLAYER,
                location: "Forest".to_owned(),
                tile: Tile::new(0, 0),
            }]
        );
    }

    #[test]
    fn messages_wait_for_delivery() {
        let mut world = World::new();
        let guest = FarmerId::new(2);
        for farmer in [PLAYER, guest] {
            let _ = run(
                &mut world,
                Command::AddFarmer {
                    farmer,
                    location: "Farm".to_owned(),
                    tile: Tile::new(0, farmer.get() as i32),
                    facing: Facing::Down,
                },
            );
        }
        assert_eq!(query::host_peer(&world), Some(PLAYER));

        let send = |recipient| Command::SendModMessage {
            message_type: "Ping".to_owned(),
            sender: guest,
            recipient,
            payload: vec![7],
        };
        assert!(run(&mut world, send(PLAYER)).is_empty());
        assert_eq!(
            run(&mut world, send(FarmerId::new(99))),
            vec![Event::ModMessageDropped {
                message_type: "Ping".to_owned(),
                recipient: FarmerId::new(99),
            }]
        );
        assert_eq!(query::pending_messages(&world, PLAYER), 1);

        let delivered = run(&mut world, Command::DeliverMessages { recipient: PLAYER });
        assert_eq!(
            delivered,
            vec![Event::ModMessageReceived {
                message_type: "Ping".to_owned(),
                sender: guest,
                payload: vec![7],
            }]
        );
        assert_eq!(query::pending_messages(&world, PLAYER), 0);
    }

    #[test]
    fn advancing_the_day_rolls_the_calendar() {
        let mut world = World::starting_on(SimDate::new(28, Season::Winter, 1));

        assert_eq!(
            run(&mut world, Command::AdvanceDay),
            vec![Event::DayStarted {
                date: SimDate::new(1, Season::Spring, 2),
            }]
        );
        assert_eq!(query::date(&world), SimDate::new(1, Season::Spring, 2));
    }

    #[test]
    fn farmer_traits_reflect_professions_and_stats() {
        let mut world = World::new();
        let _ = run(
            &mut world,
            Command::AddFarmer {
                farmer: PLAYER,
                location: "Farm".to_owned(),
                tile: Tile::new(0, 0),
                facing: Facing::Down,
            },
        );
        let _ = run(
            &mut world,
            Command::GrantProfession {
                farmer: PLAYER,
                profession: Profession::Forester,
            },
        );
        let _ = run(
            &mut world,
            Command::SetStat {
                farmer: PLAYER,
                stat: destroyable_bushes_core::WOODCUTTING_BOOK_STAT.to_owned(),
                value: 1,
            },
        );

        let traits = query::farmer_traits(&world, PLAYER).expect("farmer present");
        assert!(traits.forester);
        assert!(traits.read_woodcutting_book);
        assert_eq!(query::farmer_traits(&world, FarmerId::new(5)), None);
    }
}
