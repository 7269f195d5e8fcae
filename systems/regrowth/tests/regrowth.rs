use destroyable_bushes_core::{
    Command, DestroyedBush, Event, ModData, PlacementError, Season, SimDate, Tile,
};
use destroyable_bushes_system_regrowth::{RegrowthHost, RegrowthScheduler, RegrowthSummary};
use destroyable_bushes_world::{apply, procedure::VanillaHooks, query, World};

fn record(location: &str, x: i32, size: i32, offset: Option<i32>) -> DestroyedBush {
    DestroyedBush {
        location_name: location.to_owned(),
        tile: Tile::new(x, 4),
        size,
        town_bush: false,
        tile_sheet_offset: offset,
        date_destroyed: SimDate::new(1, Season::Spring, 1),
    }
}

struct WorldHost<'a>(&'a mut World);

impl RegrowthHost for WorldHost<'_> {
    fn footprint_free(&self, entry: &DestroyedBush) -> Result<bool, PlacementError> {
        query::is_footprint_free(self.0, &entry.location_name, entry.tile, entry.size)
    }

    fn place(&mut self, entry: &DestroyedBush) -> Result<(), PlacementError> {
        let mut placed = Vec::new();
        apply(
            self.0,
            Command::PlaceBush {
                location: entry.location_name.clone(),
                tile: entry.tile,
                size: entry.size,
                town_bush: entry.town_bush,
                tile_sheet_offset: entry.tile_sheet_offset,
            },
            &VanillaHooks,
            &mut placed,
        );
        match placed.as_slice() {
            [Event::BushPlaced { .. }] => Ok(()),
            [Event::BushPlacementRejected { reason, .. }] => Err(*reason),
            _ => Err(PlacementError::Occupied),
        }
    }
}

fn run_day(world: &mut World, data: &mut ModData, schedule: Option<&str>) -> RegrowthSummary {
    let mut events = Vec::new();
    apply(world, Command::AdvanceDay, &VanillaHooks, &mut events);

    RegrowthScheduler::new().handle(&events, schedule, data, &mut WorldHost(world))
}

#[test]
fn due_bushes_regrow_with_their_recorded_appearance() {
    let mut world = World::new();
    let mut data = ModData {
        destroyed_bushes: vec![record("Forest", 2, 2, Some(3)), record("Forest", 8, 4, Some(0))],
    };

    let summary = run_day(&mut world, &mut data, Some("1 day"));

    assert_eq!(summary, RegrowthSummary { regrown: 2, pending: 0 });
    let bushes = query::bushes(&world);
    assert_eq!(bushes.len(), 2);
    assert_eq!(bushes[0].tile, Tile::new(2, 4));
    assert_eq!(bushes[0].tile_sheet_offset, 3);
    assert_eq!(bushes[1].size, 4);
}

#[test]
fn obstructed_and_unknown_locations_stay_pending() {
    let mut world = World::new();
    let mut events = Vec::new();
    apply(
        &mut world,
        Command::PlaceObstruction {
            location: "Farm".to_owned(),
            tile: Tile::new(1, 4),
        },
        &VanillaHooks,
        &mut events,
    );
    let mut data = ModData {
        destroyed_bushes: vec![record("Farm", 0, 1, None), record("Atlantis", 0, 0, Some(0))],
    };

    let summary = run_day(&mut world, &mut data, Some("1 day"));
    assert_eq!(summary, RegrowthSummary { regrown: 0, pending: 2 });

    apply(
        &mut world,
        Command::ClearObstruction {
            location: "Farm".to_owned(),
            tile: Tile::new(1, 4),
        },
        &VanillaHooks,
        &mut events,
    );
    let summary = run_day(&mut world, &mut data, Some("1 day"));
    assert_eq!(summary, RegrowthSummary { regrown: 1, pending: 1 });
    assert_eq!(data.destroyed_bushes[0].location_name, "Atlantis");
}

#[test]
fn disabled_schedule_never_regrows() {
    let mut world = World::new();
    let mut data = ModData {
        destroyed_bushes: vec![record("Forest", 0, 0, Some(0))],
    };

    for _ in 0..120 {
        let summary = run_day(&mut world, &mut data, None);
        assert_eq!(summary.regrown, 0);
    }
    assert!(query::bushes(&world).is_empty());
}
