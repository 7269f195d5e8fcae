//! Location state: bushes keyed by their origin tile plus blocking objects.

use std::collections::{BTreeMap, BTreeSet};

use destroyable_bushes_core::{footprint_width, BushSize, Season, SimDate, StruckBush, Tile};

const MAX_FOOTPRINT_WIDTH: i32 = 3;

/// Snapshot of a bush stored inside a location.
#[derive(Clone, Debug, PartialEq)]
pub(crate) struct BushState {
    /// Host size id; never changes after placement.
    pub(crate) size: i32,
    /// Health; 0 until struck, destroyed at or below -1.
    pub(crate) health: f32,
    /// Whether the bush uses the town sprite.
    pub(crate) town_bush: bool,
    /// Secondary sprite offset.
    pub(crate) tile_sheet_offset: i32,
}

impl BushState {
    pub(crate) fn new(size: i32, town_bush: bool, tile_sheet_offset: i32) -> Self {
        Self {
            size,
            health: 0.0,
            town_bush,
            tile_sheet_offset,
        }
    }

    pub(crate) fn view<'a>(&self, location: &'a str, origin: Tile) -> StruckBush<'a> {
        StruckBush {
            location,
            tile: origin,
            size: self.size,
            health: self.health,
            town_bush: self.town_bush,
        }
    }
}

/// Named area holding bushes and the objects that can block them.
#[derive(Debug, Default)]
pub(crate) struct Location {
    bushes: BTreeMap<Tile, BushState>,
    obstructions: BTreeSet<Tile>,
}

impl Location {
    pub(crate) fn bushes(&self) -> impl Iterator<Item = (Tile, &BushState)> {
        self.bushes.iter().map(|(tile, bush)| (*tile, bush))
    }

    /// Origin of the bush whose footprint covers the tile.
    pub(crate) fn bush_covering(&self, tile: Tile) -> Option<Tile> {
        (0..MAX_FOOTPRINT_WIDTH)
            .filter_map(|dx| tile.x().checked_sub(dx).map(|x| Tile::new(x, tile.y())))
            .find(|origin| {
                self.bushes
                    .get(origin)
                    .is_some_and(|bush| covers(*origin, bush.size, tile))
            })
    }

    pub(crate) fn bush_mut(&mut self, origin: Tile) -> Option<&mut BushState> {
        self.bushes.get_mut(&origin)
    }

    pub(crate) fn insert_bush(&mut self, origin: Tile, bush: BushState) {
        let _ = self.bushes.insert(origin, bush);
    }

    pub(crate) fn remove_bush(&mut self, origin: Tile) -> Option<BushState> {
        self.bushes.remove(&origin)
    }

    pub(crate) fn block(&mut self, tile: Tile) {
        let _ = self.obstructions.insert(tile);
    }

    pub(crate) fn unblock(&mut self, tile: Tile) {
        let _ = self.obstructions.remove(&tile);
    }

    /// Reports whether no bush or object occupies any tile of the footprint.
    ///
    /// A footprint running past the edge of the coordinate space never fits.
    pub(crate) fn footprint_is_clear(&self, origin: Tile, size: i32) -> bool {
        origin.x().checked_add(footprint_width(size) - 1).is_some()
            && footprint(origin, size).all(|tile| !self.obstructions.contains(&tile) && self.bush_covering(tile).is_none())
    }
}

/// Tiles covered by a bush of the provided size anchored at `origin`.
pub(crate) fn footprint(origin: Tile, size: i32) -> impl Iterator<Item = Tile> {
    (0..footprint_width(size))
        .map_while(move |dx| origin.x().checked_add(dx).map(|x| Tile::new(x, origin.y())))
}

fn covers(origin: Tile, size: i32, tile: Tile) -> bool {
    let end = i64::from(origin.x()) + i64::from(footprint_width(size));
    tile.y() == origin.y() && tile.x() >= origin.x() && i64::from(tile.x()) < end
}

/// Offset the host picks when placement does not force one.
///
/// Wild medium bushes show berries during the two foraging windows.
pub(crate) fn default_tile_sheet_offset(size: i32, town_bush: bool, date: SimDate) -> i32 {
    if BushSize::from_id(size) != Some(BushSize::Medium) || town_bush {
        return 0;
    }
    let in_season = match date.season() {
        Season::Spring => (15..=18).contains(&date.day()),
        Season::Fall => (8..=11).contains(&date.day()),
        Season::Summer | Season::Winter => false,
    };
    i32::from(in_season)
}
