//! Save-scoped records of destroyed bushes.

use serde::{Deserialize, Serialize};

use crate::{footprint_width, BushSize, SimDate, Tile};

/// A destroyed bush waiting to regrow.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DestroyedBush {
    /// Name of the location that contained the bush.
    pub location_name: String,
    /// Leftmost tile of the bush footprint.
    pub tile: Tile,
    /// Host size id.
    pub size: i32,
    /// Whether the bush used the town sprite.
    pub town_bush: bool,
    /// Tile-sheet offset forced on regrowth; `None` lets the host choose.
    pub tile_sheet_offset: Option<i32>,
    /// Date the bush was destroyed.
    pub date_destroyed: SimDate,
}

impl DestroyedBush {
    /// Known size of the recorded bush, if any.
    #[must_use]
    pub const fn bush_size(&self) -> Option<BushSize> {
        BushSize::from_id(self.size)
    }

    /// Width in tiles of the bush that will regrow.
    #[must_use]
    pub const fn footprint_width(&self) -> i32 {
        footprint_width(self.size)
    }
}

/// Mod data stored inside the player's save.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ModData {
    /// Destroyed bushes that have not regrown yet.
    pub destroyed_bushes: Vec<DestroyedBush>,
}
