#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Core contracts shared across the Destroyable Bushes workspace.
//!
//! This crate defines the message surface that connects the host world, the
//! pure bush systems, and the session that owns the mod's state. Callers
//! submit [`Command`] values describing desired host mutations, the world
//! executes those commands via its `apply` entry point, and then broadcasts
//! [`Event`] values the systems react to. Systems consume event streams,
//! query immutable host state, and respond with new command batches.

pub mod calendar;
pub mod config;
pub mod procedure;
pub mod record;

use serde::{Deserialize, Serialize};

pub use calendar::{regrow_date, Season, SimDate, DAYS_PER_SEASON, SEASONS_PER_YEAR};
pub use config::{ConfigError, ModConfig};
pub use procedure::{Arg, CodeInstruction, Field, Label, Method, OpCode};
pub use record::{DestroyedBush, ModData};

/// Message type used when a replica forwards a destroyed bush to the host.
pub const DESTROYED_BUSH_MESSAGE: &str = "DestroyedBush";

/// Health at or below which the host destroys a bush.
pub const BUSH_DESTROYED_HEALTH: f32 = -1.0;

/// Name of the host statistic recording that a farmer read the woodcutting book.
pub const WOODCUTTING_BOOK_STAT: &str = "Book_Woodcutting";

/// Bush categories known to the host, keyed by the host's integer size id.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum BushSize {
    /// One-tile decorative bush.
    Small,
    /// Two-tile bush; the non-town variant grows berries.
    Medium,
    /// Three-tile bush.
    Large,
    /// Farmable green tea bush.
    GreenTea,
    /// Island bush that hides a golden walnut.
    Walnut,
}

impl BushSize {
    /// Every known size in host id order.
    pub const ALL: [BushSize; 5] = [
        BushSize::Small,
        BushSize::Medium,
        BushSize::Large,
        BushSize::GreenTea,
        BushSize::Walnut,
    ];

    /// Resolves a host size id, returning `None` for categories this crate does not know.
    #[must_use]
    pub const fn from_id(id: i32) -> Option<Self> {
        match id {
            0 => Some(Self::Small),
            1 => Some(Self::Medium),
            2 => Some(Self::Large),
            3 => Some(Self::GreenTea),
            4 => Some(Self::Walnut),
            _ => None,
        }
    }

    /// Host integer id of the size.
    #[must_use]
    pub const fn id(self) -> i32 {
        match self {
            Self::Small => 0,
            Self::Medium => 1,
            Self::Large => 2,
            Self::GreenTea => 3,
            Self::Walnut => 4,
        }
    }

    /// Lowercase display name used by logs and console output.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Small => "small",
            Self::Medium => "medium",
            Self::Large => "large",
            Self::GreenTea => "green tea",
            Self::Walnut => "walnut",
        }
    }
}

/// Width in tiles of a bush with the provided host size id.
///
/// Unknown sizes occupy a single tile.
#[must_use]
pub const fn footprint_width(size: i32) -> i32 {
    match BushSize::from_id(size) {
        Some(BushSize::Medium) => 2,
        Some(BushSize::Large) => 3,
        _ => 1,
    }
}

/// Tile position inside a location.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Tile {
    x: i32,
    y: i32,
}

impl Tile {
    /// Creates a new tile coordinate.
    #[must_use]
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    /// Horizontal tile index.
    #[must_use]
    pub const fn x(&self) -> i32 {
        self.x
    }

    /// Vertical tile index.
    #[must_use]
    pub const fn y(&self) -> i32 {
        self.y
    }

    /// Returns the neighbouring tile in the provided direction.
    ///
    /// Tiles on the edge of the coordinate space step onto themselves.
    #[must_use]
    pub const fn step(self, facing: Facing) -> Self {
        match facing {
            Facing::Up => Self::new(self.x, self.y.saturating_sub(1)),
            Facing::Right => Self::new(self.x.saturating_add(1), self.y),
            Facing::Down => Self::new(self.x, self.y.saturating_add(1)),
            Facing::Left => Self::new(self.x.saturating_sub(1), self.y),
        }
    }
}

/// Unique multiplayer identifier of a farmer; doubles as the peer id for messages.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct FarmerId(u64);

impl FarmerId {
    /// Creates a new farmer identifier.
    #[must_use]
    pub const fn new(value: u64) -> Self {
        Self(value)
    }

    /// Retrieves the numeric representation of the identifier.
    #[must_use]
    pub const fn get(&self) -> u64 {
        self.0
    }
}

/// Direction a farmer is facing.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Facing {
    /// Toward decreasing y.
    Up,
    /// Toward increasing x.
    Right,
    /// Toward increasing y.
    Down,
    /// Toward decreasing x.
    Left,
}

/// Tools a farmer can swing at terrain features.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ToolKind {
    /// Chops trees and bushes.
    Axe,
    /// Breaks rocks; bushes ignore it.
    Pickaxe,
}

/// A tool swing carrying the tool's upgrade tier.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Tool {
    /// Kind of tool being used.
    pub kind: ToolKind,
    /// Number of upgrades applied to the tool; 0 is the starter tool.
    pub upgrade_level: i32,
}

impl Tool {
    /// Creates an axe with the provided upgrade tier.
    #[must_use]
    pub const fn axe(upgrade_level: i32) -> Self {
        Self {
            kind: ToolKind::Axe,
            upgrade_level,
        }
    }
}

/// Professions that modify bush rewards.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Profession {
    /// Grants 25% more wood.
    Forester,
    /// Foraging profession with no effect on bushes.
    Gatherer,
}

/// Skills that can receive experience.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Skill {
    /// Foraging skill, rewarded for clearing bushes.
    Foraging,
}

/// Debris the host can scatter around a tile.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DebrisKind {
    /// Pieces of wood.
    Wood,
}

/// Farmer attributes that influence destruction rewards.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct FarmerTraits {
    /// Whether the farmer holds the Forester profession.
    pub forester: bool,
    /// Whether the farmer has read the woodcutting book.
    pub read_woodcutting_book: bool,
}

/// Read-only view of the bush a strike procedure is running on.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct StruckBush<'a> {
    /// Name of the location containing the bush.
    pub location: &'a str,
    /// Leftmost tile of the bush footprint.
    pub tile: Tile,
    /// Host size id.
    pub size: i32,
    /// Current health; 0 until the first damaging strike.
    pub health: f32,
    /// Whether the bush uses the town sprite.
    pub town_bush: bool,
}

impl StruckBush<'_> {
    /// Known size of the bush, if any.
    #[must_use]
    pub const fn bush_size(&self) -> Option<BushSize> {
        BushSize::from_id(self.size)
    }
}

/// Extension points the host's strike procedure calls into.
///
/// The host always routes its own destructibility verdict through
/// [`StrikeHooks::is_destroyable`]. The other two hooks are only reached
/// once the procedure has been rewritten to call them.
pub trait StrikeHooks {
    /// Final destructibility verdict given the host's own answer.
    fn is_destroyable(&self, bush: &StruckBush<'_>, vanilla: bool) -> bool;

    /// Axe upgrades required before a strike damages the bush.
    fn required_upgrade_tier(&self) -> i32;

    /// Adjusts the raw damage a strike deals to the bush.
    fn adjust_damage(&self, raw: f32, bush: &StruckBush<'_>) -> f32;
}

/// Commands that express all permissible host mutations.
#[derive(Clone, Debug, PartialEq)]
pub enum Command {
    /// Adds a farmer (and therefore a multiplayer peer) to the world.
    AddFarmer {
        /// Identifier assigned to the farmer.
        farmer: FarmerId,
        /// Location the farmer starts in.
        location: String,
        /// Tile the farmer stands on.
        tile: Tile,
        /// Direction the farmer faces.
        facing: Facing,
    },
    /// Grants a profession to an existing farmer.
    GrantProfession {
        /// Farmer receiving the profession.
        farmer: FarmerId,
        /// Profession to grant.
        profession: Profession,
    },
    /// Overwrites one of a farmer's statistics.
    SetStat {
        /// Farmer whose statistic changes.
        farmer: FarmerId,
        /// Statistic name.
        stat: String,
        /// New value.
        value: u32,
    },
    /// Places a new bush anchored at the provided tile.
    PlaceBush {
        /// Name of the target location.
        location: String,
        /// Leftmost tile of the bush footprint.
        tile: Tile,
        /// Host size id.
        size: i32,
        /// Whether the bush uses the town sprite.
        town_bush: bool,
        /// Forced tile-sheet offset; `None` lets the host pick.
        tile_sheet_offset: Option<i32>,
    },
    /// Removes the bush covering the provided tile without side effects.
    RemoveBush {
        /// Name of the target location.
        location: String,
        /// Any tile covered by the bush.
        tile: Tile,
    },
    /// Blocks a tile with a non-bush object.
    PlaceObstruction {
        /// Name of the target location.
        location: String,
        /// Tile to block.
        tile: Tile,
    },
    /// Clears a previously placed obstruction.
    ClearObstruction {
        /// Name of the target location.
        location: String,
        /// Tile to clear.
        tile: Tile,
    },
    /// Swings a tool at a tile.
    UseTool {
        /// Farmer swinging the tool.
        farmer: FarmerId,
        /// Location of the swing.
        location: String,
        /// Tile being hit.
        tile: Tile,
        /// Tool being swung.
        tool: Tool,
    },
    /// Scatters debris around a tile.
    DropDebris {
        /// Name of the target location.
        location: String,
        /// Tile the debris originates from.
        tile: Tile,
        /// Kind of debris.
        kind: DebrisKind,
        /// Number of pieces.
        count: u32,
    },
    /// Grants skill experience to a farmer.
    GainExperience {
        /// Farmer receiving the experience.
        farmer: FarmerId,
        /// Skill that gains experience.
        skill: Skill,
        /// Amount of experience.
        amount: u32,
    },
    /// Sends a fire-and-forget mod message to another peer.
    SendModMessage {
        /// Message type used by the receiver to route the payload.
        message_type: String,
        /// Peer sending the message.
        sender: FarmerId,
        /// Peer that should receive the message.
        recipient: FarmerId,
        /// Encoded message body.
        payload: Vec<u8>,
    },
    /// Delivers every queued message addressed to the provided peer.
    DeliverMessages {
        /// Peer whose inbox is drained.
        recipient: FarmerId,
    },
    /// Ends the current day and starts the next one.
    AdvanceDay,
    /// Replaces the listing the host runs when a tool strikes a bush.
    InstallStrikeProcedure {
        /// Instructions to run from now on.
        listing: Vec<CodeInstruction>,
    },
}

/// Events broadcast by the world after processing commands.
#[derive(Clone, Debug, PartialEq)]
pub enum Event {
    /// Confirms that a farmer joined the world.
    FarmerJoined {
        /// Identifier of the new farmer.
        farmer: FarmerId,
    },
    /// Confirms that a bush was placed.
    BushPlaced {
        /// Location containing the bush.
        location: String,
        /// Leftmost tile of the bush.
        tile: Tile,
        /// Host size id.
        size: i32,
    },
    /// Reports that a bush placement request was rejected.
    BushPlacementRejected {
        /// Location named in the request.
        location: String,
        /// Tile named in the request.
        tile: Tile,
        /// Specific reason the placement failed.
        reason: PlacementError,
    },
    /// Confirms that a bush was removed without being destroyed.
    BushRemoved {
        /// Location that contained the bush.
        location: String,
        /// Leftmost tile of the removed bush.
        tile: Tile,
        /// Host size id.
        size: i32,
    },
    /// Reports that a bush removal request was rejected.
    BushRemovalRejected {
        /// Location named in the request.
        location: String,
        /// Tile named in the request.
        tile: Tile,
        /// Specific reason the removal failed.
        reason: RemovalError,
    },
    /// Reports a tool swing that hit a bush without damaging it.
    ToolBounced {
        /// Farmer swinging the tool.
        farmer: FarmerId,
        /// Location of the bush.
        location: String,
        /// Leftmost tile of the bush.
        tile: Tile,
    },
    /// Reports a tool swing that damaged a bush without destroying it.
    BushStruck {
        /// Farmer swinging the tool.
        farmer: FarmerId,
        /// Location of the bush.
        location: String,
        /// Leftmost tile of the bush.
        tile: Tile,
        /// Health left after the strike.
        health: f32,
    },
    /// Announces that the host destroyed a bush.
    BushDestroyed {
        /// Farmer that destroyed the bush, when known.
        farmer: Option<FarmerId>,
        /// Location that contained the bush.
        location: String,
        /// Leftmost tile of the destroyed bush.
        tile: Tile,
        /// Tile the destroying tool hit.
        struck_tile: Tile,
        /// Host size id.
        size: i32,
        /// Whether the bush used the town sprite.
        town_bush: bool,
        /// Tile-sheet offset the bush had when destroyed.
        tile_sheet_offset: i32,
    },
    /// Confirms that debris was scattered.
    DebrisDropped {
        /// Location receiving the debris.
        location: String,
        /// Tile the debris originates from.
        tile: Tile,
        /// Kind of debris.
        kind: DebrisKind,
        /// Number of pieces.
        count: u32,
    },
    /// Confirms that a farmer gained experience.
    ExperienceGained {
        /// Farmer receiving the experience.
        farmer: FarmerId,
        /// Skill that gained experience.
        skill: Skill,
        /// Amount of experience.
        amount: u32,
    },
    /// Reports that a mod message could not be queued.
    ModMessageDropped {
        /// Message type of the dropped message.
        message_type: String,
        /// Peer the message was addressed to.
        recipient: FarmerId,
    },
    /// Delivers a mod message to its recipient.
    ModMessageReceived {
        /// Message type used to route the payload.
        message_type: String,
        /// Peer that sent the message.
        sender: FarmerId,
        /// Encoded message body.
        payload: Vec<u8>,
    },
    /// Announces the start of a new day.
    DayStarted {
        /// Date of the day that just started.
        date: SimDate,
    },
}

/// Reasons a bush placement request may be rejected by the world.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PlacementError {
    /// No location with the requested name exists.
    UnknownLocation,
    /// The requested footprint overlaps an occupied tile.
    Occupied,
}

/// Reasons a bush removal request may be rejected by the world.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RemovalError {
    /// No location with the requested name exists.
    UnknownLocation,
    /// No bush covers the requested tile.
    MissingBush,
}
