//! Console commands accepted by `run` scripts.
//!
//! `add_bush` and `remove_bush` follow the mod's in-game console commands;
//! `chop`, `sleep` and `list` drive the simulated host.

use destroyable_bushes_core::{
    footprint_width, BushSize, Command, Event, FarmerId, SimDate, Tile, Tool,
};
use destroyable_bushes_session::BushMod;
use destroyable_bushes_world::{query, World};
use thiserror::Error;

const ADD_BUSH_USAGE: &str =
    "add_bush <size> [bool townBush] [int tileSheetOffset] [int x int y] [string location]";
const REMOVE_BUSH_USAGE: &str = "remove_bush [x y] [location]";
const CHOP_USAGE: &str = "chop [x y]";
const SLEEP_USAGE: &str = "sleep [days]";
const LIST_USAGE: &str = "list";

/// A parsed script line.
#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) enum ConsoleCommand {
    /// Places a bush, in front of the player unless a tile is given.
    AddBush {
        size: i32,
        town_bush: bool,
        tile_sheet_offset: i32,
        tile: Option<Tile>,
        location: Option<String>,
    },
    /// Removes a bush without recording it for regrowth.
    RemoveBush {
        tile: Option<Tile>,
        location: Option<String>,
    },
    /// Swings the player's axe, at the tile in front of them by default.
    Chop { tile: Option<Tile> },
    /// Ends the given number of days.
    Sleep { days: u32 },
    /// Prints bushes and pending regrowth records.
    List,
}

/// Reasons a script line could not be parsed.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub(crate) enum ConsoleError {
    #[error("unknown command \"{0}\"")]
    UnknownCommand(String),
    #[error("invalid number of arguments; usage: {0}")]
    ArgumentCount(&'static str),
    #[error("\"{0}\" is not a recognized size value")]
    Size(String),
    #[error("\"{0}\" is not a recognized townBush value; it should be \"true\" or \"false\"")]
    TownBush(String),
    #[error("\"{0}\" is not a recognized tileSheetOffset value; it should be an integer")]
    TileSheetOffset(String),
    #[error("\"{0} {1}\" are not recognized x and y values; they should be integers")]
    Coordinates(String, String),
    #[error("\"{0}\" is not a recognized number of days")]
    Days(String),
}

/// Parses one script line; blank lines and `#` comments yield `None`.
pub(crate) fn parse_line(line: &str) -> Result<Option<ConsoleCommand>, ConsoleError> {
    let line = line.split('#').next().unwrap_or_default();
    let mut words = line.split_whitespace();
    let Some(name) = words.next() else {
        return Ok(None);
    };
    let args: Vec<&str> = words.collect();

    let command = match name.to_ascii_lowercase().as_str() {
        "add_bush" => parse_add_bush(&args)?,
        "remove_bush" => parse_remove_bush(&args)?,
        "chop" => match args.as_slice() {
            [] => ConsoleCommand::Chop { tile: None },
            [x, y] => ConsoleCommand::Chop {
                tile: Some(parse_tile(x, y)?),
            },
            _ => return Err(ConsoleError::ArgumentCount(CHOP_USAGE)),
        },
        "sleep" => match args.as_slice() {
            [] => ConsoleCommand::Sleep { days: 1 },
            [days] => ConsoleCommand::Sleep {
                days: days
                    .parse()
                    .map_err(|_| ConsoleError::Days((*days).to_owned()))?,
            },
            _ => return Err(ConsoleError::ArgumentCount(SLEEP_USAGE)),
        },
        "list" if args.is_empty() => ConsoleCommand::List,
        "list" => return Err(ConsoleError::ArgumentCount(LIST_USAGE)),
        _ => return Err(ConsoleError::UnknownCommand(name.to_owned())),
    };
    Ok(Some(command))
}

/// Parses a bush size given as a name or a number.
///
/// Any integer is accepted so that sizes unknown to this tool can still be
/// placed.
pub(crate) fn parse_bush_size(raw: &str) -> Option<i32> {
    let normalized = raw.trim().to_ascii_lowercase();
    let size = match normalized.as_str() {
        "s" | "small" => BushSize::Small,
        "m" | "med" | "medium" => BushSize::Medium,
        "l" | "large" => BushSize::Large,
        "t" | "green" | "greentea" | "greenteabush" | "tea" | "teabush" => BushSize::GreenTea,
        "w" | "walnut" => BushSize::Walnut,
        other => return other.parse().ok(),
    };
    Some(size.id())
}

fn parse_add_bush(args: &[&str]) -> Result<ConsoleCommand, ConsoleError> {
    if args.is_empty() || args.len() == 4 {
        return Err(ConsoleError::ArgumentCount(ADD_BUSH_USAGE));
    }

    let size = parse_bush_size(args[0]).ok_or_else(|| ConsoleError::Size(args[0].to_owned()))?;
    let town_bush = match args.get(1) {
        Some(raw) => raw
            .to_ascii_lowercase()
            .parse()
            .map_err(|_| ConsoleError::TownBush((*raw).to_owned()))?,
        None => false,
    };
    let tile_sheet_offset = match args.get(2) {
        Some(raw) => raw
            .parse()
            .map_err(|_| ConsoleError::TileSheetOffset((*raw).to_owned()))?,
        None => 0,
    };
    let tile = match (args.get(3), args.get(4)) {
        (Some(x), Some(y)) => Some(parse_tile(x, y)?),
        _ => None,
    };

    Ok(ConsoleCommand::AddBush {
        size,
        town_bush,
        tile_sheet_offset,
        tile,
        location: args.get(5).map(|name| (*name).to_owned()),
    })
}

fn parse_remove_bush(args: &[&str]) -> Result<ConsoleCommand, ConsoleError> {
    match args {
        [] => Ok(ConsoleCommand::RemoveBush {
            tile: None,
            location: None,
        }),
        [x, y] => Ok(ConsoleCommand::RemoveBush {
            tile: Some(parse_tile(x, y)?),
            location: None,
        }),
        [x, y, location] => Ok(ConsoleCommand::RemoveBush {
            tile: Some(parse_tile(x, y)?),
            location: Some((*location).to_owned()),
        }),
        _ => Err(ConsoleError::ArgumentCount(REMOVE_BUSH_USAGE)),
    }
}

fn parse_tile(x: &str, y: &str) -> Result<Tile, ConsoleError> {
    match (x.parse(), y.parse()) {
        (Ok(x), Ok(y)) => Ok(Tile::new(x, y)),
        _ => Err(ConsoleError::Coordinates(x.to_owned(), y.to_owned())),
    }
}

/// Formats a calendar date for console output.
pub(crate) fn describe_date(date: SimDate) -> String {
    format!("{} {:?}, year {}", date.day(), date.season(), date.year())
}

fn describe_size(size: i32) -> String {
    BushSize::from_id(size).map_or_else(|| format!("size {size}"), |size| size.name().to_owned())
}

/// A world, the mod running in it, and the player issuing commands.
#[derive(Debug)]
pub(crate) struct Console {
    world: World,
    session: BushMod,
    player: FarmerId,
    axe: Tool,
}

impl Console {
    pub(crate) fn new(world: World, session: BushMod, player: FarmerId, axe_level: i32) -> Self {
        Self {
            world,
            session,
            player,
            axe: Tool::axe(axe_level),
        }
    }

    pub(crate) fn session(&self) -> &BushMod {
        &self.session
    }

    /// Runs a command and returns the lines to show the user.
    pub(crate) fn run(&mut self, command: ConsoleCommand) -> Vec<String> {
        match command {
            ConsoleCommand::AddBush {
                size,
                town_bush,
                tile_sheet_offset,
                tile,
                location,
            } => self.add_bush(size, town_bush, tile_sheet_offset, tile, location),
            ConsoleCommand::RemoveBush { tile, location } => self.remove_bush(tile, location),
            ConsoleCommand::Chop { tile } => self.chop(tile),
            ConsoleCommand::Sleep { days } => self.sleep(days),
            ConsoleCommand::List => self.list(),
        }
    }

    fn resolve_location(&self, requested: Option<String>) -> Result<String, String> {
        match requested {
            Some(name) => query::location_names(&self.world)
                .into_iter()
                .find(|known| known.eq_ignore_ascii_case(&name))
                .map(str::to_owned)
                .ok_or_else(|| format!("No location named \"{name}\" could be found.")),
            None => query::farmer_position(&self.world, self.player)
                .map(|position| position.location)
                .ok_or_else(|| "The player is not in any location.".to_owned()),
        }
    }

    fn add_bush(
        &mut self,
        size: i32,
        town_bush: bool,
        tile_sheet_offset: i32,
        tile: Option<Tile>,
        location: Option<String>,
    ) -> Vec<String> {
        let location = match self.resolve_location(location) {
            Ok(location) => location,
            Err(message) => return vec![message],
        };
        let tile = match tile {
            Some(tile) => tile,
            None => match query::farmer_position(&self.world, self.player) {
                Some(position) => {
                    let width = i64::from(footprint_width(size));
                    let player = i64::from(position.tile.x());
                    let mut origin = position.tile;
                    while origin.y() == position.tile.y()
                        && (i64::from(origin.x())..i64::from(origin.x()) + width).contains(&player)
                    {
                        let next = origin.step(position.facing);
                        if next == origin {
                            return vec![
                                "There is no room for a bush in front of the player.".to_owned()
                            ];
                        }
                        origin = next;
                    }
                    origin
                }
                None => return vec!["The player is not in any location.".to_owned()],
            },
        };

        let events = self.session.execute(
            &mut self.world,
            Command::PlaceBush {
                location: location.clone(),
                tile,
                size,
                town_bush,
                tile_sheet_offset: Some(tile_sheet_offset),
            },
        );
        events
            .iter()
            .filter_map(|event| match event {
                Event::BushPlaced { tile, size, .. } => Some(format!(
                    "Added {} bush at {location} ({}, {}).",
                    describe_size(*size),
                    tile.x(),
                    tile.y()
                )),
                Event::BushPlacementRejected { reason, .. } => Some(format!(
                    "Could not add a bush at {location} ({}, {}): {reason:?}.",
                    tile.x(),
                    tile.y()
                )),
                _ => None,
            })
            .collect()
    }

    fn remove_bush(&mut self, tile: Option<Tile>, location: Option<String>) -> Vec<String> {
        let location = match self.resolve_location(location) {
            Ok(location) => location,
            Err(message) => return vec![message],
        };
        let candidates = match tile {
            Some(tile) => vec![tile],
            None => match query::farmer_position(&self.world, self.player) {
                Some(position) => vec![position.tile, position.tile.step(position.facing)],
                None => return vec!["The player is not in any location.".to_owned()],
            },
        };

        for candidate in &candidates {
            let events = self.session.execute(
                &mut self.world,
                Command::RemoveBush {
                    location: location.clone(),
                    tile: *candidate,
                },
            );
            if let Some(Event::BushRemoved { tile, size, .. }) = events.first() {
                return vec![format!(
                    "Removed {} bush at {location} ({}, {}).",
                    describe_size(*size),
                    tile.x(),
                    tile.y()
                )];
            }
        }
        vec![format!("No bush found to remove at {location}.")]
    }

    fn chop(&mut self, tile: Option<Tile>) -> Vec<String> {
        let Some(position) = query::farmer_position(&self.world, self.player) else {
            return vec!["The player is not in any location.".to_owned()];
        };
        let target = tile.unwrap_or_else(|| position.tile.step(position.facing));

        let events = self.session.execute(
            &mut self.world,
            Command::UseTool {
                farmer: self.player,
                location: position.location,
                tile: target,
                tool: self.axe,
            },
        );
        let lines: Vec<String> = events
            .iter()
            .filter_map(|event| match event {
                Event::BushDestroyed { tile, size, .. } => Some(format!(
                    "Destroyed {} bush at ({}, {}).",
                    describe_size(*size),
                    tile.x(),
                    tile.y()
                )),
                Event::BushStruck { health, .. } => Some(format!("Hit the bush; health {health:.3}.")),
                Event::ToolBounced { .. } => Some("The axe bounced off the bush.".to_owned()),
                Event::DebrisDropped { count, .. } => Some(format!("Dropped {count} wood.")),
                Event::ExperienceGained { amount, .. } => {
                    Some(format!("Gained {amount} foraging experience."))
                }
                _ => None,
            })
            .collect();
        if lines.is_empty() {
            vec![format!("Nothing to chop at ({}, {}).", target.x(), target.y())]
        } else {
            lines
        }
    }

    fn sleep(&mut self, days: u32) -> Vec<String> {
        let before = self.session.data().destroyed_bushes.len();
        for _ in 0..days {
            let _ = self.session.execute(&mut self.world, Command::AdvanceDay);
        }
        let after = self.session.data().destroyed_bushes.len();
        vec![format!(
            "Woke up on {}; {} bush(es) regrew, {after} waiting.",
            describe_date(query::date(&self.world)),
            before.saturating_sub(after)
        )]
    }

    fn list(&self) -> Vec<String> {
        let mut lines = vec![format!("Today is {}.", describe_date(query::date(&self.world)))];
        for bush in query::bushes(&self.world) {
            lines.push(format!(
                "{} bush at {} ({}, {}), health {:.3}, offset {}{}",
                describe_size(bush.size),
                bush.location,
                bush.tile.x(),
                bush.tile.y(),
                bush.health,
                bush.tile_sheet_offset,
                if bush.town_bush { ", town" } else { "" }
            ));
        }
        for record in &self.session.data().destroyed_bushes {
            lines.push(format!(
                "Destroyed {} bush at {} ({}, {}) on {}",
                describe_size(record.size),
                record.location_name,
                record.tile.x(),
                record.tile.y(),
                describe_date(record.date_destroyed)
            ));
        }
        lines
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use destroyable_bushes_core::{Facing, ModConfig, Season};
    use destroyable_bushes_session::SessionRole;
    use destroyable_bushes_world::{apply, procedure::VanillaHooks};

    const PLAYER: FarmerId = FarmerId::new(1);

    fn console(facing: Facing) -> Console {
        console_at(Tile::new(10, 10), facing)
    }

    fn console_at(tile: Tile, facing: Facing) -> Console {
        let mut world = World::starting_on(SimDate::new(1, Season::Summer, 1));
        let mut events = Vec::new();
        apply(
            &mut world,
            Command::AddFarmer {
                farmer: PLAYER,
                location: "Farm".to_owned(),
                tile,
                facing,
            },
            &VanillaHooks,
            &mut events,
        );
        let mut session = BushMod::new(ModConfig::default(), SessionRole::Authoritative, PLAYER, 3);
        let _ = session.on_host_startup(&mut world);
        Console::new(world, session, PLAYER, 4)
    }

    #[test]
    fn sizes_accept_names_and_numbers() {
        assert_eq!(parse_bush_size("2"), Some(2));
        assert_eq!(parse_bush_size(" Large "), Some(2));
        assert_eq!(parse_bush_size("med"), Some(1));
        assert_eq!(parse_bush_size("TeaBush"), Some(3));
        assert_eq!(parse_bush_size("w"), Some(4));
        assert_eq!(parse_bush_size("17"), Some(17));
        assert_eq!(parse_bush_size("-1"), Some(-1));
        assert_eq!(parse_bush_size("huge"), None);
    }

    #[test]
    fn add_bush_arguments_follow_the_usage() {
        assert_eq!(
            parse_line("add_bush 2 false 0 64 19 farm"),
            Ok(Some(ConsoleCommand::AddBush {
                size: 2,
                town_bush: false,
                tile_sheet_offset: 0,
                tile: Some(Tile::new(64, 19)),
                location: Some("farm".to_owned()),
            }))
        );
        assert_eq!(
            parse_line("add_bush walnut True"),
            Ok(Some(ConsoleCommand::AddBush {
                size: 4,
                town_bush: true,
                tile_sheet_offset: 0,
                tile: None,
                location: None,
            }))
        );
        assert_eq!(
            parse_line("add_bush"),
            Err(ConsoleError::ArgumentCount(ADD_BUSH_USAGE))
        );
        assert_eq!(
            parse_line("add_bush 2 false 0 64"),
            Err(ConsoleError::ArgumentCount(ADD_BUSH_USAGE))
        );
        assert_eq!(
            parse_line("add_bush 2 maybe"),
            Err(ConsoleError::TownBush("maybe".to_owned()))
        );
        assert_eq!(
            parse_line("add_bush 2 false x"),
            Err(ConsoleError::TileSheetOffset("x".to_owned()))
        );
        assert_eq!(
            parse_line("add_bush 2 false 0 a 19"),
            Err(ConsoleError::Coordinates("a".to_owned(), "19".to_owned()))
        );
    }

    #[test]
    fn comments_and_blank_lines_are_skipped() {
        assert_eq!(parse_line("   "), Ok(None));
        assert_eq!(parse_line("# setup"), Ok(None));
        assert_eq!(parse_line("sleep 3 # a few days"), Ok(Some(ConsoleCommand::Sleep { days: 3 })));
        assert_eq!(
            parse_line("remove_bush 4"),
            Err(ConsoleError::ArgumentCount(REMOVE_BUSH_USAGE))
        );
        assert_eq!(parse_line("dance"), Err(ConsoleError::UnknownCommand("dance".to_owned())));
    }

    #[test]
    fn bushes_added_at_the_player_are_nudged_out_of_the_way() {
        let mut right = console(Facing::Right);
        let _ = right.run(ConsoleCommand::AddBush {
            size: 2,
            town_bush: false,
            tile_sheet_offset: 0,
            tile: None,
            location: None,
        });
        assert!(query::bush_at(&right.world, "Farm", Tile::new(11, 10)).is_some());

        let mut left = console(Facing::Left);
        let _ = left.run(ConsoleCommand::AddBush {
            size: 2,
            town_bush: false,
            tile_sheet_offset: 0,
            tile: None,
            location: None,
        });
        assert!(query::bush_at(&left.world, "Farm", Tile::new(7, 10)).is_some());

        let mut up = console(Facing::Up);
        let _ = up.run(ConsoleCommand::AddBush {
            size: 1,
            town_bush: true,
            tile_sheet_offset: 1,
            tile: None,
            location: Some("FARM".to_owned()),
        });
        let bush = query::bush_at(&up.world, "Farm", Tile::new(10, 9)).expect("bush above player");
        assert!(bush.town_bush);
        assert_eq!(bush.tile_sheet_offset, 1);
    }

    #[test]
    fn commands_at_the_edge_of_the_map_do_not_overflow() {
        let mut console = console_at(Tile::new(i32::MAX, 0), Facing::Right);
        let lines = console.run(ConsoleCommand::AddBush {
            size: 2,
            town_bush: false,
            tile_sheet_offset: 0,
            tile: None,
            location: None,
        });
        assert_eq!(
            lines,
            vec!["There is no room for a bush in front of the player.".to_owned()]
        );

        let lines = console.run(ConsoleCommand::AddBush {
            size: 2,
            town_bush: false,
            tile_sheet_offset: 0,
            tile: Some(Tile::new(i32::MAX, 0)),
            location: None,
        });
        assert_eq!(
            lines,
            vec![format!("Could not add a bush at Farm ({}, 0): Occupied.", i32::MAX)]
        );

        let command = parse_line("remove_bush -2147483648 0").expect("parses");
        let lines = console.run(command.expect("a command"));
        assert_eq!(lines, vec!["No bush found to remove at Farm.".to_owned()]);
        assert!(query::bushes(&console.world).is_empty());
    }

    #[test]
    fn removed_bushes_leave_no_record() {
        let mut console = console(Facing::Down);
        let _ = console.run(ConsoleCommand::AddBush {
            size: 0,
            town_bush: false,
            tile_sheet_offset: 0,
            tile: None,
            location: None,
        });
        let lines = console.run(ConsoleCommand::RemoveBush {
            tile: None,
            location: None,
        });

        assert_eq!(lines, vec!["Removed small bush at Farm (10, 11).".to_owned()]);
        assert!(query::bushes(&console.world).is_empty());
        assert!(console.session().data().destroyed_bushes.is_empty());
    }

    #[test]
    fn unknown_locations_are_reported() {
        let mut console = console(Facing::Down);
        let lines = console.run(ConsoleCommand::AddBush {
            size: 0,
            town_bush: false,
            tile_sheet_offset: 0,
            tile: Some(Tile::new(1, 1)),
            location: Some("Atlantis".to_owned()),
        });

        assert_eq!(lines, vec!["No location named \"Atlantis\" could be found.".to_owned()]);
    }

    #[test]
    fn chopped_bushes_regrow_after_sleeping() {
        let mut console = console(Facing::Down);
        let _ = console.run(ConsoleCommand::AddBush {
            size: 2,
            town_bush: false,
            tile_sheet_offset: 0,
            tile: None,
            location: None,
        });

        let mut destroyed = false;
        for _ in 0..32 {
            let lines = console.run(ConsoleCommand::Chop { tile: None });
            if lines.iter().any(|line| line.starts_with("Destroyed")) {
                destroyed = true;
                break;
            }
        }
        assert!(destroyed);
        assert_eq!(console.session().data().destroyed_bushes.len(), 1);

        let lines = console.run(ConsoleCommand::Sleep { days: 4 });
        assert_eq!(
            lines,
            vec!["Woke up on 5 Summer, year 1; 1 bush(es) regrew, 0 waiting.".to_owned()]
        );
        assert!(query::bush_at(&console.world, "Farm", Tile::new(10, 11)).is_some());
    }
}
