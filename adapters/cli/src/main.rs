#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Command-line adapter that runs Destroyable Bushes against a simulated host.

mod console;

use std::{
    fs,
    io::{self, Read},
    path::{Path, PathBuf},
    sync::Once,
};

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand, ValueEnum};
use destroyable_bushes_core::{Command, Facing, FarmerId, ModConfig, Season, SimDate, Tile};
use destroyable_bushes_session::{BushMod, SessionRole};
use destroyable_bushes_world::{apply, World};
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

use crate::console::{describe_date, parse_line, Console};

const PLAYER: FarmerId = FarmerId::new(1);

/// Destroyable Bushes console.
#[derive(Debug, Parser)]
#[command(name = "destroyable-bushes", version, about)]
struct Cli {
    /// Raises log verbosity; repeat for more detail. `RUST_LOG` takes precedence.
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,
    #[command(subcommand)]
    command: CliCommand,
}

#[derive(Debug, Subcommand)]
enum CliCommand {
    /// Runs a console script against a fresh world.
    Run(RunArgs),
    /// Loads the configuration and prints the effective settings.
    CheckConfig(CheckConfigArgs),
}

#[derive(Debug, Args)]
struct RunArgs {
    /// Script with one console command per line; `-` reads standard input.
    #[arg(long)]
    script: PathBuf,
    /// Configuration file; defaults apply when absent.
    #[arg(long)]
    config: Option<PathBuf>,
    /// Save data file, read before the script and written afterwards.
    #[arg(long)]
    save: Option<PathBuf>,
    /// Seed for reward rolls; random when omitted.
    #[arg(long)]
    seed: Option<u64>,
    /// Upgrade level of the player's axe.
    #[arg(long, default_value_t = 0)]
    axe_level: i32,
    /// Location the player starts in.
    #[arg(long, default_value = "Farm")]
    location: String,
    /// Horizontal tile the player starts on.
    #[arg(long, default_value_t = 0, allow_hyphen_values = true)]
    x: i32,
    /// Vertical tile the player starts on.
    #[arg(long, default_value_t = 0, allow_hyphen_values = true)]
    y: i32,
    /// Direction the player faces.
    #[arg(long, value_enum, default_value_t = FacingArg::Down)]
    facing: FacingArg,
    /// Day of the season the world starts on.
    #[arg(long, default_value_t = 1)]
    day: u32,
    /// Season the world starts in.
    #[arg(long, value_enum, default_value_t = SeasonArg::Spring)]
    season: SeasonArg,
    /// Year the world starts in.
    #[arg(long, default_value_t = 1)]
    year: u32,
}

#[derive(Debug, Args)]
struct CheckConfigArgs {
    /// Configuration file to check.
    #[arg(long)]
    config: PathBuf,
    /// Writes the default configuration when the file does not exist.
    #[arg(long)]
    write_default: bool,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum FacingArg {
    Up,
    Right,
    Down,
    Left,
}

impl From<FacingArg> for Facing {
    fn from(value: FacingArg) -> Self {
        match value {
            FacingArg::Up => Facing::Up,
            FacingArg::Right => Facing::Right,
            FacingArg::Down => Facing::Down,
            FacingArg::Left => Facing::Left,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum SeasonArg {
    Spring,
    Summer,
    Fall,
    Winter,
}

impl From<SeasonArg> for Season {
    fn from(value: SeasonArg) -> Self {
        match value {
            SeasonArg::Spring => Season::Spring,
            SeasonArg::Summer => Season::Summer,
            SeasonArg::Fall => Season::Fall,
            SeasonArg::Winter => Season::Winter,
        }
    }
}

/// Entry point for the Destroyable Bushes command-line interface.
fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match cli.command {
        CliCommand::Run(args) => run(&args),
        CliCommand::CheckConfig(args) => check_config(&args),
    }
}

static LOGGING_INIT: Once = Once::new();

fn init_logging(verbose: u8) {
    let default_filter = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    LOGGING_INIT.call_once(|| {
        let filter =
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));
        let subscriber = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(false)
            .with_writer(io::stderr)
            .compact();
        let _ = subscriber.try_init();
    });
}

fn load_config(path: Option<&Path>) -> Result<ModConfig> {
    let Some(path) = path else {
        return Ok(ModConfig::default());
    };
    if !path.exists() {
        info!(path = %path.display(), "configuration file missing; using defaults");
        return Ok(ModConfig::default());
    }
    let contents = fs::read_to_string(path)
        .with_context(|| format!("failed to read configuration {}", path.display()))?;
    ModConfig::from_toml_str(&contents)
        .with_context(|| format!("failed to parse configuration {}", path.display()))
}

fn read_script(path: &Path) -> Result<String> {
    if path.as_os_str() == "-" {
        let mut script = String::new();
        let _ = io::stdin()
            .read_to_string(&mut script)
            .context("failed to read script from standard input")?;
        return Ok(script);
    }
    fs::read_to_string(path).with_context(|| format!("failed to read script {}", path.display()))
}

fn run(args: &RunArgs) -> Result<()> {
    let config = load_config(args.config.as_deref())?;
    let script = read_script(&args.script)?;

    let start = SimDate::new(args.day, args.season.into(), args.year);
    anyhow::ensure!(start.is_valid(), "invalid start date {}", describe_date(start));

    let mut world = World::starting_on(start);
    let mut events = Vec::new();
    apply(
        &mut world,
        Command::AddFarmer {
            farmer: PLAYER,
            location: args.location.clone(),
            tile: Tile::new(args.x, args.y),
            facing: args.facing.into(),
        },
        &destroyable_bushes_world::procedure::VanillaHooks,
        &mut events,
    );

    let seed = args.seed.unwrap_or_else(rand::random);
    debug!(seed, "reward rolls seeded");
    let mut session = BushMod::new(config, SessionRole::for_peer(&world, PLAYER), PLAYER, seed);
    let _ = session.on_host_startup(&mut world);

    if let Some(save) = args.save.as_deref().filter(|path| path.exists()) {
        let json = fs::read_to_string(save)
            .with_context(|| format!("failed to read save data {}", save.display()))?;
        session
            .load_save_data(Some(&json))
            .with_context(|| format!("failed to load save data {}", save.display()))?;
    }

    let mut console = Console::new(world, session, PLAYER, args.axe_level);
    for (number, line) in script.lines().enumerate() {
        match parse_line(line) {
            Ok(Some(command)) => {
                for output in console.run(command) {
                    println!("{output}");
                }
            }
            Ok(None) => {}
            Err(console_error) => println!("line {}: {console_error}", number + 1),
        }
    }

    if let Some(save) = args.save.as_deref() {
        if let Some(json) = console.session().save_data()? {
            fs::write(save, json)
                .with_context(|| format!("failed to write save data {}", save.display()))?;
        }
    }
    Ok(())
}

fn check_config(args: &CheckConfigArgs) -> Result<()> {
    if args.write_default && !args.config.exists() {
        let defaults = ModConfig::default()
            .to_toml_string()
            .context("failed to render default configuration")?;
        fs::write(&args.config, defaults)
            .with_context(|| format!("failed to write {}", args.config.display()))?;
        info!(path = %args.config.display(), "default configuration written");
    }
    anyhow::ensure!(
        args.config.exists(),
        "configuration {} does not exist; pass --write-default to create it",
        args.config.display()
    );

    let config = load_config(Some(&args.config))?;
    let rendered = config
        .to_toml_string()
        .context("failed to render configuration")?;
    print!("{rendered}");
    Ok(())
}
