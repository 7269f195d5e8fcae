#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Owned mod context that wires the systems to the host.
//!
//! A [`BushMod`] holds the configuration, the save-scoped records and the
//! per-role record strategy. The host drives it through a handful of entry
//! points: startup, strike hooks, observed destruction, day boundaries,
//! received messages, and explicit load and save.

use std::collections::VecDeque;

use destroyable_bushes_core::{
    Command, DestroyedBush, Event, FarmerId, ModConfig, ModData, PlacementError, SimDate,
    DESTROYED_BUSH_MESSAGE,
};
use destroyable_bushes_system_damage::ConfiguredHooks;
use destroyable_bushes_system_destruction::{
    decode_record, DestructionRecorder, LocalRecorder, RecordSink, RemoteRecorder,
};
use destroyable_bushes_system_patcher::{InstructionPatcher, PatchReport};
use destroyable_bushes_system_regrowth::{RegrowthHost, RegrowthScheduler, RegrowthSummary};
use destroyable_bushes_world::{apply, query, World};
use thiserror::Error;
use tracing::{debug, error, info, warn};

/// Which side of a multiplayer session this mod instance runs on.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SessionRole {
    /// Owns the save data and runs regrowth.
    Authoritative,
    /// Forwards destruction records to the host peer.
    Replica {
        /// Peer that owns the save data.
        host: FarmerId,
    },
}

impl SessionRole {
    /// Derives the role of `local` from the world's host peer.
    ///
    /// A world without a host treats every peer as authoritative.
    #[must_use]
    pub fn for_peer(world: &World, local: FarmerId) -> Self {
        match query::host_peer(world) {
            Some(host) if host != local => Self::Replica { host },
            _ => Self::Authoritative,
        }
    }

    /// Reports whether this role owns the save data.
    #[must_use]
    pub const fn is_authoritative(&self) -> bool {
        matches!(self, Self::Authoritative)
    }
}

/// Failures while moving save data in or out of the session.
#[derive(Debug, Error)]
pub enum SessionError {
    /// Stored save data could not be parsed.
    #[error("could not read save data: {0}")]
    ReadSaveData(#[source] serde_json::Error),
    /// Save data could not be serialised.
    #[error("could not write save data: {0}")]
    WriteSaveData(#[source] serde_json::Error),
}

/// Mod state owned by one peer.
#[derive(Debug)]
pub struct BushMod {
    config: ModConfig,
    data: ModData,
    role: SessionRole,
    sink: Box<dyn RecordSink>,
    recorder: DestructionRecorder,
    patcher: InstructionPatcher,
    scheduler: RegrowthScheduler,
    patched: bool,
}

impl BushMod {
    /// Creates the mod for the `local` peer.
    ///
    /// The record strategy is fixed here: the authoritative session keeps
    /// records in its own data, a replica sends them to its host.
    #[must_use]
    pub fn new(config: ModConfig, role: SessionRole, local: FarmerId, seed: u64) -> Self {
        let sink: Box<dyn RecordSink> = match role {
            SessionRole::Authoritative => Box::new(LocalRecorder),
            SessionRole::Replica { host } => Box::new(RemoteRecorder::new(local, host)),
        };
        Self {
            config,
            data: ModData::default(),
            role,
            sink,
            recorder: DestructionRecorder::new(seed),
            patcher: InstructionPatcher::new(),
            scheduler: RegrowthScheduler::new(),
            patched: false,
        }
    }

    /// Active configuration.
    #[must_use]
    pub fn config(&self) -> &ModConfig {
        &self.config
    }

    /// Records held by this session.
    #[must_use]
    pub fn data(&self) -> &ModData {
        &self.data
    }

    /// Role chosen at construction.
    #[must_use]
    pub const fn role(&self) -> SessionRole {
        self.role
    }

    /// Reports whether the strike procedure has been patched.
    #[must_use]
    pub const fn is_patched(&self) -> bool {
        self.patched
    }

    /// Hooks the patched strike procedure calls.
    #[must_use]
    pub fn hooks(&self) -> ConfiguredHooks<'_> {
        ConfiguredHooks::new(&self.config)
    }

    /// Patches the host's strike procedure.
    ///
    /// Runs once; later calls return `None` and leave the world alone.
    pub fn on_host_startup(&mut self, world: &mut World) -> Option<PatchReport> {
        if self.patched {
            return None;
        }

        let original = query::strike_procedure(world).to_vec();
        let listing = self.patcher.patch_perform_tool_action(&original);
        let mut events = Vec::new();
        apply(
            world,
            Command::InstallStrikeProcedure { listing },
            &ConfiguredHooks::new(&self.config),
            &mut events,
        );
        self.patched = true;

        let report = self.patcher.last_report();
        info!(
            walnut_guards = report.walnut_guards,
            upgrade_requirements = report.upgrade_requirements,
            damage_adjustments = report.damage_adjustments,
            "strike procedure patched"
        );
        Some(report)
    }

    /// Records a destroyed bush and returns the reward commands for the host.
    pub fn on_destruction_observed(&mut self, world: &World, event: &Event) -> Vec<Command> {
        let mut out = Vec::new();
        self.recorder.handle(
            std::slice::from_ref(event),
            &self.config,
            query::date(world),
            |farmer| query::farmer_traits(world, farmer),
            self.sink.as_mut(),
            &mut self.data,
            &mut out,
        );
        out
    }

    /// Regrows due bushes at the start of `date`.
    ///
    /// Replicas never regrow; they report their (empty) backlog unchanged.
    pub fn on_day_boundary(&mut self, world: &mut World, date: SimDate) -> RegrowthSummary {
        if !self.role.is_authoritative() {
            return RegrowthSummary {
                regrown: 0,
                pending: self.data.destroyed_bushes.len(),
            };
        }

        let summary = self.scheduler.handle(
            &[Event::DayStarted { date }],
            self.config.regrow_schedule(),
            &mut self.data,
            &mut WorldHost {
                world,
                hooks: ConfiguredHooks::new(&self.config),
            },
        );
        if summary.regrown > 0 {
            debug!(regrown = summary.regrown, pending = summary.pending, "bushes regrew");
        }
        summary
    }

    /// Accepts a destruction record forwarded by a replica.
    ///
    /// Only the authoritative session stores forwarded records. Other
    /// message types are ignored.
    pub fn on_message_received(&mut self, event: &Event) {
        let Event::ModMessageReceived {
            message_type,
            sender,
            payload,
        } = event
        else {
            return;
        };
        if message_type != DESTROYED_BUSH_MESSAGE {
            debug!(%message_type, "ignoring unrelated mod message");
            return;
        }
        if !self.role.is_authoritative() {
            debug!(sender = sender.get(), "replica ignores forwarded record");
            return;
        }

        let stored = decode_record(payload)
            .and_then(|record| LocalRecorder.persist(record, &mut self.data, &mut Vec::new()));
        if let Err(record_error) = stored {
            warn!(%record_error, sender = sender.get(), "dropped forwarded destroyed bush");
        }
    }

    /// Replaces the records with the stored save data.
    ///
    /// `None` starts from empty data. Replicas keep no save data and ignore
    /// the call.
    pub fn load_save_data(&mut self, json: Option<&str>) -> Result<(), SessionError> {
        if !self.role.is_authoritative() {
            return Ok(());
        }
        self.data = match json {
            Some(json) => serde_json::from_str(json).map_err(SessionError::ReadSaveData)?,
            None => ModData::default(),
        };
        debug!(records = self.data.destroyed_bushes.len(), "save data loaded");
        Ok(())
    }

    /// Serialises the records for the save file.
    ///
    /// Returns `None` on replicas, which never write save data.
    pub fn save_data(&self) -> Result<Option<String>, SessionError> {
        if !self.role.is_authoritative() {
            return Ok(None);
        }
        match serde_json::to_string_pretty(&self.data) {
            Ok(json) => Ok(Some(json)),
            Err(source) => {
                let session_error = SessionError::WriteSaveData(source);
                error!(%session_error, "failed to write save data");
                warn!("destroyed bushes may not regrow");
                Err(session_error)
            }
        }
    }

    /// Applies `command` and reacts to every event it causes.
    ///
    /// Reward commands produced by destruction are applied in turn. The
    /// returned events cover every command that ran.
    pub fn execute(&mut self, world: &mut World, command: Command) -> Vec<Event> {
        let mut pending = VecDeque::from([command]);
        let mut observed = Vec::new();

        while let Some(command) = pending.pop_front() {
            let mut events = Vec::new();
            apply(world, command, &ConfiguredHooks::new(&self.config), &mut events);

            for event in &events {
                match event {
                    Event::BushDestroyed { .. } => {
                        pending.extend(self.on_destruction_observed(world, event));
                    }
                    Event::ModMessageReceived { .. } => self.on_message_received(event),
                    Event::ModMessageDropped {
                        message_type,
                        recipient,
                    } => warn!(
                        %message_type,
                        recipient = recipient.get(),
                        "host peer rejected mod message"
                    ),
                    Event::DayStarted { date } => {
                        let _ = self.on_day_boundary(world, *date);
                    }
                    _ => {}
                }
            }
            observed.extend(events);
        }

        observed
    }
}

struct WorldHost<'a> {
    world: &'a mut World,
    hooks: ConfiguredHooks<'a>,
}

impl RegrowthHost for WorldHost<'_> {
    fn footprint_free(&self, record: &DestroyedBush) -> Result<bool, PlacementError> {
        query::is_footprint_free(self.world, &record.location_name, record.tile, record.size)
    }

    fn place(&mut self, record: &DestroyedBush) -> Result<(), PlacementError> {
        let mut events = Vec::new();
        apply(
            self.world,
            Command::PlaceBush {
                location: record.location_name.clone(),
                tile: record.tile,
                size: record.size,
                town_bush: record.town_bush,
                tile_sheet_offset: record.tile_sheet_offset,
            },
            &self.hooks,
            &mut events,
        );
        match events.as_slice() {
            [Event::BushPlaced { .. }] => Ok(()),
            [Event::BushPlacementRejected { reason, .. }] => Err(*reason),
            _ => Err(PlacementError::Occupied),
        }
    }
}
