//! Player-facing configuration loaded from `config.toml`.
//!
//! Every key is optional. Missing keys take the defaults below and unknown
//! keys are ignored, so older and newer files both load.

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::warn;

use crate::BushSize;

const DEFAULT_REGROW_SCHEDULE: &str = "3 days";

/// Errors raised while reading or writing the configuration document.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The document is not valid TOML or a value has the wrong type.
    #[error("could not parse configuration: {0}")]
    Parse(#[from] toml::de::Error),
    /// The configuration could not be rendered back to TOML.
    #[error("could not render configuration: {0}")]
    Render(#[from] toml::ser::Error),
}

/// Reasons a regrow schedule string is rejected at load time.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Error)]
pub enum ScheduleError {
    /// The value names none of the supported units.
    #[error("unit of time not found; include \"days\", \"seasons\", or \"years\"")]
    MissingUnit,
    /// The value does not start with a valid integer.
    #[error("number not found; start with a valid integer, e.g. \"3 days\" or \"1 season\"")]
    MissingNumber,
}

/// The mod's configuration settings.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ModConfig {
    /// Axe upgrades required to damage non-tea bushes; the host's own value is 1.
    pub axe_upgrades_required: i32,
    /// Multiplier applied to every axe strike against a bush.
    pub axe_damage_multiplier: f32,
    /// Delay before destroyed bushes regrow, such as `"3 days"`; `None` disables regrowth.
    #[serde(serialize_with = "serialize_schedule")]
    pub when_bushes_regrow: Option<String>,
    /// Locations where bushes are destroyable; empty means the per-size toggles decide.
    pub destroyable_bush_locations: Vec<String>,
    /// Per-size destructibility toggles.
    pub destroyable_bush_types: DestroyableBushTypes,
    /// Per-size divisors applied to strike damage.
    pub bush_type_durability: BushTypeDurability,
    /// Pieces of wood dropped per destroyed bush.
    pub amount_of_wood_dropped: AmountOfWoodDropped,
    /// Foraging experience granted per destroyed bush.
    pub amount_of_experience_gained: AmountOfExperienceGained,
}

impl Default for ModConfig {
    fn default() -> Self {
        Self {
            axe_upgrades_required: 0,
            axe_damage_multiplier: 1.0,
            when_bushes_regrow: Some(DEFAULT_REGROW_SCHEDULE.to_owned()),
            destroyable_bush_locations: Vec::new(),
            destroyable_bush_types: DestroyableBushTypes::default(),
            bush_type_durability: BushTypeDurability::default(),
            amount_of_wood_dropped: AmountOfWoodDropped::default(),
            amount_of_experience_gained: AmountOfExperienceGained::default(),
        }
    }
}

impl ModConfig {
    /// Parses a TOML document and validates the regrow schedule.
    pub fn from_toml_str(contents: &str) -> Result<Self, ConfigError> {
        let parsed: Self = toml::from_str(contents)?;
        Ok(parsed.normalized())
    }

    /// Renders the configuration as a TOML document.
    pub fn to_toml_string(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Validates the regrow schedule, disabling regrowth when it is unusable.
    #[must_use]
    pub fn normalized(mut self) -> Self {
        self.when_bushes_regrow = match validate_regrow_schedule(self.when_bushes_regrow.as_deref())
        {
            Ok(schedule) => schedule,
            Err(error) => {
                warn!(%error, "WhenBushesRegrow setting disabled");
                None
            }
        };
        self
    }

    /// Regrow schedule, if regrowth is enabled.
    #[must_use]
    pub fn regrow_schedule(&self) -> Option<&str> {
        self.when_bushes_regrow.as_deref()
    }
}

// TOML has no null, so a disabled schedule is written as the literal "null".
fn serialize_schedule<S>(schedule: &Option<String>, serializer: S) -> Result<S::Ok, S::Error>
where
    S: serde::Serializer,
{
    serializer.serialize_str(schedule.as_deref().unwrap_or("null"))
}

/// Checks a regrow schedule the way the settings file expects it to be written.
///
/// Blank values and the literal `null` disable regrowth without complaint.
/// Otherwise the value must mention a unit and begin with an integer; the
/// accepted value is returned unmodified.
pub fn validate_regrow_schedule(value: Option<&str>) -> Result<Option<String>, ScheduleError> {
    let Some(value) = value else {
        return Ok(None);
    };
    let trimmed = value.trim();
    if trimmed.is_empty() || trimmed.eq_ignore_ascii_case("null") {
        return Ok(None);
    }

    let lowered = trimmed.to_ascii_lowercase();
    let has_unit = ["day", "season", "month", "year"]
        .iter()
        .any(|unit| lowered.contains(unit));
    if !has_unit {
        return Err(ScheduleError::MissingUnit);
    }

    let digits = trimmed
        .find(|character: char| !character.is_ascii_digit())
        .map_or(trimmed, |end| &trimmed[..end]);
    if digits.is_empty() || digits.parse::<i32>().is_err() {
        return Err(ScheduleError::MissingNumber);
    }

    Ok(Some(value.to_owned()))
}

/// Per-size destructibility toggles used when no location list is set.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DestroyableBushTypes {
    /// Small bushes.
    pub small: bool,
    /// Medium bushes.
    pub medium: bool,
    /// Large bushes.
    pub large: bool,
    /// Walnut bushes.
    pub walnut: bool,
}

impl Default for DestroyableBushTypes {
    fn default() -> Self {
        Self {
            small: true,
            medium: true,
            large: true,
            walnut: true,
        }
    }
}

impl DestroyableBushTypes {
    /// Toggle for the provided size; green tea bushes have no toggle.
    #[must_use]
    pub const fn allows(&self, size: BushSize) -> bool {
        match size {
            BushSize::Small => self.small,
            BushSize::Medium => self.medium,
            BushSize::Large => self.large,
            BushSize::Walnut => self.walnut,
            BushSize::GreenTea => false,
        }
    }
}

/// Per-size damage divisors. Values above 1 make bushes tougher.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BushTypeDurability {
    /// Small bushes.
    pub small: f32,
    /// Medium bushes.
    pub medium: f32,
    /// Large bushes.
    pub large: f32,
    /// Walnut bushes.
    pub walnut: f32,
}

impl Default for BushTypeDurability {
    fn default() -> Self {
        Self {
            small: 0.75,
            medium: 1.0,
            large: 1.25,
            walnut: 1.0,
        }
    }
}

impl BushTypeDurability {
    /// Divisor for the provided size; green tea bushes are not scaled.
    #[must_use]
    pub const fn divisor(&self, size: BushSize) -> f32 {
        match size {
            BushSize::Small => self.small,
            BushSize::Medium => self.medium,
            BushSize::Large => self.large,
            BushSize::Walnut => self.walnut,
            BushSize::GreenTea => 1.0,
        }
    }
}

/// Pieces of wood dropped by each size.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AmountOfWoodDropped {
    /// Small bushes.
    pub small: i32,
    /// Medium bushes.
    pub medium: i32,
    /// Large bushes.
    pub large: i32,
    /// Walnut bushes.
    pub walnut: i32,
    /// Green tea bushes.
    pub green_tea: i32,
}

impl Default for AmountOfWoodDropped {
    fn default() -> Self {
        Self {
            small: 2,
            medium: 4,
            large: 8,
            walnut: 4,
            green_tea: 0,
        }
    }
}

impl AmountOfWoodDropped {
    /// Wood configured for the provided size.
    #[must_use]
    pub const fn for_size(&self, size: BushSize) -> i32 {
        match size {
            BushSize::Small => self.small,
            BushSize::Medium => self.medium,
            BushSize::Large => self.large,
            BushSize::Walnut => self.walnut,
            BushSize::GreenTea => self.green_tea,
        }
    }
}

/// Foraging experience granted by each size.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AmountOfExperienceGained {
    /// Small bushes.
    pub small: i32,
    /// Medium bushes.
    pub medium: i32,
    /// Large bushes.
    pub large: i32,
    /// Walnut bushes.
    pub walnut: i32,
    /// Green tea bushes.
    pub green_tea: i32,
}

impl Default for AmountOfExperienceGained {
    fn default() -> Self {
        Self {
            small: 6,
            medium: 9,
            large: 12,
            walnut: 9,
            green_tea: 0,
        }
    }
}

impl AmountOfExperienceGained {
    /// Experience configured for the provided size.
    #[must_use]
    pub const fn for_size(&self, size: BushSize) -> i32 {
        match size {
            BushSize::Small => self.small,
            BushSize::Medium => self.medium,
            BushSize::Large => self.large,
            BushSize::Walnut => self.walnut,
            BushSize::GreenTea => self.green_tea,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{validate_regrow_schedule, ModConfig, ScheduleError};
    use crate::BushSize;

    #[test]
    fn empty_document_uses_defaults() {
        let config = ModConfig::from_toml_str("").expect("parse");
        assert_eq!(config, ModConfig::default());
        assert_eq!(config.regrow_schedule(), Some("3 days"));
        assert_eq!(config.amount_of_wood_dropped.for_size(BushSize::Large), 8);
        assert_eq!(
            config.amount_of_experience_gained.for_size(BushSize::Medium),
            9
        );
    }

    #[test]
    fn unknown_keys_are_ignored_and_tables_merge_with_defaults() {
        let config = ModConfig::from_toml_str(
            r#"
            axe_damage_multiplier = 2.5
            favourite_colour = "green"

            [bush_type_durability]
            large = 4.0
            "#,
        )
        .expect("parse");

        assert!((config.axe_damage_multiplier - 2.5).abs() < f32::EPSILON);
        assert!((config.bush_type_durability.large - 4.0).abs() < f32::EPSILON);
        assert!((config.bush_type_durability.small - 0.75).abs() < f32::EPSILON);
    }

    #[test]
    fn malformed_schedule_disables_regrowth() {
        let config =
            ModConfig::from_toml_str(r#"when_bushes_regrow = "soon""#).expect("parse");
        assert_eq!(config.regrow_schedule(), None);

        let config =
            ModConfig::from_toml_str(r#"when_bushes_regrow = "a few days""#).expect("parse");
        assert_eq!(config.regrow_schedule(), None);
    }

    #[test]
    fn null_and_blank_schedules_disable_regrowth() {
        assert_eq!(validate_regrow_schedule(Some("null")), Ok(None));
        assert_eq!(validate_regrow_schedule(Some("  NULL ")), Ok(None));
        assert_eq!(validate_regrow_schedule(Some("   ")), Ok(None));
        assert_eq!(validate_regrow_schedule(None), Ok(None));
    }

    #[test]
    fn schedule_validation_mirrors_the_settings_rules() {
        assert_eq!(
            validate_regrow_schedule(Some("2 Seasons")),
            Ok(Some("2 Seasons".to_owned()))
        );
        assert_eq!(
            validate_regrow_schedule(Some("10 fortnights")),
            Err(ScheduleError::MissingUnit)
        );
        assert_eq!(
            validate_regrow_schedule(Some("-1 days")),
            Err(ScheduleError::MissingNumber)
        );
        assert_eq!(
            validate_regrow_schedule(Some("99999999999 days")),
            Err(ScheduleError::MissingNumber)
        );
    }

    #[test]
    fn partial_reward_tables_keep_their_other_defaults() {
        let config = ModConfig::from_toml_str(
            r#"
            [amount_of_wood_dropped]
            small = 5
            "#,
        )
        .expect("parse");
        assert_eq!(config.amount_of_wood_dropped.for_size(BushSize::Small), 5);
        assert_eq!(config.amount_of_wood_dropped.for_size(BushSize::Medium), 4);
    }

    #[test]
    fn disabled_schedule_stays_disabled_after_rendering() {
        let mut config = ModConfig::default();
        config.when_bushes_regrow = None;
        let rendered = config.to_toml_string().expect("render");
        let restored = ModConfig::from_toml_str(&rendered).expect("parse");
        assert_eq!(restored.regrow_schedule(), None);
    }

    #[test]
    fn configuration_survives_toml_rendering() {
        let mut config = ModConfig::default();
        config.destroyable_bush_locations = vec!["Farm".to_owned(), "Forest".to_owned()];
        config.destroyable_bush_types.walnut = false;

        let rendered = config.to_toml_string().expect("render");
        let restored = ModConfig::from_toml_str(&rendered).expect("parse");
        assert_eq!(restored, config);
    }
}
