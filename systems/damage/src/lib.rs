#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Pure damage and durability rules applied to every axe strike on a bush.
//!
//! These functions run inside the host's strike procedure, so they never
//! allocate and never fail.

use destroyable_bushes_core::{BushSize, ModConfig, StrikeHooks, StruckBush};

/// Smallest damage any strike deals, so starter axes still make progress.
pub const MINIMUM_STRIKE_DAMAGE: f32 = 0.125;

/// Most damage a walnut bush takes from its first strike.
pub const WALNUT_FIRST_STRIKE_CAP: f32 = 0.9;

/// Reports whether the mod allows the bush to be destroyed.
///
/// A non-empty location list is authoritative: the bush qualifies exactly
/// when its location matches an entry, ignoring ASCII case. Otherwise the
/// per-size toggle decides, and green tea or unknown sizes never qualify.
#[must_use]
pub fn is_destructible(config: &ModConfig, bush: &StruckBush<'_>) -> bool {
    if !config.destroyable_bush_locations.is_empty() {
        return config
            .destroyable_bush_locations
            .iter()
            .any(|name| name.eq_ignore_ascii_case(bush.location));
    }

    bush.bush_size()
        .is_some_and(|size| config.destroyable_bush_types.allows(size))
}

/// Damage a strike with `raw` host damage deals to the bush.
///
/// A durability that is not a positive number counts as 1.0, and a strike
/// whose damage is not finite deals none.
#[must_use]
pub fn compute_damage(config: &ModConfig, raw: f32, bush: &StruckBush<'_>) -> f32 {
    let divisor = bush
        .bush_size()
        .map_or(1.0, |size| config.bush_type_durability.divisor(size));
    let divisor = if divisor.is_finite() && divisor > 0.0 {
        divisor
    } else {
        1.0
    };
    let damage = raw.max(MINIMUM_STRIKE_DAMAGE) * config.axe_damage_multiplier / divisor;
    if !damage.is_finite() {
        return 0.0;
    }

    // Walnut bushes must survive the first strike so the walnut can drop.
    if bush.bush_size() == Some(BushSize::Walnut) && bush.health == 0.0 {
        damage.min(WALNUT_FIRST_STRIKE_CAP)
    } else {
        damage
    }
}

/// Axe upgrades required before strikes damage a bush; 0 without a configuration.
#[must_use]
pub fn required_upgrade_tier(config: Option<&ModConfig>) -> i32 {
    config.map_or(0, |config| config.axe_upgrades_required)
}

/// Strike hooks backed by the mod configuration.
#[derive(Clone, Copy, Debug)]
pub struct ConfiguredHooks<'a> {
    config: &'a ModConfig,
}

impl<'a> ConfiguredHooks<'a> {
    /// Creates hooks reading from the provided configuration.
    #[must_use]
    pub const fn new(config: &'a ModConfig) -> Self {
        Self { config }
    }
}

impl StrikeHooks for ConfiguredHooks<'_> {
    fn is_destroyable(&self, bush: &StruckBush<'_>, vanilla: bool) -> bool {
        vanilla || is_destructible(self.config, bush)
    }

    fn required_upgrade_tier(&self) -> i32 {
        required_upgrade_tier(Some(self.config))
    }

    fn adjust_damage(&self, raw: f32, bush: &StruckBush<'_>) -> f32 {
        compute_damage(self.config, raw, bush)
    }
}
