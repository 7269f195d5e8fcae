use destroyable_bushes_core::{ModConfig, StruckBush, Tile};
use destroyable_bushes_system_damage::{
    compute_damage, is_destructible, MINIMUM_STRIKE_DAMAGE, WALNUT_FIRST_STRIKE_CAP,
};
use proptest::prelude::*;

fn neutral_config() -> ModConfig {
    let mut config = ModConfig::default();
    config.axe_damage_multiplier = 1.0;
    config.bush_type_durability.small = 1.0;
    config.bush_type_durability.medium = 1.0;
    config.bush_type_durability.large = 1.0;
    config.bush_type_durability.walnut = 1.0;
    config
}

fn bush(size: i32, health: f32) -> StruckBush<'static> {
    StruckBush {
        location: "Forest",
        tile: Tile::new(3, 3),
        size,
        health,
        town_bush: false,
    }
}

#[test]
fn allow_list_is_authoritative() {
    let mut config = ModConfig::default();
    config.destroyable_bush_locations = vec!["Farm".to_owned()];
    config.destroyable_bush_types.small = false;
    config.destroyable_bush_types.medium = true;

    let farm = StruckBush {
        location: "Farm",
        ..bush(0, 0.0)
    };
    let town = StruckBush {
        location: "Town",
        ..bush(1, 0.0)
    };

    assert!(is_destructible(&config, &farm));
    assert!(!is_destructible(&config, &town));
}

#[test]
fn walnut_first_strike_with_heavy_axe_is_exactly_the_cap() {
    let config = neutral_config();
    for raw in [1.0, 1.5, 20.0] {
        assert_eq!(compute_damage(&config, raw, &bush(4, 0.0)), WALNUT_FIRST_STRIKE_CAP);
    }
}

proptest! {
    #[test]
    fn weak_strikes_are_raised_to_the_floor(raw in -10.0f32..MINIMUM_STRIKE_DAMAGE, size in 0i32..4) {
        let damage = compute_damage(&neutral_config(), raw, &bush(size, 0.0));
        prop_assert!(damage >= MINIMUM_STRIKE_DAMAGE);
    }

    #[test]
    fn neutral_settings_pass_damage_through(
        raw in MINIMUM_STRIKE_DAMAGE..50.0f32,
        size in 0i32..6,
        health in -0.99f32..-0.01,
    ) {
        let struck = bush(size, health);
        prop_assert_eq!(compute_damage(&neutral_config(), raw, &struck), raw);
    }

    #[test]
    fn damage_never_falls_below_the_scaled_floor(
        raw in -5.0f32..5.0,
        multiplier in 0.1f32..10.0,
        divisor in 0.1f32..10.0,
    ) {
        let mut config = neutral_config();
        config.axe_damage_multiplier = multiplier;
        config.bush_type_durability.large = divisor;

        let damage = compute_damage(&config, raw, &bush(2, 0.0));
        let floor = MINIMUM_STRIKE_DAMAGE * multiplier / divisor;
        prop_assert!(damage >= floor * 0.999);
    }
}
