#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Rewrites the host's bush strike procedure so it consults the mod.
//!
//! Three instruction patterns are recognised, each scanned from the end of
//! the listing toward the start:
//!
//! * the walnut guard `size == 4`, which becomes `0 == 4`;
//! * the axe requirement `upgrade_level < 1`, whose constant becomes a call
//!   to the required-upgrade hook;
//! * the damage expression `upgrade_level / 5f`, whose result is passed
//!   through the damage hook together with the bush.
//!
//! A missing pattern is skipped. If the rewritten listing fails validation
//! the original listing is returned untouched.

use std::collections::{HashMap, HashSet};

use destroyable_bushes_core::{Arg, CodeInstruction, Field, Label, Method, OpCode};
use thiserror::Error;
use tracing::{debug, error};

const WALNUT_SIZE_ID: i32 = 4;
const VANILLA_UPGRADE_REQUIREMENT: i32 = 1;
const VANILLA_DAMAGE_DIVISOR: f32 = 5.0;

/// Instruction patterns the patcher rewrites.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Pattern {
    /// `size == 4`, which exempts walnut bushes.
    WalnutGuard,
    /// `upgrade_level < 1`, the axe requirement.
    UpgradeRequirement,
    /// `upgrade_level / 5f`, the raw strike damage.
    DamageAdjustment,
}

/// Structural problems that make a listing unusable.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Error)]
pub enum ListingError {
    /// A branch targets a label that no instruction defines.
    #[error("branch targets undefined label {0:?}")]
    UndefinedLabel(Label),
    /// Two instructions define the same label.
    #[error("label {0:?} is defined more than once")]
    DuplicateLabel(Label),
}

/// Counts of the rewrites applied to a listing.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct PatchReport {
    /// Walnut guards neutralised.
    pub walnut_guards: usize,
    /// Upgrade constants replaced by the hook call.
    pub upgrade_requirements: usize,
    /// Damage expressions routed through the hook.
    pub damage_adjustments: usize,
}

impl PatchReport {
    /// Number of rewrites recorded for the provided pattern.
    #[must_use]
    pub const fn count(&self, pattern: Pattern) -> usize {
        match pattern {
            Pattern::WalnutGuard => self.walnut_guards,
            Pattern::UpgradeRequirement => self.upgrade_requirements,
            Pattern::DamageAdjustment => self.damage_adjustments,
        }
    }

    /// Total number of rewrites applied.
    #[must_use]
    pub const fn total(&self) -> usize {
        self.walnut_guards + self.upgrade_requirements + self.damage_adjustments
    }
}

/// Stateful front end that logs a failed rewrite only the first time.
#[derive(Debug, Default)]
pub struct InstructionPatcher {
    failure_logged: bool,
    last_report: PatchReport,
}

impl InstructionPatcher {
    /// Creates a patcher that has not run yet.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            failure_logged: false,
            last_report: PatchReport {
                walnut_guards: 0,
                upgrade_requirements: 0,
                damage_adjustments: 0,
            },
        }
    }

    /// Produces the patched strike procedure.
    ///
    /// The input is never modified. When the rewritten listing does not
    /// validate, a copy of the original is returned and the report is empty.
    pub fn patch_perform_tool_action(&mut self, original: &[CodeInstruction]) -> Vec<CodeInstruction> {
        match rewrite(original) {
            Ok((patched, report)) => {
                self.last_report = report;
                patched
            }
            Err(listing_error) => {
                if !self.failure_logged {
                    self.failure_logged = true;
                    error!(
                        %listing_error,
                        "strike procedure patch could not be applied; bushes keep host behaviour"
                    );
                }
                self.last_report = PatchReport::default();
                original.to_vec()
            }
        }
    }

    /// Report describing the most recent call to
    /// [`InstructionPatcher::patch_perform_tool_action`].
    #[must_use]
    pub const fn last_report(&self) -> PatchReport {
        self.last_report
    }
}

/// Applies every rewrite to a copy of `original` and validates the result.
pub fn rewrite(original: &[CodeInstruction]) -> Result<(Vec<CodeInstruction>, PatchReport), ListingError> {
    let mut patched = original.to_vec();
    let report = PatchReport {
        walnut_guards: neutralise_walnut_guards(&mut patched),
        upgrade_requirements: replace_upgrade_requirements(&mut patched),
        damage_adjustments: route_damage_through_hook(&mut patched),
    };

    for pattern in [
        Pattern::WalnutGuard,
        Pattern::UpgradeRequirement,
        Pattern::DamageAdjustment,
    ] {
        if report.count(pattern) == 0 {
            debug!(?pattern, "pattern not found; substitution skipped");
        }
    }

    validate(&patched)?;
    Ok((patched, report))
}

/// Checks that every branch target is defined exactly once.
pub fn validate(listing: &[CodeInstruction]) -> Result<(), ListingError> {
    let mut defined: HashMap<Label, usize> = HashMap::new();
    for (index, instruction) in listing.iter().enumerate() {
        for label in &instruction.labels {
            if defined.insert(*label, index).is_some() {
                return Err(ListingError::DuplicateLabel(*label));
            }
        }
    }

    let targets: HashSet<Label> = listing
        .iter()
        .filter_map(|instruction| instruction.opcode.branch_target())
        .collect();
    let mut undefined: Vec<Label> = targets
        .into_iter()
        .filter(|label| !defined.contains_key(label))
        .collect();
    undefined.sort();
    match undefined.first() {
        Some(label) => Err(ListingError::UndefinedLabel(*label)),
        None => Ok(()),
    }
}

fn is_conversion(opcode: &OpCode) -> bool {
    opcode.calls(Method::NetValue)
}

fn neutralise_walnut_guards(listing: &mut Vec<CodeInstruction>) -> usize {
    let mut applied = 0;
    for x in (0..listing.len().saturating_sub(2)).rev() {
        if listing[x].opcode == OpCode::LdFld(Field::Size)
            && is_conversion(&listing[x + 1].opcode)
            && listing[x + 2].opcode == OpCode::LdcI4(WALNUT_SIZE_ID)
        {
            let _ = listing.splice(
                x + 2..x + 2,
                [
                    CodeInstruction::new(OpCode::Pop),
                    CodeInstruction::new(OpCode::LdcI4(0)),
                ],
            );
            debug!(index = x, "replaced walnut size check with 0 == 4");
            applied += 1;
        }
    }
    applied
}

fn replace_upgrade_requirements(listing: &mut [CodeInstruction]) -> usize {
    let mut applied = 0;
    for x in (0..listing.len().saturating_sub(2)).rev() {
        if listing[x].opcode == OpCode::LdFld(Field::UpgradeLevel)
            && is_conversion(&listing[x + 1].opcode)
            && listing[x + 2].opcode == OpCode::LdcI4(VANILLA_UPGRADE_REQUIREMENT)
        {
            // Labels stay on the slot, so branches into the constant still land.
            listing[x + 2].opcode = OpCode::Call(Method::RequiredUpgradeTier);
            debug!(index = x, "replaced axe upgrade constant with hook call");
            applied += 1;
        }
    }
    applied
}

fn route_damage_through_hook(listing: &mut Vec<CodeInstruction>) -> usize {
    let mut applied = 0;
    for x in (0..listing.len().saturating_sub(4)).rev() {
        if listing[x].opcode == OpCode::LdFld(Field::UpgradeLevel)
            && is_conversion(&listing[x + 1].opcode)
            && listing[x + 2].opcode == OpCode::ConvR4
            && listing[x + 3].opcode == OpCode::LdcR4(VANILLA_DAMAGE_DIVISOR)
            && listing[x + 4].opcode == OpCode::Div
        {
            let _ = listing.splice(
                x + 5..x + 5,
                [
                    CodeInstruction::new(OpCode::LdArg(Arg::This)),
                    CodeInstruction::new(OpCode::Call(Method::AdjustDamage)),
                ],
            );
            debug!(index = x, "routed strike damage through hook");
            applied += 1;
        }
    }
    applied
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ins(opcode: OpCode) -> CodeInstruction {
        CodeInstruction::new(opcode)
    }

    #[test]
    fn walnut_guard_gets_pop_and_zero() {
        let original = vec![
            ins(OpCode::LdArg(Arg::This)),
            ins(OpCode::LdFld(Field::Size)),
            ins(OpCode::CallVirt(Method::NetValue)),
            ins(OpCode::LdcI4(4)).labeled(Label::new(3)),
            ins(OpCode::Ret),
        ];

        let (patched, report) = rewrite(&original).expect("valid");

        assert_eq!(report.walnut_guards, 1);
        assert_eq!(
            patched.iter().map(|i| i.opcode).collect::<Vec<_>>(),
            vec![
                OpCode::LdArg(Arg::This),
                OpCode::LdFld(Field::Size),
                OpCode::CallVirt(Method::NetValue),
                OpCode::Pop,
                OpCode::LdcI4(0),
                OpCode::LdcI4(4),
                OpCode::Ret,
            ]
        );
        assert_eq!(patched[5].labels, vec![Label::new(3)]);
    }

    #[test]
    fn upgrade_constant_keeps_its_labels() {
        let original = vec![
            ins(OpCode::LdArg(Arg::Tool)),
            ins(OpCode::LdFld(Field::UpgradeLevel)),
            ins(OpCode::Call(Method::NetValue)),
            ins(OpCode::LdcI4(1))
                .labeled(Label::new(7))
                .labeled(Label::new(8)),
            ins(OpCode::Blt(Label::new(7))),
            ins(OpCode::Br(Label::new(8))),
        ];

        let (patched, report) = rewrite(&original).expect("valid");

        assert_eq!(report.upgrade_requirements, 1);
        assert_eq!(patched.len(), original.len());
        assert_eq!(patched[3].opcode, OpCode::Call(Method::RequiredUpgradeTier));
        assert_eq!(patched[3].labels, vec![Label::new(7), Label::new(8)]);
    }

    #[test]
    fn damage_hook_follows_the_division() {
        let original = vec![
            ins(OpCode::LdFld(Field::UpgradeLevel)),
            ins(OpCode::Call(Method::NetValue)),
            ins(OpCode::ConvR4),
            ins(OpCode::LdcR4(5.0)),
            ins(OpCode::Div),
            ins(OpCode::Sub),
        ];

        let (patched, report) = rewrite(&original).expect("valid");

        assert_eq!(report.damage_adjustments, 1);
        assert_eq!(patched[5].opcode, OpCode::LdArg(Arg::This));
        assert_eq!(patched[6].opcode, OpCode::Call(Method::AdjustDamage));
        assert_eq!(patched[7].opcode, OpCode::Sub);
    }

    #[test]
    fn every_walnut_guard_is_rewritten() {
        let guard = [
            ins(OpCode::LdFld(Field::Size)),
            ins(OpCode::Call(Method::NetValue)),
            ins(OpCode::LdcI4(4)),
        ];
        let original: Vec<CodeInstruction> = guard.iter().chain(guard.iter()).cloned().collect();

        let (patched, report) = rewrite(&original).expect("valid");

        assert_eq!(report.walnut_guards, 2);
        assert_eq!(patched.len(), original.len() + 4);
    }

    #[test]
    fn other_constants_are_left_alone() {
        let original = vec![
            ins(OpCode::LdFld(Field::Size)),
            ins(OpCode::Call(Method::NetValue)),
            ins(OpCode::LdcI4(3)),
            ins(OpCode::LdFld(Field::UpgradeLevel)),
            ins(OpCode::LdcI4(1)),
        ];

        let (patched, report) = rewrite(&original).expect("valid");

        assert_eq!(report.total(), 0);
        assert_eq!(patched, original);
    }

    #[test]
    fn validation_rejects_duplicate_and_missing_labels() {
        let duplicate = vec![
            ins(OpCode::Ret).labeled(Label::new(1)),
            ins(OpCode::Ret).labeled(Label::new(1)),
        ];
        let dangling = vec![ins(OpCode::BrFalse(Label::new(4))), ins(OpCode::Ret)];

        assert_eq!(validate(&duplicate), Err(ListingError::DuplicateLabel(Label::new(1))));
        assert_eq!(validate(&dangling), Err(ListingError::UndefinedLabel(Label::new(4))));
    }

    #[test]
    fn failed_validation_returns_the_original_listing() {
        let original = vec![
            ins(OpCode::LdFld(Field::Size)),
            ins(OpCode::Call(Method::NetValue)),
            ins(OpCode::LdcI4(4)),
            ins(OpCode::Bne(Label::new(2))),
        ];
        let mut patcher = InstructionPatcher::new();

        let first = patcher.patch_perform_tool_action(&original);
        let second = patcher.patch_perform_tool_action(&original);

        assert_eq!(first, original);
        assert_eq!(second, original);
        assert_eq!(patcher.last_report(), PatchReport::default());
        assert!(patcher.failure_logged);
    }
}
