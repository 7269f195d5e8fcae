//! The host's "perform tool action" procedure and the machine that runs it.
//!
//! The listing is interpreted on every tool swing against a bush. It returns
//! `true` when the host should remove the bush.

use std::collections::HashMap;

use destroyable_bushes_core::{
    Arg, BushSize, CodeInstruction, Field, Label, Method, OpCode, StrikeHooks, StruckBush, Tile,
    Tool, ToolKind, BUSH_DESTROYED_HEALTH,
};
use thiserror::Error;

use crate::bushes::BushState;

const STEP_LIMIT: usize = 4_096;

const LABEL_NOT_WALNUT: Label = Label::new(0);
const LABEL_KEEP_BUSH: Label = Label::new(1);

/// Failures raised while interpreting a procedure listing.
#[derive(Clone, Debug, PartialEq, Error)]
pub enum ExecutionError {
    /// An instruction needed more values than the stack held.
    #[error("stack underflow at instruction {0}")]
    StackUnderflow(usize),
    /// An instruction received a value of the wrong kind.
    #[error("type mismatch at instruction {index}: {opcode:?}")]
    TypeMismatch {
        /// Position of the failing instruction.
        index: usize,
        /// Operation that rejected its operands.
        opcode: OpCode,
    },
    /// A branch targets a label no instruction defines.
    #[error("branch to undefined label {0:?}")]
    UndefinedLabel(Label),
    /// Execution ran past the final instruction.
    #[error("procedure ended without returning")]
    MissingReturn,
    /// Execution did not return within the step budget.
    #[error("procedure exceeded its step budget")]
    StepLimit,
}

/// Listing the host ships for striking a bush with a tool.
///
/// Walnut bushes are never damaged, only axes count, the bush must pass
/// `IsDestroyable`, the axe needs one upgrade, and each strike removes
/// `upgrade_level / 5` health.
#[must_use]
pub fn vanilla_perform_tool_action() -> Vec<CodeInstruction> {
    use OpCode::*;

    vec![
        LdArg(Arg::This).into(),
        LdFld(Field::Size).into(),
        Call(Method::NetValue).into(),
        LdcI4(4).into(),
        Bne(LABEL_NOT_WALNUT).into(),
        LdcI4(0).into(),
        Ret.into(),
        CodeInstruction::new(LdArg(Arg::Tool)).labeled(LABEL_NOT_WALNUT),
        LdFld(Field::ToolKind).into(),
        LdcI4(0).into(),
        Bne(LABEL_KEEP_BUSH).into(),
        LdArg(Arg::This).into(),
        CallVirt(Method::IsDestroyable).into(),
        BrFalse(LABEL_KEEP_BUSH).into(),
        LdArg(Arg::Tool).into(),
        LdFld(Field::UpgradeLevel).into(),
        Call(Method::NetValue).into(),
        LdcI4(1).into(),
        Blt(LABEL_KEEP_BUSH).into(),
        LdArg(Arg::This).into(),
        LdArg(Arg::This).into(),
        LdFld(Field::Health).into(),
        LdArg(Arg::Tool).into(),
        LdFld(Field::UpgradeLevel).into(),
        Call(Method::NetValue).into(),
        ConvR4.into(),
        LdcR4(5.0).into(),
        Div.into(),
        Sub.into(),
        StFld(Field::Health).into(),
        LdArg(Arg::This).into(),
        LdFld(Field::Health).into(),
        LdcR4(BUSH_DESTROYED_HEALTH).into(),
        Bgt(LABEL_KEEP_BUSH).into(),
        LdcI4(1).into(),
        Ret.into(),
        CodeInstruction::new(LdcI4(0)).labeled(LABEL_KEEP_BUSH),
        Ret.into(),
    ]
}

/// Host rule for `IsDestroyable`: only green tea bushes may be cut down.
#[must_use]
pub fn vanilla_is_destroyable(bush: &StruckBush<'_>) -> bool {
    bush.bush_size() == Some(BushSize::GreenTea)
}

/// Hooks reproducing the host's behaviour with no mod installed.
#[derive(Clone, Copy, Debug, Default)]
pub struct VanillaHooks;

impl StrikeHooks for VanillaHooks {
    fn is_destroyable(&self, _bush: &StruckBush<'_>, vanilla: bool) -> bool {
        vanilla
    }

    fn required_upgrade_tier(&self) -> i32 {
        1
    }

    fn adjust_damage(&self, raw: f32, _bush: &StruckBush<'_>) -> f32 {
        raw
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
enum Value {
    Int(i32),
    Float(f32),
    NetInt(i32),
    This,
    Tool,
}

/// Runs a listing against one bush, returning whether it should be removed.
pub(crate) fn execute(
    listing: &[CodeInstruction],
    location: &str,
    origin: Tile,
    bush: &mut BushState,
    tool: Tool,
    hooks: &dyn StrikeHooks,
) -> Result<bool, ExecutionError> {
    let targets = resolve_labels(listing);
    let mut stack: Vec<Value> = Vec::with_capacity(8);
    let mut pc = 0;

    for _ in 0..STEP_LIMIT {
        let Some(instruction) = listing.get(pc) else {
            return Err(ExecutionError::MissingReturn);
        };
        let opcode = instruction.opcode;
        let mismatch = || ExecutionError::TypeMismatch { index: pc, opcode };
        let pop = |stack: &mut Vec<Value>| stack.pop().ok_or(ExecutionError::StackUnderflow(pc));
        let mut next = pc + 1;

        match opcode {
            OpCode::LdArg(Arg::This) => stack.push(Value::This),
            OpCode::LdArg(Arg::Tool) => stack.push(Value::Tool),
            OpCode::LdFld(field) => {
                let value = match (pop(&mut stack)?, field) {
                    (Value::This, Field::Size) => Value::NetInt(bush.size),
                    (Value::This, Field::Health) => Value::Float(bush.health),
                    (Value::Tool, Field::UpgradeLevel) => Value::NetInt(tool.upgrade_level),
                    (Value::Tool, Field::ToolKind) => Value::Int(tool_kind_id(tool.kind)),
                    _ => return Err(mismatch()),
                };
                stack.push(value);
            }
            OpCode::StFld(field) => {
                let value = pop(&mut stack)?;
                match (pop(&mut stack)?, field, value) {
                    (Value::This, Field::Health, Value::Float(health)) => bush.health = health,
                    _ => return Err(mismatch()),
                }
            }
            OpCode::Call(method) | OpCode::CallVirt(method) => {
                let value = match method {
                    Method::NetValue => match pop(&mut stack)? {
                        Value::NetInt(value) => Value::Int(value),
                        _ => return Err(mismatch()),
                    },
                    Method::IsDestroyable => match pop(&mut stack)? {
                        Value::This => {
                            let view = bush.view(location, origin);
                            let vanilla = vanilla_is_destroyable(&view);
                            Value::Int(i32::from(hooks.is_destroyable(&view, vanilla)))
                        }
                        _ => return Err(mismatch()),
                    },
                    Method::RequiredUpgradeTier => Value::Int(hooks.required_upgrade_tier()),
                    Method::AdjustDamage => {
                        let target = pop(&mut stack)?;
                        match (pop(&mut stack)?, target) {
                            (Value::Float(raw), Value::This) => {
                                Value::Float(hooks.adjust_damage(raw, &bush.view(location, origin)))
                            }
                            _ => return Err(mismatch()),
                        }
                    }
                };
                stack.push(value);
            }
            OpCode::LdcI4(value) => stack.push(Value::Int(value)),
            OpCode::LdcR4(value) => stack.push(Value::Float(value)),
            OpCode::ConvR4 => match pop(&mut stack)? {
                Value::Int(value) => stack.push(Value::Float(value as f32)),
                Value::Float(value) => stack.push(Value::Float(value)),
                _ => return Err(mismatch()),
            },
            OpCode::Pop => {
                let _ = pop(&mut stack)?;
            }
            OpCode::Div | OpCode::Sub => {
                let right = pop(&mut stack)?;
                match (pop(&mut stack)?, right) {
                    (Value::Float(left), Value::Float(right)) => {
                        stack.push(Value::Float(if opcode == OpCode::Div {
                            left / right
                        } else {
                            left - right
                        }));
                    }
                    _ => return Err(mismatch()),
                }
            }
            OpCode::Br(label) => next = jump(&targets, label)?,
            OpCode::BrFalse(label) => match pop(&mut stack)? {
                Value::Int(0) => next = jump(&targets, label)?,
                Value::Int(_) => {}
                _ => return Err(mismatch()),
            },
            OpCode::Beq(label) | OpCode::Bne(label) | OpCode::Blt(label) | OpCode::Bgt(label) => {
                let right = pop(&mut stack)?;
                let ordering = match (pop(&mut stack)?, right) {
                    (Value::Int(left), Value::Int(right)) => left.partial_cmp(&right),
                    (Value::Float(left), Value::Float(right)) => left.partial_cmp(&right),
                    _ => return Err(mismatch()),
                };
                let taken = match opcode {
                    OpCode::Beq(_) => ordering == Some(std::cmp::Ordering::Equal),
                    OpCode::Bne(_) => ordering != Some(std::cmp::Ordering::Equal),
                    OpCode::Blt(_) => ordering == Some(std::cmp::Ordering::Less),
                    _ => ordering == Some(std::cmp::Ordering::Greater),
                };
                if taken {
                    next = jump(&targets, label)?;
                }
            }
            OpCode::Ret => {
                return match pop(&mut stack)? {
                    Value::Int(value) => Ok(value != 0),
                    _ => Err(mismatch()),
                };
            }
        }

        pc = next;
    }

    Err(ExecutionError::StepLimit)
}

fn resolve_labels(listing: &[CodeInstruction]) -> HashMap<Label, usize> {
    let mut targets = HashMap::new();
    for (index, instruction) in listing.iter().enumerate() {
        for label in &instruction.labels {
            let _ = targets.entry(*label).or_insert(index);
        }
    }
    targets
}

fn jump(targets: &HashMap<Label, usize>, label: Label) -> Result<usize, ExecutionError> {
    targets
        .get(&label)
        .copied()
        .ok_or(ExecutionError::UndefinedLabel(label))
}

const fn tool_kind_id(kind: ToolKind) -> i32 {
    match kind {
        ToolKind::Axe => 0,
        ToolKind::Pickaxe => 1,
    }
}
