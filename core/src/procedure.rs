//! Instruction listing of the host's compiled procedures.
//!
//! The host ships its bush logic as a flat list of stack-machine
//! instructions. Jump targets are labels attached to instructions, so
//! inserting or replacing instructions never invalidates a branch as long as
//! the labels move with them.

use std::fmt;

/// Jump target attached to an instruction.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Label(u32);

impl Label {
    /// Creates a label with the provided identifier.
    #[must_use]
    pub const fn new(id: u32) -> Self {
        Self(id)
    }

    /// Numeric identifier of the label.
    #[must_use]
    pub const fn get(&self) -> u32 {
        self.0
    }
}

/// Arguments available to a procedure.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Arg {
    /// The bush the procedure runs on.
    This,
    /// The tool being swung.
    Tool,
}

/// Fields the procedure reads or writes.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Field {
    /// Bush size id, stored as a networked integer.
    Size,
    /// Bush health, a plain float.
    Health,
    /// Tool upgrade tier, stored as a networked integer.
    UpgradeLevel,
    /// Kind of tool, stored as an integer (0 for axes).
    ToolKind,
}

/// Methods a procedure can call.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Method {
    /// Implicit conversion from a networked integer to its value.
    NetValue,
    /// Host check deciding whether the bush may be damaged at all.
    IsDestroyable,
    /// Extension point: axe upgrades required to damage the bush.
    RequiredUpgradeTier,
    /// Extension point: adjusts raw strike damage for the bush on the stack.
    AdjustDamage,
}

/// Operation performed by a single instruction.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum OpCode {
    /// Pushes an argument.
    LdArg(Arg),
    /// Pops an object and pushes one of its fields.
    LdFld(Field),
    /// Pops a value and an object, storing the value into the field.
    StFld(Field),
    /// Calls a method with a direct call.
    Call(Method),
    /// Calls a method through virtual dispatch.
    CallVirt(Method),
    /// Pushes a 32-bit integer constant.
    LdcI4(i32),
    /// Pushes a 32-bit float constant.
    LdcR4(f32),
    /// Converts the top of the stack to a float.
    ConvR4,
    /// Discards the top of the stack.
    Pop,
    /// Divides the two topmost values.
    Div,
    /// Subtracts the topmost value from the one beneath it.
    Sub,
    /// Unconditional jump.
    Br(Label),
    /// Jumps when the popped value is zero or false.
    BrFalse(Label),
    /// Jumps when the two popped values are equal.
    Beq(Label),
    /// Jumps when the two popped values differ.
    Bne(Label),
    /// Jumps when the lower value is less than the upper one.
    Blt(Label),
    /// Jumps when the lower value is greater than the upper one.
    Bgt(Label),
    /// Returns the top of the stack.
    Ret,
}

impl OpCode {
    /// Label targeted by the instruction, if it is a branch.
    #[must_use]
    pub const fn branch_target(&self) -> Option<Label> {
        match self {
            Self::Br(label)
            | Self::BrFalse(label)
            | Self::Beq(label)
            | Self::Bne(label)
            | Self::Blt(label)
            | Self::Bgt(label) => Some(*label),
            _ => None,
        }
    }

    /// Whether the instruction calls the provided method by either call form.
    #[must_use]
    pub fn calls(&self, method: Method) -> bool {
        matches!(self, Self::Call(called) | Self::CallVirt(called) if *called == method)
    }
}

/// One instruction together with the labels that jump to it.
#[derive(Clone, Debug, PartialEq)]
pub struct CodeInstruction {
    /// Operation performed.
    pub opcode: OpCode,
    /// Labels defined at this instruction.
    pub labels: Vec<Label>,
}

impl CodeInstruction {
    /// Creates an unlabeled instruction.
    #[must_use]
    pub const fn new(opcode: OpCode) -> Self {
        Self {
            opcode,
            labels: Vec::new(),
        }
    }

    /// Attaches a label to the instruction.
    #[must_use]
    pub fn labeled(mut self, label: Label) -> Self {
        self.labels.push(label);
        self
    }
}

impl From<OpCode> for CodeInstruction {
    fn from(opcode: OpCode) -> Self {
        Self::new(opcode)
    }
}

impl fmt::Display for CodeInstruction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for label in &self.labels {
            write!(f, "L{}: ", label.get())?;
        }
        write!(f, "{:?}", self.opcode)
    }
}
