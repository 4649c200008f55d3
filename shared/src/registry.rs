//! Static command tables
//!
//! Two read-only mappings: every tap command name to the single frame it sends,
//! and the subset of names that can also be held to a code that is re-sent
//! until the hold is released.

/// Bitmask identifying one actuator action
pub type CommandCode = u32;

pub const CMD_HEAD_UP: CommandCode = 0x10;
pub const CMD_HEAD_DOWN: CommandCode = 0x20;
pub const CMD_BACK_TILT_UP: CommandCode = 0x1;
pub const CMD_BACK_TILT_DOWN: CommandCode = 0x2;
pub const CMD_LEG_UP: CommandCode = 0x4;
pub const CMD_LEG_DOWN: CommandCode = 0x8;
pub const CMD_SIT: CommandCode = 0x8000;
pub const CMD_ZERO_G: CommandCode = 0x1000;
pub const CMD_VIBRATE_HEAD: CommandCode = 0x100;
pub const CMD_VIBRATE_FEET: CommandCode = 0x400;
pub const CMD_FLAT: CommandCode = 0x0800_0000;

/// Payload prefix requesting a hold
pub const CONTINUOUS_PREFIX: &str = "start_";

/// A tap action: one frame, sent once
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OneShotAction {
    pub name: &'static str,
    pub code: CommandCode,
    /// Human-readable label used in logs
    pub description: &'static str,
}

const fn action(name: &'static str, code: CommandCode, description: &'static str) -> OneShotAction {
    OneShotAction {
        name,
        code,
        description,
    }
}

pub const ONE_SHOT_COMMANDS: &[OneShotAction] = &[
    action("head_up", CMD_HEAD_UP, "Head up"),
    action("head_down", CMD_HEAD_DOWN, "Head down"),
    action("back_up", CMD_BACK_TILT_UP, "Back up"),
    action("back_down", CMD_BACK_TILT_DOWN, "Back down"),
    action("leg_up", CMD_LEG_UP, "Leg up"),
    action("leg_down", CMD_LEG_DOWN, "Leg down"),
    action("sit", CMD_SIT, "Sitting"),
    action("zero_g", CMD_ZERO_G, "Zero-G"),
    action("flat", CMD_FLAT, "Flat"),
    action("vibrate_head", CMD_VIBRATE_HEAD, "Vibrate head"),
    action("vibrate_feet", CMD_VIBRATE_FEET, "Vibrate feet"),
];

pub const CONTINUOUS_COMMANDS: &[(&str, CommandCode)] = &[
    ("head_up", CMD_HEAD_UP),
    ("head_down", CMD_HEAD_DOWN),
    ("back_up", CMD_BACK_TILT_UP),
    ("back_down", CMD_BACK_TILT_DOWN),
    ("leg_up", CMD_LEG_UP),
    ("leg_down", CMD_LEG_DOWN),
];

/// Look up a tap command by exact name
pub fn resolve_one_shot(name: &str) -> Option<OneShotAction> {
    ONE_SHOT_COMMANDS.iter().find(|a| a.name == name).copied()
}

/// Look up the code for a holdable command
pub fn resolve_continuous(name: &str) -> Option<CommandCode> {
    CONTINUOUS_COMMANDS
        .iter()
        .find(|(n, _)| *n == name)
        .map(|&(_, code)| code)
}
