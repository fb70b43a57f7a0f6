//! Key codes delivered by the service and their decomposition.
//!
//! A key code is 64 bits wide:
//!
//! ```text
//!  63            32 31  29 28                16 15               0
//! ┌────────────────┬──────┬────────────────────┬──────────────────┐
//! │     flags      │ type │   command block    │     argument     │
//! └────────────────┴──────┴────────────────────┴──────────────────┘
//! ```
//!
//! Symbol keys (type 0) carry a key symbol in the low 29 bits instead of
//! a command block and argument.

use std::fmt;

use crate::flags::KeyFlags;

pub const KEY_TYPE_MASK: u64 = 0xE000_0000;
pub const KEY_TYPE_SYM: u64 = 0x0000_0000;
pub const KEY_TYPE_CMD: u64 = 0x2000_0000;
pub const KEY_CODE_MASK: u64 = 0x1FFF_FFFF;
pub const KEY_FLAGS_MASK: u64 = 0xFFFF_FFFF_0000_0000;
pub const KEY_FLAGS_SHIFT: u32 = 32;
pub const KEY_CMD_BLK_MASK: u64 = 0x1FFF_0000;
pub const KEY_CMD_BLK_SHIFT: u32 = 16;
pub const KEY_CMD_ARG_MASK: u64 = 0xFFFF;
pub const KEY_SYM_UNICODE: u64 = 0x0100_0000;

// ── KeyCode ──────────────────────────────────────────────────────

/// A raw 64-bit key code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct KeyCode(pub u64);

impl KeyCode {
    /// A braille command in `block` with `argument`.
    pub const fn command(block: u32, argument: u32) -> Self {
        Self(
            KEY_TYPE_CMD
                | (((block as u64) << KEY_CMD_BLK_SHIFT) & KEY_CMD_BLK_MASK)
                | (argument as u64 & KEY_CMD_ARG_MASK),
        )
    }

    /// A key symbol as numbered by the platform key-symbol table.
    pub const fn symbol(keysym: u32) -> Self {
        Self(KEY_TYPE_SYM | (keysym as u64 & KEY_CODE_MASK))
    }

    /// A key symbol for a Unicode character.
    pub const fn unicode(c: char) -> Self {
        Self(KEY_TYPE_SYM | KEY_SYM_UNICODE | c as u64)
    }

    /// The same key with modifier `flags` added.
    pub const fn with_flags(self, flags: KeyFlags) -> Self {
        Self(self.0 | ((flags.bits() as u64) << KEY_FLAGS_SHIFT))
    }

    pub fn value(self) -> u64 {
        self.0
    }

    pub fn key_type(self) -> KeyType {
        KeyType::from_bits(self.0 & KEY_TYPE_MASK)
    }

    pub fn flags(self) -> KeyFlags {
        KeyFlags::from_bits_retain(((self.0 & KEY_FLAGS_MASK) >> KEY_FLAGS_SHIFT) as u32)
    }

    /// Number of low bits that hold the argument rather than the
    /// command identity.
    pub fn argument_width(self) -> u32 {
        let code = self.0 & KEY_CODE_MASK;
        match self.key_type() {
            KeyType::Command => {
                if code & KEY_CMD_BLK_MASK == 0 {
                    0
                } else {
                    16
                }
            }
            KeyType::Symbol => match code & 0x1F00_0000 {
                0x0000_0000 if code & 0x00FF_FF00 == 0 => 8,
                KEY_SYM_UNICODE => 24,
                _ => 0,
            },
            KeyType::Other(_) => 0,
        }
    }

    pub fn argument_mask(self) -> u64 {
        (1u64 << self.argument_width()) - 1
    }
}

impl From<u64> for KeyCode {
    fn from(value: u64) -> Self {
        Self(value)
    }
}

impl fmt::Display for KeyCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#x}", self.0)
    }
}

// ── KeyType ──────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum KeyType {
    /// A keyboard key symbol.
    Symbol,
    /// A braille command.
    Command,
    /// A type tag this client does not know.
    Other(u8),
}

impl KeyType {
    fn from_bits(bits: u64) -> Self {
        match bits {
            KEY_TYPE_SYM => KeyType::Symbol,
            KEY_TYPE_CMD => KeyType::Command,
            other => KeyType::Other((other >> 29) as u8),
        }
    }

    pub fn bits(self) -> u64 {
        match self {
            KeyType::Symbol => KEY_TYPE_SYM,
            KeyType::Command => KEY_TYPE_CMD,
            KeyType::Other(tag) => ((tag as u64) << 29) & KEY_TYPE_MASK,
        }
    }
}

// ── KeyEvent ─────────────────────────────────────────────────────

/// A key event split into its fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeyEvent {
    pub code: KeyCode,
    pub kind: KeyType,
    /// Command (or key symbol) identity with the argument stripped.
    pub command: u32,
    pub argument: u32,
    pub flags: KeyFlags,
}

impl KeyEvent {
    pub fn expand(code: KeyCode) -> Self {
        let argument_mask = code.argument_mask();
        let bare = code.0 & KEY_CODE_MASK;
        Self {
            code,
            kind: code.key_type(),
            command: (bare & !argument_mask) as u32,
            argument: (bare & argument_mask) as u32,
            flags: code.flags(),
        }
    }
}

impl fmt::Display for KeyEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Key {} ({:x} {:x} {:x} {:x})",
            self.code.0,
            self.kind.bits(),
            self.command,
            self.argument,
            self.flags.bits()
        )
    }
}

// ── Tables ───────────────────────────────────────────────────────

/// Braille commands in block 0. The argument carries the command
/// number, so these keys have no separate argument.
pub mod commands {
    use super::KeyCode;

    pub const NOOP: KeyCode = KeyCode::command(0, 0);
    pub const LNUP: KeyCode = KeyCode::command(0, 1);
    pub const LNDN: KeyCode = KeyCode::command(0, 2);
    pub const WINUP: KeyCode = KeyCode::command(0, 3);
    pub const WINDN: KeyCode = KeyCode::command(0, 4);
    pub const TOP: KeyCode = KeyCode::command(0, 9);
    pub const BOT: KeyCode = KeyCode::command(0, 10);
    pub const FWINLT: KeyCode = KeyCode::command(0, 23);
    pub const FWINRT: KeyCode = KeyCode::command(0, 24);
    pub const LNBEG: KeyCode = KeyCode::command(0, 27);
    pub const LNEND: KeyCode = KeyCode::command(0, 28);
    pub const HOME: KeyCode = KeyCode::command(0, 29);
    pub const BACK: KeyCode = KeyCode::command(0, 30);
    pub const RETURN: KeyCode = KeyCode::command(0, 31);

    /// Route the cursor to the cell given as argument.
    pub const fn route(cell: u32) -> KeyCode {
        KeyCode::command(1, cell)
    }
}

/// Numeric identifiers of common key symbols.
pub mod keysym {
    use super::KeyCode;

    pub const BACKSPACE: KeyCode = KeyCode::symbol(0xFF08);
    pub const TAB: KeyCode = KeyCode::symbol(0xFF09);
    pub const LINEFEED: KeyCode = KeyCode::symbol(0xFF0A);
    pub const RETURN: KeyCode = KeyCode::symbol(0xFF0D);
    pub const ESCAPE: KeyCode = KeyCode::symbol(0xFF1B);
    pub const HOME: KeyCode = KeyCode::symbol(0xFF50);
    pub const LEFT: KeyCode = KeyCode::symbol(0xFF51);
    pub const UP: KeyCode = KeyCode::symbol(0xFF52);
    pub const RIGHT: KeyCode = KeyCode::symbol(0xFF53);
    pub const DOWN: KeyCode = KeyCode::symbol(0xFF54);
    pub const DELETE: KeyCode = KeyCode::symbol(0xFFFF);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn command_codes_match_wire_layout() {
        assert_eq!(commands::HOME.0, 0x2000_001D);
        assert_eq!(commands::route(5).0, 0x2001_0005);
        assert_eq!(keysym::TAB.0, 0xFF09);
    }

    #[test]
    fn expand_block_zero_command() {
        let event = KeyEvent::expand(commands::WINUP);
        assert_eq!(event.kind, KeyType::Command);
        assert_eq!(event.command, 3);
        assert_eq!(event.argument, 0);
        assert!(event.flags.is_empty());
    }

    #[test]
    fn expand_command_with_argument() {
        let event = KeyEvent::expand(commands::route(12).with_flags(KeyFlags::SHIFT));
        assert_eq!(event.command, 0x0001_0000);
        assert_eq!(event.argument, 12);
        assert_eq!(event.flags, KeyFlags::SHIFT);
    }

    #[test]
    fn expand_symbols() {
        let tab = KeyEvent::expand(keysym::TAB);
        assert_eq!(tab.kind, KeyType::Symbol);
        assert_eq!(tab.command, 0xFF09);
        assert_eq!(tab.argument, 0);

        let latin = KeyEvent::expand(KeyCode::symbol(b'a' as u32));
        assert_eq!(latin.command, 0);
        assert_eq!(latin.argument, 0x61);

        let unicode = KeyEvent::expand(KeyCode::unicode('é'));
        assert_eq!(unicode.command, KEY_SYM_UNICODE as u32);
        assert_eq!(unicode.argument, 'é' as u32);
    }

    #[test]
    fn flags_survive_expansion() {
        let code = keysym::TAB.with_flags(KeyFlags::CONTROL | KeyFlags::META);
        assert_eq!(code.flags(), KeyFlags::CONTROL | KeyFlags::META);
        assert_eq!(code.key_type(), KeyType::Symbol);
    }

    #[test]
    fn display_matches_probe_output() {
        let event = KeyEvent::expand(commands::HOME);
        assert_eq!(event.to_string(), "Key 536870941 (20000000 1d 0 0)");
    }
}
