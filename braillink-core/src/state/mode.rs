//! Session mode state machine.
//!
//! Models the lifecycle of a client session with validated transitions
//! that return `Result` instead of panicking.

use std::fmt;
use std::time::Instant;

use crate::error::BrlError;

// ── TtySlot ──────────────────────────────────────────────────────

/// The terminal slot a session owns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TtySlot {
    /// A numbered virtual terminal.
    Number(u32),
    /// Whatever terminal the service currently shows.
    Foreground,
}

impl From<Option<u32>> for TtySlot {
    fn from(tty: Option<u32>) -> Self {
        match tty {
            Some(n) => TtySlot::Number(n),
            None => TtySlot::Foreground,
        }
    }
}

impl fmt::Display for TtySlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TtySlot::Number(n) => write!(f, "tty {n}"),
            TtySlot::Foreground => write!(f, "foreground tty"),
        }
    }
}

// ── SessionMode ──────────────────────────────────────────────────

/// The current mode of a client session.
///
/// ```text
///  Connected ──enter_tty──► TtyOwned
///      ▲                       │
///      └───────leave_tty───────┘
///      │                       │
///      └──────► Disconnected ◄─┘
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum SessionMode {
    /// Transport closed. Terminal state.
    #[default]
    Disconnected,

    /// Handshake complete; connection-scoped requests allowed.
    Connected {
        /// When the session entered the `Connected` mode.
        since: Instant,
    },

    /// The session owns a terminal slot.
    TtyOwned { tty: TtySlot, since: Instant },
}

/// [`SessionMode`] without its data, for error reporting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ModeKind {
    Disconnected,
    Connected,
    TtyOwned,
}

impl fmt::Display for ModeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Disconnected => write!(f, "Disconnected"),
            Self::Connected => write!(f, "Connected"),
            Self::TtyOwned => write!(f, "TtyOwned"),
        }
    }
}

impl fmt::Display for SessionMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.kind(), f)
    }
}

impl SessionMode {
    /// A freshly handshaken session.
    pub fn connected() -> Self {
        Self::Connected {
            since: Instant::now(),
        }
    }

    pub fn kind(&self) -> ModeKind {
        match self {
            Self::Disconnected => ModeKind::Disconnected,
            Self::Connected { .. } => ModeKind::Connected,
            Self::TtyOwned { .. } => ModeKind::TtyOwned,
        }
    }

    pub fn is_disconnected(&self) -> bool {
        matches!(self, Self::Disconnected)
    }

    pub fn is_tty_owned(&self) -> bool {
        matches!(self, Self::TtyOwned { .. })
    }

    /// The owned slot, if any.
    pub fn tty(&self) -> Option<TtySlot> {
        match self {
            Self::TtyOwned { tty, .. } => Some(*tty),
            _ => None,
        }
    }

    /// How long the session has been in its current mode.
    ///
    /// Returns `None` once disconnected.
    pub fn duration(&self) -> Option<std::time::Duration> {
        match self {
            Self::Connected { since } | Self::TtyOwned { since, .. } => Some(since.elapsed()),
            Self::Disconnected => None,
        }
    }

    fn refuse(&self, operation: &'static str) -> BrlError {
        BrlError::Mode {
            operation,
            mode: self.kind(),
        }
    }

    // ── Guards ───────────────────────────────────────────────────

    /// Succeeds in `Connected` or `TtyOwned`.
    pub fn require_open(&self, operation: &'static str) -> Result<(), BrlError> {
        match self {
            Self::Disconnected => Err(self.refuse(operation)),
            _ => Ok(()),
        }
    }

    /// Succeeds only in `Connected`.
    pub fn require_connected(&self, operation: &'static str) -> Result<(), BrlError> {
        match self {
            Self::Connected { .. } => Ok(()),
            _ => Err(self.refuse(operation)),
        }
    }

    /// Succeeds only in `TtyOwned`, returning the owned slot.
    pub fn require_tty(&self, operation: &'static str) -> Result<TtySlot, BrlError> {
        match self {
            Self::TtyOwned { tty, .. } => Ok(*tty),
            _ => Err(self.refuse(operation)),
        }
    }

    // ── Transitions ──────────────────────────────────────────────

    /// Transition to `TtyOwned`.
    ///
    /// Valid from: `Connected`.
    pub fn enter_tty(&mut self, tty: TtySlot) -> Result<(), BrlError> {
        self.require_connected("enter tty mode")?;
        *self = Self::TtyOwned {
            tty,
            since: Instant::now(),
        };
        Ok(())
    }

    /// Transition back to `Connected`.
    ///
    /// Valid from: `TtyOwned`.
    pub fn leave_tty(&mut self) -> Result<(), BrlError> {
        self.require_tty("leave tty mode")?;
        *self = Self::connected();
        Ok(())
    }

    /// Force-reset to `Disconnected` regardless of current mode.
    ///
    /// Use this for unrecoverable errors (e.g. I/O failure mid-stream).
    pub fn force_disconnect(&mut self) {
        *self = Self::Disconnected;
    }
}

// ── Tests ────────────────────────────────────────────────────────
