//! Key filter registry: which key events reach the client.
//!
//! Each directive turns its keys into ranges of key codes. A range
//! constrains the low 32 bits to `[first, last]` and treats the flag
//! halves as masks: flags set in `first` are required, flags clear in
//! `last` are forbidden.
//!
//! When several ranges contain a key, the one with the smallest extent
//! decides; between equal extents the later registration wins. Keys no
//! range contains are accepted.

use crate::error::ValidationError;
use crate::key::{KEY_CODE_MASK, KEY_FLAGS_MASK, KEY_TYPE_CMD, KEY_TYPE_SYM, KeyCode};

/// Key ranges that fit in one `AcceptKeyRanges`/`IgnoreKeyRanges` packet.
pub const MAX_RANGES_PER_PACKET: usize = crate::packet::MAX_PAYLOAD_SIZE / KeyRange::WIRE_SIZE;

const LOW_MASK: u64 = 0xFFFF_FFFF;

// ── Directive parts ──────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Disposition {
    Accept,
    Ignore,
}

/// How a directive's keys widen into ranges.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FilterCategory {
    /// Every key, whatever keys are listed.
    All,
    /// Every key of the same type.
    Type,
    /// The same command with any argument and any flags.
    Command,
    /// The same key with any flags.
    Key,
    /// Exactly the listed code, flags included.
    Code,
}

/// The keys a directive applies to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KeySelector {
    /// Every key the category can describe.
    Any,
    Codes(Vec<KeyCode>),
}

impl From<Vec<KeyCode>> for KeySelector {
    fn from(codes: Vec<KeyCode>) -> Self {
        KeySelector::Codes(codes)
    }
}

impl From<&[KeyCode]> for KeySelector {
    fn from(codes: &[KeyCode]) -> Self {
        KeySelector::Codes(codes.to_vec())
    }
}

impl<const N: usize> From<[KeyCode; N]> for KeySelector {
    fn from(codes: [KeyCode; N]) -> Self {
        KeySelector::Codes(codes.to_vec())
    }
}

impl From<KeyCode> for KeySelector {
    fn from(code: KeyCode) -> Self {
        KeySelector::Codes(vec![code])
    }
}

// ── KeyRange ─────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct KeyRange {
    pub first: u64,
    pub last: u64,
}

impl KeyRange {
    /// Encoded size: two big-endian `u64`s.
    pub const WIRE_SIZE: usize = 16;

    /// Every key code.
    pub const FULL: KeyRange = KeyRange {
        first: 0,
        last: u64::MAX,
    };

    /// Range covering every code that agrees with `code` outside `mask`.
    pub fn masked(code: u64, mask: u64) -> Self {
        Self {
            first: code & !mask,
            last: code | mask,
        }
    }

    fn of_type(type_bits: u64) -> Self {
        Self::masked(type_bits, KEY_CODE_MASK | KEY_FLAGS_MASK)
    }

    /// The range one key of a directive widens to.
    pub fn for_key(category: FilterCategory, code: KeyCode) -> Self {
        match category {
            FilterCategory::All => Self::FULL,
            FilterCategory::Type => {
                Self::masked(code.0 & !KEY_FLAGS_MASK, KEY_CODE_MASK | KEY_FLAGS_MASK)
            }
            FilterCategory::Command => Self::masked(code.0, code.argument_mask() | KEY_FLAGS_MASK),
            FilterCategory::Key => Self::masked(code.0, KEY_FLAGS_MASK),
            FilterCategory::Code => Self::masked(code.0, 0),
        }
    }

    /// The range a wildcard selector covers in `category`.
    pub fn any_in(category: FilterCategory) -> Self {
        match category {
            FilterCategory::Command => Self::of_type(KEY_TYPE_CMD),
            FilterCategory::Key => Self::of_type(KEY_TYPE_SYM),
            FilterCategory::All | FilterCategory::Type | FilterCategory::Code => Self::FULL,
        }
    }

    pub fn contains(&self, code: KeyCode) -> bool {
        let low = code.0 & LOW_MASK;
        let flags = code.0 >> 32;
        let required = self.first >> 32;
        let allowed = self.last >> 32;

        (self.first & LOW_MASK) <= low
            && low <= (self.last & LOW_MASK)
            && flags & required == required
            && flags & !allowed == 0
    }

    /// Size of the range: code span first, then free flag bits.
    pub fn extent(&self) -> (u64, u32) {
        let span = (self.last & LOW_MASK).saturating_sub(self.first & LOW_MASK);
        let free = ((self.last >> 32) & !(self.first >> 32)).count_ones();
        (span, free)
    }

    pub fn is_full(&self) -> bool {
        *self == Self::FULL
    }
}

// ── FilterDirective ──────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilterDirective {
    disposition: Disposition,
    category: FilterCategory,
    ranges: Vec<KeyRange>,
}

impl FilterDirective {
    pub fn new(
        disposition: Disposition,
        category: FilterCategory,
        keys: KeySelector,
    ) -> Result<Self, ValidationError> {
        let ranges = match (category, keys) {
            (_, KeySelector::Any) => vec![KeyRange::any_in(category)],
            (_, KeySelector::Codes(codes)) if codes.is_empty() => {
                return Err(ValidationError::EmptyKeySet);
            }
            (FilterCategory::All, KeySelector::Codes(_)) => vec![KeyRange::FULL],
            (_, KeySelector::Codes(codes)) => codes
                .into_iter()
                .map(|code| KeyRange::for_key(category, code))
                .collect(),
        };
        Ok(Self {
            disposition,
            category,
            ranges,
        })
    }

    pub fn disposition(&self) -> Disposition {
        self.disposition
    }

    pub fn category(&self) -> FilterCategory {
        self.category
    }

    pub fn ranges(&self) -> &[KeyRange] {
        &self.ranges
    }
}

// ── FilterRegistry ───────────────────────────────────────────────

/// Directives registered on a session while it owns a TTY.
#[derive(Debug, Default, Clone)]
pub struct FilterRegistry {
    directives: Vec<FilterDirective>,
}

impl FilterRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, directive: FilterDirective) {
        self.directives.push(directive);
    }

    pub fn clear(&mut self) {
        self.directives.clear();
    }

    pub fn is_empty(&self) -> bool {
        self.directives.is_empty()
    }

    pub fn len(&self) -> usize {
        self.directives.len()
    }

    pub fn directives(&self) -> &[FilterDirective] {
        &self.directives
    }

    /// All ranges, broadest first. Equal extents keep registration order.
    pub fn ordered_ranges(&self) -> Vec<(Disposition, KeyRange)> {
        let mut ranges: Vec<(Disposition, KeyRange)> = self
            .directives
            .iter()
            .flat_map(|d| d.ranges.iter().map(move |r| (d.disposition, *r)))
            .collect();
        ranges.sort_by(|a, b| b.1.extent().cmp(&a.1.extent()));
        ranges
    }

    pub fn evaluate(&self, code: KeyCode) -> Disposition {
        self.ordered_ranges()
            .iter()
            .rev()
            .find(|(_, range)| range.contains(code))
            .map(|(disposition, _)| *disposition)
            .unwrap_or(Disposition::Accept)
    }

    pub fn accepts(&self, code: KeyCode) -> bool {
        self.evaluate(code) == Disposition::Accept
    }

    /// Requests that bring a service applying "last range wins" to the
    /// same decisions as [`evaluate`](Self::evaluate).
    ///
    /// Starts with an accept-everything reset unless the broadest range
    /// already covers every key.
    pub fn replay_plan(&self) -> Vec<(Disposition, Vec<KeyRange>)> {
        let ordered = self.ordered_ranges();
        let mut plan: Vec<(Disposition, Vec<KeyRange>)> = Vec::new();

        if !ordered.first().is_some_and(|(_, r)| r.is_full()) {
            plan.push((Disposition::Accept, vec![KeyRange::FULL]));
        }

        for (disposition, range) in ordered {
            match plan.last_mut() {
                Some((last, ranges))
                    if *last == disposition && ranges.len() < MAX_RANGES_PER_PACKET =>
                {
                    ranges.push(range);
                }
                _ => plan.push((disposition, vec![range])),
            }
        }
        plan
    }
}
