//! Display write requests and their geometry checks.
//!
//! A [`DisplayWrite`] targets a [`Region`] of cells (1-based), carries
//! text with one cell per character, and may add an overlay mask whose
//! dots are ORed onto the glyph the service renders for each cell.

use bitflags::bitflags;

use crate::error::ValidationError;

bitflags! {
    /// Braille dots of one cell.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct Dots: u8 {
        const DOT1 = 0x01;
        const DOT2 = 0x02;
        const DOT3 = 0x04;
        const DOT4 = 0x08;
        const DOT5 = 0x10;
        const DOT6 = 0x20;
        const DOT7 = 0x40;
        const DOT8 = 0x80;
    }
}

/// Display geometry as reported by the service.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DisplaySize {
    pub columns: u32,
    pub rows: u32,
}

impl DisplaySize {
    pub fn cells(&self) -> usize {
        self.columns as usize * self.rows as usize
    }
}

/// A contiguous span of cells. `start` is 1-based.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Region {
    pub start: u32,
    pub len: u32,
}

impl Region {
    pub fn new(start: u32, len: u32) -> Self {
        Self { start, len }
    }

    /// Last cell covered, 1-based.
    pub fn end(&self) -> usize {
        (self.start as usize + self.len as usize).saturating_sub(1)
    }
}

/// Whether a write shows immediately or waits for a later write.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Flush {
    #[default]
    Now,
    Hold,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Cursor {
    /// Keep whatever cursor the display shows.
    #[default]
    Leave,
    /// Hide the cursor.
    Off,
    /// Show the cursor on a cell, 1-based.
    At(u32),
}

// ── DisplayWrite ─────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct DisplayWrite {
    pub(crate) region: Option<Region>,
    pub(crate) text: Option<String>,
    pub(crate) overlay: Option<Vec<Dots>>,
    pub(crate) cursor: Cursor,
    pub(crate) flush: Flush,
}

impl DisplayWrite {
    /// Text for the whole display, starting at the first cell.
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: Some(text.into()),
            ..Default::default()
        }
    }

    /// Text for one region of the display.
    pub fn region(region: Region, text: impl Into<String>) -> Self {
        Self {
            region: Some(region),
            text: Some(text.into()),
            ..Default::default()
        }
    }

    /// Show held writes without changing content.
    pub fn flush() -> Self {
        Self::default()
    }

    /// Add an overlay mask, one entry per text cell.
    pub fn with_overlay(mut self, mask: Vec<Dots>) -> Self {
        self.overlay = Some(mask);
        self
    }

    pub fn with_cursor(mut self, cursor: Cursor) -> Self {
        self.cursor = cursor;
        self
    }

    /// Hold this write until the next flushing write.
    pub fn hold(mut self) -> Self {
        self.flush = Flush::Hold;
        self
    }

    /// Target region; `None` addresses the whole display.
    pub fn target(&self) -> Option<Region> {
        self.region
    }

    pub fn content(&self) -> Option<&str> {
        self.text.as_deref()
    }

    pub fn overlay(&self) -> Option<&[Dots]> {
        self.overlay.as_deref()
    }

    pub fn cursor(&self) -> Cursor {
        self.cursor
    }

    pub fn flush_directive(&self) -> Flush {
        self.flush
    }

    /// Number of cells the text occupies.
    pub fn text_cells(&self) -> Option<usize> {
        self.text.as_ref().map(|t| t.chars().count())
    }

    pub fn is_flush_only(&self) -> bool {
        self.text.is_none()
    }

    /// Check the request against its own invariants and, when known,
    /// the display geometry.
    pub fn validate(&self, display: Option<DisplaySize>) -> Result<(), ValidationError> {
        let text_cells = self.text_cells();
        let cells = display.map(|d| d.cells());

        match (text_cells, &self.overlay) {
            (None, Some(_)) => return Err(ValidationError::MaskWithoutText),
            (Some(text), Some(mask)) if mask.len() != text => {
                return Err(ValidationError::MaskLengthMismatch {
                    text,
                    mask: mask.len(),
                });
            }
            _ => {}
        }

        if text_cells.is_none() && self.flush == Flush::Hold {
            return Err(ValidationError::HoldWithoutText);
        }

        match (self.region, text_cells) {
            (Some(region), _) => {
                if region.len == 0 {
                    return Err(ValidationError::EmptyRegion);
                }
                if region.start == 0 {
                    return Err(ValidationError::RegionStartZero);
                }
                if let Some(text) = text_cells.filter(|&t| t > region.len as usize) {
                    return Err(ValidationError::TextExceedsRegion {
                        text,
                        region: region.len as usize,
                    });
                }
                if let Some(cells) = cells.filter(|&c| region.end() > c) {
                    return Err(ValidationError::RegionOutOfBounds {
                        end: region.end(),
                        cells,
                    });
                }
            }
            (None, Some(text)) => {
                if let Some(cells) = cells.filter(|&c| text > c) {
                    return Err(ValidationError::TextExceedsRegion {
                        text,
                        region: cells,
                    });
                }
            }
            (None, None) => {}
        }

        if let Cursor::At(position) = self.cursor {
            let beyond = cells.is_some_and(|cells| position as usize > cells);
            if position == 0 || beyond {
                return Err(ValidationError::CursorOutOfBounds {
                    position,
                    cells: cells.unwrap_or(0),
                });
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const FORTY: DisplaySize = DisplaySize {
        columns: 40,
        rows: 1,
    };

    #[test]
    fn mask_length_must_match_text() {
        let write = DisplayWrite::region(Region::new(1, 10), "abc").with_overlay(vec![Dots::DOT7; 2]);
        assert_eq!(
            write.validate(None),
            Err(ValidationError::MaskLengthMismatch { text: 3, mask: 2 })
        );
    }

    #[test]
    fn text_counts_cells_not_bytes() {
        let write = DisplayWrite::region(Region::new(1, 3), "äöü").with_overlay(vec![Dots::DOT8; 3]);
        assert_eq!(write.validate(Some(FORTY)), Ok(()));
    }

    #[test]
    fn text_longer_than_region_is_rejected() {
        let write = DisplayWrite::region(Region::new(5, 2), "abc");
        assert_eq!(
            write.validate(None),
            Err(ValidationError::TextExceedsRegion { text: 3, region: 2 })
        );
    }

    #[test]
    fn region_geometry_is_checked() {
        assert_eq!(
            DisplayWrite::region(Region::new(1, 0), "").validate(None),
            Err(ValidationError::EmptyRegion)
        );
        assert_eq!(
            DisplayWrite::region(Region::new(0, 4), "ab").validate(None),
            Err(ValidationError::RegionStartZero)
        );
        assert_eq!(
            DisplayWrite::region(Region::new(30, 20), "ab").validate(Some(FORTY)),
            Err(ValidationError::RegionOutOfBounds { end: 49, cells: 40 })
        );
        // Without geometry the service decides.
        assert_eq!(
            DisplayWrite::region(Region::new(30, 20), "ab").validate(None),
            Ok(())
        );
    }

    #[test]
    fn flush_only_rules() {
        assert_eq!(DisplayWrite::flush().validate(Some(FORTY)), Ok(()));
        assert!(DisplayWrite::flush().is_flush_only());
        assert_eq!(
            DisplayWrite::flush().hold().validate(None),
            Err(ValidationError::HoldWithoutText)
        );
        assert_eq!(
            DisplayWrite::flush().with_overlay(vec![Dots::DOT1]).validate(None),
            Err(ValidationError::MaskWithoutText)
        );
    }

    #[test]
    fn cursor_must_land_on_display() {
        let write = DisplayWrite::text("hi").with_cursor(Cursor::At(41));
        assert_eq!(
            write.validate(Some(FORTY)),
            Err(ValidationError::CursorOutOfBounds {
                position: 41,
                cells: 40
            })
        );
        let write = DisplayWrite::text("hi").with_cursor(Cursor::At(2));
        assert_eq!(write.validate(Some(FORTY)), Ok(()));
    }

    #[test]
    fn whole_display_text_is_bounded() {
        let write = DisplayWrite::text("x".repeat(41));
        assert_eq!(
            write.validate(Some(FORTY)),
            Err(ValidationError::TextExceedsRegion {
                text: 41,
                region: 40
            })
        );
    }
}
