use serde::{Deserialize, Serialize};

use crate::consts::DEFAULT_ROI;

/// A region of interest in frame column/row coordinates.
///
/// Width and height may be negative while the user drags a selection;
/// [`Roi::normalized`] turns such a rectangle into its canonical form.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Roi {
    pub x: i32,
    pub y: i32,
    pub width: i32,
    pub height: i32,
}

impl Default for Roi {
    fn default() -> Self {
        let (x, y, width, height) = DEFAULT_ROI;
        Self {
            x,
            y,
            width,
            height,
        }
    }
}

impl Roi {
    /// Zero-area rectangle at the origin.
    pub const EMPTY: Roi = Roi {
        x: 0,
        y: 0,
        width: 0,
        height: 0,
    };

    pub fn new(x: i32, y: i32, width: i32, height: i32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.width <= 0 || self.height <= 0
    }

    /// Rectangle covering the same span with non-negative width and height.
    pub fn normalized(&self) -> Roi {
        let (x, width) = normalize_span(self.x, self.width);
        let (y, height) = normalize_span(self.y, self.height);
        Roi {
            x,
            y,
            width,
            height,
        }
    }

    /// Intersect the normalized rectangle with `[0, frame_width) x [0, frame_height)`.
    ///
    /// Returns [`Roi::EMPTY`] when the rectangle starts at or beyond the far
    /// edge, or ends before the near edge, on either axis. Otherwise the
    /// intersection is returned, which may have zero width or height.
    pub fn clamp(&self, frame_width: u32, frame_height: u32) -> Roi {
        let r = self.normalized();
        let (Some((x0, x1)), Some((y0, y1))) = (
            clamp_span(r.x, r.width, frame_width),
            clamp_span(r.y, r.height, frame_height),
        ) else {
            return Roi::EMPTY;
        };

        Roi {
            x: x0 as i32,
            y: y0 as i32,
            width: (x1 - x0) as i32,
            height: (y1 - y0) as i32,
        }
    }
}

impl std::fmt::Display for Roi {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}, {}, {}, {}", self.x, self.y, self.width, self.height)
    }
}

fn normalize_span(start: i32, len: i32) -> (i32, i32) {
    if len < 0 {
        (start.saturating_add(len), len.saturating_neg())
    } else {
        (start, len)
    }
}

/// Half-open `[start, end)` of a span clipped to `[0, limit)`, in i64 to
/// keep `start + len` from overflowing. `None` when the span is disjoint
/// from the range.
fn clamp_span(start: i32, len: i32, limit: u32) -> Option<(i64, i64)> {
    let start = i64::from(start);
    let end = start + i64::from(len);
    let limit = i64::from(limit);
    if start >= limit || end < 0 {
        return None;
    }
    Some((start.max(0), end.min(limit)))
}
