use std::{ops::Range, time::Duration};

/// Segment numbers addressed by a `SegmentTemplate` with `@startNumber`.
///
/// The segment size is `duration / timescale` in whole seconds and the window
/// holds `window / size` segments. The range starts one window after
/// `start_number`, following the tail of a live sliding window.
///
/// Returns `None` when the segment size rounds down to zero seconds.
pub fn number_range(
    start_number: u64,
    duration: u64,
    timescale: u64,
    window: Duration,
) -> Option<Range<u64>> {
    let segment_size = duration.checked_div(timescale)?;
    let count = window.as_secs().checked_div(segment_size)?;

    let first = start_number.saturating_add(count);
    Some(first..first.saturating_add(count))
}

/// One `S` element of a `SegmentTimeline`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimelineEntry {
    /// `@t`
    pub time: Option<u64>,
    /// `@d`
    pub duration: u64,
    /// `@r`
    pub repeat: Option<i64>,
}

impl From<&dash_mpd::S> for TimelineEntry {
    fn from(s: &dash_mpd::S) -> Self {
        Self {
            time: s.t,
            duration: s.d,
            repeat: s.r,
        }
    }
}

/// Expand timeline entries into segment start times, in document order.
///
/// An entry yields `repeat` timestamps (one when `@r` is absent, none when it
/// is not positive), the first at `@t` and each following one `@d` later. An
/// entry without `@t` continues where the previous entry ended.
pub fn timeline_timestamps<I>(entries: I) -> Vec<u64>
where
    I: IntoIterator<Item = TimelineEntry>,
{
    let mut timestamps = Vec::new();
    let mut next = 0u64;

    for entry in entries {
        let mut time = entry.time.unwrap_or(next);
        let repeat = entry.repeat.map_or(1, |r| r.max(0));
        for _ in 0..repeat {
            timestamps.push(time);
            time = time.saturating_add(entry.duration);
        }
        next = time;
    }

    timestamps
}
