//! Combining two patterns by structure: one side provides the rhythm, the
//! other the values.

use crate::{Event, Pattern, TimeSpan, VoiceData};

/// Which side provides the rhythm in [`keep_if`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeepMode {
    /// The source keeps its own rhythm; the other pattern is sampled at each
    /// source event's midpoint to decide whether the event survives.
    In,
    /// The other pattern provides the rhythm; source events are clipped into
    /// its windows.
    Out,
}

/// A structure event opens a window when its note is `"x"` or its value is
/// otherwise truthy.
fn opens_window(data: &VoiceData) -> bool {
    if data.note.as_deref() == Some("x") {
        return true;
    }
    data.is_truthy()
}

/// Sample `pattern` at a point: the event whose part contains `at`, searched
/// within `within`.
fn sample_at(
    pattern: &Pattern,
    within: TimeSpan,
    at: crate::Fraction,
    ctx: &crate::QueryContext,
) -> Option<Event> {
    pattern
        .query_span(within, ctx)
        .into_iter()
        .find(|e| e.part.contains(at) || (e.part.is_empty() && e.part.begin == at))
}

/// Give `source` the rhythm of `structure`: each window of `structure`
/// re-queries the source and clips it in, the window becoming the whole.
pub fn struct_with(source: &Pattern, structure: &Pattern) -> Pattern {
    keep_if(source, structure, KeepMode::Out, true)
}

/// Keep source events where `other` is truthy, sampled at event midpoints.
pub fn mask(source: &Pattern, other: &Pattern) -> Pattern {
    keep_if(source, other, KeepMode::In, true)
}

pub fn keep_if(
    source: &Pattern,
    other: &Pattern,
    mode: KeepMode,
    filter_by_truthiness: bool,
) -> Pattern {
    let source = source.clone();
    let other = other.clone();
    match mode {
        KeepMode::Out => Pattern::new(move |span, ctx| {
            let mut events = Vec::new();
            for window in other.query_span(span, ctx) {
                if filter_by_truthiness && !opens_window(&window.data) {
                    continue;
                }
                for e in source.query_span(window.whole_or_part(), ctx) {
                    if let Some(part) = window.part.overlap(&e.part) {
                        events.push(Event::new(window.whole, part, e.data));
                    }
                }
            }
            events
        }),
        KeepMode::In => Pattern::new(move |span, ctx| {
            source
                .query_span(span, ctx)
                .into_iter()
                .filter(|e| {
                    let mid = e.part.midpoint();
                    match sample_at(&other, e.part, mid, ctx) {
                        Some(sample) => !filter_by_truthiness || sample.data.is_truthy(),
                        None => false,
                    }
                })
                .collect()
        }),
    }
}

impl Pattern {
    /// See [`struct_with`].
    pub fn struct_pattern(&self, structure: &Pattern) -> Pattern {
        struct_with(self, structure)
    }

    /// See [`mask`].
    pub fn mask(&self, other: &Pattern) -> Pattern {
        mask(self, other)
    }
}
