//! Tempo, shift, and compression transforms.
//!
//! Scaled arcs suppress events narrower than 1e-7 of a cycle: factors that
//! round-tripped through f64 can land a hair off an exact boundary and pull
//! in a sliver of the neighboring event. The floor is a property of the
//! engine, shared with the sequence combinator.

use crate::combinators::silence;
use crate::{ControlValue, Event, Fraction, Pattern, TimeSpan};

const WIDTH_FLOOR: f64 = 1e-7;

fn drop_slivers(events: Vec<Event>) -> Vec<Event> {
    events
        .into_iter()
        .filter(|e| e.part.duration().to_f64() >= WIDTH_FLOOR)
        .collect()
}

fn tempo_static(source: &Pattern, factor: Fraction, invert: bool) -> Pattern {
    let scale = if invert {
        factor
    } else {
        factor.max(Fraction::from_f64(0.001)).reciprocal()
    };
    if scale.is_zero() || scale.is_negative() {
        return silence();
    }

    let inner = source.clone();
    Pattern::new(move |span, ctx| {
        let scaled = TimeSpan::new(span.begin * scale, span.end * scale);
        let events = inner
            .query_span(scaled, ctx)
            .into_iter()
            .filter_map(|e| {
                e.with_span(|ts| TimeSpan::new(ts.begin / scale, ts.end / scale))
                    .clip_to(&span)
            })
            .collect();
        drop_slivers(events)
    })
}

/// Scale a pattern's tempo. `invert` selects the fast direction (the factor
/// multiplies the query time); the direct direction divides, guarded away
/// from zero.
pub fn tempo(source: &Pattern, factor: ControlValue, invert: bool) -> Pattern {
    match factor {
        ControlValue::Static(f) => tempo_static(source, f, invert),
        ControlValue::Pattern(_) => {
            let inner = source.clone();
            Pattern::new(move |span, ctx| {
                let mut events = Vec::new();
                for (window, f) in factor.sample(span, ctx) {
                    let scaled = tempo_static(&inner, f, invert);
                    events.extend(
                        scaled
                            .query_span(window, ctx)
                            .into_iter()
                            .filter_map(|e| e.clip_to(&window)),
                    );
                }
                events
            })
        }
    }
}

fn shift_static(source: &Pattern, delta: Fraction) -> Pattern {
    source
        .with_query_time(move |t| t - delta)
        .with_event_time(move |t| t + delta)
}

/// Shift in time: the output at `t` reads the source at `t - factor*offset`.
/// With a pattern offset each sampled window shifts by its own amount and
/// events are clipped to the window that chose them.
pub fn shift_time(source: &Pattern, offset: ControlValue, factor: Fraction) -> Pattern {
    match offset {
        ControlValue::Static(o) => shift_static(source, factor * o),
        ControlValue::Pattern(_) => {
            let inner = source.clone();
            Pattern::new(move |span, ctx| {
                let mut events = Vec::new();
                for (window, o) in offset.sample(span, ctx) {
                    let shifted = shift_static(&inner, factor * o);
                    events.extend(
                        shifted
                            .query_span(window, ctx)
                            .into_iter()
                            .filter_map(|e| e.clip_to(&window)),
                    );
                }
                events
            })
        }
    }
}

/// Squeeze each cycle's content into the window `[cycle+start, cycle+end)`.
/// Outside `0 <= start < end <= 1` nothing is emitted.
pub fn compress(source: &Pattern, start: Fraction, end: Fraction) -> Pattern {
    if start >= end
        || start.is_negative()
        || end.is_negative()
        || start > Fraction::ONE
        || end > Fraction::ONE
    {
        return silence();
    }
    let size = end - start;

    let inner = source.clone();
    Pattern::new(move |span, ctx| {
        let mut events = Vec::new();
        for piece in crate::cycle_pieces(span) {
            if piece.is_empty() {
                continue;
            }
            let cycle = piece.begin.floor();
            let window = TimeSpan::new(cycle + start, cycle + end);
            let isect = match piece.overlap(&window) {
                Some(s) => s,
                None => continue,
            };
            let inner_span = TimeSpan::new(
                (isect.begin - window.begin) / size + cycle,
                (isect.end - window.begin) / size + cycle,
            );
            events.extend(inner.query_span(inner_span, ctx).into_iter().map(|e| {
                e.with_span(|ts| {
                    TimeSpan::new(
                        (ts.begin - cycle) * size + window.begin,
                        (ts.end - cycle) * size + window.begin,
                    )
                })
            }));
        }
        events
    })
}

/// Play each cycle's content in `1/factor` of the cycle, leaving a gap.
/// Factors below 1 are treated as 1.
pub fn fast_gap(source: &Pattern, factor: Fraction) -> Pattern {
    let factor = factor.max(Fraction::ONE);
    compress(source, Fraction::ZERO, factor.reciprocal())
}

impl Pattern {
    /// Speed up by `factor`.
    pub fn fast(&self, factor: impl Into<ControlValue>) -> Pattern {
        tempo(self, factor.into(), true)
    }

    /// Slow down by `factor`.
    pub fn slow(&self, factor: impl Into<ControlValue>) -> Pattern {
        tempo(self, factor.into(), false)
    }

    /// Like `fast`, also multiplying each event's `speed` control.
    pub fn hurry(&self, factor: f64) -> Pattern {
        self.fast(factor).map_data(move |d| {
            let mut d = d.clone();
            d.speed = Some(d.speed.unwrap_or(1.0) * factor);
            d
        })
    }

    /// Nudge earlier by `amount` cycles.
    pub fn early(&self, amount: impl Into<ControlValue>) -> Pattern {
        shift_time(self, amount.into(), -Fraction::ONE)
    }

    /// Nudge later by `amount` cycles.
    pub fn late(&self, amount: impl Into<ControlValue>) -> Pattern {
        shift_time(self, amount.into(), Fraction::ONE)
    }

    pub fn compress(&self, start: impl Into<Fraction>, end: impl Into<Fraction>) -> Pattern {
        compress(self, start.into(), end.into())
    }

    pub fn fast_gap(&self, factor: impl Into<Fraction>) -> Pattern {
        fast_gap(self, factor.into())
    }

    /// Speed up into the window `[start, end)` of each cycle while keeping
    /// the original absolute timing inside the window.
    pub fn focus(&self, start: impl Into<Fraction>, end: impl Into<Fraction>) -> Pattern {
        let start = start.into();
        let end = end.into();
        if end <= start {
            return silence();
        }
        self.early(start.floor())
            .fast((end - start).reciprocal())
            .late(start)
    }

    /// Stretch the fragment `[start, end)` of every cycle to fill the cycle.
    pub fn zoom(&self, start: impl Into<Fraction>, end: impl Into<Fraction>) -> Pattern {
        let start = start.into();
        let end = end.into();
        if end <= start {
            return silence();
        }
        self.early(start).fast(end - start)
    }

    /// Each output cycle `c` plays source cycle `⌊c/n⌋`.
    pub fn repeat_cycles(&self, n: i64) -> Pattern {
        if n <= 1 {
            return self.clone();
        }
        let inner = self.clone();
        let n = Fraction::from_int(n);
        Pattern::new(move |span, ctx| {
            let cycle = span.begin.floor();
            let delta = cycle - (cycle / n).floor();
            inner
                .query_span(TimeSpan::new(span.begin - delta, span.end - delta), ctx)
                .into_iter()
                .map(|e| e.with_span(|ts| ts.shift(delta)))
                .collect()
        })
        .split_queries()
    }

    /// Mirror each cycle's events around its midpoint.
    pub fn rev(&self) -> Pattern {
        let inner = self.clone();
        Pattern::new(move |span, ctx| {
            let cycle = span.begin.floor();
            let mirror = cycle + cycle + Fraction::ONE;
            let reflected = TimeSpan::new(mirror - span.end, mirror - span.begin);
            let mut events: Vec<Event> = inner
                .query_span(reflected, ctx)
                .into_iter()
                .map(|e| e.with_span(|ts| TimeSpan::new(mirror - ts.end, mirror - ts.begin)))
                .collect();
            crate::event::sort_by_part(&mut events);
            events
        })
        .split_queries()
    }

    /// Reverse over a window of `n` cycles rather than one.
    pub fn rev_cycles(&self, n: i64) -> Pattern {
        if n <= 1 {
            return self.rev();
        }
        let f = Fraction::from_int(n);
        self.fast(f).rev().slow(f)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::combinators::{note, sequence};
    use crate::QueryContext;

    fn ctx() -> QueryContext {
        QueryContext::new()
    }

    fn q(p: &Pattern, from: f64, to: f64) -> Vec<Event> {
        p.query_arc(Fraction::from_f64(from), Fraction::from_f64(to), &ctx())
    }

    fn notes(events: &[Event]) -> Vec<&str> {
        events
            .iter()
            .map(|e| e.data.note.as_deref().unwrap_or("?"))
            .collect()
    }

    #[test]
    fn fast_doubles_frequency() {
        let p = sequence(vec![note("a"), note("b")]).fast(2.0);
        let events = q(&p, 0.0, 1.0);
        assert_eq!(events.len(), 4);
        assert_eq!(notes(&events), vec!["a", "b", "a", "b"]);
        assert_eq!(events[0].part, TimeSpan::from_floats(0.0, 0.25));
        assert_eq!(events[1].part, TimeSpan::from_floats(0.25, 0.5));
        assert_eq!(events[2].part, TimeSpan::from_floats(0.5, 0.75));
        assert_eq!(events[3].part, TimeSpan::from_floats(0.75, 1.0));
    }

    #[test]
    fn slow_stretches() {
        let p = sequence(vec![note("a"), note("b")]).slow(2.0);
        let events = q(&p, 0.0, 2.0);
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].part, TimeSpan::from_ints(0, 1));
        assert_eq!(events[1].part, TimeSpan::from_ints(1, 2));
    }

    #[test]
    fn fast_slow_round_trip() {
        let base = sequence(vec![note("a"), note("b"), note("c")]);
        let round = base.fast(3.0).slow(3.0);
        assert_eq!(q(&base, 0.0, 1.0), q(&round, 0.0, 1.0));
    }

    #[test]
    fn fast_with_pattern_factor() {
        let factor = ControlValue::pattern(sequence(vec![
            crate::combinators::atom(crate::VoiceData::value(1.0)),
            crate::combinators::atom(crate::VoiceData::value(2.0)),
        ]));
        let p = tempo(&note("x"), factor, true);
        let events = q(&p, 0.0, 1.0);
        // First half at normal speed (one clipped event), second half doubled.
        assert!(events.len() >= 2);
        for e in &events {
            assert!(e.part.begin >= Fraction::ZERO && e.part.end <= Fraction::ONE);
        }
    }

    #[test]
    fn late_shifts_events() {
        let p = note("bd").late(0.25);
        let events = q(&p, 0.0, 1.0);
        // Tail of the previous copy plus the shifted onset.
        let onsets: Vec<&Event> = events.iter().filter(|e| e.has_onset()).collect();
        assert_eq!(onsets.len(), 1);
        assert_eq!(onsets[0].part.begin, Fraction::new(1, 4));
        assert_eq!(onsets[0].whole.unwrap().end, Fraction::new(5, 4));
    }

    #[test]
    fn early_then_late_cancels() {
        let base = sequence(vec![note("a"), note("b")]);
        let round = base.early(0.25).late(0.25);
        assert_eq!(q(&base, 0.0, 1.0), q(&round, 0.0, 1.0));
    }

    #[test]
    fn compress_places_cycle_in_window() {
        let p = note("x").compress(Fraction::new(1, 4), Fraction::new(3, 4));
        let events = q(&p, 0.0, 1.0);
        assert_eq!(events.len(), 1);
        assert_eq!(
            events[0].part,
            TimeSpan::new(Fraction::new(1, 4), Fraction::new(3, 4))
        );
        assert!(events[0].has_onset());
    }

    #[test]
    fn compress_degenerate_is_silent() {
        let p = note("x").compress(Fraction::new(3, 4), Fraction::new(1, 4));
        assert!(q(&p, 0.0, 1.0).is_empty());
    }

    #[test]
    fn fast_gap_leaves_a_gap() {
        let p = sequence(vec![note("a"), note("b")]).fast_gap(Fraction::from_int(2));
        let events = q(&p, 0.0, 1.0);
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].part, TimeSpan::from_floats(0.0, 0.25));
        assert_eq!(events[1].part, TimeSpan::from_floats(0.25, 0.5));
    }

    #[test]
    fn zoom_stretches_fragment() {
        let p = sequence(vec![note("a"), note("b"), note("c"), note("d")])
            .zoom(Fraction::new(1, 4), Fraction::new(3, 4));
        let events = q(&p, 0.0, 1.0);
        assert_eq!(notes(&events), vec!["b", "c"]);
        assert_eq!(events[0].part, TimeSpan::from_floats(0.0, 0.5));
        assert_eq!(events[1].part, TimeSpan::from_floats(0.5, 1.0));
    }

    #[test]
    fn hurry_scales_speed_control() {
        let p = note("bd").hurry(2.0);
        let events = q(&p, 0.0, 1.0);
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].data.speed, Some(2.0));
    }

    #[test]
    fn repeat_cycles_holds_each_cycle() {
        let p = slowcat_ab().repeat_cycles(2);
        assert_eq!(notes(&q(&p, 0.0, 1.0)), vec!["a"]);
        assert_eq!(notes(&q(&p, 1.0, 2.0)), vec!["a"]);
        assert_eq!(notes(&q(&p, 2.0, 3.0)), vec!["b"]);
        assert_eq!(notes(&q(&p, 3.0, 4.0)), vec!["b"]);
        assert_eq!(notes(&q(&p, 4.0, 5.0)), vec!["a"]);
    }

    fn slowcat_ab() -> Pattern {
        crate::combinators::slowcat(vec![note("a"), note("b")])
    }

    #[test]
    fn rev_mirrors_cycle() {
        let p = sequence(vec![note("a"), note("b"), note("c")]).rev();
        let events = q(&p, 0.0, 1.0);
        assert_eq!(notes(&events), vec!["c", "b", "a"]);
        assert_eq!(
            events[0].part,
            TimeSpan::new(Fraction::ZERO, Fraction::new(1, 3))
        );
    }

    #[test]
    fn rev_is_an_involution() {
        let base = sequence(vec![note("a"), note("b"), note("c"), note("d")]);
        let round = base.rev().rev();
        assert_eq!(q(&base, 0.0, 1.0), q(&round, 0.0, 1.0));
    }

    #[test]
    fn rev_second_cycle_mirrors_locally() {
        let p = sequence(vec![note("a"), note("b")]).rev();
        let events = q(&p, 1.0, 2.0);
        assert_eq!(notes(&events), vec!["b", "a"]);
        assert_eq!(events[0].part, TimeSpan::from_floats(1.0, 1.5));
    }
}
