//! Probabilistic and conditional combinators. All randomness flows through
//! the context's seeded generator: equal (pattern, arc, context) always
//! yields the same choices.

use crate::combinators::silence;
use crate::rng::SeedMixin;
use crate::{cycle_pieces, ControlValue, Event, Fraction, Pattern, TimeSpan, VoiceData};

/// Where an event goes once the coin has been flipped.
#[derive(Clone)]
pub enum SometimesRoute {
    Keep,
    Discard,
    /// Substitute events of this pattern over the original event's part.
    Replace(Pattern),
}

const SOMETIMES_TAG: &str = "SometimesPattern";

fn event_mixins(e: &Event) -> [SeedMixin; 3] {
    let onset = e.whole_or_part().begin;
    [
        SeedMixin::Tag(SOMETIMES_TAG),
        SeedMixin::Int(onset.floor_int()),
        SeedMixin::Rational(onset.frac()),
    ]
}

fn sample_probability(prob: &ControlValue, e: &Event, ctx: &crate::QueryContext) -> f64 {
    match prob {
        ControlValue::Static(p) => p.to_f64(),
        ControlValue::Pattern(_) => {
            let mid = e.part.midpoint();
            prob.sample(e.part, ctx)
                .into_iter()
                .find(|(w, _)| w.contains(mid))
                .map(|(_, p)| p.to_f64())
                .unwrap_or(0.0)
        }
    }
}

fn route_event(
    e: Event,
    route: &SometimesRoute,
    ctx: &crate::QueryContext,
    out: &mut Vec<Event>,
) {
    match route {
        SometimesRoute::Keep => out.push(e),
        SometimesRoute::Discard => {}
        SometimesRoute::Replace(p) => {
            out.extend(
                p.query_span(e.part, ctx)
                    .into_iter()
                    .filter_map(|r| r.clip_to(&e.part)),
            );
        }
    }
}

/// Per-event coin flip: draw `r` from the event-seeded generator; `r < p`
/// routes to `on_match`, anything else to `on_miss`.
pub fn sometimes_with(
    source: &Pattern,
    prob: ControlValue,
    on_match: SometimesRoute,
    on_miss: SometimesRoute,
) -> Pattern {
    let source = source.clone();
    Pattern::new(move |span, ctx| {
        let mut events = Vec::new();
        for e in source.query_span(span, ctx) {
            let p = sample_probability(&prob, &e, ctx).clamp(0.0, 1.0);
            let mut rng = ctx.seeded_random(&event_mixins(&e));
            if rng.next_double() < p {
                route_event(e, &on_match, ctx, &mut events);
            } else {
                route_event(e, &on_miss, ctx, &mut events);
            }
        }
        events
    })
}

impl Pattern {
    /// Drop each event with probability `p`.
    pub fn degrade_by(&self, p: impl Into<ControlValue>) -> Pattern {
        sometimes_with(
            self,
            p.into(),
            SometimesRoute::Discard,
            SometimesRoute::Keep,
        )
    }

    /// Drop each event with probability `1 - p`: the complement of the
    /// subset `degrade_by(p)` removes.
    pub fn undegrade_by(&self, p: impl Into<ControlValue>) -> Pattern {
        sometimes_with(
            self,
            p.into(),
            SometimesRoute::Keep,
            SometimesRoute::Discard,
        )
    }

    pub fn degrade(&self) -> Pattern {
        self.degrade_by(0.5)
    }

    /// With probability `p` per event, substitute `transformed` over the
    /// event's span; otherwise keep the event.
    pub fn sometimes_by(&self, p: impl Into<ControlValue>, transformed: Pattern) -> Pattern {
        sometimes_with(
            self,
            p.into(),
            SometimesRoute::Replace(transformed),
            SometimesRoute::Keep,
        )
    }

    pub fn sometimes(&self, transformed: Pattern) -> Pattern {
        self.sometimes_by(0.5, transformed)
    }

    /// Where `condition` is truthy at an event's midpoint, substitute
    /// `transformed` over the event's span; elsewhere keep the event.
    pub fn when_pattern(&self, condition: &Pattern, transformed: Pattern) -> Pattern {
        let source = self.clone();
        let condition = condition.clone();
        Pattern::new(move |span, ctx| {
            let mut events = Vec::new();
            for e in source.query_span(span, ctx) {
                let mid = e.part.midpoint();
                let truthy = condition
                    .query_span(e.part, ctx)
                    .into_iter()
                    .find(|c| c.part.contains(mid))
                    .map(|c| c.data.is_truthy())
                    .unwrap_or(false);
                if truthy {
                    events.extend(
                        transformed
                            .query_span(e.part, ctx)
                            .into_iter()
                            .filter_map(|r| r.clip_to(&e.part)),
                    );
                } else {
                    events.push(e);
                }
            }
            events
        })
    }

    /// Play `transformed` on cycles where `cycle mod n == 0`.
    pub fn first_of(&self, n: i64, transformed: Pattern) -> Pattern {
        self.cycle_switch(n, 0, transformed)
    }

    /// Play `transformed` on cycles where `cycle mod n == n - 1`.
    pub fn last_of(&self, n: i64, transformed: Pattern) -> Pattern {
        self.cycle_switch(n, n - 1, transformed)
    }

    fn cycle_switch(&self, n: i64, hit: i64, transformed: Pattern) -> Pattern {
        if n <= 0 {
            return self.clone();
        }
        let source = self.clone();
        Pattern::new(move |span, ctx| {
            let mut events = Vec::new();
            for piece in cycle_pieces(span) {
                if piece.is_empty() {
                    continue;
                }
                let cycle = piece.begin.floor_int();
                let chosen = if cycle.rem_euclid(n) == hit {
                    &transformed
                } else {
                    &source
                };
                events.extend(
                    chosen
                        .query_span(piece, ctx)
                        .into_iter()
                        .filter_map(|e| e.clip_to(&piece)),
                );
            }
            events
        })
    }

    /// Stack with a delayed, transformed copy. The overlay keeps only events
    /// whose onset falls inside the queried arc, so a delayed copy of one
    /// cycle never leaks into the previous one.
    pub fn off_with(&self, overlay: Pattern) -> Pattern {
        let source = self.clone();
        Pattern::new(move |span, ctx| {
            let mut events = source.query_span(span, ctx);
            events.extend(
                overlay
                    .query_span(span, ctx)
                    .into_iter()
                    .filter(|e| e.whole_or_part().begin >= span.begin),
            );
            events
        })
    }

    /// Concatenate with a transformed copy over the same arc.
    pub fn superimpose(&self, overlay: Pattern) -> Pattern {
        let source = self.clone();
        Pattern::new(move |span, ctx| {
            let mut events = source.query_span(span, ctx);
            events.extend(overlay.query_span(span, ctx));
            events
        })
    }
}

fn sample_count(n: &ControlValue, cycle: Fraction, ctx: &crate::QueryContext) -> i64 {
    let window = TimeSpan::new(cycle, cycle + Fraction::ONE);
    n.sample(window, ctx)
        .first()
        .map(|(_, v)| v.floor_int())
        .unwrap_or(0)
}

/// Per cycle, a sequence of `n` random integers in 0..8, seeded by cycle and
/// slot index.
pub fn rand_seq(n: impl Into<ControlValue>) -> Pattern {
    let n = n.into();
    Pattern::new(move |span, ctx| {
        let mut events = Vec::new();
        for piece in cycle_pieces(span) {
            if piece.is_empty() {
                continue;
            }
            let cycle = piece.begin.floor();
            let count = sample_count(&n, cycle, ctx);
            if count <= 0 {
                continue;
            }
            let slot_dur = Fraction::new(1, count as i128);
            for k in 0..count {
                let slot = TimeSpan::new(
                    cycle + slot_dur * Fraction::from_int(k),
                    cycle + slot_dur * Fraction::from_int(k + 1),
                );
                let part = match piece.overlap(&slot) {
                    Some(p) => p,
                    None => continue,
                };
                let mut rng = ctx.seeded_random(&[
                    SeedMixin::Tag("RandLPattern"),
                    SeedMixin::Int(cycle.floor_int()),
                    SeedMixin::Int(k),
                ]);
                let value = rng.next_int(0, 8);
                events.push(Event::new(Some(slot), part, VoiceData::value(value)));
            }
        }
        events
    })
    .split_queries()
}

/// Per cycle, a uniformly permuted run of 0..n over n slots, seeded by the
/// cycle number.
pub fn randrun(n: impl Into<ControlValue>) -> Pattern {
    let n = n.into();
    Pattern::new(move |span, ctx| {
        let mut events = Vec::new();
        for piece in cycle_pieces(span) {
            if piece.is_empty() {
                continue;
            }
            let cycle = piece.begin.floor();
            let count = sample_count(&n, cycle, ctx);
            if count <= 0 {
                continue;
            }
            let mut rng = ctx.seeded_random(&[
                SeedMixin::Tag("RandrunPattern"),
                SeedMixin::Int(cycle.floor_int()),
            ]);
            let order = rng.permutation(count as usize);
            let slot_dur = Fraction::new(1, count as i128);
            for (k, &value) in order.iter().enumerate() {
                let slot = TimeSpan::new(
                    cycle + slot_dur * Fraction::from_int(k as i64),
                    cycle + slot_dur * Fraction::from_int(k as i64 + 1),
                );
                if let Some(part) = piece.overlap(&slot) {
                    events.push(Event::new(Some(slot), part, VoiceData::value(value)));
                }
            }
        }
        events
    })
    .split_queries()
}

/// Per cycle, pick one child at random, seeded by the cycle number.
pub fn choose_per_cycle(children: Vec<Pattern>) -> Pattern {
    if children.is_empty() {
        return silence();
    }
    Pattern::new(move |span, ctx| {
        let cycle = span.begin.floor();
        let mut rng = ctx.seeded_random(&[
            SeedMixin::Tag("ChoosePattern"),
            SeedMixin::Int(cycle.floor_int()),
        ]);
        let idx = rng.next_int(0, children.len() as i64) as usize;
        children[idx].query_span(span, ctx)
    })
    .split_queries()
}
