//! Continuous signals sampled at query time. Each query returns exactly one
//! event spanning the arc, valued at the arc's begin and mapped into the
//! context's range keys.

use crate::context::{ContextValue, RANGE_MAX, RANGE_MIN};
use crate::rng::SeedMixin;
use crate::{Event, Pattern, VoiceData};

/// Build a continuous pattern from `f(range_min, range_max, time)`.
pub fn signal<F>(f: F) -> Pattern
where
    F: Fn(f64, f64, f64) -> f64 + Send + Sync + 'static,
{
    Pattern::new(move |span, ctx| {
        let value = f(ctx.range_min(), ctx.range_max(), span.begin.to_f64());
        vec![Event::new(None, span, VoiceData::value(value))]
    })
    .set_steps(None)
}

fn unit(min: f64, max: f64, u: f64) -> f64 {
    min + (max - min) * u
}

fn cycle_pos(t: f64) -> f64 {
    t.rem_euclid(1.0)
}

/// Sine wave, one period per cycle, starting at the range midpoint.
pub fn sine() -> Pattern {
    signal(|min, max, t| unit(min, max, ((t * std::f64::consts::TAU).sin() + 1.0) / 2.0))
}

pub fn cosine() -> Pattern {
    signal(|min, max, t| unit(min, max, ((t * std::f64::consts::TAU).cos() + 1.0) / 2.0))
}

/// Rising ramp over each cycle.
pub fn saw() -> Pattern {
    signal(|min, max, t| unit(min, max, cycle_pos(t)))
}

/// Falling ramp over each cycle.
pub fn isaw() -> Pattern {
    signal(|min, max, t| unit(min, max, 1.0 - cycle_pos(t)))
}

/// Triangle: up over the first half cycle, down over the second.
pub fn tri() -> Pattern {
    signal(|min, max, t| {
        let pos = cycle_pos(t);
        let u = if pos < 0.5 { pos * 2.0 } else { 2.0 - pos * 2.0 };
        unit(min, max, u)
    })
}

/// Low for the first half of each cycle, high for the second.
pub fn square() -> Pattern {
    signal(|min, max, t| {
        if cycle_pos(t) < 0.5 {
            min
        } else {
            max
        }
    })
}

/// A continuous stream of seeded noise; the sample time is mixed into the
/// seed so the signal is stable per arc.
pub fn rand_signal() -> Pattern {
    Pattern::new(|span, ctx| {
        let mut rng = ctx.seeded_random(&[
            SeedMixin::Tag("RandSignal"),
            SeedMixin::Rational(span.begin),
        ]);
        let value = ctx.range_min() + (ctx.range_max() - ctx.range_min()) * rng.next_double();
        vec![Event::new(None, span, VoiceData::value(value))]
    })
    .set_steps(None)
}

impl Pattern {
    /// Rewrite the range keys seen below this point; continuous signals pick
    /// them up when sampled.
    pub fn range(&self, min: f64, max: f64) -> Pattern {
        self.with_context(move |b| {
            b.set(RANGE_MIN, ContextValue::Double(min));
            b.set(RANGE_MAX, ContextValue::Double(max));
        })
    }
}
