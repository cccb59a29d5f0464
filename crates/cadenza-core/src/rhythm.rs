//! Rhythm generators: euclidean gates, groove morphing, segmentation,
//! subdivision, and step take/drop.

use crate::combinators::silence;
use crate::euclid::bjorklund;
use crate::{cycle_pieces, ControlValue, Event, Fraction, Pattern, TimeSpan, VoiceData};

/// Gate windows for the active slots of a euclidean cycle, in cycle-local
/// time. With `legato` a gate runs until the next active slot (the last one
/// to the cycle end).
fn euclid_gates(pulses: i64, steps: i64, rotation: i64, legato: bool) -> Vec<TimeSpan> {
    if pulses <= 0 || steps <= 0 {
        return Vec::new();
    }
    let slots = bjorklund(
        (pulses as usize).min(steps as usize),
        steps as usize,
        rotation.rem_euclid(steps) as usize,
    );
    let step = Fraction::new(1, steps as i128);
    let starts: Vec<Fraction> = slots
        .iter()
        .enumerate()
        .filter(|(_, &on)| on)
        .map(|(i, _)| step * Fraction::from_int(i as i64))
        .collect();

    starts
        .iter()
        .enumerate()
        .map(|(k, &begin)| {
            let end = if legato {
                starts.get(k + 1).copied().unwrap_or(Fraction::ONE)
            } else {
                begin + step
            };
            TimeSpan::new(begin, end)
        })
        .collect()
}

impl Pattern {
    /// Euclidean rhythm: `pulses` gates spread over `steps` slots per cycle.
    /// The pattern is queried inside each gate and strictly clipped to it;
    /// the gate becomes the event's whole.
    pub fn euclid(&self, pulses: i64, steps: i64, rotation: i64) -> Pattern {
        self.euclid_gated(pulses, steps, rotation, false)
    }

    /// Euclidean rhythm with gates held open until the next onset.
    pub fn euclid_legato(&self, pulses: i64, steps: i64, rotation: i64) -> Pattern {
        self.euclid_gated(pulses, steps, rotation, true)
    }

    fn euclid_gated(&self, pulses: i64, steps: i64, rotation: i64, legato: bool) -> Pattern {
        let gates = euclid_gates(pulses, steps, rotation, legato);
        if gates.is_empty() {
            return silence();
        }
        let inner = self.clone();
        Pattern::with_steps(
            move |span, ctx| {
                let mut events = Vec::new();
                for piece in cycle_pieces(span) {
                    if piece.is_empty() {
                        continue;
                    }
                    let cycle = piece.begin.floor();
                    for gate in &gates {
                        let gate_abs = gate.shift(cycle);
                        let visible = match piece.overlap(&gate_abs) {
                            Some(s) => s,
                            None => continue,
                        };
                        for e in inner.query_span(visible, ctx) {
                            if let Some(part) = e.part.overlap(&visible) {
                                events.push(Event::new(Some(gate_abs), part, e.data));
                            }
                        }
                    }
                }
                events
            },
            Some(Fraction::from_int(steps)),
        )
    }

    /// Divide each sampled control window into `n` equal slices and give the
    /// pattern the resulting rhythm; the main use is discretizing continuous
    /// signals.
    pub fn segment(&self, n: impl Into<ControlValue>) -> Pattern {
        let n = n.into();
        let inner = self.clone();
        Pattern::new(move |span, ctx| {
            let mut events = Vec::new();
            let windows: Vec<TimeSpan> = match &n {
                ControlValue::Static(_) => cycle_pieces(span)
                    .into_iter()
                    .map(|piece| {
                        let c = piece.begin.floor();
                        TimeSpan::new(c, c + Fraction::ONE)
                    })
                    .collect(),
                ControlValue::Pattern(_) => Vec::new(),
            };
            let sampled: Vec<(TimeSpan, Fraction)> = match &n {
                ControlValue::Static(v) => windows.into_iter().map(|w| (w, *v)).collect(),
                ControlValue::Pattern(_) => n.sample(span, ctx),
            };

            for (window, count) in sampled {
                let count = count.floor_int();
                if count <= 0 {
                    continue;
                }
                let slice_dur = window.duration() / Fraction::from_int(count);
                for k in 0..count {
                    let slice = TimeSpan::new(
                        window.begin + slice_dur * Fraction::from_int(k),
                        window.begin + slice_dur * Fraction::from_int(k + 1),
                    );
                    let visible = match span.overlap(&slice) {
                        Some(s) => s,
                        None => continue,
                    };
                    for e in inner.query_span(visible, ctx) {
                        if let Some(part) = e.part.overlap(&visible) {
                            events.push(Event::new(Some(slice), part, e.data));
                        }
                    }
                }
            }
            events
        })
    }

    /// Subdivide every event into `n` equal copies of itself inside its
    /// part. `n <= 1` is the identity.
    pub fn ply(&self, n: i64) -> Pattern {
        if n <= 1 {
            return self.clone();
        }
        let inner = self.clone();
        Pattern::new(move |span, ctx| {
            let mut events = Vec::new();
            for e in inner.query_span(span, ctx) {
                let dur = e.part.duration() / Fraction::from_int(n);
                for k in 0..n {
                    let sub = TimeSpan::new(
                        e.part.begin + dur * Fraction::from_int(k),
                        e.part.begin + dur * Fraction::from_int(k + 1),
                    );
                    events.push(Event::new(e.whole.map(|_| sub), sub, e.data.clone()));
                }
            }
            events
        })
    }

    /// Keep the first `n` of the pattern's steps each cycle, stretched back
    /// to a full cycle. Without a known step count, the first `n` cycles
    /// loop instead.
    pub fn take_steps(&self, n: i64) -> Pattern {
        if n <= 0 {
            return silence();
        }
        match self.steps() {
            Some(s) if !s.is_zero() && !s.is_negative() => {
                let kept = Fraction::from_int(n).min(s);
                if kept == s {
                    return self.clone();
                }
                self.zoom(Fraction::ZERO, kept / s)
                    .override_steps(kept)
            }
            _ => {
                // Cycle-level fallback: loop cycles 0..n.
                let inner = self.clone();
                Pattern::new(move |span, ctx| {
                    let cycle = span.begin.floor_int();
                    let delta = Fraction::from_int(cycle - cycle.rem_euclid(n));
                    inner
                        .query_span(
                            TimeSpan::new(span.begin - delta, span.end - delta),
                            ctx,
                        )
                        .into_iter()
                        .map(|e| e.with_span(|ts| ts.shift(delta)))
                        .collect()
                })
                .split_queries()
            }
        }
    }

    /// Skip the first `n` steps of each cycle and stretch the remainder back
    /// to a full cycle. Without a known step count, shifts `n` cycles early.
    pub fn drop_steps(&self, n: i64) -> Pattern {
        if n <= 0 {
            return self.clone();
        }
        match self.steps() {
            Some(s) if !s.is_zero() && !s.is_negative() => {
                let dropped = Fraction::from_int(n);
                if dropped >= s {
                    return silence();
                }
                self.zoom(dropped / s, Fraction::ONE)
                    .override_steps(s - dropped)
            }
            _ => self.early(Fraction::from_int(n)),
        }
    }
}

/// Gate-open events whose onsets morph between a euclidean layout and an
/// even spread of `pulses`, steered per groove event by its value in [0, 1].
pub fn euclid_morph(pulses: i64, steps: i64, groove: Pattern) -> Pattern {
    if pulses <= 0 || steps <= 0 {
        return silence();
    }
    let slots = bjorklund((pulses as usize).min(steps as usize), steps as usize, 0);
    let uneven: Vec<f64> = slots
        .iter()
        .enumerate()
        .filter(|(_, &on)| on)
        .map(|(i, _)| i as f64 / steps as f64)
        .collect();
    let even: Vec<f64> = (0..uneven.len())
        .map(|k| k as f64 / pulses as f64)
        .collect();

    Pattern::new(move |span, ctx| {
        let mut events = Vec::new();
        for g in groove.query_span(span, ctx) {
            let perc = g
                .data
                .effective_value()
                .and_then(|v| v.as_f64().ok())
                .unwrap_or(0.0)
                .clamp(0.0, 1.0);
            let onsets: Vec<Fraction> = uneven
                .iter()
                .zip(&even)
                .map(|(u, e)| Fraction::from_f64(u + (e - u) * perc))
                .collect();

            for piece in cycle_pieces(g.part) {
                if piece.is_empty() {
                    continue;
                }
                let cycle = piece.begin.floor();
                for (k, &onset) in onsets.iter().enumerate() {
                    let end = onsets.get(k + 1).copied().unwrap_or(Fraction::ONE);
                    let arc = TimeSpan::new(cycle + onset, cycle + end);
                    if let Some(part) = piece.overlap(&arc) {
                        events.push(Event::new(
                            Some(arc),
                            part,
                            VoiceData::value(1.0),
                        ));
                    }
                }
            }
        }
        events
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::combinators::{atom, note, run, sequence};
    use crate::QueryContext;

    fn ctx() -> QueryContext {
        QueryContext::new()
    }

    fn q(p: &Pattern, from: f64, to: f64) -> Vec<Event> {
        p.query_arc(Fraction::from_f64(from), Fraction::from_f64(to), &ctx())
    }

    #[test]
    fn euclid_three_of_eight() {
        let p = note("bd").euclid(3, 8, 0);
        let events = q(&p, 0.0, 1.0);
        assert_eq!(events.len(), 3);
        let eighth = Fraction::new(1, 8);
        for (e, slot) in events.iter().zip([0i64, 3, 6]) {
            let begin = eighth * Fraction::from_int(slot);
            assert_eq!(e.part, TimeSpan::new(begin, begin + eighth));
            assert_eq!(e.whole, Some(e.part));
            assert_eq!(e.data.note.as_deref(), Some("bd"));
        }
    }

    #[test]
    fn euclid_tolerates_bad_input() {
        assert!(q(&note("bd").euclid(-1, 8, 0), 0.0, 1.0).is_empty());
        assert!(q(&note("bd").euclid(3, 0, 0), 0.0, 1.0).is_empty());
    }

    #[test]
    fn euclid_legato_extends_gates() {
        let p = note("bd").euclid_legato(3, 8, 0);
        let events = q(&p, 0.0, 1.0);
        assert_eq!(events.len(), 3);
        assert_eq!(events[0].part, TimeSpan::new(Fraction::ZERO, Fraction::new(3, 8)));
        assert_eq!(
            events[1].part,
            TimeSpan::new(Fraction::new(3, 8), Fraction::new(6, 8))
        );
        assert_eq!(
            events[2].part,
            TimeSpan::new(Fraction::new(6, 8), Fraction::ONE)
        );
    }

    #[test]
    fn euclid_rotation_moves_gates() {
        let p = note("bd").euclid(3, 8, 3);
        let events = q(&p, 0.0, 1.0);
        let begins: Vec<Fraction> = events.iter().map(|e| e.part.begin).collect();
        assert_eq!(
            begins,
            vec![Fraction::ZERO, Fraction::new(3, 8), Fraction::new(5, 8)]
        );
    }

    #[test]
    fn segment_discretizes() {
        let p = crate::signal::saw().segment(4i64);
        let events = q(&p, 0.0, 1.0);
        assert_eq!(events.len(), 4);
        assert_eq!(events[1].whole, Some(TimeSpan::from_floats(0.25, 0.5)));
        assert_eq!(events[1].part, TimeSpan::from_floats(0.25, 0.5));
        // Saw sampled at each slice start.
        let v = events[1].data.value.clone().unwrap().as_f64().unwrap();
        assert!((v - 0.25).abs() < 1e-9);
    }

    #[test]
    fn ply_subdivides_events() {
        let p = sequence(vec![note("a"), note("b")]).ply(2);
        let events = q(&p, 0.0, 1.0);
        assert_eq!(events.len(), 4);
        assert_eq!(events[0].part, TimeSpan::from_floats(0.0, 0.25));
        assert_eq!(events[1].part, TimeSpan::from_floats(0.25, 0.5));
        assert_eq!(events[0].data.note.as_deref(), Some("a"));
        assert_eq!(events[2].data.note.as_deref(), Some("b"));
        assert!(events.iter().all(|e| e.has_onset()));
    }

    #[test]
    fn ply_one_is_identity() {
        let base = sequence(vec![note("a"), note("b")]);
        assert_eq!(q(&base.ply(1), 0.0, 1.0), q(&base, 0.0, 1.0));
        assert_eq!(q(&base.ply(0), 0.0, 1.0), q(&base, 0.0, 1.0));
    }

    #[test]
    fn take_keeps_leading_steps() {
        let p = run(4).take_steps(2);
        let events = q(&p, 0.0, 1.0);
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].part, TimeSpan::from_floats(0.0, 0.5));
        assert_eq!(events[1].part, TimeSpan::from_floats(0.5, 1.0));
        assert_eq!(p.steps(), Some(Fraction::from_int(2)));
    }

    #[test]
    fn drop_skips_leading_steps() {
        let p = run(4).drop_steps(1);
        let events = q(&p, 0.0, 1.0);
        assert_eq!(events.len(), 3);
        assert_eq!(
            events[0].data.value.clone().unwrap().as_int().unwrap(),
            1
        );
        assert_eq!(
            events[0].part,
            TimeSpan::new(Fraction::ZERO, Fraction::new(1, 3))
        );
        assert_eq!(p.steps(), Some(Fraction::from_int(3)));
    }

    #[test]
    fn take_without_steps_loops_cycles() {
        let p = crate::combinators::slowcat(vec![note("a"), note("b"), note("c")])
            .set_steps(None)
            .take_steps(2);
        let labels: Vec<String> = (0..4)
            .map(|c| {
                q(&p, c as f64, c as f64 + 1.0)[0]
                    .data
                    .note
                    .clone()
                    .unwrap()
            })
            .collect();
        assert_eq!(labels, vec!["a", "b", "a", "b"]);
    }

    #[test]
    fn euclid_morph_even_at_full() {
        // perc = 1 lands the onsets on the even grid.
        let groove = atom(VoiceData::value(1.0));
        let p = euclid_morph(3, 8, groove);
        let events = q(&p, 0.0, 1.0);
        assert_eq!(events.len(), 3);
        assert_eq!(events[1].part.begin, Fraction::new(1, 3));
        let one = events[0].data.value.clone().unwrap().as_f64().unwrap();
        assert_eq!(one, 1.0);
    }

    #[test]
    fn euclid_morph_uneven_at_zero() {
        let groove = atom(VoiceData::value(0.0));
        let p = euclid_morph(3, 8, groove);
        let events = q(&p, 0.0, 1.0);
        let begins: Vec<Fraction> = events.iter().map(|e| e.part.begin).collect();
        assert_eq!(
            begins,
            vec![Fraction::ZERO, Fraction::new(3, 8), Fraction::new(3, 4)]
        );
    }
}
