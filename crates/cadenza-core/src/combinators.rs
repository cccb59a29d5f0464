use crate::{cycle_pieces, Event, Fraction, Pattern, TimeSpan, VoiceData};

/// The empty pattern.
pub fn silence() -> Pattern {
    Pattern::new(|_span, _ctx| Vec::new())
}

/// One event per integer cycle overlapping the arc: `whole = [i, i+1)`,
/// `part = whole ∩ arc`.
pub fn atom(data: VoiceData) -> Pattern {
    Pattern::with_steps(
        move |span, _ctx| {
            let mut events = Vec::new();
            for piece in cycle_pieces(span) {
                if piece.is_empty() {
                    continue;
                }
                let cycle = piece.begin.floor();
                let whole = TimeSpan::new(cycle, cycle + Fraction::ONE);
                events.push(Event::new(Some(whole), piece, data.clone()));
            }
            events
        },
        Some(Fraction::ONE),
    )
}

/// Shorthand for an atom carrying just a note name.
pub fn note(name: impl Into<String>) -> Pattern {
    atom(VoiceData::note(name))
}

/// Like [`atom`], but the value conceptually exists at every instant; it
/// reports no structural step count.
pub fn steady(data: VoiceData) -> Pattern {
    atom(data).set_steps(None)
}

/// Squash children into each cycle, each taking a share of the cycle
/// proportional to its weight. Children with no weight set share evenly.
pub fn sequence(children: Vec<Pattern>) -> Pattern {
    if children.is_empty() {
        return silence();
    }

    // Weights become exact rationals up front so step boundaries like 1/3
    // stay exact.
    let weights: Vec<Fraction> = children
        .iter()
        .map(|c| Fraction::from_f64(c.weight().max(0.0)))
        .collect();
    let total: Fraction = weights
        .iter()
        .fold(Fraction::ZERO, |acc, w| acc + *w);
    if total.is_zero() {
        return silence();
    }

    let mut offsets = Vec::with_capacity(children.len() + 1);
    let mut acc = Fraction::ZERO;
    offsets.push(Fraction::ZERO);
    for w in &weights {
        acc = acc + *w;
        offsets.push(acc / total);
    }

    let step_count = Fraction::from_int(children.len() as i64);
    // Inner arcs narrower than this are boundary artifacts of rational
    // round-tripping through f64 factors; skip them.
    let width_floor = 1e-7;

    Pattern::with_steps(
        move |span, ctx| {
            let mut events = Vec::new();
            for piece in cycle_pieces(span) {
                if piece.is_empty() {
                    continue;
                }
                let cycle = piece.begin.floor();
                for (i, child) in children.iter().enumerate() {
                    let step_start = cycle + offsets[i];
                    let step_end = cycle + offsets[i + 1];
                    let step_size = offsets[i + 1] - offsets[i];
                    if step_size.is_zero() {
                        continue;
                    }
                    let window = TimeSpan::new(step_start, step_end);
                    let isect = match piece.overlap(&window) {
                        Some(s) => s,
                        None => continue,
                    };
                    if isect.duration().to_f64() < width_floor {
                        continue;
                    }

                    // Map the intersection into the child's own timeline,
                    // keeping the cycle number.
                    let inner = TimeSpan::new(
                        (isect.begin - step_start) / step_size + cycle,
                        (isect.end - step_start) / step_size + cycle,
                    );
                    events.extend(child.query_span(inner, ctx).into_iter().map(|e| {
                        e.with_span(|ts| {
                            TimeSpan::new(
                                (ts.begin - cycle) * step_size + step_start,
                                (ts.end - cycle) * step_size + step_start,
                            )
                        })
                    }));
                }
            }
            events
        },
        Some(step_count),
    )
}

/// Layer patterns; all children sound at once. The merged result is sorted
/// by part begin.
pub fn stack(children: Vec<Pattern>) -> Pattern {
    if children.is_empty() {
        return silence();
    }

    let steps = children
        .iter()
        .filter_map(|c| c.steps())
        .reduce(|a, b| a.lcm(b));
    let cycle_dur = children
        .iter()
        .map(|c| c.estimate_cycle_duration())
        .reduce(|a, b| a.max(b))
        .unwrap_or(Fraction::ONE);

    Pattern::with_steps(
        move |span, ctx| {
            let mut events: Vec<Event> = children
                .iter()
                .flat_map(|c| c.query_span(span, ctx))
                .collect();
            crate::event::sort_by_part(&mut events);
            events
        },
        steps,
    )
    .set_cycle_duration(cycle_dur)
}

/// One child per cycle, round-robin over the list.
pub fn slowcat(children: Vec<Pattern>) -> Pattern {
    if children.is_empty() {
        return silence();
    }
    if children.len() == 1 {
        return children.into_iter().next().unwrap();
    }

    let len = children.len() as i64;
    Pattern::new(move |span, ctx| {
        let cycle = span.begin.floor_int();
        let idx = cycle.rem_euclid(len) as usize;
        // The chosen child plays its own cycle `cycle div len` here.
        let delta = Fraction::from_int(cycle - cycle.div_euclid(len));
        children[idx]
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

/// Play `(duration, pattern)` segments back to back, looping over the total
/// duration. Each segment is queried in its own local time starting at 0.
pub fn arrangement(segments: Vec<(Fraction, Pattern)>) -> Pattern {
    let kept: Vec<(Fraction, Pattern)> = segments
        .into_iter()
        .filter(|(dur, _)| !dur.is_negative() && !dur.is_zero())
        .collect();
    let total = kept
        .iter()
        .fold(Fraction::ZERO, |acc, (dur, _)| acc + *dur);
    if kept.is_empty() || total.is_zero() {
        return silence();
    }

    let cycle_dur = total;
    Pattern::new(move |span, ctx| {
        let mut events = Vec::new();
        let mut base = (span.begin / total).floor() * total;
        while base < span.end {
            let mut offset = Fraction::ZERO;
            for (dur, pat) in &kept {
                let window = TimeSpan::new(base + offset, base + offset + *dur);
                if let Some(isect) = span.overlap(&window) {
                    let local_shift = window.begin;
                    events.extend(
                        pat.query_span(isect.shift(-local_shift), ctx)
                            .into_iter()
                            .map(|e| e.with_span(|ts| ts.shift(local_shift))),
                    );
                }
                offset = offset + *dur;
            }
            base = base + total;
        }
        events
    })
    .set_cycle_duration(cycle_dur)
}

/// Place one `source_dur`-long cycle of `source` inside each `target_dur`
/// window, positioned by `alignment` in [0, 1] (0 = start, 1 = end).
pub fn aligned(
    source: Pattern,
    source_dur: Fraction,
    target_dur: Fraction,
    alignment: f64,
) -> Pattern {
    if target_dur.is_zero() || target_dur.is_negative() || source_dur.is_negative() {
        return silence();
    }
    let pos = Fraction::from_f64(alignment.clamp(0.0, 1.0)) * (target_dur - source_dur);

    Pattern::new(move |span, ctx| {
        let mut events = Vec::new();
        let mut n = (span.begin / target_dur).floor();
        let end_n = (span.end / target_dur).ceil();
        while n < end_n {
            let window_start = n * target_dur + pos;
            let window = TimeSpan::new(window_start, window_start + source_dur);
            if let Some(isect) = span.overlap(&window) {
                events.extend(
                    source
                        .query_span(isect.shift(-window_start), ctx)
                        .into_iter()
                        .map(|e| e.with_span(|ts| ts.shift(window_start))),
                );
            }
            n = n + Fraction::ONE;
        }
        events
    })
    .set_cycle_duration(target_dur)
}

/// Ramp of integer atoms `0..n` squashed into one cycle.
pub fn run(n: usize) -> Pattern {
    sequence(
        (0..n)
            .map(|i| atom(VoiceData::value(i as i64)))
            .collect(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{QueryContext, VoiceValue};

    fn ctx() -> QueryContext {
        QueryContext::new()
    }

    fn q(p: &Pattern, from: f64, to: f64) -> Vec<Event> {
        p.query_arc(Fraction::from_f64(from), Fraction::from_f64(to), &ctx())
    }

    #[test]
    fn silence_is_empty() {
        assert!(q(&silence(), 0.0, 4.0).is_empty());
    }

    #[test]
    fn atom_tiles_by_cycle() {
        let events = q(&note("bd"), 0.0, 3.0);
        assert_eq!(events.len(), 3);
        for (i, e) in events.iter().enumerate() {
            assert_eq!(e.whole, Some(TimeSpan::from_ints(i as i64, i as i64 + 1)));
            assert_eq!(e.part, e.whole.unwrap());
            assert!(e.has_onset());
        }
    }

    #[test]
    fn atom_clips_part_not_whole() {
        let events = q(&note("bd"), 0.5, 1.0);
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].part, TimeSpan::from_floats(0.5, 1.0));
        assert_eq!(events[0].whole, Some(TimeSpan::from_ints(0, 1)));
        assert!(!events[0].has_onset());
    }

    #[test]
    fn steady_reports_no_steps() {
        assert_eq!(note("bd").steps(), Some(Fraction::ONE));
        assert_eq!(steady(VoiceData::note("bd")).steps(), None);
    }

    #[test]
    fn sequence_of_three_atoms() {
        let p = sequence(vec![note("a"), note("b"), note("c")]);
        let events = q(&p, 0.0, 1.0);
        assert_eq!(events.len(), 3);
        assert_eq!(events[0].part, TimeSpan::new(Fraction::ZERO, Fraction::new(1, 3)));
        assert_eq!(
            events[1].part,
            TimeSpan::new(Fraction::new(1, 3), Fraction::new(2, 3))
        );
        assert_eq!(
            events[2].part,
            TimeSpan::new(Fraction::new(2, 3), Fraction::ONE)
        );
        assert_eq!(events[0].data.note.as_deref(), Some("a"));
        assert_eq!(events[1].data.note.as_deref(), Some("b"));
        assert_eq!(events[2].data.note.as_deref(), Some("c"));
        assert_eq!(p.steps(), Some(Fraction::from_int(3)));
    }

    #[test]
    fn sequence_respects_weights() {
        let p = sequence(vec![note("a").with_weight(3.0), note("b")]);
        let events = q(&p, 0.0, 1.0);
        assert_eq!(events.len(), 2);
        assert_eq!(
            events[0].part,
            TimeSpan::new(Fraction::ZERO, Fraction::new(3, 4))
        );
        assert_eq!(
            events[1].part,
            TimeSpan::new(Fraction::new(3, 4), Fraction::ONE)
        );
    }

    #[test]
    fn sequence_tiles_across_cycles() {
        let p = sequence(vec![note("a"), note("b")]);
        let events = q(&p, 1.0, 2.0);
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].part, TimeSpan::from_floats(1.0, 1.5));
        assert_eq!(events[1].part, TimeSpan::from_floats(1.5, 2.0));
    }

    #[test]
    fn stack_merges_sorted() {
        let p = stack(vec![
            sequence(vec![note("a"), note("b")]),
            note("c"),
        ]);
        let events = q(&p, 0.0, 1.0);
        assert_eq!(events.len(), 3);
        let begins: Vec<Fraction> = events.iter().map(|e| e.part.begin).collect();
        let mut sorted = begins.clone();
        sorted.sort();
        assert_eq!(begins, sorted);
    }

    #[test]
    fn stack_steps_use_lcm() {
        let p = stack(vec![run(2), run(3)]);
        assert_eq!(p.steps(), Some(Fraction::from_int(6)));
    }

    #[test]
    fn slowcat_round_robin() {
        let p = slowcat(vec![note("a"), note("b")]);
        assert_eq!(q(&p, 0.0, 1.0)[0].data.note.as_deref(), Some("a"));
        assert_eq!(q(&p, 1.0, 2.0)[0].data.note.as_deref(), Some("b"));
        assert_eq!(q(&p, 2.0, 3.0)[0].data.note.as_deref(), Some("a"));
    }

    #[test]
    fn slowcat_handles_negative_cycles() {
        let p = slowcat(vec![note("a"), note("b")]);
        let events = p.query_arc(Fraction::from_int(-1), Fraction::ZERO, &ctx());
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].data.note.as_deref(), Some("b"));
        assert_eq!(events[0].part, TimeSpan::from_ints(-1, 0));
    }

    #[test]
    fn arrangement_loops_segments() {
        let p = arrangement(vec![
            (Fraction::from_int(1), note("a")),
            (Fraction::from_int(2), note("b")),
        ]);
        let events = q(&p, 0.0, 3.0);
        // a at [0,1); b plays its cycles [0,2) shifted to [1,3).
        assert_eq!(events[0].data.note.as_deref(), Some("a"));
        assert_eq!(events[0].part, TimeSpan::from_ints(0, 1));
        let bs: Vec<&Event> = events
            .iter()
            .filter(|e| e.data.note.as_deref() == Some("b"))
            .collect();
        assert_eq!(bs.len(), 2);
        assert_eq!(bs[0].part, TimeSpan::from_ints(1, 2));
        assert_eq!(bs[1].part, TimeSpan::from_ints(2, 3));

        // Next loop starts at 3.
        let next = q(&p, 3.0, 4.0);
        assert_eq!(next.len(), 1);
        assert_eq!(next[0].data.note.as_deref(), Some("a"));
    }

    #[test]
    fn aligned_centers_source() {
        let p = aligned(
            note("x"),
            Fraction::from_int(1),
            Fraction::from_int(2),
            0.5,
        );
        let events = q(&p, 0.0, 2.0);
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].part, TimeSpan::from_floats(0.5, 1.5));
    }

    #[test]
    fn run_counts_up() {
        let events = q(&run(4), 0.0, 1.0);
        assert_eq!(events.len(), 4);
        assert_eq!(events[2].data.value, Some(VoiceValue::Int(2)));
        assert_eq!(events[2].part, TimeSpan::from_floats(0.5, 0.75));
    }
}
