//! Property tests for the query-protocol laws.

use crate::*;
use proptest::prelude::*;

/// A small pattern grammar the strategies can shrink over.
#[derive(Debug, Clone)]
enum PatSpec {
    Note(u8),
    Silence,
    Seq(Vec<PatSpec>),
    Stack(Vec<PatSpec>),
    Fast(Box<PatSpec>, u8),
    Slow(Box<PatSpec>, u8),
    Rev(Box<PatSpec>),
    Euclid(Box<PatSpec>, u8, u8),
}

impl PatSpec {
    fn build(&self) -> Pattern {
        match self {
            PatSpec::Note(n) => note(format!("n{n}")),
            PatSpec::Silence => silence(),
            PatSpec::Seq(children) => sequence(children.iter().map(|c| c.build()).collect()),
            PatSpec::Stack(children) => stack(children.iter().map(|c| c.build()).collect()),
            PatSpec::Fast(inner, k) => inner.build().fast((*k as i64).max(1)),
            PatSpec::Slow(inner, k) => inner.build().slow((*k as i64).max(1)),
            PatSpec::Rev(inner) => inner.build().rev(),
            PatSpec::Euclid(inner, p, s) => {
                inner.build().euclid(*p as i64 % 9, (*s as i64 % 8) + 1, 0)
            }
        }
    }
}

fn pat_spec() -> impl Strategy<Value = PatSpec> {
    let leaf = prop_oneof![
        (0u8..8).prop_map(PatSpec::Note),
        Just(PatSpec::Silence),
    ];
    leaf.prop_recursive(3, 24, 4, |inner| {
        prop_oneof![
            prop::collection::vec(inner.clone(), 1..4).prop_map(PatSpec::Seq),
            prop::collection::vec(inner.clone(), 1..3).prop_map(PatSpec::Stack),
            (inner.clone(), 1u8..5).prop_map(|(p, k)| PatSpec::Fast(Box::new(p), k)),
            (inner.clone(), 1u8..5).prop_map(|(p, k)| PatSpec::Slow(Box::new(p), k)),
            inner.clone().prop_map(|p| PatSpec::Rev(Box::new(p))),
            (inner, 0u8..9, 0u8..8).prop_map(|(p, pu, st)| {
                PatSpec::Euclid(Box::new(p), pu, st)
            }),
        ]
    })
}

fn arc() -> impl Strategy<Value = (Fraction, Fraction)> {
    ((-4i64..4, 1i64..5), (0i64..9, 1i64..5)).prop_map(|((an, ad), (wn, wd))| {
        let begin = Fraction::new(an as i128, ad as i128);
        let width = Fraction::new((wn + 1) as i128, wd as i128);
        (begin, begin + width)
    })
}

/// Specs whose patterns repeat every single cycle. `slow(k)` has a k-cycle
/// period, so it stays out of the tiling law.
fn tiling_spec() -> impl Strategy<Value = PatSpec> {
    let leaf = prop_oneof![
        (0u8..8).prop_map(PatSpec::Note),
        Just(PatSpec::Silence),
    ];
    leaf.prop_recursive(3, 24, 4, |inner| {
        prop_oneof![
            prop::collection::vec(inner.clone(), 1..4).prop_map(PatSpec::Seq),
            prop::collection::vec(inner.clone(), 1..3).prop_map(PatSpec::Stack),
            (inner.clone(), 1u8..5).prop_map(|(p, k)| PatSpec::Fast(Box::new(p), k)),
            inner.clone().prop_map(|p| PatSpec::Rev(Box::new(p))),
            (inner, 0u8..9, 0u8..8).prop_map(|(p, pu, st)| {
                PatSpec::Euclid(Box::new(p), pu, st)
            }),
        ]
    })
}

fn shift_events(events: &[Event], by: Fraction) -> Vec<Event> {
    events
        .iter()
        .map(|e| e.with_span(|ts| ts.shift(by)))
        .collect()
}

/// Reassemble fragments split at a boundary. Within each (whole, payload)
/// group, parts are chained greedily: a fragment ending where a later one
/// begins becomes one event again. Duplicate overlapping events survive as
/// duplicates.
fn reassemble(mut events: Vec<Event>) -> Vec<Event> {
    sort_by_part(&mut events);
    let mut out: Vec<Event> = Vec::new();
    let mut pending: Vec<Event> = events;
    while !pending.is_empty() {
        let mut head = pending.remove(0);
        if head.whole.is_some() {
            loop {
                let next = pending.iter().position(|e| {
                    e.whole == head.whole && e.data == head.data && e.part.begin == head.part.end
                });
                match next {
                    Some(i) => {
                        let tail = pending.remove(i);
                        head.part = TimeSpan::new(head.part.begin, tail.part.end);
                    }
                    None => break,
                }
            }
        }
        out.push(head);
    }
    out
}

proptest! {
    #[test]
    fn arc_containment(spec in pat_spec(), (from, to) in arc()) {
        let p = spec.build();
        let ctx = QueryContext::new();
        for e in p.query_arc(from, to, &ctx) {
            prop_assert!(e.part.begin >= from, "part begins before the arc");
            prop_assert!(e.part.end <= to, "part ends after the arc");
            if let Some(w) = e.whole {
                prop_assert!(w.begin <= e.part.begin && e.part.end <= w.end,
                    "part escapes whole");
            }
        }
    }

    #[test]
    fn cycle_tiling(spec in tiling_spec(), n in -3i64..4) {
        let p = spec.build();
        let ctx = QueryContext::new();
        let base = p.query_arc(Fraction::ZERO, Fraction::ONE, &ctx);
        let cycle = p.query_arc(Fraction::from_int(n), Fraction::from_int(n + 1), &ctx);
        let shifted = shift_events(&cycle, Fraction::from_int(-n));
        prop_assert!(same_events(&base, &shifted),
            "cycle {} does not tile: {:?} vs {:?}", n, base, shifted);
    }

    #[test]
    fn split_and_merge(spec in pat_spec(), (from, to) in arc(), cut in 1i64..4) {
        let p = spec.build();
        let ctx = QueryContext::new();
        let mid = from + (to - from) * Fraction::new(cut as i128, 4);
        prop_assume!(mid > from && mid < to);

        let whole = reassemble(p.query_arc(from, to, &ctx));
        let mut pieces = p.query_arc(from, mid, &ctx);
        pieces.extend(p.query_arc(mid, to, &ctx));
        let pieces = reassemble(pieces);
        prop_assert!(same_events(&whole, &pieces),
            "split at {} diverges: {:?} vs {:?}", mid, whole, pieces);
    }

    #[test]
    fn determinism(spec in pat_spec(), (from, to) in arc(), seed in 0i64..100) {
        let p = spec.build();
        let ctx = QueryContext::with_seed(seed);
        let degraded = p.degrade_by(0.5);
        prop_assert_eq!(
            degraded.query_arc(from, to, &ctx),
            degraded.query_arc(from, to, &ctx)
        );
    }

    #[test]
    fn fast_slow_inverse(spec in pat_spec(), k in 1i64..6) {
        let p = spec.build();
        let ctx = QueryContext::new();
        let round = p.fast(k).slow(k);
        let base = p.query_arc(Fraction::ZERO, Fraction::ONE, &ctx);
        let walked = round.query_arc(Fraction::ZERO, Fraction::ONE, &ctx);
        prop_assert!(same_events(&base, &walked));
    }

    #[test]
    fn rev_involution(spec in pat_spec()) {
        let p = spec.build();
        let ctx = QueryContext::new();
        let round = p.rev().rev();
        let base = reassemble(p.query_arc(Fraction::ZERO, Fraction::ONE, &ctx));
        let walked = reassemble(round.query_arc(Fraction::ZERO, Fraction::ONE, &ctx));
        prop_assert!(same_events(&base, &walked));
    }

    #[test]
    fn sequence_weight_shares(weights in prop::collection::vec(1u8..5, 1..5)) {
        let children: Vec<Pattern> = weights
            .iter()
            .map(|&w| note("x").with_weight(w as f64))
            .collect();
        let p = sequence(children);
        let ctx = QueryContext::new();
        let events = p.query_arc(Fraction::ZERO, Fraction::ONE, &ctx);
        prop_assert_eq!(events.len(), weights.len());

        let total: i64 = weights.iter().map(|&w| w as i64).sum();
        for (e, &w) in events.iter().zip(&weights) {
            let expected = Fraction::new(w as i128, total as i128);
            prop_assert_eq!(e.part.duration(), expected);
        }
    }

    #[test]
    fn stack_result_is_sorted(spec in prop::collection::vec(pat_spec(), 1..4), (from, to) in arc()) {
        let p = stack(spec.iter().map(|s| s.build()).collect());
        let ctx = QueryContext::new();
        let events = p.query_arc(from, to, &ctx);
        for pair in events.windows(2) {
            prop_assert!(pair[0].part.begin <= pair[1].part.begin);
        }
    }

    #[test]
    fn bjorklund_counts(pulses in 0usize..17, steps in 0usize..17) {
        let slots = bjorklund(pulses, steps, 0);
        prop_assert_eq!(slots.len(), steps);
        if pulses <= steps {
            prop_assert_eq!(slots.iter().filter(|&&b| b).count(), pulses);
        }
    }
}
