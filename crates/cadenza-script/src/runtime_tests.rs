// End-to-end: scripts through the engine, queried as patterns.

use crate::bindings::as_pattern;
use crate::engine::Engine;
use cadenza_core::{Event, Fraction, Pattern, QueryContext, TimeSpan};

fn eval_pattern(source: &str) -> Pattern {
    let mut engine = Engine::with_defaults();
    let value = engine
        .eval(source)
        .unwrap_or_else(|e| panic!("script failed: {e}"));
    as_pattern(&value).expect("script did not produce a pattern")
}

fn query(p: &Pattern, from: f64, to: f64) -> Vec<Event> {
    p.query_arc(
        Fraction::from_f64(from),
        Fraction::from_f64(to),
        &QueryContext::new(),
    )
}

fn notes(events: &[Event]) -> Vec<String> {
    events
        .iter()
        .map(|e| e.data.note.clone().unwrap_or_default())
        .collect()
}

#[test]
fn note_produces_one_event_per_cycle() {
    let p = eval_pattern(r#"note("bd")"#);
    let events = query(&p, 0.0, 2.0);
    assert_eq!(events.len(), 2);
    assert_eq!(events[0].data.note.as_deref(), Some("bd"));
}

#[test]
fn seq_of_three_atoms() {
    let p = eval_pattern(r#"seq("a", "b", "c")"#);
    let events = query(&p, 0.0, 1.0);
    assert_eq!(notes(&events), vec!["a", "b", "c"]);
    assert_eq!(
        events[1].part,
        TimeSpan::new(Fraction::new(1, 3), Fraction::new(2, 3))
    );
}

#[test]
fn fast_doubles_the_sequence() {
    let p = eval_pattern(r#"seq("a", "b").fast(2)"#);
    let events = query(&p, 0.0, 1.0);
    assert_eq!(notes(&events), vec!["a", "b", "a", "b"]);
    assert_eq!(events[3].part, TimeSpan::from_floats(0.75, 1.0));
}

#[test]
fn method_chains_compose() {
    let p = eval_pattern(r#"seq("a", "b", "c", "d").fast(2).rev()"#);
    let events = query(&p, 0.0, 1.0);
    assert_eq!(events.len(), 8);
    assert_eq!(events[0].data.note.as_deref(), Some("d"));
}

#[test]
fn euclid_three_of_eight() {
    let p = eval_pattern(r#"note("bd").euclid(3, 8)"#);
    let events = query(&p, 0.0, 1.0);
    assert_eq!(events.len(), 3);
    let eighth = Fraction::new(1, 8);
    for e in &events {
        assert_eq!(e.part.duration(), eighth);
    }
    assert_eq!(events[1].part.begin, Fraction::new(3, 8));
}

#[test]
fn degrade_is_deterministic_per_seed() {
    let p = eval_pattern(r#"seq("a", "b", "c", "d").degradeBy(0.5)"#);
    let ctx = QueryContext::with_seed(42);
    let a = p.query_arc(Fraction::ZERO, Fraction::ONE, &ctx);
    let b = p.query_arc(Fraction::ZERO, Fraction::ONE, &ctx);
    assert_eq!(a, b);
}

#[test]
fn compress_places_the_cycle() {
    let p = eval_pattern(r#"note("x").compress(0.25, 0.75)"#);
    let events = query(&p, 0.0, 1.0);
    assert_eq!(events.len(), 1);
    assert_eq!(
        events[0].part,
        TimeSpan::new(Fraction::new(1, 4), Fraction::new(3, 4))
    );
}

#[test]
fn every_transforms_matching_cycles() {
    let p = eval_pattern(r#"seq("a", "b").every(2, x => x.rev())"#);
    assert_eq!(notes(&query(&p, 0.0, 1.0)), vec!["b", "a"]);
    assert_eq!(notes(&query(&p, 1.0, 2.0)), vec!["a", "b"]);
}

#[test]
fn failing_overlay_does_not_silence_the_base() {
    // The transform calls an undefined name; the overlay is logged away and
    // the base pattern still sounds.
    let p = eval_pattern(r#"seq("a", "b").superimpose(x => nonsense(x))"#);
    let events = query(&p, 0.0, 1.0);
    assert_eq!(notes(&events), vec!["a", "b"]);
}

#[test]
fn closure_transforms_use_script_logic() {
    let src = r#"
        let double = p => p.fast(2)
        seq("a", "b").every(1, double)
    "#;
    let p = eval_pattern(src);
    assert_eq!(query(&p, 0.0, 1.0).len(), 4);
}

#[test]
fn signals_discretize_through_segment_and_range() {
    let p = eval_pattern("sine().range(0, 8).segment(4)");
    let events = query(&p, 0.0, 1.0);
    assert_eq!(events.len(), 4);
    let v = events[1].data.value.clone().unwrap().as_f64().unwrap();
    // Sine at 1/4 cycle, scaled to [0, 8].
    assert!((v - 8.0).abs() < 1e-9);
}

#[test]
fn pick_switches_between_patterns() {
    let p = eval_pattern(r#"seq(0, 1).pick([seq("a", "b"), seq("c", "d")])"#);
    let events = query(&p, 0.0, 1.0);
    assert_eq!(notes(&events), vec!["a", "d"]);
}

#[test]
fn stack_layers_patterns() {
    let p = eval_pattern(r#"stack(note("bd"), seq("hh", "hh"))"#);
    let events = query(&p, 0.0, 1.0);
    assert_eq!(events.len(), 3);
}

#[test]
fn arrays_reify_to_sequences() {
    let p = eval_pattern(r#"seq(["a", "b"], "c")"#);
    let events = query(&p, 0.0, 1.0);
    // [a b] shares the first half, c takes the second.
    assert_eq!(notes(&events), vec!["a", "b", "c"]);
    assert_eq!(events[0].part, TimeSpan::from_floats(0.0, 0.25));
    assert_eq!(events[2].part, TimeSpan::from_floats(0.5, 1.0));
}

#[test]
fn gain_and_speed_controls_attach() {
    let p = eval_pattern(r#"note("bd").gain(0.8).speed(2)"#);
    let events = query(&p, 0.0, 1.0);
    assert_eq!(
        events[0].data.control("gain"),
        Some(&cadenza_core::VoiceValue::Num(0.8))
    );
    assert_eq!(events[0].data.speed, Some(2.0));
}

#[test]
fn off_layers_a_delayed_transformed_copy() {
    let p = eval_pattern(r#"note("bd").off(0.25, x => x.gain(0.5))"#);
    let events = query(&p, 0.0, 1.0);
    assert_eq!(events.len(), 2);
    let delayed: Vec<&Event> = events
        .iter()
        .filter(|e| e.data.control("gain").is_some())
        .collect();
    assert_eq!(delayed.len(), 1);
    assert_eq!(delayed[0].whole_or_part().begin, Fraction::new(1, 4));
}

#[test]
fn scripts_can_loop_with_library_helpers() {
    let mut engine = Engine::with_defaults();
    engine.add_library(
        crate::engine::Library::builder("grooves")
            .source(
                r#"
                let four = p => p.fast(4)
                export { four }
                "#,
            )
            .build(),
    );
    let value = engine
        .eval("import {four} from \"grooves\"\nfour(note(\"bd\"))")
        .unwrap();
    let p = as_pattern(&value).unwrap();
    assert_eq!(query(&p, 0.0, 1.0).len(), 4);
}

#[test]
fn randrun_from_script_is_a_permutation() {
    let p = eval_pattern("randrun(4)");
    let ctx = QueryContext::with_seed(2);
    let events = p.query_arc(Fraction::ZERO, Fraction::ONE, &ctx);
    let mut values: Vec<i64> = events
        .iter()
        .map(|e| e.data.value.clone().unwrap().as_int().unwrap())
        .collect();
    values.sort();
    assert_eq!(values, vec![0, 1, 2, 3]);
}

#[test]
fn arrange_builds_timelines() {
    let p = eval_pattern(r#"arrange([1, note("a")], [1, note("b")])"#);
    assert_eq!(notes(&query(&p, 0.0, 1.0)), vec!["a"]);
    assert_eq!(notes(&query(&p, 1.0, 2.0)), vec!["b"]);
    assert_eq!(notes(&query(&p, 2.0, 3.0)), vec!["a"]);
}

#[test]
fn wrong_argument_kind_is_an_argument_error() {
    let mut engine = Engine::with_defaults();
    let err = engine.eval(r#"note("bd").fast("nope")"#).unwrap_err();
    assert!(matches!(
        err,
        crate::error::ScriptError::Runtime(crate::error::RuntimeError::Argument { .. })
    ));
}

#[test]
fn unknown_method_is_a_type_error() {
    let mut engine = Engine::with_defaults();
    let err = engine.eval(r#"note("bd").warble()"#).unwrap_err();
    assert!(matches!(
        err,
        crate::error::ScriptError::Runtime(crate::error::RuntimeError::Type(_))
    ));
}
