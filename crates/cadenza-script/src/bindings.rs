//! Native bindings exposing the pattern algebra to scripts: constructor
//! functions plus the extension-method surface on the Pattern type tag.

use crate::engine::{Engine, Library};
use crate::error::RuntimeError;
use crate::interpreter;
use crate::value::{Arity, NativeObject, Value};
use cadenza_core as core;
use cadenza_core::{ControlValue, Fraction, JoinMode, Pattern, VoiceData};
use std::rc::Rc;

/// Type tag under which patterns are registered; the dispatch key for every
/// extension method below.
pub const PATTERN_TAG: &str = "Pattern";

pub fn pattern_value(pattern: Pattern) -> Value {
    Value::NativeObject(NativeObject {
        type_tag: PATTERN_TAG,
        handle: Rc::new(pattern),
    })
}

pub fn as_pattern(value: &Value) -> Option<Pattern> {
    match value {
        Value::NativeObject(o) if o.type_tag == PATTERN_TAG => {
            o.handle.downcast_ref::<Pattern>().cloned()
        }
        _ => None,
    }
}

/// Turn a script value into a pattern: strings become note atoms, numbers
/// value atoms, arrays sequences.
fn reify(value: &Value, function: &str) -> Result<Pattern, RuntimeError> {
    if let Some(p) = as_pattern(value) {
        return Ok(p);
    }
    match value {
        Value::Str(s) => Ok(core::note(s.clone())),
        Value::Num(n) => Ok(core::atom(VoiceData::value(*n))),
        Value::Bool(b) => Ok(core::atom(VoiceData::value(*b))),
        Value::Array(items) => {
            let children: Result<Vec<Pattern>, RuntimeError> =
                items.iter().map(|v| reify(v, function)).collect();
            Ok(core::sequence(children?))
        }
        other => Err(RuntimeError::argument(
            function,
            "a pattern, string, number, or array",
            other.type_name().to_string(),
        )),
    }
}

fn control_arg(value: &Value, function: &str) -> Result<ControlValue, RuntimeError> {
    if let Some(p) = as_pattern(value) {
        return Ok(ControlValue::pattern(p));
    }
    match value {
        Value::Num(n) => Ok(ControlValue::from(*n)),
        other => Err(RuntimeError::argument(
            function,
            "a number or pattern",
            other.type_name().to_string(),
        )),
    }
}

fn number_arg(args: &[Value], idx: usize, function: &str) -> Result<f64, RuntimeError> {
    match args.get(idx) {
        Some(Value::Num(n)) => Ok(*n),
        Some(other) => Err(RuntimeError::argument(
            function,
            format!("a number at position {}", idx + 1),
            other.type_name().to_string(),
        )),
        None => Err(RuntimeError::argument(
            function,
            format!("a number at position {}", idx + 1),
            "nothing".to_string(),
        )),
    }
}

fn int_arg(args: &[Value], idx: usize, function: &str) -> Result<i64, RuntimeError> {
    Ok(number_arg(args, idx, function)? as i64)
}

fn fraction_arg(args: &[Value], idx: usize, function: &str) -> Result<Fraction, RuntimeError> {
    Ok(Fraction::from_f64(number_arg(args, idx, function)?))
}

/// Apply a script transform to a pattern, eagerly, at call time. A failing
/// or non-pattern-returning callback is logged and contributes silence, so
/// a broken overlay never mutes the base pattern.
fn apply_transform(engine: &mut Engine, f: &Value, pattern: &Pattern, method: &str) -> Pattern {
    match interpreter::call_value(engine, f, vec![pattern_value(pattern.clone())]) {
        Ok(result) => match as_pattern(&result) {
            Some(p) => p,
            None => {
                log::warn!("{method}: transform returned {}, expected a pattern", result.type_name());
                core::silence()
            }
        },
        Err(e) => {
            log::warn!("{method}: transform failed: {e}");
            core::silence()
        }
    }
}

fn pattern_list(args: &[Value], function: &str) -> Result<Vec<Pattern>, RuntimeError> {
    // A single array argument is treated as the list itself.
    if args.len() == 1 {
        if let Value::Array(items) = &args[0] {
            return items.iter().map(|v| reify(v, function)).collect();
        }
    }
    args.iter().map(|v| reify(v, function)).collect()
}

fn register_constructors(engine: &mut Engine) {
    engine.register_native("note", Arity::Exact(1), |_, args| {
        match &args[0] {
            Value::Str(s) => Ok(pattern_value(core::note(s.clone()))),
            Value::Num(n) => Ok(pattern_value(core::atom(VoiceData::value(*n)))),
            other => Err(RuntimeError::argument(
                "note",
                "a string or number",
                other.type_name().to_string(),
            )),
        }
    });
    engine.register_native("atom", Arity::Exact(1), |_, args| {
        Ok(pattern_value(reify(&args[0], "atom")?))
    });
    engine.register_native("silence", Arity::Exact(0), |_, _| {
        Ok(pattern_value(core::silence()))
    });
    engine.register_native("steady", Arity::Exact(1), |_, args| match &args[0] {
        Value::Str(s) => Ok(pattern_value(core::steady(VoiceData::note(s.clone())))),
        Value::Num(n) => Ok(pattern_value(core::steady(VoiceData::value(*n)))),
        other => Err(RuntimeError::argument(
            "steady",
            "a string or number",
            other.type_name().to_string(),
        )),
    });

    engine.register_native("seq", Arity::AtLeast(1), |_, args| {
        Ok(pattern_value(core::sequence(pattern_list(&args, "seq")?)))
    });
    engine.register_native("sequence", Arity::AtLeast(1), |_, args| {
        Ok(pattern_value(core::sequence(pattern_list(
            &args, "sequence",
        )?)))
    });
    engine.register_native("stack", Arity::AtLeast(1), |_, args| {
        Ok(pattern_value(core::stack(pattern_list(&args, "stack")?)))
    });
    engine.register_native("cat", Arity::AtLeast(1), |_, args| {
        Ok(pattern_value(core::slowcat(pattern_list(&args, "cat")?)))
    });
    engine.register_native("arrange", Arity::AtLeast(1), |_, args| {
        let mut segments = Vec::new();
        for arg in &args {
            match arg {
                Value::Array(pair) if pair.len() == 2 => {
                    let dur = pair[0].as_number().map_err(|_| {
                        RuntimeError::argument(
                            "arrange",
                            "[duration, pattern] pairs",
                            pair[0].type_name().to_string(),
                        )
                    })?;
                    segments.push((Fraction::from_f64(dur), reify(&pair[1], "arrange")?));
                }
                other => {
                    return Err(RuntimeError::argument(
                        "arrange",
                        "[duration, pattern] pairs",
                        other.type_name().to_string(),
                    ));
                }
            }
        }
        Ok(pattern_value(core::arrangement(segments)))
    });
    engine.register_native("aligned", Arity::Exact(4), |_, args| {
        let source = reify(&args[0], "aligned")?;
        let source_dur = Fraction::from_f64(number_arg(&args, 1, "aligned")?);
        let target_dur = Fraction::from_f64(number_arg(&args, 2, "aligned")?);
        let alignment = number_arg(&args, 3, "aligned")?;
        Ok(pattern_value(core::aligned(
            source, source_dur, target_dur, alignment,
        )))
    });
    engine.register_native("run", Arity::Exact(1), |_, args| {
        let n = int_arg(&args, 0, "run")?.max(0) as usize;
        Ok(pattern_value(core::run(n)))
    });

    engine.register_native("sine", Arity::Exact(0), |_, _| {
        Ok(pattern_value(core::sine()))
    });
    engine.register_native("cosine", Arity::Exact(0), |_, _| {
        Ok(pattern_value(core::cosine()))
    });
    engine.register_native("saw", Arity::Exact(0), |_, _| {
        Ok(pattern_value(core::saw()))
    });
    engine.register_native("isaw", Arity::Exact(0), |_, _| {
        Ok(pattern_value(core::isaw()))
    });
    engine.register_native("tri", Arity::Exact(0), |_, _| {
        Ok(pattern_value(core::tri()))
    });
    engine.register_native("square", Arity::Exact(0), |_, _| {
        Ok(pattern_value(core::square()))
    });
    engine.register_native("rand", Arity::Exact(0), |_, _| {
        Ok(pattern_value(core::rand_signal()))
    });

    engine.register_native("randL", Arity::Exact(1), |_, args| {
        Ok(pattern_value(core::rand_seq(control_arg(
            &args[0], "randL",
        )?)))
    });
    engine.register_native("randrun", Arity::Exact(1), |_, args| {
        Ok(pattern_value(core::randrun(control_arg(
            &args[0], "randrun",
        )?)))
    });
    engine.register_native("euclidMorph", Arity::Exact(3), |_, args| {
        let pulses = int_arg(&args, 0, "euclidMorph")?;
        let steps = int_arg(&args, 1, "euclidMorph")?;
        let groove = reify(&args[2], "euclidMorph")?;
        Ok(pattern_value(core::euclid_morph(pulses, steps, groove)))
    });
}

/// Register a 0-argument pattern method.
fn method0(
    engine: &mut Engine,
    name: &'static str,
    f: impl Fn(&Pattern) -> Pattern + 'static,
) {
    engine.register_method(PATTERN_TAG, name, Arity::Exact(0), move |_, recv, _| {
        let p = as_pattern(&recv).ok_or_else(|| RuntimeError::Type("not a pattern".into()))?;
        Ok(pattern_value(f(&p)))
    });
}

fn receiver(recv: &Value) -> Result<Pattern, RuntimeError> {
    as_pattern(recv).ok_or_else(|| RuntimeError::Type("receiver is not a pattern".into()))
}

fn register_methods(engine: &mut Engine) {
    engine.register_method(PATTERN_TAG, "fast", Arity::Exact(1), |_, recv, args| {
        let p = receiver(&recv)?;
        Ok(pattern_value(p.fast(control_arg(&args[0], "fast")?)))
    });
    engine.register_method(PATTERN_TAG, "slow", Arity::Exact(1), |_, recv, args| {
        let p = receiver(&recv)?;
        Ok(pattern_value(p.slow(control_arg(&args[0], "slow")?)))
    });
    engine.register_method(PATTERN_TAG, "hurry", Arity::Exact(1), |_, recv, args| {
        let p = receiver(&recv)?;
        Ok(pattern_value(p.hurry(number_arg(&args, 0, "hurry")?)))
    });
    engine.register_method(PATTERN_TAG, "early", Arity::Exact(1), |_, recv, args| {
        let p = receiver(&recv)?;
        Ok(pattern_value(p.early(control_arg(&args[0], "early")?)))
    });
    engine.register_method(PATTERN_TAG, "late", Arity::Exact(1), |_, recv, args| {
        let p = receiver(&recv)?;
        Ok(pattern_value(p.late(control_arg(&args[0], "late")?)))
    });
    method0(engine, "rev", |p| p.rev());
    method0(engine, "degrade", |p| p.degrade());
    engine.register_method(PATTERN_TAG, "revCycles", Arity::Exact(1), |_, recv, args| {
        let p = receiver(&recv)?;
        Ok(pattern_value(p.rev_cycles(int_arg(&args, 0, "revCycles")?)))
    });
    engine.register_method(
        PATTERN_TAG,
        "repeatCycles",
        Arity::Exact(1),
        |_, recv, args| {
            let p = receiver(&recv)?;
            Ok(pattern_value(
                p.repeat_cycles(int_arg(&args, 0, "repeatCycles")?),
            ))
        },
    );

    engine.register_method(PATTERN_TAG, "compress", Arity::Exact(2), |_, recv, args| {
        let p = receiver(&recv)?;
        Ok(pattern_value(p.compress(
            fraction_arg(&args, 0, "compress")?,
            fraction_arg(&args, 1, "compress")?,
        )))
    });
    engine.register_method(PATTERN_TAG, "focus", Arity::Exact(2), |_, recv, args| {
        let p = receiver(&recv)?;
        Ok(pattern_value(p.focus(
            fraction_arg(&args, 0, "focus")?,
            fraction_arg(&args, 1, "focus")?,
        )))
    });
    engine.register_method(PATTERN_TAG, "zoom", Arity::Exact(2), |_, recv, args| {
        let p = receiver(&recv)?;
        Ok(pattern_value(p.zoom(
            fraction_arg(&args, 0, "zoom")?,
            fraction_arg(&args, 1, "zoom")?,
        )))
    });
    engine.register_method(PATTERN_TAG, "fastGap", Arity::Exact(1), |_, recv, args| {
        let p = receiver(&recv)?;
        Ok(pattern_value(p.fast_gap(fraction_arg(&args, 0, "fastGap")?)))
    });

    engine.register_method(PATTERN_TAG, "euclid", Arity::AtLeast(2), |_, recv, args| {
        let p = receiver(&recv)?;
        let pulses = int_arg(&args, 0, "euclid")?;
        let steps = int_arg(&args, 1, "euclid")?;
        let rotation = if args.len() > 2 {
            int_arg(&args, 2, "euclid")?
        } else {
            0
        };
        Ok(pattern_value(p.euclid(pulses, steps, rotation)))
    });
    engine.register_method(
        PATTERN_TAG,
        "euclidLegato",
        Arity::AtLeast(2),
        |_, recv, args| {
            let p = receiver(&recv)?;
            let pulses = int_arg(&args, 0, "euclidLegato")?;
            let steps = int_arg(&args, 1, "euclidLegato")?;
            let rotation = if args.len() > 2 {
                int_arg(&args, 2, "euclidLegato")?
            } else {
                0
            };
            Ok(pattern_value(p.euclid_legato(pulses, steps, rotation)))
        },
    );
    engine.register_method(PATTERN_TAG, "segment", Arity::Exact(1), |_, recv, args| {
        let p = receiver(&recv)?;
        Ok(pattern_value(p.segment(control_arg(&args[0], "segment")?)))
    });
    engine.register_method(PATTERN_TAG, "ply", Arity::Exact(1), |_, recv, args| {
        let p = receiver(&recv)?;
        Ok(pattern_value(p.ply(int_arg(&args, 0, "ply")?)))
    });
    engine.register_method(PATTERN_TAG, "take", Arity::Exact(1), |_, recv, args| {
        let p = receiver(&recv)?;
        Ok(pattern_value(p.take_steps(int_arg(&args, 0, "take")?)))
    });
    engine.register_method(PATTERN_TAG, "drop", Arity::Exact(1), |_, recv, args| {
        let p = receiver(&recv)?;
        Ok(pattern_value(p.drop_steps(int_arg(&args, 0, "drop")?)))
    });

    engine.register_method(PATTERN_TAG, "struct", Arity::Exact(1), |_, recv, args| {
        let p = receiver(&recv)?;
        let structure = reify(&args[0], "struct")?;
        Ok(pattern_value(p.struct_pattern(&structure)))
    });
    engine.register_method(PATTERN_TAG, "mask", Arity::Exact(1), |_, recv, args| {
        let p = receiver(&recv)?;
        let other = reify(&args[0], "mask")?;
        Ok(pattern_value(p.mask(&other)))
    });

    engine.register_method(PATTERN_TAG, "degradeBy", Arity::Exact(1), |_, recv, args| {
        let p = receiver(&recv)?;
        Ok(pattern_value(
            p.degrade_by(control_arg(&args[0], "degradeBy")?),
        ))
    });
    engine.register_method(
        PATTERN_TAG,
        "undegradeBy",
        Arity::Exact(1),
        |_, recv, args| {
            let p = receiver(&recv)?;
            Ok(pattern_value(
                p.undegrade_by(control_arg(&args[0], "undegradeBy")?),
            ))
        },
    );
    engine.register_method(
        PATTERN_TAG,
        "sometimes",
        Arity::Exact(1),
        |engine, recv, args| {
            let p = receiver(&recv)?;
            let transformed = apply_transform(engine, &args[0], &p, "sometimes");
            Ok(pattern_value(p.sometimes(transformed)))
        },
    );
    engine.register_method(
        PATTERN_TAG,
        "sometimesBy",
        Arity::Exact(2),
        |engine, recv, args| {
            let p = receiver(&recv)?;
            let prob = control_arg(&args[0], "sometimesBy")?;
            let transformed = apply_transform(engine, &args[1], &p, "sometimesBy");
            Ok(pattern_value(p.sometimes_by(prob, transformed)))
        },
    );
    engine.register_method(PATTERN_TAG, "when", Arity::Exact(2), |engine, recv, args| {
        let p = receiver(&recv)?;
        let condition = reify(&args[0], "when")?;
        let transformed = apply_transform(engine, &args[1], &p, "when");
        Ok(pattern_value(p.when_pattern(&condition, transformed)))
    });
    engine.register_method(PATTERN_TAG, "every", Arity::Exact(2), |engine, recv, args| {
        let p = receiver(&recv)?;
        let n = int_arg(&args, 0, "every")?;
        let transformed = apply_transform(engine, &args[1], &p, "every");
        Ok(pattern_value(p.first_of(n, transformed)))
    });
    engine.register_method(
        PATTERN_TAG,
        "firstOf",
        Arity::Exact(2),
        |engine, recv, args| {
            let p = receiver(&recv)?;
            let n = int_arg(&args, 0, "firstOf")?;
            let transformed = apply_transform(engine, &args[1], &p, "firstOf");
            Ok(pattern_value(p.first_of(n, transformed)))
        },
    );
    engine.register_method(
        PATTERN_TAG,
        "lastOf",
        Arity::Exact(2),
        |engine, recv, args| {
            let p = receiver(&recv)?;
            let n = int_arg(&args, 0, "lastOf")?;
            let transformed = apply_transform(engine, &args[1], &p, "lastOf");
            Ok(pattern_value(p.last_of(n, transformed)))
        },
    );
    engine.register_method(PATTERN_TAG, "off", Arity::Exact(2), |engine, recv, args| {
        let p = receiver(&recv)?;
        let delayed = p.late(control_arg(&args[0], "off")?);
        let overlay = apply_transform(engine, &args[1], &delayed, "off");
        Ok(pattern_value(p.off_with(overlay)))
    });
    engine.register_method(
        PATTERN_TAG,
        "superimpose",
        Arity::Exact(1),
        |engine, recv, args| {
            let p = receiver(&recv)?;
            let overlay = apply_transform(engine, &args[0], &p, "superimpose");
            Ok(pattern_value(p.superimpose(overlay)))
        },
    );

    engine.register_method(PATTERN_TAG, "range", Arity::Exact(2), |_, recv, args| {
        let p = receiver(&recv)?;
        Ok(pattern_value(p.range(
            number_arg(&args, 0, "range")?,
            number_arg(&args, 1, "range")?,
        )))
    });

    for (name, mode) in [
        ("pick", JoinMode::Inner),
        ("pickOuter", JoinMode::Outer),
        ("pickReset", JoinMode::Reset),
        ("pickRestart", JoinMode::Restart),
        ("pickSqueeze", JoinMode::Squeeze),
    ] {
        engine.register_method(PATTERN_TAG, name, Arity::Exact(1), move |_, recv, args| {
            let p = receiver(&recv)?;
            let choices = match &args[0] {
                Value::Array(items) => items
                    .iter()
                    .map(|v| reify(v, name))
                    .collect::<Result<Vec<_>, _>>()?,
                other => {
                    return Err(RuntimeError::argument(
                        name,
                        "an array of patterns",
                        other.type_name().to_string(),
                    ));
                }
            };
            Ok(pattern_value(p.pick(choices, mode)))
        });
    }

    engine.register_method(PATTERN_TAG, "choice", Arity::AtLeast(1), |_, recv, args| {
        let p = receiver(&recv)?;
        let choices = match &args[0] {
            Value::Array(items) => items
                .iter()
                .map(|v| reify(v, "choice"))
                .collect::<Result<Vec<_>, _>>()?,
            other => {
                return Err(RuntimeError::argument(
                    "choice",
                    "an array of patterns",
                    other.type_name().to_string(),
                ));
            }
        };
        let weights = match args.get(1) {
            Some(Value::Array(ws)) => Some(
                ws.iter()
                    .map(|w| w.as_number())
                    .collect::<Result<Vec<_>, _>>()?,
            ),
            Some(other) => {
                return Err(RuntimeError::argument(
                    "choice",
                    "an array of weights",
                    other.type_name().to_string(),
                ));
            }
            None => None,
        };
        Ok(pattern_value(p.choice(choices, weights)))
    });

    engine.register_method(PATTERN_TAG, "weight", Arity::Exact(1), |_, recv, args| {
        let p = receiver(&recv)?;
        Ok(pattern_value(
            p.with_weight(number_arg(&args, 0, "weight")?),
        ))
    });
    engine.register_method(PATTERN_TAG, "steps", Arity::Exact(1), |_, recv, args| {
        let p = receiver(&recv)?;
        Ok(pattern_value(
            p.override_steps(fraction_arg(&args, 0, "steps")?),
        ))
    });

    engine.register_method(PATTERN_TAG, "gain", Arity::Exact(1), |_, recv, args| {
        let p = receiver(&recv)?;
        let gain = number_arg(&args, 0, "gain")?;
        Ok(pattern_value(
            p.map_data(move |d| d.with_control("gain", gain)),
        ))
    });
    engine.register_method(PATTERN_TAG, "pan", Arity::Exact(1), |_, recv, args| {
        let p = receiver(&recv)?;
        let pan = number_arg(&args, 0, "pan")?;
        Ok(pattern_value(
            p.map_data(move |d| d.with_control("pan", pan)),
        ))
    });
    engine.register_method(PATTERN_TAG, "speed", Arity::Exact(1), |_, recv, args| {
        let p = receiver(&recv)?;
        let speed = number_arg(&args, 0, "speed")?;
        Ok(pattern_value(p.map_data(move |d| d.with_speed(speed))))
    });
    engine.register_method(PATTERN_TAG, "target", Arity::Exact(1), |_, recv, args| {
        let p = receiver(&recv)?;
        let target = args[0].as_str()?.to_string();
        Ok(pattern_value(p.map_data(move |d| {
            d.with_control("target", target.clone())
        })))
    });
}

/// The pattern-construction library. Implicitly imported by the default
/// engine; importable explicitly for renaming.
pub fn patterns_library() -> Library {
    Library::builder("patterns")
        .register(|engine| {
            register_constructors(engine);
            register_methods(engine);
        })
        .exports(&[
            "note",
            "atom",
            "silence",
            "steady",
            "seq",
            "sequence",
            "stack",
            "cat",
            "arrange",
            "aligned",
            "run",
            "sine",
            "cosine",
            "saw",
            "isaw",
            "tri",
            "square",
            "rand",
            "randL",
            "randrun",
            "euclidMorph",
        ])
        .build()
}
