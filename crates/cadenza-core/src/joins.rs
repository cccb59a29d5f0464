//! Binds: every outer event selects an inner pattern, whose events are
//! joined back under one clipping rule per mode.

use crate::combinators::silence;
use crate::{Event, Fraction, Pattern, TimeSpan, VoiceData};
use std::sync::Arc;

/// How inner events are re-phased and clipped when joined.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JoinMode {
    /// Clip to the selector part; inner wholes survive.
    Inner,
    /// Clip to the selector part; the selector's whole replaces the inner's.
    Outer,
    /// Re-phase the inner pattern so its cycle origin sits at the fractional
    /// position of the selector's onset.
    Reset,
    /// Re-phase the inner pattern so its origin sits at the selector's
    /// visible begin.
    Restart,
    /// Squeeze one inner cycle into the selector's span.
    Squeeze,
}

pub type BindFn = Arc<dyn Fn(&VoiceData) -> Pattern + Send + Sync>;

/// The inner join underlying `pick` and friends: for each outer event,
/// `f(outer.data)` yields a pattern queried over the outer part.
pub fn bind(outer: &Pattern, f: BindFn, mode: JoinMode, preserve_metadata: bool) -> Pattern {
    let outer = outer.clone();
    Pattern::new(move |span, ctx| {
        let mut events = Vec::new();
        for o in outer.query_span(span, ctx) {
            let inner = f(&o.data);
            let joined: Vec<Event> = match mode {
                JoinMode::Inner | JoinMode::Outer => inner
                    .query_span(o.part, ctx)
                    .into_iter()
                    .filter_map(|i| {
                        let part = i.part.overlap(&o.part)?;
                        let whole = match mode {
                            JoinMode::Outer => o.whole,
                            _ => i.whole,
                        };
                        Some(Event::new(whole, part, i.data))
                    })
                    .collect(),
                JoinMode::Reset => {
                    let shift = o.whole_or_part().begin.frac();
                    join_shifted(&inner, shift, &o, ctx)
                }
                JoinMode::Restart => join_shifted(&inner, o.part.begin, &o, ctx),
                JoinMode::Squeeze => {
                    let w = o.whole_or_part();
                    let dur = w.duration();
                    if dur.is_zero() || dur.is_negative() {
                        Vec::new()
                    } else {
                        let to_local = |t: Fraction| (t - w.begin) / dur;
                        let from_local = |t: Fraction| t * dur + w.begin;
                        inner
                            .query_span(
                                TimeSpan::new(to_local(o.part.begin), to_local(o.part.end)),
                                ctx,
                            )
                            .into_iter()
                            .filter_map(|i| {
                                let mapped = i.with_span(|ts| {
                                    TimeSpan::new(from_local(ts.begin), from_local(ts.end))
                                });
                                let part = mapped.part.overlap(&o.part)?;
                                Some(Event::new(mapped.whole, part, mapped.data))
                            })
                            .collect()
                    }
                }
            };

            for i in joined {
                let data = if preserve_metadata {
                    i.data.merge_over(&o.data)
                } else {
                    i.data
                };
                events.push(Event::new(i.whole, i.part, data));
            }
        }
        events
    })
}

fn join_shifted(
    inner: &Pattern,
    shift: Fraction,
    o: &Event,
    ctx: &crate::QueryContext,
) -> Vec<Event> {
    inner
        .query_span(TimeSpan::new(o.part.begin - shift, o.part.end - shift), ctx)
        .into_iter()
        .filter_map(|i| {
            let mapped = i.with_span(|ts| ts.shift(shift));
            let part = mapped.part.overlap(&o.part)?;
            Some(Event::new(mapped.whole, part, mapped.data))
        })
        .collect()
}

fn index_from_data(data: &VoiceData, len: usize) -> Option<usize> {
    let v = data.effective_value()?;
    let idx = v.as_int().ok()?;
    Some(idx.rem_euclid(len as i64) as usize)
}

impl Pattern {
    /// Treat this pattern's values as indices into `choices` and join the
    /// chosen pattern per `mode`. Out-of-range indices wrap.
    pub fn pick(&self, choices: Vec<Pattern>, mode: JoinMode) -> Pattern {
        if choices.is_empty() {
            return silence();
        }
        let choices = Arc::new(choices);
        bind(
            self,
            Arc::new(move |data: &VoiceData| {
                match index_from_data(data, choices.len()) {
                    Some(idx) => choices[idx].clone(),
                    None => silence(),
                }
            }),
            mode,
            false,
        )
    }

    /// Map this pattern's values in [0, 1] onto `choices`, uniformly or by a
    /// weight CDF, querying the chosen child over each selector event.
    pub fn choice(&self, choices: Vec<Pattern>, weights: Option<Vec<f64>>) -> Pattern {
        if choices.is_empty() {
            return silence();
        }
        let len = choices.len();
        let cdf: Option<Vec<f64>> = weights.map(|ws| {
            let total: f64 = ws.iter().map(|w| w.max(0.0)).sum();
            let mut acc = 0.0;
            ws.iter()
                .map(|w| {
                    acc += w.max(0.0) / if total > 0.0 { total } else { 1.0 };
                    acc
                })
                .collect()
        });
        let choices = Arc::new(choices);
        bind(
            self,
            Arc::new(move |data: &VoiceData| {
                let t = match data.effective_value().and_then(|v| v.as_f64().ok()) {
                    Some(t) => t.clamp(0.0, 1.0),
                    None => return silence(),
                };
                let idx = match &cdf {
                    Some(cdf) => cdf
                        .iter()
                        .position(|&edge| t < edge)
                        .unwrap_or(len - 1),
                    None => ((t * len as f64) as usize).min(len - 1),
                };
                choices[idx].clone()
            }),
            JoinMode::Inner,
            false,
        )
    }
}
