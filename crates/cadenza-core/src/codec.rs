//! JSON codec for captured patterns. Rationals are flattened to doubles;
//! unknown keys are ignored on the way in and absent fields are omitted on
//! the way out.

use crate::{Event, Fraction, Pattern, QueryContext, TimeSpan, VoiceData};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StaticEvent {
    pub begin: f64,
    pub end: f64,
    pub dur: f64,
    #[serde(default)]
    pub data: VoiceData,
}

/// A pattern flattened to its event list over some captured window.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct StaticPattern {
    pub events: Vec<StaticEvent>,
}

impl StaticPattern {
    /// Materialize `cycles` whole cycles of a pattern, in part order.
    pub fn capture(pattern: &Pattern, cycles: i64, ctx: &QueryContext) -> Self {
        let mut events = pattern.query_arc(
            Fraction::ZERO,
            Fraction::from_int(cycles.max(0)),
            ctx,
        );
        crate::event::sort_by_part(&mut events);
        StaticPattern {
            events: events
                .into_iter()
                .map(|e| {
                    let w = e.whole_or_part();
                    StaticEvent {
                        begin: e.part.begin.to_f64(),
                        end: e.part.end.to_f64(),
                        dur: w.duration().to_f64(),
                        data: e.data,
                    }
                })
                .collect(),
        }
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }

    pub fn from_json(json: &str) -> serde_json::Result<Self> {
        serde_json::from_str(json)
    }

    /// Replay the captured events as a fixed pattern.
    pub fn into_pattern(self) -> Pattern {
        let events: Vec<Event> = self
            .events
            .into_iter()
            .map(|s| {
                let part = TimeSpan::from_floats(s.begin, s.end);
                let whole = TimeSpan::new(part.begin, part.begin + Fraction::from_f64(s.dur));
                Event::new(Some(whole), part, s.data)
            })
            .collect();
        Pattern::new(move |span, _ctx| {
            events
                .iter()
                .filter_map(|e| e.clip_to(&span))
                .collect()
        })
    }
}
