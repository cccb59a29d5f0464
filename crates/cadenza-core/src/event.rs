use crate::{Fraction, TimeSpan, VoiceData};
use serde::{Deserialize, Serialize};

/// One occurrence of a value inside a pattern.
///
/// `part` is the fragment visible in the current query; `whole` is the full
/// onset-to-end extent the event would occupy unclipped. `part` never
/// extends outside `whole` when both are present. Continuous values carry no
/// `whole`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub whole: Option<TimeSpan>,
    pub part: TimeSpan,
    pub data: VoiceData,
}

impl Event {
    pub fn new(whole: Option<TimeSpan>, part: TimeSpan, data: VoiceData) -> Self {
        Event { whole, part, data }
    }

    /// A whole-cycle event: `part` equals `whole`.
    pub fn on(span: TimeSpan, data: VoiceData) -> Self {
        Event::new(Some(span), span, data)
    }

    pub fn whole_or_part(&self) -> TimeSpan {
        self.whole.unwrap_or(self.part)
    }

    /// Whether the onset of the event is visible in this fragment.
    pub fn has_onset(&self) -> bool {
        match self.whole {
            Some(w) => w.begin == self.part.begin,
            None => false,
        }
    }

    pub fn onset(&self) -> Fraction {
        self.whole_or_part().begin
    }

    pub fn duration(&self) -> Fraction {
        self.whole_or_part().duration()
    }

    pub fn with_data(&self, f: impl FnOnce(&VoiceData) -> VoiceData) -> Event {
        Event {
            whole: self.whole,
            part: self.part,
            data: f(&self.data),
        }
    }

    /// Apply a time mapping to both spans.
    pub fn with_span(&self, f: impl Fn(&TimeSpan) -> TimeSpan) -> Event {
        Event {
            whole: self.whole.map(|w| f(&w)),
            part: f(&self.part),
            data: self.data.clone(),
        }
    }

    /// Restrict the visible fragment to `span`, dropping the event when the
    /// fragment vanishes. `whole` is untouched.
    pub fn clip_to(&self, span: &TimeSpan) -> Option<Event> {
        let part = self.part.overlap(span)?;
        Some(Event {
            whole: self.whole,
            part,
            data: self.data.clone(),
        })
    }
}

/// Sort a result list into the ordering sequence-like combinators promise.
pub fn sort_by_part(events: &mut [Event]) {
    events.sort_by(|a, b| a.part.begin.cmp(&b.part.begin));
}

/// Multiset equality on (part, whole, data), for tests and the codec.
pub fn same_events(left: &[Event], right: &[Event]) -> bool {
    if left.len() != right.len() {
        return false;
    }
    let mut unmatched: Vec<&Event> = right.iter().collect();
    for e in left {
        match unmatched.iter().position(|r| *r == e) {
            Some(i) => {
                unmatched.swap_remove(i);
            }
            None => return false,
        }
    }
    true
}

#[cfg(test)]
mod tests {
    use super::*;

    fn span(b: i64, e: i64) -> TimeSpan {
        TimeSpan::from_ints(b, e)
    }

    #[test]
    fn onset_visibility() {
        let whole = span(0, 1);
        let clipped = TimeSpan::new(Fraction::new(1, 4), Fraction::new(1, 2));

        assert!(Event::on(whole, VoiceData::note("bd")).has_onset());
        assert!(!Event::new(Some(whole), clipped, VoiceData::note("bd")).has_onset());
        assert!(!Event::new(None, clipped, VoiceData::value(1.0)).has_onset());
    }

    #[test]
    fn clip_keeps_whole() {
        let e = Event::on(span(0, 1), VoiceData::note("bd"));
        let clipped = e.clip_to(&TimeSpan::from_floats(0.5, 2.0)).unwrap();
        assert_eq!(clipped.part, TimeSpan::from_floats(0.5, 1.0));
        assert_eq!(clipped.whole, Some(span(0, 1)));

        assert!(e.clip_to(&span(2, 3)).is_none());
    }

    #[test]
    fn multiset_equality_ignores_order() {
        let a = Event::on(span(0, 1), VoiceData::note("a"));
        let b = Event::on(span(1, 2), VoiceData::note("b"));
        assert!(same_events(
            &[a.clone(), b.clone()],
            &[b.clone(), a.clone()]
        ));
        assert!(!same_events(&[a.clone()], &[a, b]));
    }
}
