use crate::{ContextBuilder, Event, Fraction, QueryContext, TimeSpan, VoiceData};
use std::sync::Arc;

/// A pattern of events over rational time.
///
/// A pattern is a pure function from a half-open arc and a query context to
/// the events falling inside that arc. Patterns are deeply immutable, hold no
/// query state, and may be queried concurrently from many threads provided
/// each query carries its own context.
pub struct Pattern {
    query_fn: Arc<dyn Fn(TimeSpan, &QueryContext) -> Vec<Event> + Send + Sync>,

    /// Relative duration share inside a sequence.
    weight: f64,

    /// Structural step count, when known. Consumed by take/drop and by the
    /// polymeter-style step bookkeeping of stack.
    steps: Option<Fraction>,

    /// Estimated length of one cycle of material.
    cycle_dur: Fraction,
}

impl Pattern {
    pub fn new<F>(query_fn: F) -> Self
    where
        F: Fn(TimeSpan, &QueryContext) -> Vec<Event> + Send + Sync + 'static,
    {
        Pattern {
            query_fn: Arc::new(query_fn),
            weight: 1.0,
            steps: None,
            cycle_dur: Fraction::ONE,
        }
    }

    pub fn with_steps<F>(query_fn: F, steps: Option<Fraction>) -> Self
    where
        F: Fn(TimeSpan, &QueryContext) -> Vec<Event> + Send + Sync + 'static,
    {
        let mut p = Pattern::new(query_fn);
        p.steps = steps;
        p
    }

    /// Query over `[from, to)`. The result is a fresh list; events' parts all
    /// intersect the arc, clipped events keep their original `whole`.
    pub fn query_arc(&self, from: Fraction, to: Fraction, ctx: &QueryContext) -> Vec<Event> {
        self.query_span(TimeSpan::new(from, to), ctx)
    }

    pub fn query_span(&self, span: TimeSpan, ctx: &QueryContext) -> Vec<Event> {
        (self.query_fn)(span, ctx)
    }

    pub fn weight(&self) -> f64 {
        self.weight
    }

    /// Expose a different duration share to an enclosing sequence. Querying
    /// is untouched.
    pub fn with_weight(mut self, weight: f64) -> Pattern {
        self.weight = weight;
        self
    }

    pub fn steps(&self) -> Option<Fraction> {
        self.steps
    }

    /// Report a different structural step count. Querying is untouched.
    pub fn override_steps(mut self, steps: impl Into<Fraction>) -> Pattern {
        self.steps = Some(steps.into());
        self
    }

    pub fn set_steps(mut self, steps: Option<Fraction>) -> Pattern {
        self.steps = steps;
        self
    }

    pub fn estimate_cycle_duration(&self) -> Fraction {
        self.cycle_dur
    }

    pub fn set_cycle_duration(mut self, dur: Fraction) -> Pattern {
        self.cycle_dur = dur;
        self
    }

    fn derived<F>(&self, query_fn: F) -> Pattern
    where
        F: Fn(TimeSpan, &QueryContext) -> Vec<Event> + Send + Sync + 'static,
    {
        Pattern {
            query_fn: Arc::new(query_fn),
            weight: self.weight,
            steps: self.steps,
            cycle_dur: self.cycle_dur,
        }
    }

    /// Map every event's payload.
    pub fn map_data<F>(&self, f: F) -> Pattern
    where
        F: Fn(&VoiceData) -> VoiceData + Send + Sync + 'static,
    {
        let inner = self.clone();
        self.derived(move |span, ctx| {
            inner
                .query_span(span, ctx)
                .into_iter()
                .map(|e| e.with_data(&f))
                .collect()
        })
    }

    /// Map whole events, timing included. The caller keeps the arc laws.
    pub fn map_events<F>(&self, f: F) -> Pattern
    where
        F: Fn(Event) -> Event + Send + Sync + 'static,
    {
        let inner = self.clone();
        self.derived(move |span, ctx| {
            inner.query_span(span, ctx).into_iter().map(&f).collect()
        })
    }

    /// Transform the full result list of each query.
    pub fn map_result<F>(&self, f: F) -> Pattern
    where
        F: Fn(Vec<Event>) -> Vec<Event> + Send + Sync + 'static,
    {
        let inner = self.clone();
        self.derived(move |span, ctx| f(inner.query_span(span, ctx)))
    }

    /// Keep events whose payload satisfies the predicate.
    pub fn filter_data<F>(&self, pred: F) -> Pattern
    where
        F: Fn(&VoiceData) -> bool + Send + Sync + 'static,
    {
        let inner = self.clone();
        self.derived(move |span, ctx| {
            inner
                .query_span(span, ctx)
                .into_iter()
                .filter(|e| pred(&e.data))
                .collect()
        })
    }

    /// Warp the query arc before descending.
    pub fn with_query_time<F>(&self, f: F) -> Pattern
    where
        F: Fn(Fraction) -> Fraction + Send + Sync + 'static,
    {
        let inner = self.clone();
        self.derived(move |span, ctx| {
            inner.query_span(TimeSpan::new(f(span.begin), f(span.end)), ctx)
        })
    }

    /// Warp event times after querying.
    pub fn with_event_time<F>(&self, f: F) -> Pattern
    where
        F: Fn(Fraction) -> Fraction + Send + Sync + 'static,
    {
        let inner = self.clone();
        self.derived(move |span, ctx| {
            inner
                .query_span(span, ctx)
                .into_iter()
                .map(|e| e.with_span(|ts| TimeSpan::new(f(ts.begin), f(ts.end))))
                .collect()
        })
    }

    /// Query children under an updated copy of the context.
    pub fn with_context<F>(&self, updater: F) -> Pattern
    where
        F: Fn(&mut ContextBuilder) + Send + Sync + 'static,
    {
        let inner = self.clone();
        self.derived(move |span, ctx| {
            let updated = ctx.update(|b| updater(b));
            inner.query_span(span, &updated)
        })
    }

    /// Split the arc at integer cycle boundaries and query piecewise.
    /// Combinators whose behavior depends on the cycle number wrap
    /// themselves in this so each sub-query sees a single cycle.
    pub fn split_queries(&self) -> Pattern {
        let inner = self.clone();
        self.derived(move |span, ctx| {
            let mut events = Vec::new();
            for piece in cycle_pieces(span) {
                events.extend(inner.query_span(piece, ctx));
            }
            events
        })
    }
}

/// Slice an arc at integer cycle boundaries. Zero-width arcs yield a single
/// zero-width piece so degenerate queries stay answerable.
pub fn cycle_pieces(span: TimeSpan) -> Vec<TimeSpan> {
    if span.begin >= span.end {
        return vec![span];
    }
    let mut pieces = Vec::new();
    let mut begin = span.begin;
    while begin < span.end {
        let cycle_end = begin.floor() + Fraction::ONE;
        let end = cycle_end.min(span.end);
        pieces.push(TimeSpan::new(begin, end));
        begin = end;
    }
    pieces
}

impl Clone for Pattern {
    fn clone(&self) -> Self {
        Pattern {
            query_fn: self.query_fn.clone(),
            weight: self.weight,
            steps: self.steps,
            cycle_dur: self.cycle_dur,
        }
    }
}

impl std::fmt::Debug for Pattern {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Pattern")
            .field("weight", &self.weight)
            .field("steps", &self.steps)
            .finish_non_exhaustive()
    }
}
