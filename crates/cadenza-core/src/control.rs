use crate::{Fraction, Pattern, QueryContext, TimeSpan};

/// A combinator argument that is either a fixed rational or a pattern
/// sampled at query time. Combinators taking a `ControlValue` run their
/// static algorithm once per sampled sub-window on the pattern path.
#[derive(Clone)]
pub enum ControlValue {
    Static(Fraction),
    Pattern(Box<Pattern>),
}

impl ControlValue {
    pub fn fixed(value: impl Into<Fraction>) -> Self {
        ControlValue::Static(value.into())
    }

    pub fn pattern(p: Pattern) -> Self {
        ControlValue::Pattern(Box::new(p))
    }

    /// Sample over `span`: the sub-windows and the factor in force in each.
    /// Control events with a non-numeric payload are skipped.
    pub fn sample(&self, span: TimeSpan, ctx: &QueryContext) -> Vec<(TimeSpan, Fraction)> {
        match self {
            ControlValue::Static(v) => vec![(span, *v)],
            ControlValue::Pattern(p) => p
                .query_span(span, ctx)
                .into_iter()
                .filter_map(|e| {
                    let v = e.data.effective_value()?.as_f64().ok()?;
                    Some((e.part, Fraction::from_f64(v)))
                })
                .collect(),
        }
    }
}

impl From<Fraction> for ControlValue {
    fn from(f: Fraction) -> Self {
        ControlValue::Static(f)
    }
}

impl From<f64> for ControlValue {
    fn from(v: f64) -> Self {
        ControlValue::Static(Fraction::from_f64(v))
    }
}

impl From<i64> for ControlValue {
    fn from(v: i64) -> Self {
        ControlValue::Static(Fraction::from_int(v))
    }
}

impl From<Pattern> for ControlValue {
    fn from(p: Pattern) -> Self {
        ControlValue::Pattern(Box::new(p))
    }
}
