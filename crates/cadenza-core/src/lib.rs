//! Lazy pattern algebra for musical time.
//!
//! A [`Pattern`] is a pure function from a half-open rational arc and a
//! [`QueryContext`] to the list of [`Event`]s falling inside the arc.
//! Combinators compose small patterns into larger ones without materializing
//! anything; a driver queries the root cycle by cycle.
//!
//! # Examples
//!
//! ```
//! use cadenza_core::{note, sequence, Fraction, QueryContext};
//!
//! let pattern = sequence(vec![note("bd"), note("sd")]).fast(2.0);
//! let events = pattern.query_arc(Fraction::ZERO, Fraction::ONE, &QueryContext::new());
//! assert_eq!(events.len(), 4);
//! ```
//!
//! # Main components
//!
//! - [`Fraction`], [`TimeSpan`]: exact rational time
//! - [`Event`], [`VoiceData`], [`VoiceValue`]: what a query returns
//! - [`QueryContext`]: per-query configuration and seeded randomness
//! - [`Pattern`] plus the combinator modules: the algebra itself

pub mod codec;
pub mod combinators;
pub mod context;
pub mod control;
pub mod error;
pub mod euclid;
pub mod event;
pub mod fraction;
pub mod joins;
pub mod pattern;
pub mod random;
pub mod rhythm;
pub mod rng;
pub mod signal;
pub mod structure;
pub mod time;
pub mod timespan;
pub mod value;

pub use codec::{StaticEvent, StaticPattern};
pub use combinators::{
    aligned, arrangement, atom, note, run, sequence, silence, slowcat, stack, steady,
};
pub use context::{
    ContextBuilder, ContextKey, ContextValue, QueryContext, RANDOM_SEED, RANGE_MAX, RANGE_MIN,
};
pub use control::ControlValue;
pub use error::{ArithmeticError, CastError};
pub use euclid::bjorklund;
pub use event::{same_events, sort_by_part, Event};
pub use fraction::Fraction;
pub use joins::{bind, BindFn, JoinMode};
pub use pattern::{cycle_pieces, Pattern};
pub use random::{choose_per_cycle, rand_seq, randrun, sometimes_with, SometimesRoute};
pub use rhythm::euclid_morph;
pub use rng::{derive_seed, SeedMixin, SeededRng};
pub use signal::{cosine, isaw, rand_signal, saw, signal, sine, square, tri};
pub use structure::{keep_if, mask, struct_with, KeepMode};
pub use time::{compress, fast_gap, shift_time, tempo};
pub use timespan::TimeSpan;
pub use value::{VoiceData, VoiceValue};

#[cfg(test)]
mod props;
