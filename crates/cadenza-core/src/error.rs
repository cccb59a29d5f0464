use thiserror::Error;

/// Failures of exact rational arithmetic.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ArithmeticError {
    #[error("rational denominator is zero")]
    ZeroDenominator,
    #[error("rational division by zero")]
    DivisionByZero,
    #[error("rational arithmetic overflowed 128 bits in {op}")]
    Overflow { op: &'static str },
}

/// A value cast that cannot be performed, e.g. reading a string as an integer.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("cannot read {found} as {wanted}")]
pub struct CastError {
    pub wanted: &'static str,
    pub found: String,
}
