// error.rs
// Configuration-time error types. Every failure here is reported before the
// first evaluation pass; the hot loop itself never returns errors.

use thiserror::Error;

/// Errors raised while compiling an algebraic expression.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ExprError {
    #[error("unexpected character '{ch}' at offset {offset}")]
    UnexpectedChar { ch: char, offset: usize },
    #[error("malformed number '{text}' at offset {offset}")]
    BadNumber { text: String, offset: usize },
    #[error("unexpected token '{token}' at offset {offset}")]
    UnexpectedToken { token: String, offset: usize },
    #[error("unexpected end of expression")]
    UnexpectedEnd,
    #[error("reference to undefined symbol '{0}'")]
    UnknownSymbol(String),
    #[error("function '{name}' expects {expected} argument(s), got {got}")]
    WrongArity {
        name: String,
        expected: usize,
        got: usize,
    },
}

/// Errors raised while configuring forces or virtual sites.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigError {
    #[error("term {term} supplies {got} parameter value(s), schema declares {expected}")]
    ParameterCount {
        term: usize,
        expected: usize,
        got: usize,
    },
    #[error("term {term} names {got} particle(s), {kind} terms require {expected}")]
    ParticleCount {
        term: usize,
        kind: &'static str,
        expected: usize,
        got: usize,
    },
    #[error("term index {0} out of range")]
    TermIndex(usize),
    #[error("no global parameter named '{0}'")]
    UnknownGlobal(String),
    #[error("particle index {0} out of range")]
    ParticleIndex(usize),
    #[error("particle {0} has nonzero mass and cannot be a virtual site")]
    MassiveVirtualSite(usize),
    #[error("particle {0} already has a virtual site definition")]
    DuplicateVirtualSite(usize),
    #[error("virtual site on particle {0} would create a cyclic dependency")]
    CyclicVirtualSite(usize),
    #[error(transparent)]
    Expr(#[from] ExprError),
}
