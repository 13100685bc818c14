/// The cardinality of values a parameter binds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Arity {
    /// Precisely one value.
    Single,
    /// Zero or one value, surfaced as an `Option`.
    Optional,
    /// Zero or more values, surfaced as a `Vec`.
    Repeated,
}
