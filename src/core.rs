use std::borrow::Cow;
use std::fmt::{Debug, Display};

/// Error type. This is used to indicate something wrong with either the
/// puzzle definition or with the search itself (e.g., an exhausted step
/// budget). Unsolvable puzzles and exhausted frontiers are not errors.
#[derive(Debug, Clone, PartialEq)]
pub struct Error(Cow<'static, str>);
impl Error {
    pub const fn new_const(s: &'static str) -> Self {
        Error(Cow::Borrowed(s))
    }

    pub fn new<S: Into<String>>(s: S) -> Self {
        Error(Cow::Owned(s.into()))
    }

    pub fn message(&self) -> &str {
        &self.0
    }
}

impl Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::error::Error for Error {}

/// Canonical representation of a state. Two states with the same fingerprint
/// are the same node as far as the solvers are concerned.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Fingerprint(String);

impl Fingerprint {
    pub fn new<S: Into<String>>(s: S) -> Self {
        Fingerprint(s.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for Fingerprint {
    fn from(s: &str) -> Self {
        Fingerprint(s.to_string())
    }
}

impl From<String> for Fingerprint {
    fn from(s: String) -> Self {
        Fingerprint(s)
    }
}

impl Display for Fingerprint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Trait for anything the solvers can search over. States are immutable:
/// extensions() hands back brand new states and never touches the receiver.
pub trait State: Clone + Debug {
    /// Is this a goal configuration?
    fn is_solved(&self) -> bool;

    /// Cheap, one-sided check that this state can never lead to a solution.
    /// Returning true for a solvable state is a bug; returning false for an
    /// unsolvable one just costs search time.
    fn fail_fast(&self) -> bool;

    /// All states one legal step away, in a deterministic order. Empty means
    /// this is a dead end (or already solved).
    fn extensions(&self) -> Vec<Self>;

    fn fingerprint(&self) -> Fingerprint;
}
