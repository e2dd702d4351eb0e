//! Seal-time report of problems that span more than one type.
//!
//! Per-type failures surface immediately from `register`. What remains (types
//! referenced but never defined, flatten graphs, base/variant mismatches) can
//! only be judged once the registration phase is over, so `seal` collects
//! every such problem instead of stopping at the first.

use std::fmt;

use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Severity {
    Warning,
    Error,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Warning => f.write_str("warning"),
            Self::Error => f.write_str("error"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Problem {
    #[error("references type `{0}`, which was never registered")]
    UnresolvedType(String),

    #[error("polymorphic field targets `{0}`, which has no discriminator key")]
    NotPolymorphicBase(String),

    #[error("nested field targets polymorphic base `{0}`; use a polymorphic kind")]
    PolymorphicAsNested(String),

    #[error("flattened field targets `{0}`, which is not a record")]
    FlattenTarget(String),

    #[error("flatten cycle through `{0}`")]
    FlattenCycle(String),

    #[error("flattened key `{0}` collides with another key of the object")]
    FlattenedKeyCollision(String),

    #[error("variant `{variant}` declares the discriminator key `{key}`")]
    DiscriminatorCollision { variant: String, key: String },

    #[error("polymorphic base has no registered variants")]
    NoVariants,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    pub severity: Severity,
    pub type_name: String,
    /// Member the problem was found on, if it is field-specific.
    pub field: Option<String>,
    pub problem: Problem,
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.severity, self.type_name)?;
        if let Some(field) = &self.field {
            write!(f, ".{}", field)?;
        }
        write!(f, ": {}", self.problem)
    }
}

/// Ordered collection of diagnostics.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Diagnostics {
    items: Vec<Diagnostic>,
}

impl Diagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn error(&mut self, type_name: &str, field: Option<&str>, problem: Problem) {
        self.push(Severity::Error, type_name, field, problem);
    }

    pub fn warning(&mut self, type_name: &str, field: Option<&str>, problem: Problem) {
        self.push(Severity::Warning, type_name, field, problem);
    }

    fn push(&mut self, severity: Severity, type_name: &str, field: Option<&str>, problem: Problem) {
        self.items.push(Diagnostic {
            severity,
            type_name: type_name.to_owned(),
            field: field.map(str::to_owned),
            problem,
        });
    }

    pub fn iter(&self) -> impl Iterator<Item = &Diagnostic> {
        self.items.iter()
    }

    pub fn errors(&self) -> impl Iterator<Item = &Diagnostic> {
        self.items.iter().filter(|d| d.severity == Severity::Error)
    }

    pub fn warnings(&self) -> impl Iterator<Item = &Diagnostic> {
        self.items.iter().filter(|d| d.severity == Severity::Warning)
    }

    pub fn has_errors(&self) -> bool {
        self.errors().next().is_some()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// True if some diagnostic carries `problem`, regardless of type or severity.
    pub fn contains(&self, problem: &Problem) -> bool {
        self.items.iter().any(|d| &d.problem == problem)
    }
}

impl fmt::Display for Diagnostics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let errors = self.errors().count();
        write!(f, "registry has {} error(s)", errors)?;
        for d in &self.items {
            write!(f, "\n  {}", d)?;
        }
        Ok(())
    }
}

impl std::error::Error for Diagnostics {}

impl<'a> IntoIterator for &'a Diagnostics {
    type Item = &'a Diagnostic;
    type IntoIter = std::slice::Iter<'a, Diagnostic>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.iter()
    }
}
