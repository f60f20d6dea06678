//! Qualified variable names.
//!
//! At the composite boundary every variable is addressed as `<component>/<variable>`.
//! The first `/` separates the component id from the component's own variable name, so the
//! local name may itself contain further separators.

use crate::errors::{CouplerError, CouplerResult};
use std::fmt;

pub const SEPARATOR: char = '/';

/// A variable name split into its owning component and local name
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct QualifiedName<'a> {
    pub component: &'a str,
    pub variable: &'a str,
}

impl<'a> QualifiedName<'a> {
    /// Split on the first separator
    ///
    /// Returns `None` if there is no separator or either side is empty.
    pub fn split(name: &'a str) -> Option<Self> {
        let (component, variable) = name.split_once(SEPARATOR)?;
        if component.is_empty() || variable.is_empty() {
            return None;
        }
        Some(Self {
            component,
            variable,
        })
    }

    /// Like [`QualifiedName::split`] but reports malformed names as an error
    pub fn parse(name: &'a str) -> CouplerResult<Self> {
        Self::split(name).ok_or_else(|| CouplerError::InvalidQualifiedName(name.to_string()))
    }
}

impl fmt::Display for QualifiedName<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}{}", self.component, SEPARATOR, self.variable)
    }
}

/// Join a component id and a local variable name
pub fn qualify(component: &str, variable: &str) -> String {
    format!("{component}{SEPARATOR}{variable}")
}
