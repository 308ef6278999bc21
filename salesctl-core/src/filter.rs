//! Optional predicate fragments

use std::fmt;

use crate::params::Param;

/// Boolean connective a clause is prefixed with
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Connective {
    And,
    Or,
}

impl Connective {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::And => "AND",
            Self::Or => "OR",
        }
    }
}

impl fmt::Display for Connective {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A triggered filter: one clause for one template region plus the
/// parameters its fragment references.
///
/// The fragment is structural SQL only. Values are referenced as `@name`
/// and travel in `params`.
#[derive(Debug, Clone, PartialEq)]
pub struct Filter {
    pub name: &'static str,
    pub region: &'static str,
    pub connective: Connective,
    pub fragment: &'static str,
    pub params: Vec<Param>,
}

impl Filter {
    /// Filter joined with `AND`
    pub fn and(name: &'static str, region: &'static str, fragment: &'static str) -> Self {
        Self {
            name,
            region,
            connective: Connective::And,
            fragment,
            params: Vec::new(),
        }
    }

    /// Filter joined with `OR`
    pub fn or(name: &'static str, region: &'static str, fragment: &'static str) -> Self {
        Self {
            connective: Connective::Or,
            ..Self::and(name, region, fragment)
        }
    }

    /// Attach a bind parameter.
    pub fn bind(mut self, param: Param) -> Self {
        self.params.push(param);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder_style_construction() {
        let filter = Filter::or("site", "filters", "s.site_id = @site_id")
            .bind(Param::int("site_id", 4));

        assert_eq!(filter.connective, Connective::Or);
        assert_eq!(filter.params.len(), 1);
        assert_eq!(filter.params[0].name, "site_id");
    }
}
