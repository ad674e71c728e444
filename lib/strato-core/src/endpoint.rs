//! Endpoint path templates with `:name` placeholders.

use std::collections::BTreeMap;

/// Path parameter values for one call, keyed by placeholder name.
///
/// Values are stored stringified; repeated occurrences of the same
/// placeholder in a template all receive the same value.
pub type PathParams = BTreeMap<String, String>;

/// Builds [`PathParams`] from `(name, value)` pairs, stringifying values.
#[must_use]
pub fn path_params<N: Into<String>, V: ToString>(pairs: impl IntoIterator<Item = (N, V)>) -> PathParams {
    pairs
        .into_iter()
        .map(|(name, value)| (name.into(), value.to_string()))
        .collect()
}

/// One parsed piece of an endpoint template.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Literal(String),
    Param(String),
}

/// A parsed endpoint template, e.g. `/users/:id/orders/:order_id`.
///
/// Parsed once at declaration so substitution is a straight walk over
/// segments and the required parameter names are known up front.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EndpointTemplate {
    template: String,
    segments: Vec<Segment>,
}

impl EndpointTemplate {
    /// Parses a template. A `:` followed by ASCII alphanumerics or `_`
    /// starts a placeholder; everything else is literal text.
    #[must_use]
    pub fn parse(template: impl Into<String>) -> Self {
        let template = template.into();
        let mut segments = Vec::new();
        let mut literal = String::new();
        let mut chars = template.chars().peekable();

        while let Some(c) = chars.next() {
            if c == ':' && chars.peek().is_some_and(|&n| is_param_char(n)) {
                if !literal.is_empty() {
                    segments.push(Segment::Literal(std::mem::take(&mut literal)));
                }
                let mut name = String::new();
                while let Some(&n) = chars.peek() {
                    if is_param_char(n) {
                        name.push(n);
                        chars.next();
                    } else {
                        break;
                    }
                }
                segments.push(Segment::Param(name));
            } else {
                literal.push(c);
            }
        }
        if !literal.is_empty() {
            segments.push(Segment::Literal(literal));
        }

        Self { template, segments }
    }

    /// The original template string.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.template
    }

    /// Names of all placeholders, in order of first appearance.
    #[must_use]
    pub fn param_names(&self) -> Vec<&str> {
        let mut names = Vec::new();
        for segment in &self.segments {
            if let Segment::Param(name) = segment {
                if !names.contains(&name.as_str()) {
                    names.push(name.as_str());
                }
            }
        }
        names
    }

    /// Substitutes parameters into the template.
    ///
    /// Every occurrence of a supplied placeholder is replaced. Placeholders
    /// with no supplied value are left as literal `:name` text; their names
    /// are returned so the caller can log them.
    #[must_use]
    pub fn substitute(&self, params: &PathParams) -> (String, Vec<String>) {
        let mut path = String::with_capacity(self.template.len());
        let mut unresolved = Vec::new();

        for segment in &self.segments {
            match segment {
                Segment::Literal(text) => path.push_str(text),
                Segment::Param(name) => match params.get(name) {
                    Some(value) => path.push_str(value),
                    None => {
                        path.push(':');
                        path.push_str(name);
                        if !unresolved.contains(name) {
                            unresolved.push(name.clone());
                        }
                    }
                },
            }
        }

        (path, unresolved)
    }
}

impl std::fmt::Display for EndpointTemplate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.template)
    }
}

const fn is_param_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_'
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn substitute_single_param() {
        let template = EndpointTemplate::parse("/users/:id");
        let (path, unresolved) = template.substitute(&path_params([("id", "42")]));

        assert_eq!(path, "/users/42");
        assert!(unresolved.is_empty());
    }

    #[test]
    fn substitute_repeated_param_all_occurrences() {
        let template = EndpointTemplate::parse("/compare/:id/with/:id");
        let (path, unresolved) = template.substitute(&path_params([("id", "42")]));

        assert_eq!(path, "/compare/42/with/42");
        assert!(unresolved.is_empty());
    }

    #[test]
    fn substitute_stringifies_values() {
        let template = EndpointTemplate::parse("/orders/:order_id");
        let (path, _) = template.substitute(&path_params([("order_id", 1007_u64)]));

        assert_eq!(path, "/orders/1007");
    }

    #[test]
    fn unresolved_params_left_literal() {
        let template = EndpointTemplate::parse("/users/:id/orders/:order_id");
        let (path, unresolved) = template.substitute(&path_params([("id", "7")]));

        assert_eq!(path, "/users/7/orders/:order_id");
        assert_eq!(unresolved, vec!["order_id".to_string()]);
    }

    #[test]
    fn no_params_template_untouched() {
        let template = EndpointTemplate::parse("/health");
        let (path, unresolved) = template.substitute(&PathParams::new());

        assert_eq!(path, "/health");
        assert!(unresolved.is_empty());
    }

    #[test]
    fn param_names_in_order() {
        let template = EndpointTemplate::parse("/a/:x/b/:y/c/:x");
        assert_eq!(template.param_names(), vec!["x", "y"]);
    }

    #[test]
    fn lone_colon_is_literal() {
        let template = EndpointTemplate::parse("/time/12:30");
        // ':' followed by a digit is a placeholder start, so "30" parses as
        // a param name; a colon at end-of-string stays literal.
        let template_end = EndpointTemplate::parse("/odd/:");
        let (path, _) = template_end.substitute(&PathParams::new());
        assert_eq!(path, "/odd/:");
        assert_eq!(template.param_names(), vec!["30"]);
    }
}
