//! MySQL to Rust type mapping
//!
//! A [`TypeMapper`] evaluates an ordered list of [`TypeRule`]s against the
//! lowercased column type; the first matching rule wins. Order matters:
//! `bigint unsigned` has to be tested before plain `bigint`, `datetime`
//! before `date`, and so on.

/// Predicate over a lowercased column type
#[derive(Debug, Clone, PartialEq)]
pub enum Matcher {
    Contains(String),
    StartsWith(String),
    /// Every inner matcher must match
    All(Vec<Matcher>),
    /// At least one inner matcher must match
    Any(Vec<Matcher>),
}

impl Matcher {
    pub fn contains(s: &str) -> Self {
        Matcher::Contains(s.to_string())
    }

    pub fn starts_with(s: &str) -> Self {
        Matcher::StartsWith(s.to_string())
    }

    /// Matches a lowercased type string
    pub fn matches(&self, raw_type: &str) -> bool {
        match self {
            Matcher::Contains(s) => raw_type.contains(s.as_str()),
            Matcher::StartsWith(s) => raw_type.starts_with(s.as_str()),
            Matcher::All(inner) => inner.iter().all(|m| m.matches(raw_type)),
            Matcher::Any(inner) => inner.iter().any(|m| m.matches(raw_type)),
        }
    }
}

/// One mapping rule: columns matching `matcher` map to `target`, or to
/// `nullable_target` when the column is nullable
#[derive(Debug, Clone, PartialEq)]
pub struct TypeRule {
    pub matcher: Matcher,
    pub target: String,
    pub nullable_target: String,
}

impl TypeRule {
    /// Rule whose nullable target is `Option<target>`
    pub fn new(matcher: Matcher, target: &str) -> Self {
        Self {
            matcher,
            target: target.to_string(),
            nullable_target: format!("Option<{}>", target),
        }
    }
}

/// Maps raw column types to target-language types with an ordered rule list
#[derive(Debug, Clone)]
pub struct TypeMapper {
    rules: Vec<TypeRule>,
    fallback: TypeRule,
}

impl TypeMapper {
    /// Mapper over `rules`, falling back to `String` when nothing matches
    pub fn new(rules: Vec<TypeRule>) -> Self {
        Self {
            rules,
            fallback: TypeRule::new(Matcher::Any(Vec::new()), "String"),
        }
    }

    /// The default MySQL to Rust rule set
    pub fn rust() -> Self {
        Self::new(rust_rules())
    }

    pub fn rules(&self) -> &[TypeRule] {
        &self.rules
    }

    /// Target type for a raw column type; case-insensitive in `raw_type`
    pub fn map_type(&self, raw_type: &str, nullable: bool) -> String {
        let lowered = raw_type.trim().to_lowercase();
        let rule = self
            .rules
            .iter()
            .find(|rule| rule.matcher.matches(&lowered))
            .unwrap_or(&self.fallback);

        if nullable {
            rule.nullable_target.clone()
        } else {
            rule.target.clone()
        }
    }
}

impl Default for TypeMapper {
    fn default() -> Self {
        Self::rust()
    }
}

/// Strip one `Option<...>` layer from a type (`Option<i64>` -> `i64`)
pub fn strip_option(ty: &str) -> String {
    ty.trim()
        .strip_prefix("Option<")
        .and_then(|inner| inner.strip_suffix('>'))
        .unwrap_or(ty.trim())
        .to_string()
}

/// Parameter type for passing a value of `ty` by reference where that is
/// cheaper (`String` -> `&str`, `Option<String>` -> `Option<&str>`)
pub fn param_type(ty: &str) -> String {
    match ty.trim() {
        "String" => "&str".to_string(),
        "Option<String>" => "Option<&str>".to_string(),
        "serde_json::Value" => "&serde_json::Value".to_string(),
        "Option<serde_json::Value>" => "Option<&serde_json::Value>".to_string(),
        other => other.to_string(),
    }
}

/// MySQL to Rust rules, narrowest first
pub fn rust_rules() -> Vec<TypeRule> {
    use Matcher::{All, Any};

    let unsigned = || Matcher::contains("unsigned");
    let int_family = || {
        Any(vec![
            Matcher::starts_with("int"),
            Matcher::starts_with("mediumint"),
        ])
    };

    vec![
        TypeRule::new(All(vec![Matcher::starts_with("bigint"), unsigned()]), "u64"),
        TypeRule::new(Matcher::starts_with("bigint"), "i64"),
        TypeRule::new(
            Any(vec![
                Matcher::starts_with("tinyint(1)"),
                Matcher::starts_with("bit(1)"),
                Matcher::starts_with("bool"),
            ]),
            "bool",
        ),
        TypeRule::new(All(vec![Matcher::starts_with("tinyint"), unsigned()]), "u8"),
        TypeRule::new(Matcher::starts_with("tinyint"), "i8"),
        TypeRule::new(All(vec![Matcher::starts_with("smallint"), unsigned()]), "u16"),
        TypeRule::new(Matcher::starts_with("smallint"), "i16"),
        TypeRule::new(All(vec![int_family(), unsigned()]), "u32"),
        TypeRule::new(int_family(), "i32"),
        TypeRule::new(Matcher::starts_with("float"), "f32"),
        TypeRule::new(
            Any(vec![
                Matcher::starts_with("double"),
                Matcher::starts_with("decimal"),
                Matcher::starts_with("numeric"),
                Matcher::starts_with("real"),
            ]),
            "f64",
        ),
        TypeRule::new(
            Any(vec![
                Matcher::starts_with("datetime"),
                Matcher::starts_with("timestamp"),
            ]),
            "chrono::NaiveDateTime",
        ),
        TypeRule::new(Matcher::starts_with("date"), "chrono::NaiveDate"),
        TypeRule::new(
            Any(vec![
                Matcher::contains("char"),
                Matcher::contains("text"),
                Matcher::contains("blob"),
                Matcher::contains("binary"),
            ]),
            "String",
        ),
        TypeRule::new(Matcher::starts_with("json"), "serde_json::Value"),
    ]
}
