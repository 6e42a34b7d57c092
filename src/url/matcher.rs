use crate::config::{compile_pattern, LinkFix, RemapRule};
use crate::ConfigError;
use regex::Regex;

/// A list of regexes searched anywhere in the candidate string
#[derive(Debug, Clone, Default)]
pub struct PatternSet {
    patterns: Vec<Regex>,
}

impl PatternSet {
    pub fn compile(patterns: &[String]) -> Result<Self, ConfigError> {
        let patterns = patterns
            .iter()
            .map(|p| compile_pattern(p))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { patterns })
    }

    /// Returns true if any pattern matches somewhere in `candidate`
    ///
    /// # Examples
    ///
    /// ```
    /// use site_ferry::url::PatternSet;
    ///
    /// let set = PatternSet::compile(&["logout".to_string(), r"\?s=$".to_string()]).unwrap();
    /// assert!(set.is_match("https://example.com/user/logout"));
    /// assert!(set.is_match("https://example.com/?s="));
    /// assert!(!set.is_match("https://example.com/?s=term"));
    /// ```
    pub fn is_match(&self, candidate: &str) -> bool {
        self.patterns.iter().any(|p| p.is_match(candidate))
    }
}

/// Rewrites URLs before their output path is computed
///
/// The first rule whose pattern matches is applied to every match in the
/// URL; later rules are not consulted.
#[derive(Debug, Clone, Default)]
pub struct UrlRemapper {
    rules: Vec<(Regex, String)>,
}

impl UrlRemapper {
    pub fn compile(rules: &[RemapRule]) -> Result<Self, ConfigError> {
        let rules = rules
            .iter()
            .map(|rule| {
                Ok((
                    compile_pattern(&rule.pattern)?,
                    normalize_replacement(&rule.replacement),
                ))
            })
            .collect::<Result<Vec<_>, ConfigError>>()?;
        Ok(Self { rules })
    }

    pub fn apply(&self, url: &str) -> String {
        for (pattern, replacement) in &self.rules {
            if pattern.is_match(url) {
                return pattern
                    .replace_all(url, replacement.as_str())
                    .into_owned();
            }
        }
        url.to_string()
    }
}

/// Accepts `\1` back-references as well as `$1`, and braces every group
/// reference so `$1_x` cannot be read as a group named `1_x`
fn normalize_replacement(replacement: &str) -> String {
    let mut out = String::with_capacity(replacement.len() + 8);
    let mut chars = replacement.chars().peekable();

    while let Some(c) = chars.next() {
        let is_group_ref = (c == '\\' || c == '$')
            && chars.peek().is_some_and(|next| next.is_ascii_digit());
        if !is_group_ref {
            out.push(c);
            continue;
        }

        let mut digits = String::new();
        while let Some(d) = chars.peek().copied().filter(char::is_ascii_digit) {
            digits.push(d);
            chars.next();
        }
        out.push_str("${");
        out.push_str(&digits);
        out.push('}');
    }

    out
}

/// Literal substitutions for links known to be broken on the source site
#[derive(Debug, Clone, Default)]
pub struct LinkFixer {
    fixes: Vec<(String, String)>,
}

impl LinkFixer {
    pub fn new(fixes: &[LinkFix]) -> Self {
        Self {
            fixes: fixes
                .iter()
                .map(|fix| (fix.from.clone(), fix.to.clone()))
                .collect(),
        }
    }

    /// Applies every substitution whose source occurs in `link`, in order
    pub fn apply(&self, link: &str) -> String {
        let mut link = link.to_string();
        for (from, to) in &self.fixes {
            if link.contains(from.as_str()) {
                link = link.replace(from.as_str(), to);
            }
        }
        link
    }
}
