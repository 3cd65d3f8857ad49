use regex::{escape, Regex};
use std::sync::OnceLock;

/// Character class a `{name}` placeholder stands for.
const SEGMENT: &str = "[A-Za-z0-9_-]+";

fn placeholder() -> &'static Regex {
    static PLACEHOLDER: OnceLock<Regex> = OnceLock::new();
    PLACEHOLDER.get_or_init(|| Regex::new(r"\{[\w-]+\}").expect("placeholder pattern is valid"))
}

/// An anchored matcher compiled from a path template such as `/pets/{id}`.
#[derive(Debug)]
pub struct PathMatcher {
    template: String,
    regex: Regex,
}

impl PathMatcher {
    pub fn new(template: &str) -> Result<Self, regex::Error> {
        let mut pattern = String::from("^");
        let mut last = 0;

        for found in placeholder().find_iter(template) {
            pattern.push_str(&escape(&template[last..found.start()]));
            pattern.push_str(SEGMENT);
            last = found.end();
        }
        pattern.push_str(&escape(&template[last..]));
        pattern.push('$');

        Ok(Self {
            template: template.to_string(),
            regex: Regex::new(&pattern)?,
        })
    }

    pub fn template(&self) -> &str {
        &self.template
    }

    /// A missing leading `/` on `path` is added before matching.
    pub fn is_match(&self, path: &str) -> bool {
        if path.starts_with('/') {
            self.regex.is_match(path)
        } else {
            self.regex.is_match(&format!("/{}", path))
        }
    }
}

pub fn matches(template: &str, path: &str) -> bool {
    PathMatcher::new(template)
        .map(|matcher| matcher.is_match(path))
        .unwrap_or(false)
}
