//! Placeholder substitution for prompt templates
//!
//! Tokens look like `{{DOMAIN_NAME}}`. Unknown tokens are left in place so a
//! partially configured template still renders.

use indexmap::IndexMap;
use lazy_regex::{regex, regex_replace_all};

pub const DOMAIN_NAME: &str = "DOMAIN_NAME";
pub const TONE_STYLE: &str = "TONE_STYLE";
pub const AGENT_NAME: &str = "AGENT_NAME";

/// Named substitution values, in insertion order
pub type Substitutions = IndexMap<String, String>;

/// Build the standard substitution map
pub fn substitutions(agent_name: &str, domain: &str, tone: &str) -> Substitutions {
    IndexMap::from([
        (AGENT_NAME.to_string(), agent_name.to_string()),
        (DOMAIN_NAME.to_string(), domain.to_string()),
        (TONE_STYLE.to_string(), tone.to_string()),
    ])
}

/// Replace every `{{NAME}}` whose name is in `values`
pub fn render(template: &str, values: &Substitutions) -> String {
    regex_replace_all!(r"\{\{([A-Za-z0-9_]+)\}\}", template, |whole: &str, name: &str| {
        match values.get(name) {
            Some(value) => value.clone(),
            None => whole.to_string(),
        }
    })
    .into_owned()
}

/// Placeholder names still present in `text`, first occurrence order, no duplicates
pub fn unresolved(text: &str) -> Vec<String> {
    let mut names: Vec<String> = Vec::new();
    for caps in regex!(r"\{\{([A-Za-z0-9_]+)\}\}").captures_iter(text) {
        let name = &caps[1];
        if !names.iter().any(|n| n == name) {
            names.push(name.to_string());
        }
    }
    names
}
