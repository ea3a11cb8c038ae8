//! # Reference Resolver
//!
//! Rewrites pronouns ("it", "that", "this") to the most recently mentioned
//! file, project or task, so later stages see concrete names.
//! The context is refreshed once per accepted intent via [`ReferenceResolver::update`].

use regex::{Captures, Regex};
use std::collections::BTreeMap;
use std::sync::LazyLock;

use crate::domain::types::{Action, ParsedIntent};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntityKind {
    File,
    Project,
    Task,
}

impl EntityKind {
    fn from_noun(noun: &str) -> Option<Self> {
        match noun.to_lowercase().as_str() {
            "file" => Some(EntityKind::File),
            "project" | "repo" => Some(EntityKind::Project),
            "task" => Some(EntityKind::Task),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Entity {
    pub kind: EntityKind,
    pub value: String,
}

/// Outcome of a `resolve` call.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Resolution {
    pub resolved: String,
    pub had_pronouns: bool,
    /// Original phrase -> substituted entity.
    pub resolutions: BTreeMap<String, String>,
}

// A pronoun only counts as a reference when it stands as an object: end of text,
// punctuation, or a connective word follows it. "make sure that tests pass" is left alone.
static PRONOUN_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)\b(?:(?:this|that|the)\s+(?P<noun>file|project|repo|task)|(?P<pronoun>it|that|this))(?P<tail>\s*$|\s*[.,!?;:]|\s+(?:to|and|again|now|please|for|with|in|on|up|then|too|first|later)\b)",
    )
    .expect("pronoun regex")
});

static FILE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)(?:^|[\s`'(])(?P<path>(?:[\w.~-]+/)*[\w-]+\.(?:rs|ts|tsx|js|jsx|py|go|md|json|ya?ml|toml|sh|css|html|sql|txt|lock|env|conf))\b",
    )
    .expect("file regex")
});

static PROJECT_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(?:project|repo)\s+(?:called\s+|named\s+)?`?(?P<name>[\w.-]+)`?")
        .expect("project regex")
});

/// Pulls file and project mentions out of free text.
pub fn extract_entities(text: &str) -> Vec<Entity> {
    let mut entities = Vec::new();
    for caps in FILE_RE.captures_iter(text) {
        if let Some(path) = caps.name("path") {
            entities.push(Entity {
                kind: EntityKind::File,
                value: path.as_str().to_string(),
            });
        }
    }
    for caps in PROJECT_RE.captures_iter(text) {
        if let Some(name) = caps.name("name") {
            let name = name.as_str();
            // "project plan", "project status" are not names
            if matches!(name.to_lowercase().as_str(), "plan" | "status" | "list" | "it" | "that" | "this") {
                continue;
            }
            entities.push(Entity {
                kind: EntityKind::Project,
                value: name.to_string(),
            });
        }
    }
    entities
}

#[derive(Debug, Default, Clone)]
pub struct ReferenceResolver {
    last_file: Option<(String, u64)>,
    last_project: Option<(String, u64)>,
    last_task: Option<(String, u64)>,
    seq: u64,
}

impl ReferenceResolver {
    pub fn new() -> Self {
        Self::default()
    }

    fn latest_of(&self, kind: EntityKind) -> Option<&str> {
        let slot = match kind {
            EntityKind::File => &self.last_file,
            EntityKind::Project => &self.last_project,
            EntityKind::Task => &self.last_task,
        };
        slot.as_ref().map(|(v, _)| v.as_str())
    }

    pub fn last_task(&self) -> Option<&str> {
        self.latest_of(EntityKind::Task)
    }

    /// The most recently mentioned entity of any kind.
    fn latest(&self) -> Option<&str> {
        [&self.last_file, &self.last_project, &self.last_task]
            .into_iter()
            .flatten()
            .max_by_key(|(_, seq)| *seq)
            .map(|(v, _)| v.as_str())
    }

    /// Substitutes pronouns without touching the resolver's context.
    pub fn resolve(&self, text: &str) -> Resolution {
        let mut resolutions = BTreeMap::new();

        let resolved = PRONOUN_RE.replace_all(text, |caps: &Captures| {
            let whole = &caps[0];
            let tail = caps.name("tail").map(|m| m.as_str()).unwrap_or("");
            let phrase = &whole[..whole.len() - tail.len()];

            let replacement = match caps.name("noun") {
                Some(noun) => EntityKind::from_noun(noun.as_str()).and_then(|k| self.latest_of(k)),
                None => self.latest(),
            };

            match replacement {
                Some(value) => {
                    resolutions.insert(phrase.to_string(), value.to_string());
                    format!("{}{}", value, tail)
                }
                None => whole.to_string(),
            }
        });

        Resolution {
            had_pronouns: !resolutions.is_empty(),
            resolved: resolved.into_owned(),
            resolutions,
        }
    }

    fn remember(&mut self, kind: EntityKind, value: &str) {
        self.seq += 1;
        let entry = Some((value.to_string(), self.seq));
        match kind {
            EntityKind::File => self.last_file = entry,
            EntityKind::Project => self.last_project = entry,
            EntityKind::Task => self.last_task = entry,
        }
    }

    /// Refreshes the context from an accepted intent. Call once per intent.
    pub fn update(&mut self, intent: &ParsedIntent) {
        if matches!(intent.action, Action::AgentAsk | Action::PrdSubmit | Action::AutonomousBuild)
            && let Some(prompt) = &intent.prompt
        {
            let task: String = prompt.chars().take(80).collect();
            self.remember(EntityKind::Task, task.trim());
        }

        if matches!(intent.action, Action::CreateProject | Action::AgentStart)
            && let Some(target) = &intent.target
        {
            self.remember(EntityKind::Project, target);
        }

        for text in [&intent.target, &intent.prompt].into_iter().flatten() {
            for entity in extract_entities(text) {
                self.remember(entity.kind, &entity.value);
            }
        }

        // An explicit path is the freshest mention
        if let Some(path) = &intent.resolved_path {
            self.remember(EntityKind::File, path);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ask(prompt: &str) -> ParsedIntent {
        ParsedIntent::pattern(Action::AgentAsk).with_prompt(Some(prompt.to_string()))
    }

    #[test]
    fn test_no_context_leaves_text_unchanged() {
        let resolver = ReferenceResolver::new();
        let res = resolver.resolve("fix it");
        assert_eq!(res.resolved, "fix it");
        assert!(!res.had_pronouns);
    }

    #[test]
    fn test_pronoun_resolves_to_latest_file() {
        let mut resolver = ReferenceResolver::new();
        resolver.update(&ask("look at src/main.rs"));
        let res = resolver.resolve("now refactor it please");
        assert_eq!(res.resolved, "now refactor src/main.rs please");
        assert!(res.had_pronouns);
        assert_eq!(res.resolutions.get("it").map(String::as_str), Some("src/main.rs"));
    }

    #[test]
    fn test_conjunction_that_is_not_a_reference() {
        let mut resolver = ReferenceResolver::new();
        resolver.update(&ask("open config.yaml"));
        let res = resolver.resolve("make sure that tests pass");
        assert_eq!(res.resolved, "make sure that tests pass");
    }

    #[test]
    fn test_kind_specific_reference() {
        let mut resolver = ReferenceResolver::new();
        resolver.update(&ParsedIntent::pattern(Action::CreateProject).with_target(Some("homepage".into())));
        resolver.update(&ask("check notes.md"));
        let res = resolver.resolve("deploy the project");
        assert_eq!(res.resolved, "deploy homepage");
        let res = resolver.resolve("delete this file.");
        assert_eq!(res.resolved, "delete notes.md.");
    }

    #[test]
    fn test_resolve_is_pure() {
        let mut resolver = ReferenceResolver::new();
        resolver.update(&ask("edit lib.rs"));
        let first = resolver.resolve("test it");
        let second = resolver.resolve("test it");
        assert_eq!(first, second);
    }

    #[test]
    fn test_update_prefers_most_recent_mention() {
        let mut resolver = ReferenceResolver::new();
        resolver.update(&ask("edit lib.rs"));
        resolver.update(&ParsedIntent::pattern(Action::CreateProject).with_target(Some("blog".into())));
        assert_eq!(resolver.resolve("open it").resolved, "open blog");
    }

    #[test]
    fn test_extract_entities_finds_files_and_projects() {
        let entities = extract_entities("in project atlas, update docs/README.md and Cargo.toml");
        assert!(entities.contains(&Entity { kind: EntityKind::File, value: "docs/README.md".into() }));
        assert!(entities.contains(&Entity { kind: EntityKind::File, value: "Cargo.toml".into() }));
        assert!(entities.contains(&Entity { kind: EntityKind::Project, value: "atlas".into() }));
    }
}
