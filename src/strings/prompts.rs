//! # Prompts
//!
//! Model prompt templates (loaded from `prompts/`) and the renderer that fills them.

/// A builder for rendering prompts with context.
pub struct PromptRenderer<'a> {
    template: &'a str,
    replacements: Vec<(&'a str, String)>,
}

impl<'a> PromptRenderer<'a> {
    pub fn new(template: &'a str) -> Self {
        Self {
            template,
            replacements: Vec::new(),
        }
    }

    pub fn set(mut self, key: &'a str, value: impl Into<String>) -> Self {
        self.replacements.push((key, value.into()));
        self
    }

    pub fn render(self) -> String {
        let mut result = self.template.to_string();
        for (key, value) in self.replacements {
            result = result.replace(key, &value);
        }

        if let Some(start) = result.find("{{")
            && let Some(end) = result[start..].find("}}")
        {
            let placeholder = &result[start..start + end + 2];
            tracing::error!("Jeeves: [PROMPT RENDER ERROR] Unreplaced placeholder found in output: {}", placeholder);
        }

        result
    }
}

pub const CLASSIFY_TEMPLATE: &str = include_str!("../../prompts/classify.md");
pub const PARSE_TEMPLATE: &str = include_str!("../../prompts/parse.md");
pub const PRD_PLAN_TEMPLATE: &str = include_str!("../../prompts/prd_plan.md");
pub const PHASE_TEMPLATE: &str = include_str!("../../prompts/phase.md");

fn or_none(text: &str) -> String {
    if text.trim().is_empty() {
        "(none)".to_string()
    } else {
        text.to_string()
    }
}

pub fn classify_prompt(message: &str) -> String {
    PromptRenderer::new(CLASSIFY_TEMPLATE)
        .set("{{MESSAGE}}", message)
        .render()
}

pub fn parse_prompt(message: &str, context: &str, actions: &[&str]) -> String {
    PromptRenderer::new(PARSE_TEMPLATE)
        .set("{{ACTIONS}}", actions.join(", "))
        .set("{{CONTEXT}}", or_none(context))
        .set("{{MESSAGE}}", message)
        .render()
}

pub fn prd_plan_prompt(prd: &str, project_path: &str, constraints: &[String]) -> String {
    PromptRenderer::new(PRD_PLAN_TEMPLATE)
        .set("{{CONSTRAINTS}}", or_none(&constraints.join("; ")))
        .set("{{PROJECT_PATH}}", project_path)
        .set("{{PRD}}", prd)
        .render()
}

/// Inputs for one phase prompt.
pub struct PhasePrompt<'a> {
    pub number: usize,
    pub total: usize,
    pub name: &'a str,
    pub description: &'a str,
    pub decisions: &'a [String],
    pub constraints: &'a [String],
    pub completed: &'a [String],
    pub project_path: &'a str,
    pub branch: Option<&'a str>,
    pub prd: &'a str,
}

fn bullets(items: &[String]) -> String {
    if items.is_empty() {
        return "(none)".to_string();
    }
    items
        .iter()
        .map(|i| format!("- {}", i))
        .collect::<Vec<_>>()
        .join("\n")
}

pub fn phase_prompt(p: &PhasePrompt) -> String {
    let branch = p
        .branch
        .map(|b| format!(" (git branch `{}`)", b))
        .unwrap_or_default();
    PromptRenderer::new(PHASE_TEMPLATE)
        .set("{{PHASE_NUMBER}}", p.number.to_string())
        .set("{{PHASE_TOTAL}}", p.total.to_string())
        .set("{{PHASE_NAME}}", p.name)
        .set("{{PHASE_DESCRIPTION}}", p.description)
        .set("{{DECISIONS}}", bullets(p.decisions))
        .set("{{CONSTRAINTS}}", bullets(p.constraints))
        .set("{{COMPLETED}}", bullets(p.completed))
        .set("{{PROJECT_PATH}}", p.project_path)
        .set("{{BRANCH}}", branch)
        .set("{{PRD}}", p.prd)
        .render()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_renderer_replaces_all_keys() {
        let out = PromptRenderer::new("a {{X}} b {{Y}}")
            .set("{{X}}", "1")
            .set("{{Y}}", "2")
            .render();
        assert_eq!(out, "a 1 b 2");
    }

    #[test]
    fn test_templates_render_without_placeholders() {
        let prompt = classify_prompt("restart plex");
        assert!(prompt.contains("restart plex"));
        assert!(!prompt.contains("{{"));

        let prompt = parse_prompt("hi", "last: status", &["status", "help"]);
        assert!(prompt.contains("status, help"));
        assert!(!prompt.contains("{{"));

        let prompt = prd_plan_prompt("a todo app", "/tmp/todo", &[]);
        assert!(prompt.contains("a todo app"));
        assert!(!prompt.contains("{{"));
    }

    #[test]
    fn test_phase_prompt_lists_decisions_and_branch() {
        let decisions = vec!["Use SQLite".to_string()];
        let prompt = phase_prompt(&PhasePrompt {
            number: 2,
            total: 3,
            name: "Storage",
            description: "Persist todos",
            decisions: &decisions,
            constraints: &[],
            completed: &["Scaffold: done".to_string()],
            project_path: "/tmp/todo",
            branch: Some("prd/todo-1a2b"),
            prd: "a todo app",
        });
        assert!(prompt.contains("Phase 2 of 3: Storage"));
        assert!(prompt.contains("- Use SQLite"));
        assert!(prompt.contains("prd/todo-1a2b"));
        assert!(!prompt.contains("{{"));
    }
}
