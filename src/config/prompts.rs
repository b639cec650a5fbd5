//! Prompt templates for tubeqa.
//!
//! Prompts can be customized by placing a `qa.toml` file in the custom prompts directory.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::path::PathBuf;

/// Language used when no preamble exists for the requested one.
pub const FALLBACK_LANGUAGE: &str = "en";

/// Collection of all prompt templates.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct Prompts {
    pub qa: QaPrompts,
    /// Custom variables from config, available in all prompts.
    #[serde(skip)]
    pub variables: HashMap<String, String>,
}

/// Prompts for question answering over a transcript.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct QaPrompts {
    /// Layout of the composed prompt. Receives `preamble`, `context` and `question`.
    pub template: String,
    /// Instruction preamble per language code.
    pub preambles: BTreeMap<String, String>,
}

impl Default for QaPrompts {
    fn default() -> Self {
        let mut preambles = BTreeMap::new();
        preambles.insert(
            "en".to_string(),
            "Answer the question as truthfully as possible using the provided context from a video transcript, \
and if the answer is not contained within the text below, say \"I don't know.\""
                .to_string(),
        );
        preambles.insert(
            "tr".to_string(),
            "Soruyu bir video dökümünden alınan bağlamı kullanarak olabildiğince doğru yanıtla. \
Yanıt aşağıdaki metinde yer almıyorsa \"Bilmiyorum.\" de."
                .to_string(),
        );

        Self {
            template: "{{preamble}}\n\nContext:\n{{context}}\n\n Q: {{question}}\n A:".to_string(),
            preambles,
        }
    }
}

impl QaPrompts {
    /// Preamble for a language, falling back to English.
    pub fn preamble_for(&self, language: &str) -> &str {
        self.preambles
            .get(language)
            .or_else(|| self.preambles.get(FALLBACK_LANGUAGE))
            .map(String::as_str)
            .unwrap_or_default()
    }
}

impl Prompts {
    /// Load prompts from the default location, with optional custom directory and variables.
    pub fn load(
        custom_dir: Option<&str>,
        custom_variables: Option<&HashMap<String, String>>,
    ) -> crate::error::Result<Self> {
        let mut prompts = Prompts::default();

        if let Some(vars) = custom_variables {
            prompts.variables = vars.clone();
        }

        if let Some(dir) = custom_dir {
            let custom_path = PathBuf::from(shellexpand::tilde(dir).to_string());

            let qa_path = custom_path.join("qa.toml");
            if qa_path.exists() {
                let content = std::fs::read_to_string(&qa_path)?;
                let custom: QaPrompts = toml::from_str(&content)?;
                // Custom preambles extend the built-in ones
                let mut preambles = prompts.qa.preambles;
                preambles.extend(custom.preambles);
                prompts.qa = QaPrompts {
                    template: custom.template,
                    preambles,
                };
            }
        }

        Ok(prompts)
    }

    /// Render a prompt template with the given variables.
    ///
    /// Placeholders are resolved in a single pass over the template, so
    /// substituted values are never expanded again. Unknown placeholders are
    /// left as they are.
    pub fn render(template: &str, vars: &HashMap<String, String>) -> String {
        let mut result = String::with_capacity(template.len());
        let mut rest = template;

        while let Some(start) = rest.find("{{") {
            result.push_str(&rest[..start]);
            let after = &rest[start + 2..];
            match after.find("}}").and_then(|end| vars.get(&after[..end]).map(|v| (end, v))) {
                Some((end, value)) => {
                    result.push_str(value);
                    rest = &after[end + 2..];
                }
                None => {
                    result.push_str("{{");
                    rest = after;
                }
            }
        }

        result.push_str(rest);
        result
    }

    /// Render a prompt template with both provided variables and custom config variables.
    /// Provided variables take precedence over custom config variables.
    pub fn render_with_custom(&self, template: &str, vars: &HashMap<String, String>) -> String {
        let mut merged = self.variables.clone();
        for (key, value) in vars {
            merged.insert(key.clone(), value.clone());
        }
        Self::render(template, &merged)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_does_not_expand_values() {
        let mut vars = HashMap::new();
        vars.insert("context".to_string(), "they said {{question}} and {{preamble}}".to_string());
        vars.insert("question".to_string(), "What?".to_string());
        vars.insert("preamble".to_string(), "Be brief.".to_string());

        for _ in 0..10 {
            let rendered = Prompts::render("{{preamble}} | {{context}} | {{question}}", &vars);
            assert_eq!(rendered, "Be brief. | they said {{question}} and {{preamble}} | What?");
        }
    }

    #[test]
    fn test_render_keeps_unknown_placeholders() {
        let mut vars = HashMap::new();
        vars.insert("name".to_string(), "tubeqa".to_string());

        assert_eq!(Prompts::render("{{name}} {{missing}} {{", &vars), "tubeqa {{missing}} {{");
        assert_eq!(Prompts::render("{{{{name}}}}", &vars), "{{tubeqa}}");
    }

    #[test]
    fn test_default_prompts() {
        let prompts = Prompts::default();
        assert!(prompts.qa.template.contains("{{context}}"));
        assert!(prompts.qa.preamble_for("en").contains("I don't know"));
        assert!(prompts.qa.preamble_for("tr").contains("Bilmiyorum"));
    }

    #[test]
    fn test_unknown_language_falls_back() {
        let prompts = Prompts::default();
        assert_eq!(prompts.qa.preamble_for("xx"), prompts.qa.preamble_for("en"));
    }

    #[test]
    fn test_render_template() {
        let template = "Hello {{name}}, you have {{count}} messages.";
        let mut vars = HashMap::new();
        vars.insert("name".to_string(), "Alice".to_string());
        vars.insert("count".to_string(), "5".to_string());

        let result = Prompts::render(template, &vars);
        assert_eq!(result, "Hello Alice, you have 5 messages.");
    }

    #[test]
    fn test_load_custom_qa_prompts() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("qa.toml"),
            "template = \"{{preamble}} | {{context}} | {{question}} | {{channel}}\"\n\n[preambles]\nde = \"Antworte.\"\n",
        )
        .unwrap();

        let mut vars = HashMap::new();
        vars.insert("channel".to_string(), "Tech Talks".to_string());

        let prompts = Prompts::load(dir.path().to_str(), Some(&vars)).unwrap();
        assert_eq!(prompts.qa.preamble_for("de"), "Antworte.");
        assert!(prompts.qa.preamble_for("en").contains("I don't know"));

        let mut call_vars = HashMap::new();
        call_vars.insert("question".to_string(), "Why?".to_string());
        let rendered = prompts.render_with_custom(&prompts.qa.template, &call_vars);
        assert!(rendered.ends_with("Why? | Tech Talks"));
    }
}
