//! Assist collaborator: prompt-in/text-out generation.
//!
//! Two independent uses, both synchronous request/response with no
//! streaming: drafting a task description from its title, and producing a
//! one-paragraph status summary from title, description, and the comment
//! feed. The summary overwrites any previous one on the task.

use serde::{Deserialize, Serialize};

use crate::config::AssistConfig;
use crate::error::{Error, Result};

/// Text-generation capability
pub trait TextGenerator {
    /// Title -> structured description text
    fn draft_description(&self, title: &str) -> Result<String>;

    /// Task fields + (author, text) comments -> one-paragraph summary
    fn summarize(
        &self,
        title: &str,
        description: &str,
        comments: &[(String, String)],
    ) -> Result<String>;
}

fn description_prompt(title: &str) -> String {
    format!(
        "Write a concise task description for a student club task titled \
         \"{title}\". Use two or three sentences covering the goal and the \
         expected deliverable. Reply with the description only."
    )
}

fn summary_prompt(title: &str, description: &str, comments: &[(String, String)]) -> String {
    let mut prompt = format!(
        "Summarize the current status of this task in one paragraph.\n\
         Title: {title}\nDescription: {description}\n"
    );
    if comments.is_empty() {
        prompt.push_str("There are no comments yet.\n");
    } else {
        prompt.push_str("Comments, oldest first:\n");
        for (author, text) in comments {
            prompt.push_str(&format!("- {author}: {text}\n"));
        }
    }
    prompt.push_str("Reply with the paragraph only.");
    prompt
}

/// HTTP implementation against a configured generation endpoint
pub struct HttpGenerator {
    client: reqwest::blocking::Client,
    api_url: String,
    api_key: String,
    model: String,
}

impl HttpGenerator {
    pub fn new(api_url: String, api_key: String, model: String) -> Self {
        Self {
            client: reqwest::blocking::Client::new(),
            api_url,
            api_key,
            model,
        }
    }

    /// Build from config; assist is an optional collaborator, so missing
    /// configuration is a user-visible error on the commands that need it.
    pub fn from_config(config: &AssistConfig) -> Result<Self> {
        let api_url = config.api_url.clone().ok_or_else(|| {
            Error::InvalidConfig("assist.api_url is not set; assist commands are disabled".into())
        })?;
        let api_key = std::env::var(&config.api_key_env)
            .ok()
            .filter(|k| !k.is_empty())
            .ok_or_else(|| {
                Error::InvalidConfig(format!("{} is not set in the environment", config.api_key_env))
            })?;
        Ok(Self::new(api_url, api_key, config.model.clone()))
    }

    fn generate(&self, prompt: &str) -> Result<String> {
        #[derive(Serialize)]
        struct GenerateRequest<'a> {
            model: &'a str,
            prompt: &'a str,
        }

        #[derive(Deserialize)]
        struct GenerateResponse {
            text: String,
        }

        let response = self
            .client
            .post(&self.api_url)
            .bearer_auth(&self.api_key)
            .json(&GenerateRequest {
                model: &self.model,
                prompt,
            })
            .send()?
            .error_for_status()?;

        let body: GenerateResponse = response.json()?;
        let text = body.text.trim().to_string();
        if text.is_empty() {
            return Err(Error::OperationFailed(
                "assist endpoint returned empty text".to_string(),
            ));
        }
        Ok(text)
    }
}

impl TextGenerator for HttpGenerator {
    fn draft_description(&self, title: &str) -> Result<String> {
        self.generate(&description_prompt(title))
    }

    fn summarize(
        &self,
        title: &str,
        description: &str,
        comments: &[(String, String)],
    ) -> Result<String> {
        self.generate(&summary_prompt(title, description, comments))
    }
}

/// Fixed-output generator; test doubles only
pub struct CannedGenerator {
    pub description: String,
    pub summary: String,
}

impl TextGenerator for CannedGenerator {
    fn draft_description(&self, _title: &str) -> Result<String> {
        Ok(self.description.clone())
    }

    fn summarize(
        &self,
        _title: &str,
        _description: &str,
        _comments: &[(String, String)],
    ) -> Result<String> {
        Ok(self.summary.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn summary_prompt_lists_comments_in_order() {
        let prompt = summary_prompt(
            "Venue",
            "Book it",
            &[
                ("Ada".to_string(), "called them".to_string()),
                ("Bo".to_string(), "deposit paid".to_string()),
            ],
        );
        let ada = prompt.find("- Ada: called them").unwrap();
        let bo = prompt.find("- Bo: deposit paid").unwrap();
        assert!(ada < bo);
    }

    #[test]
    fn summary_prompt_handles_empty_feed() {
        let prompt = summary_prompt("Venue", "Book it", &[]);
        assert!(prompt.contains("no comments yet"));
    }

    #[test]
    fn from_config_requires_url_and_key() {
        let config = AssistConfig {
            api_url: None,
            api_key_env: "DUTY_TEST_UNSET_ASSIST_KEY".to_string(),
            model: "m".to_string(),
        };
        assert!(matches!(
            HttpGenerator::from_config(&config),
            Err(Error::InvalidConfig(_))
        ));

        let config = AssistConfig {
            api_url: Some("https://assist.test/generate".to_string()),
            api_key_env: "DUTY_TEST_UNSET_ASSIST_KEY".to_string(),
            model: "m".to_string(),
        };
        assert!(matches!(
            HttpGenerator::from_config(&config),
            Err(Error::InvalidConfig(_))
        ));
    }
}
