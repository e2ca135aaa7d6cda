//! Simulation scenarios.

use std::path::Path;

use serde::{Deserialize, Serialize};

/// A simulation scenario.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Scenario {
    /// Scenario name.
    pub name: String,
    /// Description.
    pub description: String,
    /// Cache TTL override in seconds; 0 makes every event fetch.
    #[serde(default)]
    pub cache_ttl_secs: Option<u64>,
    /// Steps in the scenario.
    pub steps: Vec<ScenarioStep>,
}

/// A step in a scenario.
///
/// User events are dispatched without waiting for their result, the way a
/// UI keeps accepting input while a fetch is in flight. `Wait` is the only
/// step that lets time pass.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ScenarioStep {
    /// Type `text` into a row; no code means the current base row.
    Edit {
        #[serde(default)]
        code: Option<String>,
        text: String,
    },
    /// Pick a row as the new base.
    Select { code: String },
    /// Force a reload of the current base.
    Refresh,
    /// Let time pass.
    Wait { millis: u64 },
    /// Make the next `count` fetches fail.
    FailNextFetch { count: u32 },
}

impl Scenario {
    /// Load a built-in scenario by name.
    pub fn load(name: &str) -> anyhow::Result<Self> {
        match name {
            "typing" => Ok(Self::typing()),
            "rebase" => Ok(Self::rebase()),
            "offline" => Ok(Self::offline()),
            _ => Err(anyhow::anyhow!("Unknown scenario: {}", name)),
        }
    }

    /// Load a scenario from a JSON file.
    pub fn from_file(path: &Path) -> anyhow::Result<Self> {
        let raw = std::fs::read_to_string(path)?;
        Self::from_json(&raw)
    }

    pub fn from_json(raw: &str) -> anyhow::Result<Self> {
        Ok(serde_json::from_str(raw)?)
    }

    /// Names of the built-in scenarios.
    pub fn builtin_names() -> &'static [&'static str] {
        &["typing", "rebase", "offline"]
    }

    /// Keystrokes arriving faster than fetches complete.
    fn typing() -> Self {
        let keystroke = |text: &str| ScenarioStep::Edit {
            code: None,
            text: text.to_string(),
        };

        Self {
            name: "typing".to_string(),
            description: "Rapid typing with slow fetches; only the last amount renders".to_string(),
            cache_ttl_secs: Some(0),
            steps: vec![
                keystroke("1"),
                ScenarioStep::Wait { millis: 20 },
                keystroke("12"),
                ScenarioStep::Wait { millis: 20 },
                keystroke("123"),
                ScenarioStep::Wait { millis: 20 },
                keystroke("123x"),
                ScenarioStep::Wait { millis: 1000 },
            ],
        }
    }

    /// Switching the base row by selection and by typing.
    fn rebase() -> Self {
        Self {
            name: "rebase".to_string(),
            description: "Select and type into target rows to move the base".to_string(),
            cache_ttl_secs: None,
            steps: vec![
                ScenarioStep::Wait { millis: 500 },
                ScenarioStep::Select {
                    code: "EUR".to_string(),
                },
                ScenarioStep::Wait { millis: 800 },
                ScenarioStep::Edit {
                    code: Some("GBP".to_string()),
                    text: "40".to_string(),
                },
                ScenarioStep::Wait { millis: 800 },
                ScenarioStep::Select {
                    code: "USD".to_string(),
                },
                ScenarioStep::Wait { millis: 800 },
                ScenarioStep::Refresh,
                ScenarioStep::Wait { millis: 800 },
            ],
        }
    }

    /// Fetch failures while the last list stays on screen.
    fn offline() -> Self {
        Self {
            name: "offline".to_string(),
            description: "Failed reloads keep the last rendered rates".to_string(),
            cache_ttl_secs: None,
            steps: vec![
                ScenarioStep::Wait { millis: 500 },
                ScenarioStep::FailNextFetch { count: 2 },
                ScenarioStep::Refresh,
                ScenarioStep::Wait { millis: 800 },
                ScenarioStep::Edit {
                    code: None,
                    text: "250".to_string(),
                },
                ScenarioStep::Wait { millis: 200 },
                ScenarioStep::Refresh,
                ScenarioStep::Wait { millis: 800 },
                ScenarioStep::Refresh,
                ScenarioStep::Wait { millis: 800 },
            ],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_scenarios_load() {
        for name in Scenario::builtin_names() {
            let scenario = Scenario::load(name).unwrap();
            assert_eq!(scenario.name, *name);
            assert!(!scenario.steps.is_empty());
        }
        assert!(Scenario::load("missing").is_err());
    }

    #[test]
    fn test_scenario_from_json() {
        let raw = r#"{
            "name": "custom",
            "description": "one edit",
            "steps": [
                { "type": "edit", "text": "5" },
                { "type": "select", "code": "EUR" },
                { "type": "fail_next_fetch", "count": 1 },
                { "type": "refresh" },
                { "type": "wait", "millis": 10 }
            ]
        }"#;

        let scenario = Scenario::from_json(raw).unwrap();

        assert_eq!(scenario.cache_ttl_secs, None);
        assert_eq!(
            scenario.steps,
            vec![
                ScenarioStep::Edit { code: None, text: "5".to_string() },
                ScenarioStep::Select { code: "EUR".to_string() },
                ScenarioStep::FailNextFetch { count: 1 },
                ScenarioStep::Refresh,
                ScenarioStep::Wait { millis: 10 },
            ]
        );
    }

    #[test]
    fn test_builtin_scenario_serializes() {
        let scenario = Scenario::load("typing").unwrap();

        let json = serde_json::to_string(&scenario).unwrap();

        assert_eq!(Scenario::from_json(&json).unwrap(), scenario);
    }
}
