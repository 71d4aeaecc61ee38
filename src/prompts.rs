//! Prompt specifications for the distill and censor stages.
//!
//! Each stage has a main instruction plus one description per output field.
//! The descriptions become the JSON schema the model is asked to fill, so the
//! record shape stays fixed while its wording is data.

use crate::error::{AppError, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use strum::{Display, EnumString};

/// Pipeline stage a prompt belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum Stage {
    Distiller,
    Censor,
}

/// Per-field instructions for the three structured outputs
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldSpecs {
    #[serde(rename = "symptoms_prompt")]
    pub symptoms: String,

    #[serde(rename = "recommendation_prompt")]
    pub recommendation: String,

    #[serde(rename = "resolution_prompt")]
    pub resolution: String,
}

impl FieldSpecs {
    /// Field names paired with their descriptions, in record order
    pub fn entries(&self) -> [(&'static str, &str); 3] {
        [
            ("symptoms", self.symptoms.as_str()),
            ("recommendation", self.recommendation.as_str()),
            ("resolution", self.resolution.as_str()),
        ]
    }
}

/// Instructions for one stage
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StagePrompt {
    pub main_prompt: String,

    #[serde(flatten)]
    pub fields: FieldSpecs,
}

impl StagePrompt {
    fn validate(&self, stage: Stage) -> Result<()> {
        if self.main_prompt.trim().is_empty() {
            return Err(AppError::Configuration(format!(
                "{} main_prompt must not be empty",
                stage
            )));
        }
        for (name, description) in self.fields.entries() {
            if description.trim().is_empty() {
                return Err(AppError::Configuration(format!(
                    "{} {}_prompt must not be empty",
                    stage, name
                )));
            }
        }
        Ok(())
    }
}

/// Prompts for every stage
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PromptSpec {
    pub distiller: StagePrompt,
    pub censor: StagePrompt,
}

#[derive(Deserialize)]
struct PromptFile {
    prompts: PromptSpec,
}

impl PromptSpec {
    pub fn stage(&self, stage: Stage) -> &StagePrompt {
        match stage {
            Stage::Distiller => &self.distiller,
            Stage::Censor => &self.censor,
        }
    }

    /// Parse a YAML document with a top-level `prompts` key
    pub fn from_yaml_str(yaml: &str) -> Result<Self> {
        let file: PromptFile = serde_yaml::from_str(yaml)?;
        file.prompts.validate()?;
        Ok(file.prompts)
    }

    /// Load from a YAML file
    pub fn load(path: &Path) -> Result<Self> {
        let yaml = std::fs::read_to_string(path).map_err(|e| {
            AppError::Configuration(format!(
                "Failed to read prompt file {}: {}",
                path.display(),
                e
            ))
        })?;
        Self::from_yaml_str(&yaml)
    }

    /// Load from `path` when given, otherwise use the built-in prompts
    pub fn load_or_default(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => Self::load(path),
            None => Ok(Self::default()),
        }
    }

    pub fn validate(&self) -> Result<()> {
        self.distiller.validate(Stage::Distiller)?;
        self.censor.validate(Stage::Censor)
    }
}

impl Default for PromptSpec {
    fn default() -> Self {
        Self {
            distiller: StagePrompt {
                main_prompt: concat!(
                    "Distill the following issue into its symptoms, recommendations, and resolution. ",
                    "Remember to: ",
                    "- Think step by step ",
                    "- Do not include anything that is not there ",
                    "- Remove any dates from the output"
                )
                .to_string(),
                fields: FieldSpecs {
                    symptoms: concat!(
                        "The symptoms of the issue. Make sure to include all the symptoms here, ",
                        "focusing on the actual engineering and physics on what happened. ",
                        "I want to see something like 'So and so happened'. Keep it to two sentences."
                    )
                    .to_string(),
                    recommendation: concat!(
                        "The recommendation of the engineer who diagnosed the issue. ",
                        "Make sure to include all the recommendations here. ",
                        "I want to see an objective 'this is what was recommended'. ",
                        "Keep it to two sentences."
                    )
                    .to_string(),
                    resolution: concat!(
                        "The actual resolution of the issue. Sometimes it is not there, ",
                        "if so - Leave empty. Make sure to include all the resolution here. ",
                        "Keep it to one sentence."
                    )
                    .to_string(),
                },
            },
            censor: StagePrompt {
                main_prompt: concat!(
                    "Censor the following issue by applying the following rules: ",
                    "- Objects should be called by what they are. ",
                    "- Censor any identifying details about personnel, turbines, ",
                    "equipment identifiers (e.g. T4), as well as site names. ",
                    "- Personnel name should be turned to their job title (E.G.: Asset Manager) ",
                    "or 'Individual' if not there. ",
                    "- Think carefully about site names, they are usually capitalised. ",
                    "Replace site name with 'SITE'. ",
                    "- Turbine identifiers should be replaced with 'TURBINE/S'. ",
                    "- Replace turbine manufacturers (e.g. GE, Nordex, Siemens) with 'OEM'. ",
                    "- Remove turbine specific parameters like power output (e.g. 2 MW), ",
                    "rotor diameter (e.g. 120 m), hub height (e.g. 200 meters).\n"
                )
                .to_string(),
                fields: FieldSpecs {
                    symptoms: "The problem that a performance engineer has identified.".to_string(),
                    recommendation:
                        "The recommendation that the performance engineer has made to resolve the issue."
                            .to_string(),
                    resolution: "The action that was taken to resolve the issue.".to_string(),
                },
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn test_default_spec_is_valid() {
        let spec = PromptSpec::default();
        assert!(spec.validate().is_ok());
        assert!(spec.stage(Stage::Censor).main_prompt.contains("'SITE'"));
        assert!(spec.stage(Stage::Censor).main_prompt.contains("'TURBINE/S'"));
        assert!(spec.stage(Stage::Censor).main_prompt.contains("'OEM'"));
        assert!(spec.stage(Stage::Distiller).fields.resolution.contains("Leave empty"));
    }

    #[test]
    fn test_bundled_yaml_loads() {
        let spec = PromptSpec::from_yaml_str(include_str!("../config/prompts.yaml")).unwrap();
        assert!(spec.distiller.main_prompt.starts_with("Distill the following issue"));
        assert_eq!(
            spec.censor.fields.symptoms,
            "The problem that a performance engineer has identified."
        );
    }

    #[test]
    fn test_empty_field_description_rejected() {
        let yaml = r#"
prompts:
  distiller:
    main_prompt: distill
    symptoms_prompt: s
    recommendation_prompt: r
    resolution_prompt: ""
  censor:
    main_prompt: censor
    symptoms_prompt: s
    recommendation_prompt: r
    resolution_prompt: res
"#;
        let err = PromptSpec::from_yaml_str(yaml).unwrap_err();
        assert!(matches!(err, AppError::Configuration(_)));
        assert!(err.to_string().contains("distiller resolution_prompt"));
    }

    #[test]
    fn test_missing_stage_rejected() {
        let yaml = "prompts:\n  distiller:\n    main_prompt: x\n";
        assert!(PromptSpec::from_yaml_str(yaml).is_err());
    }

    #[test]
    fn test_stage_names() {
        assert_eq!(Stage::Distiller.to_string(), "distiller");
        assert_eq!(Stage::from_str("censor").unwrap(), Stage::Censor);
    }

    #[test]
    fn test_field_entries_order() {
        let spec = PromptSpec::default();
        let names: Vec<_> = spec.distiller.fields.entries().iter().map(|(n, _)| *n).collect();
        assert_eq!(names, vec!["symptoms", "recommendation", "resolution"]);
    }
}
