//! JSON schemas and result types for the book's code features.

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

/// Skill tier the model assigns to analyzed code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SkillLevel {
    /// Fundamentals.
    Beginner,
    /// Comfortable with more complex concepts.
    Advanced,
    /// Builds complete systems.
    Ninja,
}

/// Answer shape for [`code_analysis_schema`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CodeAnalysisResult {
    /// The analysis itself.
    pub analysis: CodeAnalysis,
}

/// Feedback on a piece of code.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CodeAnalysis {
    /// Estimated skill level reflected in the code.
    pub skill_level: SkillLevel,
    /// Quality score from 0 to 10.
    pub code_quality: f64,
    /// Key strengths.
    pub strengths: Vec<String>,
    /// Areas for improvement.
    pub weaknesses: Vec<String>,
    /// Concrete improvements with example code.
    pub suggested_improvements: Vec<SuggestedImprovement>,
}

/// One suggested improvement.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SuggestedImprovement {
    /// Short title.
    pub title: String,
    /// What to change and why.
    pub description: String,
    /// Example code showing the change.
    pub code_example: String,
}

/// Answer shape for [`code_generation_schema`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CodeGenerationResult {
    /// The generated code.
    pub code: GeneratedCode,
}

/// A generated snippet with its explanation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GeneratedCode {
    /// Language of the snippet.
    pub language: String,
    /// The code.
    pub snippet: String,
    /// How the code works.
    pub explanation: String,
    /// Ways to extend the snippet.
    pub possible_extensions: Vec<String>,
}

impl CodeAnalysis {
    /// Returns the quality score clamped to the schema's 0..=10 range.
    #[must_use]
    pub fn clamped_quality(&self) -> f64 {
        self.code_quality.clamp(0.0, 10.0)
    }
}

/// Schema for code analysis answers.
#[must_use]
pub fn code_analysis_schema() -> Value {
    json!({
        "type": "object",
        "properties": {
            "analysis": {
                "type": "object",
                "properties": {
                    "skillLevel": {
                        "type": "string",
                        "enum": ["beginner", "advanced", "ninja"],
                        "description": "The estimated skill level reflected in the code"
                    },
                    "codeQuality": {
                        "type": "number",
                        "minimum": 0,
                        "maximum": 10,
                        "description": "Code quality score from 0-10"
                    },
                    "strengths": {
                        "type": "array",
                        "items": { "type": "string" },
                        "description": "Key strengths of the code"
                    },
                    "weaknesses": {
                        "type": "array",
                        "items": { "type": "string" },
                        "description": "Areas for improvement"
                    },
                    "suggestedImprovements": {
                        "type": "array",
                        "items": {
                            "type": "object",
                            "properties": {
                                "title": { "type": "string" },
                                "description": { "type": "string" },
                                "codeExample": { "type": "string" }
                            },
                            "required": ["title", "description", "codeExample"]
                        },
                        "description": "Suggested code improvements with examples"
                    }
                },
                "required": ["skillLevel", "codeQuality", "strengths", "weaknesses", "suggestedImprovements"]
            }
        },
        "required": ["analysis"]
    })
}

/// Schema for code generation answers.
#[must_use]
pub fn code_generation_schema() -> Value {
    json!({
        "type": "object",
        "properties": {
            "code": {
                "type": "object",
                "properties": {
                    "language": {
                        "type": "string",
                        "description": "Programming language of the generated code"
                    },
                    "snippet": {
                        "type": "string",
                        "description": "The generated code snippet"
                    },
                    "explanation": {
                        "type": "string",
                        "description": "Explanation of how the code works"
                    },
                    "possibleExtensions": {
                        "type": "array",
                        "items": { "type": "string" },
                        "description": "Possible ways to extend or enhance the code"
                    }
                },
                "required": ["language", "snippet", "explanation", "possibleExtensions"]
            }
        },
        "required": ["code"]
    })
}

/// Builds the prompt sent with [`code_analysis_schema`].
#[must_use]
pub fn analysis_prompt(language: &str, code: &str) -> String {
    format!(
        "Analyze the following {language} code and provide detailed feedback:\n\
         ```{language}\n\
         {code}\n\
         ```\n\
         \n\
         Analyze the code in terms of:\n\
         1. Skill level (beginner, advanced, or ninja)\n\
         2. Code quality (score from 0-10)\n\
         3. Key strengths\n\
         4. Areas for improvement\n\
         5. Specific suggestions with code examples\n\
         \n\
         Please be thorough and provide actionable feedback."
    )
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_analysis_schema_requires_analysis() {
        let schema = code_analysis_schema();
        assert_eq!(schema["required"], json!(["analysis"]));
        assert_eq!(
            schema["properties"]["analysis"]["properties"]["skillLevel"]["enum"],
            json!(["beginner", "advanced", "ninja"])
        );
    }

    #[test]
    fn test_generation_schema_requires_code() {
        let schema = code_generation_schema();
        assert_eq!(schema["required"], json!(["code"]));
        assert_eq!(
            schema["properties"]["code"]["required"],
            json!(["language", "snippet", "explanation", "possibleExtensions"])
        );
    }

    #[test]
    fn test_analysis_result_deserializes_camel_case() {
        let json = json!({
            "analysis": {
                "skillLevel": "advanced",
                "codeQuality": 7.5,
                "strengths": ["clear names"],
                "weaknesses": ["no tests"],
                "suggestedImprovements": [{
                    "title": "Add tests",
                    "description": "Cover the edge cases",
                    "codeExample": "assert(add(1, 2) === 3);"
                }]
            }
        });

        let result: CodeAnalysisResult = serde_json::from_value(json).unwrap();
        assert_eq!(result.analysis.skill_level, SkillLevel::Advanced);
        assert_eq!(result.analysis.suggested_improvements.len(), 1);
        assert_eq!(
            result.analysis.suggested_improvements[0].code_example,
            "assert(add(1, 2) === 3);"
        );
    }

    #[test]
    fn test_generation_result_deserializes() {
        let json = json!({
            "code": {
                "language": "javascript",
                "snippet": "const x = 1;",
                "explanation": "Declares a constant",
                "possibleExtensions": ["Make it configurable"]
            }
        });

        let result: CodeGenerationResult = serde_json::from_value(json).unwrap();
        assert_eq!(result.code.possible_extensions, vec!["Make it configurable"]);
    }

    #[test]
    fn test_clamped_quality() {
        let mut analysis = CodeAnalysis {
            skill_level: SkillLevel::Beginner,
            code_quality: 14.0,
            strengths: vec![],
            weaknesses: vec![],
            suggested_improvements: vec![],
        };
        assert!((analysis.clamped_quality() - 10.0).abs() < f64::EPSILON);
        analysis.code_quality = -1.0;
        assert!(analysis.clamped_quality().abs() < f64::EPSILON);
    }

    #[test]
    fn test_analysis_prompt_embeds_code_block() {
        let prompt = analysis_prompt("python", "print('hi')");
        assert!(prompt.starts_with("Analyze the following python code"));
        assert!(prompt.contains("```python\nprint('hi')\n```"));
        assert!(prompt.contains("5. Specific suggestions with code examples"));
        assert!(prompt.ends_with("Please be thorough and provide actionable feedback."));
    }
}
