// Copyright 2025 Sushanth (https://github.com/sushanthpy)
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU Affero General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE. See the
// GNU Affero General Public License for more details.
//
// You should have received a copy of the GNU Affero General Public License
// along with this program. If not, see <https://www.gnu.org/licenses/>.

//! Default prompt templates for each model-backed stage.
//!
//! Placeholders are `{name}` and are filled with `str::replace`.

/// Sent once per chunk batch; the batch text travels as request context.
pub const CONCEPT_EXTRACTION: &str = r#"You are an expert in the subject of the text above. Extract the core concepts of this text.

Respond with one concept per line. Each concept must be a short phrase. Do not number the lines and do not add any other text."#;

/// `{concepts}`: the sorted candidate concepts, one per line
pub const CONCEPT_NORMALIZATION: &str = r#"Identify the most fundamental concepts that are repeatedly mentioned in the following list, and break compound ideas down into smaller concepts. For example, do not return "work and energy"; "work" and "energy" should be separate concepts. Focus on basic principles, not specific applications, analyses or examples. Drop any line that does not describe a concept.

Respond with one concept per line and nothing else.

Concepts:
{concepts}"#;

/// `{concepts}`: the normalized concepts, one per line
pub const DEPENDENCY_INFERENCE: &str = r#"Given the following list of fundamental concepts, identify the dependencies between them. For each concept, list the concepts it depends on. If a concept does not depend on any other concept, state "None".

Write one line per concept.

Concepts:
{concepts}"#;

/// `{dependencies}`: the raw dependency statements, one per line
pub const DEPENDENCY_JSON_CONVERSION: &str = r#"Convert the following list of dependencies into a structured JSON format. Each dependency should be represented as a key-value pair where the key is the concept and the value is a list of the concepts it depends on. A concept that depends on nothing maps to an empty list.

Ensure the output is a single valid JSON object with no extraneous characters, code fences or commentary.

Dependencies:
{dependencies}"#;

/// Fill `{key}` with `value`
pub fn fill(template: &str, key: &str, value: &str) -> String {
    template.replace(&format!("{{{}}}", key), value)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fill_replaces_placeholder() {
        let prompt = fill(CONCEPT_NORMALIZATION, "concepts", "Energy\nWork");
        assert!(prompt.ends_with("Concepts:\nEnergy\nWork"));
        assert!(!prompt.contains("{concepts}"));
    }

    #[test]
    fn test_templates_carry_their_placeholders() {
        assert!(CONCEPT_NORMALIZATION.contains("{concepts}"));
        assert!(DEPENDENCY_INFERENCE.contains("{concepts}"));
        assert!(DEPENDENCY_JSON_CONVERSION.contains("{dependencies}"));
        assert!(!CONCEPT_EXTRACTION.contains('{'));
    }
}
