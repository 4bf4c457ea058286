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

//! Helpers for reading free-text model replies

use conceptmap_core::Concept;

/// Trimmed, non-empty lines
pub fn response_lines(content: &str) -> Vec<String> {
    content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect()
}

/// One concept per non-empty line, with list markers removed
pub fn concept_lines(content: &str) -> Vec<Concept> {
    content
        .lines()
        .filter_map(|line| Concept::new(strip_list_marker(line.trim())))
        .collect()
}

/// Drop a leading bullet (`-`, `*`, `•`) or ordinal (`1.`, `2)`)
pub fn strip_list_marker(line: &str) -> &str {
    for bullet in ["- ", "* ", "• "] {
        if let Some(rest) = line.strip_prefix(bullet) {
            return rest.trim_start();
        }
    }

    let digits = line.chars().take_while(char::is_ascii_digit).count();
    if digits > 0 {
        let rest = &line[digits..];
        if let Some(rest) = rest.strip_prefix(". ").or_else(|| rest.strip_prefix(") ")) {
            return rest.trim_start();
        }
    }

    line
}

/// Remove a Markdown code fence (```` ```json ... ``` ````) around a reply
pub fn strip_code_fence(content: &str) -> &str {
    let trimmed = content.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };

    // Skip the info string ("json") up to the first newline
    let body = match rest.find('\n') {
        Some(newline) => &rest[newline + 1..],
        None => rest.trim_start_matches(|c: char| c.is_ascii_alphanumeric()),
    };

    let body = body.trim_end();
    body.strip_suffix("```").unwrap_or(body).trim()
}

/// The outermost `{ ... }` span, ignoring prose around it
pub fn json_object_span(content: &str) -> Option<&str> {
    let start = content.find('{')?;
    let end = content.rfind('}')?;
    (start < end).then(|| &content[start..=end])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_response_lines_trim_and_skip_blank() {
        assert_eq!(
            response_lines("  Force: None \n\n\tMass: None\n   \n"),
            vec!["Force: None", "Mass: None"]
        );
        assert!(response_lines("").is_empty());
    }

    #[test]
    fn test_concept_lines_strip_markers() {
        let concepts = concept_lines("- Work\n* Energy\n1. Power\n12) Torque\n\nMomentum");
        let names: Vec<&str> = concepts.iter().map(Concept::as_str).collect();
        assert_eq!(names, vec!["Work", "Energy", "Power", "Torque", "Momentum"]);
    }

    #[test]
    fn test_strip_list_marker_keeps_leading_numbers_in_names() {
        assert_eq!(strip_list_marker("3D geometry"), "3D geometry");
        assert_eq!(strip_list_marker("2nd law"), "2nd law");
        assert_eq!(strip_list_marker("-5 charge"), "-5 charge");
    }

    #[test]
    fn test_strip_code_fence_variants() {
        assert_eq!(strip_code_fence("```json\n{\"a\": []}\n```"), "{\"a\": []}");
        assert_eq!(strip_code_fence("```\n{}\n```"), "{}");
        assert_eq!(strip_code_fence("```json{\"a\": []}```"), "{\"a\": []}");
        assert_eq!(strip_code_fence("  {\"a\": []}  "), "{\"a\": []}");
    }

    #[test]
    fn test_json_object_span() {
        assert_eq!(
            json_object_span("Here you go: {\"a\": [\"b\"]} Hope that helps"),
            Some("{\"a\": [\"b\"]}")
        );
        assert_eq!(json_object_span("no json"), None);
        assert_eq!(json_object_span("} {"), None);
    }
}
