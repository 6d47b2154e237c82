//! Prompt Builder: renders student attributes into the generation prompt.
//!
//! Placeholders: `{name}`, `{good_subjects}`, `{weak_subjects}`, `{personality}`,
//! `{characteristics_line}`, `{target_length}`, `{opinion_count}`.
//! A custom template loaded from disk uses the same placeholders. The template
//! is rendered in a single pass, so substituted text is never re-expanded.

use std::path::Path;
use std::sync::LazyLock;

use regex::{Captures, Regex};
use tracing::{info, warn};

use crate::models::student::{StudentAttributes, OPINION_COUNT};

pub const UNSPECIFIED_NAME: &str = "미지정";
pub const NONE_SPECIFIED: &str = "없음";

static PLACEHOLDER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\{([a-z_]+)\}").unwrap());

/// Built-in opinion prompt. Asks for a bare JSON array so the first parser tier usually wins.
pub const OPINION_PROMPT_TEMPLATE: &str = r#"당신은 경험이 풍부한 선생님입니다. 다음 학생에 대한 평가의견을 작성해주세요.

학생 정보:
이름: {name}
잘하는 과목: {good_subjects}
못하는 과목: {weak_subjects}
성격: {personality}
{characteristics_line}
요구사항:
1. 각 의견은 약 {target_length}자로 작성해주세요. {target_length}자를 크게 넘거나 모자라지 않도록 주의해주세요.
2. {opinion_count}개의 서로 다른 스타일의 평가의견을 작성해주세요:
   - 격려형: 학생의 장점을 강조하고 격려하는 톤
   - 객관형: 객관적이고 균형잡힌 평가
   - 구체적 예시 포함형: 구체적인 사례나 예시를 포함한 평가
   - 발전 가능성 강조형: 향후 발전 가능성을 강조하는 평가
   - 종합형: 여러 측면을 종합적으로 평가
3. 정보가 "없음" 또는 "미지정"인 항목은 언급하지 마세요.
4. 결과는 정확히 {opinion_count}개의 문자열을 담은 JSON 배열로만 반환해주세요:
["의견1", "의견2", "의견3", "의견4", "의견5"]

JSON 형식으로만 응답해주세요. 다른 설명 없이 배열만 반환해주세요."#;

/// Renders prompts from a template loaded once at startup.
#[derive(Debug, Clone)]
pub struct PromptBuilder {
    template: String,
}

impl Default for PromptBuilder {
    fn default() -> Self {
        Self::new(OPINION_PROMPT_TEMPLATE)
    }
}

impl PromptBuilder {
    pub fn new(template: impl Into<String>) -> Self {
        Self {
            template: template.into(),
        }
    }

    /// Loads a template file, falling back to the built-in template if it cannot be read.
    pub fn from_file(path: &Path) -> Self {
        match std::fs::read_to_string(path) {
            Ok(template) if !template.trim().is_empty() => {
                info!("Loaded opinion prompt template from {}", path.display());
                Self::new(template)
            }
            Ok(_) => {
                warn!(
                    "Prompt template {} is empty, using built-in template",
                    path.display()
                );
                Self::default()
            }
            Err(e) => {
                warn!(
                    "Could not read prompt template {}: {e}. Using built-in template",
                    path.display()
                );
                Self::default()
            }
        }
    }

    pub fn build(&self, attributes: &StudentAttributes) -> String {
        let name = attributes
            .name
            .as_deref()
            .map(str::trim)
            .filter(|n| !n.is_empty())
            .unwrap_or(UNSPECIFIED_NAME);

        let characteristics_line = attributes
            .characteristics
            .as_deref()
            .map(str::trim)
            .filter(|c| !c.is_empty())
            .map(|c| format!("특징: {c}\n"))
            .unwrap_or_default();

        let good_subjects = join_or_none(&attributes.good_subjects);
        let weak_subjects = join_or_none(&attributes.weak_subjects);
        let personality = join_or_none(&attributes.personality_traits);
        let target_length = attributes.target_length.to_string();
        let opinion_count = OPINION_COUNT.to_string();

        PLACEHOLDER
            .replace_all(&self.template, |caps: &Captures| {
                let value: &str = match &caps[1] {
                    "name" => name,
                    "good_subjects" => &good_subjects,
                    "weak_subjects" => &weak_subjects,
                    "personality" => &personality,
                    "characteristics_line" => &characteristics_line,
                    "target_length" => &target_length,
                    "opinion_count" => &opinion_count,
                    _ => &caps[0],
                };
                value.to_string()
            })
            .into_owned()
    }
}

fn join_or_none(items: &[String]) -> String {
    if items.is_empty() {
        NONE_SPECIFIED.to_string()
    } else {
        items.join(", ")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn full_attributes() -> StudentAttributes {
        StudentAttributes {
            name: Some("김민지".to_string()),
            good_subjects: vec!["수학".to_string(), "과학".to_string()],
            weak_subjects: vec!["체육".to_string()],
            personality_traits: vec!["성실함".to_string(), "리더십".to_string()],
            characteristics: Some("발표를 즐겨함".to_string()),
            target_length: 80,
        }
    }

    #[test]
    fn test_build_contains_every_populated_field() {
        let prompt = PromptBuilder::default().build(&full_attributes());
        assert!(prompt.contains("이름: 김민지"));
        assert!(prompt.contains("잘하는 과목: 수학, 과학"));
        assert!(prompt.contains("못하는 과목: 체육"));
        assert!(prompt.contains("성격: 성실함, 리더십"));
        assert!(prompt.contains("특징: 발표를 즐겨함"));
        assert!(prompt.contains("약 80자"));
        assert!(prompt.contains("정확히 5개"));
    }

    #[test]
    fn test_build_uses_placeholders_for_missing_fields() {
        let attrs = StudentAttributes {
            good_subjects: vec!["수학".to_string()],
            target_length: 75,
            ..Default::default()
        };
        let prompt = PromptBuilder::default().build(&attrs);
        assert!(prompt.contains(&format!("이름: {UNSPECIFIED_NAME}")));
        assert!(prompt.contains(&format!("못하는 과목: {NONE_SPECIFIED}")));
        assert!(prompt.contains(&format!("성격: {NONE_SPECIFIED}")));
        assert!(!prompt.contains("특징:"));
    }

    #[test]
    fn test_build_leaves_no_unfilled_placeholders() {
        let prompt = PromptBuilder::default().build(&full_attributes());
        assert!(!prompt.contains('{'), "unfilled placeholder in: {prompt}");
    }

    #[test]
    fn test_build_treats_blank_characteristics_as_absent() {
        let attrs = StudentAttributes {
            characteristics: Some("   ".to_string()),
            personality_traits: vec!["차분함".to_string()],
            target_length: 50,
            ..Default::default()
        };
        let prompt = PromptBuilder::default().build(&attrs);
        assert!(!prompt.contains("특징:"));
    }

    #[test]
    fn test_placeholder_shaped_input_is_kept_verbatim() {
        let attrs = StudentAttributes {
            good_subjects: vec!["{personality}".to_string()],
            personality_traits: vec!["밝음".to_string()],
            characteristics: Some("{target_length}점 목표".to_string()),
            target_length: 75,
            ..Default::default()
        };
        let prompt = PromptBuilder::default().build(&attrs);
        assert!(prompt.contains("특징: {target_length}점 목표"));
        assert!(prompt.contains("잘하는 과목: {personality}"));
        assert!(prompt.contains("성격: 밝음"));
    }

    #[test]
    fn test_unknown_placeholders_are_left_alone() {
        let builder = PromptBuilder::new("{name} {unknown}");
        assert_eq!(builder.build(&full_attributes()), "김민지 {unknown}");
    }

    #[test]
    fn test_custom_template_uses_same_placeholders() {
        let builder = PromptBuilder::new("{name}|{good_subjects}|{target_length}");
        assert_eq!(builder.build(&full_attributes()), "김민지|수학, 과학|80");
    }

    #[test]
    fn test_from_file_missing_path_falls_back_to_builtin() {
        let builder = PromptBuilder::from_file(Path::new("/definitely/not/here.txt"));
        assert_eq!(builder.template, OPINION_PROMPT_TEMPLATE);
    }
}
