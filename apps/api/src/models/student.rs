/// Number of opinions produced for every successful request.
pub const OPINION_COUNT: usize = 5;

pub const MIN_TARGET_LENGTH: u32 = 50;
pub const MAX_TARGET_LENGTH: u32 = 100;
pub const DEFAULT_TARGET_LENGTH: u32 = 75;

/// One generated evaluative comment.
pub type Opinion = String;

/// The fixed-shape result of one generation request.
pub type Opinions = [Opinion; OPINION_COUNT];

/// Normalized description of a student, as handed to the prompt builder.
///
/// The HTTP boundary guarantees that at least one field is populated and that
/// `good_subjects` and `weak_subjects` do not overlap.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StudentAttributes {
    pub name: Option<String>,
    pub good_subjects: Vec<String>,
    pub weak_subjects: Vec<String>,
    pub personality_traits: Vec<String>,
    pub characteristics: Option<String>,
    pub target_length: u32,
}

impl StudentAttributes {
    /// Returns true when at least one descriptive field carries content.
    pub fn has_content(&self) -> bool {
        self.name.as_deref().is_some_and(|n| !n.trim().is_empty())
            || !self.good_subjects.is_empty()
            || !self.weak_subjects.is_empty()
            || !self.personality_traits.is_empty()
            || self
                .characteristics
                .as_deref()
                .is_some_and(|c| !c.trim().is_empty())
    }
}

/// Clamps a requested comment length into the supported range.
pub fn clamp_target_length(length: u32) -> u32 {
    length.clamp(MIN_TARGET_LENGTH, MAX_TARGET_LENGTH)
}

/// A single call to the provider: which model, what prompt, how long.
#[derive(Debug, Clone)]
pub struct GenerationRequest {
    pub model: String,
    pub prompt: String,
    pub target_length: u32,
}

/// Text returned by the provider for one `GenerationRequest`.
#[derive(Debug, Clone)]
pub struct RawResponse {
    pub text: String,
    pub model: String,
    pub attempts: u32,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clamp_target_length_bounds() {
        assert_eq!(clamp_target_length(10), 50);
        assert_eq!(clamp_target_length(75), 75);
        assert_eq!(clamp_target_length(500), 100);
    }

    #[test]
    fn test_default_attributes_have_no_content() {
        assert!(!StudentAttributes::default().has_content());
    }

    #[test]
    fn test_blank_name_is_not_content() {
        let attrs = StudentAttributes {
            name: Some("   ".to_string()),
            ..Default::default()
        };
        assert!(!attrs.has_content());
    }

    #[test]
    fn test_single_subject_is_content() {
        let attrs = StudentAttributes {
            good_subjects: vec!["수학".to_string()],
            ..Default::default()
        };
        assert!(attrs.has_content());
    }
}
