//! Prompt templates for compositing uploaded subjects into a scene.

use serde::{Deserialize, Serialize};

pub const SINGLE_SUBJECT: &str = include_str!("../data/prompts/single_subject.txt");
pub const GROUP_SELFIE: &str = include_str!("../data/prompts/group_selfie.txt");
pub const CHAT_SYSTEM: &str = include_str!("../data/prompts/chat_system.txt");

/// Scene suggestions offered to users who are not sure what to write.
pub const EXAMPLE_SCENARIOS: [&str; 4] = [
    "한강 야경을 배경으로 다 같이 웃으며 셀카 찍기",
    "노을 지는 해변에서 즐겁게 셀카 찍기",
    "에펠탑 앞에서 찍은 스냅 사진",
    "눈 덮인 산 정상에서 환하게 웃으며 기념 셀카 찍기",
];

/// Which instruction framing to use for a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PromptTemplate {
    /// One person placed into a new scene.
    SingleSubject,
    /// Everyone from the uploads posing together for a selfie.
    GroupSelfie,
}

impl PromptTemplate {
    pub fn for_subject_count(count: usize) -> Self {
        if count > 1 {
            PromptTemplate::GroupSelfie
        } else {
            PromptTemplate::SingleSubject
        }
    }

    pub fn template(&self) -> &'static str {
        match self {
            PromptTemplate::SingleSubject => SINGLE_SUBJECT,
            PromptTemplate::GroupSelfie => GROUP_SELFIE,
        }
    }

    /// Fill the template. The scenario is inserted exactly as written.
    pub fn compose(&self, scenario: &str) -> String {
        render(self.template(), &[("scenario", scenario)])
    }
}

pub fn compose_prompt(subject_count: usize, scenario: &str) -> String {
    PromptTemplate::for_subject_count(subject_count).compose(scenario)
}

/// Replace `{{key}}` placeholders in a template string.
pub fn render(template: &str, vars: &[(&str, &str)]) -> String {
    let mut result = template.to_string();
    for (key, value) in vars {
        result = result.replace(&format!("{{{{{}}}}}", key), value);
    }
    result
}
