use serde::{Deserialize, Serialize};

/// How the input is compared with each case.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, Default, PartialEq, Eq, strum::AsRefStr, strum::EnumString)]
#[serde(rename_all = "camelCase")]
#[strum(serialize_all = "camelCase")]
pub enum MatchMode {
    #[default]
    Exact,
    Contains,
    StartsWith,
    EndsWith,
    Regex,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SwitchSettings {
    pub input_field: String,
    /// one case per line
    pub cases: String,
    #[serde(default)]
    pub case_sensitive: bool,
    #[serde(default = "enabled")]
    pub default_case: bool,
    #[serde(default)]
    pub match_mode: MatchMode,
    #[serde(default = "enabled")]
    pub trim_input: bool,
}

fn enabled() -> bool {
    true
}

impl SwitchSettings {
    /// Non-blank, trimmed case lines.
    pub fn case_list(&self) -> Vec<&str> {
        self.cases.lines().map(str::trim).filter(|c| !c.is_empty()).collect()
    }
}
