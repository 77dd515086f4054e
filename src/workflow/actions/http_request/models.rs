use std::collections::HashMap;

use serde::{Deserialize, Serialize};

#[derive(Serialize, Deserialize, Debug, Clone, Copy, Default, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum AuthType {
    #[default]
    None,
    Bearer,
    Basic,
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, Default, PartialEq, Eq, strum::AsRefStr)]
pub enum HttpRequestMethod {
    #[default]
    GET,
    POST,
    PUT,
    PATCH,
    DELETE,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HttpRequestSettings {
    pub url: String,
    #[serde(default)]
    pub method: HttpRequestMethod,
    #[serde(default)]
    pub headers: HashMap<String, String>,
    /// sent as JSON when it parses as JSON, as text otherwise
    #[serde(default)]
    pub body: String,
    #[serde(default)]
    pub auth_type: AuthType,
    #[serde(default)]
    pub auth_token: String,
}
