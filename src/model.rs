use std::path::PathBuf;
use std::time::Duration;

use serde::Serialize;
use url::Url;

use crate::credentials::Credentials;

/// Award fields fixed by configuration; the user is filled in per tick.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AwardTemplate {
    pub name: String,
    pub description: Option<String>,
    pub value: i64,
    pub category: String,
    pub icon: Option<String>,
}

impl AwardTemplate {
    pub fn award_for(&self, user: i64) -> Award {
        Award {
            user,
            name: self.name.clone(),
            description: self.description.clone(),
            value: self.value,
            category: self.category.clone(),
            icon: self.icon.clone(),
        }
    }
}

/// Body of `POST /awards`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Award {
    #[serde(rename = "user_id")]
    pub user: i64,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub value: i64,
    pub category: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub icon: Option<String>,
}

/// A monitored file and the award its holder earns every interval.
#[derive(Debug, Clone)]
pub struct Flag {
    pub interval: Duration,
    pub path: PathBuf,
    pub award: AwardTemplate,
}

#[derive(Debug, Clone)]
pub struct ApiConfig {
    pub url: Url,
    pub credentials: Credentials,
}

impl ApiConfig {
    /// `awards` resolved relative to the base URL, so the base should end
    /// with a slash (`https://ctf.example.com/api/v1/`).
    pub fn awards_endpoint(&self) -> Result<Url, url::ParseError> {
        self.url.join("awards")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn template() -> AwardTemplate {
        AwardTemplate {
            name: "King of the hill".into(),
            description: None,
            value: 10,
            category: "koth".into(),
            icon: Some("crown".into()),
        }
    }

    fn api(base: &str) -> ApiConfig {
        ApiConfig {
            url: Url::parse(base).unwrap(),
            credentials: Credentials::Token { token: "t".into() },
        }
    }

    #[test]
    fn award_serializes_with_user_id_and_skips_absent_fields() {
        let award = template().award_for(42);
        assert_eq!(
            serde_json::to_value(&award).unwrap(),
            json!({
                "user_id": 42,
                "name": "King of the hill",
                "value": 10,
                "category": "koth",
                "icon": "crown",
            })
        );
    }

    #[test]
    fn each_award_gets_its_own_user() {
        let template = template();
        let first = template.award_for(1);
        let second = template.award_for(2);
        assert_eq!(first.user, 1);
        assert_eq!(second.user, 2);
        assert_eq!(first.name, second.name);
    }

    #[test]
    fn awards_endpoint_from_root() {
        let endpoint = api("https://example.com/").awards_endpoint().unwrap();
        assert_eq!(endpoint.as_str(), "https://example.com/awards");
    }

    #[test]
    fn awards_endpoint_from_api_prefix() {
        let endpoint = api("https://ctf.example.com/api/v1/").awards_endpoint().unwrap();
        assert_eq!(endpoint.as_str(), "https://ctf.example.com/api/v1/awards");

        // Without the trailing slash the last segment is replaced.
        let endpoint = api("https://ctf.example.com/api/v1").awards_endpoint().unwrap();
        assert_eq!(endpoint.as_str(), "https://ctf.example.com/api/awards");
    }

    #[test]
    fn awards_endpoint_needs_a_base() {
        assert!(api("mailto:admin@example.com").awards_endpoint().is_err());
    }
}
