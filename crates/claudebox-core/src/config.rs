//! Merge of the host's Claude Code configuration into the container
//! config template.
//!
//! The template carries container defaults (trusted project entry, MCP
//! servers, onboarding flags) with two holes: the host user's id and the
//! host's OAuth account. Both are lifted verbatim from `$HOME/.claude.json`
//! so the container starts already authenticated.

use crate::error::{LauncherError, Result};
use serde_json::{Map, Value};

/// Canonical user-id field in `.claude.json`.
const USER_ID_KEY: &str = "userID";
/// Legacy spelling still found in older host configs.
const USER_ID_KEY_LEGACY: &str = "userId";
const OAUTH_ACCOUNT_KEY: &str = "oauthAccount";
const PROJECTS_KEY: &str = "projects";

/// Placeholder substituted with the host username in template project keys.
pub const USER_NAME_TOKEN: &str = "$USER_NAME";

/// Overlay identity fields from `host_config` onto `template` and resolve
/// the username placeholder in every `projects` key.
///
/// The user id prefers `userID` over the legacy `userId`, taking the first
/// spelling that is present and non-empty; the OAuth account defaults to an
/// empty document when the host has none.
pub fn merge_config(template: &Value, host_config: &Value, username: &str) -> Result<Value> {
    let mut merged = template.clone();
    let obj = merged.as_object_mut().ok_or_else(|| {
        LauncherError::MissingHostConfig("config template is not a JSON object".into())
    })?;

    let user_id = host_config
        .get(USER_ID_KEY)
        .and_then(Value::as_str)
        .filter(|s| !s.is_empty())
        .or_else(|| host_config.get(USER_ID_KEY_LEGACY).and_then(Value::as_str))
        .unwrap_or("");
    obj.insert(USER_ID_KEY.into(), Value::String(user_id.to_owned()));

    let oauth = host_config
        .get(OAUTH_ACCOUNT_KEY)
        .cloned()
        .unwrap_or_else(|| Value::Object(Map::new()));
    obj.insert(OAUTH_ACCOUNT_KEY.into(), oauth);

    if let Some(projects) = obj.get_mut(PROJECTS_KEY).and_then(Value::as_object_mut) {
        let resolved: Map<String, Value> = projects
            .iter()
            .map(|(k, v)| (k.replace(USER_NAME_TOKEN, username), v.clone()))
            .collect();
        *projects = resolved;
    }

    Ok(merged)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn template() -> Value {
        json!({
            "numStartups": 1,
            "userID": "",
            "projects": {
                "/home/$USER_NAME/dev": { "allowedTools": [] }
            },
            "oauthAccount": {}
        })
    }

    #[test]
    fn substitutes_username_in_project_keys() {
        let host = json!({ "userID": "u-1" });
        let merged = merge_config(&template(), &host, "alice").unwrap();
        let projects = merged["projects"].as_object().unwrap();
        assert!(projects.contains_key("/home/alice/dev"));
        assert!(projects.keys().all(|k| !k.contains(USER_NAME_TOKEN)));
    }

    #[test]
    fn canonical_user_id_wins_when_both_present() {
        let host = json!({ "userID": "canonical", "userId": "legacy" });
        let merged = merge_config(&template(), &host, "alice").unwrap();
        assert_eq!(merged["userID"], "canonical");
    }

    #[test]
    fn legacy_user_id_used_when_canonical_absent() {
        let host = json!({ "userId": "legacy" });
        let merged = merge_config(&template(), &host, "alice").unwrap();
        assert_eq!(merged["userID"], "legacy");
    }

    #[test]
    fn empty_canonical_user_id_falls_back_to_legacy() {
        let host = json!({ "userID": "", "userId": "legacy" });
        let merged = merge_config(&template(), &host, "alice").unwrap();
        assert_eq!(merged["userID"], "legacy");
    }

    #[test]
    fn missing_user_id_resolves_to_empty_string() {
        let host = json!({});
        let merged = merge_config(&template(), &host, "alice").unwrap();
        assert_eq!(merged["userID"], "");
    }

    #[test]
    fn oauth_account_copied_from_host() {
        let host = json!({ "oauthAccount": { "emailAddress": "a@example.com" } });
        let merged = merge_config(&template(), &host, "alice").unwrap();
        assert_eq!(merged["oauthAccount"]["emailAddress"], "a@example.com");
    }

    #[test]
    fn oauth_account_defaults_to_empty_object() {
        let host = json!({});
        let merged = merge_config(&template(), &host, "alice").unwrap();
        assert!(merged["oauthAccount"].as_object().unwrap().is_empty());
    }

    #[test]
    fn template_defaults_survive_merge() {
        let host = json!({ "userID": "u-1" });
        let merged = merge_config(&template(), &host, "alice").unwrap();
        assert_eq!(merged["numStartups"], 1);
    }

    #[test]
    fn non_object_template_rejected() {
        let host = json!({});
        assert!(matches!(
            merge_config(&json!([]), &host, "alice"),
            Err(LauncherError::MissingHostConfig(_))
        ));
    }
}
