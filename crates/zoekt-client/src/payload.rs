//! Request bodies sent to nodes.
//!
//! Direct searches always use the legacy body. Proxy searches use either the
//! legacy body with a `ForwardTo` list or the structured v2 body, chosen per
//! call by a [`PayloadPolicy`].

use std::time::Duration;

use serde::Serialize;
use zoekt_config::FeatureConfig;

use crate::types::{CurrentUser, ProjectId, SearchMode};

/// Lines of context returned around each match.
pub const NUM_CONTEXT_LINES: u32 = 1;

/// Version tag of the structured payload.
pub const AST_PAYLOAD_VERSION: u32 = 2;

/// Shape of a proxy request body.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PayloadStyle {
    Legacy,
    Ast,
}

/// Picks the payload style for a proxy call.
pub trait PayloadPolicy: Send + Sync {
    fn style_for(&self, user: Option<&CurrentUser>) -> PayloadStyle;
}

/// A fixed style regardless of user.
impl PayloadPolicy for PayloadStyle {
    fn style_for(&self, _user: Option<&CurrentUser>) -> PayloadStyle {
        *self
    }
}

/// Policy driven by the `features` configuration section.
#[derive(Debug, Clone, Default)]
pub struct FeatureTogglePolicy {
    features: FeatureConfig,
}

impl FeatureTogglePolicy {
    pub fn new(features: FeatureConfig) -> Self {
        Self { features }
    }
}

impl PayloadPolicy for FeatureTogglePolicy {
    fn style_for(&self, user: Option<&CurrentUser>) -> PayloadStyle {
        if self
            .features
            .ast_search_payload_enabled_for(user.map(|u| u.id))
        {
            PayloadStyle::Ast
        } else {
            PayloadStyle::Legacy
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct SearchOptions {
    pub total_max_match_count: usize,
    pub num_context_lines: u32,
}

/// A node the proxy should forward to (legacy body).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct ForwardTarget {
    pub endpoint: String,
    pub repo_ids: Vec<ProjectId>,
}

/// Body of `/api/search` and of legacy proxy requests.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct LegacySearchRequest {
    #[serde(rename = "Q")]
    pub query: String,

    pub opts: SearchOptions,

    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub repo_ids: Vec<ProjectId>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub forward_to: Option<Vec<ForwardTarget>>,
}

impl LegacySearchRequest {
    pub fn new(query: impl Into<String>, num: usize, repo_ids: Vec<ProjectId>) -> Self {
        Self {
            query: query.into(),
            opts: SearchOptions {
                total_max_match_count: num,
                num_context_lines: NUM_CONTEXT_LINES,
            },
            repo_ids,
            forward_to: None,
        }
    }

    pub fn with_forward_to(mut self, targets: Vec<ForwardTarget>) -> Self {
        self.forward_to = Some(targets);
        self
    }
}

/// A node the proxy should forward to (structured body).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AstForwardTarget {
    pub endpoint: String,
    pub repo_ids: Vec<ProjectId>,
}

/// Structured (v2) proxy request body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AstSearchRequest {
    pub version: u32,
    /// Go-style duration string, e.g. `"30s"`
    pub timeout: String,
    pub num_context_lines: u32,
    pub max_file_match_results: usize,
    pub search_mode: SearchMode,
    pub query: String,
    pub forward_to: Vec<AstForwardTarget>,
}

impl AstSearchRequest {
    pub fn new(
        query: impl Into<String>,
        num: usize,
        mode: SearchMode,
        timeout: Duration,
        forward_to: Vec<AstForwardTarget>,
    ) -> Self {
        Self {
            version: AST_PAYLOAD_VERSION,
            timeout: format!("{}s", timeout.as_secs().max(1)),
            num_context_lines: NUM_CONTEXT_LINES,
            max_file_match_results: num,
            search_mode: mode,
            query: query.into(),
            forward_to,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn test_legacy_body_shape() {
        let body = LegacySearchRequest::new("foo", 40, vec![1, 2]);
        assert_eq!(
            serde_json::to_value(&body).unwrap(),
            json!({
                "Q": "foo",
                "Opts": { "TotalMaxMatchCount": 40, "NumContextLines": 1 },
                "RepoIds": [1, 2]
            })
        );
    }

    #[test]
    fn test_legacy_body_omits_empty_repo_ids() {
        let body = LegacySearchRequest::new("foo", 10, vec![]).with_forward_to(vec![
            ForwardTarget {
                endpoint: "http://a:6090".to_string(),
                repo_ids: vec![7],
            },
        ]);

        assert_eq!(
            serde_json::to_value(&body).unwrap(),
            json!({
                "Q": "foo",
                "Opts": { "TotalMaxMatchCount": 10, "NumContextLines": 1 },
                "ForwardTo": [{ "Endpoint": "http://a:6090", "RepoIds": [7] }]
            })
        );
    }

    #[test]
    fn test_ast_body_shape() {
        let body = AstSearchRequest::new(
            "bar",
            20,
            SearchMode::Regex,
            Duration::from_secs(30),
            vec![AstForwardTarget {
                endpoint: "http://b:6090".to_string(),
                repo_ids: vec![3, 4],
            }],
        );

        assert_eq!(
            serde_json::to_value(&body).unwrap(),
            json!({
                "version": 2,
                "timeout": "30s",
                "num_context_lines": 1,
                "max_file_match_results": 20,
                "search_mode": "regex",
                "query": "bar",
                "forward_to": [{ "endpoint": "http://b:6090", "repo_ids": [3, 4] }]
            })
        );
    }

    #[test]
    fn test_feature_toggle_policy() {
        let policy = FeatureTogglePolicy::new(FeatureConfig {
            ast_search_payload: false,
            ast_search_payload_users: vec![42],
        });

        let allowed = CurrentUser::new(42, "root");
        let other = CurrentUser::new(7, "dev");

        assert_eq!(policy.style_for(Some(&allowed)), PayloadStyle::Ast);
        assert_eq!(policy.style_for(Some(&other)), PayloadStyle::Legacy);
        assert_eq!(policy.style_for(None), PayloadStyle::Legacy);

        let global = FeatureTogglePolicy::new(FeatureConfig {
            ast_search_payload: true,
            ..Default::default()
        });
        assert_eq!(global.style_for(None), PayloadStyle::Ast);
    }

    #[test]
    fn test_fixed_policy() {
        assert_eq!(PayloadStyle::Ast.style_for(None), PayloadStyle::Ast);
    }
}
