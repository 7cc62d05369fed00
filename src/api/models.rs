//! Backend records and the response shapes of the analysis endpoints

use crate::reconcile::Shape;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Organization {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub slug: String,
    #[serde(default)]
    pub plan: Option<String>,
    #[serde(default)]
    pub member_count: Option<u32>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize)]
pub struct OrganizationDraft {
    pub name: String,
    pub slug: String,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct OrganizationPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub slug: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Project {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub organization_id: Option<String>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ProjectDraft {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MemberRole {
    Owner,
    Admin,
    #[default]
    #[serde(other)]
    Member,
}

impl MemberRole {
    pub fn label(&self) -> &'static str {
        match self {
            MemberRole::Owner => "owner",
            MemberRole::Admin => "admin",
            MemberRole::Member => "member",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_lowercase().as_str() {
            "owner" => Some(MemberRole::Owner),
            "admin" => Some(MemberRole::Admin),
            "member" => Some(MemberRole::Member),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Member {
    pub id: String,
    pub email: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub role: MemberRole,
    #[serde(default)]
    pub joined_at: Option<DateTime<Utc>>,
}

impl Member {
    pub fn display_name(&self) -> &str {
        self.name
            .as_deref()
            .filter(|n| !n.trim().is_empty())
            .unwrap_or(&self.email)
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Invitation {
    pub email: String,
    pub role: MemberRole,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UsageStats {
    #[serde(default)]
    pub period: Option<String>,
    #[serde(default)]
    pub analyses_run: u64,
    #[serde(default)]
    pub analyses_limit: Option<u64>,
    #[serde(default)]
    pub tokens_used: u64,
    #[serde(default)]
    pub projects: u32,
    #[serde(default)]
    pub members: u32,
}

impl UsageStats {
    /// Fraction of the analysis quota used, when a quota exists.
    pub fn quota_ratio(&self) -> Option<f64> {
        match self.analyses_limit {
            Some(limit) if limit > 0 => Some((self.analyses_run as f64 / limit as f64).min(1.0)),
            _ => None,
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════════
//  ANALYSES
// ═══════════════════════════════════════════════════════════════════════════

/// Which analyzer produced a result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AnalysisKind {
    Instagram,
    MobileApp,
    X,
    Strategy,
}

impl AnalysisKind {
    pub const ANALYZERS: [AnalysisKind; 3] =
        [AnalysisKind::Instagram, AnalysisKind::MobileApp, AnalysisKind::X];

    pub fn label(&self) -> &'static str {
        match self {
            AnalysisKind::Instagram => "Instagram",
            AnalysisKind::MobileApp => "Mobile",
            AnalysisKind::X => "X",
            AnalysisKind::Strategy => "Strategy",
        }
    }

    pub fn shape(&self) -> &'static Shape {
        match self {
            AnalysisKind::Instagram => &INSTAGRAM_ANALYSIS,
            AnalysisKind::MobileApp => &MOBILE_APP_ANALYSIS,
            AnalysisKind::X => &X_ANALYSIS,
            AnalysisKind::Strategy => &STRATEGY,
        }
    }

    /// Prompt text for the target input of this analyzer.
    pub fn target_hint(&self) -> &'static str {
        match self {
            AnalysisKind::Instagram => "Instagram handle (e.g. @brand)",
            AnalysisKind::MobileApp => "App Store id, package name or store URL",
            AnalysisKind::X => "X handle (e.g. @brand)",
            AnalysisKind::Strategy => "Target to build a strategy for",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_lowercase().as_str() {
            "instagram" | "ig" => Some(AnalysisKind::Instagram),
            "mobile" | "app" | "mobile-app" => Some(AnalysisKind::MobileApp),
            "x" | "twitter" => Some(AnalysisKind::X),
            "strategy" => Some(AnalysisKind::Strategy),
            _ => None,
        }
    }
}

pub const INSTAGRAM_ANALYSIS: Shape = Shape::new(
    "instagram_analysis",
    &[
        "summary",
        "engagement_rate",
        "audience",
        "content_themes",
        "top_posts",
        "recommendations",
    ],
    &["raw_analysis", "raw_response"],
);

pub const MOBILE_APP_ANALYSIS: Shape = Shape::new(
    "mobile_app_analysis",
    &[
        "app_name",
        "rating_summary",
        "sentiment",
        "top_complaints",
        "feature_requests",
        "recommendations",
    ],
    &["raw_analysis", "raw_response"],
);

pub const X_ANALYSIS: Shape = Shape::new(
    "x_analysis",
    &[
        "summary",
        "sentiment",
        "top_topics",
        "engagement",
        "recommendations",
    ],
    &["raw_analysis", "raw_response"],
);

pub const STRATEGY: Shape = Shape::new(
    "strategy",
    &["title", "summary", "goals", "tactics", "timeline", "kpis"],
    &["raw_strategy", "raw_response"],
);

/// Request body shared by the analysis endpoints.
#[derive(Debug, Clone, Serialize)]
pub struct AnalysisRequest {
    pub target: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub project_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub context: Option<Value>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct InstagramAnalysis {
    #[serde(default)]
    pub summary: Option<String>,
    #[serde(default)]
    pub engagement_rate: Option<f64>,
    #[serde(default)]
    pub audience: Option<Value>,
    #[serde(default)]
    pub content_themes: Vec<String>,
    #[serde(default)]
    pub top_posts: Vec<Value>,
    #[serde(default)]
    pub recommendations: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct MobileAppAnalysis {
    #[serde(default)]
    pub app_name: Option<String>,
    #[serde(default)]
    pub rating_summary: Option<Value>,
    #[serde(default)]
    pub sentiment: Option<String>,
    #[serde(default)]
    pub top_complaints: Vec<String>,
    #[serde(default)]
    pub feature_requests: Vec<String>,
    #[serde(default)]
    pub recommendations: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct XAnalysis {
    #[serde(default)]
    pub summary: Option<String>,
    #[serde(default)]
    pub sentiment: Option<String>,
    #[serde(default)]
    pub top_topics: Vec<String>,
    #[serde(default)]
    pub engagement: Option<Value>,
    #[serde(default)]
    pub recommendations: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Strategy {
    pub title: String,
    #[serde(default)]
    pub summary: Option<String>,
    #[serde(default)]
    pub goals: Vec<String>,
    #[serde(default)]
    pub tactics: Vec<Value>,
    #[serde(default)]
    pub timeline: Option<Value>,
    #[serde(default)]
    pub kpis: Vec<Value>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reconcile::{reconcile, Typed};
    use serde_json::json;

    #[test]
    fn test_member_role_unknown_falls_back_to_member() {
        let member: Member =
            serde_json::from_value(json!({"id": "m1", "email": "a@b.io", "role": "viewer"}))
                .unwrap();
        assert_eq!(member.role, MemberRole::Member);
        assert_eq!(member.display_name(), "a@b.io");
    }

    #[test]
    fn test_quota_ratio() {
        let usage = UsageStats {
            analyses_run: 30,
            analyses_limit: Some(120),
            ..Default::default()
        };
        assert_eq!(usage.quota_ratio(), Some(0.25));
        assert_eq!(UsageStats::default().quota_ratio(), None);
    }

    #[test]
    fn test_strategy_recovered_from_raw_text() {
        let response = json!({
            "error": "parse_failed",
            "raw_strategy": "Plan:\n```json\n{\"title\": \"Grow\", \"goals\": [\"Reach 10k\"]}\n```"
        });
        match reconcile(response, AnalysisKind::Strategy.shape()).into_typed::<Strategy>() {
            Typed::Ok(strategy) => {
                assert_eq!(strategy.title, "Grow");
                assert_eq!(strategy.goals, vec!["Reach 10k".to_string()]);
            }
            other => panic!("expected recovered strategy, got {other:?}"),
        }
    }

    #[test]
    fn test_kind_parse_aliases() {
        assert_eq!(AnalysisKind::parse("twitter"), Some(AnalysisKind::X));
        assert_eq!(AnalysisKind::parse("IG"), Some(AnalysisKind::Instagram));
        assert_eq!(AnalysisKind::parse("tiktok"), None);
    }
}
