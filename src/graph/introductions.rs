//! # Introduction Brokering Workflow
//!
//! Coordinates the three-party exchange (requester -> introducer -> target):
//! eligibility checks against the connection graph, the pending/accepted/
//! declined/completed/cancelled state machine, and generation of the
//! introduction message. Expiry is evaluated lazily at every guard check;
//! nothing depends on a background sweep.

use std::collections::HashMap;
use std::sync::{Arc, LazyLock};

use chrono::{Duration, Utc};
use regex::{Captures, Regex};
use sea_orm::{DatabaseConnection, Set};
use uuid::Uuid;

use crate::config::GraphPolicyConfig;
use crate::error::GraphError;
use crate::graph::mutual::MutualGraph;
use crate::graph::notify::ActivityNotifier;
use crate::models::introduction_request::{
    self, IntroductionPurpose, IntroductionStatus,
};
use crate::models::user;
use crate::repositories::{IntroductionRepository, UserRepository};

const MAX_SUBJECT_CHARS: usize = 200;
const MAX_MESSAGE_CHARS: usize = 1000;

/// Default subject template for generated introductions.
pub const DEFAULT_INTRO_SUBJECT_TEMPLATE: &str =
    "Introduction: {{requesterName}} meets {{targetName}}";

/// Default body template for generated introductions.
pub const DEFAULT_INTRO_MESSAGE_TEMPLATE: &str = "Hi {{targetName}},\n\n\
I'd like to introduce you to {{requesterName}}, who reached out to me about {{purpose}}.\n\n\
In their words: \"{{requesterMessage}}\"\n\n\
I'll leave it to the two of you to take it from here.\n\n\
Warm regards,\n{{introducerName}}";

/// Introducer's decision on a pending request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IntroducerDecision {
    Accept,
    Decline,
}

/// Input for creating an introduction request.
#[derive(Debug, Clone)]
pub struct IntroductionInput {
    pub introducer: Uuid,
    pub target: Uuid,
    pub subject: String,
    pub message: String,
    pub purpose: IntroductionPurpose,
}

/// Workflow coordinator for introduction requests.
#[derive(Clone)]
pub struct IntroductionWorkflow {
    introductions: IntroductionRepository,
    users: UserRepository,
    mutual: MutualGraph,
    policy: GraphPolicyConfig,
    notifier: Arc<dyn ActivityNotifier>,
}

impl IntroductionWorkflow {
    pub fn new(
        db: Arc<DatabaseConnection>,
        policy: GraphPolicyConfig,
        notifier: Arc<dyn ActivityNotifier>,
    ) -> Self {
        Self {
            introductions: IntroductionRepository::new(Arc::clone(&db)),
            users: UserRepository::new(Arc::clone(&db)),
            mutual: MutualGraph::new(db, policy.clone()),
            policy,
            notifier,
        }
    }

    /// Create a pending introduction request.
    ///
    /// Guards, in order: three distinct existing profiles; the introducer is
    /// connected to both sides; the requester and target are not already
    /// connected; no open request for the pair within the duplicate window.
    pub async fn request(
        &self,
        requester: Uuid,
        input: IntroductionInput,
    ) -> Result<introduction_request::Model, GraphError> {
        validate_text("subject", &input.subject, MAX_SUBJECT_CHARS)?;
        validate_text("message", &input.message, MAX_MESSAGE_CHARS)?;

        let IntroductionInput {
            introducer,
            target,
            subject,
            message,
            purpose,
        } = input;

        if requester == introducer || requester == target || introducer == target {
            return Err(GraphError::InvalidParticipants);
        }

        for (id, resource) in [
            (requester, "requester profile"),
            (introducer, "introducer profile"),
            (target, "target profile"),
        ] {
            if !self.users.exists(id).await? {
                return Err(GraphError::NotFound { resource });
            }
        }

        let can_introduce = self.mutual.are_connected(introducer, requester).await?
            && self.mutual.are_connected(introducer, target).await?;
        if !can_introduce {
            return Err(GraphError::IntroducerNotEligible);
        }

        if self.mutual.are_connected(requester, target).await? {
            return Err(GraphError::AlreadyConnected);
        }

        let now = Utc::now();
        let window_start = now - Duration::days(self.policy.duplicate_window_days);
        if let Some(open) = self
            .introductions
            .find_blocking_for_pair(requester, target, window_start, now)
            .await?
        {
            return Err(GraphError::DuplicateRequest {
                request_id: open.id,
            });
        }

        let expires_at = now + Duration::days(self.policy.intro_expiry_days);
        let active = introduction_request::ActiveModel {
            id: Set(Uuid::new_v4()),
            requester_id: Set(requester),
            introducer_id: Set(introducer),
            target_id: Set(target),
            subject: Set(subject),
            message: Set(message),
            purpose: Set(purpose),
            status: Set(IntroductionStatus::Pending),
            introducer_message: Set(None),
            introducer_responded_at: Set(None),
            intro_subject: Set(None),
            intro_message: Set(None),
            intro_sent_at: Set(None),
            target_accepted: Set(None),
            target_message: Set(None),
            target_responded_at: Set(None),
            expires_at: Set(expires_at.into()),
            created_at: Set(now.into()),
            updated_at: Set(now.into()),
        };

        let request = self.introductions.insert(active).await?;
        self.notifier.introduction_requested(&request);
        Ok(request)
    }

    /// Introducer's one-time accept/decline.
    ///
    /// Accepting renders the introduction message (default or
    /// introducer-supplied template) and completes the request in the same
    /// transition; declining is terminal.
    pub async fn respond(
        &self,
        request_id: Uuid,
        actor: Uuid,
        decision: IntroducerDecision,
        response_message: Option<String>,
        message_template: Option<String>,
    ) -> Result<introduction_request::Model, GraphError> {
        let request = self.require(request_id).await?;
        let now = Utc::now();

        if request.status != IntroductionStatus::Pending || request.is_expired(now) {
            return Err(GraphError::NotRespondable {
                status: request.status,
                expired: request.is_expired(now),
            });
        }

        if actor != request.introducer_id {
            return Err(GraphError::Forbidden {
                action: "respond to this introduction request",
            });
        }

        let mut active: introduction_request::ActiveModel = request.clone().into();
        active.introducer_message = Set(response_message);
        active.introducer_responded_at = Set(Some(now.into()));
        active.updated_at = Set(now.into());

        let accepted = match decision {
            IntroducerDecision::Accept => {
                let requester = self.require_profile(request.requester_id).await?;
                let introducer = self.require_profile(request.introducer_id).await?;
                let target = self.require_profile(request.target_id).await?;

                let vars = template_vars(&request, &requester, &introducer, &target);
                let subject = render_template(DEFAULT_INTRO_SUBJECT_TEMPLATE, &vars);
                let body_template = message_template
                    .as_deref()
                    .filter(|t| !t.trim().is_empty())
                    .unwrap_or(DEFAULT_INTRO_MESSAGE_TEMPLATE);
                let body = render_template(body_template, &vars);

                active.intro_subject = Set(Some(subject));
                active.intro_message = Set(Some(body));
                active.intro_sent_at = Set(Some(now.into()));
                active.status = Set(IntroductionStatus::Completed);
                true
            }
            IntroducerDecision::Decline => {
                active.status = Set(IntroductionStatus::Declined);
                false
            }
        };

        let request = self.introductions.save(active).await?;
        self.notifier.introduction_responded(&request, accepted);
        Ok(request)
    }

    /// Record the target's acknowledgment of a completed introduction.
    /// Does not change the workflow status.
    pub async fn record_target_response(
        &self,
        request_id: Uuid,
        actor: Uuid,
        accepted: bool,
        message: Option<String>,
    ) -> Result<introduction_request::Model, GraphError> {
        let request = self.require(request_id).await?;

        if request.status != IntroductionStatus::Completed {
            return Err(GraphError::NotYetIntroduced {
                status: request.status,
            });
        }

        if actor != request.target_id {
            return Err(GraphError::Forbidden {
                action: "acknowledge this introduction",
            });
        }

        let now = Utc::now();
        let mut active: introduction_request::ActiveModel = request.into();
        active.target_accepted = Set(Some(accepted));
        active.target_message = Set(message);
        active.target_responded_at = Set(Some(now.into()));
        active.updated_at = Set(now.into());

        Ok(self.introductions.save(active).await?)
    }

    /// Requester-side cancellation, only while pending and unexpired.
    pub async fn cancel(
        &self,
        request_id: Uuid,
        actor: Uuid,
    ) -> Result<introduction_request::Model, GraphError> {
        let request = self.require(request_id).await?;
        let now = Utc::now();

        if request.status != IntroductionStatus::Pending || request.is_expired(now) {
            return Err(GraphError::NotCancellable {
                status: request.status,
                expired: request.is_expired(now),
            });
        }

        if actor != request.requester_id {
            return Err(GraphError::Forbidden {
                action: "cancel this introduction request",
            });
        }

        let mut active: introduction_request::ActiveModel = request.into();
        active.status = Set(IntroductionStatus::Cancelled);
        active.updated_at = Set(now.into());

        Ok(self.introductions.save(active).await?)
    }

    async fn require(
        &self,
        request_id: Uuid,
    ) -> Result<introduction_request::Model, GraphError> {
        self.introductions
            .find_by_id(request_id)
            .await?
            .ok_or(GraphError::NotFound {
                resource: "introduction request",
            })
    }

    async fn require_profile(&self, user_id: Uuid) -> Result<user::Model, GraphError> {
        self.users
            .find_by_id(user_id)
            .await?
            .ok_or(GraphError::NotFound { resource: "profile" })
    }
}

fn validate_text(
    field: &'static str,
    value: &str,
    max_chars: usize,
) -> Result<(), GraphError> {
    if value.trim().is_empty() {
        return Err(GraphError::InvalidInput {
            field,
            message: format!("{} must not be empty", field),
        });
    }
    if value.chars().count() > max_chars {
        return Err(GraphError::InvalidInput {
            field,
            message: format!("{} must be at most {} characters", field, max_chars),
        });
    }
    Ok(())
}

static PLACEHOLDER_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\{\{(\w+)\}\}").expect("placeholder pattern compiles"));

/// Substitute `{{placeholder}}` tokens from an explicit mapping in a single
/// pass. A one-shot scan cannot re-match text produced by a substitution, so
/// substituted values containing placeholder tokens come through verbatim;
/// unknown placeholders render as empty rather than leaking template syntax.
pub fn render_template(template: &str, vars: &HashMap<&'static str, String>) -> String {
    PLACEHOLDER_RE
        .replace_all(template, |caps: &Captures| {
            vars.get(&caps[1]).cloned().unwrap_or_default()
        })
        .into_owned()
}

fn template_vars(
    request: &introduction_request::Model,
    requester: &user::Model,
    introducer: &user::Model,
    target: &user::Model,
) -> HashMap<&'static str, String> {
    HashMap::from([
        ("requesterName", requester.display_name.clone()),
        ("introducerName", introducer.display_name.clone()),
        ("targetName", target.display_name.clone()),
        ("purpose", request.purpose.label().to_string()),
        ("requesterMessage", request.message.clone()),
    ])
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vars() -> HashMap<&'static str, String> {
        HashMap::from([
            ("requesterName", "Anouk Devos".to_string()),
            ("introducerName", "Jules Marchetti".to_string()),
            ("targetName", "Mara Lindqvist".to_string()),
            ("purpose", "a collaboration".to_string()),
            ("requesterMessage", "I admire your knitwear line.".to_string()),
        ])
    }

    #[test]
    fn default_template_substitutes_all_placeholders() {
        let rendered = render_template(DEFAULT_INTRO_MESSAGE_TEMPLATE, &vars());

        assert!(rendered.contains("Anouk Devos"));
        assert!(rendered.contains("Jules Marchetti"));
        assert!(rendered.contains("Mara Lindqvist"));
        assert!(rendered.contains("a collaboration"));
        assert!(rendered.contains("I admire your knitwear line."));
        assert!(!rendered.contains("{{"));
        assert!(!rendered.contains("}}"));
    }

    #[test]
    fn substituted_values_are_not_rescanned() {
        let mut map = vars();
        map.insert("requesterName", "{{targetName}}".to_string());

        let rendered = render_template("From {{requesterName}} to {{targetName}}", &map);

        // The injected token must come through verbatim, not expand to the
        // target's name.
        assert_eq!(rendered, "From {{targetName}} to Mara Lindqvist");
    }

    #[test]
    fn unknown_placeholders_render_empty() {
        let rendered = render_template("Hello {{nobody}}!", &vars());
        assert_eq!(rendered, "Hello !");
    }

    #[test]
    fn subject_template_renders_both_names() {
        let rendered = render_template(DEFAULT_INTRO_SUBJECT_TEMPLATE, &vars());
        assert_eq!(rendered, "Introduction: Anouk Devos meets Mara Lindqvist");
    }

    #[test]
    fn text_validation_bounds() {
        assert!(validate_text("subject", "Hello", 200).is_ok());
        assert!(validate_text("subject", "   ", 200).is_err());
        assert!(validate_text("subject", &"x".repeat(201), 200).is_err());
    }
}
