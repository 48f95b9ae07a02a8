//! Privileged wiki write actions and the shared call-classify-retry dispatcher.
//!
//! Every action module builds an [`ActionCall`] describing one `action=` POST and hands
//! it to [`dispatch`], which owns the whole retry ladder: session-token supply, one
//! transparent credential refresh on `mwoauth-invalid-authorization`, one forced token
//! refetch on `badtoken`, revoked-consent teardown, and the mapping from recognized
//! domain rejections to localized messages. Remote diagnostic detail is logged
//! server-side only; callers always receive either a localized message or an explicit
//! reauthorization signal.

pub mod block;
pub mod delete;
pub mod filerevert;
pub mod gblock;
pub mod move_page;
pub mod rollback;
pub mod thank;
pub mod undo;

// self
use crate::{
	_prelude::*,
	context::Context,
	error::TransientError,
	http::MwClient,
	msg::MessageSource,
	obs::{self, FlowKind, FlowOutcome, FlowSpan},
	token::{TokenCache, TokenKind},
};

/// Result of one action attempt as seen by the surrounding chat layer.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ActionOutcome {
	/// Localized text to show the end user; covers success and every handled failure.
	Message(String),
	/// The delegated credential is gone; a fresh authorization flow must be started.
	ReauthorizationRequired,
}

/// Parameters of one requested action, serializable so a pending authorization can carry
/// the original request across the OAuth round trip.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum ActionParams {
	/// Block a user on one wiki.
	Block {
		/// Username or `#<id>` anonymous-actor handle.
		target: String,
		/// Block reason shown in the log.
		reason: String,
		/// Expiry string; empty picks the target-dependent default.
		expiry: String,
	},
	/// Block a user across a whole wiki farm.
	GlobalBlock {
		/// Username or `#<id>` anonymous-actor handle.
		target: String,
		/// Block reason shown in the log.
		reason: String,
		/// Expiry string; empty picks the target-dependent default.
		expiry: String,
	},
	/// Delete a page.
	Delete {
		/// Page to delete.
		page_id: u64,
		/// Deletion reason shown in the log.
		reason: String,
	},
	/// Move a page back to a previous title.
	Move {
		/// Page to move.
		from_id: u64,
		/// Destination title.
		to: String,
		/// Move reason shown in the log.
		reason: String,
	},
	/// Revert consecutive edits by one user on a page.
	Rollback {
		/// Page to roll back.
		page_id: u64,
		/// User whose top edits are reverted.
		user: String,
		/// Edit summary.
		summary: String,
	},
	/// Undo a single revision.
	Undo {
		/// Page the revision belongs to.
		page_id: u64,
		/// Revision to undo.
		revision: u64,
		/// Edit summary.
		summary: String,
	},
	/// Restore a previous file version.
	FileRevert {
		/// Archive name of the version to restore.
		archive_name: String,
		/// Upload comment shown in the log.
		comment: String,
	},
	/// Thank a user for a revision or log entry.
	Thank {
		/// Whether `id` names a revision or a log entry.
		target: ThankTarget,
		/// Revision or log-entry identifier.
		id: u64,
	},
}

/// Whether a thanks targets a revision or a log entry.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ThankTarget {
	/// Thank for a revision.
	Revision,
	/// Thank for a log entry.
	LogEntry,
}
impl ThankTarget {
	/// Parameter name carrying the identifier in the `action=thank` call.
	pub const fn as_str(self) -> &'static str {
		match self {
			ThankTarget::Revision => "rev",
			ThankTarget::LogEntry => "log",
		}
	}
}

/// Shared collaborators every action needs.
#[derive(Clone)]
pub struct ActionEnv {
	/// HTTP client for API calls.
	pub http: MwClient,
	/// Session-token cache.
	pub tokens: TokenCache,
	/// Message-key resolver.
	pub messages: Arc<dyn MessageSource>,
}
impl ActionEnv {
	pub(crate) fn text(&self, context: &Context, key: &str) -> String {
		self.messages.get(&context.locale(), key)
	}
}
impl Debug for ActionEnv {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("ActionEnv").field("tokens", &self.tokens).finish()
	}
}

/// Declarative description of one wiki write call, consumed by [`dispatch`].
pub(crate) struct ActionCall {
	/// `action=` value.
	pub action: &'static str,
	/// Session-token kinds to fetch before posting.
	pub token_kinds: &'static [TokenKind],
	/// Kind whose token is attached as the `token` form field.
	pub token_field: TokenKind,
	/// Action-specific form fields.
	pub params: Vec<(&'static str, String)>,
	/// Predicate deciding whether a 200 body reports success.
	pub success: fn(&Value) -> bool,
	/// Recognized domain rejections: `(error code, message key)`.
	pub outcomes: &'static [(&'static str, &'static str)],
	/// Message key on success.
	pub success_key: &'static str,
	/// Message key when no classifier recognizes the reply.
	pub failure_key: &'static str,
	/// Target label recorded in the success event.
	pub target: String,
}

/// Returns `true` when `target` is a `#<id>` anonymous-actor handle.
pub(crate) fn is_anonymous_target(target: &str) -> bool {
	target
		.strip_prefix('#')
		.is_some_and(|rest| !rest.is_empty() && rest.bytes().all(|b| b.is_ascii_digit()))
}

/// Runs one declarative call through the shared retry ladder.
pub(crate) async fn dispatch(
	env: &ActionEnv,
	wiki: &Url,
	context: &Context,
	call: ActionCall,
) -> ActionOutcome {
	let span = FlowSpan::new(FlowKind::Action, call.action);

	obs::record_flow_outcome(FlowKind::Action, FlowOutcome::Attempt);

	let failure_key = call.failure_key;

	match span.instrument(dispatch_inner(env, wiki, context, call)).await {
		Ok(message) => {
			obs::record_flow_outcome(FlowKind::Action, FlowOutcome::Success);

			ActionOutcome::Message(message)
		},
		Err(Error::ReauthorizationRequired) => {
			obs::record_flow_outcome(FlowKind::Action, FlowOutcome::Failure);

			ActionOutcome::ReauthorizationRequired
		},
		Err(_) => {
			obs::record_flow_outcome(FlowKind::Action, FlowOutcome::Failure);

			ActionOutcome::Message(env.text(context, failure_key))
		},
	}
}

async fn dispatch_inner(
	env: &ActionEnv,
	wiki: &Url,
	context: &Context,
	call: ActionCall,
) -> Result<String> {
	let mut force_token = false;
	let mut credential_retried = false;
	let mut token_retried = false;

	loop {
		let tokens =
			env.tokens.get(&env.http, wiki, context, call.token_kinds, force_token).await?;
		let token = tokens.get(call.token_field).ok_or_else(|| TransientError::ApiEndpoint {
			message: format!("session token `{}` unavailable", call.token_field),
			status: None,
		})?;
		let mut form = vec![("action", call.action.to_owned())];

		form.extend(call.params.iter().cloned());
		form.push(("token", token.expose().to_owned()));

		let response = env.http.api_post(wiki, &form, &context.access_token()).await?;

		if response.status == 200 && (call.success)(response.body_ref()) {
			obs::record_action_success(
				call.action,
				context.user_id(),
				&call.target,
				wiki.as_str(),
			);

			return Ok(env.text(context, call.success_key));
		}
		if response.has_revoked_consent() {
			return Err(context.revoke().await);
		}
		if response.has_invalid_authorization() && !credential_retried {
			context.refresh(wiki).await?;

			credential_retried = true;
			// The cached session tokens were minted under the stale access token.
			force_token = true;

			continue;
		}
		if response.has_error_code("badtoken") && !token_retried {
			token_retried = true;
			force_token = true;

			continue;
		}
		if let Some((_, key)) =
			call.outcomes.iter().find(|(code, _)| response.has_error_code(code))
		{
			return Ok(env.text(context, key));
		}

		obs::record_remote_failure(
			call.action,
			Some(response.status),
			&response.describe_errors(),
		);

		return Err(TransientError::ApiEndpoint {
			message: response.describe_errors(),
			status: Some(response.status),
		}
		.into());
	}
}
