//! Local block via `action=block`.

// self
use crate::{
	_prelude::*,
	actions::{self, ActionCall, ActionEnv, ActionOutcome},
	context::Context,
	token::TokenKind,
};

/// Expiry applied to anonymous-actor targets when the caller passes none.
const DEFAULT_ANONYMOUS_EXPIRY: &str = "never";
/// Expiry applied to named targets when the caller passes none.
const DEFAULT_EXPIRY: &str = "2 weeks";

/// Blocks `target` on `wiki`, creating an autoblock and forbidding account creation.
///
/// An empty `expiry` defaults to an indefinite block for anonymous `#<id>` targets and a
/// two-week block for named accounts.
pub async fn block(
	env: &ActionEnv,
	wiki: &Url,
	context: &Context,
	target: &str,
	reason: &str,
	expiry: &str,
) -> ActionOutcome {
	let expiry = if expiry.is_empty() { default_expiry(target) } else { expiry };
	let call = ActionCall {
		action: "block",
		token_kinds: &[TokenKind::Csrf],
		token_field: TokenKind::Csrf,
		params: vec![
			("user", target.to_owned()),
			("reason", reason.to_owned()),
			("expiry", expiry.to_owned()),
			("nocreate", "true".to_owned()),
			("autoblock", "true".to_owned()),
		],
		success: |body| body.pointer("/block/id").is_some(),
		outcomes: &[
			("alreadyblocked", "block_error_alreadyblocked"),
			("badexpiry", "block_error_invalidexpiry"),
			("permissiondenied", "error_permissiondenied"),
		],
		success_key: "block_success",
		failure_key: "block_error",
		target: target.to_owned(),
	};

	actions::dispatch(env, wiki, context, call).await
}

fn default_expiry(target: &str) -> &'static str {
	if actions::is_anonymous_target(target) { DEFAULT_ANONYMOUS_EXPIRY } else { DEFAULT_EXPIRY }
}
