//! Revert of consecutive edits via `action=rollback`.

// self
use crate::{
	_prelude::*,
	actions::{self, ActionCall, ActionEnv, ActionOutcome},
	context::Context,
	token::TokenKind,
};

/// Rolls back the top consecutive edits by `user` on the page identified by `page_id`.
///
/// Rollback uses its own token kind; the wiki rejects a CSRF token here.
pub async fn rollback(
	env: &ActionEnv,
	wiki: &Url,
	context: &Context,
	page_id: u64,
	user: &str,
	summary: &str,
) -> ActionOutcome {
	let call = ActionCall {
		action: "rollback",
		token_kinds: &[TokenKind::Rollback],
		token_field: TokenKind::Rollback,
		params: vec![
			("pageid", page_id.to_string()),
			("user", user.to_owned()),
			("summary", summary.to_owned()),
		],
		success: |body| body.pointer("/rollback/revid").is_some(),
		outcomes: &[
			("alreadyrolled", "rollback_error_alreadyrolled"),
			("missingtitle", "error_missingtitle"),
			("permissiondenied", "error_permissiondenied"),
		],
		success_key: "rollback_success",
		failure_key: "rollback_error",
		target: user.to_owned(),
	};

	actions::dispatch(env, wiki, context, call).await
}
