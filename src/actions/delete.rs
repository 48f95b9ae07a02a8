//! Page deletion via `action=delete`.

// self
use crate::{
	_prelude::*,
	actions::{self, ActionCall, ActionEnv, ActionOutcome},
	context::Context,
	token::TokenKind,
};

/// Deletes the page identified by `page_id`.
///
/// The page is addressed by identifier rather than title so a rename between the
/// triggering event and the action cannot divert the deletion to the wrong page.
pub async fn delete(
	env: &ActionEnv,
	wiki: &Url,
	context: &Context,
	page_id: u64,
	reason: &str,
) -> ActionOutcome {
	let call = ActionCall {
		action: "delete",
		token_kinds: &[TokenKind::Csrf],
		token_field: TokenKind::Csrf,
		params: vec![
			("pageid", page_id.to_string()),
			("reason", reason.to_owned()),
		],
		success: |body| body.pointer("/delete/logid").is_some(),
		outcomes: &[
			("cantdelete", "delete_error_cantdelete"),
			("missingtitle", "error_missingtitle"),
			("permissiondenied", "error_permissiondenied"),
		],
		success_key: "delete_success",
		failure_key: "delete_error",
		target: page_id.to_string(),
	};

	actions::dispatch(env, wiki, context, call).await
}
