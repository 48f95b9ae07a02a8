//! Single-revision undo via `action=edit&undo=`.

// self
use crate::{
	_prelude::*,
	actions::{self, ActionCall, ActionEnv, ActionOutcome},
	context::Context,
	token::TokenKind,
};

/// Undoes `revision` on the page identified by `page_id`.
///
/// Unlike rollback this touches exactly one revision; an intervening conflicting edit
/// surfaces as `undofailure` and maps to its own message.
pub async fn undo(
	env: &ActionEnv,
	wiki: &Url,
	context: &Context,
	page_id: u64,
	revision: u64,
	summary: &str,
) -> ActionOutcome {
	let call = ActionCall {
		action: "edit",
		token_kinds: &[TokenKind::Csrf],
		token_field: TokenKind::Csrf,
		params: vec![
			("pageid", page_id.to_string()),
			("undo", revision.to_string()),
			("summary", summary.to_owned()),
		],
		success: |body| {
			body.pointer("/edit/result").and_then(Value::as_str) == Some("Success")
		},
		outcomes: &[
			("undofailure", "undo_error_failure"),
			("nosuchrevid", "error_missingtitle"),
			("permissiondenied", "error_permissiondenied"),
		],
		success_key: "undo_success",
		failure_key: "undo_error",
		target: revision.to_string(),
	};

	actions::dispatch(env, wiki, context, call).await
}
