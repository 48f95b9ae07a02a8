//! Page move via `action=move`.

// self
use crate::{
	_prelude::*,
	actions::{self, ActionCall, ActionEnv, ActionOutcome},
	context::Context,
	token::TokenKind,
};

/// Moves the page identified by `from_id` back to the title `to`, without leaving a
/// redirect behind.
pub async fn move_page(
	env: &ActionEnv,
	wiki: &Url,
	context: &Context,
	from_id: u64,
	to: &str,
	reason: &str,
) -> ActionOutcome {
	let call = ActionCall {
		action: "move",
		token_kinds: &[TokenKind::Csrf],
		token_field: TokenKind::Csrf,
		params: vec![
			("fromid", from_id.to_string()),
			("to", to.to_owned()),
			("reason", reason.to_owned()),
			("noredirect", "true".to_owned()),
		],
		success: |body| body.pointer("/move/to").is_some(),
		outcomes: &[
			("selfmove", "move_error_selfmove"),
			("articleexists", "move_error_articleexists"),
			("missingtitle", "error_missingtitle"),
			("permissiondenied", "error_permissiondenied"),
		],
		success_key: "move_success",
		failure_key: "move_error",
		target: to.to_owned(),
	};

	actions::dispatch(env, wiki, context, call).await
}
