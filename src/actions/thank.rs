//! Thanks notification via `action=thank`.

// self
use crate::{
	_prelude::*,
	actions::{self, ActionCall, ActionEnv, ActionOutcome, ThankTarget},
	context::Context,
	token::TokenKind,
};

/// Thanks the author of a revision or log entry.
///
/// Requires the Thanks extension; wikis without it reject the unknown action with
/// `badvalue`, which maps to its own message.
pub async fn thank(
	env: &ActionEnv,
	wiki: &Url,
	context: &Context,
	target: ThankTarget,
	id: u64,
) -> ActionOutcome {
	let call = ActionCall {
		action: "thank",
		token_kinds: &[TokenKind::Csrf],
		token_field: TokenKind::Csrf,
		params: vec![
			(target.as_str(), id.to_string()),
			("source", env!("CARGO_PKG_NAME").to_owned()),
		],
		success: |body| body.pointer("/result/success").is_some(),
		outcomes: &[
			("badvalue", "error_extension"),
			("invalidrevision", "error_missingtitle"),
			("thanks-error-invalid-log-id", "error_missingtitle"),
			("invalidrecipient", "thank_error_invalidrecipient"),
		],
		success_key: "thank_success",
		failure_key: "thank_error",
		target: id.to_string(),
	};

	actions::dispatch(env, wiki, context, call).await
}
