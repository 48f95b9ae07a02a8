//! File-version restore via `action=filerevert`.

// self
use crate::{
	_prelude::*,
	actions::{self, ActionCall, ActionEnv, ActionOutcome},
	context::Context,
	token::TokenKind,
};

/// Restores the file version identified by `archive_name`.
///
/// Archive names are `<timestamp>!<filename>`; the plain filename the API wants is
/// everything after the first `!`.
pub async fn filerevert(
	env: &ActionEnv,
	wiki: &Url,
	context: &Context,
	archive_name: &str,
	comment: &str,
) -> ActionOutcome {
	let filename = filename_of(archive_name);
	let call = ActionCall {
		action: "filerevert",
		token_kinds: &[TokenKind::Csrf],
		token_field: TokenKind::Csrf,
		params: vec![
			("filename", filename.to_owned()),
			("archivename", archive_name.to_owned()),
			("comment", comment.to_owned()),
		],
		success: |body| {
			body.pointer("/filerevert/result").and_then(Value::as_str) == Some("Success")
		},
		outcomes: &[
			("filerevert-badversion", "filerevert_error_badversion"),
			("permissiondenied", "error_permissiondenied"),
		],
		success_key: "filerevert_success",
		failure_key: "filerevert_error",
		target: filename.to_owned(),
	};

	actions::dispatch(env, wiki, context, call).await
}

fn filename_of(archive_name: &str) -> &str {
	archive_name.split_once('!').map_or(archive_name, |(_, rest)| rest)
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn filename_strips_through_the_first_bang() {
		assert_eq!(filename_of("20260801123456!Example.png"), "Example.png");
		assert_eq!(filename_of("20260801123456!We!rd.png"), "We!rd.png");
		assert_eq!(filename_of("Example.png"), "Example.png");
	}
}
