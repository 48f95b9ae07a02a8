//! Farm-wide block via `action=globalblock`.

// self
use crate::{
	_prelude::*,
	actions::{self, ActionCall, ActionEnv, ActionOutcome},
	context::Context,
	error::TransientError,
	obs,
	token::TokenKind,
};

const DEFAULT_ANONYMOUS_EXPIRY: &str = "infinite";
const DEFAULT_EXPIRY: &str = "2 weeks";

/// Blocks `target` across the whole wiki farm.
///
/// `action=globalblock` does not accept `#<id>` anonymous-actor handles, so those are
/// first resolved to the underlying account name through `list=users`. An empty `expiry`
/// defaults to an infinite block for anonymous targets and a two-week block otherwise.
pub async fn gblock(
	env: &ActionEnv,
	wiki: &Url,
	context: &Context,
	target: &str,
	reason: &str,
	expiry: &str,
) -> ActionOutcome {
	let expiry = if expiry.is_empty() {
		if actions::is_anonymous_target(target) { DEFAULT_ANONYMOUS_EXPIRY } else { DEFAULT_EXPIRY }
	} else {
		expiry
	};
	let resolved = match resolve_target(env, wiki, context, target).await {
		Ok(name) => name,
		Err(Error::ReauthorizationRequired) => return ActionOutcome::ReauthorizationRequired,
		Err(_) => return ActionOutcome::Message(env.text(context, "gblock_error")),
	};
	let call = ActionCall {
		action: "globalblock",
		token_kinds: &[TokenKind::Csrf],
		token_field: TokenKind::Csrf,
		params: vec![
			("target", resolved.clone()),
			("reason", reason.to_owned()),
			("expiry", expiry.to_owned()),
			("anononly", "true".to_owned()),
			("enable-autoblock", "true".to_owned()),
		],
		success: |body| body.pointer("/globalblock/user").is_some(),
		outcomes: &[
			("badexpiry", "block_error_invalidexpiry"),
			("globalblocking-block-alreadyblocked", "gblock_error_alreadyblocked"),
			("permissiondenied", "error_permissiondenied"),
		],
		success_key: "gblock_success",
		failure_key: "gblock_error",
		target: resolved,
	};

	actions::dispatch(env, wiki, context, call).await
}

/// Resolves a `#<id>` handle to the account name via `list=users&ususerids=`; named
/// targets pass through untouched.
async fn resolve_target(
	env: &ActionEnv,
	wiki: &Url,
	context: &Context,
	target: &str,
) -> Result<String> {
	if !actions::is_anonymous_target(target) {
		return Ok(target.to_owned());
	}

	let params = [
		("action", "query".to_owned()),
		("list", "users".to_owned()),
		("ususerids", target[1..].to_owned()),
	];
	let mut refreshed = false;

	loop {
		let response = env.http.api_get(wiki, &params, &context.access_token()).await?;

		if response.status == 200
			&& let Some(name) =
				response.body_ref().pointer("/query/users/0/name").and_then(Value::as_str)
		{
			return Ok(name.to_owned());
		}
		if response.has_revoked_consent() {
			return Err(context.revoke().await);
		}
		if response.has_invalid_authorization() && !refreshed {
			context.refresh(wiki).await?;

			refreshed = true;

			continue;
		}

		obs::record_remote_failure(
			"resolve_target",
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
