//! User-facing message resolution.
//!
//! Localization proper lives outside the core; the broker only resolves stable message
//! keys through the [`MessageSource`] seam. [`DefaultMessages`] ships the English table so
//! the crate is usable without a localization backend, and so remote error detail never
//! leaks to end users (unrecognized failures always map to a generic key).

/// Resolves a message key to localized text for the given locale tag.
pub trait MessageSource
where
	Self: Send + Sync,
{
	/// Returns the localized text for `key`, falling back to English for unknown locales.
	fn get(&self, locale: &str, key: &str) -> String;
}

/// Built-in English-only message table.
#[derive(Clone, Copy, Debug, Default)]
pub struct DefaultMessages;
impl MessageSource for DefaultMessages {
	fn get(&self, _locale: &str, key: &str) -> String {
		english(key).to_owned()
	}
}

/// English text for every message key the broker emits; unknown keys collapse to the
/// generic failure line.
pub fn english(key: &str) -> &'static str {
	match key {
		"block_success" => "The user has been blocked.",
		"block_error" => "The user could not be blocked.",
		"block_error_alreadyblocked" => "The user is already blocked.",
		"block_error_invalidexpiry" => "The expiry time is invalid.",
		"gblock_success" => "The user has been blocked globally.",
		"gblock_error" => "The user could not be blocked globally.",
		"gblock_error_alreadyblocked" => "The user is already blocked globally.",
		"delete_success" => "The page has been deleted.",
		"delete_error" => "The page could not be deleted.",
		"delete_error_cantdelete" => "The page has already been deleted.",
		"move_success" => "The page has been moved back.",
		"move_error" => "The page could not be moved back.",
		"move_error_selfmove" => "The page is already at that title.",
		"move_error_articleexists" => "A page with that title already exists.",
		"rollback_success" => "The edits have been reverted.",
		"rollback_error" => "The edits could not be reverted.",
		"rollback_error_alreadyrolled" => "There are no edits to revert.",
		"undo_success" => "The edit has been undone.",
		"undo_error" => "The edit could not be undone.",
		"undo_error_failure" => "The edit could not be undone due to a conflicting edit.",
		"filerevert_success" => "The file has been reverted.",
		"filerevert_error" => "The file could not be reverted.",
		"filerevert_error_badversion" => "That file version is no longer available.",
		"thank_success" => "The thanks has been sent.",
		"thank_error" => "The thanks could not be sent.",
		"thank_error_invalidrecipient" => "That user cannot receive thanks.",
		"error_permissiondenied" => "You don't have the permission to perform this action.",
		"error_missingtitle" => "The page or revision could not be found.",
		"error_extension" => "The required extension is not installed on this wiki.",
		_ => "The action failed. Please try again later.",
	}
}
