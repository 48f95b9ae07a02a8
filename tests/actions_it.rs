// std
use std::sync::Arc;
// crates.io
use httpmock::prelude::*;
use url::Url;
// self
use wiki_action_broker::{
	actions::{ActionParams, ThankTarget},
	auth::{Credential, SiteId, TokenSecret, UserId},
	flows::{ActionRequest, Broker, Dispatch},
	site::{BrokerConfig, SiteDescriptor},
	store::{CredentialStore, MemoryStore},
};

const SITE: &str = "wikimedia";
const USER: &str = "123456";
const ACCESS: &str = "live-access";

fn wiki_url(server: &MockServer) -> Url {
	Url::parse(&server.url("/w/")).expect("Mock wiki base URL should parse.")
}

async fn build_broker() -> (Broker, Arc<MemoryStore>) {
	let store = Arc::new(MemoryStore::default());

	store
		.upsert(Credential::new(
			UserId::new(USER).expect("User identifier should be valid."),
			SiteId::new(SITE).expect("Site identifier should be valid."),
			ACCESS,
			"live-refresh",
		))
		.await
		.expect("Seeding the credential store should succeed.");

	let config = BrokerConfig {
		redirect_uri: Url::parse("https://dashboard.example/oauth")
			.expect("Redirect fixture should parse."),
		user_agent: "wiki-action-broker-tests".into(),
		timeout_secs: 5,
		sites: vec![SiteDescriptor {
			id: SiteId::new(SITE).expect("Site identifier should be valid."),
			client_id: "client-actions".into(),
			client_secret: TokenSecret::new("secret-actions"),
		}],
	};
	let broker =
		Broker::new(config, store.clone()).expect("Broker construction should succeed.");

	(broker, store)
}

fn request(server: &MockServer, action: ActionParams) -> ActionRequest {
	ActionRequest {
		user_id: UserId::new(USER).expect("User identifier should be valid."),
		site: SiteId::new(SITE).expect("Site identifier should be valid."),
		wiki: wiki_url(server),
		locale: "en".into(),
		action,
	}
}

async fn mock_token_fetch<'a>(
	server: &'a MockServer,
	kind: &str,
	body: &str,
) -> httpmock::Mock<'a> {
	let body = body.to_owned();
	let kind = kind.to_owned();

	server
		.mock_async(move |when, then| {
			when.method(GET)
				.path("/w/api.php")
				.query_param("meta", "tokens")
				.query_param("type", kind);
			then.status(200).header("content-type", "application/json").body(body);
		})
		.await
}

#[tokio::test]
async fn block_defaults_named_targets_to_two_weeks() {
	let server = MockServer::start_async().await;
	let (broker, _) = build_broker().await;
	let fetch = mock_token_fetch(
		&server,
		"csrf",
		r#"{"batchcomplete":true,"query":{"tokens":{"csrftoken":"csrf-token"}}}"#,
	)
	.await;
	let write = server
		.mock_async(|when, then| {
			when.method(POST)
				.path("/w/api.php")
				.header("authorization", format!("Bearer {ACCESS}"))
				.body_includes("action=block")
				.body_includes("user=Vandal")
				.body_includes("expiry=2+weeks")
				.body_includes("nocreate=true");
			then.status(200)
				.header("content-type", "application/json")
				.body(r#"{"block":{"id":7,"user":"Vandal"}}"#);
		})
		.await;
	let dispatch = broker
		.submit(request(
			&server,
			ActionParams::Block {
				target: "Vandal".into(),
				reason: "spam".into(),
				expiry: String::new(),
			},
		))
		.await
		.expect("Block submission should succeed.");

	assert_eq!(dispatch, Dispatch::Completed("The user has been blocked.".into()));

	fetch.assert_async().await;
	write.assert_async().await;
}

#[tokio::test]
async fn recognized_rejection_maps_to_its_message_without_retry() {
	let server = MockServer::start_async().await;
	let (broker, _) = build_broker().await;
	let fetch = mock_token_fetch(
		&server,
		"csrf",
		r#"{"batchcomplete":true,"query":{"tokens":{"csrftoken":"csrf-token"}}}"#,
	)
	.await;
	let write = server
		.mock_async(|when, then| {
			when.method(POST).path("/w/api.php").body_includes("action=block");
			then.status(200).header("content-type", "application/json").body(
				r#"{"errors":[{"code":"alreadyblocked","text":"The user you tried to block was already blocked."}]}"#,
			);
		})
		.await;
	let dispatch = broker
		.submit(request(
			&server,
			ActionParams::Block {
				target: "Vandal".into(),
				reason: "spam".into(),
				expiry: "1 week".into(),
			},
		))
		.await
		.expect("Block submission should succeed.");

	assert_eq!(dispatch, Dispatch::Completed("The user is already blocked.".into()));

	// A recognized domain rejection is final; no second POST, no token refetch.
	fetch.assert_calls_async(1).await;
	write.assert_calls_async(1).await;
}

#[tokio::test]
async fn badtoken_forces_exactly_one_token_refetch() {
	let server = MockServer::start_async().await;
	let (broker, _) = build_broker().await;
	let fetch = mock_token_fetch(
		&server,
		"csrf",
		r#"{"batchcomplete":true,"query":{"tokens":{"csrftoken":"csrf-token"}}}"#,
	)
	.await;
	let write = server
		.mock_async(|when, then| {
			when.method(POST).path("/w/api.php").body_includes("action=delete");
			then.status(200).header("content-type", "application/json").body(
				r#"{"errors":[{"code":"badtoken","text":"Invalid CSRF token."}]}"#,
			);
		})
		.await;
	let dispatch = broker
		.submit(request(
			&server,
			ActionParams::Delete { page_id: 4242, reason: "vandalism".into() },
		))
		.await
		.expect("Delete submission should succeed.");

	// The retry fetched a fresh token and posted once more; the second badtoken is final
	// and collapses to the generic failure message.
	assert_eq!(dispatch, Dispatch::Completed("The page could not be deleted.".into()));

	fetch.assert_calls_async(2).await;
	write.assert_calls_async(2).await;
}

#[tokio::test]
async fn revoked_consent_on_an_action_requires_reauthorization() {
	let server = MockServer::start_async().await;
	let (broker, store) = build_broker().await;
	let _fetch = mock_token_fetch(
		&server,
		"csrf",
		r#"{"batchcomplete":true,"query":{"tokens":{"csrftoken":"csrf-token"}}}"#,
	)
	.await;
	let write = server
		.mock_async(|when, then| {
			when.method(POST).path("/w/api.php").body_includes("action=block");
			then.status(200).header("content-type", "application/json").body(
				r#"{"errors":[{"code":"mwoauth-invalid-authorization","text":"The authorization headers in your request are not valid: Cannot create access token, user did not approve issuing this access token"}]}"#,
			);
		})
		.await;
	let dispatch = broker
		.submit(request(
			&server,
			ActionParams::Block {
				target: "Vandal".into(),
				reason: "spam".into(),
				expiry: "1 week".into(),
			},
		))
		.await
		.expect("Submission should degrade to an authorization request.");

	assert!(matches!(dispatch, Dispatch::AuthorizationRequired(_)));

	write.assert_calls_async(1).await;

	let user = UserId::new(USER).expect("User identifier should be valid.");
	let site = SiteId::new(SITE).expect("Site identifier should be valid.");

	assert!(store.find(&user, &site).await.expect("Store read should succeed.").is_none());
	assert!(broker.contexts().get(&user, &site).is_none());
}

#[tokio::test]
async fn rollback_fetches_its_own_token_kind() {
	let server = MockServer::start_async().await;
	let (broker, _) = build_broker().await;
	let fetch = mock_token_fetch(
		&server,
		"rollback",
		r#"{"batchcomplete":true,"query":{"tokens":{"rollbacktoken":"rollback-token"}}}"#,
	)
	.await;
	let write = server
		.mock_async(|when, then| {
			when.method(POST)
				.path("/w/api.php")
				.body_includes("action=rollback")
				.body_includes("token=rollback-token");
			then.status(200)
				.header("content-type", "application/json")
				.body(r#"{"rollback":{"title":"Example","revid":99}}"#);
		})
		.await;
	let dispatch = broker
		.submit(request(
			&server,
			ActionParams::Rollback {
				page_id: 4242,
				user: "Vandal".into(),
				summary: "rv".into(),
			},
		))
		.await
		.expect("Rollback submission should succeed.");

	assert_eq!(dispatch, Dispatch::Completed("The edits have been reverted.".into()));

	fetch.assert_async().await;
	write.assert_async().await;
}

#[tokio::test]
async fn move_posts_by_page_id_without_leaving_a_redirect() {
	let server = MockServer::start_async().await;
	let (broker, _) = build_broker().await;
	let _fetch = mock_token_fetch(
		&server,
		"csrf",
		r#"{"batchcomplete":true,"query":{"tokens":{"csrftoken":"csrf-token"}}}"#,
	)
	.await;
	let write = server
		.mock_async(|when, then| {
			when.method(POST)
				.path("/w/api.php")
				.body_includes("action=move")
				.body_includes("fromid=4242")
				.body_includes("to=Restored+title")
				.body_includes("noredirect=true");
			then.status(200)
				.header("content-type", "application/json")
				.body(r#"{"move":{"from":"Vandalized title","to":"Restored title"}}"#);
		})
		.await;
	let dispatch = broker
		.submit(request(
			&server,
			ActionParams::Move {
				from_id: 4242,
				to: "Restored title".into(),
				reason: "rv page-move vandalism".into(),
			},
		))
		.await
		.expect("Move submission should succeed.");

	assert_eq!(dispatch, Dispatch::Completed("The page has been moved back.".into()));

	write.assert_async().await;
}

#[tokio::test]
async fn undo_targets_a_single_revision_through_the_edit_action() {
	let server = MockServer::start_async().await;
	let (broker, _) = build_broker().await;
	let _fetch = mock_token_fetch(
		&server,
		"csrf",
		r#"{"batchcomplete":true,"query":{"tokens":{"csrftoken":"csrf-token"}}}"#,
	)
	.await;
	let write = server
		.mock_async(|when, then| {
			when.method(POST)
				.path("/w/api.php")
				.body_includes("action=edit")
				.body_includes("pageid=4242")
				.body_includes("undo=31337");
			then.status(200)
				.header("content-type", "application/json")
				.body(r#"{"edit":{"result":"Success","pageid":4242,"newrevid":31338}}"#);
		})
		.await;
	let dispatch = broker
		.submit(request(
			&server,
			ActionParams::Undo { page_id: 4242, revision: 31337, summary: "rv".into() },
		))
		.await
		.expect("Undo submission should succeed.");

	assert_eq!(dispatch, Dispatch::Completed("The edit has been undone.".into()));

	write.assert_async().await;
}

#[tokio::test]
async fn filerevert_derives_the_filename_from_the_archive_name() {
	let server = MockServer::start_async().await;
	let (broker, _) = build_broker().await;
	let _fetch = mock_token_fetch(
		&server,
		"csrf",
		r#"{"batchcomplete":true,"query":{"tokens":{"csrftoken":"csrf-token"}}}"#,
	)
	.await;
	let write = server
		.mock_async(|when, then| {
			when.method(POST)
				.path("/w/api.php")
				.body_includes("action=filerevert")
				.body_includes("filename=Example.png")
				.body_includes("archivename=20260801123456%21Example.png");
			then.status(200)
				.header("content-type", "application/json")
				.body(r#"{"filerevert":{"result":"Success"}}"#);
		})
		.await;
	let dispatch = broker
		.submit(request(
			&server,
			ActionParams::FileRevert {
				archive_name: "20260801123456!Example.png".into(),
				comment: "restore original upload".into(),
			},
		))
		.await
		.expect("File revert submission should succeed.");

	assert_eq!(dispatch, Dispatch::Completed("The file has been reverted.".into()));

	write.assert_async().await;
}

#[tokio::test]
async fn gblock_resolves_anonymous_targets_first() {
	let server = MockServer::start_async().await;
	let (broker, _) = build_broker().await;
	let resolve = server
		.mock_async(|when, then| {
			when.method(GET)
				.path("/w/api.php")
				.query_param("list", "users")
				.query_param("ususerids", "98765");
			then.status(200)
				.header("content-type", "application/json")
				.body(r#"{"batchcomplete":true,"query":{"users":[{"userid":98765,"name":"Renamed vandal"}]}}"#);
		})
		.await;
	let _fetch = mock_token_fetch(
		&server,
		"csrf",
		r#"{"batchcomplete":true,"query":{"tokens":{"csrftoken":"csrf-token"}}}"#,
	)
	.await;
	let write = server
		.mock_async(|when, then| {
			when.method(POST)
				.path("/w/api.php")
				.body_includes("action=globalblock")
				.body_includes("target=Renamed+vandal")
				.body_includes("expiry=infinite");
			then.status(200)
				.header("content-type", "application/json")
				.body(r#"{"globalblock":{"user":"Renamed vandal","expiry":"infinite"}}"#);
		})
		.await;
	let dispatch = broker
		.submit(request(
			&server,
			ActionParams::GlobalBlock {
				target: "#98765".into(),
				reason: "crosswiki spam".into(),
				expiry: String::new(),
			},
		))
		.await
		.expect("Global block submission should succeed.");

	assert_eq!(
		dispatch,
		Dispatch::Completed("The user has been blocked globally.".into())
	);

	resolve.assert_async().await;
	write.assert_async().await;
}

#[tokio::test]
async fn thank_carries_the_target_kind_parameter() {
	let server = MockServer::start_async().await;
	let (broker, _) = build_broker().await;
	let _fetch = mock_token_fetch(
		&server,
		"csrf",
		r#"{"batchcomplete":true,"query":{"tokens":{"csrftoken":"csrf-token"}}}"#,
	)
	.await;
	let write = server
		.mock_async(|when, then| {
			when.method(POST)
				.path("/w/api.php")
				.body_includes("action=thank")
				.body_includes("log=31337");
			then.status(200)
				.header("content-type", "application/json")
				.body(r#"{"result":{"success":1,"recipient":"Helper"}}"#);
		})
		.await;
	let dispatch = broker
		.submit(request(
			&server,
			ActionParams::Thank { target: ThankTarget::LogEntry, id: 31337 },
		))
		.await
		.expect("Thank submission should succeed.");

	assert_eq!(dispatch, Dispatch::Completed("The thanks has been sent.".into()));

	write.assert_async().await;
}
