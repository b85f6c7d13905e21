// crates.io
use httpmock::prelude::*;
use jsonwebtoken::{Algorithm, DecodingKey, Validation};
// self
use github_app_broker::{
	_preludet::*,
	auth::{AppClaims, ApplicationKey, InstallationAccessToken, KeyFile, resolve_access_tokens_url},
	cache::ManualClock,
	error::KeyLoadingError,
	media,
	obs::Operation,
};

const REPOSITORY_PATH: &str = "/repos/octo/widgets";
const INSTALLATION_PATH: &str = "/repos/octo/widgets/installation";
const ACCESS_TOKENS_PATH: &str = "/app/installations/7/access_tokens";

fn mock_installation(server: &MockServer) -> httpmock::Mock<'_> {
	let access_tokens_url = server.url(ACCESS_TOKENS_PATH);

	server.mock(|when, then| {
		when.method(GET)
			.path(INSTALLATION_PATH)
			.header("accept", media::APP_PREVIEW)
			.header("user-agent", TEST_USER_AGENT)
			.header_exists("authorization");
		then.status(200)
			.header("content-type", "application/json")
			.body(format!("{{\"id\":7,\"access_tokens_url\":\"{access_tokens_url}\"}}"));
	})
}

#[test]
fn application_key_signs_verifiable_tokens() {
	github_app_broker::init();

	let key = ApplicationKey::new(TEST_APP_ID, KeyFile::new(test_private_key_path()))
		.expect("Application key should build from the fixture.");
	let header = key.get().expect("Signing with the fixture key should succeed.");
	let token = header.strip_prefix("Bearer ").expect("Application header should use Bearer.");
	let decoding_key = DecodingKey::from_rsa_pem(test_public_key_pem().as_bytes())
		.expect("Public key fixture should parse.");
	let mut validation = Validation::new(Algorithm::RS256);

	validation.set_issuer(&[TEST_APP_ID]);

	let claims = jsonwebtoken::decode::<AppClaims>(token, &decoding_key, &validation)
		.expect("Token should verify against the fixture public key.")
		.claims;

	assert_eq!(claims.iss, TEST_APP_ID);
	assert!(claims.exp - claims.iat <= Duration::minutes(10).whole_seconds());
	assert_eq!(key.get().expect("Cached header should be returned."), header);
}

#[test]
fn for_repository_resolves_and_caches_installation_token() {
	github_app_broker::init();

	let server = MockServer::start();
	let lookup = mock_installation(&server);
	let exchange = server.mock(|when, then| {
		when.method(POST)
			.path(ACCESS_TOKENS_PATH)
			.header("accept", media::APP_PREVIEW)
			.header("user-agent", TEST_USER_AGENT)
			.header_exists("authorization");
		then.status(201)
			.header("content-type", "application/json")
			.body("{\"token\":\"ghs_integration\",\"expires_at\":\"2030-01-01T00:00:00Z\"}");
	});
	let clock = ManualClock::default();
	let token = InstallationAccessToken::for_repository(
		&server.url(REPOSITORY_PATH),
		test_application_key(&clock),
		TEST_USER_AGENT,
	)
	.expect("Repository lookup should succeed.");

	lookup.assert();

	assert_eq!(token.url().as_str(), server.url(ACCESS_TOKENS_PATH));
	assert_eq!(token.header().expect("Exchange should succeed."), "token ghs_integration");
	assert_eq!(token.token().expect("Cached token should be returned."), "ghs_integration");
	assert_eq!(token.get().expect("Cached header should be returned."), "token ghs_integration");

	exchange.assert_calls(1);
}

#[test]
fn expired_installation_token_is_exchanged_again() {
	let server = MockServer::start();
	let exchange = server.mock(|when, then| {
		when.method(POST).path(ACCESS_TOKENS_PATH);
		then.status(201).body("{\"token\":\"ghs_rotating\"}");
	});
	let clock = ManualClock::default();
	let token = InstallationAccessToken::builder(
		server.url(ACCESS_TOKENS_PATH),
		test_application_key(&clock),
		TEST_USER_AGENT,
	)
	.ttl(Duration::minutes(30))
	.clock(Arc::new(clock.clone()))
	.build()
	.expect("Installation token should build.");

	token.token().expect("First exchange should succeed.");
	clock.advance(Duration::minutes(29));
	token.token().expect("Cached token should be returned.");

	exchange.assert_calls(1);

	clock.advance(Duration::minutes(1));
	token.token().expect("Second exchange should succeed.");

	exchange.assert_calls(2);
}

#[test]
fn rate_limited_exchange_reports_quota() {
	let server = MockServer::start();
	let exchange = server.mock(|when, then| {
		when.method(POST).path(ACCESS_TOKENS_PATH);
		then.status(403)
			.header("X-RateLimit-Limit", "5000")
			.header("X-RateLimit-Remaining", "0")
			.header("X-RateLimit-Reset", "1893456000");
	});
	let clock = ManualClock::default();
	let token = InstallationAccessToken::new(
		server.url(ACCESS_TOKENS_PATH),
		test_application_key(&clock),
		TEST_USER_AGENT,
	)
	.expect("Installation token should build.");
	let err = token.header().expect_err("Exhausted quota must fail the exchange.");

	match err {
		Error::RequestLimitExceeded(limit) => {
			assert_eq!(limit.limit, "5000");
			assert_eq!(limit.reset, "1893456000");
			assert_eq!(
				limit.to_string(),
				"Maximum requests to GitHub exceeded. Limit of 5000, resets at 1893456000."
			);
		},
		other => panic!("Expected a rate limit error, got {other:?}."),
	}

	exchange.assert();
}

#[test]
fn rejected_exchange_reports_status() {
	let server = MockServer::start();
	let _exchange = server.mock(|when, then| {
		when.method(POST).path(ACCESS_TOKENS_PATH);
		then.status(401).body("{\"message\":\"A JSON web token could not be decoded\"}");
	});
	let clock = ManualClock::default();
	let token = InstallationAccessToken::new(
		server.url(ACCESS_TOKENS_PATH),
		test_application_key(&clock),
		TEST_USER_AGENT,
	)
	.expect("Installation token should build.");
	let err = token.token().expect_err("Unauthorized exchange must fail.");

	assert!(matches!(
		err,
		Error::KeyLoading(KeyLoadingError::Exchange {
			operation: Operation::InstallationToken,
			status: 401,
			ref message,
		}) if message == "Unauthorized"
	));
}

#[test]
fn missing_installation_fails_lookup() {
	let server = MockServer::start();
	let lookup = server.mock(|when, then| {
		when.method(GET).path(INSTALLATION_PATH);
		then.status(404).body("{\"message\":\"Not Found\"}");
	});
	let clock = ManualClock::default();
	let err = resolve_access_tokens_url(
		&server.url(REPOSITORY_PATH),
		&test_application_key(&clock),
		TEST_USER_AGENT,
		None,
	)
	.expect_err("Repositories without the App installed must fail.");

	assert!(matches!(
		err,
		Error::KeyLoading(KeyLoadingError::Exchange {
			operation: Operation::InstallationLookup,
			status: 404,
			..
		})
	));

	lookup.assert();
}
