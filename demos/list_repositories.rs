//! Demonstrates authenticating as a GitHub App installation and paging through the
//! repositories it can access, against a local mock of the GitHub API.

// std
use std::sync::Arc;
// crates.io
use color_eyre::Result;
use httpmock::prelude::*;
use serde::Deserialize;
// self
use github_app_broker::{
	auth::{ApplicationKey, InstallationAccessToken, KeyFile},
	media,
	paging::PageIteratorBuilder,
};

const USER_AGENT: &str = "github-app-broker-demo";

#[derive(Deserialize)]
struct RepositoryPage {
	repositories: Vec<Repository>,
}

#[derive(Deserialize)]
struct Repository {
	full_name: String,
}

fn main() -> Result<()> {
	color_eyre::install()?;
	tracing_subscriber::fmt().with_env_filter("github_app_broker=debug").init();
	github_app_broker::init();

	let server = MockServer::start();
	let access_tokens_url = server.url("/app/installations/7/access_tokens");
	let installation_mock = server.mock(|when, then| {
		when.method(GET).path("/repos/octo/widgets/installation");
		then.status(200)
			.header("content-type", "application/json")
			.body(format!("{{\"id\":7,\"access_tokens_url\":\"{access_tokens_url}\"}}"));
	});
	let token_mock = server.mock(|when, then| {
		when.method(POST).path("/app/installations/7/access_tokens");
		then.status(201)
			.header("content-type", "application/json")
			.body("{\"token\":\"ghs_demo\",\"expires_at\":\"2030-01-01T00:00:00Z\"}");
	});
	let next_page = server.url("/installation/repositories?page=2&per_page=1");
	let first_page_mock = server.mock(|when, then| {
		when.method(GET).path("/installation/repositories").query_param("page", "1");
		then.status(200)
			.header("Link", format!("<{next_page}>; rel=\"next\", <{next_page}>; rel=\"last\""))
			.body("{\"total_count\":2,\"repositories\":[{\"full_name\":\"octo/widgets\"}]}");
	});
	let second_page_mock = server.mock(|when, then| {
		when.method(GET).path("/installation/repositories").query_param("page", "2");
		then.status(200)
			.body("{\"total_count\":2,\"repositories\":[{\"full_name\":\"octo/gadgets\"}]}");
	});
	let key_path = concat!(env!("CARGO_MANIFEST_DIR"), "/tests/fixtures/app-private-key.pem");
	let app_key = Arc::new(ApplicationKey::new("42", KeyFile::new(key_path))?);
	let installation = Arc::new(InstallationAccessToken::for_repository(
		&server.url("/repos/octo/widgets"),
		app_key,
		USER_AGENT,
	)?);
	// The installation endpoint wraps each page in an object, so decode it by hand.
	let pages = PageIteratorBuilder::new(
		server.url("/installation/repositories?page=1&per_page=1"),
		installation.clone(),
		USER_AGENT,
	)
	.media_type(media::JSON_V3)
	.build_with(|body| Ok(serde_json::from_slice::<RepositoryPage>(body)?.repositories))?
	.map_items(|repository| repository.full_name);

	for page in pages {
		for name in page? {
			println!("{name}");
		}
	}

	println!("Installation token header: {}", installation.header()?);

	installation_mock.assert();
	token_mock.assert_calls(1);
	first_page_mock.assert();
	second_page_mock.assert();

	Ok(())
}
