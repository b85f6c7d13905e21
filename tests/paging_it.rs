// crates.io
use httpmock::prelude::*;
// self
use github_app_broker::{
	_preludet::*,
	auth::AuthorizationSource,
	paging::{PageIterator, PageIteratorBuilder, UNKNOWN_SIZE},
	rate_limit::RequestLimitExceeded,
};

#[derive(Debug, PartialEq, Deserialize)]
struct Repository {
	id: u64,
	name: String,
}

fn authorization() -> Arc<dyn AuthorizationSource> {
	Arc::new(|| Ok::<_, Error>("token ghs_paging".to_owned()))
}

fn page_url(server: &MockServer, page: u32) -> String {
	server.url(format!("/user/repos?page={page}&per_page=2"))
}

fn link(url: &str, rel: &str) -> String {
	format!("<{url}>; rel=\"{rel}\"")
}

#[test]
fn walks_every_page_and_estimates_remaining_items() {
	let server = MockServer::start();
	let first = server.mock(|when, then| {
		when.method(GET)
			.path("/user/repos")
			.query_param("page", "1")
			.header("authorization", "token ghs_paging")
			.header("user-agent", TEST_USER_AGENT);
		then.status(200)
			.header(
				"Link",
				format!(
					"{}, {}",
					link(&page_url(&server, 2), "next"),
					link(&page_url(&server, 3), "last")
				),
			)
			.body("[{\"id\":1,\"name\":\"alpha\"},{\"id\":2,\"name\":\"beta\"}]");
	});
	let second = server.mock(|when, then| {
		when.method(GET).path("/user/repos").query_param("page", "2");
		then.status(200)
			.header(
				"Link",
				format!(
					"{}, {}, {}",
					link(&page_url(&server, 1), "first"),
					link(&page_url(&server, 3), "next"),
					link(&page_url(&server, 3), "last")
				),
			)
			.body("[{\"id\":3,\"name\":\"gamma\"},{\"id\":4,\"name\":\"delta\"}]");
	});
	let third = server.mock(|when, then| {
		when.method(GET).path("/user/repos").query_param("page", "3");
		then.status(200)
			.header("Link", link(&page_url(&server, 2), "prev"))
			.body("[{\"id\":5,\"name\":\"epsilon\"}]");
	});
	let mut pages = PageIterator::<Repository>::json(
		page_url(&server, 1),
		authorization(),
		TEST_USER_AGENT,
	)
	.expect("Iterator should build.");

	assert_eq!(pages.estimate_size(), UNKNOWN_SIZE);
	assert_eq!(pages.next_page().expect("Page 1 should load.").len(), 2);
	assert_eq!(pages.estimate_size(), 4);
	assert_eq!(pages.next_page().expect("Page 2 should load.")[0].name, "gamma");
	assert_eq!(pages.estimate_size(), 2);
	assert_eq!(pages.next_page().expect("Page 3 should load."), vec![Repository {
		id: 5,
		name: "epsilon".into()
	}]);
	assert!(!pages.has_next());
	assert_eq!(pages.estimate_size(), 0);
	assert!(matches!(pages.next_page(), Err(Error::Exhausted)));

	first.assert();
	second.assert();
	third.assert();
}

#[test]
fn item_maps_compose_over_untyped_values() {
	let server = MockServer::start();
	let single = server.mock(|when, then| {
		when.method(GET).path("/orgs/octo/repos");
		then.status(200).body("[{\"full_name\":\"octo/a\"},{\"full_name\":\"octo/b\"}]");
	});
	let names = PageIterator::values(server.url("/orgs/octo/repos"), authorization(), TEST_USER_AGENT)
		.expect("Iterator should build.")
		.map_items(|value| value["full_name"].as_str().unwrap_or_default().to_owned())
		.map_items(|name| name.to_uppercase())
		.collect::<Result<Vec<_>>>()
		.expect("Single page should load.")
		.concat();

	assert_eq!(names, vec!["OCTO/A".to_owned(), "OCTO/B".to_owned()]);

	single.assert_calls(1);
}

#[test]
fn rate_limited_page_surfaces_quota() {
	let server = MockServer::start();
	let _limited = server.mock(|when, then| {
		when.method(GET).path("/user/repos");
		then.status(403)
			.header("X-RateLimit-Remaining", "0")
			.header("X-RateLimit-Limit", "60")
			.body("{\"message\":\"API rate limit exceeded\"}");
	});
	let mut pages = PageIteratorBuilder::new(server.url("/user/repos"), authorization(), TEST_USER_AGENT)
		.build_values()
		.expect("Iterator should build.");

	match pages.next_page() {
		Err(Error::RequestLimitExceeded(limit)) =>
			assert_eq!(limit, RequestLimitExceeded::new("60", "(unknown)")),
		other => panic!("Expected a rate limit error, got {other:?}."),
	}

	assert!(pages.has_next());
}
