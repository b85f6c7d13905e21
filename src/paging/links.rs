//! Parsing of GitHub `Link` response headers.

// self
use crate::{
	_prelude::*,
	http::{HttpResponse, header},
};

const FIRST_REL: &str = "first";
const PREVIOUS_REL: &str = "prev";
const NEXT_REL: &str = "next";
const LAST_REL: &str = "last";
const PAGE_PARAMETER: &str = "page";
const PER_PAGE_PARAMETER: &str = "per_page";

/// Navigation links advertised by one page response.
///
/// URLs are kept verbatim; nothing checks that they are reachable. When a relation appears
/// more than once the entry parsed last wins, in input order.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash)]
pub struct PagingLinks {
	first: Option<String>,
	previous: Option<String>,
	next: Option<String>,
	last: Option<String>,
}
impl PagingLinks {
	/// Parses every `Link` header instance.
	///
	/// Each value may hold several comma-separated `<url>; rel="relation"` entries. Entries
	/// that do not match the format, or that name relations other than
	/// `first`/`prev`/`next`/`last`, are skipped.
	pub fn new<I, S>(headers: I) -> Self
	where
		I: IntoIterator<Item = S>,
		S: AsRef<str>,
	{
		let mut links = Self::default();

		for value in headers {
			let value = value.as_ref();

			tracing::debug!(link = value, "Parsing Link header.");

			for entry in value.split(',') {
				let Some((url, rels)) = parse_entry(entry.trim()) else {
					continue;
				};

				for rel in rels.split_ascii_whitespace() {
					let slot = match rel {
						FIRST_REL => &mut links.first,
						PREVIOUS_REL => &mut links.previous,
						NEXT_REL => &mut links.next,
						LAST_REL => &mut links.last,
						_ => continue,
					};

					*slot = Some(url.to_owned());
				}
			}
		}

		links
	}

	/// Parses the `Link` headers of `response`.
	pub fn from_response(response: &HttpResponse) -> Self {
		Self::new(response.header_values(header::LINK))
	}

	/// URL of the first page.
	pub fn first(&self) -> Option<&str> {
		self.first.as_deref()
	}

	/// URL of the previous page.
	pub fn previous(&self) -> Option<&str> {
		self.previous.as_deref()
	}

	/// URL of the next page.
	pub fn next(&self) -> Option<&str> {
		self.next.as_deref()
	}

	/// URL of the last page.
	pub fn last(&self) -> Option<&str> {
		self.last.as_deref()
	}

	/// Reads the `page` query parameter of `url`.
	pub fn page(url: &str) -> Option<i64> {
		integer_parameter(url, PAGE_PARAMETER)
	}

	/// Reads the `per_page` query parameter of `url`.
	pub fn per_page(url: &str) -> Option<i64> {
		integer_parameter(url, PER_PAGE_PARAMETER)
	}
}

// `<url>; rel="a b"; title="x"` -> (`url`, `a b`)
fn parse_entry(entry: &str) -> Option<(&str, &str)> {
	let rest = entry.strip_prefix('<')?;
	let (url, params) = rest.split_once('>')?;

	params.split(';').map(str::trim).find_map(|param| {
		let (name, value) = param.split_once('=')?;

		if !name.trim().eq_ignore_ascii_case("rel") {
			return None;
		}

		let value = value.trim();

		Some((url, value.strip_prefix('"').and_then(|v| v.strip_suffix('"')).unwrap_or(value)))
	})
}

fn integer_parameter(url: &str, name: &str) -> Option<i64> {
	let parsed = match Url::parse(url) {
		Ok(parsed) => parsed,
		Err(e) => {
			tracing::warn!(url, error = %e, "Unparseable paging URL encountered.");

			return None;
		},
	};
	let (_, raw) = parsed.query_pairs().find(|(key, _)| key == name)?;

	match raw.parse() {
		Ok(value) => Some(value),
		Err(_) => {
			tracing::warn!(parameter = name, value = %raw, "Non-numeric parameter value encountered.");

			None
		},
	}
}
