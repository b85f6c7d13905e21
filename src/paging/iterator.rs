//! Lazy, cursor-style iteration over paginated GitHub collections.
//!
//! A [`PageIterator`] holds the URL of the page it will fetch next. Each fetch follows the
//! `next` relation of the response's `Link` headers; once a response carries no `next` link
//! the iterator is exhausted for good. One iterator instance serves one consumer at a time.

// crates.io
use serde::de::DeserializeOwned;
// self
use crate::{
	_prelude::*,
	auth::AuthorizationSource,
	error::{BoxError, ResponseError},
	http::{self, HttpRequest, HttpTransport},
	media,
	obs::{self, Operation},
	paging::PagingLinks,
	rate_limit,
};

/// Converts one raw page body into its ordered items.
pub type PageDecoder<T> = Arc<dyn Fn(&[u8]) -> Result<Vec<T>, BoxError> + Send + Sync>;

/// Returned by [`PageIterator::estimate_size`] while the remaining size is unknown.
pub const UNKNOWN_SIZE: u64 = u64::MAX;

/// Builder for [`PageIterator`] values.
pub struct PageIteratorBuilder {
	url: String,
	authorization: Arc<dyn AuthorizationSource>,
	user_agent: String,
	media_type: String,
	http_client: Option<Arc<dyn HttpTransport>>,
}
impl PageIteratorBuilder {
	/// Starts configuring an iterator beginning at `url`.
	///
	/// `authorization` is consulted before every page request, so a renewable credential keeps
	/// long traversals authorized.
	pub fn new(
		url: impl Into<String>,
		authorization: Arc<dyn AuthorizationSource>,
		user_agent: impl Into<String>,
	) -> Self {
		Self {
			url: url.into(),
			authorization,
			user_agent: user_agent.into(),
			media_type: media::APP_PREVIEW.to_owned(),
			http_client: None,
		}
	}

	/// Overrides the `Accept` header sent with each page request.
	pub fn media_type(mut self, media_type: impl Into<String>) -> Self {
		self.media_type = media_type.into();

		self
	}

	/// Routes page requests through a custom transport.
	pub fn http_client(mut self, http_client: Arc<dyn HttpTransport>) -> Self {
		self.http_client = Some(http_client);

		self
	}

	/// Builds an iterator that decodes each page with `decoder`.
	pub fn build_with<T, F>(self, decoder: F) -> Result<PageIterator<T>>
	where
		F: 'static + Send + Sync + Fn(&[u8]) -> Result<Vec<T>, BoxError>,
	{
		http::parse_url("page URL", &self.url)?;

		let user_agent = http::require_text("user agent", self.user_agent)?;
		let media_type = http::require_text("media type", self.media_type)?;
		let transport = http::default_transport(self.http_client)?;

		Ok(PageIterator {
			url: Some(self.url),
			authorization: self.authorization,
			user_agent,
			media_type,
			transport,
			decoder: Arc::new(decoder),
			remaining_estimate: None,
			halted: false,
		})
	}

	/// Builds an iterator that decodes each page as a JSON array of `T`.
	pub fn build_json<T>(self) -> Result<PageIterator<T>>
	where
		T: 'static + DeserializeOwned,
	{
		self.build_with(decode_json_array::<T>)
	}

	/// Builds an iterator yielding untyped JSON array elements.
	pub fn build_values(self) -> Result<PageIterator<serde_json::Value>> {
		self.build_json()
	}
}
impl Debug for PageIteratorBuilder {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("PageIteratorBuilder")
			.field("url", &self.url)
			.field("user_agent", &self.user_agent)
			.field("media_type", &self.media_type)
			.finish()
	}
}

/// Reader over a paginated collection that fetches one page per step.
///
/// Besides the inherent [`next_page`](Self::next_page), the type implements [`Iterator`]
/// yielding `Result<Vec<T>>` per page. A failed fetch leaves the cursor on the same page.
/// Through [`Iterator`], the first error ends the iteration so adapters that skip errors do
/// not re-request a failing page forever; call [`next_page`](Self::next_page) to retry.
pub struct PageIterator<T> {
	url: Option<String>,
	authorization: Arc<dyn AuthorizationSource>,
	user_agent: String,
	media_type: String,
	transport: Arc<dyn HttpTransport>,
	decoder: PageDecoder<T>,
	remaining_estimate: Option<u64>,
	halted: bool,
}
impl<T> PageIterator<T> {
	/// Iterator over a JSON array collection with default settings.
	pub fn json(
		url: impl Into<String>,
		authorization: Arc<dyn AuthorizationSource>,
		user_agent: impl Into<String>,
	) -> Result<Self>
	where
		T: 'static + DeserializeOwned,
	{
		PageIteratorBuilder::new(url, authorization, user_agent).build_json()
	}

	/// Returns `true` while a page remains to be fetched.
	pub fn has_next(&self) -> bool {
		self.url.is_some()
	}

	/// URL the next fetch will request.
	pub fn current_url(&self) -> Option<&str> {
		self.url.as_deref()
	}

	/// Fetches and decodes the next page.
	///
	/// Fails with [`Error::Exhausted`] once the last page has been read.
	pub fn next_page(&mut self) -> Result<Vec<T>> {
		let Some(url) = self.url.clone() else {
			return Err(Error::Exhausted);
		};

		obs::observe(Operation::PageFetch, "next_page", || {
			let request = HttpRequest::get(http::parse_url("page URL", &url)?).github(
				self.authorization.authorization_header()?,
				&self.media_type,
				&self.user_agent,
			);
			let response = self.transport.execute(request).map_err(ResponseError::from)?;

			if !response.is_success() {
				rate_limit::check_rate_limit(&response)?;

				return Err(ResponseError::Status { status: response.status, url }.into());
			}

			// Decode before advancing so an undecodable page can be fetched again.
			let items = match (self.decoder)(&response.body) {
				Ok(items) => items,
				Err(source) => return Err(ResponseError::Decode { url, source }.into()),
			};
			let links = PagingLinks::from_response(&response);

			self.url = links.next().map(str::to_owned);
			self.remaining_estimate = estimate_remaining(&links);

			tracing::debug!(
				url = %url,
				next = ?self.url,
				estimate = ?self.remaining_estimate,
				"Fetched page."
			);

			Ok(items)
		})
	}

	/// Returns an iterator at the same position whose items pass through `transform`.
	///
	/// [`Iterator::map`] works on whole pages; this maps the items inside them. The transform
	/// is composed onto the page decoder, so each page is still requested and parsed once
	/// however many maps are chained. `self` is left untouched.
	pub fn map_items<S, F>(&self, transform: F) -> PageIterator<S>
	where
		T: 'static,
		S: 'static,
		F: 'static + Send + Sync + Fn(T) -> S,
	{
		let decoder = self.decoder.clone();
		let composed: PageDecoder<S> =
			Arc::new(move |body: &[u8]| -> Result<Vec<S>, BoxError> {
				Ok(decoder(body)?.into_iter().map(&transform).collect())
			});

		PageIterator {
			url: self.url.clone(),
			authorization: self.authorization.clone(),
			user_agent: self.user_agent.clone(),
			media_type: self.media_type.clone(),
			transport: self.transport.clone(),
			decoder: composed,
			remaining_estimate: self.remaining_estimate,
			halted: self.halted,
		}
	}

	/// Splitting a sequential cursor is not supported; always returns `None`.
	pub fn try_split(&mut self) -> Option<PageIterator<T>> {
		None
	}

	/// Approximate number of items still to be read.
	///
	/// [`UNKNOWN_SIZE`] before the first fetch or when the links lack page numbers, `0` once
	/// exhausted. Otherwise assumes every remaining page, the last included, is full.
	pub fn estimate_size(&self) -> u64 {
		self.remaining_estimate.unwrap_or(UNKNOWN_SIZE)
	}
}
impl PageIterator<serde_json::Value> {
	/// Iterator yielding untyped JSON array elements with default settings.
	pub fn values(
		url: impl Into<String>,
		authorization: Arc<dyn AuthorizationSource>,
		user_agent: impl Into<String>,
	) -> Result<Self> {
		PageIteratorBuilder::new(url, authorization, user_agent).build_values()
	}
}
impl<T> Iterator for PageIterator<T> {
	type Item = Result<Vec<T>>;

	fn next(&mut self) -> Option<Self::Item> {
		if self.halted || !self.has_next() {
			return None;
		}

		let page = self.next_page();

		self.halted = page.is_err();

		Some(page)
	}

	fn size_hint(&self) -> (usize, Option<usize>) {
		if self.halted || !self.has_next() { (0, Some(0)) } else { (1, None) }
	}
}
impl<T> Debug for PageIterator<T> {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("PageIterator")
			.field("url", &self.url)
			.field("user_agent", &self.user_agent)
			.field("media_type", &self.media_type)
			.field("remaining_estimate", &self.remaining_estimate)
			.field("halted", &self.halted)
			.finish()
	}
}

fn decode_json_array<T>(body: &[u8]) -> Result<Vec<T>, BoxError>
where
	T: DeserializeOwned,
{
	let mut deserializer = serde_json::Deserializer::from_slice(body);

	serde_path_to_error::deserialize(&mut deserializer).map_err(Into::into)
}

fn estimate_remaining(links: &PagingLinks) -> Option<u64> {
	let Some(next) = links.next() else {
		return Some(0);
	};
	let per_page = PagingLinks::per_page(next)?;
	let next_page = PagingLinks::page(next)?;
	let last_page = PagingLinks::page(links.last()?)?;
	let pages = last_page.saturating_sub(next_page).saturating_add(1);

	Some(u64::try_from(pages.saturating_mul(per_page)).unwrap_or(0))
}
