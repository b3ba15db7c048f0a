//! Signed HTTP client for the remote API
//!
//! `ApiClient` joins request paths onto the configured base URL, merges
//! headers from the authenticator and cache control, signs the request and
//! sends it with the configured timeout. `CachedApiClient` puts the fallback
//! cache in front of its GET requests.

use std::time::{Duration, Instant};

use reqwest::header::{HeaderMap, HeaderValue, CONTENT_TYPE, USER_AGENT};
use reqwest::{Client, Method};
use serde::Serialize;
use tracing::debug;
use url::Url;

use crate::auth::{Authenticator, ETagCacheControl, HeaderContributor};
use crate::cache::CacheStore;
use crate::config::{ClientConfig, FallbackConfig};
use crate::error::ClientError;
use crate::fallback::{FallbackCache, RawResponse, Response};
use crate::signing::{RequestSigner, SignedParts};

/// Product name sent in the User-Agent header
pub const USER_AGENT_PRODUCT: &str = "FALLBACK-API-CLIENT";

const JSON_CONTENT_TYPE: &str = "application/json";

/// A request before it is joined, signed and sent
#[derive(Debug, Clone)]
pub struct ApiRequest<'a> {
    pub method: Method,
    /// Path relative to the client's base URL
    pub url: &'a str,
    pub content_type: Option<&'a str>,
    pub body: Option<Vec<u8>>,
    pub params: &'a [(String, String)],
    pub authenticator: Option<&'a Authenticator>,
    pub cache_control: Option<&'a ETagCacheControl>,
}

impl<'a> ApiRequest<'a> {
    pub fn new(method: Method, url: &'a str) -> Self {
        Self {
            method,
            url,
            content_type: None,
            body: None,
            params: &[],
            authenticator: None,
            cache_control: None,
        }
    }

    pub fn with_body(mut self, content_type: &'a str, body: Vec<u8>) -> Self {
        self.content_type = Some(content_type);
        self.body = Some(body);
        self
    }

    pub fn with_params(mut self, params: &'a [(String, String)]) -> Self {
        self.params = params;
        self
    }

    pub fn with_authenticator(mut self, authenticator: Option<&'a Authenticator>) -> Self {
        self.authenticator = authenticator;
        self
    }

    pub fn with_cache_control(mut self, cache_control: Option<&'a ETagCacheControl>) -> Self {
        self.cache_control = cache_control;
        self
    }
}

/// Client for the remote API
#[derive(Debug, Clone)]
pub struct ApiClient {
    http: Client,
    base_url: String,
    signer: RequestSigner,
    timeout: Duration,
    version: String,
}

impl ApiClient {
    /// Creates a client from configuration
    pub fn new(config: ClientConfig) -> Result<Self, ClientError> {
        let http = Client::builder().timeout(config.timeout).build()?;
        Ok(Self::with_client(config, http))
    }

    /// Creates a client around an existing reqwest client
    pub fn with_client(config: ClientConfig, http: Client) -> Self {
        Self {
            http,
            signer: RequestSigner::new(config.api_key, config.sender_id),
            base_url: config.base_url,
            timeout: config.timeout,
            version: config.version,
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn signer(&self) -> &RequestSigner {
        &self.signer
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Joins `partial_url` onto `base_url` with exactly one slash between them.
    ///
    /// A leading slash on the partial URL does not discard the base path.
    pub fn build_url(base_url: &str, partial_url: &str) -> Result<Url, ClientError> {
        let mut base = base_url.to_string();
        if !base.ends_with('/') {
            base.push('/');
        }
        let partial = partial_url.strip_prefix('/').unwrap_or(partial_url);
        Ok(Url::parse(&base)?.join(partial)?)
    }

    pub async fn get(
        &self,
        url: &str,
        params: &[(String, String)],
        authenticator: Option<&Authenticator>,
        cache_control: Option<&ETagCacheControl>,
    ) -> Result<RawResponse, ClientError> {
        let request = ApiRequest::new(Method::GET, url)
            .with_params(params)
            .with_authenticator(authenticator)
            .with_cache_control(cache_control);
        self.request(request).await
    }

    pub async fn post<T: Serialize + ?Sized>(
        &self,
        url: &str,
        data: &T,
        authenticator: Option<&Authenticator>,
    ) -> Result<RawResponse, ClientError> {
        self.send_json(Method::POST, url, data, authenticator).await
    }

    pub async fn put<T: Serialize + ?Sized>(
        &self,
        url: &str,
        data: &T,
        authenticator: Option<&Authenticator>,
    ) -> Result<RawResponse, ClientError> {
        self.send_json(Method::PUT, url, data, authenticator).await
    }

    pub async fn patch<T: Serialize + ?Sized>(
        &self,
        url: &str,
        data: &T,
        authenticator: Option<&Authenticator>,
    ) -> Result<RawResponse, ClientError> {
        self.send_json(Method::PATCH, url, data, authenticator).await
    }

    pub async fn delete(
        &self,
        url: &str,
        authenticator: Option<&Authenticator>,
    ) -> Result<RawResponse, ClientError> {
        let request = ApiRequest::new(Method::DELETE, url).with_authenticator(authenticator);
        self.request(request).await
    }

    async fn send_json<T: Serialize + ?Sized>(
        &self,
        method: Method,
        url: &str,
        data: &T,
        authenticator: Option<&Authenticator>,
    ) -> Result<RawResponse, ClientError> {
        let body = serde_json::to_vec(data)?;
        let request = ApiRequest::new(method, url)
            .with_body(JSON_CONTENT_TYPE, body)
            .with_authenticator(authenticator);
        self.request(request).await
    }

    /// Builds, signs and sends a request.
    ///
    /// Headers are applied in order User-Agent, authenticator, cache control,
    /// content type; a later one replaces an earlier one with the same name.
    pub async fn request(&self, request: ApiRequest<'_>) -> Result<RawResponse, ClientError> {
        let mut headers = HeaderMap::new();
        headers.insert(
            USER_AGENT,
            HeaderValue::from_str(&format!("{}/{}", USER_AGENT_PRODUCT, self.version))?,
        );
        if let Some(authenticator) = request.authenticator {
            merge_headers(&mut headers, authenticator.headers()?);
        }
        if let Some(cache_control) = request.cache_control {
            merge_headers(&mut headers, cache_control.headers()?);
        }
        if let Some(content_type) = request.content_type {
            headers.insert(CONTENT_TYPE, HeaderValue::from_str(content_type)?);
        }

        let url = Self::build_url(&self.base_url, request.url)?;
        let method = request.method.clone();
        debug!(%method, %url, "API request");

        let start = Instant::now();
        let result = self
            .send(method.clone(), url.clone(), headers, request.body, request.params)
            .await;
        debug!(
            %method,
            %url,
            elapsed_ms = start.elapsed().as_millis() as u64,
            "API request finished"
        );
        result
    }

    /// Signs and dispatches a fully built request
    async fn send(
        &self,
        method: Method,
        url: Url,
        headers: HeaderMap,
        body: Option<Vec<u8>>,
        params: &[(String, String)],
    ) -> Result<RawResponse, ClientError> {
        let mut builder = self
            .http
            .request(method, url)
            .headers(headers)
            .timeout(self.timeout);
        if !params.is_empty() {
            builder = builder.query(params);
        }
        if let Some(body) = body {
            builder = builder.body(body);
        }
        let mut request = builder.build()?;

        let signature = {
            let parts = SignedParts {
                method: request.method().as_str(),
                url: request.url(),
                content_type: request
                    .headers()
                    .get(CONTENT_TYPE)
                    .and_then(|v| v.to_str().ok()),
                body: request.body().and_then(|b| b.as_bytes()).unwrap_or_default(),
            };
            self.signer.signature_headers(parts)?
        };
        merge_headers(request.headers_mut(), signature);

        let response = self.http.execute(request).await?;
        RawResponse::read(response).await
    }
}

fn merge_headers(target: &mut HeaderMap, extra: HeaderMap) {
    for (name, value) in extra.iter() {
        target.insert(name.clone(), value.clone());
    }
}

/// API client whose GET requests go through the fallback cache
#[derive(Debug, Clone)]
pub struct CachedApiClient<S> {
    client: ApiClient,
    fallback: FallbackCache<S>,
}

impl<S: CacheStore + Clone> CachedApiClient<S> {
    pub fn new(client: ApiClient, store: S, config: FallbackConfig) -> Self {
        Self {
            client,
            fallback: FallbackCache::new(store, config),
        }
    }
}

impl<S: CacheStore> CachedApiClient<S> {
    pub fn client(&self) -> &ApiClient {
        &self.client
    }

    pub fn fallback(&self) -> &FallbackCache<S> {
        &self.fallback
    }

    /// GET with conditional revalidation and degraded-mode serving
    ///
    /// Entries are keyed by the absolute URL, so clients for different base
    /// URLs can share a store without seeing each other's content.
    pub async fn get(
        &self,
        url: &str,
        params: &[(String, String)],
        authenticator: Option<&Authenticator>,
    ) -> Result<Response, ClientError> {
        let absolute = ApiClient::build_url(self.client.base_url(), url)?;
        self.fallback
            .orchestrate(absolute.as_str(), params, |request| async move {
                self.client
                    .get(
                        url,
                        &request.params,
                        authenticator,
                        request.cache_control.as_ref(),
                    )
                    .await
            })
            .await
    }
}
