use std::{fmt, time::Duration};

use futures::future::BoxFuture;
use headers::{Authorization, HeaderMapExt};
use http::{
    header::{HeaderValue, InvalidHeaderValue},
    HeaderMap, Request,
};
use hyper::{
    body::{Body, HttpBody},
    client::{Client, HttpConnector},
};
use serde::{Deserialize, Serialize};
use snafu::{ResultExt, Snafu};
use tracing::{Instrument, Span};

use crate::internal_events::http_client;

#[derive(Debug, Snafu)]
pub enum HttpError {
    #[snafu(display("Invalid User-Agent header: {}", source))]
    InvalidUserAgent { source: InvalidHeaderValue },
    #[snafu(display("Failed to make HTTP request: {}", source))]
    CallRequest { source: hyper::Error },
    #[snafu(display("HTTP request timed out after {:?}", timeout))]
    RequestTimedOut { timeout: Duration },
}

pub struct HttpClient<B = Body> {
    client: Client<HttpConnector, B>,
    span: Span,
    user_agent: HeaderValue,
    timeout: Option<Duration>,
}

impl<B> HttpClient<B>
where
    B: fmt::Debug + HttpBody + Send + 'static,
    B::Data: Send,
    B::Error: Into<crate::Error>,
{
    pub fn new(timeout: Option<Duration>) -> Result<HttpClient<B>, HttpError> {
        let mut http = HttpConnector::new();
        http.enforce_http(true);

        let client = Client::builder().build(http);

        let version = crate::get_version();
        let user_agent = HeaderValue::from_str(&format!("influxdb-output/{}", version))
            .context(InvalidUserAgentSnafu)?;

        let span = tracing::info_span!("http");

        Ok(HttpClient {
            client,
            span,
            user_agent,
            timeout,
        })
    }

    pub fn send(
        &self,
        mut request: Request<B>,
    ) -> BoxFuture<'static, Result<http::Response<Body>, HttpError>> {
        let _enter = self.span.enter();

        default_request_headers(&mut request, &self.user_agent);

        emit!(http_client::AboutToSendHttpRequest { request: &request });

        let response = self.client.request(request);
        let timeout = self.timeout;

        let fut = async move {
            // Request doesn't start the processing until we start polling it.
            let before = std::time::Instant::now();

            let response_result = match timeout {
                Some(timeout) => tokio::time::timeout(timeout, response)
                    .await
                    .map_err(|_| HttpError::RequestTimedOut { timeout })?,
                None => response.await,
            };

            let roundtrip = before.elapsed();

            let response = response_result
                .map_err(|error| {
                    emit!(http_client::GotHttpError {
                        error: &error,
                        roundtrip
                    });
                    error
                })
                .context(CallRequestSnafu)?;

            emit!(http_client::GotHttpResponse {
                response: &response,
                roundtrip
            });
            Ok::<_, HttpError>(response)
        }
        .instrument(self.span.clone());

        Box::pin(fut)
    }
}

fn default_request_headers<B>(request: &mut Request<B>, user_agent: &HeaderValue) {
    if !request.headers().contains_key("User-Agent") {
        request
            .headers_mut()
            .insert("User-Agent", user_agent.clone());
    }

    if !request.headers().contains_key("Accept-Encoding") {
        // Responses are small JSON error documents at most.
        request
            .headers_mut()
            .insert("Accept-Encoding", HeaderValue::from_static("identity"));
    }
}

impl<B> Clone for HttpClient<B> {
    fn clone(&self) -> Self {
        Self {
            client: self.client.clone(),
            span: self.span.clone(),
            user_agent: self.user_agent.clone(),
            timeout: self.timeout,
        }
    }
}

impl<B> fmt::Debug for HttpClient<B> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HttpClient")
            .field("user_agent", &self.user_agent)
            .field("timeout", &self.timeout)
            .finish()
    }
}

/// Credentials attached to every request.
#[derive(Deserialize, Serialize, Clone, PartialEq, Eq)]
#[serde(deny_unknown_fields, rename_all = "snake_case", tag = "strategy")]
pub enum Auth {
    Basic { user: String, password: String },
}

impl fmt::Debug for Auth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Auth::Basic { user, .. } => f
                .debug_struct("Basic")
                .field("user", user)
                .field("password", &"**REDACTED**")
                .finish(),
        }
    }
}

impl Auth {
    pub fn apply<B>(&self, req: &mut Request<B>) {
        self.apply_headers_map(req.headers_mut())
    }

    pub fn apply_headers_map(&self, map: &mut HeaderMap) {
        match &self {
            Auth::Basic { user, password } => {
                let auth = Authorization::basic(user, password);
                map.typed_insert(auth);
            }
        }
    }
}
