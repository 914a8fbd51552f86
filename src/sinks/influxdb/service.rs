use async_trait::async_trait;
use bytes::BytesMut;
use http::{Request, StatusCode, Uri};
use hyper::Body;
use serde::Deserialize;
use snafu::ResultExt;

use super::{
    encode_uri,
    store::{
        BuildClientSnafu, BuildPingSnafu, BuildRequestSnafu, BuildUriSnafu, InvalidAddressSnafu,
        PingSnafu, PingUriSnafu, ReadBodySnafu, RequestSnafu,
    },
    CloseError, ConnectError, Connection, ConnectionSettings, Connector, HealthcheckError,
    WriteError, WriteRequest,
};
use crate::http::{Auth, HttpClient};

/// Connects to the InfluxDB v1 HTTP API.
#[derive(Clone, Copy, Debug, Default)]
pub struct InfluxDbHttp;

impl Connector for InfluxDbHttp {
    type Connection = HttpConnection;

    fn connect(&self, settings: &ConnectionSettings) -> Result<HttpConnection, ConnectError> {
        let endpoint = parse_endpoint(&settings.address)?;
        let client = HttpClient::new(settings.request_timeout).context(BuildClientSnafu)?;

        Ok(HttpConnection {
            endpoint,
            auth: settings.auth.clone(),
            client: Some(client),
        })
    }
}

/// Normalizes `address` into an `http://` endpoint.
///
/// An address without a scheme is taken to be `host:port` over plain HTTP.
pub fn parse_endpoint(address: &str) -> Result<String, ConnectError> {
    let address = address.trim();
    let endpoint = if address.contains("://") {
        address.to_owned()
    } else {
        format!("http://{}", address)
    };

    let uri = endpoint
        .parse::<Uri>()
        .context(InvalidAddressSnafu { address })?;

    match uri.scheme_str() {
        Some("http") => {}
        other => {
            return Err(ConnectError::UnsupportedScheme {
                scheme: other.unwrap_or_default().to_owned(),
            })
        }
    }

    if uri.host().map_or(true, str::is_empty) {
        return Err(ConnectError::MissingHost {
            address: address.to_owned(),
        });
    }

    Ok(endpoint)
}

#[derive(Deserialize)]
struct ErrorResponse {
    error: String,
}

/// A connection to one InfluxDB server.
#[derive(Debug)]
pub struct HttpConnection {
    endpoint: String,
    auth: Option<Auth>,
    client: Option<HttpClient>,
}

impl HttpConnection {
    fn request(
        &self,
        builder: http::request::Builder,
        body: Body,
    ) -> Result<Request<Body>, http::Error> {
        let mut request = builder.body(body)?;
        if let Some(auth) = &self.auth {
            auth.apply(&mut request);
        }
        Ok(request)
    }
}

#[async_trait]
impl Connection for HttpConnection {
    // https://docs.influxdata.com/influxdb/v1/tools/api/#write-http-endpoint
    async fn write(&mut self, request: WriteRequest<'_>) -> Result<(), WriteError> {
        let client = self.client.as_ref().ok_or(WriteError::ConnectionClosed)?;
        let settings = request.settings;

        let uri = encode_uri(
            &self.endpoint,
            "write",
            &[
                ("db", Some(settings.database.as_str())),
                ("rp", settings.retention_policy.as_deref()),
                ("consistency", settings.consistency.as_deref()),
                ("precision", Some(settings.precision.write_precision())),
            ],
        )
        .context(BuildUriSnafu)?;

        let mut body = BytesMut::new();
        for point in request.points {
            point.encode(&settings.precision, &mut body);
        }

        let http_request = self
            .request(
                Request::post(uri).header("Content-Type", "text/plain; charset=utf-8"),
                Body::from(body.freeze()),
            )
            .context(BuildRequestSnafu)?;

        let response = client.send(http_request).await.context(RequestSnafu)?;
        let status = response.status();
        if status == StatusCode::NO_CONTENT || status == StatusCode::OK {
            return Ok(());
        }

        let body = hyper::body::to_bytes(response.into_body())
            .await
            .context(ReadBodySnafu)?;
        let message = match serde_json::from_slice::<ErrorResponse>(&body) {
            Ok(response) => response.error,
            Err(_) => String::from_utf8_lossy(&body).trim().to_owned(),
        };

        Err(WriteError::UnexpectedStatus { status, message })
    }

    // https://docs.influxdata.com/influxdb/v1/tools/api/#ping-http-endpoint
    async fn ping(&mut self) -> Result<(), HealthcheckError> {
        let client = self
            .client
            .as_ref()
            .ok_or(HealthcheckError::HealthcheckConnectionClosed)?;

        let uri = encode_uri(&self.endpoint, "ping", &[]).context(PingUriSnafu)?;

        let request = self
            .request(Request::get(uri), Body::empty())
            .context(BuildPingSnafu)?;

        let response = client.send(request).await.context(PingSnafu)?;
        match response.status() {
            StatusCode::OK | StatusCode::NO_CONTENT => Ok(()),
            status => Err(HealthcheckError::UnexpectedPingStatus { status }),
        }
    }

    fn close(&mut self) -> Result<(), CloseError> {
        // Dropping the client releases its pooled connections.
        self.client.take().map(drop).ok_or(CloseError::AlreadyClosed)
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use chrono::{TimeZone, Utc};
    use headers::{authorization::Basic, Authorization, HeaderMapExt};
    use http::Method;

    use super::*;
    use crate::event::Value;
    use crate::sinks::influxdb::{Point, TimePrecision, WriteSettings};
    use crate::sinks::util::test::{build_test_server, TestServer};

    fn points() -> Vec<Point> {
        let ts = Utc.timestamp_opt(1_542_182_950, 0).single().unwrap();
        vec![
            Point::new(
                "events",
                [("host".to_owned(), "a".to_owned())].into_iter().collect(),
                [("cpu".to_owned(), Value::from(42i64))].into_iter().collect(),
                ts,
            )
            .unwrap(),
            Point::new(
                "events",
                BTreeMap::new(),
                [("msg".to_owned(), Value::from("hi there"))].into_iter().collect(),
                ts,
            )
            .unwrap(),
        ]
    }

    fn write_settings() -> WriteSettings {
        WriteSettings {
            database: "beats".into(),
            retention_policy: Some("autogen".into()),
            consistency: None,
            precision: TimePrecision::Milliseconds,
        }
    }

    fn connect(server: &TestServer, auth: Option<Auth>) -> HttpConnection {
        InfluxDbHttp
            .connect(&ConnectionSettings {
                address: server.addr.to_string(),
                auth,
                request_timeout: None,
            })
            .unwrap()
    }

    #[test]
    fn endpoint_without_scheme_uses_http() {
        assert_eq!(parse_endpoint("localhost:8086").unwrap(), "http://localhost:8086");
        assert_eq!(
            parse_endpoint("http://influx:8086/").unwrap(),
            "http://influx:8086/"
        );
    }

    #[test]
    fn endpoint_rejects_other_schemes() {
        assert!(matches!(
            parse_endpoint("https://influx:8086"),
            Err(ConnectError::UnsupportedScheme { scheme }) if scheme == "https"
        ));
        assert!(matches!(
            parse_endpoint("udp://influx:8089"),
            Err(ConnectError::UnsupportedScheme { .. })
        ));
    }

    #[test]
    fn endpoint_rejects_malformed_addresses() {
        assert!(matches!(
            parse_endpoint("local host:8086"),
            Err(ConnectError::InvalidAddress { .. })
        ));
        assert!(matches!(
            parse_endpoint("http://:8086"),
            Err(ConnectError::InvalidAddress { .. } | ConnectError::MissingHost { .. })
        ));
    }

    #[tokio::test]
    async fn writes_line_protocol() {
        let mut server = build_test_server(StatusCode::NO_CONTENT, "");
        let mut connection = connect(
            &server,
            Some(Auth::Basic {
                user: "writer".into(),
                password: "secret".into(),
            }),
        );
        let settings = write_settings();
        let points = points();

        connection
            .write(WriteRequest {
                settings: &settings,
                points: &points,
            })
            .await
            .unwrap();

        let (parts, body) = server.next_request().await;
        assert_eq!(parts.method, Method::POST);
        assert_eq!(parts.uri.path(), "/write");
        assert_eq!(parts.uri.query(), Some("db=beats&rp=autogen&precision=ms"));
        assert_eq!(
            parts.headers.typed_get::<Authorization<Basic>>(),
            Some(Authorization::basic("writer", "secret"))
        );
        assert_eq!(
            body,
            "events,host=a cpu=42i 1542182950000\nevents msg=\"hi there\" 1542182950000\n"
        );
    }

    #[tokio::test]
    async fn write_error_carries_server_message() {
        let server = build_test_server(
            StatusCode::BAD_REQUEST,
            r#"{"error":"unable to parse 'events': missing fields"}"#,
        );
        let mut connection = connect(&server, None);
        let settings = write_settings();
        let points = points();

        let error = connection
            .write(WriteRequest {
                settings: &settings,
                points: &points,
            })
            .await
            .unwrap_err();

        match error {
            WriteError::UnexpectedStatus { status, message } => {
                assert_eq!(status, StatusCode::BAD_REQUEST);
                assert_eq!(message, "unable to parse 'events': missing fields");
            }
            other => panic!("unexpected error: {}", other),
        }
    }

    #[tokio::test]
    async fn ping() {
        let mut server = build_test_server(StatusCode::NO_CONTENT, "");
        let mut connection = connect(&server, None);

        connection.ping().await.unwrap();

        let (parts, _) = server.next_request().await;
        assert_eq!(parts.method, Method::GET);
        assert_eq!(parts.uri.path(), "/ping");
    }

    #[tokio::test]
    async fn ping_unexpected_status() {
        let server = build_test_server(StatusCode::SERVICE_UNAVAILABLE, "");
        let mut connection = connect(&server, None);

        assert!(matches!(
            connection.ping().await,
            Err(HealthcheckError::UnexpectedPingStatus { status }) if status == StatusCode::SERVICE_UNAVAILABLE
        ));
    }

    #[tokio::test]
    async fn closed_connection_refuses_work() {
        let server = build_test_server(StatusCode::NO_CONTENT, "");
        let mut connection = connect(&server, None);
        let settings = write_settings();

        assert_eq!(connection.close(), Ok(()));
        assert_eq!(connection.close(), Err(CloseError::AlreadyClosed));
        assert!(matches!(
            connection
                .write(WriteRequest {
                    settings: &settings,
                    points: &[],
                })
                .await,
            Err(WriteError::ConnectionClosed)
        ));
    }

    #[tokio::test]
    async fn unreachable_server_is_a_request_error() {
        let addr = crate::test_util::next_addr();
        let mut connection = InfluxDbHttp
            .connect(&ConnectionSettings {
                address: addr.to_string(),
                auth: None,
                request_timeout: None,
            })
            .unwrap();
        let settings = write_settings();
        let points = points();

        assert!(matches!(
            connection
                .write(WriteRequest {
                    settings: &settings,
                    points: &points,
                })
                .await,
            Err(WriteError::Request { .. })
        ));
    }
}
