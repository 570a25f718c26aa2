//! In-process apps for overlays to redirect into

use std::collections::HashMap;
use std::convert::Infallible;
use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use http_body_util::{BodyExt, Full};
use hyper::header::{HeaderValue, CONTENT_TYPE};
use hyper::service::service_fn;
use hyper::{Request, Response, StatusCode};
use reroute::App;

fn json(status: StatusCode, value: &serde_json::Value) -> Response<Full<Bytes>> {
    let mut response = Response::new(Full::new(Bytes::from(value.to_string())));
    *response.status_mut() = status;
    response
        .headers_mut()
        .insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
    response
}

/// Answers `GET path` with the JSON string mapped to it, 404 otherwise
pub fn routes(routes: &[(&str, &str)]) -> impl App {
    let routes: Arc<HashMap<String, String>> = Arc::new(
        routes
            .iter()
            .map(|(path, body)| (path.to_string(), body.to_string()))
            .collect(),
    );

    service_fn(move |req: Request<Full<Bytes>>| {
        let routes = routes.clone();
        async move {
            let response = match routes.get(req.uri().path()) {
                Some(body) if req.method() == hyper::Method::GET => {
                    json(StatusCode::OK, &serde_json::Value::from(body.as_str()))
                }
                _ => json(
                    StatusCode::NOT_FOUND,
                    &serde_json::json!({ "detail": "Not Found" }),
                ),
            };
            Ok::<_, Infallible>(response)
        }
    })
}

/// Describes the request it received as JSON
pub fn echo() -> impl App {
    service_fn(|req: Request<Full<Bytes>>| async move {
        let (parts, body) = req.into_parts();
        let body = body.collect().await?.to_bytes();
        let headers: serde_json::Map<String, serde_json::Value> = parts
            .headers
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_str().unwrap_or("").into()))
            .collect();

        Ok::<_, Infallible>(json(
            StatusCode::OK,
            &serde_json::json!({
                "method": parts.method.as_str(),
                "uri": parts.uri.to_string(),
                "path": parts.uri.path(),
                "headers": headers,
                "body": String::from_utf8_lossy(&body),
            }),
        ))
    })
}

/// Waits `delay` before answering
pub fn slow(delay: Duration) -> impl App {
    service_fn(move |_req: Request<Full<Bytes>>| async move {
        tokio::time::sleep(delay).await;
        Ok::<_, Infallible>(json(StatusCode::OK, &serde_json::Value::from("late")))
    })
}

/// Always fails
pub fn broken() -> impl App {
    service_fn(|_req: Request<Full<Bytes>>| async {
        Err::<Response<Full<Bytes>>, _>(std::io::Error::other("app crashed"))
    })
}
