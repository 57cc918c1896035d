//! Uniform JSON response bodies.
//!
//! Every response leaving a handler, success or failure, carries the same
//! fixed header set so browser clients on any origin can read it.

use axum::{
    Json,
    http::{HeaderName, HeaderValue, StatusCode, header},
    response::{IntoResponse, Response},
};
use serde::Serialize;

const FIXED_HEADERS: [(HeaderName, &str); 3] = [
    (header::CONTENT_TYPE, "application/json"),
    (header::ACCESS_CONTROL_ALLOW_ORIGIN, "*"),
    (header::ACCESS_CONTROL_ALLOW_CREDENTIALS, "true"),
];

#[derive(Serialize)]
struct ErrorBody<'a> {
    error: &'a str,
}

/// 200 response with `data` serialized as the body.
pub fn success<T: Serialize>(data: T) -> Response {
    with_fixed_headers(StatusCode::OK, Json(data))
}

/// Error response with body `{"error": message}`.
pub fn error(message: &str, status: StatusCode) -> Response {
    with_fixed_headers(status, Json(ErrorBody { error: message }))
}

fn with_fixed_headers(status: StatusCode, body: impl IntoResponse) -> Response {
    let mut res = (status, body).into_response();
    let headers = res.headers_mut();
    for (name, value) in FIXED_HEADERS {
        headers.insert(name, HeaderValue::from_static(value));
    }
    res
}

#[cfg(test)]
mod tests {
    use super::*;
    use http_body_util::BodyExt;
    use serde_json::{Value, json};

    async fn body_json(res: Response) -> Value {
        let bytes = res.into_body().collect().await.unwrap().to_bytes();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn success_sets_fixed_headers() {
        let res = success(json!([{ "id": "1" }]));

        assert_eq!(res.status(), StatusCode::OK);
        assert_eq!(res.headers()["content-type"], "application/json");
        assert_eq!(res.headers()["access-control-allow-origin"], "*");
        assert_eq!(res.headers()["access-control-allow-credentials"], "true");
        assert_eq!(body_json(res).await, json!([{ "id": "1" }]));
    }

    #[tokio::test]
    async fn error_wraps_message() {
        let res = error("Method not allowed", StatusCode::METHOD_NOT_ALLOWED);

        assert_eq!(res.status(), StatusCode::METHOD_NOT_ALLOWED);
        assert_eq!(res.headers()["access-control-allow-origin"], "*");
        assert_eq!(
            body_json(res).await,
            json!({ "error": "Method not allowed" })
        );
    }
}
