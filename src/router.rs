//! 路由配置

use axum::{
    Router,
    extract::State,
    http::StatusCode,
    middleware,
    response::{IntoResponse, Json},
    routing::{any, get},
};
use serde_json::json;
use tower_http::catch_panic::CatchPanicLayer;

use crate::gateway::{AppState, cors_layer, panic_response, preflight_middleware};
use crate::honeypot::honeypot;
use crate::predict::predict;

/// 创建应用路由
///
/// # 端点
/// - `GET /` - 服务信息
/// - `ANY /predict` - 语音检测（需要 API Key）
/// - `ANY /honeypot` - 蜜罐（认证取决于 `honeypotAuth`）
/// - `ANY /api/honeypot` - `/honeypot` 的别名
///
/// 任意路由上的 `OPTIONS` 由预检中间件直接应答
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/", get(root))
        .route("/predict", any(predict))
        .route("/honeypot", any(honeypot))
        .route("/api/honeypot", any(honeypot))
        .fallback(not_found)
        .method_not_allowed_fallback(method_not_allowed)
        .layer(CatchPanicLayer::custom(panic_response))
        .layer(cors_layer())
        // 必须位于 CorsLayer 外层，否则 OPTIONS 会被 CorsLayer 以空响应体应答
        .layer(middleware::from_fn(preflight_middleware))
        .with_state(state)
}

/// GET /
async fn root(State(state): State<AppState>) -> impl IntoResponse {
    Json(json!({
        "status": "healthy",
        "service": state.config.service_name,
        "endpoints": {
            "voice_detection": "/predict",
            "honeypot": "/honeypot"
        }
    }))
}

/// 未匹配的路径返回 JSON 404
async fn not_found() -> impl IntoResponse {
    (StatusCode::NOT_FOUND, Json(json!({ "error": "Not Found" })))
}

/// 路径存在但方法不支持时返回 JSON 405
async fn method_not_allowed() -> impl IntoResponse {
    (
        StatusCode::METHOD_NOT_ALLOWED,
        Json(json!({ "error": "Method Not Allowed" })),
    )
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use axum::{
        body::{Body, to_bytes},
        http::{HeaderMap, Request, header},
        response::Response,
    };
    use serde_json::Value;
    use tower::ServiceExt;

    use crate::error::GatewayError;
    use crate::model::config::{ClassifierKind, Config, HoneypotAuthMode};
    use crate::predict::classifier::VoiceClassifier;
    use crate::predict::types::Classification;

    const METHODS: &[&str] = &["GET", "POST", "PUT", "DELETE", "PATCH", "HEAD", "OPTIONS"];

    fn app() -> Router {
        create_router(AppState::new(Config::default()))
    }

    fn app_with(config: Config) -> Router {
        create_router(AppState::new(config))
    }

    async fn send(router: Router, request: Request<Body>) -> (StatusCode, HeaderMap, Value) {
        let response: Response = router.oneshot(request).await.unwrap();
        let status = response.status();
        let headers = response.headers().clone();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let value = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, headers, value)
    }

    fn request(method: &str, uri: &str, key: Option<&str>, body: impl Into<Body>) -> Request<Body> {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(key) = key {
            builder = builder.header("x-api-key", key);
        }
        builder.body(body.into()).unwrap()
    }

    fn expected_report(origin_ip: &str) -> Value {
        json!({
            "status": "success",
            "threat_analysis": {
                "risk_level": "high",
                "detected_patterns": ["suspicious_content"],
                "origin_ip": origin_ip
            },
            "extracted_data": {
                "intent": "scam_attempt",
                "action": "flagged"
            }
        })
    }

    #[tokio::test]
    async fn test_root_lists_endpoints() {
        let (status, _, body) = send(app(), request("GET", "/", None, Body::empty())).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "healthy");
        assert_eq!(body["service"], "honeypot-gateway");
        assert_eq!(body["endpoints"]["voice_detection"], "/predict");
        assert_eq!(body["endpoints"]["honeypot"], "/honeypot");
    }

    #[tokio::test]
    async fn test_predict_with_audio() {
        let payload = r#"{"language":"en","audioFormat":"wav","audioBase64":"SGVsbG8="}"#;
        let (status, _, body) =
            send(app(), request("POST", "/predict", Some("guvi123"), payload)).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(
            body,
            json!({
                "status": "success",
                "prediction": "Human",
                "confidence": 0.89,
                "language": "en",
                "audio_format": "wav"
            })
        );
    }

    #[tokio::test]
    async fn test_predict_without_audio_is_unknown() {
        let payload = r#"{"language":"hi","audioFormat":"mp3"}"#;
        let (status, _, body) =
            send(app(), request("POST", "/predict", Some("guvi123"), payload)).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["prediction"], "Unknown");
        assert_eq!(body["confidence"], 0.0);
        assert_eq!(body["language"], "hi");
        assert_eq!(body["audio_format"], "mp3");
    }

    #[tokio::test]
    async fn test_predict_get_without_body() {
        let (status, _, body) =
            send(app(), request("GET", "/predict", Some("guvi123"), Body::empty())).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["prediction"], "Unknown");
        assert_eq!(body["language"], "en");
        assert_eq!(body["audio_format"], "wav");
    }

    #[tokio::test]
    async fn test_predict_rejects_wrong_or_missing_key() {
        let payloads = [
            r#"{"language":"en","audioFormat":"wav","audioBase64":"SGVsbG8="}"#,
            "not json {{{",
            "",
        ];
        for payload in payloads {
            for key in [Some("wrong"), None] {
                let (status, _, body) =
                    send(app(), request("POST", "/predict", key, payload)).await;
                assert_eq!(status, StatusCode::UNAUTHORIZED);
                assert_eq!(body, json!({ "status": "error", "message": "Unauthorized" }));
            }
        }
    }

    #[tokio::test]
    async fn test_malformed_bodies_never_fail() {
        let bodies: Vec<Body> = vec![
            Body::from("not json {{{"),
            Body::from("[1,2,3]"),
            Body::from("\"just a string\""),
            Body::from(vec![0xffu8, 0x00, 0x13, 0x37]),
            Body::from(r#"{"audioBase64": 12345, "language": null}"#),
        ];

        for body in bodies {
            let (status, _, value) =
                send(app(), request("POST", "/predict", Some("guvi123"), body)).await;
            assert_eq!(status, StatusCode::OK);
            assert_eq!(value["prediction"], "Unknown");
        }

        let (status, _, value) = send(
            app(),
            request("POST", "/honeypot", None, "not json {{{"),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(value, expected_report("unknown"));
    }

    #[tokio::test]
    async fn test_oversized_predict_body_degrades_to_unknown() {
        let mut config = Config::default();
        config.max_body_bytes = 16;
        let payload = r#"{"language":"en","audioFormat":"wav","audioBase64":"SGVsbG8="}"#;

        let (status, _, body) =
            send(app_with(config), request("POST", "/predict", Some("guvi123"), payload)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["prediction"], "Unknown");
    }

    #[tokio::test]
    async fn test_options_on_every_route_is_acknowledged() {
        for uri in ["/", "/predict", "/honeypot", "/api/honeypot", "/missing"] {
            let (status, headers, body) =
                send(app(), request("OPTIONS", uri, None, "garbage {{{")).await;
            assert_eq!(status, StatusCode::OK, "OPTIONS {}", uri);
            assert_eq!(body, json!({ "status": "OK" }));
            assert_eq!(
                headers.get(header::ACCESS_CONTROL_ALLOW_ORIGIN).unwrap(),
                "*"
            );
            assert_eq!(headers.get(header::CACHE_CONTROL).unwrap(), "no-store");
            assert!(headers.get(header::ACCESS_CONTROL_ALLOW_CREDENTIALS).is_none());
        }
    }

    #[tokio::test]
    async fn test_browser_preflight_gets_ack_body() {
        for uri in ["/predict", "/honeypot"] {
            let request = Request::builder()
                .method("OPTIONS")
                .uri(uri)
                .header(header::ORIGIN, "https://tester.example")
                .header(header::ACCESS_CONTROL_REQUEST_METHOD, "POST")
                .header(header::ACCESS_CONTROL_REQUEST_HEADERS, "x-api-key, content-type")
                .body(Body::empty())
                .unwrap();
            let (status, headers, body) = send(app(), request).await;

            assert_eq!(status, StatusCode::OK, "preflight {}", uri);
            assert_eq!(body, json!({ "status": "OK" }));
            assert_eq!(headers.get(header::ACCESS_CONTROL_ALLOW_ORIGIN).unwrap(), "*");
            assert_eq!(headers.get(header::ACCESS_CONTROL_ALLOW_METHODS).unwrap(), "*");
            assert_eq!(headers.get(header::ACCESS_CONTROL_ALLOW_HEADERS).unwrap(), "*");
            assert!(headers.get(header::ACCESS_CONTROL_ALLOW_CREDENTIALS).is_none());
        }
    }

    #[tokio::test]
    async fn test_cors_headers_on_regular_responses() {
        let request = Request::builder()
            .method("POST")
            .uri("/honeypot")
            .header(header::ORIGIN, "https://tester.example")
            .body(Body::empty())
            .unwrap();
        let (status, headers, _) = send(app(), request).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(headers.get(header::ACCESS_CONTROL_ALLOW_ORIGIN).unwrap(), "*");
        assert!(headers.get(header::ACCESS_CONTROL_ALLOW_CREDENTIALS).is_none());
    }

    #[tokio::test]
    async fn test_honeypot_accepts_every_method() {
        for method in METHODS.iter().filter(|m| **m != "OPTIONS" && **m != "HEAD") {
            let (status, _, body) =
                send(app(), request(method, "/honeypot", None, Body::empty())).await;
            assert_eq!(status, StatusCode::OK, "{} /honeypot", method);
            assert_eq!(body, expected_report("unknown"));
        }

        let (status, _, _) = send(app(), request("HEAD", "/honeypot", None, Body::empty())).await;
        assert_eq!(status, StatusCode::OK);
    }

    #[tokio::test]
    async fn test_honeypot_uses_forwarded_ip_and_is_idempotent() {
        let build = || {
            Request::builder()
                .method("POST")
                .uri("/api/honeypot")
                .header("x-forwarded-for", "203.0.113.9, 10.0.0.1")
                .body(Body::from(vec![0u8; 64 * 1024]))
                .unwrap()
        };

        let (status, _, first) = send(app(), build()).await;
        let (_, _, second) = send(app(), build()).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(first, expected_report("203.0.113.9"));
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn test_honeypot_required_mode() {
        let mut config = Config::default();
        config.honeypot_auth = HoneypotAuthMode::Required;

        let (status, _, body) = send(
            app_with(config.clone()),
            request("POST", "/honeypot", Some("wrong"), "not json {{{"),
        )
        .await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body, json!({ "error": "Unauthorized Access" }));

        let (status, _, body) = send(
            app_with(config),
            request("POST", "/honeypot", Some("guvi123"), "not json {{{"),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, expected_report("unknown"));
    }

    #[tokio::test]
    async fn test_seeded_classifier_route() {
        let mut config = Config::default();
        config.classifier = ClassifierKind::Seeded;
        let payload = r#"{"audio_base64":"SGVsbG8=","audio_format":"OGG"}"#;

        let (status, _, first) = send(
            app_with(config.clone()),
            request("POST", "/predict", Some("guvi123"), payload),
        )
        .await;
        let (_, _, second) = send(
            app_with(config),
            request("POST", "/predict", Some("guvi123"), payload),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(first, second);
        assert_eq!(first["audio_format"], "ogg");
        assert!(first["prediction"] == "AI" || first["prediction"] == "Human");
    }

    struct FailingClassifier;

    impl VoiceClassifier for FailingClassifier {
        fn name(&self) -> &'static str {
            "failing"
        }

        fn classify(&self, _audio_base64: &str) -> Result<Classification, GatewayError> {
            Err(GatewayError::Internal("model unavailable".to_string()))
        }
    }

    struct PanickingClassifier;

    impl VoiceClassifier for PanickingClassifier {
        fn name(&self) -> &'static str {
            "panicking"
        }

        fn classify(&self, _audio_base64: &str) -> Result<Classification, GatewayError> {
            panic!("model exploded")
        }
    }

    #[tokio::test]
    async fn test_predict_internal_faults_are_generic_500() {
        let payload = r#"{"audioBase64":"SGVsbG8="}"#;
        let classifiers: Vec<Arc<dyn VoiceClassifier>> =
            vec![Arc::new(FailingClassifier), Arc::new(PanickingClassifier)];

        for classifier in classifiers {
            let state = AppState::new(Config::default()).with_classifier(classifier);
            let (status, _, body) = send(
                create_router(state),
                request("POST", "/predict", Some("guvi123"), payload),
            )
            .await;
            assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
            assert_eq!(
                body,
                json!({ "status": "error", "message": "Internal server error" })
            );
        }
    }

    #[tokio::test]
    async fn test_unsupported_method_on_root_returns_json_405() {
        for method in ["PUT", "POST", "DELETE", "PATCH"] {
            let (status, _, body) = send(app(), request(method, "/", None, "{}")).await;
            assert_eq!(status, StatusCode::METHOD_NOT_ALLOWED, "{} /", method);
            assert_eq!(body, json!({ "error": "Method Not Allowed" }));
        }
    }

    #[tokio::test]
    async fn test_unknown_path_returns_json_404() {
        let (status, _, body) = send(app(), request("GET", "/nope", None, Body::empty())).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body, json!({ "error": "Not Found" }));
    }
}
