// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Unit tests for `haproxy/mod.rs`

#[cfg(test)]
mod tests {
    use crate::errors::HaproxyError;
    use crate::haproxy::test_support::{client_for, mount_version, CONFIG};
    use crate::haproxy::{
        build_api_url, Change, HaproxyClient, HaproxyConfig, ServerSyncReport, SyncReport,
    };
    use crate::metrics::NoopMetrics;
    use std::sync::Arc;
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[test]
    fn test_build_api_url() {
        assert_eq!(build_api_url("haproxy:5555"), "http://haproxy:5555");
        assert_eq!(build_api_url("http://haproxy:5555/"), "http://haproxy:5555");
        assert_eq!(build_api_url("https://lb.example.com"), "https://lb.example.com");
    }

    #[test]
    fn test_invalid_base_url() {
        let config = HaproxyConfig::new("http://[::1", "admin", "secret");
        let result = HaproxyClient::new(config, Arc::new(NoopMetrics));
        assert!(matches!(result, Err(HaproxyError::InvalidUrl { .. })));
    }

    #[test]
    fn test_debug_hides_password() {
        let config = HaproxyConfig::new("http://haproxy:5555", "admin", "hunter2");
        let client = HaproxyClient::new(config, Arc::new(NoopMetrics)).unwrap();
        let rendered = format!("{client:?}");
        assert!(rendered.contains("admin"));
        assert!(!rendered.contains("hunter2"));
    }

    #[test]
    fn test_change_is_write() {
        assert!(Change::Created.is_write());
        assert!(Change::Updated.is_write());
        assert!(Change::Deleted.is_write());
        assert!(!Change::Unchanged.is_write());
    }

    #[test]
    fn test_sync_report_changes_and_summary() {
        assert!(!SyncReport::default().has_changes());

        let report = SyncReport {
            backend: Change::Unchanged,
            http_checks: Change::Unchanged,
            servers: ServerSyncReport {
                created: vec!["s1".to_string()],
                updated: vec![],
                deleted: vec!["old".to_string(), "older".to_string()],
            },
        };
        assert!(report.has_changes());
        assert_eq!(
            report.summary(),
            "backend Unchanged, http checks Unchanged, servers created 1, updated 0, deleted 2"
        );
    }

    #[tokio::test]
    async fn test_get_config_version_plain_integer() {
        let server = MockServer::start().await;
        mount_version(&server, 42).await;
        let (client, _) = client_for(&server);

        assert_eq!(client.get_config_version().await.unwrap(), 42);
    }

    #[tokio::test]
    async fn test_get_config_version_json_object() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path(format!("{CONFIG}/version")))
            .respond_with(ResponseTemplate::new(200).set_body_string(r#"{"_version": 99}"#))
            .mount(&server)
            .await;
        let (client, _) = client_for(&server);

        assert_eq!(client.get_config_version().await.unwrap(), 99);
    }

    #[tokio::test]
    async fn test_get_config_version_garbage_body() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path(format!("{CONFIG}/version")))
            .respond_with(ResponseTemplate::new(200).set_body_string("not-a-version"))
            .mount(&server)
            .await;
        let (client, metrics) = client_for(&server);

        let err = client.get_config_version().await.unwrap_err();

        assert!(matches!(err, HaproxyError::VersionParse { .. }));
        assert_eq!(metrics.errors(), vec!["version_parse".to_string()]);
    }

    #[tokio::test]
    async fn test_requests_use_basic_auth() {
        let server = MockServer::start().await;
        // admin:secret
        Mock::given(method("GET"))
            .and(path(format!("{CONFIG}/version")))
            .and(header("authorization", "Basic YWRtaW46c2VjcmV0"))
            .and(header("accept", "application/json"))
            .respond_with(ResponseTemplate::new(200).set_body_string("3"))
            .expect(1)
            .mount(&server)
            .await;
        let (client, _) = client_for(&server);

        assert_eq!(client.get_config_version().await.unwrap(), 3);
    }

    #[tokio::test]
    async fn test_non_success_status_is_api_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path(format!("{CONFIG}/version")))
            .respond_with(ResponseTemplate::new(401).set_body_string("unauthorized"))
            .mount(&server)
            .await;
        let (client, metrics) = client_for(&server);

        let err = client.get_config_version().await.unwrap_err();

        match err {
            HaproxyError::ApiResponse { status, body, .. } => {
                assert_eq!(status, 401);
                assert_eq!(body, "unauthorized");
            }
            other => panic!("expected ApiResponse, got {other:?}"),
        }
        assert_eq!(metrics.errors(), vec!["api_response".to_string()]);
    }

    #[tokio::test]
    async fn test_unreachable_api_is_transport_error() {
        let config = HaproxyConfig::new("http://127.0.0.1:1", "admin", "secret");
        let client = HaproxyClient::new(config, Arc::new(NoopMetrics)).unwrap();

        let err = client.get_config_version().await.unwrap_err();

        assert!(matches!(err, HaproxyError::Transport { .. }));
        assert_eq!(err.status_reason(), "DataPlaneUnreachable");
        assert!(!err.condition_message().contains("127.0.0.1"));
    }
}
