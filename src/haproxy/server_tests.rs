// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Unit tests for `haproxy/server.rs`

#[cfg(test)]
mod tests {
    use crate::errors::HaproxyError;
    use crate::haproxy::server::servers_equal;
    use crate::haproxy::test_support::{
        client_for, mount_open_transaction, mount_version, CONFIG,
    };
    use crate::haproxy::types::Server;
    use crate::haproxy::{Change, ConfigSession};
    use serde_json::json;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn server(name: &str, address: &str, port: i64) -> Server {
        Server {
            name: name.to_string(),
            address: address.to_string(),
            port: Some(port),
            id: None,
            check: None,
        }
    }

    async fn open_session(mock: &MockServer) -> ConfigSession {
        mount_version(mock, 1).await;
        mount_open_transaction(mock).await;
        let (client, _) = client_for(mock);
        let mut session = client.session();
        session.open().await.unwrap();
        session
    }

    async fn mount_servers(mock: &MockServer, body: serde_json::Value) {
        Mock::given(method("GET"))
            .and(path(format!("{CONFIG}/backends/web/servers")))
            .respond_with(ResponseTemplate::new(200).set_body_json(body))
            .mount(mock)
            .await;
    }

    async fn mount_get_server(mock: &MockServer, name: &str, status: u16, body: serde_json::Value) {
        Mock::given(method("GET"))
            .and(path(format!("{CONFIG}/backends/web/servers/{name}")))
            .respond_with(ResponseTemplate::new(status).set_body_json(body))
            .mount(mock)
            .await;
    }

    #[test]
    fn test_servers_equal() {
        let a = server("s1", "10.0.0.1", 80);
        assert!(servers_equal(&a, &a.clone()));
        assert!(!servers_equal(&a, &server("s1", "10.0.0.2", 80)));
        assert!(!servers_equal(&a, &server("s1", "10.0.0.1", 81)));

        let mut upper = a.clone();
        upper.check = Some("ENABLED".to_string());
        let mut lower = a.clone();
        lower.check = Some("enabled".to_string());
        assert!(servers_equal(&upper, &lower));
        assert!(!servers_equal(&a, &lower));
    }

    #[tokio::test]
    async fn test_ensure_creates_absent_server() {
        let mock = MockServer::start().await;
        let mut session = open_session(&mock).await;
        mount_get_server(&mock, "s1", 404, json!({})).await;
        Mock::given(method("POST"))
            .and(path(format!("{CONFIG}/backends/web/servers")))
            .respond_with(ResponseTemplate::new(201))
            .expect(1)
            .mount(&mock)
            .await;

        let change = session
            .ensure_server("web", &server("s1", "10.0.0.1", 80))
            .await
            .unwrap();

        assert_eq!(change, Change::Created);
        assert!(session.is_dirty());
    }

    #[tokio::test]
    async fn test_ensure_updates_moved_server() {
        let mock = MockServer::start().await;
        let mut session = open_session(&mock).await;
        mount_get_server(
            &mock,
            "s1",
            200,
            json!({"name": "s1", "address": "10.0.0.9", "port": 80}),
        )
        .await;
        Mock::given(method("PUT"))
            .and(path(format!("{CONFIG}/backends/web/servers/s1")))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&mock)
            .await;

        let change = session
            .ensure_server("web", &server("s1", "10.0.0.1", 80))
            .await
            .unwrap();

        assert_eq!(change, Change::Updated);
    }

    #[tokio::test]
    async fn test_delete_server_tolerates_404() {
        let mock = MockServer::start().await;
        let mut session = open_session(&mock).await;
        Mock::given(method("DELETE"))
            .and(path(format!("{CONFIG}/backends/web/servers/gone")))
            .respond_with(ResponseTemplate::new(404))
            .mount(&mock)
            .await;

        let change = session.delete_server("web", "gone").await.unwrap();

        assert_eq!(change, Change::Unchanged);
        assert!(!session.is_dirty());
    }

    #[tokio::test]
    async fn test_delete_server_failure() {
        let mock = MockServer::start().await;
        let mut session = open_session(&mock).await;
        Mock::given(method("DELETE"))
            .and(path(format!("{CONFIG}/backends/web/servers/s1")))
            .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
            .mount(&mock)
            .await;

        let err = session.delete_server("web", "s1").await.unwrap_err();

        assert!(matches!(err, HaproxyError::ApiResponse { status: 500, .. }));
    }

    #[tokio::test]
    async fn test_sync_converges_to_desired_set() {
        let mock = MockServer::start().await;
        let mut session = open_session(&mock).await;
        // Remote has s1 (unchanged), s2 (stale address) and old (not desired).
        mount_get_server(
            &mock,
            "s1",
            200,
            json!({"name": "s1", "address": "10.0.0.1", "port": 80}),
        )
        .await;
        mount_get_server(
            &mock,
            "s2",
            200,
            json!({"name": "s2", "address": "10.0.0.99", "port": 80}),
        )
        .await;
        mount_get_server(&mock, "s3", 404, json!({})).await;
        mount_servers(
            &mock,
            json!([
                {"name": "s1", "address": "10.0.0.1", "port": 80},
                {"name": "s2", "address": "10.0.0.2", "port": 80},
                {"name": "s3", "address": "10.0.0.3", "port": 80},
                {"name": "old", "address": "10.0.0.4", "port": 80}
            ]),
        )
        .await;
        Mock::given(method("PUT"))
            .and(path(format!("{CONFIG}/backends/web/servers/s2")))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&mock)
            .await;
        Mock::given(method("POST"))
            .and(path(format!("{CONFIG}/backends/web/servers")))
            .respond_with(ResponseTemplate::new(201))
            .expect(1)
            .mount(&mock)
            .await;
        Mock::given(method("DELETE"))
            .and(path(format!("{CONFIG}/backends/web/servers/old")))
            .respond_with(ResponseTemplate::new(204))
            .expect(1)
            .mount(&mock)
            .await;

        let desired = vec![
            server("s1", "10.0.0.1", 80),
            server("s2", "10.0.0.2", 80),
            server("s3", "10.0.0.3", 80),
        ];
        let report = session.sync_servers("web", &desired).await.unwrap();

        assert_eq!(report.created, vec!["s3".to_string()]);
        assert_eq!(report.updated, vec!["s2".to_string()]);
        assert_eq!(report.deleted, vec!["old".to_string()]);
        assert!(session.is_dirty());
    }

    #[tokio::test]
    async fn test_sync_with_empty_desired_removes_everything() {
        let mock = MockServer::start().await;
        let mut session = open_session(&mock).await;
        mount_servers(
            &mock,
            json!([
                {"name": "a", "address": "10.0.0.1"},
                {"name": "b", "address": "10.0.0.2"}
            ]),
        )
        .await;
        Mock::given(method("DELETE"))
            .respond_with(ResponseTemplate::new(202))
            .expect(2)
            .mount(&mock)
            .await;

        let report = session.sync_servers("web", &[]).await.unwrap();

        assert_eq!(report.deleted, vec!["a".to_string(), "b".to_string()]);
    }

    #[tokio::test]
    async fn test_list_failure_aborts_sync() {
        let mock = MockServer::start().await;
        let mut session = open_session(&mock).await;
        Mock::given(method("GET"))
            .and(path(format!("{CONFIG}/backends/web/servers")))
            .respond_with(ResponseTemplate::new(503))
            .mount(&mock)
            .await;

        let err = session.sync_servers("web", &[]).await.unwrap_err();

        assert!(matches!(err, HaproxyError::ApiResponse { status: 503, .. }));
        assert_eq!(err.status_reason(), "GatewayError");
    }

    #[tokio::test]
    async fn test_reserved_characters_in_names_stay_inside_their_segment() {
        let mock = MockServer::start().await;
        let mut session = open_session(&mock).await;
        Mock::given(method("DELETE"))
            .and(path(format!("{CONFIG}/backends/web/servers/a%2Fb%3Fc%23d")))
            .respond_with(ResponseTemplate::new(204))
            .expect(1)
            .mount(&mock)
            .await;

        let change = session.delete_server("web", "a/b?c#d").await.unwrap();

        assert_eq!(change, Change::Deleted);
        let requests = mock.received_requests().await.unwrap();
        let last = requests.last().unwrap();
        assert_eq!(last.url.query_pairs().count(), 1);
        assert!(last.url.query_pairs().any(|(k, _)| k == "transaction_id"));
    }
}
