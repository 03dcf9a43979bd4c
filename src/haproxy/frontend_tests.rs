// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Unit tests for `haproxy/frontend.rs`

#[cfg(test)]
mod tests {
    use crate::constants::MANAGED_DESCRIPTION;
    use crate::errors::HaproxyError;
    use crate::haproxy::frontend::{binds_equal, frontends_equal};
    use crate::haproxy::test_support::{
        client_for, mount_open_transaction, mount_version, CONFIG,
    };
    use crate::haproxy::types::{BackendSwitchingRule, Bind, Frontend};
    use crate::haproxy::{Change, ConfigSession};
    use serde_json::json;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn frontend(default_backend: &str) -> Frontend {
        Frontend {
            name: "public".to_string(),
            mode: Some("http".to_string()),
            default_backend: Some(default_backend.to_string()),
            description: None,
        }
    }

    fn bind(address: &str, port: i64) -> Bind {
        Bind {
            name: None,
            address: Some(address.to_string()),
            port: Some(port),
        }
    }

    fn rule(backend: &str, cond_test: &str) -> BackendSwitchingRule {
        BackendSwitchingRule {
            name: backend.to_string(),
            cond: Some("if".to_string()),
            cond_test: Some(cond_test.to_string()),
        }
    }

    async fn open_session(server: &MockServer) -> ConfigSession {
        mount_version(server, 1).await;
        mount_open_transaction(server).await;
        let (client, _) = client_for(server);
        let mut session = client.session();
        session.open().await.unwrap();
        session
    }

    #[test]
    fn test_frontends_equal() {
        let a = frontend("web");
        assert!(frontends_equal(&a, &a.clone()));
        assert!(!frontends_equal(&a, &frontend("api")));
    }

    #[test]
    fn test_binds_equal_ignores_name() {
        let mut named = bind("0.0.0.0", 80);
        named.name = Some("http".to_string());
        assert!(binds_equal(&named, &bind("0.0.0.0", 80)));
        assert!(!binds_equal(&named, &bind("0.0.0.0", 443)));
    }

    #[tokio::test]
    async fn test_ensure_frontend_creates_with_marker() {
        let server = MockServer::start().await;
        let mut session = open_session(&server).await;
        Mock::given(method("GET"))
            .and(path(format!("{CONFIG}/frontends/public")))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path(format!("{CONFIG}/frontends")))
            .respond_with(ResponseTemplate::new(201))
            .expect(1)
            .mount(&server)
            .await;

        let change = session.ensure_frontend(frontend("web")).await.unwrap();

        assert_eq!(change, Change::Created);
        let requests = server.received_requests().await.unwrap();
        let post = requests
            .iter()
            .find(|r| r.method.as_str() == "POST" && r.url.path().ends_with("/frontends"))
            .unwrap();
        let sent: Frontend = post.body_json().unwrap();
        assert_eq!(sent.description.as_deref(), Some(MANAGED_DESCRIPTION));
    }

    #[tokio::test]
    async fn test_ensure_frontend_refuses_foreign() {
        let server = MockServer::start().await;
        let mut session = open_session(&server).await;
        Mock::given(method("GET"))
            .and(path(format!("{CONFIG}/frontends/public")))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(json!({"name": "public"})),
            )
            .mount(&server)
            .await;

        let err = session.ensure_frontend(frontend("web")).await.unwrap_err();

        assert!(matches!(
            err,
            HaproxyError::NotManaged {
                resource_type: "frontend",
                ..
            }
        ));
        assert!(!session.is_dirty());
    }

    #[tokio::test]
    async fn test_ensure_bind_skips_existing_address() {
        let server = MockServer::start().await;
        let mut session = open_session(&server).await;
        Mock::given(method("GET"))
            .and(path(format!("{CONFIG}/frontends/public/binds")))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([
                {"name": "http", "address": "0.0.0.0", "port": 80}
            ])))
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path(format!("{CONFIG}/frontends/public/binds")))
            .respond_with(ResponseTemplate::new(201))
            .expect(1)
            .mount(&server)
            .await;

        assert_eq!(
            session.ensure_bind("public", &bind("0.0.0.0", 80)).await.unwrap(),
            Change::Unchanged
        );
        assert_eq!(
            session.ensure_bind("public", &bind("0.0.0.0", 443)).await.unwrap(),
            Change::Created
        );
    }

    #[tokio::test]
    async fn test_ensure_switching_rule_appends_and_replaces_list() {
        let server = MockServer::start().await;
        let mut session = open_session(&server).await;
        Mock::given(method("GET"))
            .and(path(format!("{CONFIG}/frontends/public/backend_switching_rules")))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([
                {"name": "api", "cond": "if", "cond_test": "{ path_beg /api }"}
            ])))
            .mount(&server)
            .await;
        Mock::given(method("PUT"))
            .and(path(format!("{CONFIG}/frontends/public/backend_switching_rules")))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&server)
            .await;

        let existing = session
            .ensure_backend_switching_rule("public", &rule("api", "{ path_beg /api }"))
            .await
            .unwrap();
        let added = session
            .ensure_backend_switching_rule("public", &rule("web", "{ path_beg /web }"))
            .await
            .unwrap();

        assert_eq!(existing, Change::Unchanged);
        assert_eq!(added, Change::Updated);

        let requests = server.received_requests().await.unwrap();
        let put = requests
            .iter()
            .find(|r| r.method.as_str() == "PUT")
            .unwrap();
        let sent: Vec<BackendSwitchingRule> = put.body_json().unwrap();
        assert_eq!(sent.len(), 2);
        assert_eq!(sent[1].name, "web");
    }

    #[tokio::test]
    async fn test_delete_switching_rule_by_index() {
        let server = MockServer::start().await;
        let mut session = open_session(&server).await;
        Mock::given(method("DELETE"))
            .and(path(format!("{CONFIG}/frontends/public/backend_switching_rules/0")))
            .respond_with(ResponseTemplate::new(204))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("DELETE"))
            .and(path(format!("{CONFIG}/frontends/public/backend_switching_rules/5")))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        assert_eq!(
            session.delete_backend_switching_rule("public", 5).await.unwrap(),
            Change::Unchanged
        );
        assert!(!session.is_dirty());
        assert_eq!(
            session.delete_backend_switching_rule("public", 0).await.unwrap(),
            Change::Deleted
        );
        assert!(session.is_dirty());
    }
}
