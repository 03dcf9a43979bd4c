// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Unit tests for `backend/validation.rs`

#[cfg(test)]
mod tests {
    use crate::crd::{
        Balance, BalanceAlgorithm, BackendSpec, CheckMode, ServerSpec, ServerValueFrom,
        ServiceRef,
    };
    use crate::errors::BackendError;
    use crate::model::{ServerEntry, ServicePort};
    use crate::reconcilers::backend::validation::{is_valid_backend_name, validate_backend};

    fn spec(name: &str, servers: Vec<ServerSpec>) -> BackendSpec {
        BackendSpec {
            name: name.to_string(),
            mode: None,
            balance: Some(Balance {
                algorithm: BalanceAlgorithm::RoundRobin,
            }),
            adv_check: None,
            servers,
            http_check_list: vec![],
        }
    }

    fn static_spec(name: &str, address: &str) -> ServerSpec {
        ServerSpec {
            name: Some(name.to_string()),
            address: Some(address.to_string()),
            port: Some(80),
            ..Default::default()
        }
    }

    fn dynamic_spec(namespace: Option<&str>, service: &str, port: Option<&str>) -> ServerSpec {
        ServerSpec {
            value_from: Some(ServerValueFrom {
                service_ref: Some(ServiceRef {
                    namespace: namespace.map(str::to_string),
                    name: service.to_string(),
                    port: port.map(str::to_string),
                }),
            }),
            ..Default::default()
        }
    }

    fn validation_message(result: Result<crate::model::DesiredBackend, BackendError>) -> String {
        match result {
            Err(BackendError::Validation(message)) => message,
            other => panic!("expected a validation error, got {other:?}"),
        }
    }

    #[test]
    fn test_backend_name_pattern() {
        assert!(is_valid_backend_name("web"));
        assert!(is_valid_backend_name("be_web-1.prod:80"));
        assert!(!is_valid_backend_name(""));
        assert!(!is_valid_backend_name("web backend"));
        assert!(!is_valid_backend_name("web/backend"));
    }

    #[test]
    fn test_invalid_name_is_rejected() {
        let message = validation_message(validate_backend(&spec("bad name", vec![]), "default"));
        assert!(message.contains("bad name"));
    }

    #[test]
    fn test_static_server() {
        let mut server = static_spec("s1", "10.0.0.1");
        server.check = Some(CheckMode::Enabled);
        server.id = Some(7);

        let desired = validate_backend(&spec("web", vec![server]), "default").unwrap();

        assert_eq!(desired.balance_algorithm, Some(BalanceAlgorithm::RoundRobin));
        match &desired.servers[0] {
            ServerEntry::Static(s) => {
                assert_eq!(s.name, "s1");
                assert_eq!(s.address, "10.0.0.1");
                assert_eq!(s.port, Some(80));
                assert_eq!(s.id, Some(7));
                assert_eq!(s.check, Some(CheckMode::Enabled));
            }
            ServerEntry::Dynamic(_) => panic!("expected a static server"),
        }
    }

    #[test]
    fn test_dynamic_server_defaults_namespace() {
        let desired = validate_backend(
            &spec("web", vec![dynamic_spec(None, "web-svc", Some("http"))]),
            "apps",
        )
        .unwrap();

        match &desired.servers[0] {
            ServerEntry::Dynamic(d) => {
                assert_eq!(d.namespace, "apps");
                assert_eq!(d.service_name, "web-svc");
                assert_eq!(d.service_port, Some(ServicePort::Name("http".to_string())));
            }
            ServerEntry::Static(_) => panic!("expected a dynamic server"),
        }
    }

    #[test]
    fn test_dynamic_server_explicit_namespace_and_numeric_port() {
        let desired = validate_backend(
            &spec("web", vec![dynamic_spec(Some("shared"), "cache", Some("6379"))]),
            "apps",
        )
        .unwrap();

        match &desired.servers[0] {
            ServerEntry::Dynamic(d) => {
                assert_eq!(d.namespace, "shared");
                assert_eq!(d.service_port, Some(ServicePort::Number(6379)));
            }
            ServerEntry::Static(_) => panic!("expected a dynamic server"),
        }
    }

    #[test]
    fn test_neither_variant_is_rejected() {
        let empty = ServerSpec::default();
        let message = validation_message(validate_backend(&spec("web", vec![empty]), "default"));
        assert_eq!(
            message,
            "server[0]: either address/name or valueFrom must be set for server"
        );
    }

    #[test]
    fn test_half_static_is_rejected() {
        let name_only = ServerSpec {
            name: Some("s1".to_string()),
            ..Default::default()
        };
        let message =
            validation_message(validate_backend(&spec("web", vec![name_only]), "default"));
        assert!(message.contains("either address/name or valueFrom"));
    }

    #[test]
    fn test_both_variants_are_rejected() {
        let mut both = dynamic_spec(None, "web-svc", None);
        both.address = Some("10.0.0.1".to_string());
        let message = validation_message(validate_backend(
            &spec("web", vec![static_spec("s0", "10.0.0.9"), both]),
            "default",
        ));
        assert_eq!(
            message,
            "server[1]: only one of address/name or valueFrom may be set for server"
        );
    }

    #[test]
    fn test_missing_service_name_is_rejected() {
        let message = validation_message(validate_backend(
            &spec("web", vec![dynamic_spec(None, "", None)]),
            "default",
        ));
        assert!(message.contains("serviceRef.name"));
    }

    #[test]
    fn test_missing_service_ref_is_rejected() {
        let server = ServerSpec {
            value_from: Some(ServerValueFrom { service_ref: None }),
            ..Default::default()
        };
        let message = validation_message(validate_backend(&spec("web", vec![server]), "default"));
        assert!(message.contains("serviceRef must be set"));
    }

    #[test]
    fn test_port_out_of_range_is_rejected() {
        let mut server = static_spec("s1", "10.0.0.1");
        server.port = Some(70_000);
        let message = validation_message(validate_backend(&spec("web", vec![server]), "default"));
        assert!(message.contains("70000"));

        let mut zero = static_spec("s1", "10.0.0.1");
        zero.port = Some(0);
        assert!(validate_backend(&spec("web", vec![zero]), "default").is_err());
    }

    #[test]
    fn test_duplicate_static_names_are_rejected() {
        let message = validation_message(validate_backend(
            &spec(
                "web",
                vec![static_spec("s1", "10.0.0.1"), static_spec("s1", "10.0.0.2")],
            ),
            "default",
        ));
        assert!(message.starts_with("server[1]: duplicate"));
    }

    #[test]
    fn test_validation_error_needs_intervention() {
        let err = validate_backend(&spec("", vec![]), "default").unwrap_err();
        assert!(err.needs_intervention());
        assert_eq!(err.status_reason(), "ValidationError");
    }
}
