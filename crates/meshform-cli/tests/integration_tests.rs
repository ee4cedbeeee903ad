//! Integration tests for the offline CLI commands

use std::process::Command;

/// Helper to run meshform command
fn meshform(args: &[&str]) -> std::process::Output {
    Command::new(env!("CARGO_BIN_EXE_meshform"))
        .args(args)
        // Keep a developer's own config out of the tests
        .env("MESHFORM_CONFIG", fixture("provider-config.yaml"))
        .env_remove("RUST_LOG")
        .output()
        .expect("Failed to execute meshform")
}

/// Get the fixtures path
fn fixtures_path() -> &'static str {
    concat!(env!("CARGO_MANIFEST_DIR"), "/../../fixtures")
}

fn fixture(name: &str) -> String {
    format!("{}/{}", fixtures_path(), name)
}

mod kinds_command {
    use super::*;

    #[test]
    fn test_lists_every_kind() {
        let output = meshform(&["kinds"]);
        assert!(output.status.success());

        let stdout = String::from_utf8_lossy(&output.stdout);
        assert!(stdout.contains("kuma.io/v1alpha1"));
        assert!(stdout.contains("MeshTimeout"));
        assert!(stdout.contains("kuma_io_mesh_http_route_v1alpha1"));
    }

    #[test]
    fn test_json_output() {
        let output = meshform(&["kinds", "--json"]);
        assert!(output.status.success());

        let json: serde_json::Value =
            serde_json::from_slice(&output.stdout).expect("Output should be valid JSON");
        let kinds = json.as_array().unwrap();
        assert_eq!(kinds.len(), 13);
        assert!(kinds.iter().any(|k| {
            k["kind"] == "MeshTCPRoute"
                && k["manifestDataSource"] == "kuma_io_mesh_tcp_route_v1alpha1_manifest"
        }));
    }
}

mod schema_command {
    use super::*;

    #[test]
    fn test_spec_schema() {
        let output = meshform(&["schema", "MeshTimeout"]);
        assert!(output.status.success());

        let schema: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
        assert!(schema["properties"]["targetRef"].is_object());
    }

    #[test]
    fn test_crd_by_plural() {
        let output = meshform(&["schema", "meshretries", "--crd"]);
        assert!(output.status.success());

        let stdout = String::from_utf8_lossy(&output.stdout);
        assert!(stdout.contains("kind: CustomResourceDefinition"));
        assert!(stdout.contains("name: meshretries.kuma.io"));
    }

    #[test]
    fn test_unknown_kind_is_usage_error() {
        let output = meshform(&["schema", "MeshGateway"]);
        assert_eq!(output.status.code(), Some(64));

        let stderr = String::from_utf8_lossy(&output.stderr);
        assert!(stderr.contains("Unknown kind"));
    }
}

mod validate_command {
    use super::*;

    #[test]
    fn test_validate_valid_file() {
        let output = meshform(&["validate", "-f", &fixture("policies.yaml")]);

        assert!(output.status.success(), "Expected success for valid policies");
        let stdout = String::from_utf8_lossy(&output.stdout);
        assert!(stdout.contains("Validation passed"));
        assert!(stdout.contains("3 document(s)"));
    }

    #[test]
    fn test_validate_invalid_file() {
        let output = meshform(&["validate", "-f", &fixture("invalid.yaml")]);

        assert_eq!(output.status.code(), Some(2));
        let stdout = String::from_utf8_lossy(&output.stdout);
        assert!(stdout.contains("MeshTrafficPermission kuma-system/deny-maybe"));
        assert!(stdout.contains("spec/from/0/default/action"));
        assert!(stdout.contains("metadata.name"));
    }

    #[test]
    fn test_validate_json_output() {
        let output = meshform(&[
            "validate",
            "-f",
            &fixture("policies.yaml"),
            "-f",
            &fixture("invalid.yaml"),
            "--json",
        ]);

        assert_eq!(output.status.code(), Some(2));
        let json: serde_json::Value =
            serde_json::from_slice(&output.stdout).expect("Output should be valid JSON");
        assert_eq!(json["valid"], false);
        assert_eq!(json["validatedCount"], 5);
        assert!(json["errors"].as_u64().unwrap() >= 2);
        assert_eq!(json["warnings"], 0);
    }

    #[test]
    fn test_validate_missing_file() {
        let output = meshform(&["validate", "-f", &fixture("does-not-exist.yaml")]);
        assert_eq!(output.status.code(), Some(5));
    }
}

mod manifest_command {
    use super::*;

    #[test]
    fn test_render_with_spec_and_labels() {
        let output = meshform(&[
            "manifest",
            "MeshTimeout",
            "timeout-global",
            "-n",
            "kuma-system",
            "--spec",
            &fixture("timeout-spec.yaml"),
            "-l",
            "kuma.io/mesh=default",
        ]);
        assert!(output.status.success());

        let stdout = String::from_utf8_lossy(&output.stdout);
        assert!(stdout.starts_with("apiVersion: kuma.io/v1alpha1\nkind: MeshTimeout\n"));
        assert!(stdout.contains("namespace: kuma-system"));
        assert!(stdout.contains("kuma.io/mesh: default"));
        assert!(stdout.contains("idleTimeout: 1h"));
    }

    #[test]
    fn test_render_without_spec() {
        let output = meshform(&["manifest", "MeshTrace", "trace"]);
        assert!(output.status.success());

        let stdout = String::from_utf8_lossy(&output.stdout);
        assert!(stdout.contains("namespace: default"));
        assert!(stdout.contains("spec: {}"));
    }

    #[test]
    fn test_invalid_name_rejected() {
        let output = meshform(&["manifest", "MeshTrace", "Bad_Name"]);
        assert_eq!(output.status.code(), Some(2));

        let stderr = String::from_utf8_lossy(&output.stderr);
        assert!(stderr.contains("metadata.name"));
    }

    #[test]
    fn test_malformed_label() {
        let output = meshform(&["manifest", "MeshTrace", "trace", "-l", "no-equals"]);
        assert_eq!(output.status.code(), Some(64));
    }
}

mod cluster_commands {
    use super::*;

    #[test]
    fn test_bad_import_id_fails_before_connecting() {
        let output = meshform(&["import", "MeshTimeout", "just-a-name"]);
        assert_eq!(output.status.code(), Some(64));

        let stderr = String::from_utf8_lossy(&output.stderr);
        assert!(stderr.contains("namespace/name"));
    }

    #[test]
    fn test_missing_kubeconfig_is_config_error() {
        let output = meshform(&[
            "get",
            "MeshTimeout",
            "timeout-global",
            "--kubeconfig",
            &fixture("does-not-exist.kubeconfig"),
        ]);
        assert_eq!(output.status.code(), Some(4));
    }
}
