//! Tests for the definition loader.

use std::fs;

use tempfile::TempDir;

use super::*;

const VALID_DEFINITION_YAML: &str = r#"
apiVersion: v1
kind: AggregationCount
metadata:
  id: failed-logins
  name: Failed logins
config:
  stream: auth
  search_query: "action:login_failed"
  grouping_fields: [user]
  threshold_type: MORE
  threshold: 5
  search_within_ms: 300000
  execute_every_ms: 60000
"#;

fn temp_loader() -> (TempDir, DefinitionLoader) {
    let dir = TempDir::new().expect("create tempdir");
    let loader = DefinitionLoader::new(dir.path().to_path_buf());
    (dir, loader)
}

#[test]
fn load_definition_from_file() {
    let (dir, loader) = temp_loader();
    let path = dir.path().join("failed-logins.yml");
    fs::write(&path, VALID_DEFINITION_YAML).unwrap();

    let definition = loader.load_file(&path).unwrap();
    assert_eq!(definition.id(), "failed-logins");
    assert_eq!(definition.title(), "Failed logins");
    assert_eq!(definition.config.stream(), "auth");
    assert_eq!(definition.config.threshold(), 5);
}

#[test]
fn load_all_skips_dotfiles_and_non_yaml() {
    let (dir, loader) = temp_loader();
    fs::write(dir.path().join("a.yml"), VALID_DEFINITION_YAML).unwrap();
    fs::write(dir.path().join(".hidden.yml"), VALID_DEFINITION_YAML).unwrap();
    fs::write(dir.path().join("readme.txt"), "not a definition").unwrap();

    let results = loader.load_all().unwrap();
    let loaded = results.iter().filter(|r| r.status.is_loaded()).count();
    let skipped = results
        .iter()
        .filter(|r| matches!(r.status, LoadStatus::Skipped { .. }))
        .count();

    assert_eq!(loaded, 1);
    assert_eq!(skipped, 2);
    assert!(loader.get("failed-logins").is_some());
}

#[test]
fn load_all_recurses_into_subdirectories() {
    let (dir, loader) = temp_loader();
    let nested = dir.path().join("auth").join("ssh");
    fs::create_dir_all(&nested).unwrap();
    fs::write(nested.join("rule.yaml"), VALID_DEFINITION_YAML).unwrap();

    let results = loader.load_all().unwrap();
    assert_eq!(results.len(), 1);
    assert!(results[0].status.is_loaded());
    assert_eq!(loader.len(), 1);
}

#[test]
fn invalid_files_are_reported_not_fatal() {
    let (dir, loader) = temp_loader();
    fs::write(dir.path().join("good.yml"), VALID_DEFINITION_YAML).unwrap();
    fs::write(
        dir.path().join("bad.yml"),
        VALID_DEFINITION_YAML.replace("threshold_type: MORE", "threshold_type: ABOUT"),
    )
    .unwrap();

    let results = loader.load_all().unwrap();
    let failed: Vec<_> = results
        .iter()
        .filter_map(|r| match &r.status {
            LoadStatus::Failed { error } => Some(error.clone()),
            _ => None,
        })
        .collect();

    assert_eq!(failed.len(), 1);
    assert!(failed[0].contains("ABOUT"), "unexpected error: {}", failed[0]);
    assert_eq!(loader.len(), 1);
}

#[test]
fn disabled_definitions_are_skipped() {
    let (dir, loader) = temp_loader();
    let yaml = VALID_DEFINITION_YAML.replace("name: Failed logins", "name: Failed logins\n  enabled: false");
    fs::write(dir.path().join("off.yml"), yaml).unwrap();

    let results = loader.load_all().unwrap();
    assert!(matches!(
        &results[0].status,
        LoadStatus::Skipped { reason } if reason == "disabled"
    ));
    assert!(loader.is_empty());
}

#[test]
fn missing_directory_loads_nothing() {
    let dir = TempDir::new().unwrap();
    let loader = DefinitionLoader::new(dir.path().join("does-not-exist"));
    assert!(loader.load_all().unwrap().is_empty());
}

#[test]
fn definitions_are_sorted_by_id() {
    let (dir, loader) = temp_loader();
    fs::write(dir.path().join("z.yml"), VALID_DEFINITION_YAML.replace("id: failed-logins", "id: zeta")).unwrap();
    fs::write(dir.path().join("a.yml"), VALID_DEFINITION_YAML.replace("id: failed-logins", "id: alpha")).unwrap();
    loader.load_all().unwrap();

    let ids: Vec<String> = loader.definitions().iter().map(|d| d.id().to_string()).collect();
    assert_eq!(ids, vec!["alpha", "zeta"]);
}
