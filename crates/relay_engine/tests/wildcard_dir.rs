use std::fs;

use pretty_assertions::assert_eq;
use relay_engine::{load_wildcard_dir, WildcardError};
use tempfile::TempDir;

#[test]
fn loads_txt_files_keyed_by_stem() {
    let dir = TempDir::new().unwrap();
    fs::write(dir.path().join("style.txt"), "  anime \n\nrealistic\n").unwrap();
    fs::write(dir.path().join("TYPE.txt"), "knight\nwizard").unwrap();
    fs::write(dir.path().join("notes.md"), "ignored").unwrap();

    let wildcards = load_wildcard_dir(dir.path()).unwrap();

    assert_eq!(wildcards.len(), 2);
    assert_eq!(
        wildcards.options("STYLE"),
        Some(&["anime".to_string(), "realistic".to_string()][..])
    );
    assert_eq!(
        wildcards.options("type"),
        Some(&["knight".to_string(), "wizard".to_string()][..])
    );
    assert_eq!(wildcards.options("notes"), None);
}

#[test]
fn missing_directory_yields_empty_set() {
    let dir = TempDir::new().unwrap();
    let wildcards = load_wildcard_dir(&dir.path().join("nope")).unwrap();
    assert!(wildcards.is_empty());
}

#[test]
fn file_in_place_of_directory_is_an_error() {
    let dir = TempDir::new().unwrap();
    let file = dir.path().join("wildcards");
    fs::write(&file, "not a dir").unwrap();

    let err = load_wildcard_dir(&file).unwrap_err();
    assert!(matches!(err, WildcardError::NotADirectory(path) if path == file));
}
