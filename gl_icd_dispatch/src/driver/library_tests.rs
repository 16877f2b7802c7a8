/// Tests for LibraryModuleSource path resolution and library loading

use super::*;
use std::fs;

fn scratch_dir(tag: &str) -> PathBuf {
    let dir = std::env::temp_dir().join(format!("gl_icd_dispatch_{}_{}", tag, std::process::id()));
    fs::create_dir_all(&dir).unwrap();
    dir
}

// ============================================================================
// Tests: Path resolution
// ============================================================================

#[test]
fn test_resolve_path_keeps_explicit_paths() {
    let source = LibraryModuleSource::default();
    assert_eq!(source.resolve_path("drivers/soft_icd"), PathBuf::from("drivers/soft_icd"));
    assert_eq!(source.resolve_path("soft_icd.so"), PathBuf::from("soft_icd.so"));
}

#[test]
fn test_resolve_path_falls_back_to_system_search() {
    let source = LibraryModuleSource::default();
    let expected = PathBuf::from(libloading::library_filename("soft_icd"));
    assert_eq!(source.resolve_path("soft_icd"), expected);
}

#[test]
fn test_resolve_path_uses_first_matching_search_dir() {
    let empty = scratch_dir("search_empty");
    let populated = scratch_dir("search_populated");
    let file_name = libloading::library_filename("fake_icd");
    fs::write(populated.join(&file_name), b"not a library").unwrap();

    let source = LibraryModuleSource::new(vec![empty.clone(), populated.clone()]);
    assert_eq!(source.resolve_path("fake_icd"), populated.join(&file_name));

    fs::remove_dir_all(&empty).unwrap();
    fs::remove_dir_all(&populated).unwrap();
}

// ============================================================================
// Tests: Loading
// ============================================================================

#[test]
fn test_load_missing_library_is_driver_load_error() {
    let source = LibraryModuleSource::default();
    let result = source.load("gl_icd_dispatch_no_such_driver");
    assert!(matches!(result, Err(Error::DriverLoadError(_))));
}

#[test]
fn test_load_invalid_library_file_is_driver_load_error() {
    let dir = scratch_dir("invalid_lib");
    let file_name = libloading::library_filename("broken_icd");
    fs::write(dir.join(&file_name), b"garbage").unwrap();

    let source = LibraryModuleSource::new(vec![dir.clone()]);
    let result = source.load("broken_icd");
    assert!(matches!(result, Err(Error::DriverLoadError(_))));

    fs::remove_dir_all(&dir).unwrap();
}

#[cfg(all(target_os = "linux", target_env = "gnu"))]
#[test]
fn test_load_library_without_entry_points_is_incomplete() {
    let source = LibraryModuleSource::default();
    match source.load("libc.so.6") {
        Err(Error::DriverLoadError(msg)) => {
            assert!(msg.contains("incomplete operation table"));
            assert!(msg.contains("DrvCreateContext"));
        }
        Err(other) => panic!("unexpected error: {}", other),
        Ok(_) => panic!("libc must not load as a driver"),
    }
}

#[test]
fn test_entry_point_list_is_complete() {
    assert_eq!(DRIVER_ENTRY_POINTS.len(), 8);
    assert!(DRIVER_ENTRY_POINTS.iter().all(|name| name.starts_with("Drv")));
}
