//! # File I/O Module
//!
//! Reads and writes the JSON files used around a calculation:
//! - **Protocol settings**: saved atomically (write to .tmp, sync, rename)
//!   and version-checked on load
//! - **Patient inputs**: read from a file or any reader (stdin for the CLI)
//!
//! The calculation itself never touches the filesystem.
//!
//! ## Example
//!
//! ```rust,no_run
//! use dka_core::file_io::{load_settings, save_settings};
//! use dka_core::settings::ProtocolSettings;
//! use std::path::Path;
//!
//! let path = Path::new("protocol.json");
//! save_settings(&ProtocolSettings::default(), path)?;
//! let settings = load_settings(path)?;
//! # Ok::<(), dka_core::errors::CalcError>(())
//! ```

use std::fs::{self, File};
use std::io::{self, Read, Write};
use std::path::Path;

use semver::Version;
use serde::Serialize;
use tracing::debug;

use crate::calculations::dka::PatientInputs;
use crate::errors::{CalcError, CalcResult};
use crate::settings::{ProtocolSettings, SCHEMA_VERSION};

fn io_error<'a>(operation: &'a str, path: &'a Path) -> impl FnOnce(io::Error) -> CalcError + 'a {
    move |e| CalcError::file_error(operation, path.display().to_string(), e.to_string())
}

/// Serialize a value as pretty JSON and write it with atomic semantics.
///
/// The save process:
/// 1. Serialize to JSON
/// 2. Write to a temporary file (`<path>.tmp`)
/// 3. Sync to disk (fsync)
/// 4. Rename over the target
pub fn write_json_atomic<T: Serialize>(value: &T, path: &Path) -> CalcResult<()> {
    let json = serde_json::to_string_pretty(value)?;

    let mut tmp_path = path.as_os_str().to_owned();
    tmp_path.push(".tmp");
    let tmp_path = Path::new(&tmp_path);

    let mut tmp_file = File::create(tmp_path).map_err(io_error("create temp file", tmp_path))?;
    tmp_file
        .write_all(json.as_bytes())
        .map_err(io_error("write temp file", tmp_path))?;
    tmp_file.sync_all().map_err(io_error("sync temp file", tmp_path))?;

    fs::rename(tmp_path, path).map_err(|e| {
        let _ = fs::remove_file(tmp_path);
        CalcError::file_error("rename to final", path.display().to_string(), e.to_string())
    })?;

    debug!(path = %path.display(), bytes = json.len(), "file saved");
    Ok(())
}

fn read_to_string(path: &Path) -> CalcResult<String> {
    let mut file = File::open(path).map_err(io_error("open", path))?;
    let mut contents = String::new();
    file.read_to_string(&mut contents).map_err(io_error("read", path))?;
    Ok(contents)
}

/// Save protocol settings.
pub fn save_settings(settings: &ProtocolSettings, path: &Path) -> CalcResult<()> {
    write_json_atomic(settings, path)
}

/// Load protocol settings.
///
/// # Returns
///
/// * `Ok(ProtocolSettings)` - Loaded settings; policies may still be unset
/// * `Err(CalcError::VersionMismatch)` - File version is incompatible
/// * `Err(CalcError::SerializationError)` - Invalid JSON
/// * `Err(CalcError::FileError)` - I/O error
pub fn load_settings(path: &Path) -> CalcResult<ProtocolSettings> {
    let contents = read_to_string(path)?;
    let settings: ProtocolSettings =
        serde_json::from_str(&contents).map_err(|e| CalcError::SerializationError {
            reason: format!("Invalid JSON in {}: {}", path.display(), e),
        })?;
    validate_version(&settings.version)?;
    Ok(settings)
}

/// Load patient inputs from a JSON file.
pub fn load_patient_inputs(path: &Path) -> CalcResult<PatientInputs> {
    let contents = read_to_string(path)?;
    serde_json::from_str(&contents).map_err(|e| CalcError::SerializationError {
        reason: format!("Invalid JSON in {}: {}", path.display(), e),
    })
}

/// Read patient inputs as JSON from any reader.
pub fn read_patient_inputs<R: Read>(mut reader: R) -> CalcResult<PatientInputs> {
    let mut contents = String::new();
    reader
        .read_to_string(&mut contents)
        .map_err(|e| CalcError::file_error("read", "<stdin>", e.to_string()))?;
    Ok(serde_json::from_str(&contents)?)
}

/// Validate that a file version is compatible with the current schema.
///
/// Major versions must match. While the schema is 0.x, a file with a newer
/// minor version is also rejected.
pub fn validate_version(file_version: &str) -> CalcResult<()> {
    let mismatch = || CalcError::VersionMismatch {
        file_version: file_version.to_string(),
        expected_version: SCHEMA_VERSION.to_string(),
    };

    let file = Version::parse(file_version).map_err(|_| mismatch())?;
    let current = Version::parse(SCHEMA_VERSION).map_err(|_| mismatch())?;

    if file.major != current.major {
        return Err(mismatch());
    }
    if current.major == 0 && file.minor > current.minor {
        return Err(mismatch());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::calculations::deficit::DeficitPolicy;
    use std::env::temp_dir;
    use std::path::PathBuf;

    fn temp_path(name: &str) -> PathBuf {
        temp_dir().join(format!("dka_test_{}_{}.json", name, std::process::id()))
    }

    #[test]
    fn test_save_and_load_roundtrip() {
        let path = temp_path("settings_roundtrip");
        let settings = ProtocolSettings::default().with_deficit_policy(DeficitPolicy::TwoTier);
        save_settings(&settings, &path).unwrap();

        let loaded = load_settings(&path).unwrap();
        assert_eq!(loaded, settings);

        let _ = fs::remove_file(&path);
    }

    #[test]
    fn test_atomic_save_creates_no_tmp_file() {
        let path = temp_path("atomic");
        let tmp_path = PathBuf::from(format!("{}.tmp", path.display()));

        save_settings(&ProtocolSettings::default(), &path).unwrap();

        assert!(!tmp_path.exists());
        assert!(path.exists());

        let _ = fs::remove_file(&path);
    }

    #[test]
    fn test_unresolved_settings_load_but_do_not_resolve() {
        let path = temp_path("unresolved");
        fs::write(&path, r#"{ "version": "0.1.0", "validation": "Permissive" }"#).unwrap();

        let loaded = load_settings(&path).unwrap();
        assert_eq!(loaded.bolus_subtraction, None);
        assert_eq!(loaded.resolve().unwrap_err().error_code(), "CONFIGURATION_AMBIGUITY");

        let _ = fs::remove_file(&path);
    }

    #[test]
    fn test_version_validation() {
        assert!(validate_version("0.1.0").is_ok());
        assert!(validate_version("0.0.9").is_ok());
        assert!(validate_version("0.1.7").is_ok());
        assert!(validate_version("0.2.0").is_err());
        assert!(validate_version("1.0.0").is_err());
        assert!(validate_version("invalid").is_err());
    }

    #[test]
    fn test_load_rejects_newer_schema() {
        let path = temp_path("newer");
        fs::write(&path, r#"{ "version": "0.9.0" }"#).unwrap();
        assert_eq!(load_settings(&path).unwrap_err().error_code(), "VERSION_MISMATCH");
        let _ = fs::remove_file(&path);
    }

    #[test]
    fn test_missing_file() {
        let err = load_settings(Path::new("/nonexistent/protocol.json")).unwrap_err();
        assert_eq!(err.error_code(), "FILE_ERROR");
    }

    #[test]
    fn test_read_patient_inputs() {
        let json = r#"{ "age": { "years": 7 }, "ph": 6.86, "weight_kg": 23, "shocked": true }"#;
        let inputs = read_patient_inputs(json.as_bytes()).unwrap();
        assert_eq!(inputs.weight_kg, Some(23.0));
        assert!(inputs.shocked);

        let err = read_patient_inputs("{ not json".as_bytes()).unwrap_err();
        assert_eq!(err.error_code(), "SERIALIZATION_ERROR");
    }
}
