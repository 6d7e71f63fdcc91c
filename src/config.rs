//! Credential resolution.
//!
//! Credentials come from explicit arguments, from `DIMENSIONS_*` environment
//! variables, or from a named instance in the credentials file
//! (`~/.dimensions/dsl.ini`):
//!
//! ```ini
//! [instance.live]
//! url=https://app.dimensions.ai
//! login=your_username
//! password=your_password
//! ```
//!
//! Section names start with `instance.`; `live` is the default instance.

use crate::error::{DslError, Result};
use ini::{EscapePolicy, Ini, ParseOption, WriteOption};
use std::fmt;
use std::path::{Path, PathBuf};

/// Default API endpoint.
pub const DEFAULT_ENDPOINT: &str = "https://app.dimensions.ai";

/// Instance name used when none is given.
pub const DEFAULT_INSTANCE: &str = "live";

const SECTION_PREFIX: &str = "instance.";

/// Endpoint and login details for one Dimensions instance.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    /// Base URL, without trailing slash.
    pub endpoint: String,
    pub username: String,
    pub password: String,
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("endpoint", &self.endpoint)
            .field("username", &self.username)
            .field("password", &"****")
            .finish()
    }
}

impl Credentials {
    /// Build credentials from explicit values, validating the endpoint URL.
    pub fn new(
        endpoint: impl Into<String>,
        username: impl Into<String>,
        password: impl Into<String>,
    ) -> Result<Self> {
        let endpoint = normalize_endpoint(&endpoint.into())?;
        let username = username.into();
        let password = password.into();

        if username.trim().is_empty() {
            return Err(DslError::Config("username cannot be empty".to_string()));
        }
        if password.is_empty() {
            return Err(DslError::Config("password cannot be empty".to_string()));
        }

        Ok(Self {
            endpoint,
            username,
            password,
        })
    }

    /// Read `DIMENSIONS_USERNAME` and `DIMENSIONS_PASSWORD` (and optionally
    /// `DIMENSIONS_ENDPOINT`) from the environment.
    pub fn from_env() -> Result<Self> {
        let username = env_var("DIMENSIONS_USERNAME")?;
        let password = env_var("DIMENSIONS_PASSWORD")?;
        let endpoint =
            std::env::var("DIMENSIONS_ENDPOINT").unwrap_or_else(|_| DEFAULT_ENDPOINT.to_string());
        Self::new(endpoint, username, password)
    }

    /// Load a named instance from the default credentials file.
    pub fn from_profile(instance: &str) -> Result<Self> {
        Self::from_file(&default_config_path()?, instance)
    }

    /// Load a named instance from a specific credentials file.
    pub fn from_file(path: &Path, instance: &str) -> Result<Self> {
        if !path.is_file() {
            return Err(DslError::Config(format!(
                "Credentials file not found at: {}",
                path.display()
            )));
        }

        let ini = Ini::load_from_file_opt(path, parse_options())?;

        let section = format!("{}{}", SECTION_PREFIX, instance);
        let props = ini.section(Some(section.as_str())).ok_or_else(|| {
            DslError::Config(format!(
                "Credentials file {} does not contain settings for instance: {}",
                path.display(),
                instance
            ))
        })?;

        let field = |key: &str| -> Result<&str> {
            props.get(key).ok_or_else(|| {
                DslError::Config(format!("[{}] is missing the `{}` key", section, key))
            })
        };

        tracing::debug!(instance, path = %path.display(), "loaded credentials profile");
        Self::new(field("url")?, field("login")?, field("password")?)
    }
}

/// Path of the credentials file: `~/.dimensions/dsl.ini`.
pub fn default_config_path() -> Result<PathBuf> {
    dirs::home_dir()
        .map(|home| home.join(".dimensions").join("dsl.ini"))
        .ok_or_else(|| DslError::Config("Cannot determine home directory".to_string()))
}

/// Write (or replace) an `[instance.<name>]` section in the credentials file,
/// leaving other sections untouched.
pub fn write_profile(path: &Path, instance: &str, credentials: &Credentials) -> Result<()> {
    let mut ini = if path.is_file() {
        Ini::load_from_file_opt(path, parse_options())?
    } else {
        Ini::new()
    };

    let section = format!("{}{}", SECTION_PREFIX, instance);
    ini.delete(Some(section.as_str()));
    ini.with_section(Some(section))
        .set("url", credentials.endpoint.as_str())
        .set("login", credentials.username.as_str())
        .set("password", credentials.password.as_str());

    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    ini.write_to_file_opt(
        path,
        WriteOption {
            escape_policy: EscapePolicy::Nothing,
            ..WriteOption::default()
        },
    )?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o600))?;
    }

    tracing::info!(instance, path = %path.display(), "wrote credentials profile");
    Ok(())
}

/// Values are taken verbatim: no quote stripping, no backslash escapes.
fn parse_options() -> ParseOption {
    ParseOption {
        enabled_quote: false,
        enabled_escape: false,
    }
}

fn env_var(name: &str) -> Result<String> {
    match std::env::var(name) {
        Ok(v) if !v.is_empty() => Ok(v),
        _ => Err(DslError::Config(format!("{} is not set", name))),
    }
}

fn normalize_endpoint(raw: &str) -> Result<String> {
    let parsed = url::Url::parse(raw.trim())
        .map_err(|e| DslError::Config(format!("Invalid endpoint URL '{}': {}", raw, e)))?;
    if !matches!(parsed.scheme(), "http" | "https") {
        return Err(DslError::Config(format!(
            "Endpoint must be an http(s) URL, got '{}'",
            raw
        )));
    }
    Ok(parsed.as_str().trim_end_matches('/').to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn ini_file(contents: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::Builder::new().suffix(".ini").tempfile().unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file
    }

    #[test]
    fn test_new_strips_trailing_slash() {
        let creds = Credentials::new("https://app.dimensions.ai/", "me", "secret").unwrap();
        assert_eq!(creds.endpoint, "https://app.dimensions.ai");
    }

    #[test]
    fn test_new_rejects_bad_endpoint() {
        assert!(matches!(
            Credentials::new("not a url", "me", "secret"),
            Err(DslError::Config(_))
        ));
        assert!(matches!(
            Credentials::new("ftp://example.org", "me", "secret"),
            Err(DslError::Config(_))
        ));
    }

    #[test]
    fn test_new_rejects_empty_username() {
        assert!(matches!(
            Credentials::new(DEFAULT_ENDPOINT, "  ", "secret"),
            Err(DslError::Config(_))
        ));
    }

    #[test]
    fn test_debug_masks_password() {
        let creds = Credentials::new(DEFAULT_ENDPOINT, "me", "hunter2").unwrap();
        let shown = format!("{:?}", creds);
        assert!(!shown.contains("hunter2"));
        assert!(shown.contains("me"));
    }

    #[test]
    fn test_from_file_reads_instance() {
        let file = ini_file(
            "[instance.live]\nurl=https://app.dimensions.ai\nlogin=alice\npassword=pw1\n\n\
             [instance.test]\nurl=https://test.example.org/\nlogin=bob\npassword=pw2\n",
        );

        let live = Credentials::from_file(file.path(), "live").unwrap();
        assert_eq!(live.username, "alice");
        assert_eq!(live.endpoint, "https://app.dimensions.ai");

        let test = Credentials::from_file(file.path(), "test").unwrap();
        assert_eq!(test.username, "bob");
        assert_eq!(test.password, "pw2");
        assert_eq!(test.endpoint, "https://test.example.org");
    }

    #[test]
    fn test_from_file_missing_instance() {
        let file = ini_file("[instance.live]\nurl=https://app.dimensions.ai\nlogin=a\npassword=b\n");
        let err = Credentials::from_file(file.path(), "staging").unwrap_err();
        match err {
            DslError::Config(msg) => assert!(msg.contains("staging")),
            other => panic!("expected config error, got {:?}", other),
        }
    }

    #[test]
    fn test_from_file_missing_key() {
        let file = ini_file("[instance.live]\nurl=https://app.dimensions.ai\nlogin=a\n");
        let err = Credentials::from_file(file.path(), "live").unwrap_err();
        match err {
            DslError::Config(msg) => assert!(msg.contains("password")),
            other => panic!("expected config error, got {:?}", other),
        }
    }

    #[test]
    fn test_from_file_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("dsl.ini");
        assert!(matches!(
            Credentials::from_file(&path, "live"),
            Err(DslError::Config(_))
        ));
    }

    #[test]
    fn test_write_profile_replaces_section() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("dsl.ini");

        let first = Credentials::new(DEFAULT_ENDPOINT, "alice", "pw1").unwrap();
        let other = Credentials::new("https://test.example.org", "bob", "pw2").unwrap();
        let updated = Credentials::new(DEFAULT_ENDPOINT, "alice", "pw3").unwrap();

        write_profile(&path, "live", &first).unwrap();
        write_profile(&path, "test", &other).unwrap();
        write_profile(&path, "live", &updated).unwrap();

        let text = std::fs::read_to_string(&path).unwrap();
        assert_eq!(text.matches("[instance.live]").count(), 1);
        assert!(!text.contains("pw1"));

        assert_eq!(Credentials::from_file(&path, "live").unwrap(), updated);
        assert_eq!(Credentials::from_file(&path, "test").unwrap(), other);
    }

    #[test]
    fn test_passwords_with_special_characters_survive_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("dsl.ini");

        for password in [r#"p\ss"w;rd#1"#, r"a\tb", "'quoted'", "x=y:z"] {
            let creds = Credentials::new(DEFAULT_ENDPOINT, "alice", password).unwrap();
            write_profile(&path, "live", &creds).unwrap();
            let loaded = Credentials::from_file(&path, "live").unwrap();
            assert_eq!(loaded.password, password);
        }
    }

    #[test]
    fn test_from_file_reads_hand_written_values_verbatim() {
        let file = ini_file(
            "; comment line\n[instance.live]\nurl=https://app.dimensions.ai\nlogin=alice\npassword=C:\\pw#1;x\n",
        );
        let creds = Credentials::from_file(file.path(), "live").unwrap();
        assert_eq!(creds.password, r"C:\pw#1;x");
    }
}
