//! Shared helpers for configuration integration tests.

use std::env;
use std::sync::{Mutex, MutexGuard, OnceLock, PoisonError};

use camino::Utf8PathBuf;
use cap_std::{ambient_authority, fs_utf8::Dir};
use uuid::Uuid;

static ENV_MUTEX: OnceLock<Mutex<()>> = OnceLock::new();

/// Scoped environment overrides, restored on drop.
///
/// Holding the guard serializes environment access across tests in the same
/// binary.
pub struct EnvVarGuard {
    previous: Vec<(String, Option<String>)>,
    _lock: MutexGuard<'static, ()>,
}

impl EnvVarGuard {
    /// Applies `changes`; `None` removes the variable.
    pub fn apply(changes: &[(&str, Option<&str>)]) -> Self {
        let lock = ENV_MUTEX
            .get_or_init(|| Mutex::new(()))
            .lock()
            .unwrap_or_else(PoisonError::into_inner);

        let previous = changes
            .iter()
            .map(|(key, value)| {
                let saved = env::var(key).ok();
                set_or_remove(key, *value);
                ((*key).to_owned(), saved)
            })
            .collect();

        Self {
            previous,
            _lock: lock,
        }
    }
}

impl Drop for EnvVarGuard {
    fn drop(&mut self) {
        for (key, value) in self.previous.drain(..) {
            set_or_remove(&key, value.as_deref());
        }
    }
}

fn set_or_remove(key: &str, value: Option<&str>) {
    // SAFETY: ENV_MUTEX serializes environment mutations in tests.
    unsafe {
        match value {
            Some(new_value) => env::set_var(key, new_value),
            None => env::remove_var(key),
        }
    }
}

/// Config file written to the system temp directory and removed on drop.
pub struct TempConfigFile {
    dir: Dir,
    file_name: String,
    path: Utf8PathBuf,
}

impl TempConfigFile {
    /// Writes `contents` to a uniquely named file.
    pub fn write(contents: &str) -> Self {
        let temp_dir =
            Utf8PathBuf::from_path_buf(env::temp_dir()).expect("temp dir should be UTF-8");
        let dir = Dir::open_ambient_dir(&temp_dir, ambient_authority())
            .expect("temp dir should open");
        let file_name = format!("switchboard-{}.json", Uuid::new_v4());
        dir.write(&file_name, contents)
            .expect("config file should be written");
        let path = temp_dir.join(&file_name);

        Self {
            dir,
            file_name,
            path,
        }
    }

    /// Returns the absolute path of the file.
    pub fn path(&self) -> &camino::Utf8Path {
        &self.path
    }
}

impl Drop for TempConfigFile {
    fn drop(&mut self) {
        drop(self.dir.remove_file(&self.file_name));
    }
}
