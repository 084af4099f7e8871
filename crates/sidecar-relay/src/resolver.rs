use sidecar_relay_core::SupervisorError;
use std::path::{Path, PathBuf};

/// Maps a logical program identifier to the executable that gets spawned
pub trait ProgramResolver: Send + Sync {
    fn resolve(&self, program: &str) -> Result<PathBuf, SupervisorError>;
}

/// Resolves executables shipped next to the application binary.
///
/// Relative identifiers such as `./bin/horsed` are looked up under the base
/// directory, first as given and then with `-<platform suffix>` appended when
/// a suffix is configured. The first candidate that exists wins. When none
/// does, the plain candidate is returned and spawning reports it missing.
#[derive(Debug, Clone)]
pub struct BundledResolver {
    base_dir: PathBuf,
    platform_suffix: Option<String>,
}

impl BundledResolver {
    pub fn new(base_dir: impl Into<PathBuf>) -> Self {
        Self {
            base_dir: base_dir.into(),
            platform_suffix: None,
        }
    }

    /// Resolver rooted at the directory holding the running executable
    pub fn from_current_exe() -> Result<Self, SupervisorError> {
        let exe = std::env::current_exe()
            .map_err(|e| SupervisorError::Resolve(format!("current executable unknown: {e}")))?;
        let base_dir = exe.parent().map(Path::to_path_buf).ok_or_else(|| {
            SupervisorError::Resolve(format!("{} has no parent directory", exe.display()))
        })?;
        Ok(Self::new(base_dir))
    }

    /// Also try `<program>-<suffix>`, e.g. a target triple
    pub fn with_platform_suffix(mut self, suffix: impl Into<String>) -> Self {
        self.platform_suffix = Some(suffix.into());
        self
    }

    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    /// Paths tried for `program`, in order
    pub fn candidates(&self, program: &str) -> Vec<PathBuf> {
        let mut names = vec![program.to_string()];
        if let Some(suffix) = &self.platform_suffix {
            names.push(format!("{program}-{suffix}"));
        }

        names
            .into_iter()
            .map(|name| self.base_dir.join(with_exe_extension(name)))
            .collect()
    }
}

impl ProgramResolver for BundledResolver {
    fn resolve(&self, program: &str) -> Result<PathBuf, SupervisorError> {
        if program.trim().is_empty() {
            return Err(SupervisorError::Resolve("empty program identifier".to_string()));
        }

        let candidates = self.candidates(program);
        let found = candidates.iter().find(|path| path.is_file()).cloned();
        Ok(found.unwrap_or_else(|| candidates[0].clone()))
    }
}

/// Leaves the identifier untouched so the OS searches `PATH`
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemResolver;

impl ProgramResolver for SystemResolver {
    fn resolve(&self, program: &str) -> Result<PathBuf, SupervisorError> {
        if program.trim().is_empty() {
            return Err(SupervisorError::Resolve("empty program identifier".to_string()));
        }
        Ok(PathBuf::from(program))
    }
}

fn with_exe_extension(name: String) -> String {
    if cfg!(windows) && !name.ends_with(".exe") {
        format!("{name}.exe")
    } else {
        name
    }
}
