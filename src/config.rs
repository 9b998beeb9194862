use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::error::{Error, Result};
use crate::simulation::kernels::InitLayout;
use crate::simulation::types::particle_buffer_size;

pub(crate) const MIN_PARTICLES: u32 = 250;
pub(crate) const MAX_PARTICLES: u32 = 5_000_000;

pub(crate) const WINDOW_WIDTH: u32 = 1400;
pub(crate) const WINDOW_HEIGHT: u32 = 1400;

pub(crate) const KERNEL_SOURCE: &str = "kernel.wgsl";
pub(crate) const VERTEX_SOURCE: &str = "particle.vs.wgsl";
pub(crate) const FRAGMENT_SOURCE: &str = "particle.fs.wgsl";

const SHADER_DIR_VAR: &str = "PARTICLE_SHADER_DIR";
const ADAPTER_VAR: &str = "PARTICLE_ADAPTER";

pub(crate) const USAGE: &str = "Usage: particle-system <number of particles> [-s]\n\
    \t\t250 <= number of particles <= 5000000\n\
    \t\t-s  start from a circle instead of a cube";

#[derive(Debug, Error, PartialEq, Eq)]
pub(crate) enum ArgsError {
    #[error("missing particle count")]
    MissingCount,

    #[error("particle count `{0}` is not a number")]
    NotANumber(String),

    #[error("particle count {0} is outside {MIN_PARTICLES}..={MAX_PARTICLES}")]
    OutOfRange(u64),

    #[error("unexpected argument `{0}`")]
    Unexpected(String),
}

/// Startup configuration: what the command line asked for plus the
/// environment overrides for where shaders live and which GPU to use.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Config {
    pub(crate) particle_count: u32,
    pub(crate) layout: InitLayout,
    pub(crate) shader_dir: PathBuf,
    pub(crate) adapter_filter: Option<String>,
    pub(crate) window_size: [u32; 2],
}

impl Config {
    /// Parses `<count> [-s]`. The program name must already be stripped.
    pub(crate) fn from_args<I, S>(args: I) -> Result<Self, ArgsError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut args = args.into_iter().map(Into::into);

        let count = args.next().ok_or(ArgsError::MissingCount)?;
        let count: u64 = count
            .trim()
            .parse()
            .map_err(|_| ArgsError::NotANumber(count.clone()))?;
        if !(u64::from(MIN_PARTICLES)..=u64::from(MAX_PARTICLES)).contains(&count) {
            return Err(ArgsError::OutOfRange(count));
        }

        let layout = match args.next().as_deref() {
            None => InitLayout::Cube,
            Some("-s") => InitLayout::Circle,
            Some(other) => return Err(ArgsError::Unexpected(other.to_string())),
        };

        if let Some(extra) = args.next() {
            return Err(ArgsError::Unexpected(extra));
        }

        Ok(Self {
            particle_count: count as u32,
            layout,
            shader_dir: PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("shaders"),
            adapter_filter: None,
            window_size: [WINDOW_WIDTH, WINDOW_HEIGHT],
        })
    }

    /// Applies `PARTICLE_SHADER_DIR` and `PARTICLE_ADAPTER` when set.
    pub(crate) fn with_env(mut self) -> Self {
        if let Some(dir) = std::env::var_os(SHADER_DIR_VAR) {
            self.shader_dir = PathBuf::from(dir);
        }
        if let Ok(filter) = std::env::var(ADAPTER_VAR) {
            if !filter.trim().is_empty() {
                self.adapter_filter = Some(filter.trim().to_string());
            }
        }
        self
    }

    pub(crate) fn buffer_size(&self) -> u64 {
        particle_buffer_size(self.particle_count)
    }

    pub(crate) fn aspect_ratio(&self) -> f32 {
        self.window_size[0] as f32 / self.window_size[1].max(1) as f32
    }

    pub(crate) fn read_shader(&self, file: &str) -> Result<String> {
        read_source(&self.shader_dir.join(file))
    }
}

fn read_source(path: &Path) -> Result<String> {
    std::fs::read_to_string(path).map_err(|source| Error::ShaderSource {
        path: path.to_path_buf(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_count_bounds() {
        for count in [MIN_PARTICLES, 1000, MAX_PARTICLES] {
            let config = Config::from_args([count.to_string()]).unwrap();
            assert_eq!(config.particle_count, count);
            assert_eq!(config.layout, InitLayout::Cube);
            assert_eq!(config.buffer_size(), u64::from(count) * 32);
        }
    }

    #[test]
    fn rejects_counts_outside_bounds() {
        assert_eq!(
            Config::from_args(["249"]),
            Err(ArgsError::OutOfRange(249))
        );
        assert_eq!(
            Config::from_args(["5000001"]),
            Err(ArgsError::OutOfRange(5_000_001))
        );
        assert_eq!(Config::from_args(["0"]), Err(ArgsError::OutOfRange(0)));
    }

    #[test]
    fn rejects_malformed_arguments() {
        assert_eq!(
            Config::from_args(Vec::<String>::new()),
            Err(ArgsError::MissingCount)
        );
        assert_eq!(
            Config::from_args(["lots"]),
            Err(ArgsError::NotANumber("lots".into()))
        );
        assert_eq!(
            Config::from_args(["-300"]),
            Err(ArgsError::NotANumber("-300".into()))
        );
        assert_eq!(
            Config::from_args(["1000", "-x"]),
            Err(ArgsError::Unexpected("-x".into()))
        );
        assert_eq!(
            Config::from_args(["1000", "-s", "extra"]),
            Err(ArgsError::Unexpected("extra".into()))
        );
    }

    #[test]
    fn circle_flag_selects_init2() {
        let config = Config::from_args(["5000", "-s"]).unwrap();
        assert_eq!(config.layout, InitLayout::Circle);
    }

    #[test]
    fn missing_shader_is_reported_with_path() {
        let mut config = Config::from_args(["1000"]).unwrap();
        config.shader_dir = PathBuf::from("/definitely/not/here");
        let err = config.read_shader(KERNEL_SOURCE).unwrap_err();
        assert!(matches!(err, Error::ShaderSource { .. }));
        assert!(err.to_string().contains("kernel.wgsl"));
    }

    #[test]
    fn bundled_shaders_are_readable() {
        let config = Config::from_args(["1000"]).unwrap();
        for file in [KERNEL_SOURCE, VERTEX_SOURCE, FRAGMENT_SOURCE] {
            assert!(!config.read_shader(file).unwrap().is_empty());
        }
    }
}
