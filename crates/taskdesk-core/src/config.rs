use std::collections::HashMap;
use std::fs;
use std::path::{
  Path,
  PathBuf
};
use std::time::Duration;

use anyhow::{
  Context,
  anyhow
};
use tracing::{
  debug,
  info,
  trace,
  warn
};

const RC_ENV_VAR: &str = "TASKDESKRC";
const RC_FILE_NAME: &str = ".taskdeskrc";
const MAX_DUE_SOON_DAYS: u64 = 36_500;

const DEFAULTS: &[(&str, &str)] = &[
  ("data.location", "~/.taskdesk"),
  ("storage.namespace", "taskdesk"),
  ("storage.version", "2.0"),
  ("loading.min_ms", "300"),
  ("due_soon.days", "3"),
  ("demo.seed", "on"),
  ("view.mode", "full"),
  ("export.location", "."),
  ("color", "on")
];

#[derive(Debug, Clone)]
pub struct Config {
  map: HashMap<String, String>,
  pub loaded_files: Vec<PathBuf>
}

impl Default for Config {
  fn default() -> Self {
    Self {
      map:          DEFAULTS
        .iter()
        .map(|(k, v)| {
          (k.to_string(), v.to_string())
        })
        .collect(),
      loaded_files: vec![]
    }
  }
}

impl Config {
  #[tracing::instrument(skip(
    rc_override
  ))]
  pub fn load(
    rc_override: Option<&Path>
  ) -> anyhow::Result<Self> {
    let mut cfg = Config::default();

    let rc = resolve_rc_path(
      rc_override
    )?;
    if let Some(path) = rc {
      info!(rc = %path.display(), "loading rc file");
      cfg.load_file(&path)?;
    } else {
      warn!(
        "no rc file found; using \
         defaults"
      );
    }

    Ok(cfg)
  }

  #[tracing::instrument(skip(
    self, overrides
  ))]
  pub fn apply_overrides<I>(
    &mut self,
    overrides: I
  ) where
    I: IntoIterator<
      Item = (String, String)
    >
  {
    for (k, v) in overrides {
      let key = k
        .strip_prefix("rc.")
        .unwrap_or(&k)
        .to_string();
      debug!(key = %key, value = %v, "applying override");
      self.map.insert(key, v);
    }
  }

  pub fn get(
    &self,
    key: &str
  ) -> Option<String> {
    self.map.get(key).cloned()
  }

  pub fn get_bool(
    &self,
    key: &str
  ) -> anyhow::Result<Option<bool>> {
    self
      .map
      .get(key)
      .map(|v| {
        parse_bool(v).ok_or_else(|| {
          anyhow!(
            "invalid boolean for \
             {key}: {v}"
          )
        })
      })
      .transpose()
  }

  pub fn get_u64(
    &self,
    key: &str
  ) -> anyhow::Result<Option<u64>> {
    self
      .map
      .get(key)
      .map(|v| {
        v.trim().parse::<u64>().with_context(
          || {
            format!(
              "invalid number for \
               {key}: {v}"
            )
          }
        )
      })
      .transpose()
  }

  #[tracing::instrument(skip(self))]
  fn load_file(
    &mut self,
    path: &Path
  ) -> anyhow::Result<()> {
    let path = expand_tilde(path);
    let text =
      fs::read_to_string(&path)
        .with_context(|| {
          format!(
            "failed to read {}",
            path.display()
          )
        })?;

    self
      .loaded_files
      .push(path.clone());

    let base_dir = path
      .parent()
      .map(|p| p.to_path_buf())
      .unwrap_or_else(|| {
        PathBuf::from(".")
      });

    for (line_num, raw_line) in
      text.lines().enumerate()
    {
      let line = raw_line
        .split_once('#')
        .map(|(before, _)| before)
        .unwrap_or(raw_line)
        .trim();
      if line.is_empty() {
        continue;
      }

      if let Some(include_rest) =
        line.strip_prefix("include ")
      {
        let include_path =
          resolve_include_path(
            &base_dir,
            include_rest.trim()
          )?;
        debug!(
            file = %path.display(),
            include = %include_path.display(),
            line = line_num + 1,
            "processing include"
        );

        if include_path.exists() {
          self
            .load_file(&include_path)?;
        } else {
          warn!(include = %include_path.display(), "include file does not exist; skipping");
        }
        continue;
      }

      let (k, v) = line
        .split_once('=')
        .ok_or_else(|| {
          anyhow!(
            "invalid config line \
             {}:{}: {}",
            path.display(),
            line_num + 1,
            raw_line
          )
        })?;

      let key = k.trim().to_string();
      let value = v.trim().to_string();
      trace!(key = %key, value = %value, "loaded config key");
      self.map.insert(key, value);
    }

    Ok(())
  }
}

#[derive(
  Debug, Clone, Copy, PartialEq, Eq,
)]
pub enum ViewMode {
  Full,
  Basic
}

/// Typed view of the keys the
/// application reads.
#[derive(Debug, Clone)]
pub struct AppSettings {
  pub data_dir:        PathBuf,
  pub namespace:       String,
  pub version:         String,
  pub min_loading:     Duration,
  pub due_soon_days:   i64,
  pub seed_demo_users: bool,
  pub view_mode:       ViewMode,
  pub export_dir:      PathBuf,
  pub color:           bool
}

impl AppSettings {
  #[tracing::instrument(skip(
    cfg,
    data_override
  ))]
  pub fn from_config(
    cfg: &Config,
    data_override: Option<&Path>
  ) -> anyhow::Result<Self> {
    let data_dir = match data_override {
      | Some(path) => path.to_path_buf(),
      | None => {
        let raw = cfg
          .get("data.location")
          .ok_or_else(|| {
            anyhow!(
              "data.location is not set"
            )
          })?;
        expand_tilde(Path::new(&raw))
      }
    };

    let view_mode = match cfg
      .get("view.mode")
      .unwrap_or_default()
      .to_ascii_lowercase()
      .as_str()
    {
      | "full" | "" => ViewMode::Full,
      | "basic" => ViewMode::Basic,
      | other => {
        return Err(anyhow!(
          "invalid view.mode: {other}"
        ));
      }
    };

    let due_soon_days = cfg
      .get_u64("due_soon.days")?
      .unwrap_or(3);
    if due_soon_days > MAX_DUE_SOON_DAYS {
      return Err(anyhow!(
        "due_soon.days must be at most \
         {MAX_DUE_SOON_DAYS}: \
         {due_soon_days}"
      ));
    }
    let due_soon_days =
      i64::try_from(due_soon_days)
        .context(
          "due_soon.days out of range"
        )?;

    Ok(Self {
      data_dir,
      namespace: cfg
        .get("storage.namespace")
        .unwrap_or_else(|| {
          "taskdesk".to_string()
        }),
      version: cfg
        .get("storage.version")
        .unwrap_or_else(|| {
          "2.0".to_string()
        }),
      min_loading: Duration::from_millis(
        cfg
          .get_u64("loading.min_ms")?
          .unwrap_or(300)
      ),
      due_soon_days,
      seed_demo_users: cfg
        .get_bool("demo.seed")?
        .unwrap_or(true),
      view_mode,
      export_dir: expand_tilde(
        Path::new(
          &cfg
            .get("export.location")
            .unwrap_or_else(|| {
              ".".to_string()
            })
        )
      ),
      color: cfg
        .get_bool("color")?
        .unwrap_or(true)
    })
  }

  /// Defaults rooted at `data_dir`
  /// with no artificial loading delay.
  pub fn for_data_dir(
    data_dir: &Path
  ) -> Self {
    Self {
      data_dir:        data_dir
        .to_path_buf(),
      namespace:       "taskdesk"
        .to_string(),
      version:         "2.0".to_string(),
      min_loading:     Duration::ZERO,
      due_soon_days:   3,
      seed_demo_users: true,
      view_mode:       ViewMode::Full,
      export_dir:      data_dir
        .to_path_buf(),
      color:           false
    }
  }
}

#[tracing::instrument(skip(
  override_path
))]
fn resolve_rc_path(
  override_path: Option<&Path>
) -> anyhow::Result<Option<PathBuf>> {
  if let Some(path) = override_path {
    return Ok(Some(path.to_path_buf()));
  }

  if let Ok(rc_env) =
    std::env::var(RC_ENV_VAR)
  {
    if rc_env == "/dev/null" {
      return Ok(None);
    }
    return Ok(Some(PathBuf::from(
      rc_env
    )));
  }

  let Some(home) = dirs::home_dir()
  else {
    debug!(
      "cannot determine home \
       directory; skipping rc lookup"
    );
    return Ok(None);
  };
  let candidate =
    home.join(RC_FILE_NAME);
  if candidate.exists() {
    return Ok(Some(candidate));
  }

  Ok(None)
}

fn resolve_include_path(
  base_dir: &Path,
  include: &str
) -> anyhow::Result<PathBuf> {
  if include.trim().is_empty() {
    return Err(anyhow!(
      "include path cannot be empty"
    ));
  }

  let raw = PathBuf::from(include);
  let expanded = expand_tilde(&raw);
  if expanded.is_absolute() {
    Ok(expanded)
  } else {
    Ok(base_dir.join(expanded))
  }
}

fn expand_tilde(
  path: &Path
) -> PathBuf {
  let text = path.to_string_lossy();
  if let Some(rest) =
    text.strip_prefix("~/")
    && let Some(home) = dirs::home_dir()
  {
    return home.join(rest);
  }
  path.to_path_buf()
}

fn parse_bool(s: &str) -> Option<bool> {
  match s
    .trim()
    .to_ascii_lowercase()
    .as_str()
  {
    | "1" | "y" | "yes" | "on"
    | "true" => Some(true),
    | "0" | "n" | "no" | "off"
    | "false" => Some(false),
    | _ => None
  }
}
