//! Application context: unified state passed to every command handler.
//!
//! `AppContext` owns the loaded configuration and every production adapter,
//! so command handlers only orchestrate and render.

use std::path::PathBuf;

use anyhow::Result;
use turboship_common::DbType;

use crate::application::ports::{ConfigStore, Provisioners};
use crate::application::services::lifecycle::{Lifecycle, LifecycleSettings};
use crate::domain::config::TurboshipConfig;
use crate::domain::error::LifecycleError;
use crate::infra::certbot::CertbotCertificate;
use crate::infra::command_runner::TokioCommandRunner;
use crate::infra::database::SqlDatabase;
use crate::infra::fs::LocalFs;
use crate::infra::identity::SystemIdentity;
use crate::infra::lock::FileAllocationLock;
use crate::infra::network::{ConfiguredIpResolver, TokioNetworkProbe};
use crate::infra::nginx::NginxRoute;
use crate::infra::registry::JsonRegistryStore;
use crate::output::{HumanRenderer, JsonRenderer, OutputContext, Renderer, TerminalReporter};

/// Output rendering mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputMode {
    /// Human-readable terminal output (default).
    Human,
    /// Machine-readable JSON output.
    Json,
}

/// Output rendering flags.
pub struct OutputFlags {
    /// Disable ANSI color output.
    pub no_color: bool,
    /// Suppress non-error output.
    pub quiet: bool,
    /// Enable JSON output mode.
    pub json: bool,
}

/// Behaviour flags.
pub struct BehaviourFlags {
    /// Skip interactive prompts (also set by `CI` / `TURBOSHIP_YES` env vars).
    pub yes: bool,
}

/// Flags passed from the top-level CLI to `AppContext::new`.
pub struct AppFlags {
    /// Output rendering options.
    pub output: OutputFlags,
    /// Behaviour options.
    pub behaviour: BehaviourFlags,
}

pub type HostIdentity = SystemIdentity<TokioCommandRunner>;
pub type HostDatabase = SqlDatabase<TokioCommandRunner>;
pub type HostRoute = NginxRoute<TokioCommandRunner, LocalFs>;
pub type HostCertificate = CertbotCertificate<TokioCommandRunner>;
pub type HostProvisioners = Provisioners<HostIdentity, HostDatabase, HostRoute, HostCertificate>;
pub type HostLifecycle<'a> = Lifecycle<
    'a,
    JsonRegistryStore,
    FileAllocationLock,
    HostIdentity,
    HostDatabase,
    HostRoute,
    HostCertificate,
>;

/// Unified application context passed to every command handler.
///
/// Constructed once in `Cli::run()` and passed as `&AppContext` to all
/// command handlers.
pub struct AppContext {
    /// Terminal output context (colors, quiet mode).
    pub output: OutputContext,
    /// Output rendering mode (human vs JSON).
    pub mode: OutputMode,
    /// When `true`, skip interactive prompts.
    ///
    /// Set when `--yes` / `-y` is passed, or when the `CI` or `TURBOSHIP_YES`
    /// environment variables are present.
    pub non_interactive: bool,
    /// Effective host configuration.
    pub config: TurboshipConfig,
    /// Where `config` was read from.
    pub config_path: PathBuf,
    pub registry: JsonRegistryStore,
    pub lock: FileAllocationLock,
    pub provisioners: HostProvisioners,
    pub ip_resolver: ConfiguredIpResolver,
    pub network: TokioNetworkProbe,
    pub settings: LifecycleSettings,
}

impl AppContext {
    /// Construct an `AppContext` from top-level CLI flags.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration cannot be loaded or is invalid.
    pub fn new(flags: &AppFlags, config_store: &impl ConfigStore) -> Result<Self> {
        let ci_env = std::env::var("CI").is_ok() || std::env::var("TURBOSHIP_YES").is_ok();
        let non_interactive = flags.behaviour.yes || ci_env;

        let mode = if flags.output.json {
            OutputMode::Json
        } else {
            OutputMode::Human
        };

        let config = config_store.load()?;
        let config_path = config_store.path();
        let runner = || TokioCommandRunner::new(config.command_timeout());

        let provisioners = Provisioners {
            identity: SystemIdentity::new(runner(), &config.identity.shell, &config.web_group),
            database: SqlDatabase::new(
                runner(),
                &config.database.mariadb_client,
                &config.database.postgres_superuser,
            ),
            route: NginxRoute::new(
                runner(),
                LocalFs,
                config.nginx.sites_available.clone(),
                config.nginx.sites_enabled.clone(),
                config.acme.live_dir.clone(),
            ),
            certificate: CertbotCertificate::new(
                runner(),
                config.acme.email.clone(),
                config.acme.retries,
                config.acme.staging,
            ),
        };

        let mut registry = JsonRegistryStore::new(config.registry_path.clone());
        if let Some(db_path) = &config.legacy_db_path {
            registry = registry.with_legacy_import(db_path.clone(), config.port_range());
        }

        Ok(Self {
            // JSON mode owns stdout; progress lines would corrupt it.
            output: OutputContext::new(
                flags.output.no_color,
                flags.output.quiet || flags.output.json,
            ),
            mode,
            non_interactive,
            registry,
            lock: FileAllocationLock::new(config.lock_path.clone(), config.lock_wait()),
            provisioners,
            ip_resolver: ConfiguredIpResolver::new(config.public_ip, &config.ip_lookup_url),
            network: TokioNetworkProbe,
            settings: LifecycleSettings::from_config(&config),
            config,
            config_path,
        })
    }

    /// Returns `true` when JSON output mode is active.
    #[must_use]
    pub fn is_json(&self) -> bool {
        self.mode == OutputMode::Json
    }

    /// Returns the appropriate `Renderer` variant for the current output mode.
    #[must_use]
    pub fn renderer(&self) -> Renderer<'_> {
        match self.mode {
            OutputMode::Human => Renderer::Human(HumanRenderer::new(&self.output)),
            OutputMode::Json => Renderer::Json(JsonRenderer),
        }
    }

    #[must_use]
    pub fn reporter(&self) -> TerminalReporter<'_> {
        TerminalReporter::new(&self.output)
    }

    #[must_use]
    pub fn lifecycle(&self) -> HostLifecycle<'_> {
        Lifecycle::new(&self.registry, &self.lock, &self.provisioners, &self.settings)
    }

    /// Ask the user for confirmation.
    ///
    /// When `non_interactive` is `true` (CI, `--yes` flag, or `TURBOSHIP_YES`
    /// env), returns `default` immediately without prompting.
    ///
    /// # Errors
    ///
    /// Returns an error if the terminal prompt fails (e.g. no TTY available).
    pub fn confirm(&self, prompt: &str, default: bool) -> Result<bool> {
        if self.non_interactive {
            return Ok(default);
        }
        let confirmed = dialoguer::Confirm::new()
            .with_prompt(prompt)
            .default(default)
            .interact()?;
        Ok(confirmed)
    }

    /// Prompt for a required value, or fail naming `flag` when prompts are
    /// disabled.
    ///
    /// # Errors
    ///
    /// Returns `LifecycleError::Validation` in non-interactive mode, or an
    /// error if the terminal prompt fails.
    pub fn prompt_text(&self, prompt: &str, flag: &str) -> Result<String> {
        if self.non_interactive {
            return Err(LifecycleError::Validation(format!("{flag} is required")).into());
        }
        let value: String = dialoguer::Input::new().with_prompt(prompt).interact_text()?;
        Ok(value.trim().to_string())
    }

    /// Prompt for the database engine.
    ///
    /// # Errors
    ///
    /// Returns `LifecycleError::Validation` in non-interactive mode, or an
    /// error if the terminal prompt fails.
    pub fn prompt_db_type(&self) -> Result<DbType> {
        if self.non_interactive {
            return Err(LifecycleError::Validation("--db is required".to_string()).into());
        }
        let choices = [DbType::Mariadb, DbType::Postgres];
        let labels: Vec<&str> = choices.iter().map(|d| d.as_str()).collect();
        let picked = dialoguer::Select::new()
            .with_prompt("Database engine")
            .items(&labels[..])
            .default(0)
            .interact()?;
        Ok(choices[picked])
    }
}
