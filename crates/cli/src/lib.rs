//! # mosaic-cli
//!
//! Command tree for the `mosaic` binary. Applications that register their
//! own models embed this crate instead: build an [`AppContext`] with the
//! populated registry and hand the parsed [`Cli`] to [`execute`].

use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};

use mosaic_core::{CoreResult, Settings};
use mosaic_orm::migrations::MigrationConfig;
use mosaic_orm::schema::SchemaRegistry;
use mosaic_orm::{EngineManager, OrmResult};

pub mod commands;

/// Everything a command needs: settings-backed engines, the schema
/// registry, and the migration configuration.
pub struct AppContext {
    pub engines: EngineManager,
    pub registry: SchemaRegistry,
    pub migrations: MigrationConfig,
}

impl AppContext {
    pub fn from_settings(settings: Settings) -> Self {
        let registry = SchemaRegistry::from_settings(&settings);
        Self {
            engines: EngineManager::new(settings),
            registry,
            migrations: MigrationConfig::default(),
        }
    }

    /// Load the project file if it exists, otherwise start from defaults;
    /// environment overrides apply either way.
    pub fn load(path: &Path) -> CoreResult<Self> {
        let settings = if path.exists() {
            Settings::from_file(path)?
        } else {
            let mut settings = Settings::new();
            settings.apply_env();
            settings
        };
        Ok(Self::from_settings(settings))
    }
}

#[derive(Parser)]
#[command(
    name = "mosaic",
    version,
    about = "Componentized database tooling: shared database, independent schemas and migrations"
)]
pub struct Cli {
    /// Project settings file
    #[arg(long, global = true, default_value = "mosaic.toml")]
    pub config: PathBuf,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Bulk schema operations
    #[command(subcommand)]
    Db(commands::db::DbCommand),

    /// Per-component migration operations
    #[command(subcommand)]
    Migrate(commands::migrate::MigrateCommand),
}

/// Dispatch a parsed command against an application context.
pub async fn execute(command: Command, context: &AppContext) -> OrmResult<()> {
    match command {
        Command::Db(command) => commands::db::run(command, context).await,
        Command::Migrate(command) => commands::migrate::run(command, context).await,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::db::DbCommand;
    use crate::commands::migrate::MigrateCommand;

    #[test]
    fn parses_db_operations_with_flags() {
        let cli = Cli::try_parse_from([
            "mosaic",
            "db",
            "init",
            "app.billing",
            "--echo",
            "--dry-run",
            "--offline",
        ])
        .unwrap();

        match cli.command {
            Command::Db(DbCommand::Init(args)) => {
                assert_eq!(args.names, vec!["app.billing"]);
                assert!(args.echo);
                assert!(args.dry_run);
                assert!(args.offline);
            }
            _ => panic!("expected db init"),
        }
    }

    #[test]
    fn parses_migration_commands() {
        let cli = Cli::try_parse_from([
            "mosaic",
            "migrate",
            "revision",
            "app.billing",
            "-m",
            "create invoices",
        ])
        .unwrap();
        match cli.command {
            Command::Migrate(MigrateCommand::Revision {
                component, message, ..
            }) => {
                assert_eq!(component, "app.billing");
                assert_eq!(message.as_deref(), Some("create invoices"));
            }
            _ => panic!("expected migrate revision"),
        }

        let cli = Cli::try_parse_from(["mosaic", "migrate", "upgrade", "app.billing"]).unwrap();
        match cli.command {
            Command::Migrate(MigrateCommand::Upgrade { revision, .. }) => {
                assert_eq!(revision, "head");
            }
            _ => panic!("expected migrate upgrade"),
        }
    }

    #[test]
    fn context_loads_project_file_or_defaults() {
        let dir = tempfile::tempdir().unwrap();

        let missing = dir.path().join("absent.toml");
        let context = AppContext::load(&missing).unwrap();
        assert!(context.engines.settings().components.is_empty());

        let path = dir.path().join("mosaic.toml");
        std::fs::write(
            &path,
            "components = [\"app\"]\n\n[databases]\ndefault = \"memory:///app\"\n",
        )
        .unwrap();
        let context = AppContext::load(&path).unwrap();
        assert_eq!(context.engines.settings().components, vec!["app"]);
        assert!(context.engines.default_engine().is_ok());
    }
}
