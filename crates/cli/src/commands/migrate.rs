//! `mosaic migrate`: per-component migration operations.

use clap::Subcommand;

use mosaic_orm::migrations::MigrationEngine;
use mosaic_orm::OrmResult;

use crate::commands::print_command;
use crate::AppContext;

#[derive(Debug, Subcommand)]
pub enum MigrateCommand {
    /// Generate a new revision for a component
    Revision {
        component: String,

        /// Revision message
        #[arg(short, long)]
        message: Option<String>,

        /// Skip schema-diff autogeneration
        #[arg(long)]
        no_auto: bool,
    },

    /// Apply revisions forward to a target (`head`, an id, or offline a
    /// `from:to` range)
    Upgrade {
        component: String,

        #[arg(default_value = "head")]
        revision: String,

        /// Render SQL instead of executing; never opens a connection
        #[arg(long)]
        offline: bool,
    },

    /// Walk revisions backward over an explicit `from:to` range
    Downgrade {
        component: String,

        revision: String,

        /// Render SQL instead of executing; never opens a connection
        #[arg(long)]
        offline: bool,
    },

    /// Show the current revision of each component
    Status {
        /// Restrict to these components
        names: Vec<String>,
    },

    /// List a component's revisions oldest-first
    History {
        component: String,

        /// Optional `[start]:[end]` bounds
        range: Option<String>,
    },
}

pub async fn run(command: MigrateCommand, context: &AppContext) -> OrmResult<()> {
    let engine = MigrationEngine::with_config(
        &context.engines,
        &context.registry,
        context.migrations.clone(),
    );

    match command {
        MigrateCommand::Revision {
            component,
            message,
            no_auto,
        } => {
            let revision = engine
                .revision(&component, message.as_deref(), !no_auto)
                .await?;
            print_command(
                " *",
                "revision",
                &component,
                &revision.path.display().to_string(),
            );
        }

        MigrateCommand::Upgrade {
            component,
            revision,
            offline,
        } => {
            let report = engine.upgrade(&component, &revision, offline).await?;
            for id in &report.applied {
                print_command(" -", "upgrade", &component, id);
            }
        }

        MigrateCommand::Downgrade {
            component,
            revision,
            offline,
        } => {
            let report = engine.downgrade(&component, &revision, offline).await?;
            for id in &report.applied {
                print_command(" -", "downgrade", &component, id);
            }
        }

        MigrateCommand::Status { names } => {
            print_command(" *", "status", "", "");
            let names = if names.is_empty() { None } else { Some(names) };
            let report = engine.status(names.as_deref()).await?;
            for (component, status) in &report {
                print_command(" -", "revision", component, &status.to_string());
            }
        }

        MigrateCommand::History { component, range } => {
            let entries = engine.history(&component, range.as_deref())?;
            for entry in &entries {
                println!("{}", entry.log_line());
            }
        }
    }

    Ok(())
}
