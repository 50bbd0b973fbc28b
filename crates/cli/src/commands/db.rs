//! `mosaic db`: bulk schema operations.

use clap::{Args, Subcommand};

use mosaic_orm::operations::{clear, flush, init, OpOptions, OpSummary};
use mosaic_orm::OrmResult;

use crate::commands::print_command;
use crate::AppContext;

#[derive(Debug, Args)]
pub struct OpArgs {
    /// Restrict scope: component names, `module.Class` paths, or
    /// `component:Class` short forms
    pub names: Vec<String>,

    /// Render each statement to stdout
    #[arg(long)]
    pub echo: bool,

    /// Compute without applying
    #[arg(long = "dry-run")]
    pub dry_run: bool,

    /// Never open a connection; implies --echo and --dry-run
    #[arg(long)]
    pub offline: bool,

    /// One progress line per table
    #[arg(short, long)]
    pub verbose: bool,
}

impl OpArgs {
    fn options(&self) -> OpOptions {
        OpOptions {
            names: self.names.clone(),
            echo: self.echo,
            commit: !self.dry_run,
            offline: self.offline,
            verbose: self.verbose,
        }
    }
}

#[derive(Debug, Subcommand)]
pub enum DbCommand {
    /// Create every table that does not already exist
    Init(OpArgs),
    /// Drop every table that exists, dependents first
    Clear(OpArgs),
    /// Delete all rows from every table without dropping it
    Flush(OpArgs),
}

pub async fn run(command: DbCommand, context: &AppContext) -> OrmResult<()> {
    let summary = match command {
        DbCommand::Init(args) => {
            init(&context.engines, &context.registry, &args.options()).await?
        }
        DbCommand::Clear(args) => {
            clear(&context.engines, &context.registry, &args.options()).await?
        }
        DbCommand::Flush(args) => {
            flush(&context.engines, &context.registry, &args.options()).await?
        }
    };
    report(&summary);
    Ok(())
}

fn report(summary: &OpSummary) {
    for action in &summary.actions {
        print_command(" -", action.action, &action.table, "");
    }
}
