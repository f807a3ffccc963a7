//! # Tronadura CLI
//!
//! Command-line front end for the blast design engine: design a round,
//! keep a log of designed rounds and maintain the loading scheme.
//!
//! ```text
//! tronadura design --width 5.2 --height 6.1 --length 3.5 --rock hard --save
//! tronadura list --site "Mina Norte"
//! tronadura scheme set cut-column --emulsion 1 --anfo 3.5
//! ```

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use uuid::Uuid;

use blast_core::classify::BlastRole;
use blast_core::explosives::RoleCharge;
use blast_core::file_io::load_round_log_or_new;
use blast_core::geometry::{BurdenModel, RockClass, Section};
use blast_core::round::RoundMetadata;
use blast_core::{
    compute_round, load_config, load_round_log, load_scheme, save_round_log, save_scheme, DesignConfig,
    FileLock, LoadingScheme, Round, RoundInput,
};

mod logging;
mod report;

#[derive(Parser)]
#[command(name = "tronadura")]
#[command(about = "Drill-and-blast round design for underground headings", long_about = None)]
struct Cli {
    /// Round log file
    #[arg(long, global = true, default_value = "rounds.trn")]
    log: PathBuf,

    /// Loading scheme file
    #[arg(long, global = true, default_value = "scheme.json")]
    scheme: PathBuf,

    /// Design config file (TOML); reference values when absent
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Design a round and print the report
    Design {
        #[command(flatten)]
        round: RoundArgs,
        /// Print the round as JSON
        #[arg(long)]
        json: bool,
        /// Include the firing sequence in the report
        #[arg(long)]
        sequence: bool,
        /// Append the round to the round log
        #[arg(long)]
        save: bool,
    },
    /// List saved rounds, oldest first
    List {
        /// Only rounds from this site
        #[arg(long)]
        site: Option<String>,
        /// Only rounds whose contract contains this text
        #[arg(long)]
        contract: Option<String>,
    },
    /// Show a saved round
    Show {
        id: Uuid,
        #[arg(long)]
        json: bool,
        #[arg(long)]
        sequence: bool,
    },
    /// Delete a saved round
    Delete { id: Uuid },
    /// Recompute a saved round with the current scheme and config
    Redesign { id: Uuid },
    /// Inspect or change the loading scheme
    Scheme {
        #[command(subcommand)]
        action: SchemeAction,
    },
}

#[derive(Subcommand)]
enum SchemeAction {
    /// Print charges per role
    Show,
    /// Change the charge of one role; omitted quantities keep their value
    Set {
        /// Role (reamer, floor, back, wall, cut-column, aux-wall, aux-back, bulk)
        role: String,
        /// Emulsion cartridges per hole
        #[arg(long)]
        emulsion: Option<f64>,
        /// Booster cartridges per hole
        #[arg(long)]
        booster: Option<f64>,
        /// ANFO per hole (kg)
        #[arg(long)]
        anfo: Option<f64>,
    },
    /// Restore the reference scheme
    Reset,
}

#[derive(Args)]
struct RoundArgs {
    /// Read the whole round input from a JSON file
    #[arg(long, conflicts_with_all = ["width", "height", "length"])]
    input: Option<PathBuf>,
    /// Section width (m)
    #[arg(long, required_unless_present = "input")]
    width: Option<f64>,
    /// Section height (m)
    #[arg(long, required_unless_present = "input")]
    height: Option<f64>,
    /// Round advance (m)
    #[arg(long, required_unless_present = "input")]
    length: Option<f64>,
    /// Drill-hole diameter (mm)
    #[arg(long, default_value_t = 45.0)]
    diameter: f64,
    /// Burden model: manual, simple or rock-adjusted
    #[arg(long, default_value = "rock-adjusted")]
    model: String,
    /// Rock class: very-hard, hard, medium or soft
    #[arg(long, default_value = "hard")]
    rock: String,
    /// Burden (m), manual model only
    #[arg(long)]
    burden: Option<f64>,
    /// Spacing (m), manual model only
    #[arg(long)]
    spacing: Option<f64>,
    #[arg(long, default_value = "")]
    contract: String,
    #[arg(long, default_value = "")]
    site: String,
    #[arg(long, default_value = "")]
    notes: String,
}

impl RoundArgs {
    fn to_input(&self) -> Result<RoundInput> {
        if let Some(path) = &self.input {
            let json = fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
            let input: RoundInput =
                serde_json::from_str(&json).with_context(|| format!("parsing {}", path.display()))?;
            return Ok(input);
        }

        let (Some(width), Some(height), Some(length)) = (self.width, self.height, self.length) else {
            bail!("--width, --height and --length are required without --input");
        };

        Ok(RoundInput {
            section: Section::new(width, height, length),
            burden_model: BurdenModel::from_str_flexible(&self.model)?,
            rock_class: RockClass::from_str_flexible(&self.rock)?,
            diameter_mm: self.diameter,
            burden_m: self.burden,
            spacing_m: self.spacing,
            metadata: RoundMetadata::new(self.contract.clone(), self.site.clone())
                .with_notes(self.notes.clone()),
        })
    }
}

fn main() -> Result<()> {
    logging::init();
    let cli = Cli::parse();

    match &cli.command {
        Commands::Design {
            round,
            json,
            sequence,
            save,
        } => design(&cli, round, *json, *sequence, *save),
        Commands::List { site, contract } => list(&cli.log, site.as_deref(), contract.as_deref()),
        Commands::Show { id, json, sequence } => show(&cli.log, id, *json, *sequence),
        Commands::Delete { id } => delete(&cli.log, id),
        Commands::Redesign { id } => redesign(&cli, id),
        Commands::Scheme { action } => scheme(&cli.scheme, action),
    }
}

fn current_user() -> String {
    std::env::var("USER")
        .or_else(|_| std::env::var("USERNAME"))
        .unwrap_or_else(|_| "unknown".to_string())
}

fn design_config(cli: &Cli) -> Result<DesignConfig> {
    match &cli.config {
        Some(path) => Ok(load_config(path)?),
        None => Ok(DesignConfig::default()),
    }
}

fn print_round(round: &Round, json: bool, sequence: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(round)?);
    } else {
        print!("{}", report::round_report(round, sequence));
    }
    Ok(())
}

fn design(cli: &Cli, args: &RoundArgs, json: bool, sequence: bool, save: bool) -> Result<()> {
    let input = args.to_input()?;
    let config = design_config(cli)?;
    let loading = load_scheme(&cli.scheme)?;

    let round = compute_round(&input, &loading, &config)?;
    print_round(&round, json, sequence)?;

    if save {
        let _lock = FileLock::acquire(&cli.log, current_user())?;
        let mut log = load_round_log_or_new(&cli.log)?;
        let id = log.add_round(round);
        save_round_log(&log, &cli.log)?;
        eprintln!("Saved round {} to {}", id, cli.log.display());
    }
    Ok(())
}

fn list(path: &Path, site: Option<&str>, contract: Option<&str>) -> Result<()> {
    let log = load_round_log_or_new(path)?;
    let rounds = log.filter(site, contract);
    if rounds.is_empty() {
        println!("No rounds found.");
        return Ok(());
    }
    for round in rounds {
        println!("{}", report::round_summary(round));
    }
    Ok(())
}

fn show(path: &Path, id: &Uuid, json: bool, sequence: bool) -> Result<()> {
    let log = load_round_log(path)?;
    let round = log
        .get_round(id)
        .ok_or(blast_core::DesignError::RoundNotFound { id: id.to_string() })?;
    print_round(round, json, sequence)
}

fn delete(path: &Path, id: &Uuid) -> Result<()> {
    let _lock = FileLock::acquire(path, current_user())?;
    let mut log = load_round_log(path)?;
    if log.remove_round(id).is_none() {
        bail!("round {} not found in {}", id, path.display());
    }
    save_round_log(&log, path)?;
    println!("Deleted round {}", id);
    Ok(())
}

fn redesign(cli: &Cli, id: &Uuid) -> Result<()> {
    let config = design_config(cli)?;
    let loading = load_scheme(&cli.scheme)?;

    let _lock = FileLock::acquire(&cli.log, current_user())?;
    let mut log = load_round_log(&cli.log)?;
    let input = log
        .get_round(id)
        .map(Round::input)
        .ok_or(blast_core::DesignError::RoundNotFound { id: id.to_string() })?;

    let round = compute_round(&input, &loading, &config)?;
    log.replace_round(id, round)?;
    save_round_log(&log, &cli.log)?;

    if let Some(round) = log.get_round(id) {
        print!("{}", report::round_report(round, false));
    }
    Ok(())
}

/// Overlay the given quantities on an existing charge.
fn merge_charge(current: RoleCharge, emulsion: Option<f64>, booster: Option<f64>, anfo: Option<f64>) -> RoleCharge {
    RoleCharge::new(
        emulsion.unwrap_or(current.emulsion_cartridges),
        booster.unwrap_or(current.booster_cartridges),
        anfo.unwrap_or(current.anfo_kg),
    )
}

fn scheme(path: &Path, action: &SchemeAction) -> Result<()> {
    match action {
        SchemeAction::Show => {
            let loading = load_scheme(path)?;
            print!("{}", report::scheme_table(&loading));
        }
        SchemeAction::Set {
            role,
            emulsion,
            booster,
            anfo,
        } => {
            let Some(role) = BlastRole::from_str_flexible(role) else {
                bail!("unknown role '{}'", role);
            };
            if emulsion.is_none() && booster.is_none() && anfo.is_none() {
                bail!("nothing to change: pass --emulsion, --booster or --anfo");
            }
            let mut loading = load_scheme(path)?;
            let charge = merge_charge(loading.charge(role), *emulsion, *booster, *anfo);
            loading.set_charge(role, charge)?;
            save_scheme(&loading, path)?;
            tracing::info!(%role, "loading scheme updated");
            print!("{}", report::scheme_table(&loading));
        }
        SchemeAction::Reset => {
            let loading = LoadingScheme::default();
            save_scheme(&loading, path)?;
            print!("{}", report::scheme_table(&loading));
        }
    }
    Ok(())
}
