use clap::{Arg, ArgAction, ArgMatches, Command};
use sfbackup::{
    create_sample_config, dump_config, load_config, run_with_interrupt, InterruptCleanup,
    RunOptions, SfBackupError, DEFAULT_CONFIG_FILE,
};
use std::io::{self, Write};
use std::path::PathBuf;
use std::process;

fn main() {
    let matches = cli().get_matches();
    init_logging(matches.get_flag("verbose"));

    match run(&matches) {
        Ok(()) => {}
        Err(error) => {
            // Config problems are ordinary status output; run failures go to stderr
            let _ = if error.is_config_error() {
                report_error(&error, &mut io::stdout())
            } else {
                report_error(&error, &mut io::stderr())
            };

            let code = error.exit_code();
            if code != 0 {
                process::exit(code);
            }
        }
    }
}

fn report_error<W: Write>(error: &SfBackupError, out: &mut W) -> io::Result<()> {
    writeln!(out, "Error: {error}")?;

    let suggestions = error.suggestions();
    if !suggestions.is_empty() {
        writeln!(out, "\nSuggestions:")?;
        for suggestion in suggestions {
            writeln!(out, "  - {suggestion}")?;
        }
    }
    Ok(())
}

fn cli() -> Command {
    Command::new("sfbackup")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Back up the newest save file for each configured save name")
        .long_about(
            "sfbackup copies the most recently modified file starting with each configured\n\
             save name from SaveGamesDirectory into BackupDirectory/<name>/.\n\
             Files already present in the backup directory are skipped.",
        )
        .arg(
            Arg::new("config")
                .help("Config TOML file path")
                .value_name("CONFIG")
                .value_parser(clap::value_parser!(PathBuf))
                .default_value(DEFAULT_CONFIG_FILE),
        )
        .arg(
            Arg::new("dry-run")
                .short('n')
                .long("dry-run")
                .help("Show what would be copied without doing it")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("verbose")
                .short('v')
                .long("verbose")
                .help("Show file details, a summary and debug logging")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("quiet")
                .short('q')
                .long("quiet")
                .help("Suppress all output except errors")
                .action(ArgAction::SetTrue)
                .conflicts_with("verbose"),
        )
        .arg(
            Arg::new("dump-config")
                .long("dump-config")
                .help("Display the loaded configuration and exit")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("sample-config")
                .long("sample-config")
                .help("Print a sample configuration file and exit")
                .action(ArgAction::SetTrue)
                .conflicts_with("dump-config"),
        )
}

/// Logs go to stderr; RUST_LOG overrides the level picked from the flags
fn init_logging(verbose: bool) {
    let level = if verbose { "debug" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level))
        .format_timestamp(None)
        .init();
}

fn run(matches: &ArgMatches) -> Result<(), SfBackupError> {
    if matches.get_flag("sample-config") {
        print!("{}", create_sample_config());
        return Ok(());
    }

    // Always present: the argument has a default value
    let config_path = matches
        .get_one::<PathBuf>("config")
        .cloned()
        .unwrap_or_default();

    let config = load_config(&config_path)?;

    if matches.get_flag("dump-config") {
        print!("{}", dump_config(&config, &config_path)?);
        return Ok(());
    }

    let options = RunOptions {
        dry_run: matches.get_flag("dry-run"),
        verbose: matches.get_flag("verbose"),
        quiet: matches.get_flag("quiet"),
    };

    let dirs = config
        .save_game_names
        .iter()
        .map(|name| config.backup_dir_for(name))
        .collect();
    let interrupt = InterruptCleanup::new(dirs);
    if let Err(e) = interrupt.install() {
        log::warn!("Could not install Ctrl-C handler: {e}");
    }

    let stdout = io::stdout();
    let report = run_with_interrupt(&config, &options, &mut stdout.lock(), interrupt.flag())?;

    if options.verbose {
        for copied in &report.copied {
            println!(
                "  {}: {} ({})",
                copied.save_name,
                copied.backup_path.display(),
                sfbackup::utils::format_size(copied.size)
            );
        }
        println!("{}", report.summary());
        println!("Duration: {:.2}s", report.duration.as_secs_f64());
    }

    Ok(())
}
