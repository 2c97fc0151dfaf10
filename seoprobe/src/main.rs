use colored::Colorize;
use seoprobe::commands::command_argument_builder;
use seoprobe::handlers::{handle_crawl, handle_init, handle_report};
use seoprobe_core::print_banner;
use tracing_subscriber::EnvFilter;

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

#[tokio::main]
async fn main() {
    init_tracing();

    let cmd = command_argument_builder();
    let chosen_command = cmd.get_matches();
    let quiet = chosen_command.get_flag("quiet");

    // Show banner unless --quiet flag is set
    if !quiet {
        print_banner();
    }

    let result = match chosen_command.subcommand() {
        Some(("init", primary_command)) => handle_init(primary_command),
        Some(("crawl", primary_command)) => handle_crawl(primary_command, quiet).await,
        Some(("report", primary_command)) => handle_report(primary_command),
        // No subcommand provided, just show the banner
        None => Ok(()),
        _ => unreachable!("clap should ensure we don't get here"),
    };

    if let Err(e) = result {
        eprintln!("{} {:#}", "✗".red().bold(), e);
        std::process::exit(1);
    }
}
