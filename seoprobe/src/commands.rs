use clap::{arg, command};
use seoprobe_core::job::SiteTechnology;

pub const CLAP_STYLING: clap::builder::styling::Styles = clap::builder::styling::Styles::styled()
    .header(clap_cargo::style::HEADER)
    .usage(clap_cargo::style::USAGE)
    .literal(clap_cargo::style::LITERAL)
    .placeholder(clap_cargo::style::PLACEHOLDER)
    .error(clap_cargo::style::ERROR)
    .valid(clap_cargo::style::VALID)
    .invalid(clap_cargo::style::INVALID);

pub const DEFAULT_CONFIG_DIR: &str = "~/.config/seoprobe/";
pub const DATABASE_FILE: &str = "seoprobe.db";

fn technology_names() -> Vec<&'static str> {
    SiteTechnology::ALL.iter().map(|t| t.as_str()).collect()
}

fn db_arg() -> clap::Arg {
    arg!(--"db" <PATH>)
        .required(false)
        .help("Database file (default: ~/.config/seoprobe/seoprobe.db)")
        .value_parser(clap::value_parser!(std::path::PathBuf))
}

fn format_arg() -> clap::Arg {
    arg!(-f --"format" <FORMAT>)
        .required(false)
        .help("Report format: text, json")
        .value_parser(["text", "json"])
        .default_value("text")
}

fn output_arg() -> clap::Arg {
    arg!(-o --"output" <PATH>)
        .required(false)
        .help("Save report to file (default: display to screen)")
        .value_parser(clap::value_parser!(std::path::PathBuf))
}

pub fn command_argument_builder() -> clap::Command {
    clap::Command::new("seoprobe")
        .version(env!("CARGO_PKG_VERSION"))
        .bin_name("seoprobe")
        .styles(CLAP_STYLING)
        .arg(
            arg!(-q --"quiet" "Suppress banner and non-essential output")
                .required(false)
                .global(true),
        )
        .subcommand_required(false)
        .subcommand(
            command!("init")
                .about("Initializes the seoprobe database on your filesystem")
                .arg(
                    arg!([PATH])
                        .required(false)
                        .help("Location to store the seoprobe database")
                        .default_value(DEFAULT_CONFIG_DIR),
                )
                .arg(
                    arg!(-f --"force")
                        .help(
                            "Forces the overwriting of any existing database at the specified \
                        location.",
                        )
                        .required(false),
                ),
        )
        .subcommand(
            command!("crawl")
                .about(
                    "Audit a site starting at a seed URL. Stores every analysed page and prints \
                the job report.",
                )
                .arg(
                    arg!(-u --"url" <URL>)
                        .required(true)
                        .help("The seed URL (a bare host gets https://)"),
                )
                .arg(
                    arg!(-s --"scope" <SCOPE>)
                        .required(false)
                        .help("single: only the seed page; multi: follow same-domain links")
                        .value_parser(["single", "multi"])
                        .default_value("single"),
                )
                .arg(
                    arg!(-n --"pages" <NUM_PAGES>)
                        .required(false)
                        .help("Maximum number of pages to analyse with --scope multi (default: 10)")
                        .value_parser(clap::value_parser!(u32).range(1..)),
                )
                .arg(
                    arg!(-t --"tech" <TECHNOLOGY>)
                        .required(false)
                        .help("Website technology, used to tailor recommendations")
                        .value_parser(technology_names()),
                )
                .arg(
                    arg!(-m --"model" <MODEL>)
                        .required(false)
                        .help("Gemini model used for recommendations")
                        .default_value(seoprobe_core::recommend::DEFAULT_GEMINI_MODEL),
                )
                .arg(db_arg())
                .arg(format_arg())
                .arg(output_arg()),
        )
        .subcommand(
            command!("report")
                .about("Render the report of a stored crawl job")
                .arg(arg!(<JOB_ID>).required(true).help("The job identifier"))
                .arg(db_arg())
                .arg(format_arg())
                .arg(output_arg()),
        )
}
