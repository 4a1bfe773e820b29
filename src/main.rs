use clap::{App, Arg};
use log::{error, info, LevelFilter};
use postlist::build::build_site;
use postlist::config::Config;
use simplelog::{ColorChoice, TermLogger, TerminalMode};
use std::path::PathBuf;

fn main() {
    let matches = App::new("postlist")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Renders a directory of Markdown documents into a site with a post listing")
        .arg(
            Arg::with_name("input")
                .short("i")
                .long("input")
                .value_name("DIR")
                .takes_value(true)
                .help("Input directory [env: MD_INPUT] [default: input]"),
        )
        .arg(
            Arg::with_name("template")
                .short("t")
                .long("template")
                .value_name("DIR")
                .takes_value(true)
                .help("Template directory [env: MD_TEMPLATE] [default: template]"),
        )
        .arg(
            Arg::with_name("output")
                .short("o")
                .long("output")
                .value_name("DIR")
                .takes_value(true)
                .help("Output directory [env: MD_OUTPUT] [default: output]"),
        )
        .arg(
            Arg::with_name("verbose")
                .short("v")
                .long("verbose")
                .help("Log debug details for every file"),
        )
        .get_matches();

    let level = match matches.is_present("verbose") {
        true => LevelFilter::Debug,
        false => LevelFilter::Info,
    };
    if let Err(e) = TermLogger::init(
        level,
        simplelog::Config::default(),
        TerminalMode::Mixed,
        ColorChoice::Auto,
    ) {
        eprintln!("Failed initializing logger: {}", e);
    }

    let mut config = Config::from_env();
    if let Some(dir) = matches.value_of_os("input") {
        config.input_directory = PathBuf::from(dir);
    }
    if let Some(dir) = matches.value_of_os("template") {
        config.template_directory = PathBuf::from(dir);
    }
    if let Some(dir) = matches.value_of_os("output") {
        config.output_directory = PathBuf::from(dir);
    }

    match build_site(&config) {
        Ok(summary) => info!(
            "Rendered {} page(s), listed {} post(s), copied {} file(s), skipped {}",
            summary.rendered, summary.listed, summary.copied, summary.skipped
        ),
        Err(e) => {
            error!("{}", e);
            std::process::exit(1);
        }
    }
}
