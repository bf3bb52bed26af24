extern crate clap;

use clap::{App, AppSettings, Arg, ArgMatches};
use fixtures::{
    Command, Config, COMMANDS, DEFAULT_OAI_PREFIX, DEFAULT_SCHEMAS_HOST, DEFAULT_STORE_DIRECTORY,
};
use std::env;
use std::ffi::OsStr;
use std::path::Path;
use std::str::FromStr;

type ArgResult = std::result::Result<(), String>;

static DEFAULT_DATA_DIRECTORY: &str = concat!(env!("CARGO_MANIFEST_DIR"), "/../data");

fn valid_data_directory(s: String) -> ArgResult {
    let path = Path::new(OsStr::new(&s));
    fixtures::valid_data_directory(&path)?;
    Ok(())
}

fn path_arg<'a>(args: &'a ArgMatches, name: &str) -> &'a Path {
    let arg = args
        .value_of(name)
        .unwrap_or_else(|| panic!("Failed to get argument --{}", name));
    Path::new(OsStr::new(arg))
}

fn string_arg(args: &ArgMatches, name: &str) -> String {
    args.value_of(name)
        .unwrap_or_else(|| panic!("Failed to get argument --{}", name))
        .to_string()
}

pub fn get_config(args: &ArgMatches) -> Config {
    Config {
        store_directory: path_arg(args, "store").into(),
        data_directory: path_arg(args, "data").into(),
        oai_prefix: string_arg(args, "oai-prefix"),
        schemas_host: string_arg(args, "schemas-host"),
    }
}

// Commands in the order given, clap has already restricted them to known names.
pub fn get_commands(args: &ArgMatches) -> Vec<Command> {
    args.values_of("commands")
        .map(|values| values.filter_map(|value| Command::from_str(value).ok()).collect())
        .unwrap_or_default()
}

pub fn args<'a, 'b>() -> App<'a, 'b> {
    let args: Vec<String> = env::args().collect();
    let program_name = args
        .first()
        .and_then(|arg| Path::new(OsStr::new(arg)).file_name())
        .map(|name| name.to_string_lossy().to_string())
        .unwrap_or_else(|| env!("CARGO_PKG_NAME").to_string());
    App::new(program_name)
    .version(env!("CARGO_PKG_VERSION"))
    .about("\nLoads the CERN Open Data Portal demo fixtures: the collection tree, demo records, vocabulary terms, and the persistent identifiers records are expected to carry. \nExits non-zero if not successful.")
    .setting(AppSettings::ArgRequiredElseHelp)
    .arg(
      Arg::with_name("store")
      .long("store")
      .value_name("DIR")
      .help("Datastore directory, created if it does not exist")
      .env("FIXTURES_STORE")
      .default_value(DEFAULT_STORE_DIRECTORY)
      .takes_value(true)
    )
    .arg(
      Arg::with_name("data")
      .long("data")
      .value_name("DIR")
      .help("Directory containing the MARC21 demo records (*.xml, */*.xml) and terms (terms/*.json)")
      .env("FIXTURES_DATA")
      .default_value(DEFAULT_DATA_DIRECTORY)
      .takes_value(true)
      .validator(valid_data_directory)
    )
    .arg(
      Arg::with_name("oai-prefix")
      .long("oai-prefix")
      .value_name("PREFIX")
      .help("Prefix of OAI identifiers derived from control numbers")
      .env("OAISERVER_ID_PREFIX")
      .default_value(DEFAULT_OAI_PREFIX)
      .takes_value(true)
    )
    .arg(
      Arg::with_name("schemas-host")
      .long("schemas-host")
      .value_name("HOST")
      .help("Host the record and term JSON schemas are published under")
      .env("JSONSCHEMAS_HOST")
      .default_value(DEFAULT_SCHEMAS_HOST)
      .takes_value(true)
    )
    .arg(
      Arg::with_name("verbose")
      .short("v")
      .long("verbose")
      .help("Log debug messages")
      .required(false)
    )
    .arg(
      Arg::with_name("commands")
      .value_name("COMMAND")
      .help("Fixtures to load, run in the order given")
      .possible_values(COMMANDS)
      .multiple(true)
      .required(true)
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn commands_in_order() {
        let matches = args()
            .get_matches_from_safe(vec!["fixtures", "pids", "collections", "pids"])
            .unwrap();
        assert_eq!(
            get_commands(&matches),
            vec![Command::Pids, Command::Collections, Command::Pids]
        );
    }

    #[test]
    fn unknown_command() {
        assert!(args()
            .get_matches_from_safe(vec!["fixtures", "users"])
            .is_err());
    }

    #[test]
    fn options() {
        let matches = args()
            .get_matches_from_safe(vec![
                "fixtures",
                "--store",
                "/tmp/store",
                "--oai-prefix",
                "oai:example.org:",
                "--schemas-host",
                "example.org",
                "records",
            ])
            .unwrap();
        let config = get_config(&matches);
        assert_eq!(&*config.store_directory, Path::new("/tmp/store"));
        assert_eq!(config.oai_prefix, "oai:example.org:");
        assert_eq!(config.schemas_host, "example.org");
        assert!(config.data_directory.is_dir());
        assert!(!matches.is_present("verbose"));
    }
}
