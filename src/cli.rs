use std::str::FromStr;

use clap::{App, AppSettings, Arg, ArgMatches, SubCommand};

static VERSION: &str = "0.1.0";
static AUTHOR: &str = "apmaros";
static DESCRIPTION: &str = "Finds, uploads and removes shelter cat photos in the bucket";
const VERIFY: &str = "verify";
const BUCKETS: &str = "buckets";
const PHOTOS: &str = "photos";
const UPLOAD: &str = "upload";
const DELETE: &str = "delete";
pub(crate) const NAME: &str = "name";
const NAME_SHORT: &str = "n";
pub(crate) const MAIN: &str = "main";
pub(crate) const FOLDER: &str = "folder";
const FOLDER_SHORT: &str = "f";
pub(crate) const PAYLOAD: &str = "payload";
const PAYLOAD_SHORT: &str = "p";
pub(crate) const URL: &str = "url";
const URL_SHORT: &str = "u";
pub(crate) const DRY_RUN: &str = "dry-run";

fn name_arg<'a, 'b>(multiple: bool) -> Arg<'a, 'b> {
    Arg::with_name(NAME)
        .short(NAME_SHORT)
        .long(NAME)
        .takes_value(true)
        .multiple(multiple)
        .number_of_values(1)
        .help("Cat name, as shown in the records")
        .required(true)
}

pub(crate) fn build_cli<'a>() -> ArgMatches<'a> {
    App::new("shelter-photos")
        .version(VERSION)
        .author(AUTHOR)
        .about(DESCRIPTION)
        .setting(AppSettings::SubcommandRequiredElseHelp)
        .arg(Arg::with_name(DRY_RUN)
            .long(DRY_RUN)
            .global(true)
            .help("Work against an empty in-memory bucket instead of the configured store"))
        .subcommand(SubCommand::with_name(VERIFY)
            .about("Checks that the photo bucket is reachable"))
        .subcommand(SubCommand::with_name(BUCKETS)
            .about("Lists buckets visible with the configured credentials"))
        .subcommand(SubCommand::with_name(PHOTOS)
            .about("Prints the photo urls of one or more cats")
            .arg(name_arg(true))
            .arg(Arg::with_name(MAIN)
                .long(MAIN)
                .help("Only print the main photo")))
        .subcommand(SubCommand::with_name(UPLOAD)
            .about("Uploads photos for a cat")
            .arg(name_arg(false))
            .arg(Arg::with_name(FOLDER)
                .short(FOLDER_SHORT)
                .long(FOLDER)
                .takes_value(true)
                .help("Local folder whose .jpg files are uploaded"))
            .arg(Arg::with_name(PAYLOAD)
                .short(PAYLOAD_SHORT)
                .long(PAYLOAD)
                .takes_value(true)
                .multiple(true)
                .number_of_values(1)
                .help("Image url or base64 data uri")))
        .subcommand(SubCommand::with_name(DELETE)
            .about("Removes one photo of a cat")
            .arg(name_arg(false))
            .arg(Arg::with_name(URL)
                .short(URL_SHORT)
                .long(URL)
                .takes_value(true)
                .help("Photo url as displayed")
                .required(true)))
        .get_matches()
}

pub(crate) enum CliCommand {
    Verify,
    Buckets,
    Photos,
    Upload,
    Delete,
}

impl FromStr for CliCommand {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            VERIFY => Ok(Self::Verify),
            BUCKETS => Ok(Self::Buckets),
            PHOTOS => Ok(Self::Photos),
            UPLOAD => Ok(Self::Upload),
            DELETE => Ok(Self::Delete),
            other => Err(format!("Command {} was not recognised", other)),
        }
    }
}

impl CliCommand {
    pub(crate) fn to_str(&self) -> &str {
        match self {
            CliCommand::Verify => VERIFY,
            CliCommand::Buckets => BUCKETS,
            CliCommand::Photos => PHOTOS,
            CliCommand::Upload => UPLOAD,
            CliCommand::Delete => DELETE,
        }
    }
}

pub(crate) struct PhotosCmd {
    pub(crate) names: Vec<String>,
    pub(crate) main_only: bool,
}

impl PhotosCmd {
    pub(crate) fn build(matches: &ArgMatches) -> Self {
        let names = matches
            .values_of(NAME)
            .map(|values| values.map(String::from).collect())
            .unwrap_or_default();
        let main_only = matches.is_present(MAIN);

        PhotosCmd { names, main_only }
    }
}

pub(crate) struct UploadCmd {
    pub(crate) name: String,
    pub(crate) folder: Option<String>,
    pub(crate) payloads: Vec<String>,
}

impl UploadCmd {
    pub(crate) fn build(matches: &ArgMatches) -> Self {
        let name = matches.value_of(NAME).unwrap_or_default().to_owned();
        let folder = matches.value_of(FOLDER).map(String::from);
        let payloads = matches
            .values_of(PAYLOAD)
            .map(|values| values.map(String::from).collect())
            .unwrap_or_default();

        UploadCmd { name, folder, payloads }
    }
}

pub(crate) struct DeleteCmd {
    pub(crate) name: String,
    pub(crate) url: String,
}

impl DeleteCmd {
    pub(crate) fn build(matches: &ArgMatches) -> Self {
        let name = matches.value_of(NAME).unwrap_or_default().to_owned();
        let url = matches.value_of(URL).unwrap_or_default().to_owned();

        DeleteCmd { name, url }
    }
}
