use clap::{Parser, Subcommand};

/// Imports Survey Master and Question Master data sets into the survey store.
#[derive(Parser, Debug, Clone)]
#[clap(author, version, about, long_about = None)]
pub struct Args {
    /// (file path, optional) A JSON configuration file with the locations of the store and of the
    /// upload directory. Relative paths in the file are resolved against the directory of the file.
    #[clap(short, long, value_parser, global = true)]
    pub config: Option<String>,

    /// (file path) The JSON store. Overrides the value from --config. Defaults to data/store.json
    #[clap(long, value_parser, global = true)]
    pub store: Option<String>,

    /// (directory) Scratch space where uploaded files are staged during an import.
    /// Overrides the value from --config. Defaults to uploads
    #[clap(long, value_parser, global = true)]
    pub upload_dir: Option<String>,

    // Other arguments
    /// If passed as an argument, will turn on verbose logging to the standard output.
    #[clap(long, takes_value = false, global = true)]
    pub verbose: bool,

    #[clap(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Imports a workbook (.xlsx, .xls, .xlsb, .ods) or a delimited text file (.csv, .tsv).
    Import {
        /// (file path) The file to import.
        #[clap(value_parser)]
        file: String,

        /// Replaces the surveys (and their questions) that already exist in the store instead of
        /// rejecting the import.
        #[clap(long, takes_value = false)]
        overwrite: bool,

        /// (survey, question or both; default both) What a delimited text file contains. With
        /// 'both', the content is detected from the header row. Ignored for workbooks.
        #[clap(long, value_parser)]
        kind: Option<String>,

        /// (file path, 'stdout' or empty) If specified, the result of the import is written in
        /// JSON format to the given location.
        #[clap(short, long, value_parser)]
        out: Option<String>,
    },
    /// Lists the surveys in the store.
    List,
}
