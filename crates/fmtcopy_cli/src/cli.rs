use clap::{ArgAction, Parser, ValueEnum};
use eyre::{Context, Result};
use fmtcopy_io_fs::{EnumFilterMode, EnumNamePatternMode, SpecRunRequest, merge_extension};
use simplelog::LevelFilter;

#[derive(Parser, Debug)]
#[command(name = "fmtcopy")]
#[command(about = "Copy files selected by extension and filename from one directory to another")]
pub struct Cli {
    /// Source directory
    pub source: String,
    /// Destination directory (created if missing)
    pub destination: String,
    /// Comma-separated extensions, e.g. "txt,.docx" (empty = all files)
    #[arg(short = 'e', long = "ext", default_value = "")]
    pub extensions: String,
    /// Add one more extension to the list (repeatable)
    #[arg(long = "add-ext", value_name = "EXT")]
    pub add_extensions: Vec<String>,
    /// Copy files whose extension is NOT in the list
    #[arg(long)]
    pub exclude: bool,
    /// Only copy files whose name contains this text
    #[arg(short = 'n', long = "name", default_value = "")]
    pub name: String,
    /// How --name is interpreted
    #[arg(long, value_enum, default_value_t = NameMode::Literal)]
    pub name_mode: NameMode,
    /// Include subdirectories and mirror their structure
    #[arg(short, long)]
    pub recursive: bool,
    /// Replace files that already exist at the destination
    #[arg(long)]
    pub overwrite: bool,
    /// Do not draw a progress bar
    #[arg(long)]
    pub no_progress: bool,
    /// More log output (-v debug, -vv trace)
    #[arg(short, long, action = ArgAction::Count)]
    pub verbose: u8,
    /// Only log warnings and errors
    #[arg(short, long, conflicts_with = "verbose")]
    pub quiet: bool,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
pub enum NameMode {
    /// Case-insensitive substring
    Literal,
    /// Shell wildcard matched against the whole name
    Glob,
    /// Regular expression searched in the name
    Regex,
}

impl From<NameMode> for EnumNamePatternMode {
    fn from(mode: NameMode) -> Self {
        match mode {
            NameMode::Literal => EnumNamePatternMode::Literal,
            NameMode::Glob => EnumNamePatternMode::Glob,
            NameMode::Regex => EnumNamePatternMode::Regex,
        }
    }
}

impl Cli {
    /// Extension list with every `--add-ext` merged in.
    pub fn extension_list(&self) -> String {
        self.add_extensions
            .iter()
            .fold(self.extensions.clone(), |acc, ext| merge_extension(&acc, ext))
    }

    pub fn to_request(&self) -> Result<SpecRunRequest> {
        let rule_filter = if self.exclude {
            EnumFilterMode::Exclude
        } else {
            EnumFilterMode::Include
        };
        SpecRunRequest::from_raw(
            &self.source,
            &self.destination,
            &self.extension_list(),
            rule_filter,
            &self.name,
            self.name_mode.into(),
            self.recursive,
            self.overwrite,
        )
        .wrap_err("invalid copy request")
    }

    pub fn log_level(&self) -> LevelFilter {
        if self.quiet {
            return LevelFilter::Warn;
        }
        match self.verbose {
            0 => LevelFilter::Info,
            1 => LevelFilter::Debug,
            _ => LevelFilter::Trace,
        }
    }

    pub fn show_progress(&self) -> bool {
        !self.no_progress && !self.quiet
    }
}

#[cfg(test)]
mod tests {
    use super::{Cli, NameMode};
    use clap::{CommandFactory, Parser};
    use fmtcopy_io_fs::{EnumFilterMode, EnumNamePatternMode};
    use simplelog::LevelFilter;

    #[test]
    fn command_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn defaults_map_to_include_flat_no_overwrite() {
        let cli = Cli::try_parse_from(["fmtcopy", "in", "out"]).expect("parse");
        let spec_run_request = cli.to_request().expect("request");
        assert_eq!(spec_run_request.spec_filter.rule_filter, EnumFilterMode::Include);
        assert!(spec_run_request.spec_filter.extensions.is_empty());
        assert!(spec_run_request.spec_filter.name_contains.is_none());
        assert!(!spec_run_request.spec_cp_options.if_recursive);
        assert!(!spec_run_request.spec_cp_options.if_overwrite);
        assert_eq!(cli.log_level(), LevelFilter::Info);
        assert!(cli.show_progress());
    }

    #[test]
    fn flags_map_onto_request() {
        let cli = Cli::try_parse_from([
            "fmtcopy",
            "in",
            "out",
            "--ext",
            "TXT, csv",
            "--add-ext",
            ".pdf",
            "--add-ext",
            ".pdf",
            "--exclude",
            "--name",
            "Report",
            "--name-mode",
            "glob",
            "-r",
            "--overwrite",
            "-vv",
        ])
        .expect("parse");
        assert_eq!(cli.name_mode, NameMode::Glob);
        assert_eq!(cli.extension_list(), "TXT, csv,.pdf");

        let spec_run_request = cli.to_request().expect("request");
        assert_eq!(
            spec_run_request
                .spec_filter
                .extensions
                .iter()
                .cloned()
                .collect::<Vec<_>>(),
            vec![".csv", ".pdf", ".txt"]
        );
        assert_eq!(spec_run_request.spec_filter.rule_filter, EnumFilterMode::Exclude);
        assert_eq!(
            spec_run_request.spec_filter.rule_name_pattern,
            EnumNamePatternMode::Glob
        );
        assert_eq!(spec_run_request.spec_filter.name_contains.as_deref(), Some("Report"));
        assert!(spec_run_request.spec_cp_options.if_recursive);
        assert!(spec_run_request.spec_cp_options.if_overwrite);
        assert_eq!(cli.log_level(), LevelFilter::Trace);
    }

    #[test]
    fn quiet_conflicts_with_verbose() {
        assert!(Cli::try_parse_from(["fmtcopy", "in", "out", "-q", "-v"]).is_err());
        let cli = Cli::try_parse_from(["fmtcopy", "in", "out", "-q"]).expect("parse");
        assert_eq!(cli.log_level(), LevelFilter::Warn);
        assert!(!cli.show_progress());
    }

    #[test]
    fn blank_source_is_rejected() {
        let cli = Cli::try_parse_from(["fmtcopy", " ", "out"]).expect("parse");
        assert!(cli.to_request().is_err());
    }
}
