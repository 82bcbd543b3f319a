use std::ffi::OsString;
use std::path::PathBuf;

pub use clap::Parser;

#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct ClapArgs {
    /// Config file. Defaults to $SHOWCASE_CONFIG_PATH, then ~/.showcase/config.json
    #[clap(short = 'c', long, help = "config file path")]
    config: Option<String>,

    /// Content JSON file. Overrides the config file's content path.
    #[clap(long, help = "content file path")]
    content: Option<String>,

    /// Path to navigate to once the application is running
    #[clap(short = 'n', long, help = "path to navigate to after startup")]
    navigate: Option<String>,

    /// Directory that receives one HTML file per rendered container
    #[clap(short = 'o', long, help = "output directory for rendered containers")]
    out: Option<PathBuf>,

    #[clap(long, help = "disable the view render cache")]
    no_cache: bool,

    #[clap(short = 'v', long, help = "verbose logging")]
    verbose: bool,
}

#[derive(Debug, Clone)]
pub struct CommandLineArgs {
    config: Option<String>,
    content: Option<String>,
    navigate: Option<String>,
    out: Option<PathBuf>,
    no_cache: bool,
    verbose: bool,
}

impl From<ClapArgs> for CommandLineArgs {
    fn from(args: ClapArgs) -> Self {
        Self {
            config: args.config,
            content: args.content,
            navigate: args.navigate,
            out: args.out,
            no_cache: args.no_cache,
            verbose: args.verbose,
        }
    }
}

impl CommandLineArgs {
    pub fn parse() -> Self {
        ClapArgs::parse().into()
    }

    pub fn parse_from<I, T>(itr: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<OsString> + Clone,
    {
        ClapArgs::parse_from(itr).into()
    }

    pub fn config(&self) -> Option<&str> {
        self.config.as_deref()
    }

    pub fn content(&self) -> Option<&str> {
        self.content.as_deref()
    }

    pub fn navigate(&self) -> Option<&str> {
        self.navigate.as_deref()
    }

    pub fn out(&self) -> Option<&PathBuf> {
        self.out.as_ref()
    }

    pub fn no_cache(&self) -> bool {
        self.no_cache
    }

    pub fn verbose(&self) -> bool {
        self.verbose
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_default_values() {
        let args = CommandLineArgs::parse_from(["program"]);
        assert_eq!(args.config(), None);
        assert_eq!(args.content(), None);
        assert_eq!(args.navigate(), None);
        assert!(args.out().is_none());
        assert!(!args.no_cache());
        assert!(!args.verbose());
    }

    #[test]
    fn test_parse_args_long_flags() {
        let args = CommandLineArgs::parse_from([
            "program",
            "--config",
            "/tmp/config.json",
            "--content",
            "content.json",
            "--navigate",
            "/about",
            "--out",
            "site",
            "--no-cache",
            "--verbose",
        ]);
        assert_eq!(args.config(), Some("/tmp/config.json"));
        assert_eq!(args.content(), Some("content.json"));
        assert_eq!(args.navigate(), Some("/about"));
        assert_eq!(args.out(), Some(&PathBuf::from("site")));
        assert!(args.no_cache());
        assert!(args.verbose());
    }

    #[test]
    fn test_parse_args_short_flags() {
        let args = CommandLineArgs::parse_from(["program", "-c", "dev.json", "-n", "/", "-v"]);
        assert_eq!(args.config(), Some("dev.json"));
        assert_eq!(args.navigate(), Some("/"));
        assert!(args.verbose());
    }
}
