//! Quick commandline utility to download registered data files into the local data directory.
//!
//! Prints the local path of every fetched file, one per line, so the output can
//! be fed to other tools.

use std::error::Error;
use std::path::PathBuf;

use clap::Parser;
use log::info;

use shiftnii::fetch::{
    registered_files, DataFetcher, FetchConfig, DEFAULT_BASE_URL, DEFAULT_DATA_DIR,
};

// use clap to create commandline interface
#[derive(Parser, Debug)]
#[command(author, about, version, long_about)]
struct Args {
    /// names of the data files to fetch; all registered files if none are given
    names: Vec<String>,

    /// list the registered data files and exit
    #[arg(short, long)]
    list: bool,

    /// directory fetched data files are kept in
    #[arg(short, long, env = "SHIFTNII_DATA_DIR", default_value = DEFAULT_DATA_DIR)]
    data_dir: PathBuf,

    /// where data files are downloaded from
    #[arg(short, long, env = "SHIFTNII_BASE_URL", default_value = DEFAULT_BASE_URL)]
    base_url: String,

    /// download again even if the files are cached
    #[arg(short, long)]
    force: bool,
}

fn main() -> Result<(), Box<dyn Error + Sync + Send>> {
    let env = env_logger::Env::default().filter_or("RUST_LOG", "info");
    env_logger::init_from_env(env);

    let cli = Args::parse();

    if cli.list {
        for file in registered_files() {
            let checksum = file.sha256.unwrap_or("-");
            println!("{}\t{}\t{}", file.name, checksum, file.description);
        }
        return Ok(());
    }

    let names: Vec<String> = if cli.names.is_empty() {
        registered_files()
            .iter()
            .map(|f| f.name.to_string())
            .collect()
    } else {
        cli.names
    };

    let fetcher = DataFetcher::new(FetchConfig {
        data_dir: cli.data_dir,
        base_url: cli.base_url,
        force: cli.force,
    });
    info!("Data directory: {}", fetcher.data_dir().display());
    for name in names {
        let path = fetcher.fetch_file(&name)?;
        println!("{}", path.display());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn verify_cli() {
        use clap::CommandFactory;
        Args::command().debug_assert();
    }

    #[test]
    fn list_flag() {
        let args = Args::try_parse_from(["fetchnii", "--list"]).unwrap();
        assert!(args.list);
        assert!(args.names.is_empty());
        assert!(!args.force);
    }

    #[test]
    fn names_and_options() {
        let args = Args::try_parse_from([
            "fetchnii",
            "-d",
            "/tmp/cache",
            "--force",
            "ds108_sub001_t1r1.nii",
        ])
        .unwrap();
        assert!(!args.list);
        assert!(args.force);
        assert_eq!(args.names, vec!["ds108_sub001_t1r1.nii".to_string()]);
        assert_eq!(args.data_dir, PathBuf::from("/tmp/cache"));
    }
}
