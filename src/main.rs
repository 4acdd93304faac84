use std::{
    fs::{self, File},
    io::{BufWriter, Write},
    path::{Path, PathBuf},
    process::ExitCode,
};

use anyhow::Context;
use clap::Parser;
use commonfrags::{
    depict::{Depictor, Svg, PER_ROW},
    io::{read_dataset, write_table},
    Backend, Config, Error, FragmentCounter, FrequencyTable, Report,
};
use log::{error, info, warn};

/// Find the most common BRICS fragments in a SMILES dataset
#[derive(Parser)]
#[command(name = "commonfrags", version)]
struct Cli {
    /// CSV file with a SMILES column, or a QCArchive .json export
    dataset: PathBuf,

    /// how many of the most common fragments to report
    #[arg(short, long, value_name = "N")]
    nfrags: Option<usize>,

    /// only count fragments with more heavy atoms than this
    #[arg(short, long, value_name = "M", allow_negative_numbers = true)]
    minheavyatoms: Option<i64>,

    /// draw the reported fragments to an SVG grid
    #[arg(short = 'o', long)]
    output_svg: bool,

    /// where to write the full frequency table
    #[arg(long, value_name = "FILE")]
    csv_out: Option<PathBuf>,

    /// where to write the SVG grid
    #[arg(long, value_name = "FILE")]
    svg_out: Option<PathBuf>,

    /// name of the SMILES column in a CSV dataset
    #[arg(long, value_name = "NAME")]
    smiles_column: Option<String>,

    #[arg(long, value_enum)]
    backend: Option<Backend>,

    /// JSON file of settings, overridden by any flags given here
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,
}

impl Cli {
    fn config(&self) -> anyhow::Result<Config> {
        let mut config = match &self.config {
            Some(path) => Config::load(path)
                .with_context(|| format!("failed to load config from {}", path.display()))?,
            None => Config::default(),
        };
        if let Some(n) = self.nfrags {
            config.nfrags = n;
        }
        if let Some(m) = self.minheavyatoms {
            config.min_heavy_atoms = m;
        }
        if self.output_svg {
            config.render_image = true;
        }
        if let Some(path) = &self.csv_out {
            config.csv_out = path.clone();
        }
        if let Some(path) = &self.svg_out {
            config.svg_out = path.clone();
        }
        if let Some(column) = &self.smiles_column {
            config.smiles_column = column.clone();
        }
        if let Some(backend) = self.backend {
            config.backend = backend;
        }
        Ok(config)
    }
}

type Tools = (FragmentCounter, Box<dyn Depictor>);

#[cfg(feature = "rdkit")]
fn backend(backend: Backend) -> Result<Tools, Error> {
    use commonfrags::rdkit::Rdkit;
    let tools: Tools = match backend {
        Backend::Native => (FragmentCounter::default(), Box::new(Svg)),
        Backend::Rdkit => (FragmentCounter::new(Rdkit, Rdkit), Box::new(Rdkit)),
    };
    Ok(tools)
}

#[cfg(not(feature = "rdkit"))]
fn backend(backend: Backend) -> Result<Tools, Error> {
    match backend {
        Backend::Native => {
            let tools: Tools = (FragmentCounter::default(), Box::new(Svg));
            Ok(tools)
        }
        Backend::Rdkit => Err(Error::BackendUnavailable("rdkit")),
    }
}

/// write the frequency table to `path`. flushed here, so a failed write is
/// reported instead of lost when the writer is dropped
fn write_csv(path: &Path, table: &FrequencyTable) -> anyhow::Result<()> {
    let f = File::create(path)
        .with_context(|| format!("failed to create {}", path.display()))?;
    let mut w = BufWriter::new(f);
    write_table(&mut w, table)?;
    w.flush()
        .with_context(|| format!("failed to write {}", path.display()))?;
    Ok(())
}

fn run(cli: Cli) -> anyhow::Result<()> {
    let config = cli.config()?;
    let (counter, depictor) = backend(config.backend)?;

    let smiles = read_dataset(&cli.dataset, &config.smiles_column)
        .with_context(|| format!("failed to read {}", cli.dataset.display()))?;
    let table = counter.count_fragments(&smiles, config.min_heavy_atoms)?;

    write_csv(&config.csv_out, &table)?;
    info!("wrote {} fragments to {}", table.len(), config.csv_out.display());

    let report = Report::new(&table, config.nfrags, config.min_heavy_atoms);
    if config.render_image {
        let (frags, legends): (Vec<&str>, Vec<String>) = report
            .entries()
            .iter()
            .map(|&(smiles, count)| (smiles, count.to_string()))
            .unzip();
        let svg = depictor.grid_svg(&frags, &legends, PER_ROW)?;
        fs::write(&config.svg_out, svg)
            .with_context(|| format!("failed to write {}", config.svg_out.display()))?;
        info!("drew {} fragments to {}", frags.len(), config.svg_out.display());
    }

    if report.is_short() {
        warn!(
            "only {} fragments have more than {} heavy atoms, asked for {}",
            report.found(),
            config.min_heavy_atoms,
            config.nfrags
        );
    }
    print!("{report}");
    Ok(())
}

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .init();
    match run(Cli::parse()) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{e:#}");
            ExitCode::FAILURE
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flags_override_defaults() {
        let cli = Cli::parse_from(["commonfrags", "data.csv", "-n", "3", "-m", "-1", "-o"]);
        let config = cli.config().unwrap();
        assert_eq!(config.nfrags, 3);
        assert_eq!(config.min_heavy_atoms, -1);
        assert!(config.render_image);
        assert_eq!(config.csv_out, PathBuf::from("fragment_freq.csv"));
    }

    #[test]
    fn csv_is_complete_on_return() {
        let table: FrequencyTable = [("c1ccccc1", 3), ("CCO", 1)]
            .into_iter()
            .map(|(k, v)| (k.to_owned(), v))
            .collect();
        let path = std::env::temp_dir()
            .join(format!("commonfrags-{}-table.csv", std::process::id()));
        write_csv(&path, &table).unwrap();
        let got = fs::read_to_string(&path).unwrap();
        fs::remove_file(&path).unwrap();
        assert_eq!(got, "Frag_Smiles,Frag_Frequency\nc1ccccc1,3\nCCO,1\n");
    }

    #[test]
    fn cli_is_consistent() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }
}
