use clap::Parser;
use plainweb::{assemble, config, context::Site, output, scaffold};
use std::path::PathBuf;

fn version_string() -> &'static str {
    if env!("PLAINWEB_RELEASE") == "true" {
        env!("CARGO_PKG_VERSION")
    } else {
        let hash = env!("PLAINWEB_GIT_HASH");
        if hash.is_empty() {
            "dev@unknown"
        } else {
            // Leaked once at startup
            Box::leak(format!("dev@{hash}").into_boxed_str())
        }
    }
}

#[derive(Parser)]
#[command(name = "plainweb")]
#[command(about = "Static site generator driven by a tiny directive language")]
#[command(long_about = "\
Static site generator driven by a tiny directive language

The root manifest lists elements separated by blank lines. Each line is a
two-letter code followed by its content:

  index
  ├── ww /projects         # output route
  ├── tt Projects          # title
  ├── bb Things I built    # brief (markdown)
  ├── cf projects          # embed the `projects` listicle
  └── cc projects          # ...and publish it as an RSS feed

Listicle entries can pull in markdown (md), mirror git repositories (gt),
copy directories (cp) or files (vb), and write redirects (mv) or aliases (as).
Codes can be remapped in the `symbols` file.

A missing index is scaffolded with a working example site.
Run 'plainweb --gen-config' to print a documented config.toml.")]
#[command(version = version_string())]
struct Cli {
    /// Source directory holding the index, listicles and templates
    #[arg(long, default_value = ".")]
    source: PathBuf,

    /// Output directory
    #[arg(long)]
    out: Option<String>,

    /// Stylesheet copied to <out>/style.css
    #[arg(long)]
    css: Option<String>,

    /// Canonical URL of the hosted site, required for RSS feeds
    #[arg(long)]
    url: Option<String>,

    /// Print diagnostics and the build summary
    #[arg(short, long)]
    verbose: bool,

    /// Emit open-graph tags and preview images
    #[arg(long)]
    generate_previews: bool,

    /// Print a stock config.toml with all options documented
    #[arg(long)]
    gen_config: bool,
}

impl Cli {
    /// Flags win over `config.toml`.
    fn apply(&self, config: &mut config::SiteConfig) {
        if let Some(out) = &self.out {
            config.out = out.clone();
        }
        if let Some(css) = &self.css {
            config.css = css.clone();
        }
        if let Some(url) = &self.url {
            config.url = Some(url.clone());
        }
        config.verbose |= self.verbose;
        config.generate_previews |= self.generate_previews;
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    if cli.gen_config {
        print!("{}", config::stock_config_toml());
        return Ok(());
    }

    let mut site_config = config::load_config(&cli.source)?;
    cli.apply(&mut site_config);
    site_config.validate()?;
    init_logger(site_config.verbose)?;

    std::fs::create_dir_all(&cli.source)?;
    let created = scaffold::populate(&cli.source, &site_config)?;
    let verbose = site_config.verbose;
    if verbose {
        output::print_scaffold_output(&created, &cli.source);
    }

    let mut site = Site::new(&cli.source, site_config)?;
    let report = assemble::build_site(&mut site)?;
    if verbose {
        output::print_build_output(&report, &site.out);
    }

    Ok(())
}

/// Debug-level narration in verbose mode, warnings otherwise.
fn init_logger(verbose: bool) -> Result<(), log::SetLoggerError> {
    let level = if verbose {
        log::LevelFilter::Debug
    } else {
        log::LevelFilter::Warn
    };
    simple_logger::SimpleLogger::new()
        .with_level(level)
        .init()
}
