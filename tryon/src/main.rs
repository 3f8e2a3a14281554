use anyhow::{Result, bail};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tryon::{Category, Config, app};

#[derive(Parser, Debug)]
#[command(name = "tryon", version, about = "Virtual fitting room")]
struct Cli {
    /// Config file, defaults to the platform config dir.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List the configured categories.
    Categories,

    /// List the scenes of a category.
    Scenes {
        /// Category tag, e.g. `femme`.
        category: String,
    },

    /// Render a garment in a scene.
    Generate {
        /// Garment photo.
        #[arg(long)]
        garment: PathBuf,

        /// Category tag, e.g. `femme`.
        #[arg(long)]
        category: String,

        /// Scene name; a random scene of the category when omitted.
        #[arg(long)]
        scene: Option<String>,
    },

    /// Pre-compose the avatar scene images listed in the config.
    Bake,
}

#[tokio::main]
async fn main() {
    tryon::init_logger();

    if let Err(e) = run(Cli::parse()).await {
        eprintln!("{e}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<()> {
    let config = Config::init(cli.config)?;

    match cli.cmd {
        Command::Categories => {
            for category in app::load_catalog(&config)?.categories() {
                println!("{category}\t{}", category.label());
            }
        }
        Command::Scenes { category } => {
            let category = Category::from_tag(&category)?;
            for scene in app::load_catalog(&config)?.scenes_for(category) {
                println!("{scene}");
            }
        }
        Command::Generate {
            garment,
            category,
            scene,
        } => {
            let category = Category::from_tag(&category)?;
            let dispatcher = app::build_dispatcher(&config)?;
            let output =
                app::generate_from_upload(&dispatcher, &garment, category, scene.as_deref()).await?;
            println!("{}", output.display());
        }
        Command::Bake => {
            let outcomes = compositor::bake(&config.bake_jobs());
            let failed = outcomes.iter().filter(|o| !o.is_ok()).count();
            if failed > 0 {
                bail!("{failed} of {} bake jobs failed", outcomes.len());
            }
        }
    }

    Ok(())
}
