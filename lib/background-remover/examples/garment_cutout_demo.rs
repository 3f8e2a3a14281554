use anyhow::{Context, Result};
use background_remover::{BackgroundRemover, Model, RemoveBackground};
use std::{env, fs, path::PathBuf, time::Instant};

// cargo run -p background-remover --example garment_cutout_demo -- garment.jpg [model]
fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let mut args = env::args().skip(1);
    let input_file = PathBuf::from(args.next().unwrap_or_else(|| "./garment.jpg".to_string()));
    let model = match args.next() {
        Some(name) => name.parse::<Model>()?,
        None => Model::default(),
    };

    let output_dir = PathBuf::from("./output");
    fs::create_dir_all(&output_dir)?;

    let img = image::open(&input_file).with_context(|| input_file.display().to_string())?;
    log::info!("Garment size: {}x{}", img.width(), img.height());

    let mut remover = BackgroundRemover::from_dir(model, "./models")?;

    let start = Instant::now();
    let cutout = remover.remove_background(&img)?;
    log::info!("Remove background spent: {:?}", start.elapsed());

    let stem = input_file
        .file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_else(|| "garment".to_string());
    let output_path = output_dir.join(format!("{stem}_cutout.png"));
    cutout.save(&output_path)?;
    log::info!("Saving cut-out to: {}", output_path.display());

    Ok(())
}
