use anyhow::{Result, bail};
use compositor::{Layout, compose_files};
use std::{env, path::PathBuf, time::Instant};

// cargo run -p compositor --example compose_demo -- avatar.png background.png [scale]
fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("debug")).init();

    let mut args = env::args().skip(1);
    let (Some(avatar), Some(background)) = (args.next(), args.next()) else {
        bail!("usage: compose_demo <avatar> <background> [scale]");
    };
    let scale = match args.next() {
        Some(scale) => scale.parse::<f64>()?,
        None => 0.85,
    };

    let output = PathBuf::from("./output/composite.png");

    let start = Instant::now();
    compose_files(&avatar, &background, &output, &Layout::bottom(scale, 50))?;
    log::info!("Compose spent: {:?}", start.elapsed());
    log::info!("Saved to: {}", output.display());

    Ok(())
}
