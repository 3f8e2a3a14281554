//! Virtual fitting room.
//!
//! A garment photo plus a demographic category becomes one result image of
//! the garment in a scene. Most categories go through a remote try-on
//! synthesis API; categories marked flat-lay are cut out locally and laid on
//! a surface.

#[macro_use]
extern crate derivative;

pub mod app;
pub mod catalog;
pub mod config;
pub mod dispatcher;
pub mod error;
pub mod secrets;

pub use catalog::{Catalog, Category, CategoryEntry, ProcessingPolicy};
pub use config::Config;
pub use dispatcher::{DispatchSettings, Dispatcher};
pub use error::{Result, TryOnError};

/// Logger with `[time level file line] message` lines, `info` unless
/// `RUST_LOG` says otherwise.
pub fn init_logger() {
    use std::io::Write;

    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .filter_module("ort", log::LevelFilter::Warn)
        .filter_module("reqwest", log::LevelFilter::Warn)
        .format(|buf, record| {
            let style = buf.default_level_style(record.level());
            let ts = chrono::Local::now().format("%H:%M:%S");

            writeln!(
                buf,
                "[{} {style}{}{style:#} {} {}] {}",
                ts,
                record.level(),
                record
                    .file()
                    .unwrap_or("None")
                    .split('/')
                    .next_back()
                    .unwrap_or("None"),
                record.line().unwrap_or(0),
                record.args()
            )
        })
        .init();
}
