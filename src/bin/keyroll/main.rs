//! keyroll - terminal practice synthesizer
//!
//! Run with: cargo run -- [settings.json]
//!
//! Logs go to `keyroll.log` in the working directory, since the terminal
//! belongs to the UI. Set `RUST_LOG=debug` for more detail.

mod app;
mod ui;

use std::fs::File;

use color_eyre::eyre::{Result as EyreResult, WrapErr};
use keyroll::settings::Settings;

use app::App;

const LOG_FILE: &str = "keyroll.log";

fn main() -> EyreResult<()> {
    color_eyre::install()?;

    let log = File::create(LOG_FILE).wrap_err_with(|| format!("cannot create {}", LOG_FILE))?;
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .target(env_logger::Target::Pipe(Box::new(log)))
        .init();

    let settings = match std::env::args().nth(1) {
        Some(path) => {
            Settings::load(&path).wrap_err_with(|| format!("cannot use settings from {}", path))?
        }
        None => Settings::default(),
    };

    let mut app = App::new(settings)?;
    let mut terminal = ratatui::init();
    let result = app.run(&mut terminal);
    ratatui::restore();
    result
}
