mod app;
mod capture;
mod commands;
mod config;
mod logging;
mod scope;
mod ui;

#[tokio::main]
async fn main() -> Result<(), anyhow::Error> {
    app::run().await
}
