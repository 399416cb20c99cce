use std::sync::Arc;

use gk_core::config::Config;

#[tokio::main]
async fn main() -> Result<(), gk_core::Error> {
    gk_core::logging::init("gk")?;

    let cfg = Arc::new(Config::load()?);

    tokio::select! {
        res = gk_telegram::polling::run_polling(cfg) => {
            res.map_err(|e| gk_core::Error::External(format!("telegram bot failed: {e:#}")))?;
        }
        _ = tokio::signal::ctrl_c() => {
            tracing::info!("interrupted, shutting down");
        }
    }

    Ok(())
}
