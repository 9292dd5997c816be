//! Puts the Fabric admin identity into the wallet so the server can leave
//! mock mode.

use landchain_backend::config::AppConfig;
use landchain_backend::fabric::enroll::{enroll_admin, EnrollOutcome};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    if std::env::var("RUST_LOG").is_err() {
        std::env::set_var("RUST_LOG", "info");
    }
    env_logger::init();

    let config = AppConfig::load()?.enroll();
    log::info!("Enrolling admin identity '{}' for {}", config.identity, config.org);

    match enroll_admin(&config) {
        Ok(EnrollOutcome::AlreadyEnrolled) => {
            log::info!("Admin identity already exists in wallet");
        }
        Ok(EnrollOutcome::Imported(path)) => {
            log::info!("Admin identity imported to wallet: {}", path.display());
        }
        Err(e) => {
            log::error!("Failed to enroll admin: {}", e);
            return Err(e.into());
        }
    }
    Ok(())
}
