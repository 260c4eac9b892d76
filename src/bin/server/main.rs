use actix_web::middleware::Logger;
use actix_web::{App, HttpServer};
use anyhow::Context;
use canvass::db::{get_db_pool, init_db};
use env_logger::Env;

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    init_lib_mods();
    init_our_mods();

    let database_url = std::env::var("DATABASE_URL").context("DATABASE_URL must be set.")?;
    init_db(database_url).await;

    // Bring the schema up before accepting traffic.
    canvass::schema::install(get_db_pool())
        .await
        .context("Failed to install database schema.")?;

    log::info!("Listening on 0.0.0.0:8080");

    HttpServer::new(move || {
        App::new()
            .wrap(Logger::new("%a %{User-Agent}i"))
            .configure(canvass::web::configure)
    })
    .bind("0.0.0.0:8080")?
    .run()
    .await?;

    Ok(())
}

/// Initialize third party crates we rely on but don't have control over.
pub fn init_lib_mods() {
    dotenv::dotenv().ok();
    env_logger::Builder::from_env(Env::default().default_filter_or("debug")).init();
}

/// Initialize all local mods.
pub fn init_our_mods() {
    canvass::app_config::init();
}
