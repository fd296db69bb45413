use common::database::build::build_database;
use common::database::postgres::build::PgDatabaseBuilder;
use common::database::postgres::Postgres;
use log::error;
use pipeline_engine::config::Config;

#[tokio::main]
async fn main() {
    pipeline_engine::logging::init("pipeline-engine/pe_db_build.log");

    let config = match Config::from_env() {
        Ok(inner) => inner,
        Err(error) => {
            error!("Could not load configuration. {error}");
            return;
        }
    };

    build_database::<PgDatabaseBuilder, Postgres>(config.connect_options()).await
}
