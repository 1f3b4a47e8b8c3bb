use std::{net::SocketAddr, sync::Arc};

use anyhow::{anyhow, Context};
use axum::{
    http::{header, HeaderValue, Method},
    routing::{get, post},
    Router,
};
use remarks_api::Db;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

mod db;
mod error;
mod extractors;
mod fuzz;
mod handlers;

use error::Error;
use extractors::AppState;

static MIGRATOR: sqlx::migrate::Migrator = sqlx::migrate!();

#[derive(structopt::StructOpt)]
struct Opt {
    /// Postgres connection string
    #[structopt(long, env = "DATABASE_URL")]
    database_url: String,

    /// Address to listen on
    #[structopt(long, env = "BIND_ADDR", default_value = "127.0.0.1:3000")]
    bind: SocketAddr,

    /// Origin of the web frontend, allowed to make credentialed requests
    #[structopt(long, env = "ALLOWED_ORIGIN", default_value = "http://127.0.0.1:5173")]
    allowed_origin: String,

    /// Name of the user every session acts as
    #[structopt(long, env = "CURRENT_USER", default_value = "Sally")]
    current_user: String,

    /// Apply database migrations before serving
    #[structopt(long)]
    migrate: bool,
}

pub async fn app(
    db: Arc<dyn Db>,
    current_user: &str,
    allowed_origin: HeaderValue,
) -> anyhow::Result<Router> {
    let user = db
        .find_user_by_name(current_user)
        .await
        .with_context(|| format!("looking up current user {current_user:?}"))?
        .ok_or_else(|| anyhow!("no user named {current_user:?} to act as current user"))?;
    tracing::info!(id = %user.id, name = %user.name, "resolved current user");
    let state = AppState::new(db, user.id)?;

    let cors = CorsLayer::new()
        .allow_origin(allowed_origin)
        .allow_credentials(true)
        .allow_methods([Method::GET, Method::POST])
        .allow_headers([header::CONTENT_TYPE]);

    Ok(Router::new()
        .route("/posts", get(handlers::list_posts))
        .route("/posts/:id", get(handlers::fetch_post))
        .route("/posts/:id/comments", post(handlers::create_comment))
        .layer(axum::middleware::from_fn_with_state(
            state.clone(),
            extractors::session,
        ))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state))
}

async fn create_sqlx_pool(url: &str) -> anyhow::Result<sqlx::PgPool> {
    sqlx::postgres::PgPoolOptions::new()
        .max_connections(8)
        .connect(url)
        .await
        .with_context(|| format!("Error opening database {:?}", url))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // a missing .env file is fine, the environment may already be set up
    let _ = dotenvy::dotenv();
    tracing_subscriber::fmt::init();

    let opt = <Opt as structopt::StructOpt>::from_args();

    let pool = create_sqlx_pool(&opt.database_url).await?;
    if opt.migrate {
        MIGRATOR
            .run(&pool)
            .await
            .context("applying database migrations")?;
        tracing::info!("database migrations applied");
    }

    let allowed_origin = HeaderValue::from_str(&opt.allowed_origin)
        .with_context(|| format!("parsing allowed origin {:?}", opt.allowed_origin))?;
    let app = app(
        Arc::new(db::PostgresDb::new(pool)),
        &opt.current_user,
        allowed_origin,
    )
    .await?;

    tracing::info!("listening on {}", opt.bind);
    axum::Server::bind(&opt.bind)
        .serve(app.into_make_service())
        .await
        .context("serving axum webserver")
}
