mod auth;
mod config;
mod database;
mod db;
mod error;
mod middleware;
mod models;
mod routes;
mod service;

#[cfg(test)]
pub mod test_utils;

pub use config::Config;

use crate::database::postgres_repository::PostgresRepository;
use crate::database::session::SessionSource;
use crate::db::stage_db;
use crate::middleware::RequestLogger;
use crate::routes as app_routes;
use crate::service::directory::Directory;
use crate::service::feed::{PollerHandle, SessionFeed};
use crate::service::schedule::LivenessPolicy;
use rocket::fairing::AdHoc;
use rocket::{Build, Rocket, catchers, http::Method};
use rocket_cors::{AllowedOrigins, CorsOptions};
use rocket_okapi::swagger_ui::{SwaggerUIConfig, make_swagger_ui};
use rocket_okapi::{get_openapi_route, okapi::merge::marge_spec_list};
use sqlx::PgPool;
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

fn init_tracing(log_level: &str, json_format: bool) {
    // RUST_LOG takes precedence, e.g. RUST_LOG=info,ictpl_portal::service::feed=debug
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(log_level));

    let subscriber = tracing_subscriber::fmt().with_env_filter(filter).with_target(true).with_line_number(true);

    // A subscriber may already be installed when several rockets are built in one process.
    let _ = if json_format { subscriber.json().try_init() } else { subscriber.try_init() };
}

fn ensure_rocket_secret_key() {
    let profile = std::env::var("ROCKET_PROFILE").unwrap_or_else(|_| "debug".to_string());

    // Private member cookies need a stable key outside of debug builds
    if profile != "debug" && std::env::var("ROCKET_SECRET_KEY").is_err() {
        panic!(
            "ROCKET_SECRET_KEY is required for profile '{}'. Generate one with: openssl rand -base64 32",
            profile
        );
    }
}

fn build_cors(cors_config: &config::CorsConfig) -> CorsOptions {
    let is_wildcard = cors_config.allowed_origins.len() == 1 && cors_config.allowed_origins[0] == "*";

    if is_wildcard && cors_config.allow_credentials {
        panic!(
            "Invalid CORS configuration: Cannot use wildcard origins (*) with credentials enabled. \
            Either set specific origins or disable credentials."
        );
    }

    let allowed_origins = if cors_config.allowed_origins.is_empty() {
        AllowedOrigins::some_exact::<&str>(&[])
    } else if is_wildcard {
        AllowedOrigins::all()
    } else {
        AllowedOrigins::some_exact(&cors_config.allowed_origins.iter().map(String::as_str).collect::<Vec<_>>())
    };

    CorsOptions {
        allowed_origins,
        allowed_methods: vec![Method::Get, Method::Post, Method::Options, Method::Head]
            .into_iter()
            .map(From::from)
            .collect(),
        allowed_headers: rocket_cors::AllowedHeaders::some(&["Content-Type", "Accept"]),
        allow_credentials: cors_config.allow_credentials,
        ..Default::default()
    }
}

fn normalize_base_path(raw: &str) -> String {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return config::DEFAULT_API_BASE_PATH.to_string();
    }

    let mut normalized = if trimmed.starts_with('/') {
        trimmed.to_string()
    } else {
        format!("/{}", trimmed)
    };

    while normalized.ends_with('/') && normalized.len() > 1 {
        normalized.pop();
    }

    normalized
}

fn join_base_path(base_path: &str, path: &str) -> String {
    let base = base_path.trim_end_matches('/');
    let suffix = path.trim_start_matches('/');

    if base.is_empty() {
        format!("/{}", suffix)
    } else {
        format!("{}/{}", base, suffix)
    }
}

struct RouteSpec {
    path: &'static str,
    routes: Vec<rocket::Route>,
    openapi: rocket_okapi::okapi::openapi3::OpenApi,
}

fn collect_route_specs() -> Vec<RouteSpec> {
    let (health_routes, health_openapi) = app_routes::health::routes();
    let (member_routes, member_openapi) = app_routes::member::routes();
    let (session_routes, session_openapi) = app_routes::session::routes();
    let (exam_schedule_routes, exam_schedule_openapi) = app_routes::exam_schedule::routes();

    vec![
        RouteSpec {
            path: "/health",
            routes: health_routes,
            openapi: health_openapi,
        },
        RouteSpec {
            path: "/members",
            routes: member_routes,
            openapi: member_openapi,
        },
        RouteSpec {
            path: "/sessions",
            routes: session_routes,
            openapi: session_openapi,
        },
        RouteSpec {
            path: "/exam-schedule",
            routes: exam_schedule_routes,
            openapi: exam_schedule_openapi,
        },
    ]
}

fn mount_api_routes(mut rocket: Rocket<Build>, base_path: &str, enable_swagger: bool) -> Rocket<Build> {
    let route_specs = collect_route_specs();

    if !enable_swagger {
        for spec in route_specs {
            rocket = rocket.mount(join_base_path(base_path, spec.path), spec.routes);
        }
        return rocket;
    }

    let mut openapi_list = Vec::new();
    for spec in route_specs {
        rocket = rocket.mount(join_base_path(base_path, spec.path), spec.routes);
        openapi_list.push((spec.path, spec.openapi));
    }

    let openapi_docs = match marge_spec_list(&openapi_list) {
        Ok(docs) => docs,
        Err(err) => panic!("Could not merge OpenAPI spec: {}", err),
    };

    let settings = rocket_okapi::settings::OpenApiSettings::default();
    rocket = rocket.mount(base_path, vec![get_openapi_route(openapi_docs, &settings)]);

    let openapi_url = join_base_path(base_path, "openapi.json");
    rocket.mount(
        join_base_path(base_path, "docs"),
        make_swagger_ui(&SwaggerUIConfig {
            url: openapi_url,
            ..Default::default()
        }),
    )
}

fn stage_directory(names_path: PathBuf) -> AdHoc {
    AdHoc::on_ignite("Member Directory", move |rocket| async move {
        let directory = Directory::load_or_empty(&names_path);
        rocket.manage(Arc::new(directory))
    })
}

/// Builds the session feed on top of the database pool and starts polling.
/// Must be attached after [`stage_db`].
fn stage_session_feed(sessions_config: config::SessionsConfig) -> AdHoc {
    AdHoc::try_on_ignite("Session Feed", move |rocket| async move {
        let policy = match LivenessPolicy::from_config(&sessions_config) {
            Ok(policy) => policy,
            Err(err) => {
                tracing::error!(error = %err, "invalid session settings");
                return Err(rocket);
            }
        };

        let Some(pool) = rocket.state::<PgPool>().cloned() else {
            tracing::error!("session feed needs the database pool");
            return Err(rocket);
        };

        let source: Arc<dyn SessionSource> = Arc::new(PostgresRepository { pool });
        let feed = Arc::new(SessionFeed::new(source, policy, &sessions_config));
        let poller = Arc::clone(&feed).spawn_polling();

        Ok(rocket.manage(feed).manage(poller))
    })
}

fn stage_poller_shutdown() -> AdHoc {
    AdHoc::on_shutdown("Session Poller", |rocket| {
        Box::pin(async move {
            if let Some(poller) = rocket.state::<PollerHandle>() {
                poller.stop();
            }
        })
    })
}

fn rocket_figment(server: &config::ServerConfig) -> rocket::figment::Figment {
    rocket::Config::figment()
        .merge(("port", server.port))
        .merge(("address", server.address.as_str()))
}

pub fn build_rocket(config: Config) -> Rocket<Build> {
    init_tracing(&config.logging.level, config.logging.json_format);
    ensure_rocket_secret_key();

    let cors = build_cors(&config.cors).to_cors().expect("Failed to create CORS fairing");
    let base_path = normalize_base_path(&config.api.base_path);
    let enable_swagger = config.api.enable_swagger;

    let mut rocket = rocket::custom(rocket_figment(&config.server))
        .attach(cors)
        .attach(RequestLogger)
        .attach(stage_db(config.database.clone()))
        .attach(stage_directory(PathBuf::from(&config.directory.names_path)))
        .attach(stage_session_feed(config.sessions.clone()))
        .attach(stage_poller_shutdown());

    rocket = mount_api_routes(rocket, &base_path, enable_swagger);

    rocket
        .register(
            base_path.as_str(),
            catchers![
                app_routes::error::unauthorized,
                app_routes::error::not_found,
                app_routes::error::unprocessable_entity,
                app_routes::error::internal_error
            ],
        )
        .manage(config)
}
