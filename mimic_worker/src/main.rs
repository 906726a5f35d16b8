use std::convert::Infallible;
use std::sync::Arc;

use mimic::ClonePipeline;
use serde::Deserialize;
use warp::{Filter, Reply};

/// Query parameters for the clone endpoint.
#[derive(Debug, Deserialize)]
struct CloneQuery {
    input_url: String,
    topic: String,
}

/// Run the pipeline and reply with the document or a JSON error object.
async fn handle_clone(
    query: CloneQuery,
    pipeline: Arc<ClonePipeline>,
) -> Result<warp::reply::Response, Infallible> {
    match pipeline.clone_page(&query.input_url, &query.topic).await {
        Ok(page) => {
            log::info!("served clone of {}", query.input_url);
            Ok(warp::reply::html(page.html).into_response())
        }
        Err(e) => {
            log::warn!("clone of {} failed: {}", query.input_url, e);
            Ok(warp::reply::json(&serde_json::json!({
                "success": false,
                "error": e.to_string(),
            }))
            .into_response())
        }
    }
}

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();
    env_logger::init_from_env(env_logger::Env::default().default_filter_or("info"));

    let pipeline = match ClonePipeline::from_env() {
        Ok(pipeline) => Arc::new(pipeline),
        Err(e) => {
            log::error!("failed to build pipeline: {}", e);
            std::process::exit(1);
        }
    };

    let with_pipeline = warp::any().map(move || pipeline.clone());

    let root = warp::path::end()
        .map(|| warp::reply::json(&serde_json::json!({ "message": "Hello World" })));

    let clone = warp::path("input_url")
        .and(warp::path::end())
        .and(warp::query::<CloneQuery>())
        .and(with_pipeline)
        .and_then(handle_clone);

    let routes = warp::get().and(root.or(clone)).boxed();

    warp::serve(routes).run(([0, 0, 0, 0], 8000)).await;
}
