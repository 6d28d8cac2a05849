// HTTP handler bindings for the arena call surface
//
// This module provides thin wrapper functions that bind Rocket HTTP routes
// to the Arena's methods. Handlers are responsible for:
// - Deserializing incoming JSON requests
// - Extracting the Arena instance from Rocket's managed state
// - Delegating to Arena methods
// - Mapping engine errors onto HTTP status codes

use rocket::fairing::AdHoc;
use rocket::http::Status;
use rocket::response::status::Custom;
use rocket::serde::json::{self, Json};
use rocket::{get, post, routes, Build, Rocket, State};
use serde::Deserialize;
use serde_json::{json, Value};

use crate::arena::{Arena, MoveAck, StepResponse};
use crate::config::GameConfig;
use crate::error::EngineError;
use crate::interop::StatsSnapshot;
use crate::types::{Direction, Observation};

type ApiResult<T> = Result<Json<T>, Custom<Json<Value>>>;

/// Body of `POST /move`
#[derive(Debug, Deserialize)]
pub struct MoveRequest {
    pub snake_id: String,
    #[serde(rename = "move")]
    pub direction: String,
}

fn error_response(error: EngineError) -> Custom<Json<Value>> {
    let status = match &error {
        EngineError::Protocol(_) | EngineError::InvalidConfig(_) => Status::BadRequest,
        EngineError::UnknownSnake(_) => Status::NotFound,
        EngineError::InvalidMove { .. }
        | EngineError::DuplicateMove { .. }
        | EngineError::InvalidEpisodeState { .. } => Status::Conflict,
        EngineError::InvalidState(_) => Status::InternalServerError,
    };
    Custom(
        status,
        Json(json!({ "error": error.kind(), "message": error.to_string() })),
    )
}

/// GET / endpoint
/// Returns arena metadata
#[get("/")]
pub fn index(arena: &State<Arena>) -> Json<Value> {
    let config = arena.config();
    Json(json!({
        "apiversion": "1",
        "ruleset": config.rules.ruleset,
        "move_timeout_ms": config.interop.move_timeout_ms,
        "phase": arena.phase(),
    }))
}

/// POST /reset endpoint
/// Starts a new episode; an empty body uses the configured game
#[post("/reset", data = "<game>")]
pub async fn reset(
    arena: &State<Arena>,
    game: Result<Json<GameConfig>, json::Error<'_>>,
) -> ApiResult<Vec<Observation>> {
    let game = match game {
        Ok(game) => Some(game.into_inner()),
        Err(json::Error::Parse(body, _)) if body.trim().is_empty() => None,
        Err(e) => return Err(error_response(EngineError::InvalidConfig(e.to_string()))),
    };
    arena
        .reset(game)
        .await
        .map(Json)
        .map_err(error_response)
}

/// GET /observation/<snake_id> endpoint
#[get("/observation/<snake_id>")]
pub fn observation(arena: &State<Arena>, snake_id: &str) -> ApiResult<Observation> {
    arena.observation(snake_id).map(Json).map_err(error_response)
}

/// POST /move endpoint
/// Submits one snake's move for the open turn
#[post("/move", format = "json", data = "<move_req>")]
pub fn submit_move(arena: &State<Arena>, move_req: Json<MoveRequest>) -> ApiResult<MoveAck> {
    let direction: Direction = move_req
        .direction
        .parse()
        .map_err(|e| error_response(EngineError::Protocol(e)))?;
    arena
        .submit_move(&move_req.snake_id, direction)
        .map(Json)
        .map_err(error_response)
}

/// POST /step endpoint
/// Blocks until every alive snake has moved or timed out, then resolves the turn
#[post("/step")]
pub async fn step(arena: &State<Arena>) -> ApiResult<StepResponse> {
    arena.step().await.map(Json).map_err(error_response)
}

/// GET /stats endpoint
/// Interop boundary counters
#[get("/stats")]
pub fn stats(arena: &State<Arena>) -> Json<StatsSnapshot> {
    Json(arena.stats())
}

/// Builds the Rocket instance serving an arena
pub fn build_rocket(arena: Arena) -> Rocket<Build> {
    rocket::build()
        .manage(arena)
        .attach(AdHoc::on_response("Server ID Middleware", |_, res| {
            Box::pin(async move {
                res.set_raw_header("Server", "snake-arena");
            })
        }))
        .mount(
            "/",
            routes![index, reset, observation, submit_move, step, stats],
        )
}
