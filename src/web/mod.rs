//! Web front end: game listing, betting, admin screens and leaderboard
//!
//! Every mutating request answers with a redirect and leaves a one-shot
//! status message in a signed cookie for the page it lands on.

mod flash;
mod forms;
mod views;

pub use forms::{AdminAction, AdminForm, BetForm, BetRequest, SyncQuery, UsersAction, UsersForm};
pub use views::escape;

use crate::admin::{self, AddUser};
use crate::betting::{self, BetWrite};
use crate::config::ServeArgs;
use crate::error::{Error, Result};
use crate::schedule::group_by_day;
use crate::store::{ArcDatabase, StoreError};
use crate::sync::sync_games;
use axum::{
    extract::{FromRef, Path, Query, State},
    http::StatusCode,
    response::{Html, IntoResponse, Redirect, Response},
    routing::{get, post},
    Form, Router,
};
use axum_extra::extract::cookie::{Key, SignedCookieJar};
use std::sync::Arc;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    db: ArcDatabase,
    scoreboard_url: Arc<str>,
    key: Key,
}

impl AppState {
    pub fn new(db: ArcDatabase, scoreboard_url: &str, key: Key) -> Self {
        Self {
            db,
            scoreboard_url: Arc::from(scoreboard_url),
            key,
        }
    }
}

impl FromRef<AppState> for Key {
    fn from_ref(state: &AppState) -> Self {
        state.key.clone()
    }
}

/// Handler failure: logged, answered with a bare 500
pub struct AppError(Error);

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        log::error!("Request failed: {}", self.0);
        (StatusCode::INTERNAL_SERVER_ERROR, "Something went wrong").into_response()
    }
}

impl<E> From<E> for AppError
where
    E: Into<Error>,
{
    fn from(err: E) -> Self {
        AppError(err.into())
    }
}

type Page = std::result::Result<(SignedCookieJar, Html<String>), AppError>;
type Action = std::result::Result<(SignedCookieJar, Redirect), AppError>;

fn game_url(game_id: Option<i64>) -> String {
    match game_id {
        Some(id) => format!("/game/{}", id),
        None => "/".to_string(),
    }
}

/// GET /
async fn index_handler(State(state): State<AppState>, jar: SignedCookieJar) -> Page {
    let (jar, message) = flash::take(jar);
    let mut session = state.db.session().await?;
    let games = session.list_games().await?;
    let html = views::index_page(&group_by_day(games), message.as_deref());
    Ok((jar, Html(html)))
}

/// GET /sync?redirect_game={id}
async fn sync_handler(
    State(state): State<AppState>,
    Query(query): Query<SyncQuery>,
    jar: SignedCookieJar,
) -> Action {
    let mut session = state.db.session().await?;
    let outcome = sync_games(&mut *session, &state.scoreboard_url).await;
    let message = if outcome.is_success() {
        "Successfully synced with ESPN!".to_string()
    } else {
        format!("Error syncing: {}", outcome.message())
    };
    Ok((
        flash::push(jar, message),
        Redirect::to(&game_url(query.game_id())),
    ))
}

/// GET /game/{id}
async fn game_handler(
    State(state): State<AppState>,
    Path(game_id): Path<i64>,
    jar: SignedCookieJar,
) -> std::result::Result<Response, AppError> {
    let mut session = state.db.session().await?;
    let Some(game) = session.get_game(game_id).await? else {
        return Ok((StatusCode::NOT_FOUND, "Game not found").into_response());
    };
    let props = session.list_props_for_game(game_id).await?;
    let users = session.list_users().await?;
    let bets = session.list_bets_for_game(game_id).await?;

    let (jar, message) = flash::take(jar);
    let html = views::game_page(&game, &props, &users, &bets, message.as_deref());
    Ok((jar, Html(html)).into_response())
}

/// POST /place_bet
async fn place_bet_handler(
    State(state): State<AppState>,
    jar: SignedCookieJar,
    Form(form): Form<BetForm>,
) -> Action {
    let back = Redirect::to(&game_url(form.game_id()));
    let request = match form.parse() {
        Ok(request) => request,
        Err(message) => return Ok((flash::push(jar, message), back)),
    };

    let mut session = state.db.session().await?;
    let message = match betting::place_or_update_bet(
        &mut *session,
        request.prop_id,
        request.user_id,
        request.selection,
    )
    .await
    {
        Ok(BetWrite::Placed) => "Bet placed!",
        Ok(BetWrite::Updated) => "Updated bet.",
        Err(Error::MissingUser) => "Please select a user!",
        Err(e) => return Err(e.into()),
    };
    Ok((flash::push(jar, message), back))
}

/// GET /leaderboard
async fn leaderboard_handler(State(state): State<AppState>, jar: SignedCookieJar) -> Page {
    let (jar, message) = flash::take(jar);
    let mut session = state.db.session().await?;
    let standings = betting::compute_leaderboard(&mut *session).await?;
    Ok((jar, Html(views::leaderboard_page(&standings, message.as_deref()))))
}

/// GET /admin
async fn admin_handler(State(state): State<AppState>, jar: SignedCookieJar) -> Page {
    let (jar, message) = flash::take(jar);
    let mut session = state.db.session().await?;
    let games = session.list_games().await?;
    let props = session.list_prop_summaries().await?;
    let html = views::admin_page(&group_by_day(games), &props, message.as_deref());
    Ok((jar, Html(html)))
}

/// POST /admin
async fn admin_action_handler(
    State(state): State<AppState>,
    jar: SignedCookieJar,
    Form(form): Form<AdminForm>,
) -> Action {
    let back = Redirect::to("/admin");
    let action = match form.parse() {
        Ok(action) => action,
        Err(message) => return Ok((flash::push(jar, message), back)),
    };

    let mut session = state.db.session().await?;
    let session = &mut *session;
    let message = match action {
        AdminAction::AddProp {
            game_id,
            description,
        } => match admin::add_prop(session, game_id, &description).await {
            Ok(_) => "Prop added!",
            Err(Error::Store(StoreError::MissingGame(_))) => "Game not found.",
            Err(e) => return Err(e.into()),
        },
        AdminAction::ResolveProp { prop_id, action } => {
            betting::resolve_prop(session, prop_id, action).await?;
            match action.outcome() {
                Some(_) => "Prop resolved!",
                None => "Prop reset to pending!",
            }
        }
        AdminAction::EditProp {
            prop_id,
            description,
        } => {
            admin::edit_prop(session, prop_id, &description).await?;
            "Prop updated!"
        }
        AdminAction::DeleteProp { prop_id } => {
            admin::delete_prop(session, prop_id).await?;
            "Prop deleted!"
        }
        AdminAction::AddGame(game) => {
            admin::add_game(session, &game).await?;
            "Game added!"
        }
        AdminAction::EditGame { game_id, edit } => {
            admin::edit_game(session, game_id, &edit).await?;
            "Game updated!"
        }
        AdminAction::DeleteGame { game_id } => {
            admin::delete_game(session, game_id).await?;
            "Game deleted"
        }
    };
    Ok((flash::push(jar, message), back))
}

/// GET /admin/users
async fn users_handler(State(state): State<AppState>, jar: SignedCookieJar) -> Page {
    let (jar, message) = flash::take(jar);
    let mut session = state.db.session().await?;
    let users = session.list_users().await?;
    Ok((jar, Html(views::users_page(&users, message.as_deref()))))
}

/// POST /admin/users
async fn users_action_handler(
    State(state): State<AppState>,
    jar: SignedCookieJar,
    Form(form): Form<UsersForm>,
) -> Action {
    let back = Redirect::to("/admin/users");
    let action = match form.parse() {
        Ok(action) => action,
        Err(message) => return Ok((flash::push(jar, message), back)),
    };

    let mut session = state.db.session().await?;
    let message = match action {
        UsersAction::Add(name) => match admin::add_user(&mut *session, &name).await? {
            AddUser::Added(_) => format!("User {} added.", name),
            AddUser::AlreadyExists => "User already exists.".to_string(),
        },
        UsersAction::Delete(user_id) => {
            admin::delete_user(&mut *session, user_id).await?;
            "User deleted.".to_string()
        }
    };
    Ok((flash::push(jar, message), back))
}

/// Build the web server router
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/", get(index_handler))
        .route("/sync", get(sync_handler))
        .route("/game/{id}", get(game_handler))
        .route("/place_bet", post(place_bet_handler))
        .route("/leaderboard", get(leaderboard_handler))
        .route("/admin", get(admin_handler).post(admin_action_handler))
        .route("/admin/users", get(users_handler).post(users_action_handler))
        .with_state(state)
}

/// Bind and serve until Ctrl+C or SIGTERM
pub async fn serve(db: ArcDatabase, scoreboard_url: &str, args: &ServeArgs) -> Result<()> {
    let state = AppState::new(db, scoreboard_url, args.cookie_key()?);
    let app = create_router(state);
    let addr = args.bind_addr();

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    log::info!("Web UI listening on {}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    log::info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            log::error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                log::error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    log::info!("Shutdown signal received, finishing open requests");
}
