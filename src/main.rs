//! A question and answer forum engine.
//!
//! It has the following address scheme, all answering with JSON:
//! * `/` - Post feed, everything or only followed users depending on the `show_followed` cookie
//!     * `/all`, `/followed` - Switch the feed mode
//! * `/posts` - Submit a post
//! * `/post/<id>` - A post and a page of its comments
//!     * `/comments` - Submit a comment
//!     * `/edit` - Edit the post
//! * `/questions` - List or submit questions
//! * `/question/<id>` - A question and a page of its answers
//!     * `/answers` - Submit an answer
//! * `/focus-post/<id>`, `/unfocus-post/<id>`, `/focus-post-users/<id>` - Post bookmarks
//! * `/focus-question/<id>`, `/unfocus-question/<id>`, `/focus-question-users/<id>` - Question
//!   bookmarks
//! * `/user/<username>` - Profile with questions or answers (`/show-question`, `/show-answer`)
//! * `/follow/<username>`, `/unfollow/<username>` - Follow handling
//! * `/followers/<username>`, `/followed-by/<username>` - Follow listings
//! * `/edit-profile`, `/edit-profile/<id>` - Profile editing
//! * `/moderate` - Comment moderation
//!     * `/enable/<id>`, `/disable/<id>` - Show or hide a comment
//!
//! Listings take a `page` query parameter, where `-1` is the last page.

#[macro_use]
extern crate diesel;
#[macro_use]
extern crate diesel_migrations;
#[macro_use]
extern crate log;
#[macro_use]
extern crate serde;

pub mod comment;
pub mod config;
pub mod db;
pub mod error;
pub mod focus;
pub mod follow;
pub mod handler;
pub mod pagination;
pub mod post;
pub mod question;
pub mod schema;
pub mod user;

use gotham::{
    middleware::cookie::CookieParser,
    middleware::state::StateMiddleware,
    pipeline::new_pipeline,
    pipeline::single::single_pipeline,
    router::builder::{build_router, DefineSingleRoute, DrawRoutes},
    router::response::extender::ResponseExtender,
    router::Router,
    state::State,
};
use http::status::StatusCode;
use hyper::{Body, Response};

use std::path::Path;

pub use crate::db::{Connection, DbConnection};
use crate::{
    config::Settings,
    handler::{comments, posts, questions, users, PageQuery},
    user::SessionMiddleware,
};

/// Response extender for 404 errors
pub struct NotFound;

impl ResponseExtender<Body> for NotFound {
    fn extend(&self, _state: &mut State, res: &mut Response<Body>) {
        let body = res.body_mut();
        *body = r#"{"error":"Not found"}"#.into();
    }
}

/// Builds the request router
fn router(settings: Settings, connection: DbConnection) -> Router {
    let (chain, pipelines) = single_pipeline(
        new_pipeline()
            .add(StateMiddleware::new(connection))
            .add(StateMiddleware::new(settings))
            .add(CookieParser)
            .add(SessionMiddleware)
            .build(),
    );

    build_router(chain, pipelines, |route| {
        route
            .get("/")
            .with_query_string_extractor::<PageQuery>()
            .to(handler!(posts::index));
        route.get("/all").to(handler!(users::show_all));
        route.get("/followed").to(handler!(users::show_followed));

        route.post("/posts").to(body_handler!(posts::submit));
        route
            .get("/post/:id")
            .with_path_extractor::<posts::PostPath>()
            .with_query_string_extractor::<PageQuery>()
            .to(handler!(posts::view));
        route
            .post("/post/:id/comments")
            .with_path_extractor::<posts::PostPath>()
            .to(body_handler!(posts::add_comment));
        route
            .post("/post/:id/edit")
            .with_path_extractor::<posts::PostPath>()
            .to(body_handler!(posts::edit));
        route
            .get("/focus-post/:id")
            .with_path_extractor::<posts::PostPath>()
            .to(handler!(posts::focus_post));
        route
            .get("/unfocus-post/:id")
            .with_path_extractor::<posts::PostPath>()
            .to(handler!(posts::unfocus_post));
        route
            .get("/focus-post-users/:id")
            .with_path_extractor::<posts::PostPath>()
            .with_query_string_extractor::<PageQuery>()
            .to(handler!(posts::focus_users));

        route
            .get("/questions")
            .with_query_string_extractor::<PageQuery>()
            .to(handler!(questions::list));
        route.post("/questions").to(body_handler!(questions::submit));
        route
            .get("/question/:id")
            .with_path_extractor::<questions::QuestionPath>()
            .with_query_string_extractor::<PageQuery>()
            .to(handler!(questions::view));
        route
            .post("/question/:id/answers")
            .with_path_extractor::<questions::QuestionPath>()
            .to(body_handler!(questions::answer));
        route
            .get("/focus-question/:id")
            .with_path_extractor::<questions::QuestionPath>()
            .to(handler!(questions::focus_question));
        route
            .get("/unfocus-question/:id")
            .with_path_extractor::<questions::QuestionPath>()
            .to(handler!(questions::unfocus_question));
        route
            .get("/focus-question-users/:id")
            .with_path_extractor::<questions::QuestionPath>()
            .with_query_string_extractor::<PageQuery>()
            .to(handler!(questions::focus_users));

        route
            .get("/user/:username")
            .with_path_extractor::<users::UserPath>()
            .with_query_string_extractor::<PageQuery>()
            .to(handler!(users::profile));
        route
            .get("/show-question/:username")
            .with_path_extractor::<users::UserPath>()
            .to(handler!(users::show_question));
        route
            .get("/show-answer/:username")
            .with_path_extractor::<users::UserPath>()
            .to(handler!(users::show_answer));
        route
            .get("/follow/:username")
            .with_path_extractor::<users::UserPath>()
            .to(handler!(users::follow_user));
        route
            .get("/unfollow/:username")
            .with_path_extractor::<users::UserPath>()
            .to(handler!(users::unfollow_user));
        route
            .get("/followers/:username")
            .with_path_extractor::<users::UserPath>()
            .with_query_string_extractor::<PageQuery>()
            .to(handler!(users::followers));
        route
            .get("/followed-by/:username")
            .with_path_extractor::<users::UserPath>()
            .with_query_string_extractor::<PageQuery>()
            .to(handler!(users::followed_by));
        route
            .post("/edit-profile")
            .to(body_handler!(users::edit_profile));
        route
            .post("/edit-profile/:id")
            .with_path_extractor::<users::UserIdPath>()
            .to(body_handler!(users::edit_profile_admin));

        route
            .get("/moderate")
            .with_query_string_extractor::<PageQuery>()
            .to(handler!(comments::moderate));
        route
            .get("/moderate/enable/:id")
            .with_path_extractor::<comments::CommentPath>()
            .to(handler!(comments::enable));
        route
            .get("/moderate/disable/:id")
            .with_path_extractor::<comments::CommentPath>()
            .to(handler!(comments::disable));

        // Error responders
        route.add_response_extender(StatusCode::NOT_FOUND, NotFound);
    })
}

fn main() -> Result<(), failure::Error> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    // Read settings
    let path = if Path::new("/etc/colloquy/colloquy.toml").is_file() {
        Path::new("/etc/colloquy/colloquy.toml")
    } else {
        Path::new("colloquy.toml")
    };
    let data = std::fs::read(path)?;
    let settings = Settings::from_slice(&data)?;
    let address = settings.host_address.clone();
    let connection = DbConnection::from_url(&settings.database_url)?;

    info!("Running at {}", address);
    gotham::start(address, router(settings, connection));
    Ok(())
}
