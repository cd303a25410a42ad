use gotham::state::{FromState, State};
use gotham_derive::{StateData, StaticResponseExtender};

use super::{
    actor, json_response, parse_body, preference, see_other, toggle_response, HandlerResult,
    PageQuery,
};
use crate::{
    comment::{self, CommentForm, Visibility},
    config::Settings,
    focus,
    pagination::Pagination,
    post::{self, Post, PostFilter, PostForm},
    user::{Actor, Authored, Permission},
    DbConnection,
};

#[derive(Deserialize, StateData, StaticResponseExtender)]
pub struct PostPath {
    pub id: i32,
}

/// A post submission, optionally answering a question
#[derive(Deserialize)]
pub struct NewPostForm {
    pub body: String,
    pub question_id: Option<i32>,
}

#[derive(Serialize)]
struct Feed {
    show_followed: bool,
    posts: Pagination<Authored<Post>>,
}

/// The front page feed. Logged in users who asked for it only see posts from people they follow.
pub fn index(state: &State) -> HandlerResult {
    let connection = &DbConnection::from_state(state)?;
    let per_page = Settings::borrow_from(state).pages.posts;

    let follower = Actor::try_borrow_from(state).filter(|_| preference(state, "show_followed"));
    let filter = match follower {
        Some(actor) => PostFilter::Followed(actor.id()),
        None => PostFilter::All,
    };
    let posts = post::list(connection, filter, PageQuery::request(state), per_page)?;
    json_response(
        state,
        &Feed {
            show_followed: follower.is_some(),
            posts,
        },
    )
}

pub fn submit(state: &State, body: Vec<u8>) -> HandlerResult {
    let actor = actor(state)?;
    let connection = &DbConnection::from_state(state)?;
    let form: NewPostForm = parse_body(state, &body)?;

    let post = post::create(connection, actor, &form.body, form.question_id)?;
    json_response(state, &post)
}

#[derive(Serialize)]
struct PostPage {
    post: Authored<Post>,
    comments: Pagination<Authored<comment::Comment>>,
    focusing: bool,
}

/// A post with a page of its comments. Moderators also see disabled comments.
pub fn view(state: &State) -> HandlerResult {
    let connection = &DbConnection::from_state(state)?;
    let id = PostPath::borrow_from(state).id;
    let per_page = Settings::borrow_from(state).pages.comments;
    let viewer = Actor::try_borrow_from(state);

    let visibility = match viewer {
        Some(actor) if actor.can(Permission::ModerateComments) => Visibility::Moderator,
        _ => Visibility::Public,
    };
    let post = post::view(connection, id)?;
    let comments = comment::list(connection, id, visibility, PageQuery::request(state), per_page)?;
    let focusing = match viewer {
        Some(actor) => focus::is_focusing_post(connection, actor.id(), id)?,
        None => false,
    };
    json_response(
        state,
        &PostPage {
            post,
            comments,
            focusing,
        },
    )
}

/// Adds a comment and sends the client to the last page of comments, where it shows up.
pub fn add_comment(state: &State, body: Vec<u8>) -> HandlerResult {
    let actor = actor(state)?;
    let connection = &DbConnection::from_state(state)?;
    let id = PostPath::borrow_from(state).id;
    let form: CommentForm = parse_body(state, &body)?;

    comment::create(connection, actor, id, &form.body)?;
    Ok(see_other(state, format!("/post/{}?page=-1", id)))
}

pub fn edit(state: &State, body: Vec<u8>) -> HandlerResult {
    let actor = actor(state)?;
    let connection = &DbConnection::from_state(state)?;
    let id = PostPath::borrow_from(state).id;
    let form: PostForm = parse_body(state, &body)?;

    let post = post::edit(connection, actor, id, &form.body)?;
    json_response(state, &post)
}

pub fn focus_post(state: &State) -> HandlerResult {
    let actor = actor(state)?;
    let connection = &DbConnection::from_state(state)?;
    let id = PostPath::borrow_from(state).id;

    let toggle = focus::focus_post(connection, actor, id)?;
    toggle_response(
        state,
        toggle,
        "You are now focusing this post.",
        "You are already focusing this post.",
    )
}

pub fn unfocus_post(state: &State) -> HandlerResult {
    let actor = actor(state)?;
    let connection = &DbConnection::from_state(state)?;
    let id = PostPath::borrow_from(state).id;

    let toggle = focus::unfocus_post(connection, actor, id)?;
    toggle_response(
        state,
        toggle,
        "You are not focusing this post anymore.",
        "You are not focusing this post.",
    )
}

pub fn focus_users(state: &State) -> HandlerResult {
    let connection = &DbConnection::from_state(state)?;
    let id = PostPath::borrow_from(state).id;
    let per_page = Settings::borrow_from(state).pages.followers;

    let users = focus::post_focus_users(connection, id, PageQuery::request(state), per_page)?;
    json_response(state, &users)
}
