use gotham::state::{FromState, State};
use gotham_derive::{StateData, StaticResponseExtender};

use super::{
    actor, json_response, parse_body, preference, set_preference, toggle_response, HandlerResult,
    PageQuery,
};
use crate::{
    config::Settings,
    follow,
    pagination::Pagination,
    post::{self, Post, PostFilter},
    question::{self, Question},
    user::{self, Actor, AdminProfileChanges, Authored, Profile, ProfileChanges},
    DbConnection,
};

/// How long the feed and profile preferences are remembered
const PREFERENCE_DAYS: i64 = 30;

#[derive(Deserialize, StateData, StaticResponseExtender)]
pub struct UserPath {
    pub username: String,
}

#[derive(Deserialize, StateData, StaticResponseExtender)]
pub struct UserIdPath {
    pub id: i32,
}

#[derive(Serialize)]
#[serde(untagged)]
enum Contributions {
    Answers(Pagination<Authored<Post>>),
    Questions(Pagination<Authored<Question>>),
}

#[derive(Serialize)]
struct ProfilePage {
    user: Profile,
    followers: i64,
    following: i64,
    followed_by_you: bool,
    show_answer: bool,
    contributions: Contributions,
}

/// A user's profile along with either their questions or, if the client asked for it, their
/// answers.
pub fn profile(state: &State) -> HandlerResult {
    let connection = &DbConnection::from_state(state)?;
    let username = &UserPath::borrow_from(state).username;
    let per_page = Settings::borrow_from(state).pages.posts;

    let user = user::by_username(connection, username)?;
    let show_answer = preference(state, "show_answer");
    let request = PageQuery::request(state);
    let contributions = if show_answer {
        Contributions::Answers(post::list(
            connection,
            PostFilter::Author(user.id),
            request,
            per_page,
        )?)
    } else {
        Contributions::Questions(question::list(connection, Some(user.id), request, per_page)?)
    };
    let followed_by_you = match Actor::try_borrow_from(state) {
        Some(actor) => follow::is_following(connection, actor.id(), user.id)?,
        None => false,
    };

    json_response(
        state,
        &ProfilePage {
            followers: follow::follower_count(connection, user.id)?,
            following: follow::followed_count(connection, user.id)?,
            followed_by_you,
            show_answer,
            contributions,
            user: user.into(),
        },
    )
}

pub fn show_question(state: &State) -> HandlerResult {
    let username = &UserPath::borrow_from(state).username;
    set_preference(state, "show_answer", false, None, format!("/user/{}", username))
}

pub fn show_answer(state: &State) -> HandlerResult {
    let username = &UserPath::borrow_from(state).username;
    set_preference(state, "show_answer", true, None, format!("/user/{}", username))
}

/// Makes the front page list every post
pub fn show_all(state: &State) -> HandlerResult {
    actor(state)?;
    let max_age = time::Duration::days(PREFERENCE_DAYS);
    set_preference(state, "show_followed", false, Some(max_age), "/".to_owned())
}

/// Makes the front page list only posts by followed users
pub fn show_followed(state: &State) -> HandlerResult {
    actor(state)?;
    let max_age = time::Duration::days(PREFERENCE_DAYS);
    set_preference(state, "show_followed", true, Some(max_age), "/".to_owned())
}

pub fn follow_user(state: &State) -> HandlerResult {
    let actor = actor(state)?;
    let connection = &DbConnection::from_state(state)?;
    let username = &UserPath::borrow_from(state).username;

    let target = user::by_username(connection, username)?;
    let toggle = follow::follow(connection, actor, target.id)?;
    toggle_response(
        state,
        toggle,
        &format!("You are now following {}.", username),
        "You are already following this user.",
    )
}

pub fn unfollow_user(state: &State) -> HandlerResult {
    let actor = actor(state)?;
    let connection = &DbConnection::from_state(state)?;
    let username = &UserPath::borrow_from(state).username;

    let target = user::by_username(connection, username)?;
    let toggle = follow::unfollow(connection, actor, target.id)?;
    toggle_response(
        state,
        toggle,
        &format!("You are not following {} anymore.", username),
        "You are not following this user.",
    )
}

pub fn followers(state: &State) -> HandlerResult {
    let connection = &DbConnection::from_state(state)?;
    let username = &UserPath::borrow_from(state).username;
    let per_page = Settings::borrow_from(state).pages.followers;

    let user = user::by_username(connection, username)?;
    let followers = follow::followers(connection, user.id, PageQuery::request(state), per_page)?;
    json_response(state, &followers)
}

pub fn followed_by(state: &State) -> HandlerResult {
    let connection = &DbConnection::from_state(state)?;
    let username = &UserPath::borrow_from(state).username;
    let per_page = Settings::borrow_from(state).pages.followers;

    let user = user::by_username(connection, username)?;
    let followed = follow::followed(connection, user.id, PageQuery::request(state), per_page)?;
    json_response(state, &followed)
}

pub fn edit_profile(state: &State, body: Vec<u8>) -> HandlerResult {
    let actor = actor(state)?;
    let connection = &DbConnection::from_state(state)?;
    let changes: ProfileChanges = parse_body(state, &body)?;

    let user = user::edit_profile(connection, actor, &changes)?;
    json_response(state, &user)
}

pub fn edit_profile_admin(state: &State, body: Vec<u8>) -> HandlerResult {
    let actor = actor(state)?;
    let connection = &DbConnection::from_state(state)?;
    let id = UserIdPath::borrow_from(state).id;
    let changes: AdminProfileChanges = parse_body(state, &body)?;

    let user = user::edit_profile_admin(connection, actor, id, &changes)?;
    json_response(state, &user)
}
