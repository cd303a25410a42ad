//! Comment moderation endpoints
use gotham::state::{FromState, State};
use gotham_derive::{StateData, StaticResponseExtender};

use super::{actor, json_response, HandlerResult, PageQuery};
use crate::{comment, config::Settings, DbConnection};

#[derive(Deserialize, StateData, StaticResponseExtender)]
pub struct CommentPath {
    id: i32,
}

/// Every comment, newest first, for moderators to review
pub fn moderate(state: &State) -> HandlerResult {
    let actor = actor(state)?;
    let connection = &DbConnection::from_state(state)?;
    let per_page = Settings::borrow_from(state).pages.comments;

    let comments =
        comment::list_for_moderation(connection, actor, PageQuery::request(state), per_page)?;
    json_response(state, &comments)
}

fn set_disabled(state: &State, disabled: bool) -> HandlerResult {
    let actor = actor(state)?;
    let connection = &DbConnection::from_state(state)?;
    let id = CommentPath::borrow_from(state).id;

    let comment = comment::set_disabled(connection, actor, id, disabled)?;
    json_response(state, &comment)
}

pub fn enable(state: &State) -> HandlerResult {
    set_disabled(state, false)
}

pub fn disable(state: &State) -> HandlerResult {
    set_disabled(state, true)
}
