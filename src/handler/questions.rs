use gotham::state::{FromState, State};
use gotham_derive::{StateData, StaticResponseExtender};

use super::{
    actor, json_response, parse_body, see_other, toggle_response, HandlerResult, PageQuery,
};
use crate::{
    config::Settings,
    focus,
    pagination::Pagination,
    post::{self, Post, PostFilter, PostForm},
    question::{self, Question, QuestionForm},
    user::{Actor, Authored},
    DbConnection,
};

#[derive(Deserialize, StateData, StaticResponseExtender)]
pub struct QuestionPath {
    pub id: i32,
}

pub fn list(state: &State) -> HandlerResult {
    let connection = &DbConnection::from_state(state)?;
    let per_page = Settings::borrow_from(state).pages.posts;

    let questions = question::list(connection, None, PageQuery::request(state), per_page)?;
    json_response(state, &questions)
}

pub fn submit(state: &State, body: Vec<u8>) -> HandlerResult {
    let actor = actor(state)?;
    let connection = &DbConnection::from_state(state)?;
    let form: QuestionForm = parse_body(state, &body)?;

    let question = question::create(connection, actor, &form.title, &form.body)?;
    json_response(state, &question)
}

#[derive(Serialize)]
struct QuestionPage {
    question: Authored<Question>,
    answer_count: i64,
    answers: Pagination<Authored<Post>>,
    focusing: bool,
}

/// A question with a page of its answers, oldest first.
pub fn view(state: &State) -> HandlerResult {
    let connection = &DbConnection::from_state(state)?;
    let id = QuestionPath::borrow_from(state).id;
    let per_page = Settings::borrow_from(state).pages.posts;

    let question = question::view(connection, id)?;
    let answer_count = question::answer_count(connection, id)?;
    let answers = post::list(
        connection,
        PostFilter::Question(id),
        PageQuery::request(state),
        per_page,
    )?;
    let focusing = match Actor::try_borrow_from(state) {
        Some(actor) => focus::is_focusing_question(connection, actor.id(), id)?,
        None => false,
    };
    json_response(
        state,
        &QuestionPage {
            question,
            answer_count,
            answers,
            focusing,
        },
    )
}

/// Posts an answer and sends the client to the last page of answers.
pub fn answer(state: &State, body: Vec<u8>) -> HandlerResult {
    let actor = actor(state)?;
    let connection = &DbConnection::from_state(state)?;
    let id = QuestionPath::borrow_from(state).id;
    let form: PostForm = parse_body(state, &body)?;

    post::create(connection, actor, &form.body, Some(id))?;
    Ok(see_other(state, format!("/question/{}?page=-1", id)))
}

pub fn focus_question(state: &State) -> HandlerResult {
    let actor = actor(state)?;
    let connection = &DbConnection::from_state(state)?;
    let id = QuestionPath::borrow_from(state).id;

    let toggle = focus::focus_question(connection, actor, id)?;
    toggle_response(
        state,
        toggle,
        "You are now focusing this question.",
        "You are already focusing this question.",
    )
}

pub fn unfocus_question(state: &State) -> HandlerResult {
    let actor = actor(state)?;
    let connection = &DbConnection::from_state(state)?;
    let id = QuestionPath::borrow_from(state).id;

    let toggle = focus::unfocus_question(connection, actor, id)?;
    toggle_response(
        state,
        toggle,
        "You are not focusing this question anymore.",
        "You are not focusing this question.",
    )
}

pub fn focus_users(state: &State) -> HandlerResult {
    let connection = &DbConnection::from_state(state)?;
    let id = QuestionPath::borrow_from(state).id;
    let per_page = Settings::borrow_from(state).pages.followers;

    let users = focus::question_focus_users(connection, id, PageQuery::request(state), per_page)?;
    json_response(state, &users)
}
