//! Users bookmarking posts and questions to keep an eye on them.
use diesel::prelude::*;

use crate::{
    error::{Error, Result, Toggle},
    pagination::{PageRequest, Pagination},
    post,
    question,
    schema::{focus, question_focus, users},
    user::{Actor, Profile, User},
    Connection,
};

fn check_owner(actor: &Actor, author_id: i32) -> Result<()> {
    if actor.id() == author_id {
        Err(Error::InvalidOperation("You can't focus your own content"))
    } else {
        Ok(())
    }
}

pub fn focus_post(connection: &Connection, actor: &Actor, id: i32) -> Result<Toggle> {
    let post = post::get(connection, id)?;
    check_owner(actor, post.author_id)?;

    let rows = diesel::insert_into(focus::table)
        .values((focus::user_id.eq(actor.id()), focus::post_id.eq(id)))
        .on_conflict_do_nothing()
        .execute(connection)?;
    Ok(Toggle::from_affected(rows))
}

pub fn unfocus_post(connection: &Connection, actor: &Actor, id: i32) -> Result<Toggle> {
    let post = post::get(connection, id)?;
    check_owner(actor, post.author_id)?;

    let rows = diesel::delete(focus::table.find((actor.id(), id))).execute(connection)?;
    Ok(Toggle::from_affected(rows))
}

pub fn focus_question(connection: &Connection, actor: &Actor, id: i32) -> Result<Toggle> {
    let question = question::get(connection, id)?;
    check_owner(actor, question.author_id)?;

    let rows = diesel::insert_into(question_focus::table)
        .values((
            question_focus::user_id.eq(actor.id()),
            question_focus::question_id.eq(id),
        ))
        .on_conflict_do_nothing()
        .execute(connection)?;
    Ok(Toggle::from_affected(rows))
}

pub fn unfocus_question(connection: &Connection, actor: &Actor, id: i32) -> Result<Toggle> {
    let question = question::get(connection, id)?;
    check_owner(actor, question.author_id)?;

    let rows = diesel::delete(question_focus::table.find((actor.id(), id))).execute(connection)?;
    Ok(Toggle::from_affected(rows))
}

pub fn is_focusing_post(connection: &Connection, user: i32, post: i32) -> Result<bool> {
    Ok(diesel::select(diesel::dsl::exists(focus::table.find((user, post)))).get_result(connection)?)
}

pub fn is_focusing_question(connection: &Connection, user: i32, question: i32) -> Result<bool> {
    let query = question_focus::table.find((user, question));
    Ok(diesel::select(diesel::dsl::exists(query)).get_result(connection)?)
}

/// The users focusing a post
pub fn post_focus_users(
    connection: &Connection,
    id: i32,
    request: PageRequest,
    per_page: i64,
) -> Result<Pagination<Profile>> {
    post::get(connection, id)?;
    let total: i64 = focus::table
        .filter(focus::post_id.eq(id))
        .count()
        .get_result(connection)?;

    let page = Pagination::fetch(request, per_page, total, |limit, offset| {
        focus::table
            .inner_join(users::table)
            .filter(focus::post_id.eq(id))
            .select(users::all_columns)
            .order(users::id)
            .limit(limit)
            .offset(offset)
            .load::<User>(connection)
    })?;
    Ok(page.map(Profile::from))
}

/// The users focusing a question
pub fn question_focus_users(
    connection: &Connection,
    id: i32,
    request: PageRequest,
    per_page: i64,
) -> Result<Pagination<Profile>> {
    question::get(connection, id)?;
    let total: i64 = question_focus::table
        .filter(question_focus::question_id.eq(id))
        .count()
        .get_result(connection)?;

    let page = Pagination::fetch(request, per_page, total, |limit, offset| {
        question_focus::table
            .inner_join(users::table)
            .filter(question_focus::question_id.eq(id))
            .select(users::all_columns)
            .order(users::id)
            .limit(limit)
            .offset(offset)
            .load::<User>(connection)
    })?;
    Ok(page.map(Profile::from))
}

#[cfg(test)]
mod tests {
    use crate::{
        error::{Error, Toggle},
        pagination::PageRequest,
        post::tests::insert_post,
        user::tests::{actor, insert_actor},
    };

    #[test]
    fn own_content() {
        let ada = actor(3, &[]);
        assert!(super::check_owner(&ada, 4).is_ok());
        match super::check_owner(&ada, 3) {
            Err(Error::InvalidOperation(_)) => (),
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[test]
    #[ignore]
    fn focusing_twice_leaves_one_edge() {
        let connection = crate::db::test_connection();
        let ada = insert_actor(&connection, "ada");
        let bob = insert_actor(&connection, "bob");
        let post = insert_post(&connection, bob.id(), "Worth watching");

        assert_eq!(super::focus_post(&connection, &ada, post.id).unwrap(), Toggle::Changed);
        assert_eq!(super::focus_post(&connection, &ada, post.id).unwrap(), Toggle::Unchanged);
        assert!(super::is_focusing_post(&connection, ada.id(), post.id).unwrap());

        let users = super::post_focus_users(&connection, post.id, PageRequest::Number(1), 30).unwrap();
        assert_eq!(users.total, 1);
        assert_eq!(users.items[0].username, "ada");

        assert_eq!(super::unfocus_post(&connection, &ada, post.id).unwrap(), Toggle::Changed);
        assert_eq!(super::unfocus_post(&connection, &ada, post.id).unwrap(), Toggle::Unchanged);
        assert!(super::focus_post(&connection, &bob, post.id).is_err());
    }

    #[test]
    #[ignore]
    fn question_focus() {
        let connection = crate::db::test_connection();
        let ada = insert_actor(&connection, "ada");
        let bob = insert_actor(&connection, "bob");
        let question = crate::question::create(&connection, &bob, "Where?", "").unwrap();

        assert!(super::focus_question(&connection, &ada, question.id).unwrap().changed());
        assert!(!super::focus_question(&connection, &ada, question.id).unwrap().changed());
        let users =
            super::question_focus_users(&connection, question.id, PageRequest::Number(1), 30).unwrap();
        assert_eq!(users.total, 1);
        assert!(super::unfocus_question(&connection, &ada, question.id).unwrap().changed());
        assert!(!super::is_focusing_question(&connection, ada.id(), question.id).unwrap());
    }
}
