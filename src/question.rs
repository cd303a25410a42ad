use chrono::NaiveDateTime;
use diesel::prelude::*;

use crate::{
    error::{Error, Result},
    pagination::{PageRequest, Pagination},
    schema::{posts, questions},
    user::{Actor, Authored, Authors, Permission},
    Connection,
};

#[derive(Clone, Debug, Serialize, Queryable, Identifiable)]
pub struct Question {
    pub id: i32,
    pub title: String,
    pub body: String,
    pub timestamp: NaiveDateTime,
    pub author_id: i32,
}

#[derive(Insertable)]
#[table_name = "questions"]
struct NewQuestion<'a> {
    title: &'a str,
    body: &'a str,
    author_id: i32,
}

#[derive(Clone, Debug, Deserialize)]
pub struct QuestionForm {
    pub title: String,
    pub body: String,
}

pub fn get(connection: &Connection, id: i32) -> Result<Question> {
    questions::table
        .find(id)
        .first(connection)
        .optional()?
        .ok_or(Error::NotFound("question"))
}

pub fn view(connection: &Connection, id: i32) -> Result<Authored<Question>> {
    let question = get(connection, id)?;
    let author_id = question.author_id;
    Ok(Authors::load(connection, Some(author_id))?.attach(question, author_id))
}

/// Number of posts answering a question
pub fn answer_count(connection: &Connection, id: i32) -> Result<i64> {
    Ok(posts::table
        .filter(posts::question_id.eq(id))
        .count()
        .get_result(connection)?)
}

/// Lists questions newest first, optionally only those asked by `author`.
pub fn list(
    connection: &Connection,
    author: Option<i32>,
    request: PageRequest,
    per_page: i64,
) -> Result<Pagination<Authored<Question>>> {
    let filtered = || {
        let query = questions::table.into_boxed();
        match author {
            Some(author) => query.filter(questions::author_id.eq(author)),
            None => query,
        }
    };

    let total: i64 = filtered().count().get_result(connection)?;
    let page = Pagination::fetch(request, per_page, total, |limit, offset| {
        filtered()
            .order((questions::timestamp.desc(), questions::id.desc()))
            .limit(limit)
            .offset(offset)
            .load::<Question>(connection)
    })?;

    let authors = Authors::load(connection, page.items.iter().map(|q| q.author_id))?;
    Ok(page.map(|question| {
        let author_id = question.author_id;
        authors.attach(question, author_id)
    }))
}

pub fn create(connection: &Connection, actor: &Actor, title: &str, body: &str) -> Result<Question> {
    actor.require(Permission::WriteArticles)?;
    if title.trim().is_empty() {
        return Err(Error::InvalidOperation("A question needs a title"));
    }

    let question: Question = diesel::insert_into(questions::table)
        .values(&NewQuestion {
            title,
            body,
            author_id: actor.id(),
        })
        .get_result(connection)?;
    info!("{} asked question {}", actor.user.username, question.id);
    Ok(question)
}

#[cfg(test)]
mod tests {
    use crate::{
        pagination::PageRequest,
        post::{self, PostFilter},
        user::tests::insert_actor,
    };

    #[test]
    #[ignore]
    fn answers_oldest_first_with_last_page() {
        let connection = crate::db::test_connection();
        let ada = insert_actor(&connection, "ada");
        let question = super::create(&connection, &ada, "Why?", "Just because").unwrap();
        let answers: Vec<i32> = (0..12)
            .map(|i| {
                post::create(&connection, &ada, &format!("answer {}", i), Some(question.id))
                    .unwrap()
                    .id
            })
            .collect();
        assert_eq!(super::answer_count(&connection, question.id).unwrap(), 12);

        let last = post::list(
            &connection,
            PostFilter::Question(question.id),
            PageRequest::Last,
            10,
        )
        .unwrap();
        assert_eq!(last.page, 2);
        let ids: Vec<i32> = last.items.iter().map(|p| p.item.id).collect();
        assert_eq!(ids, answers[10..].to_vec());
    }

    #[test]
    #[ignore]
    fn lists_by_author() {
        let connection = crate::db::test_connection();
        let ada = insert_actor(&connection, "ada");
        let bob = insert_actor(&connection, "bob");
        super::create(&connection, &ada, "One", "").unwrap();
        super::create(&connection, &bob, "Two", "").unwrap();

        let page = super::list(&connection, Some(bob.id()), PageRequest::Number(1), 10).unwrap();
        assert_eq!(page.total, 1);
        assert_eq!(page.items[0].item.title, "Two");
        assert_eq!(page.items[0].author, "bob");
    }

    #[test]
    #[ignore]
    fn missing_question() {
        let connection = crate::db::test_connection();
        let ada = insert_actor(&connection, "ada");
        match post::create(&connection, &ada, "orphan", Some(-1)) {
            Err(crate::error::Error::NotFound("question")) => (),
            other => panic!("unexpected result: {:?}", other),
        }
    }
}
