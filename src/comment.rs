use chrono::NaiveDateTime;
use diesel::{pg::Pg, prelude::*};

use crate::{
    error::{Error, Result},
    pagination::{PageRequest, Pagination},
    post,
    schema::comments,
    user::{Actor, Authored, Authors, Permission},
    Connection,
};

#[derive(Clone, Debug, Serialize, Deserialize, Queryable, Identifiable)]
pub struct Comment {
    /// The unique id of this comment
    pub id: i32,
    /// The comment's content
    pub body: String,
    /// The time of the comment's submission
    pub timestamp: NaiveDateTime,
    /// Whether a moderator has hidden the comment
    pub disabled: bool,
    /// The user who submitted the comment
    pub author_id: i32,
    /// The id of the post this comment belongs to
    pub post_id: i32,
}

#[derive(Insertable)]
#[table_name = "comments"]
struct NewComment<'a> {
    body: &'a str,
    author_id: i32,
    post_id: i32,
}

#[derive(Clone, Debug, Deserialize)]
pub struct CommentForm {
    pub body: String,
}

/// Who a comment thread is being shown to
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Visibility {
    /// Disabled comments are left out, both from the items and from the page count
    Public,
    /// Everything, disabled comments included
    Moderator,
}

fn thread(post: i32, visibility: Visibility) -> comments::BoxedQuery<'static, Pg> {
    let query = comments::table
        .filter(comments::post_id.eq(post))
        .into_boxed();
    match visibility {
        Visibility::Public => query.filter(comments::disabled.eq(false)),
        Visibility::Moderator => query,
    }
}

pub fn get(connection: &Connection, id: i32) -> Result<Comment> {
    comments::table
        .find(id)
        .first(connection)
        .optional()?
        .ok_or(Error::NotFound("comment"))
}

/// Number of comments on a post that are shown with the given visibility
pub fn count(connection: &Connection, post: i32, visibility: Visibility) -> Result<i64> {
    Ok(thread(post, visibility).count().get_result(connection)?)
}

/// Lists the comments of a post in the order they were written.
pub fn list(
    connection: &Connection,
    post: i32,
    visibility: Visibility,
    request: PageRequest,
    per_page: i64,
) -> Result<Pagination<Authored<Comment>>> {
    post::get(connection, post)?;
    let total = count(connection, post, visibility)?;

    let page = Pagination::fetch(request, per_page, total, |limit, offset| {
        thread(post, visibility)
            .order((comments::timestamp.asc(), comments::id.asc()))
            .limit(limit)
            .offset(offset)
            .load::<Comment>(connection)
    })?;
    with_authors(connection, page)
}

/// Lists every comment on the site newest first, disabled ones included.
pub fn list_for_moderation(
    connection: &Connection,
    actor: &Actor,
    request: PageRequest,
    per_page: i64,
) -> Result<Pagination<Authored<Comment>>> {
    actor.require(Permission::ModerateComments)?;
    let total: i64 = comments::table.count().get_result(connection)?;

    let page = Pagination::fetch(request, per_page, total, |limit, offset| {
        comments::table
            .order((comments::timestamp.desc(), comments::id.desc()))
            .limit(limit)
            .offset(offset)
            .load::<Comment>(connection)
    })?;
    with_authors(connection, page)
}

fn with_authors(
    connection: &Connection,
    page: Pagination<Comment>,
) -> Result<Pagination<Authored<Comment>>> {
    let authors = Authors::load(connection, page.items.iter().map(|c| c.author_id))?;
    Ok(page.map(|comment| {
        let author_id = comment.author_id;
        authors.attach(comment, author_id)
    }))
}

pub fn create(connection: &Connection, actor: &Actor, post: i32, body: &str) -> Result<Comment> {
    actor.require(Permission::Comment)?;
    if body.trim().is_empty() {
        return Err(Error::InvalidOperation("A comment can't be empty"));
    }
    post::get(connection, post)?;

    let comment: Comment = diesel::insert_into(comments::table)
        .values(&NewComment {
            body,
            author_id: actor.id(),
            post_id: post,
        })
        .get_result(connection)?;
    Ok(comment)
}

/// Hides or shows a comment. Setting the flag it already has is fine.
pub fn set_disabled(
    connection: &Connection,
    actor: &Actor,
    id: i32,
    disabled: bool,
) -> Result<Comment> {
    actor.require(Permission::ModerateComments)?;

    let comment: Comment = diesel::update(comments::table.find(id))
        .set(comments::disabled.eq(disabled))
        .get_result(connection)
        .optional()?
        .ok_or(Error::NotFound("comment"))?;
    info!(
        "{} {} comment {}",
        actor.user.username,
        if disabled { "disabled" } else { "enabled" },
        id
    );
    Ok(comment)
}

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use super::{Comment, Visibility};
    use crate::{
        pagination::PageRequest,
        post::tests::insert_post,
        user::{tests::insert_actor, Permission},
    };

    #[test]
    fn json_encode() {
        let comment = Comment {
            id: 1,
            body: String::from("Test comment"),
            timestamp: Utc::now().naive_utc(),
            disabled: true,
            author_id: 2,
            post_id: 3,
        };
        let json = serde_json::to_value(&comment).unwrap();
        assert_eq!(json["disabled"], true);
        assert_eq!(json["post_id"], 3);
    }

    #[test]
    #[ignore]
    fn last_page_after_commenting() {
        let connection = crate::db::test_connection();
        let ada = insert_actor(&connection, "ada");
        let post = insert_post(&connection, ada.id(), "Discuss");
        for i in 0..25 {
            super::create(&connection, &ada, post.id, &format!("comment {}", i)).unwrap();
        }

        let last = super::list(&connection, post.id, Visibility::Public, PageRequest::Last, 20)
            .unwrap();
        assert_eq!(last.page, 2);
        assert_eq!(last.items.len(), 5);

        let newest = super::create(&connection, &ada, post.id, "one more").unwrap();
        let last = super::list(&connection, post.id, Visibility::Public, PageRequest::Last, 20)
            .unwrap();
        assert_eq!(last.items.last().map(|c| c.item.id), Some(newest.id));

        let first = super::list(&connection, post.id, Visibility::Public, PageRequest::Number(1), 20)
            .unwrap();
        assert!(first
            .items
            .windows(2)
            .all(|pair| pair[0].item.timestamp <= pair[1].item.timestamp));
    }

    #[test]
    #[ignore]
    fn disabling_hides_without_deleting() {
        let connection = crate::db::test_connection();
        let ada = insert_actor(&connection, "ada");
        let post = insert_post(&connection, ada.id(), "Discuss");
        let comment = super::create(&connection, &ada, post.id, "rude").unwrap();
        super::create(&connection, &ada, post.id, "polite").unwrap();

        assert!(super::set_disabled(&connection, &ada, comment.id, true).is_err());

        let moderator = crate::user::tests::actor(ada.id(), &[Permission::ModerateComments]);
        super::set_disabled(&connection, &moderator, comment.id, true).unwrap();
        // idempotent
        let again = super::set_disabled(&connection, &moderator, comment.id, true).unwrap();
        assert!(again.disabled);

        let public = super::list(&connection, post.id, Visibility::Public, PageRequest::Number(1), 20)
            .unwrap();
        assert_eq!(public.total, 1);
        assert!(public.items.iter().all(|c| c.item.id != comment.id));

        let all = super::list(&connection, post.id, Visibility::Moderator, PageRequest::Number(1), 20)
            .unwrap();
        assert_eq!(all.total, 2);
        assert!(super::get(&connection, comment.id).unwrap().disabled);

        let queue = super::list_for_moderation(&connection, &moderator, PageRequest::Number(1), 20)
            .unwrap();
        assert!(queue.items.iter().any(|c| c.item.id == comment.id));
    }
}
