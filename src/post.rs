use chrono::NaiveDateTime;
use diesel::{pg::Pg, prelude::*};

use crate::{
    config,
    error::{Error, Result},
    pagination::{PageRequest, Pagination},
    question,
    schema::{follows, posts},
    user::{Actor, Authored, Authors, Permission},
    Connection,
};

#[derive(Clone, Debug, Serialize, Queryable, Identifiable)]
pub struct Post {
    /// The unique id of this post
    pub id: i32,
    /// The markdown source of the post
    pub body: String,
    /// The body rendered to HTML
    pub body_html: Option<String>,
    /// The time of the post's submission. Never changes afterwards.
    pub timestamp: NaiveDateTime,
    /// The user who wrote the post
    pub author_id: i32,
    /// The question this post answers, if any
    pub question_id: Option<i32>,
}

#[derive(Insertable)]
#[table_name = "posts"]
struct NewPost<'a> {
    body: &'a str,
    body_html: Option<String>,
    author_id: i32,
    question_id: Option<i32>,
}

/// A post submission as sent by a client
#[derive(Clone, Debug, Deserialize)]
pub struct PostForm {
    pub body: String,
}

/// Which posts to list
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PostFilter {
    /// Every post, newest first
    All,
    /// Posts by the users the given user follows and by the user themselves, newest first
    Followed(i32),
    /// Posts written by the given user, newest first
    Author(i32),
    /// Answers to the given question, oldest first
    Question(i32),
}

impl PostFilter {
    fn chronological(self) -> bool {
        match self {
            PostFilter::Question(_) => true,
            _ => false,
        }
    }
}

/// Renders a markdown post body to HTML.
pub fn render(body: &str) -> String {
    comrak::markdown_to_html(body, &config::markdown_options())
}

fn filtered(filter: PostFilter) -> posts::BoxedQuery<'static, Pg> {
    let query = posts::table.into_boxed();
    match filter {
        PostFilter::All => query,
        PostFilter::Followed(user) => {
            let followed = follows::table
                .select(follows::followed_id)
                .filter(follows::follower_id.eq(user));
            query.filter(posts::author_id.eq_any(followed).or(posts::author_id.eq(user)))
        }
        PostFilter::Author(user) => query.filter(posts::author_id.eq(user)),
        PostFilter::Question(question) => query.filter(posts::question_id.eq(question)),
    }
}

pub fn get(connection: &Connection, id: i32) -> Result<Post> {
    posts::table
        .find(id)
        .first(connection)
        .optional()?
        .ok_or(Error::NotFound("post"))
}

/// A post along with its author's username
pub fn view(connection: &Connection, id: i32) -> Result<Authored<Post>> {
    let post = get(connection, id)?;
    let authors = Authors::load(connection, Some(post.author_id))?;
    let author_id = post.author_id;
    Ok(authors.attach(post, author_id))
}

pub fn list(
    connection: &Connection,
    filter: PostFilter,
    request: PageRequest,
    per_page: i64,
) -> Result<Pagination<Authored<Post>>> {
    let total: i64 = filtered(filter).count().get_result(connection)?;

    let page = Pagination::fetch(request, per_page, total, |limit, offset| {
        let query = filtered(filter);
        let query = if filter.chronological() {
            query.order((posts::timestamp.asc(), posts::id.asc()))
        } else {
            query.order((posts::timestamp.desc(), posts::id.desc()))
        };
        query.limit(limit).offset(offset).load::<Post>(connection)
    })?;

    let authors = Authors::load(connection, page.items.iter().map(|post| post.author_id))?;
    Ok(page.map(|post| {
        let author_id = post.author_id;
        authors.attach(post, author_id)
    }))
}

/// Publishes a post, optionally as an answer to a question.
pub fn create(
    connection: &Connection,
    actor: &Actor,
    body: &str,
    question: Option<i32>,
) -> Result<Post> {
    actor.require(Permission::WriteArticles)?;
    if body.trim().is_empty() {
        return Err(Error::InvalidOperation("A post can't be empty"));
    }
    if let Some(id) = question {
        question::get(connection, id)?;
    }

    let new = NewPost {
        body,
        body_html: Some(render(body)),
        author_id: actor.id(),
        question_id: question,
    };
    let post: Post = diesel::insert_into(posts::table)
        .values(&new)
        .get_result(connection)?;
    info!("{} published post {}", actor.user.username, post.id);
    Ok(post)
}

/// Replaces the body of a post. Only its author or an administrator may do so.
pub fn edit(connection: &Connection, actor: &Actor, id: i32, body: &str) -> Result<Post> {
    let post = get(connection, id)?;
    if post.author_id != actor.id() {
        actor.require(Permission::Administer)?;
    }
    if body.trim().is_empty() {
        return Err(Error::InvalidOperation("A post can't be empty"));
    }

    let post = diesel::update(posts::table.find(id))
        .set((posts::body.eq(body), posts::body_html.eq(render(body))))
        .get_result(connection)?;
    Ok(post)
}

#[cfg(test)]
pub(crate) mod tests {
    use super::{render, PostFilter};
    use crate::{
        pagination::PageRequest,
        user::{tests::actor, Permission},
        Connection,
    };

    /// Inserts a post written by `author` directly, bypassing permission checks.
    pub fn insert_post(connection: &Connection, author: i32, body: &str) -> super::Post {
        use crate::schema::posts;
        use diesel::prelude::*;

        diesel::insert_into(posts::table)
            .values((posts::body.eq(body), posts::author_id.eq(author)))
            .get_result(connection)
            .unwrap()
    }

    #[test]
    fn renders_markdown_without_raw_html() {
        let html = render("*hi* <script>alert(1)</script>");
        assert!(html.contains("<em>hi</em>"));
        assert!(!html.contains("<script>"));
    }

    #[test]
    fn answer_order() {
        assert!(PostFilter::Question(1).chronological());
        assert!(!PostFilter::All.chronological());
        assert!(!PostFilter::Followed(1).chronological());
    }

    #[test]
    #[ignore]
    fn create_requires_permission() {
        let connection = crate::db::test_connection();
        let reader = actor(1, &[Permission::Follow]);
        assert!(super::create(&connection, &reader, "body", None).is_err());
    }

    #[test]
    #[ignore]
    fn followed_feed() {
        let connection = crate::db::test_connection();
        let ada = crate::user::tests::insert_actor(&connection, "ada");
        let bob = crate::user::tests::insert_actor(&connection, "bob");
        let eve = crate::user::tests::insert_actor(&connection, "eve");

        let own = super::create(&connection, &ada, "mine", None).unwrap();
        let followed = super::create(&connection, &bob, "bob's", None).unwrap();
        super::create(&connection, &eve, "eve's", None).unwrap();
        crate::follow::follow(&connection, &ada, bob.id()).unwrap();

        let feed = super::list(
            &connection,
            PostFilter::Followed(ada.id()),
            PageRequest::Number(1),
            10,
        )
        .unwrap();
        let mut ids: Vec<i32> = feed.items.iter().map(|post| post.item.id).collect();
        ids.sort();
        assert_eq!(ids, vec![own.id, followed.id]);
        assert!(feed.items.iter().any(|post| post.author == "bob"));
    }

    #[test]
    #[ignore]
    fn edit_keeps_timestamp() {
        let connection = crate::db::test_connection();
        let ada = crate::user::tests::insert_actor(&connection, "ada");
        let bob = crate::user::tests::insert_actor(&connection, "bob");
        let post = super::create(&connection, &ada, "first", None).unwrap();

        assert!(super::edit(&connection, &bob, post.id, "hijacked").is_err());
        let edited = super::edit(&connection, &ada, post.id, "second *draft*").unwrap();
        assert_eq!(edited.timestamp, post.timestamp);
        assert_eq!(edited.body, "second *draft*");
        assert!(edited.body_html.unwrap().contains("<em>draft</em>"));
    }
}
