use std::collections::HashMap;

use chrono::{NaiveDateTime, Utc};
use cookie::CookieJar;
use diesel::{prelude::*, result::Error as DieselError};
use diesel_derive_enum::DbEnum;
use futures::future;
use gotham::{
    handler::HandlerFuture,
    middleware::Middleware,
    state::{FromState, State},
};
use gotham_derive::{NewMiddleware, StateData};

use crate::{
    error::{Error, Result},
    schema::{roles, sessions, users},
    Connection, DbConnection,
};

#[derive(Clone, Debug, Serialize, Queryable, Identifiable)]
pub struct User {
    /// The unique id of this user
    pub id: i32,
    /// The unique login name
    pub username: String,
    pub email: String,
    /// The role deciding what the user may do
    pub role_id: i32,
    /// The user's display name
    pub name: Option<String>,
    pub location: Option<String>,
    pub about_me: Option<String>,
    pub member_since: NaiveDateTime,
}

/// The public part of a user, shown next to their content
#[derive(Clone, Debug, Serialize)]
pub struct Profile {
    pub id: i32,
    pub username: String,
    pub name: Option<String>,
    pub location: Option<String>,
    pub about_me: Option<String>,
    pub member_since: NaiveDateTime,
}

impl From<User> for Profile {
    fn from(user: User) -> Self {
        Profile {
            id: user.id,
            username: user.username,
            name: user.name,
            location: user.location,
            about_me: user.about_me,
            member_since: user.member_since,
        }
    }
}

/// Content paired with the username of whoever wrote it
#[derive(Clone, Debug, Serialize)]
pub struct Authored<T> {
    #[serde(flatten)]
    pub item: T,
    pub author: String,
}

/// Usernames of the authors of a batch of content, looked up with a single query.
pub struct Authors(HashMap<i32, String>);

impl Authors {
    pub fn load<I>(connection: &Connection, ids: I) -> Result<Authors>
    where
        I: IntoIterator<Item = i32>,
    {
        let mut ids: Vec<i32> = ids.into_iter().collect();
        ids.sort_unstable();
        ids.dedup();
        if ids.is_empty() {
            return Ok(Authors(HashMap::new()));
        }
        let names: Vec<(i32, String)> = users::table
            .select((users::id, users::username))
            .filter(users::id.eq_any(ids))
            .load(connection)?;
        Ok(Authors(names.into_iter().collect()))
    }

    pub fn attach<T>(&self, item: T, author_id: i32) -> Authored<T> {
        Authored {
            item,
            author: self.0.get(&author_id).cloned().unwrap_or_default(),
        }
    }
}

/// Represents a type of action that a user can be allowed or denied permission for
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, DbEnum)]
#[serde(rename_all = "snake_case")]
pub enum Permission {
    Follow,
    Comment,
    WriteArticles,
    ModerateComments,
    /// Implies every other permission
    Administer,
}

#[derive(Clone, Debug, Queryable, Identifiable)]
pub struct Role {
    pub id: i32,
    pub name: String,
    pub permissions: Vec<Permission>,
    pub is_default: bool,
}

/// The authenticated user on whose behalf an operation runs.
#[derive(Clone, Debug, StateData)]
pub struct Actor {
    pub user: User,
    permissions: Vec<Permission>,
}

impl Actor {
    pub fn new(user: User, permissions: Vec<Permission>) -> Self {
        Actor { user, permissions }
    }

    /// Looks up a user together with the permissions granted by their role.
    pub fn load(connection: &Connection, user_id: i32) -> Result<Actor> {
        let row: Option<(User, Role)> = users::table
            .inner_join(roles::table)
            .filter(users::id.eq(user_id))
            .first(connection)
            .optional()?;
        let (user, role) = row.ok_or(Error::NotFound("user"))?;
        Ok(Actor::new(user, role.permissions))
    }

    pub fn id(&self) -> i32 {
        self.user.id
    }

    /// Checks if the actor has a given permission.
    pub fn can(&self, permission: Permission) -> bool {
        self.permissions.contains(&permission) || self.permissions.contains(&Permission::Administer)
    }

    /// Fails with `PermissionDenied` unless the actor has `permission`.
    pub fn require(&self, permission: Permission) -> Result<()> {
        if self.can(permission) {
            Ok(())
        } else {
            Err(Error::PermissionDenied(permission))
        }
    }
}

/// A login session. Sessions are created by the authentication service, this crate only reads
/// them.
#[derive(Clone, Debug, Queryable)]
pub struct Session {
    pub id: String,
    pub user_id: i32,
    pub expires: NaiveDateTime,
}

impl Session {
    /// Get the unexpired session with the specified id
    pub fn from_id(id: &str, connection: &Connection) -> std::result::Result<Option<Session>, DieselError> {
        sessions::table
            .find(id)
            .filter(sessions::expires.gt(Utc::now().naive_utc()))
            .first(connection)
            .optional()
    }
}

/// Resolves the `session` cookie into an `Actor` stored in the request state.
#[derive(Clone, NewMiddleware)]
pub struct SessionMiddleware;

impl Middleware for SessionMiddleware {
    fn call<C>(self, mut state: State, chain: C) -> Box<HandlerFuture>
    where
        C: FnOnce(State) -> Box<HandlerFuture>,
    {
        let put_actor = |state: &mut State| -> std::result::Result<(), failure::Error> {
            let id = CookieJar::borrow_from(&state)
                .get("session")
                .map(|cookie| cookie.value().to_owned());
            if let Some(id) = id {
                let connection = DbConnection::from_state(&state)?;
                if let Some(session) = Session::from_id(&id, &connection)? {
                    let actor = Actor::load(&connection, session.user_id)?;
                    state.put(actor);
                }
            }
            Ok(())
        };
        match put_actor(&mut state) {
            Ok(()) => Box::new(chain(state)),
            Err(e) => {
                let response = crate::handler::error_response(&state, e);
                Box::new(future::ok((state, response)))
            }
        }
    }
}

/// Fields a user may change on their own profile
#[derive(Clone, Debug, Deserialize, AsChangeset)]
#[table_name = "users"]
#[changeset_options(treat_none_as_null = "true")]
pub struct ProfileChanges {
    pub name: Option<String>,
    pub location: Option<String>,
    pub about_me: Option<String>,
}

/// Fields an administrator may change on any profile
#[derive(Clone, Debug, Deserialize, AsChangeset)]
#[table_name = "users"]
#[changeset_options(treat_none_as_null = "true")]
pub struct AdminProfileChanges {
    pub email: String,
    pub username: String,
    pub role_id: i32,
    pub name: Option<String>,
    pub location: Option<String>,
    pub about_me: Option<String>,
}

pub fn get(connection: &Connection, id: i32) -> Result<User> {
    users::table
        .find(id)
        .first(connection)
        .optional()?
        .ok_or(Error::NotFound("user"))
}

pub fn by_username(connection: &Connection, username: &str) -> Result<User> {
    users::table
        .filter(users::username.eq(username))
        .first(connection)
        .optional()?
        .ok_or(Error::NotFound("user"))
}

pub fn edit_profile(connection: &Connection, actor: &Actor, changes: &ProfileChanges) -> Result<User> {
    let user = diesel::update(users::table.find(actor.id()))
        .set(changes)
        .get_result(connection)?;
    Ok(user)
}

pub fn edit_profile_admin(
    connection: &Connection,
    actor: &Actor,
    id: i32,
    changes: &AdminProfileChanges,
) -> Result<User> {
    actor.require(Permission::Administer)?;

    let role_exists: bool = diesel::select(diesel::dsl::exists(roles::table.find(changes.role_id)))
        .get_result(connection)?;
    if !role_exists {
        return Err(Error::NotFound("role"));
    }
    let taken: Option<i32> = users::table
        .select(users::id)
        .filter(users::username.eq(&changes.username))
        .filter(users::id.ne(id))
        .first(connection)
        .optional()?;
    if taken.is_some() {
        return Err(Error::InvalidOperation("Username already in use"));
    }
    let taken: Option<i32> = users::table
        .select(users::id)
        .filter(users::email.eq(&changes.email))
        .filter(users::id.ne(id))
        .first(connection)
        .optional()?;
    if taken.is_some() {
        return Err(Error::InvalidOperation("Email already registered"));
    }

    let user = diesel::update(users::table.find(id))
        .set(changes)
        .get_result(connection)
        .optional()?
        .ok_or(Error::NotFound("user"))?;
    info!("User {} edited the profile of {}", actor.user.username, changes.username);
    Ok(user)
}
